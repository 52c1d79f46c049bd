//! Exactly-once resolution of an operation's result.
//!
//! The timeout sweep, the inbound reply path, and `clean_up` may all try to
//! resolve the same operation concurrently. The first caller wins; every
//! later call is a silent no-op that returns `false`.

use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, Ordering};
use std::task::{Context, Poll};

use parking_lot::Mutex;
use tokio::sync::oneshot;

use crate::error::OperationError;

type Outcome<T> = Result<T, OperationError>;

/// Resolving half of an operation's result.
#[derive(Debug)]
pub struct Completion<T> {
    completed: AtomicBool,
    tx: Mutex<Option<oneshot::Sender<Outcome<T>>>>,
}

impl<T> Completion<T> {
    /// Creates a completion together with the future handed to the application.
    #[must_use]
    pub fn new() -> (Self, OperationFuture<T>) {
        let (tx, rx) = oneshot::channel();
        let completion = Self {
            completed: AtomicBool::new(false),
            tx: Mutex::new(Some(tx)),
        };
        (completion, OperationFuture { rx })
    }

    /// Resolves with a value. Returns `false` if already resolved.
    pub fn succeed(&self, value: T) -> bool {
        self.resolve(Ok(value))
    }

    /// Resolves with an error. Returns `false` if already resolved.
    pub fn fail(&self, error: OperationError) -> bool {
        self.resolve(Err(error))
    }

    #[must_use]
    pub fn is_completed(&self) -> bool {
        self.completed.load(Ordering::Acquire)
    }

    fn resolve(&self, outcome: Outcome<T>) -> bool {
        if self.completed.swap(true, Ordering::AcqRel) {
            return false;
        }
        if let Some(tx) = self.tx.lock().take() {
            // The application may have dropped the future; nothing to deliver to.
            let _ = tx.send(outcome);
        }
        true
    }
}

/// Future returned to the application for one operation.
///
/// Resolves to `OperationError::Abandoned` if the operation is dropped
/// without ever being resolved.
#[derive(Debug)]
pub struct OperationFuture<T> {
    rx: oneshot::Receiver<Outcome<T>>,
}

impl<T> Future for OperationFuture<T> {
    type Output = Outcome<T>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        match Pin::new(&mut self.rx).poll(cx) {
            Poll::Ready(Ok(outcome)) => Poll::Ready(outcome),
            Poll::Ready(Err(_closed)) => Poll::Ready(Err(OperationError::Abandoned)),
            Poll::Pending => Poll::Pending,
        }
    }
}
