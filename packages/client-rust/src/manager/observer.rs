//! Observer trait for manager decision points, plus tracing and composite
//! implementations.
//!
//! The manager reports every dispatch, retry, removal, and failure through an
//! [`OperationObserver`]. [`TracingObserver`] is the default; tests and
//! metrics layers install their own, combined with [`CompositeObserver`].

use std::sync::Arc;
use std::time::Duration;

use uuid::Uuid;

use super::item::OperationItem;
use crate::channel::ChannelId;
use crate::error::{ChannelError, OperationError};

/// Receives manager events. All methods default to no-ops.
///
/// Called synchronously from the manager's paths; implementations must not
/// call back into the manager.
pub trait OperationObserver: Send + Sync {
    /// An item entered the waiting queue.
    fn on_enqueued(&self, _item: &OperationItem) {}

    /// An item was written to a channel and is now active.
    fn on_sent(&self, _item: &OperationItem, _channel: ChannelId) {}

    /// The channel refused the package. The item stays active and is
    /// retried by a later sweep.
    fn on_write_failed(&self, _item: &OperationItem, _error: ChannelError) {}

    /// An item left the active table without being retried.
    fn on_removed(&self, _item: &OperationItem) {}

    /// An active item exceeded the operation timeout.
    fn on_timed_out(&self, _item: &OperationItem, _elapsed: Duration) {}

    /// An item moved from the active table to retry-pending.
    fn on_retry_scheduled(&self, _item: &OperationItem) {}

    /// An item was re-enqueued under a fresh correlation id.
    fn on_retried(&self, _item: &OperationItem, _previous_correlation_id: Uuid) {}

    /// The manager resolved an item's future with an error.
    fn on_failed(&self, _item: &OperationItem, _error: &OperationError) {}

    /// A timeout sweep was requested while another was still running.
    fn on_sweep_skipped(&self) {}
}

/// Logs manager events through `tracing`.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingObserver;

impl OperationObserver for TracingObserver {
    fn on_enqueued(&self, item: &OperationItem) {
        tracing::debug!(
            correlation_id = %item.correlation_id(),
            operation = item.operation().name(),
            "enqueued operation"
        );
    }

    fn on_sent(&self, item: &OperationItem, channel: ChannelId) {
        tracing::debug!(
            correlation_id = %item.correlation_id(),
            channel = channel.0,
            retry_count = item.retry_count(),
            "sent operation"
        );
    }

    fn on_write_failed(&self, item: &OperationItem, error: ChannelError) {
        tracing::warn!(correlation_id = %item.correlation_id(), %error, "channel write failed");
    }

    fn on_removed(&self, item: &OperationItem) {
        tracing::debug!(correlation_id = %item.correlation_id(), "removed operation");
    }

    fn on_timed_out(&self, item: &OperationItem, elapsed: Duration) {
        tracing::debug!(
            correlation_id = %item.correlation_id(),
            elapsed_ms = u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX),
            "operation timed out"
        );
    }

    fn on_retry_scheduled(&self, item: &OperationItem) {
        tracing::debug!(correlation_id = %item.correlation_id(), "scheduled operation for retry");
    }

    fn on_retried(&self, item: &OperationItem, previous_correlation_id: Uuid) {
        tracing::debug!(
            previous = %previous_correlation_id,
            correlation_id = %item.correlation_id(),
            retry_count = item.retry_count(),
            "retrying operation"
        );
    }

    fn on_failed(&self, item: &OperationItem, error: &OperationError) {
        tracing::debug!(correlation_id = %item.correlation_id(), %error, "operation failed");
    }

    fn on_sweep_skipped(&self) {
        tracing::warn!("timeout sweep already running, skipping");
    }
}

/// Fans notifications out to several observers, in registration order.
#[derive(Default)]
pub struct CompositeObserver {
    observers: Vec<Arc<dyn OperationObserver>>,
}

impl CompositeObserver {
    #[must_use]
    pub fn new(observers: Vec<Arc<dyn OperationObserver>>) -> Self {
        Self { observers }
    }

    pub fn add(&mut self, observer: Arc<dyn OperationObserver>) {
        self.observers.push(observer);
    }
}

impl OperationObserver for CompositeObserver {
    fn on_enqueued(&self, item: &OperationItem) {
        for observer in &self.observers {
            observer.on_enqueued(item);
        }
    }

    fn on_sent(&self, item: &OperationItem, channel: ChannelId) {
        for observer in &self.observers {
            observer.on_sent(item, channel);
        }
    }

    fn on_write_failed(&self, item: &OperationItem, error: ChannelError) {
        for observer in &self.observers {
            observer.on_write_failed(item, error);
        }
    }

    fn on_removed(&self, item: &OperationItem) {
        for observer in &self.observers {
            observer.on_removed(item);
        }
    }

    fn on_timed_out(&self, item: &OperationItem, elapsed: Duration) {
        for observer in &self.observers {
            observer.on_timed_out(item, elapsed);
        }
    }

    fn on_retry_scheduled(&self, item: &OperationItem) {
        for observer in &self.observers {
            observer.on_retry_scheduled(item);
        }
    }

    fn on_retried(&self, item: &OperationItem, previous_correlation_id: Uuid) {
        for observer in &self.observers {
            observer.on_retried(item, previous_correlation_id);
        }
    }

    fn on_failed(&self, item: &OperationItem, error: &OperationError) {
        for observer in &self.observers {
            observer.on_failed(item, error);
        }
    }

    fn on_sweep_skipped(&self) {
        for observer in &self.observers {
            observer.on_sweep_skipped();
        }
    }
}
