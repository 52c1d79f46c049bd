//! Test helpers: a recording channel, reply builders, and ready-made items.

use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use eventwire_core::{messages, DeleteResult, TcpCommand, TcpPackage};
use parking_lot::Mutex;
use serde::Serialize;
use uuid::Uuid;

use crate::channel::{Channel, ChannelId};
use crate::error::ChannelError;
use crate::manager::OperationItem;
use crate::operation::{DeleteStream, OperationFuture, PendingOperation};

/// Channel that keeps every package written to it.
pub(crate) struct RecordingChannel {
    id: ChannelId,
    sent: Mutex<Vec<TcpPackage>>,
    closed: AtomicBool,
}

impl RecordingChannel {
    pub(crate) fn new() -> Self {
        Self {
            id: ChannelId::next(),
            sent: Mutex::new(Vec::new()),
            closed: AtomicBool::new(false),
        }
    }

    pub(crate) fn sent(&self) -> Vec<TcpPackage> {
        self.sent.lock().clone()
    }

    /// Makes every later write fail with `ChannelError::Closed`.
    pub(crate) fn close(&self) {
        self.closed.store(true, Ordering::SeqCst);
    }
}

impl Channel for RecordingChannel {
    fn id(&self) -> ChannelId {
        self.id
    }

    fn write(&self, package: TcpPackage) -> Result<(), ChannelError> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(ChannelError::Closed);
        }
        self.sent.lock().push(package);
        Ok(())
    }
}

/// Builds a server reply carrying an encoded body.
pub(crate) fn reply<T: Serialize>(command: TcpCommand, correlation_id: Uuid, body: &T) -> TcpPackage {
    let data = messages::encode(body).expect("encode reply body");
    TcpPackage::new(command, correlation_id, data)
}

/// A delete-stream item with the default 7 s timeout.
pub(crate) fn delete_item(stream: &str, max_retries: i32) -> (OperationItem, OperationFuture<DeleteResult>) {
    let (operation, future) = PendingOperation::new(DeleteStream::new(stream, 4, false, true), None);
    let item = OperationItem::new(Box::new(operation), max_retries, Duration::from_secs(7));
    (item, future)
}
