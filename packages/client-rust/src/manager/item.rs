//! Bookkeeping record for one logical request.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use tokio::time::Instant;
use uuid::Uuid;

use crate::channel::ChannelId;
use crate::operation::Operation;

static NEXT_SEQUENCE_NUMBER: AtomicU64 = AtomicU64::new(0);

/// One queued or in-flight operation.
///
/// The correlation id changes on every attempt; the sequence number is fixed
/// at creation and orders retries.
pub struct OperationItem {
    pub(crate) sequence_number: u64,
    pub(crate) correlation_id: Uuid,
    pub(crate) operation: Box<dyn Operation>,
    pub(crate) connection_id: Option<ChannelId>,
    pub(crate) created: Instant,
    pub(crate) last_updated: Instant,
    pub(crate) timeout: Duration,
    pub(crate) retry_count: u32,
    pub(crate) max_retries: i32,
    pub(crate) retry_requested: bool,
}

impl OperationItem {
    /// Wraps an operation. A zero `timeout` exempts the item from elapsed-time
    /// checks; a negative `max_retries` retries without limit.
    #[must_use]
    pub fn new(operation: Box<dyn Operation>, max_retries: i32, timeout: Duration) -> Self {
        let now = Instant::now();
        Self {
            sequence_number: NEXT_SEQUENCE_NUMBER.fetch_add(1, Ordering::Relaxed),
            correlation_id: Uuid::new_v4(),
            operation,
            connection_id: None,
            created: now,
            last_updated: now,
            timeout,
            retry_count: 0,
            max_retries,
            retry_requested: false,
        }
    }

    #[must_use]
    pub fn sequence_number(&self) -> u64 {
        self.sequence_number
    }

    #[must_use]
    pub fn correlation_id(&self) -> Uuid {
        self.correlation_id
    }

    #[must_use]
    pub fn operation(&self) -> &dyn Operation {
        self.operation.as_ref()
    }

    /// Channel of the most recent send, `None` until first sent.
    #[must_use]
    pub fn connection_id(&self) -> Option<ChannelId> {
        self.connection_id
    }

    #[must_use]
    pub fn retry_count(&self) -> u32 {
        self.retry_count
    }

    #[must_use]
    pub fn max_retries(&self) -> i32 {
        self.max_retries
    }

    #[must_use]
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Whether one more retry would hit the ceiling.
    pub(crate) fn retries_exhausted(&self) -> bool {
        u32::try_from(self.max_retries).is_ok_and(|max| self.retry_count >= max)
    }

    pub(crate) fn summary(&self) -> OperationSummary {
        OperationSummary {
            correlation_id: self.correlation_id,
            sequence_number: self.sequence_number,
            name: self.operation.name(),
            description: self.operation.to_string(),
            connection_id: self.connection_id,
            retry_count: self.retry_count,
            max_retries: self.max_retries,
            retry_requested: self.retry_requested,
            age: self.created.elapsed(),
            since_last_update: self.last_updated.elapsed(),
        }
    }
}

impl fmt::Display for OperationItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Operation {} ({}): {}, retry count: {}, created: {:?} ago, last updated: {:?} ago",
            self.operation.name(),
            self.correlation_id,
            self.operation,
            self.retry_count,
            self.created.elapsed(),
            self.last_updated.elapsed(),
        )
    }
}

impl fmt::Debug for OperationItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OperationItem")
            .field("sequence_number", &self.sequence_number)
            .field("correlation_id", &self.correlation_id)
            .field("operation", &self.operation.name())
            .field("connection_id", &self.connection_id)
            .field("retry_count", &self.retry_count)
            .field("max_retries", &self.max_retries)
            .finish_non_exhaustive()
    }
}

/// Point-in-time view of an active operation, safe to hand out while the
/// manager keeps mutating the item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OperationSummary {
    pub correlation_id: Uuid,
    pub sequence_number: u64,
    pub name: &'static str,
    pub description: String,
    pub connection_id: Option<ChannelId>,
    pub retry_count: u32,
    pub max_retries: i32,
    pub retry_requested: bool,
    pub age: Duration,
    pub since_last_update: Duration,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::delete_item;

    #[test]
    fn sequence_numbers_increase() {
        let (first, _f1) = delete_item("a", 3);
        let (second, _f2) = delete_item("b", 3);
        assert!(second.sequence_number() > first.sequence_number());
        assert_ne!(first.correlation_id(), second.correlation_id());
        assert!(first.connection_id().is_none());
    }

    #[test]
    fn retries_exhausted_respects_ceiling() {
        let (mut item, _future) = delete_item("a", 2);
        assert!(!item.retries_exhausted());
        item.retry_count = 2;
        assert!(item.retries_exhausted());

        let (mut unlimited, _future) = delete_item("b", -1);
        unlimited.retry_count = u32::MAX;
        assert!(!unlimited.retries_exhausted());
    }

    #[test]
    fn zero_ceiling_is_exhausted_on_first_retry() {
        let (mut item, _future) = delete_item("a", 0);
        item.retry_count = 1;
        assert!(item.retries_exhausted());
    }

    #[test]
    fn summary_describes_operation() {
        let (item, _future) = delete_item("orders", 3);
        let summary = item.summary();
        assert_eq!(summary.name, "DeleteStream");
        assert!(summary.description.starts_with("Stream: orders"));
        assert_eq!(summary.correlation_id, item.correlation_id());
        assert!(item.to_string().contains("DeleteStream"));
    }
}
