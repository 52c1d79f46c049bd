//! The operation manager: queues, dispatch, timeouts, and retries.
//!
//! Three callers drive the manager concurrently:
//!
//! - application tasks, through [`OperationManager::enqueue_operation`] and
//!   [`OperationManager::schedule_operation`];
//! - the timeout worker, through [`OperationManager::check_timeouts_and_retry`];
//! - the connection's inbound path, through [`OperationManager::handle_package`].
//!
//! Items live in exactly one of three places: the waiting queue (lock-free
//! FIFO), the active table (concurrent map keyed by correlation id), or the
//! retry-pending list, which only the sweep touches.

pub mod item;
pub mod observer;

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use crossbeam::queue::SegQueue;
use dashmap::DashMap;
use eventwire_core::TcpPackage;
use parking_lot::Mutex;
use tokio::time::Instant;
use uuid::Uuid;

use crate::channel::Channel;
use crate::config::OperationConfig;
use crate::error::{CloseCause, OperationError, ProtocolError};
use crate::operation::{InspectionDecision, InspectionResult};

pub use item::{OperationItem, OperationSummary};
pub use observer::{CompositeObserver, OperationObserver, TracingObserver};

// ---------------------------------------------------------------------------
// SweepReport
// ---------------------------------------------------------------------------

/// What one timeout sweep did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SweepReport {
    /// Items that exceeded the operation timeout.
    pub timed_out: usize,
    /// Items marked for retry (stale channel, timeout, or requested).
    pub marked_for_retry: usize,
    /// Items re-enqueued under a fresh correlation id.
    pub retried: usize,
    /// Items failed by the sweep (timeout policy or retries exhausted).
    pub failed: usize,
}

// Releases the sweep flag on every exit path.
struct SweepGuard<'a>(&'a AtomicBool);

impl<'a> SweepGuard<'a> {
    fn acquire(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| Self(flag))
    }
}

impl Drop for SweepGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

// ---------------------------------------------------------------------------
// OperationManager
// ---------------------------------------------------------------------------

/// Tracks every operation from enqueue to exactly-once resolution.
pub struct OperationManager {
    config: OperationConfig,
    active: DashMap<Uuid, OperationItem>,
    waiting: SegQueue<OperationItem>,
    retry_pending: Mutex<Vec<OperationItem>>,
    total: AtomicUsize,
    sweeping: AtomicBool,
    // Serializes draining so the concurrency cap holds under concurrent callers.
    drain_lock: Mutex<()>,
    observer: Arc<dyn OperationObserver>,
}

impl OperationManager {
    /// Creates a manager that logs through [`TracingObserver`].
    #[must_use]
    pub fn new(config: OperationConfig) -> Self {
        Self::with_observer(config, Arc::new(TracingObserver))
    }

    #[must_use]
    pub fn with_observer(config: OperationConfig, observer: Arc<dyn OperationObserver>) -> Self {
        Self {
            config,
            active: DashMap::new(),
            waiting: SegQueue::new(),
            retry_pending: Mutex::new(Vec::new()),
            total: AtomicUsize::new(0),
            sweeping: AtomicBool::new(false),
            drain_lock: Mutex::new(()),
            observer,
        }
    }

    #[must_use]
    pub fn config(&self) -> &OperationConfig {
        &self.config
    }

    // -- Enqueue and dispatch ----------------------------------------------

    /// Appends an item to the waiting queue without dispatching it.
    pub fn enqueue_operation(&self, item: OperationItem) {
        self.observer.on_enqueued(&item);
        self.waiting.push(item);
        self.total.fetch_add(1, Ordering::AcqRel);
    }

    /// Enqueues an item, then drains the waiting queue onto `channel`.
    pub fn schedule_operation(&self, item: OperationItem, channel: &dyn Channel) {
        self.enqueue_operation(item);
        self.schedule_waiting_operations(channel);
    }

    /// Sends waiting items, oldest first, until the queue is empty or the
    /// concurrency cap is reached.
    pub fn schedule_waiting_operations(&self, channel: &dyn Channel) {
        let _drain = self.drain_lock.lock();
        while self.active.len() < self.config.max_concurrent_operations {
            let Some(item) = self.waiting.pop() else {
                break;
            };
            self.send(item, channel);
        }
        self.recount();
    }

    fn send(&self, mut item: OperationItem, channel: &dyn Channel) {
        item.connection_id = Some(channel.id());
        item.last_updated = Instant::now();

        let package = match item.operation.create(item.correlation_id) {
            Ok(package) => package,
            Err(err) => {
                let error = OperationError::Encode(err.to_string());
                item.operation.fail(error.clone());
                self.observer.on_failed(&item, &error);
                return;
            }
        };

        // Registered before the write so a reply racing the write finds it.
        let id = item.correlation_id;
        self.observer.on_sent(&item, channel.id());
        self.active.insert(id, item);

        if let Err(error) = channel.write(package) {
            // Stays active; a later sweep times it out or sees the new channel.
            if let Some(entry) = self.active.get(&id) {
                self.observer.on_write_failed(entry.value(), error);
            }
        }
    }

    // -- Timeout sweep -------------------------------------------------------

    /// Retries items sent on a replaced channel, handles timeouts, resends
    /// retry-pending items, and fills freed slots.
    ///
    /// With `channel == None` every active item is marked stale but nothing
    /// is resent or dispatched. Returns `None` if another sweep is already
    /// running.
    pub fn check_timeouts_and_retry(&self, channel: Option<&dyn Channel>) -> Option<SweepReport> {
        let Some(_guard) = SweepGuard::acquire(&self.sweeping) else {
            self.observer.on_sweep_skipped();
            return None;
        };

        let mut report = SweepReport::default();
        let mut retry_ids = Vec::new();
        let mut remove_ids = Vec::new();
        let now = Instant::now();
        let current = channel.map(|channel| channel.id());

        for entry in &self.active {
            let item = entry.value();
            if current.is_none() || item.connection_id != current || item.retry_requested {
                retry_ids.push(item.correlation_id);
                continue;
            }
            let elapsed = now.saturating_duration_since(item.last_updated);
            if item.timeout.is_zero() || elapsed <= self.config.operation_timeout {
                continue;
            }

            report.timed_out += 1;
            self.observer.on_timed_out(item, elapsed);
            if self.config.fail_on_no_server_response {
                let error = OperationError::OperationTimeout(format!(
                    "timed out after {elapsed:?} without a server response: {item}"
                ));
                item.operation.fail(error.clone());
                self.observer.on_failed(item, &error);
                report.failed += 1;
                remove_ids.push(item.correlation_id);
            } else {
                retry_ids.push(item.correlation_id);
            }
        }
        report.marked_for_retry = retry_ids.len();

        for id in &remove_ids {
            self.remove_operation(*id);
        }

        if let Some(channel) = channel {
            let mut pending = self.retry_pending.lock();
            for id in retry_ids {
                // Already resolved and removed by the inbound path.
                if let Some((_, item)) = self.active.remove(&id) {
                    self.observer.on_retry_scheduled(&item);
                    pending.push(item);
                }
            }

            pending.sort_by_key(OperationItem::sequence_number);
            for mut item in pending.drain(..) {
                let previous = item.correlation_id;
                item.correlation_id = Uuid::new_v4();
                item.retry_count += 1;
                item.retry_requested = false;

                if item.retries_exhausted() {
                    let error = OperationError::RetriesLimitReached {
                        operation: item.to_string(),
                        retries: item.retry_count,
                    };
                    item.operation.fail(error.clone());
                    self.observer.on_failed(&item, &error);
                    report.failed += 1;
                } else {
                    self.observer.on_retried(&item, previous);
                    self.schedule_operation(item, channel);
                    report.retried += 1;
                }
            }
            drop(pending);

            self.schedule_waiting_operations(channel);
        } else {
            // Nothing to resend on; the next sweep with a channel retries them.
            for id in retry_ids {
                self.request_retry(id);
            }
        }

        self.recount();
        Some(report)
    }

    // -- Teardown ------------------------------------------------------------

    /// Fails every tracked item with `ConnectionClosed` and empties all queues.
    pub fn clean_up(&self, cause: CloseCause) {
        let error = OperationError::connection_closed(cause);

        // Held throughout so a concurrent sweep cannot requeue past the teardown.
        let mut pending = self.retry_pending.lock();
        let _drain = self.drain_lock.lock();

        self.active.retain(|_, item| {
            self.fail_item(item, &error);
            false
        });
        while let Some(item) = self.waiting.pop() {
            self.fail_item(&item, &error);
        }
        for item in pending.drain(..) {
            self.fail_item(&item, &error);
        }
        drop(pending);

        self.total.store(0, Ordering::Release);
    }

    fn fail_item(&self, item: &OperationItem, error: &OperationError) {
        if item.operation.fail(error.clone()) {
            self.observer.on_failed(item, error);
        }
    }

    // -- Inbound path --------------------------------------------------------

    /// Routes an inbound package to the active operation with its correlation id.
    ///
    /// Returns `Ok(None)` for ids that are not active (late replies to
    /// superseded attempts, or already resolved operations). Otherwise acts on
    /// the decision and returns it: `EndOperation` removes the item, `Retry`
    /// and `Reconnect` flag it for the next sweep.
    ///
    /// # Errors
    ///
    /// Returns the operation's `ProtocolError` if the reply cannot be
    /// interpreted. The item is left untouched.
    pub fn handle_package(&self, package: &TcpPackage) -> Result<Option<InspectionResult>, ProtocolError> {
        let id = package.correlation_id;
        let inspection = {
            let Some(entry) = self.active.get(&id) else {
                return Ok(None);
            };
            entry.operation.inspect(package)?
        };

        match inspection.decision {
            InspectionDecision::EndOperation => {
                self.remove_operation(id);
            }
            InspectionDecision::Retry | InspectionDecision::Reconnect(_) => {
                self.request_retry(id);
            }
        }
        Ok(Some(inspection))
    }

    /// Snapshot of the active item with this correlation id.
    #[must_use]
    pub fn get_active_operation(&self, correlation_id: Uuid) -> Option<OperationSummary> {
        self.active.get(&correlation_id).map(|entry| entry.summary())
    }

    /// Drops an active item without resolving it. Returns `false` if the id
    /// is not active.
    pub fn remove_operation(&self, correlation_id: Uuid) -> bool {
        let Some((_, item)) = self.active.remove(&correlation_id) else {
            return false;
        };
        self.observer.on_removed(&item);
        self.recount();
        true
    }

    /// Flags an active item to be resent by the next sweep.
    pub fn request_retry(&self, correlation_id: Uuid) -> bool {
        match self.active.get_mut(&correlation_id) {
            Some(mut entry) => {
                entry.retry_requested = true;
                true
            }
            None => false,
        }
    }

    // -- Counters ------------------------------------------------------------

    #[must_use]
    pub fn active_count(&self) -> usize {
        self.active.len()
    }

    #[must_use]
    pub fn waiting_count(&self) -> usize {
        self.waiting.len()
    }

    #[must_use]
    pub fn retry_pending_count(&self) -> usize {
        self.retry_pending.lock().len()
    }

    /// Active plus waiting, as of the last scheduling pass.
    #[must_use]
    pub fn total_operation_count(&self) -> usize {
        self.total.load(Ordering::Acquire)
    }

    fn recount(&self) {
        self.total
            .store(self.active.len() + self.waiting.len(), Ordering::Release);
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
