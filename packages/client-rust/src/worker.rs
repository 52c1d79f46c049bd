//! Background worker that drives the timeout sweep.
//!
//! Provides a generic `BackgroundWorker<R>` that processes tasks from an mpsc
//! channel via a `BackgroundRunnable`, with a periodic tick. The
//! [`TimeoutSweeper`] runnable ticks at the operation timeout check interval.
//! Because a single task owns the sweeper, sweeps never overlap.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::{mpsc, oneshot};
use tokio::time::MissedTickBehavior;

use crate::channel::{Channel, CurrentChannel};
use crate::error::CloseCause;
use crate::manager::OperationManager;

const TASK_CAPACITY: usize = 64;

// ---------------------------------------------------------------------------
// BackgroundRunnable trait
// ---------------------------------------------------------------------------

/// Task handler executed by `BackgroundWorker`.
#[async_trait]
pub trait BackgroundRunnable: Send + 'static {
    type Task: Send + 'static;

    /// Process a single task.
    async fn run(&mut self, task: Self::Task);

    /// Called on each tick. Default is a no-op.
    async fn on_tick(&mut self) {}

    /// Called once when the worker is shutting down. Default is a no-op.
    async fn shutdown(&mut self) {}
}

// ---------------------------------------------------------------------------
// TimeoutSweeper
// ---------------------------------------------------------------------------

/// On-demand work for the sweeper.
#[derive(Debug)]
pub enum SweepTask {
    /// Sweep now instead of waiting for the next tick (e.g. after a reconnect).
    CheckNow,
    /// Fail and forget every tracked operation.
    CleanUp(CloseCause),
}

/// Runs `check_timeouts_and_retry` against whatever channel is live.
pub struct TimeoutSweeper {
    manager: Arc<OperationManager>,
    channel: CurrentChannel,
}

impl TimeoutSweeper {
    #[must_use]
    pub fn new(manager: Arc<OperationManager>, channel: CurrentChannel) -> Self {
        Self { manager, channel }
    }

    fn sweep(&self) {
        let channel = self.channel.load();
        let live: Option<&dyn Channel> = channel.as_deref().map(|boxed| &**boxed);
        let report = self.manager.check_timeouts_and_retry(live);
        if let Some(report) = report {
            if report.timed_out + report.retried + report.failed > 0 {
                tracing::debug!(
                    timed_out = report.timed_out,
                    retried = report.retried,
                    failed = report.failed,
                    "timeout sweep"
                );
            }
        }
    }
}

#[async_trait]
impl BackgroundRunnable for TimeoutSweeper {
    type Task = SweepTask;

    async fn run(&mut self, task: SweepTask) {
        match task {
            SweepTask::CheckNow => self.sweep(),
            SweepTask::CleanUp(cause) => self.manager.clean_up(cause),
        }
    }

    async fn on_tick(&mut self) {
        self.sweep();
    }

    async fn shutdown(&mut self) {
        tracing::debug!(
            remaining = self.manager.total_operation_count(),
            "timeout sweeper stopped"
        );
    }
}

// ---------------------------------------------------------------------------
// BackgroundWorker
// ---------------------------------------------------------------------------

/// Generic background worker that processes tasks via an mpsc channel.
///
/// The worker spawns a tokio task that:
/// 1. Listens for tasks on the mpsc channel
/// 2. Calls `BackgroundRunnable::run()` for each task
/// 3. Calls `BackgroundRunnable::on_tick()` at the configured interval
/// 4. Calls `BackgroundRunnable::shutdown()` when stopped
pub struct BackgroundWorker<R: BackgroundRunnable> {
    tx: Option<mpsc::Sender<R::Task>>,
    shutdown_tx: Option<oneshot::Sender<()>>,
    handle: Option<tokio::task::JoinHandle<()>>,
}

impl<R: BackgroundRunnable> BackgroundWorker<R> {
    /// Spawns the worker. Must be called from within a tokio runtime.
    #[must_use]
    pub fn start(mut runnable: R, tick_interval: Duration) -> Self {
        let (tx, mut rx) = mpsc::channel::<R::Task>(TASK_CAPACITY);
        let (shutdown_tx, mut shutdown_rx) = oneshot::channel::<()>();

        let handle = tokio::spawn(async move {
            let mut ticks = tokio::time::interval(tick_interval);
            ticks.set_missed_tick_behavior(MissedTickBehavior::Delay);
            // Skip the immediate first tick.
            ticks.tick().await;

            loop {
                tokio::select! {
                    task = rx.recv() => {
                        match task {
                            Some(task) => runnable.run(task).await,
                            None => break,
                        }
                    }
                    _ = ticks.tick() => {
                        runnable.on_tick().await;
                    }
                    _ = &mut shutdown_rx => {
                        break;
                    }
                }
            }

            // Tasks submitted before stop() still run.
            while let Ok(task) = rx.try_recv() {
                runnable.run(task).await;
            }
            runnable.shutdown().await;
        });

        Self {
            tx: Some(tx),
            shutdown_tx: Some(shutdown_tx),
            handle: Some(handle),
        }
    }

    /// Submit a task to the worker.
    ///
    /// # Errors
    ///
    /// Returns an error if the worker has been stopped.
    pub async fn submit(&self, task: R::Task) -> anyhow::Result<()> {
        match &self.tx {
            Some(tx) => tx
                .send(task)
                .await
                .map_err(|_| anyhow::anyhow!("worker channel closed")),
            None => Err(anyhow::anyhow!("worker not running")),
        }
    }

    #[must_use]
    pub fn is_running(&self) -> bool {
        self.handle.as_ref().is_some_and(|handle| !handle.is_finished())
    }

    /// Stop the worker, waiting for the worker task to finish.
    pub async fn stop(&mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
        self.tx.take();
        if let Some(handle) = self.handle.take() {
            let _ = handle.await;
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicU32, Ordering};

    use super::*;
    use crate::config::OperationConfig;
    use crate::error::OperationError;
    use crate::testing::{delete_item, RecordingChannel};

    struct CountingRunnable {
        run_count: Arc<AtomicU32>,
        tick_count: Arc<AtomicU32>,
        shutdown_called: Arc<AtomicU32>,
    }

    impl CountingRunnable {
        fn new() -> (Self, [Arc<AtomicU32>; 3]) {
            let counters = [
                Arc::new(AtomicU32::new(0)),
                Arc::new(AtomicU32::new(0)),
                Arc::new(AtomicU32::new(0)),
            ];
            let runnable = Self {
                run_count: counters[0].clone(),
                tick_count: counters[1].clone(),
                shutdown_called: counters[2].clone(),
            };
            (runnable, counters)
        }
    }

    #[async_trait]
    impl BackgroundRunnable for CountingRunnable {
        type Task = u32;

        async fn run(&mut self, _task: u32) {
            self.run_count.fetch_add(1, Ordering::SeqCst);
        }

        async fn on_tick(&mut self) {
            self.tick_count.fetch_add(1, Ordering::SeqCst);
        }

        async fn shutdown(&mut self) {
            self.shutdown_called.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[tokio::test]
    async fn submitted_tasks_run_before_shutdown() {
        let (runnable, [runs, _ticks, shutdowns]) = CountingRunnable::new();
        let mut worker = BackgroundWorker::start(runnable, Duration::from_secs(60));

        for task in 0..3 {
            worker.submit(task).await.unwrap();
        }
        worker.stop().await;

        assert_eq!(runs.load(Ordering::SeqCst), 3);
        assert_eq!(shutdowns.load(Ordering::SeqCst), 1);
        assert!(!worker.is_running());
    }

    #[tokio::test(start_paused = true)]
    async fn tick_fires_periodically() {
        let (runnable, [_runs, ticks, _shutdowns]) = CountingRunnable::new();
        let mut worker = BackgroundWorker::start(runnable, Duration::from_millis(20));

        tokio::time::sleep(Duration::from_millis(100)).await;
        worker.stop().await;

        assert!(ticks.load(Ordering::SeqCst) >= 2);
    }

    #[tokio::test]
    async fn submit_after_stop_returns_error() {
        let (runnable, _counters) = CountingRunnable::new();
        let mut worker = BackgroundWorker::start(runnable, Duration::from_secs(60));
        worker.stop().await;
        assert!(worker.submit(1).await.is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn sweeper_resends_on_tick_after_reconnect() {
        let manager = Arc::new(OperationManager::new(OperationConfig::default()));
        let channel = CurrentChannel::default();

        let (item, _future) = delete_item("orders", 5);
        manager.enqueue_operation(item);

        let mut worker = BackgroundWorker::start(
            TimeoutSweeper::new(Arc::clone(&manager), channel.clone()),
            Duration::from_secs(1),
        );

        // No channel yet: the waiting item stays queued.
        tokio::time::sleep(Duration::from_millis(1500)).await;
        assert_eq!(manager.waiting_count(), 1);

        channel.replace(Box::new(RecordingChannel::new()));
        worker.submit(SweepTask::CheckNow).await.unwrap();
        tokio::time::sleep(Duration::from_millis(10)).await;
        assert_eq!(manager.active_count(), 1);
        assert_eq!(manager.waiting_count(), 0);

        worker.stop().await;
    }

    #[tokio::test]
    async fn clean_up_task_fails_everything() {
        let manager = Arc::new(OperationManager::new(OperationConfig::default()));
        let (item, future) = delete_item("orders", 5);
        manager.enqueue_operation(item);

        let mut worker = BackgroundWorker::start(
            TimeoutSweeper::new(Arc::clone(&manager), CurrentChannel::default()),
            Duration::from_secs(60),
        );
        worker
            .submit(SweepTask::CleanUp(Arc::new(std::io::Error::other("closing"))))
            .await
            .unwrap();
        worker.stop().await;

        assert_eq!(manager.total_operation_count(), 0);
        assert!(matches!(future.await, Err(OperationError::ConnectionClosed { .. })));
    }
}
