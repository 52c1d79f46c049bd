//! `OperationClient`: the application-facing entry point.
//!
//! Wires the operation manager, the live-channel slot, the discoverer, and
//! the timeout worker together. The connection layer reports channel changes
//! through [`OperationClient::connected`] / [`OperationClient::disconnected`]
//! and feeds inbound packages to [`OperationClient::handle_package`].

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use bytes::Bytes;
use eventwire_core::{
    DeleteResult, EventData, EventReadResult, TcpCommand, TcpPackage, UserCredentials,
    WriteResult,
};
use parking_lot::Mutex;
use uuid::Uuid;

use crate::channel::{Channel, ChannelId, CurrentChannel};
use crate::config::OperationConfig;
use crate::discovery::{EndPoint, EndPointDiscoverer, NodeEndPoints};
use crate::error::{CloseCause, DiscoveryError, OperationError, ProtocolError};
use crate::manager::{OperationItem, OperationManager, OperationObserver, TracingObserver};
use crate::operation::{
    AppendToStream, CommitTransaction, DeleteStream, InspectionDecision, InspectionResult,
    Operation, OperationFuture, OperationKind, PendingOperation, ReadEvent, StartTransaction,
    TransactionalWrite,
};
use crate::worker::{BackgroundWorker, SweepTask, TimeoutSweeper};

/// Issues operations over whatever connection is currently live.
pub struct OperationClient {
    config: OperationConfig,
    manager: Arc<OperationManager>,
    channel: CurrentChannel,
    discoverer: Arc<dyn EndPointDiscoverer>,
    sweeper: tokio::sync::Mutex<BackgroundWorker<TimeoutSweeper>>,
    closed: AtomicBool,
    close_cause: Mutex<Option<CloseCause>>,
}

impl OperationClient {
    /// Creates the client and starts its timeout worker. Must be called from
    /// within a tokio runtime.
    #[must_use]
    pub fn new(config: OperationConfig, discoverer: Arc<dyn EndPointDiscoverer>) -> Self {
        Self::with_observer(config, discoverer, Arc::new(TracingObserver))
    }

    #[must_use]
    pub fn with_observer(
        config: OperationConfig,
        discoverer: Arc<dyn EndPointDiscoverer>,
        observer: Arc<dyn OperationObserver>,
    ) -> Self {
        let manager = Arc::new(OperationManager::with_observer(config.clone(), observer));
        let channel = CurrentChannel::default();
        let sweeper = BackgroundWorker::start(
            TimeoutSweeper::new(Arc::clone(&manager), channel.clone()),
            config.operation_timeout_check_interval,
        );
        Self {
            config,
            manager,
            channel,
            discoverer,
            sweeper: tokio::sync::Mutex::new(sweeper),
            closed: AtomicBool::new(false),
            close_cause: Mutex::new(None),
        }
    }

    #[must_use]
    pub fn manager(&self) -> &Arc<OperationManager> {
        &self.manager
    }

    #[must_use]
    pub fn channel_id(&self) -> Option<ChannelId> {
        self.channel.id()
    }

    // -- Operations ------------------------------------------------------------

    pub fn append_to_stream(
        &self,
        stream: impl Into<String>,
        expected_version: i64,
        events: Vec<EventData>,
        credentials: Option<UserCredentials>,
    ) -> OperationFuture<WriteResult> {
        let kind = AppendToStream::new(stream, expected_version, events, self.config.require_master);
        self.submit(kind, credentials)
    }

    pub fn delete_stream(
        &self,
        stream: impl Into<String>,
        expected_version: i64,
        hard_delete: bool,
        credentials: Option<UserCredentials>,
    ) -> OperationFuture<DeleteResult> {
        let kind = DeleteStream::new(stream, expected_version, hard_delete, self.config.require_master);
        self.submit(kind, credentials)
    }

    /// Resolves to the server-assigned transaction id.
    pub fn start_transaction(
        &self,
        stream: impl Into<String>,
        expected_version: i64,
        credentials: Option<UserCredentials>,
    ) -> OperationFuture<i64> {
        let kind = StartTransaction::new(stream, expected_version, self.config.require_master);
        self.submit(kind, credentials)
    }

    pub fn transactional_write(
        &self,
        transaction_id: i64,
        events: Vec<EventData>,
        credentials: Option<UserCredentials>,
    ) -> OperationFuture<()> {
        let kind = TransactionalWrite::new(transaction_id, events, self.config.require_master);
        self.submit(kind, credentials)
    }

    pub fn commit_transaction(
        &self,
        transaction_id: i64,
        credentials: Option<UserCredentials>,
    ) -> OperationFuture<WriteResult> {
        let kind = CommitTransaction::new(transaction_id, self.config.require_master);
        self.submit(kind, credentials)
    }

    pub fn read_event(
        &self,
        stream: impl Into<String>,
        event_number: i64,
        resolve_link_tos: bool,
        credentials: Option<UserCredentials>,
    ) -> OperationFuture<EventReadResult> {
        let kind = ReadEvent::new(stream, event_number, resolve_link_tos, self.config.require_master);
        self.submit(kind, credentials)
    }

    fn submit<K: OperationKind>(
        &self,
        kind: K,
        credentials: Option<UserCredentials>,
    ) -> OperationFuture<K::Output> {
        let credentials = credentials.or_else(|| self.config.default_credentials.clone());
        let (operation, future) = PendingOperation::new(kind, credentials);

        if self.closed.load(Ordering::SeqCst) {
            operation.fail(OperationError::connection_closed(self.cause()));
            return future;
        }

        let item = OperationItem::new(
            Box::new(operation),
            self.config.max_operation_retries,
            self.config.operation_timeout,
        );
        self.track(item);
        future
    }

    fn track(&self, item: OperationItem) {
        match self.channel.load() {
            Some(channel) => self.manager.schedule_operation(item, &**channel),
            None => self.manager.enqueue_operation(item),
        }
        // A close that ran after the check in `submit` may already have
        // cleaned up, leaving this item behind.
        if self.closed.load(Ordering::SeqCst) {
            self.manager.clean_up(self.cause());
        }
    }

    fn cause(&self) -> CloseCause {
        self.close_cause.lock().clone().unwrap_or_else(client_closed)
    }

    // -- Connection events -----------------------------------------------------

    /// Installs a newly connected channel and sweeps at once, so operations
    /// sent on the previous channel are resent and queued ones dispatched.
    ///
    /// # Errors
    ///
    /// Returns an error if the client has been closed.
    pub async fn connected(&self, channel: Box<dyn Channel>) -> anyhow::Result<()> {
        if self.closed.load(Ordering::SeqCst) {
            anyhow::bail!("client is closed");
        }
        let id = channel.id();
        if let Some(previous) = self.channel.replace(channel) {
            tracing::debug!(previous = previous.id().0, current = id.0, "channel replaced");
        }
        self.sweeper.lock().await.submit(SweepTask::CheckNow).await
    }

    /// Forgets the live channel. Active operations stay tracked and are
    /// resent once a new channel connects.
    pub fn disconnected(&self) {
        if let Some(previous) = self.channel.clear() {
            tracing::debug!(channel = previous.id().0, "channel disconnected");
        }
    }

    /// Resolves the node to connect to next.
    ///
    /// # Errors
    ///
    /// Propagates the discoverer's error.
    pub async fn discover_node(
        &self,
        failed: Option<&EndPoint>,
    ) -> Result<NodeEndPoints, DiscoveryError> {
        let endpoints = self.discoverer.discover(failed).await?;
        tracing::debug!(%endpoints, failed = ?failed.map(ToString::to_string), "discovered node");
        Ok(endpoints)
    }

    /// Routes a reply whose command byte has not been validated yet.
    ///
    /// # Errors
    ///
    /// Returns `ProtocolError::UnknownCommand` for command bytes this client
    /// does not know, otherwise whatever [`Self::handle_package`] returns.
    pub fn handle_frame(
        &self,
        command: u8,
        correlation_id: Uuid,
        data: Bytes,
    ) -> Result<Option<InspectionResult>, ProtocolError> {
        let command = TcpCommand::try_from(command).map_err(|err| {
            tracing::error!(%correlation_id, error = %err, "unknown command in server reply");
            ProtocolError::from(err)
        })?;
        self.handle_package(&TcpPackage::new(command, correlation_id, data))
    }

    /// Routes an inbound reply to its operation.
    ///
    /// A completed operation frees a concurrency slot, so the waiting queue is
    /// drained right away. A `Reconnect` decision is returned for the
    /// connection layer to act on.
    ///
    /// # Errors
    ///
    /// Returns the `ProtocolError` for replies that cannot be interpreted.
    pub fn handle_package(
        &self,
        package: &TcpPackage,
    ) -> Result<Option<InspectionResult>, ProtocolError> {
        let inspection = match self.manager.handle_package(package) {
            Ok(inspection) => inspection,
            Err(err) => {
                tracing::error!(
                    correlation_id = %package.correlation_id,
                    command = %package.command,
                    error = %err,
                    "protocol defect in server reply"
                );
                return Err(err);
            }
        };

        if let Some(InspectionResult {
            decision: InspectionDecision::EndOperation,
            ..
        }) = &inspection
        {
            if let Some(channel) = self.channel.load() {
                self.manager.schedule_waiting_operations(&**channel);
            }
        }
        Ok(inspection)
    }

    /// Fails every tracked operation with `ConnectionClosed { cause }` and
    /// stops the timeout worker. Later operations fail immediately.
    pub async fn close(&self, cause: CloseCause) {
        if self.closed.swap(true, Ordering::SeqCst) {
            return;
        }
        *self.close_cause.lock() = Some(Arc::clone(&cause));
        self.channel.clear();

        let mut sweeper = self.sweeper.lock().await;
        if sweeper
            .submit(SweepTask::CleanUp(Arc::clone(&cause)))
            .await
            .is_err()
        {
            self.manager.clean_up(cause);
        }
        sweeper.stop().await;
    }
}

fn client_closed() -> CloseCause {
    Arc::new(std::io::Error::new(
        std::io::ErrorKind::NotConnected,
        "client is closed",
    ))
}
