//! The channel abstraction the operation manager writes packages to.
//!
//! A channel is one open connection to one server node. Its [`ChannelId`]
//! is stable for the lifetime of that connection; a reconnect produces a new
//! channel with a new id, which is how the manager detects that an in-flight
//! operation was sent on a connection that no longer exists.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use arc_swap::ArcSwapOption;
use eventwire_core::TcpPackage;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;

use crate::config::ChannelConfig;
use crate::error::ChannelError;

/// Identity of one connection instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ChannelId(pub u64);

// 0 is reserved as "never sent".
static NEXT_CHANNEL_ID: AtomicU64 = AtomicU64::new(1);

impl ChannelId {
    /// Allocates a process-unique channel id.
    #[must_use]
    pub fn next() -> Self {
        Self(NEXT_CHANNEL_ID.fetch_add(1, Ordering::Relaxed))
    }
}

/// An ordered, outbound package sink bound to one server connection.
///
/// `write` must not block: the manager calls it from paths (timer, inbound
/// delivery) that must keep moving. The item is already active when `write`
/// runs, so a reply may reach [`OperationManager::handle_package`] before
/// `write` returns. `write` must not drain the waiting queue itself; the
/// manager holds its drain lock for the duration of the call.
///
/// [`OperationManager::handle_package`]: crate::manager::OperationManager::handle_package
pub trait Channel: Send + Sync {
    /// Identity of the underlying connection.
    fn id(&self) -> ChannelId;

    /// Hands a package to the connection for sending.
    ///
    /// # Errors
    ///
    /// Returns `ChannelError::Full` when the outbound buffer is full and
    /// `ChannelError::Closed` when the connection has gone away.
    fn write(&self, package: TcpPackage) -> Result<(), ChannelError>;
}

/// Channel backed by a bounded mpsc sender.
///
/// The receiver end is held by the connection's write loop, which frames
/// packages onto the socket.
#[derive(Debug)]
pub struct MpscChannel {
    id: ChannelId,
    tx: mpsc::Sender<TcpPackage>,
}

impl MpscChannel {
    /// Opens a channel with a fresh id, returning it with the package receiver.
    #[must_use]
    pub fn open(config: &ChannelConfig) -> (Self, mpsc::Receiver<TcpPackage>) {
        let (tx, rx) = mpsc::channel(config.outbound_capacity);
        let channel = Self {
            id: ChannelId::next(),
            tx,
        };
        (channel, rx)
    }

    /// Returns `false` once the write loop has dropped the receiver.
    #[must_use]
    pub fn is_connected(&self) -> bool {
        !self.tx.is_closed()
    }
}

impl Channel for MpscChannel {
    fn id(&self) -> ChannelId {
        self.id
    }

    fn write(&self, package: TcpPackage) -> Result<(), ChannelError> {
        self.tx.try_send(package).map_err(|err| match err {
            TrySendError::Full(_) => ChannelError::Full,
            TrySendError::Closed(_) => ChannelError::Closed,
        })
    }
}

/// Shared slot holding the live channel, empty while disconnected.
///
/// Cloning shares the slot. Readers take a snapshot without blocking the
/// connection task that swaps channels on reconnect.
#[derive(Clone, Default)]
pub struct CurrentChannel {
    slot: Arc<ArcSwapOption<Box<dyn Channel>>>,
}

impl CurrentChannel {
    /// Installs a new channel, returning the one it replaced.
    pub fn replace(&self, channel: Box<dyn Channel>) -> Option<Arc<Box<dyn Channel>>> {
        self.slot.swap(Some(Arc::new(channel)))
    }

    /// Empties the slot, returning the channel that was live.
    pub fn clear(&self) -> Option<Arc<Box<dyn Channel>>> {
        self.slot.swap(None)
    }

    /// Snapshot of the live channel.
    #[must_use]
    pub fn load(&self) -> Option<Arc<Box<dyn Channel>>> {
        self.slot.load_full()
    }

    #[must_use]
    pub fn id(&self) -> Option<ChannelId> {
        self.load().map(|channel| channel.id())
    }
}
