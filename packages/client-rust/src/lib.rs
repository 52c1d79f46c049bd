//! `eventwire` Client — operation manager, per-command operations, discovery, and the timeout worker.

pub mod channel;
pub mod client;
pub mod config;
pub mod discovery;
pub mod error;
pub mod manager;
pub mod operation;
pub mod worker;

#[cfg(test)]
pub(crate) mod testing;

pub use channel::{Channel, ChannelId, CurrentChannel, MpscChannel};
pub use client::OperationClient;
pub use config::{ChannelConfig, OperationConfig, StaticNodeSettings};
pub use discovery::{EndPoint, EndPointDiscoverer, NodeEndPoints, StaticEndPointDiscoverer};
pub use error::{ChannelError, CloseCause, DiscoveryError, OperationError, ProtocolError};
pub use manager::{
    CompositeObserver, OperationItem, OperationManager, OperationObserver, OperationSummary,
    SweepReport, TracingObserver,
};
pub use operation::{InspectionDecision, InspectionResult, Operation, OperationFuture};
pub use worker::{BackgroundRunnable, BackgroundWorker, SweepTask, TimeoutSweeper};

