//! Error types surfaced by the client.
//!
//! - [`OperationError`]: terminal outcomes delivered through an operation's future.
//! - [`ProtocolError`]: defects in a server reply, returned to the inbound caller.
//! - [`ChannelError`]: a channel refused a package.
//! - [`DiscoveryError`]: no node could be resolved.

use std::sync::Arc;

use eventwire_core::{PayloadError, TcpCommand, UnknownCommand};

/// Cause attached to [`OperationError::ConnectionClosed`].
pub type CloseCause = Arc<dyn std::error::Error + Send + Sync>;

/// Terminal failure of a single operation.
///
/// Cloneable so one cause can fail every tracked operation at once.
#[derive(Debug, Clone, thiserror::Error)]
pub enum OperationError {
    #[error("wrong expected version: {0}")]
    WrongExpectedVersion(String),
    #[error("stream deleted: {0}")]
    StreamDeleted(String),
    #[error("invalid transaction: {0}")]
    InvalidTransaction(String),
    #[error("access denied: {0}")]
    AccessDenied(String),
    #[error("not authenticated: {0}")]
    NotAuthenticated(String),
    #[error("server error: {0}")]
    ServerError(String),
    #[error("operation timed out: {0}")]
    OperationTimeout(String),
    #[error("retries limit reached after {retries} retries: {operation}")]
    RetriesLimitReached { operation: String, retries: u32 },
    #[error("connection was closed")]
    ConnectionClosed {
        #[source]
        cause: CloseCause,
    },
    #[error("failed to encode request: {0}")]
    Encode(String),
    #[error("operation was dropped before it completed")]
    Abandoned,
}

impl OperationError {
    #[must_use]
    pub fn connection_closed(cause: CloseCause) -> Self {
        Self::ConnectionClosed { cause }
    }
}

/// A reply that the client cannot interpret.
///
/// These are never retried and never converted into an [`OperationError`];
/// they indicate a protocol revision mismatch or a server defect.
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    #[error("command not expected: expected {expected}, got {actual}")]
    UnexpectedCommand {
        expected: TcpCommand,
        actual: TcpCommand,
    },
    #[error("unexpected result code {code} for {operation}")]
    UnexpectedResult { operation: &'static str, code: i32 },
    #[error(transparent)]
    UnknownCommand(#[from] UnknownCommand),
    #[error(transparent)]
    Payload(#[from] PayloadError),
}

/// A channel refused a package.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum ChannelError {
    /// The outbound buffer is full.
    #[error("channel is full")]
    Full,
    /// The connection behind the channel has gone away.
    #[error("channel is closed")]
    Closed,
}

/// Node discovery failed.
#[derive(Debug, thiserror::Error)]
pub enum DiscoveryError {
    #[error("no node endpoint could be discovered: {0}")]
    NotFound(String),
    #[error("invalid node address {address}: {reason}")]
    InvalidAddress { address: String, reason: String },
}

#[cfg(test)]
mod tests {
    use std::error::Error as _;

    use super::*;

    #[test]
    fn connection_closed_exposes_cause() {
        let io = std::io::Error::new(std::io::ErrorKind::ConnectionReset, "peer reset");
        let err = OperationError::connection_closed(Arc::new(io) as CloseCause);
        assert_eq!(err.to_string(), "connection was closed");
        assert_eq!(err.source().map(ToString::to_string).as_deref(), Some("peer reset"));
    }

    #[test]
    fn retries_limit_message_names_operation() {
        let err = OperationError::RetriesLimitReached {
            operation: "Stream: orders".into(),
            retries: 3,
        };
        assert_eq!(
            err.to_string(),
            "retries limit reached after 3 retries: Stream: orders"
        );
    }

    #[test]
    fn unexpected_command_is_descriptive() {
        let err = ProtocolError::UnexpectedCommand {
            expected: TcpCommand::DeleteStreamCompleted,
            actual: TcpCommand::WriteEventsCompleted,
        };
        assert_eq!(
            err.to_string(),
            "command not expected: expected DeleteStreamCompleted, got WriteEventsCompleted"
        );
    }
}
