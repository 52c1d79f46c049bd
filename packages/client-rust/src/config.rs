//! Client configuration types.

use std::net::SocketAddr;
use std::time::Duration;

use eventwire_core::UserCredentials;

/// Controls operation timeouts, concurrency limits, and retry policy.
#[derive(Debug, Clone)]
pub struct OperationConfig {
    /// How long an operation may stay in flight without a reply before the
    /// timeout sweep retries or fails it.
    pub operation_timeout: Duration,
    /// Interval between timeout sweeps.
    pub operation_timeout_check_interval: Duration,
    /// Maximum number of operations in flight on the connection at once.
    pub max_concurrent_operations: usize,
    /// Retry ceiling applied to new operations. Negative means unlimited.
    pub max_operation_retries: i32,
    /// Fail timed-out operations instead of retrying them.
    pub fail_on_no_server_response: bool,
    /// Ask the server to reject writes and reads on non-master nodes.
    pub require_master: bool,
    /// Credentials for operations that do not carry their own.
    pub default_credentials: Option<UserCredentials>,
}

impl Default for OperationConfig {
    fn default() -> Self {
        Self {
            operation_timeout: Duration::from_secs(7),
            operation_timeout_check_interval: Duration::from_secs(1),
            max_concurrent_operations: 5000,
            max_operation_retries: 10,
            fail_on_no_server_response: false,
            require_master: true,
            default_credentials: None,
        }
    }
}

/// Configuration of the static (single node) discoverer.
///
/// No `Default` impl because a node address has no sensible default.
#[derive(Debug, Clone)]
pub struct StaticNodeSettings {
    pub address: SocketAddr,
    /// Resolve to the TLS endpoint instead of the plaintext one.
    pub tls: bool,
}

/// Configuration of the bundled mpsc-backed channel.
#[derive(Debug, Clone)]
pub struct ChannelConfig {
    /// Bounded mpsc capacity for outbound packages.
    pub outbound_capacity: usize,
}

impl Default for ChannelConfig {
    fn default() -> Self {
        Self {
            outbound_capacity: 256,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn operation_config_defaults() {
        let config = OperationConfig::default();
        assert_eq!(config.operation_timeout, Duration::from_secs(7));
        assert_eq!(config.operation_timeout_check_interval, Duration::from_secs(1));
        assert_eq!(config.max_concurrent_operations, 5000);
        assert_eq!(config.max_operation_retries, 10);
        assert!(!config.fail_on_no_server_response);
        assert!(config.require_master);
        assert!(config.default_credentials.is_none());
    }

    #[test]
    fn channel_config_defaults() {
        assert_eq!(ChannelConfig::default().outbound_capacity, 256);
    }
}
