//! Node discovery: which server the connection should target next.
//!
//! The connection layer calls [`EndPointDiscoverer::discover`] before every
//! (re)connect, passing the address that just failed, if any. Only the static
//! discoverer lives here; cluster discoverers implement the same trait.

use std::fmt;
use std::net::SocketAddr;

use async_trait::async_trait;
use eventwire_core::messages::MasterInfo;

use crate::config::StaticNodeSettings;
use crate::error::DiscoveryError;

// ---------------------------------------------------------------------------
// EndPoint
// ---------------------------------------------------------------------------

/// A host name or IP literal plus a port, resolved only when connecting.
///
/// Cluster nodes advertise DNS names, so endpoints keep the host as given.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct EndPoint {
    host: String,
    port: u16,
}

impl EndPoint {
    #[must_use]
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
        }
    }

    #[must_use]
    pub fn host(&self) -> &str {
        &self.host
    }

    #[must_use]
    pub fn port(&self) -> u16 {
        self.port
    }

    /// Resolves the host through the system resolver. IP literals resolve
    /// without a lookup.
    ///
    /// # Errors
    ///
    /// Returns `DiscoveryError::InvalidAddress` if the lookup fails and
    /// `DiscoveryError::NotFound` if it yields no address.
    pub async fn resolve(&self) -> Result<SocketAddr, DiscoveryError> {
        let mut addresses = tokio::net::lookup_host((self.host.as_str(), self.port))
            .await
            .map_err(|err| DiscoveryError::InvalidAddress {
                address: self.to_string(),
                reason: err.to_string(),
            })?;
        addresses
            .next()
            .ok_or_else(|| DiscoveryError::NotFound(format!("{self} resolved to no address")))
    }

    fn parse(host: &str, port: u16) -> Result<Self, DiscoveryError> {
        let host = host.trim();
        if host.is_empty() {
            return Err(DiscoveryError::InvalidAddress {
                address: format!(":{port}"),
                reason: "empty host".into(),
            });
        }
        Ok(Self::new(host, port))
    }
}

impl From<SocketAddr> for EndPoint {
    fn from(address: SocketAddr) -> Self {
        Self::new(address.ip().to_string(), address.port())
    }
}

impl fmt::Display for EndPoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.host.contains(':') {
            write!(f, "[{}]:{}", self.host, self.port)
        } else {
            write!(f, "{}:{}", self.host, self.port)
        }
    }
}

// ---------------------------------------------------------------------------
// NodeEndPoints
// ---------------------------------------------------------------------------

/// Endpoints of one node. Exactly one of the plaintext and TLS addresses
/// is populated.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct NodeEndPoints {
    endpoint: EndPoint,
    secure: bool,
}

impl NodeEndPoints {
    #[must_use]
    pub fn plaintext(endpoint: impl Into<EndPoint>) -> Self {
        Self {
            endpoint: endpoint.into(),
            secure: false,
        }
    }

    #[must_use]
    pub fn secure(endpoint: impl Into<EndPoint>) -> Self {
        Self {
            endpoint: endpoint.into(),
            secure: true,
        }
    }

    /// Plaintext endpoint, if this node is reached without TLS.
    #[must_use]
    pub fn tcp(&self) -> Option<&EndPoint> {
        (!self.secure).then_some(&self.endpoint)
    }

    /// TLS endpoint, if this node is reached over TLS.
    #[must_use]
    pub fn secure_tcp(&self) -> Option<&EndPoint> {
        self.secure.then_some(&self.endpoint)
    }

    /// The populated endpoint, whichever it is.
    #[must_use]
    pub fn endpoint(&self) -> &EndPoint {
        &self.endpoint
    }

    #[must_use]
    pub fn is_secure(&self) -> bool {
        self.secure
    }

    /// Endpoints advertised by a `NotMaster` reply. The TLS endpoint wins
    /// when the master advertises one.
    ///
    /// # Errors
    ///
    /// Returns `DiscoveryError::InvalidAddress` if the advertised host is empty.
    pub fn from_master_info(info: &MasterInfo) -> Result<Self, DiscoveryError> {
        match (&info.external_secure_tcp_address, info.external_secure_tcp_port) {
            (Some(host), Some(port)) => EndPoint::parse(host, port).map(Self::secure),
            _ => EndPoint::parse(&info.external_tcp_address, info.external_tcp_port)
                .map(Self::plaintext),
        }
    }
}

impl fmt::Display for NodeEndPoints {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_secure() {
            write!(f, "tls://{}", self.endpoint)
        } else {
            write!(f, "tcp://{}", self.endpoint)
        }
    }
}

// ---------------------------------------------------------------------------
// Discoverers
// ---------------------------------------------------------------------------

/// Resolves the node to connect to.
#[async_trait]
pub trait EndPointDiscoverer: Send + Sync {
    /// Resolves the next target. `failed` is the endpoint whose connection
    /// just failed, or `None` on the first connect.
    async fn discover(&self, failed: Option<&EndPoint>) -> Result<NodeEndPoints, DiscoveryError>;
}

/// Always resolves to one preconfigured node.
#[derive(Debug, Clone)]
pub struct StaticEndPointDiscoverer {
    endpoints: NodeEndPoints,
}

impl StaticEndPointDiscoverer {
    #[must_use]
    pub fn new(settings: &StaticNodeSettings) -> Self {
        let endpoints = if settings.tls {
            NodeEndPoints::secure(settings.address)
        } else {
            NodeEndPoints::plaintext(settings.address)
        };
        Self { endpoints }
    }
}

#[async_trait]
impl EndPointDiscoverer for StaticEndPointDiscoverer {
    async fn discover(&self, _failed: Option<&EndPoint>) -> Result<NodeEndPoints, DiscoveryError> {
        Ok(self.endpoints.clone())
    }
}
