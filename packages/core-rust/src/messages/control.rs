//! Envelope-level replies that any request may receive.

use serde::{Deserialize, Serialize};

/// Body of `NotHandled`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NotHandled {
    /// A [`NotHandledReason`](super::NotHandledReason) code.
    pub reason: i32,
    /// Present when `reason` is `NotMaster`.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub master_info: Option<MasterInfo>,
}

/// Where the current master can be reached.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MasterInfo {
    pub external_tcp_address: String,
    pub external_tcp_port: u16,
    pub external_http_address: String,
    pub external_http_port: u16,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub external_secure_tcp_address: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub external_secure_tcp_port: Option<u16>,
}
