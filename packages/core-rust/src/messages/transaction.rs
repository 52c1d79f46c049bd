//! Explicit transaction payloads: start, write, commit.

use serde::{Deserialize, Serialize};

use super::write::NewEvent;

/// Body of `TransactionStart`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionStart {
    pub event_stream_id: String,
    pub expected_version: i64,
    pub require_master: bool,
}

/// Body of `TransactionStartCompleted`.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionStartCompleted {
    pub transaction_id: i64,
    pub result: i32,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub message: Option<String>,
}

/// Body of `TransactionWrite`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionWrite {
    pub transaction_id: i64,
    pub events: Vec<NewEvent>,
    pub require_master: bool,
}

/// Body of `TransactionWriteCompleted`.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionWriteCompleted {
    pub transaction_id: i64,
    pub result: i32,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub message: Option<String>,
}

/// Body of `TransactionCommit`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionCommit {
    pub transaction_id: i64,
    pub require_master: bool,
}

/// Body of `TransactionCommitCompleted`.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionCommitCompleted {
    pub transaction_id: i64,
    pub result: i32,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub message: Option<String>,
    pub first_event_number: i64,
    pub last_event_number: i64,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub prepare_position: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub commit_position: Option<i64>,
}
