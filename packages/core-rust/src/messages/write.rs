//! Append and delete payloads.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::types::EventData;

/// A single event inside a `WriteEvents` or `TransactionWrite` request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewEvent {
    pub event_id: Uuid,
    pub event_type: String,
    /// 1 for JSON, 0 for binary.
    pub data_content_type: i32,
    pub metadata_content_type: i32,
    #[serde(with = "serde_bytes")]
    pub data: Vec<u8>,
    #[serde(with = "serde_bytes", default)]
    pub metadata: Vec<u8>,
}

impl From<&EventData> for NewEvent {
    fn from(event: &EventData) -> Self {
        let content_type = i32::from(event.is_json);
        Self {
            event_id: event.event_id,
            event_type: event.event_type.clone(),
            data_content_type: content_type,
            metadata_content_type: content_type,
            data: event.data.to_vec(),
            metadata: event.metadata.to_vec(),
        }
    }
}

/// Body of `WriteEvents`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WriteEvents {
    pub event_stream_id: String,
    pub expected_version: i64,
    pub events: Vec<NewEvent>,
    pub require_master: bool,
}

/// Body of `WriteEventsCompleted`.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WriteEventsCompleted {
    pub result: i32,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub message: Option<String>,
    pub first_event_number: i64,
    pub last_event_number: i64,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub prepare_position: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub commit_position: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub current_version: Option<i64>,
}

/// Body of `DeleteStream`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeleteStream {
    pub event_stream_id: String,
    pub expected_version: i64,
    pub require_master: bool,
    /// Hard deletes tombstone the stream; it can never be recreated.
    pub hard_delete: bool,
}

/// Body of `DeleteStreamCompleted`.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeleteStreamCompleted {
    pub result: i32,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub prepare_position: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub commit_position: Option<i64>,
}
