//! Single-event read payloads.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::types::{RecordedEvent, ResolvedEvent};

/// Body of `ReadEvent`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReadEvent {
    pub event_stream_id: String,
    /// Event number to read; `-1` reads the last event of the stream.
    pub event_number: i64,
    pub resolve_link_tos: bool,
    pub require_master: bool,
}

/// A stored event as it appears on the wire.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventRecord {
    pub event_stream_id: String,
    pub event_number: i64,
    pub event_id: Uuid,
    pub event_type: String,
    pub data_content_type: i32,
    pub metadata_content_type: i32,
    #[serde(with = "serde_bytes")]
    pub data: Vec<u8>,
    #[serde(with = "serde_bytes", default)]
    pub metadata: Vec<u8>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub created_epoch: Option<i64>,
}

impl From<EventRecord> for RecordedEvent {
    fn from(record: EventRecord) -> Self {
        Self {
            stream_id: record.event_stream_id,
            event_id: record.event_id,
            event_number: record.event_number,
            event_type: record.event_type,
            is_json: record.data_content_type == 1,
            data: record.data.into(),
            metadata: record.metadata.into(),
            created_epoch_ms: record.created_epoch,
        }
    }
}

/// An event together with the link that pointed at it, if any.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolvedIndexedEvent {
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub event: Option<EventRecord>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub link: Option<EventRecord>,
}

impl From<ResolvedIndexedEvent> for ResolvedEvent {
    fn from(indexed: ResolvedIndexedEvent) -> Self {
        Self {
            event: indexed.event.map(RecordedEvent::from),
            link: indexed.link.map(RecordedEvent::from),
        }
    }
}

/// Body of `ReadEventCompleted`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReadEventCompleted {
    pub result: i32,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub event: Option<ResolvedIndexedEvent>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub error: Option<String>,
}
