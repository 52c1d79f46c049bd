//! Payload schemas for every command the client sends or expects.
//!
//! Bodies are encoded as named `MsgPack` maps (`rmp_serde::to_vec_named()`)
//! with camelCase field names. Result codes are kept as raw `i32` fields and
//! interpreted through [`OperationResult::from_code`] and friends.

pub mod control;
pub mod read;
pub mod result;
pub mod transaction;
pub mod write;

use bytes::Bytes;
use serde::de::DeserializeOwned;
use serde::Serialize;
use thiserror::Error;

pub use control::{MasterInfo, NotHandled};
pub use read::{EventRecord, ReadEvent, ReadEventCompleted, ResolvedIndexedEvent};
pub use result::{NotHandledReason, OperationResult, ReadEventResult};
pub use transaction::{
    TransactionCommit, TransactionCommitCompleted, TransactionStart, TransactionStartCompleted,
    TransactionWrite, TransactionWriteCompleted,
};
pub use write::{DeleteStream, DeleteStreamCompleted, NewEvent, WriteEvents, WriteEventsCompleted};

/// Failure to encode or decode a payload body.
#[derive(Debug, Error)]
pub enum PayloadError {
    #[error("failed to encode payload: {0}")]
    Encode(#[from] rmp_serde::encode::Error),
    #[error("failed to decode payload: {0}")]
    Decode(#[from] rmp_serde::decode::Error),
}

/// Encodes a payload body.
///
/// # Errors
///
/// Returns `PayloadError::Encode` if the value cannot be represented.
pub fn encode<T: Serialize>(message: &T) -> Result<Bytes, PayloadError> {
    Ok(Bytes::from(rmp_serde::to_vec_named(message)?))
}

/// Decodes a payload body.
///
/// # Errors
///
/// Returns `PayloadError::Decode` if the bytes do not match the schema of `T`.
pub fn decode<T: DeserializeOwned>(data: &[u8]) -> Result<T, PayloadError> {
    Ok(rmp_serde::from_slice(data)?)
}

#[cfg(test)]
mod tests {
    use uuid::Uuid;

    use super::*;
    use crate::types::{EventData, RecordedEvent};

    #[test]
    fn field_names_are_camel_case() {
        let body = encode(&DeleteStream {
            event_stream_id: "orders".into(),
            expected_version: 3,
            require_master: true,
            hard_delete: false,
        })
        .expect("encode");

        let raw: rmpv::Value = rmpv::decode::read_value(&mut &body[..]).expect("decode as Value");
        let keys: Vec<&str> = raw
            .as_map()
            .expect("top-level map")
            .iter()
            .filter_map(|(k, _)| k.as_str())
            .collect();
        assert_eq!(
            keys,
            ["eventStreamId", "expectedVersion", "requireMaster", "hardDelete"]
        );
    }

    #[test]
    fn absent_positions_decode_as_none() {
        #[derive(Serialize)]
        #[serde(rename_all = "camelCase")]
        struct Minimal {
            result: i32,
        }

        let body = encode(&Minimal { result: 5 }).expect("encode");
        let completed: DeleteStreamCompleted = decode(&body).expect("decode");
        assert_eq!(completed.result, OperationResult::StreamDeleted.code());
        assert!(completed.commit_position.is_none());
        assert!(completed.prepare_position.is_none());
    }

    #[test]
    fn wrong_schema_is_a_decode_error() {
        let body = encode(&"not a map").expect("encode");
        let err = decode::<WriteEventsCompleted>(&body).unwrap_err();
        assert!(matches!(err, PayloadError::Decode(_)));
    }

    #[test]
    fn new_event_content_type_follows_json_flag() {
        let json = NewEvent::from(&EventData::json("created", b"{}".to_vec()));
        assert_eq!(json.data_content_type, 1);
        let binary = NewEvent::from(&EventData::binary("created", vec![0u8]));
        assert_eq!(binary.data_content_type, 0);
        assert_eq!(binary.metadata_content_type, 0);
    }

    #[test]
    fn event_record_converts_to_recorded_event() {
        let id = Uuid::new_v4();
        let record = EventRecord {
            event_stream_id: "orders".into(),
            event_number: 7,
            event_id: id,
            event_type: "placed".into(),
            data_content_type: 1,
            metadata_content_type: 0,
            data: b"{}".to_vec(),
            metadata: Vec::new(),
            created_epoch: Some(1_700_000_000_000),
        };
        let body = encode(&record).expect("encode");
        let event = RecordedEvent::from(decode::<EventRecord>(&body).expect("decode"));
        assert_eq!(event.event_id, id);
        assert_eq!(event.event_number, 7);
        assert!(event.is_json);
        assert_eq!(event.created_epoch_ms, Some(1_700_000_000_000));
    }
}
