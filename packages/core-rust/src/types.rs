use std::fmt;

use bytes::Bytes;
use uuid::Uuid;

/// Expected-version sentinels understood by write-style commands.
///
/// Any non-negative value is an exact stream version.
pub struct ExpectedVersion;

impl ExpectedVersion {
    /// Write regardless of the current stream version.
    pub const ANY: i64 = -2;
    /// The stream must not exist yet.
    pub const NO_STREAM: i64 = -1;
    /// The stream must exist (any version).
    pub const STREAM_EXISTS: i64 = -4;
}

/// Two-part position in the global transaction log.
///
/// Either part is `-1` when the server did not report it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Position {
    pub commit_position: i64,
    pub prepare_position: i64,
}

impl Position {
    pub const UNKNOWN: Self = Self {
        commit_position: -1,
        prepare_position: -1,
    };

    #[must_use]
    pub fn new(commit_position: i64, prepare_position: i64) -> Self {
        Self {
            commit_position,
            prepare_position,
        }
    }

    /// Builds a position from the optional fields carried by completion payloads.
    #[must_use]
    pub fn from_optional(commit_position: Option<i64>, prepare_position: Option<i64>) -> Self {
        Self::new(commit_position.unwrap_or(-1), prepare_position.unwrap_or(-1))
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.commit_position, self.prepare_position)
    }
}

/// Result of a successful append or transaction commit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WriteResult {
    /// Version to pass as the expected version of the next write.
    pub next_expected_version: i64,
    pub log_position: Position,
}

/// Result of a successful stream deletion.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeleteResult {
    pub log_position: Position,
}

/// An event to be written.
#[derive(Debug, Clone, PartialEq)]
pub struct EventData {
    pub event_id: Uuid,
    pub event_type: String,
    pub is_json: bool,
    pub data: Bytes,
    pub metadata: Bytes,
}

impl EventData {
    /// Creates a JSON event with a fresh id and empty metadata.
    #[must_use]
    pub fn json(event_type: impl Into<String>, data: impl Into<Bytes>) -> Self {
        Self {
            event_id: Uuid::new_v4(),
            event_type: event_type.into(),
            is_json: true,
            data: data.into(),
            metadata: Bytes::new(),
        }
    }

    /// Creates a binary event with a fresh id and empty metadata.
    #[must_use]
    pub fn binary(event_type: impl Into<String>, data: impl Into<Bytes>) -> Self {
        Self {
            is_json: false,
            ..Self::json(event_type, data)
        }
    }

    #[must_use]
    pub fn with_metadata(mut self, metadata: impl Into<Bytes>) -> Self {
        self.metadata = metadata.into();
        self
    }
}

/// An event as stored by the server.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedEvent {
    pub stream_id: String,
    pub event_id: Uuid,
    pub event_number: i64,
    pub event_type: String,
    pub is_json: bool,
    pub data: Bytes,
    pub metadata: Bytes,
    /// Milliseconds since the Unix epoch, when the server reported it.
    pub created_epoch_ms: Option<i64>,
}

/// An event read through a link, together with the link event itself.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedEvent {
    pub event: Option<RecordedEvent>,
    pub link: Option<RecordedEvent>,
}

impl ResolvedEvent {
    /// The event that was read: the linked-to event when resolved, otherwise
    /// the event itself.
    #[must_use]
    pub fn original_event(&self) -> Option<&RecordedEvent> {
        self.link.as_ref().or(self.event.as_ref())
    }
}

/// Outcome of a single-event read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventReadStatus {
    Success,
    NotFound,
    NoStream,
    StreamDeleted,
}

/// Result of a single-event read. `event` is present only on `Success`.
#[derive(Debug, Clone, PartialEq)]
pub struct EventReadResult {
    pub status: EventReadStatus,
    pub stream: String,
    pub event_number: i64,
    pub event: Option<ResolvedEvent>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_positions_default_to_minus_one() {
        let position = Position::from_optional(Some(42), None);
        assert_eq!(position, Position::new(42, -1));
        assert_eq!(Position::from_optional(None, None), Position::UNKNOWN);
        assert_eq!(position.to_string(), "42/-1");
    }

    #[test]
    fn binary_event_keeps_type_and_data() {
        let event = EventData::binary("checked-in", vec![1, 2, 3]).with_metadata(vec![9]);
        assert!(!event.is_json);
        assert_eq!(event.event_type, "checked-in");
        assert_eq!(event.data.as_ref(), &[1, 2, 3]);
        assert_eq!(event.metadata.as_ref(), &[9]);
    }

    #[test]
    fn original_event_prefers_link() {
        let recorded = |stream: &str| RecordedEvent {
            stream_id: stream.to_string(),
            event_id: Uuid::nil(),
            event_number: 0,
            event_type: "t".to_string(),
            is_json: false,
            data: Bytes::new(),
            metadata: Bytes::new(),
            created_epoch_ms: None,
        };
        let resolved = ResolvedEvent {
            event: Some(recorded("event")),
            link: Some(recorded("link")),
        };
        assert_eq!(resolved.original_event().map(|e| e.stream_id.as_str()), Some("link"));

        let unresolved = ResolvedEvent {
            event: Some(recorded("event")),
            link: None,
        };
        assert_eq!(unresolved.original_event().map(|e| e.stream_id.as_str()), Some("event"));
    }
}
