use std::fmt;

use eventwire_core::messages::{self, ReadEventCompleted};
use eventwire_core::{EventReadResult, EventReadStatus, ResolvedEvent, TcpCommand};

use super::decision::{lookup_read, ReadOutcome};
use super::{OperationKind, ResponseVerdict};
use crate::error::{OperationError, ProtocolError};

/// Reads one event by number. `-1` reads the last event of the stream.
#[derive(Debug, Clone)]
pub struct ReadEvent {
    stream: String,
    event_number: i64,
    resolve_link_tos: bool,
    require_master: bool,
}

impl ReadEvent {
    #[must_use]
    pub fn new(
        stream: impl Into<String>,
        event_number: i64,
        resolve_link_tos: bool,
        require_master: bool,
    ) -> Self {
        Self {
            stream: stream.into(),
            event_number,
            resolve_link_tos,
            require_master,
        }
    }
}

impl OperationKind for ReadEvent {
    type Request = messages::ReadEvent;
    type Response = ReadEventCompleted;
    type Output = EventReadResult;

    const NAME: &'static str = "ReadEvent";
    const REQUEST_COMMAND: TcpCommand = TcpCommand::ReadEvent;
    const RESPONSE_COMMAND: TcpCommand = TcpCommand::ReadEventCompleted;

    fn build_request(&self) -> messages::ReadEvent {
        messages::ReadEvent {
            event_stream_id: self.stream.clone(),
            event_number: self.event_number,
            resolve_link_tos: self.resolve_link_tos,
            require_master: self.require_master,
        }
    }

    fn inspect_response(
        &self,
        response: &ReadEventCompleted,
    ) -> Result<(ResponseVerdict, &'static str), ProtocolError> {
        let (result, outcome) = lookup_read(response.result).ok_or(ProtocolError::UnexpectedResult {
            operation: Self::NAME,
            code: response.result,
        })?;
        let verdict = match outcome {
            ReadOutcome::Resolve(_) => ResponseVerdict::Succeed,
            ReadOutcome::ServerError => ResponseVerdict::Fail(OperationError::ServerError(
                response.error.clone().unwrap_or_default(),
            )),
            ReadOutcome::AccessDenied => ResponseVerdict::Fail(OperationError::AccessDenied(
                format!("Read access denied for stream '{}'.", self.stream),
            )),
        };
        Ok((verdict, result.as_str()))
    }

    fn to_result(&self, response: ReadEventCompleted) -> EventReadResult {
        // Only called for resolving codes.
        let status = match lookup_read(response.result) {
            Some((_, ReadOutcome::Resolve(status))) => status,
            _ => EventReadStatus::NotFound,
        };
        let event = match status {
            EventReadStatus::Success => response.event.map(ResolvedEvent::from),
            _ => None,
        };
        EventReadResult {
            status,
            stream: self.stream.clone(),
            event_number: self.event_number,
            event,
        }
    }
}

impl fmt::Display for ReadEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Stream: {}, EventNumber: {}, ResolveLinkTos: {}",
            self.stream, self.event_number, self.resolve_link_tos
        )
    }
}
