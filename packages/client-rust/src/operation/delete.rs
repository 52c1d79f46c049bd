use std::fmt;

use eventwire_core::messages::{self, DeleteStreamCompleted};
use eventwire_core::{DeleteResult, Position, TcpCommand};

use super::decision::{stream_rejection, write_verdict, WRITE_DECISIONS};
use super::{OperationKind, ResponseVerdict};
use crate::error::ProtocolError;

/// Deletes a stream, softly or as a permanent tombstone.
#[derive(Debug, Clone)]
pub struct DeleteStream {
    stream: String,
    expected_version: i64,
    hard_delete: bool,
    require_master: bool,
}

impl DeleteStream {
    #[must_use]
    pub fn new(
        stream: impl Into<String>,
        expected_version: i64,
        hard_delete: bool,
        require_master: bool,
    ) -> Self {
        Self {
            stream: stream.into(),
            expected_version,
            hard_delete,
            require_master,
        }
    }
}

impl OperationKind for DeleteStream {
    type Request = messages::DeleteStream;
    type Response = DeleteStreamCompleted;
    type Output = DeleteResult;

    const NAME: &'static str = "DeleteStream";
    const REQUEST_COMMAND: TcpCommand = TcpCommand::DeleteStream;
    const RESPONSE_COMMAND: TcpCommand = TcpCommand::DeleteStreamCompleted;

    fn build_request(&self) -> messages::DeleteStream {
        messages::DeleteStream {
            event_stream_id: self.stream.clone(),
            expected_version: self.expected_version,
            require_master: self.require_master,
            hard_delete: self.hard_delete,
        }
    }

    fn inspect_response(
        &self,
        response: &DeleteStreamCompleted,
    ) -> Result<(ResponseVerdict, &'static str), ProtocolError> {
        write_verdict(Self::NAME, WRITE_DECISIONS, response.result, |rejection| {
            stream_rejection(rejection, &self.stream, || {
                format!(
                    "Delete stream failed due to WrongExpectedVersion. Stream: {}, Expected version: {}.",
                    self.stream, self.expected_version
                )
            })
        })
    }

    fn to_result(&self, response: DeleteStreamCompleted) -> DeleteResult {
        DeleteResult {
            log_position: Position::from_optional(
                response.commit_position,
                response.prepare_position,
            ),
        }
    }
}

impl fmt::Display for DeleteStream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Stream: {}, ExpectedVersion: {}, HardDelete: {}",
            self.stream, self.expected_version, self.hard_delete
        )
    }
}
