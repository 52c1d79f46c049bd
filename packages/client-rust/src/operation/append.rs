use std::fmt;

use eventwire_core::messages::{NewEvent, WriteEvents, WriteEventsCompleted};
use eventwire_core::{EventData, Position, TcpCommand, WriteResult};

use super::decision::{stream_rejection, write_verdict, WRITE_DECISIONS};
use super::{OperationKind, ResponseVerdict};
use crate::error::ProtocolError;

/// Appends events to a stream under an expected-version check.
#[derive(Debug, Clone)]
pub struct AppendToStream {
    stream: String,
    expected_version: i64,
    events: Vec<EventData>,
    require_master: bool,
}

impl AppendToStream {
    #[must_use]
    pub fn new(
        stream: impl Into<String>,
        expected_version: i64,
        events: Vec<EventData>,
        require_master: bool,
    ) -> Self {
        Self {
            stream: stream.into(),
            expected_version,
            events,
            require_master,
        }
    }
}

impl OperationKind for AppendToStream {
    type Request = WriteEvents;
    type Response = WriteEventsCompleted;
    type Output = WriteResult;

    const NAME: &'static str = "AppendToStream";
    const REQUEST_COMMAND: TcpCommand = TcpCommand::WriteEvents;
    const RESPONSE_COMMAND: TcpCommand = TcpCommand::WriteEventsCompleted;

    fn build_request(&self) -> WriteEvents {
        WriteEvents {
            event_stream_id: self.stream.clone(),
            expected_version: self.expected_version,
            events: self.events.iter().map(NewEvent::from).collect(),
            require_master: self.require_master,
        }
    }

    fn inspect_response(
        &self,
        response: &WriteEventsCompleted,
    ) -> Result<(ResponseVerdict, &'static str), ProtocolError> {
        write_verdict(Self::NAME, WRITE_DECISIONS, response.result, |rejection| {
            stream_rejection(rejection, &self.stream, || {
                format!(
                    "Append failed due to WrongExpectedVersion. Stream: {}, Expected version: {}, Current version: {}",
                    self.stream,
                    self.expected_version,
                    response.current_version.unwrap_or(-1),
                )
            })
        })
    }

    fn to_result(&self, response: WriteEventsCompleted) -> WriteResult {
        WriteResult {
            next_expected_version: response.last_event_number,
            log_position: Position::from_optional(
                response.commit_position,
                response.prepare_position,
            ),
        }
    }
}

impl fmt::Display for AppendToStream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Stream: {}, ExpectedVersion: {}",
            self.stream, self.expected_version
        )
    }
}

#[cfg(test)]
mod tests {
    use eventwire_core::{messages, ExpectedVersion, OperationResult};
    use uuid::Uuid;

    use super::*;
    use crate::error::OperationError;
    use crate::operation::{InspectionDecision, Operation, PendingOperation};
    use crate::testing::reply;

    fn append() -> AppendToStream {
        AppendToStream::new(
            "orders",
            ExpectedVersion::NO_STREAM,
            vec![EventData::json("OrderPlaced", &b"{\"id\":1}"[..])],
            true,
        )
    }

    fn completed(result: OperationResult) -> WriteEventsCompleted {
        WriteEventsCompleted {
            result: result.code(),
            first_event_number: 0,
            last_event_number: 0,
            prepare_position: Some(120),
            commit_position: Some(100),
            ..WriteEventsCompleted::default()
        }
    }

    #[test]
    fn request_carries_events() {
        let (op, _future) = PendingOperation::new(append(), None);
        let package = op.create(Uuid::new_v4()).unwrap();
        assert_eq!(package.command, TcpCommand::WriteEvents);

        let body: WriteEvents = messages::decode(&package.data).unwrap();
        assert_eq!(body.event_stream_id, "orders");
        assert_eq!(body.expected_version, ExpectedVersion::NO_STREAM);
        assert_eq!(body.events.len(), 1);
        assert_eq!(body.events[0].event_type, "OrderPlaced");
        assert!(body.require_master);
    }

    #[tokio::test]
    async fn success_resolves_write_result() {
        let (op, future) = PendingOperation::new(append(), None);
        let package = reply(
            TcpCommand::WriteEventsCompleted,
            Uuid::new_v4(),
            &completed(OperationResult::Success),
        );

        let result = op.inspect(&package).unwrap();
        assert_eq!(result.decision, InspectionDecision::EndOperation);
        assert_eq!(result.description, "Success");

        let write = future.await.unwrap();
        assert_eq!(write.next_expected_version, 0);
        assert_eq!(write.log_position, Position::new(100, 120));
    }

    #[test]
    fn timeouts_retry_without_resolving() {
        let (op, _future) = PendingOperation::new(append(), None);
        for result in [
            OperationResult::PrepareTimeout,
            OperationResult::CommitTimeout,
            OperationResult::ForwardTimeout,
        ] {
            let package = reply(TcpCommand::WriteEventsCompleted, Uuid::new_v4(), &completed(result));
            let inspected = op.inspect(&package).unwrap();
            assert_eq!(inspected.decision, InspectionDecision::Retry);
            assert_eq!(inspected.description, result.as_str());
        }
        assert!(!op.is_completed());
    }

    #[tokio::test]
    async fn wrong_expected_version_reports_current_version() {
        let (op, future) = PendingOperation::new(append(), None);
        let package = reply(
            TcpCommand::WriteEventsCompleted,
            Uuid::new_v4(),
            &WriteEventsCompleted {
                current_version: Some(5),
                ..completed(OperationResult::WrongExpectedVersion)
            },
        );

        assert_eq!(op.inspect(&package).unwrap().decision, InspectionDecision::EndOperation);
        let err = future.await.unwrap_err();
        assert!(matches!(
            err,
            OperationError::WrongExpectedVersion(ref msg)
                if msg.contains("Stream: orders") && msg.contains("Current version: 5")
        ));
    }

    #[tokio::test]
    async fn access_denied_names_stream() {
        let (op, future) = PendingOperation::new(append(), None);
        let package = reply(
            TcpCommand::WriteEventsCompleted,
            Uuid::new_v4(),
            &completed(OperationResult::AccessDenied),
        );
        op.inspect(&package).unwrap();
        assert!(matches!(
            future.await,
            Err(OperationError::AccessDenied(msg)) if msg == "Write access denied for stream 'orders'."
        ));
    }

    #[test]
    fn display_names_stream_and_version() {
        assert_eq!(append().to_string(), "Stream: orders, ExpectedVersion: -1");
    }
}
