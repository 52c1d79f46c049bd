//! Per-request operations and the response state machine they share.
//!
//! - [`Operation`]: the object-safe contract the manager drives.
//! - [`OperationKind`]: what one request type contributes (payload, result
//!   mapping, typed output).
//! - [`PendingOperation`]: the generic base pairing a kind with its
//!   completion; handles the envelope-level replies any request may get.
//! - [`decision`]: the result-code tables, kept as data.

pub mod append;
pub mod completion;
pub mod decision;
pub mod delete;
pub mod read_event;
pub mod transaction;

use std::borrow::Cow;
use std::fmt;

use eventwire_core::messages::{self, NotHandled};
use eventwire_core::{NotHandledReason, TcpCommand, TcpPackage, UserCredentials};
use serde::de::DeserializeOwned;
use serde::Serialize;
use uuid::Uuid;

use crate::discovery::NodeEndPoints;
use crate::error::{OperationError, ProtocolError};

pub use append::AppendToStream;
pub use completion::{Completion, OperationFuture};
pub use delete::DeleteStream;
pub use read_event::ReadEvent;
pub use transaction::{CommitTransaction, StartTransaction, TransactionalWrite};

// ---------------------------------------------------------------------------
// Inspection results
// ---------------------------------------------------------------------------

/// What the manager should do after a reply was inspected.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InspectionDecision {
    /// The operation's future has been resolved; forget the operation.
    EndOperation,
    /// Resend with a fresh correlation id on the next sweep.
    Retry,
    /// Reconnect to the given node, then resend.
    Reconnect(NodeEndPoints),
}

/// Decision plus a short description for diagnostics.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InspectionResult {
    pub decision: InspectionDecision,
    pub description: Cow<'static, str>,
}

impl InspectionResult {
    pub fn end(description: impl Into<Cow<'static, str>>) -> Self {
        Self {
            decision: InspectionDecision::EndOperation,
            description: description.into(),
        }
    }

    pub fn retry(description: impl Into<Cow<'static, str>>) -> Self {
        Self {
            decision: InspectionDecision::Retry,
            description: description.into(),
        }
    }

    pub fn reconnect(endpoints: NodeEndPoints, description: impl Into<Cow<'static, str>>) -> Self {
        Self {
            decision: InspectionDecision::Reconnect(endpoints),
            description: description.into(),
        }
    }
}

// ---------------------------------------------------------------------------
// Operation trait
// ---------------------------------------------------------------------------

/// One logical request, as seen by the operation manager.
///
/// `inspect` resolves the operation's future as a side effect whenever it
/// returns `EndOperation`. It never sends anything itself.
pub trait Operation: Send + Sync + fmt::Display {
    /// Short type name for diagnostics (e.g. `"DeleteStream"`).
    fn name(&self) -> &'static str;

    fn request_command(&self) -> TcpCommand;

    fn response_command(&self) -> TcpCommand;

    /// Builds the request package for one attempt.
    ///
    /// # Errors
    ///
    /// Returns `ProtocolError::Payload` if the request body cannot be encoded.
    fn create(&self, correlation_id: Uuid) -> Result<TcpPackage, ProtocolError>;

    /// Interprets a reply addressed to this operation.
    ///
    /// # Errors
    ///
    /// Returns a `ProtocolError` for replies that cannot be interpreted: an
    /// unexpected command, an undecodable body, or an unknown result code.
    fn inspect(&self, package: &TcpPackage) -> Result<InspectionResult, ProtocolError>;

    /// Fails the operation's future. Returns `false` if it was already resolved.
    fn fail(&self, error: OperationError) -> bool;

    fn is_completed(&self) -> bool;
}

// ---------------------------------------------------------------------------
// OperationKind trait
// ---------------------------------------------------------------------------

/// What a response tells the operation to do, before envelope handling.
#[derive(Debug)]
pub enum ResponseVerdict {
    /// Resolve the future with `to_result(response)`.
    Succeed,
    /// Leave the future unresolved and resend.
    Retry,
    /// Resolve the future with this error.
    Fail(OperationError),
}

/// The request-type specific half of an operation.
pub trait OperationKind: Send + Sync + fmt::Display + 'static {
    type Request: Serialize;
    type Response: DeserializeOwned;
    type Output: Send + 'static;

    const NAME: &'static str;
    const REQUEST_COMMAND: TcpCommand;
    const RESPONSE_COMMAND: TcpCommand;

    fn build_request(&self) -> Self::Request;

    /// Maps the response's result code to a verdict and a description.
    ///
    /// # Errors
    ///
    /// Returns `ProtocolError::UnexpectedResult` for result codes outside the
    /// kind's decision table.
    fn inspect_response(
        &self,
        response: &Self::Response,
    ) -> Result<(ResponseVerdict, &'static str), ProtocolError>;

    fn to_result(&self, response: Self::Response) -> Self::Output;
}

// ---------------------------------------------------------------------------
// PendingOperation
// ---------------------------------------------------------------------------

/// An [`OperationKind`] bound to the completion of its application future.
pub struct PendingOperation<K: OperationKind> {
    kind: K,
    credentials: Option<UserCredentials>,
    completion: Completion<K::Output>,
}

impl<K: OperationKind> PendingOperation<K> {
    /// Creates the operation and the future the application awaits.
    #[must_use]
    pub fn new(
        kind: K,
        credentials: Option<UserCredentials>,
    ) -> (Self, OperationFuture<K::Output>) {
        let (completion, future) = Completion::new();
        let operation = Self {
            kind,
            credentials,
            completion,
        };
        (operation, future)
    }

    #[must_use]
    pub fn kind(&self) -> &K {
        &self.kind
    }

    /// Decodes the body of a reply expected to carry `K::RESPONSE_COMMAND`.
    ///
    /// # Errors
    ///
    /// Returns `ProtocolError::UnexpectedCommand` for any other command and
    /// `ProtocolError::Payload` for a malformed body.
    pub fn decode_response(&self, package: &TcpPackage) -> Result<K::Response, ProtocolError> {
        if package.command != K::RESPONSE_COMMAND {
            return Err(ProtocolError::UnexpectedCommand {
                expected: K::RESPONSE_COMMAND,
                actual: package.command,
            });
        }
        Ok(messages::decode(&package.data)?)
    }

    fn inspect_completed(&self, package: &TcpPackage) -> Result<InspectionResult, ProtocolError> {
        let response = self.decode_response(package)?;
        let (verdict, description) = self.kind.inspect_response(&response)?;
        match verdict {
            ResponseVerdict::Succeed => {
                self.completion.succeed(self.kind.to_result(response));
                Ok(InspectionResult::end(description))
            }
            ResponseVerdict::Retry => Ok(InspectionResult::retry(description)),
            ResponseVerdict::Fail(error) => {
                self.completion.fail(error);
                Ok(InspectionResult::end(description))
            }
        }
    }

    fn inspect_not_handled(&self, package: &TcpPackage) -> Result<InspectionResult, ProtocolError> {
        let not_handled: NotHandled = messages::decode(&package.data)?;
        match NotHandledReason::from_code(not_handled.reason) {
            Some(NotHandledReason::NotReady) => Ok(InspectionResult::retry("NotHandled - NotReady")),
            Some(NotHandledReason::TooBusy) => Ok(InspectionResult::retry("NotHandled - TooBusy")),
            Some(NotHandledReason::NotMaster) => {
                let Some(info) = not_handled.master_info else {
                    return Ok(InspectionResult::retry("NotHandled - NotMaster, no master info"));
                };
                match NodeEndPoints::from_master_info(&info) {
                    Ok(endpoints) => {
                        let description = format!("NotHandled - NotMaster, master at {endpoints}");
                        Ok(InspectionResult::reconnect(endpoints, description))
                    }
                    Err(err) => {
                        tracing::warn!(operation = K::NAME, error = %err, "unusable master info");
                        Ok(InspectionResult::retry("NotHandled - NotMaster, unusable master info"))
                    }
                }
            }
            None => {
                tracing::warn!(
                    operation = K::NAME,
                    reason = not_handled.reason,
                    "unknown NotHandled reason"
                );
                Ok(InspectionResult::retry("NotHandled - unknown reason"))
            }
        }
    }
}

impl<K: OperationKind> Operation for PendingOperation<K> {
    fn name(&self) -> &'static str {
        K::NAME
    }

    fn request_command(&self) -> TcpCommand {
        K::REQUEST_COMMAND
    }

    fn response_command(&self) -> TcpCommand {
        K::RESPONSE_COMMAND
    }

    fn create(&self, correlation_id: Uuid) -> Result<TcpPackage, ProtocolError> {
        let data = messages::encode(&self.kind.build_request())?;
        Ok(TcpPackage::new(K::REQUEST_COMMAND, correlation_id, data)
            .with_credentials(self.credentials.clone()))
    }

    fn inspect(&self, package: &TcpPackage) -> Result<InspectionResult, ProtocolError> {
        match package.command {
            command if command == K::RESPONSE_COMMAND => self.inspect_completed(package),
            TcpCommand::NotAuthenticated => {
                self.completion
                    .fail(OperationError::NotAuthenticated(package.text()));
                Ok(InspectionResult::end("NotAuthenticated"))
            }
            TcpCommand::BadRequest => {
                self.completion.fail(OperationError::ServerError(package.text()));
                Ok(InspectionResult::end("BadRequest"))
            }
            TcpCommand::NotHandled => self.inspect_not_handled(package),
            actual => Err(ProtocolError::UnexpectedCommand {
                expected: K::RESPONSE_COMMAND,
                actual,
            }),
        }
    }

    fn fail(&self, error: OperationError) -> bool {
        self.completion.fail(error)
    }

    fn is_completed(&self) -> bool {
        self.completion.is_completed()
    }
}

impl<K: OperationKind> fmt::Display for PendingOperation<K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.kind, f)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use eventwire_core::messages::{DeleteStreamCompleted, MasterInfo, WriteEventsCompleted};
    use eventwire_core::{OperationResult, TcpFlags};

    use super::*;
    use crate::discovery::EndPoint;
    use crate::testing::reply;

    fn delete_op() -> (PendingOperation<DeleteStream>, OperationFuture<eventwire_core::DeleteResult>) {
        PendingOperation::new(DeleteStream::new("orders", 4, false, true), None)
    }

    fn master_info() -> MasterInfo {
        MasterInfo {
            external_tcp_address: "10.0.0.9".into(),
            external_tcp_port: 1113,
            external_http_address: "10.0.0.9".into(),
            external_http_port: 2113,
            external_secure_tcp_address: None,
            external_secure_tcp_port: None,
        }
    }

    #[test]
    fn create_tags_request_command_and_correlation_id() {
        let (op, _future) = delete_op();
        let id = Uuid::new_v4();
        let package = op.create(id).unwrap();
        assert_eq!(package.command, TcpCommand::DeleteStream);
        assert_eq!(package.correlation_id, id);
        assert_eq!(package.flags, TcpFlags::NONE);

        let body: eventwire_core::messages::DeleteStream = messages::decode(&package.data).unwrap();
        assert_eq!(body.event_stream_id, "orders");
        assert_eq!(body.expected_version, 4);
    }

    #[test]
    fn create_attaches_credentials() {
        let (op, _future) = PendingOperation::new(
            DeleteStream::new("orders", 4, false, true),
            Some(UserCredentials::new("ops", "secret")),
        );
        let package = op.create(Uuid::new_v4()).unwrap();
        assert!(package.is_authenticated());
        assert_eq!(package.credentials.unwrap().login, "ops");
    }

    #[tokio::test]
    async fn not_authenticated_ends_operation() {
        let (op, future) = delete_op();
        let package = TcpPackage::new(TcpCommand::NotAuthenticated, Uuid::new_v4(), b"who are you".to_vec());

        let result = op.inspect(&package).unwrap();
        assert_eq!(result.decision, InspectionDecision::EndOperation);
        assert!(matches!(
            future.await,
            Err(OperationError::NotAuthenticated(msg)) if msg == "who are you"
        ));
    }

    #[tokio::test]
    async fn bad_request_is_a_server_error() {
        let (op, future) = delete_op();
        let package = TcpPackage::new(TcpCommand::BadRequest, Uuid::new_v4(), b"malformed".to_vec());

        assert_eq!(op.inspect(&package).unwrap().description, "BadRequest");
        assert!(matches!(future.await, Err(OperationError::ServerError(_))));
    }

    #[test]
    fn not_handled_not_ready_and_too_busy_retry() {
        let (op, _future) = delete_op();
        for reason in [NotHandledReason::NotReady, NotHandledReason::TooBusy] {
            let package = reply(
                TcpCommand::NotHandled,
                Uuid::new_v4(),
                &NotHandled {
                    reason: reason.code(),
                    master_info: None,
                },
            );
            assert_eq!(op.inspect(&package).unwrap().decision, InspectionDecision::Retry);
        }
        assert!(!op.is_completed());
    }

    #[test]
    fn not_handled_not_master_reconnects() {
        let (op, _future) = delete_op();
        let package = reply(
            TcpCommand::NotHandled,
            Uuid::new_v4(),
            &NotHandled {
                reason: NotHandledReason::NotMaster.code(),
                master_info: Some(master_info()),
            },
        );

        let result = op.inspect(&package).unwrap();
        assert_eq!(
            result.decision,
            InspectionDecision::Reconnect(NodeEndPoints::plaintext(EndPoint::new("10.0.0.9", 1113)))
        );
        assert!(!op.is_completed());
    }

    #[test]
    fn not_master_with_hostname_reconnects() {
        let (op, _future) = delete_op();
        let package = reply(
            TcpCommand::NotHandled,
            Uuid::new_v4(),
            &NotHandled {
                reason: NotHandledReason::NotMaster.code(),
                master_info: Some(MasterInfo {
                    external_tcp_address: "node2.eventstore.local".into(),
                    ..master_info()
                }),
            },
        );

        let result = op.inspect(&package).unwrap();
        assert_eq!(
            result.decision,
            InspectionDecision::Reconnect(NodeEndPoints::plaintext(EndPoint::new(
                "node2.eventstore.local",
                1113
            )))
        );
        assert_eq!(
            result.description,
            "NotHandled - NotMaster, master at tcp://node2.eventstore.local:1113"
        );
    }

    #[test]
    fn not_master_without_info_retries() {
        let (op, _future) = delete_op();
        let package = reply(
            TcpCommand::NotHandled,
            Uuid::new_v4(),
            &NotHandled {
                reason: NotHandledReason::NotMaster.code(),
                master_info: None,
            },
        );
        assert_eq!(op.inspect(&package).unwrap().decision, InspectionDecision::Retry);
    }

    #[test]
    fn mismatched_completion_is_a_protocol_error() {
        let (op, _future) = delete_op();
        let package = reply(
            TcpCommand::WriteEventsCompleted,
            Uuid::new_v4(),
            &WriteEventsCompleted::default(),
        );

        let err = op.inspect(&package).unwrap_err();
        assert!(matches!(
            err,
            ProtocolError::UnexpectedCommand {
                expected: TcpCommand::DeleteStreamCompleted,
                actual: TcpCommand::WriteEventsCompleted,
            }
        ));
        assert!(!op.is_completed());
    }

    #[test]
    fn malformed_body_is_a_protocol_error() {
        let (op, _future) = delete_op();
        let package = TcpPackage::new(TcpCommand::DeleteStreamCompleted, Uuid::new_v4(), vec![0xC1_u8]);
        assert!(matches!(op.inspect(&package), Err(ProtocolError::Payload(_))));
        assert!(!op.is_completed());
    }

    #[test]
    fn unknown_result_code_is_a_protocol_error() {
        let (op, _future) = delete_op();
        let package = reply(
            TcpCommand::DeleteStreamCompleted,
            Uuid::new_v4(),
            &DeleteStreamCompleted {
                result: 77,
                ..DeleteStreamCompleted::default()
            },
        );
        assert!(matches!(
            op.inspect(&package),
            Err(ProtocolError::UnexpectedResult { code: 77, .. })
        ));
        assert!(!op.is_completed());
    }

    #[tokio::test]
    async fn fail_after_success_is_ignored() {
        let (op, future) = delete_op();
        let package = reply(
            TcpCommand::DeleteStreamCompleted,
            Uuid::new_v4(),
            &DeleteStreamCompleted {
                result: OperationResult::Success.code(),
                ..DeleteStreamCompleted::default()
            },
        );
        op.inspect(&package).unwrap();
        assert!(!op.fail(OperationError::Abandoned));
        assert!(future.await.is_ok());
    }
}
