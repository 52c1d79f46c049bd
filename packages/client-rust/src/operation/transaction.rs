//! Explicit transactions: start, write into, commit.

use std::fmt;

use eventwire_core::messages::{
    NewEvent, TransactionCommit, TransactionCommitCompleted, TransactionStart,
    TransactionStartCompleted, TransactionWrite, TransactionWriteCompleted,
};
use eventwire_core::{EventData, Position, TcpCommand, WriteResult};

use super::decision::{
    stream_rejection, write_verdict, Rejection, TRANSACTION_WRITE_DECISIONS, WRITE_DECISIONS,
};
use super::{OperationKind, ResponseVerdict};
use crate::error::{OperationError, ProtocolError};

fn transaction_rejection(rejection: Rejection, transaction_id: i64) -> OperationError {
    match rejection {
        Rejection::WrongExpectedVersion => OperationError::WrongExpectedVersion(format!(
            "Commit transaction failed due to WrongExpectedVersion. TransactionID: {transaction_id}."
        )),
        Rejection::StreamDeleted => {
            OperationError::StreamDeleted(format!("TransactionID: {transaction_id}"))
        }
        Rejection::InvalidTransaction => {
            OperationError::InvalidTransaction(format!("TransactionID: {transaction_id}"))
        }
        Rejection::AccessDenied => OperationError::AccessDenied(format!(
            "Write access denied for transaction {transaction_id}."
        )),
    }
}

// ---------------------------------------------------------------------------
// StartTransaction
// ---------------------------------------------------------------------------

/// Opens a transaction on a stream. Resolves to the server-assigned id.
#[derive(Debug, Clone)]
pub struct StartTransaction {
    stream: String,
    expected_version: i64,
    require_master: bool,
}

impl StartTransaction {
    #[must_use]
    pub fn new(stream: impl Into<String>, expected_version: i64, require_master: bool) -> Self {
        Self {
            stream: stream.into(),
            expected_version,
            require_master,
        }
    }
}

impl OperationKind for StartTransaction {
    type Request = TransactionStart;
    type Response = TransactionStartCompleted;
    type Output = i64;

    const NAME: &'static str = "StartTransaction";
    const REQUEST_COMMAND: TcpCommand = TcpCommand::TransactionStart;
    const RESPONSE_COMMAND: TcpCommand = TcpCommand::TransactionStartCompleted;

    fn build_request(&self) -> TransactionStart {
        TransactionStart {
            event_stream_id: self.stream.clone(),
            expected_version: self.expected_version,
            require_master: self.require_master,
        }
    }

    fn inspect_response(
        &self,
        response: &TransactionStartCompleted,
    ) -> Result<(ResponseVerdict, &'static str), ProtocolError> {
        write_verdict(Self::NAME, WRITE_DECISIONS, response.result, |rejection| {
            stream_rejection(rejection, &self.stream, || {
                format!(
                    "Start transaction failed due to WrongExpectedVersion. Stream: {}, Expected version: {}.",
                    self.stream, self.expected_version
                )
            })
        })
    }

    fn to_result(&self, response: TransactionStartCompleted) -> i64 {
        response.transaction_id
    }
}

impl fmt::Display for StartTransaction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Stream: {}, ExpectedVersion: {}",
            self.stream, self.expected_version
        )
    }
}

// ---------------------------------------------------------------------------
// TransactionalWrite
// ---------------------------------------------------------------------------

/// Writes events into an open transaction.
#[derive(Debug, Clone)]
pub struct TransactionalWrite {
    transaction_id: i64,
    events: Vec<EventData>,
    require_master: bool,
}

impl TransactionalWrite {
    #[must_use]
    pub fn new(transaction_id: i64, events: Vec<EventData>, require_master: bool) -> Self {
        Self {
            transaction_id,
            events,
            require_master,
        }
    }
}

impl OperationKind for TransactionalWrite {
    type Request = TransactionWrite;
    type Response = TransactionWriteCompleted;
    type Output = ();

    const NAME: &'static str = "TransactionalWrite";
    const REQUEST_COMMAND: TcpCommand = TcpCommand::TransactionWrite;
    const RESPONSE_COMMAND: TcpCommand = TcpCommand::TransactionWriteCompleted;

    fn build_request(&self) -> TransactionWrite {
        TransactionWrite {
            transaction_id: self.transaction_id,
            events: self.events.iter().map(NewEvent::from).collect(),
            require_master: self.require_master,
        }
    }

    fn inspect_response(
        &self,
        response: &TransactionWriteCompleted,
    ) -> Result<(ResponseVerdict, &'static str), ProtocolError> {
        write_verdict(
            Self::NAME,
            TRANSACTION_WRITE_DECISIONS,
            response.result,
            |rejection| transaction_rejection(rejection, self.transaction_id),
        )
    }

    fn to_result(&self, _response: TransactionWriteCompleted) {}
}

impl fmt::Display for TransactionalWrite {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TransactionId: {}", self.transaction_id)
    }
}

// ---------------------------------------------------------------------------
// CommitTransaction
// ---------------------------------------------------------------------------

/// Commits an open transaction.
#[derive(Debug, Clone)]
pub struct CommitTransaction {
    transaction_id: i64,
    require_master: bool,
}

impl CommitTransaction {
    #[must_use]
    pub fn new(transaction_id: i64, require_master: bool) -> Self {
        Self {
            transaction_id,
            require_master,
        }
    }
}

impl OperationKind for CommitTransaction {
    type Request = TransactionCommit;
    type Response = TransactionCommitCompleted;
    type Output = WriteResult;

    const NAME: &'static str = "CommitTransaction";
    const REQUEST_COMMAND: TcpCommand = TcpCommand::TransactionCommit;
    const RESPONSE_COMMAND: TcpCommand = TcpCommand::TransactionCommitCompleted;

    fn build_request(&self) -> TransactionCommit {
        TransactionCommit {
            transaction_id: self.transaction_id,
            require_master: self.require_master,
        }
    }

    fn inspect_response(
        &self,
        response: &TransactionCommitCompleted,
    ) -> Result<(ResponseVerdict, &'static str), ProtocolError> {
        write_verdict(Self::NAME, WRITE_DECISIONS, response.result, |rejection| {
            transaction_rejection(rejection, self.transaction_id)
        })
    }

    fn to_result(&self, response: TransactionCommitCompleted) -> WriteResult {
        WriteResult {
            next_expected_version: response.last_event_number,
            log_position: Position::from_optional(
                response.commit_position,
                response.prepare_position,
            ),
        }
    }
}

impl fmt::Display for CommitTransaction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TransactionId: {}", self.transaction_id)
    }
}
