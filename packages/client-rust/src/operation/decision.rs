//! Result-code decision tables.
//!
//! Each operation maps the result code of its completion payload through one
//! of these tables. A code that is absent from the operation's table is a
//! protocol defect and surfaces as [`ProtocolError::UnexpectedResult`].

use eventwire_core::{EventReadStatus, OperationResult, ReadEventResult};

use super::ResponseVerdict;
use crate::error::{OperationError, ProtocolError};

/// Domain rejection named by a write result.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rejection {
    WrongExpectedVersion,
    StreamDeleted,
    InvalidTransaction,
    AccessDenied,
}

/// What a write-style operation does with a result code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteOutcome {
    Succeed,
    Retry,
    Reject(Rejection),
}

/// Append, delete, transaction start, and transaction commit.
pub const WRITE_DECISIONS: &[(OperationResult, WriteOutcome)] = &[
    (OperationResult::Success, WriteOutcome::Succeed),
    (OperationResult::PrepareTimeout, WriteOutcome::Retry),
    (OperationResult::CommitTimeout, WriteOutcome::Retry),
    (OperationResult::ForwardTimeout, WriteOutcome::Retry),
    (
        OperationResult::WrongExpectedVersion,
        WriteOutcome::Reject(Rejection::WrongExpectedVersion),
    ),
    (
        OperationResult::StreamDeleted,
        WriteOutcome::Reject(Rejection::StreamDeleted),
    ),
    (
        OperationResult::InvalidTransaction,
        WriteOutcome::Reject(Rejection::InvalidTransaction),
    ),
    (
        OperationResult::AccessDenied,
        WriteOutcome::Reject(Rejection::AccessDenied),
    ),
];

/// Writes into an open transaction are only acknowledged or denied.
pub const TRANSACTION_WRITE_DECISIONS: &[(OperationResult, WriteOutcome)] = &[
    (OperationResult::Success, WriteOutcome::Succeed),
    (OperationResult::PrepareTimeout, WriteOutcome::Retry),
    (OperationResult::CommitTimeout, WriteOutcome::Retry),
    (OperationResult::ForwardTimeout, WriteOutcome::Retry),
    (
        OperationResult::AccessDenied,
        WriteOutcome::Reject(Rejection::AccessDenied),
    ),
];

/// What a single-event read does with a result code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadOutcome {
    Resolve(EventReadStatus),
    ServerError,
    AccessDenied,
}

pub const READ_EVENT_DECISIONS: &[(ReadEventResult, ReadOutcome)] = &[
    (
        ReadEventResult::Success,
        ReadOutcome::Resolve(EventReadStatus::Success),
    ),
    (
        ReadEventResult::NotFound,
        ReadOutcome::Resolve(EventReadStatus::NotFound),
    ),
    (
        ReadEventResult::NoStream,
        ReadOutcome::Resolve(EventReadStatus::NoStream),
    ),
    (
        ReadEventResult::StreamDeleted,
        ReadOutcome::Resolve(EventReadStatus::StreamDeleted),
    ),
    (ReadEventResult::Error, ReadOutcome::ServerError),
    (ReadEventResult::AccessDenied, ReadOutcome::AccessDenied),
];

/// Looks up a raw write result code in `table`.
#[must_use]
pub fn lookup_write(
    table: &[(OperationResult, WriteOutcome)],
    code: i32,
) -> Option<(OperationResult, WriteOutcome)> {
    let result = OperationResult::from_code(code)?;
    table.iter().copied().find(|(known, _)| *known == result)
}

/// Looks up a raw read result code.
#[must_use]
pub fn lookup_read(code: i32) -> Option<(ReadEventResult, ReadOutcome)> {
    let result = ReadEventResult::from_code(code)?;
    READ_EVENT_DECISIONS
        .iter()
        .copied()
        .find(|(known, _)| *known == result)
}

/// Applies a write table to a result code, building rejection errors with
/// `reject`.
pub(crate) fn write_verdict(
    operation: &'static str,
    table: &[(OperationResult, WriteOutcome)],
    code: i32,
    reject: impl FnOnce(Rejection) -> OperationError,
) -> Result<(ResponseVerdict, &'static str), ProtocolError> {
    let (result, outcome) =
        lookup_write(table, code).ok_or(ProtocolError::UnexpectedResult { operation, code })?;
    let verdict = match outcome {
        WriteOutcome::Succeed => ResponseVerdict::Succeed,
        WriteOutcome::Retry => ResponseVerdict::Retry,
        WriteOutcome::Reject(rejection) => ResponseVerdict::Fail(reject(rejection)),
    };
    Ok((verdict, result.as_str()))
}

/// Rejection errors for operations that target a named stream.
pub(crate) fn stream_rejection(
    rejection: Rejection,
    stream: &str,
    wrong_version: impl FnOnce() -> String,
) -> OperationError {
    match rejection {
        Rejection::WrongExpectedVersion => OperationError::WrongExpectedVersion(wrong_version()),
        Rejection::StreamDeleted => OperationError::StreamDeleted(stream.to_string()),
        Rejection::InvalidTransaction => {
            OperationError::InvalidTransaction(format!("Stream: {stream}"))
        }
        Rejection::AccessDenied => {
            OperationError::AccessDenied(format!("Write access denied for stream '{stream}'."))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn write_table_matches_canonical_mapping() {
        let expected = [
            (OperationResult::Success, WriteOutcome::Succeed),
            (OperationResult::PrepareTimeout, WriteOutcome::Retry),
            (OperationResult::CommitTimeout, WriteOutcome::Retry),
            (OperationResult::ForwardTimeout, WriteOutcome::Retry),
            (
                OperationResult::WrongExpectedVersion,
                WriteOutcome::Reject(Rejection::WrongExpectedVersion),
            ),
            (
                OperationResult::StreamDeleted,
                WriteOutcome::Reject(Rejection::StreamDeleted),
            ),
            (
                OperationResult::InvalidTransaction,
                WriteOutcome::Reject(Rejection::InvalidTransaction),
            ),
            (
                OperationResult::AccessDenied,
                WriteOutcome::Reject(Rejection::AccessDenied),
            ),
        ];
        for (result, outcome) in expected {
            assert_eq!(
                lookup_write(WRITE_DECISIONS, result.code()),
                Some((result, outcome)),
                "{result}"
            );
        }
    }

    #[test]
    fn unknown_code_has_no_decision() {
        assert_eq!(lookup_write(WRITE_DECISIONS, 42), None);
        assert_eq!(lookup_read(42), None);
    }

    #[test]
    fn transaction_write_table_omits_version_checks() {
        let code = OperationResult::WrongExpectedVersion.code();
        assert_eq!(lookup_write(TRANSACTION_WRITE_DECISIONS, code), None);
        assert_eq!(
            lookup_write(TRANSACTION_WRITE_DECISIONS, OperationResult::CommitTimeout.code()),
            Some((OperationResult::CommitTimeout, WriteOutcome::Retry))
        );
    }

    #[test]
    fn read_table_resolves_missing_events() {
        assert_eq!(
            lookup_read(ReadEventResult::NoStream.code()),
            Some((
                ReadEventResult::NoStream,
                ReadOutcome::Resolve(EventReadStatus::NoStream)
            ))
        );
        assert_eq!(
            lookup_read(ReadEventResult::Error.code()),
            Some((ReadEventResult::Error, ReadOutcome::ServerError))
        );
    }

    #[test]
    fn write_verdict_reports_unexpected_code() {
        let err = write_verdict("Sample", WRITE_DECISIONS, 99, |_| OperationError::Abandoned)
            .unwrap_err();
        assert!(matches!(
            err,
            ProtocolError::UnexpectedResult {
                operation: "Sample",
                code: 99
            }
        ));
    }

    #[test]
    fn write_verdict_builds_rejection() {
        let (verdict, description) = write_verdict(
            "Sample",
            WRITE_DECISIONS,
            OperationResult::StreamDeleted.code(),
            |rejection| stream_rejection(rejection, "orders", String::new),
        )
        .unwrap();
        assert_eq!(description, "StreamDeleted");
        assert!(matches!(
            verdict,
            ResponseVerdict::Fail(OperationError::StreamDeleted(stream)) if stream == "orders"
        ));
    }
}
