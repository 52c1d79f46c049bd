//! Result codes carried by completion payloads.
//!
//! Codes travel as raw integers so that a server speaking a newer protocol
//! revision can send a value this client does not know. Conversion back to
//! the enums goes through `from_code`, which returns `None` for such values.

use std::fmt;

/// Result of a write-style command (append, delete, transaction start,
/// transaction write, transaction commit).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OperationResult {
    Success = 0,
    PrepareTimeout = 1,
    CommitTimeout = 2,
    ForwardTimeout = 3,
    WrongExpectedVersion = 4,
    StreamDeleted = 5,
    InvalidTransaction = 6,
    AccessDenied = 7,
}

impl OperationResult {
    #[must_use]
    pub fn from_code(code: i32) -> Option<Self> {
        Some(match code {
            0 => Self::Success,
            1 => Self::PrepareTimeout,
            2 => Self::CommitTimeout,
            3 => Self::ForwardTimeout,
            4 => Self::WrongExpectedVersion,
            5 => Self::StreamDeleted,
            6 => Self::InvalidTransaction,
            7 => Self::AccessDenied,
            _ => return None,
        })
    }

    #[must_use]
    pub fn code(self) -> i32 {
        self as i32
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Success => "Success",
            Self::PrepareTimeout => "PrepareTimeout",
            Self::CommitTimeout => "CommitTimeout",
            Self::ForwardTimeout => "ForwardTimeout",
            Self::WrongExpectedVersion => "WrongExpectedVersion",
            Self::StreamDeleted => "StreamDeleted",
            Self::InvalidTransaction => "InvalidTransaction",
            Self::AccessDenied => "AccessDenied",
        }
    }
}

impl fmt::Display for OperationResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result of a single-event read.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ReadEventResult {
    Success = 0,
    NotFound = 1,
    NoStream = 2,
    StreamDeleted = 3,
    Error = 4,
    AccessDenied = 5,
}

impl ReadEventResult {
    #[must_use]
    pub fn from_code(code: i32) -> Option<Self> {
        Some(match code {
            0 => Self::Success,
            1 => Self::NotFound,
            2 => Self::NoStream,
            3 => Self::StreamDeleted,
            4 => Self::Error,
            5 => Self::AccessDenied,
            _ => return None,
        })
    }

    #[must_use]
    pub fn code(self) -> i32 {
        self as i32
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Success => "Success",
            Self::NotFound => "NotFound",
            Self::NoStream => "NoStream",
            Self::StreamDeleted => "StreamDeleted",
            Self::Error => "Error",
            Self::AccessDenied => "AccessDenied",
        }
    }
}

impl fmt::Display for ReadEventResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Reason carried by a `NotHandled` reply.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NotHandledReason {
    NotReady = 0,
    TooBusy = 1,
    NotMaster = 2,
}

impl NotHandledReason {
    #[must_use]
    pub fn from_code(code: i32) -> Option<Self> {
        Some(match code {
            0 => Self::NotReady,
            1 => Self::TooBusy,
            2 => Self::NotMaster,
            _ => return None,
        })
    }

    #[must_use]
    pub fn code(self) -> i32 {
        self as i32
    }
}
