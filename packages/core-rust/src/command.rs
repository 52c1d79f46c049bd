//! TCP command identifiers.
//!
//! Every package on the wire starts with a single command byte that names the
//! schema of its payload. Requests and their completions come in pairs; the
//! `0xF*` range carries envelope-level answers that any request may receive.

use std::fmt;

use thiserror::Error;

/// Command byte carried in every [`TcpPackage`](crate::TcpPackage).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum TcpCommand {
    HeartbeatRequest = 0x01,
    HeartbeatResponse = 0x02,

    WriteEvents = 0x82,
    WriteEventsCompleted = 0x83,
    TransactionStart = 0x84,
    TransactionStartCompleted = 0x85,
    TransactionWrite = 0x86,
    TransactionWriteCompleted = 0x87,
    TransactionCommit = 0x88,
    TransactionCommitCompleted = 0x89,
    DeleteStream = 0x8A,
    DeleteStreamCompleted = 0x8B,

    ReadEvent = 0xB0,
    ReadEventCompleted = 0xB1,

    BadRequest = 0xF0,
    NotHandled = 0xF1,
    Authenticate = 0xF2,
    Authenticated = 0xF3,
    NotAuthenticated = 0xF4,
}

/// Returned when a byte does not name a known command.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("unknown tcp command: 0x{0:02X}")]
pub struct UnknownCommand(pub u8);

impl TcpCommand {
    /// Wire representation of this command.
    #[must_use]
    pub fn as_u8(self) -> u8 {
        self as u8
    }

    /// Returns `true` for the envelope-level answers (`BadRequest`,
    /// `NotHandled`, `NotAuthenticated`, ...) that are not tied to a request.
    #[must_use]
    pub fn is_envelope_reply(self) -> bool {
        self.as_u8() >= 0xF0
    }
}

impl TryFrom<u8> for TcpCommand {
    type Error = UnknownCommand;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        let command = match value {
            0x01 => Self::HeartbeatRequest,
            0x02 => Self::HeartbeatResponse,
            0x82 => Self::WriteEvents,
            0x83 => Self::WriteEventsCompleted,
            0x84 => Self::TransactionStart,
            0x85 => Self::TransactionStartCompleted,
            0x86 => Self::TransactionWrite,
            0x87 => Self::TransactionWriteCompleted,
            0x88 => Self::TransactionCommit,
            0x89 => Self::TransactionCommitCompleted,
            0x8A => Self::DeleteStream,
            0x8B => Self::DeleteStreamCompleted,
            0xB0 => Self::ReadEvent,
            0xB1 => Self::ReadEventCompleted,
            0xF0 => Self::BadRequest,
            0xF1 => Self::NotHandled,
            0xF2 => Self::Authenticate,
            0xF3 => Self::Authenticated,
            0xF4 => Self::NotAuthenticated,
            other => return Err(UnknownCommand(other)),
        };
        Ok(command)
    }
}

impl From<TcpCommand> for u8 {
    fn from(command: TcpCommand) -> Self {
        command.as_u8()
    }
}

impl fmt::Display for TcpCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}
