//! `eventwire` Core — TCP commands, the package envelope, payload schemas, and result types.

pub mod command;
pub mod messages;
pub mod package;
pub mod types;

pub use command::{TcpCommand, UnknownCommand};
pub use messages::{NotHandledReason, OperationResult, PayloadError, ReadEventResult};
pub use package::{TcpFlags, TcpPackage, UserCredentials};
pub use types::{
    DeleteResult, EventData, EventReadResult, EventReadStatus, ExpectedVersion, Position,
    RecordedEvent, ResolvedEvent, WriteResult,
};
