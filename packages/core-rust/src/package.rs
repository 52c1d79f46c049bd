//! The package envelope exchanged with the server.
//!
//! Byte-level framing of the envelope is owned by the connection layer; this
//! module only defines the logical fields every package carries.

use std::fmt;

use bytes::Bytes;
use uuid::Uuid;

use crate::command::TcpCommand;

/// Envelope flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct TcpFlags(u8);

impl TcpFlags {
    pub const NONE: Self = Self(0x00);
    /// A login/password pair follows the correlation id.
    pub const AUTHENTICATED: Self = Self(0x01);

    #[must_use]
    pub fn bits(self) -> u8 {
        self.0
    }

    #[must_use]
    pub fn from_bits(bits: u8) -> Self {
        Self(bits)
    }

    #[must_use]
    pub fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }
}

/// Login/password pair attached to authenticated packages.
#[derive(Clone, PartialEq, Eq)]
pub struct UserCredentials {
    pub login: String,
    pub password: String,
}

impl UserCredentials {
    #[must_use]
    pub fn new(login: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            login: login.into(),
            password: password.into(),
        }
    }
}

// Keeps passwords out of debug logs.
impl fmt::Debug for UserCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UserCredentials")
            .field("login", &self.login)
            .field("password", &"***")
            .finish()
    }
}

/// One logical package: command, flags, correlation id, optional
/// credentials, and the schema-defined payload body.
#[derive(Debug, Clone, PartialEq)]
pub struct TcpPackage {
    pub command: TcpCommand,
    pub flags: TcpFlags,
    pub correlation_id: Uuid,
    pub credentials: Option<UserCredentials>,
    pub data: Bytes,
}

impl TcpPackage {
    /// Creates an unauthenticated package.
    #[must_use]
    pub fn new(command: TcpCommand, correlation_id: Uuid, data: impl Into<Bytes>) -> Self {
        Self {
            command,
            flags: TcpFlags::NONE,
            correlation_id,
            credentials: None,
            data: data.into(),
        }
    }

    /// Attaches credentials, setting or clearing the authenticated flag to match.
    #[must_use]
    pub fn with_credentials(mut self, credentials: Option<UserCredentials>) -> Self {
        self.flags = if credentials.is_some() {
            TcpFlags::AUTHENTICATED
        } else {
            TcpFlags::NONE
        };
        self.credentials = credentials;
        self
    }

    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        self.flags.contains(TcpFlags::AUTHENTICATED)
    }

    /// Interprets the payload as UTF-8 text, as carried by `BadRequest` and
    /// `NotAuthenticated` replies. Invalid sequences are replaced.
    #[must_use]
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.data).into_owned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn credentials_toggle_authenticated_flag() {
        let id = Uuid::new_v4();
        let package = TcpPackage::new(TcpCommand::WriteEvents, id, Vec::new());
        assert!(!package.is_authenticated());

        let package = package.with_credentials(Some(UserCredentials::new("admin", "changeit")));
        assert!(package.is_authenticated());
        assert_eq!(package.flags.bits(), 0x01);

        let package = package.with_credentials(None);
        assert!(!package.is_authenticated());
        assert!(package.credentials.is_none());
        assert_eq!(package.correlation_id, id);
    }

    #[test]
    fn debug_output_hides_password() {
        let rendered = format!("{:?}", UserCredentials::new("admin", "changeit"));
        assert!(rendered.contains("admin"));
        assert!(!rendered.contains("changeit"));
    }

    #[test]
    fn text_payload_is_lossy_utf8() {
        let package = TcpPackage::new(
            TcpCommand::BadRequest,
            Uuid::nil(),
            b"bad \xFF request".to_vec(),
        );
        assert_eq!(package.text(), "bad \u{FFFD} request");
    }
}
