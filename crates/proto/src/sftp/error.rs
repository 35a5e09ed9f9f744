//! Error types for SFTP operations
//!
//! Four failure classes reach the caller:
//!
//! - [`SftpError::Protocol`]: the server (or the caller) broke the protocol.
//!   The connection should be considered unreliable afterwards.
//! - [`SftpError::VersionMismatch`]: version negotiation failed.
//! - [`SftpError::Status`]: a well-formed request failed on the server. The
//!   caller may correct the condition and retry.
//! - [`SftpError::Transport`]: the underlying stream failed or timed out. The
//!   caller must reconnect.

use super::types::StatusCode;
use filexfer_platform::XferError;
use std::fmt;

/// Result type for SFTP operations
pub type SftpResult<T> = std::result::Result<T, SftpError>;

/// Server-reported failure carried by a STATUS reply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusError {
    /// Status code
    pub code: StatusCode,
    /// Human-readable message, if the server sent one
    pub message: Option<String>,
    /// Language tag of the message, if the server sent one
    pub language_tag: Option<String>,
}

impl StatusError {
    /// Creates a status error without message or language tag.
    pub fn new(code: StatusCode) -> Self {
        Self {
            code,
            message: None,
            language_tag: None,
        }
    }
}

impl fmt::Display for StatusError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.message.as_deref() {
            Some(msg) if !msg.is_empty() => {
                write!(f, "SFTP error {}: {}", self.code.as_u32(), msg)
            }
            _ => write!(f, "SFTP error {}: {}", self.code.as_u32(), self.code.message()),
        }
    }
}

impl std::error::Error for StatusError {}

/// SFTP client errors
#[derive(Debug)]
pub enum SftpError {
    /// Malformed frame, unknown type tag, unexpected reply, id mismatch or
    /// an operation issued in the wrong session state
    Protocol(String),

    /// Server negotiated a protocol version other than the one we speak
    VersionMismatch {
        /// Version we requested
        expected: u32,
        /// Version the server answered with
        actual: u32,
    },

    /// Server answered with a non-OK STATUS
    Status(StatusError),

    /// Underlying stream failed or timed out
    Transport(XferError),

    /// Invalid session configuration
    Config(String),
}

impl SftpError {
    /// Returns the server status code for [`SftpError::Status`].
    pub fn status_code(&self) -> Option<StatusCode> {
        match self {
            SftpError::Status(status) => Some(status.code),
            _ => None,
        }
    }

    /// Returns true if the session cannot be used after this error.
    pub fn is_fatal(&self) -> bool {
        !matches!(self, SftpError::Status(_) | SftpError::Config(_))
    }
}

impl fmt::Display for SftpError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SftpError::Protocol(msg) => write!(f, "SFTP protocol error: {}", msg),
            SftpError::VersionMismatch { expected, actual } => write!(
                f,
                "SFTP version mismatch: expected {}, server offered {}",
                expected, actual
            ),
            SftpError::Status(status) => write!(f, "{}", status),
            SftpError::Transport(e) => write!(f, "SFTP transport error: {}", e),
            SftpError::Config(msg) => write!(f, "SFTP configuration error: {}", msg),
        }
    }
}

impl std::error::Error for SftpError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            SftpError::Status(status) => Some(status),
            SftpError::Transport(e) => Some(e),
            _ => None,
        }
    }
}

impl From<XferError> for SftpError {
    fn from(err: XferError) -> Self {
        SftpError::Transport(err)
    }
}

impl From<StatusError> for SftpError {
    fn from(err: StatusError) -> Self {
        SftpError::Status(err)
    }
}
