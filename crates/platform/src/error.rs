//! Error types for filexfer transports

use std::fmt;
use std::time::Duration;

/// Unified error type for transport-level operations
#[derive(Debug)]
pub enum XferError {
    /// I/O error on the underlying stream
    Io(std::io::Error),

    /// Operation did not complete within the allotted time
    Timeout {
        /// What was being waited on (e.g. "receive", "send")
        operation: &'static str,
        /// Timeout that elapsed
        after: Duration,
    },

    /// The peer closed the channel (or it was closed locally)
    ChannelClosed(String),

    /// Configuration error
    Config(String),

    /// Other error
    Other(Box<dyn std::error::Error + Send + Sync>),
}

impl XferError {
    /// Returns true if this error is a timeout.
    pub fn is_timeout(&self) -> bool {
        match self {
            XferError::Timeout { .. } => true,
            XferError::Io(e) => e.kind() == std::io::ErrorKind::TimedOut,
            _ => false,
        }
    }
}

impl fmt::Display for XferError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            XferError::Io(e) => write!(f, "IO error: {}", e),
            XferError::Timeout { operation, after } => {
                write!(f, "Timed out after {:?} waiting for {}", after, operation)
            }
            XferError::ChannelClosed(msg) => write!(f, "Channel closed: {}", msg),
            XferError::Config(msg) => write!(f, "Configuration error: {}", msg),
            XferError::Other(e) => write!(f, "Error: {}", e),
        }
    }
}

impl std::error::Error for XferError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            XferError::Io(e) => Some(e),
            XferError::Other(e) => Some(e.as_ref()),
            _ => None,
        }
    }
}

impl From<std::io::Error> for XferError {
    fn from(err: std::io::Error) -> Self {
        match err.kind() {
            std::io::ErrorKind::UnexpectedEof => {
                XferError::ChannelClosed(format!("unexpected end of stream: {}", err))
            }
            _ => XferError::Io(err),
        }
    }
}

/// Result type for transport operations
pub type XferResult<T> = Result<T, XferError>;
