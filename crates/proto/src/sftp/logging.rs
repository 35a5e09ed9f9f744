//! Structured logging for SFTP sessions
//!
//! Provides structured, contextual logging using the `tracing` framework.
//!
//! # Log Levels
//!
//! - **TRACE**: Every frame sent and received
//! - **DEBUG**: Handle lifecycle
//! - **INFO**: Session state transitions, version negotiation
//! - **WARN**: Cleanup failures that were not reported to the caller
//!
//! # Example
//!
//! ```no_run
//! // Initialize tracing subscriber (in tests or applications)
//! tracing_subscriber::fmt()
//!     .with_env_filter("filexfer_proto::sftp=debug")
//!     .init();
//! ```

use super::error::SftpError;
use super::message::SftpMessageType;
use super::types::Handle;
use tracing::{debug, info, trace, warn};

/// Log an outgoing request frame
pub fn log_request(msg_type: SftpMessageType, request_id: Option<u32>, frame_len: usize) {
    trace!(
        msg_type = msg_type.name(),
        request_id = request_id,
        frame_len = frame_len,
        "SFTP request sent"
    );
}

/// Log an incoming reply frame
pub fn log_reply(msg_type: SftpMessageType, request_id: Option<u32>, frame_len: usize) {
    trace!(
        msg_type = msg_type.name(),
        request_id = request_id,
        frame_len = frame_len,
        "SFTP reply received"
    );
}

/// Log a session state transition
pub fn log_state_transition(old_state: &str, new_state: &str) {
    info!(
        state_from = old_state,
        state_to = new_state,
        "SFTP session state transition"
    );
}

/// Log the outcome of version negotiation
pub fn log_negotiated(version: u32, extension_count: usize) {
    info!(
        version = version,
        extensions = extension_count,
        "SFTP protocol initialized"
    );
}

/// Log a handle being opened
pub fn log_handle_opened(handle: &Handle, path: &str) {
    debug!(handle = %handle.to_hex(), path = path, "SFTP handle opened");
}

/// Log a handle being released
pub fn log_handle_closed(handle_hex: &str) {
    debug!(handle = handle_hex, "SFTP handle closed");
}

/// Log a failed CLOSE that is superseded by an earlier error
///
/// # Arguments
///
/// * `handle_hex` - Hex rendering of the handle being released
/// * `cleanup` - Error raised by the CLOSE exchange
/// * `original` - Error that triggered the cleanup and is returned instead
pub fn log_cleanup_failed(handle_hex: &str, cleanup: &SftpError, original: &SftpError) {
    warn!(
        handle = handle_hex,
        cleanup_error = %cleanup,
        original_error = %original,
        "SFTP handle cleanup failed"
    );
}
