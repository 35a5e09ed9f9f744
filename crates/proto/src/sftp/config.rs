//! SFTP session configuration.

use super::error::{SftpError, SftpResult};
use std::time::Duration;

/// Default upper bound on an incoming frame's length prefix.
///
/// Comfortably above the 256 KiB OpenSSH uses for its own buffers.
pub const DEFAULT_MAX_PACKET_LEN: u32 = 256 * 1024 + 1024;

/// Smallest meaningful frame: type byte + request id + status code.
const MIN_PACKET_LEN: u32 = 9;

/// SFTP session configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SftpConfig {
    /// Subsystem name requested from the transport.
    pub subsystem: String,
    /// Maximum wait for one reply frame.
    pub read_timeout: Duration,
    /// Maximum wait for one request to be written.
    pub write_timeout: Duration,
    /// Largest accepted frame length prefix. Larger frames are rejected
    /// before their body is read.
    pub max_packet_len: u32,
}

impl Default for SftpConfig {
    fn default() -> Self {
        Self {
            subsystem: "sftp".to_string(),
            read_timeout: Duration::from_secs(60),
            write_timeout: Duration::from_secs(60),
            max_packet_len: DEFAULT_MAX_PACKET_LEN,
        }
    }
}

impl SftpConfig {
    /// Creates a configuration with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the subsystem name.
    pub fn with_subsystem(mut self, subsystem: impl Into<String>) -> Self {
        self.subsystem = subsystem.into();
        self
    }

    /// Sets the read timeout.
    pub fn with_read_timeout(mut self, timeout: Duration) -> Self {
        self.read_timeout = timeout;
        self
    }

    /// Sets the write timeout.
    pub fn with_write_timeout(mut self, timeout: Duration) -> Self {
        self.write_timeout = timeout;
        self
    }

    /// Sets the maximum accepted frame length.
    pub fn with_max_packet_len(mut self, len: u32) -> Self {
        self.max_packet_len = len;
        self
    }

    /// Checks the configuration for values the session cannot work with.
    pub fn validate(&self) -> SftpResult<()> {
        if self.subsystem.is_empty() {
            return Err(SftpError::Config("subsystem name is empty".to_string()));
        }
        if self.read_timeout.is_zero() {
            return Err(SftpError::Config("read timeout must be non-zero".to_string()));
        }
        if self.write_timeout.is_zero() {
            return Err(SftpError::Config("write timeout must be non-zero".to_string()));
        }
        if self.max_packet_len < MIN_PACKET_LEN {
            return Err(SftpError::Config(format!(
                "max packet length {} is below the minimum of {}",
                self.max_packet_len, MIN_PACKET_LEN
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = SftpConfig::default();
        assert_eq!(config.subsystem, "sftp");
        assert_eq!(config.read_timeout, Duration::from_secs(60));
        assert_eq!(config.max_packet_len, DEFAULT_MAX_PACKET_LEN);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_builder() {
        let config = SftpConfig::new()
            .with_subsystem("sftp-alt")
            .with_read_timeout(Duration::from_secs(5))
            .with_write_timeout(Duration::from_secs(2))
            .with_max_packet_len(64 * 1024);

        assert_eq!(config.subsystem, "sftp-alt");
        assert_eq!(config.read_timeout, Duration::from_secs(5));
        assert_eq!(config.write_timeout, Duration::from_secs(2));
        assert_eq!(config.max_packet_len, 65536);
    }

    #[test]
    fn test_validation() {
        assert!(SftpConfig::new().with_subsystem("").validate().is_err());
        assert!(SftpConfig::new()
            .with_read_timeout(Duration::ZERO)
            .validate()
            .is_err());
        assert!(SftpConfig::new()
            .with_write_timeout(Duration::ZERO)
            .validate()
            .is_err());
        assert!(matches!(
            SftpConfig::new().with_max_packet_len(4).validate(),
            Err(SftpError::Config(_))
        ));
    }
}
