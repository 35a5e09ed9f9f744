//! SFTP (SSH File Transfer Protocol) client.
//!
//! This module implements the client side of SFTP v3, the version OpenSSH
//! and most other servers speak.
//!
//! # Architecture
//!
//! SFTP runs as a subsystem over an already-authenticated SSH channel:
//! 1. Open a channel through a [`SubsystemOpener`](filexfer_platform::SubsystemOpener)
//! 2. Request the "sftp" subsystem
//! 3. Exchange length-prefixed SFTP frames over the resulting stream
//!
//! # Protocol Flow
//!
//! ```text
//! Client                          Server
//!   |                               |
//!   |-- SSH_FXP_INIT -------------->|
//!   |<- SSH_FXP_VERSION ------------|
//!   |                               |
//!   |-- SSH_FXP_OPEN -------------->|
//!   |<- SSH_FXP_HANDLE -------------|
//!   |                               |
//!   |-- SSH_FXP_READ -------------->|
//!   |<- SSH_FXP_DATA ---------------|
//!   |                               |
//!   |-- SSH_FXP_CLOSE ------------->|
//!   |<- SSH_FXP_STATUS -------------|
//! ```
//!
//! # Example
//!
//! ```rust,no_run
//! use filexfer_platform::IoStream;
//! use filexfer_proto::sftp::{FileAttributes, SftpClient};
//!
//! # #[tokio::main]
//! # async fn main() -> Result<(), Box<dyn std::error::Error>> {
//! # let (transport, _peer) = tokio::io::duplex(64 * 1024);
//! let mut sftp = SftpClient::new(IoStream::from_duplex(transport));
//! sftp.initialize().await?;
//!
//! sftp.make_dir("upload", &FileAttributes::new().with_permissions(0o755)).await?;
//! sftp.open_create("upload/notes.txt", &FileAttributes::new()).await?;
//! sftp.write_file("upload/notes.txt", b"hello").await?;
//!
//! let data = sftp.read_file("upload/notes.txt", 1024, 0).await?;
//! assert_eq!(data, b"hello");
//!
//! for entry in sftp.read_dir("upload").await? {
//!     println!("{}", entry.longname);
//! }
//!
//! sftp.shutdown().await?;
//! # Ok(())
//! # }
//! ```
//!
//! # References
//!
//! - [SFTP Draft v3](https://datatracker.ietf.org/doc/html/draft-ietf-secsh-filexfer-02)

pub mod attrs;
pub mod client;
pub mod config;
pub mod error;
pub mod logging;
pub mod message;
pub mod request_id;
pub mod types;
mod wire;

pub use attrs::FileAttributes;
pub use client::{SessionState, SftpClient};
pub use config::SftpConfig;
pub use error::{SftpError, SftpResult, StatusError};
pub use message::{Packet, Reply, SftpMessageType, SFTP_VERSION};
pub use types::{classify_file_type, DirEntry, FileType, Handle, OpenFlags, StatusCode};
