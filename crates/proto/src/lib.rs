//! File transfer protocol implementations.
//!
//! This crate provides the client side of SFTP v3 as a pure protocol layer.
//! It speaks to the server over any byte stream implementing
//! [`DuplexStream`](filexfer_platform::DuplexStream); SSH transport,
//! authentication and channel setup are left to the caller.
//!
//! # Features
//!
//! - `sftp` (default) - SFTP v3 client
//! - `serde` - `Serialize`/`Deserialize` for attribute and status types
//!
//! # Example
//!
//! ```rust
//! use filexfer_proto::sftp::{FileAttributes, Packet};
//!
//! // Build and serialize a SETSTAT request
//! let attrs = FileAttributes::new().with_size(1000);
//! let frame = Packet::setstat(1, "/rock", &attrs).to_bytes();
//!
//! assert_eq!(&frame[..5], &[0, 0, 0, 26, 9]);
//! ```
//!
//! # References
//!
//! - [SFTP Draft v3](https://datatracker.ietf.org/doc/html/draft-ietf-secsh-filexfer-02) - SSH File Transfer Protocol
//! - [RFC 4254](https://datatracker.ietf.org/doc/html/rfc4254) - SSH Connection Protocol (subsystems)

#![warn(missing_docs)]
#![warn(rust_2018_idioms)]
#![forbid(unsafe_code)]

#[cfg(feature = "sftp")]
pub mod sftp;
