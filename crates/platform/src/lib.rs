//! # filexfer Platform
//!
//! Core platform types and traits shared by the filexfer protocol crates.
//!
//! This crate provides:
//! - Unified transport error types (`XferError`, `XferResult`)
//! - Transport capability traits (`SubsystemOpener`, `DuplexStream`)
//! - A tokio-backed [`IoStream`] adapter
//!
//! # Examples
//!
//! ```
//! use filexfer_platform::{XferError, XferResult};
//!
//! fn example_function() -> XferResult<String> {
//!     Ok("Hello, filexfer!".to_string())
//! }
//!
//! # fn main() -> XferResult<()> {
//! let result = example_function()?;
//! assert_eq!(result, "Hello, filexfer!");
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![warn(rust_2018_idioms)]
#![forbid(unsafe_code)]

pub mod error;
pub mod traits;

pub use error::{XferError, XferResult};
pub use traits::{DuplexStream, IoStream, SubsystemOpener};

/// Platform version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
