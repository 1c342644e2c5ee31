//! # Skiff Platform
//!
//! Core platform types shared by the Skiff SFTP crates.
//!
//! This crate provides the unified error type (`SkiffError`, `SkiffResult`)
//! that transports and callers outside the protocol core speak.
//!
//! # Examples
//!
//! ```
//! use skiff_platform::{SkiffError, SkiffResult};
//!
//! fn negotiated_version() -> SkiffResult<u32> {
//!     Ok(3)
//! }
//!
//! # fn main() -> SkiffResult<()> {
//! let version = negotiated_version()?;
//! assert_eq!(version, 3);
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![warn(rust_2018_idioms)]
#![forbid(unsafe_code)]

pub mod error;

pub use error::{SkiffError, SkiffResult};

/// Platform version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
