//! Protocol implementations for the Skiff file transfer stack.
//!
//! This crate provides the client side of the SSH File Transfer Protocol:
//!
//! - **SFTP** versions 1 through 6, as a chain of version drivers
//! - Vendor extensions (`posix-rename@openssh.com`, `statvfs@openssh.com`, ...)
//!   as pluggable handlers
//!
//! # Features
//!
//! - `sftp` (default) - SFTP protocol drivers
//!
//! # Example
//!
//! ```rust
//! use skiff_proto::sftp::{SftpMessage, SftpMessageType};
//!
//! // Create and serialize an SFTP message
//! let message = SftpMessage::new(SftpMessageType::Init, vec![0, 0, 0, 6]);
//! let wire_format = message.to_bytes();
//!
//! // Parse from wire format
//! let parsed = SftpMessage::from_bytes(&wire_format).unwrap();
//! assert_eq!(&parsed.payload[..], &[0, 0, 0, 6]);
//! ```
//!
//! # References
//!
//! - [draft-ietf-secsh-filexfer-02](https://datatracker.ietf.org/doc/html/draft-ietf-secsh-filexfer-02) - SFTP version 3
//! - [draft-ietf-secsh-filexfer-04](https://datatracker.ietf.org/doc/html/draft-ietf-secsh-filexfer-04) - SFTP version 4
//! - [draft-ietf-secsh-filexfer-05](https://datatracker.ietf.org/doc/html/draft-ietf-secsh-filexfer-05) - SFTP version 5
//! - [draft-ietf-secsh-filexfer-13](https://datatracker.ietf.org/doc/html/draft-ietf-secsh-filexfer-13) - SFTP version 6
//! - [OpenSSH PROTOCOL](https://github.com/openssh/openssh-portable/blob/master/PROTOCOL) - OpenSSH extensions

#![warn(missing_docs)]
#![warn(rust_2018_idioms)]
#![forbid(unsafe_code)]

#[cfg(feature = "sftp")]
pub mod sftp;
