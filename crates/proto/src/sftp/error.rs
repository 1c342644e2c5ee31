//! Error types for the SFTP protocol core
//!
//! Every error raised while building requests, negotiating, or dispatching
//! replies is one of these variants. None of them are retried at this layer.

use skiff_platform::SkiffError;
use std::fmt;

/// Result type for SFTP protocol operations
pub type Result<T> = std::result::Result<T, Error>;

/// SFTP protocol errors
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// Reply that no driver layer or extension recognizes, or that does not
    /// belong to any pending request
    ProtocolViolation(String),

    /// Extended reply for an extension key that was never registered
    UnknownExtensionReply(String),

    /// Operation that no layer of the negotiated chain implements
    OperationNotSupported {
        /// Operation name
        operation: String,
        /// Negotiated protocol version
        version: u32,
    },

    /// Payload ended before a field could be read
    BufferTooShort {
        /// Required length
        required: usize,
        /// Available length
        available: usize,
    },

    /// Malformed payload
    Decode(String),

    /// Arguments that do not fit the operation
    InvalidArgument(String),

    /// Protocol version outside the supported range
    UnsupportedVersion(u32),

    /// Invalid configuration
    InvalidConfig(String),

    /// Failure reported by the transport
    Transport(String),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::ProtocolViolation(msg) => write!(f, "SFTP protocol violation: {}", msg),
            Error::UnknownExtensionReply(key) => {
                write!(f, "Extended reply for unknown extension: {}", key)
            }
            Error::OperationNotSupported { operation, version } => {
                write!(
                    f,
                    "Operation '{}' not supported by SFTP version {}",
                    operation, version
                )
            }
            Error::BufferTooShort {
                required,
                available,
            } => {
                write!(
                    f,
                    "Buffer too short: need {} bytes, have {}",
                    required, available
                )
            }
            Error::Decode(msg) => write!(f, "Malformed SFTP payload: {}", msg),
            Error::InvalidArgument(msg) => write!(f, "Invalid argument: {}", msg),
            Error::UnsupportedVersion(v) => write!(f, "Unsupported SFTP version: {}", v),
            Error::InvalidConfig(msg) => write!(f, "Invalid SFTP configuration: {}", msg),
            Error::Transport(msg) => write!(f, "Transport error: {}", msg),
        }
    }
}

impl std::error::Error for Error {}

impl From<SkiffError> for Error {
    fn from(err: SkiffError) -> Self {
        Error::Transport(err.to_string())
    }
}

impl From<Error> for SkiffError {
    fn from(err: Error) -> Self {
        match err {
            Error::OperationNotSupported { .. } => SkiffError::NotSupported(err.to_string()),
            Error::InvalidConfig(msg) => SkiffError::Config(msg),
            other => SkiffError::Protocol(other.to_string()),
        }
    }
}
