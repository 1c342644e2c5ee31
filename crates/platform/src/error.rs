//! Error types for Skiff

use std::fmt;

/// Unified error type for all Skiff operations
#[derive(Debug)]
pub enum SkiffError {
    /// I/O error
    Io(std::io::Error),

    /// Configuration error
    Config(String),

    /// Protocol error
    Protocol(String),

    /// Operation not supported by the negotiated protocol
    NotSupported(String),

    /// Other error
    Other(Box<dyn std::error::Error + Send + Sync>),
}

impl fmt::Display for SkiffError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkiffError::Io(e) => write!(f, "IO error: {}", e),
            SkiffError::Config(msg) => write!(f, "Configuration error: {}", msg),
            SkiffError::Protocol(msg) => write!(f, "Protocol error: {}", msg),
            SkiffError::NotSupported(msg) => write!(f, "Not supported: {}", msg),
            SkiffError::Other(e) => write!(f, "Error: {}", e),
        }
    }
}

impl std::error::Error for SkiffError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            SkiffError::Io(e) => Some(e),
            SkiffError::Other(e) => Some(e.as_ref()),
            _ => None,
        }
    }
}

impl From<std::io::Error> for SkiffError {
    fn from(err: std::io::Error) -> Self {
        SkiffError::Io(err)
    }
}

/// Result type for Skiff operations
pub type SkiffResult<T> = Result<T, SkiffError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = SkiffError::Config("max_version must be at least 1".to_string());
        assert_eq!(
            err.to_string(),
            "Configuration error: max_version must be at least 1"
        );

        let err = SkiffError::NotSupported("link at SFTP v3".to_string());
        assert_eq!(err.to_string(), "Not supported: link at SFTP v3");
    }

    #[test]
    fn test_io_error_conversion() {
        let io_err = std::io::Error::new(std::io::ErrorKind::BrokenPipe, "channel closed");
        let skiff_err: SkiffError = io_err.into();
        assert!(matches!(skiff_err, SkiffError::Io(_)));
        assert!(std::error::Error::source(&skiff_err).is_some());
    }

    #[test]
    fn test_protocol_error() {
        let err = SkiffError::Protocol("unexpected SSH_FXP_NAME for request 7".to_string());
        assert_eq!(
            err.to_string(),
            "Protocol error: unexpected SSH_FXP_NAME for request 7"
        );
        assert!(std::error::Error::source(&err).is_none());
    }

    #[test]
    fn test_other_error_keeps_source() {
        let inner = std::io::Error::new(std::io::ErrorKind::Other, "responder gone");
        let err = SkiffError::Other(Box::new(inner));
        assert_eq!(err.to_string(), "Error: responder gone");

        let source = std::error::Error::source(&err).unwrap();
        assert_eq!(source.to_string(), "responder gone");
    }

    #[test]
    fn test_result_type() {
        fn example() -> SkiffResult<u32> {
            Err(SkiffError::Config("min_version exceeds max_version".to_string()))
        }

        assert!(matches!(example(), Err(SkiffError::Config(_))));
    }
}
