//! SFTP session configuration
//!
//! Provides the session configuration and its builder.

use super::driver::ProtocolVersion;
use super::error::{Error, Result};
use super::extensions::builtin;
use super::message::DEFAULT_MAX_FRAME_LEN;

/// Smallest accepted frame limit.
const MIN_FRAME_LEN: usize = 1024;

/// Session configuration
#[derive(Clone, Debug)]
pub struct SftpConfig {
    /// Highest protocol version to offer
    pub max_version: u32,

    /// Lowest protocol version to accept from the server
    pub min_version: u32,

    /// Extension names to load when the server advertises them
    pub extensions: Vec<String>,

    /// Largest inbound frame accepted before the stream is rejected
    pub max_frame_len: usize,
}

impl Default for SftpConfig {
    fn default() -> Self {
        Self {
            max_version: ProtocolVersion::MAX.get(),
            min_version: ProtocolVersion::MIN.get(),
            extensions: builtin()
                .iter()
                .map(|e| e.method_name().to_string())
                .collect(),
            max_frame_len: DEFAULT_MAX_FRAME_LEN,
        }
    }
}

impl SftpConfig {
    /// Create builder for session configuration
    pub fn builder() -> SftpConfigBuilder {
        SftpConfigBuilder::new()
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        ProtocolVersion::new(self.max_version)
            .map_err(|_| Error::InvalidConfig(format!("max_version {} out of range", self.max_version)))?;
        ProtocolVersion::new(self.min_version)
            .map_err(|_| Error::InvalidConfig(format!("min_version {} out of range", self.min_version)))?;
        if self.min_version > self.max_version {
            return Err(Error::InvalidConfig(format!(
                "min_version {} exceeds max_version {}",
                self.min_version, self.max_version
            )));
        }
        if self.max_frame_len < MIN_FRAME_LEN {
            return Err(Error::InvalidConfig(format!(
                "max_frame_len must be at least {} bytes",
                MIN_FRAME_LEN
            )));
        }
        Ok(())
    }

    /// Returns `true` if the extension `name` may be loaded.
    pub fn extension_enabled(&self, name: &str) -> bool {
        self.extensions.iter().any(|e| e == name)
    }
}

/// Builder for SftpConfig
#[derive(Default)]
pub struct SftpConfigBuilder {
    max_version: Option<u32>,
    min_version: Option<u32>,
    extensions: Option<Vec<String>>,
    max_frame_len: Option<usize>,
}

impl SftpConfigBuilder {
    /// Create new builder
    pub fn new() -> Self {
        Self::default()
    }

    /// Set highest version to offer
    pub fn with_max_version(mut self, version: u32) -> Self {
        self.max_version = Some(version);
        self
    }

    /// Set lowest version to accept
    pub fn with_min_version(mut self, version: u32) -> Self {
        self.min_version = Some(version);
        self
    }

    /// Set extensions to load
    pub fn with_extensions<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.extensions = Some(names.into_iter().map(Into::into).collect());
        self
    }

    /// Disable all extensions
    pub fn without_extensions(mut self) -> Self {
        self.extensions = Some(Vec::new());
        self
    }

    /// Set frame size limit
    pub fn with_max_frame_len(mut self, len: usize) -> Self {
        self.max_frame_len = Some(len);
        self
    }

    /// Build SftpConfig with validation
    pub fn build(self) -> Result<SftpConfig> {
        let defaults = SftpConfig::default();
        let config = SftpConfig {
            max_version: self.max_version.unwrap_or(defaults.max_version),
            min_version: self.min_version.unwrap_or(defaults.min_version),
            extensions: self.extensions.unwrap_or(defaults.extensions),
            max_frame_len: self.max_frame_len.unwrap_or(defaults.max_frame_len),
        };

        config.validate()?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = SftpConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.max_version, 6);
        assert_eq!(config.min_version, 1);
        assert!(config.extension_enabled("statvfs@openssh.com"));
        assert_eq!(config.max_frame_len, DEFAULT_MAX_FRAME_LEN);
    }

    #[test]
    fn test_builder() {
        let config = SftpConfig::builder()
            .with_max_version(3)
            .with_extensions(["limits@openssh.com"])
            .build()
            .expect("Failed to build config");

        assert_eq!(config.max_version, 3);
        assert!(config.extension_enabled("limits@openssh.com"));
        assert!(!config.extension_enabled("statvfs@openssh.com"));
    }

    #[test]
    fn test_without_extensions() {
        let config = SftpConfig::builder().without_extensions().build().unwrap();
        assert!(config.extensions.is_empty());
    }

    #[test]
    fn test_invalid_versions() {
        assert!(matches!(
            SftpConfig::builder().with_max_version(7).build(),
            Err(Error::InvalidConfig(_))
        ));
        assert!(matches!(
            SftpConfig::builder().with_min_version(0).build(),
            Err(Error::InvalidConfig(_))
        ));
        assert!(matches!(
            SftpConfig::builder()
                .with_min_version(4)
                .with_max_version(3)
                .build(),
            Err(Error::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_frame_limit() {
        assert!(SftpConfig::builder().with_max_frame_len(512).build().is_err());
        assert!(SftpConfig::builder().with_max_frame_len(1024).build().is_ok());
    }
}
