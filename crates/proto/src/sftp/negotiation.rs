//! Version negotiation.
//!
//! The client opens with `SSH_FXP_INIT` carrying the highest version it
//! speaks; the server answers `SSH_FXP_VERSION` with its own version and the
//! extensions it supports:
//!
//! ```text
//! SSH_FXP_VERSION
//!     uint32  version
//!     repeat until end of payload:
//!         string  extension name
//!         string  extension data
//! ```

use super::codec::{PayloadReader, PayloadWriter};
use super::config::SftpConfig;
use super::driver::ProtocolVersion;
use super::error::{Error, Result};
use super::extension::Extension;
use super::extensions::builtin;
use super::logging;
use super::message::{SftpMessage, SftpMessageType, DEFAULT_MAX_FRAME_LEN};
use bytes::Bytes;
use std::fmt;
use std::sync::Arc;
use tracing::debug;

/// Builds the `SSH_FXP_INIT` message.
pub fn init_message(version: u32) -> SftpMessage {
    let mut w = PayloadWriter::new();
    w.put_u32(version);
    SftpMessage::new(SftpMessageType::Init, w.freeze())
}

/// Decoded `SSH_FXP_VERSION`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerVersion {
    /// Version announced by the server
    pub version: u32,
    /// Advertised extensions as `(name, data)` pairs
    pub extensions: Vec<(String, Bytes)>,
}

impl ServerVersion {
    /// Parses an `SSH_FXP_VERSION` message.
    pub fn parse(message: &SftpMessage) -> Result<Self> {
        if message.msg_type != SftpMessageType::Version {
            return Err(Error::ProtocolViolation(format!(
                "expected SSH_FXP_VERSION, got {}",
                message.msg_type
            )));
        }

        let mut r = PayloadReader::new(message.payload.clone());
        let version = r.read_u32()?;
        let mut extensions = Vec::new();
        while r.has_remaining() {
            let name = r.read_string()?;
            let data = r.read_bytes()?;
            extensions.push((name, data));
        }

        Ok(Self {
            version,
            extensions,
        })
    }

    /// Returns `true` if the server advertised `name`.
    pub fn advertises(&self, name: &str) -> bool {
        self.extensions.iter().any(|(n, _)| n == name)
    }
}

/// Outcome of negotiation: the version in use and the extensions to load.
#[derive(Clone)]
pub struct Negotiated {
    /// Version in use
    pub version: ProtocolVersion,
    /// Extensions both sides agreed on
    pub extensions: Vec<Arc<dyn Extension>>,
    /// Largest inbound frame the session accepts
    pub max_frame_len: usize,
}

impl Negotiated {
    /// Negotiated state for a fixed version with no extensions.
    pub fn fixed(version: ProtocolVersion) -> Self {
        Self {
            version,
            extensions: Vec::new(),
            max_frame_len: DEFAULT_MAX_FRAME_LEN,
        }
    }

    /// Names of the agreed extensions.
    pub fn extension_names(&self) -> Vec<String> {
        self.extensions
            .iter()
            .map(|e| e.method_name().to_string())
            .collect()
    }
}

impl fmt::Debug for Negotiated {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Negotiated")
            .field("version", &self.version)
            .field("extensions", &self.extension_names())
            .field("max_frame_len", &self.max_frame_len)
            .finish()
    }
}

/// Negotiates against the built-in extension catalog.
pub fn negotiate(config: &SftpConfig, server: &ServerVersion) -> Result<Negotiated> {
    negotiate_with(config, server, builtin())
}

/// Negotiates against a caller-supplied extension catalog.
///
/// An extension is selected when the server advertised it and the
/// configuration enables it. Extensions need version 3 or later.
pub fn negotiate_with(
    config: &SftpConfig,
    server: &ServerVersion,
    catalog: Vec<Arc<dyn Extension>>,
) -> Result<Negotiated> {
    config.validate()?;

    let chosen = config.max_version.min(server.version);
    if chosen < config.min_version {
        return Err(Error::UnsupportedVersion(server.version));
    }
    let version = ProtocolVersion::new(chosen)?;

    let extensions: Vec<Arc<dyn Extension>> = if version.get() >= 3 {
        catalog
            .into_iter()
            .filter(|e| {
                let name = e.method_name();
                server.advertises(name) && config.extension_enabled(name)
            })
            .collect()
    } else {
        if !server.extensions.is_empty() {
            debug!(version = version.get(), "Ignoring extensions below version 3");
        }
        Vec::new()
    };

    logging::log_version_negotiated(config.max_version, server.version, version.get());
    Ok(Negotiated {
        version,
        extensions,
        max_frame_len: config.max_frame_len,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn server(version: u32, extensions: &[&str]) -> ServerVersion {
        ServerVersion {
            version,
            extensions: extensions
                .iter()
                .map(|n| (n.to_string(), Bytes::from_static(b"1")))
                .collect(),
        }
    }

    #[test]
    fn test_init_message() {
        let bytes = init_message(6).to_bytes();
        assert_eq!(bytes, vec![0, 0, 0, 5, 1, 0, 0, 0, 6]);
    }

    #[test]
    fn test_parse_version_with_extensions() {
        let mut w = PayloadWriter::new();
        w.put_u32(3);
        w.put_string("posix-rename@openssh.com");
        w.put_string("1");
        w.put_string("statvfs@openssh.com");
        w.put_string("2");
        let message = SftpMessage::new(SftpMessageType::Version, w.freeze());

        let parsed = ServerVersion::parse(&message).unwrap();
        assert_eq!(parsed.version, 3);
        assert_eq!(parsed.extensions.len(), 2);
        assert!(parsed.advertises("statvfs@openssh.com"));
        assert!(!parsed.advertises("limits@openssh.com"));
    }

    #[test]
    fn test_parse_rejects_other_types() {
        let message = SftpMessage::new(SftpMessageType::Status, Bytes::new());
        assert!(matches!(
            ServerVersion::parse(&message),
            Err(Error::ProtocolViolation(_))
        ));
    }

    #[test]
    fn test_negotiate_picks_lower_version() {
        let config = SftpConfig::default();
        let negotiated = negotiate(&config, &server(3, &[])).unwrap();
        assert_eq!(negotiated.version.get(), 3);

        let config = SftpConfig::builder().with_max_version(4).build().unwrap();
        let negotiated = negotiate(&config, &server(6, &[])).unwrap();
        assert_eq!(negotiated.version.get(), 4);
    }

    #[test]
    fn test_negotiate_below_minimum() {
        let config = SftpConfig::builder().with_min_version(3).build().unwrap();
        assert_eq!(
            negotiate(&config, &server(2, &[])).unwrap_err(),
            Error::UnsupportedVersion(2)
        );
    }

    #[test]
    fn test_negotiate_selects_advertised_and_enabled() {
        let config = SftpConfig::builder()
            .with_extensions(["statvfs@openssh.com", "limits@openssh.com"])
            .build()
            .unwrap();
        let negotiated = negotiate(
            &config,
            &server(3, &["statvfs@openssh.com", "posix-rename@openssh.com"]),
        )
        .unwrap();
        assert_eq!(
            negotiated.extension_names(),
            vec!["statvfs@openssh.com".to_string()]
        );
    }

    #[test]
    fn test_negotiate_carries_frame_limit() {
        let config = SftpConfig::builder().with_max_frame_len(4096).build().unwrap();
        let negotiated = negotiate(&config, &server(3, &[])).unwrap();
        assert_eq!(negotiated.max_frame_len, 4096);

        let fixed = Negotiated::fixed(ProtocolVersion::new(3).unwrap());
        assert_eq!(fixed.max_frame_len, DEFAULT_MAX_FRAME_LEN);
    }

    #[test]
    fn test_no_extensions_before_v3() {
        let negotiated = negotiate(
            &SftpConfig::default(),
            &server(2, &["statvfs@openssh.com"]),
        )
        .unwrap();
        assert!(negotiated.extensions.is_empty());
    }
}
