//! Vendor extension plugins.
//!
//! An [`Extension`] is a named SSH_FXP_EXTENDED request type. It encodes its
//! request fields, asks the driver for the request envelope, and decodes the
//! SSH_FXP_EXTENDED_REPLY sent back for it. Extensions are held in an
//! [`ExtensionRegistry`] owned by the version 3 driver.

use super::codec::Field;
use super::driver::Driver;
use super::error::{Error, Result};
use super::message::Packet;
use super::request::{OperationRequest, Response};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use tracing::warn;

/// A named vendor extension.
pub trait Extension: Send + Sync {
    /// Method name sent in the SSH_FXP_EXTENDED request, e.g.
    /// `statvfs@openssh.com`.
    fn method_name(&self) -> &str;

    /// Encodes the extension-specific request fields.
    fn encode_request(&self, args: &[Field]) -> Result<Vec<Field>>;

    /// Decodes an SSH_FXP_EXTENDED_REPLY sent for this extension.
    fn decode_response(&self, packet: &Packet) -> Result<Response>;

    /// Builds the request through the driver's extended-request primitive.
    fn request(&self, driver: &dyn Driver, args: &[Field]) -> Result<OperationRequest> {
        let fields = self.encode_request(args)?;
        Ok(driver.extended_request(self.method_name(), fields))
    }
}

type EncodeFn = Box<dyn Fn(&[Field]) -> Result<Vec<Field>> + Send + Sync>;
type DecodeFn = Box<dyn Fn(&Packet) -> Result<Response> + Send + Sync>;

/// An extension assembled from two closures.
pub struct FnExtension {
    name: String,
    encode: EncodeFn,
    decode: DecodeFn,
}

impl FnExtension {
    /// Creates an extension named `name`.
    pub fn new<E, D>(name: impl Into<String>, encode: E, decode: D) -> Self
    where
        E: Fn(&[Field]) -> Result<Vec<Field>> + Send + Sync + 'static,
        D: Fn(&Packet) -> Result<Response> + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            encode: Box::new(encode),
            decode: Box::new(decode),
        }
    }
}

impl fmt::Debug for FnExtension {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FnExtension")
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

impl Extension for FnExtension {
    fn method_name(&self) -> &str {
        &self.name
    }

    fn encode_request(&self, args: &[Field]) -> Result<Vec<Field>> {
        (self.encode)(args)
    }

    fn decode_response(&self, packet: &Packet) -> Result<Response> {
        (self.decode)(packet)
    }
}

/// Extensions keyed by method name.
#[derive(Default, Clone)]
pub struct ExtensionRegistry {
    extensions: HashMap<String, Arc<dyn Extension>>,
}

impl ExtensionRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the registered set with `extensions`.
    ///
    /// Previously registered names absent from `extensions` are dropped.
    /// When two extensions share a name the later one wins.
    pub fn load(&mut self, extensions: Vec<Arc<dyn Extension>>) {
        self.extensions.clear();
        for extension in extensions {
            let name = extension.method_name().to_string();
            if self.extensions.insert(name.clone(), extension).is_some() {
                warn!(extension = %name, "Duplicate extension name, keeping the last one");
            }
        }
    }

    /// Looks up an extension by method name.
    pub fn get(&self, name: &str) -> Option<&Arc<dyn Extension>> {
        self.extensions.get(name)
    }

    /// Returns `true` if `name` is registered.
    pub fn contains(&self, name: &str) -> bool {
        self.extensions.contains_key(name)
    }

    /// Registered method names, sorted.
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.extensions.keys().cloned().collect();
        names.sort();
        names
    }

    /// Number of registered extensions.
    pub fn len(&self) -> usize {
        self.extensions.len()
    }

    /// Returns `true` if nothing is registered.
    pub fn is_empty(&self) -> bool {
        self.extensions.is_empty()
    }

    /// Routes an extended reply to the extension registered under `key`.
    pub fn parse_extended_packet(&self, key: &str, packet: &Packet) -> Result<Response> {
        match self.extensions.get(key) {
            Some(extension) => extension.decode_response(packet),
            None => Err(Error::UnknownExtensionReply(key.to_string())),
        }
    }
}

impl fmt::Debug for ExtensionRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExtensionRegistry")
            .field("extensions", &self.names())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sftp::message::SftpMessageType;
    use crate::sftp::request::ExtendedReply;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn tagged(name: &'static str, tag: u8) -> Arc<dyn Extension> {
        Arc::new(FnExtension::new(
            name,
            |_| Ok(Vec::new()),
            move |_| {
                Ok(Response::Extended(ExtendedReply::Custom {
                    extension: name.to_string(),
                    payload: bytes::Bytes::from(vec![tag]),
                }))
            },
        ))
    }

    #[test]
    fn test_registry_lookup() {
        let mut registry = ExtensionRegistry::new();
        assert!(registry.is_empty());

        registry.load(vec![tagged("b@example.com", 1), tagged("a@example.com", 2)]);
        assert_eq!(registry.len(), 2);
        assert!(registry.contains("a@example.com"));
        assert_eq!(
            registry.names(),
            vec!["a@example.com".to_string(), "b@example.com".to_string()]
        );
    }

    #[test]
    fn test_duplicate_names_last_wins() {
        let mut registry = ExtensionRegistry::new();
        registry.load(vec![tagged("x@example.com", 1), tagged("x@example.com", 2)]);
        assert_eq!(registry.len(), 1);

        let packet = Packet::reply(SftpMessageType::ExtendedReply, 1, Vec::new());
        match registry.parse_extended_packet("x@example.com", &packet).unwrap() {
            Response::Extended(ExtendedReply::Custom { payload, .. }) => {
                assert_eq!(&payload[..], &[2]);
            }
            other => panic!("unexpected response: {:?}", other),
        }
    }

    #[test]
    fn test_parse_unknown_key() {
        let registry = ExtensionRegistry::new();
        let packet = Packet::reply(SftpMessageType::ExtendedReply, 1, Vec::new());
        assert_eq!(
            registry.parse_extended_packet("nope@example.com", &packet),
            Err(Error::UnknownExtensionReply("nope@example.com".to_string()))
        );
    }

    #[test]
    fn test_only_owner_decodes() {
        let a_calls = Arc::new(AtomicUsize::new(0));
        let b_calls = Arc::new(AtomicUsize::new(0));

        let counter = |name: &'static str, calls: Arc<AtomicUsize>| -> Arc<dyn Extension> {
            Arc::new(FnExtension::new(
                name,
                |_| Ok(Vec::new()),
                move |packet| {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Ok(Response::Extended(ExtendedReply::Custom {
                        extension: name.to_string(),
                        payload: packet.payload.clone(),
                    }))
                },
            ))
        };

        let mut registry = ExtensionRegistry::new();
        registry.load(vec![
            counter("a@example.com", a_calls.clone()),
            counter("b@example.com", b_calls.clone()),
        ]);

        let packet = Packet::reply(SftpMessageType::ExtendedReply, 1, Vec::new());
        registry.parse_extended_packet("b@example.com", &packet).unwrap();
        assert_eq!(a_calls.load(Ordering::SeqCst), 0);
        assert_eq!(b_calls.load(Ordering::SeqCst), 1);
    }
}
