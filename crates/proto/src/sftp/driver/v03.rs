//! Version 3 driver: adds READLINK, SYMLINK and vendor extensions.

use super::{Driver, Operation, ProtocolVersion};
use crate::sftp::codec::{Field, PayloadReader};
use crate::sftp::error::{Error, Result};
use crate::sftp::extension::{Extension, ExtensionRegistry};
use crate::sftp::message::{Packet, SftpMessageType};
use crate::sftp::request::{OperationRequest, Request, RequestType, Response};
use crate::sftp::types::{AttrsLayout, Status};
use std::sync::Arc;
use tracing::debug;

/// Version 3 layer.
///
/// Owns the extension registry for the whole chain; newer layers reach it
/// through delegation.
pub struct V3Driver {
    older: Box<dyn Driver>,
    extensions: ExtensionRegistry,
}

impl V3Driver {
    /// Wraps a version 2 chain with an empty registry.
    pub fn new(older: Box<dyn Driver>) -> Self {
        Self {
            older,
            extensions: ExtensionRegistry::new(),
        }
    }

    /// Returns the extension registry.
    pub fn registry(&self) -> &ExtensionRegistry {
        &self.extensions
    }
}

impl Driver for V3Driver {
    fn version(&self) -> ProtocolVersion {
        ProtocolVersion(3)
    }

    fn older(&self) -> Option<&(dyn Driver + 'static)> {
        Some(self.older.as_ref())
    }

    fn older_mut(&mut self) -> Option<&mut (dyn Driver + 'static)> {
        Some(self.older.as_mut())
    }

    fn introduced(&self) -> &'static [Operation] {
        &[Operation::ReadLink, Operation::Symlink, Operation::Extended]
    }

    fn readlink(&self, path: &str) -> Result<OperationRequest> {
        Ok(OperationRequest::new(
            SftpMessageType::ReadLink,
            vec![Field::string(path)],
        ))
    }

    fn symlink(&self, path: &str, target: &str) -> Result<OperationRequest> {
        Ok(OperationRequest::new(
            SftpMessageType::Symlink,
            vec![Field::string(path), Field::string(target)],
        ))
    }

    fn extended(&self, name: &str, args: &[Field]) -> Result<OperationRequest> {
        let extension = self
            .extensions
            .get(name)
            .ok_or_else(|| Error::OperationNotSupported {
                operation: name.to_string(),
                version: self.version().get(),
            })?;
        extension.request(self, args)
    }

    fn load_extensions(&mut self, extensions: Vec<Arc<dyn Extension>>) -> Result<()> {
        self.extensions.load(extensions);
        debug!(count = self.extensions.len(), "Extension registry replaced");
        Ok(())
    }

    fn extension_names(&self) -> Vec<String> {
        self.extensions.names()
    }

    fn parse(&self, request: &Request, packet: &Packet, layout: AttrsLayout) -> Result<Response> {
        match packet.kind() {
            Some(SftpMessageType::ExtendedReply) => {
                match &request.request_type {
                    RequestType::Extension(name) => self.extensions.parse_extended_packet(name, packet),
                    // base requests never reach the registry
                    RequestType::Packet(msg_type) => {
                        Err(Error::UnknownExtensionReply(msg_type.name().to_string()))
                    }
                }
            }
            Some(SftpMessageType::Status) => {
                let mut r = PayloadReader::new(packet.payload.clone());
                let mut status = Status::new(r.read_u32()?);
                // Some servers omit the text fields entirely.
                if r.has_remaining() {
                    status.message = Some(r.read_string()?);
                }
                if r.has_remaining() {
                    status.language = Some(r.read_string()?);
                }
                Ok(Response::Status(status))
            }
            _ => self.older.parse(request, packet, layout),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sftp::codec::{encode_fields, PayloadWriter};
    use crate::sftp::driver::{V1Driver, V2Driver};
    use crate::sftp::extension::FnExtension;
    use bytes::Bytes;

    fn driver() -> V3Driver {
        V3Driver::new(Box::new(V2Driver::new(Box::new(V1Driver::new()))))
    }

    fn echo(name: &'static str) -> Arc<dyn Extension> {
        Arc::new(FnExtension::new(
            name,
            |args| Ok(args.to_vec()),
            move |packet| {
                Ok(Response::Extended(
                    crate::sftp::request::ExtendedReply::Custom {
                        extension: name.to_string(),
                        payload: packet.payload.clone(),
                    },
                ))
            },
        ))
    }

    #[test]
    fn test_readlink_wire_format() {
        let req = driver().readlink("/tmp/link").unwrap();
        assert_eq!(req.msg_type(), SftpMessageType::ReadLink);

        let payload = encode_fields(&req.fields, AttrsLayout::V3);
        let mut expected = vec![0, 0, 0, 9];
        expected.extend_from_slice(b"/tmp/link");
        assert_eq!(&payload[..], &expected[..]);
    }

    #[test]
    fn test_symlink_field_order() {
        let req = driver().symlink("/tmp/link", "/tmp/target").unwrap();
        assert_eq!(
            req.fields,
            vec![Field::string("/tmp/link"), Field::string("/tmp/target")]
        );
    }

    #[test]
    fn test_parse_status_with_message() {
        let mut w = PayloadWriter::new();
        w.put_u32(2);
        w.put_string("No such file");
        w.put_string("en");
        let packet = Packet::reply(SftpMessageType::Status, 5, w.freeze());
        let request = Request {
            id: 5,
            request_type: RequestType::Packet(SftpMessageType::ReadLink),
        };

        let response = driver().parse(&request, &packet, AttrsLayout::V3).unwrap();
        let status = response.status().unwrap();
        assert_eq!(status.code, 2);
        assert_eq!(status.message.as_deref(), Some("No such file"));
        assert_eq!(status.language.as_deref(), Some("en"));
    }

    #[test]
    fn test_parse_status_without_message() {
        let packet = Packet::reply(SftpMessageType::Status, 5, vec![0, 0, 0, 0]);
        let request = Request {
            id: 5,
            request_type: RequestType::Packet(SftpMessageType::Remove),
        };
        let response = driver().parse(&request, &packet, AttrsLayout::V3).unwrap();
        assert_eq!(response, Response::Status(Status::new(0)));
    }

    #[test]
    fn test_extended_requires_registration() {
        let mut driver = driver();
        assert!(matches!(
            driver.extended("echo@example.com", &[]),
            Err(Error::OperationNotSupported { .. })
        ));

        driver.load_extensions(vec![echo("echo@example.com")]).unwrap();
        let req = driver
            .extended("echo@example.com", &[Field::U32(9)])
            .unwrap();
        assert_eq!(
            req.request_type,
            RequestType::Extension("echo@example.com".to_string())
        );
        assert_eq!(
            req.fields,
            vec![Field::string("echo@example.com"), Field::U32(9)]
        );
    }

    #[test]
    fn test_extended_reply_routed_by_name() {
        let mut driver = driver();
        driver
            .load_extensions(vec![echo("a@example.com"), echo("b@example.com")])
            .unwrap();

        let packet = Packet::reply(SftpMessageType::ExtendedReply, 3, Bytes::from_static(b"xy"));
        let request = Request {
            id: 3,
            request_type: RequestType::Extension("b@example.com".to_string()),
        };
        match driver.parse(&request, &packet, AttrsLayout::V3).unwrap() {
            Response::Extended(crate::sftp::request::ExtendedReply::Custom {
                extension,
                payload,
            }) => {
                assert_eq!(extension, "b@example.com");
                assert_eq!(&payload[..], b"xy");
            }
            other => panic!("unexpected response: {:?}", other),
        }
    }

    #[test]
    fn test_extended_reply_unknown_extension() {
        let packet = Packet::reply(SftpMessageType::ExtendedReply, 3, Vec::new());
        let request = Request {
            id: 3,
            request_type: RequestType::Extension("gone@example.com".to_string()),
        };
        assert_eq!(
            driver().parse(&request, &packet, AttrsLayout::V3),
            Err(Error::UnknownExtensionReply("gone@example.com".to_string()))
        );
    }

    #[test]
    fn test_extended_reply_to_base_request_skips_registry() {
        let mut driver = driver();
        driver.load_extensions(vec![echo("SSH_FXP_STAT")]).unwrap();

        let packet = Packet::reply(SftpMessageType::ExtendedReply, 4, Bytes::from_static(b"zz"));
        let request = Request {
            id: 4,
            request_type: RequestType::Packet(SftpMessageType::Stat),
        };
        assert_eq!(
            driver.parse(&request, &packet, AttrsLayout::V3),
            Err(Error::UnknownExtensionReply("SSH_FXP_STAT".to_string()))
        );
    }

    #[test]
    fn test_load_extensions_replaces() {
        let mut driver = driver();
        driver.load_extensions(vec![echo("a@example.com")]).unwrap();
        driver.load_extensions(vec![echo("b@example.com")]).unwrap();
        assert_eq!(driver.extension_names(), vec!["b@example.com".to_string()]);
        assert!(driver.registry().get("a@example.com").is_none());
    }
}
