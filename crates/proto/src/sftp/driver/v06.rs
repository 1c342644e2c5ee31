//! Version 6 driver: LINK, byte-range locks, the v6 ATTRS layout and the
//! end-of-list / end-of-file hints.

use super::{Driver, Operation, ProtocolVersion};
use crate::sftp::codec::{Field, PayloadReader};
use crate::sftp::error::Result;
use crate::sftp::message::{Packet, SftpMessageType};
use crate::sftp::request::{OperationRequest, Request, Response};
use crate::sftp::types::{AttrsLayout, Name};

/// Version 6 layer.
pub struct V6Driver {
    older: Box<dyn Driver>,
}

impl V6Driver {
    /// Wraps a version 5 chain.
    pub fn new(older: Box<dyn Driver>) -> Self {
        Self { older }
    }
}

impl Driver for V6Driver {
    fn version(&self) -> ProtocolVersion {
        ProtocolVersion(6)
    }

    fn older(&self) -> Option<&(dyn Driver + 'static)> {
        Some(self.older.as_ref())
    }

    fn older_mut(&mut self) -> Option<&mut (dyn Driver + 'static)> {
        Some(self.older.as_mut())
    }

    fn introduced(&self) -> &'static [Operation] {
        &[
            Operation::Link,
            Operation::Symlink,
            Operation::Block,
            Operation::Unblock,
        ]
    }

    fn attrs_layout(&self) -> AttrsLayout {
        AttrsLayout::V6
    }

    fn link(&self, new_link_path: &str, existing_path: &str, symlink: bool) -> Result<OperationRequest> {
        Ok(OperationRequest::new(
            SftpMessageType::Link,
            vec![
                Field::string(new_link_path),
                Field::string(existing_path),
                Field::Bool(symlink),
            ],
        ))
    }

    /// SSH_FXP_SYMLINK is gone in version 6; symbolic links go through LINK.
    fn symlink(&self, path: &str, target: &str) -> Result<OperationRequest> {
        self.link(path, target, true)
    }

    fn block(&self, handle: &[u8], offset: u64, length: u64, mask: u32) -> Result<OperationRequest> {
        Ok(OperationRequest::new(
            SftpMessageType::Block,
            vec![
                Field::string(handle),
                Field::U64(offset),
                Field::U64(length),
                Field::U32(mask),
            ],
        ))
    }

    fn unblock(&self, handle: &[u8], offset: u64, length: u64) -> Result<OperationRequest> {
        Ok(OperationRequest::new(
            SftpMessageType::Unblock,
            vec![Field::string(handle), Field::U64(offset), Field::U64(length)],
        ))
    }

    fn parse(&self, request: &Request, packet: &Packet, layout: AttrsLayout) -> Result<Response> {
        let mut r = PayloadReader::new(packet.payload.clone());
        match packet.kind() {
            Some(SftpMessageType::Name) => {
                let entries = Name::decode_list(&mut r, layout, false)?;
                Ok(Response::Name {
                    entries,
                    end_of_list: r.read_optional_bool()?,
                })
            }
            Some(SftpMessageType::Data) => {
                let data = r.read_bytes()?;
                Ok(Response::Data {
                    data,
                    eof: r.read_optional_bool()?,
                })
            }
            _ => self.older.parse(request, packet, layout),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sftp::codec::{encode_fields, PayloadWriter};
    use crate::sftp::driver::load;
    use crate::sftp::request::RequestType;
    use crate::sftp::types::LockFlags;

    fn v6() -> Box<dyn Driver> {
        load(ProtocolVersion::new(6).unwrap())
    }

    #[test]
    fn test_link_wire_format() {
        let req = v6().link("/tmp/new", "/tmp/old", false).unwrap();
        assert_eq!(req.msg_type(), SftpMessageType::Link);

        let payload = encode_fields(&req.fields, AttrsLayout::V6);
        let mut expected = vec![0, 0, 0, 8];
        expected.extend_from_slice(b"/tmp/new");
        expected.extend_from_slice(&[0, 0, 0, 8]);
        expected.extend_from_slice(b"/tmp/old");
        expected.push(0);
        assert_eq!(&payload[..], &expected[..]);
    }

    #[test]
    fn test_symlink_becomes_link() {
        let driver = v6();
        assert_eq!(
            driver.symlink("/tmp/l", "/tmp/t").unwrap(),
            driver.link("/tmp/l", "/tmp/t", true).unwrap()
        );
    }

    #[test]
    fn test_block_and_unblock() {
        let driver = v6();
        let req = driver
            .block(b"h1", 0, 512, LockFlags::READ | LockFlags::WRITE)
            .unwrap();
        assert_eq!(
            req.fields,
            vec![
                Field::string(b"h1"),
                Field::U64(0),
                Field::U64(512),
                Field::U32(LockFlags::READ | LockFlags::WRITE),
            ]
        );
        assert_eq!(driver.unblock(b"h1", 0, 512).unwrap().fields.len(), 3);
    }

    #[test]
    fn test_parse_name_end_of_list() {
        let mut w = PayloadWriter::new();
        w.put_u32(0);
        w.put_bool(true);
        let packet = Packet::reply(SftpMessageType::Name, 2, w.freeze());
        let request = Request {
            id: 2,
            request_type: RequestType::Packet(SftpMessageType::ReadDir),
        };

        let response = v6().parse(&request, &packet, AttrsLayout::V6).unwrap();
        assert_eq!(
            response,
            Response::Name {
                entries: Vec::new(),
                end_of_list: Some(true)
            }
        );
    }

    #[test]
    fn test_parse_data_eof_optional() {
        let request = Request {
            id: 2,
            request_type: RequestType::Packet(SftpMessageType::Read),
        };

        let mut w = PayloadWriter::new();
        w.put_string(b"abc");
        let packet = Packet::reply(SftpMessageType::Data, 2, w.freeze());
        match v6().parse(&request, &packet, AttrsLayout::V6).unwrap() {
            Response::Data { data, eof } => {
                assert_eq!(&data[..], b"abc");
                assert_eq!(eof, None);
            }
            other => panic!("unexpected response: {:?}", other),
        }

        let mut w = PayloadWriter::new();
        w.put_string(b"abc");
        w.put_bool(true);
        let packet = Packet::reply(SftpMessageType::Data, 2, w.freeze());
        match v6().parse(&request, &packet, AttrsLayout::V6).unwrap() {
            Response::Data { eof, .. } => assert_eq!(eof, Some(true)),
            other => panic!("unexpected response: {:?}", other),
        }
    }
}
