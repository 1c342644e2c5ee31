//! Version 4 driver: attribute selection on stat, the v4 ATTRS layout and
//! NAME entries without a long name.

use super::{Driver, Operation, ProtocolVersion};
use crate::sftp::codec::{Field, PayloadReader};
use crate::sftp::error::Result;
use crate::sftp::message::{Packet, SftpMessageType};
use crate::sftp::request::{OperationRequest, Request, Response};
use crate::sftp::types::{AttrFlags, AttrsLayout, Name};

/// Version 4 layer.
pub struct V4Driver {
    older: Box<dyn Driver>,
}

impl V4Driver {
    /// Wraps a version 3 chain.
    pub fn new(older: Box<dyn Driver>) -> Self {
        Self { older }
    }
}

fn stat_request(msg_type: SftpMessageType, target: &[u8], flags: Option<u32>) -> OperationRequest {
    OperationRequest::new(
        msg_type,
        vec![
            Field::string(target),
            Field::U32(flags.unwrap_or(AttrFlags::V4_STAT_DEFAULT)),
        ],
    )
}

impl Driver for V4Driver {
    fn version(&self) -> ProtocolVersion {
        ProtocolVersion(4)
    }

    fn older(&self) -> Option<&(dyn Driver + 'static)> {
        Some(self.older.as_ref())
    }

    fn older_mut(&mut self) -> Option<&mut (dyn Driver + 'static)> {
        Some(self.older.as_mut())
    }

    fn introduced(&self) -> &'static [Operation] {
        &[Operation::Stat, Operation::LStat, Operation::FStat]
    }

    fn attrs_layout(&self) -> AttrsLayout {
        AttrsLayout::V4
    }

    fn stat(&self, path: &str, flags: Option<u32>) -> Result<OperationRequest> {
        Ok(stat_request(SftpMessageType::Stat, path.as_bytes(), flags))
    }

    fn lstat(&self, path: &str, flags: Option<u32>) -> Result<OperationRequest> {
        Ok(stat_request(SftpMessageType::LStat, path.as_bytes(), flags))
    }

    fn fstat(&self, handle: &[u8], flags: Option<u32>) -> Result<OperationRequest> {
        Ok(stat_request(SftpMessageType::FStat, handle, flags))
    }

    fn parse(&self, request: &Request, packet: &Packet, layout: AttrsLayout) -> Result<Response> {
        match packet.kind() {
            Some(SftpMessageType::Name) => {
                let mut r = PayloadReader::new(packet.payload.clone());
                Ok(Response::Name {
                    entries: Name::decode_list(&mut r, layout, false)?,
                    end_of_list: None,
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
    use crate::sftp::driver::{load, ProtocolVersion};
    use crate::sftp::request::RequestType;
    use crate::sftp::types::{FileAttributes, FileType};

    #[test]
    fn test_stat_default_flags() {
        let driver = load(ProtocolVersion::new(4).unwrap());
        let req = driver.stat("/etc", None).unwrap();

        let payload = encode_fields(&req.fields, driver.attrs_layout());
        let mut expected = vec![0, 0, 0, 4];
        expected.extend_from_slice(b"/etc");
        expected.extend_from_slice(&AttrFlags::V4_STAT_DEFAULT.to_be_bytes());
        assert_eq!(&payload[..], &expected[..]);
    }

    #[test]
    fn test_fstat_explicit_flags() {
        let driver = load(ProtocolVersion::new(4).unwrap());
        let req = driver.fstat(b"h1", Some(AttrFlags::SIZE)).unwrap();
        assert_eq!(req.fields[1], Field::U32(AttrFlags::SIZE));
    }

    #[test]
    fn test_parse_name_without_longname() {
        let mut attrs = FileAttributes::new();
        attrs.file_type = Some(FileType::Symlink);

        let mut w = PayloadWriter::new();
        w.put_u32(1);
        w.put_string("/tmp/target");
        attrs.encode(&mut w, AttrsLayout::V4);
        let packet = Packet::reply(SftpMessageType::Name, 8, w.freeze());
        let request = Request {
            id: 8,
            request_type: RequestType::Packet(SftpMessageType::ReadLink),
        };

        let driver = load(ProtocolVersion::new(4).unwrap());
        match driver.parse(&request, &packet, AttrsLayout::V4).unwrap() {
            Response::Name { entries, .. } => {
                assert_eq!(entries[0].filename, "/tmp/target");
                assert_eq!(entries[0].longname, None);
                assert_eq!(entries[0].attrs.file_type, Some(FileType::Symlink));
            }
            other => panic!("unexpected response: {:?}", other),
        }
    }
}
