//! Version 1 driver: the base operation set.

use super::{Driver, Operation, ProtocolVersion};
use crate::sftp::codec::{Field, PayloadReader};
use crate::sftp::error::{Error, Result};
use crate::sftp::message::{Packet, SftpMessageType};
use crate::sftp::request::{OperationRequest, Request, Response};
use crate::sftp::types::{AttrsLayout, FileAttributes, Name, OpenFlags, Status};

const OPERATIONS: &[Operation] = &[
    Operation::Open,
    Operation::Close,
    Operation::Read,
    Operation::Write,
    Operation::LStat,
    Operation::FStat,
    Operation::SetStat,
    Operation::FSetStat,
    Operation::OpenDir,
    Operation::ReadDir,
    Operation::Remove,
    Operation::MkDir,
    Operation::RmDir,
    Operation::RealPath,
    Operation::Stat,
];

/// Oldest layer of every driver chain.
#[derive(Debug, Default)]
pub struct V1Driver;

impl V1Driver {
    /// Creates the base driver.
    pub fn new() -> Self {
        Self
    }
}

fn path_request(msg_type: SftpMessageType, path: &str) -> OperationRequest {
    OperationRequest::new(msg_type, vec![Field::string(path)])
}

fn handle_request(msg_type: SftpMessageType, handle: &[u8]) -> OperationRequest {
    OperationRequest::new(msg_type, vec![Field::string(handle)])
}

impl Driver for V1Driver {
    fn version(&self) -> ProtocolVersion {
        ProtocolVersion::MIN
    }

    fn older(&self) -> Option<&(dyn Driver + 'static)> {
        None
    }

    fn older_mut(&mut self) -> Option<&mut (dyn Driver + 'static)> {
        None
    }

    fn introduced(&self) -> &'static [Operation] {
        OPERATIONS
    }

    fn open(&self, path: &str, flags: OpenFlags, attrs: &FileAttributes) -> Result<OperationRequest> {
        Ok(OperationRequest::new(
            SftpMessageType::Open,
            vec![
                Field::string(path),
                Field::U32(flags.0),
                Field::Attrs(attrs.clone()),
            ],
        ))
    }

    fn close(&self, handle: &[u8]) -> Result<OperationRequest> {
        Ok(handle_request(SftpMessageType::Close, handle))
    }

    fn read(&self, handle: &[u8], offset: u64, len: u32) -> Result<OperationRequest> {
        Ok(OperationRequest::new(
            SftpMessageType::Read,
            vec![Field::string(handle), Field::U64(offset), Field::U32(len)],
        ))
    }

    fn write(&self, handle: &[u8], offset: u64, data: &[u8]) -> Result<OperationRequest> {
        Ok(OperationRequest::new(
            SftpMessageType::Write,
            vec![Field::string(handle), Field::U64(offset), Field::string(data)],
        ))
    }

    // Attribute selection on stat arrived in version 4.
    fn lstat(&self, path: &str, _flags: Option<u32>) -> Result<OperationRequest> {
        Ok(path_request(SftpMessageType::LStat, path))
    }

    fn fstat(&self, handle: &[u8], _flags: Option<u32>) -> Result<OperationRequest> {
        Ok(handle_request(SftpMessageType::FStat, handle))
    }

    fn stat(&self, path: &str, _flags: Option<u32>) -> Result<OperationRequest> {
        Ok(path_request(SftpMessageType::Stat, path))
    }

    fn setstat(&self, path: &str, attrs: &FileAttributes) -> Result<OperationRequest> {
        Ok(OperationRequest::new(
            SftpMessageType::SetStat,
            vec![Field::string(path), Field::Attrs(attrs.clone())],
        ))
    }

    fn fsetstat(&self, handle: &[u8], attrs: &FileAttributes) -> Result<OperationRequest> {
        Ok(OperationRequest::new(
            SftpMessageType::FSetStat,
            vec![Field::string(handle), Field::Attrs(attrs.clone())],
        ))
    }

    fn opendir(&self, path: &str) -> Result<OperationRequest> {
        Ok(path_request(SftpMessageType::OpenDir, path))
    }

    fn readdir(&self, handle: &[u8]) -> Result<OperationRequest> {
        Ok(handle_request(SftpMessageType::ReadDir, handle))
    }

    fn remove(&self, path: &str) -> Result<OperationRequest> {
        Ok(path_request(SftpMessageType::Remove, path))
    }

    fn mkdir(&self, path: &str, attrs: &FileAttributes) -> Result<OperationRequest> {
        Ok(OperationRequest::new(
            SftpMessageType::MkDir,
            vec![Field::string(path), Field::Attrs(attrs.clone())],
        ))
    }

    fn rmdir(&self, path: &str) -> Result<OperationRequest> {
        Ok(path_request(SftpMessageType::RmDir, path))
    }

    fn realpath(&self, path: &str) -> Result<OperationRequest> {
        Ok(path_request(SftpMessageType::RealPath, path))
    }

    fn parse(&self, request: &Request, packet: &Packet, layout: AttrsLayout) -> Result<Response> {
        let mut r = PayloadReader::new(packet.payload.clone());
        match packet.kind() {
            Some(SftpMessageType::Status) => Ok(Response::Status(Status::new(r.read_u32()?))),
            Some(SftpMessageType::Handle) => Ok(Response::Handle(r.read_bytes()?)),
            Some(SftpMessageType::Data) => Ok(Response::Data {
                data: r.read_bytes()?,
                eof: None,
            }),
            Some(SftpMessageType::Name) => Ok(Response::Name {
                entries: Name::decode_list(&mut r, layout, true)?,
                end_of_list: None,
            }),
            Some(SftpMessageType::Attrs) => {
                Ok(Response::Attrs(FileAttributes::decode(&mut r, layout)?))
            }
            _ => Err(Error::ProtocolViolation(format!(
                "unexpected reply type {} to {}",
                packet.msg_type, request.request_type
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sftp::codec::{encode_fields, PayloadWriter};
    use crate::sftp::request::RequestType;

    fn request(msg_type: SftpMessageType) -> Request {
        Request {
            id: 1,
            request_type: RequestType::Packet(msg_type),
        }
    }

    #[test]
    fn test_open_fields() {
        let req = V1Driver::new()
            .open("/etc/motd", OpenFlags(OpenFlags::READ), &FileAttributes::new())
            .unwrap();
        assert_eq!(req.msg_type(), SftpMessageType::Open);

        let payload = encode_fields(&req.fields, AttrsLayout::V3);
        let mut expected = vec![0, 0, 0, 9];
        expected.extend_from_slice(b"/etc/motd");
        expected.extend_from_slice(&[0, 0, 0, 1]);
        expected.extend_from_slice(&[0, 0, 0, 0]);
        assert_eq!(&payload[..], &expected[..]);
    }

    #[test]
    fn test_stat_ignores_flags() {
        let driver = V1Driver::new();
        assert_eq!(
            driver.stat("/tmp", Some(0xff)).unwrap(),
            driver.stat("/tmp", None).unwrap()
        );
    }

    #[test]
    fn test_missing_operations() {
        let driver = V1Driver::new();
        assert!(matches!(
            driver.rename("/a", "/b", None),
            Err(Error::OperationNotSupported { version: 1, .. })
        ));
        assert!(driver.extended("statvfs@openssh.com", &[]).is_err());
    }

    #[test]
    fn test_parse_status_code_only() {
        // message and language are ignored before version 3
        let mut w = PayloadWriter::new();
        w.put_u32(2);
        w.put_string("trailing");
        let packet = Packet::reply(SftpMessageType::Status, 1, w.freeze());

        let response = V1Driver::new()
            .parse(&request(SftpMessageType::Remove), &packet, AttrsLayout::V3)
            .unwrap();
        assert_eq!(response, Response::Status(Status::new(2)));
    }

    #[test]
    fn test_parse_name_with_longname() {
        let mut w = PayloadWriter::new();
        w.put_u32(1);
        w.put_string("/home/user");
        w.put_string("drwxr-xr-x 2 user user 4096 /home/user");
        w.put_u32(0);
        let packet = Packet::reply(SftpMessageType::Name, 1, w.freeze());

        let response = V1Driver::new()
            .parse(&request(SftpMessageType::RealPath), &packet, AttrsLayout::V3)
            .unwrap();
        assert_eq!(response.path(), Some("/home/user"));
    }

    #[test]
    fn test_parse_rejects_extended_reply() {
        let packet = Packet::reply(SftpMessageType::ExtendedReply, 1, Vec::new());
        let err = V1Driver::new()
            .parse(&request(SftpMessageType::Stat), &packet, AttrsLayout::V3)
            .unwrap_err();
        assert!(matches!(err, Error::ProtocolViolation(_)));
    }
}
