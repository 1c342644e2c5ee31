//! Version 5 driver: rename flags and the access-mask based OPEN.

use super::{Driver, Operation, ProtocolVersion};
use crate::sftp::codec::Field;
use crate::sftp::error::Result;
use crate::sftp::message::SftpMessageType;
use crate::sftp::request::OperationRequest;
use crate::sftp::types::{AceMask, FileAttributes, OpenFlags, V5OpenFlags};

/// Version 5 layer.
pub struct V5Driver {
    older: Box<dyn Driver>,
}

impl V5Driver {
    /// Wraps a version 4 chain.
    pub fn new(older: Box<dyn Driver>) -> Self {
        Self { older }
    }
}

/// Maps version 1-4 open flags to `(desired_access, flags)`.
pub(crate) fn map_open_flags(flags: OpenFlags) -> (u32, u32) {
    let mut access;
    let mut v5_flags;

    if flags.contains(OpenFlags::WRITE) {
        access = AceMask::WRITE_DATA | AceMask::WRITE_ATTRIBUTES;
        if flags.contains(OpenFlags::READ) {
            access |= AceMask::READ_DATA | AceMask::READ_ATTRIBUTES;
        }

        v5_flags = if flags.contains(OpenFlags::CREAT | OpenFlags::EXCL) {
            V5OpenFlags::CREATE_NEW
        } else if flags.contains(OpenFlags::CREAT | OpenFlags::TRUNC) {
            V5OpenFlags::CREATE_TRUNCATE
        } else if flags.contains(OpenFlags::CREAT) {
            V5OpenFlags::OPEN_OR_CREATE
        } else if flags.contains(OpenFlags::TRUNC) {
            V5OpenFlags::TRUNCATE_EXISTING
        } else {
            V5OpenFlags::OPEN_EXISTING
        };

        if flags.contains(OpenFlags::APPEND) {
            v5_flags |= V5OpenFlags::APPEND_DATA;
            access |= AceMask::APPEND_DATA;
        }
    } else {
        access = AceMask::READ_DATA | AceMask::READ_ATTRIBUTES;
        v5_flags = V5OpenFlags::OPEN_EXISTING;
    }

    (access, v5_flags)
}

impl Driver for V5Driver {
    fn version(&self) -> ProtocolVersion {
        ProtocolVersion(5)
    }

    fn older(&self) -> Option<&(dyn Driver + 'static)> {
        Some(self.older.as_ref())
    }

    fn older_mut(&mut self) -> Option<&mut (dyn Driver + 'static)> {
        Some(self.older.as_mut())
    }

    fn introduced(&self) -> &'static [Operation] {
        &[Operation::Open, Operation::Rename]
    }

    fn open(&self, path: &str, flags: OpenFlags, attrs: &FileAttributes) -> Result<OperationRequest> {
        let (access, v5_flags) = map_open_flags(flags);
        Ok(OperationRequest::new(
            SftpMessageType::Open,
            vec![
                Field::string(path),
                Field::U32(access),
                Field::U32(v5_flags),
                Field::Attrs(attrs.clone()),
            ],
        ))
    }

    fn rename(&self, old_path: &str, new_path: &str, flags: Option<u32>) -> Result<OperationRequest> {
        Ok(OperationRequest::new(
            SftpMessageType::Rename,
            vec![
                Field::string(old_path),
                Field::string(new_path),
                Field::U32(flags.unwrap_or(0)),
            ],
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sftp::driver::load;
    use crate::sftp::types::RenameFlags;

    fn map(bits: u32) -> (u32, u32) {
        map_open_flags(OpenFlags(bits))
    }

    #[test]
    fn test_read_only_open() {
        assert_eq!(
            map(OpenFlags::READ),
            (
                AceMask::READ_DATA | AceMask::READ_ATTRIBUTES,
                V5OpenFlags::OPEN_EXISTING
            )
        );
    }

    #[test]
    fn test_write_dispositions() {
        let w = OpenFlags::WRITE;
        assert_eq!(map(w | OpenFlags::CREAT | OpenFlags::EXCL).1, V5OpenFlags::CREATE_NEW);
        assert_eq!(
            map(w | OpenFlags::CREAT | OpenFlags::TRUNC).1,
            V5OpenFlags::CREATE_TRUNCATE
        );
        assert_eq!(map(w | OpenFlags::CREAT).1, V5OpenFlags::OPEN_OR_CREATE);
        assert_eq!(map(w | OpenFlags::TRUNC).1, V5OpenFlags::TRUNCATE_EXISTING);
        assert_eq!(map(w).1, V5OpenFlags::OPEN_EXISTING);
        assert_eq!(map(w).0, AceMask::WRITE_DATA | AceMask::WRITE_ATTRIBUTES);
    }

    #[test]
    fn test_read_write_append() {
        let (access, flags) = map(OpenFlags::READ | OpenFlags::WRITE | OpenFlags::APPEND);
        assert_eq!(
            access,
            AceMask::READ_DATA
                | AceMask::READ_ATTRIBUTES
                | AceMask::WRITE_DATA
                | AceMask::WRITE_ATTRIBUTES
                | AceMask::APPEND_DATA
        );
        assert_eq!(flags, V5OpenFlags::OPEN_EXISTING | V5OpenFlags::APPEND_DATA);
    }

    #[test]
    fn test_open_fields() {
        let driver = load(ProtocolVersion::new(5).unwrap());
        let req = driver
            .open("/tmp/new", OpenFlags(OpenFlags::WRITE | OpenFlags::CREAT), &FileAttributes::new())
            .unwrap();
        assert_eq!(req.fields.len(), 4);
        assert_eq!(
            req.fields[1],
            Field::U32(AceMask::WRITE_DATA | AceMask::WRITE_ATTRIBUTES)
        );
        assert_eq!(req.fields[2], Field::U32(V5OpenFlags::OPEN_OR_CREATE));
    }

    #[test]
    fn test_rename_flags() {
        let driver = load(ProtocolVersion::new(5).unwrap());
        let req = driver.rename("/a", "/b", None).unwrap();
        assert_eq!(req.fields[2], Field::U32(0));

        let req = driver
            .rename("/a", "/b", Some(RenameFlags::OVERWRITE | RenameFlags::ATOMIC))
            .unwrap();
        assert_eq!(req.fields[2], Field::U32(3));
    }
}
