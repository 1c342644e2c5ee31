//! Version 2 driver: adds RENAME.

use super::{Driver, Operation, ProtocolVersion};
use crate::sftp::codec::Field;
use crate::sftp::error::Result;
use crate::sftp::message::SftpMessageType;
use crate::sftp::request::OperationRequest;

/// Version 2 layer.
pub struct V2Driver {
    older: Box<dyn Driver>,
}

impl V2Driver {
    /// Wraps a version 1 chain.
    pub fn new(older: Box<dyn Driver>) -> Self {
        Self { older }
    }
}

impl Driver for V2Driver {
    fn version(&self) -> ProtocolVersion {
        ProtocolVersion(2)
    }

    fn older(&self) -> Option<&(dyn Driver + 'static)> {
        Some(self.older.as_ref())
    }

    fn older_mut(&mut self) -> Option<&mut (dyn Driver + 'static)> {
        Some(self.older.as_mut())
    }

    fn introduced(&self) -> &'static [Operation] {
        &[Operation::Rename]
    }

    /// Rename flags are a version 5 addition and are not sent here.
    fn rename(&self, old_path: &str, new_path: &str, _flags: Option<u32>) -> Result<OperationRequest> {
        Ok(OperationRequest::new(
            SftpMessageType::Rename,
            vec![Field::string(old_path), Field::string(new_path)],
        ))
    }
}
