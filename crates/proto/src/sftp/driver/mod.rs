//! Versioned protocol drivers.
//!
//! Each SFTP version is a [`Driver`] layer that owns the driver of the
//! previous version. A layer implements only the operations and reply shapes
//! its version adds or changes; every other method resolves, through the
//! provided methods of the trait, to the next-older layer.
//!
//! ```text
//! V6Driver ──owns──> V5Driver ──owns──> V4Driver ──owns──> V3Driver ──owns──> V2Driver ──owns──> V1Driver
//!  link/block         open/rename        stat flags         readlink/symlink   rename             base set
//!                                        NAME w/o longname  extensions
//! ```
//!
//! Drivers only build [`OperationRequest`]s and decode replies; the
//! [`Protocol`](super::protocol::Protocol) facade hands requests to the
//! transport.
//!
//! # Example
//!
//! ```rust
//! use skiff_proto::sftp::driver::{self, Driver, ProtocolVersion};
//! use skiff_proto::sftp::SftpMessageType;
//!
//! let driver = driver::load(ProtocolVersion::new(3).unwrap());
//! let request = driver.readlink("/tmp/link").unwrap();
//! assert_eq!(request.msg_type(), SftpMessageType::ReadLink);
//! ```

mod v01;
mod v02;
mod v03;
mod v04;
mod v05;
mod v06;

pub use v01::V1Driver;
pub use v02::V2Driver;
pub use v03::V3Driver;
pub use v04::V4Driver;
pub use v05::V5Driver;
pub use v06::V6Driver;

use super::codec::Field;
use super::error::{Error, Result};
use super::extension::Extension;
use super::message::Packet;
use super::request::{OperationRequest, Request, RequestType, Response};
use super::types::{AttrsLayout, FileAttributes, OpenFlags};
use std::fmt;
use std::sync::Arc;

/// Negotiated SFTP protocol version.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ProtocolVersion(u32);

impl ProtocolVersion {
    /// Oldest version with a driver.
    pub const MIN: Self = Self(1);
    /// Newest version with a driver.
    pub const MAX: Self = Self(6);

    /// Creates a version, rejecting versions without a driver.
    pub fn new(version: u32) -> Result<Self> {
        if version < Self::MIN.0 || version > Self::MAX.0 {
            return Err(Error::UnsupportedVersion(version));
        }
        Ok(Self(version))
    }

    /// Returns the version number.
    pub fn get(self) -> u32 {
        self.0
    }
}

impl fmt::Display for ProtocolVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Logical file-system operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    /// Open a file
    Open,
    /// Close a handle
    Close,
    /// Read from a handle
    Read,
    /// Write to a handle
    Write,
    /// Attributes without following symlinks
    LStat,
    /// Attributes of a handle
    FStat,
    /// Set attributes by path
    SetStat,
    /// Set attributes by handle
    FSetStat,
    /// Open a directory
    OpenDir,
    /// Read directory entries
    ReadDir,
    /// Remove a file
    Remove,
    /// Create a directory
    MkDir,
    /// Remove a directory
    RmDir,
    /// Canonicalize a path
    RealPath,
    /// Attributes following symlinks
    Stat,
    /// Rename
    Rename,
    /// Read a symlink target
    ReadLink,
    /// Create a symlink
    Symlink,
    /// Create a hard or symbolic link
    Link,
    /// Lock a byte range
    Block,
    /// Unlock a byte range
    Unblock,
    /// Vendor extension request
    Extended,
}

impl Operation {
    /// Every operation, in catalog order.
    pub const ALL: [Operation; 22] = [
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
        Operation::Rename,
        Operation::ReadLink,
        Operation::Symlink,
        Operation::Link,
        Operation::Block,
        Operation::Unblock,
        Operation::Extended,
    ];

    /// Returns the operation name.
    pub fn name(&self) -> &'static str {
        match self {
            Operation::Open => "open",
            Operation::Close => "close",
            Operation::Read => "read",
            Operation::Write => "write",
            Operation::LStat => "lstat",
            Operation::FStat => "fstat",
            Operation::SetStat => "setstat",
            Operation::FSetStat => "fsetstat",
            Operation::OpenDir => "opendir",
            Operation::ReadDir => "readdir",
            Operation::Remove => "remove",
            Operation::MkDir => "mkdir",
            Operation::RmDir => "rmdir",
            Operation::RealPath => "realpath",
            Operation::Stat => "stat",
            Operation::Rename => "rename",
            Operation::ReadLink => "readlink",
            Operation::Symlink => "symlink",
            Operation::Link => "link",
            Operation::Block => "block",
            Operation::Unblock => "unblock",
            Operation::Extended => "extended",
        }
    }
}

/// A version layer of the driver chain.
///
/// Required methods describe the layer itself. Every operation has a provided
/// implementation that forwards to [`Driver::older`], so a layer overrides
/// exactly the operations its version introduced or redefined. Asking the
/// oldest layer for an operation it does not implement fails with
/// [`Error::OperationNotSupported`].
pub trait Driver: Send {
    /// Protocol version implemented by this layer.
    fn version(&self) -> ProtocolVersion;

    /// Next-older layer, `None` for version 1.
    fn older(&self) -> Option<&(dyn Driver + 'static)>;

    /// Next-older layer, mutably.
    fn older_mut(&mut self) -> Option<&mut (dyn Driver + 'static)>;

    /// Operations this layer defines or redefines.
    fn introduced(&self) -> &'static [Operation];

    /// ATTRS layout of this version.
    fn attrs_layout(&self) -> AttrsLayout {
        match self.older() {
            Some(older) => older.attrs_layout(),
            None => AttrsLayout::V3,
        }
    }

    /// Returns `true` if this layer or an older one implements `op`.
    fn supports(&self, op: Operation) -> bool {
        self.introduced().contains(&op) || self.older().map_or(false, |d| d.supports(op))
    }

    /// Catalog of operations available from this layer downward.
    fn operations(&self) -> Vec<Operation> {
        Operation::ALL
            .into_iter()
            .filter(|op| self.supports(*op))
            .collect()
    }

    /// Resolves the layer an unhandled operation is forwarded to.
    fn delegate(&self, op: Operation) -> Result<&(dyn Driver + 'static)> {
        self.older().ok_or_else(|| Error::OperationNotSupported {
            operation: op.name().to_string(),
            version: self.version().get(),
        })
    }

    /// SSH_FXP_OPEN
    fn open(&self, path: &str, flags: OpenFlags, attrs: &FileAttributes) -> Result<OperationRequest> {
        self.delegate(Operation::Open)?.open(path, flags, attrs)
    }

    /// SSH_FXP_CLOSE
    fn close(&self, handle: &[u8]) -> Result<OperationRequest> {
        self.delegate(Operation::Close)?.close(handle)
    }

    /// SSH_FXP_READ
    fn read(&self, handle: &[u8], offset: u64, len: u32) -> Result<OperationRequest> {
        self.delegate(Operation::Read)?.read(handle, offset, len)
    }

    /// SSH_FXP_WRITE
    fn write(&self, handle: &[u8], offset: u64, data: &[u8]) -> Result<OperationRequest> {
        self.delegate(Operation::Write)?.write(handle, offset, data)
    }

    /// SSH_FXP_LSTAT
    fn lstat(&self, path: &str, flags: Option<u32>) -> Result<OperationRequest> {
        self.delegate(Operation::LStat)?.lstat(path, flags)
    }

    /// SSH_FXP_FSTAT
    fn fstat(&self, handle: &[u8], flags: Option<u32>) -> Result<OperationRequest> {
        self.delegate(Operation::FStat)?.fstat(handle, flags)
    }

    /// SSH_FXP_SETSTAT
    fn setstat(&self, path: &str, attrs: &FileAttributes) -> Result<OperationRequest> {
        self.delegate(Operation::SetStat)?.setstat(path, attrs)
    }

    /// SSH_FXP_FSETSTAT
    fn fsetstat(&self, handle: &[u8], attrs: &FileAttributes) -> Result<OperationRequest> {
        self.delegate(Operation::FSetStat)?.fsetstat(handle, attrs)
    }

    /// SSH_FXP_OPENDIR
    fn opendir(&self, path: &str) -> Result<OperationRequest> {
        self.delegate(Operation::OpenDir)?.opendir(path)
    }

    /// SSH_FXP_READDIR
    fn readdir(&self, handle: &[u8]) -> Result<OperationRequest> {
        self.delegate(Operation::ReadDir)?.readdir(handle)
    }

    /// SSH_FXP_REMOVE
    fn remove(&self, path: &str) -> Result<OperationRequest> {
        self.delegate(Operation::Remove)?.remove(path)
    }

    /// SSH_FXP_MKDIR
    fn mkdir(&self, path: &str, attrs: &FileAttributes) -> Result<OperationRequest> {
        self.delegate(Operation::MkDir)?.mkdir(path, attrs)
    }

    /// SSH_FXP_RMDIR
    fn rmdir(&self, path: &str) -> Result<OperationRequest> {
        self.delegate(Operation::RmDir)?.rmdir(path)
    }

    /// SSH_FXP_REALPATH
    fn realpath(&self, path: &str) -> Result<OperationRequest> {
        self.delegate(Operation::RealPath)?.realpath(path)
    }

    /// SSH_FXP_STAT
    fn stat(&self, path: &str, flags: Option<u32>) -> Result<OperationRequest> {
        self.delegate(Operation::Stat)?.stat(path, flags)
    }

    /// SSH_FXP_RENAME
    fn rename(&self, old_path: &str, new_path: &str, flags: Option<u32>) -> Result<OperationRequest> {
        self.delegate(Operation::Rename)?.rename(old_path, new_path, flags)
    }

    /// SSH_FXP_READLINK
    fn readlink(&self, path: &str) -> Result<OperationRequest> {
        self.delegate(Operation::ReadLink)?.readlink(path)
    }

    /// SSH_FXP_SYMLINK
    fn symlink(&self, path: &str, target: &str) -> Result<OperationRequest> {
        self.delegate(Operation::Symlink)?.symlink(path, target)
    }

    /// SSH_FXP_LINK
    fn link(&self, new_link_path: &str, existing_path: &str, symlink: bool) -> Result<OperationRequest> {
        self.delegate(Operation::Link)?
            .link(new_link_path, existing_path, symlink)
    }

    /// SSH_FXP_BLOCK
    fn block(&self, handle: &[u8], offset: u64, length: u64, mask: u32) -> Result<OperationRequest> {
        self.delegate(Operation::Block)?
            .block(handle, offset, length, mask)
    }

    /// SSH_FXP_UNBLOCK
    fn unblock(&self, handle: &[u8], offset: u64, length: u64) -> Result<OperationRequest> {
        self.delegate(Operation::Unblock)?.unblock(handle, offset, length)
    }

    /// Builds the request of the registered extension `name`.
    fn extended(&self, name: &str, args: &[Field]) -> Result<OperationRequest> {
        self.delegate(Operation::Extended)?.extended(name, args)
    }

    /// Request-building primitive handed to extensions: an SSH_FXP_EXTENDED
    /// packet whose first field is the method name.
    fn extended_request(&self, name: &str, fields: Vec<Field>) -> OperationRequest {
        let mut all = Vec::with_capacity(fields.len() + 1);
        all.push(Field::string(name));
        all.extend(fields);
        OperationRequest {
            request_type: RequestType::Extension(name.to_string()),
            fields: all,
        }
    }

    /// Replaces the extension registry.
    fn load_extensions(&mut self, extensions: Vec<Arc<dyn Extension>>) -> Result<()> {
        let version = self.version().get();
        match self.older_mut() {
            Some(older) => older.load_extensions(extensions),
            None => Err(Error::OperationNotSupported {
                operation: "load_extensions".to_string(),
                version,
            }),
        }
    }

    /// Names of the registered extensions, sorted.
    fn extension_names(&self) -> Vec<String> {
        self.older()
            .map(|d| d.extension_names())
            .unwrap_or_default()
    }

    /// Decodes `packet`, the reply to `request`.
    ///
    /// `layout` is the ATTRS layout of the negotiated version, which may be
    /// newer than the layer doing the decoding.
    fn parse(&self, request: &Request, packet: &Packet, layout: AttrsLayout) -> Result<Response> {
        match self.older() {
            Some(older) => older.parse(request, packet, layout),
            None => Err(Error::ProtocolViolation(format!(
                "no driver decodes reply type {} for {}",
                packet.msg_type, request.request_type
            ))),
        }
    }
}

/// Builds the driver chain for a negotiated version.
pub fn load(version: ProtocolVersion) -> Box<dyn Driver> {
    let mut driver: Box<dyn Driver> = Box::new(V1Driver::new());
    for layer in 2..=version.get() {
        driver = match layer {
            2 => Box::new(V2Driver::new(driver)),
            3 => Box::new(V3Driver::new(driver)),
            4 => Box::new(V4Driver::new(driver)),
            5 => Box::new(V5Driver::new(driver)),
            _ => Box::new(V6Driver::new(driver)),
        };
    }
    driver
}
