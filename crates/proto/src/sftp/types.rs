//! SFTP data types and structures.

use super::codec::{PayloadReader, PayloadWriter};
use super::error::Result;

/// SFTP status codes (SSH_FX_*).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u32)]
pub enum StatusCode {
    /// SSH_FX_OK - Success
    Ok = 0,
    /// SSH_FX_EOF - End of file
    Eof = 1,
    /// SSH_FX_NO_SUCH_FILE - No such file
    NoSuchFile = 2,
    /// SSH_FX_PERMISSION_DENIED - Permission denied
    PermissionDenied = 3,
    /// SSH_FX_FAILURE - General failure
    Failure = 4,
    /// SSH_FX_BAD_MESSAGE - Bad message
    BadMessage = 5,
    /// SSH_FX_NO_CONNECTION - No connection
    NoConnection = 6,
    /// SSH_FX_CONNECTION_LOST - Connection lost
    ConnectionLost = 7,
    /// SSH_FX_OP_UNSUPPORTED - Operation not supported
    OpUnsupported = 8,
    /// SSH_FX_INVALID_HANDLE (v4+)
    InvalidHandle = 9,
    /// SSH_FX_NO_SUCH_PATH (v4+)
    NoSuchPath = 10,
    /// SSH_FX_FILE_ALREADY_EXISTS (v4+)
    FileAlreadyExists = 11,
    /// SSH_FX_WRITE_PROTECT (v4+)
    WriteProtect = 12,
    /// SSH_FX_NO_MEDIA (v4+)
    NoMedia = 13,
    /// SSH_FX_NO_SPACE_ON_FILESYSTEM (v5+)
    NoSpaceOnFilesystem = 14,
    /// SSH_FX_QUOTA_EXCEEDED (v5+)
    QuotaExceeded = 15,
    /// SSH_FX_UNKNOWN_PRINCIPAL (v5+)
    UnknownPrincipal = 16,
    /// SSH_FX_LOCK_CONFLICT (v5+)
    LockConflict = 17,
    /// SSH_FX_DIR_NOT_EMPTY (v6)
    DirNotEmpty = 18,
    /// SSH_FX_NOT_A_DIRECTORY (v6)
    NotADirectory = 19,
    /// SSH_FX_INVALID_FILENAME (v6)
    InvalidFilename = 20,
    /// SSH_FX_LINK_LOOP (v6)
    LinkLoop = 21,
    /// SSH_FX_CANNOT_DELETE (v6)
    CannotDelete = 22,
    /// SSH_FX_INVALID_PARAMETER (v6)
    InvalidParameter = 23,
    /// SSH_FX_FILE_IS_A_DIRECTORY (v6)
    FileIsADirectory = 24,
    /// SSH_FX_BYTE_RANGE_LOCK_CONFLICT (v6)
    ByteRangeLockConflict = 25,
    /// SSH_FX_BYTE_RANGE_LOCK_REFUSED (v6)
    ByteRangeLockRefused = 26,
    /// SSH_FX_DELETE_PENDING (v6)
    DeletePending = 27,
    /// SSH_FX_FILE_CORRUPT (v6)
    FileCorrupt = 28,
    /// SSH_FX_OWNER_INVALID (v6)
    OwnerInvalid = 29,
    /// SSH_FX_GROUP_INVALID (v6)
    GroupInvalid = 30,
    /// SSH_FX_NO_MATCHING_BYTE_RANGE_LOCK (v6)
    NoMatchingByteRangeLock = 31,
}

impl StatusCode {
    /// Convert from u32.
    pub fn from_u32(value: u32) -> Option<Self> {
        match value {
            0 => Some(Self::Ok),
            1 => Some(Self::Eof),
            2 => Some(Self::NoSuchFile),
            3 => Some(Self::PermissionDenied),
            4 => Some(Self::Failure),
            5 => Some(Self::BadMessage),
            6 => Some(Self::NoConnection),
            7 => Some(Self::ConnectionLost),
            8 => Some(Self::OpUnsupported),
            9 => Some(Self::InvalidHandle),
            10 => Some(Self::NoSuchPath),
            11 => Some(Self::FileAlreadyExists),
            12 => Some(Self::WriteProtect),
            13 => Some(Self::NoMedia),
            14 => Some(Self::NoSpaceOnFilesystem),
            15 => Some(Self::QuotaExceeded),
            16 => Some(Self::UnknownPrincipal),
            17 => Some(Self::LockConflict),
            18 => Some(Self::DirNotEmpty),
            19 => Some(Self::NotADirectory),
            20 => Some(Self::InvalidFilename),
            21 => Some(Self::LinkLoop),
            22 => Some(Self::CannotDelete),
            23 => Some(Self::InvalidParameter),
            24 => Some(Self::FileIsADirectory),
            25 => Some(Self::ByteRangeLockConflict),
            26 => Some(Self::ByteRangeLockRefused),
            27 => Some(Self::DeletePending),
            28 => Some(Self::FileCorrupt),
            29 => Some(Self::OwnerInvalid),
            30 => Some(Self::GroupInvalid),
            31 => Some(Self::NoMatchingByteRangeLock),
            _ => None,
        }
    }

    /// Returns error message.
    pub fn message(&self) -> &'static str {
        match self {
            Self::Ok => "Success",
            Self::Eof => "End of file",
            Self::NoSuchFile => "No such file or directory",
            Self::PermissionDenied => "Permission denied",
            Self::Failure => "Failure",
            Self::BadMessage => "Bad message",
            Self::NoConnection => "No connection",
            Self::ConnectionLost => "Connection lost",
            Self::OpUnsupported => "Operation not supported",
            Self::InvalidHandle => "Invalid handle",
            Self::NoSuchPath => "No such path",
            Self::FileAlreadyExists => "File already exists",
            Self::WriteProtect => "Write protected",
            Self::NoMedia => "No media",
            Self::NoSpaceOnFilesystem => "No space on filesystem",
            Self::QuotaExceeded => "Quota exceeded",
            Self::UnknownPrincipal => "Unknown principal",
            Self::LockConflict => "Lock conflict",
            Self::DirNotEmpty => "Directory not empty",
            Self::NotADirectory => "Not a directory",
            Self::InvalidFilename => "Invalid filename",
            Self::LinkLoop => "Too many symbolic links",
            Self::CannotDelete => "Cannot delete",
            Self::InvalidParameter => "Invalid parameter",
            Self::FileIsADirectory => "File is a directory",
            Self::ByteRangeLockConflict => "Byte range lock conflict",
            Self::ByteRangeLockRefused => "Byte range lock refused",
            Self::DeletePending => "Delete pending",
            Self::FileCorrupt => "File corrupt",
            Self::OwnerInvalid => "Invalid owner",
            Self::GroupInvalid => "Invalid group",
            Self::NoMatchingByteRangeLock => "No matching byte range lock",
        }
    }
}

/// Decoded SSH_FXP_STATUS reply.
///
/// Versions 1 and 2 only carry the code; message and language tag were
/// added in version 3.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Status {
    /// Raw status code
    pub code: u32,
    /// Human-readable message (v3+)
    pub message: Option<String>,
    /// Language tag of the message (v3+)
    pub language: Option<String>,
}

impl Status {
    /// Creates a status with only a code.
    pub fn new(code: u32) -> Self {
        Self {
            code,
            message: None,
            language: None,
        }
    }

    /// Returns the known status code, if any.
    pub fn kind(&self) -> Option<StatusCode> {
        StatusCode::from_u32(self.code)
    }

    /// Returns `true` for SSH_FX_OK.
    pub fn is_ok(&self) -> bool {
        self.code == StatusCode::Ok as u32
    }

    /// Returns `true` for SSH_FX_EOF.
    pub fn is_eof(&self) -> bool {
        self.code == StatusCode::Eof as u32
    }
}

impl std::fmt::Display for Status {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let text = match (&self.message, self.kind()) {
            (Some(msg), _) if !msg.is_empty() => msg.as_str(),
            (_, Some(kind)) => kind.message(),
            _ => "Unknown status",
        };
        write!(f, "SFTP status {}: {}", self.code, text)
    }
}

/// File types (SSH_FILEXFER_TYPE_*).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum FileType {
    /// Regular file
    Regular = 1,
    /// Directory
    Directory = 2,
    /// Symbolic link
    Symlink = 3,
    /// Special file
    Special = 4,
    /// Unknown type
    Unknown = 5,
    /// Socket (v5+)
    Socket = 6,
    /// Character device (v5+)
    CharDevice = 7,
    /// Block device (v5+)
    BlockDevice = 8,
    /// Named pipe (v5+)
    Fifo = 9,
}

impl FileType {
    /// Convert from u8.
    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            1 => Some(Self::Regular),
            2 => Some(Self::Directory),
            3 => Some(Self::Symlink),
            4 => Some(Self::Special),
            5 => Some(Self::Unknown),
            6 => Some(Self::Socket),
            7 => Some(Self::CharDevice),
            8 => Some(Self::BlockDevice),
            9 => Some(Self::Fifo),
            _ => None,
        }
    }

    /// Derives the type from the `S_IFMT` bits of a permissions word.
    pub fn from_permissions(mode: u32) -> Self {
        match mode & FileMode::TYPE_MASK {
            0o100000 => Self::Regular,
            0o040000 => Self::Directory,
            0o120000 => Self::Symlink,
            0o140000 => Self::Socket,
            0o020000 => Self::CharDevice,
            0o060000 => Self::BlockDevice,
            0o010000 => Self::Fifo,
            _ => Self::Unknown,
        }
    }
}

/// File open flags for versions 1-4 (SSH_FXF_*).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct OpenFlags(pub u32);

impl OpenFlags {
    /// SSH_FXF_READ - Open for reading
    pub const READ: u32 = 0x00000001;
    /// SSH_FXF_WRITE - Open for writing
    pub const WRITE: u32 = 0x00000002;
    /// SSH_FXF_APPEND - Force writes to append
    pub const APPEND: u32 = 0x00000004;
    /// SSH_FXF_CREAT - Create if doesn't exist
    pub const CREAT: u32 = 0x00000008;
    /// SSH_FXF_TRUNC - Truncate to 0 length
    pub const TRUNC: u32 = 0x00000010;
    /// SSH_FXF_EXCL - Fail if file exists
    pub const EXCL: u32 = 0x00000020;

    /// Returns `true` if all bits of `flag` are set.
    pub fn contains(&self, flag: u32) -> bool {
        self.0 & flag == flag
    }
}

/// File open flags for versions 5+ (SSH_FXF_*).
///
/// The low three bits select the open disposition; the remaining bits are
/// independent modifiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct V5OpenFlags(pub u32);

impl V5OpenFlags {
    /// SSH_FXF_CREATE_NEW
    pub const CREATE_NEW: u32 = 0x00000000;
    /// SSH_FXF_CREATE_TRUNCATE
    pub const CREATE_TRUNCATE: u32 = 0x00000001;
    /// SSH_FXF_OPEN_EXISTING
    pub const OPEN_EXISTING: u32 = 0x00000002;
    /// SSH_FXF_OPEN_OR_CREATE
    pub const OPEN_OR_CREATE: u32 = 0x00000003;
    /// SSH_FXF_TRUNCATE_EXISTING
    pub const TRUNCATE_EXISTING: u32 = 0x00000004;
    /// SSH_FXF_APPEND_DATA
    pub const APPEND_DATA: u32 = 0x00000008;
    /// SSH_FXF_APPEND_DATA_ATOMIC
    pub const APPEND_DATA_ATOMIC: u32 = 0x00000010;
    /// SSH_FXF_TEXT_MODE
    pub const TEXT_MODE: u32 = 0x00000020;
}

/// ACE access mask bits (ACE4_*), used as v5+ desired access.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AceMask(pub u32);

impl AceMask {
    /// ACE4_READ_DATA
    pub const READ_DATA: u32 = 0x00000001;
    /// ACE4_WRITE_DATA
    pub const WRITE_DATA: u32 = 0x00000002;
    /// ACE4_APPEND_DATA
    pub const APPEND_DATA: u32 = 0x00000004;
    /// ACE4_READ_NAMED_ATTRS
    pub const READ_NAMED_ATTRS: u32 = 0x00000008;
    /// ACE4_WRITE_NAMED_ATTRS
    pub const WRITE_NAMED_ATTRS: u32 = 0x00000010;
    /// ACE4_EXECUTE
    pub const EXECUTE: u32 = 0x00000020;
    /// ACE4_DELETE_CHILD
    pub const DELETE_CHILD: u32 = 0x00000040;
    /// ACE4_READ_ATTRIBUTES
    pub const READ_ATTRIBUTES: u32 = 0x00000080;
    /// ACE4_WRITE_ATTRIBUTES
    pub const WRITE_ATTRIBUTES: u32 = 0x00000100;
    /// ACE4_DELETE
    pub const DELETE: u32 = 0x00010000;
    /// ACE4_READ_ACL
    pub const READ_ACL: u32 = 0x00020000;
    /// ACE4_WRITE_ACL
    pub const WRITE_ACL: u32 = 0x00040000;
    /// ACE4_WRITE_OWNER
    pub const WRITE_OWNER: u32 = 0x00080000;
    /// ACE4_SYNCHRONIZE
    pub const SYNCHRONIZE: u32 = 0x00100000;
}

/// Rename flags (v5+).
#[derive(Debug, Clone, Copy)]
pub struct RenameFlags(pub u32);

impl RenameFlags {
    /// SSH_FXF_RENAME_OVERWRITE
    pub const OVERWRITE: u32 = 0x00000001;
    /// SSH_FXF_RENAME_ATOMIC
    pub const ATOMIC: u32 = 0x00000002;
    /// SSH_FXF_RENAME_NATIVE
    pub const NATIVE: u32 = 0x00000004;
}

/// Byte-range lock flags for SSH_FXP_BLOCK (v6).
#[derive(Debug, Clone, Copy)]
pub struct LockFlags(pub u32);

impl LockFlags {
    /// SSH_FXF_BLOCK_READ
    pub const READ: u32 = 0x00000040;
    /// SSH_FXF_BLOCK_WRITE
    pub const WRITE: u32 = 0x00000080;
    /// SSH_FXF_BLOCK_DELETE
    pub const DELETE: u32 = 0x00000100;
    /// SSH_FXF_BLOCK_ADVISORY
    pub const ADVISORY: u32 = 0x00000200;
}

/// File mode (permissions).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FileMode(pub u32);

impl FileMode {
    /// Owner read
    pub const USER_READ: u32 = 0o400;
    /// Owner write
    pub const USER_WRITE: u32 = 0o200;
    /// Owner execute
    pub const USER_EXEC: u32 = 0o100;
    /// Group read
    pub const GROUP_READ: u32 = 0o040;
    /// Group write
    pub const GROUP_WRITE: u32 = 0o020;
    /// Group execute
    pub const GROUP_EXEC: u32 = 0o010;
    /// Others read
    pub const OTHER_READ: u32 = 0o004;
    /// Others write
    pub const OTHER_WRITE: u32 = 0o002;
    /// Others execute
    pub const OTHER_EXEC: u32 = 0o001;
    /// File type bits (S_IFMT)
    pub const TYPE_MASK: u32 = 0o170000;

    /// Default file permissions (0644 = rw-r--r--)
    pub const DEFAULT_FILE: u32 = 0o644;
    /// Default directory permissions (0755 = rwxr-xr-x)
    pub const DEFAULT_DIR: u32 = 0o755;
}

/// File attribute flags (SSH_FILEXFER_ATTR_*).
#[derive(Debug, Clone, Copy)]
pub struct AttrFlags(pub u32);

impl AttrFlags {
    /// SSH_FILEXFER_ATTR_SIZE
    pub const SIZE: u32 = 0x00000001;
    /// SSH_FILEXFER_ATTR_UIDGID (v1-v3)
    pub const UIDGID: u32 = 0x00000002;
    /// SSH_FILEXFER_ATTR_PERMISSIONS
    pub const PERMISSIONS: u32 = 0x00000004;
    /// SSH_FILEXFER_ATTR_ACMODTIME (v1-v3)
    pub const ACMODTIME: u32 = 0x00000008;
    /// SSH_FILEXFER_ATTR_ACCESSTIME (v4+, same bit as ACMODTIME)
    pub const ACCESSTIME: u32 = 0x00000008;
    /// SSH_FILEXFER_ATTR_CREATETIME (v4+)
    pub const CREATETIME: u32 = 0x00000010;
    /// SSH_FILEXFER_ATTR_MODIFYTIME (v4+)
    pub const MODIFYTIME: u32 = 0x00000020;
    /// SSH_FILEXFER_ATTR_ACL (v4+)
    pub const ACL: u32 = 0x00000040;
    /// SSH_FILEXFER_ATTR_OWNERGROUP (v4+)
    pub const OWNERGROUP: u32 = 0x00000080;
    /// SSH_FILEXFER_ATTR_SUBSECOND_TIMES (v4+)
    pub const SUBSECOND_TIMES: u32 = 0x00000100;
    /// SSH_FILEXFER_ATTR_BITS (v6)
    pub const BITS: u32 = 0x00000200;
    /// SSH_FILEXFER_ATTR_ALLOCATION_SIZE (v6)
    pub const ALLOCATION_SIZE: u32 = 0x00000400;
    /// SSH_FILEXFER_ATTR_TEXT_HINT (v6)
    pub const TEXT_HINT: u32 = 0x00000800;
    /// SSH_FILEXFER_ATTR_MIME_TYPE (v6)
    pub const MIME_TYPE: u32 = 0x00001000;
    /// SSH_FILEXFER_ATTR_LINK_COUNT (v6)
    pub const LINK_COUNT: u32 = 0x00002000;
    /// SSH_FILEXFER_ATTR_UNTRANSLATED_NAME (v6)
    pub const UNTRANSLATED_NAME: u32 = 0x00004000;
    /// SSH_FILEXFER_ATTR_CTIME (v6)
    pub const CTIME: u32 = 0x00008000;
    /// SSH_FILEXFER_ATTR_EXTENDED
    pub const EXTENDED: u32 = 0x80000000;

    /// Attributes requested by a v4+ stat when the caller names none.
    pub const V4_STAT_DEFAULT: u32 = Self::SIZE
        | Self::PERMISSIONS
        | Self::ACCESSTIME
        | Self::CREATETIME
        | Self::MODIFYTIME
        | Self::ACL
        | Self::OWNERGROUP
        | Self::SUBSECOND_TIMES
        | Self::EXTENDED;
}

/// On-wire layout of the ATTRS structure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttrsLayout {
    /// Versions 1-3
    V3,
    /// Versions 4-5
    V4,
    /// Version 6
    V6,
}

impl AttrsLayout {
    /// Returns the layout used by a protocol version.
    pub fn for_version(version: u32) -> Self {
        match version {
            0..=3 => Self::V3,
            4 | 5 => Self::V4,
            _ => Self::V6,
        }
    }
}

/// Access control entry (v4+).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ace {
    /// ACE type (allow, deny, audit, alarm)
    pub ace_type: u32,
    /// ACE flags
    pub ace_flag: u32,
    /// Access mask, see [`AceMask`]
    pub ace_mask: u32,
    /// Principal
    pub who: String,
}

/// File attributes.
///
/// A superset of the fields of every protocol version; each layout encodes
/// the fields it knows and ignores the rest.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FileAttributes {
    /// File type (v4+ on the wire; derived from permissions before)
    pub file_type: Option<FileType>,
    /// File size in bytes
    pub size: Option<u64>,
    /// Allocated size in bytes (v6)
    pub allocation_size: Option<u64>,
    /// User ID (v1-v3)
    pub uid: Option<u32>,
    /// Group ID (v1-v3)
    pub gid: Option<u32>,
    /// Owner name (v4+)
    pub owner: Option<String>,
    /// Group name (v4+)
    pub group: Option<String>,
    /// Permissions
    pub permissions: Option<FileMode>,
    /// Access time (Unix timestamp)
    pub atime: Option<u64>,
    /// Access time nanoseconds (v4+)
    pub atime_nseconds: Option<u32>,
    /// Creation time (v4+)
    pub createtime: Option<u64>,
    /// Creation time nanoseconds (v4+)
    pub createtime_nseconds: Option<u32>,
    /// Modification time (Unix timestamp)
    pub mtime: Option<u64>,
    /// Modification time nanoseconds (v4+)
    pub mtime_nseconds: Option<u32>,
    /// Attribute change time (v6)
    pub ctime: Option<u64>,
    /// Attribute change time nanoseconds (v6)
    pub ctime_nseconds: Option<u32>,
    /// Access control list (v4+)
    pub acl: Option<Vec<Ace>>,
    /// Attribute bits (v6)
    pub attrib_bits: Option<u32>,
    /// Valid attribute bits (v6)
    pub attrib_bits_valid: Option<u32>,
    /// Text hint (v6)
    pub text_hint: Option<u8>,
    /// MIME type (v6)
    pub mime_type: Option<String>,
    /// Hard link count (v6)
    pub link_count: Option<u32>,
    /// Untranslated filename (v6)
    pub untranslated_name: Option<String>,
    /// Extended attribute pairs
    pub extended: Vec<(String, String)>,
}

impl FileAttributes {
    /// Creates empty attributes.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the file type, falling back to the permission bits.
    pub fn file_type(&self) -> Option<FileType> {
        self.file_type
            .or_else(|| self.permissions.map(|p| FileType::from_permissions(p.0)))
    }

    /// Serializes to bytes.
    pub fn to_bytes(&self, layout: AttrsLayout) -> Vec<u8> {
        let mut writer = PayloadWriter::new();
        self.encode(&mut writer, layout);
        writer.freeze().to_vec()
    }

    /// Writes the attributes with the given layout.
    pub fn encode(&self, w: &mut PayloadWriter, layout: AttrsLayout) {
        match layout {
            AttrsLayout::V3 => self.encode_v3(w),
            AttrsLayout::V4 => self.encode_v4(w, false),
            AttrsLayout::V6 => self.encode_v4(w, true),
        }
    }

    /// Reads attributes with the given layout.
    pub fn decode(r: &mut PayloadReader, layout: AttrsLayout) -> Result<Self> {
        match layout {
            AttrsLayout::V3 => Self::decode_v3(r),
            AttrsLayout::V4 => Self::decode_v4(r, false),
            AttrsLayout::V6 => Self::decode_v4(r, true),
        }
    }

    fn encode_v3(&self, w: &mut PayloadWriter) {
        let mut flags = 0u32;
        if self.size.is_some() {
            flags |= AttrFlags::SIZE;
        }
        if self.uid.is_some() && self.gid.is_some() {
            flags |= AttrFlags::UIDGID;
        }
        if self.permissions.is_some() {
            flags |= AttrFlags::PERMISSIONS;
        }
        if self.atime.is_some() && self.mtime.is_some() {
            flags |= AttrFlags::ACMODTIME;
        }
        if !self.extended.is_empty() {
            flags |= AttrFlags::EXTENDED;
        }

        w.put_u32(flags);
        if let Some(size) = self.size {
            w.put_u64(size);
        }
        if let (Some(uid), Some(gid)) = (self.uid, self.gid) {
            w.put_u32(uid);
            w.put_u32(gid);
        }
        if let Some(permissions) = self.permissions {
            w.put_u32(permissions.0);
        }
        if let (Some(atime), Some(mtime)) = (self.atime, self.mtime) {
            // v3 times are 32-bit
            w.put_u32(atime as u32);
            w.put_u32(mtime as u32);
        }
        self.encode_extended(w);
    }

    fn decode_v3(r: &mut PayloadReader) -> Result<Self> {
        let flags = r.read_u32()?;
        let mut attrs = Self::new();

        if flags & AttrFlags::SIZE != 0 {
            attrs.size = Some(r.read_u64()?);
        }
        if flags & AttrFlags::UIDGID != 0 {
            attrs.uid = Some(r.read_u32()?);
            attrs.gid = Some(r.read_u32()?);
        }
        if flags & AttrFlags::PERMISSIONS != 0 {
            attrs.permissions = Some(FileMode(r.read_u32()?));
        }
        if flags & AttrFlags::ACMODTIME != 0 {
            attrs.atime = Some(r.read_u32()? as u64);
            attrs.mtime = Some(r.read_u32()? as u64);
        }
        if flags & AttrFlags::EXTENDED != 0 {
            attrs.extended = decode_extended(r)?;
        }

        Ok(attrs)
    }

    fn encode_v4(&self, w: &mut PayloadWriter, v6: bool) {
        let times = [
            (self.atime, self.atime_nseconds, AttrFlags::ACCESSTIME),
            (self.createtime, self.createtime_nseconds, AttrFlags::CREATETIME),
            (self.mtime, self.mtime_nseconds, AttrFlags::MODIFYTIME),
            (self.ctime, self.ctime_nseconds, AttrFlags::CTIME),
        ];
        // ctime only exists in the v6 layout
        let times = if v6 { &times[..] } else { &times[..3] };

        let mut flags = 0u32;
        if self.size.is_some() {
            flags |= AttrFlags::SIZE;
        }
        if v6 && self.allocation_size.is_some() {
            flags |= AttrFlags::ALLOCATION_SIZE;
        }
        if self.owner.is_some() && self.group.is_some() {
            flags |= AttrFlags::OWNERGROUP;
        }
        if self.permissions.is_some() {
            flags |= AttrFlags::PERMISSIONS;
        }
        for (time, nseconds, flag) in times {
            if time.is_some() {
                flags |= flag;
                if nseconds.is_some() {
                    flags |= AttrFlags::SUBSECOND_TIMES;
                }
            }
        }
        if self.acl.is_some() {
            flags |= AttrFlags::ACL;
        }
        if v6 {
            if self.attrib_bits.is_some() {
                flags |= AttrFlags::BITS;
            }
            if self.text_hint.is_some() {
                flags |= AttrFlags::TEXT_HINT;
            }
            if self.mime_type.is_some() {
                flags |= AttrFlags::MIME_TYPE;
            }
            if self.link_count.is_some() {
                flags |= AttrFlags::LINK_COUNT;
            }
            if self.untranslated_name.is_some() {
                flags |= AttrFlags::UNTRANSLATED_NAME;
            }
        }
        if !self.extended.is_empty() {
            flags |= AttrFlags::EXTENDED;
        }

        w.put_u32(flags);
        w.put_u8(self.file_type.unwrap_or(FileType::Regular) as u8);
        if let Some(size) = self.size {
            w.put_u64(size);
        }
        if flags & AttrFlags::ALLOCATION_SIZE != 0 {
            w.put_u64(self.allocation_size.unwrap_or_default());
        }
        if let (Some(owner), Some(group)) = (&self.owner, &self.group) {
            w.put_string(owner);
            w.put_string(group);
        }
        if let Some(permissions) = self.permissions {
            w.put_u32(permissions.0);
        }
        for (time, nseconds, _) in times {
            if let Some(time) = time {
                w.put_u64(*time);
                if flags & AttrFlags::SUBSECOND_TIMES != 0 {
                    w.put_u32(nseconds.unwrap_or_default());
                }
            }
        }
        if let Some(acl) = &self.acl {
            let mut inner = PayloadWriter::new();
            inner.put_u32(acl.len() as u32);
            for ace in acl {
                inner.put_u32(ace.ace_type);
                inner.put_u32(ace.ace_flag);
                inner.put_u32(ace.ace_mask);
                inner.put_string(&ace.who);
            }
            w.put_string(inner.freeze());
        }
        if flags & AttrFlags::BITS != 0 {
            w.put_u32(self.attrib_bits.unwrap_or_default());
            w.put_u32(self.attrib_bits_valid.unwrap_or_default());
        }
        if flags & AttrFlags::TEXT_HINT != 0 {
            w.put_u8(self.text_hint.unwrap_or_default());
        }
        if flags & AttrFlags::MIME_TYPE != 0 {
            w.put_string(self.mime_type.as_deref().unwrap_or_default());
        }
        if flags & AttrFlags::LINK_COUNT != 0 {
            w.put_u32(self.link_count.unwrap_or_default());
        }
        if flags & AttrFlags::UNTRANSLATED_NAME != 0 {
            w.put_string(self.untranslated_name.as_deref().unwrap_or_default());
        }
        self.encode_extended(w);
    }

    fn decode_v4(r: &mut PayloadReader, v6: bool) -> Result<Self> {
        let flags = r.read_u32()?;
        let mut attrs = Self::new();
        attrs.file_type = Some(FileType::from_u8(r.read_u8()?).unwrap_or(FileType::Unknown));

        let subsecond = flags & AttrFlags::SUBSECOND_TIMES != 0;
        let read_time = |r: &mut PayloadReader, flag: u32| -> Result<(Option<u64>, Option<u32>)> {
            if flags & flag == 0 {
                return Ok((None, None));
            }
            let seconds = r.read_u64()?;
            let nseconds = if subsecond { Some(r.read_u32()?) } else { None };
            Ok((Some(seconds), nseconds))
        };

        if flags & AttrFlags::SIZE != 0 {
            attrs.size = Some(r.read_u64()?);
        }
        if v6 && flags & AttrFlags::ALLOCATION_SIZE != 0 {
            attrs.allocation_size = Some(r.read_u64()?);
        }
        if flags & AttrFlags::OWNERGROUP != 0 {
            attrs.owner = Some(r.read_string()?);
            attrs.group = Some(r.read_string()?);
        }
        if flags & AttrFlags::PERMISSIONS != 0 {
            attrs.permissions = Some(FileMode(r.read_u32()?));
        }
        (attrs.atime, attrs.atime_nseconds) = read_time(r, AttrFlags::ACCESSTIME)?;
        (attrs.createtime, attrs.createtime_nseconds) = read_time(r, AttrFlags::CREATETIME)?;
        (attrs.mtime, attrs.mtime_nseconds) = read_time(r, AttrFlags::MODIFYTIME)?;
        if v6 {
            (attrs.ctime, attrs.ctime_nseconds) = read_time(r, AttrFlags::CTIME)?;
        }
        if flags & AttrFlags::ACL != 0 {
            let mut inner = PayloadReader::new(r.read_bytes()?);
            let count = inner.read_u32()?;
            let mut acl = Vec::new();
            for _ in 0..count {
                acl.push(Ace {
                    ace_type: inner.read_u32()?,
                    ace_flag: inner.read_u32()?,
                    ace_mask: inner.read_u32()?,
                    who: inner.read_string()?,
                });
            }
            attrs.acl = Some(acl);
        }
        if v6 {
            if flags & AttrFlags::BITS != 0 {
                attrs.attrib_bits = Some(r.read_u32()?);
                attrs.attrib_bits_valid = Some(r.read_u32()?);
            }
            if flags & AttrFlags::TEXT_HINT != 0 {
                attrs.text_hint = Some(r.read_u8()?);
            }
            if flags & AttrFlags::MIME_TYPE != 0 {
                attrs.mime_type = Some(r.read_string()?);
            }
            if flags & AttrFlags::LINK_COUNT != 0 {
                attrs.link_count = Some(r.read_u32()?);
            }
            if flags & AttrFlags::UNTRANSLATED_NAME != 0 {
                attrs.untranslated_name = Some(r.read_string()?);
            }
        }
        if flags & AttrFlags::EXTENDED != 0 {
            attrs.extended = decode_extended(r)?;
        }

        Ok(attrs)
    }

    fn encode_extended(&self, w: &mut PayloadWriter) {
        if self.extended.is_empty() {
            return;
        }
        w.put_u32(self.extended.len() as u32);
        for (name, data) in &self.extended {
            w.put_string(name);
            w.put_string(data);
        }
    }
}

fn decode_extended(r: &mut PayloadReader) -> Result<Vec<(String, String)>> {
    let count = r.read_u32()?;
    let mut pairs = Vec::new();
    for _ in 0..count {
        pairs.push((r.read_string()?, r.read_string()?));
    }
    Ok(pairs)
}

/// One entry of an SSH_FXP_NAME reply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Name {
    /// File name
    pub filename: String,
    /// `ls -l` style long name (v1-v3 only)
    pub longname: Option<String>,
    /// File attributes
    pub attrs: FileAttributes,
}

impl Name {
    /// Reads `count` followed by that many entries.
    pub fn decode_list(
        r: &mut PayloadReader,
        layout: AttrsLayout,
        with_longname: bool,
    ) -> Result<Vec<Self>> {
        let count = r.read_u32()?;
        let mut entries = Vec::new();
        for _ in 0..count {
            let filename = r.read_string()?;
            let longname = if with_longname {
                Some(r.read_string()?)
            } else {
                None
            };
            let attrs = FileAttributes::decode(r, layout)?;
            entries.push(Self {
                filename,
                longname,
                attrs,
            });
        }
        Ok(entries)
    }
}
