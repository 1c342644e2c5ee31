//! OpenSSH protocol extensions.
//!
//! | Method                       | Arguments               | Reply            |
//! |------------------------------|-------------------------|------------------|
//! | `posix-rename@openssh.com`   | old path, new path      | STATUS           |
//! | `statvfs@openssh.com`        | path                    | EXTENDED_REPLY   |
//! | `fstatvfs@openssh.com`       | handle                  | EXTENDED_REPLY   |
//! | `hardlink@openssh.com`       | old path, new path      | STATUS           |
//! | `fsync@openssh.com`          | handle                  | STATUS           |
//! | `limits@openssh.com`         | none                    | EXTENDED_REPLY   |

use crate::sftp::codec::{Field, PayloadReader};
use crate::sftp::error::{Error, Result};
use crate::sftp::extension::Extension;
use crate::sftp::message::Packet;
use crate::sftp::request::{ExtendedReply, Response};
use std::sync::Arc;

/// `posix-rename@openssh.com`
pub const POSIX_RENAME: &str = "posix-rename@openssh.com";
/// `statvfs@openssh.com`
pub const STATVFS: &str = "statvfs@openssh.com";
/// `fstatvfs@openssh.com`
pub const FSTATVFS: &str = "fstatvfs@openssh.com";
/// `hardlink@openssh.com`
pub const HARDLINK: &str = "hardlink@openssh.com";
/// `fsync@openssh.com`
pub const FSYNC: &str = "fsync@openssh.com";
/// `limits@openssh.com`
pub const LIMITS: &str = "limits@openssh.com";

/// File system statistics (`statvfs@openssh.com`).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StatVfs {
    /// File system block size
    pub bsize: u64,
    /// Fundamental block size
    pub frsize: u64,
    /// Blocks, in `frsize` units
    pub blocks: u64,
    /// Free blocks
    pub bfree: u64,
    /// Free blocks for unprivileged users
    pub bavail: u64,
    /// Inodes
    pub files: u64,
    /// Free inodes
    pub ffree: u64,
    /// Free inodes for unprivileged users
    pub favail: u64,
    /// File system id
    pub fsid: u64,
    /// Mount flags
    pub flag: u64,
    /// Maximum filename length
    pub namemax: u64,
}

impl StatVfs {
    fn decode(r: &mut PayloadReader) -> Result<Self> {
        Ok(Self {
            bsize: r.read_u64()?,
            frsize: r.read_u64()?,
            blocks: r.read_u64()?,
            bfree: r.read_u64()?,
            bavail: r.read_u64()?,
            files: r.read_u64()?,
            ffree: r.read_u64()?,
            favail: r.read_u64()?,
            fsid: r.read_u64()?,
            flag: r.read_u64()?,
            namemax: r.read_u64()?,
        })
    }
}

/// Server limits (`limits@openssh.com`). Zero means "no limit".
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Limits {
    /// Maximum packet length
    pub max_packet_length: u64,
    /// Maximum READ length
    pub max_read_length: u64,
    /// Maximum WRITE length
    pub max_write_length: u64,
    /// Maximum open handles
    pub max_open_handles: u64,
}

impl Limits {
    fn decode(r: &mut PayloadReader) -> Result<Self> {
        Ok(Self {
            max_packet_length: r.read_u64()?,
            max_read_length: r.read_u64()?,
            max_write_length: r.read_u64()?,
            max_open_handles: r.read_u64()?,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ReplyKind {
    Status,
    StatVfs,
    Limits,
}

/// One of the OpenSSH extensions.
///
/// Arguments are string fields (paths or handles) in the order listed in
/// the module table.
#[derive(Debug, Clone)]
pub struct OpenSshExtension {
    name: &'static str,
    arity: usize,
    reply: ReplyKind,
}

impl OpenSshExtension {
    /// `posix-rename@openssh.com`
    pub fn posix_rename() -> Self {
        Self::new(POSIX_RENAME, 2, ReplyKind::Status)
    }

    /// `statvfs@openssh.com`
    pub fn statvfs() -> Self {
        Self::new(STATVFS, 1, ReplyKind::StatVfs)
    }

    /// `fstatvfs@openssh.com`
    pub fn fstatvfs() -> Self {
        Self::new(FSTATVFS, 1, ReplyKind::StatVfs)
    }

    /// `hardlink@openssh.com`
    pub fn hardlink() -> Self {
        Self::new(HARDLINK, 2, ReplyKind::Status)
    }

    /// `fsync@openssh.com`
    pub fn fsync() -> Self {
        Self::new(FSYNC, 1, ReplyKind::Status)
    }

    /// `limits@openssh.com`
    pub fn limits() -> Self {
        Self::new(LIMITS, 0, ReplyKind::Limits)
    }

    fn new(name: &'static str, arity: usize, reply: ReplyKind) -> Self {
        Self { name, arity, reply }
    }
}

impl Extension for OpenSshExtension {
    fn method_name(&self) -> &str {
        self.name
    }

    fn encode_request(&self, args: &[Field]) -> Result<Vec<Field>> {
        if args.len() != self.arity {
            return Err(Error::InvalidArgument(format!(
                "{} takes {} argument(s), got {}",
                self.name,
                self.arity,
                args.len()
            )));
        }
        if let Some(bad) = args.iter().find(|f| !matches!(f, Field::String(_))) {
            return Err(Error::InvalidArgument(format!(
                "{} expects string arguments, got {:?}",
                self.name, bad
            )));
        }
        Ok(args.to_vec())
    }

    fn decode_response(&self, packet: &Packet) -> Result<Response> {
        let mut r = PayloadReader::new(packet.payload.clone());
        match self.reply {
            ReplyKind::StatVfs => Ok(Response::Extended(ExtendedReply::StatVfs(StatVfs::decode(
                &mut r,
            )?))),
            ReplyKind::Limits => Ok(Response::Extended(ExtendedReply::Limits(Limits::decode(
                &mut r,
            )?))),
            ReplyKind::Status => Err(Error::ProtocolViolation(format!(
                "{} replies with SSH_FXP_STATUS, got an extended reply",
                self.name
            ))),
        }
    }
}

/// All built-in extensions.
pub fn builtin() -> Vec<Arc<dyn Extension>> {
    vec![
        Arc::new(OpenSshExtension::posix_rename()),
        Arc::new(OpenSshExtension::statvfs()),
        Arc::new(OpenSshExtension::fstatvfs()),
        Arc::new(OpenSshExtension::hardlink()),
        Arc::new(OpenSshExtension::fsync()),
        Arc::new(OpenSshExtension::limits()),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sftp::codec::PayloadWriter;
    use crate::sftp::message::SftpMessageType;

    #[test]
    fn test_builtin_names() {
        let names: Vec<String> = builtin()
            .iter()
            .map(|e| e.method_name().to_string())
            .collect();
        assert_eq!(
            names,
            vec![POSIX_RENAME, STATVFS, FSTATVFS, HARDLINK, FSYNC, LIMITS]
        );
    }

    #[test]
    fn test_arity_checked() {
        let ext = OpenSshExtension::posix_rename();
        assert!(ext
            .encode_request(&[Field::string("/a"), Field::string("/b")])
            .is_ok());
        assert!(matches!(
            ext.encode_request(&[Field::string("/a")]),
            Err(Error::InvalidArgument(_))
        ));
        assert!(matches!(
            OpenSshExtension::fsync().encode_request(&[Field::U32(1)]),
            Err(Error::InvalidArgument(_))
        ));
        assert!(OpenSshExtension::limits().encode_request(&[]).unwrap().is_empty());
    }

    #[test]
    fn test_decode_statvfs() {
        let mut w = PayloadWriter::new();
        for value in 1..=11u64 {
            w.put_u64(value);
        }
        let packet = Packet::reply(SftpMessageType::ExtendedReply, 4, w.freeze());

        match OpenSshExtension::statvfs().decode_response(&packet).unwrap() {
            Response::Extended(ExtendedReply::StatVfs(stats)) => {
                assert_eq!(stats.bsize, 1);
                assert_eq!(stats.bavail, 5);
                assert_eq!(stats.namemax, 11);
            }
            other => panic!("unexpected response: {:?}", other),
        }
    }

    #[test]
    fn test_decode_limits_truncated() {
        let mut w = PayloadWriter::new();
        w.put_u64(34000);
        let packet = Packet::reply(SftpMessageType::ExtendedReply, 4, w.freeze());
        assert!(matches!(
            OpenSshExtension::limits().decode_response(&packet),
            Err(Error::BufferTooShort { .. })
        ));
    }

    #[test]
    fn test_status_extension_rejects_extended_reply() {
        let packet = Packet::reply(SftpMessageType::ExtendedReply, 4, Vec::new());
        assert!(matches!(
            OpenSshExtension::hardlink().decode_response(&packet),
            Err(Error::ProtocolViolation(_))
        ));
    }
}
