//! Requests and decoded replies.

use super::codec::Field;
use super::extensions::openssh::{Limits, StatVfs};
use super::message::SftpMessageType;
use super::types::{FileAttributes, Name, Status};
use bytes::Bytes;
use std::fmt;

/// Correlation handle assigned by the transport to an outgoing request.
pub type RequestId = u32;

/// What a request is, as far as reply routing is concerned.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum RequestType {
    /// Base-protocol request
    Packet(SftpMessageType),
    /// Vendor extension request, keyed by method name
    Extension(String),
}

impl RequestType {
    /// Message type used on the wire.
    pub fn wire_type(&self) -> SftpMessageType {
        match self {
            RequestType::Packet(msg_type) => *msg_type,
            RequestType::Extension(_) => SftpMessageType::Extended,
        }
    }

    /// Plain reply shape the request expects besides SSH_FXP_STATUS.
    ///
    /// Extension requests accept any reply shape.
    pub fn expected_reply(&self) -> Option<SftpMessageType> {
        let msg_type = match self {
            RequestType::Packet(msg_type) => *msg_type,
            RequestType::Extension(_) => return None,
        };
        Some(match msg_type {
            SftpMessageType::Open | SftpMessageType::OpenDir => SftpMessageType::Handle,
            SftpMessageType::Read => SftpMessageType::Data,
            SftpMessageType::ReadDir | SftpMessageType::RealPath | SftpMessageType::ReadLink => {
                SftpMessageType::Name
            }
            SftpMessageType::Stat | SftpMessageType::LStat | SftpMessageType::FStat => {
                SftpMessageType::Attrs
            }
            _ => SftpMessageType::Status,
        })
    }

    /// Returns `true` if a reply of type `reply` is acceptable.
    ///
    /// SSH_FXP_EXTENDED_REPLY is always let through; the extension registry
    /// decides whether anyone owns it.
    pub fn accepts(&self, reply: SftpMessageType) -> bool {
        match self.expected_reply() {
            Some(expected) => {
                reply == SftpMessageType::Status
                    || reply == SftpMessageType::ExtendedReply
                    || reply == expected
            }
            None => reply.is_reply(),
        }
    }
}

impl fmt::Display for RequestType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RequestType::Packet(msg_type) => write!(f, "{}", msg_type),
            RequestType::Extension(name) => f.write_str(name),
        }
    }
}

/// A logical operation translated into a packet type and ordered fields.
///
/// Built by a driver, consumed by the send path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OperationRequest {
    /// Routing identity of the request
    pub request_type: RequestType,
    /// Fields following the request id
    pub fields: Vec<Field>,
}

impl OperationRequest {
    /// Creates a base-protocol request.
    pub fn new(msg_type: SftpMessageType, fields: Vec<Field>) -> Self {
        Self {
            request_type: RequestType::Packet(msg_type),
            fields,
        }
    }

    /// Message type used on the wire.
    pub fn msg_type(&self) -> SftpMessageType {
        self.request_type.wire_type()
    }
}

/// A request awaiting its reply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request {
    /// Assigned request id
    pub id: RequestId,
    /// Routing identity of the request
    pub request_type: RequestType,
}

/// Decoded reply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Response {
    /// SSH_FXP_STATUS
    Status(Status),
    /// SSH_FXP_HANDLE
    Handle(Bytes),
    /// SSH_FXP_DATA
    Data {
        /// Data read
        data: Bytes,
        /// End-of-file hint (v6)
        eof: Option<bool>,
    },
    /// SSH_FXP_NAME
    Name {
        /// Entries
        entries: Vec<Name>,
        /// End-of-list hint (v6)
        end_of_list: Option<bool>,
    },
    /// SSH_FXP_ATTRS
    Attrs(FileAttributes),
    /// SSH_FXP_EXTENDED_REPLY, decoded by the owning extension
    Extended(ExtendedReply),
}

impl Response {
    /// Returns the first name of a NAME reply, such as the target of a
    /// READLINK or the result of a REALPATH.
    pub fn path(&self) -> Option<&str> {
        match self {
            Response::Name { entries, .. } => entries.first().map(|n| n.filename.as_str()),
            _ => None,
        }
    }

    /// Returns the status of a STATUS reply.
    pub fn status(&self) -> Option<&Status> {
        match self {
            Response::Status(status) => Some(status),
            _ => None,
        }
    }
}

/// Extension-defined reply payloads.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExtendedReply {
    /// `statvfs@openssh.com` / `fstatvfs@openssh.com`
    StatVfs(StatVfs),
    /// `limits@openssh.com`
    Limits(Limits),
    /// Any other extension
    Custom {
        /// Extension method name
        extension: String,
        /// Extension-defined payload
        payload: Bytes,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_expected_reply_shapes() {
        let open = RequestType::Packet(SftpMessageType::Open);
        assert!(open.accepts(SftpMessageType::Handle));
        assert!(open.accepts(SftpMessageType::Status));
        assert!(!open.accepts(SftpMessageType::Name));
        assert!(open.accepts(SftpMessageType::ExtendedReply));

        let readlink = RequestType::Packet(SftpMessageType::ReadLink);
        assert_eq!(readlink.expected_reply(), Some(SftpMessageType::Name));

        let remove = RequestType::Packet(SftpMessageType::Remove);
        assert!(!remove.accepts(SftpMessageType::Attrs));
    }

    #[test]
    fn test_extension_accepts_any_reply() {
        let ext = RequestType::Extension("statvfs@openssh.com".to_string());
        assert_eq!(ext.wire_type(), SftpMessageType::Extended);
        assert!(ext.accepts(SftpMessageType::ExtendedReply));
        assert!(ext.accepts(SftpMessageType::Status));
        assert!(!ext.accepts(SftpMessageType::Open));
        assert_eq!(ext.to_string(), "statvfs@openssh.com");
    }
}
