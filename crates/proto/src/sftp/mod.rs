//! SFTP (SSH File Transfer Protocol) versioned client drivers.
//!
//! This module implements the request/response layer of SFTP versions 1
//! through 6. Each version is a driver that only describes what changed
//! relative to the previous one; everything else is delegated down the
//! chain.
//!
//! # Architecture
//!
//! ```text
//!  caller ──> Protocol ──> driver chain (V6 → … → V1) ──> OperationRequest
//!                │                                            │
//!                │<────────── encode_fields(layout) <─────────┘
//!                ▼
//!            Transport ──> SSH channel
//!
//!  SSH channel ──> FrameBuffer ──> Packet ──> Protocol::dispatch
//!                                                │
//!                      pending Request <─────────┤
//!                      Driver::parse / Extension ┘
//! ```
//!
//! # Protocol Flow
//!
//! ```text
//! Client                          Server
//!   |                               |
//!   |-- SSH_FXP_INIT -------------->|
//!   |<- SSH_FXP_VERSION ------------|  (version, extensions)
//!   |                               |
//!   |-- SSH_FXP_READLINK (id 1) --->|
//!   |-- SSH_FXP_EXTENDED (id 2) --->|  (statvfs@openssh.com)
//!   |<- SSH_FXP_EXTENDED_REPLY (2) -|
//!   |<- SSH_FXP_NAME (1) -----------|
//! ```
//!
//! Replies may arrive in any order; they are correlated by request id.
//!
//! # Example
//!
//! ```rust
//! use skiff_proto::sftp::{
//!     negotiate, ChannelTransport, Packet, Protocol, ServerVersion, SftpConfig, SftpMessageType,
//! };
//! use skiff_proto::sftp::codec::PayloadWriter;
//!
//! let server = ServerVersion { version: 3, extensions: Vec::new() };
//! let negotiated = negotiate(&SftpConfig::default(), &server).unwrap();
//!
//! let (transport, _frames) = ChannelTransport::new();
//! let mut sftp = Protocol::new(transport, negotiated).unwrap();
//! let id = sftp.readlink("/tmp/link").unwrap();
//!
//! let mut reply = PayloadWriter::new();
//! reply.put_u32(1);
//! reply.put_string("/tmp/target");
//! reply.put_string("/tmp/target");
//! reply.put_u32(0);
//! let response = sftp
//!     .dispatch(&Packet::reply(SftpMessageType::Name, id, reply.freeze()))
//!     .unwrap();
//! assert_eq!(response.path(), Some("/tmp/target"));
//! ```

pub mod codec;
pub mod config;
pub mod driver;
pub mod error;
pub mod extension;
pub mod extensions;
pub mod logging;
pub mod message;
pub mod negotiation;
pub mod protocol;
pub mod request;
pub mod transport;
pub mod types;

pub use codec::Field;
pub use config::{SftpConfig, SftpConfigBuilder};
pub use driver::{Driver, Operation, ProtocolVersion};
pub use error::{Error, Result};
pub use extension::{Extension, ExtensionRegistry, FnExtension};
pub use message::{FrameBuffer, Packet, SftpMessage, SftpMessageType};
pub use negotiation::{init_message, negotiate, negotiate_with, Negotiated, ServerVersion};
pub use protocol::{Protocol, Received};
pub use request::{ExtendedReply, OperationRequest, Request, RequestId, RequestType, Response};
pub use transport::{ChannelTransport, RequestTracker, Transport};
pub use types::{FileAttributes, FileType, Name, OpenFlags, Status, StatusCode};
