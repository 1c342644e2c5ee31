//! SFTP protocol messages.
//!
//! Defines SFTP message types, the length-prefixed message framing, and the
//! inbound [`Packet`] handed to the dispatcher.
//!
//! # Framing
//!
//! ```text
//! uint32    length
//! byte      type
//! byte[n]   payload
//! ```
//!
//! Every request and every reply except `SSH_FXP_INIT` / `SSH_FXP_VERSION`
//! starts its payload with a `uint32` request id.

use super::error::{Error, Result};
use bytes::{Buf, Bytes, BytesMut};

/// Default upper bound for a single SFTP message (256 KiB).
pub const DEFAULT_MAX_FRAME_LEN: usize = 256 * 1024;

/// SFTP message type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum SftpMessageType {
    /// SSH_FXP_INIT - Initialize SFTP session
    Init = 1,
    /// SSH_FXP_VERSION - Version response
    Version = 2,
    /// SSH_FXP_OPEN - Open file
    Open = 3,
    /// SSH_FXP_CLOSE - Close file/directory
    Close = 4,
    /// SSH_FXP_READ - Read from file
    Read = 5,
    /// SSH_FXP_WRITE - Write to file
    Write = 6,
    /// SSH_FXP_LSTAT - Get file attributes (no follow symlinks)
    LStat = 7,
    /// SSH_FXP_FSTAT - Get file attributes by handle
    FStat = 8,
    /// SSH_FXP_SETSTAT - Set file attributes
    SetStat = 9,
    /// SSH_FXP_FSETSTAT - Set file attributes by handle
    FSetStat = 10,
    /// SSH_FXP_OPENDIR - Open directory
    OpenDir = 11,
    /// SSH_FXP_READDIR - Read directory
    ReadDir = 12,
    /// SSH_FXP_REMOVE - Remove file
    Remove = 13,
    /// SSH_FXP_MKDIR - Create directory
    MkDir = 14,
    /// SSH_FXP_RMDIR - Remove directory
    RmDir = 15,
    /// SSH_FXP_REALPATH - Canonicalize path
    RealPath = 16,
    /// SSH_FXP_STAT - Get file attributes
    Stat = 17,
    /// SSH_FXP_RENAME - Rename file/directory (v2+)
    Rename = 18,
    /// SSH_FXP_READLINK - Read symbolic link (v3+)
    ReadLink = 19,
    /// SSH_FXP_SYMLINK - Create symbolic link (v3-v5)
    Symlink = 20,
    /// SSH_FXP_LINK - Create hard or symbolic link (v6)
    Link = 21,
    /// SSH_FXP_BLOCK - Lock a byte range (v6)
    Block = 22,
    /// SSH_FXP_UNBLOCK - Unlock a byte range (v6)
    Unblock = 23,

    // Response messages
    /// SSH_FXP_STATUS - Status response
    Status = 101,
    /// SSH_FXP_HANDLE - File handle response
    Handle = 102,
    /// SSH_FXP_DATA - Data response
    Data = 103,
    /// SSH_FXP_NAME - Name response
    Name = 104,
    /// SSH_FXP_ATTRS - Attributes response
    Attrs = 105,

    // Extended messages
    /// SSH_FXP_EXTENDED - Extended request
    Extended = 200,
    /// SSH_FXP_EXTENDED_REPLY - Extended response
    ExtendedReply = 201,
}

impl SftpMessageType {
    /// Convert from u8.
    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            1 => Some(Self::Init),
            2 => Some(Self::Version),
            3 => Some(Self::Open),
            4 => Some(Self::Close),
            5 => Some(Self::Read),
            6 => Some(Self::Write),
            7 => Some(Self::LStat),
            8 => Some(Self::FStat),
            9 => Some(Self::SetStat),
            10 => Some(Self::FSetStat),
            11 => Some(Self::OpenDir),
            12 => Some(Self::ReadDir),
            13 => Some(Self::Remove),
            14 => Some(Self::MkDir),
            15 => Some(Self::RmDir),
            16 => Some(Self::RealPath),
            17 => Some(Self::Stat),
            18 => Some(Self::Rename),
            19 => Some(Self::ReadLink),
            20 => Some(Self::Symlink),
            21 => Some(Self::Link),
            22 => Some(Self::Block),
            23 => Some(Self::Unblock),
            101 => Some(Self::Status),
            102 => Some(Self::Handle),
            103 => Some(Self::Data),
            104 => Some(Self::Name),
            105 => Some(Self::Attrs),
            200 => Some(Self::Extended),
            201 => Some(Self::ExtendedReply),
            _ => None,
        }
    }

    /// Returns `true` for message types a server sends in reply to a request.
    pub fn is_reply(&self) -> bool {
        matches!(
            self,
            Self::Status | Self::Handle | Self::Data | Self::Name | Self::Attrs | Self::ExtendedReply
        )
    }

    /// Returns the wire name of the message type.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Init => "SSH_FXP_INIT",
            Self::Version => "SSH_FXP_VERSION",
            Self::Open => "SSH_FXP_OPEN",
            Self::Close => "SSH_FXP_CLOSE",
            Self::Read => "SSH_FXP_READ",
            Self::Write => "SSH_FXP_WRITE",
            Self::LStat => "SSH_FXP_LSTAT",
            Self::FStat => "SSH_FXP_FSTAT",
            Self::SetStat => "SSH_FXP_SETSTAT",
            Self::FSetStat => "SSH_FXP_FSETSTAT",
            Self::OpenDir => "SSH_FXP_OPENDIR",
            Self::ReadDir => "SSH_FXP_READDIR",
            Self::Remove => "SSH_FXP_REMOVE",
            Self::MkDir => "SSH_FXP_MKDIR",
            Self::RmDir => "SSH_FXP_RMDIR",
            Self::RealPath => "SSH_FXP_REALPATH",
            Self::Stat => "SSH_FXP_STAT",
            Self::Rename => "SSH_FXP_RENAME",
            Self::ReadLink => "SSH_FXP_READLINK",
            Self::Symlink => "SSH_FXP_SYMLINK",
            Self::Link => "SSH_FXP_LINK",
            Self::Block => "SSH_FXP_BLOCK",
            Self::Unblock => "SSH_FXP_UNBLOCK",
            Self::Status => "SSH_FXP_STATUS",
            Self::Handle => "SSH_FXP_HANDLE",
            Self::Data => "SSH_FXP_DATA",
            Self::Name => "SSH_FXP_NAME",
            Self::Attrs => "SSH_FXP_ATTRS",
            Self::Extended => "SSH_FXP_EXTENDED",
            Self::ExtendedReply => "SSH_FXP_EXTENDED_REPLY",
        }
    }
}

impl std::fmt::Display for SftpMessageType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// SFTP message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SftpMessage {
    /// Message type
    pub msg_type: SftpMessageType,
    /// Message payload
    pub payload: Bytes,
}

impl SftpMessage {
    /// Creates a new SFTP message.
    pub fn new(msg_type: SftpMessageType, payload: impl Into<Bytes>) -> Self {
        Self {
            msg_type,
            payload: payload.into(),
        }
    }

    /// Serializes to bytes.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(5 + self.payload.len());

        // length (payload + 1 for type byte)
        let length = (self.payload.len() + 1) as u32;
        buf.extend_from_slice(&length.to_be_bytes());
        buf.push(self.msg_type as u8);
        buf.extend_from_slice(&self.payload);

        buf
    }

    /// Parses from bytes.
    pub fn from_bytes(data: &[u8]) -> Result<Self> {
        let (msg_type, payload) = split_frame(data)?;
        let msg_type = SftpMessageType::from_u8(msg_type).ok_or_else(|| {
            Error::ProtocolViolation(format!("Unknown SFTP message type: {}", msg_type))
        })?;

        Ok(Self {
            msg_type,
            payload: Bytes::copy_from_slice(payload),
        })
    }
}

/// Splits one complete frame into its raw type byte and payload.
fn split_frame(data: &[u8]) -> Result<(u8, &[u8])> {
    if data.len() < 5 {
        return Err(Error::BufferTooShort {
            required: 5,
            available: data.len(),
        });
    }

    let length = u32::from_be_bytes([data[0], data[1], data[2], data[3]]) as usize;
    if length == 0 {
        return Err(Error::Decode("SFTP message with zero length".to_string()));
    }
    if data.len() < 4 + length {
        return Err(Error::BufferTooShort {
            required: 4 + length,
            available: data.len(),
        });
    }

    Ok((data[4], &data[5..4 + length]))
}

/// Inbound reply packet, as delivered by the transport.
///
/// The message type is kept raw so that unknown reply types reach the
/// dispatcher and are reported there as protocol violations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Packet {
    /// Raw message type byte
    pub msg_type: u8,
    /// Request id the reply belongs to
    pub request_id: u32,
    /// Payload following the request id
    pub payload: Bytes,
}

impl Packet {
    /// Creates a packet.
    pub fn new(msg_type: u8, request_id: u32, payload: impl Into<Bytes>) -> Self {
        Self {
            msg_type,
            request_id,
            payload: payload.into(),
        }
    }

    /// Creates a packet with a known message type.
    pub fn reply(msg_type: SftpMessageType, request_id: u32, payload: impl Into<Bytes>) -> Self {
        Self::new(msg_type as u8, request_id, payload)
    }

    /// Returns the message type, if it is one this crate knows.
    pub fn kind(&self) -> Option<SftpMessageType> {
        SftpMessageType::from_u8(self.msg_type)
    }

    /// Parses a complete frame (`length | type | id | payload`).
    pub fn from_frame(data: &[u8]) -> Result<Self> {
        let (msg_type, body) = split_frame(data)?;
        let mut body = Bytes::copy_from_slice(body);
        if body.remaining() < 4 {
            return Err(Error::BufferTooShort {
                required: 4,
                available: body.remaining(),
            });
        }
        let request_id = body.get_u32();

        Ok(Self {
            msg_type,
            request_id,
            payload: body,
        })
    }
}

/// Reassembles SFTP frames from arbitrarily chunked channel data.
#[derive(Debug)]
pub struct FrameBuffer {
    buf: BytesMut,
    max_frame_len: usize,
}

impl FrameBuffer {
    /// Creates a frame buffer accepting frames up to `max_frame_len` bytes.
    pub fn new(max_frame_len: usize) -> Self {
        Self {
            buf: BytesMut::new(),
            max_frame_len,
        }
    }

    /// Appends received channel data.
    pub fn push(&mut self, data: &[u8]) {
        self.buf.extend_from_slice(data);
    }

    /// Returns the number of buffered bytes not yet consumed.
    pub fn buffered(&self) -> usize {
        self.buf.len()
    }

    /// Takes the next complete frame off the buffer, if one is available.
    pub fn next_frame(&mut self) -> Result<Option<Bytes>> {
        if self.buf.len() < 4 {
            return Ok(None);
        }

        let length = u32::from_be_bytes([self.buf[0], self.buf[1], self.buf[2], self.buf[3]])
            as usize;
        if length > self.max_frame_len {
            return Err(Error::ProtocolViolation(format!(
                "SFTP message of {} bytes exceeds limit of {}",
                length, self.max_frame_len
            )));
        }
        if self.buf.len() < 4 + length {
            return Ok(None);
        }

        Ok(Some(self.buf.split_to(4 + length).freeze()))
    }

    /// Takes the next complete reply packet off the buffer.
    pub fn next_packet(&mut self) -> Result<Option<Packet>> {
        match self.next_frame()? {
            Some(frame) => Packet::from_frame(&frame).map(Some),
            None => Ok(None),
        }
    }
}

impl Default for FrameBuffer {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_FRAME_LEN)
    }
}
