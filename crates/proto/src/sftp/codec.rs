//! SFTP wire codec.
//!
//! Requests are described as an ordered list of typed [`Field`]s and encoded
//! with [`encode_fields`]. Reply payloads are read back with
//! [`PayloadReader`], which bounds-checks every read.
//!
//! ```text
//! byte      u8
//! bool      u8 (0 or 1)
//! uint32    big-endian u32
//! uint64    big-endian u64
//! string    uint32 length + bytes
//! ATTRS     version-specific, see AttrsLayout
//! ```

use super::error::{Error, Result};
use super::types::{AttrsLayout, FileAttributes};
use bytes::{Buf, BufMut, Bytes, BytesMut};

/// A typed request field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Field {
    /// Single byte
    Byte(u8),
    /// Boolean, encoded as one byte
    Bool(bool),
    /// uint32
    U32(u32),
    /// uint64
    U64(u64),
    /// Length-prefixed string
    String(Bytes),
    /// File attributes, encoded with the negotiated layout
    Attrs(FileAttributes),
    /// Pre-encoded bytes, copied verbatim
    Raw(Bytes),
}

impl Field {
    /// Creates a string field from text or bytes.
    pub fn string(value: impl AsRef<[u8]>) -> Self {
        Field::String(Bytes::copy_from_slice(value.as_ref()))
    }
}

/// Encodes `fields` in order into a request payload.
pub fn encode_fields(fields: &[Field], layout: AttrsLayout) -> Bytes {
    let mut writer = PayloadWriter::new();
    for field in fields {
        writer.put_field(field, layout);
    }
    writer.freeze()
}

/// Builds SFTP payloads.
#[derive(Debug, Default)]
pub struct PayloadWriter {
    buf: BytesMut,
}

impl PayloadWriter {
    /// Creates an empty writer.
    pub fn new() -> Self {
        Self::default()
    }

    /// Writes a byte.
    pub fn put_u8(&mut self, value: u8) {
        self.buf.put_u8(value);
    }

    /// Writes a boolean.
    pub fn put_bool(&mut self, value: bool) {
        self.buf.put_u8(value as u8);
    }

    /// Writes a uint32.
    pub fn put_u32(&mut self, value: u32) {
        self.buf.put_u32(value);
    }

    /// Writes a uint64.
    pub fn put_u64(&mut self, value: u64) {
        self.buf.put_u64(value);
    }

    /// Writes a length-prefixed string.
    pub fn put_string(&mut self, value: impl AsRef<[u8]>) {
        let value = value.as_ref();
        self.buf.put_u32(value.len() as u32);
        self.buf.put_slice(value);
    }

    /// Writes bytes without a length prefix.
    pub fn put_raw(&mut self, value: &[u8]) {
        self.buf.put_slice(value);
    }

    /// Writes one field.
    pub fn put_field(&mut self, field: &Field, layout: AttrsLayout) {
        match field {
            Field::Byte(v) => self.put_u8(*v),
            Field::Bool(v) => self.put_bool(*v),
            Field::U32(v) => self.put_u32(*v),
            Field::U64(v) => self.put_u64(*v),
            Field::String(v) => self.put_string(v),
            Field::Attrs(attrs) => attrs.encode(self, layout),
            Field::Raw(v) => self.put_raw(v),
        }
    }

    /// Returns the number of bytes written so far.
    pub fn len(&self) -> usize {
        self.buf.len()
    }

    /// Returns `true` if nothing has been written.
    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    /// Finishes the payload.
    pub fn freeze(self) -> Bytes {
        self.buf.freeze()
    }
}

/// Reads SFTP payloads.
#[derive(Debug, Clone)]
pub struct PayloadReader {
    buf: Bytes,
}

impl PayloadReader {
    /// Creates a reader over `payload`.
    pub fn new(payload: Bytes) -> Self {
        Self { buf: payload }
    }

    fn ensure(&self, required: usize) -> Result<()> {
        if self.buf.remaining() < required {
            return Err(Error::BufferTooShort {
                required,
                available: self.buf.remaining(),
            });
        }
        Ok(())
    }

    /// Returns the number of unread bytes.
    pub fn remaining(&self) -> usize {
        self.buf.remaining()
    }

    /// Returns `true` if unread bytes remain.
    pub fn has_remaining(&self) -> bool {
        self.buf.has_remaining()
    }

    /// Reads a byte.
    pub fn read_u8(&mut self) -> Result<u8> {
        self.ensure(1)?;
        Ok(self.buf.get_u8())
    }

    /// Reads a boolean; any non-zero byte is `true`.
    pub fn read_bool(&mut self) -> Result<bool> {
        Ok(self.read_u8()? != 0)
    }

    /// Reads a uint32.
    pub fn read_u32(&mut self) -> Result<u32> {
        self.ensure(4)?;
        Ok(self.buf.get_u32())
    }

    /// Reads a uint64.
    pub fn read_u64(&mut self) -> Result<u64> {
        self.ensure(8)?;
        Ok(self.buf.get_u64())
    }

    /// Reads a length-prefixed byte string.
    pub fn read_bytes(&mut self) -> Result<Bytes> {
        let len = self.read_u32()? as usize;
        self.ensure(len)?;
        Ok(self.buf.split_to(len))
    }

    /// Reads a length-prefixed string as text.
    ///
    /// Filenames are not guaranteed to be UTF-8 before v4; invalid sequences
    /// are replaced rather than rejected.
    pub fn read_string(&mut self) -> Result<String> {
        let bytes = self.read_bytes()?;
        Ok(String::from_utf8_lossy(&bytes).into_owned())
    }

    /// Reads an optional trailing boolean (v6 end-of-list / end-of-file).
    pub fn read_optional_bool(&mut self) -> Result<Option<bool>> {
        if self.has_remaining() {
            self.read_bool().map(Some)
        } else {
            Ok(None)
        }
    }

    /// Takes all unread bytes.
    pub fn read_rest(&mut self) -> Bytes {
        let len = self.buf.remaining();
        self.buf.split_to(len)
    }
}
