//! Protocol facade.
//!
//! [`Protocol`] sits on top of the driver chain. It checks the operation
//! catalog, asks the top driver for the request, encodes it with the
//! negotiated ATTRS layout and hands it to the [`Transport`]. Inbound packets
//! go through [`Protocol::dispatch`], which correlates them with the pending
//! request and lets the driver chain decode them.
//!
//! # Example
//!
//! ```rust
//! use skiff_proto::sftp::{ChannelTransport, Protocol, ProtocolVersion};
//!
//! let (transport, mut frames) = ChannelTransport::new();
//! let mut sftp = Protocol::with_version(transport, ProtocolVersion::new(3).unwrap());
//!
//! let id = sftp.readlink("/tmp/link").unwrap();
//! assert_eq!(id, 1);
//! assert!(frames.try_recv().is_ok());
//! ```

use super::codec::{encode_fields, Field};
use super::driver::{self, Driver, Operation, ProtocolVersion};
use super::error::{Error, Result};
use super::extension::Extension;
use super::logging;
use super::message::{FrameBuffer, Packet};
use super::negotiation::Negotiated;
use super::request::{OperationRequest, RequestId, Response};
use super::transport::Transport;
use super::types::{FileAttributes, OpenFlags};
use std::sync::Arc;

/// Replies completed by one [`Protocol::receive`] call.
#[derive(Debug)]
pub struct Received {
    /// Dispatched replies in arrival order, each next to its request id
    pub replies: Vec<(RequestId, Result<Response>)>,
    /// Framing error that stopped reassembly. The inbound stream cannot be
    /// resynchronized after one.
    pub error: Option<Error>,
}

impl Received {
    /// Returns `true` if reassembly stopped on a framing error.
    pub fn is_fatal(&self) -> bool {
        self.error.is_some()
    }
}

/// An SFTP session at a negotiated version.
pub struct Protocol<T: Transport> {
    transport: T,
    driver: Box<dyn Driver>,
    version: ProtocolVersion,
    inbound: FrameBuffer,
}

impl<T: Transport> Protocol<T> {
    /// Builds the driver chain for the negotiated version and loads the
    /// agreed extensions.
    pub fn new(transport: T, negotiated: Negotiated) -> Result<Self> {
        let mut protocol = Self::with_version(transport, negotiated.version)
            .with_max_frame_len(negotiated.max_frame_len);
        if !negotiated.extensions.is_empty() {
            protocol.load_extensions(negotiated.extensions)?;
        }
        Ok(protocol)
    }

    /// Builds a session at `version` without extensions.
    pub fn with_version(transport: T, version: ProtocolVersion) -> Self {
        Self {
            transport,
            driver: driver::load(version),
            version,
            inbound: FrameBuffer::default(),
        }
    }

    /// Sets the largest inbound frame accepted by [`Protocol::receive`].
    pub fn with_max_frame_len(mut self, max_frame_len: usize) -> Self {
        self.inbound = FrameBuffer::new(max_frame_len);
        self
    }

    /// Negotiated version.
    pub fn version(&self) -> ProtocolVersion {
        self.version
    }

    /// Top of the driver chain.
    pub fn driver(&self) -> &dyn Driver {
        self.driver.as_ref()
    }

    /// Underlying transport.
    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Underlying transport, mutably.
    pub fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }

    /// Operations available at the negotiated version.
    pub fn operations(&self) -> Vec<Operation> {
        self.driver.operations()
    }

    /// Returns `true` if `op` is available at the negotiated version.
    pub fn supports(&self, op: Operation) -> bool {
        self.driver.supports(op)
    }

    /// Replaces the extension registry.
    pub fn load_extensions(&mut self, extensions: Vec<Arc<dyn Extension>>) -> Result<()> {
        self.driver.load_extensions(extensions)?;
        logging::log_extensions_loaded(&self.driver.extension_names());
        Ok(())
    }

    /// Names of the loaded extensions, sorted.
    pub fn extensions(&self) -> Vec<String> {
        self.driver.extension_names()
    }

    fn send<F>(&mut self, op: Operation, build: F) -> Result<RequestId>
    where
        F: FnOnce(&dyn Driver) -> Result<OperationRequest>,
    {
        if !self.driver.supports(op) {
            return Err(Error::OperationNotSupported {
                operation: op.name().to_string(),
                version: self.version.get(),
            });
        }
        let request = build(self.driver.as_ref())?;
        self.submit(request)
    }

    fn submit(&mut self, request: OperationRequest) -> Result<RequestId> {
        let payload = encode_fields(&request.fields, self.driver.attrs_layout());
        let label = request.request_type.to_string();
        let len = payload.len();

        let id = self.transport.send_request(request.request_type, payload)?;
        logging::log_request_sent(id, &label, self.version.get(), len);
        Ok(id)
    }

    /// Opens a file.
    pub fn open(&mut self, path: &str, flags: OpenFlags, attrs: &FileAttributes) -> Result<RequestId> {
        self.send(Operation::Open, |d| d.open(path, flags, attrs))
    }

    /// Closes a handle.
    pub fn close(&mut self, handle: &[u8]) -> Result<RequestId> {
        logging::log_handle_operation("close", handle);
        self.send(Operation::Close, |d| d.close(handle))
    }

    /// Reads up to `len` bytes at `offset`.
    pub fn read(&mut self, handle: &[u8], offset: u64, len: u32) -> Result<RequestId> {
        logging::log_handle_operation("read", handle);
        self.send(Operation::Read, |d| d.read(handle, offset, len))
    }

    /// Writes `data` at `offset`.
    pub fn write(&mut self, handle: &[u8], offset: u64, data: &[u8]) -> Result<RequestId> {
        logging::log_handle_operation("write", handle);
        self.send(Operation::Write, |d| d.write(handle, offset, data))
    }

    /// Attributes of `path` without following symlinks.
    pub fn lstat(&mut self, path: &str, flags: Option<u32>) -> Result<RequestId> {
        self.send(Operation::LStat, |d| d.lstat(path, flags))
    }

    /// Attributes of an open handle.
    pub fn fstat(&mut self, handle: &[u8], flags: Option<u32>) -> Result<RequestId> {
        logging::log_handle_operation("fstat", handle);
        self.send(Operation::FStat, |d| d.fstat(handle, flags))
    }

    /// Sets attributes of `path`.
    pub fn setstat(&mut self, path: &str, attrs: &FileAttributes) -> Result<RequestId> {
        self.send(Operation::SetStat, |d| d.setstat(path, attrs))
    }

    /// Sets attributes of an open handle.
    pub fn fsetstat(&mut self, handle: &[u8], attrs: &FileAttributes) -> Result<RequestId> {
        logging::log_handle_operation("fsetstat", handle);
        self.send(Operation::FSetStat, |d| d.fsetstat(handle, attrs))
    }

    /// Opens a directory.
    pub fn opendir(&mut self, path: &str) -> Result<RequestId> {
        self.send(Operation::OpenDir, |d| d.opendir(path))
    }

    /// Reads the next batch of directory entries.
    pub fn readdir(&mut self, handle: &[u8]) -> Result<RequestId> {
        logging::log_handle_operation("readdir", handle);
        self.send(Operation::ReadDir, |d| d.readdir(handle))
    }

    /// Removes a file.
    pub fn remove(&mut self, path: &str) -> Result<RequestId> {
        self.send(Operation::Remove, |d| d.remove(path))
    }

    /// Creates a directory.
    pub fn mkdir(&mut self, path: &str, attrs: &FileAttributes) -> Result<RequestId> {
        self.send(Operation::MkDir, |d| d.mkdir(path, attrs))
    }

    /// Removes a directory.
    pub fn rmdir(&mut self, path: &str) -> Result<RequestId> {
        self.send(Operation::RmDir, |d| d.rmdir(path))
    }

    /// Canonicalizes a path.
    pub fn realpath(&mut self, path: &str) -> Result<RequestId> {
        self.send(Operation::RealPath, |d| d.realpath(path))
    }

    /// Attributes of `path`, following symlinks.
    pub fn stat(&mut self, path: &str, flags: Option<u32>) -> Result<RequestId> {
        self.send(Operation::Stat, |d| d.stat(path, flags))
    }

    /// Renames `old_path` to `new_path`.
    pub fn rename(&mut self, old_path: &str, new_path: &str, flags: Option<u32>) -> Result<RequestId> {
        self.send(Operation::Rename, |d| d.rename(old_path, new_path, flags))
    }

    /// Reads the target of a symlink.
    pub fn readlink(&mut self, path: &str) -> Result<RequestId> {
        self.send(Operation::ReadLink, |d| d.readlink(path))
    }

    /// Creates a symlink at `path` pointing to `target`.
    pub fn symlink(&mut self, path: &str, target: &str) -> Result<RequestId> {
        self.send(Operation::Symlink, |d| d.symlink(path, target))
    }

    /// Creates a hard or symbolic link.
    pub fn link(&mut self, new_link_path: &str, existing_path: &str, symlink: bool) -> Result<RequestId> {
        self.send(Operation::Link, |d| d.link(new_link_path, existing_path, symlink))
    }

    /// Locks a byte range.
    pub fn block(&mut self, handle: &[u8], offset: u64, length: u64, mask: u32) -> Result<RequestId> {
        logging::log_handle_operation("block", handle);
        self.send(Operation::Block, |d| d.block(handle, offset, length, mask))
    }

    /// Releases a byte-range lock.
    pub fn unblock(&mut self, handle: &[u8], offset: u64, length: u64) -> Result<RequestId> {
        logging::log_handle_operation("unblock", handle);
        self.send(Operation::Unblock, |d| d.unblock(handle, offset, length))
    }

    /// Invokes the registered extension `name`.
    pub fn extension(&mut self, name: &str, args: &[Field]) -> Result<RequestId> {
        self.send(Operation::Extended, |d| d.extended(name, args))
    }

    /// Routes an inbound reply to its pending request and decodes it.
    pub fn dispatch(&mut self, packet: &Packet) -> Result<Response> {
        let request = match self.transport.take_pending(packet.request_id) {
            Some(request) => request,
            None => {
                logging::log_reply_rejected(packet.request_id, packet.msg_type, "unknown request id");
                return Err(Error::ProtocolViolation(format!(
                    "reply for unknown request id {}",
                    packet.request_id
                )));
            }
        };

        let kind = match packet.kind() {
            Some(kind) if kind.is_reply() => kind,
            _ => {
                logging::log_reply_rejected(packet.request_id, packet.msg_type, "not a reply type");
                return Err(Error::ProtocolViolation(format!(
                    "message type {} is not a reply",
                    packet.msg_type
                )));
            }
        };
        if !request.request_type.accepts(kind) {
            logging::log_reply_rejected(packet.request_id, packet.msg_type, "unexpected reply shape");
            return Err(Error::ProtocolViolation(format!(
                "{} is not a valid reply to {}",
                kind, request.request_type
            )));
        }

        let response = self
            .driver
            .parse(&request, packet, self.driver.attrs_layout())?;
        logging::log_reply_dispatched(request.id, &request.request_type.to_string(), packet.msg_type);
        Ok(response)
    }

    /// Feeds channel data and dispatches every reply it completes.
    ///
    /// Per-reply failures are reported next to their request id. A framing
    /// error stops reassembly and is returned in [`Received::error`] together
    /// with the replies dispatched before it.
    pub fn receive(&mut self, data: &[u8]) -> Received {
        self.inbound.push(data);
        let mut replies = Vec::new();
        loop {
            match self.inbound.next_packet() {
                Ok(Some(packet)) => {
                    let result = self.dispatch(&packet);
                    replies.push((packet.request_id, result));
                }
                Ok(None) => return Received { replies, error: None },
                Err(e) => {
                    logging::log_frame_rejected(&e, self.inbound.buffered());
                    return Received {
                        replies,
                        error: Some(e),
                    };
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sftp::codec::PayloadWriter;
    use crate::sftp::message::SftpMessageType;
    use crate::sftp::request::{Request, RequestType};
    use crate::sftp::transport::RequestTracker;
    use bytes::Bytes;
    use skiff_platform::SkiffResult;

    #[derive(Default)]
    struct RecordingTransport {
        tracker: RequestTracker,
        sent: Vec<(RequestType, Bytes)>,
    }

    impl Transport for RecordingTransport {
        fn send_request(&mut self, request_type: RequestType, payload: Bytes) -> SkiffResult<RequestId> {
            self.sent.push((request_type.clone(), payload));
            Ok(self.tracker.allocate(request_type))
        }

        fn take_pending(&mut self, id: RequestId) -> Option<Request> {
            self.tracker.complete(id)
        }
    }

    fn session(version: u32) -> Protocol<RecordingTransport> {
        Protocol::with_version(RecordingTransport::default(), ProtocolVersion::new(version).unwrap())
    }

    fn name_reply(id: u32, name: &str) -> Packet {
        let mut w = PayloadWriter::new();
        w.put_u32(1);
        w.put_string(name);
        w.put_string(name);
        w.put_u32(0);
        Packet::reply(SftpMessageType::Name, id, w.freeze())
    }

    #[test]
    fn test_readlink_v3() {
        let mut sftp = session(3);
        let id = sftp.readlink("/tmp/link").unwrap();

        let (request_type, payload) = &sftp.transport().sent[0];
        assert_eq!(*request_type, RequestType::Packet(SftpMessageType::ReadLink));
        let mut expected = vec![0, 0, 0, 9];
        expected.extend_from_slice(b"/tmp/link");
        assert_eq!(&payload[..], &expected[..]);

        let response = sftp.dispatch(&name_reply(id, "/tmp/target")).unwrap();
        assert_eq!(response.path(), Some("/tmp/target"));
    }

    #[test]
    fn test_unsupported_operation_not_sent() {
        let mut sftp = session(2);
        assert_eq!(
            sftp.readlink("/tmp/link").unwrap_err(),
            Error::OperationNotSupported {
                operation: "readlink".to_string(),
                version: 2
            }
        );
        assert!(sftp.transport().sent.is_empty());
    }

    #[test]
    fn test_dispatch_unknown_id() {
        let mut sftp = session(3);
        assert!(matches!(
            sftp.dispatch(&name_reply(42, "/x")),
            Err(Error::ProtocolViolation(_))
        ));
    }

    #[test]
    fn test_dispatch_rejects_wrong_shape() {
        let mut sftp = session(3);
        let id = sftp.remove("/tmp/x").unwrap();
        assert!(matches!(
            sftp.dispatch(&name_reply(id, "/x")),
            Err(Error::ProtocolViolation(_))
        ));
        // the request is consumed either way
        assert_eq!(sftp.transport().tracker.pending_count(), 0);
    }

    #[test]
    fn test_dispatch_rejects_non_reply_type() {
        let mut sftp = session(3);
        let id = sftp.stat("/", None).unwrap();
        let packet = Packet::new(250, id, Vec::new());
        assert!(matches!(sftp.dispatch(&packet), Err(Error::ProtocolViolation(_))));
    }

    #[test]
    fn test_attrs_encoded_with_negotiated_layout() {
        // mkdir is defined by version 1, but its attributes use the v4 layout
        let mut sftp = session(4);
        let mut attrs = FileAttributes::new();
        attrs.size = Some(0);
        sftp.mkdir("/tmp/d", &attrs).unwrap();

        let (_, payload) = &sftp.transport().sent[0];
        let mut expected = vec![0, 0, 0, 6];
        expected.extend_from_slice(b"/tmp/d");
        expected.extend_from_slice(&attrs.to_bytes(crate::sftp::types::AttrsLayout::V4));
        assert_eq!(&payload[..], &expected[..]);
    }

    #[test]
    fn test_receive_reassembles_frames() {
        let mut sftp = session(3);
        let id = sftp.realpath(".").unwrap();

        let packet = name_reply(id, "/home/user");
        let mut body = id.to_be_bytes().to_vec();
        body.extend_from_slice(&packet.payload);
        let frame = crate::sftp::message::SftpMessage::new(SftpMessageType::Name, body).to_bytes();

        let (head, tail) = frame.split_at(7);
        let received = sftp.receive(head);
        assert!(received.replies.is_empty());
        assert!(!received.is_fatal());

        let received = sftp.receive(tail);
        assert!(received.error.is_none());
        assert_eq!(received.replies.len(), 1);
        assert_eq!(received.replies[0].0, id);
        assert_eq!(received.replies[0].1.as_ref().unwrap().path(), Some("/home/user"));
    }

    #[test]
    fn test_receive_keeps_replies_before_framing_error() {
        let mut sftp = session(3);
        let id = sftp.remove("/tmp/x").unwrap();

        let mut body = id.to_be_bytes().to_vec();
        body.extend_from_slice(&[0, 0, 0, 0]);
        body.extend_from_slice(&[0, 0, 0, 2]);
        body.extend_from_slice(b"OK");
        body.extend_from_slice(&[0, 0, 0, 0]);
        let mut data = crate::sftp::message::SftpMessage::new(SftpMessageType::Status, body).to_bytes();
        // a frame too short to carry its request id
        data.extend_from_slice(&[0, 0, 0, 3, 101, 0, 0]);

        let received = sftp.receive(&data);
        assert_eq!(received.replies.len(), 1);
        assert_eq!(received.replies[0].0, id);
        let status = received.replies[0].1.as_ref().unwrap().status().unwrap();
        assert!(status.is_ok());
        assert!(matches!(received.error, Some(Error::BufferTooShort { .. })));
        assert_eq!(sftp.transport().tracker.pending_count(), 0);
    }

    #[test]
    fn test_frame_limit_from_config() {
        use crate::sftp::config::SftpConfig;
        use crate::sftp::negotiation::{negotiate, ServerVersion};

        let config = SftpConfig::builder().with_max_frame_len(1024).build().unwrap();
        let server = ServerVersion {
            version: 3,
            extensions: Vec::new(),
        };
        let negotiated = negotiate(&config, &server).unwrap();
        let mut sftp = Protocol::new(RecordingTransport::default(), negotiated).unwrap();
        let id = sftp.read(b"h", 0, 4000).unwrap();

        let mut body = id.to_be_bytes().to_vec();
        body.extend_from_slice(&4000u32.to_be_bytes());
        body.extend_from_slice(&[0u8; 4000]);
        let frame = crate::sftp::message::SftpMessage::new(SftpMessageType::Data, body).to_bytes();

        let received = sftp.receive(&frame);
        assert!(received.replies.is_empty());
        assert!(matches!(received.error, Some(Error::ProtocolViolation(_))));
        assert_eq!(sftp.transport().tracker.pending_count(), 1);
    }
}
