//! Request transport.
//!
//! The [`Transport`] assigns request ids, frames and sends requests, and
//! remembers each pending request until its reply is dispatched.
//! [`ChannelTransport`] writes frames into a tokio unbounded channel, which
//! is what the SSH channel layer (or a test) reads from.

use super::message::{SftpMessage, SftpMessageType};
use super::request::{Request, RequestId, RequestType};
use bytes::{BufMut, Bytes, BytesMut};
use skiff_platform::{SkiffError, SkiffResult};
use std::collections::HashMap;
use tokio::sync::mpsc;
use tracing::trace;

/// Sends requests and tracks them until their replies arrive.
pub trait Transport: Send {
    /// Assigns an id to the request, frames it and sends it.
    ///
    /// `payload` is everything after the request id.
    fn send_request(&mut self, request_type: RequestType, payload: Bytes) -> SkiffResult<RequestId>;

    /// Removes and returns the pending request with `id`.
    fn take_pending(&mut self, id: RequestId) -> Option<Request>;
}

/// Allocates request ids and remembers pending requests.
#[derive(Debug)]
pub struct RequestTracker {
    next_id: RequestId,
    pending: HashMap<RequestId, Request>,
}

impl RequestTracker {
    /// Creates a tracker whose first id is 1.
    pub fn new() -> Self {
        Self {
            next_id: 1,
            pending: HashMap::new(),
        }
    }

    /// Registers a pending request and returns its id.
    ///
    /// Ids wrap around and skip ids that are still pending.
    pub fn allocate(&mut self, request_type: RequestType) -> RequestId {
        let mut id = self.next_id;
        while self.pending.contains_key(&id) {
            id = id.wrapping_add(1);
        }
        self.next_id = id.wrapping_add(1);
        self.pending.insert(id, Request { id, request_type });
        id
    }

    /// Removes and returns a pending request.
    pub fn complete(&mut self, id: RequestId) -> Option<Request> {
        self.pending.remove(&id)
    }

    /// Returns `true` if `id` is pending.
    pub fn is_pending(&self, id: RequestId) -> bool {
        self.pending.contains_key(&id)
    }

    /// Number of requests awaiting a reply.
    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }
}

impl Default for RequestTracker {
    fn default() -> Self {
        Self::new()
    }
}

/// Transport writing framed requests into a tokio channel.
#[derive(Debug)]
pub struct ChannelTransport {
    tracker: RequestTracker,
    tx: mpsc::UnboundedSender<Bytes>,
}

impl ChannelTransport {
    /// Creates the transport and the receiving end of its frames.
    pub fn new() -> (Self, mpsc::UnboundedReceiver<Bytes>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (
            Self {
                tracker: RequestTracker::new(),
                tx,
            },
            rx,
        )
    }

    /// Returns the request tracker.
    pub fn tracker(&self) -> &RequestTracker {
        &self.tracker
    }
}

impl Transport for ChannelTransport {
    fn send_request(&mut self, request_type: RequestType, payload: Bytes) -> SkiffResult<RequestId> {
        let msg_type: SftpMessageType = request_type.wire_type();
        let id = self.tracker.allocate(request_type);

        let mut body = BytesMut::with_capacity(4 + payload.len());
        body.put_u32(id);
        body.put_slice(&payload);
        let frame = SftpMessage::new(msg_type, body.freeze()).to_bytes();
        trace!(id, msg_type = %msg_type, len = frame.len(), "Framed SFTP request");

        if self.tx.send(Bytes::from(frame)).is_err() {
            self.tracker.complete(id);
            return Err(SkiffError::Io(std::io::Error::new(
                std::io::ErrorKind::BrokenPipe,
                "SFTP channel closed",
            )));
        }
        Ok(id)
    }

    fn take_pending(&mut self, id: RequestId) -> Option<Request> {
        self.tracker.complete(id)
    }
}
