//! Structured logging for SFTP sessions
//!
//! Provides structured, contextual logging using the `tracing` framework.
//!
//! # Log Levels
//!
//! - **TRACE**: Request framing
//! - **DEBUG**: Requests sent, replies dispatched, handle operations
//! - **INFO**: Version negotiation, extension loading
//! - **WARN**: Duplicate extension names, rejected replies
//!
//! # Example
//!
//! ```no_run
//! use skiff_proto::sftp::logging;
//!
//! tracing_subscriber::fmt()
//!     .with_env_filter("skiff_proto::sftp=debug")
//!     .init();
//!
//! logging::log_version_negotiated(6, 3, 3);
//! ```

use tracing::{debug, info, warn};

/// Log an outgoing request
///
/// # Arguments
///
/// * `id` - Assigned request id
/// * `request` - Request type or extension name
/// * `version` - Negotiated protocol version
/// * `payload_len` - Payload length in bytes
pub fn log_request_sent(id: u32, request: &str, version: u32, payload_len: usize) {
    debug!(
        request_id = id,
        request = request,
        version = version,
        payload_len = payload_len,
        "SFTP request sent"
    );
}

/// Log a reply routed to its request
pub fn log_reply_dispatched(id: u32, request: &str, reply_type: u8) {
    debug!(
        request_id = id,
        request = request,
        reply_type = reply_type,
        "SFTP reply dispatched"
    );
}

/// Log a reply that could not be routed
pub fn log_reply_rejected(id: u32, reply_type: u8, reason: &str) {
    warn!(
        request_id = id,
        reply_type = reply_type,
        reason = reason,
        "SFTP reply rejected"
    );
}

/// Log a framing error on the inbound stream
pub fn log_frame_rejected(error: &super::error::Error, buffered: usize) {
    warn!(
        error = %error,
        buffered = buffered,
        "SFTP inbound frame rejected"
    );
}

/// Log the extension set loaded into the registry
pub fn log_extensions_loaded(names: &[String]) {
    info!(
        count = names.len(),
        extensions = %names.join(","),
        "SFTP extensions loaded"
    );
}

/// Log version negotiation
///
/// # Arguments
///
/// * `offered` - Highest version the client offered
/// * `server` - Version the server announced
/// * `negotiated` - Version in use
pub fn log_version_negotiated(offered: u32, server: u32, negotiated: u32) {
    info!(
        offered = offered,
        server = server,
        negotiated = negotiated,
        "SFTP version negotiated"
    );
}

/// Log an operation on an open handle
pub fn log_handle_operation(operation: &str, handle: &[u8]) {
    debug!(
        operation = operation,
        handle = %hex::encode(handle),
        "SFTP handle operation"
    );
}
