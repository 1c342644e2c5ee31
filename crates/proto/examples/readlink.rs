//! Readlink Example
//!
//! This example demonstrates how to:
//! - Negotiate a protocol version from a server's SSH_FXP_VERSION
//! - Send requests through the negotiated driver chain
//! - Feed server bytes back and dispatch the replies
//!
//! The server side is simulated in-process: request frames coming out of the
//! `ChannelTransport` are answered by a small responder task.
//!
//! Usage:
//!   cargo run --example readlink [version]
//!
//! Example:
//!   RUST_LOG=skiff_proto=debug cargo run --example readlink 6

use bytes::Bytes;
use skiff_proto::sftp::codec::{PayloadReader, PayloadWriter};
use skiff_proto::sftp::{
    negotiate, ChannelTransport, Field, Operation, Protocol, Response, ServerVersion, SftpConfig,
    SftpMessage, SftpMessageType,
};
use std::env;
use tokio::sync::mpsc;

/// Answers READLINK/REALPATH with a NAME, extensions with statvfs data and
/// everything else with an OK status.
fn answer(frame: &[u8], version: u32) -> skiff_proto::sftp::Result<Vec<u8>> {
    let request = SftpMessage::from_bytes(frame)?;
    let mut r = PayloadReader::new(request.payload.clone());
    let id = r.read_u32()?;

    let mut w = PayloadWriter::new();
    w.put_u32(id);
    let reply_type = match request.msg_type {
        SftpMessageType::ReadLink | SftpMessageType::RealPath => {
            let path = r.read_string()?;
            w.put_u32(1);
            w.put_string(format!("{}.target", path));
            if version <= 3 {
                w.put_string(format!("lrwxrwxrwx 1 root root 0 {}", path));
            }
            // empty ATTRS; a type byte follows the flags from version 4 on
            w.put_u32(0);
            if version >= 4 {
                w.put_u8(3);
            }
            SftpMessageType::Name
        }
        SftpMessageType::Extended => {
            for value in [4096u64, 4096, 1_000_000, 250_000, 200_000, 65536, 60000, 60000, 1, 0, 255] {
                w.put_u64(value);
            }
            SftpMessageType::ExtendedReply
        }
        _ => {
            w.put_u32(0);
            w.put_string("Success");
            w.put_string("en");
            SftpMessageType::Status
        }
    };

    Ok(SftpMessage::new(reply_type, w.freeze()).to_bytes())
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "skiff_proto=info".into()),
        )
        .init();

    let server_version: u32 = env::args()
        .nth(1)
        .map(|v| v.parse())
        .transpose()?
        .unwrap_or(3);

    // Step 1: Negotiate against the server's SSH_FXP_VERSION
    let mut version = PayloadWriter::new();
    version.put_u32(server_version);
    version.put_string("statvfs@openssh.com");
    version.put_string("2");
    let server =
        ServerVersion::parse(&SftpMessage::new(SftpMessageType::Version, version.freeze()))?;
    let negotiated = negotiate(&SftpConfig::default(), &server)?;
    println!("Negotiated SFTP version {}", negotiated.version);

    // Step 2: Wire the transport to the simulated server
    let (transport, mut requests) = ChannelTransport::new();
    let (reply_tx, mut replies) = mpsc::unbounded_channel::<Bytes>();
    let negotiated_version = negotiated.version.get();
    let responder = tokio::spawn(async move {
        while let Some(frame) = requests.recv().await {
            match answer(&frame, negotiated_version) {
                Ok(reply) => {
                    if reply_tx.send(Bytes::from(reply)).is_err() {
                        break;
                    }
                }
                Err(e) => eprintln!("responder: {}", e),
            }
        }
    });

    let mut sftp = Protocol::new(transport, negotiated)?;
    println!("Operations: {:?}", sftp.operations());

    // Step 3: Send requests
    let mut expected = 0;
    if sftp.supports(Operation::ReadLink) {
        sftp.readlink("/tmp/link")?;
        expected += 1;
    }
    if sftp.supports(Operation::Symlink) {
        sftp.symlink("/tmp/new-link", "/tmp/link")?;
        expected += 1;
    }
    if sftp.extensions().iter().any(|e| e == "statvfs@openssh.com") {
        sftp.extension("statvfs@openssh.com", &[Field::string("/")])?;
        expected += 1;
    }
    sftp.realpath(".")?;
    expected += 1;

    // Step 4: Dispatch the replies
    while expected > 0 {
        let Some(data) = replies.recv().await else {
            break;
        };
        let received = sftp.receive(&data);
        for (id, result) in received.replies {
            expected -= 1;
            let response = result?;
            match &response {
                Response::Name { .. } => {
                    println!("#{} -> {}", id, response.path().unwrap_or_default())
                }
                Response::Status(status) => println!("#{} {}", id, status),
                Response::Extended(reply) => println!("#{} {:?}", id, reply),
                other => println!("#{} {:?}", id, other),
            }
        }
        if let Some(e) = received.error {
            return Err(e.into());
        }
    }

    drop(sftp);
    responder.await?;
    Ok(())
}
