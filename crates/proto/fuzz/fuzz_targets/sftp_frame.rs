//! Fuzz target for SFTP frame and reply parsing.
//!
//! This fuzzer feeds random channel data through frame reassembly and reply
//! decoding of every driver version to find:
//! - Panics
//! - Unbounded allocations
//! - Incorrect error handling
//!
//! Run with:
//! ```bash
//! cd crates/proto
//! cargo +nightly fuzz run sftp_frame -- -max_total_time=300
//! ```

#![no_main]
use libfuzzer_sys::fuzz_target;
use skiff_proto::sftp::driver::{self, Driver};
use skiff_proto::sftp::{FrameBuffer, ProtocolVersion, Request, RequestType, SftpMessage, SftpMessageType};

fuzz_target!(|data: &[u8]| {
    // Round-trip whatever parses as a single message
    if let Ok(message) = SftpMessage::from_bytes(data) {
        let serialized = message.to_bytes();
        let reparsed =
            SftpMessage::from_bytes(&serialized).expect("Round-trip parsing should never fail");
        assert_eq!(message.payload, reparsed.payload);
    }

    let mut buffer = FrameBuffer::new(64 * 1024);
    buffer.push(data);
    while let Ok(Some(packet)) = buffer.next_packet() {
        for version in 1..=6 {
            let chain = driver::load(ProtocolVersion::new(version).unwrap());
            for msg_type in [SftpMessageType::ReadDir, SftpMessageType::Read, SftpMessageType::Stat] {
                let request = Request {
                    id: packet.request_id,
                    request_type: RequestType::Packet(msg_type),
                };
                let _ = chain.parse(&request, &packet, chain.attrs_layout());
            }
        }
    }
});
