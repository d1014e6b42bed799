#![no_main]

use libfuzzer_sys::fuzz_target;
use mcproto::core::packet::Frame;
use mcproto::protocol::packets::standard_registry;
use mcproto::protocol::{Direction, ProtocolState};

fuzz_target!(|data: &[u8]| {
    // Frame parsing must never panic, with or without compression
    for compressed in [false, true] {
        if let Ok((frame, used)) = Frame::parse(data, compressed) {
            assert!(used <= data.len());
            for state in [ProtocolState::Handshaking, ProtocolState::Status] {
                for direction in [Direction::Serverbound, Direction::Clientbound] {
                    let _ = standard_registry().decode(state, direction, frame.id, &frame.payload);
                }
            }
        }
    }
});
