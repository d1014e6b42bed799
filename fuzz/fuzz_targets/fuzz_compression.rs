#![no_main]

use libfuzzer_sys::fuzz_target;
use mcproto::utils::compression::{compress, decompress};

fuzz_target!(|data: &[u8]| {
    // Round trip must hold for any input
    if let Ok(compressed) = compress(data, 6) {
        let out = decompress(&compressed, data.len()).expect("round trip");
        assert_eq!(out, data);
    }

    // Raw decompression of malformed data, declared length taken from the input
    if let Some((&first, rest)) = data.split_first() {
        let _ = decompress(rest, usize::from(first) * 64);
    }
});
