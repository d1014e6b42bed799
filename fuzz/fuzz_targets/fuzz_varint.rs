#![no_main]

use libfuzzer_sys::fuzz_target;
use mcproto::core::{BoundedString, VarInt, VarLong, WireType};

fuzz_target!(|data: &[u8]| {
    // Non-minimal encodings decode fine, so compare values rather than bytes
    if let Ok((value, consumed)) = VarInt::decode(data, 0) {
        assert!(consumed <= 5);
        let bytes = value.to_bytes().expect("encode");
        let (again, used) = VarInt::decode(&bytes, 0).expect("decode canonical");
        assert_eq!(again, value);
        assert!(used <= consumed);
    }
    if let Ok((value, consumed)) = VarLong::decode(data, 0) {
        assert!(consumed <= 10);
        let _ = value.to_bytes();
    }
    let _ = BoundedString::decode(data, 0);
});
