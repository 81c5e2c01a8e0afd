#![no_main]

use libfuzzer_sys::fuzz_target;
use quill_smtp::data::encode_data;

fuzz_target!(|data: &[u8]| {
    let framed = encode_data(data);

    assert!(framed.ends_with(b".\r\n"));
    for (i, &byte) in framed.iter().enumerate() {
        if byte == b'\n' {
            assert!(i > 0 && framed[i - 1] == b'\r');
        }
    }

    // The terminator only ever appears at the very end
    let body = &framed[..framed.len() - 3];
    assert!(!body.windows(5).any(|w| w == b"\r\n.\r\n"));
});
