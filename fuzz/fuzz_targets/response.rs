#![no_main]

use libfuzzer_sys::fuzz_target;
use quill_smtp::Response;

fuzz_target!(|data: &[u8]| {
    if let Ok(Some((_, consumed))) = Response::parse_response(data) {
        assert!(consumed <= data.len());
    }
});
