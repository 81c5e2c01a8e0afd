#![no_main]

use libfuzzer_sys::fuzz_target;
use quill_mime::detect_content_type;

fuzz_target!(|data: &[u8]| {
    let _ = detect_content_type(data);
});
