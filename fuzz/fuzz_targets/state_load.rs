#![no_main]
use libfuzzer_sys::fuzz_target;

// Rejected input never panics.
fuzz_target!(|data: &[u8]| {
    if let Ok(text) = std::str::from_utf8(data) {
        let _ = phishurl_core::persist::from_json(text);
    }
});
