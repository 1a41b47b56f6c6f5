#![no_main]
use libfuzzer_sys::fuzz_target;
use phishurl_core::LEXICAL_FEATURE_COUNT;

// Any string yields a full, finite lexical row.
fuzz_target!(|data: &[u8]| {
    let url = String::from_utf8_lossy(data);
    let row = phishurl_core::FeatureExtractor::extract(&url).to_row();
    assert_eq!(row.len(), LEXICAL_FEATURE_COUNT);
    assert!(row.iter().all(|v| v.is_finite() && *v >= 0.0));
});
