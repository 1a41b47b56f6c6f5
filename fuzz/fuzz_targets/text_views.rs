#![no_main]
use libfuzzer_sys::fuzz_target;
use phishurl_core::analyzer::Analyzer;

fuzz_target!(|data: &[u8]| {
    let url = String::from_utf8_lossy(data);
    let path_query = phishurl_core::text_view::path_query_view(&url);
    let domain = phishurl_core::text_view::domain_view(&url);
    let _ = Analyzer::Word.terms(&path_query, (1, 2), true);
    let _ = Analyzer::Char.terms(&domain, (3, 5), true);
});
