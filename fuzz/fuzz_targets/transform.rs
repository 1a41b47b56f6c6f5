#![no_main]
use std::sync::OnceLock;

use libfuzzer_sys::fuzz_target;
use phishurl_core::{FittedPipelineState, PipelineConfig};

fn state() -> Option<&'static FittedPipelineState> {
    static STATE: OnceLock<Option<FittedPipelineState>> = OnceLock::new();
    STATE
        .get_or_init(|| {
            let mut config = PipelineConfig::default();
            config.path_query.min_df = 1;
            config.domain.min_df = 1;
            let corpus = [
                "https://www.example.com/products/item?id=1",
                "http://secure-login.verify-account.info/signin/update",
                "http://192.168.0.1/admin/login.php",
            ];
            FittedPipelineState::fit(&config, &corpus).ok()
        })
        .as_ref()
}

// Rows from arbitrary input keep the fitted width.
fuzz_target!(|data: &[u8]| {
    let Some(state) = state() else { return };
    let text = String::from_utf8_lossy(data);
    let urls: Vec<&str> = text.split('\n').take(64).collect();
    if let Ok(m) = state.transform(&urls) {
        assert_eq!(m.n_rows(), urls.len());
        assert_eq!(m.n_cols(), state.n_features());
    }
});
