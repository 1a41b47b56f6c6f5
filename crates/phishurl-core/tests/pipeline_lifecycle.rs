use phishurl_core::features::FeatureExtractor;
use phishurl_core::{
    FittedPipelineState, PipelineConfig, PipelineError, UrlFeaturePipeline, LEXICAL_FEATURE_COUNT,
    LEXICAL_FEATURE_NAMES,
};

fn column(name: &str) -> usize {
    LEXICAL_FEATURE_NAMES
        .iter()
        .position(|n| *n == name)
        .expect("known lexical feature")
}

/// Enough repetition that the default `min_df = 5` keeps common terms.
fn training_corpus() -> Vec<String> {
    let mut urls = Vec::new();
    for i in 0..12 {
        urls.push(format!("https://www.example.com/products/item-{i}?ref=home"));
        urls.push(format!("http://secure-login.paypal.com.verify-account.info/signin/update?id={i}"));
        urls.push(format!("https://accounts.google.com/login/session?continue=mail&n={i}"));
        urls.push(format!("http://192.168.{i}.10/secure/login.php"));
    }
    urls
}

#[test]
fn concrete_login_and_ip_rows() {
    let mut pipeline = UrlFeaturePipeline::new(PipelineConfig::default());
    pipeline.fit(&training_corpus()).expect("fit");
    let m = pipeline
        .transform(&["http://example.com/login?user=1", "https://192.168.0.1/secure"])
        .expect("transform");
    assert_eq!(m.n_rows(), 2);
    assert_eq!(m.get(1, column("has_ip")), 1.0);
    assert_eq!(m.get(1, column("is_https")), 1.0);
    assert_eq!(m.get(0, column("num_equal")), 1.0);
    assert_eq!(m.get(0, column("is_https")), 0.0);
}

#[test]
fn empty_url_row_is_defined_and_zero() {
    let mut pipeline = UrlFeaturePipeline::new(PipelineConfig::default());
    pipeline.fit(&training_corpus()).expect("fit");
    let m = pipeline.transform(&[""]).expect("transform");
    assert_eq!(m.n_rows(), 1);
    let row = m.dense_row(0);
    assert_eq!(row.len(), m.n_cols());
    assert!(row.iter().all(|v| *v == 0.0));
    assert_eq!(m.get(0, column("entropy")), 0.0);
    assert_eq!(FeatureExtractor::extract("").to_row().len(), LEXICAL_FEATURE_COUNT);
}

#[test]
fn transform_before_fit_fails_after_fit_succeeds() {
    let mut pipeline = UrlFeaturePipeline::new(PipelineConfig::default());
    assert!(matches!(
        pipeline.transform(&["http://example.com"]),
        Err(PipelineError::NotFitted)
    ));
    pipeline.fit(&training_corpus()).expect("fit");
    assert!(pipeline.transform(&["http://example.com"]).is_ok());
}

#[test]
fn rows_follow_input_order() {
    let mut pipeline = UrlFeaturePipeline::new(PipelineConfig::default());
    pipeline.fit(&training_corpus()).expect("fit");
    let urls = [
        "https://a.example.com/",
        "http://exa mple.com/broken",
        "",
        "https://192.168.3.10/secure/login.php",
        "www.example.com/products/item-3?ref=home",
    ];
    let m = pipeline.transform(&urls).expect("transform");
    assert_eq!(m.n_rows(), urls.len());
    for (r, url) in urls.iter().enumerate() {
        let expected = FeatureExtractor::extract(url).to_row();
        assert_eq!(&m.dense_row(r)[..LEXICAL_FEATURE_COUNT], &expected[..], "row {r}");
    }
}

#[test]
fn same_batch_twice_is_identical() {
    let state = FittedPipelineState::fit(&PipelineConfig::default(), &training_corpus()).expect("fit");
    let urls = training_corpus();
    let first = state.transform(&urls).expect("transform");
    let second = state.transform(&urls).expect("transform");
    assert_eq!(first, second);
    let parallel = state.transform_parallel(&urls).expect("transform");
    assert_eq!(first, parallel);
    let entropy = column("entropy");
    for r in 0..first.n_rows() {
        let expected = FeatureExtractor::extract(&urls[r]).entropy.to_bits();
        assert_eq!(first.get(r, entropy).to_bits(), expected, "row {r}");
    }
}

#[test]
fn private_hosting_suffix_shares_domain_terms() {
    let mut config = PipelineConfig::default();
    config.domain.min_df = 2;
    let urls = [
        "https://paypal-login.github.io/x",
        "https://bank-verify.github.io/y",
    ];
    let state = FittedPipelineState::fit(&config, &urls).expect("fit");
    let names = state.column_names();
    // Both hosts reduce to github.io, so every domain gram is shared.
    assert!(names.iter().any(|n| n == "domain:gith"));
    assert!(names.iter().any(|n| n == "domain:b.io"));
    assert!(!names.iter().any(|n| n == "domain:pay"));
    assert!(!names.iter().any(|n| n == "domain:ban"));
}

#[test]
fn default_min_df_prunes_rare_terms() {
    let state = FittedPipelineState::fit(&PipelineConfig::default(), &training_corpus()).expect("fit");
    let names = state.column_names();
    assert!(names.iter().any(|n| n == "path_query:login"));
    assert!(names.iter().any(|n| n == "domain:exa"));
    // Each item-N appears once, below min_df.
    assert!(!names.iter().any(|n| n == "path_query:item-3"));
}

#[test]
fn unseen_terms_add_no_columns() {
    let state = FittedPipelineState::fit(&PipelineConfig::default(), &training_corpus()).expect("fit");
    let width = state.n_features();
    let m = state
        .transform(&["https://zzqqxx.unseen-domain.xyz/neverseen/tokens?foo=bar"])
        .expect("transform");
    assert_eq!(m.n_cols(), width);
    assert_eq!(state.n_features(), width);
    let layout = m.layout();
    assert!(m.row(0).all(|(c, _)| !layout.path_query().contains(&c)));
}

#[test]
fn refit_changes_vocabulary_not_lexical_block() {
    let mut pipeline = UrlFeaturePipeline::new(PipelineConfig::default());
    pipeline.fit(&training_corpus()).expect("fit");
    let first = pipeline.state().expect("state");

    let other: Vec<String> = (0..10)
        .map(|i| format!("https://shop.store.net/cart/checkout?item={i}"))
        .collect();
    pipeline.fit(&other).expect("refit");
    let second = pipeline.state().expect("state");

    assert_ne!(first.column_names(), second.column_names());
    assert_eq!(
        &first.column_names()[..LEXICAL_FEATURE_COUNT],
        &second.column_names()[..LEXICAL_FEATURE_COUNT]
    );
    let url = ["http://example.com/login?user=1"];
    let a = first.transform(&url).expect("transform");
    let b = second.transform(&url).expect("transform");
    assert_eq!(
        &a.dense_row(0)[..LEXICAL_FEATURE_COUNT],
        &b.dense_row(0)[..LEXICAL_FEATURE_COUNT]
    );
}

#[test]
fn fused_width_matches_vocabularies() {
    let state = FittedPipelineState::fit(&PipelineConfig::default(), &training_corpus()).expect("fit");
    let m = state.transform(&training_corpus()).expect("transform");
    assert_eq!(
        m.n_cols(),
        LEXICAL_FEATURE_COUNT
            + state.path_query().vocabulary().len()
            + state.domain().vocabulary().len()
    );
    let layout = m.layout();
    for r in 0..m.n_rows() {
        let norm: f64 = m
            .row(r)
            .filter(|(c, _)| layout.domain().contains(c))
            .map(|(_, v)| v * v)
            .sum();
        assert!(norm == 0.0 || (norm - 1.0).abs() < 1e-9, "row {r} norm {norm}");
    }
}
