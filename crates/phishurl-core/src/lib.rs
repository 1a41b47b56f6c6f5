#![forbid(unsafe_code)]

//! Feature extraction for phishing URL classification.
//!
//! A batch of URLs becomes one [`FeatureMatrix`] with columns
//! `[34 lexical features | path/query word n-grams | domain char n-grams]`.
//! The n-gram blocks are TF-IDF weighted against vocabularies learned by
//! [`UrlFeaturePipeline::fit`] and frozen in a [`FittedPipelineState`],
//! which [`persist`] writes and reloads bit-exact.

pub mod analyzer;
pub mod config;
pub mod entropy;
pub mod error;
pub mod features;
pub mod fusion;
pub mod persist;
pub mod pipeline;
pub mod scoring;
pub mod security_log;
pub mod sparse;
pub mod text_view;
pub mod url_parts;
pub mod vectorizer;

pub use error::{PersistenceError, PipelineError};
pub use features::{FeatureExtractor, LexicalFeatures, LEXICAL_FEATURE_COUNT, LEXICAL_FEATURE_NAMES};
pub use fusion::{ColumnLayout, FeatureMatrix};
pub use pipeline::{FittedPipelineState, PipelineConfig, UrlFeaturePipeline};
pub use scoring::{LinearModel, PhishingDetector, Prediction, Scorer, PHISHING_THRESHOLD};
pub use vectorizer::{TermVocabulary, TfidfModel, TfidfVectorizer, VectorizerConfig};
