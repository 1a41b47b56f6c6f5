//! Versioned JSON artifact for a fitted pipeline.
//!
//! ```text
//! { "format": "phishurl.pipeline", "version": 1, "sha256": "<hex>",
//!   "body": { "lexical_schema": [...],
//!             "path_query": { "config": {...}, "document_count": N, "terms": [...], "idf": [...] },
//!             "domain":     { ... } } }
//! ```
//!
//! The checksum covers the canonical serialisation of `body` (object keys
//! sorted), so re-indenting the file keeps it valid but editing a weight
//! does not.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tracing::Level;

use crate::error::PersistenceError;
use crate::features::LEXICAL_FEATURE_NAMES;
use crate::pipeline::FittedPipelineState;
use crate::security_log::{EventDomain, PipelineEvent};
use crate::vectorizer::{TermVocabulary, TfidfModel, VectorizerConfig};

pub const STATE_FORMAT: &str = "phishurl.pipeline";
pub const STATE_VERSION: u32 = 1;
const MAX_STATE_BYTES: u64 = 512 * 1024 * 1024;

#[derive(Serialize, Deserialize)]
struct Envelope {
    format: String,
    version: u32,
    sha256: String,
    body: serde_json::Value,
}

#[derive(Serialize, Deserialize)]
struct StateBody {
    lexical_schema: Vec<String>,
    path_query: StoredVectorizer,
    domain: StoredVectorizer,
}

#[derive(Serialize, Deserialize)]
struct StoredVectorizer {
    config: VectorizerConfig,
    document_count: usize,
    terms: Vec<String>,
    idf: Vec<f64>,
}

impl StoredVectorizer {
    fn from_model(model: &TfidfModel) -> Self {
        let vocab = model.vocabulary();
        Self {
            config: model.config().clone(),
            document_count: vocab.document_count(),
            terms: vocab.terms().to_vec(),
            idf: vocab.idf().to_vec(),
        }
    }

    fn into_model(self, block: &'static str) -> Result<TfidfModel, PersistenceError> {
        self.config
            .validate()
            .map_err(|e| PersistenceError::Inconsistent {
                block,
                reason: e.to_string(),
            })?;
        let vocabulary = TermVocabulary::from_parts(self.terms, self.idf, self.document_count)
            .map_err(|reason| PersistenceError::Inconsistent { block, reason })?;
        Ok(TfidfModel::new(self.config, vocabulary))
    }
}

fn sha256_hex(data: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hex::encode(hasher.finalize())
}

fn body_digest(body: &serde_json::Value) -> Result<String, PersistenceError> {
    let canonical = serde_json::to_vec(body).map_err(|e| PersistenceError::Malformed(e.to_string()))?;
    Ok(sha256_hex(&canonical))
}

/// Serialises a fitted state to the artifact format.
pub fn to_json(state: &FittedPipelineState) -> Result<String, PersistenceError> {
    let body = StateBody {
        lexical_schema: LEXICAL_FEATURE_NAMES.iter().map(|n| n.to_string()).collect(),
        path_query: StoredVectorizer::from_model(state.path_query()),
        domain: StoredVectorizer::from_model(state.domain()),
    };
    let body = serde_json::to_value(&body).map_err(|e| PersistenceError::Malformed(e.to_string()))?;
    let envelope = Envelope {
        format: STATE_FORMAT.to_string(),
        version: STATE_VERSION,
        sha256: body_digest(&body)?,
        body,
    };
    serde_json::to_string_pretty(&envelope).map_err(|e| PersistenceError::Malformed(e.to_string()))
}

/// Parses and validates an artifact. Nothing is returned unless every
/// check passes.
pub fn from_json(data: &str) -> Result<FittedPipelineState, PersistenceError> {
    let envelope: Envelope =
        serde_json::from_str(data).map_err(|e| PersistenceError::Malformed(e.to_string()))?;
    if envelope.format != STATE_FORMAT {
        return Err(PersistenceError::UnsupportedFormat {
            found: envelope.format,
            expected: STATE_FORMAT,
        });
    }
    if envelope.version != STATE_VERSION {
        return Err(PersistenceError::UnsupportedVersion {
            found: envelope.version,
            supported: STATE_VERSION,
        });
    }
    let actual = body_digest(&envelope.body)?;
    if !actual.eq_ignore_ascii_case(&envelope.sha256) {
        PipelineEvent::new(
            Level::ERROR,
            EventDomain::Persist,
            "checksum_mismatch",
            "Pipeline state body does not match its checksum",
        )
        .emit();
        return Err(PersistenceError::ChecksumMismatch {
            expected: envelope.sha256,
            actual,
        });
    }
    let body: StateBody = serde_json::from_value(envelope.body)
        .map_err(|e| PersistenceError::Malformed(e.to_string()))?;
    check_schema(&body.lexical_schema)?;
    let path_query = body.path_query.into_model("path_query")?;
    let domain = body.domain.into_model("domain")?;
    Ok(FittedPipelineState::from_models(path_query, domain))
}

fn check_schema(stored: &[String]) -> Result<(), PersistenceError> {
    let width = stored.len().max(LEXICAL_FEATURE_NAMES.len());
    for index in 0..width {
        let s = stored.get(index).map(String::as_str).unwrap_or("<missing>");
        let e = LEXICAL_FEATURE_NAMES.get(index).copied().unwrap_or("<none>");
        if s != e {
            return Err(PersistenceError::SchemaMismatch {
                index,
                stored: s.to_string(),
                expected: e.to_string(),
            });
        }
    }
    Ok(())
}

pub fn save_state(state: &FittedPipelineState, path: &Path) -> Result<(), PersistenceError> {
    let json = to_json(state)?;
    fs::write(path, json).map_err(|source| PersistenceError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let shown = path.display().to_string();
    PipelineEvent::new(Level::INFO, EventDomain::Persist, "saved", "Saved pipeline state")
        .detail(&shown)
        .count(state.n_features())
        .emit();
    Ok(())
}

pub fn load_state(path: &Path) -> Result<FittedPipelineState, PersistenceError> {
    let io_err = |source| PersistenceError::Io {
        path: path.to_path_buf(),
        source,
    };
    let meta = fs::metadata(path).map_err(io_err)?;
    if meta.len() > MAX_STATE_BYTES {
        return Err(PersistenceError::Malformed(format!(
            "{} exceeds {} bytes",
            path.display(),
            MAX_STATE_BYTES
        )));
    }
    let data = fs::read_to_string(path).map_err(io_err)?;
    let state = from_json(&data)?;
    let shown = path.display().to_string();
    PipelineEvent::new(Level::INFO, EventDomain::Persist, "loaded", "Loaded pipeline state")
        .detail(&shown)
        .count(state.n_features())
        .emit();
    Ok(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::PipelineConfig;

    fn fitted() -> FittedPipelineState {
        let mut config = PipelineConfig::default();
        config.path_query.min_df = 1;
        config.domain.min_df = 1;
        let urls = [
            "http://example.com/login?user=1",
            "https://secure-paypal.com.verify.info/account/update",
            "https://192.168.0.1/secure",
        ];
        FittedPipelineState::fit(&config, &urls).expect("fit")
    }

    fn edit_body(json: &str, f: impl FnOnce(&mut serde_json::Value)) -> String {
        let mut v: serde_json::Value = serde_json::from_str(json).unwrap();
        f(&mut v["body"]);
        serde_json::to_string(&v).unwrap()
    }

    #[test]
    fn round_trip_is_exact() {
        let state = fitted();
        let loaded = from_json(&to_json(&state).unwrap()).unwrap();
        assert_eq!(loaded, state);
    }

    #[test]
    fn reformatting_keeps_checksum_valid() {
        let json = to_json(&fitted()).unwrap();
        let v: serde_json::Value = serde_json::from_str(&json).unwrap();
        let compact = serde_json::to_string(&v).unwrap();
        assert!(from_json(&compact).is_ok());
    }

    #[test]
    fn tampered_weight_fails_checksum() {
        let json = to_json(&fitted()).unwrap();
        let tampered = edit_body(&json, |body| {
            body["domain"]["idf"][0] = serde_json::json!(42.0);
        });
        assert!(matches!(
            from_json(&tampered),
            Err(PersistenceError::ChecksumMismatch { .. })
        ));
    }

    #[test]
    fn wrong_version_is_rejected() {
        let json = to_json(&fitted()).unwrap();
        let mut v: serde_json::Value = serde_json::from_str(&json).unwrap();
        v["version"] = serde_json::json!(2);
        assert!(matches!(
            from_json(&v.to_string()),
            Err(PersistenceError::UnsupportedVersion { found: 2, .. })
        ));
    }

    #[test]
    fn wrong_format_is_rejected() {
        let json = to_json(&fitted()).unwrap();
        let mut v: serde_json::Value = serde_json::from_str(&json).unwrap();
        v["format"] = serde_json::json!("pickle");
        assert!(matches!(
            from_json(&v.to_string()),
            Err(PersistenceError::UnsupportedFormat { .. })
        ));
    }

    /// Re-signs an edited body so only the semantic checks can fail.
    fn resign(json: &str, f: impl FnOnce(&mut serde_json::Value)) -> String {
        let mut v: serde_json::Value = serde_json::from_str(json).unwrap();
        f(&mut v["body"]);
        let digest = body_digest(&v["body"]).unwrap();
        v["sha256"] = serde_json::json!(digest);
        v.to_string()
    }

    #[test]
    fn schema_drift_is_rejected() {
        let json = to_json(&fitted()).unwrap();
        let drifted = resign(&json, |body| {
            body["lexical_schema"].as_array_mut().unwrap().swap(0, 1);
        });
        assert!(matches!(
            from_json(&drifted),
            Err(PersistenceError::SchemaMismatch { index: 0, .. })
        ));
    }

    #[test]
    fn mismatched_idf_length_is_rejected() {
        let json = to_json(&fitted()).unwrap();
        let broken = resign(&json, |body| {
            body["path_query"]["idf"].as_array_mut().unwrap().pop();
        });
        assert!(matches!(
            from_json(&broken),
            Err(PersistenceError::Inconsistent { block: "path_query", .. })
        ));
    }

    #[test]
    fn truncated_file_is_malformed() {
        let json = to_json(&fitted()).unwrap();
        let cut = &json[..json.len() / 2];
        assert!(matches!(from_json(cut), Err(PersistenceError::Malformed(_))));
    }

    #[test]
    fn missing_file_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = load_state(&dir.path().join("absent.json")).unwrap_err();
        assert!(matches!(err, PersistenceError::Io { .. }));
    }

    #[test]
    fn save_and_load_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state.json");
        let state = fitted();
        save_state(&state, &path).unwrap();
        assert_eq!(load_state(&path).unwrap(), state);
    }
}
