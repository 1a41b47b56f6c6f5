use std::path::Path;
use std::sync::Arc;

use anyhow::{anyhow, Result as AnyResult};
use serde::{Deserialize, Serialize};
use tracing::Level;

use crate::error::{PipelineError, Result};
use crate::fusion::FeatureMatrix;
use crate::persist::load_state;
use crate::pipeline::FittedPipelineState;
use crate::security_log::{EventDomain, PipelineEvent};

/// A row is labelled phishing when its probability is at least this value,
/// so a score of exactly 0.5 is phishing.
pub const PHISHING_THRESHOLD: f64 = 0.5;

pub const PHISHING_LABEL: &str = "phishing";
pub const LEGITIMATE_LABEL: &str = "legitimate";

/// Positive-class probability per matrix row, from an external classifier.
pub trait Scorer: Send + Sync {
    fn score(&self, matrix: &FeatureMatrix) -> Result<Vec<f64>>;
}

/// Logistic model over the fused columns.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LinearModel {
    pub bias: f64,
    pub weights: Vec<f64>,
}

impl LinearModel {
    pub fn load_from_file(path: &Path) -> AnyResult<Self> {
        let data = std::fs::read_to_string(path)
            .map_err(|e| anyhow!("failed to read {}: {}", path.display(), e))?;
        let model: LinearModel = serde_json::from_str(&data)
            .map_err(|e| anyhow!("invalid linear model {}: {}", path.display(), e))?;
        if model.weights.iter().any(|w| !w.is_finite()) || !model.bias.is_finite() {
            return Err(anyhow!("linear model {} has non-finite weights", path.display()));
        }
        Ok(model)
    }

    pub fn predict_row(&self, matrix: &FeatureMatrix, r: usize) -> f64 {
        let mut sum = self.bias;
        for (c, x) in matrix.row(r) {
            sum += self.weights.get(c).copied().unwrap_or(0.0) * x;
        }
        sigmoid(sum)
    }
}

impl Scorer for LinearModel {
    fn score(&self, matrix: &FeatureMatrix) -> Result<Vec<f64>> {
        if matrix.n_cols() != self.weights.len() {
            return Err(PipelineError::DimensionMismatch {
                expected: self.weights.len(),
                actual: matrix.n_cols(),
            });
        }
        Ok((0..matrix.n_rows())
            .map(|r| self.predict_row(matrix, r))
            .collect())
    }
}

fn sigmoid(x: f64) -> f64 {
    1.0 / (1.0 + (-x).exp())
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Prediction {
    /// 1 for phishing, 0 for legitimate.
    pub prediction: u8,
    pub probability: f64,
    pub label: String,
}

impl Prediction {
    pub fn from_probability(probability: f64, threshold: f64) -> Self {
        let phishing = probability >= threshold;
        Self {
            prediction: u8::from(phishing),
            probability,
            label: if phishing { PHISHING_LABEL } else { LEGITIMATE_LABEL }.to_string(),
        }
    }
}

/// Loaded pipeline state plus classifier, created once before serving and
/// shared by reference afterwards.
pub struct PhishingDetector<S: Scorer> {
    state: Arc<FittedPipelineState>,
    scorer: S,
    threshold: f64,
}

impl<S: Scorer> PhishingDetector<S> {
    pub fn new(state: Arc<FittedPipelineState>, scorer: S, threshold: f64) -> Result<Self> {
        if !(threshold > 0.0 && threshold <= 1.0) {
            return Err(PipelineError::InvalidConfig {
                param: "threshold".into(),
                value: threshold.to_string(),
                constraint: "0 < threshold <= 1".into(),
            });
        }
        Ok(Self {
            state,
            scorer,
            threshold,
        })
    }

    /// Loads the persisted state or fails; there is no partially loaded
    /// detector.
    pub fn load(state_path: &Path, scorer: S, threshold: f64) -> Result<Self> {
        let state = load_state(state_path)?;
        Self::new(Arc::new(state), scorer, threshold)
    }

    pub fn state(&self) -> &FittedPipelineState {
        &self.state
    }

    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    pub fn predict<U: AsRef<str> + Sync>(&self, urls: &[U]) -> Result<Vec<Prediction>> {
        let matrix = self.state.transform_parallel(urls)?;
        let probabilities = self.scorer.score(&matrix)?;
        if probabilities.len() != urls.len() {
            return Err(PipelineError::DimensionMismatch {
                expected: urls.len(),
                actual: probabilities.len(),
            });
        }
        let predictions: Vec<Prediction> = probabilities
            .into_iter()
            .map(|p| Prediction::from_probability(p, self.threshold))
            .collect();
        let flagged = predictions.iter().filter(|p| p.prediction == 1).count();
        PipelineEvent::new(Level::DEBUG, EventDomain::Score, "scored", "Scored URL batch")
            .count(flagged)
            .emit();
        Ok(predictions)
    }
}
