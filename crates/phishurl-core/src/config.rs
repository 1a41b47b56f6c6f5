use std::collections::HashMap;
use std::fs;
use std::path::Path;

use serde::Deserialize;
use tracing::{info, warn, Level};

use crate::pipeline::PipelineConfig;
use crate::scoring::PHISHING_THRESHOLD;
use crate::security_log::{EventDomain, PipelineEvent};
use crate::vectorizer::VectorizerConfig;

const MAX_CONFIG_BYTES: u64 = 1024 * 1024;
const MAX_NGRAM: usize = 16;
const MAX_VOCABULARY: usize = 1_000_000;

#[derive(Debug, Default, Deserialize)]
pub struct Config {
    pub profiles: Option<HashMap<String, Profile>>,
    pub pipeline: Option<PipelineSection>,
    pub scoring: Option<ScoringConfig>,
    pub logging: Option<LoggingConfig>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct Profile {
    pub pipeline: Option<PipelineSection>,
    pub scoring: Option<ScoringConfig>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct PipelineSection {
    pub path_query: Option<VectorizerSection>,
    pub domain: Option<VectorizerSection>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct VectorizerSection {
    pub ngram_min: Option<usize>,
    pub ngram_max: Option<usize>,
    pub min_df: Option<usize>,
    pub max_features: Option<usize>,
    pub lowercase: Option<bool>,
    pub sublinear_tf: Option<bool>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ScoringConfig {
    pub threshold: Option<f64>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct LoggingConfig {
    pub level: Option<String>,
}

impl Config {
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        if let Ok(meta) = fs::metadata(path) {
            if meta.len() > MAX_CONFIG_BYTES {
                return Err(anyhow::anyhow!(
                    "config {} exceeds {} bytes",
                    path.display(),
                    MAX_CONFIG_BYTES
                ));
            }
        }
        let data = fs::read_to_string(path)?;
        let cfg = match path.extension().and_then(|s| s.to_str()) {
            Some("toml") => toml::from_str::<Config>(&data)?,
            Some("yaml") | Some("yml") => serde_yaml::from_str::<Config>(&data)?,
            _ => toml::from_str::<Config>(&data)
                .or_else(|_| serde_yaml::from_str::<Config>(&data))?,
        };
        Ok(cfg)
    }

    /// Applies the base sections, then the selected profile on top.
    pub fn apply(&self, cfg: &mut PipelineConfig, profile: Option<&Profile>) {
        if let Some(pipeline) = &self.pipeline {
            apply_pipeline(pipeline, cfg);
        }
        if let Some(profile_cfg) = profile {
            if let Some(pipeline) = &profile_cfg.pipeline {
                apply_pipeline(pipeline, cfg);
            }
        }
    }

    /// Decision threshold after overrides; invalid values fall back.
    pub fn threshold(&self, profile: Option<&Profile>) -> f64 {
        let mut threshold = PHISHING_THRESHOLD;
        let sections = [
            self.scoring.as_ref(),
            profile.and_then(|p| p.scoring.as_ref()),
        ];
        for scoring in sections.into_iter().flatten() {
            if let Some(v) = scoring.threshold {
                if v > 0.0 && v <= 1.0 {
                    info!(value = v, "Config override threshold");
                    threshold = v;
                } else {
                    reject("scoring.threshold", &v.to_string(), "0 < threshold <= 1");
                }
            }
        }
        threshold
    }

    pub fn log_level(&self) -> Option<&str> {
        self.logging.as_ref().and_then(|l| l.level.as_deref())
    }

    /// Looks up a named profile. A missing name warns and yields `None`.
    pub fn select_profile(&self, name: Option<&str>) -> Option<&Profile> {
        let name = name?;
        let found = self.profiles.as_ref().and_then(|p| p.get(name));
        if found.is_none() {
            warn!(profile = name, "Config profile not found");
        }
        found
    }
}

fn apply_pipeline(section: &PipelineSection, cfg: &mut PipelineConfig) {
    if let Some(v) = &section.path_query {
        apply_vectorizer("path_query", v, &mut cfg.path_query);
    }
    if let Some(v) = &section.domain {
        apply_vectorizer("domain", v, &mut cfg.domain);
    }
}

fn apply_vectorizer(block: &str, section: &VectorizerSection, cfg: &mut VectorizerConfig) {
    if section.ngram_min.is_some() || section.ngram_max.is_some() {
        let min_n = section.ngram_min.unwrap_or(cfg.ngram_range.0);
        let max_n = section.ngram_max.unwrap_or(cfg.ngram_range.1);
        if min_n == 0 || min_n > max_n || max_n > MAX_NGRAM {
            reject(
                &format!("{block}.ngram_range"),
                &format!("({min_n}, {max_n})"),
                "1 <= ngram_min <= ngram_max <= 16",
            );
        } else {
            info!(block = block, min_n = min_n, max_n = max_n, "Config override ngram_range");
            cfg.ngram_range = (min_n, max_n);
        }
    }
    if let Some(v) = section.min_df {
        if v == 0 {
            reject(&format!("{block}.min_df"), "0", ">= 1");
        } else {
            info!(block = block, value = v, "Config override min_df");
            cfg.min_df = v;
        }
    }
    if let Some(v) = section.max_features {
        if v == 0 || v > MAX_VOCABULARY {
            reject(&format!("{block}.max_features"), &v.to_string(), "1..=1000000");
        } else {
            info!(block = block, value = v, "Config override max_features");
            cfg.max_features = Some(v);
        }
    }
    if let Some(v) = section.lowercase {
        cfg.lowercase = v;
    }
    if let Some(v) = section.sublinear_tf {
        cfg.sublinear_tf = v;
    }
}

fn reject(key: &str, value: &str, limit: &str) {
    PipelineEvent::new(
        Level::WARN,
        EventDomain::Config,
        "invalid_config_value",
        "Ignoring invalid config value",
    )
    .detail(key)
    .emit();
    warn!(key = key, value = value, limit = limit, "Invalid config value ignored");
}
