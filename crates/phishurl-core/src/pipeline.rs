use std::path::Path;
use std::sync::Arc;

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, Level};

use crate::error::{PipelineError, Result};
use crate::features::{FeatureExtractor, LexicalFeatures, LEXICAL_FEATURE_NAMES};
use crate::fusion::{ColumnLayout, FeatureMatrix};
use crate::security_log::{EventDomain, PipelineEvent};
use crate::sparse::SparseBlock;
use crate::text_view::{domain_from_parts, path_query_from_parts};
use crate::url_parts::UrlParts;
use crate::vectorizer::{TfidfModel, TfidfVectorizer, VectorizerConfig};

/// Construction configuration of both vectorizers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PipelineConfig {
    pub path_query: VectorizerConfig,
    pub domain: VectorizerConfig,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            path_query: VectorizerConfig::path_query(),
            domain: VectorizerConfig::domain(),
        }
    }
}

impl PipelineConfig {
    pub fn validate(&self) -> Result<()> {
        self.path_query.validate()?;
        self.domain.validate()
    }
}

/// Everything one URL contributes to a matrix row.
struct RowParts {
    lexical: LexicalFeatures,
    path_query: Vec<(usize, f64)>,
    domain: Vec<(usize, f64)>,
}

/// Immutable result of a fit.
///
/// Safe to share across threads; transform never mutates it.
#[derive(Debug, Clone, PartialEq)]
pub struct FittedPipelineState {
    path_query: TfidfModel,
    domain: TfidfModel,
}

impl FittedPipelineState {
    pub fn fit<S: AsRef<str>>(config: &PipelineConfig, urls: &[S]) -> Result<Self> {
        if urls.is_empty() {
            return Err(PipelineError::EmptyCorpus);
        }
        config.validate()?;
        let parts: Vec<UrlParts> = urls.iter().map(|u| UrlParts::parse(u.as_ref())).collect();
        let path_docs: Vec<String> = parts.iter().map(path_query_from_parts).collect();
        let domain_docs: Vec<String> = parts.iter().map(domain_from_parts).collect();
        let degraded = parts.iter().filter(|p| p.degraded).count();

        let path_query = fit_block(&config.path_query, &path_docs)?;
        let domain = fit_block(&config.domain, &domain_docs)?;
        for (name, model) in [("path_query", &path_query), ("domain", &domain)] {
            if model.vocabulary().is_empty() {
                PipelineEvent::new(
                    Level::WARN,
                    EventDomain::Fit,
                    "empty_vocabulary",
                    "No terms survived document-frequency pruning",
                )
                .detail(name)
                .emit();
            }
        }
        let state = Self::from_models(path_query, domain);
        PipelineEvent::new(Level::INFO, EventDomain::Fit, "fitted", "Fitted URL feature pipeline")
            .count(urls.len())
            .emit();
        debug!(
            rows = urls.len(),
            degraded = degraded,
            path_query_terms = state.layout().path_query_terms,
            domain_terms = state.layout().domain_terms,
            columns = state.n_features(),
            "Fit summary"
        );
        Ok(state)
    }

    pub fn from_models(path_query: TfidfModel, domain: TfidfModel) -> Self {
        Self { path_query, domain }
    }

    pub fn config(&self) -> PipelineConfig {
        PipelineConfig {
            path_query: self.path_query.config().clone(),
            domain: self.domain.config().clone(),
        }
    }

    pub fn path_query(&self) -> &TfidfModel {
        &self.path_query
    }

    pub fn domain(&self) -> &TfidfModel {
        &self.domain
    }

    pub fn layout(&self) -> ColumnLayout {
        ColumnLayout {
            path_query_terms: self.path_query.vocabulary().len(),
            domain_terms: self.domain.vocabulary().len(),
        }
    }

    /// Total width of every matrix this state produces.
    pub fn n_features(&self) -> usize {
        self.layout().total()
    }

    /// One name per column: lexical names, then `path_query:<term>`, then
    /// `domain:<term>`.
    pub fn column_names(&self) -> Vec<String> {
        let mut names: Vec<String> = LEXICAL_FEATURE_NAMES.iter().map(|n| n.to_string()).collect();
        names.extend(
            self.path_query
                .vocabulary()
                .terms()
                .iter()
                .map(|t| format!("path_query:{t}")),
        );
        names.extend(
            self.domain
                .vocabulary()
                .terms()
                .iter()
                .map(|t| format!("domain:{t}")),
        );
        names
    }

    pub fn transform<S: AsRef<str>>(&self, urls: &[S]) -> Result<FeatureMatrix> {
        let rows = urls.iter().map(|u| self.row(u.as_ref())).collect();
        self.assemble(rows)
    }

    /// Same output as [`Self::transform`], with per-URL work spread over
    /// the rayon pool. Row order follows the input.
    pub fn transform_parallel<S: AsRef<str> + Sync>(&self, urls: &[S]) -> Result<FeatureMatrix> {
        let rows = urls.par_iter().map(|u| self.row(u.as_ref())).collect();
        self.assemble(rows)
    }

    fn row(&self, url: &str) -> RowParts {
        let parts = UrlParts::parse(url);
        RowParts {
            lexical: FeatureExtractor::extract_with_parts(url, &parts),
            path_query: self.path_query.weigh(&path_query_from_parts(&parts)),
            domain: self.domain.weigh(&domain_from_parts(&parts)),
        }
    }

    fn assemble(&self, rows: Vec<RowParts>) -> Result<FeatureMatrix> {
        let layout = self.layout();
        let mut lexical = Vec::with_capacity(rows.len());
        let mut path_rows = Vec::with_capacity(rows.len());
        let mut domain_rows = Vec::with_capacity(rows.len());
        for row in rows {
            lexical.push(row.lexical);
            path_rows.push(row.path_query);
            domain_rows.push(row.domain);
        }
        let path_block = SparseBlock::from_rows(layout.path_query_terms, path_rows)?;
        let domain_block = SparseBlock::from_rows(layout.domain_terms, domain_rows)?;
        FeatureMatrix::fuse(&lexical, &path_block, &domain_block)
    }
}

fn fit_block(config: &VectorizerConfig, documents: &[String]) -> Result<TfidfModel> {
    let mut vectorizer = TfidfVectorizer::new(config.clone());
    vectorizer.fit(documents)?;
    vectorizer.into_model()
}

/// Fit/transform lifecycle: starts unfitted, becomes fitted after
/// [`UrlFeaturePipeline::fit`] or [`UrlFeaturePipeline::load`].
#[derive(Debug, Clone, Default)]
pub struct UrlFeaturePipeline {
    config: PipelineConfig,
    state: Option<Arc<FittedPipelineState>>,
}

impl UrlFeaturePipeline {
    pub fn new(config: PipelineConfig) -> Self {
        Self {
            config,
            state: None,
        }
    }

    pub fn from_state(state: FittedPipelineState) -> Self {
        Self {
            config: state.config(),
            state: Some(Arc::new(state)),
        }
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn is_fitted(&self) -> bool {
        self.state.is_some()
    }

    /// Shared handle to the fitted state, for handing to worker threads.
    pub fn state(&self) -> Result<Arc<FittedPipelineState>> {
        self.state.clone().ok_or(PipelineError::NotFitted)
    }

    /// Replaces any previous state with one fitted from scratch on `urls`.
    /// On error the previous state is kept.
    pub fn fit<S: AsRef<str>>(&mut self, urls: &[S]) -> Result<&FittedPipelineState> {
        let state = Arc::new(FittedPipelineState::fit(&self.config, urls)?);
        let state = self.state.insert(state);
        Ok(&**state)
    }

    pub fn transform<S: AsRef<str>>(&self, urls: &[S]) -> Result<FeatureMatrix> {
        self.state
            .as_ref()
            .ok_or(PipelineError::NotFitted)?
            .transform(urls)
    }

    pub fn fit_transform<S: AsRef<str>>(&mut self, urls: &[S]) -> Result<FeatureMatrix> {
        self.fit(urls)?.transform(urls)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let state = self.state.as_ref().ok_or(PipelineError::NotFitted)?;
        crate::persist::save_state(state, path)?;
        Ok(())
    }

    pub fn load(path: &Path) -> Result<Self> {
        Ok(Self::from_state(crate::persist::load_state(path)?))
    }
}
