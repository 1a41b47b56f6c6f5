//! TF-IDF vectorization against a vocabulary frozen at fit time.
//!
//! ```text
//! idf(t)    = ln((1 + N) / (1 + df(t))) + 1
//! tf'(t, d) = 1 + ln(tf(t, d))      (sublinear, tf > 0)
//! w(t, d)   = tf'(t, d) * idf(t), then each row is L2-normalised
//! ```

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::analyzer::Analyzer;
use crate::error::{PipelineError, Result};
use crate::sparse::SparseBlock;

/// Construction parameters of one vectorizer instance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VectorizerConfig {
    pub analyzer: Analyzer,
    /// Inclusive `(min_n, max_n)` n-gram sizes.
    pub ngram_range: (usize, usize),
    /// Terms found in fewer documents than this are dropped.
    pub min_df: usize,
    /// Upper bound on vocabulary size; `None` keeps every surviving term.
    pub max_features: Option<usize>,
    pub lowercase: bool,
    pub sublinear_tf: bool,
}

impl VectorizerConfig {
    /// Word 1-2 grams over the decoded path and query.
    pub fn path_query() -> Self {
        Self {
            analyzer: Analyzer::Word,
            ngram_range: (1, 2),
            min_df: 5,
            max_features: Some(25_000),
            lowercase: true,
            sublinear_tf: true,
        }
    }

    /// Character 3-5 grams over the registered domain.
    pub fn domain() -> Self {
        Self {
            analyzer: Analyzer::Char,
            ngram_range: (3, 5),
            min_df: 5,
            max_features: Some(10_000),
            lowercase: true,
            sublinear_tf: true,
        }
    }

    pub fn validate(&self) -> Result<()> {
        let (min_n, max_n) = self.ngram_range;
        if min_n == 0 || min_n > max_n {
            return Err(PipelineError::InvalidConfig {
                param: "ngram_range".into(),
                value: format!("({min_n}, {max_n})"),
                constraint: "1 <= min_n <= max_n".into(),
            });
        }
        if self.min_df == 0 {
            return Err(PipelineError::InvalidConfig {
                param: "min_df".into(),
                value: "0".into(),
                constraint: ">= 1".into(),
            });
        }
        if self.max_features == Some(0) {
            return Err(PipelineError::InvalidConfig {
                param: "max_features".into(),
                value: "0".into(),
                constraint: ">= 1 or unset".into(),
            });
        }
        Ok(())
    }

    fn terms(&self, doc: &str) -> Vec<String> {
        self.analyzer.terms(doc, self.ngram_range, self.lowercase)
    }
}

/// Terms and their idf weights; a term's column is its position.
#[derive(Debug, Clone, PartialEq)]
pub struct TermVocabulary {
    terms: Vec<String>,
    idf: Vec<f64>,
    document_count: usize,
    index: HashMap<String, usize>,
}

impl TermVocabulary {
    /// Rebuilds a vocabulary from stored parts, rejecting anything a fit
    /// could not have produced.
    pub fn from_parts(
        terms: Vec<String>,
        idf: Vec<f64>,
        document_count: usize,
    ) -> std::result::Result<Self, String> {
        if terms.len() != idf.len() {
            return Err(format!(
                "{} terms but {} idf weights",
                terms.len(),
                idf.len()
            ));
        }
        if let Some((i, w)) = idf.iter().enumerate().find(|(_, w)| !w.is_finite() || **w < 1.0) {
            return Err(format!("idf weight {w} at column {i} is not a finite value >= 1"));
        }
        let mut index = HashMap::with_capacity(terms.len());
        for (col, term) in terms.iter().enumerate() {
            if index.insert(term.clone(), col).is_some() {
                return Err(format!("duplicate term {term:?}"));
            }
        }
        Ok(Self {
            terms,
            idf,
            document_count,
            index,
        })
    }

    pub fn len(&self) -> usize {
        self.terms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.terms.is_empty()
    }

    pub fn terms(&self) -> &[String] {
        &self.terms
    }

    pub fn idf(&self) -> &[f64] {
        &self.idf
    }

    /// Size of the corpus the weights were computed from.
    pub fn document_count(&self) -> usize {
        self.document_count
    }

    pub fn column(&self, term: &str) -> Option<usize> {
        self.index.get(term).copied()
    }
}

/// A fitted vectorizer: configuration plus frozen vocabulary.
#[derive(Debug, Clone, PartialEq)]
pub struct TfidfModel {
    config: VectorizerConfig,
    vocabulary: TermVocabulary,
}

impl TfidfModel {
    pub fn new(config: VectorizerConfig, vocabulary: TermVocabulary) -> Self {
        Self { config, vocabulary }
    }

    pub fn config(&self) -> &VectorizerConfig {
        &self.config
    }

    pub fn vocabulary(&self) -> &TermVocabulary {
        &self.vocabulary
    }

    /// Learns a vocabulary from `documents`.
    pub fn fit<S: AsRef<str>>(config: &VectorizerConfig, documents: &[S]) -> Result<Self> {
        if documents.is_empty() {
            return Err(PipelineError::EmptyCorpus);
        }
        config.validate()?;

        // term -> (total occurrences, document frequency)
        let mut stats: HashMap<String, (usize, usize)> = HashMap::new();
        for doc in documents {
            let mut local: HashMap<String, usize> = HashMap::new();
            for term in config.terms(doc.as_ref()) {
                *local.entry(term).or_insert(0) += 1;
            }
            for (term, count) in local {
                let entry = stats.entry(term).or_insert((0, 0));
                entry.0 += count;
                entry.1 += 1;
            }
        }

        let mut kept: Vec<(String, usize, usize)> = stats
            .into_iter()
            .filter(|(_, (_, df))| *df >= config.min_df)
            .map(|(term, (count, df))| (term, count, df))
            .collect();
        if let Some(max) = config.max_features {
            if kept.len() > max {
                kept.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
                kept.truncate(max);
            }
        }
        kept.sort_by(|a, b| a.0.cmp(&b.0));

        let n = documents.len() as f64;
        let mut terms = Vec::with_capacity(kept.len());
        let mut idf = Vec::with_capacity(kept.len());
        for (term, _, df) in kept {
            terms.push(term);
            idf.push(((1.0 + n) / (1.0 + df as f64)).ln() + 1.0);
        }
        let vocabulary = TermVocabulary::from_parts(terms, idf, documents.len())
            .map_err(|reason| PipelineError::InvalidConfig {
                param: "vocabulary".into(),
                value: reason,
                constraint: "unique terms with idf >= 1".into(),
            })?;
        Ok(Self::new(config.clone(), vocabulary))
    }

    /// Weighted, L2-normalised entries of one document, ascending by column.
    ///
    /// Terms outside the vocabulary are ignored; an empty document or one
    /// with no known terms gives an empty row.
    pub fn weigh(&self, doc: &str) -> Vec<(usize, f64)> {
        let mut counts: HashMap<usize, usize> = HashMap::new();
        for term in self.config.terms(doc) {
            if let Some(col) = self.vocabulary.column(&term) {
                *counts.entry(col).or_insert(0) += 1;
            }
        }
        let mut row: Vec<(usize, f64)> = counts
            .into_iter()
            .map(|(col, tf)| {
                let tf = tf as f64;
                let tf = if self.config.sublinear_tf { 1.0 + tf.ln() } else { tf };
                (col, tf * self.vocabulary.idf[col])
            })
            .collect();
        row.sort_unstable_by_key(|(col, _)| *col);
        let norm = row.iter().map(|(_, v)| v * v).sum::<f64>().sqrt();
        if norm > 0.0 {
            for (_, v) in row.iter_mut() {
                *v /= norm;
            }
        }
        row
    }

    pub fn transform<S: AsRef<str>>(&self, documents: &[S]) -> Result<SparseBlock> {
        let rows = documents.iter().map(|d| self.weigh(d.as_ref())).collect();
        SparseBlock::from_rows(self.vocabulary.len(), rows)
    }
}

/// Vectorizer with an explicit unfitted state.
#[derive(Debug, Clone)]
pub struct TfidfVectorizer {
    config: VectorizerConfig,
    model: Option<TfidfModel>,
}

impl TfidfVectorizer {
    pub fn new(config: VectorizerConfig) -> Self {
        Self {
            config,
            model: None,
        }
    }

    pub fn config(&self) -> &VectorizerConfig {
        &self.config
    }

    pub fn is_fitted(&self) -> bool {
        self.model.is_some()
    }

    pub fn model(&self) -> Option<&TfidfModel> {
        self.model.as_ref()
    }

    /// Fits from scratch, discarding any previous vocabulary.
    pub fn fit<S: AsRef<str>>(&mut self, documents: &[S]) -> Result<()> {
        self.model = Some(TfidfModel::fit(&self.config, documents)?);
        Ok(())
    }

    /// The fitted model, or `NotFitted`.
    pub fn into_model(self) -> Result<TfidfModel> {
        self.model.ok_or(PipelineError::NotFitted)
    }

    pub fn transform<S: AsRef<str>>(&self, documents: &[S]) -> Result<SparseBlock> {
        self.model
            .as_ref()
            .ok_or(PipelineError::NotFitted)?
            .transform(documents)
    }

    pub fn fit_transform<S: AsRef<str>>(&mut self, documents: &[S]) -> Result<SparseBlock> {
        self.fit(documents)?;
        self.transform(documents)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn word_config(min_df: usize, max_features: Option<usize>) -> VectorizerConfig {
        VectorizerConfig {
            analyzer: Analyzer::Word,
            ngram_range: (1, 1),
            min_df,
            max_features,
            lowercase: true,
            sublinear_tf: true,
        }
    }

    fn row_norm(block: &SparseBlock, r: usize) -> f64 {
        block.row(r).map(|(_, v)| v * v).sum::<f64>().sqrt()
    }

    #[test]
    fn transform_before_fit_is_state_error() {
        let v = TfidfVectorizer::new(VectorizerConfig::path_query());
        assert!(matches!(v.transform(&["x"]), Err(PipelineError::NotFitted)));
    }

    #[test]
    fn empty_corpus_is_rejected() {
        let mut v = TfidfVectorizer::new(VectorizerConfig::domain());
        let docs: [&str; 0] = [];
        assert!(matches!(v.fit(&docs), Err(PipelineError::EmptyCorpus)));
    }

    #[test]
    fn invalid_ngram_range_is_rejected() {
        let mut cfg = word_config(1, None);
        cfg.ngram_range = (3, 2);
        assert!(matches!(
            TfidfModel::fit(&cfg, &["abc"]),
            Err(PipelineError::InvalidConfig { .. })
        ));
    }

    #[test]
    fn vocabulary_is_sorted_and_idf_smoothed() {
        let docs = ["login verify", "login account", "login"];
        let model = TfidfModel::fit(&word_config(1, None), &docs).unwrap();
        let vocab = model.vocabulary();
        assert_eq!(vocab.terms(), ["account", "login", "verify"]);
        assert_eq!(vocab.document_count(), 3);
        // login appears in every document: ln(4/4) + 1
        assert!((vocab.idf()[1] - 1.0).abs() < 1e-12);
        // account appears once: ln(4/2) + 1
        assert!((vocab.idf()[0] - (2.0f64.ln() + 1.0)).abs() < 1e-12);
    }

    #[test]
    fn min_df_prunes_rare_terms() {
        let docs = ["login verify", "login account", "login"];
        let model = TfidfModel::fit(&word_config(2, None), &docs).unwrap();
        assert_eq!(model.vocabulary().terms(), ["login"]);
    }

    #[test]
    fn max_features_keeps_most_frequent() {
        let docs = ["aa aa aa bb", "bb cc", "cc dd"];
        let model = TfidfModel::fit(&word_config(1, Some(2)), &docs).unwrap();
        // aa: 3 occurrences, bb: 2, cc: 2, dd: 1; bb wins the tie on term order.
        assert_eq!(model.vocabulary().terms(), ["aa", "bb"]);
    }

    #[test]
    fn rows_are_unit_length() {
        let docs = ["secure login page", "login login update", "account page"];
        let block = TfidfModel::fit(&word_config(1, None), &docs)
            .unwrap()
            .transform(&docs)
            .unwrap();
        for r in 0..block.n_rows() {
            assert!((row_norm(&block, r) - 1.0).abs() < 1e-12);
        }
    }

    #[test]
    fn sublinear_tf_dampens_repeats() {
        let docs = ["aa bb", "aa aa aa bb"];
        let model = TfidfModel::fit(&word_config(1, None), &docs).unwrap();
        let row = model.weigh("aa aa aa bb");
        // aa and bb share idf (both in every doc); weights follow 1 + ln(3) vs 1.
        let ratio = row[0].1 / row[1].1;
        assert!((ratio - (1.0 + 3.0f64.ln())).abs() < 1e-12);
    }

    #[test]
    fn unseen_and_empty_documents_give_zero_rows() {
        let docs = ["login verify", "login account"];
        let model = TfidfModel::fit(&word_config(1, None), &docs).unwrap();
        let block = model.transform(&["", "totally unseen words"]).unwrap();
        assert_eq!(block.n_rows(), 2);
        assert_eq!(block.n_cols(), model.vocabulary().len());
        assert_eq!(block.nnz(), 0);
        assert_eq!(model.vocabulary().len(), 3);
    }

    #[test]
    fn char_domain_instance_matches_shared_ngrams() {
        let docs = ["paypal.com", "paypa1.com", "example.com"];
        let mut cfg = VectorizerConfig::domain();
        cfg.min_df = 1;
        let model = TfidfModel::fit(&cfg, &docs).unwrap();
        assert!(model.vocabulary().column(".com").is_some());
        assert!(model.vocabulary().column("payp").is_some());
        let row = model.weigh("paypal-secure.com");
        assert!(!row.is_empty());
    }

    #[test]
    fn unfitted_vectorizer_has_no_model() {
        let v = TfidfVectorizer::new(VectorizerConfig::domain());
        assert!(!v.is_fitted());
        assert!(matches!(v.into_model(), Err(PipelineError::NotFitted)));
    }

    #[test]
    fn refit_replaces_vocabulary() {
        let mut v = TfidfVectorizer::new(word_config(1, None));
        v.fit(&["alpha beta"]).unwrap();
        v.fit(&["gamma"]).unwrap();
        let model = v.model().unwrap();
        assert_eq!(model.vocabulary().terms(), ["gamma"]);
        assert!(model.vocabulary().column("alpha").is_none());
    }

    #[test]
    fn from_parts_rejects_bad_tables() {
        assert!(TermVocabulary::from_parts(vec!["a".into()], vec![], 1).is_err());
        assert!(TermVocabulary::from_parts(vec!["a".into(), "a".into()], vec![1.0, 1.0], 1).is_err());
        assert!(TermVocabulary::from_parts(vec!["a".into()], vec![f64::NAN], 1).is_err());
        assert!(TermVocabulary::from_parts(vec!["a".into()], vec![0.5], 1).is_err());
    }
}
