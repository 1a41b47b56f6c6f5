use crate::error::Result;
use crate::features::{LexicalFeatures, LEXICAL_FEATURE_COUNT};
use crate::sparse::SparseBlock;

/// Column ranges of the three blocks inside a fused matrix.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColumnLayout {
    pub path_query_terms: usize,
    pub domain_terms: usize,
}

impl ColumnLayout {
    pub fn lexical(&self) -> std::ops::Range<usize> {
        0..LEXICAL_FEATURE_COUNT
    }

    pub fn path_query(&self) -> std::ops::Range<usize> {
        let start = LEXICAL_FEATURE_COUNT;
        start..start + self.path_query_terms
    }

    pub fn domain(&self) -> std::ops::Range<usize> {
        let start = LEXICAL_FEATURE_COUNT + self.path_query_terms;
        start..start + self.domain_terms
    }

    pub fn total(&self) -> usize {
        LEXICAL_FEATURE_COUNT + self.path_query_terms + self.domain_terms
    }
}

/// `[lexical | path/query terms | domain n-grams]`, one row per URL in
/// input order.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureMatrix {
    layout: ColumnLayout,
    data: SparseBlock,
}

impl FeatureMatrix {
    /// Concatenates the blocks without touching any value.
    pub fn fuse(
        lexical: &[LexicalFeatures],
        path_query: &SparseBlock,
        domain: &SparseBlock,
    ) -> Result<Self> {
        let dense: Vec<[f64; LEXICAL_FEATURE_COUNT]> = lexical.iter().map(|f| f.to_row()).collect();
        let lexical_block = SparseBlock::from_dense_rows(LEXICAL_FEATURE_COUNT, &dense)?;
        let data = SparseBlock::hstack(&[&lexical_block, path_query, domain])?;
        Ok(Self {
            layout: ColumnLayout {
                path_query_terms: path_query.n_cols(),
                domain_terms: domain.n_cols(),
            },
            data,
        })
    }

    pub fn layout(&self) -> ColumnLayout {
        self.layout
    }

    pub fn n_rows(&self) -> usize {
        self.data.n_rows()
    }

    pub fn n_cols(&self) -> usize {
        self.data.n_cols()
    }

    pub fn get(&self, row: usize, col: usize) -> f64 {
        self.data.get(row, col)
    }

    /// Non-zero `(column, value)` entries of a row, ascending by column.
    pub fn row(&self, r: usize) -> impl Iterator<Item = (usize, f64)> + '_ {
        self.data.row(r)
    }

    pub fn dense_row(&self, r: usize) -> Vec<f64> {
        self.data.dense_row(r)
    }

    pub fn as_sparse(&self) -> &SparseBlock {
        &self.data
    }
}
