use crate::error::{PipelineError, Result};

/// Row-major compressed sparse matrix.
///
/// Row `r` owns `indices[indptr[r]..indptr[r + 1]]` (strictly increasing
/// column numbers) and the matching `values`. Explicit zeros are never
/// stored.
#[derive(Debug, Clone, PartialEq)]
pub struct SparseBlock {
    n_cols: usize,
    indptr: Vec<usize>,
    indices: Vec<usize>,
    values: Vec<f64>,
}

impl SparseBlock {
    pub fn empty(n_cols: usize) -> Self {
        Self {
            n_cols,
            indptr: vec![0],
            indices: Vec::new(),
            values: Vec::new(),
        }
    }

    /// Builds a block from per-row `(column, value)` lists.
    ///
    /// Entries may arrive in any column order; zeros are dropped.
    pub fn from_rows(n_cols: usize, rows: Vec<Vec<(usize, f64)>>) -> Result<Self> {
        let mut block = Self::empty(n_cols);
        for mut row in rows {
            row.sort_unstable_by_key(|(c, _)| *c);
            for (col, value) in row {
                if col >= n_cols {
                    return Err(PipelineError::DimensionMismatch {
                        expected: n_cols,
                        actual: col + 1,
                    });
                }
                if value != 0.0 {
                    block.indices.push(col);
                    block.values.push(value);
                }
            }
            block.indptr.push(block.indices.len());
        }
        Ok(block)
    }

    pub fn from_dense_rows<R: AsRef<[f64]>>(n_cols: usize, rows: &[R]) -> Result<Self> {
        let sparse_rows: Vec<Vec<(usize, f64)>> = rows
            .iter()
            .map(|r| {
                r.as_ref()
                    .iter()
                    .copied()
                    .enumerate()
                    .filter(|(_, v)| *v != 0.0)
                    .collect()
            })
            .collect();
        Self::from_rows(n_cols, sparse_rows)
    }

    pub fn n_rows(&self) -> usize {
        self.indptr.len() - 1
    }

    pub fn n_cols(&self) -> usize {
        self.n_cols
    }

    pub fn nnz(&self) -> usize {
        self.values.len()
    }

    /// Stored `(column, value)` pairs of one row, ascending by column.
    pub fn row(&self, r: usize) -> impl Iterator<Item = (usize, f64)> + '_ {
        let (start, end) = match (self.indptr.get(r), self.indptr.get(r + 1)) {
            (Some(&s), Some(&e)) => (s, e),
            _ => (0, 0),
        };
        self.indices[start..end]
            .iter()
            .copied()
            .zip(self.values[start..end].iter().copied())
    }

    pub fn get(&self, r: usize, c: usize) -> f64 {
        self.row(r)
            .find(|(col, _)| *col == c)
            .map(|(_, v)| v)
            .unwrap_or(0.0)
    }

    pub fn dense_row(&self, r: usize) -> Vec<f64> {
        let mut out = vec![0.0; self.n_cols];
        for (c, v) in self.row(r) {
            out[c] = v;
        }
        out
    }

    /// Horizontal concatenation; every block must have the same row count.
    pub fn hstack(blocks: &[&SparseBlock]) -> Result<Self> {
        let n_rows = blocks.first().map(|b| b.n_rows()).unwrap_or(0);
        if let Some(bad) = blocks.iter().find(|b| b.n_rows() != n_rows) {
            return Err(PipelineError::DimensionMismatch {
                expected: n_rows,
                actual: bad.n_rows(),
            });
        }
        let n_cols = blocks.iter().map(|b| b.n_cols).sum();
        let mut out = Self::empty(n_cols);
        for r in 0..n_rows {
            let mut offset = 0;
            for block in blocks {
                for (c, v) in block.row(r) {
                    out.indices.push(offset + c);
                    out.values.push(v);
                }
                offset += block.n_cols;
            }
            out.indptr.push(out.indices.len());
        }
        Ok(out)
    }
}
