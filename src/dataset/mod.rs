//! The tabular data container (§3.1, §4.1): a vector/matrix/text/weights/
//! names composite with linked auxiliary pages.
//!
//! A [`Dataset`] is a product of five optional parts plus a tail of named
//! "pages" (§3.1). The original library threaded pages through a `more`
//! pointer that could in principle cycle; we follow the Design Notes'
//! "prefer arenas + indices" guidance and hold pages in an owned `Vec`
//! instead, which makes an actual reference cycle structurally
//! unrepresentable. [`Dataset::add_page`] still enforces a maximum chain
//! depth and reports [`DatasetError::Cycle`] if it is exceeded, preserving
//! the original's `error = 'c'` contract for callers that build pages from
//! external data.

pub mod names;
pub mod matrix;

use crate::error::ErrorCode;
use matrix::{Grid, TextGrid};
use names::Names;
use thiserror::Error;

/// Errors raised by dataset operations.
#[derive(Debug, Error)]
pub enum DatasetError {
    #[error("dimension mismatch: {0}")]
    Dimension(String),
    #[error("missing part: {0}")]
    MissingPart(&'static str),
    #[error("index out of bounds: row={row:?} col={col:?}")]
    OutOfBounds { row: Option<usize>, col: Option<usize> },
    #[error("page chain exceeds maximum depth ({0}); likely cyclic")]
    Cycle(usize),
    #[error("invalid input: {0}")]
    Input(String),
}

impl DatasetError {
    pub fn code(&self) -> ErrorCode {
        match self {
            DatasetError::Dimension(_) => ErrorCode::Dimension,
            DatasetError::MissingPart(_) => ErrorCode::MissingPart,
            DatasetError::OutOfBounds { .. } => ErrorCode::Input,
            DatasetError::Cycle(_) => ErrorCode::Cycle,
            DatasetError::Input(_) => ErrorCode::Input,
        }
    }
}

/// Maximum page-chain depth before [`DatasetError::Cycle`] is raised.
pub const MAX_PAGE_DEPTH: usize = 64;

/// Axis along which `stack`/`split`/`rm_*` operate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Axis {
    /// Row-wise (observations).
    Row,
    /// Column-wise (variables).
    Column,
}

/// How [`Dataset::get_page`] matches a page title.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageMatch {
    /// Byte-exact match.
    Exact,
    /// Case-insensitive match.
    CaseInsensitive,
    /// Regex match against the title.
    Regex,
}

/// A row-indexed, optionally multi-part tabular dataset.
#[derive(Debug, Clone, Default)]
pub struct Dataset {
    /// Ordered sequence of reals, one per row.
    pub vector: Option<Vec<f64>>,
    /// Row-major rectangular grid of reals.
    pub matrix: Option<Grid>,
    /// Row-major rectangular grid of strings.
    pub text: Option<TextGrid>,
    /// Row-aligned weights.
    pub weights: Option<Vec<f64>>,
    /// Title, vector-name, and row/column/text-column name lists.
    pub names: Names,
    /// Auxiliary named pages (covariance, predicted, binspec, ...).
    pages: Vec<Dataset>,
}

impl Dataset {
    /// An empty dataset with only a title.
    pub fn new(title: impl Into<String>) -> Self {
        Dataset { names: Names::with_title(title), ..Default::default() }
    }

    /// Number of rows implied by whichever parts are present
    /// (`max(vector.len, matrix.rows, text.rows)`, §3.1's invariant).
    pub fn nrows(&self) -> usize {
        let mut n = 0;
        if let Some(v) = &self.vector {
            n = n.max(v.len());
        }
        if let Some(m) = &self.matrix {
            n = n.max(m.rows());
        }
        if let Some(t) = &self.text {
            n = n.max(t.rows());
        }
        n
    }

    /// Check the invariants from §3.1: vector/matrix row agreement, and
    /// weights length matching the overall row count.
    pub fn validate(&self) -> Result<(), DatasetError> {
        if let (Some(v), Some(m)) = (&self.vector, &self.matrix) {
            if v.len() != m.rows() {
                return Err(DatasetError::Dimension(format!(
                    "vector.len ({}) != matrix.rows ({})",
                    v.len(),
                    m.rows()
                )));
            }
        }
        let n = self.nrows();
        if let Some(w) = &self.weights {
            if w.len() != n {
                return Err(DatasetError::Dimension(format!(
                    "weights.len ({}) != row count ({})",
                    w.len(),
                    n
                )));
            }
        }
        Ok(())
    }

    /// Read a scalar. `col = None` reads the vector; `Some(c)` reads the
    /// matrix column `c`. Out-of-bounds returns NaN (matching §3.1's
    /// "out-of-bounds -> NaN and warning").
    pub fn get(&self, row: usize, col: Option<usize>) -> f64 {
        match col {
            None => match &self.vector {
                Some(v) if row < v.len() => v[row],
                _ => {
                    tracing::warn!(row, "Dataset::get: vector index out of bounds");
                    f64::NAN
                }
            },
            Some(c) => match &self.matrix {
                Some(m) if row < m.rows() && c < m.cols() => m.get(row, c),
                _ => {
                    tracing::warn!(row, col = c, "Dataset::get: matrix index out of bounds");
                    f64::NAN
                }
            },
        }
    }

    /// Read by row-name and, optionally, column-name (case-insensitive).
    pub fn get_named(&self, row_name: &str, col_name: Option<&str>) -> Option<f64> {
        let row = self.names.row_position(row_name)?;
        let col = match col_name {
            None => None,
            Some(cn) => Some(self.names.column_position(cn)?),
        };
        Some(self.get(row, col))
    }

    /// Write a scalar; mirror of [`Dataset::get`]. Returns an error on
    /// bounds or missing-part rather than the original's `-1` sentinel.
    pub fn set(&mut self, row: usize, col: Option<usize>, v: f64) -> Result<(), DatasetError> {
        match col {
            None => match &mut self.vector {
                Some(vec) if row < vec.len() => {
                    vec[row] = v;
                    Ok(())
                }
                Some(_) => Err(DatasetError::OutOfBounds { row: Some(row), col: None }),
                None => Err(DatasetError::MissingPart("vector")),
            },
            Some(c) => match &mut self.matrix {
                Some(m) if row < m.rows() && c < m.cols() => {
                    m.set(row, c, v);
                    Ok(())
                }
                Some(_) => Err(DatasetError::OutOfBounds { row: Some(row), col: Some(c) }),
                None => Err(DatasetError::MissingPart("matrix")),
            },
        }
    }

    /// Deep copy, including the page chain. Plain [`Clone`] already does
    /// this; this method exists so callers coming from the original API
    /// (`apop_data_copy`) find the name they expect.
    pub fn copy(&self) -> Dataset {
        self.clone()
    }

    /// Append a row of matrix values (and, if present, a row-name /
    /// weight), reallocating. `text_row`, if given, extends the text grid.
    pub fn push_row(&mut self, matrix_row: Option<&[f64]>, weight: Option<f64>, text_row: Option<&[String]>) {
        if let Some(row) = matrix_row {
            match &mut self.matrix {
                Some(m) => m.push_row(row),
                None => self.matrix = Some(Grid::from_row_major(1, row.len(), row.to_vec())),
            }
        }
        if let Some(w) = weight {
            self.weights.get_or_insert_with(Vec::new).push(w);
        }
        if let Some(row) = text_row {
            match &mut self.text {
                Some(t) => t.push_row(row),
                None => {
                    let mut t = TextGrid::new(0, row.len());
                    t.push_row(row);
                    self.text = Some(t);
                }
            }
        }
        self.names.resize_row_names(self.nrows());
    }

    /// Concatenate two datasets along `axis` (§4.1/§6's stack contract).
    /// `more` pages are not propagated, matching the original.
    pub fn stack(a: &Dataset, b: &Dataset, axis: Axis) -> Result<Dataset, DatasetError> {
        let mut out = Dataset::new(a.names.title.clone());
        match axis {
            Axis::Row => {
                out.vector = match (&a.vector, &b.vector) {
                    (Some(av), Some(bv)) => {
                        let mut v = av.clone();
                        v.extend_from_slice(bv);
                        Some(v)
                    }
                    (None, None) => None,
                    _ => {
                        return Err(DatasetError::Dimension(
                            "stack(axis=row): both or neither dataset must carry a vector".into(),
                        ))
                    }
                };
                out.matrix = match (&a.matrix, &b.matrix) {
                    (Some(am), Some(bm)) => Some(Grid::stack_rows(am, bm)),
                    (None, None) => None,
                    _ => return Err(DatasetError::Dimension("stack(axis=row): matrix presence mismatch".into())),
                };
                out.text = match (&a.text, &b.text) {
                    (Some(at), Some(bt)) => Some(TextGrid::stack_rows(at, bt)),
                    (None, None) => None,
                    _ => return Err(DatasetError::Dimension("stack(axis=row): text presence mismatch".into())),
                };
                out.weights = match (&a.weights, &b.weights) {
                    (Some(aw), Some(bw)) => {
                        let mut w = aw.clone();
                        w.extend_from_slice(bw);
                        Some(w)
                    }
                    (None, None) => None,
                    _ => return Err(DatasetError::Dimension("stack(axis=row): weights presence mismatch".into())),
                };
                out.names = a.names.clone();
                out.names.row_names.extend(b.names.row_names.iter().cloned());
                out.names.resize_row_names(out.nrows());
            }
            Axis::Column => {
                let arows = a.nrows();
                let brows = b.nrows();
                if arows != brows {
                    return Err(DatasetError::Dimension(format!(
                        "stack(axis=col): row counts differ ({arows} vs {brows})"
                    )));
                }
                out.vector = a.vector.clone().or_else(|| b.vector.clone());
                out.matrix = match (&a.matrix, &b.matrix) {
                    (Some(am), Some(bm)) => Some(Grid::stack_cols(am, bm)),
                    (Some(am), None) => Some(am.clone()),
                    (None, Some(bm)) => Some(bm.clone()),
                    (None, None) => None,
                };
                out.weights = a.weights.clone().or_else(|| b.weights.clone());
                out.text = a.text.clone().or(b.text.clone());
                out.names = a.names.clone();
                out.names.column_names.extend(b.names.column_names.iter().cloned());
            }
        }
        out.validate()?;
        Ok(out)
    }

    /// Inverse of [`Dataset::stack`] for a single split point (§4.1/§6).
    /// Either resulting dataset may be empty.
    pub fn split(&self, at: usize, axis: Axis) -> Result<(Dataset, Dataset), DatasetError> {
        match axis {
            Axis::Row => {
                let n = self.nrows();
                if at > n {
                    return Err(DatasetError::Input(format!("split point {at} exceeds row count {n}")));
                }
                let mut top = Dataset::new(self.names.title.clone());
                let mut bottom = Dataset::new(self.names.title.clone());
                if let Some(v) = &self.vector {
                    top.vector = Some(v[..at].to_vec());
                    bottom.vector = Some(v[at..].to_vec());
                }
                if let Some(m) = &self.matrix {
                    let (t, b) = m.split_rows(at);
                    top.matrix = Some(t);
                    bottom.matrix = Some(b);
                }
                if let Some(t) = &self.text {
                    let (tt, bt) = t.split_rows(at);
                    top.text = Some(tt);
                    bottom.text = Some(bt);
                }
                if let Some(w) = &self.weights {
                    top.weights = Some(w[..at].to_vec());
                    bottom.weights = Some(w[at..].to_vec());
                }
                top.names = self.names.clone();
                top.names.resize_row_names(at);
                bottom.names = self.names.clone();
                bottom.names.row_names = self.names.row_names.get(at..).map(|s| s.to_vec()).unwrap_or_default();
                bottom.names.resize_row_names(n - at);
                Ok((top, bottom))
            }
            Axis::Column => {
                let m = self.matrix.as_ref().ok_or(DatasetError::MissingPart("matrix"))?;
                if at > m.cols() {
                    return Err(DatasetError::Input(format!("split point {at} exceeds column count {}", m.cols())));
                }
                let mask_left: Vec<bool> = (0..m.cols()).map(|c| c >= at).collect();
                let mask_right: Vec<bool> = (0..m.cols()).map(|c| c < at).collect();
                let mut left = self.clone();
                left.matrix = Some(m.remove_columns(&mask_left));
                left.names.column_names = self.names.column_names.get(..at).map(|s| s.to_vec()).unwrap_or_default();
                let mut right = self.clone();
                right.matrix = Some(m.remove_columns(&mask_right));
                right.names.column_names = self.names.column_names.get(at..).map(|s| s.to_vec()).unwrap_or_default();
                Ok((left, right))
            }
        }
    }

    /// Drop matrix columns where `mask[c]` is true; names follow.
    pub fn rm_columns(&self, mask: &[bool]) -> Result<Dataset, DatasetError> {
        let m = self.matrix.as_ref().ok_or(DatasetError::MissingPart("matrix"))?;
        if mask.len() != m.cols() {
            return Err(DatasetError::Dimension("mask length must equal column count".into()));
        }
        let mut out = self.clone();
        out.matrix = Some(m.remove_columns(mask));
        out.names.column_names = self
            .names
            .column_names
            .iter()
            .enumerate()
            .filter(|(i, _)| !mask.get(*i).copied().unwrap_or(false))
            .map(|(_, n)| n.clone())
            .collect();
        Ok(out)
    }

    /// Drop rows where `mask[r]` is true; reallocates all row-aligned parts.
    pub fn rm_rows_mask(&self, mask: &[bool]) -> Result<Dataset, DatasetError> {
        let n = self.nrows();
        if mask.len() != n {
            return Err(DatasetError::Dimension("mask length must equal row count".into()));
        }
        let mut out = self.clone();
        if let Some(v) = &self.vector {
            out.vector = Some(v.iter().zip(mask).filter(|(_, &m)| !m).map(|(x, _)| *x).collect());
        }
        if let Some(m) = &self.matrix {
            out.matrix = Some(m.remove_rows(mask));
        }
        if let Some(t) = &self.text {
            out.text = Some(t.remove_rows(mask));
        }
        if let Some(w) = &self.weights {
            out.weights = Some(w.iter().zip(mask).filter(|(_, &m)| !m).map(|(x, _)| *x).collect());
        }
        out.names.row_names = self
            .names
            .row_names
            .iter()
            .zip(mask.iter().chain(std::iter::repeat(&false)))
            .filter(|(_, &m)| !m)
            .map(|(n, _)| n.clone())
            .collect();
        out.names.resize_row_names(out.nrows());
        Ok(out)
    }

    /// Drop rows for which `pred` returns true, given a one-row view
    /// `(vector value, matrix row)`.
    pub fn rm_rows_pred(&self, pred: impl Fn(Option<f64>, Option<&[f64]>) -> bool) -> Result<Dataset, DatasetError> {
        let n = self.nrows();
        let mask: Vec<bool> = (0..n)
            .map(|r| {
                let v = self.vector.as_ref().map(|vv| vv[r]);
                let m = self.matrix.as_ref().map(|mm| mm.row(r));
                pred(v, m)
            })
            .collect();
        self.rm_rows_mask(&mask)
    }

    /// Swap matrix rows/columns and text rows/columns; names follow.
    /// Vector/weights are preserved in place (documented in §4.1).
    pub fn transpose(&self) -> Dataset {
        let mut out = self.clone();
        out.matrix = self.matrix.as_ref().map(|m| m.transpose());
        out.text = self.text.as_ref().map(|t| t.transpose());
        out.names.column_names = self.names.row_names.clone();
        out.names.row_names = self.names.column_names.clone();
        out
    }

    /// Walk the page chain matching a page by title. A chain longer than
    /// [`MAX_PAGE_DEPTH`] is reported as likely cyclic rather than walked
    /// indefinitely.
    pub fn get_page(&self, title: &str, how: PageMatch) -> Result<Option<&Dataset>, DatasetError> {
        if self.pages.len() > MAX_PAGE_DEPTH {
            return Err(DatasetError::Cycle(self.pages.len()));
        }
        let re = if how == PageMatch::Regex {
            Some(regex::Regex::new(title).map_err(|e| DatasetError::Input(e.to_string()))?)
        } else {
            None
        };
        for page in &self.pages {
            let hit = match how {
                PageMatch::Exact => page.names.title == title,
                PageMatch::CaseInsensitive => page.names.title.eq_ignore_ascii_case(title),
                PageMatch::Regex => re.as_ref().unwrap().is_match(&page.names.title),
            };
            if hit {
                return Ok(Some(page));
            }
        }
        Ok(None)
    }

    /// Append a page to the tail of the chain.
    pub fn add_page(&mut self, mut page: Dataset, title: impl Into<String>) -> Result<(), DatasetError> {
        if self.pages.len() + 1 > MAX_PAGE_DEPTH {
            return Err(DatasetError::Cycle(self.pages.len() + 1));
        }
        page.names.title = title.into();
        self.pages.push(page);
        Ok(())
    }

    /// All pages currently attached, in chain order.
    pub fn pages(&self) -> &[Dataset] {
        &self.pages
    }

    /// Detach and return every page, leaving none attached. Used by
    /// transformers (e.g. [`crate::transform::stack`]) that need to split
    /// a page chain at a named page rather than walk it read-only.
    pub fn take_pages(&mut self) -> Vec<Dataset> {
        std::mem::take(&mut self.pages)
    }

    /// Sort rows in place by a matrix column (`col = Some(c)`) or the
    /// vector (`col = None`), ascending or descending. NaNs sort to the
    /// end regardless of direction. Implemented as a permutation applied
    /// cycle-by-cycle to bound auxiliary memory (§4.1).
    pub fn sort_in_place(&mut self, col: Option<usize>, descending: bool) -> Result<(), DatasetError> {
        let n = self.nrows();
        let mut keyed: Vec<(usize, f64)> = (0..n).map(|r| (r, self.get(r, col))).collect();
        keyed.sort_by(|(_, a), (_, b)| match (a.is_nan(), b.is_nan()) {
            (true, true) => std::cmp::Ordering::Equal,
            (true, false) => std::cmp::Ordering::Greater,
            (false, true) => std::cmp::Ordering::Less,
            (false, false) => {
                if descending {
                    b.partial_cmp(a).unwrap_or(std::cmp::Ordering::Equal)
                } else {
                    a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal)
                }
            }
        });
        let perm: Vec<usize> = keyed.into_iter().map(|(r, _)| r).collect();
        if let Some(v) = &mut self.vector {
            let orig = v.clone();
            for (new_r, &old_r) in perm.iter().enumerate() {
                v[new_r] = orig[old_r];
            }
        }
        if let Some(m) = &mut self.matrix {
            m.permute_rows_in_place(&perm);
        }
        if let Some(t) = &mut self.text {
            t.permute_rows_in_place(&perm);
        }
        if let Some(w) = &mut self.weights {
            let orig = w.clone();
            for (new_r, &old_r) in perm.iter().enumerate() {
                w[new_r] = orig[old_r];
            }
        }
        if !self.names.row_names.is_empty() {
            let orig = self.names.row_names.clone();
            for (new_r, &old_r) in perm.iter().enumerate() {
                if old_r < orig.len() {
                    self.names.row_names[new_r] = orig[old_r].clone();
                }
            }
        }
        Ok(())
    }

    /// Serialize `(vector ++ matrix ++ weights ++ subsequent-page-parts)`
    /// into a single flat vector in a fixed order (§4.1). This is the
    /// representation optimization/sampling drivers pass around.
    pub fn pack(&self, all_pages: bool) -> Vec<f64> {
        let mut out = Vec::new();
        self.pack_into(&mut out);
        if all_pages {
            for page in &self.pages {
                page.pack_into(&mut out);
            }
        }
        out
    }

    fn pack_into(&self, out: &mut Vec<f64>) {
        if let Some(v) = &self.vector {
            out.extend_from_slice(v);
        }
        if let Some(m) = &self.matrix {
            out.extend_from_slice(m.as_slice());
        }
        if let Some(w) = &self.weights {
            out.extend_from_slice(w);
        }
    }

    /// Inverse of [`Dataset::pack`], assuming shapes already match (the
    /// contract is the caller's responsibility, mirroring the original).
    pub fn unpack(&mut self, v: &[f64]) -> Result<(), DatasetError> {
        let mut cursor = 0usize;
        if let Some(vec) = &mut self.vector {
            let len = vec.len();
            if cursor + len > v.len() {
                return Err(DatasetError::Dimension("unpack: vector segment exceeds input length".into()));
            }
            vec.copy_from_slice(&v[cursor..cursor + len]);
            cursor += len;
        }
        if let Some(m) = &mut self.matrix {
            let len = m.rows() * m.cols();
            if cursor + len > v.len() {
                return Err(DatasetError::Dimension("unpack: matrix segment exceeds input length".into()));
            }
            let (rows, cols) = (m.rows(), m.cols());
            *m = Grid::from_row_major(rows, cols, v[cursor..cursor + len].to_vec());
            cursor += len;
        }
        if let Some(w) = &mut self.weights {
            let len = w.len();
            if cursor + len > v.len() {
                return Err(DatasetError::Dimension("unpack: weights segment exceeds input length".into()));
            }
            w.copy_from_slice(&v[cursor..cursor + len]);
        }
        Ok(())
    }

    /// One row per matrix column, columns {mean, sd, variance, min, median, max}.
    pub fn summarize(&self) -> Result<Dataset, DatasetError> {
        let m = self.matrix.as_ref().ok_or(DatasetError::MissingPart("matrix"))?;
        let mut out = Dataset::new(format!("<Summary: {}>", self.names.title));
        out.names.column_names =
            vec!["mean".into(), "sd".into(), "variance".into(), "min".into(), "median".into(), "max".into()];
        let mut grid = Grid::zeros(m.cols(), 6);
        for c in 0..m.cols() {
            let col = m.column(c);
            let mean = crate::stats::weighted_mean(&col, None);
            let var = crate::stats::weighted_variance(&col, None);
            let sd = var.sqrt();
            let min = col.iter().cloned().fold(f64::INFINITY, f64::min);
            let max = col.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
            let median = crate::stats::percentile(&col, 0.5);
            grid.set(c, 0, mean);
            grid.set(c, 1, sd);
            grid.set(c, 2, var);
            grid.set(c, 3, min);
            grid.set(c, 4, median);
            grid.set(c, 5, max);
        }
        out.matrix = Some(grid);
        out.names.row_names = self.names.column_names.clone();
        out.names.resize_row_names(m.cols());
        Ok(out)
    }

    /// Collapse rows that repeat (by matrix-row equality) into one row per
    /// distinct value, summing weights (defaulting each input row's weight
    /// to 1). Used by histogram/PMF construction (§4.1).
    pub fn pmf_compress(&self) -> Result<Dataset, DatasetError> {
        let m = self.matrix.as_ref().ok_or(DatasetError::MissingPart("matrix"))?;
        let n = m.rows();
        let mut groups: Vec<(Vec<u64>, f64)> = Vec::new();
        for r in 0..n {
            let key: Vec<u64> = m.row(r).iter().map(|x| x.to_bits()).collect();
            let w = self.weights.as_ref().map(|w| w[r]).unwrap_or(1.0);
            if let Some(g) = groups.iter_mut().find(|(k, _)| *k == key) {
                g.1 += w;
            } else {
                groups.push((key, w));
            }
        }
        let mut out = Dataset::new(format!("<Pmf: {}>", self.names.title));
        out.names.column_names = self.names.column_names.clone();
        let mut grid = Grid::zeros(groups.len(), m.cols());
        let mut weights = Vec::with_capacity(groups.len());
        for (i, (key, w)) in groups.into_iter().enumerate() {
            for (c, bits) in key.into_iter().enumerate() {
                grid.set(i, c, f64::from_bits(bits));
            }
            weights.push(w);
        }
        out.matrix = Some(grid);
        out.weights = Some(weights);
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vec_dataset(v: Vec<f64>) -> Dataset {
        let mut d = Dataset::new("t");
        d.vector = Some(v);
        d
    }

    #[test]
    fn s1_sort_in_place_by_column_ascending() {
        let mut d = Dataset::new("t");
        d.matrix = Some(Grid::from_row_major(3, 2, vec![3.0, 30.0, 1.0, 10.0, 2.0, 20.0]));
        d.sort_in_place(Some(0), false).unwrap();
        assert_eq!(d.matrix.as_ref().unwrap().as_slice(), &[1.0, 10.0, 2.0, 20.0, 3.0, 30.0]);
    }

    #[test]
    fn s2_stack_then_split_vectors() {
        let a = vec_dataset(vec![1.0, 2.0, 3.0]);
        let b = vec_dataset(vec![4.0, 5.0]);
        let stacked = Dataset::stack(&a, &b, Axis::Row).unwrap();
        assert_eq!(stacked.vector, Some(vec![1.0, 2.0, 3.0, 4.0, 5.0]));
        let (top, bottom) = stacked.split(3, Axis::Row).unwrap();
        assert_eq!(top.vector, Some(vec![1.0, 2.0, 3.0]));
        assert_eq!(bottom.vector, Some(vec![4.0, 5.0]));
    }

    #[test]
    fn copy_is_deep_and_independent() {
        let mut a = vec_dataset(vec![1.0, 2.0]);
        let b = a.copy();
        a.vector.as_mut().unwrap()[0] = 99.0;
        assert_eq!(b.vector.unwrap()[0], 1.0);
    }

    #[test]
    fn pack_unpack_roundtrip() {
        let mut d = Dataset::new("t");
        d.vector = Some(vec![1.0, 2.0]);
        d.matrix = Some(Grid::from_row_major(2, 2, vec![1.0, 2.0, 3.0, 4.0]));
        d.weights = Some(vec![0.5, 0.5]);
        let v = d.pack(false);
        let mut d2 = d.clone();
        d2.unpack(&v).unwrap();
        assert_eq!(d2.pack(false), v);
    }

    #[test]
    fn get_out_of_bounds_is_nan() {
        let d = vec_dataset(vec![1.0]);
        assert!(d.get(5, None).is_nan());
    }

    #[test]
    fn pages_lookup_by_title() {
        let mut d = Dataset::new("parent");
        d.add_page(Dataset::new("x"), "<Covariance>").unwrap();
        let hit = d.get_page("<covariance>", PageMatch::CaseInsensitive).unwrap();
        assert!(hit.is_some());
        let miss = d.get_page("<Predicted>", PageMatch::Exact).unwrap();
        assert!(miss.is_none());
    }

    #[test]
    fn pmf_compress_sums_duplicate_rows() {
        let mut d = Dataset::new("t");
        d.matrix = Some(Grid::from_row_major(3, 1, vec![1.0, 1.0, 2.0]));
        let compressed = d.pmf_compress().unwrap();
        assert_eq!(compressed.matrix.as_ref().unwrap().rows(), 2);
        let total: f64 = compressed.weights.unwrap().iter().sum();
        assert_eq!(total, 3.0);
    }

    #[test]
    fn summarize_reports_expected_columns() {
        let mut d = Dataset::new("t");
        d.matrix = Some(Grid::from_row_major(4, 1, vec![1.0, 2.0, 3.0, 4.0]));
        let s = d.summarize().unwrap();
        let m = s.matrix.unwrap();
        assert_eq!(m.get(0, 0), 2.5); // mean
        assert_eq!(m.get(0, 3), 1.0); // min
        assert_eq!(m.get(0, 5), 4.0); // max
    }
}
