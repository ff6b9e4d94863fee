//! Iterative proportional fitting / raking (§4.6): adjust a sparse
//! n-dimensional contingency table's cells so that, for every configured
//! contrast (an unordered subset of the table's dimensions), the fitted
//! margin over that contrast's category combinations matches a target
//! margin, alternating one scaling pass per contrast until every
//! contrast's deviation is within tolerance.
//!
//! A cell is one combination of per-dimension category values; the
//! table is the Cartesian product of every dimension's observed
//! categories, minus whichever combinations a `structural_zero`
//! predicate rules out. Each dimension maintains, for every category
//! value, a membership bitset marking which cells carry that value; a
//! contrast's margin combinations are iterated by an odometer over its
//! dimensions, and the cells contributing to one combination are the
//! intersection of the matching bitsets. A configurable nudge is added
//! to every surviving zero-weight cell before the first pass so it stays
//! reachable by scaling rather than stuck at a sampling zero, a behavior
//! carried over from the original's table-prep step.

use thiserror::Error;

use crate::error::ErrorCode;

#[derive(Debug, Error)]
pub enum RakeError {
    #[error("contrast over dimensions {0:?} needs {1} margin targets (the product of its category counts) but got {2}")]
    MarginTargetMismatch(Vec<usize>, usize, usize),
    #[error("did not converge within {0} iterations (final max margin error {1:.3e})")]
    NotConverged(usize, f64),
}

impl RakeError {
    pub fn code(&self) -> ErrorCode {
        match self {
            RakeError::MarginTargetMismatch(..) => ErrorCode::Dimension,
            RakeError::NotConverged(..) => ErrorCode::Convergence,
        }
    }
}

/// Configuration for [`rake`].
#[derive(Debug, Clone)]
pub struct RakeSettings {
    pub tolerance: f64,
    pub max_iterations: usize,
    /// Added to every structural-non-zero cell whose observed weight is
    /// zero, before the first scaling pass.
    pub nudge: f64,
}

impl Default for RakeSettings {
    fn default() -> Self {
        RakeSettings { tolerance: 1e-6, max_iterations: 1000, nudge: 1e-6 }
    }
}

/// Enumerate the Cartesian product of `dim_sizes`, one combination per
/// row, with the last dimension varying fastest.
fn odometer(dim_sizes: &[usize]) -> Vec<Vec<usize>> {
    let mut out = vec![Vec::new()];
    for &size in dim_sizes {
        let mut next = Vec::with_capacity(out.len() * size.max(1));
        for combo in &out {
            for k in 0..size {
                let mut c = combo.clone();
                c.push(k);
                next.push(c);
            }
        }
        out = next;
    }
    out
}

/// A sparse n-dimensional table: every dimension's observed category
/// values, the cells surviving the Cartesian product and structural-zero
/// filter, and each cell's current estimated weight.
#[derive(Debug, Clone)]
pub struct RakeTable {
    categories: Vec<Vec<f64>>,
    /// One row per cell, one category index per dimension.
    cells: Vec<Vec<usize>>,
    weights: Vec<f64>,
    /// `membership[d][k]` is a bitset over `cells` marking which cells
    /// carry category index `k` in dimension `d`.
    membership: Vec<Vec<Vec<bool>>>,
}

impl RakeTable {
    /// Build the Cartesian-product cell list over `categories` (one
    /// entry per dimension), drop any combination `structural_zero`
    /// marks, look up each surviving cell's weight via `observed`, and
    /// apply `nudge` to any that come back at zero.
    pub fn build(
        categories: Vec<Vec<f64>>,
        observed: impl Fn(&[f64]) -> f64,
        structural_zero: impl Fn(&[f64]) -> bool,
        nudge: f64,
    ) -> RakeTable {
        let dim_sizes: Vec<usize> = categories.iter().map(|c| c.len()).collect();
        let mut cells = Vec::new();
        let mut weights = Vec::new();
        for combo in odometer(&dim_sizes) {
            let values: Vec<f64> = combo.iter().zip(&categories).map(|(&k, c)| c[k]).collect();
            if structural_zero(&values) {
                continue;
            }
            let w = observed(&values);
            weights.push(if w > 0.0 { w } else { nudge });
            cells.push(combo);
        }

        let mut membership = Vec::with_capacity(categories.len());
        for (d, cats) in categories.iter().enumerate() {
            let mut per_value = Vec::with_capacity(cats.len());
            for k in 0..cats.len() {
                per_value.push(cells.iter().map(|cell| cell[d] == k).collect());
            }
            membership.push(per_value);
        }

        RakeTable { categories, cells, weights, membership }
    }

    /// The cell indices contributing to each margin combination of
    /// `contrast`, in the same order as `contrast.targets`.
    fn margin_subsets(&self, contrast: &Contrast) -> Vec<Vec<usize>> {
        let dim_sizes: Vec<usize> = contrast.dims.iter().map(|&d| self.categories[d].len()).collect();
        odometer(&dim_sizes)
            .into_iter()
            .map(|combo| {
                let mut member = vec![true; self.cells.len()];
                for (&d, &k) in contrast.dims.iter().zip(&combo) {
                    let bits = &self.membership[d][k];
                    for (m, &b) in member.iter_mut().zip(bits) {
                        *m = *m && b;
                    }
                }
                (0..member.len()).filter(|&i| member[i]).collect()
            })
            .collect()
    }

    /// Current estimated weight of the cell matching `values` (one per
    /// dimension, in dimension order), if such a cell survived filtering.
    pub fn weight_at(&self, values: &[f64]) -> Option<f64> {
        let i = self
            .cells
            .iter()
            .position(|cell| cell.iter().zip(&self.categories).zip(values).all(|((&k, c), &v)| c[k] == v))?;
        Some(self.weights[i])
    }

    /// Every surviving cell as `(category values, current weight)`.
    pub fn iter(&self) -> impl Iterator<Item = (Vec<f64>, f64)> + '_ {
        self.cells.iter().zip(&self.weights).map(move |(cell, &w)| {
            (cell.iter().zip(&self.categories).map(|(&k, c)| c[k]).collect(), w)
        })
    }
}

/// One contrast: a subset of the table's dimensions (by index) whose
/// margin is held to `targets`, one target per combination of those
/// dimensions' categories in odometer order.
#[derive(Debug, Clone)]
pub struct Contrast {
    pub dims: Vec<usize>,
    pub targets: Vec<f64>,
}

/// Report on a completed raking run.
#[derive(Debug, Clone)]
pub struct RakeReport {
    pub table: RakeTable,
    pub iterations: usize,
    pub max_margin_error: f64,
}

/// Rake `table` so every contrast's fitted margin matches its targets.
pub fn rake(mut table: RakeTable, contrasts: &[Contrast], settings: &RakeSettings) -> Result<RakeReport, RakeError> {
    for contrast in contrasts {
        let expected: usize = contrast.dims.iter().map(|&d| table.categories[d].len()).product();
        if contrast.targets.len() != expected {
            return Err(RakeError::MarginTargetMismatch(contrast.dims.clone(), expected, contrast.targets.len()));
        }
    }

    let subsets: Vec<Vec<Vec<usize>>> = contrasts.iter().map(|c| table.margin_subsets(c)).collect();

    let mut iterations = 0;
    let mut max_error = f64::INFINITY;

    while iterations < settings.max_iterations {
        max_error = 0.0;
        for (contrast, subset_list) in contrasts.iter().zip(&subsets) {
            for (subset, &target) in subset_list.iter().zip(&contrast.targets) {
                if subset.is_empty() {
                    continue;
                }
                let fit_sum: f64 = subset.iter().map(|&i| table.weights[i]).sum();
                if fit_sum > 0.0 {
                    let scale = target / fit_sum;
                    for &i in subset {
                        table.weights[i] *= scale;
                    }
                }
                max_error = max_error.max((target - fit_sum).abs());
            }
        }
        iterations += 1;
        if max_error < settings.tolerance {
            return Ok(RakeReport { table, iterations, max_margin_error: max_error });
        }
    }

    Err(RakeError::NotConverged(iterations, max_error))
}

#[cfg(test)]
mod tests {
    use super::*;

    /// A 2x2 table as a degenerate 2-dimensional case of the n-D engine,
    /// raked against row and column contrasts.
    #[test]
    fn two_by_two_table_converges_to_both_margins() {
        let categories = vec![vec![0.0, 1.0], vec![0.0, 1.0]];
        let cells: [[f64; 2]; 4] = [[0.0, 0.0], [0.0, 1.0], [1.0, 0.0], [1.0, 1.0]];
        let observed = [10.0, 20.0, 30.0, 40.0];
        let table = RakeTable::build(
            categories,
            |v| {
                let i = cells.iter().position(|c| c == v).unwrap();
                observed[i]
            },
            |_| false,
            1e-6,
        );
        let contrasts =
            vec![Contrast { dims: vec![0], targets: vec![50.0, 50.0] }, Contrast { dims: vec![1], targets: vec![40.0, 60.0] }];
        let report = rake(table, &contrasts, &RakeSettings::default()).unwrap();
        assert!(report.max_margin_error < 1e-5);
        let row0 = report.table.weight_at(&[0.0, 0.0]).unwrap() + report.table.weight_at(&[0.0, 1.0]).unwrap();
        assert!((row0 - 50.0).abs() < 1e-4);
    }

    #[test]
    fn three_dimensional_table_converges_on_a_pairwise_contrast() {
        let categories = vec![vec![0.0, 1.0], vec![0.0, 1.0], vec![0.0, 1.0]];
        let table = RakeTable::build(categories, |_| 1.0, |_| false, 1e-6);
        // Contrast over dims (0, 1): four margin combinations.
        let contrasts = vec![Contrast { dims: vec![0, 1], targets: vec![10.0, 20.0, 30.0, 40.0] }];
        let report = rake(table, &contrasts, &RakeSettings::default()).unwrap();
        assert!(report.max_margin_error < 1e-5);
        let cell00: f64 =
            report.table.weight_at(&[0.0, 0.0, 0.0]).unwrap() + report.table.weight_at(&[0.0, 0.0, 1.0]).unwrap();
        assert!((cell00 - 10.0).abs() < 1e-4);
    }

    #[test]
    fn structural_zero_cell_stays_zero() {
        let categories = vec![vec![0.0, 1.0], vec![0.0, 1.0]];
        let table = RakeTable::build(categories, |_| 1.0, |v| v[0] == 0.0 && v[1] == 1.0, 1e-6);
        assert!(table.weight_at(&[0.0, 1.0]).is_none());
        let contrasts =
            vec![Contrast { dims: vec![0], targets: vec![30.0, 70.0] }, Contrast { dims: vec![1], targets: vec![40.0, 60.0] }];
        let report = rake(table, &contrasts, &RakeSettings::default()).unwrap();
        assert!(report.table.weight_at(&[0.0, 1.0]).is_none());
    }

    #[test]
    fn mismatched_targets_are_rejected() {
        let categories = vec![vec![0.0, 1.0], vec![0.0, 1.0]];
        let table = RakeTable::build(categories, |_| 1.0, |_| false, 1e-6);
        let contrasts = vec![Contrast { dims: vec![0, 1], targets: vec![1.0, 1.0, 1.0] }];
        let err = rake(table, &contrasts, &RakeSettings::default()).unwrap_err();
        assert!(matches!(err, RakeError::MarginTargetMismatch(_, 4, 3)));
    }
}
