//! Cross two models over independent data dimensions (§4.8 "cross"): a
//! joint model over `(column 0, column 1)` that assumes the two columns
//! are independent given their own parameters, `log p(x, y) = log
//! p_left(x) + log p_right(y)`. Complementary to [`super::compose`],
//! which shares one dataset across both models instead of splitting it by
//! column.

use crate::dataset::matrix::Grid;
use crate::dataset::Dataset;
use crate::model::{Model, ModelFamily};

use super::TransformError;

#[derive(Debug, Clone)]
pub struct Cross {
    left: Model,
    right: Model,
    left_vsize: usize,
}

impl Cross {
    pub fn new(left: Model, right: Model) -> Self {
        let left_vsize = left.family.vsize().unwrap_or(0);
        Cross { left, right, left_vsize }
    }

    fn column_datasets(&self, data: &Dataset) -> Result<(Dataset, Dataset), TransformError> {
        let m = data.matrix.as_ref().ok_or(TransformError::RowCountMismatch(0, 0))?;
        if m.cols() < 2 {
            return Err(TransformError::RowCountMismatch(m.rows(), 0));
        }
        let mut left = Dataset::new("cross:left");
        left.vector = Some(m.column(0));
        let mut right = Dataset::new("cross:right");
        right.vector = Some(m.column(1));
        Ok((left, right))
    }
}

impl ModelFamily for Cross {
    fn name(&self) -> &str {
        "cross"
    }

    fn vsize(&self) -> Option<usize> {
        Some(self.left_vsize + self.right.family.vsize().unwrap_or(0))
    }

    fn log_likelihood(&self, data: &Dataset, params: &Dataset) -> Option<f64> {
        let packed = params.vector.as_ref()?;
        let (l, r) = packed.split_at(self.left_vsize.min(packed.len()));
        let (left_data, right_data) = self.column_datasets(data).ok()?;

        let mut left_params = self.left.parameters.clone();
        left_params.vector = Some(l.to_vec());
        let mut right_params = self.right.parameters.clone();
        right_params.vector = Some(r.to_vec());

        let left_ll = self.left.family.log_likelihood(&left_data, &left_params)?;
        let right_ll = self.right.family.log_likelihood(&right_data, &right_params)?;
        Some(left_ll + right_ll)
    }

    fn draw(&self, params: &Dataset, rng: &mut dyn rand::RngCore) -> Option<Vec<f64>> {
        let packed = params.vector.as_ref()?;
        let (l, r) = packed.split_at(self.left_vsize.min(packed.len()));
        let mut left_params = self.left.parameters.clone();
        left_params.vector = Some(l.to_vec());
        let mut right_params = self.right.parameters.clone();
        right_params.vector = Some(r.to_vec());

        let mut x = self.left.family.draw(&left_params, rng)?;
        let y = self.right.family.draw(&right_params, rng)?;
        x.extend(y);
        Some(x)
    }
}

/// Horizontally combine two datasets' matrices into the `(column 0,
/// column 1, ...)` layout [`Cross`] expects, the dataset-level operation
/// callers use to build up the joint data before estimating a crossed
/// model.
pub fn cross_datasets(left: &Dataset, right: &Dataset) -> Result<Dataset, crate::dataset::DatasetError> {
    Dataset::stack(left, right, crate::dataset::Axis::Column)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::families::Normal;
    use std::sync::Arc;

    #[test]
    fn cross_sums_marginal_log_likelihoods() {
        let left = Model::new(Arc::new(Normal));
        let right = Model::new(Arc::new(Normal));
        let crossed = Cross::new(left, right);

        let mut data = Dataset::new("d");
        data.matrix = Some(Grid::from_row_major(2, 2, vec![0.0, 1.0, -1.0, 2.0]));
        let mut params = Dataset::new("p");
        params.vector = Some(vec![0.0, 1.0, 0.0, 1.0]);
        let ll = crossed.log_likelihood(&data, &params).unwrap();

        let mut lp = Dataset::new("lp");
        lp.vector = Some(vec![0.0, 1.0]);
        let mut ld = Dataset::new("ld");
        ld.vector = Some(vec![0.0, -1.0]);
        let mut rp = Dataset::new("rp");
        rp.vector = Some(vec![0.0, 1.0]);
        let mut rd = Dataset::new("rd");
        rd.vector = Some(vec![1.0, 2.0]);
        let expected = Normal.log_likelihood(&ld, &lp).unwrap() + Normal.log_likelihood(&rd, &rp).unwrap();
        assert!((ll - expected).abs() < 1e-9);
    }
}
