//! Fix a subset of an inner model's parameters at constant values,
//! presenting only the remaining free parameters to callers (§4.8
//! "fix_params"). Useful for profile likelihoods and partially known
//! models (e.g. a Normal with a known, fixed variance).

use crate::dataset::Dataset;
use crate::model::{Model, ModelFamily};

/// Wraps `inner`, holding the parameters where `mask[i]` is true at
/// `fixed_values[i]` and exposing only the `false` positions as free.
#[derive(Debug, Clone)]
pub struct FixParams {
    inner: Model,
    mask: Vec<bool>,
    fixed_values: Vec<f64>,
}

impl FixParams {
    /// `fixed_values` gives the constant to hold each `mask[i] == true`
    /// position at; positions where `mask[i]` is false are ignored.
    pub fn new(inner: Model, mask: Vec<bool>, fixed_values: Vec<f64>) -> Result<Self, super::TransformError> {
        let want = inner.family.vsize().unwrap_or(mask.len());
        if mask.len() != want {
            return Err(super::TransformError::FixParamsMaskMismatch(mask.len(), want));
        }
        Ok(FixParams { inner, mask, fixed_values })
    }

    fn expand(&self, free: &[f64]) -> Vec<f64> {
        let mut full = Vec::with_capacity(self.mask.len());
        let mut cursor = 0;
        for (i, &fixed) in self.mask.iter().enumerate() {
            if fixed {
                full.push(self.fixed_values[i]);
            } else {
                full.push(free[cursor]);
                cursor += 1;
            }
        }
        full
    }

    fn contract(&self, full: &[f64]) -> Vec<f64> {
        self.mask.iter().zip(full).filter(|(&fixed, _)| !fixed).map(|(_, &v)| v).collect()
    }
}

impl ModelFamily for FixParams {
    fn name(&self) -> &str {
        "fix_params"
    }

    fn vsize(&self) -> Option<usize> {
        Some(self.mask.iter().filter(|&&fixed| !fixed).count())
    }

    fn log_likelihood(&self, data: &Dataset, params: &Dataset) -> Option<f64> {
        let free = params.vector.as_ref()?;
        let full = self.expand(free);
        let mut inner_params = self.inner.parameters.clone();
        inner_params.vector = Some(full);
        self.inner.family.log_likelihood(data, &inner_params)
    }

    fn draw(&self, params: &Dataset, rng: &mut dyn rand::RngCore) -> Option<Vec<f64>> {
        let free = params.vector.as_ref()?;
        let full = self.expand(free);
        let mut inner_params = self.inner.parameters.clone();
        inner_params.vector = Some(full);
        self.inner.family.draw(&inner_params, rng)
    }

    fn constraint(&self, params: &mut Dataset) -> f64 {
        let Some(free) = params.vector.clone() else { return 0.0 };
        let mut full = self.expand(&free);
        let mut full_ds = self.inner.parameters.clone();
        full_ds.vector = Some(full.clone());
        let penalty = self.inner.family.constraint(&mut full_ds);
        full = full_ds.vector.unwrap_or(full);
        params.vector = Some(self.contract(&full));
        penalty
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::families::Normal;
    use std::sync::Arc;

    #[test]
    fn fixing_sigma_leaves_only_mu_free() {
        let inner = Model::new(Arc::new(Normal));
        let fixed = FixParams::new(inner, vec![false, true], vec![0.0, 2.0]).unwrap();
        assert_eq!(fixed.vsize(), Some(1));

        let mut params = Dataset::new("p");
        params.vector = Some(vec![1.0]);
        let mut data = Dataset::new("d");
        data.vector = Some(vec![1.0, 1.0, 1.0]);
        let ll = fixed.log_likelihood(&data, &params).unwrap();

        let mut full = Dataset::new("full");
        full.vector = Some(vec![1.0, 2.0]);
        let ll_direct = Normal.log_likelihood(&data, &full).unwrap();
        assert!((ll - ll_direct).abs() < 1e-9);
        params.vector = Some(vec![1.0]);
    }
}
