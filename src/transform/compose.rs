//! Data-composition (§4.8 "compose"): the generator model draws
//! parameters; those draws are treated as data for the likelihood model.
//! `log_likelihood` is `log p_likelihood(draws_from_prior)` — the
//! building block for posterior-predictive-style constructions, where a
//! downstream model's fit is evaluated against simulated draws from an
//! upstream one rather than against a shared observed dataset.

use rand::rngs::StdRng;
use rand::SeedableRng;

use crate::dataset::matrix::Grid;
use crate::dataset::Dataset;
use crate::model::{Model, ModelFamily};

use super::TransformError;

#[derive(Debug, Clone)]
pub struct Compose {
    generator: Model,
    likelihood: Model,
    generator_vsize: usize,
    /// Number of draws taken from `generator` per likelihood evaluation
    /// (the original's `draw_ct`, defaulting to `1e4`).
    draw_ct: usize,
    seed: u64,
}

impl Compose {
    pub fn new(generator: Model, likelihood: Model) -> Result<Self, TransformError> {
        let generator_vsize = generator.family.vsize().ok_or_else(|| {
            TransformError::DimensionMismatch(0, likelihood.family.vsize().unwrap_or(0))
        })?;
        Ok(Compose { generator, likelihood, generator_vsize, draw_ct: 10_000, seed: 0 })
    }

    pub fn with_draw_ct(mut self, draw_ct: usize) -> Self {
        self.draw_ct = draw_ct;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    fn split<'a>(&self, packed: &'a [f64]) -> (&'a [f64], &'a [f64]) {
        packed.split_at(self.generator_vsize.min(packed.len()))
    }

    /// Draw `draw_ct` samples from `generator` (at `gen_params`) and pack
    /// them into a [`Dataset`] the likelihood model can evaluate: a plain
    /// vector for a scalar-valued generator, a row-major matrix otherwise.
    fn draws(&self, gen_params: &Dataset) -> Option<Dataset> {
        let mut rng = StdRng::seed_from_u64(self.seed);
        let mut rows = Vec::with_capacity(self.draw_ct);
        for _ in 0..self.draw_ct {
            rows.push(self.generator.family.draw(gen_params, &mut rng)?);
        }
        let dim = rows.first().map(|r| r.len()).unwrap_or(0);
        let mut out = Dataset::new(format!("<{} draws>", self.generator.name));
        if dim <= 1 {
            out.vector = Some(rows.iter().map(|r| r.first().copied().unwrap_or(f64::NAN)).collect());
        } else {
            let nrows = rows.len();
            let flat: Vec<f64> = rows.into_iter().flatten().collect();
            out.matrix = Some(Grid::from_row_major(nrows, dim, flat));
        }
        Some(out)
    }
}

impl ModelFamily for Compose {
    fn name(&self) -> &str {
        "compose"
    }

    fn vsize(&self) -> Option<usize> {
        Some(self.generator_vsize + self.likelihood.family.vsize().unwrap_or(0))
    }

    /// Ignores `_data`: the composed model's likelihood is entirely a
    /// function of the generator's draws, not of any externally supplied
    /// dataset, matching the original's `compose_ll`.
    fn log_likelihood(&self, _data: &Dataset, params: &Dataset) -> Option<f64> {
        let packed = params.vector.as_ref()?;
        let (g, l) = self.split(packed);
        let mut gen_params = self.generator.parameters.clone();
        gen_params.vector = Some(g.to_vec());
        let mut lik_params = self.likelihood.parameters.clone();
        lik_params.vector = Some(l.to_vec());

        let draws = self.draws(&gen_params)?;
        self.likelihood.family.log_likelihood(&draws, &lik_params)
    }

    fn constraint(&self, params: &mut Dataset) -> f64 {
        let Some(packed) = params.vector.clone() else { return 0.0 };
        let (g, l) = self.split(&packed);
        let mut gen_ds = self.generator.parameters.clone();
        gen_ds.vector = Some(g.to_vec());
        let mut lik_ds = self.likelihood.parameters.clone();
        lik_ds.vector = Some(l.to_vec());
        let gen_penalty = self.generator.family.constraint(&mut gen_ds);
        let lik_penalty = self.likelihood.family.constraint(&mut lik_ds);
        let mut merged = gen_ds.vector.unwrap_or_default();
        merged.extend(lik_ds.vector.unwrap_or_default());
        params.vector = Some(merged);
        gen_penalty + lik_penalty
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::families::Normal;
    use std::sync::Arc;

    #[test]
    fn composed_log_likelihood_evaluates_likelihood_on_generator_draws() {
        let generator = Model::new(Arc::new(Normal));
        let likelihood = Model::new(Arc::new(Normal));
        let composed = Compose::new(generator, likelihood).unwrap().with_draw_ct(5_000).with_seed(11);
        assert_eq!(composed.vsize(), Some(4));

        let mut params = Dataset::new("p");
        params.vector = Some(vec![0.0, 1.0, 0.0, 1.0]);
        // Unused: composed log-likelihood depends only on the generator's draws.
        let unused_data = Dataset::new("d");
        let ll = composed.log_likelihood(&unused_data, &params).unwrap();
        assert!(ll.is_finite());

        // A likelihood centered far from the generator's support should
        // score much worse than one that matches it.
        let mut far_params = Dataset::new("p");
        far_params.vector = Some(vec![0.0, 1.0, 50.0, 1.0]);
        let far_ll = composed.log_likelihood(&unused_data, &far_params).unwrap();
        assert!(far_ll < ll);
    }

    #[test]
    fn repeated_calls_with_the_same_seed_agree() {
        let composed = Compose::new(Model::new(Arc::new(Normal)), Model::new(Arc::new(Normal)))
            .unwrap()
            .with_draw_ct(500)
            .with_seed(3);
        let mut params = Dataset::new("p");
        params.vector = Some(vec![1.0, 2.0, 1.0, 2.0]);
        let data = Dataset::new("d");
        let a = composed.log_likelihood(&data, &params).unwrap();
        let b = composed.log_likelihood(&data, &params).unwrap();
        assert_eq!(a, b);
    }
}
