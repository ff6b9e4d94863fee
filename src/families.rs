//! Concrete statistical families (§3.3's examples, §1's in-scope models):
//! Normal, Beta, Binomial, Bernoulli, Gamma, Poisson, and the empirical
//! PMF family backing [`crate::dataset::Dataset::pmf_compress`]'s output.
//!
//! Each family is a thin [`crate::model::ModelFamily`] impl over a
//! `statrs` distribution for `p`/`log_likelihood`/`cdf` and a `rand_distr`
//! sampler for `draw`. Parameters are read out of the packed vector part
//! of the model's parameter [`Dataset`] in the order documented on each
//! struct; this is the "vector part holds the free parameters in a fixed
//! order" convention the conjugate-update and MLE drivers also assume.

use rand::RngCore;
use rand_distr::Distribution as RandDistribution;
use statrs::distribution::{Bernoulli as SBernoulli, Binomial as SBinomial, Continuous, ContinuousCDF, Discrete, DiscreteCDF, Gamma as SGamma, Normal as SNormal, Poisson as SPoisson};

use crate::dataset::Dataset;
use crate::model::ModelFamily;

/// Weighted sum of `data`'s vector/first-matrix-column observations fed
/// through a per-observation log-density closure. Every univariate family
/// below funnels through this so the weighting convention lives in one
/// place.
fn weighted_loglik(data: &Dataset, mut ln_pdf: impl FnMut(f64) -> f64) -> Option<f64> {
    let values: &[f64] = if let Some(v) = &data.vector {
        v
    } else if let Some(m) = &data.matrix {
        if m.cols() != 1 {
            return None;
        }
        return Some(
            (0..m.rows())
                .map(|r| {
                    let w = data.weights.as_ref().map(|w| w[r]).unwrap_or(1.0);
                    w * ln_pdf(m.get(r, 0))
                })
                .sum(),
        );
    } else {
        return None;
    };
    Some(
        values
            .iter()
            .enumerate()
            .map(|(i, &x)| {
                let w = data.weights.as_ref().map(|w| w[i]).unwrap_or(1.0);
                w * ln_pdf(x)
            })
            .sum(),
    )
}

fn param(params: &Dataset, i: usize) -> f64 {
    params.vector.as_ref().and_then(|v| v.get(i)).copied().unwrap_or(f64::NAN)
}

/// Normal(mu, sigma). Parameter vector: `[mu, sigma]`.
#[derive(Debug, Clone, Copy, Default)]
pub struct Normal;

impl ModelFamily for Normal {
    fn name(&self) -> &str {
        "normal"
    }

    fn vsize(&self) -> Option<usize> {
        Some(2)
    }

    fn log_likelihood(&self, data: &Dataset, params: &Dataset) -> Option<f64> {
        let (mu, sigma) = (param(params, 0), param(params, 1));
        let dist = SNormal::new(mu, sigma).ok()?;
        weighted_loglik(data, |x| dist.ln_pdf(x))
    }

    fn cdf(&self, data: &Dataset, params: &Dataset) -> Option<f64> {
        let (mu, sigma) = (param(params, 0), param(params, 1));
        let dist = SNormal::new(mu, sigma).ok()?;
        let x = data.vector.as_ref()?.first().copied()?;
        Some(dist.cdf(x))
    }

    fn draw(&self, params: &Dataset, rng: &mut dyn RngCore) -> Option<Vec<f64>> {
        let (mu, sigma) = (param(params, 0), param(params, 1));
        let dist = rand_distr::Normal::new(mu, sigma).ok()?;
        Some(vec![dist.sample(&mut RngShim(rng))])
    }
}

/// Beta(alpha, beta) on `[0, 1]`. Parameter vector: `[alpha, beta]`.
#[derive(Debug, Clone, Copy, Default)]
pub struct Beta;

impl ModelFamily for Beta {
    fn name(&self) -> &str {
        "beta"
    }

    fn vsize(&self) -> Option<usize> {
        Some(2)
    }

    fn log_likelihood(&self, data: &Dataset, params: &Dataset) -> Option<f64> {
        let (a, b) = (param(params, 0), param(params, 1));
        let dist = statrs::distribution::Beta::new(a, b).ok()?;
        weighted_loglik(data, |x| dist.ln_pdf(x))
    }

    fn cdf(&self, data: &Dataset, params: &Dataset) -> Option<f64> {
        let (a, b) = (param(params, 0), param(params, 1));
        let dist = statrs::distribution::Beta::new(a, b).ok()?;
        let x = data.vector.as_ref()?.first().copied()?;
        Some(dist.cdf(x))
    }

    fn draw(&self, params: &Dataset, rng: &mut dyn RngCore) -> Option<Vec<f64>> {
        let (a, b) = (param(params, 0), param(params, 1));
        let dist = rand_distr::Beta::new(a, b).ok()?;
        Some(vec![dist.sample(&mut RngShim(rng))])
    }

    fn constraint(&self, params: &mut Dataset) -> f64 {
        clamp_positive(params, 2)
    }
}

/// Binomial(n, p) with `n` fixed at construction. Parameter vector: `[p]`.
#[derive(Debug, Clone, Copy)]
pub struct Binomial {
    pub n: u64,
}

impl ModelFamily for Binomial {
    fn name(&self) -> &str {
        "binomial"
    }

    fn vsize(&self) -> Option<usize> {
        Some(1)
    }

    fn log_likelihood(&self, data: &Dataset, params: &Dataset) -> Option<f64> {
        let p = param(params, 0);
        let dist = SBinomial::new(p, self.n).ok()?;
        weighted_loglik(data, |x| dist.ln_pmf(x.round() as u64))
    }

    fn cdf(&self, data: &Dataset, params: &Dataset) -> Option<f64> {
        let p = param(params, 0);
        let dist = SBinomial::new(p, self.n).ok()?;
        let x = data.vector.as_ref()?.first().copied()?;
        Some(dist.cdf(x.round() as u64))
    }

    fn draw(&self, params: &Dataset, rng: &mut dyn RngCore) -> Option<Vec<f64>> {
        let p = param(params, 0);
        let dist = rand_distr::Binomial::new(self.n, p).ok()?;
        Some(vec![dist.sample(&mut RngShim(rng)) as f64])
    }

    fn constraint(&self, params: &mut Dataset) -> f64 {
        clamp_unit_interval(params, 0)
    }
}

/// Bernoulli(p). Parameter vector: `[p]`.
#[derive(Debug, Clone, Copy, Default)]
pub struct Bernoulli;

impl ModelFamily for Bernoulli {
    fn name(&self) -> &str {
        "bernoulli"
    }

    fn vsize(&self) -> Option<usize> {
        Some(1)
    }

    fn log_likelihood(&self, data: &Dataset, params: &Dataset) -> Option<f64> {
        let p = param(params, 0);
        let dist = SBernoulli::new(p).ok()?;
        weighted_loglik(data, |x| dist.ln_pmf(x.round() as u64))
    }

    fn draw(&self, params: &Dataset, rng: &mut dyn RngCore) -> Option<Vec<f64>> {
        let p = param(params, 0);
        let dist = rand_distr::Bernoulli::new(p.clamp(0.0, 1.0)).ok()?;
        Some(vec![if dist.sample(&mut RngShim(rng)) { 1.0 } else { 0.0 }])
    }

    fn constraint(&self, params: &mut Dataset) -> f64 {
        clamp_unit_interval(params, 0)
    }
}

/// Gamma(shape, rate). Parameter vector: `[shape, rate]`.
#[derive(Debug, Clone, Copy, Default)]
pub struct Gamma;

impl ModelFamily for Gamma {
    fn name(&self) -> &str {
        "gamma"
    }

    fn vsize(&self) -> Option<usize> {
        Some(2)
    }

    fn log_likelihood(&self, data: &Dataset, params: &Dataset) -> Option<f64> {
        let (shape, rate) = (param(params, 0), param(params, 1));
        let dist = SGamma::new(shape, rate).ok()?;
        weighted_loglik(data, |x| dist.ln_pdf(x))
    }

    fn cdf(&self, data: &Dataset, params: &Dataset) -> Option<f64> {
        let (shape, rate) = (param(params, 0), param(params, 1));
        let dist = SGamma::new(shape, rate).ok()?;
        let x = data.vector.as_ref()?.first().copied()?;
        Some(dist.cdf(x))
    }

    fn draw(&self, params: &Dataset, rng: &mut dyn RngCore) -> Option<Vec<f64>> {
        let (shape, rate) = (param(params, 0), param(params, 1));
        let dist = rand_distr::Gamma::new(shape, 1.0 / rate).ok()?;
        Some(vec![dist.sample(&mut RngShim(rng))])
    }

    fn constraint(&self, params: &mut Dataset) -> f64 {
        clamp_positive(params, 2)
    }
}

/// Poisson(lambda). Parameter vector: `[lambda]`.
#[derive(Debug, Clone, Copy, Default)]
pub struct Poisson;

impl ModelFamily for Poisson {
    fn name(&self) -> &str {
        "poisson"
    }

    fn vsize(&self) -> Option<usize> {
        Some(1)
    }

    fn log_likelihood(&self, data: &Dataset, params: &Dataset) -> Option<f64> {
        let lambda = param(params, 0);
        let dist = SPoisson::new(lambda).ok()?;
        weighted_loglik(data, |x| dist.ln_pmf(x.round() as u64))
    }

    fn cdf(&self, data: &Dataset, params: &Dataset) -> Option<f64> {
        let lambda = param(params, 0);
        let dist = SPoisson::new(lambda).ok()?;
        let x = data.vector.as_ref()?.first().copied()?;
        Some(dist.cdf(x.round() as u64))
    }

    fn draw(&self, params: &Dataset, rng: &mut dyn RngCore) -> Option<Vec<f64>> {
        let lambda = param(params, 0);
        let dist = rand_distr::Poisson::new(lambda).ok()?;
        Some(vec![dist.sample(&mut RngShim(rng)) as f64])
    }

    fn constraint(&self, params: &mut Dataset) -> f64 {
        clamp_positive(params, 1)
    }
}

/// An empirical PMF over a finite, explicitly enumerated support (the
/// output of [`crate::dataset::Dataset::pmf_compress`]): no free
/// parameters, `p`/`draw` read straight off the support's matrix/weights.
#[derive(Debug, Clone)]
pub struct Pmf {
    support: Dataset,
    total_weight: f64,
}

impl Pmf {
    /// Build from a compressed support dataset (matrix rows = distinct
    /// values, weights = their mass).
    pub fn new(support: Dataset) -> Self {
        let total_weight = support.weights.as_ref().map(|w| w.iter().sum()).unwrap_or(support.nrows() as f64);
        Pmf { support, total_weight }
    }
}

impl ModelFamily for Pmf {
    fn name(&self) -> &str {
        "pmf"
    }

    fn vsize(&self) -> Option<usize> {
        Some(0)
    }

    fn log_likelihood(&self, data: &Dataset, _params: &Dataset) -> Option<f64> {
        let m = self.support.matrix.as_ref()?;
        let dm = data.matrix.as_ref()?;
        let mut total = 0.0;
        for r in 0..dm.rows() {
            let row = dm.row(r);
            let hit = (0..m.rows()).find(|&sr| m.row(sr) == row)?;
            let w = self.support.weights.as_ref().map(|w| w[hit]).unwrap_or(1.0);
            total += (w / self.total_weight).ln();
        }
        Some(total)
    }

    fn draw(&self, _params: &Dataset, rng: &mut dyn RngCore) -> Option<Vec<f64>> {
        let m = self.support.matrix.as_ref()?;
        let weights = self.support.weights.as_ref()?;
        let target = (rng.next_u64() as f64 / u64::MAX as f64) * self.total_weight;
        let mut cum = 0.0;
        for (r, &w) in weights.iter().enumerate() {
            cum += w;
            if cum >= target {
                return Some(m.row(r).to_vec());
            }
        }
        Some(m.row(m.rows() - 1).to_vec())
    }
}

fn clamp_positive(params: &mut Dataset, n: usize) -> f64 {
    let mut penalty = 0.0;
    if let Some(v) = &mut params.vector {
        for x in v.iter_mut().take(n) {
            if *x <= 0.0 {
                penalty += 1.0 - *x;
                *x = 1e-6;
            }
        }
    }
    penalty
}

fn clamp_unit_interval(params: &mut Dataset, i: usize) -> f64 {
    let mut penalty = 0.0;
    if let Some(v) = &mut params.vector {
        if let Some(x) = v.get_mut(i) {
            if *x < 0.0 {
                penalty += -*x;
                *x = 0.0;
            } else if *x > 1.0 {
                penalty += *x - 1.0;
                *x = 1.0;
            }
        }
    }
    penalty
}

/// Adapts a `&mut dyn RngCore` trait object to `rand::Rng`, since
/// `rand_distr::Distribution::sample` wants a concrete-ish `Rng` bound
/// that a bare `&mut dyn RngCore` doesn't satisfy directly.
struct RngShim<'a>(&'a mut dyn RngCore);

impl<'a> RngCore for RngShim<'a> {
    fn next_u32(&mut self) -> u32 {
        self.0.next_u32()
    }
    fn next_u64(&mut self) -> u64 {
        self.0.next_u64()
    }
    fn fill_bytes(&mut self, dest: &mut [u8]) {
        self.0.fill_bytes(dest)
    }
    fn try_fill_bytes(&mut self, dest: &mut [u8]) -> Result<(), rand::Error> {
        self.0.try_fill_bytes(dest)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::matrix::Grid;

    fn params(v: Vec<f64>) -> Dataset {
        let mut d = Dataset::new("params");
        d.vector = Some(v);
        d
    }

    #[test]
    fn normal_log_likelihood_peaks_at_mean() {
        let data = { let mut d = Dataset::new("d"); d.vector = Some(vec![0.0]); d };
        let at_mean = Normal.log_likelihood(&data, &params(vec![0.0, 1.0])).unwrap();
        let off_mean = Normal.log_likelihood(&data, &params(vec![5.0, 1.0])).unwrap();
        assert!(at_mean > off_mean);
    }

    #[test]
    fn bernoulli_weighted_loglik_matches_manual() {
        let mut data = Dataset::new("d");
        data.vector = Some(vec![1.0, 0.0]);
        data.weights = Some(vec![2.0, 1.0]);
        let ll = Bernoulli.log_likelihood(&data, &params(vec![0.5])).unwrap();
        assert!((ll - 3.0 * 0.5f64.ln()).abs() < 1e-9);
    }

    #[test]
    fn pmf_log_likelihood_of_known_support() {
        let mut support = Dataset::new("support");
        support.matrix = Some(Grid::from_row_major(2, 1, vec![0.0, 1.0]));
        support.weights = Some(vec![3.0, 1.0]);
        let pmf = Pmf::new(support);
        let mut data = Dataset::new("d");
        data.matrix = Some(Grid::from_row_major(1, 1, vec![0.0]));
        let ll = pmf.log_likelihood(&data, &Dataset::default()).unwrap();
        assert!((ll - (0.75f64).ln()).abs() < 1e-9);
    }

    #[test]
    fn gamma_constraint_clamps_nonpositive_shape() {
        let mut p = params(vec![-1.0, 2.0]);
        let penalty = Gamma.constraint(&mut p);
        assert!(penalty > 0.0);
        assert!(p.vector.unwrap()[0] > 0.0);
    }
}
