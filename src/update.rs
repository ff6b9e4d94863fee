//! Bayesian updating (§4.7): posterior = prior times likelihood, closed
//! form for the five conjugate pairs the original shipped natively, MCMC
//! over the unnormalized posterior density for everything else.

use std::sync::Arc;

use thiserror::Error;

use crate::cancel::CancellationToken;
use crate::dataset::Dataset;
use crate::error::ErrorCode;
use crate::families;
use crate::mcmc::{self, McmcError};
use crate::model::{Model, ModelFamily};
use crate::settings::{SettingsGroup, SettingsKind, UpdateSettings};

#[derive(Debug, Error)]
pub enum UpdateError {
    #[error(transparent)]
    Mcmc(#[from] McmcError),
}

impl UpdateError {
    pub fn code(&self) -> ErrorCode {
        match self {
            UpdateError::Mcmc(e) => e.code(),
        }
    }
}

/// A posterior as either a closed-form conjugate update (an exact
/// parametric family) or an MCMC fallback (an empirical draw set).
#[derive(Debug, Clone)]
pub enum Posterior {
    Conjugate(Model),
    Mcmc(mcmc::Draws),
}

/// Update `prior` against `data` observed through `likelihood`, preferring
/// the closed-form conjugate table unless `settings.force_mcmc` or no
/// matching pair is registered (§4.7).
pub fn update(
    prior: &Model,
    likelihood: &Model,
    data: &Dataset,
    token: Option<CancellationToken>,
) -> Result<Posterior, UpdateError> {
    let settings = match prior.settings(SettingsKind::Update) {
        Some(SettingsGroup::Update(s)) => s.clone(),
        _ => UpdateSettings::default(),
    };

    if !settings.force_mcmc {
        if let Some(posterior) = conjugate(prior, likelihood, data) {
            return Ok(Posterior::Conjugate(posterior));
        }
    }

    let mut combined = prior.clone();
    let prior_ll = prior.clone();
    let likelihood_model = likelihood.clone();
    combined.family = Arc::new(JointFamily { prior: prior_ll, likelihood: likelihood_model });
    combined.set_settings(SettingsGroup::Mcmc(settings.mcmc.clone()));
    let draws = mcmc::draw(&combined, data, token)?;
    Ok(Posterior::Mcmc(draws))
}

/// A synthetic family whose log-likelihood is `prior.log_likelihood(params)
/// + likelihood.log_likelihood(data | params)`, letting [`mcmc::draw`]
/// sample the unnormalized posterior without a dedicated driver.
#[derive(Debug)]
struct JointFamily {
    prior: Model,
    likelihood: Model,
}

impl ModelFamily for JointFamily {
    fn name(&self) -> &str {
        "posterior"
    }

    fn vsize(&self) -> Option<usize> {
        self.likelihood.family.vsize()
    }

    fn log_likelihood(&self, data: &Dataset, params: &Dataset) -> Option<f64> {
        let mut candidate_as_data = Dataset::default();
        candidate_as_data.vector = params.vector.clone();
        let prior_term = self.prior.family.log_likelihood(&candidate_as_data, &self.prior.parameters)?;
        let lik_term = self.likelihood.family.log_likelihood(data, params)?;
        Some(prior_term + lik_term)
    }

    fn constraint(&self, params: &mut Dataset) -> f64 {
        self.likelihood.family.constraint(params) + self.prior.family.constraint(params)
    }
}

fn conjugate(prior: &Model, likelihood: &Model, data: &Dataset) -> Option<Model> {
    let pv = prior.parameters.vector.as_ref()?;
    match (prior.family.name(), likelihood.family.name()) {
        ("beta", "bernoulli") => {
            let (alpha, beta) = (pv[0], pv[1]);
            let xs = data.vector.as_ref()?;
            let ws = data.weights.clone();
            let successes: f64 = weighted_sum(xs, ws.as_deref());
            let n: f64 = ws.as_ref().map(|w| w.iter().sum()).unwrap_or(xs.len() as f64);
            Some(posterior_like(prior, vec![alpha + successes, beta + (n - successes)]))
        }
        ("beta", "binomial") => {
            let (alpha, beta) = (pv[0], pv[1]);
            let n_trials = likelihood.family.as_any().downcast_ref::<families::Binomial>()?.n as f64;
            let xs = data.vector.as_ref()?;
            let ws = data.weights.clone();
            let successes: f64 = weighted_sum(xs, ws.as_deref());
            let trials: f64 = ws.as_ref().map(|w| w.iter().sum::<f64>() * n_trials).unwrap_or(xs.len() as f64 * n_trials);
            Some(posterior_like(prior, vec![alpha + successes, beta + (trials - successes)]))
        }
        ("gamma", "exponential") => {
            // Gamma(shape, rate) prior conjugate to an Exponential(rate)
            // likelihood: shape' = shape + n, rate' = rate + sum(x).
            let (shape, rate) = (pv[0], pv[1]);
            let xs = data.vector.as_ref()?;
            let ws = data.weights.clone();
            let n: f64 = ws.as_ref().map(|w| w.iter().sum()).unwrap_or(xs.len() as f64);
            let sum_x: f64 = weighted_sum(xs, ws.as_deref());
            Some(posterior_like(prior, vec![shape + n, rate + sum_x]))
        }
        ("gamma", "poisson") => {
            let (shape, rate) = (pv[0], pv[1]);
            let xs = data.vector.as_ref()?;
            let ws = data.weights.clone();
            let n: f64 = ws.as_ref().map(|w| w.iter().sum()).unwrap_or(xs.len() as f64);
            let sum_x: f64 = weighted_sum(xs, ws.as_deref());
            Some(posterior_like(prior, vec![shape + sum_x, rate + n]))
        }
        ("normal", "normal") => {
            // Normal(mu0, sigma0) prior, observations with known variance
            // sigma_known^2 stashed as the likelihood model's second
            // parameter; standard normal-normal conjugate update.
            let (mu0, sigma0) = (pv[0], pv[1]);
            let sigma_known = likelihood.parameters.vector.as_ref()?.get(1).copied()?;
            let xs = data.vector.as_ref()?;
            let ws = data.weights.clone();
            let n: f64 = ws.as_ref().map(|w| w.iter().sum()).unwrap_or(xs.len() as f64);
            let xbar = weighted_sum(xs, ws.as_deref()) / n.max(1.0);
            let prior_precision = 1.0 / (sigma0 * sigma0);
            let data_precision = n / (sigma_known * sigma_known);
            let post_precision = prior_precision + data_precision;
            let post_mu = (prior_precision * mu0 + data_precision * xbar) / post_precision;
            let post_sigma = (1.0 / post_precision).sqrt();
            Some(posterior_like(prior, vec![post_mu, post_sigma]))
        }
        _ => None,
    }
}

fn weighted_sum(xs: &[f64], weights: Option<&[f64]>) -> f64 {
    xs.iter().enumerate().map(|(i, &x)| weights.map(|w| w[i]).unwrap_or(1.0) * x).sum()
}

fn posterior_like(prior: &Model, new_params: Vec<f64>) -> Model {
    let mut out = prior.copy();
    out.parameters.vector = Some(new_params);
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    fn beta_model(alpha: f64, beta: f64) -> Model {
        let mut m = Model::new(Arc::new(families::Beta));
        m.parameters.vector = Some(vec![alpha, beta]);
        m
    }

    #[test]
    fn beta_bernoulli_conjugate_update_matches_known_formula() {
        let prior = beta_model(2.0, 2.0);
        let likelihood = Model::new(Arc::new(families::Bernoulli));
        let mut data = Dataset::new("coin flips");
        data.vector = Some(vec![1.0, 1.0, 0.0, 1.0]);
        let posterior = update(&prior, &likelihood, &data, None).unwrap();
        match posterior {
            Posterior::Conjugate(m) => {
                let v = m.parameters.vector.unwrap();
                assert!((v[0] - 5.0).abs() < 1e-9); // alpha + 3 successes
                assert!((v[1] - 3.0).abs() < 1e-9); // beta + 1 failure
            }
            Posterior::Mcmc(_) => panic!("expected a closed-form posterior"),
        }
    }

    #[test]
    fn gamma_poisson_conjugate_update_matches_known_formula() {
        let prior = {
            let mut m = Model::new(Arc::new(families::Gamma));
            m.parameters.vector = Some(vec![3.0, 1.0]);
            m
        };
        let likelihood = Model::new(Arc::new(families::Poisson));
        let mut data = Dataset::new("counts");
        data.vector = Some(vec![2.0, 4.0, 3.0]);
        let posterior = update(&prior, &likelihood, &data, None).unwrap();
        match posterior {
            Posterior::Conjugate(m) => {
                let v = m.parameters.vector.unwrap();
                assert!((v[0] - 12.0).abs() < 1e-9); // shape + sum(x) = 3+9
                assert!((v[1] - 4.0).abs() < 1e-9); // rate + n = 1+3
            }
            Posterior::Mcmc(_) => panic!("expected a closed-form posterior"),
        }
    }

    #[test]
    fn normal_normal_conjugate_update_matches_known_formula() {
        let prior = {
            let mut m = Model::new(Arc::new(families::Normal));
            m.parameters.vector = Some(vec![0.0, 10.0]);
            m
        };
        let likelihood = {
            let mut m = Model::new(Arc::new(families::Normal));
            m.parameters.vector = Some(vec![0.0, 2.0]); // sigma_known = 2.0
            m
        };
        let mut data = Dataset::new("d");
        data.vector = Some(vec![1.0, 2.0, 3.0]);
        let posterior = update(&prior, &likelihood, &data, None).unwrap();
        match posterior {
            Posterior::Conjugate(m) => {
                let v = m.parameters.vector.unwrap();
                assert!((v[0] - 1.973_684_210_526_315_8).abs() < 1e-6);
                assert!((v[1] - 1.147_078_669_500_970_5).abs() < 1e-6);
            }
            Posterior::Mcmc(_) => panic!("expected a closed-form posterior"),
        }
    }

    #[test]
    fn unregistered_pair_falls_back_to_mcmc() {
        // Gamma/Gamma isn't in the conjugate table; both families clamp
        // their parameters to the positive reals in `constraint`, so the
        // chain never has to evaluate the density outside its support.
        let prior = {
            let mut m = Model::new(Arc::new(families::Gamma));
            m.parameters.vector = Some(vec![3.0, 1.0]);
            m
        };
        let likelihood = Model::new(Arc::new(families::Gamma));
        let mut data = Dataset::new("d");
        data.vector = Some(vec![1.5, 2.0, 0.8]);
        let posterior = update(&prior, &likelihood, &data, None).unwrap();
        assert!(matches!(posterior, Posterior::Mcmc(_)));
    }
}
