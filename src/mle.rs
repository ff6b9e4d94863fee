//! Maximum-likelihood estimation (§4.3): the general-purpose driver used
//! whenever a family does not supply its own [`crate::model::ModelFamily::estimate`].
//!
//! The driver minimizes the negated log-likelihood ("negated shell") over
//! the model's packed parameter vector. Five methods are available
//! ([`crate::settings::MleMethod`]); when the chosen method fails to
//! converge, [`estimate`] restarts from up to three alternate starting
//! points and a dimension-cycling fallback, keeping whichever attempt
//! reached the lowest objective (§4.3 "Restart" and "Dimension cycling").

use std::io::Write as _;

use nalgebra::DVector;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use thiserror::Error;

use crate::cancel::CancellationToken;
use crate::dataset::matrix::Grid;
use crate::dataset::Dataset;
use crate::error::ErrorCode;
use crate::model::Model;
use crate::numerical;
use crate::settings::{MleMethod, MleSettings, SettingsKind};

#[derive(Debug, Error)]
pub enum MleError {
    #[error("model '{0}' has no settings attached for MLE; call set_settings first")]
    MissingSettings(String),
    #[error("estimation cancelled after {0} iterations")]
    Cancelled(usize),
    #[error("{0} failed to converge within {1} iterations (final gradient norm {2:.3e})")]
    NotConverged(&'static str, usize, f64),
    #[error("trace file: {0}")]
    Io(#[from] std::io::Error),
}

impl MleError {
    pub fn code(&self) -> ErrorCode {
        match self {
            MleError::MissingSettings(_) => ErrorCode::MissingSettings,
            MleError::Cancelled(_) => ErrorCode::Input,
            MleError::NotConverged(..) => ErrorCode::Convergence,
            MleError::Io(_) => ErrorCode::Allocation,
        }
    }
}

/// A single optimization attempt's outcome, before the best of several
/// restarts is chosen.
struct Attempt {
    x: Vec<f64>,
    objective: f64,
    iterations: usize,
    converged: bool,
}

/// Estimate `model`'s parameters against `data` by maximum likelihood,
/// returning a new [`Model`] with `parameters` set to the optimum and
/// `info` carrying `log_likelihood`/`aic`/`bic`. Unless
/// `settings.disable_covariance`, `parameters` also gets a `<Covariance>`
/// page (§4.3).
pub fn estimate(model: &Model, data: &Dataset, token: Option<CancellationToken>) -> Result<Model, MleError> {
    let mut out = model.copy();
    out.prep(data).map_err(|e| MleError::MissingSettings(e.to_string()))?;

    if let Some(native) = out.family.estimate(data, &out.settings) {
        out.parameters = native.map_err(|_| MleError::NotConverged("native", 0, 0.0))?;
        finish(&mut out, data, None)?;
        return Ok(out);
    }

    let settings = match model.settings(SettingsKind::Mle) {
        Some(crate::settings::SettingsGroup::Mle(s)) => s.clone(),
        _ => MleSettings::default(),
    };
    let token = token.unwrap_or_default();

    let objective = |x: &[f64]| -> f64 {
        let mut p = out.parameters.clone();
        let _ = p.unpack(x);
        let mut trial = out.clone();
        trial.parameters = p;
        let penalty = trial.constrain();
        match trial.log_likelihood(Some(data)) {
            Ok(ll) => -ll + penalty,
            Err(_) => f64::INFINITY,
        }
    };

    let x0 = out.parameters.pack(false);
    if x0.is_empty() {
        finish(&mut out, data, None)?;
        return Ok(out);
    }

    let mut trace = open_trace(&settings)?;
    let mut attempts = Vec::new();
    attempts.push(run_method(&settings, &objective, &x0, &token, trace.as_mut())?);

    if !attempts[0].converged {
        let starts = restart_starts(&x0, &settings);
        for start in starts {
            if token.is_cancelled() {
                break;
            }
            let a = run_method(&settings, &objective, &start, &token, trace.as_mut())?;
            attempts.push(a);
        }
        attempts.push(dimension_cycling(&objective, &x0, &settings, &token)?);
    }

    let best = attempts
        .into_iter()
        .filter(|a| a.x.iter().all(|v| v.abs() < settings.restart_bound))
        .min_by(|a, b| a.objective.partial_cmp(&b.objective).unwrap_or(std::cmp::Ordering::Equal))
        .ok_or(MleError::NotConverged("restart", settings.max_iterations, f64::NAN))?;

    let mut p = out.parameters.clone();
    let _ = p.unpack(&best.x);
    out.parameters = p;

    finish(&mut out, data, if settings.disable_covariance { None } else { Some(&settings) })?;
    Ok(out)
}

fn finish(out: &mut Model, data: &Dataset, cov_settings: Option<&MleSettings>) -> Result<(), MleError> {
    let ll = out.log_likelihood(Some(data)).unwrap_or(f64::NAN);
    let k = out.parameters.pack(false).len();
    let n = data.nrows().max(1) as f64;
    let aic = -2.0 * ll + 2.0 * k as f64;
    let bic = -2.0 * ll + (k as f64) * n.ln();
    let mut info = Dataset::new("<Info>");
    info.vector = Some(vec![ll, aic, bic]);
    info.names.row_names = vec!["log_likelihood".into(), "aic".into(), "bic".into()];
    out.info = info;

    if let Some(settings) = cov_settings {
        let x = out.parameters.pack(false);
        if !x.is_empty() {
            let neg_ll = |x: &[f64]| -> f64 {
                let mut p = out.parameters.clone();
                let _ = p.unpack(x);
                let mut trial = out.clone();
                trial.parameters = p;
                match trial.log_likelihood(Some(data)) {
                    Ok(ll) => -ll,
                    Err(_) => f64::INFINITY,
                }
            };
            let h = numerical::hessian(neg_ll, &x, settings.delta);
            if let Some(cov) = numerical::covariance_from_neg_hessian(&h) {
                let mut cov_ds = Dataset::new("<Covariance>");
                cov_ds.matrix = Some(Grid::from_row_major(cov.nrows(), cov.ncols(), cov.as_slice().to_vec()));
                out.parameters.add_page(cov_ds, "<Covariance>").ok();
            }
        }
    }
    Ok(())
}

fn open_trace(settings: &MleSettings) -> Result<Option<std::fs::File>, MleError> {
    match &settings.trace_path {
        None => Ok(None),
        Some(path) => Ok(Some(std::fs::OpenOptions::new().create(true).append(true).open(path)?)),
    }
}

fn write_trace(trace: Option<&mut std::fs::File>, iter: usize, x: &[f64], objective: f64) {
    if let Some(f) = trace {
        let coords: Vec<String> = x.iter().map(|v| format!("{v:.6}")).collect();
        let _ = writeln!(f, "{iter}\t{}\t{objective:.6}", coords.join("\t"));
    }
}

fn restart_starts(x0: &[f64], settings: &MleSettings) -> Vec<Vec<f64>> {
    let mut rng = StdRng::seed_from_u64(settings.rng_seed);
    vec![
        vec![0.0; x0.len()],
        x0.iter().map(|&v| v + rng.gen_range(-1.0..1.0) * settings.step_size).collect(),
        x0.iter().map(|&v| v - rng.gen_range(-1.0..1.0) * settings.step_size * 2.0).collect(),
    ]
}

fn run_method(
    settings: &MleSettings,
    objective: &impl Fn(&[f64]) -> f64,
    x0: &[f64],
    token: &CancellationToken,
    trace: Option<&mut std::fs::File>,
) -> Result<Attempt, MleError> {
    match settings.method {
        MleMethod::ConjugateGradientFr => conjugate_gradient(objective, x0, settings, token, trace, true),
        MleMethod::ConjugateGradientPr => conjugate_gradient(objective, x0, settings, token, trace, false),
        MleMethod::Simplex => Ok(nelder_mead(objective, x0, settings, token, trace)),
        MleMethod::Annealing => Ok(simulated_annealing(objective, x0, settings, token, trace)),
        MleMethod::RootFinder => Ok(root_finder(objective, x0, settings, token, trace)),
    }
}

/// Fletcher-Reeves / Polak-Ribiere conjugate gradient with Armijo
/// backtracking line search.
fn conjugate_gradient(
    f: &impl Fn(&[f64]) -> f64,
    x0: &[f64],
    settings: &MleSettings,
    token: &CancellationToken,
    mut trace: Option<&mut std::fs::File>,
    fletcher_reeves: bool,
) -> Result<Attempt, MleError> {
    let mut x = x0.to_vec();
    let mut g = numerical::gradient(f, &x, settings.delta);
    let mut d: Vec<f64> = g.iter().map(|v| -v).collect();
    let mut iterations = 0;
    let mut converged = false;

    while iterations < settings.max_iterations {
        if token.is_cancelled() {
            break;
        }
        let gnorm = numerical::norm(&g);
        if gnorm < settings.tolerance {
            converged = true;
            break;
        }
        let fx = f(&x);
        write_trace(trace.as_deref_mut(), iterations, &x, fx);

        let mut step = settings.step_size;
        let mut next_x = x.clone();
        for _ in 0..40 {
            next_x = x.iter().zip(&d).map(|(xi, di)| xi + step * di).collect();
            let decrease = fx - f(&next_x);
            if decrease >= 0.1 * step * numerical::norm(&g) * numerical::norm(&g).min(1.0) {
                break;
            }
            step *= 0.5;
        }
        let g_new = numerical::gradient(f, &next_x, settings.delta);
        let beta = if fletcher_reeves {
            dot(&g_new, &g_new) / dot(&g, &g).max(1e-300)
        } else {
            dot(&g_new, &sub(&g_new, &g)) / dot(&g, &g).max(1e-300)
        }
        .max(0.0);
        d = g_new.iter().zip(&d).map(|(gi, di)| -gi + beta * di).collect();
        x = next_x;
        g = g_new;
        iterations += 1;
    }

    let objective = f(&x);
    if !converged && !token.is_cancelled() {
        tracing::debug!(iterations, gnorm = numerical::norm(&g), "conjugate gradient did not converge");
    }
    Ok(Attempt { x, objective, iterations, converged })
}

fn dot(a: &[f64], b: &[f64]) -> f64 {
    a.iter().zip(b).map(|(x, y)| x * y).sum()
}

fn sub(a: &[f64], b: &[f64]) -> Vec<f64> {
    a.iter().zip(b).map(|(x, y)| x - y).collect()
}

/// Nelder-Mead simplex: derivative-free, robust to a non-smooth objective.
fn nelder_mead(
    f: &impl Fn(&[f64]) -> f64,
    x0: &[f64],
    settings: &MleSettings,
    token: &CancellationToken,
    mut trace: Option<&mut std::fs::File>,
) -> Attempt {
    let n = x0.len();
    let mut simplex: Vec<Vec<f64>> = vec![x0.to_vec()];
    for i in 0..n {
        let mut p = x0.to_vec();
        p[i] += settings.step_size;
        simplex.push(p);
    }
    let mut values: Vec<f64> = simplex.iter().map(|p| f(p)).collect();
    let mut iterations = 0;
    let mut converged = false;

    while iterations < settings.max_iterations {
        if token.is_cancelled() {
            break;
        }
        let mut order: Vec<usize> = (0..=n).collect();
        order.sort_by(|&a, &b| values[a].partial_cmp(&values[b]).unwrap_or(std::cmp::Ordering::Equal));
        let best = order[0];
        let worst = order[n];
        let second_worst = order[n - 1];

        let spread = (values[worst] - values[best]).abs();
        write_trace(trace.as_deref_mut(), iterations, &simplex[best], values[best]);
        if spread < settings.tolerance {
            converged = true;
            break;
        }

        let centroid: Vec<f64> = (0..n)
            .map(|d| order[..n].iter().map(|&i| simplex[i][d]).sum::<f64>() / n as f64)
            .collect();

        let reflect: Vec<f64> = centroid.iter().zip(&simplex[worst]).map(|(c, w)| c + (c - w)).collect();
        let f_reflect = f(&reflect);

        if f_reflect < values[best] {
            let expand: Vec<f64> = centroid.iter().zip(&reflect).map(|(c, r)| c + 2.0 * (r - c)).collect();
            let f_expand = f(&expand);
            if f_expand < f_reflect {
                simplex[worst] = expand;
                values[worst] = f_expand;
            } else {
                simplex[worst] = reflect;
                values[worst] = f_reflect;
            }
        } else if f_reflect < values[second_worst] {
            simplex[worst] = reflect;
            values[worst] = f_reflect;
        } else {
            let contract: Vec<f64> = centroid.iter().zip(&simplex[worst]).map(|(c, w)| c + 0.5 * (w - c)).collect();
            let f_contract = f(&contract);
            if f_contract < values[worst] {
                simplex[worst] = contract;
                values[worst] = f_contract;
            } else {
                for &i in &order[1..] {
                    simplex[i] = simplex[i].iter().zip(&simplex[best]).map(|(p, b)| b + 0.5 * (p - b)).collect();
                    values[i] = f(&simplex[i]);
                }
            }
        }
        iterations += 1;
    }

    let best = (0..=n).min_by(|&a, &b| values[a].partial_cmp(&values[b]).unwrap()).unwrap();
    Attempt { x: simplex[best].clone(), objective: values[best], iterations, converged }
}

/// Simulated annealing with a geometric temperature schedule.
fn simulated_annealing(
    f: &impl Fn(&[f64]) -> f64,
    x0: &[f64],
    settings: &MleSettings,
    token: &CancellationToken,
    mut trace: Option<&mut std::fs::File>,
) -> Attempt {
    let sched = &settings.annealing;
    let mut rng = StdRng::seed_from_u64(settings.rng_seed);
    let mut x = x0.to_vec();
    let mut fx = f(&x);
    let mut best_x = x.clone();
    let mut best_f = fx;
    let mut temp = sched.initial_temp;
    let mut iterations = 0;

    while temp > sched.min_temp && iterations < settings.max_iterations {
        if token.is_cancelled() {
            break;
        }
        for _ in 0..sched.iters_fixed_temp {
            for _ in 0..sched.tries_per_temp {
                let candidate: Vec<f64> =
                    x.iter().map(|&xi| xi + rng.gen_range(-1.0..1.0) * settings.step_size * sched.k).collect();
                let f_candidate = f(&candidate);
                let accept = f_candidate < fx || rng.gen::<f64>() < ((fx - f_candidate) / temp).exp();
                if accept {
                    x = candidate;
                    fx = f_candidate;
                    if fx < best_f {
                        best_f = fx;
                        best_x = x.clone();
                    }
                }
            }
            iterations += 1;
            write_trace(trace.as_deref_mut(), iterations, &x, fx);
        }
        temp /= sched.damping_mu;
    }

    Attempt { x: best_x, objective: best_f, iterations, converged: iterations < settings.max_iterations }
}

/// Newton root-finder on the gradient, using the numerical Hessian to
/// solve for each step.
fn root_finder(
    f: &impl Fn(&[f64]) -> f64,
    x0: &[f64],
    settings: &MleSettings,
    token: &CancellationToken,
    mut trace: Option<&mut std::fs::File>,
) -> Attempt {
    let mut x = x0.to_vec();
    let mut iterations = 0;
    let mut converged = false;

    while iterations < settings.max_iterations {
        if token.is_cancelled() {
            break;
        }
        let g = numerical::gradient(f, &x, settings.delta);
        let gnorm = numerical::norm(&g);
        write_trace(trace.as_deref_mut(), iterations, &x, f(&x));
        if gnorm < settings.tolerance {
            converged = true;
            break;
        }
        let h = numerical::hessian(f, &x, settings.delta);
        let step = match h.clone().lu().solve(&DVector::from_row_slice(&g)) {
            Some(s) => s,
            None => DVector::from_row_slice(&g) * settings.step_size,
        };
        x = x.iter().zip(step.iter()).map(|(xi, si)| xi - si).collect();
        iterations += 1;
    }

    let objective = f(&x);
    Attempt { x, objective, iterations, converged }
}

/// Dimension-cycling fallback (§4.3): optimize one coordinate at a time
/// via golden-section search, sweeping until a full pass improves the
/// objective by less than `dim_cycle_tolerance`.
fn dimension_cycling(
    f: &impl Fn(&[f64]) -> f64,
    x0: &[f64],
    settings: &MleSettings,
    token: &CancellationToken,
) -> Result<Attempt, MleError> {
    let mut x = x0.to_vec();
    let mut last = f(&x);
    let mut sweep = 0;
    let mut iterations = 0;

    while sweep < settings.dim_cycle_max_sweeps {
        if token.is_cancelled() {
            break;
        }
        for i in 0..x.len() {
            x[i] = golden_section_1d(f, &x, i, x[i] - 1.0, x[i] + 1.0, settings.tolerance);
            iterations += 1;
        }
        let current = f(&x);
        let improvement = last - current;
        last = current;
        sweep += 1;
        if improvement.abs() < settings.dim_cycle_tolerance {
            break;
        }
    }

    Ok(Attempt { x, objective: last, iterations, converged: sweep < settings.dim_cycle_max_sweeps })
}

fn golden_section_1d(f: &impl Fn(&[f64]) -> f64, x: &[f64], dim: usize, mut lo: f64, mut hi: f64, tol: f64) -> f64 {
    const PHI: f64 = 0.6180339887498949;
    let eval = |v: f64| -> f64 {
        let mut xi = x.to_vec();
        xi[dim] = v;
        f(&xi)
    };
    let mut c = hi - PHI * (hi - lo);
    let mut d = lo + PHI * (hi - lo);
    let mut fc = eval(c);
    let mut fd = eval(d);
    while (hi - lo).abs() > tol {
        if fc < fd {
            hi = d;
            d = c;
            fd = fc;
            c = hi - PHI * (hi - lo);
            fc = eval(c);
        } else {
            lo = c;
            c = d;
            fc = fd;
            d = lo + PHI * (hi - lo);
            fd = eval(d);
        }
    }
    (lo + hi) / 2.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Model, ModelFamily};
    use crate::settings::SettingsGroup;
    use std::sync::Arc;

    #[derive(Debug)]
    struct Quadratic;

    impl ModelFamily for Quadratic {
        fn name(&self) -> &str {
            "quadratic"
        }
        fn vsize(&self) -> Option<usize> {
            Some(2)
        }
        fn log_likelihood(&self, _data: &Dataset, params: &Dataset) -> Option<f64> {
            let v = params.vector.as_ref()?;
            Some(-((v[0] - 3.0).powi(2) + (v[1] + 1.0).powi(2)))
        }
    }

    #[test]
    fn conjugate_gradient_finds_quadratic_optimum() {
        let mut model = Model::new(Arc::new(Quadratic));
        let data = Dataset::new("d");
        model.prep(&data).unwrap();
        model.set_settings(SettingsGroup::Mle(MleSettings { max_iterations: 500, ..Default::default() }));
        let fitted = estimate(&model, &data, None).unwrap();
        let p = fitted.parameters.vector.unwrap();
        assert!((p[0] - 3.0).abs() < 0.05, "x0={}", p[0]);
        assert!((p[1] + 1.0).abs() < 0.05, "x1={}", p[1]);
    }

    #[test]
    fn simplex_finds_quadratic_optimum() {
        let mut model = Model::new(Arc::new(Quadratic));
        let data = Dataset::new("d");
        model.prep(&data).unwrap();
        model.set_settings(SettingsGroup::Mle(MleSettings {
            method: MleMethod::Simplex,
            max_iterations: 2000,
            tolerance: 1e-8,
            ..Default::default()
        }));
        let fitted = estimate(&model, &data, None).unwrap();
        let p = fitted.parameters.vector.unwrap();
        assert!((p[0] - 3.0).abs() < 0.1);
        assert!((p[1] + 1.0).abs() < 0.1);
    }

    #[test]
    fn info_page_carries_aic_and_bic() {
        let mut model = Model::new(Arc::new(Quadratic));
        let data = Dataset::new("d");
        model.prep(&data).unwrap();
        let fitted = estimate(&model, &data, None).unwrap();
        assert_eq!(fitted.info.vector.unwrap().len(), 3);
    }
}
