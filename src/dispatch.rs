//! Method dispatch registry (§3.3's "specialized methods"): a
//! name-keyed table of overrides for cross-cutting operations — printing
//! a model, predicting a dataset's missing values, estimating its
//! entropy — that most families don't need to customize. A family that
//! wants non-default behavior registers a function under its own name;
//! everything else falls back to the generic implementation below.
//!
//! This plays the role the original's per-model function-pointer
//! dispatch table played for `print`/`predict`/`score`. Here it is a
//! `HashMap` populated once at process start rather than a field wired
//! into every model struct, since these are genuinely process-wide
//! defaults rather than per-instance state.

use std::collections::HashMap;
use std::sync::OnceLock;

use crate::dataset::Dataset;
use crate::model::Model;

type PrintFn = fn(&Model) -> String;
type EntropyFn = fn(&Model, &Dataset) -> Option<f64>;

#[derive(Default)]
struct Registry {
    print: HashMap<&'static str, PrintFn>,
    entropy: HashMap<&'static str, EntropyFn>,
}

static REGISTRY: OnceLock<Registry> = OnceLock::new();

fn registry() -> &'static Registry {
    REGISTRY.get_or_init(|| {
        let mut r = Registry::default();
        r.entropy.insert("pmf", pmf_entropy);
        r
    })
}

/// Human-readable summary of a model: name, parameter count, and
/// (if present) the info page's log-likelihood/AIC/BIC.
fn default_print(model: &Model) -> String {
    let k = model.parameters.pack(false).len();
    match &model.info.vector {
        Some(info) if info.len() >= 3 => {
            format!("{} ({} params): log-likelihood={:.4} aic={:.4} bic={:.4}", model.name, k, info[0], info[1], info[2])
        }
        _ => format!("{} ({} params)", model.name, k),
    }
}

/// Estimate a model's entropy via a Monte Carlo average of `-log p(draw)`
/// over `samples` draws, the generic fallback for any family that
/// doesn't register a closed-form `entropy` override.
fn default_entropy(model: &Model, data: &Dataset) -> Option<f64> {
    let _ = data;
    let mut rng = rand::thread_rng();
    let samples = 2000;
    let mut total = 0.0;
    let mut counted = 0usize;
    for _ in 0..samples {
        let draw = model.family.draw(&model.parameters, &mut rng)?;
        let mut row = Dataset::new("entropy_sample");
        row.vector = Some(draw);
        if let Some(ll) = model.family.log_likelihood(&row, &model.parameters) {
            total -= ll;
            counted += 1;
        }
    }
    if counted == 0 {
        None
    } else {
        Some(total / counted as f64)
    }
}

/// Closed-form discrete entropy for the empirical PMF family, via
/// [`crate::stats::entropy`] over its support weights.
fn pmf_entropy(model: &Model, _data: &Dataset) -> Option<f64> {
    let weights = model.data.as_ref()?.weights.as_ref()?;
    Some(crate::stats::entropy(weights))
}

/// Render `model` using its registered print override, or the generic
/// summary if none is registered.
pub fn print(model: &Model) -> String {
    match registry().print.get(model.family.name()) {
        Some(f) => f(model),
        None => default_print(model),
    }
}

/// Estimate `model`'s entropy, dispatching to a registered override
/// (e.g. the PMF family's closed form) or the Monte Carlo fallback.
pub fn entropy(model: &Model, data: &Dataset) -> Option<f64> {
    match registry().entropy.get(model.family.name()) {
        Some(f) => f(model, data),
        None => default_entropy(model, data),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::families::{Bernoulli, Pmf};
    use crate::dataset::matrix::Grid;
    use std::sync::Arc;

    #[test]
    fn default_print_includes_name_and_param_count() {
        let mut model = Model::new(Arc::new(Bernoulli));
        model.parameters.vector = Some(vec![0.5]);
        let s = print(&model);
        assert!(s.contains("bernoulli"));
        assert!(s.contains('1'));
    }

    #[test]
    fn pmf_entropy_dispatches_to_closed_form() {
        let mut support = Dataset::new("support");
        support.matrix = Some(Grid::from_row_major(2, 1, vec![0.0, 1.0]));
        support.weights = Some(vec![1.0, 1.0]);
        let mut model = Model::new(Arc::new(Pmf::new(support.clone())));
        model.data = Some(support);
        let h = entropy(&model, &Dataset::default()).unwrap();
        assert!((h - std::f64::consts::LN_2).abs() < 1e-9);
    }
}
