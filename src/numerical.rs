//! Numerical differentiation (§4.2): central-difference gradients and
//! Hessians over a packed parameter vector, used by [`crate::mle`] and
//! [`crate::mcmc`] whenever a family does not supply [`crate::model::ModelFamily::score`].
//!
//! Packed vectors/matrices cross into [`nalgebra`] here, at the boundary
//! where linear algebra (solving for a Newton step, inverting a Hessian
//! for a covariance estimate) actually happens; the dataset container
//! itself stays a plain `Vec`-backed grid (see [`crate::dataset::matrix`]).

use nalgebra::{DMatrix, DVector};

/// Central-difference gradient of `f` at `x`, one extra evaluation of `f`
/// per coordinate in each direction (`2n` calls total).
pub fn gradient(f: impl Fn(&[f64]) -> f64, x: &[f64], delta: f64) -> Vec<f64> {
    let mut g = vec![0.0; x.len()];
    let mut xp = x.to_vec();
    for i in 0..x.len() {
        xp[i] = x[i] + delta;
        let plus = f(&xp);
        xp[i] = x[i] - delta;
        let minus = f(&xp);
        xp[i] = x[i];
        g[i] = (plus - minus) / (2.0 * delta);
    }
    g
}

/// Central-difference Hessian of `f` at `x` (`O(n^2)` evaluations),
/// symmetrized by averaging the two off-diagonal finite-difference
/// estimates.
pub fn hessian(f: impl Fn(&[f64]) -> f64, x: &[f64], delta: f64) -> DMatrix<f64> {
    let n = x.len();
    let mut h = DMatrix::zeros(n, n);
    let f0 = f(x);
    let mut xp = x.to_vec();
    for i in 0..n {
        for j in i..n {
            let v = if i == j {
                xp[i] = x[i] + delta;
                let plus = f(&xp);
                xp[i] = x[i] - delta;
                let minus = f(&xp);
                xp[i] = x[i];
                (plus - 2.0 * f0 + minus) / (delta * delta)
            } else {
                xp[i] = x[i] + delta;
                xp[j] = x[j] + delta;
                let pp = f(&xp);
                xp[j] = x[j] - delta;
                let pm = f(&xp);
                xp[i] = x[i] - delta;
                let mm = f(&xp);
                xp[j] = x[j] + delta;
                let mp = f(&xp);
                xp[i] = x[i];
                xp[j] = x[j];
                (pp - pm - mp + mm) / (4.0 * delta * delta)
            };
            h[(i, j)] = v;
            h[(j, i)] = v;
        }
    }
    h
}

/// Invert a (presumed positive-definite) Hessian of the *negative*
/// log-likelihood to produce a covariance estimate, the standard MLE
/// asymptotic-covariance approximation (§4.3 "Covariance page"). Returns
/// `None` if the matrix is singular to working precision.
pub fn covariance_from_neg_hessian(neg_hessian: &DMatrix<f64>) -> Option<DMatrix<f64>> {
    neg_hessian.clone().try_inverse()
}

/// Euclidean norm of a slice, used by convergence tests throughout the
/// optimization drivers.
pub fn norm(v: &[f64]) -> f64 {
    DVector::from_row_slice(v).norm()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn gradient_of_quadratic_matches_analytic() {
        // f(x) = x0^2 + 2*x1^2, grad = (2*x0, 4*x1)
        let f = |x: &[f64]| x[0] * x[0] + 2.0 * x[1] * x[1];
        let g = gradient(f, &[3.0, 1.0], 1e-5);
        assert!((g[0] - 6.0).abs() < 1e-3);
        assert!((g[1] - 4.0).abs() < 1e-3);
    }

    #[test]
    fn hessian_of_quadratic_is_constant() {
        let f = |x: &[f64]| x[0] * x[0] + 2.0 * x[1] * x[1];
        let h = hessian(f, &[3.0, 1.0], 1e-3);
        assert!((h[(0, 0)] - 2.0).abs() < 1e-2);
        assert!((h[(1, 1)] - 4.0).abs() < 1e-2);
        assert!(h[(0, 1)].abs() < 1e-2);
    }

    #[test]
    fn covariance_inverts_identity_to_identity() {
        let h = DMatrix::<f64>::identity(2, 2);
        let cov = covariance_from_neg_hessian(&h).unwrap();
        assert!((cov[(0, 0)] - 1.0).abs() < 1e-12);
    }
}
