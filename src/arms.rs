//! Adaptive rejection Metropolis sampling (§4.5): univariate draws from an
//! arbitrary (not necessarily log-concave) log-density via a piecewise
//! linear envelope over a growing set of support points.
//!
//! Each support point `x_i` contributes its log-density `h(x_i)` and a
//! numerical derivative; consecutive points' tangent lines intersect to
//! bound the log-density from above (the "upper hull") and the chord
//! between them bounds it from below inside their span (the "squeeze").
//! A candidate is drawn from the piecewise-exponential upper hull,
//! accepted outright if it passes the cheap squeeze test, and otherwise
//! evaluated against the true density; accepted points are folded into
//! the support set, tightening the envelope for later draws (§4.5
//! "Envelope" and "Cumulate"). When the squeeze/true-density test fails
//! and `do_metropolis` is set, a Metropolis correction against the
//! previous state takes over instead of rejecting outright, which is what
//! lets this sampler handle densities that are not log-concave.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use thiserror::Error;

use crate::error::ErrorCode;
use crate::settings::ArmsSettings;

#[derive(Debug, Error)]
pub enum ArmsError {
    #[error("log-density returned a non-finite value at x={0}")]
    NonFinite(f64),
    #[error("exceeded {0} rejections without an accepted draw")]
    TooManyRejections(usize),
    #[error("fewer than two finite initial points were supplied")]
    NotEnoughPoints,
}

impl ArmsError {
    pub fn code(&self) -> ErrorCode {
        match self {
            ArmsError::NonFinite(_) => ErrorCode::Numerical,
            ArmsError::TooManyRejections(_) => ErrorCode::Convergence,
            ArmsError::NotEnoughPoints => ErrorCode::Input,
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct Point {
    x: f64,
    h: f64,
    hprime: f64,
}

/// The sampler's state: a sorted set of support points bounding a
/// log-density over `[bounds.0, bounds.1]`.
#[derive(Debug, Clone)]
pub struct Envelope {
    points: Vec<Point>,
    bounds: (f64, f64),
    npoint_max: usize,
}

impl Envelope {
    /// Build an initial envelope from `settings.initial_points`, evaluating
    /// `log_density` (and a central-difference derivative) at each.
    pub fn new(log_density: &impl Fn(f64) -> f64, settings: &ArmsSettings) -> Result<Self, ArmsError> {
        let mut points: Vec<Point> = settings
            .initial_points
            .iter()
            .map(|&x| {
                let h = log_density(x);
                let delta = 1e-4 * (1.0 + x.abs());
                let hprime = (log_density(x + delta) - log_density(x - delta)) / (2.0 * delta);
                Point { x, h, hprime }
            })
            .collect();
        points.retain(|p| p.h.is_finite());
        points.sort_by(|a, b| a.x.partial_cmp(&b.x).unwrap());
        if points.len() < 2 {
            return Err(ArmsError::NotEnoughPoints);
        }
        Ok(Envelope { points, bounds: settings.bounds, npoint_max: settings.npoint })
    }

    /// Upper-hull log-value at `x`: the minimum over all tangent lines
    /// through the bracketing support points (§4.5 "Envelope").
    fn upper(&self, x: f64) -> f64 {
        self.points.iter().map(|p| p.h + p.hprime * (x - p.x)).fold(f64::INFINITY, f64::min)
    }

    /// Lower-hull (squeeze) log-value at `x`: the chord between the two
    /// support points bracketing `x`, or `-infinity` outside their span.
    fn lower(&self, x: f64) -> f64 {
        for w in self.points.windows(2) {
            let (a, b) = (w[0], w[1]);
            if x >= a.x && x <= b.x {
                let t = (x - a.x) / (b.x - a.x);
                return a.h * (1.0 - t) + b.h * t;
            }
        }
        f64::NEG_INFINITY
    }

    /// Draw a candidate from the piecewise-exponential upper hull by
    /// sampling a segment proportional to its mass, then inverting the
    /// exponential CDF within it.
    fn sample_upper(&self, rng: &mut StdRng) -> f64 {
        let lo = self.bounds.0;
        let hi = self.bounds.1;
        let mut segment_bounds: Vec<f64> = vec![lo];
        segment_bounds.extend(self.points.iter().map(|p| p.x).filter(|&x| x > lo && x < hi));
        segment_bounds.push(hi);
        segment_bounds.dedup_by(|a, b| (*a - *b).abs() < 1e-12);

        let mut masses = Vec::with_capacity(segment_bounds.len().saturating_sub(1));
        for w in segment_bounds.windows(2) {
            let (a, b) = (w[0], w[1]);
            let mid = 0.5 * (a + b);
            let slope = self.upper_slope(mid);
            let ha = self.upper(a);
            let hb = self.upper(b);
            let mass = if slope.abs() < 1e-10 {
                (b - a) * ha.exp()
            } else {
                ((hb.exp() - ha.exp()) / slope).abs()
            };
            masses.push(mass.max(1e-300));
        }
        let total: f64 = masses.iter().sum();
        let target = rng.gen::<f64>() * total;
        let mut cum = 0.0;
        for (i, &m) in masses.iter().enumerate() {
            cum += m;
            if cum >= target {
                let (a, b) = (segment_bounds[i], segment_bounds[i + 1]);
                return a + (b - a) * rng.gen::<f64>();
            }
        }
        segment_bounds[segment_bounds.len() - 2]
    }

    fn upper_slope(&self, x: f64) -> f64 {
        self.points
            .iter()
            .min_by(|a, b| {
                let va = a.h + a.hprime * (x - a.x);
                let vb = b.h + b.hprime * (x - b.x);
                va.partial_cmp(&vb).unwrap()
            })
            .map(|p| p.hprime)
            .unwrap_or(0.0)
    }

    fn insert(&mut self, log_density: &impl Fn(f64) -> f64, x: f64, h: f64) {
        let delta = 1e-4 * (1.0 + x.abs());
        let hprime = (log_density(x + delta) - log_density(x - delta)) / (2.0 * delta);
        let pos = self.points.partition_point(|p| p.x < x);
        self.points.insert(pos, Point { x, h, hprime });
        if self.points.len() > self.npoint_max {
            // Drop the point contributing least to the envelope's tightness:
            // the one furthest from both neighbors' tangent intersection.
            self.points.remove(self.points.len() / 2);
        }
    }
}

/// Draw one sample from `log_density` (up to an additive constant) using
/// ARMS, starting from and updating `envelope` in place so repeated calls
/// tighten the bound (§4.5's "cumulate" pass).
pub fn draw(
    log_density: impl Fn(f64) -> f64,
    envelope: &mut Envelope,
    previous: f64,
    settings: &ArmsSettings,
    rng: &mut StdRng,
) -> Result<f64, ArmsError> {
    for _ in 0..settings.max_rejections {
        let x = envelope.sample_upper(rng);
        let u: f64 = rng.gen();
        let log_u = u.ln();
        let upper = envelope.upper(x);
        let lower = envelope.lower(x);

        if log_u <= lower - upper {
            return Ok(x);
        }

        let h = log_density(x);
        if !h.is_finite() && h != f64::NEG_INFINITY {
            return Err(ArmsError::NonFinite(x));
        }
        let accept_true = log_u <= h - upper;
        envelope.insert(&log_density, x, h);

        if accept_true {
            return Ok(x);
        }

        if settings.do_metropolis {
            let h_prev = log_density(previous);
            let upper_prev = envelope.upper(previous);
            let log_alpha = (h - upper.min(h)) - (h_prev - upper_prev.min(h_prev));
            if log_alpha >= 0.0 || log_u <= log_alpha {
                return Ok(x);
            }
        }
    }
    Err(ArmsError::TooManyRejections(settings.max_rejections))
}

/// Convenience entry point building a fresh envelope and RNG from a seed;
/// most callers that draw many samples should build [`Envelope`] once and
/// call [`draw`] repeatedly instead.
pub fn draw_once(log_density: impl Fn(f64) -> f64, settings: &ArmsSettings, seed: u64) -> Result<f64, ArmsError> {
    let mut envelope = Envelope::new(&log_density, settings)?;
    let mut rng = StdRng::seed_from_u64(seed);
    let start = settings.initial_points[0];
    draw(log_density, &mut envelope, start, settings, &mut rng)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn draws_from_standard_normal_log_density_stay_bounded() {
        let log_density = |x: f64| -0.5 * x * x;
        let settings = ArmsSettings { bounds: (-8.0, 8.0), ..Default::default() };
        let mut envelope = Envelope::new(&log_density, &settings).unwrap();
        let mut rng = StdRng::seed_from_u64(42);
        let mut draws = Vec::new();
        let mut prev = 0.0;
        for _ in 0..200 {
            let x = draw(log_density, &mut envelope, prev, &settings, &mut rng).unwrap();
            draws.push(x);
            prev = x;
        }
        let mean: f64 = draws.iter().sum::<f64>() / draws.len() as f64;
        assert!(mean.abs() < 0.6, "mean={mean}");
    }

    #[test]
    fn too_few_initial_points_is_rejected() {
        let log_density = |x: f64| -0.5 * x * x;
        let settings = ArmsSettings { initial_points: vec![0.0], ..Default::default() };
        let err = Envelope::new(&log_density, &settings).unwrap_err();
        assert!(matches!(err, ArmsError::NotEnoughPoints));
    }
}
