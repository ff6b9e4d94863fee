//! Moments & stats utilities (§4.1's component K): weighted mean/variance/
//! covariance/skewness/kurtosis/entropy/percentiles/correlation/KL
//! divergence, plus the sort/percentile helpers component L groups with
//! text/naming utilities.
//!
//! Every moment function accepts an optional weights slice; when absent,
//! unit weights are used (matching the original's convention that an
//! unweighted dataset is a weighted one with all weights equal to 1).

/// Sum of weights, or `n` if `weights` is `None`.
fn weight_sum(n: usize, weights: Option<&[f64]>) -> f64 {
    match weights {
        Some(w) => w.iter().sum(),
        None => n as f64,
    }
}

fn weight_at(i: usize, weights: Option<&[f64]>) -> f64 {
    weights.map(|w| w[i]).unwrap_or(1.0)
}

/// Weighted arithmetic mean. Returns NaN for an empty input.
pub fn weighted_mean(x: &[f64], weights: Option<&[f64]>) -> f64 {
    if x.is_empty() {
        return f64::NAN;
    }
    let wsum = weight_sum(x.len(), weights);
    let acc: f64 = x.iter().enumerate().map(|(i, &xi)| weight_at(i, weights) * xi).sum();
    acc / wsum
}

/// Weighted (population) variance about [`weighted_mean`].
pub fn weighted_variance(x: &[f64], weights: Option<&[f64]>) -> f64 {
    if x.len() < 2 {
        return f64::NAN;
    }
    let mean = weighted_mean(x, weights);
    let wsum = weight_sum(x.len(), weights);
    let acc: f64 = x.iter().enumerate().map(|(i, &xi)| weight_at(i, weights) * (xi - mean).powi(2)).sum();
    acc / (wsum - 1.0)
}

/// Weighted sample covariance between two equal-length series.
pub fn weighted_covariance(x: &[f64], y: &[f64], weights: Option<&[f64]>) -> f64 {
    assert_eq!(x.len(), y.len(), "covariance requires equal-length series");
    if x.len() < 2 {
        return f64::NAN;
    }
    let mx = weighted_mean(x, weights);
    let my = weighted_mean(y, weights);
    let wsum = weight_sum(x.len(), weights);
    let acc: f64 =
        x.iter().zip(y).enumerate().map(|(i, (&xi, &yi))| weight_at(i, weights) * (xi - mx) * (yi - my)).sum();
    acc / (wsum - 1.0)
}

/// Pearson correlation coefficient.
pub fn correlation(x: &[f64], y: &[f64], weights: Option<&[f64]>) -> f64 {
    let cov = weighted_covariance(x, y, weights);
    let sx = weighted_variance(x, weights).sqrt();
    let sy = weighted_variance(y, weights).sqrt();
    cov / (sx * sy)
}

/// Weighted skewness (third standardized moment).
pub fn weighted_skewness(x: &[f64], weights: Option<&[f64]>) -> f64 {
    let mean = weighted_mean(x, weights);
    let sd = weighted_variance(x, weights).sqrt();
    let wsum = weight_sum(x.len(), weights);
    let m3: f64 = x.iter().enumerate().map(|(i, &xi)| weight_at(i, weights) * (xi - mean).powi(3)).sum::<f64>()
        / wsum;
    m3 / sd.powi(3)
}

/// Weighted excess kurtosis (fourth standardized moment minus 3).
pub fn weighted_kurtosis(x: &[f64], weights: Option<&[f64]>) -> f64 {
    let mean = weighted_mean(x, weights);
    let sd = weighted_variance(x, weights).sqrt();
    let wsum = weight_sum(x.len(), weights);
    let m4: f64 = x.iter().enumerate().map(|(i, &xi)| weight_at(i, weights) * (xi - mean).powi(4)).sum::<f64>()
        / wsum;
    m4 / sd.powi(4) - 3.0
}

/// Shannon entropy (base e) of a discrete weight vector normalized to sum 1.
pub fn entropy(weights: &[f64]) -> f64 {
    let total: f64 = weights.iter().sum();
    if total <= 0.0 {
        return f64::NAN;
    }
    -weights
        .iter()
        .filter(|&&w| w > 0.0)
        .map(|&w| {
            let p = w / total;
            p * p.ln()
        })
        .sum::<f64>()
}

/// Kullback-Leibler divergence `sum p_i * ln(p_i / q_i)` between two
/// discrete distributions given as unnormalized weights of equal length.
pub fn kl_divergence(p: &[f64], q: &[f64]) -> f64 {
    assert_eq!(p.len(), q.len(), "KL divergence requires equal-length distributions");
    let psum: f64 = p.iter().sum();
    let qsum: f64 = q.iter().sum();
    p.iter()
        .zip(q)
        .filter(|(&pi, _)| pi > 0.0)
        .map(|(&pi, &qi)| {
            let pn = pi / psum;
            let qn = qi / qsum;
            if qn <= 0.0 {
                f64::INFINITY
            } else {
                pn * (pn / qn).ln()
            }
        })
        .sum()
}

/// Apply `f` to every row of `rows`, splitting the work across the
/// configured thread pool when the `parallel` feature is enabled and
/// [`crate::options::Options::thread_count`] is greater than 1 (§5's
/// "scheduling model": a small worker pool over contiguous row slices,
/// no fine-grained task queue, no work stealing). Falls back to a plain
/// sequential map otherwise.
pub fn map<T, R, F>(rows: &[T], f: F) -> Vec<R>
where
    T: Sync,
    R: Send,
    F: Fn(&T) -> R + Sync + Send,
{
    #[cfg(feature = "parallel")]
    {
        if crate::options::global().thread_count > 1 {
            use rayon::prelude::*;
            return rows.par_iter().map(|r| f(r)).collect();
        }
    }
    rows.iter().map(|r| f(r)).collect()
}

/// Like [`map`], but sums the results — the pattern §5 calls out for
/// tight reduction loops (log-likelihood accumulation, KL divergence over
/// sample draws) that would otherwise re-walk the row slice twice.
pub fn map_sum<T, F>(rows: &[T], f: F) -> f64
where
    T: Sync,
    F: Fn(&T) -> f64 + Sync + Send,
{
    #[cfg(feature = "parallel")]
    {
        if crate::options::global().thread_count > 1 {
            use rayon::prelude::*;
            return rows.par_iter().map(|r| f(r)).sum();
        }
    }
    rows.iter().map(|r| f(r)).sum()
}

/// KL divergence between the empirical distributions of two draw sets
/// sharing the same discrete support, computed via [`map`] over the
/// support's indices so it benefits from the same worker-pool gating as
/// the other row-wise reductions.
pub fn kl_divergence_over_draws(p_weights: &[f64], q_weights: &[f64]) -> f64 {
    let psum: f64 = map_sum(p_weights, |&w| w);
    let qsum: f64 = map_sum(q_weights, |&w| w);
    let indices: Vec<usize> = (0..p_weights.len()).collect();
    map_sum(&indices, |&i| {
        let pi = p_weights[i];
        if pi <= 0.0 {
            return 0.0;
        }
        let pn = pi / psum;
        let qn = q_weights[i] / qsum;
        if qn <= 0.0 {
            f64::INFINITY
        } else {
            pn * (pn / qn).ln()
        }
    })
}

/// Linear-interpolated percentile (`q` in `[0, 1]`) over unsorted data.
/// Matches the "R-7" convention used by most statistics packages.
pub fn percentile(x: &[f64], q: f64) -> f64 {
    if x.is_empty() {
        return f64::NAN;
    }
    let mut sorted: Vec<f64> = x.to_vec();
    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
    if sorted.len() == 1 {
        return sorted[0];
    }
    let rank = q * (sorted.len() - 1) as f64;
    let lo = rank.floor() as usize;
    let hi = rank.ceil() as usize;
    if lo == hi {
        sorted[lo]
    } else {
        let frac = rank - lo as f64;
        sorted[lo] * (1.0 - frac) + sorted[hi] * frac
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unweighted_mean_and_variance() {
        let x = [1.0, 2.0, 3.0, 4.0];
        assert!((weighted_mean(&x, None) - 2.5).abs() < 1e-12);
        assert!((weighted_variance(&x, None) - (5.0 / 3.0)).abs() < 1e-12);
    }

    #[test]
    fn weighted_mean_matches_manual_computation() {
        let x = [0.0, 10.0];
        let w = [3.0, 1.0];
        assert!((weighted_mean(&x, Some(&w)) - 2.5).abs() < 1e-12);
    }

    #[test]
    fn correlation_of_identical_series_is_one() {
        let x = [1.0, 2.0, 3.0, 4.0, 5.0];
        assert!((correlation(&x, &x, None) - 1.0).abs() < 1e-9);
    }

    #[test]
    fn kl_divergence_zero_for_identical_distributions() {
        let p = [0.2, 0.3, 0.5];
        assert!(kl_divergence(&p, &p).abs() < 1e-12);
    }

    #[test]
    fn percentile_matches_known_median() {
        let x = [1.0, 2.0, 3.0, 4.0];
        assert!((percentile(&x, 0.5) - 2.5).abs() < 1e-12);
    }

    #[test]
    fn map_matches_sequential_map() {
        let rows = vec![1.0, 2.0, 3.0, 4.0];
        let doubled = map(&rows, |&x| x * 2.0);
        assert_eq!(doubled, vec![2.0, 4.0, 6.0, 8.0]);
    }

    #[test]
    fn map_sum_matches_sequential_sum() {
        let rows = vec![1.0, 2.0, 3.0, 4.0];
        assert!((map_sum(&rows, |&x| x * x) - 30.0).abs() < 1e-12);
    }

    #[test]
    fn kl_divergence_over_draws_zero_for_identical_weights() {
        let w = [0.2, 0.3, 0.5];
        assert!(kl_divergence_over_draws(&w, &w).abs() < 1e-12);
    }
}
