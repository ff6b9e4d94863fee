//! Finite mixture models (§4.8 "mixture"): a weighted combination of `k`
//! component models where the component assignment is latent (contrast
//! with [`super::stack`], where it is observed). The packed parameter
//! vector is `[w_0, .., w_{k-2}, params(component 0), .., params(component
//! k-1)]`; the last weight is `1 - sum(the others)` so the free weights
//! always describe a valid simplex.

use rand::Rng;

use crate::dataset::Dataset;
use crate::model::{Model, ModelFamily};

use super::TransformError;

#[derive(Debug, Clone)]
pub struct Mixture {
    components: Vec<Model>,
    component_vsizes: Vec<usize>,
}

impl Mixture {
    pub fn new(components: Vec<Model>) -> Result<Self, TransformError> {
        if components.is_empty() {
            return Err(TransformError::WeightsNotNormalized(0.0));
        }
        let component_vsizes = components.iter().map(|m| m.family.vsize().unwrap_or(0)).collect();
        Ok(Mixture { components, component_vsizes })
    }

    fn unpack<'a>(&self, packed: &'a [f64]) -> (Vec<f64>, Vec<&'a [f64]>) {
        let k = self.components.len();
        let free_weights = &packed[..k - 1];
        let mut weights: Vec<f64> = free_weights.to_vec();
        weights.push((1.0 - free_weights.iter().sum::<f64>()).max(0.0));

        let mut comp_params = Vec::with_capacity(k);
        let mut cursor = k - 1;
        for &vsize in &self.component_vsizes {
            comp_params.push(&packed[cursor..cursor + vsize]);
            cursor += vsize;
        }
        (weights, comp_params)
    }
}

impl ModelFamily for Mixture {
    fn name(&self) -> &str {
        "mixture"
    }

    fn vsize(&self) -> Option<usize> {
        Some(self.components.len() - 1 + self.component_vsizes.iter().sum::<usize>())
    }

    fn log_likelihood(&self, data: &Dataset, params: &Dataset) -> Option<f64> {
        let packed = params.vector.as_ref()?;
        let (weights, comp_params) = self.unpack(packed);
        let values = data.vector.as_ref()?;
        let mut total = 0.0;
        for &x in values {
            let mut row = Dataset::new("mixture_row");
            row.vector = Some(vec![x]);
            let log_terms: Option<Vec<f64>> = self
                .components
                .iter()
                .zip(&comp_params)
                .zip(&weights)
                .map(|((comp, &cp), &w)| {
                    let mut p = comp.parameters.clone();
                    p.vector = Some(cp.to_vec());
                    comp.family.log_likelihood(&row, &p).map(|ll| w.max(1e-300).ln() + ll)
                })
                .collect();
            total += log_sum_exp(&log_terms?);
        }
        Some(total)
    }

    fn draw(&self, params: &Dataset, rng: &mut dyn rand::RngCore) -> Option<Vec<f64>> {
        let packed = params.vector.as_ref()?;
        let (weights, comp_params) = self.unpack(packed);
        let mut shim = ShimRng(rng);
        let target: f64 = shim.gen();
        let mut cum = 0.0;
        let mut chosen = weights.len() - 1;
        for (i, &w) in weights.iter().enumerate() {
            cum += w;
            if target <= cum {
                chosen = i;
                break;
            }
        }
        let mut p = self.components[chosen].parameters.clone();
        p.vector = Some(comp_params[chosen].to_vec());
        self.components[chosen].family.draw(&p, shim.0)
    }

    /// Penalizes negative free weights (clamping them to zero) and sums
    /// each component's own constraint against its parameter slice,
    /// writing back any adjustment the component made.
    fn constraint(&self, params: &mut Dataset) -> f64 {
        let Some(mut packed) = params.vector.clone() else { return 0.0 };
        let k = self.components.len();
        let mut penalty = 0.0;

        if k > 1 {
            let (free_weights, _) = packed.split_at_mut(k - 1);
            for w in free_weights.iter_mut() {
                if *w < 0.0 {
                    penalty += -*w;
                    *w = 0.0;
                }
            }
        }

        let mut cursor = k.saturating_sub(1);
        for (component, &vsize) in self.components.iter().zip(&self.component_vsizes) {
            let mut comp_params = component.parameters.clone();
            comp_params.vector = Some(packed[cursor..cursor + vsize].to_vec());
            penalty += component.family.constraint(&mut comp_params);
            if let Some(adjusted) = comp_params.vector {
                packed[cursor..cursor + vsize].copy_from_slice(&adjusted);
            }
            cursor += vsize;
        }

        params.vector = Some(packed);
        penalty
    }
}

fn log_sum_exp(terms: &[f64]) -> f64 {
    let max = terms.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
    if !max.is_finite() {
        return max;
    }
    max + terms.iter().map(|t| (t - max).exp()).sum::<f64>().ln()
}

struct ShimRng<'a>(&'a mut dyn rand::RngCore);

impl<'a> rand::RngCore for ShimRng<'a> {
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
    use crate::families::Normal;
    use std::sync::Arc;

    #[test]
    fn two_component_mixture_log_likelihood_is_finite() {
        let components = vec![Model::new(Arc::new(Normal)), Model::new(Arc::new(Normal))];
        let mixture = Mixture::new(components).unwrap();
        assert_eq!(mixture.vsize(), Some(5)); // 1 weight + 2 + 2 params

        let mut params = Dataset::new("p");
        params.vector = Some(vec![0.5, -3.0, 1.0, 3.0, 1.0]);
        let mut data = Dataset::new("d");
        data.vector = Some(vec![-3.1, -2.9, 2.9, 3.1]);
        let ll = mixture.log_likelihood(&data, &params).unwrap();
        assert!(ll.is_finite());
    }

    #[test]
    fn single_component_mixture_matches_the_raw_component() {
        let component = Model::new(Arc::new(Normal));
        let mixture = Mixture::new(vec![component]).unwrap();
        assert_eq!(mixture.vsize(), Some(2)); // no free weights, just the one component's params

        let mut params = Dataset::new("p");
        params.vector = Some(vec![0.5, 2.0]);
        let mut data = Dataset::new("d");
        data.vector = Some(vec![-1.0, 0.0, 1.5]);

        let mixture_ll = mixture.log_likelihood(&data, &params).unwrap();
        let solo_ll = Normal.log_likelihood(&data, &params).unwrap();
        assert!((mixture_ll - solo_ll).abs() < 1e-9);
    }

    #[test]
    fn constraint_clamps_negative_weights_and_penalizes() {
        let components = vec![Model::new(Arc::new(Normal)), Model::new(Arc::new(Normal))];
        let mixture = Mixture::new(components).unwrap();
        let mut params = Dataset::new("p");
        params.vector = Some(vec![-0.2, 0.0, 1.0, 0.0, 1.0]);
        let penalty = mixture.constraint(&mut params);
        assert!(penalty > 0.0);
        assert_eq!(params.vector.unwrap()[0], 0.0);
    }
}
