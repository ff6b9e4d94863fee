//! Model stacking (§4.8 "stack"): two uncorrelated models bound into one.
//! Both normally see the same data; if a `splitpage` name is configured
//! and present on the input, the first model instead sees the page chain
//! up to (but excluding) the split page and the second sees the split
//! page itself. Log-likelihood and `p` are the obvious coordinate-wise
//! combinations (sum, and — for free via the default `exp(log_likelihood)`
//! — product); `draw` concatenates both sub-draws, so `dsize = dsize1 +
//! dsize2`.

use crate::dataset::Dataset;
use crate::model::{Model, ModelFamily};

#[derive(Debug, Clone)]
pub struct Stack {
    model1: Model,
    model2: Model,
    model1_vsize: usize,
    splitpage: Option<String>,
}

impl Stack {
    pub fn new(model1: Model, model2: Model) -> Self {
        let model1_vsize = model1.family.vsize().unwrap_or(0);
        Stack { model1, model2, model1_vsize, splitpage: None }
    }

    /// Configure a page name at which `data` is split between the two
    /// models instead of sharing it whole.
    pub fn with_splitpage(mut self, title: impl Into<String>) -> Self {
        self.splitpage = Some(title.into());
        self
    }

    fn split<'a>(&self, packed: &'a [f64]) -> (&'a [f64], &'a [f64]) {
        packed.split_at(self.model1_vsize.min(packed.len()))
    }

    fn resolve(&self, data: &Dataset) -> (Dataset, Dataset) {
        if let Some(title) = &self.splitpage {
            if let Some(split) = split_at_page(data, title) {
                return split;
            }
        }
        (data.clone(), data.clone())
    }
}

/// Split `data`'s page chain at the page titled `splitpage`: the first
/// dataset keeps `data`'s own body plus every page before the split, the
/// second is the split page itself plus every page after it.
fn split_at_page(data: &Dataset, splitpage: &str) -> Option<(Dataset, Dataset)> {
    let idx = data.pages().iter().position(|p| p.names.title == splitpage)?;
    let mut first = data.clone();
    let mut pages = first.take_pages();
    let mut second = pages.remove(idx);
    let trailing = pages.split_off(idx);
    for page in pages {
        let title = page.names.title.clone();
        first.add_page(page, title).ok()?;
    }
    for page in trailing {
        let title = page.names.title.clone();
        second.add_page(page, title).ok()?;
    }
    Some((first, second))
}

impl ModelFamily for Stack {
    fn name(&self) -> &str {
        "stack"
    }

    fn vsize(&self) -> Option<usize> {
        Some(self.model1_vsize + self.model2.family.vsize().unwrap_or(0))
    }

    fn log_likelihood(&self, data: &Dataset, params: &Dataset) -> Option<f64> {
        let packed = params.vector.as_ref()?;
        let (a, b) = self.split(packed);
        let (data1, data2) = self.resolve(data);

        let mut p1 = self.model1.parameters.clone();
        p1.vector = Some(a.to_vec());
        let mut p2 = self.model2.parameters.clone();
        p2.vector = Some(b.to_vec());

        let ll1 = self.model1.family.log_likelihood(&data1, &p1)?;
        let ll2 = self.model2.family.log_likelihood(&data2, &p2)?;
        Some(ll1 + ll2)
    }

    fn draw(&self, params: &Dataset, rng: &mut dyn rand::RngCore) -> Option<Vec<f64>> {
        let packed = params.vector.as_ref()?;
        let (a, b) = self.split(packed);
        let mut p1 = self.model1.parameters.clone();
        p1.vector = Some(a.to_vec());
        let mut p2 = self.model2.parameters.clone();
        p2.vector = Some(b.to_vec());

        let mut combined = self.model1.family.draw(&p1, rng)?;
        combined.extend(self.model2.family.draw(&p2, rng)?);
        Some(combined)
    }

    fn constraint(&self, params: &mut Dataset) -> f64 {
        let Some(packed) = params.vector.clone() else { return 0.0 };
        let (a, b) = self.split(&packed);
        let mut p1 = self.model1.parameters.clone();
        p1.vector = Some(a.to_vec());
        let mut p2 = self.model2.parameters.clone();
        p2.vector = Some(b.to_vec());
        let penalty1 = self.model1.family.constraint(&mut p1);
        let penalty2 = self.model2.family.constraint(&mut p2);
        let mut merged = p1.vector.unwrap_or_default();
        merged.extend(p2.vector.unwrap_or_default());
        params.vector = Some(merged);
        penalty1 + penalty2
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::families::Normal;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use std::sync::Arc;

    #[test]
    fn shared_data_log_likelihood_sums_both_models() {
        let stacked = Stack::new(Model::new(Arc::new(Normal)), Model::new(Arc::new(Normal)));

        let mut data = Dataset::new("d");
        data.vector = Some(vec![-1.0, -2.0, 1.0, 2.0]);
        let mut params = Dataset::new("p");
        params.vector = Some(vec![0.0, 1.0, 0.0, 1.0]);

        let ll = stacked.log_likelihood(&data, &params).unwrap();
        let solo = Normal.log_likelihood(&data, &{
            let mut p = Dataset::new("p");
            p.vector = Some(vec![0.0, 1.0]);
            p
        });
        assert!((ll - 2.0 * solo.unwrap()).abs() < 1e-9);
    }

    #[test]
    fn draw_concatenates_both_sub_models() {
        let stacked = Stack::new(Model::new(Arc::new(Normal)), Model::new(Arc::new(Normal)));
        let mut params = Dataset::new("p");
        params.vector = Some(vec![0.0, 1.0, 10.0, 1.0]);
        let mut rng = StdRng::seed_from_u64(4);
        let draw = stacked.draw(&params, &mut rng).unwrap();
        assert_eq!(draw.len(), 2);
    }

    #[test]
    fn splitpage_sends_the_page_chain_and_the_split_page_separately() {
        let stacked = Stack::new(Model::new(Arc::new(Normal)), Model::new(Arc::new(Normal)))
            .with_splitpage("second_half");

        let mut data = Dataset::new("d");
        data.vector = Some(vec![-1.0, -2.0]);
        let mut second_half = Dataset::new("second_half");
        second_half.vector = Some(vec![5.0, 6.0]);
        data.add_page(second_half, "second_half").unwrap();

        let mut params = Dataset::new("p");
        params.vector = Some(vec![0.0, 1.0, 5.5, 1.0]);
        let ll = stacked.log_likelihood(&data, &params).unwrap();
        assert!(ll.is_finite());
    }
}
