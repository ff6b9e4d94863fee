//! The model object (§3.3): a uniform handle over a statistical family.
//!
//! The original represented a model as a struct of function pointers
//! (`log_likelihood`, `p`, `cdf`, `draw`, `constraint`, `score`, `prep`,
//! `estimate`) plus a `name`/`vsize`/`msize1`/`msize2`/`dsize` shape
//! descriptor and an opaque `more`/`more_size` extension block that callers
//! cast back to their own type. The function-pointer struct becomes a
//! trait object here ([`ModelFamily`]); the opaque extension block is
//! dropped; any family-specific state that block would have carried
//! belongs in a [`crate::settings::SettingsGroup`] instead, since that is
//! already the generalized per-model state-bag. `-1`-sized dimensions (the
//! original's "figure this out from the data at prep time" sentinel) are
//! `None` here rather than a signed size.

use std::sync::Arc;

use rand::RngCore;
use thiserror::Error;

use crate::dataset::Dataset;
use crate::error::ErrorCode;
use crate::settings::{SettingsGroup, SettingsKind};

/// Errors raised directly by [`Model`] lifecycle operations (family
/// methods report through their own call sites via `Option`/`Result`).
#[derive(Debug, Error)]
pub enum ModelError {
    #[error("model '{0}' has no {1} method")]
    Unsupported(String, &'static str),
    #[error("model '{0}' was used before prep")]
    NotPrepped(String),
    #[error("settings group {0:?} not attached to model '{1}'")]
    MissingSettings(SettingsKind, String),
    #[error("dimension mismatch preparing model '{0}': {1}")]
    Dimension(String, String),
}

impl ModelError {
    pub fn code(&self) -> ErrorCode {
        match self {
            ModelError::Unsupported(..) => ErrorCode::MissingPart,
            ModelError::NotPrepped(_) => ErrorCode::Input,
            ModelError::MissingSettings(..) => ErrorCode::MissingSettings,
            ModelError::Dimension(..) => ErrorCode::Dimension,
        }
    }
}

/// The behavior a statistical family supplies. Every method is optional
/// (defaults to `None`/a no-op penalty/an `Unsupported` error at the call
/// site) so a family need only implement what it actually supports,
/// mirroring the original's "null function pointer means unimplemented"
/// contract without the null-pointer-call hazard.
pub trait ModelFamily: Send + Sync + std::fmt::Debug + 'static {
    /// Family name, used in error messages and dataset page titles.
    fn name(&self) -> &str;

    /// Downcast hook for conjugate-update dispatch (§4.7), which needs to
    /// read family-specific fixed constants (e.g. a binomial's `n`) that
    /// don't belong on the generic trait. Defaults to the obvious identity
    /// cast; families rarely need to override this.
    fn as_any(&self) -> &dyn std::any::Any {
        self
    }

    /// Number of free scalar parameters in the packed vector part, if the
    /// family can state it without seeing data (`None` = resolved from the
    /// data's column count at [`Model::prep`] time).
    fn vsize(&self) -> Option<usize> {
        None
    }

    /// Log-likelihood of `data` under `params`. At least one of
    /// `log_likelihood`/`p` should be implemented by any family used with
    /// the MLE or MCMC drivers.
    fn log_likelihood(&self, _data: &Dataset, _params: &Dataset) -> Option<f64> {
        None
    }

    /// Likelihood (not log) of `data` under `params`. Defaults to
    /// exponentiating [`ModelFamily::log_likelihood`].
    fn p(&self, data: &Dataset, params: &Dataset) -> Option<f64> {
        self.log_likelihood(data, params).map(f64::exp)
    }

    /// Cumulative distribution at `data` under `params`, for univariate
    /// families that support it.
    fn cdf(&self, _data: &Dataset, _params: &Dataset) -> Option<f64> {
        None
    }

    /// Draw one observation given `params`, using the supplied RNG.
    fn draw(&self, _params: &Dataset, _rng: &mut dyn RngCore) -> Option<Vec<f64>> {
        None
    }

    /// Penalty added to the negative log-likelihood for a constraint
    /// violation; `0.0` (the default) means unconstrained. A family that
    /// projects `params` back into its support in place should return the
    /// magnitude of the adjustment it made, per §3.3's convention.
    fn constraint(&self, _params: &mut Dataset) -> f64 {
        0.0
    }

    /// Analytic gradient of the log-likelihood with respect to the packed
    /// parameter vector. Absent this, numerical drivers fall back to
    /// [`crate::numerical::gradient`].
    fn score(&self, _data: &Dataset, _params: &Dataset) -> Option<Vec<f64>> {
        None
    }

    /// Allocate a parameter [`Dataset`] shaped for `data`, resolving any
    /// `None` dimension against the data's width. The default allocates a
    /// vector of [`ModelFamily::vsize`] entries (or the data's column
    /// count if `vsize` is `None`).
    fn prep(&self, data: &Dataset) -> Dataset {
        let n = self.vsize().unwrap_or_else(|| data.matrix.as_ref().map(|m| m.cols()).unwrap_or(0));
        let mut params = Dataset::new(format!("<{} params>", self.name()));
        params.vector = Some(vec![0.0; n]);
        params
    }

    /// A family-native closed-form or specialized estimator. Returning
    /// `None` (the default) tells [`crate::mle`] to fall back to its
    /// general-purpose numerical optimizers.
    fn estimate(&self, _data: &Dataset, _settings: &[SettingsGroup]) -> Option<crate::error::Result<Dataset>> {
        None
    }
}

/// A model: a shared family implementation plus the mutable state a
/// particular use of it accumulates (current parameters, info page,
/// attached settings, last error).
#[derive(Debug, Clone)]
pub struct Model {
    pub name: String,
    /// `None` means "figure it out from data at prep time" (the original's
    /// `-1` sentinel on `vsize`/`msize1`/`msize2`/`dsize`).
    pub vsize: Option<usize>,
    pub msize: Option<(usize, usize)>,
    pub dsize: Option<usize>,
    pub parameters: Dataset,
    pub info: Dataset,
    /// The data this model was last prepped/estimated against, if any.
    pub data: Option<Dataset>,
    pub settings: Vec<SettingsGroup>,
    pub family: Arc<dyn ModelFamily>,
}

impl Model {
    /// Wrap a family in a freshly named, unprepped model.
    pub fn new(family: Arc<dyn ModelFamily>) -> Self {
        let name = family.name().to_string();
        Model {
            name,
            vsize: family.vsize(),
            msize: None,
            dsize: None,
            parameters: Dataset::default(),
            info: Dataset::default(),
            data: None,
            settings: Vec::new(),
            family,
        }
    }

    /// Attach (or replace) a settings group of the same kind.
    pub fn set_settings(&mut self, group: SettingsGroup) {
        let kind = group.kind();
        self.settings.retain(|g| g.kind() != kind);
        self.settings.push(group);
    }

    /// Look up a settings group by kind.
    pub fn settings(&self, kind: SettingsKind) -> Option<&SettingsGroup> {
        self.settings.iter().find(|g| g.kind() == kind)
    }

    pub fn settings_mut(&mut self, kind: SettingsKind) -> Option<&mut SettingsGroup> {
        self.settings.iter_mut().find(|g| g.kind() == kind)
    }

    /// Resolve this model's parameter shape against `data` and allocate
    /// `parameters`, calling [`ModelFamily::prep`]. Idempotent: calling it
    /// again with the same data re-allocates from scratch, matching the
    /// original's "prep clobbers existing parameters" contract.
    pub fn prep(&mut self, data: &Dataset) -> Result<(), ModelError> {
        let params = self.family.prep(data);
        let n = params.vector.as_ref().map(|v| v.len());
        if let (Some(want), Some(got)) = (self.vsize, n) {
            if want != got {
                return Err(ModelError::Dimension(
                    self.name.clone(),
                    format!("vsize {want} declared but prep produced {got}"),
                ));
            }
        }
        self.vsize = n.or(self.vsize);
        self.parameters = params;
        self.data = Some(data.clone());
        Ok(())
    }

    /// A deep copy of this model, independent of the original (§3.3
    /// "copy"). The shared `family` trait object is cheap to clone (an
    /// `Arc` bump) since families are stateless logic, not data.
    pub fn copy(&self) -> Model {
        self.clone()
    }

    /// Log-likelihood of `data` (defaulting to the model's last-prepped
    /// data) under the model's current parameters.
    pub fn log_likelihood(&self, data: Option<&Dataset>) -> Result<f64, ModelError> {
        let data = self.resolve_data(data)?;
        self.family
            .log_likelihood(data, &self.parameters)
            .ok_or_else(|| ModelError::Unsupported(self.name.clone(), "log_likelihood"))
    }

    pub fn p(&self, data: Option<&Dataset>) -> Result<f64, ModelError> {
        let data = self.resolve_data(data)?;
        self.family.p(data, &self.parameters).ok_or_else(|| ModelError::Unsupported(self.name.clone(), "p"))
    }

    pub fn cdf(&self, data: Option<&Dataset>) -> Result<f64, ModelError> {
        let data = self.resolve_data(data)?;
        self.family.cdf(data, &self.parameters).ok_or_else(|| ModelError::Unsupported(self.name.clone(), "cdf"))
    }

    pub fn draw(&self, rng: &mut dyn RngCore) -> Result<Vec<f64>, ModelError> {
        self.family.draw(&self.parameters, rng).ok_or_else(|| ModelError::Unsupported(self.name.clone(), "draw"))
    }

    /// Apply the family's constraint to this model's own parameters in
    /// place, returning the penalty/adjustment magnitude.
    pub fn constrain(&mut self) -> f64 {
        self.family.constraint(&mut self.parameters)
    }

    pub fn score(&self, data: Option<&Dataset>) -> Result<Vec<f64>, ModelError> {
        let data = self.resolve_data(data)?;
        self.family.score(data, &self.parameters).ok_or_else(|| ModelError::Unsupported(self.name.clone(), "score"))
    }

    fn resolve_data<'a>(&'a self, data: Option<&'a Dataset>) -> Result<&'a Dataset, ModelError> {
        data.or(self.data.as_ref()).ok_or_else(|| ModelError::NotPrepped(self.name.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug)]
    struct Stub;

    impl ModelFamily for Stub {
        fn name(&self) -> &str {
            "stub"
        }
        fn vsize(&self) -> Option<usize> {
            Some(2)
        }
        fn log_likelihood(&self, _data: &Dataset, params: &Dataset) -> Option<f64> {
            Some(params.vector.as_ref()?.iter().sum())
        }
    }

    #[test]
    fn prep_allocates_declared_vsize() {
        let mut model = Model::new(Arc::new(Stub));
        let data = Dataset::new("d");
        model.prep(&data).unwrap();
        assert_eq!(model.parameters.vector.as_ref().unwrap().len(), 2);
    }

    #[test]
    fn p_defaults_to_exp_log_likelihood() {
        let mut model = Model::new(Arc::new(Stub));
        let data = Dataset::new("d");
        model.prep(&data).unwrap();
        model.parameters.vector = Some(vec![0.0, 0.0]);
        assert!((model.p(None).unwrap() - 1.0).abs() < 1e-12);
    }

    #[test]
    fn unsupported_method_reports_unsupported() {
        let model = Model::new(Arc::new(Stub));
        let err = model.draw(&mut rand::thread_rng()).unwrap_err();
        assert!(matches!(err, ModelError::Unsupported(_, "draw")));
    }

    #[test]
    fn unprepped_model_reports_not_prepped() {
        let model = Model::new(Arc::new(Stub));
        let err = model.log_likelihood(None).unwrap_err();
        assert!(matches!(err, ModelError::NotPrepped(_)));
    }
}
