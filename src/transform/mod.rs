//! Model transformers (§4.8): families that wrap one or more inner
//! [`crate::model::Model`]s and present the combination as another model,
//! so the MLE/MCMC/ARMS drivers can operate on the transformed object
//! exactly as they would on a base family.

pub mod compose;
pub mod coordinate;
pub mod cross;
pub mod data_constrain;
pub mod fix_params;
pub mod mixture;
pub mod stack;

use thiserror::Error;

use crate::error::ErrorCode;

#[derive(Debug, Error)]
pub enum TransformError {
    #[error("fix_params: mask length ({0}) does not match inner model's vsize ({1})")]
    FixParamsMaskMismatch(usize, usize),
    #[error("coordinate transform: inverse produced a non-finite Jacobian at the given point")]
    NonFiniteJacobian,
    #[error("data_constrain: the constraint region's Monte Carlo mass estimate was zero after {0} draws")]
    ZeroMassEstimate(usize),
    #[error("compose: component models disagree on parameter count ({0} vs {1})")]
    DimensionMismatch(usize, usize),
    #[error("cross: left and right datasets have different row counts ({0} vs {1})")]
    RowCountMismatch(usize, usize),
    #[error("mixture: weight vector does not sum to 1 (sum = {0})")]
    WeightsNotNormalized(f64),
}

impl TransformError {
    pub fn code(&self) -> ErrorCode {
        match self {
            TransformError::FixParamsMaskMismatch(..) => ErrorCode::Dimension,
            TransformError::NonFiniteJacobian => ErrorCode::Numerical,
            TransformError::ZeroMassEstimate(_) => ErrorCode::Convergence,
            TransformError::DimensionMismatch(..) => ErrorCode::Dimension,
            TransformError::RowCountMismatch(..) => ErrorCode::Dimension,
            TransformError::WeightsNotNormalized(_) => ErrorCode::Input,
        }
    }
}
