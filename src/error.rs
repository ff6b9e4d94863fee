//! Crate-wide error taxonomy.
//!
//! The original C library stamped a single-character status code (`'d'`
//! dimension, `'a'` allocation, `'p'` missing part, `'s'` missing settings,
//! `'c'` cyclic reference, `'i'` bad input) onto the dataset or model that
//! failed and let the caller keep going with a partially built object
//! (§7 of the design notes). Idiomatic Rust prefers `Result`, so each
//! fallible module defines its own `thiserror::Error` enum and this file
//! composes them into one root `Error` via `#[from]`. [`ErrorCode`] keeps
//! the legacy single-character classification available to callers that
//! want to match on it without caring which module raised it.

use thiserror::Error;

/// The legacy single-character status-code taxonomy, kept as a first-class
/// enum so callers can classify failures the way the original library did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    /// `'d'` — shapes don't line up (copy, stack, pack, multiply).
    Dimension,
    /// `'a'` — a requested vector/matrix could not be allocated.
    Allocation,
    /// `'p'` — an operation wanted a part (matrix/vector/weights) that is absent.
    MissingPart,
    /// `'s'` — a transformer or driver ran without its settings group.
    MissingSettings,
    /// `'c'` — the `more` page chain contains a cycle.
    Cycle,
    /// `'i'` — the caller supplied a nonsensical argument.
    Input,
    /// A NaN/Inf propagated out of a numerical routine.
    Numerical,
    /// A driver exceeded its iteration or rejection budget without converging.
    Convergence,
}

impl ErrorCode {
    /// The single-character code the original library used, for callers
    /// that bridge against systems still expecting it.
    pub fn as_char(self) -> char {
        match self {
            ErrorCode::Dimension => 'd',
            ErrorCode::Allocation => 'a',
            ErrorCode::MissingPart => 'p',
            ErrorCode::MissingSettings => 's',
            ErrorCode::Cycle => 'c',
            ErrorCode::Input => 'i',
            ErrorCode::Numerical => 'n',
            ErrorCode::Convergence => 'v',
        }
    }
}

/// Crate-root error, composed from every submodule's own error enum.
#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Dataset(#[from] crate::dataset::DatasetError),
    #[error(transparent)]
    Model(#[from] crate::model::ModelError),
    #[error(transparent)]
    Mle(#[from] crate::mle::MleError),
    #[error(transparent)]
    Mcmc(#[from] crate::mcmc::McmcError),
    #[error(transparent)]
    Arms(#[from] crate::arms::ArmsError),
    #[error(transparent)]
    Rake(#[from] crate::rake::RakeError),
    #[error(transparent)]
    Update(#[from] crate::update::UpdateError),
    #[error(transparent)]
    Transform(#[from] crate::transform::TransformError),
}

impl Error {
    /// Map this error onto the legacy single-character status-code taxonomy.
    pub fn code(&self) -> ErrorCode {
        match self {
            Error::Dataset(e) => e.code(),
            Error::Model(e) => e.code(),
            Error::Mle(e) => e.code(),
            Error::Mcmc(e) => e.code(),
            Error::Arms(e) => e.code(),
            Error::Rake(e) => e.code(),
            Error::Update(e) => e.code(),
            Error::Transform(e) => e.code(),
        }
    }
}

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, Error>;
