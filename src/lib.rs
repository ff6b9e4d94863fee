//! A statistical modeling toolkit: a uniform [`model::Model`] abstraction
//! over likelihood families, maximum-likelihood estimation, Metropolis-
//! Hastings MCMC, univariate adaptive rejection sampling, conjugate
//! Bayesian updating, iterative proportional fitting ("raking"), model
//! transformers, and a tabular [`dataset::Dataset`] container that carries
//! vectors, matrices, text columns, weights, names, and linked auxiliary
//! pages.
//!
//! ## Layout
//!
//! - [`dataset`] — the vector/matrix/text/weights/names/pages container
//!   every other module reads and writes.
//! - [`model`] — the [`model::ModelFamily`] trait and [`model::Model`]
//!   handle every driver below operates on.
//! - [`families`] — the concrete likelihood families shipped out of the box.
//! - [`mle`], [`mcmc`], [`arms`], [`rake`], [`update`] — the estimation and
//!   sampling drivers.
//! - [`transform`] — model combinators (fix-params, coordinate-transform,
//!   data-constrain, compose, stack, cross, mixture).
//! - [`settings`] — the per-driver settings groups attached to a model.
//! - [`numerical`], [`stats`] — shared numerical primitives.
//! - [`cancel`], [`options`], [`error`], [`dispatch`] — the ambient stack:
//!   cooperative cancellation, global verbosity/output options, the crate's
//!   composed error taxonomy, and cross-cutting method dispatch.

#![deny(rust_2018_idioms)]

/// Crate-wide error taxonomy, composed from every fallible module's own
/// `thiserror` enum.
pub mod error;
/// Global runtime options (verbosity, output redirection).
pub mod options;
/// The vector/matrix/text/weights/names/pages data container.
pub mod dataset;
/// Shared descriptive-statistics primitives (mean, variance, entropy, ...).
pub mod stats;
/// The model abstraction: [`model::ModelFamily`] trait and [`model::Model`] handle.
pub mod model;
/// Per-driver settings groups attached to a model.
pub mod settings;
/// Numerical differentiation and linear-algebra helpers shared by the drivers.
pub mod numerical;
/// Concrete likelihood families shipped out of the box.
pub mod families;
/// Cooperative cancellation token threaded through long-running drivers.
pub mod cancel;
/// Maximum-likelihood estimation.
pub mod mle;
/// Metropolis-Hastings MCMC.
pub mod mcmc;
/// Univariate adaptive rejection sampling (ARMS).
pub mod arms;
/// Iterative proportional fitting ("raking") of two-way tables.
pub mod rake;
/// Conjugate and MCMC-fallback Bayesian updating.
pub mod update;
/// Model transformers: fix-params, coordinate-transform, data-constrain,
/// compose, stack, cross, mixture.
pub mod transform;
/// Name-keyed dispatch for cross-cutting per-family overrides (print, entropy).
pub mod dispatch;

pub use dataset::{Axis, Dataset};
pub use error::{Error, ErrorCode, Result};
pub use model::{Model, ModelFamily};
