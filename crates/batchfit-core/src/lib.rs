//! Core identifiers and shared data types for batchfit.
//!
//! This crate provides the vocabulary the rest of the workspace speaks:
//!
//! - [`ModelId`] - Selects a built-in model function (parameter count + evaluator)
//! - [`EstimatorId`] - Selects the objective (least squares or Poisson likelihood)
//! - [`FitState`] - Per-fit terminal state code
//! - [`ParameterMask`] - Which parameters are free, as mask and index table
//!
//! All ids have stable numeric values so binding layers can pass them across
//! an untyped boundary; within Rust the enums are used directly.
//!
//! # Example
//!
//! ```rust
//! use batchfit_core::{ModelId, ParameterMask};
//!
//! let model = ModelId::Gauss1D;
//! assert_eq!(model.n_parameters(), 4);
//!
//! // Freeze the center parameter, fit the rest.
//! let mask = ParameterMask::new(&[true, false, true, true]);
//! assert_eq!(mask.n_free(), 3);
//! assert_eq!(mask.free_indices(), &[0, 2, 3]);
//! ```

pub mod error;
pub mod estimator;
pub mod mask;
pub mod model;
pub mod state;

pub use error::{Error, Result};
pub use estimator::EstimatorId;
pub use mask::ParameterMask;
pub use model::{ModelId, MAX_PARAMETERS};
pub use state::FitState;
