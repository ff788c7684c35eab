//! Batched Levenberg-Marquardt curve fitting.
//!
//! This crate drives a large number of independent nonlinear least-squares
//! (or Poisson maximum-likelihood) curve fits through synchronized
//! Levenberg-Marquardt iterations on a data-parallel worker pool. All fits
//! in a call share the model shape and point count; each has its own data,
//! initial guess and optional weights.
//!
//! The pieces:
//!
//! - [`plan`] - Sizes chunks to the substrate's memory and dispatch limits
//! - [`device`] - Describes the substrate those limits come from
//! - Numeric kernels - One bulk-synchronous parallel pass per iteration step
//! - Batched Gauss-Jordan solver - One damped normal-equation system per fit
//! - [`fit`] - The public entry point: validate, chunk, drive, collect
//! - [`statistics`] - Outcome tallies over a finished call
//!
//! # Example
//!
//! ```rust
//! use batchfit_core::{EstimatorId, FitState, ModelId};
//! use batchfit_engine::{FitEngine, FitOptions, FitProblem};
//!
//! // One fit: the line y = 1 + x sampled at x = 0..5.
//! let data = [1.0f32, 2.0, 3.0, 4.0, 5.0];
//! let engine = FitEngine::new(FitOptions::default()).unwrap();
//! let output = engine
//!     .fit(
//!         &FitProblem::new(ModelId::Linear1D, EstimatorId::Lse, 1, 5, &data, &[0.0, 0.0])
//!             .with_tolerance(1e-6),
//!     )
//!     .unwrap();
//!
//! assert_eq!(output.states[0], FitState::Converged);
//! assert!((output.fit_parameters(0)[1] - 1.0).abs() < 1e-3);
//! ```

pub mod device;
pub mod error;
pub mod fit;
pub mod plan;
pub mod statistics;

mod buffers;
mod driver;
mod gauss_jordan;
mod kernels;

pub use device::DeviceLimits;
pub use error::{Error, Result};
pub use fit::{FitEngine, FitOptions, FitOutput, FitProblem};
pub use plan::{ChunkPlan, FitDimensions};
pub use statistics::FitStatistics;
