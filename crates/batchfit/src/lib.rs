//! # batchfit
//!
//! Massively parallel batched curve fitting with Levenberg-Marquardt.
//!
//! batchfit solves, in one call, a large number of independent nonlinear
//! least-squares or Poisson maximum-likelihood fit problems that share a
//! model shape and point count. Every fit carries its own data vector,
//! initial guess and optional per-point weights; all fits advance together
//! through synchronized iterations on a data-parallel worker pool.
//!
//! ## Quick Start
//!
//! ```rust
//! use batchfit::prelude::*;
//!
//! // Two independent straight-line fits, 5 points each, fit-major data.
//! let data = [
//!     1.0f32, 2.0, 3.0, 4.0, 5.0, // y = 1 + x
//!     0.0, 2.0, 4.0, 6.0, 8.0, // y = 2x
//! ];
//! let initial = [0.0f32, 0.0, 0.0, 0.0];
//!
//! let engine = FitEngine::new(FitOptions::default()).unwrap();
//! let output = engine
//!     .fit(
//!         &FitProblem::new(ModelId::Linear1D, EstimatorId::Lse, 2, 5, &data, &initial)
//!             .with_tolerance(1e-6),
//!     )
//!     .unwrap();
//!
//! assert!(output.states.iter().all(|s| s.is_converged()));
//! assert!((output.fit_parameters(1)[1] - 2.0).abs() < 1e-3);
//! ```
//!
//! ## Pieces
//!
//! - Model functions and estimators: [`batchfit_models`]
//! - Ids, states and parameter masks: [`batchfit_core`]
//! - Planner, kernels, solver and driver: [`batchfit_engine`]
//! - Reproducible synthetic data for tests and benchmarks: [`rng`]

pub mod rng;

// Re-export the member crates.
pub use batchfit_core as core;
pub use batchfit_engine as engine;
pub use batchfit_models as models;

// Convenient re-exports of the surface most callers need.
pub use batchfit_core::{EstimatorId, FitState, ModelId, ParameterMask, MAX_PARAMETERS};
pub use batchfit_engine::{
    ChunkPlan, DeviceLimits, Error, FitDimensions, FitEngine, FitOptions, FitOutput, FitProblem,
    FitStatistics, Result,
};

/// Everything a typical fitting program needs.
pub mod prelude {
    pub use batchfit_core::{EstimatorId, FitState, ModelId, ParameterMask};
    pub use batchfit_engine::{
        FitEngine, FitOptions, FitOutput, FitProblem, FitStatistics,
    };
}
