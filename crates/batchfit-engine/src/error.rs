//! Error types for batchfit-engine.
//!
//! These are the call-level failures: misconfiguration, missing device,
//! memory exhaustion. They abort the whole call. Per-fit failures (singular
//! Hessian, Poisson domain violations, iteration budget) are data, reported
//! through [`batchfit_core::FitState`], and never surface here.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("no compute device present: {0}")]
    DeviceUnavailable(String),

    #[error("not enough free device memory")]
    OutOfMemory,

    #[error("number of fits must be at least 1")]
    NoFits,

    #[error("number of points per fit must be at least 1")]
    NoPoints,

    #[error("tolerance must be positive, got {0}")]
    InvalidTolerance(f32),

    #[error("max_iterations must be at least 1")]
    InvalidMaxIterations,

    #[error("{what}: expected {expected} elements, got {actual}")]
    DimensionMismatch {
        what: &'static str,
        expected: usize,
        actual: usize,
    },

    #[error(transparent)]
    Id(#[from] batchfit_core::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
