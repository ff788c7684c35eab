//! Error types for batchfit-core.

use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum Error {
    #[error("invalid model id: {0}")]
    InvalidModelId(u32),

    #[error("invalid estimator id: {0}")]
    InvalidEstimatorId(u32),

    #[error("invalid fit state id: {0}")]
    InvalidStateId(u32),
}

pub type Result<T> = std::result::Result<T, Error>;
