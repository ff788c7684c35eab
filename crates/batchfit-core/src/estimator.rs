//! Estimator identifiers.

use std::fmt;

use crate::error::Error;

/// Identifies the objective function minimized by the fit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum EstimatorId {
    /// Weighted least squares.
    #[default]
    Lse,
    /// Maximum likelihood for Poisson-distributed data (deviance form).
    Mle,
}

impl EstimatorId {
    /// Stable numeric id for untyped boundaries.
    pub fn id(self) -> u32 {
        match self {
            EstimatorId::Lse => 0,
            EstimatorId::Mle => 1,
        }
    }

    /// Look up an estimator by its numeric id.
    pub fn from_id(id: u32) -> Option<Self> {
        match id {
            0 => Some(EstimatorId::Lse),
            1 => Some(EstimatorId::Mle),
            _ => None,
        }
    }

    /// Short name for display.
    pub fn name(self) -> &'static str {
        match self {
            EstimatorId::Lse => "LSE",
            EstimatorId::Mle => "MLE",
        }
    }
}

impl TryFrom<u32> for EstimatorId {
    type Error = Error;

    fn try_from(id: u32) -> Result<Self, Error> {
        Self::from_id(id).ok_or(Error::InvalidEstimatorId(id))
    }
}

impl fmt::Display for EstimatorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
