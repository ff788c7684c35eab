//! Per-fit terminal state codes.

use std::fmt;

use crate::error::Error;

/// Terminal state of a single fit.
///
/// Every fit exits with exactly one of these. Only [`FitState::Converged`]
/// means the tolerance test passed; every other value marks the reason the
/// fit stopped early. A non-converged state never poisons sibling fits in
/// the same batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum FitState {
    /// The relative chi-square change dropped below the tolerance.
    #[default]
    Converged,
    /// The iteration budget ran out before convergence.
    MaxIteration,
    /// Gauss-Jordan elimination hit a zero pivot after partial pivoting.
    SingularHessian,
    /// The model produced a non-positive value under the Poisson likelihood.
    NegCurvatureMle,
    /// The compute device was unavailable when the fit was dispatched.
    GpuNotReady,
}

impl FitState {
    /// Stable numeric id, as written into binding-level state arrays.
    pub fn id(self) -> u32 {
        match self {
            FitState::Converged => 0,
            FitState::MaxIteration => 1,
            FitState::SingularHessian => 2,
            FitState::NegCurvatureMle => 3,
            FitState::GpuNotReady => 4,
        }
    }

    /// Look up a state by its numeric id.
    pub fn from_id(id: u32) -> Option<Self> {
        match id {
            0 => Some(FitState::Converged),
            1 => Some(FitState::MaxIteration),
            2 => Some(FitState::SingularHessian),
            3 => Some(FitState::NegCurvatureMle),
            4 => Some(FitState::GpuNotReady),
            _ => None,
        }
    }

    /// True iff the fit passed the tolerance test.
    pub fn is_converged(self) -> bool {
        matches!(self, FitState::Converged)
    }

    /// Short name for display.
    pub fn name(self) -> &'static str {
        match self {
            FitState::Converged => "CONVERGED",
            FitState::MaxIteration => "MAX_ITERATION",
            FitState::SingularHessian => "SINGULAR_HESSIAN",
            FitState::NegCurvatureMle => "NEG_CURVATURE_MLE",
            FitState::GpuNotReady => "GPU_NOT_READY",
        }
    }
}

impl TryFrom<u32> for FitState {
    type Error = Error;

    fn try_from(id: u32) -> Result<Self, Error> {
        Self::from_id(id).ok_or(Error::InvalidStateId(id))
    }
}

impl fmt::Display for FitState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
