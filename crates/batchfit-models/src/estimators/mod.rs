//! Estimator summands.
//!
//! An estimator contributes three per-point quantities, each summed over a
//! fit's data points by the engine's reduction passes:
//!
//! - the **chi-square term**, the point's contribution to the objective
//! - the **gradient factor**, multiplied by `dv/dp` per free parameter
//! - the **Hessian factor**, multiplied by `dv/dp_i * dv/dp_j` per entry
//!
//! The gradient factor is the *descent* direction (the negated objective
//! gradient), so solving `H * delta = g` and adding the delta is a damped
//! Gauss-Newton step.
//!
//! Hessian factors are `f64`: per-fit Hessian sums accumulate in double
//! precision and are truncated to `f32` on store, which keeps the
//! near-convergence small-residual regime stable.
//!
//! The Poisson likelihood ([`EstimatorId::Mle`]) ignores the weight vector;
//! only least squares consumes weights.

mod lse;
mod mle;

pub use batchfit_core::EstimatorId;

/// One point's chi-square contribution, or the Poisson domain guard.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ChiSquareTerm {
    /// Add this to the fit's chi-square.
    Contribution(f32),
    /// The model value was non-positive under the Poisson likelihood; the
    /// term is skipped and the fit is flagged.
    InvalidModelValue,
}

/// Per-point chi-square summand.
#[inline]
pub fn chi_square_term(estimator: EstimatorId, data: f32, value: f32, weight: f32) -> ChiSquareTerm {
    match estimator {
        EstimatorId::Lse => ChiSquareTerm::Contribution(lse::chi_square_term(data, value, weight)),
        EstimatorId::Mle => mle::chi_square_term(data, value),
    }
}

/// Per-point gradient factor; multiplied by `dv/dp` for each free parameter.
#[inline]
pub fn gradient_factor(estimator: EstimatorId, data: f32, value: f32, weight: f32) -> f32 {
    match estimator {
        EstimatorId::Lse => lse::gradient_factor(data, value, weight),
        EstimatorId::Mle => mle::gradient_factor(data, value),
    }
}

/// Per-point Hessian factor; multiplied by `dv/dp_i * dv/dp_j` per entry.
#[inline]
pub fn hessian_factor(estimator: EstimatorId, data: f32, value: f32, weight: f32) -> f64 {
    match estimator {
        EstimatorId::Lse => lse::hessian_factor(weight),
        EstimatorId::Mle => mle::hessian_factor(data, value),
    }
}
