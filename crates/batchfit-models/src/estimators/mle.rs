//! Poisson maximum-likelihood summands (deviance form).
//!
//! Objective: `chi^2 = 2 sum_k (v_k - d_k - d_k ln(v_k / d_k))`, the Poisson
//! deviance, with `d ln(v/d) := 0` when `d == 0`. The deviance is only
//! defined for positive model values; a non-positive value trips the domain
//! guard and the fit is flagged by the caller.

use super::ChiSquareTerm;

/// `2 * (v - d - d ln(v/d))`, or the domain guard for `v <= 0`.
#[inline]
pub(super) fn chi_square_term(data: f32, value: f32) -> ChiSquareTerm {
    if value <= 0.0 {
        return ChiSquareTerm::InvalidModelValue;
    }
    let mut term = value - data;
    if data > 0.0 {
        term -= data * (value / data).ln();
    }
    ChiSquareTerm::Contribution(2.0 * term)
}

/// Descent gradient factor: `2 * (d/v - 1)`. Zero for guarded points.
#[inline]
pub(super) fn gradient_factor(data: f32, value: f32) -> f32 {
    if value <= 0.0 {
        return 0.0;
    }
    2.0 * (data / value - 1.0)
}

/// Hessian factor: `2 * d / v^2`. Zero for guarded points.
#[inline]
pub(super) fn hessian_factor(data: f32, value: f32) -> f64 {
    if value <= 0.0 {
        return 0.0;
    }
    2.0 * data as f64 / (value as f64 * value as f64)
}
