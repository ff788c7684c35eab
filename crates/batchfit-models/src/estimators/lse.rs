//! Weighted least squares summands.
//!
//! Objective: `chi^2 = sum_k w_k (d_k - v_k)^2`. Pass a weight of 1 for
//! unweighted fits.

/// `w * (d - v)^2`
#[inline]
pub(super) fn chi_square_term(data: f32, value: f32, weight: f32) -> f32 {
    let deviation = data - value;
    weight * deviation * deviation
}

/// Descent gradient factor: `2 * w * (d - v)`.
#[inline]
pub(super) fn gradient_factor(data: f32, value: f32, weight: f32) -> f32 {
    2.0 * weight * (data - value)
}

/// Gauss-Newton Hessian factor: `2 * w`.
#[inline]
pub(super) fn hessian_factor(weight: f32) -> f64 {
    2.0 * weight as f64
}
