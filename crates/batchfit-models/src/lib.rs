//! Built-in model functions and estimators for batchfit.
//!
//! A model function maps a parameter vector to a predicted value at one data
//! point, together with the analytic partial derivative for every parameter.
//! The engine calls the evaluator once per `(fit, point)` pair; evaluators
//! are pure and read nothing but their arguments.
//!
//! An estimator supplies the three per-point summands of the objective:
//! the chi-square contribution, the gradient factor and the Hessian factor.
//! See [`estimators`].
//!
//! # Coordinates
//!
//! 1-D models take their x coordinate from the opaque `user_info` buffer
//! when one is supplied (either one table shared by all fits, or one table
//! per fit) and fall back to the point index otherwise. 2-D models address a
//! square raster derived from the point count. See [`grid`].
//!
//! # Example
//!
//! ```rust
//! use batchfit_core::ModelId;
//! use batchfit_models::{evaluate, PointContext};
//!
//! // Straight line 2 + 3x, evaluated at the third point of fit 0.
//! let ctx = PointContext { fit_index: 0, point_index: 2, n_points: 5, user_info: &[] };
//! let eval = evaluate(ModelId::Linear1D, &[2.0, 3.0], &ctx);
//! assert_eq!(eval.value, 8.0);
//! assert_eq!(eval.derivatives[1], 2.0); // dv/d(slope) = x
//! ```

pub mod estimators;
pub mod grid;

mod cauchy_2d_elliptic;
mod gauss_1d;
mod gauss_2d;
mod gauss_2d_elliptic;
mod gauss_2d_rotated;
mod linear_1d;

use batchfit_core::{ModelId, MAX_PARAMETERS};

/// Coordinates of one evaluation: which fit, which point, and the opaque
/// per-call byte buffer the model may interpret as a coordinate table.
///
/// `fit_index` is the global fit index (the chunk base offset is already
/// applied), so per-fit coordinate tables address the correct slice.
#[derive(Debug, Clone, Copy)]
pub struct PointContext<'a> {
    /// Global fit index within the whole call.
    pub fit_index: usize,
    /// Point index within the fit, `0..n_points`.
    pub point_index: usize,
    /// Points per fit.
    pub n_points: usize,
    /// Opaque per-call buffer, passed through verbatim.
    pub user_info: &'a [u8],
}

/// Model value and partial derivatives at one `(fit, point)` pair.
///
/// Only the first [`ModelId::n_parameters`] derivative entries are defined;
/// the rest stay zero.
#[derive(Debug, Clone, Copy)]
pub struct PointEvaluation {
    /// Predicted value.
    pub value: f32,
    /// One partial derivative per model parameter.
    pub derivatives: [f32; MAX_PARAMETERS],
}

impl PointEvaluation {
    pub(crate) fn new() -> Self {
        Self {
            value: 0.0,
            derivatives: [0.0; MAX_PARAMETERS],
        }
    }
}

/// Evaluate a built-in model at one `(fit, point)` pair.
///
/// `parameters` is the fit's full parameter vector (fixed parameters
/// included), of length `model.n_parameters()`.
pub fn evaluate(model: ModelId, parameters: &[f32], ctx: &PointContext) -> PointEvaluation {
    debug_assert_eq!(parameters.len(), model.n_parameters());

    match model {
        ModelId::Gauss1D => gauss_1d::evaluate(parameters, ctx),
        ModelId::Gauss2D => gauss_2d::evaluate(parameters, ctx),
        ModelId::Gauss2DElliptic => gauss_2d_elliptic::evaluate(parameters, ctx),
        ModelId::Gauss2DRotated => gauss_2d_rotated::evaluate(parameters, ctx),
        ModelId::Cauchy2DElliptic => cauchy_2d_elliptic::evaluate(parameters, ctx),
        ModelId::Linear1D => linear_1d::evaluate(parameters, ctx),
    }
}
