//! 1-D Gaussian peak.
//!
//! `v(x) = a * exp(-(x - x0)^2 / (2 s^2)) + b`
//!
//! Parameters: `[amplitude, center, width, offset]`.

use crate::grid::coordinate_1d;
use crate::{PointContext, PointEvaluation};

pub(crate) fn evaluate(p: &[f32], ctx: &PointContext) -> PointEvaluation {
    let x = coordinate_1d(ctx);

    let (a, x0, s, b) = (p[0], p[1], p[2], p[3]);
    let dx = x - x0;
    let ex = (-0.5 * (dx / s) * (dx / s)).exp();

    let mut eval = PointEvaluation::new();
    eval.value = a * ex + b;
    eval.derivatives[0] = ex;
    eval.derivatives[1] = a * ex * dx / (s * s);
    eval.derivatives[2] = a * ex * dx * dx / (s * s * s);
    eval.derivatives[3] = 1.0;
    eval
}
