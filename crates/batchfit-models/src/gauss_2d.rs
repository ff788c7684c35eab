//! Symmetric 2-D Gaussian peak on a square raster.
//!
//! `v(x, y) = a * exp(-((x - x0)^2 + (y - y0)^2) / (2 s^2)) + b`
//!
//! Parameters: `[amplitude, center_x, center_y, width, offset]`.

use crate::grid::coordinate_2d;
use crate::{PointContext, PointEvaluation};

pub(crate) fn evaluate(p: &[f32], ctx: &PointContext) -> PointEvaluation {
    let (x, y) = coordinate_2d(ctx);

    let (a, x0, y0, s, b) = (p[0], p[1], p[2], p[3], p[4]);
    let dx = x - x0;
    let dy = y - y0;
    let s2 = s * s;
    let ex = (-0.5 * (dx * dx + dy * dy) / s2).exp();

    let mut eval = PointEvaluation::new();
    eval.value = a * ex + b;
    eval.derivatives[0] = ex;
    eval.derivatives[1] = a * ex * dx / s2;
    eval.derivatives[2] = a * ex * dy / s2;
    eval.derivatives[3] = a * ex * (dx * dx + dy * dy) / (s2 * s);
    eval.derivatives[4] = 1.0;
    eval
}
