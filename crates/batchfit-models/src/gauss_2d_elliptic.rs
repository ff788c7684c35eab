//! Elliptic 2-D Gaussian peak with independent axis widths.
//!
//! `v(x, y) = a * exp(-((x - x0)^2 / (2 sx^2) + (y - y0)^2 / (2 sy^2))) + b`
//!
//! Parameters: `[amplitude, center_x, center_y, width_x, width_y, offset]`.

use crate::grid::coordinate_2d;
use crate::{PointContext, PointEvaluation};

pub(crate) fn evaluate(p: &[f32], ctx: &PointContext) -> PointEvaluation {
    let (x, y) = coordinate_2d(ctx);

    let (a, x0, y0, sx, sy, b) = (p[0], p[1], p[2], p[3], p[4], p[5]);
    let dx = x - x0;
    let dy = y - y0;
    let sx2 = sx * sx;
    let sy2 = sy * sy;
    let ex = (-0.5 * (dx * dx / sx2 + dy * dy / sy2)).exp();

    let mut eval = PointEvaluation::new();
    eval.value = a * ex + b;
    eval.derivatives[0] = ex;
    eval.derivatives[1] = a * ex * dx / sx2;
    eval.derivatives[2] = a * ex * dy / sy2;
    eval.derivatives[3] = a * ex * dx * dx / (sx2 * sx);
    eval.derivatives[4] = a * ex * dy * dy / (sy2 * sy);
    eval.derivatives[5] = 1.0;
    eval
}
