//! Elliptic 2-D Gaussian peak rotated about its center.
//!
//! The raster coordinates are rotated by the angle parameter into the
//! ellipse frame before the elliptic Gaussian is evaluated:
//!
//! ```text
//! xr =  (x - x0) cos r - (y - y0) sin r
//! yr =  (x - x0) sin r + (y - y0) cos r
//! v  =  a * exp(-(xr^2 / (2 sx^2) + yr^2 / (2 sy^2))) + b
//! ```
//!
//! Parameters: `[amplitude, center_x, center_y, width_x, width_y, offset, angle]`.

use crate::grid::coordinate_2d;
use crate::{PointContext, PointEvaluation};

pub(crate) fn evaluate(p: &[f32], ctx: &PointContext) -> PointEvaluation {
    let (x, y) = coordinate_2d(ctx);

    let (a, x0, y0, sx, sy, b, rot) = (p[0], p[1], p[2], p[3], p[4], p[5], p[6]);
    let (sin_r, cos_r) = rot.sin_cos();
    let dx = x - x0;
    let dy = y - y0;
    let xr = dx * cos_r - dy * sin_r;
    let yr = dx * sin_r + dy * cos_r;
    let sx2 = sx * sx;
    let sy2 = sy * sy;
    let ex = (-0.5 * (xr * xr / sx2 + yr * yr / sy2)).exp();

    let mut eval = PointEvaluation::new();
    eval.value = a * ex + b;
    eval.derivatives[0] = ex;
    eval.derivatives[1] = a * ex * (xr * cos_r / sx2 + yr * sin_r / sy2);
    eval.derivatives[2] = a * ex * (yr * cos_r / sy2 - xr * sin_r / sx2);
    eval.derivatives[3] = a * ex * xr * xr / (sx2 * sx);
    eval.derivatives[4] = a * ex * yr * yr / (sy2 * sy);
    eval.derivatives[5] = 1.0;
    // d(xr)/d(rot) = -yr, d(yr)/d(rot) = xr.
    eval.derivatives[6] = a * ex * xr * yr * (1.0 / sx2 - 1.0 / sy2);
    eval
}
