//! Elliptic 2-D Cauchy (Lorentzian) peak.
//!
//! `v(x, y) = a / (1 + ((x - x0)/gx)^2) / (1 + ((y - y0)/gy)^2) + b`
//!
//! Parameters: `[amplitude, center_x, center_y, width_x, width_y, offset]`.

use crate::grid::coordinate_2d;
use crate::{PointContext, PointEvaluation};

pub(crate) fn evaluate(p: &[f32], ctx: &PointContext) -> PointEvaluation {
    let (x, y) = coordinate_2d(ctx);

    let (a, x0, y0, gx, gy, b) = (p[0], p[1], p[2], p[3], p[4], p[5]);
    let tx = (x - x0) / gx;
    let ty = (y - y0) / gy;
    let fx = 1.0 / (1.0 + tx * tx);
    let fy = 1.0 / (1.0 + ty * ty);

    let mut eval = PointEvaluation::new();
    eval.value = a * fx * fy + b;
    eval.derivatives[0] = fx * fy;
    eval.derivatives[1] = a * fy * 2.0 * tx / gx * fx * fx;
    eval.derivatives[2] = a * fx * 2.0 * ty / gy * fy * fy;
    eval.derivatives[3] = a * fy * 2.0 * tx * tx / gx * fx * fx;
    eval.derivatives[4] = a * fx * 2.0 * ty * ty / gy * fy * fy;
    eval.derivatives[5] = 1.0;
    eval
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::check_derivatives;
    use batchfit_core::ModelId;

    #[test]
    fn peak_value_at_center() {
        // 5x5 raster, point 12 is (2, 2).
        let ctx = PointContext {
            fit_index: 0,
            point_index: 12,
            n_points: 25,
            user_info: &[],
        };
        let eval = evaluate(&[4.0, 2.0, 2.0, 0.7, 1.2, 1.0], &ctx);
        assert!((eval.value - 5.0).abs() < 1e-6);
    }

    #[test]
    fn derivatives_match_finite_difference() {
        let ctx = PointContext {
            fit_index: 0,
            point_index: 9,
            n_points: 25,
            user_info: &[],
        };
        check_derivatives(
            ModelId::Cauchy2DElliptic,
            &[4.0, 2.1, 1.7, 0.7, 1.2, 1.0],
            &ctx,
            1e-2,
        );
    }
}
