//! Straight line.
//!
//! `v(x) = a + b x`
//!
//! Parameters: `[offset, slope]`.

use crate::grid::coordinate_1d;
use crate::{PointContext, PointEvaluation};

pub(crate) fn evaluate(p: &[f32], ctx: &PointContext) -> PointEvaluation {
    let x = coordinate_1d(ctx);

    let mut eval = PointEvaluation::new();
    eval.value = p[0] + p[1] * x;
    eval.derivatives[0] = 1.0;
    eval.derivatives[1] = x;
    eval
}
