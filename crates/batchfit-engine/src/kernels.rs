//! Per-iteration numeric kernels.
//!
//! Each function here is one bulk-synchronous pass over the chunk: it
//! returns only when every fit's work-items have completed, so a pass sees
//! all writes of the passes launched before it. Within a pass, every output
//! element is written by exactly one work-item; fits never share mutable
//! state.
//!
//! Chi-square and gradient sums run through a power-of-two tree reduction
//! over a zero-padded per-fit buffer. The padding is cleared before the
//! summand writes, and the halving order is fixed, so sums are bitwise
//! reproducible regardless of worker count. Hessian entries accumulate in
//! `f64` and truncate on store.

use batchfit_core::{EstimatorId, FitState, ModelId};
use batchfit_models::estimators::{self, ChiSquareTerm};
use batchfit_models::{evaluate, PointContext};
use rayon::prelude::*;

use crate::buffers::ChunkBuffers;

/// Launch parameters shared by every kernel in one chunk.
#[derive(Debug, Clone, Copy)]
pub(crate) struct KernelContext<'a> {
    pub model: ModelId,
    pub estimator: EstimatorId,
    pub user_info: &'a [u8],
    /// Compacted free-parameter index table.
    pub free_indices: &'a [usize],
    pub n_points: usize,
    pub n_parameters: usize,
    /// Tree-reduction width: smallest power of two >= `n_points`.
    pub reduction_width: usize,
    /// Global index of this chunk's first fit.
    pub chunk_start: usize,
    /// Work-item granularity for the parallel passes.
    pub fits_per_block: usize,
}

impl KernelContext<'_> {
    #[inline]
    fn n_free(&self) -> usize {
        self.free_indices.len()
    }
}

/// In-place power-of-two tree sum; the result lands in `scratch[0]`.
#[inline]
fn tree_reduce(scratch: &mut [f32]) {
    let mut width = scratch.len() / 2;
    while width > 0 {
        for i in 0..width {
            scratch[i] += scratch[i + width];
        }
        width /= 2;
    }
}

/// Evaluate the model for every `(fit, point)` of the chunk.
///
/// Writes the value vector and the parameter-major derivative matrix.
/// Finished fits are skipped.
pub(crate) fn calc_curve_values(ctx: &KernelContext, buf: &mut ChunkBuffers) {
    let b = &mut *buf;
    let n_points = ctx.n_points;
    let n_parameters = ctx.n_parameters;
    let parameters = &b.parameters;
    let finished = &b.finished;

    (
        b.values.par_chunks_mut(n_points),
        b.derivatives.par_chunks_mut(n_parameters * n_points),
    )
        .into_par_iter()
        .enumerate()
        .with_min_len(ctx.fits_per_block)
        .for_each(|(fit, (values, derivatives))| {
            if finished[fit] {
                return;
            }
            let params = &parameters[fit * n_parameters..(fit + 1) * n_parameters];
            for point in 0..n_points {
                let point_ctx = PointContext {
                    fit_index: ctx.chunk_start + fit,
                    point_index: point,
                    n_points,
                    user_info: ctx.user_info,
                };
                let eval = evaluate(ctx.model, params, &point_ctx);
                values[point] = eval.value;
                for p in 0..n_parameters {
                    derivatives[p * n_points + point] = eval.derivatives[p];
                }
            }
        });
}

/// Reduce the per-point estimator summands to one chi-square per fit.
///
/// Also raises `iteration_failed` for fits whose step did not improve, and
/// flags Poisson domain violations. Finished fits are skipped.
pub(crate) fn calc_chi_squares(ctx: &KernelContext, buf: &mut ChunkBuffers) {
    let b = &mut *buf;
    let n_points = ctx.n_points;
    let data = &b.data;
    let weights = &b.weights;
    let values = &b.values;
    let finished = &b.finished;
    let prev_chi_squares = &b.prev_chi_squares;

    (
        b.chi_squares.par_iter_mut(),
        b.iteration_failed.par_iter_mut(),
        b.states.par_iter_mut(),
        b.reduction.par_chunks_mut(ctx.reduction_width),
    )
        .into_par_iter()
        .enumerate()
        .with_min_len(ctx.fits_per_block)
        .for_each(|(fit, (chi_square, failed, state, scratch))| {
            if finished[fit] {
                return;
            }
            // Zero the pad before the summand writes, or the first halving
            // would mix stale values.
            scratch.fill(0.0);
            for point in 0..n_points {
                let index = fit * n_points + point;
                let weight = if weights.is_empty() { 1.0 } else { weights[index] };
                match estimators::chi_square_term(ctx.estimator, data[index], values[index], weight)
                {
                    ChiSquareTerm::Contribution(term) => scratch[point] = term,
                    ChiSquareTerm::InvalidModelValue => *state = FitState::NegCurvatureMle,
                }
            }
            tree_reduce(scratch);
            *chi_square = scratch[0];

            let prev = prev_chi_squares[fit];
            *failed = prev != 0.0 && *chi_square >= prev;
        });
}

/// Reduce the per-point gradient summands, one entry per free parameter.
///
/// Skipped for fits that are finished or whose last step failed.
pub(crate) fn calc_gradients(ctx: &KernelContext, buf: &mut ChunkBuffers) {
    let n_free = ctx.n_free();
    if n_free == 0 {
        return;
    }
    let b = &mut *buf;
    let n_points = ctx.n_points;
    let n_parameters = ctx.n_parameters;
    let data = &b.data;
    let weights = &b.weights;
    let values = &b.values;
    let derivatives = &b.derivatives;
    let finished = &b.finished;
    let iteration_failed = &b.iteration_failed;

    (
        b.gradients.par_chunks_mut(n_free),
        b.reduction.par_chunks_mut(ctx.reduction_width),
    )
        .into_par_iter()
        .enumerate()
        .with_min_len(ctx.fits_per_block)
        .for_each(|(fit, (gradient, scratch))| {
            if finished[fit] || iteration_failed[fit] {
                return;
            }
            for (slot, &parameter_index) in ctx.free_indices.iter().enumerate() {
                scratch.fill(0.0);
                for point in 0..n_points {
                    let index = fit * n_points + point;
                    let weight = if weights.is_empty() { 1.0 } else { weights[index] };
                    let factor = estimators::gradient_factor(
                        ctx.estimator,
                        data[index],
                        values[index],
                        weight,
                    );
                    let derivative =
                        derivatives[(fit * n_parameters + parameter_index) * n_points + point];
                    scratch[point] = factor * derivative;
                }
                tree_reduce(scratch);
                gradient[slot] = scratch[0];
            }
        });
}

/// Accumulate the Gauss-Newton Hessian, one entry per free-parameter pair.
///
/// Entries accumulate over all points in `f64` and truncate to `f32` on
/// store. Skipped for fits that are finished or whose last step failed.
pub(crate) fn calc_hessians(ctx: &KernelContext, buf: &mut ChunkBuffers) {
    let n_free = ctx.n_free();
    if n_free == 0 {
        return;
    }
    let b = &mut *buf;
    let n_points = ctx.n_points;
    let n_parameters = ctx.n_parameters;
    let data = &b.data;
    let weights = &b.weights;
    let values = &b.values;
    let derivatives = &b.derivatives;
    let finished = &b.finished;
    let iteration_failed = &b.iteration_failed;

    b.hessians
        .par_chunks_mut(n_free * n_free)
        .enumerate()
        .with_min_len(ctx.fits_per_block)
        .for_each(|(fit, hessian)| {
            if finished[fit] || iteration_failed[fit] {
                return;
            }
            for (row, &parameter_i) in ctx.free_indices.iter().enumerate() {
                for (col, &parameter_j) in ctx.free_indices.iter().enumerate() {
                    let mut sum = 0.0f64;
                    for point in 0..n_points {
                        let index = fit * n_points + point;
                        let weight = if weights.is_empty() { 1.0 } else { weights[index] };
                        let factor = estimators::hessian_factor(
                            ctx.estimator,
                            data[index],
                            values[index],
                            weight,
                        );
                        let di = derivatives[(fit * n_parameters + parameter_i) * n_points + point];
                        let dj = derivatives[(fit * n_parameters + parameter_j) * n_points + point];
                        sum += factor * di as f64 * dj as f64;
                    }
                    hessian[row * n_free + col] = sum as f32;
                }
            }
        });
}

/// Apply the Levenberg-Marquardt damping to the Hessian diagonal.
///
/// A fit whose last step failed still carries the previous damping (its
/// Hessian was not recomputed), so that damping is divided out first.
pub(crate) fn modify_step_widths(ctx: &KernelContext, buf: &mut ChunkBuffers) {
    let n_free = ctx.n_free();
    if n_free == 0 {
        return;
    }
    let b = &mut *buf;
    let lambdas = &b.lambdas;
    let finished = &b.finished;
    let iteration_failed = &b.iteration_failed;

    b.hessians
        .par_chunks_mut(n_free * n_free)
        .enumerate()
        .with_min_len(ctx.fits_per_block)
        .for_each(|(fit, hessian)| {
            if finished[fit] {
                return;
            }
            let lambda = lambdas[fit];
            for d in 0..n_free {
                let diagonal = d * n_free + d;
                if iteration_failed[fit] {
                    hessian[diagonal] /= 1.0 + lambda / 10.0;
                }
                hessian[diagonal] *= 1.0 + lambda;
            }
        });
}

/// Flag fits whose elimination hit a zero pivot.
pub(crate) fn apply_singular_states(ctx: &KernelContext, buf: &mut ChunkBuffers) {
    let b = &mut *buf;
    let singular = &b.singular;
    let finished = &b.finished;

    b.states
        .par_iter_mut()
        .enumerate()
        .with_min_len(ctx.fits_per_block)
        .for_each(|(fit, state)| {
            if !finished[fit] && singular[fit] {
                *state = FitState::SingularHessian;
            }
        });
}

/// Snapshot the parameters and apply the solved step.
///
/// Every fit snapshots unconditionally - rollback must work even for fits
/// that just finished - but only live fits add their delta.
pub(crate) fn update_parameters(ctx: &KernelContext, buf: &mut ChunkBuffers) {
    let b = &mut *buf;
    let n_parameters = ctx.n_parameters;
    let n_free = ctx.n_free();
    let deltas = &b.deltas;
    let finished = &b.finished;

    (
        b.parameters.par_chunks_mut(n_parameters),
        b.prev_parameters.par_chunks_mut(n_parameters),
    )
        .into_par_iter()
        .enumerate()
        .with_min_len(ctx.fits_per_block)
        .for_each(|(fit, (parameters, prev_parameters))| {
            prev_parameters.copy_from_slice(parameters);
            if finished[fit] {
                return;
            }
            for (slot, &parameter_index) in ctx.free_indices.iter().enumerate() {
                parameters[parameter_index] += deltas[fit * n_free + slot];
            }
        });
}

/// Mark fits whose relative chi-square change dropped below the tolerance.
///
/// A fit that reaches the last iteration unconverged is stamped
/// `MaxIteration`; its `finished` flag is raised by the bookkeeping pass.
pub(crate) fn check_for_convergence(
    ctx: &KernelContext,
    buf: &mut ChunkBuffers,
    tolerance: f32,
    iteration: usize,
    max_iterations: usize,
) {
    let b = &mut *buf;
    let chi_squares = &b.chi_squares;
    let prev_chi_squares = &b.prev_chi_squares;

    (b.finished.par_iter_mut(), b.states.par_iter_mut())
        .into_par_iter()
        .enumerate()
        .with_min_len(ctx.fits_per_block)
        .for_each(|(fit, (finished, state))| {
            if *finished {
                return;
            }
            let chi = chi_squares[fit];
            let prev = prev_chi_squares[fit];
            if (chi - prev).abs() < tolerance * chi.max(1.0) {
                *finished = true;
            } else if iteration == max_iterations - 1 {
                *state = FitState::MaxIteration;
            }
        });
}

/// Retire fits with a non-zero state, record iteration counts, and report
/// whether the whole chunk is done.
pub(crate) fn evaluate_iteration(
    ctx: &KernelContext,
    buf: &mut ChunkBuffers,
    iteration: usize,
) -> bool {
    let b = &mut *buf;
    let states = &b.states;

    (b.finished.par_iter_mut(), b.n_iterations.par_iter_mut())
        .into_par_iter()
        .enumerate()
        .with_min_len(ctx.fits_per_block)
        .for_each(|(fit, (finished, n_iterations))| {
            if states[fit] != FitState::Converged {
                *finished = true;
            }
            if *finished && *n_iterations == 0 {
                *n_iterations = iteration as u32 + 1;
            }
        });

    b.finished.iter().all(|&finished| finished)
}

/// Adapt the damping and roll back rejected steps.
///
/// Accepted steps (chi-square improved) relax the damping and advance the
/// best-so-far chi-square; rejected steps tighten the damping and restore
/// the snapshot parameters and chi-square. Runs for every fit - for fits
/// already finished both branches are no-ops on the visible outputs.
pub(crate) fn prepare_next_iteration(ctx: &KernelContext, buf: &mut ChunkBuffers) {
    let b = &mut *buf;
    let n_parameters = ctx.n_parameters;
    let prev_parameters = &b.prev_parameters;

    (
        b.lambdas.par_iter_mut(),
        b.chi_squares.par_iter_mut(),
        b.prev_chi_squares.par_iter_mut(),
        b.parameters.par_chunks_mut(n_parameters),
    )
        .into_par_iter()
        .enumerate()
        .with_min_len(ctx.fits_per_block)
        .for_each(|(fit, (lambda, chi_square, prev_chi_square, parameters))| {
            if *chi_square < *prev_chi_square {
                *lambda *= 0.1;
                *prev_chi_square = *chi_square;
            } else {
                *lambda *= 10.0;
                *chi_square = *prev_chi_square;
                parameters.copy_from_slice(
                    &prev_parameters[fit * n_parameters..(fit + 1) * n_parameters],
                );
            }
        });
}
