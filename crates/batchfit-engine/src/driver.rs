//! The Levenberg-Marquardt iteration driver for one chunk.
//!
//! The loop lives on the host; each step is a bulk-synchronous kernel pass
//! over the whole chunk. Already-finished fits no-op inside the passes while
//! their siblings continue, so neighboring fits never desynchronize.
//!
//! Phasing: the model, chi-square, gradient and Hessian are evaluated once
//! for the initial parameters before the loop, and the best-so-far
//! chi-square is seeded from that evaluation. Each iteration then damps the
//! Hessian diagonal, solves the damped normal equations, fans out singular
//! flags, snapshots and updates the parameters, re-evaluates, checks
//! convergence, retires finished fits, and adapts the damping (rolling back
//! rejected steps). The snapshot precedes the accept/reject branch, so a
//! rejected step restores the parameters that produced the lower chi-square,
//! never an older generation.

use crate::buffers::ChunkBuffers;
use crate::gauss_jordan::solve_equation_systems;
use crate::kernels::{
    apply_singular_states, calc_chi_squares, calc_curve_values, calc_gradients, calc_hessians,
    check_for_convergence, evaluate_iteration, modify_step_widths, prepare_next_iteration,
    update_parameters, KernelContext,
};

/// Run the full iteration loop over one chunk.
///
/// On return every fit in the chunk is finished: converged, failed with a
/// per-fit state, or out of iteration budget. Results stay in the buffers
/// for the caller to copy out.
pub(crate) fn run_chunk(
    ctx: &KernelContext,
    buf: &mut ChunkBuffers,
    tolerance: f32,
    max_iterations: usize,
) {
    calc_curve_values(ctx, buf);
    calc_chi_squares(ctx, buf);
    calc_gradients(ctx, buf);
    calc_hessians(ctx, buf);
    buf.prev_chi_squares.copy_from_slice(&buf.chi_squares);

    for iteration in 0..max_iterations {
        modify_step_widths(ctx, buf);
        solve_equation_systems(ctx, buf);
        apply_singular_states(ctx, buf);
        update_parameters(ctx, buf);
        calc_curve_values(ctx, buf);
        calc_chi_squares(ctx, buf);
        check_for_convergence(ctx, buf, tolerance, iteration, max_iterations);
        let all_finished = evaluate_iteration(ctx, buf, iteration);
        prepare_next_iteration(ctx, buf);
        if all_finished {
            break;
        }
        calc_gradients(ctx, buf);
        calc_hessians(ctx, buf);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::DeviceLimits;
    use crate::plan::{ChunkPlan, FitDimensions};
    use batchfit_core::{EstimatorId, FitState, ModelId};

    fn plan(n_fits: usize, n_points: usize, n_parameters: usize, n_free: usize) -> ChunkPlan {
        ChunkPlan::new(
            FitDimensions {
                n_fits,
                n_points,
                n_parameters,
                n_parameters_to_fit: n_free,
                use_weights: false,
            },
            &DeviceLimits {
                workers: 2,
                memory_budget: 1 << 24,
                max_threads_per_block: 1024,
                max_blocks: 65_535,
            },
            None,
        )
        .unwrap()
    }

    #[test]
    fn linear_fit_converges_in_one_step() {
        let plan = plan(1, 5, 2, 2);
        let free = [0usize, 1];
        let ctx = KernelContext {
            model: ModelId::Linear1D,
            estimator: EstimatorId::Lse,
            user_info: &[],
            free_indices: &free,
            n_points: 5,
            n_parameters: 2,
            reduction_width: plan.power_of_two_n_points,
            chunk_start: 0,
            fits_per_block: 1,
        };
        let mut buf = ChunkBuffers::allocate(&plan, 1);
        // y = 1 + x on x = 0..4, starting from the origin.
        buf.data.copy_from_slice(&[1.0, 2.0, 3.0, 4.0, 5.0]);

        run_chunk(&ctx, &mut buf, 1e-6, 10);

        assert_eq!(buf.states[0], FitState::Converged);
        assert!(buf.n_iterations[0] <= 3, "took {}", buf.n_iterations[0]);
        assert!((buf.parameters[0] - 1.0).abs() < 1e-3);
        assert!((buf.parameters[1] - 1.0).abs() < 1e-3);
        assert!(buf.chi_squares[0] < 1e-6);
    }

    #[test]
    fn all_fixed_parameters_finish_in_one_iteration() {
        let plan = plan(1, 5, 2, 0);
        let free: [usize; 0] = [];
        let ctx = KernelContext {
            model: ModelId::Linear1D,
            estimator: EstimatorId::Lse,
            user_info: &[],
            free_indices: &free,
            n_points: 5,
            n_parameters: 2,
            reduction_width: plan.power_of_two_n_points,
            chunk_start: 0,
            fits_per_block: 1,
        };
        let mut buf = ChunkBuffers::allocate(&plan, 1);
        buf.data.copy_from_slice(&[1.0, 2.0, 3.0, 4.0, 5.0]);
        buf.parameters.copy_from_slice(&[0.5, 0.5]);

        run_chunk(&ctx, &mut buf, 1e-6, 10);

        // Nothing moves, so the tolerance test passes immediately.
        assert_eq!(buf.states[0], FitState::Converged);
        assert_eq!(buf.n_iterations[0], 1);
        assert_eq!(&buf.parameters[..], &[0.5, 0.5]);
    }

    #[test]
    fn degenerate_data_reports_singular_hessian() {
        // All x = 0: the slope's derivative column vanishes, so its Hessian
        // row stays zero even after damping.
        let x: Vec<u8> = [0.0f32; 5].iter().flat_map(|v| v.to_ne_bytes()).collect();
        let plan = plan(1, 5, 2, 2);
        let free = [0usize, 1];
        let ctx = KernelContext {
            model: ModelId::Linear1D,
            estimator: EstimatorId::Lse,
            user_info: &x,
            free_indices: &free,
            n_points: 5,
            n_parameters: 2,
            reduction_width: plan.power_of_two_n_points,
            chunk_start: 0,
            fits_per_block: 1,
        };
        let mut buf = ChunkBuffers::allocate(&plan, 1);
        buf.data.copy_from_slice(&[1.0, 2.0, 3.0, 4.0, 5.0]);

        run_chunk(&ctx, &mut buf, 1e-6, 10);

        assert_eq!(buf.states[0], FitState::SingularHessian);
        // Parameters never moved off the initial guess.
        assert_eq!(&buf.parameters[..], &[0.0, 0.0]);
    }

    #[test]
    fn iteration_budget_exhaustion_is_reported() {
        let plan = plan(1, 5, 2, 2);
        let free = [0usize, 1];
        let ctx = KernelContext {
            model: ModelId::Linear1D,
            estimator: EstimatorId::Lse,
            user_info: &[],
            free_indices: &free,
            n_points: 5,
            n_parameters: 2,
            reduction_width: plan.power_of_two_n_points,
            chunk_start: 0,
            fits_per_block: 1,
        };
        let mut buf = ChunkBuffers::allocate(&plan, 1);
        buf.data.copy_from_slice(&[1.0, 2.0, 3.0, 4.0, 5.0]);
        buf.parameters.copy_from_slice(&[100.0, -50.0]);

        // A one-iteration budget cannot reach the tolerance from here.
        run_chunk(&ctx, &mut buf, 1e-12, 1);

        assert_eq!(buf.states[0], FitState::MaxIteration);
        assert_eq!(buf.n_iterations[0], 1);
    }
}
