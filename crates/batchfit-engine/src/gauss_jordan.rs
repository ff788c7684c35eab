//! Batched Gauss-Jordan elimination with partial pivoting.
//!
//! One dense `N x N` system per fit, `N` = number of free parameters. The
//! damped Hessian and the gradient are copied into an augmented `[H | g]`
//! scratch block so the Hessian survives the elimination (the next
//! iteration's damping pass needs it intact). A zero pivot after partial
//! pivoting flags the fit singular and zeroes its step, so the update pass
//! leaves the fit's parameters untouched that iteration.

use rayon::prelude::*;

use crate::buffers::ChunkBuffers;
use crate::kernels::KernelContext;

/// Solve `H * delta = g` for every live fit in the chunk.
pub(crate) fn solve_equation_systems(ctx: &KernelContext, buf: &mut ChunkBuffers) {
    let n = ctx.free_indices.len();
    if n == 0 {
        return;
    }
    let b = &mut *buf;
    let stride = n + 1;
    let hessians = &b.hessians;
    let gradients = &b.gradients;
    let finished = &b.finished;

    (
        b.deltas.par_chunks_mut(n),
        b.solver_scratch.par_chunks_mut(n * stride),
        b.singular.par_iter_mut(),
    )
        .into_par_iter()
        .enumerate()
        .with_min_len(ctx.fits_per_block)
        .for_each(|(fit, (delta, augmented, singular))| {
            *singular = false;
            if finished[fit] {
                return;
            }

            let hessian = &hessians[fit * n * n..(fit + 1) * n * n];
            let gradient = &gradients[fit * n..(fit + 1) * n];
            for row in 0..n {
                augmented[row * stride..row * stride + n]
                    .copy_from_slice(&hessian[row * n..(row + 1) * n]);
                augmented[row * stride + n] = gradient[row];
            }

            for column in 0..n {
                // Partial pivoting over the remaining sub-column.
                let mut pivot_row = column;
                let mut pivot_max = augmented[column * stride + column].abs();
                for row in column + 1..n {
                    let candidate = augmented[row * stride + column].abs();
                    if candidate > pivot_max {
                        pivot_max = candidate;
                        pivot_row = row;
                    }
                }

                if pivot_max == 0.0 {
                    *singular = true;
                    delta.fill(0.0);
                    return;
                }

                if pivot_row != column {
                    for c in 0..stride {
                        augmented.swap(column * stride + c, pivot_row * stride + c);
                    }
                }

                let pivot = augmented[column * stride + column];
                for c in 0..stride {
                    augmented[column * stride + c] /= pivot;
                }

                for row in 0..n {
                    if row == column {
                        continue;
                    }
                    let factor = augmented[row * stride + column];
                    for c in 0..stride {
                        augmented[row * stride + c] -= factor * augmented[column * stride + c];
                    }
                }
            }

            for row in 0..n {
                delta[row] = augmented[row * stride + n];
            }
        });
}
