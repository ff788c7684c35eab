//! Chunk sizing and dispatch planning.
//!
//! Before the first iteration the planner decides how many fits fit into one
//! chunk of device working memory, the power-of-two width of the per-fit
//! reduction buffers, and how many fits share a dispatch block. Chunk
//! boundaries are rounded to a power of ten so runs are reproducible across
//! hosts with slightly different memory budgets.

use crate::device::DeviceLimits;
use crate::error::{Error, Result};

/// Problem dimensions the planner works from.
#[derive(Debug, Clone, Copy)]
pub struct FitDimensions {
    /// Total number of fits in the call.
    pub n_fits: usize,
    /// Data points per fit.
    pub n_points: usize,
    /// Model parameters per fit (free + fixed).
    pub n_parameters: usize,
    /// Free parameters per fit.
    pub n_parameters_to_fit: usize,
    /// Whether a per-point weight vector is carried.
    pub use_weights: bool,
}

/// The planner's decisions for one call.
#[derive(Debug, Clone)]
pub struct ChunkPlan {
    /// Dimensions the plan was made for.
    pub dims: FitDimensions,
    /// Smallest power of two >= `n_points`; reduction width with zero padding.
    pub power_of_two_n_points: usize,
    /// Upper bound on fits per chunk.
    pub max_chunk_size: usize,
    /// Threads-per-block cap, retained for the per-chunk block packing.
    max_threads_per_block: usize,
}

impl ChunkPlan {
    /// Plan chunking for a call.
    ///
    /// `forced_max_chunk_size` pins the chunk bound directly (still clamped
    /// to `n_fits`), bypassing the memory-derived sizing; it exists so chunk
    /// streaming is testable and for operators who know their working set.
    pub fn new(
        dims: FitDimensions,
        limits: &DeviceLimits,
        forced_max_chunk_size: Option<usize>,
    ) -> Result<Self> {
        let mut power_of_two_n_points = 1;
        while power_of_two_n_points < dims.n_points {
            power_of_two_n_points *= 2;
        }

        let max_chunk_size = match forced_max_chunk_size {
            Some(forced) => forced.min(dims.n_fits).max(1),
            None => Self::derive_max_chunk_size(&dims, limits)?,
        };

        log::debug!(
            "chunk plan: {} fits in chunks of {max_chunk_size}, reduction width {power_of_two_n_points}",
            dims.n_fits
        );

        Ok(Self {
            dims,
            power_of_two_n_points,
            max_chunk_size,
            max_threads_per_block: limits.max_threads_per_block,
        })
    }

    /// Device working memory one fit occupies, in bytes.
    ///
    /// Covers the data and value vectors, current and previous parameters,
    /// gradient and delta, the Hessian, the derivative matrix, the four
    /// per-fit scalars, the three per-fit flags, and the optional weights.
    pub fn one_fit_footprint(dims: &FitDimensions) -> usize {
        let floats = 2 * dims.n_points
            + 2 * dims.n_parameters
            + 2 * dims.n_parameters_to_fit
            + dims.n_parameters_to_fit * dims.n_parameters_to_fit
            + dims.n_points * dims.n_parameters
            + 4;
        let mut bytes = 4 * floats + 4 * 3;
        if dims.use_weights {
            bytes += 4 * dims.n_points;
        }
        bytes
    }

    fn derive_max_chunk_size(dims: &FitDimensions, limits: &DeviceLimits) -> Result<usize> {
        let footprint = Self::one_fit_footprint(dims);

        let mut chunk_size = limits.memory_budget / footprint;
        if chunk_size == 0 {
            return Err(Error::OutOfMemory);
        }

        chunk_size = chunk_size.min(limits.max_blocks);

        // Guard the kernels' index arithmetic against overflow.
        let scaling_factor = if dims.n_parameters_to_fit > 0 {
            dims.n_points * dims.n_parameters_to_fit * dims.n_parameters_to_fit
        } else {
            dims.n_points * dims.n_parameters
        };
        chunk_size = chunk_size.min(usize::MAX / scaling_factor);

        // Round down to the largest power of ten <= the bound, so chunk
        // boundaries land on round, reproducible figures (37421 -> 30000).
        let mut magnitude = 1;
        let mut remaining = chunk_size;
        while remaining > 10 {
            magnitude *= 10;
            remaining /= 10;
        }
        chunk_size = chunk_size / magnitude * magnitude;

        Ok(chunk_size.min(dims.n_fits))
    }

    /// Number of chunks the call streams through.
    pub fn n_chunks(&self) -> usize {
        self.dims.n_fits.div_ceil(self.max_chunk_size)
    }

    /// `(first_fit, size)` of the given chunk.
    pub fn chunk_bounds(&self, chunk_index: usize) -> (usize, usize) {
        let start = chunk_index * self.max_chunk_size;
        let size = self.max_chunk_size.min(self.dims.n_fits - start);
        (start, size)
    }

    /// Fits packed into one dispatch block for a chunk of the given size.
    ///
    /// Halves from 8 until the block divides the chunk evenly and stays
    /// under a quarter of the thread cap; the floor is one fit per block.
    pub fn fits_per_block(&self, chunk_size: usize) -> usize {
        let mut fits_per_block = 8usize;
        loop {
            fits_per_block /= 2;
            let divides = chunk_size % fits_per_block == 0;
            let enough_threads =
                fits_per_block * self.dims.n_points < self.max_threads_per_block / 4;
            if (divides && enough_threads) || fits_per_block <= 1 {
                break;
            }
        }
        fits_per_block.max(1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dims(n_fits: usize, n_points: usize, n_parameters: usize, n_free: usize) -> FitDimensions {
        FitDimensions {
            n_fits,
            n_points,
            n_parameters,
            n_parameters_to_fit: n_free,
            use_weights: false,
        }
    }

    fn limits(memory_budget: usize) -> DeviceLimits {
        DeviceLimits {
            workers: 4,
            memory_budget,
            max_threads_per_block: 1024,
            max_blocks: 65_535,
        }
    }

    #[test]
    fn reduction_width_is_next_power_of_two() {
        let plan = ChunkPlan::new(dims(10, 5, 2, 2), &limits(1 << 20), None).unwrap();
        assert_eq!(plan.power_of_two_n_points, 8);

        let plan = ChunkPlan::new(dims(10, 64, 2, 2), &limits(1 << 20), None).unwrap();
        assert_eq!(plan.power_of_two_n_points, 64);
    }

    #[test]
    fn footprint_matches_formula() {
        let d = dims(1, 5, 2, 2);
        // 4 * (2*5 + 2*2 + 2*2 + 4 + 10 + 4) + 12 = 4*36 + 12
        assert_eq!(ChunkPlan::one_fit_footprint(&d), 4 * 36 + 12);

        let weighted = FitDimensions {
            use_weights: true,
            ..d
        };
        assert_eq!(ChunkPlan::one_fit_footprint(&weighted), 4 * 36 + 12 + 20);
    }

    #[test]
    fn chunk_size_rounds_down_to_power_of_ten() {
        let d = dims(1_000_000, 5, 2, 2);
        let footprint = ChunkPlan::one_fit_footprint(&d);
        // Budget for 37421 fits should round the bound down to 30000.
        let plan = ChunkPlan::new(d, &limits(footprint * 37_421), None).unwrap();
        assert_eq!(plan.max_chunk_size, 30_000);
    }

    #[test]
    fn chunk_size_clamps_to_n_fits_after_rounding() {
        let d = dims(25_000, 5, 2, 2);
        let footprint = ChunkPlan::one_fit_footprint(&d);
        // Bound rounds to 30000, then clamps to the 25000 fits present.
        let plan = ChunkPlan::new(d, &limits(footprint * 37_421), None).unwrap();
        assert_eq!(plan.max_chunk_size, 25_000);
        assert_eq!(plan.n_chunks(), 1);
    }

    #[test]
    fn zero_chunk_is_out_of_memory() {
        let d = dims(10, 5, 2, 2);
        let result = ChunkPlan::new(d, &limits(8), None);
        assert!(matches!(result, Err(Error::OutOfMemory)));
    }

    #[test]
    fn forced_chunk_size_streams_in_chunks() {
        let plan = ChunkPlan::new(dims(25_000, 5, 2, 2), &limits(1 << 30), Some(10_000)).unwrap();
        assert_eq!(plan.n_chunks(), 3);
        assert_eq!(plan.chunk_bounds(0), (0, 10_000));
        assert_eq!(plan.chunk_bounds(2), (20_000, 5_000));
    }

    #[test]
    fn fits_per_block_halves_to_fit() {
        let plan = ChunkPlan::new(dims(10_000, 25, 5, 5), &limits(1 << 30), None).unwrap();
        // 4 * 25 = 100 threads < 256: four fits per block divide 10000 evenly.
        assert_eq!(plan.fits_per_block(10_000), 4);

        // 4 * 100 = 400 threads >= 256, 2 * 100 < 256.
        let plan = ChunkPlan::new(dims(10_000, 100, 5, 5), &limits(1 << 30), None).unwrap();
        assert_eq!(plan.fits_per_block(10_000), 2);
    }

    #[test]
    fn fits_per_block_floors_at_one() {
        let plan = ChunkPlan::new(dims(10_000, 500, 5, 5), &limits(1 << 30), None).unwrap();
        assert_eq!(plan.fits_per_block(10_000), 1);
    }
}
