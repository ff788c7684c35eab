//! Working arrays for one chunk of fits.
//!
//! All per-fit state lives in flat, fit-major arrays so the kernels can
//! split them into disjoint per-fit slices for the parallel passes. The
//! buffers are allocated when a chunk starts and dropped when it ends; the
//! host arrays of the call are copied in and out around the iteration loop.

use batchfit_core::FitState;

use crate::plan::ChunkPlan;

/// Levenberg-Marquardt damping at the start of every fit.
pub const INITIAL_LAMBDA: f32 = 0.001;

/// All device-side working arrays for one chunk.
#[derive(Debug)]
pub struct ChunkBuffers {
    /// Fits in this chunk.
    pub chunk_size: usize,

    // Inputs, copied from the host arrays.
    /// `chunk_size * n_points` data values.
    pub data: Vec<f32>,
    /// `chunk_size * n_points` weights; empty when the call is unweighted.
    pub weights: Vec<f32>,

    // Fit state, updated in place.
    /// `chunk_size * n_parameters` current parameters.
    pub parameters: Vec<f32>,
    /// `chunk_size * n_parameters` rollback snapshot from the last update.
    pub prev_parameters: Vec<f32>,
    /// Current chi-square per fit.
    pub chi_squares: Vec<f32>,
    /// Best accepted chi-square per fit.
    pub prev_chi_squares: Vec<f32>,
    /// Damping per fit, always positive.
    pub lambdas: Vec<f32>,

    // Per-iteration scratch.
    /// `chunk_size * n_points` model values.
    pub values: Vec<f32>,
    /// `chunk_size * n_parameters * n_points`, parameter-major per fit.
    pub derivatives: Vec<f32>,
    /// `chunk_size * n_parameters_to_fit` descent gradient.
    pub gradients: Vec<f32>,
    /// `chunk_size * n_parameters_to_fit^2` damped Gauss-Newton Hessian.
    pub hessians: Vec<f32>,
    /// `chunk_size * n_parameters_to_fit` solved step.
    pub deltas: Vec<f32>,
    /// `chunk_size * power_of_two_n_points` tree-reduction buffer.
    pub reduction: Vec<f32>,
    /// `chunk_size * n_parameters_to_fit * (n_parameters_to_fit + 1)`
    /// augmented-system scratch for the elimination.
    pub solver_scratch: Vec<f32>,

    // Flags and outcomes.
    /// Sticky per-fit completion flag.
    pub finished: Vec<bool>,
    /// Set when the most recent step raised chi-square.
    pub iteration_failed: Vec<bool>,
    /// Set by the solver on a zero pivot.
    pub singular: Vec<bool>,
    /// Terminal state per fit.
    pub states: Vec<FitState>,
    /// Iteration count at the moment a fit finished; 0 while running.
    pub n_iterations: Vec<u32>,
}

impl ChunkBuffers {
    /// Allocate zeroed working arrays for `chunk_size` fits.
    pub fn allocate(plan: &ChunkPlan, chunk_size: usize) -> Self {
        let d = &plan.dims;
        let n_free = d.n_parameters_to_fit;
        Self {
            chunk_size,
            data: vec![0.0; chunk_size * d.n_points],
            weights: if d.use_weights {
                vec![0.0; chunk_size * d.n_points]
            } else {
                Vec::new()
            },
            parameters: vec![0.0; chunk_size * d.n_parameters],
            prev_parameters: vec![0.0; chunk_size * d.n_parameters],
            chi_squares: vec![0.0; chunk_size],
            prev_chi_squares: vec![0.0; chunk_size],
            lambdas: vec![INITIAL_LAMBDA; chunk_size],
            values: vec![0.0; chunk_size * d.n_points],
            derivatives: vec![0.0; chunk_size * d.n_parameters * d.n_points],
            gradients: vec![0.0; chunk_size * n_free],
            hessians: vec![0.0; chunk_size * n_free * n_free],
            deltas: vec![0.0; chunk_size * n_free],
            reduction: vec![0.0; chunk_size * plan.power_of_two_n_points],
            solver_scratch: vec![0.0; chunk_size * n_free * (n_free + 1)],
            finished: vec![false; chunk_size],
            iteration_failed: vec![false; chunk_size],
            singular: vec![false; chunk_size],
            states: vec![FitState::Converged; chunk_size],
            n_iterations: vec![0; chunk_size],
        }
    }

    /// Copy this chunk's slice of the host input arrays in.
    pub fn load(
        &mut self,
        plan: &ChunkPlan,
        chunk_start: usize,
        data: &[f32],
        weights: Option<&[f32]>,
        initial_parameters: &[f32],
    ) {
        let d = &plan.dims;
        let point_base = chunk_start * d.n_points;
        let param_base = chunk_start * d.n_parameters;

        self.data
            .copy_from_slice(&data[point_base..point_base + self.chunk_size * d.n_points]);
        if let Some(weights) = weights {
            self.weights
                .copy_from_slice(&weights[point_base..point_base + self.chunk_size * d.n_points]);
        }
        self.parameters.copy_from_slice(
            &initial_parameters[param_base..param_base + self.chunk_size * d.n_parameters],
        );
    }

    /// Copy this chunk's results out into the host output arrays.
    pub fn store(
        &self,
        plan: &ChunkPlan,
        chunk_start: usize,
        out_parameters: &mut [f32],
        out_states: &mut [FitState],
        out_chi_squares: &mut [f32],
        out_n_iterations: &mut [u32],
    ) {
        let d = &plan.dims;
        let param_base = chunk_start * d.n_parameters;

        out_parameters[param_base..param_base + self.chunk_size * d.n_parameters]
            .copy_from_slice(&self.parameters);
        out_states[chunk_start..chunk_start + self.chunk_size].copy_from_slice(&self.states);
        out_chi_squares[chunk_start..chunk_start + self.chunk_size]
            .copy_from_slice(&self.chi_squares);
        out_n_iterations[chunk_start..chunk_start + self.chunk_size]
            .copy_from_slice(&self.n_iterations);
    }

    /// Weight for `(fit, point)`, 1 when the call is unweighted.
    #[inline]
    pub fn weight(&self, n_points: usize, fit: usize, point: usize) -> f32 {
        if self.weights.is_empty() {
            1.0
        } else {
            self.weights[fit * n_points + point]
        }
    }
}
