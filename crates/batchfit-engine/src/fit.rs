//! Public fitting entry point.
//!
//! [`FitEngine::fit`] validates the call, sizes chunks through the planner,
//! and streams each chunk through the iteration driver: copy the chunk's
//! inputs into working buffers, run the loop, copy the results out. Chunks
//! are processed sequentially on one engine; fits inside a chunk run in
//! parallel on the engine's worker pool.

use batchfit_core::{EstimatorId, FitState, ModelId, ParameterMask};

use crate::buffers::ChunkBuffers;
use crate::device::DeviceLimits;
use crate::driver::run_chunk;
use crate::error::{Error, Result};
use crate::kernels::KernelContext;
use crate::plan::{ChunkPlan, FitDimensions};

/// Engine construction options.
///
/// # Example
///
/// ```rust
/// use batchfit_engine::{FitEngine, FitOptions};
///
/// let engine = FitEngine::new(
///     FitOptions::default()
///         .with_workers(2)
///         .with_memory_budget(64 * 1024 * 1024),
/// )
/// .unwrap();
/// assert_eq!(engine.limits().workers, 2);
/// ```
#[derive(Debug, Clone, Default)]
pub struct FitOptions {
    /// Substrate limits; defaults probe the host.
    pub limits: DeviceLimits,
    /// Pin the planner's chunk bound instead of deriving it from memory.
    pub max_chunk_size: Option<usize>,
}

impl FitOptions {
    /// Set the worker thread count. 0 means one per available core.
    pub fn with_workers(mut self, workers: usize) -> Self {
        self.limits.workers = workers;
        self
    }

    /// Set the chunk working-memory budget in bytes.
    pub fn with_memory_budget(mut self, bytes: usize) -> Self {
        self.limits.memory_budget = bytes;
        self
    }

    /// Pin the maximum number of fits per chunk.
    pub fn with_max_chunk_size(mut self, max_chunk_size: usize) -> Self {
        self.max_chunk_size = Some(max_chunk_size);
        self
    }
}

/// One batched fit call: many independent curve fits sharing a model shape
/// and point count, each with its own data and initial guess.
///
/// All arrays are flat and fit-major: `data[fit * n_points + point]`,
/// `initial_parameters[fit * n_parameters + parameter]`.
#[derive(Debug, Clone, Copy)]
pub struct FitProblem<'a> {
    /// Model function shared by every fit.
    pub model: ModelId,
    /// Objective shared by every fit.
    pub estimator: EstimatorId,
    /// Number of independent fits.
    pub n_fits: usize,
    /// Data points per fit.
    pub n_points: usize,
    /// `n_fits * n_points` data values.
    pub data: &'a [f32],
    /// Optional `n_fits * n_points` weights; consumed by least squares only.
    pub weights: Option<&'a [f32]>,
    /// `n_fits * n_parameters` starting parameters.
    pub initial_parameters: &'a [f32],
    /// Free/fixed flag per model parameter; `None` fits every parameter.
    pub parameters_to_fit: Option<&'a [bool]>,
    /// Relative chi-square change below which a fit converges.
    pub tolerance: f32,
    /// Iteration budget per fit.
    pub max_iterations: usize,
    /// Opaque bytes handed to the model evaluator (coordinate tables etc.).
    pub user_info: &'a [u8],
}

impl<'a> FitProblem<'a> {
    /// Default convergence tolerance.
    pub const DEFAULT_TOLERANCE: f32 = 1e-4;

    /// Default iteration budget.
    pub const DEFAULT_MAX_ITERATIONS: usize = 25;

    /// A problem with default tolerance, budget, no weights and all
    /// parameters free.
    pub fn new(
        model: ModelId,
        estimator: EstimatorId,
        n_fits: usize,
        n_points: usize,
        data: &'a [f32],
        initial_parameters: &'a [f32],
    ) -> Self {
        Self {
            model,
            estimator,
            n_fits,
            n_points,
            data,
            weights: None,
            initial_parameters,
            parameters_to_fit: None,
            tolerance: Self::DEFAULT_TOLERANCE,
            max_iterations: Self::DEFAULT_MAX_ITERATIONS,
            user_info: &[],
        }
    }

    /// Attach a per-point weight vector.
    pub fn with_weights(mut self, weights: &'a [f32]) -> Self {
        self.weights = Some(weights);
        self
    }

    /// Restrict the fit to the flagged parameters.
    pub fn with_parameters_to_fit(mut self, parameters_to_fit: &'a [bool]) -> Self {
        self.parameters_to_fit = Some(parameters_to_fit);
        self
    }

    /// Set the convergence tolerance.
    pub fn with_tolerance(mut self, tolerance: f32) -> Self {
        self.tolerance = tolerance;
        self
    }

    /// Set the iteration budget.
    pub fn with_max_iterations(mut self, max_iterations: usize) -> Self {
        self.max_iterations = max_iterations;
        self
    }

    /// Attach the opaque model payload.
    pub fn with_user_info(mut self, user_info: &'a [u8]) -> Self {
        self.user_info = user_info;
        self
    }
}

/// Results of one batched fit call, fit-major like the inputs.
#[derive(Debug, Clone)]
pub struct FitOutput {
    /// Model parameters per fit.
    pub n_parameters: usize,
    /// `n_fits * n_parameters` fitted parameters.
    pub parameters: Vec<f32>,
    /// Terminal state per fit.
    pub states: Vec<FitState>,
    /// Final chi-square per fit.
    pub chi_squares: Vec<f32>,
    /// Iterations each fit ran before finishing.
    pub n_iterations: Vec<u32>,
}

impl FitOutput {
    /// Number of fits in the call.
    pub fn n_fits(&self) -> usize {
        self.states.len()
    }

    /// The fitted parameter vector of one fit.
    pub fn fit_parameters(&self, fit: usize) -> &[f32] {
        &self.parameters[fit * self.n_parameters..(fit + 1) * self.n_parameters]
    }

    /// Number of fits that passed the tolerance test.
    pub fn converged_count(&self) -> usize {
        self.states.iter().filter(|s| s.is_converged()).count()
    }
}

/// The batched curve-fitting engine.
///
/// Owns the worker pool and the substrate limits. One engine instance
/// processes one call at a time; the chunks of a call run sequentially.
#[derive(Debug)]
pub struct FitEngine {
    limits: DeviceLimits,
    max_chunk_size: Option<usize>,
    pool: rayon::ThreadPool,
}

impl FitEngine {
    /// Build an engine, probing and starting the compute substrate.
    pub fn new(options: FitOptions) -> Result<Self> {
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(options.limits.workers)
            .thread_name(|i| format!("batchfit-worker-{i}"))
            .build()
            .map_err(|e| Error::DeviceUnavailable(e.to_string()))?;

        Ok(Self {
            limits: options.limits,
            max_chunk_size: options.max_chunk_size,
            pool,
        })
    }

    /// The substrate limits this engine plans against.
    pub fn limits(&self) -> &DeviceLimits {
        &self.limits
    }

    /// Run one batched fit call.
    ///
    /// Returns `Err` only for call-level problems (bad arguments, memory).
    /// Per-fit failures are reported through [`FitOutput::states`]; one
    /// fit's failure never disturbs its siblings.
    pub fn fit(&self, problem: &FitProblem) -> Result<FitOutput> {
        let n_parameters = problem.model.n_parameters();
        validate(problem, n_parameters)?;

        let mask = match problem.parameters_to_fit {
            Some(flags) => ParameterMask::new(flags),
            None => ParameterMask::all_free(n_parameters),
        };

        let dims = FitDimensions {
            n_fits: problem.n_fits,
            n_points: problem.n_points,
            n_parameters,
            n_parameters_to_fit: mask.n_free(),
            use_weights: problem.weights.is_some(),
        };
        let plan = ChunkPlan::new(dims, &self.limits, self.max_chunk_size)?;

        let mut output = FitOutput {
            n_parameters,
            parameters: vec![0.0; problem.n_fits * n_parameters],
            states: vec![FitState::Converged; problem.n_fits],
            chi_squares: vec![0.0; problem.n_fits],
            n_iterations: vec![0; problem.n_fits],
        };

        for chunk_index in 0..plan.n_chunks() {
            let (chunk_start, chunk_size) = plan.chunk_bounds(chunk_index);
            let mut buffers = ChunkBuffers::allocate(&plan, chunk_size);
            buffers.load(
                &plan,
                chunk_start,
                problem.data,
                problem.weights,
                problem.initial_parameters,
            );

            let ctx = KernelContext {
                model: problem.model,
                estimator: problem.estimator,
                user_info: problem.user_info,
                free_indices: mask.free_indices(),
                n_points: problem.n_points,
                n_parameters,
                reduction_width: plan.power_of_two_n_points,
                chunk_start,
                fits_per_block: plan.fits_per_block(chunk_size),
            };

            self.pool.install(|| {
                run_chunk(&ctx, &mut buffers, problem.tolerance, problem.max_iterations)
            });

            buffers.store(
                &plan,
                chunk_start,
                &mut output.parameters,
                &mut output.states,
                &mut output.chi_squares,
                &mut output.n_iterations,
            );
        }

        let converged = output.converged_count();
        if converged < output.n_fits() {
            log::warn!(
                "{} of {} fits did not converge",
                output.n_fits() - converged,
                output.n_fits()
            );
        }

        Ok(output)
    }
}

fn validate(problem: &FitProblem, n_parameters: usize) -> Result<()> {
    if problem.n_fits < 1 {
        return Err(Error::NoFits);
    }
    if problem.n_points < 1 {
        return Err(Error::NoPoints);
    }
    if !(problem.tolerance > 0.0) {
        return Err(Error::InvalidTolerance(problem.tolerance));
    }
    if problem.max_iterations < 1 {
        return Err(Error::InvalidMaxIterations);
    }

    let n_values = problem.n_fits * problem.n_points;
    if problem.data.len() != n_values {
        return Err(Error::DimensionMismatch {
            what: "data",
            expected: n_values,
            actual: problem.data.len(),
        });
    }
    if let Some(weights) = problem.weights {
        if weights.len() != n_values {
            return Err(Error::DimensionMismatch {
                what: "weights",
                expected: n_values,
                actual: weights.len(),
            });
        }
    }
    if problem.initial_parameters.len() != problem.n_fits * n_parameters {
        return Err(Error::DimensionMismatch {
            what: "initial_parameters",
            expected: problem.n_fits * n_parameters,
            actual: problem.initial_parameters.len(),
        });
    }
    if let Some(flags) = problem.parameters_to_fit {
        if flags.len() != n_parameters {
            return Err(Error::DimensionMismatch {
                what: "parameters_to_fit",
                expected: n_parameters,
                actual: flags.len(),
            });
        }
    }
    Ok(())
}
