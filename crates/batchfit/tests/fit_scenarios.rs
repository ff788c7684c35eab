//! End-to-end fitting scenarios.

use batchfit::prelude::*;
use batchfit::rng;

fn as_bytes(values: &[f32]) -> Vec<u8> {
    values.iter().flat_map(|v| v.to_ne_bytes()).collect()
}

#[test]
fn tiny_linear_fit_recovers_unit_line() {
    let data = [1.0f32, 2.0, 3.0, 4.0, 5.0];
    let grid = as_bytes(&[0.0, 1.0, 2.0, 3.0, 4.0]);

    let engine = FitEngine::new(FitOptions::default()).unwrap();
    let output = engine
        .fit(
            &FitProblem::new(ModelId::Linear1D, EstimatorId::Lse, 1, 5, &data, &[0.0, 0.0])
                .with_tolerance(1e-6)
                .with_max_iterations(10)
                .with_user_info(&grid),
        )
        .unwrap();

    assert_eq!(output.states[0], FitState::Converged);
    assert!(output.n_iterations[0] <= 3, "took {}", output.n_iterations[0]);
    let p = output.fit_parameters(0);
    assert!((p[0] - 1.0).abs() < 1e-3, "offset {}", p[0]);
    assert!((p[1] - 1.0).abs() < 1e-3, "slope {}", p[1]);
    assert!(output.chi_squares[0] < 1e-6);
}

#[test]
fn gauss_1d_with_frozen_center() {
    const N_FITS: usize = 100;
    const N_POINTS: usize = 50;
    const CENTER: f32 = 5.0;
    let seed = 1234;

    let mut data = Vec::with_capacity(N_FITS * N_POINTS);
    let mut initial = Vec::with_capacity(N_FITS * 4);
    let mut truth = Vec::with_capacity(N_FITS * 4);
    for fit in 0..N_FITS {
        let amplitude = rng::uniform_in(seed, fit as u32, 0, 3.0, 5.0) as f32;
        let width = rng::uniform_in(seed, fit as u32, 1, 1.0, 2.0) as f32;
        let offset = rng::uniform_in(seed, fit as u32, 2, 0.5, 1.5) as f32;
        for point in 0..N_POINTS {
            let dx = point as f32 - CENTER;
            data.push(amplitude * (-0.5 * dx * dx / (width * width)).exp() + offset);
        }
        truth.extend_from_slice(&[amplitude, CENTER, width, offset]);
        // Perturb the free parameters by 20%; the frozen center is exact.
        initial.extend_from_slice(&[amplitude * 1.2, CENTER, width * 0.8, offset * 1.2]);
    }

    let engine = FitEngine::new(FitOptions::default()).unwrap();
    let output = engine
        .fit(
            &FitProblem::new(
                ModelId::Gauss1D,
                EstimatorId::Lse,
                N_FITS,
                N_POINTS,
                &data,
                &initial,
            )
            .with_parameters_to_fit(&[true, false, true, true])
            .with_tolerance(1e-6)
            .with_max_iterations(50),
        )
        .unwrap();

    for fit in 0..N_FITS {
        assert_eq!(
            output.states[fit],
            FitState::Converged,
            "fit {fit} ended {}",
            output.states[fit]
        );
        let p = output.fit_parameters(fit);
        let t = &truth[fit * 4..(fit + 1) * 4];
        for (index, label) in [(0usize, "amplitude"), (2, "width"), (3, "offset")] {
            let relative = (p[index] - t[index]).abs() / t[index];
            assert!(
                relative < 0.05,
                "fit {fit} {label}: {} vs truth {}",
                p[index],
                t[index]
            );
        }
        // The frozen center never moves, not even by rounding.
        assert_eq!(p[1], CENTER);
    }
}

#[test]
fn constant_x_reports_singular_hessian() {
    const N_FITS: usize = 3;
    let data = [1.0f32, 2.0, 3.0, 4.0, 5.0, 2.0, 2.5, 3.0, 3.5, 4.0, 0.5, 0.5, 0.5, 0.5, 0.5];
    // Every point sits at x = 0, so offset and slope are indistinguishable.
    let grid = as_bytes(&[0.0; 5]);
    let initial = [0.0f32; N_FITS * 2];

    let engine = FitEngine::new(FitOptions::default()).unwrap();
    let output = engine
        .fit(
            &FitProblem::new(
                ModelId::Linear1D,
                EstimatorId::Lse,
                N_FITS,
                5,
                &data,
                &initial,
            )
            .with_user_info(&grid),
        )
        .unwrap();

    assert!(
        output
            .states
            .iter()
            .any(|&s| s == FitState::SingularHessian),
        "states: {:?}",
        output.states
    );
    for fit in 0..N_FITS {
        if output.states[fit] == FitState::SingularHessian {
            // A singular fit keeps its initial parameters.
            assert_eq!(output.fit_parameters(fit), &[0.0, 0.0]);
        }
    }
}

#[test]
fn iteration_budget_ceiling() {
    // 5x5 raster of a narrow peak, starting far outside the basin.
    const N_POINTS: usize = 25;
    let mut data = [0.0f32; N_POINTS];
    for (point, value) in data.iter_mut().enumerate() {
        let x = (point % 5) as f32;
        let y = (point / 5) as f32;
        let argx = (x - 2.0) * (x - 2.0) / (2.0 * 0.5 * 0.5);
        let argy = (y - 2.0) * (y - 2.0) / (2.0 * 0.5 * 0.5);
        *value = 4.0 * (-argx - argy).exp() + 1.0;
    }
    let initial = [1.0f32, 0.5, 0.5, 2.0, 0.0];

    let engine = FitEngine::new(FitOptions::default()).unwrap();
    let output = engine
        .fit(
            &FitProblem::new(
                ModelId::Gauss2D,
                EstimatorId::Lse,
                1,
                N_POINTS,
                &data,
                &initial,
            )
            .with_tolerance(1e-10)
            .with_max_iterations(2),
        )
        .unwrap();

    assert_eq!(output.states[0], FitState::MaxIteration);
    assert_eq!(output.n_iterations[0], 2);
}

#[test]
fn mle_poisson_recovers_gaussian() {
    const N_FITS: usize = 50;
    const N_POINTS: usize = 30;
    let seed = 99;
    let truth = [20.0f32, 15.0, 3.0, 5.0];

    let mut data = Vec::with_capacity(N_FITS * N_POINTS);
    let mut initial = Vec::with_capacity(N_FITS * 4);
    for fit in 0..N_FITS {
        for point in 0..N_POINTS {
            let dx = point as f32 - truth[1];
            let mean = truth[0] * (-0.5 * dx * dx / (truth[2] * truth[2])).exp() + truth[3];
            data.push(rng::poisson(seed, fit as u32, point as u32, mean as f64) as f32);
        }
        initial.extend_from_slice(&[
            truth[0] * 1.1,
            truth[1] + 0.5,
            truth[2] * 0.9,
            truth[3] * 1.1,
        ]);
    }

    let engine = FitEngine::new(FitOptions::default()).unwrap();
    let output = engine
        .fit(
            &FitProblem::new(
                ModelId::Gauss1D,
                EstimatorId::Mle,
                N_FITS,
                N_POINTS,
                &data,
                &initial,
            )
            .with_tolerance(1e-6)
            .with_max_iterations(100),
        )
        .unwrap();

    let mut mean_recovered = [0.0f64; 4];
    for fit in 0..N_FITS {
        assert_eq!(
            output.states[fit],
            FitState::Converged,
            "fit {fit} ended {}",
            output.states[fit]
        );
        let p = output.fit_parameters(fit);
        // Loose per-fit bounds: one fit's sampling noise.
        assert!((p[0] - truth[0]).abs() < 8.0, "fit {fit} amplitude {}", p[0]);
        assert!((p[1] - truth[1]).abs() < 1.5, "fit {fit} center {}", p[1]);
        assert!((p[2] - truth[2]).abs() < 1.5, "fit {fit} width {}", p[2]);
        assert!((p[3] - truth[3]).abs() < 3.0, "fit {fit} offset {}", p[3]);
        for (slot, mean) in mean_recovered.iter_mut().enumerate() {
            *mean += p[slot] as f64 / N_FITS as f64;
        }
    }

    // Across the batch the estimator is unbiased; the means sit tight.
    assert!((mean_recovered[0] - 20.0).abs() < 1.5, "{mean_recovered:?}");
    assert!((mean_recovered[1] - 15.0).abs() < 0.3, "{mean_recovered:?}");
    assert!((mean_recovered[2] - 3.0).abs() < 0.3, "{mean_recovered:?}");
    assert!((mean_recovered[3] - 5.0).abs() < 0.8, "{mean_recovered:?}");
}

#[test]
fn chunk_boundaries_do_not_change_results() {
    const N_FITS: usize = 25_000;
    const N_POINTS: usize = 8;
    let seed = 7;

    let mut data = Vec::with_capacity(N_FITS * N_POINTS);
    let mut initial = Vec::with_capacity(N_FITS * 2);
    for fit in 0..N_FITS {
        let offset = rng::uniform_in(seed, fit as u32, 0, -1.0, 1.0) as f32;
        let slope = rng::uniform_in(seed, fit as u32, 1, 0.5, 2.0) as f32;
        for point in 0..N_POINTS {
            let noise = rng::gaussian_scaled(seed, fit as u32, 2 + point as u32, 0.0, 0.05) as f32;
            data.push(offset + slope * point as f32 + noise);
        }
        initial.extend_from_slice(&[0.0, 1.0]);
    }

    let run = |max_chunk_size: usize| {
        let engine =
            FitEngine::new(FitOptions::default().with_max_chunk_size(max_chunk_size)).unwrap();
        engine
            .fit(
                &FitProblem::new(
                    ModelId::Linear1D,
                    EstimatorId::Lse,
                    N_FITS,
                    N_POINTS,
                    &data,
                    &initial,
                )
                .with_max_iterations(10),
            )
            .unwrap()
    };

    let chunked = run(10_000);
    let whole = run(25_000);

    assert_eq!(chunked.states, whole.states);
    assert_eq!(chunked.n_iterations, whole.n_iterations);
    // Bitwise identity, not approximate equality.
    for fit in 0..N_FITS {
        assert_eq!(
            chunked.chi_squares[fit].to_bits(),
            whole.chi_squares[fit].to_bits(),
            "chi-square of fit {fit} differs across chunkings"
        );
    }
    for (index, (a, b)) in chunked
        .parameters
        .iter()
        .zip(whole.parameters.iter())
        .enumerate()
    {
        assert_eq!(a.to_bits(), b.to_bits(), "parameter {index} differs");
    }
}
