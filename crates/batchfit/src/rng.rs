//! Reproducible random data for synthetic fit batches.
//!
//! A stateless hash-based generator: each value is computed independently
//! from `(seed, fit_index, stream_index)`, so batches can be synthesized in
//! any order - or in parallel - and still come out identical. The mixer is
//! SplitMix64; Gaussian values use the Box-Muller transform and Poisson
//! counts use Knuth's product-of-uniforms inversion, drawing consecutive
//! stream indices.
//!
//! # Example
//!
//! ```rust
//! use batchfit::rng::{gaussian_scaled, uniform};
//!
//! let seed = 42;
//! // Same coordinates, same value.
//! assert_eq!(uniform(seed, 0, 0), uniform(seed, 0, 0));
//! assert_ne!(uniform(seed, 0, 0), uniform(seed, 1, 0));
//!
//! // An amplitude around 4.0 with 5% spread for fit 17.
//! let amplitude = gaussian_scaled(seed, 17, 0, 4.0, 0.2);
//! assert!(amplitude > 2.0 && amplitude < 6.0);
//! ```

use std::f64::consts::PI;

/// SplitMix64 mixing function.
#[inline]
pub fn splitmix64(mut x: u64) -> u64 {
    x = x.wrapping_add(0x9e3779b97f4a7c15);
    x = (x ^ (x >> 30)).wrapping_mul(0xbf58476d1ce4e5b9);
    x = (x ^ (x >> 27)).wrapping_mul(0x94d049bb133111eb);
    x ^ (x >> 31)
}

/// Mix the seed with the sample coordinates.
///
/// The two indices land in different bit ranges so neighboring fits and
/// streams never collide.
#[inline]
fn combine_indices(seed: u64, fit_index: u32, stream_index: u32) -> u64 {
    seed ^ (fit_index as u64).wrapping_mul(0x517cc1b727220a95)
        ^ (stream_index as u64).wrapping_mul(0x5851f42d4c957f2d)
}

/// Uniform f64 in `[0, 1)` at the given coordinates.
#[inline]
pub fn uniform(seed: u64, fit_index: u32, stream_index: u32) -> f64 {
    let hash = splitmix64(combine_indices(seed, fit_index, stream_index));
    // Upper 53 bits for full mantissa precision.
    (hash >> 11) as f64 * (1.0 / (1u64 << 53) as f64)
}

/// Uniform f64 in `[lo, hi)` at the given coordinates.
#[inline]
pub fn uniform_in(seed: u64, fit_index: u32, stream_index: u32, lo: f64, hi: f64) -> f64 {
    lo + uniform(seed, fit_index, stream_index) * (hi - lo)
}

/// Standard Gaussian at the given coordinates (Box-Muller).
#[inline]
pub fn gaussian(seed: u64, fit_index: u32, stream_index: u32) -> f64 {
    let u1 = uniform(seed, fit_index, stream_index.wrapping_mul(2));
    let u2 = uniform(seed, fit_index, stream_index.wrapping_mul(2).wrapping_add(1));
    let u1 = u1.max(1e-10); // keep the log finite
    (-2.0 * u1.ln()).sqrt() * (2.0 * PI * u2).cos()
}

/// Gaussian with the given mean and sigma.
#[inline]
pub fn gaussian_scaled(seed: u64, fit_index: u32, stream_index: u32, mean: f64, sigma: f64) -> f64 {
    mean + gaussian(seed, fit_index, stream_index) * sigma
}

/// Poisson count with the given mean (Knuth's inversion).
///
/// Draws uniforms from consecutive stream indices starting at
/// `stream_index * 64`, so callers should space their streams accordingly.
/// Suitable for the moderate means of synthetic photon data; cost grows
/// linearly with the mean.
pub fn poisson(seed: u64, fit_index: u32, stream_index: u32, mean: f64) -> u32 {
    let limit = (-mean).exp();
    let base = stream_index.wrapping_mul(64);
    let mut product = 1.0;
    let mut count = 0u32;
    loop {
        product *= uniform(seed, fit_index, base.wrapping_add(count));
        if product <= limit {
            return count;
        }
        count += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn uniform_is_deterministic_and_bounded() {
        for i in 0..1000u32 {
            let value = uniform(7, i, 3);
            assert!((0.0..1.0).contains(&value));
            assert_eq!(value, uniform(7, i, 3));
        }
    }

    #[test]
    fn uniform_in_respects_range() {
        for i in 0..100u32 {
            let value = uniform_in(7, i, 0, 2.0, 5.0);
            assert!((2.0..5.0).contains(&value));
        }
    }

    #[test]
    fn gaussian_moments_are_sane() {
        let samples: Vec<f64> = (0..5000).map(|i| gaussian(42, i, 0)).collect();
        let mean = samples.iter().sum::<f64>() / samples.len() as f64;
        let variance =
            samples.iter().map(|x| (x - mean) * (x - mean)).sum::<f64>() / samples.len() as f64;
        assert!(mean.abs() < 0.05, "mean {mean}");
        assert!((variance - 1.0).abs() < 0.1, "variance {variance}");
    }

    #[test]
    fn poisson_mean_tracks_parameter() {
        let mean_parameter = 8.0;
        let samples: Vec<u32> = (0..2000).map(|i| poisson(9, i, 0, mean_parameter)).collect();
        let mean = samples.iter().map(|&c| c as f64).sum::<f64>() / samples.len() as f64;
        assert!((mean - mean_parameter).abs() < 0.3, "mean {mean}");
    }

    #[test]
    fn distinct_streams_are_independent() {
        assert_ne!(uniform(1, 0, 0), uniform(1, 0, 1));
        assert_ne!(uniform(1, 0, 0), uniform(2, 0, 0));
    }
}
