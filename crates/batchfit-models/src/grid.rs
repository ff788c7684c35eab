//! Coordinate decoding from the opaque `user_info` buffer.
//!
//! The engine never interprets `user_info`; models do. The 1-D models accept
//! three layouts, distinguished purely by buffer length:
//!
//! - empty (or too short for a table): the x coordinate is the point index
//! - exactly `n_points` floats: one coordinate table shared by every fit
//! - more than `n_points` floats: one table per fit, laid out fit-major, so
//!   fit `i` reads floats `i*n_points .. (i+1)*n_points`
//!
//! 2-D models ignore `user_info` and address a square raster: with
//! `size = floor(sqrt(n_points))`, point `k` sits at
//! `(k % size, k / size)`.

use crate::PointContext;

/// Read the `index`-th f32 from a byte buffer (native endianness).
#[inline]
pub fn read_f32(bytes: &[u8], index: usize) -> f32 {
    let offset = index * 4;
    let raw: [u8; 4] = bytes[offset..offset + 4].try_into().unwrap();
    f32::from_ne_bytes(raw)
}

/// Number of whole f32 values a byte buffer holds.
#[inline]
pub fn f32_len(bytes: &[u8]) -> usize {
    bytes.len() / 4
}

/// The x coordinate for a 1-D model at this context.
#[inline]
pub fn coordinate_1d(ctx: &PointContext) -> f32 {
    let n_values = f32_len(ctx.user_info);
    if n_values == ctx.n_points {
        // One table shared by every fit.
        read_f32(ctx.user_info, ctx.point_index)
    } else if n_values > ctx.n_points {
        // One table per fit, fit-major.
        read_f32(ctx.user_info, ctx.fit_index * ctx.n_points + ctx.point_index)
    } else {
        ctx.point_index as f32
    }
}

/// The (x, y) raster coordinates for a 2-D model at this context.
#[inline]
pub fn coordinate_2d(ctx: &PointContext) -> (f32, f32) {
    let size_x = (ctx.n_points as f64).sqrt() as usize;
    let x = (ctx.point_index % size_x) as f32;
    let y = (ctx.point_index / size_x) as f32;
    (x, y)
}
