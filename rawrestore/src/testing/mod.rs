//! Testing utilities for rawrestore.

#![allow(dead_code)]

use common::Buffer2;

/// Initialize tracing subscriber for tests.
/// Safe to call multiple times - will only initialize once.
/// Respects RUST_LOG env var, defaults to "info".
pub fn init_tracing() {
    use tracing_subscriber::EnvFilter;
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_test_writer()
        .try_init();
}

/// Deterministic pseudo-random grid in `[base, base + amplitude)`.
///
/// Uses a 32-bit LCG so tests do not depend on an RNG crate.
pub fn noise_grid(width: usize, height: usize, base: f32, amplitude: f32, seed: u32) -> Buffer2<f32> {
    let mut state = seed.wrapping_mul(747_796_405).wrapping_add(2_891_336_453);
    let pixels = (0..width * height)
        .map(|_| {
            state = state.wrapping_mul(1_664_525).wrapping_add(1_013_904_223);
            base + amplitude * ((state >> 8) as f32 / (1u32 << 24) as f32)
        })
        .collect();
    Buffer2::new(width, height, pixels)
}

/// Smooth horizontal ramp with a vertical ripple.
pub fn ramp_grid(width: usize, height: usize, lo: f32, hi: f32) -> Buffer2<f32> {
    let mut buf = Buffer2::new_default(width, height);
    for y in 0..height {
        for x in 0..width {
            let t = x as f32 / (width.max(2) - 1) as f32;
            buf[(x, y)] = lo + (hi - lo) * t + 0.05 * (hi - lo) * (y as f32 * 0.7).sin();
        }
    }
    buf
}

/// Asserts every pair of values differs by at most `tol`.
pub fn assert_close(actual: &[f32], expected: &[f32], tol: f32) {
    assert_eq!(actual.len(), expected.len(), "length mismatch");
    for (i, (&a, &e)) in actual.iter().zip(expected).enumerate() {
        assert!((a - e).abs() <= tol, "index {i}: expected {e}, got {a}");
    }
}

/// Fujifilm X-Trans tile used across tests.
pub const XTRANS_TEST_TILE: [[u8; 6]; 6] = [
    [1, 1, 0, 1, 1, 2],
    [1, 1, 2, 1, 1, 0],
    [2, 0, 1, 0, 2, 1],
    [1, 1, 2, 1, 1, 0],
    [1, 1, 0, 1, 1, 2],
    [0, 2, 1, 2, 0, 1],
];
