//! Iteration schedule of the global Retinex.
//!
//! With more than one iteration, each pass can shrink the neighbourhood, change
//! the scale count, and adjust the variance, clamp limit and strength. The
//! `gradient`, `grad_variance` and `grad_strength` parameters pick one of a few
//! fixed piecewise linear policies of the iteration index.

use super::params::RetinexParams;
use super::scales::MAX_SCALES;

/// Slope of the highlight factor in `highlight`.
const HIGH_SLOPE: f32 = 49.0 / 99.0;

/// Neighbourhood stretch of the highlight methods: `1 - a + a * highlight`
/// with `a = 49 / 99`.
pub fn highlight_factor(highlight: f32) -> f32 {
    (1.0 - HIGH_SLOPE) + HIGH_SLOPE * highlight
}

/// Neighbourhood divisor and raw scale count for iteration `it` (1-based).
///
/// `highlight_spacing` selects the highlight-aware variants of modes 5 and 6.
/// Unknown modes keep the divisor at 1 and the current `scale_count`.
pub fn gradient_step(
    gradient: i32,
    it: u32,
    highlight_spacing: bool,
    high: f32,
    scale_count: usize,
) -> (f32, f32) {
    let it = it as f32;
    match gradient {
        0 => (1.0, 3.0),
        1 => (0.25 * it + 0.75, -0.5 * it + 4.5),
        2 => (0.5 * it + 0.5, -0.75 * it + 5.75),
        3 => (0.666 * it + 0.333, -0.75 * it + 5.75),
        4 => (0.8 * it + 0.2, -0.75 * it + 5.75),
        5 | 6 => {
            let grad = if !highlight_spacing {
                if gradient == 5 { 2.5 * it - 1.5 } else { 5.0 * it - 4.0 }
            } else {
                let k = if gradient == 5 { 11.0 } else { 21.0 };
                let a = (k * high - 1.0) / 4.0;
                a * it + 1.0 - a
            };
            (grad, -0.75 * it + 5.75)
        }
        -1 => (-0.125 * it + 1.125, 3.0),
        _ => (1.0, scale_count as f32),
    }
}

/// Multiplier of the variance and of the clamp limit.
pub fn variance_factor(mode: i32, it: u32) -> f32 {
    let it = it as f32;
    match mode {
        1 => -0.125 * it + 1.125,
        2 => -0.2 * it + 1.2,
        -1 => 0.125 * it + 0.875,
        -2 => 0.4 * it + 0.6,
        _ => 1.0,
    }
}

/// Multiplier of the strength. Constant after the third iteration.
pub fn strength_factor(mode: i32, it: u32) -> f32 {
    let early = it <= 3;
    let it = it as f32;
    match mode {
        1 if early => -0.3 * it + 1.6,
        1 => 0.5,
        2 if early => -0.6 * it + 2.2,
        2 => 0.3,
        -1 if early => 0.2 * it + 0.6,
        -1 => 1.2,
        -2 if early => 0.4 * it + 0.2,
        -2 => 1.5,
        _ => 1.0,
    }
}

/// Everything one iteration needs from the schedule.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct IterationPlan {
    /// Divides the neighbourhood size.
    pub grad: f32,
    pub scale_count: usize,
    pub variance_factor: f32,
    pub strength_factor: f32,
}

impl IterationPlan {
    /// Plan for iteration `it`, given the scale count the previous iteration
    /// ended with.
    ///
    /// A single iteration always keeps `scale_count`. Otherwise small counts
    /// (< 3) lose one scale and large counts (> 4) gain one on top of the
    /// gradient policy. The result is rounded and kept within `1..=8`.
    pub fn derive(params: &RetinexParams, it: u32, scale_count: usize, high: f32) -> Self {
        let highlight_spacing =
            params.method.global_spacing() == super::scales::ScaleSpacing::HighPlus;
        let (grad, mut sc) = gradient_step(params.gradient, it, highlight_spacing, high, scale_count);

        if params.iterations == 1 {
            sc = scale_count as f32;
        } else {
            if scale_count < 3 {
                sc = (sc - 1.0).max(1.0);
            }
            if scale_count > 4 {
                sc += 1.0;
            }
        }

        Self {
            grad,
            scale_count: (sc.round() as i64).clamp(1, MAX_SCALES as i64) as usize,
            variance_factor: variance_factor(params.grad_variance, it),
            strength_factor: strength_factor(params.grad_strength, it),
        }
    }
}
