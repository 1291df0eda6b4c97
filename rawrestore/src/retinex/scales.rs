//! Blur radii of the Retinex pyramid.

use std::f32::consts::LN_10;

/// Largest number of scales a pyramid can have.
pub const MAX_SCALES: usize = 8;

/// Smallest neighbourhood handed to [`retinex_scales`].
const MIN_NEIGHBOURHOOD: i32 = 3;

/// How radii are spread between 2 and the neighbourhood size.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScaleSpacing {
    Uniform,
    Low,
    High,
    /// As [`ScaleSpacing::High`] with the neighbourhood stretched by the
    /// highlight factor.
    HighPlus,
}

/// Blur radii for `count` scales over a neighbourhood of `size` samples.
///
/// Index 0 holds the largest radius and radii decrease with the index, so the
/// pyramid runs from the last entry to the first. One scale uses `size / 2`,
/// two scales use `size` and `size / 2`. `size` is raised to 3 when smaller.
/// `high` only affects [`ScaleSpacing::HighPlus`].
pub fn retinex_scales(count: usize, spacing: ScaleSpacing, size: i32, high: f32) -> Vec<f32> {
    assert!(
        (1..=MAX_SCALES).contains(&count),
        "scale count must be in 1..={MAX_SCALES}, got {count}"
    );
    let s = size.max(MIN_NEIGHBOURHOOD) as f32;

    match count {
        1 => return vec![s / 2.0],
        2 => return vec![s, s / 2.0],
        _ => {}
    }

    let n = count as f32;
    let log_step = (s - 2.0).ln() / n;
    let exp_step = |i: usize| 10f32.powf(i as f32 * log_step / LN_10);

    let mut scales = vec![0.0f32; count];
    for i in 0..count {
        match spacing {
            ScaleSpacing::Uniform => scales[count - i - 1] = 2.0 + i as f32 * s / n,
            ScaleSpacing::Low => scales[count - i - 1] = 2.0 + exp_step(i),
            ScaleSpacing::High => scales[i] = s - exp_step(i),
            ScaleSpacing::HighPlus => scales[i] = high * s - exp_step(i),
        }
    }
    scales
}
