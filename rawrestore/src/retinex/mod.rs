//! Multi-scale Retinex on a luminance plane.
//!
//! The plane is split into illumination and reflectance by accumulating the
//! log ratio between the plane and Gaussian blurs of increasing radius. The
//! accumulated signal is then normalized around its mean and stretched back to
//! the 0..32768 range.
//!
//! [`MultiScaleRetinex`] processes a whole image, optionally in several
//! iterations with tonal maps. [`LocalRetinex`] processes one spot and can
//! build exclusion masks from lightness, chroma and hue curves.

mod hue;
mod local;
mod msr;
mod params;
mod scales;
mod schedule;
mod shmap;


use common::Buffer2;
use common::parallel::{for_each_row_mut, reduce_rows};

use crate::curves::Curve;
use crate::math::PlaneStats;

pub use hue::huelab_to_huehsv;
pub use local::{LabPlanes, LocalRetinex, LocalRetinexCurves, MaskBuffers};
pub use msr::{MultiScaleRetinex, RetinexCurves};
pub use params::{
    LocalRetinexSettings, MapMethod, MaskView, RetinexChannel, RetinexColorSpace, RetinexMethod,
    RetinexParams, SpotParams, ViewMethod,
};
pub use scales::{MAX_SCALES, ScaleSpacing, retinex_scales};
pub use schedule::{IterationPlan, gradient_step, highlight_factor, strength_factor, variance_factor};
pub use shmap::HighlightShadowMap;

/// Added to every sample before taking ratios.
const SOURCE_EPS: f32 = 2.0;

/// Curve abscissas span `0..=CURVE_RANGE`.
const CURVE_RANGE: f32 = 500.0;

/// Gain-mapped signals are stretched to `0..=GAIN_SPAN`.
const GAIN_SPAN: f32 = 32768.0;

/// Nudge applied when the gain window hits the data extrema.
const WINDOW_EPS: f32 = 0.1;

/// Statistics reported by a Retinex pass.
///
/// `t_*` describe the transmission signal after the gain window offset was
/// removed. The caller owns the value; a disabled pass leaves it untouched.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct RetinexStats {
    pub min_cd: f32,
    pub max_cd: f32,
    pub mini: f32,
    pub maxi: f32,
    pub t_mean: f32,
    pub t_sigma: f32,
    pub t_min: f32,
    pub t_max: f32,
}

/// Logarithm of the dynamic range spread over the scales.
fn scale_weight(scale_count: usize, linear: bool) -> f32 {
    let pond = 16384f32.ln() / scale_count as f32;
    if linear { pond } else { pond / 2.71828f32.ln() }
}

/// Returns the ratio source `luminance + 2` and zeroes `luminance`.
fn take_source(luminance: &mut Buffer2<f32>) -> Buffer2<f32> {
    let src = luminance.map(|&v| v + SOURCE_EPS);
    luminance.fill(0.0);
    src
}

/// `luminance += pond * log(clamp(src / blurred, 1 / limit, limit))`, or the
/// clamped ratio itself when `linear`.
fn accumulate_ratio(
    luminance: &mut Buffer2<f32>,
    src: &Buffer2<f32>,
    blurred: &Buffer2<f32>,
    pond: f32,
    limit: f32,
    linear: bool,
) {
    let lower = 1.0 / limit;
    for_each_row_mut(luminance, |y, row| {
        let s = src.row(y);
        let b = blurred.row(y);
        for x in 0..row.len() {
            let ratio = (s[x] / b[x]).clamp(lower, limit);
            row[x] += pond * if linear { ratio } else { ratio.ln() };
        }
    });
}

/// Three segment map of a signal onto a curve abscissa in `0..=500`.
///
/// Values within one sigma of the mean map linearly onto the middle third
/// around 250. Values beyond map onto the outer thirds, anchored so the data
/// extrema land on 0 and 500.
#[derive(Debug, Clone, Copy)]
struct Abscissa {
    mean: f32,
    stddev: f32,
    asig: f32,
    bsig: f32,
    amax: f32,
    bmax: f32,
    amin: f32,
    bmin: f32,
}

impl Abscissa {
    fn new(stats: &PlaneStats) -> Self {
        let PlaneStats {
            mean,
            stddev,
            min,
            max,
        } = *stats;
        let asig = 0.166666 / stddev;
        let bsig = 0.5 - asig * mean;
        let amax = 0.333333 / (max - mean - stddev);
        let bmax = 1.0 - amax * max;
        let amin = 0.333333 / (mean - stddev - min);
        let bmin = -amin * min;

        Self {
            mean,
            stddev,
            asig: asig * CURVE_RANGE,
            bsig: bsig * CURVE_RANGE,
            amax: amax * CURVE_RANGE,
            bmax: bmax * CURVE_RANGE,
            amin: amin * CURVE_RANGE,
            bmin: bmin * CURVE_RANGE,
        }
    }

    /// `None` when the statistics are degenerate and curves must be skipped.
    fn for_curve(curve: Option<&dyn Curve>, stats: &PlaneStats) -> Option<Self> {
        (curve.is_some() && stats.mean != 0.0 && stats.stddev != 0.0).then(|| Self::new(stats))
    }

    #[inline]
    fn at(&self, v: f32) -> f32 {
        if (v - self.mean).abs() < self.stddev {
            self.asig * v + self.bsig
        } else if v >= self.mean {
            self.amax * v + self.bmax
        } else {
            self.amin * v + self.bmin
        }
    }
}

/// Gain window `[mini, maxi]` of `variance` standard deviations around the mean.
#[derive(Debug, Clone, Copy)]
struct GainWindow {
    mini: f32,
    maxi: f32,
    /// `GAIN_SPAN / (maxi - mini)`, with an empty window counted as width 1.
    factor: f32,
}

impl GainWindow {
    fn new(stats: &PlaneStats, variance: f32) -> Self {
        let mut mini = stats.mean - variance * stats.stddev;
        if mini < stats.min {
            mini = stats.min + WINDOW_EPS;
        }
        let mut maxi = stats.mean + variance * stats.stddev;
        if maxi > stats.max {
            maxi = stats.max - WINDOW_EPS;
        }
        let mut delta = maxi - mini;
        if delta == 0.0 {
            delta = 1.0;
        }
        Self {
            mini,
            maxi,
            factor: GAIN_SPAN / delta,
        }
    }
}

/// Minimum and maximum of `f(v)` over the plane.
fn extrema_of(plane: &Buffer2<f32>, f: impl Fn(f32) -> f32 + Sync) -> (f32, f32) {
    reduce_rows(
        plane,
        || (f32::INFINITY, f32::NEG_INFINITY),
        |acc, _, row| {
            row.iter().fold(acc, |(lo, hi), &v| {
                let c = f(v);
                (lo.min(c), hi.max(c))
            })
        },
        |a, b| (a.0.min(b.0), a.1.max(b.1)),
    )
}

fn assert_same_size(what: &str, plane: &Buffer2<f32>, luminance: &Buffer2<f32>) {
    assert!(
        plane.same_size(luminance),
        "{what} plane {}x{} doesn't match luminance {}x{}",
        plane.width(),
        plane.height(),
        luminance.width(),
        luminance.height()
    );
}
