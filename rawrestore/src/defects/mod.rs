//! Defective sensor site detection and repair.
//!
//! # Pipeline
//!
//! 1. Build a [`DefectMap`] from zero samples, a static list of known bad
//!    sites, and (Bayer only) the hot/dead residual test.
//! 2. Interpolate every flagged site with the engine for the sensor layout.
//!
//! # Repair policy
//!
//! Each engine gathers pairs of same-colour neighbours placed symmetrically
//! around the flagged site. A pair counts only when neither member is flagged,
//! and contributes with weight `k / (|a - b| + 1)` where `k` is the inverse
//! distance to the site. Pairs straddling an edge therefore weigh less than
//! pairs in flat areas. The result is `sum(w * (a + b)) / (2 * sum(w))`.
//!
//! Replacement values are computed from the unmodified grid and written in a
//! second step, so the outcome does not depend on row scheduling.

mod bayer;
mod defect_map;
mod detect;
mod ncolor;
mod xtrans;

#[cfg(test)]
mod tests;

use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::raw::{CfaType, RawFrame};

pub use bayer::interpolate_bayer;
pub use defect_map::DefectMap;
pub use detect::{find_hot_dead_pixels, find_zero_pixels, hot_dead_ratio};
pub use ncolor::interpolate_ncolor;
pub use xtrans::interpolate_xtrans;

/// Sites closer than this to any edge are never detected or repaired.
pub const EDGE_GUARD: usize = 2;

/// Regularizer added to pair differences.
const PAIR_EPS: f32 = 1.0;

/// Pair weight for neighbours at distance 1.
const W_AXIS_1: f32 = 1.0;
/// Pair weight for neighbours at distance sqrt(2).
const W_DIAGONAL: f32 = 0.707_106_78;
/// Pair weight for neighbours at distance 2.
const W_AXIS_2: f32 = 0.5;
/// Pair weight for neighbours at distance sqrt(5).
const W_KNIGHT: f32 = 0.447_213_59;
/// Pair weight for neighbours at distance sqrt(8).
const W_CORNER: f32 = 0.353_553_39;

/// Running gradient-weighted sum over accepted neighbour pairs.
#[derive(Debug, Default, Clone, Copy)]
struct PairSum {
    weighted: f32,
    norm: f32,
}

impl PairSum {
    #[inline]
    fn add(&mut self, k: f32, a: f32, b: f32) {
        let w = k / ((a - b).abs() + PAIR_EPS);
        self.weighted += w * (a + b);
        self.norm += w;
    }

    #[inline]
    fn value(&self) -> Option<f32> {
        (self.norm > 0.0).then(|| self.weighted / (2.0 * self.norm))
    }
}

/// Scans interior rows in parallel and collects `f(x, y)` for every flagged
/// site that produced a value. Clean 64-site words are skipped.
fn collect_repairs<R, F>(map: &DefectMap, f: F) -> Vec<(usize, usize, R)>
where
    R: Send,
    F: Fn(usize, usize) -> Option<R> + Sync,
{
    let width = map.width();
    let height = map.height();
    if width <= 2 * EDGE_GUARD || height <= 2 * EDGE_GUARD {
        return Vec::new();
    }

    (EDGE_GUARD..height - EDGE_GUARD)
        .into_par_iter()
        .flat_map_iter(|y| {
            let mut found = Vec::new();
            let mut x = EDGE_GUARD;
            while x < width - EDGE_GUARD {
                let skip = map.skip_if_zero(x, y);
                if skip > 0 {
                    x += skip;
                    continue;
                }
                if map.get(x, y)
                    && let Some(value) = f(x, y)
                {
                    found.push((x, y, value));
                }
                x += 1;
            }
            found
        })
        .collect()
}

/// Which defect sources feed the map before repair.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DefectConfig {
    /// Flag samples that are exactly zero.
    pub zero_is_bad: bool,
    /// Flag sites with a strong positive residual (Bayer only).
    pub hot_pixel_filter: bool,
    /// Flag sites with a strong negative residual (Bayer only).
    pub dead_pixel_filter: bool,
    /// Detection threshold in percent. Higher values flag fewer sites.
    pub threshold: f32,
    /// Known bad sites as `(x, y)`, e.g. from a camera defect list.
    pub static_defects: Vec<(usize, usize)>,
}

impl Default for DefectConfig {
    fn default() -> Self {
        Self {
            zero_is_bad: false,
            hot_pixel_filter: false,
            dead_pixel_filter: false,
            threshold: 100.0,
            static_defects: Vec::new(),
        }
    }
}

impl DefectConfig {
    pub fn validate(&self) {
        assert!(
            self.threshold.is_finite() && self.threshold >= 0.0,
            "threshold must be a non-negative finite percentage, got {}",
            self.threshold
        );
    }
}

/// Counts reported by [`correct_defects`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DefectReport {
    pub zero: usize,
    pub listed: usize,
    pub hot_dead: usize,
    pub repaired: usize,
}

impl DefectReport {
    /// Sum of all detection counts. A site found by several sources is
    /// counted once per source.
    pub fn flagged(&self) -> usize {
        self.zero + self.listed + self.hot_dead
    }
}

/// Detects defective sites in `frame` and repairs them in place.
pub fn correct_defects(frame: &mut RawFrame, config: &DefectConfig) -> DefectReport {
    config.validate();

    let mut map = DefectMap::new(frame.sites_wide(), frame.height());
    let mut report = DefectReport::default();

    if config.zero_is_bad {
        report.zero = match frame.cfa {
            CfaType::Interleaved { colors } => {
                detect::find_zero_sites(&frame.data, colors, &mut map)
            }
            _ => find_zero_pixels(&frame.data, &mut map),
        };
        tracing::debug!("{} samples with value zero marked as defective", report.zero);
    }

    if !config.static_defects.is_empty() {
        report.listed = map.set_positions(&config.static_defects);
        tracing::debug!(
            "{} of {} listed defects fall inside the frame",
            report.listed,
            config.static_defects.len()
        );
    }

    if matches!(frame.cfa, CfaType::Bayer(_))
        && (config.hot_pixel_filter || config.dead_pixel_filter)
    {
        report.hot_dead = find_hot_dead_pixels(
            &frame.data,
            &mut map,
            config.threshold,
            config.hot_pixel_filter,
            config.dead_pixel_filter,
        );
        tracing::debug!("{} hot/dead pixels found inside image", report.hot_dead);
    }

    if report.flagged() > 0 {
        report.repaired = match frame.cfa {
            CfaType::Bayer(pattern) => interpolate_bayer(&map, &mut frame.data, pattern),
            CfaType::XTrans(pattern) => interpolate_xtrans(&map, &mut frame.data, &pattern),
            CfaType::Interleaved { colors } => interpolate_ncolor(&map, &mut frame.data, colors),
        };
    }

    tracing::info!(
        "Defect correction: zero={}, listed={}, hot/dead={}, repaired={}",
        report.zero,
        report.listed,
        report.hot_dead,
        report.repaired
    );

    report
}
