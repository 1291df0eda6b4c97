use common::Buffer2;

use crate::filters::gaussian_blur;
use crate::math::plane_stats;

/// Smoothed copy of a plane with its extrema and average, used to tell
/// highlights from shadows when compressing the blurred Retinex planes.
#[derive(Debug, Clone)]
pub struct HighlightShadowMap {
    map: Buffer2<f32>,
    pub min: f32,
    pub max: f32,
    pub avg: f32,
}

impl HighlightShadowMap {
    pub fn new(width: usize, height: usize) -> Self {
        Self {
            map: Buffer2::new_default(width, height),
            min: 0.0,
            max: 0.0,
            avg: 0.0,
        }
    }

    /// Rebuilds the map as `src` blurred with `radius` and refreshes its statistics.
    ///
    /// The blur is a plain Gaussian, not edge-preserving, so the map bleeds
    /// across strong edges.
    pub fn update(&mut self, src: &Buffer2<f32>, radius: f32) {
        gaussian_blur(src, &mut self.map, radius);
        let stats = plane_stats(&self.map);
        self.min = stats.min;
        self.max = stats.max;
        self.avg = stats.mean;
    }

    pub fn map(&self) -> &Buffer2<f32> {
        &self.map
    }

    /// Highlight and shadow thresholds for the given tonal widths in percent,
    /// truncated to whole values.
    ///
    /// Values above the highlight threshold get compressed, values below the
    /// shadow threshold get lifted.
    pub fn thresholds(&self, highlight_width: f32, shadow_width: f32) -> (f32, f32) {
        let highlight = self.max - highlight_width * (self.max - self.avg) / 100.0;
        let shadow = shadow_width * (self.avg - self.min) / 100.0;
        (highlight.trunc(), shadow.trunc())
    }
}

/// Scale applied to a blurred sample whose map value (plus one) is `value`.
///
/// `highlight_weight` and `shadow_weight` are `(100 - amount) / 100`; a weight
/// of 1 leaves the sample unchanged.
#[inline]
pub(crate) fn tonal_factor(
    value: f32,
    highlight_threshold: f32,
    shadow_threshold: f32,
    highlight_weight: f32,
    shadow_weight: f32,
) -> f32 {
    if value > highlight_threshold {
        (highlight_threshold + highlight_weight * (value - highlight_threshold)) / value
    } else if value < shadow_threshold {
        (shadow_threshold - shadow_weight * (shadow_threshold - value)) / value
    } else {
        1.0
    }
}
