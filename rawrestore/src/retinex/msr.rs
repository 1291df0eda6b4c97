use common::Buffer2;
use common::parallel::for_each_row_mut;

use super::params::{MapMethod, RetinexMethod, RetinexParams, ViewMethod};
use super::scales::retinex_scales;
use super::schedule::{IterationPlan, highlight_factor};
use super::shmap::{HighlightShadowMap, tonal_factor};
use super::{
    Abscissa, GAIN_SPAN, GainWindow, RetinexStats, accumulate_ratio, assert_same_size,
    extrema_of, huelab_to_huehsv, scale_weight, take_source,
};
use crate::curves::Curve;
use crate::filters::{gaussian_blur, gaussian_blur_in_place, median_filter_3x3_interior};
use crate::math::{intp, plane_stats};

/// Blur radius of the highlight/shadow map unless [`MapMethod::Gaussian`] sets one.
const TONAL_MAP_RADIUS: f32 = 40.0;

/// Automatic stretch of the transmission view: two sigma map onto this span.
const TRANSMISSION_VIEW_SPAN: f32 = 16300.0;

/// Optional curves of the global pass. `None` skips the stage.
#[derive(Clone, Copy, Default)]
pub struct RetinexCurves<'a> {
    /// Reshapes the transmission map, abscissa 0..500, applied as `-1 + 4 * y`.
    pub transmission: Option<&'a dyn Curve>,
    /// Gain over the transmission map, abscissa 0..500, applied as `2 * y`.
    pub gain: Option<&'a dyn Curve>,
    /// Tone curve over blurred planes, evaluated at twice the value and halved.
    pub map: Option<&'a dyn Curve>,
    /// Strength as a function of hue, over `[0, 1]` with 0.5 neutral.
    pub hue: Option<&'a dyn Curve>,
}

/// Whole-image multi-scale Retinex.
pub struct MultiScaleRetinex<'a> {
    params: &'a RetinexParams,
    curves: RetinexCurves<'a>,
}

impl<'a> MultiScaleRetinex<'a> {
    pub fn new(params: &'a RetinexParams, curves: RetinexCurves<'a>) -> Self {
        Self { params, curves }
    }

    /// Runs every iteration over `luminance` in place.
    ///
    /// `original` is the untouched plane used for blending, `ex` holds the hue
    /// (or the highlight reference for [`RetinexMethod::HighlightsPlus`]) per
    /// sample. `stats` receives the statistics of the last iteration. Nothing is
    /// touched when the parameters are disabled.
    pub fn apply(
        &self,
        luminance: &mut Buffer2<f32>,
        original: &Buffer2<f32>,
        ex: &Buffer2<f32>,
        stats: &mut RetinexStats,
    ) {
        let params = self.params;
        if !params.enabled {
            return;
        }
        params.validate();
        assert_same_size("Original", original, luminance);
        assert_same_size("Ex", ex, luminance);

        let mut scale_count = params.scale as usize;
        for it in 1..=params.iterations {
            let plan = IterationPlan::derive(params, it, scale_count, highlight_factor(params.highlight));
            scale_count = plan.scale_count;
            *stats = self.iterate(luminance, original, ex, it, &plan);

            tracing::debug!(
                "Retinex iteration {}: {} scales, transmission mean={:.3} sigma={:.3}, cd {:.1}..{:.1}",
                it,
                plan.scale_count,
                stats.t_mean,
                stats.t_sigma,
                stats.min_cd,
                stats.max_cd
            );
        }
    }

    fn iterate(
        &self,
        luminance: &mut Buffer2<f32>,
        original: &Buffer2<f32>,
        ex: &Buffer2<f32>,
        it: u32,
        plan: &IterationPlan,
    ) -> RetinexStats {
        let params = self.params;
        let first = it == 1;
        let linear = params.color_space.is_linear();
        let spacing = params.method.global_spacing();
        let high = highlight_factor(params.highlight);

        let mut limit = params.limit.powf(1.7);
        if linear {
            limit *= 10.0;
        }
        let limit = limit * plan.variance_factor;
        let variance = params.variance / 100.0 * plan.variance_factor;
        let strength = params.strength / 100.0 * plan.strength_factor;

        let neighbourhood = (2.8 * params.neighbourhood) as i32;
        let radii = retinex_scales(
            plan.scale_count,
            spacing,
            (neighbourhood as f32 / plan.grad) as i32,
            high,
        );

        let out = self.pyramid(luminance, &radii, first, linear, limit);

        // Transmission
        let mut t_stats = plane_stats(luminance);
        let mut transmission = None;
        if let Some(abscissa) = Abscissa::for_curve(self.curves.transmission, &t_stats)
            && let Some(curve) = self.curves.transmission
        {
            for_each_row_mut(luminance, |_, row| {
                for v in row.iter_mut() {
                    *v *= -1.0 + 4.0 * curve.value(abscissa.at(*v));
                }
            });
            if params.view_method.shows_transmission() {
                transmission = Some(luminance.clone());
            }
            if params.median_map && first {
                median_filter_3x3_interior(luminance);
            }
            t_stats = plane_stats(luminance);
        } else if params.view_method.shows_transmission() {
            transmission = Some(luminance.clone());
        }

        // Gain window
        let window = GainWindow::new(&t_stats, variance);
        let mut spread = 2.0 * t_stats.stddev;
        if spread == 0.0 {
            spread = 1.0;
        }
        let aza = TRANSMISSION_VIEW_SPAN / spread;
        let azb = -aza * (t_stats.mean - 2.0 * t_stats.stddev);
        let bza = aza;
        let bzb = TRANSMISSION_VIEW_SPAN - bza * t_stats.mean;

        for_each_row_mut(luminance, |_, row| {
            for v in row.iter_mut() {
                *v -= window.mini;
            }
        });
        let g_stats = plane_stats(luminance);

        let gain_abscissa = Abscissa::for_curve(self.curves.gain, &g_stats);
        let gain_curve = self.curves.gain;
        let offset = params.offset;
        let cd_of = |v: f32| -> f32 {
            let gain = match (gain_abscissa, gain_curve) {
                (Some(abscissa), Some(curve)) => 2.0 * curve.value(abscissa.at(v)),
                _ => 0.5,
            };
            gain * window.factor * v + offset
        };
        let (min_cd, max_cd) = extrema_of(luminance, &cd_of);

        let hue_curve = if first { self.curves.hue } else { None };
        let hsl = params.color_space.is_hsl();
        let highlights_plus = params.method == RetinexMethod::HighlightsPlus;
        let highlight_limit = 65535.0 * params.highlight / 100.0;
        let highlight_attenuation = params.highlight / 100.0;
        let view = params.view_method;
        let mean = g_stats.mean;

        for_each_row_mut(luminance, |y, row| {
            let orig = original.row(y);
            let ex = ex.row(y);
            let blurred = out.row(y);
            let tran = transmission.as_ref().map(|t| t.row(y));

            for x in 0..row.len() {
                let cd = cd_of(row[x]);

                let mut blend = strength;
                if let Some(curve) = hue_curve {
                    let h = if hsl { ex[x] } else { huelab_to_huehsv(ex[x]) };
                    blend *= 1.0 + 2.0 * (curve.value(h) - 0.5);
                }
                if highlights_plus && ex[x] > highlight_limit {
                    blend *= highlight_attenuation;
                }

                row[x] = match view {
                    ViewMethod::Normal => intp(blend, cd.clamp(0.0, GAIN_SPAN), orig[x]),
                    ViewMethod::Mask => blurred[x],
                    ViewMethod::Unsharp => orig[x] + blend * (orig[x] - blurred[x]),
                    ViewMethod::Transmission => {
                        let t = tran.map_or(0.0, |t| t[x]);
                        if t <= mean { azb + aza * t } else { bzb + bza * t }
                    }
                    ViewMethod::Transmission2 => 1000.0 + 700.0 * tran.map_or(0.0, |t| t[x]),
                };
            }
        });

        RetinexStats {
            min_cd,
            max_cd,
            mini: window.mini,
            maxi: window.maxi,
            t_mean: g_stats.mean,
            t_sigma: g_stats.stddev,
            t_min: g_stats.min,
            t_max: g_stats.max,
        }
    }

    /// Accumulates the log ratio over every scale into `luminance` and returns
    /// the last (coarsest) blurred plane.
    ///
    /// On the first iteration the blurred planes may be reshaped by the map
    /// curve and the highlight/shadow map before the ratio is taken. A pristine
    /// copy is kept so the next incremental blur starts from unedited data.
    fn pyramid(
        &self,
        luminance: &mut Buffer2<f32>,
        radii: &[f32],
        first: bool,
        linear: bool,
        limit: f32,
    ) -> Buffer2<f32> {
        let params = self.params;
        let map_method = params.map_method;
        let width = luminance.width();
        let height = luminance.height();

        let src = take_source(luminance);
        let pond = scale_weight(radii.len(), linear);

        let map_curve = if first && map_method.is_tonal() {
            self.curves.map
        } else {
            None
        };
        let mut tonal_map = (first && map_method.is_tonal())
            .then(|| HighlightShadowMap::new(width, height));
        let map_radius = if map_method == MapMethod::Gaussian {
            params.radius
        } else {
            TONAL_MAP_RADIUS
        };
        let highlight_weight = (100.0 - params.highlights) / 100.0;
        let shadow_weight = (100.0 - params.shadows) / 100.0;

        let mut out = Buffer2::new_default(width, height);
        let mut pristine: Option<Buffer2<f32>> = None;

        for scale in (0..radii.len()).rev() {
            if scale == radii.len() - 1 {
                gaussian_blur(&src, &mut out, radii[scale]);
            } else {
                let restore = first && (map_method.restores_at(scale) || map_curve.is_some());
                if restore && let Some(saved) = &pristine {
                    out.copy_from(saved);
                }
                let sigma = (radii[scale] * radii[scale] - radii[scale + 1] * radii[scale + 1]).sqrt();
                gaussian_blur_in_place(&mut out, sigma);
            }

            let weighted = first && map_method.weights_scale(scale);
            if (weighted || map_curve.is_some()) && scale > 0 {
                match pristine.as_mut() {
                    Some(saved) => saved.copy_from(&out),
                    None => pristine = Some(out.clone()),
                }
            }

            let mut thresholds = (0.0, 0.0);
            if weighted && let Some(map) = tonal_map.as_mut() {
                map.update(&out, map_radius);
                thresholds = map.thresholds(params.highlight_tonal_width, params.shadow_tonal_width);
            }

            if let Some(curve) = map_curve {
                for_each_row_mut(&mut out, |_, row| {
                    for v in row.iter_mut() {
                        *v = curve.value(2.0 * *v) / 2.0;
                    }
                });
            }

            if weighted && let Some(map) = tonal_map.as_ref() {
                let (h_th, s_th) = thresholds;
                let map = map.map();
                for_each_row_mut(&mut out, |y, row| {
                    let m = map.row(y);
                    for x in 0..row.len() {
                        let value = 1.0 + m[x];
                        row[x] *= tonal_factor(value, h_th, s_th, highlight_weight, shadow_weight);
                    }
                });
            }

            accumulate_ratio(luminance, &src, &out, pond, limit, linear);
        }

        out
    }
}
