use common::Buffer2;
use common::parallel::for_each_row_mut;
use rayon::prelude::*;

use super::params::{LocalRetinexSettings, MaskView, RetinexChannel, SpotParams};
use super::scales::retinex_scales;
use super::{
    Abscissa, GAIN_SPAN, GainWindow, RetinexStats, accumulate_ratio, assert_same_size,
    extrema_of, huelab_to_huehsv, scale_weight, take_source,
};
use crate::curves::{Curve, GammaLut};
use crate::filters::{gaussian_blur, gaussian_blur_in_place, guided_filter};
use crate::math::plane_stats;

/// Fixed log-ratio clamp of the spot pass, `10^1.7`.
const LOCAL_LIMIT: f32 = 50.118_72;

/// Lightness clip of the working buffer.
const LIGHTNESS_MAX: f32 = 32767.0;
/// Lightness clip of the original buffer.
const ORIGINAL_MAX: f32 = 65535.0;
/// Chroma clip of a and b.
const CHROMA_MAX: f32 = 42000.0;
/// Clip of the blurred plane when the mask targets it.
const TRANSMISSION_MASK_MAX: f32 = 100000.0;
/// Lightness offset of the diagnostic mask.
const MASK_VIEW_OFFSET: f32 = 6000.0;
/// Chroma normalization of the chroma mask curve.
const MASK_CHROMA_SCALE: f32 = 4000.0;
/// Upper clip of the chroma pass output.
const CHROMA_PASS_MAX: f32 = 50000.0;

/// Lightness and opponent colour planes of the same size.
#[derive(Debug, Clone, PartialEq)]
pub struct LabPlanes {
    pub l: Buffer2<f32>,
    pub a: Buffer2<f32>,
    pub b: Buffer2<f32>,
}

impl LabPlanes {
    pub fn new(width: usize, height: usize) -> Self {
        Self {
            l: Buffer2::new_default(width, height),
            a: Buffer2::new_default(width, height),
            b: Buffer2::new_default(width, height),
        }
    }

    pub fn width(&self) -> usize {
        self.l.width()
    }

    pub fn height(&self) -> usize {
        self.l.height()
    }

    fn assert_size(&self, what: &str, luminance: &Buffer2<f32>) {
        assert_same_size(what, &self.l, luminance);
        assert_same_size(what, &self.a, luminance);
        assert_same_size(what, &self.b, luminance);
    }
}

/// Buffers of the spot the mask stage reads and writes.
pub struct MaskBuffers<'a> {
    /// Spot being processed. Its lightness guides the filters.
    pub working: &'a mut LabPlanes,
    /// Receives the mask for [`MaskView::Mask`].
    pub mask: &'a mut LabPlanes,
    /// Spot before processing, used downstream for colour differences.
    pub original: &'a mut LabPlanes,
    /// Blurred copy of `original` after the mask was applied to it.
    pub original_blurred: &'a mut LabPlanes,
}

/// Optional curves of the spot pass. `None` skips the stage.
#[derive(Clone, Copy, Default)]
pub struct LocalRetinexCurves<'a> {
    /// Gain over the transmission map, abscissa 0..500.
    pub gain: Option<&'a dyn Curve>,
    /// Lightness exclusion, abscissa `500 * L / 32768`.
    pub mask_lightness: Option<&'a dyn Curve>,
    /// Chroma exclusion, abscissa `500 * chroma / 4000`.
    pub mask_chroma: Option<&'a dyn Curve>,
    /// Hue exclusion, abscissa `500 * hue` on the HSV wheel.
    pub mask_hue: Option<&'a dyn Curve>,
}

/// Multi-scale Retinex restricted to one spot.
pub struct LocalRetinex<'a> {
    spot: &'a SpotParams,
    curves: LocalRetinexCurves<'a>,
}

impl<'a> LocalRetinex<'a> {
    pub fn new(spot: &'a SpotParams, curves: LocalRetinexCurves<'a>) -> Self {
        Self { spot, curves }
    }

    /// Processes `luminance` in place and reports its statistics in `stats`.
    ///
    /// `luminance` is either the spot lightness or a chroma plane, as told by
    /// `settings.channel`; `original` is the same plane before processing. The
    /// mask stage only runs on the lightness channel.
    pub fn apply(
        &self,
        buffers: &mut MaskBuffers<'_>,
        luminance: &mut Buffer2<f32>,
        original: &Buffer2<f32>,
        settings: &LocalRetinexSettings,
        stats: &mut RetinexStats,
    ) {
        self.spot.validate();
        settings.validate();
        assert_same_size("Original", original, luminance);
        buffers.working.assert_size("Working", luminance);
        buffers.mask.assert_size("Mask", luminance);
        buffers.original.assert_size("Original Lab", luminance);
        buffers.original_blurred.assert_size("Blurred original", luminance);

        let spot = self.spot;
        let skip = settings.skip;

        let mut neighbourhood = (settings.radius_factor * spot.neighbourhood) as i32;
        if skip >= 4 {
            neighbourhood = (0.1 * neighbourhood as f32 + 2.0) as i32;
        } else if skip > 1 {
            neighbourhood = (0.3 * neighbourhood as f32 + 2.0) as i32;
        }
        let radii = retinex_scales(
            settings.scales,
            spot.method.local_spacing(),
            neighbourhood,
            0.0,
        );

        let masked = settings.channel == RetinexChannel::Luminance
            && settings.mask_view != MaskView::Modified;
        let gamma = masked.then(|| GammaLut::new(spot.mask_gamma, spot.mask_slope));

        let src = take_source(luminance);
        let pond = scale_weight(radii.len(), false);
        let mut out = Buffer2::new_default(luminance.width(), luminance.height());

        for scale in (0..radii.len()).rev() {
            if scale == radii.len() - 1 {
                gaussian_blur(&src, &mut out, radii[scale]);
            } else {
                let sigma = (radii[scale] * radii[scale] - radii[scale + 1] * radii[scale + 1]).sqrt();
                gaussian_blur_in_place(&mut out, sigma);
            }

            if let Some(gamma) = &gamma {
                self.apply_mask(buffers, &mut out, gamma, settings);
            }

            accumulate_ratio(luminance, &src, &out, pond, LOCAL_LIMIT, false);
        }
        drop(out);

        if spot.soft_radius > 0.0 {
            let guide = src.map(|&v| v / GAIN_SPAN);
            let signal = luminance.map(|&v| v / GAIN_SPAN);
            let mut softened = Buffer2::new_default(luminance.width(), luminance.height());
            guided_filter(
                &guide,
                &signal,
                &mut softened,
                spot.soft_radius * 10.0 / skip as f32,
                1e-5,
                4,
            );
            for_each_row_mut(luminance, |y, row| {
                for (v, &s) in row.iter_mut().zip(softened.row(y)) {
                    *v = s * GAIN_SPAN;
                }
            });
        }

        let t_stats = plane_stats(luminance);
        let window = GainWindow::new(&t_stats, spot.variance / 100.0);
        for_each_row_mut(luminance, |_, row| {
            for v in row.iter_mut() {
                *v -= window.mini;
            }
        });
        let g_stats = plane_stats(luminance);

        let gain_abscissa = Abscissa::for_curve(self.curves.gain, &g_stats);
        let gain_curve = self.curves.gain;
        // The gain curve is used as is, so the stretch doubles to match the 0.5 default gain
        let factor = if gain_abscissa.is_some() {
            2.0 * window.factor
        } else {
            window.factor
        };
        let cd_of = |v: f32| -> f32 {
            let gain = match (gain_abscissa, gain_curve) {
                (Some(abscissa), Some(curve)) => curve.value(abscissa.at(v)),
                _ => 0.5,
            };
            gain * factor * v
        };
        let (min_cd, max_cd) = extrema_of(luminance, &cd_of);

        let (max_clip, blend) = match settings.channel {
            RetinexChannel::Luminance => (GAIN_SPAN, spot.strength / 100.0),
            RetinexChannel::Chroma => (
                CHROMA_PASS_MAX,
                spot.strength / 100.0 * spot.chroma_strength / 100.0,
            ),
        };
        for_each_row_mut(luminance, |y, row| {
            let orig = original.row(y);
            for x in 0..row.len() {
                let cd = cd_of(row[x]);
                row[x] = cd.clamp(0.0, max_clip) * blend + (1.0 - blend) * orig[x];
            }
        });

        *stats = RetinexStats {
            min_cd,
            max_cd,
            mini: window.mini,
            maxi: window.maxi,
            t_mean: g_stats.mean,
            t_sigma: g_stats.stddev,
            t_min: g_stats.min,
            t_max: g_stats.max,
        };

        tracing::debug!(
            "Local retinex ({:?}): {} scales, transmission mean={:.3} sigma={:.3}, cd {:.1}..{:.1}",
            settings.channel,
            radii.len(),
            stats.t_mean,
            stats.t_sigma,
            stats.min_cd,
            stats.max_cd
        );
    }

    /// Lightness and chroma exclusion weights of every sample, lightness first.
    fn mask_weights(
        &self,
        lightness: &Buffer2<f32>,
        working: &LabPlanes,
        view: MaskView,
    ) -> (Buffer2<f32>, Buffer2<f32>) {
        let curves = self.curves;
        let chroma_weighted = view != MaskView::Preview;

        let weights: Vec<(f32, f32)> = lightness
            .par_iter()
            .zip(working.a.par_iter())
            .zip(working.b.par_iter())
            .map(|((&l, &a), &b)| {
                let mut lexp = 0.0f32;
                let mut ch = 0.0f32;

                if let Some(curve) = curves.mask_lightness {
                    lexp = GAIN_SPAN * (1.0 - curve.value(500.0 * l / GAIN_SPAN)).clamp(0.0, 1.0);
                }
                if chroma_weighted && let Some(curve) = curves.mask_chroma {
                    let chroma = 0.0001
                        + ((a / MASK_CHROMA_SCALE).powi(2) + (b / MASK_CHROMA_SCALE).powi(2)).sqrt();
                    ch = (1.0 - curve.value(500.0 * chroma)).clamp(0.0, 1.0);
                }
                if let Some(curve) = curves.mask_hue {
                    let mut h = huelab_to_huehsv(b.atan2(a)) + 1.0 / 6.0;
                    if h > 1.0 {
                        h -= 1.0;
                    }
                    let v = (1.0 - curve.value(500.0 * h)).clamp(0.0, 1.0);
                    if chroma_weighted {
                        ch += v;
                    }
                    lexp += GAIN_SPAN * v;
                }
                (lexp, ch)
            })
            .collect();

        let width = lightness.width();
        let height = lightness.height();
        let (l, ch): (Vec<f32>, Vec<f32>) = weights.into_iter().unzip();
        (Buffer2::new(width, height, l), Buffer2::new(width, height, ch))
    }

    /// Builds the exclusion mask for one scale and applies it to the target
    /// the settings select.
    fn apply_mask(
        &self,
        buffers: &mut MaskBuffers<'_>,
        out: &mut Buffer2<f32>,
        gamma: &GammaLut,
        settings: &LocalRetinexSettings,
    ) {
        let spot = self.spot;
        let skip = settings.skip as f32;
        let tmap = settings.mask_targets_transmission;

        let (mask_l, mask_ch) = {
            let lightness = if tmap { &*out } else { &buffers.working.l };
            self.mask_weights(lightness, buffers.working, settings.mask_view)
        };

        let mut ble = mask_l.map(|&v| v / GAIN_SPAN);
        if spot.mask_radius > 0.0 {
            let guide = buffers.working.l.map(|&v| v / GAIN_SPAN);
            let src = ble.clone();
            guided_filter(&guide, &src, &mut ble, spot.mask_radius * 10.0 / skip, 0.001, 4);
        }
        let toned = ble.map(|&v| gamma.value(2.0 * v.clamp(0.0, 1.0) * GAIN_SPAN));

        let mut blurred = LabPlanes::new(out.width(), out.height());
        gaussian_blur(&toned, &mut blurred.l, 1.0 / skip);
        gaussian_blur(&mask_ch, &mut blurred.a, 1.0 + 0.5 * spot.mask_radius / skip);
        blurred.b.copy_from(&blurred.a);

        let modr = 0.01 * spot.mask_blend;

        if settings.mask_view != MaskView::Mask && settings.apply_mask {
            if tmap {
                let k = modr.abs();
                out.par_iter_mut().zip(blurred.l.par_iter()).for_each(|(v, &m)| {
                    *v = (*v + k * m).clamp(0.0, TRANSMISSION_MASK_MAX);
                });
            } else {
                buffers
                    .working
                    .l
                    .par_iter_mut()
                    .zip(blurred.l.par_iter())
                    .for_each(|(v, &m)| *v = (*v + m * modr).clamp(0.0, LIGHTNESS_MAX));
            }

            let chroma_gain = modr * (1.0 + 0.01 * spot.mask_chroma);
            for (plane, mask) in [
                (&mut buffers.working.a, &blurred.a),
                (&mut buffers.working.b, &blurred.b),
            ] {
                plane.par_iter_mut().zip(mask.par_iter()).for_each(|(v, &m)| {
                    *v = (*v * (1.0 + m * chroma_gain)).clamp(-CHROMA_MAX, CHROMA_MAX);
                });
            }
        }

        if !tmap && settings.apply_mask {
            let original = &mut *buffers.original;
            original
                .l
                .par_iter_mut()
                .zip(blurred.l.par_iter())
                .for_each(|(v, &m)| {
                    let lifted = (*v + modr * m).clamp(0.0, ORIGINAL_MAX);
                    *v = (lifted - m).clamp(0.0, ORIGINAL_MAX);
                });
            for (plane, mask) in [(&mut original.a, &blurred.a), (&mut original.b, &blurred.b)] {
                plane.par_iter_mut().zip(mask.par_iter()).for_each(|(v, &m)| {
                    let scaled = (*v * (1.0 + modr * m)).clamp(-CHROMA_MAX, CHROMA_MAX);
                    *v = (scaled * (1.0 - m)).clamp(-CHROMA_MAX, CHROMA_MAX);
                });
            }

            let radius = 3.0 / skip;
            let target = &mut *buffers.original_blurred;
            gaussian_blur(&original.l, &mut target.l, radius);
            gaussian_blur(&original.a, &mut target.a, radius);
            gaussian_blur(&original.b, &mut target.b, radius);
        }

        if settings.mask_view == MaskView::Mask {
            let mask = &mut *buffers.mask;
            mask.l
                .par_iter_mut()
                .zip(blurred.l.par_iter())
                .for_each(|(v, &m)| *v = MASK_VIEW_OFFSET + m.clamp(0.0, LIGHTNESS_MAX));
            for (plane, working, weights) in [
                (&mut mask.a, &buffers.working.a, &blurred.a),
                (&mut mask.b, &buffers.working.b, &blurred.b),
            ] {
                plane
                    .par_iter_mut()
                    .zip(working.par_iter())
                    .zip(weights.par_iter())
                    .for_each(|((v, &c), &m)| *v = (c * m).clamp(-CHROMA_MAX, CHROMA_MAX));
            }
        }
    }
}
