//! Retinex parameter sets and their mode enumerations.
//!
//! Stored presets name modes with short legacy strings (`"uni"`, `"mapT"`,
//! `"tran2"`...). Each enum maps those names explicitly through strum and serde
//! so the mapping is decided once, at the parameter boundary.

use std::str::FromStr;

use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumIter, EnumString};

use crate::ParamError;
use crate::retinex::scales::ScaleSpacing;

fn parse_legacy<T: FromStr>(kind: &'static str, name: &str) -> Result<T, ParamError> {
    name.parse().map_err(|_| ParamError::UnknownName {
        kind,
        name: name.to_string(),
    })
}

/// Colour space the luminance plane was extracted from.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, Display, AsRefStr, EnumString, EnumIter, Serialize, Deserialize,
)]
pub enum RetinexColorSpace {
    #[default]
    #[strum(serialize = "Lab")]
    #[serde(rename = "Lab")]
    Lab,
    /// HSL lightness, logarithmic ratio.
    #[strum(serialize = "HSLLOG")]
    #[serde(rename = "HSLLOG")]
    HslLog,
    /// HSL lightness, linear ratio.
    #[strum(serialize = "HSLLIN")]
    #[serde(rename = "HSLLIN")]
    HslLin,
}

impl RetinexColorSpace {
    pub fn from_legacy(name: &str) -> Result<Self, ParamError> {
        parse_legacy("colour space", name)
    }

    pub fn is_hsl(self) -> bool {
        self != RetinexColorSpace::Lab
    }

    pub fn is_linear(self) -> bool {
        self == RetinexColorSpace::HslLin
    }
}

/// How blur radii are spread over the neighbourhood.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, Display, AsRefStr, EnumString, EnumIter, Serialize, Deserialize,
)]
pub enum RetinexMethod {
    /// Evenly spaced radii.
    #[strum(serialize = "uni")]
    #[serde(rename = "uni")]
    Uniform,
    /// Log spaced radii concentrated on small scales.
    #[strum(serialize = "low")]
    #[serde(rename = "low")]
    Low,
    /// Log spaced radii concentrated on large scales.
    #[default]
    #[strum(serialize = "high")]
    #[serde(rename = "high")]
    High,
    #[strum(serialize = "highli")]
    #[serde(rename = "highli")]
    Highlights,
    /// As [`RetinexMethod::Highlights`], with strength reduced on bright pixels.
    #[strum(serialize = "highliplus")]
    #[serde(rename = "highliplus")]
    HighlightsPlus,
}

impl RetinexMethod {
    pub fn from_legacy(name: &str) -> Result<Self, ParamError> {
        parse_legacy("retinex method", name)
    }

    /// Spacing used by the global pass. Only uniform and low keep their own
    /// spacing there; every other method spreads radii with the highlight factor.
    pub fn global_spacing(self) -> ScaleSpacing {
        match self {
            RetinexMethod::Uniform => ScaleSpacing::Uniform,
            RetinexMethod::Low => ScaleSpacing::Low,
            RetinexMethod::High | RetinexMethod::Highlights | RetinexMethod::HighlightsPlus => {
                ScaleSpacing::HighPlus
            }
        }
    }

    /// Spacing used by the spot pass. Highlight methods fall back to uniform.
    pub fn local_spacing(self) -> ScaleSpacing {
        match self {
            RetinexMethod::Low => ScaleSpacing::Low,
            RetinexMethod::High => ScaleSpacing::High,
            RetinexMethod::Uniform | RetinexMethod::Highlights | RetinexMethod::HighlightsPlus => {
                ScaleSpacing::Uniform
            }
        }
    }
}

/// Tonal map applied to blurred planes on the first iteration.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, Display, AsRefStr, EnumString, EnumIter, Serialize, Deserialize,
)]
pub enum MapMethod {
    #[default]
    #[strum(serialize = "none")]
    #[serde(rename = "none")]
    None,
    /// Selects the map curve in the editor; the pyramid treats it as none.
    #[strum(serialize = "curv")]
    #[serde(rename = "curv")]
    Curve,
    /// Highlight/shadow weighting on coarse scales only.
    #[strum(serialize = "map")]
    #[serde(rename = "map")]
    Map,
    /// Highlight/shadow weighting on every scale.
    #[strum(serialize = "mapT")]
    #[serde(rename = "mapT")]
    MapTonal,
    /// As [`MapMethod::MapTonal`] with a user blur radius for the map.
    #[strum(serialize = "gaus")]
    #[serde(rename = "gaus")]
    Gaussian,
}

impl MapMethod {
    pub fn from_legacy(name: &str) -> Result<Self, ParamError> {
        parse_legacy("map method", name)
    }

    /// Whether the pyramid runs any tonal edit at all.
    pub(crate) fn is_tonal(self) -> bool {
        matches!(self, MapMethod::Map | MapMethod::MapTonal | MapMethod::Gaussian)
    }

    /// Whether the highlight/shadow weighting applies at `scale`.
    pub(crate) fn weights_scale(self, scale: usize) -> bool {
        match self {
            MapMethod::Map => scale > 2,
            MapMethod::MapTonal | MapMethod::Gaussian => true,
            MapMethod::None | MapMethod::Curve => false,
        }
    }

    /// Whether a pristine blurred plane is restored before blurring `scale`.
    pub(crate) fn restores_at(self, scale: usize) -> bool {
        match self {
            MapMethod::Map => scale > 1,
            MapMethod::MapTonal | MapMethod::Gaussian => true,
            MapMethod::None | MapMethod::Curve => false,
        }
    }
}

/// What the global pass writes back into the luminance plane.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, Display, AsRefStr, EnumString, EnumIter, Serialize, Deserialize,
)]
pub enum ViewMethod {
    /// Gain-mapped result blended with the original by strength.
    #[default]
    #[strum(serialize = "none")]
    #[serde(rename = "none")]
    Normal,
    /// The coarsest blurred plane.
    #[strum(serialize = "mask")]
    #[serde(rename = "mask")]
    Mask,
    /// Transmission map with an automatic two-sigma stretch.
    #[strum(serialize = "tran")]
    #[serde(rename = "tran")]
    Transmission,
    /// Transmission map as `1000 + 700 * t`.
    #[strum(serialize = "tran2")]
    #[serde(rename = "tran2")]
    Transmission2,
    /// Unsharp mask against the coarsest blurred plane.
    #[strum(serialize = "unsharp")]
    #[serde(rename = "unsharp")]
    Unsharp,
}

impl ViewMethod {
    pub fn from_legacy(name: &str) -> Result<Self, ParamError> {
        parse_legacy("view method", name)
    }

    pub(crate) fn shows_transmission(self) -> bool {
        matches!(self, ViewMethod::Transmission | ViewMethod::Transmission2)
    }
}

/// Mask preview mode of a spot pass, stored as an index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Display, AsRefStr, EnumIter, Serialize, Deserialize)]
pub enum MaskView {
    /// Masks are built and applied, output is the processed spot.
    #[default]
    Off = 0,
    /// No mask stage at all.
    Modified = 1,
    /// Masks are built and applied, for showing modified areas with the mask.
    ModifiedWithMask = 2,
    /// Masks are built and written to the diagnostic mask buffer only.
    Mask = 3,
    /// Masks are built without chroma weighting, for the selection preview.
    Preview = 4,
}

impl MaskView {
    pub fn from_index(index: i32) -> Result<Self, ParamError> {
        match index {
            0 => Ok(MaskView::Off),
            1 => Ok(MaskView::Modified),
            2 => Ok(MaskView::ModifiedWithMask),
            3 => Ok(MaskView::Mask),
            4 => Ok(MaskView::Preview),
            _ => Err(ParamError::IndexOutOfRange {
                kind: "mask view",
                index,
            }),
        }
    }

    pub fn index(self) -> i32 {
        self as i32
    }
}

/// Channel a spot pass works on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Display, EnumIter, Serialize, Deserialize)]
pub enum RetinexChannel {
    #[default]
    Luminance,
    Chroma,
}

/// Parameters of the global Retinex.
///
/// Percentages follow the editor sliders: `strength`, `variance` and
/// `highlight` are divided by 100 internally.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetinexParams {
    pub enabled: bool,
    pub color_space: RetinexColorSpace,
    pub method: RetinexMethod,
    pub map_method: MapMethod,
    pub view_method: ViewMethod,
    /// Blend with the original plane, percent.
    pub strength: f32,
    /// Added to the gain-mapped signal.
    pub offset: f32,
    pub iterations: u32,
    /// Iteration schedule, -1..=6.
    pub gradient: i32,
    /// Variance and limit schedule, -2..=2.
    pub grad_variance: i32,
    /// Strength schedule, -2..=2.
    pub grad_strength: i32,
    /// Number of blur scales before scheduling.
    pub scale: u32,
    /// Neighbourhood size; the largest radius is `2.8 * neighbourhood`.
    pub neighbourhood: f32,
    /// Spread of the gain window in standard deviations, percent.
    pub variance: f32,
    /// Log-ratio clamp; the effective limit is `limit^1.7`.
    pub limit: f32,
    pub highlight: f32,
    /// Highlight compression of the tonal map, percent.
    pub highlights: f32,
    pub highlight_tonal_width: f32,
    /// Shadow lift of the tonal map, percent.
    pub shadows: f32,
    pub shadow_tonal_width: f32,
    /// Blur radius of the tonal map for [`MapMethod::Gaussian`].
    pub radius: f32,
    /// One 3x3 median pass over the transmission map.
    pub median_map: bool,
}

impl Default for RetinexParams {
    fn default() -> Self {
        Self {
            enabled: false,
            color_space: RetinexColorSpace::Lab,
            method: RetinexMethod::High,
            map_method: MapMethod::None,
            view_method: ViewMethod::Normal,
            strength: 20.0,
            offset: 0.0,
            iterations: 1,
            gradient: 1,
            grad_variance: 1,
            grad_strength: 1,
            scale: 3,
            neighbourhood: 80.0,
            variance: 200.0,
            limit: 8.0,
            highlight: 4.0,
            highlights: 0.0,
            highlight_tonal_width: 80.0,
            shadows: 0.0,
            shadow_tonal_width: 80.0,
            radius: 40.0,
            median_map: false,
        }
    }
}

impl RetinexParams {
    pub fn validate(&self) {
        assert!(
            (1..=5).contains(&self.iterations),
            "iterations must be in 1..=5, got {}",
            self.iterations
        );
        assert!(
            (-1..=6).contains(&self.gradient),
            "gradient must be in -1..=6, got {}",
            self.gradient
        );
        assert!(
            (-2..=2).contains(&self.grad_variance),
            "grad_variance must be in -2..=2, got {}",
            self.grad_variance
        );
        assert!(
            (-2..=2).contains(&self.grad_strength),
            "grad_strength must be in -2..=2, got {}",
            self.grad_strength
        );
        assert!(
            (1..=8).contains(&self.scale),
            "scale must be in 1..=8, got {}",
            self.scale
        );
        assert!(
            self.limit > 0.0 && self.neighbourhood >= 0.0 && self.radius >= 0.0,
            "limit must be positive and neighbourhood/radius non-negative"
        );
    }
}

/// Retinex settings stored with a local adjustment spot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SpotParams {
    pub method: RetinexMethod,
    /// Blend with the original plane, percent.
    pub strength: f32,
    /// Strength multiplier for the chroma pass, percent.
    pub chroma_strength: f32,
    pub neighbourhood: f32,
    /// Spread of the gain window in standard deviations, percent.
    pub variance: f32,
    /// Radius of the guided filter run on the log-ratio signal.
    pub soft_radius: f32,
    /// Radius of the guided filter run on the mask.
    pub mask_radius: f32,
    pub mask_gamma: f32,
    pub mask_slope: f32,
    /// Mask blend, percent. Negative values subtract.
    pub mask_blend: f32,
    /// Extra chroma weight of the mask, percent.
    pub mask_chroma: f32,
}

impl Default for SpotParams {
    fn default() -> Self {
        Self {
            method: RetinexMethod::High,
            strength: 20.0,
            chroma_strength: 0.0,
            neighbourhood: 50.0,
            variance: 150.0,
            soft_radius: 0.0,
            mask_radius: 0.0,
            mask_gamma: 1.0,
            mask_slope: 0.0,
            mask_blend: 0.0,
            mask_chroma: 0.0,
        }
    }
}

impl SpotParams {
    pub fn validate(&self) {
        assert!(
            self.mask_gamma > 0.0,
            "mask_gamma must be positive, got {}",
            self.mask_gamma
        );
        assert!(
            self.neighbourhood >= 0.0 && self.soft_radius >= 0.0 && self.mask_radius >= 0.0,
            "neighbourhood and radii must be non-negative"
        );
    }
}

/// Per-call settings of a spot pass that depend on the caller, not the spot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LocalRetinexSettings {
    pub channel: RetinexChannel,
    /// Preview downscale factor, 1 for full resolution.
    pub skip: usize,
    /// Number of blur scales.
    pub scales: usize,
    /// Neighbourhood multiplier applied before the skip reduction.
    pub radius_factor: f32,
    pub mask_view: MaskView,
    /// The mask modulates the blurred plane instead of the working lightness.
    pub mask_targets_transmission: bool,
    pub apply_mask: bool,
}

impl Default for LocalRetinexSettings {
    fn default() -> Self {
        Self {
            channel: RetinexChannel::Luminance,
            skip: 1,
            scales: 3,
            radius_factor: 1.0,
            mask_view: MaskView::Off,
            mask_targets_transmission: false,
            apply_mask: false,
        }
    }
}

impl LocalRetinexSettings {
    pub fn validate(&self) {
        assert!(self.skip >= 1, "skip must be at least 1");
        assert!(
            (1..=8).contains(&self.scales),
            "scales must be in 1..=8, got {}",
            self.scales
        );
    }
}
