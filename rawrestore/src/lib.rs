//! Rawrestore - raw sensor image restoration.
//!
//! Two independent stages operate on caller-owned [`Buffer2`] grids:
//! - Defect repair: hot, dead and zero pixel detection plus gradient-weighted
//!   interpolation for Bayer, X-Trans and interleaved N-colour sensors
//! - Multi-scale Retinex: illumination/reflectance decomposition of a luminance
//!   plane, either over the whole image or restricted to a spot
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use rawrestore::prelude::*;
//!
//! let mut frame = RawFrame::new(data, CfaType::Bayer(CfaPattern::Rggb));
//! let report = correct_defects(&mut frame, &DefectConfig::default());
//!
//! let mut stats = RetinexStats::default();
//! MultiScaleRetinex::new(&RetinexParams::default(), RetinexCurves::default())
//!     .apply(&mut luminance, &original, &ex, &mut stats);
//! ```

pub mod curves;
pub mod defects;
mod error;
pub mod filters;
pub mod math;
pub mod raw;
pub mod retinex;

#[cfg(test)]
pub mod testing;

pub mod prelude;

pub use common::Buffer2;

pub use error::ParamError;

// ============================================================================
// Sensor layout
// ============================================================================

pub use raw::{CfaPattern, CfaType, RawFrame, XTransPattern};

// ============================================================================
// Defect repair
// ============================================================================

pub use defects::{
    DefectConfig, DefectMap, DefectReport, correct_defects, find_hot_dead_pixels,
    find_zero_pixels, interpolate_bayer, interpolate_ncolor, interpolate_xtrans,
};

// ============================================================================
// Retinex
// ============================================================================

pub use retinex::{
    LabPlanes, LocalRetinex, LocalRetinexCurves, LocalRetinexSettings, MapMethod, MaskBuffers,
    MaskView, MultiScaleRetinex, RetinexChannel, RetinexColorSpace, RetinexCurves, RetinexMethod,
    RetinexParams, RetinexStats, SpotParams, ViewMethod,
};
