//! Prelude module for convenient imports.
//!
//! ```rust,ignore
//! use rawrestore::prelude::*;
//! ```

pub use crate::Buffer2;

// Sensor layout
pub use crate::{CfaPattern, CfaType, RawFrame, XTransPattern};

// Defect repair
pub use crate::{DefectConfig, DefectMap, DefectReport, correct_defects};

// Retinex
pub use crate::curves::{Curve, Lut};
pub use crate::{
    LabPlanes, LocalRetinex, LocalRetinexCurves, LocalRetinexSettings, MaskBuffers,
    MultiScaleRetinex, RetinexCurves, RetinexParams, RetinexStats, SpotParams,
};
