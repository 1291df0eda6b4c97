//! Sensor colour filter layouts and the raw frame they describe.
//!
//! Colour indices are 0 = red, 1 = green, 2 = blue. Lookups take `(row, col)`
//! because CFA tiles are conventionally written row by row.


use common::Buffer2;
use serde::{Deserialize, Serialize};

pub const RED: u8 = 0;
pub const GREEN: u8 = 1;
pub const BLUE: u8 = 2;

/// Bayer 2x2 tile, named by the colours of its top-left, top-right,
/// bottom-left and bottom-right sites.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CfaPattern {
    Rggb,
    Bggr,
    Grbg,
    Gbrg,
}

impl CfaPattern {
    /// Colour indices of the tile in row-major order.
    #[inline]
    pub fn tile(&self) -> [u8; 4] {
        match self {
            CfaPattern::Rggb => [RED, GREEN, GREEN, BLUE],
            CfaPattern::Bggr => [BLUE, GREEN, GREEN, RED],
            CfaPattern::Grbg => [GREEN, RED, BLUE, GREEN],
            CfaPattern::Gbrg => [GREEN, BLUE, RED, GREEN],
        }
    }

    #[inline]
    pub fn color_at(&self, row: usize, col: usize) -> u8 {
        self.tile()[((row & 1) << 1) | (col & 1)]
    }

    #[inline]
    pub fn is_green(&self, row: usize, col: usize) -> bool {
        self.color_at(row, col) == GREEN
    }
}

/// Fujifilm X-Trans 6x6 tile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct XTransPattern([[u8; 6]; 6]);

impl XTransPattern {
    pub fn new(tile: [[u8; 6]; 6]) -> Self {
        assert!(
            tile.iter().flatten().all(|&c| c <= BLUE),
            "X-Trans colour indices must be 0, 1 or 2"
        );
        Self(tile)
    }

    #[inline]
    pub fn color_at(&self, row: usize, col: usize) -> u8 {
        self.0[row % 6][col % 6]
    }

    #[inline]
    pub fn tile(&self) -> &[[u8; 6]; 6] {
        &self.0
    }
}

/// Sensor layout of a raw frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CfaType {
    Bayer(CfaPattern),
    XTrans(XTransPattern),
    /// Every site carries `colors` samples stored side by side, so the grid
    /// width is `sites * colors`.
    Interleaved { colors: usize },
}

/// Raw sample grid plus the layout needed to interpret it.
#[derive(Debug, Clone)]
pub struct RawFrame {
    pub data: Buffer2<f32>,
    pub cfa: CfaType,
}

impl RawFrame {
    pub fn new(data: Buffer2<f32>, cfa: CfaType) -> Self {
        if let CfaType::Interleaved { colors } = cfa {
            assert!(colors > 0, "Interleaved frame needs at least one colour");
            assert_eq!(
                data.width() % colors,
                0,
                "Interleaved grid width {} is not a multiple of {} colours",
                data.width(),
                colors
            );
        }
        Self { data, cfa }
    }

    /// Width in sensor sites.
    pub fn sites_wide(&self) -> usize {
        match self.cfa {
            CfaType::Interleaved { colors } => self.data.width() / colors,
            _ => self.data.width(),
        }
    }

    pub fn height(&self) -> usize {
        self.data.height()
    }
}
