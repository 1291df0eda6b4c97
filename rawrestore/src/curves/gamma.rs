use super::{Curve, Lut};

/// Entries of a [`GammaLut`], covering twice the 16-bit range.
const GAMMA_LUT_SIZE: usize = 65536;

/// Solves the toe of a gamma curve with a linear segment of slope `slope`.
///
/// Returns `[power, slope, threshold, threshold / slope, offset]`, the
/// parameter layout of dcraw's `gamma_curve`. With `slope == 0` there is no
/// linear segment and the last three entries are zero.
pub fn gamma_coefficients(power: f64, slope: f64) -> [f64; 5] {
    let mut g = [power, slope, 0.0, 0.0, 0.0];
    let mut bounds = [0.0f64, 0.0];
    bounds[(g[1] >= 1.0) as usize] = 1.0;

    if g[1] != 0.0 && (g[1] - 1.0) * (g[0] - 1.0) <= 0.0 {
        for _ in 0..48 {
            g[2] = (bounds[0] + bounds[1]) / 2.0;
            let upper = if g[0] != 0.0 {
                ((g[2] / g[1]).powf(-g[0]) - 1.0) / g[0] - 1.0 / g[2] > -1.0
            } else {
                g[2] / (1.0 - 1.0 / g[2]).exp() < g[1]
            };
            bounds[upper as usize] = g[2];
        }
        g[3] = g[2] / g[1];
        if g[0] != 0.0 {
            g[4] = g[2] * (1.0 / g[0] - 1.0);
        }
    }
    g
}

#[inline]
fn encode(x: f64, gamma: f64, start: f64, slope: f64, mul: f64, add: f64) -> f64 {
    if x <= start {
        x * slope
    } else {
        (x.ln() / gamma).exp() * mul - add
    }
}

#[inline]
fn decode(x: f64, gamma: f64, start: f64, slope: f64, mul: f64, add: f64) -> f64 {
    if x <= start * slope {
        if slope > 0.0 { x / slope } else { 0.0 }
    } else {
        (((x + add) / mul).ln() * gamma).exp()
    }
}

/// Gamma tone table applied to masks, indexed by twice the value.
///
/// Entry `i` holds `0.5 * clamp(f(i / 65535) * 65535, 0, 65535)` where `f`
/// encodes with `gamma` (or decodes for `gamma < 1`) and has a linear toe of
/// `slope`. Gamma 1 with slope 0 is the identity after halving the index.
#[derive(Debug, Clone, PartialEq)]
pub struct GammaLut {
    lut: Lut,
}

impl GammaLut {
    pub fn new(gamma: f32, slope: f32) -> Self {
        assert!(gamma > 0.0, "gamma must be positive, got {gamma}");
        let gamma = gamma as f64;
        let slope = slope as f64;

        let (power, gamm) = if gamma < 1.0 {
            (gamma, 1.0 / gamma)
        } else {
            (1.0 / gamma, gamma)
        };
        let g = gamma_coefficients(power, slope);
        let start = if gamma < 1.0 { g[2] } else { g[3] };
        let add = g[4];
        let mul = 1.0 + g[4];

        let lut = Lut::from_fn(GAMMA_LUT_SIZE, |i| {
            let x = i as f64 / 65535.0;
            let y = if gamma < 1.0 {
                decode(x, gamm, start, slope, mul, add)
            } else {
                encode(x, gamm, start, slope, mul, add)
            };
            (0.5 * (y * 65535.0).clamp(0.0, 65535.0)) as f32
        });
        Self { lut }
    }
}

impl Curve for GammaLut {
    #[inline]
    fn value(&self, index: f32) -> f32 {
        self.lut.value(index)
    }
}
