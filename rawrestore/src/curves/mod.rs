//! Tone curves sampled by the Retinex stages.
//!
//! Callers hand curves in through the [`Curve`] trait, so a lookup table, a
//! piecewise linear spline or an analytic curve all plug in the same way.

mod gamma;


pub use gamma::{GammaLut, gamma_coefficients};

/// A scalar curve `y = f(x)`.
pub trait Curve: Sync {
    fn value(&self, x: f32) -> f32;
}

impl<C: Curve + ?Sized> Curve for &C {
    #[inline]
    fn value(&self, x: f32) -> f32 {
        (**self).value(x)
    }
}

/// Lookup table indexed by a float.
///
/// Fractional indices interpolate linearly between neighbouring entries.
/// Indices below 0 return the first entry, indices past the end the last one.
#[derive(Debug, Clone, PartialEq)]
pub struct Lut {
    data: Vec<f32>,
}

impl Lut {
    pub fn new(data: Vec<f32>) -> Self {
        assert!(data.len() >= 2, "Lut needs at least 2 entries");
        Self { data }
    }

    /// Fills `size` entries with `f(i)`.
    pub fn from_fn(size: usize, f: impl Fn(usize) -> f32) -> Self {
        Self::new((0..size).map(f).collect())
    }

    /// Samples `curve` over `[0, 1]` into `size` entries, so index `i` maps to
    /// `i / (size - 1)`.
    pub fn sampled(curve: &dyn Curve, size: usize) -> Self {
        let last = size.saturating_sub(1).max(1) as f32;
        Self::from_fn(size, |i| curve.value(i as f32 / last))
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn as_slice(&self) -> &[f32] {
        &self.data
    }
}

impl Curve for Lut {
    #[inline]
    fn value(&self, index: f32) -> f32 {
        let last = self.data.len() - 1;
        if !(index > 0.0) {
            return self.data[0];
        }
        let i = index as usize;
        if i >= last {
            return self.data[last];
        }
        let t = index - i as f32;
        self.data[i] + t * (self.data[i + 1] - self.data[i])
    }
}

/// Linear interpolation through control points, constant outside them.
#[derive(Debug, Clone, PartialEq)]
pub struct PiecewiseLinear {
    points: Vec<(f32, f32)>,
}

impl PiecewiseLinear {
    /// Points are sorted by `x`.
    pub fn new(mut points: Vec<(f32, f32)>) -> Self {
        assert!(!points.is_empty(), "PiecewiseLinear needs at least one point");
        points.sort_by(|a, b| a.0.total_cmp(&b.0));
        Self { points }
    }

    /// Horizontal line at `y`.
    pub fn flat(y: f32) -> Self {
        Self::new(vec![(0.0, y), (1.0, y)])
    }

    /// `y = x` over `[0, 1]`.
    pub fn identity() -> Self {
        Self::new(vec![(0.0, 0.0), (1.0, 1.0)])
    }

    pub fn points(&self) -> &[(f32, f32)] {
        &self.points
    }
}

impl Curve for PiecewiseLinear {
    fn value(&self, x: f32) -> f32 {
        let first = self.points[0];
        if x <= first.0 {
            return first.1;
        }
        for pair in self.points.windows(2) {
            let (x0, y0) = pair[0];
            let (x1, y1) = pair[1];
            if x <= x1 {
                if x1 == x0 {
                    return y1;
                }
                return y0 + (x - x0) / (x1 - x0) * (y1 - y0);
            }
        }
        self.points[self.points.len() - 1].1
    }
}
