//! Small numeric kernels shared by the defect and Retinex stages.

#[cfg(test)]
mod tests;

use common::Buffer2;
use common::parallel::reduce_rows;

/// Median of 9 values using a 19 compare-exchange network.
#[inline]
pub fn median9(mut v: [f32; 9]) -> f32 {
    #[inline(always)]
    fn sort(v: &mut [f32; 9], a: usize, b: usize) {
        if v[a] > v[b] {
            v.swap(a, b);
        }
    }

    sort(&mut v, 1, 2);
    sort(&mut v, 4, 5);
    sort(&mut v, 7, 8);
    sort(&mut v, 0, 1);
    sort(&mut v, 3, 4);
    sort(&mut v, 6, 7);
    sort(&mut v, 1, 2);
    sort(&mut v, 4, 5);
    sort(&mut v, 7, 8);
    sort(&mut v, 0, 3);
    sort(&mut v, 5, 8);
    sort(&mut v, 4, 7);
    sort(&mut v, 3, 6);
    sort(&mut v, 1, 4);
    sort(&mut v, 2, 5);
    sort(&mut v, 4, 7);
    sort(&mut v, 4, 2);
    sort(&mut v, 6, 4);
    sort(&mut v, 4, 2);
    v[4]
}

/// Summary statistics of a plane.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlaneStats {
    pub mean: f32,
    pub stddev: f32,
    pub min: f32,
    pub max: f32,
}

#[derive(Clone, Copy)]
struct Moments {
    sum: f64,
    sum_sq: f64,
    min: f32,
    max: f32,
}

impl Moments {
    const EMPTY: Self = Self {
        sum: 0.0,
        sum_sq: 0.0,
        min: f32::MAX,
        max: f32::MIN,
    };

    fn merge(self, other: Self) -> Self {
        Self {
            sum: self.sum + other.sum,
            sum_sq: self.sum_sq + other.sum_sq,
            min: self.min.min(other.min),
            max: self.max.max(other.max),
        }
    }
}

/// Mean, population standard deviation and extrema of `plane`.
///
/// Sums are accumulated in `f64` over fixed row blocks, so the result does not
/// depend on the thread count. A constant plane yields exactly its value as the
/// mean and a standard deviation of exactly zero.
pub fn plane_stats(plane: &Buffer2<f32>) -> PlaneStats {
    let n = plane.len();
    if n == 0 {
        return PlaneStats {
            mean: 0.0,
            stddev: 0.0,
            min: 0.0,
            max: 0.0,
        };
    }

    let m = reduce_rows(
        plane,
        || Moments::EMPTY,
        |acc, _, row| {
            row.iter().fold(acc, |mut acc, &v| {
                let v64 = v as f64;
                acc.sum += v64;
                acc.sum_sq += v64 * v64;
                acc.min = acc.min.min(v);
                acc.max = acc.max.max(v);
                acc
            })
        },
        Moments::merge,
    );

    if m.min == m.max {
        return PlaneStats {
            mean: m.min,
            stddev: 0.0,
            min: m.min,
            max: m.max,
        };
    }

    let mean = m.sum / n as f64;
    let variance = (m.sum_sq / n as f64 - mean * mean).max(0.0);

    PlaneStats {
        mean: mean as f32,
        stddev: variance.sqrt() as f32,
        min: m.min,
        max: m.max,
    }
}

/// Linear interpolation: `b + t * (a - b)`.
#[inline]
pub fn intp(t: f32, a: f32, b: f32) -> f32 {
    t * (a - b) + b
}
