//! Separable Gaussian blur.
//!
//! Small sigmas (< 3) use a truncated kernel of radius `ceil(3 * sigma)`.
//! Larger sigmas use the Young - van Vliet third order recursive filter, whose
//! cost does not grow with sigma. Edges replicate the outermost sample.
//!
//! Every line is filtered as an offset from its first sample, so a constant
//! line comes out bit-identical.

use common::Buffer2;
use common::parallel::for_each_row_mut;

/// Sigma from which the recursive filter replaces direct convolution.
const RECURSIVE_MIN_SIGMA: f32 = 3.0;

/// Normalized 1D Gaussian kernel of radius `ceil(3 * sigma)`.
pub fn gaussian_kernel_1d(sigma: f32) -> Vec<f32> {
    assert!(sigma > 0.0, "Sigma must be positive");

    let radius = (3.0 * sigma).ceil() as usize;
    let two_sigma_sq = 2.0 * sigma * sigma;
    let mut kernel: Vec<f32> = (0..=2 * radius)
        .map(|i| {
            let x = i as f32 - radius as f32;
            (-x * x / two_sigma_sq).exp()
        })
        .collect();

    let sum: f32 = kernel.iter().sum();
    for v in &mut kernel {
        *v /= sum;
    }
    kernel
}

/// Blurs `src` into `dst`. A non-positive sigma copies.
pub fn gaussian_blur(src: &Buffer2<f32>, dst: &mut Buffer2<f32>, sigma: f32) {
    dst.copy_from(src);
    gaussian_blur_in_place(dst, sigma);
}

/// Blurs `buf` in place. A non-positive sigma leaves it untouched.
pub fn gaussian_blur_in_place(buf: &mut Buffer2<f32>, sigma: f32) {
    if !(sigma > 0.0) || buf.is_empty() {
        return;
    }

    let filter = LineFilter::new(sigma);
    blur_rows(buf, &filter);
    let mut transposed = buf.transposed();
    blur_rows(&mut transposed, &filter);
    *buf = transposed.transposed();
}

fn blur_rows(buf: &mut Buffer2<f32>, filter: &LineFilter) {
    for_each_row_mut(buf, |_, row| {
        let mut scratch = vec![0.0f32; row.len()];
        filter.apply(row, &mut scratch);
    });
}

enum LineFilter {
    Kernel(Vec<f32>),
    Recursive(RecursiveCoefficients),
}

impl LineFilter {
    fn new(sigma: f32) -> Self {
        if sigma < RECURSIVE_MIN_SIGMA {
            LineFilter::Kernel(gaussian_kernel_1d(sigma))
        } else {
            LineFilter::Recursive(RecursiveCoefficients::new(sigma))
        }
    }

    fn apply(&self, line: &mut [f32], scratch: &mut [f32]) {
        let Some(&base) = line.first() else {
            return;
        };
        for v in line.iter_mut() {
            *v -= base;
        }

        match self {
            LineFilter::Kernel(kernel) => convolve(line, scratch, kernel),
            LineFilter::Recursive(c) => c.filter(line, scratch),
        }

        for v in line.iter_mut() {
            *v += base;
        }
    }
}

/// Direct convolution with clamped borders. The result is written back into `line`.
fn convolve(line: &mut [f32], scratch: &mut [f32], kernel: &[f32]) {
    let n = line.len() as isize;
    let radius = (kernel.len() / 2) as isize;
    for (i, out) in scratch.iter_mut().enumerate() {
        let i = i as isize;
        *out = kernel
            .iter()
            .enumerate()
            .map(|(k, &w)| w * line[(i + k as isize - radius).clamp(0, n - 1) as usize])
            .sum();
    }
    line.copy_from_slice(scratch);
}

/// Young - van Vliet recursive Gaussian coefficients, normalized by `b0`.
struct RecursiveCoefficients {
    gain: f32,
    b1: f32,
    b2: f32,
    b3: f32,
}

impl RecursiveCoefficients {
    fn new(sigma: f32) -> Self {
        let sigma = sigma as f64;
        let q = if sigma >= 2.5 {
            0.98711 * sigma - 0.96330
        } else {
            3.97156 - 4.14554 * (1.0 - 0.26891 * sigma).sqrt()
        };
        let q2 = q * q;
        let q3 = q2 * q;

        let b0 = 1.57825 + 2.44413 * q + 1.4281 * q2 + 0.422205 * q3;
        let b1 = 2.44413 * q + 2.85619 * q2 + 1.26661 * q3;
        let b2 = -(1.4281 * q2 + 1.26661 * q3);
        let b3 = 0.422205 * q3;

        Self {
            gain: (1.0 - (b1 + b2 + b3) / b0) as f32,
            b1: (b1 / b0) as f32,
            b2: (b2 / b0) as f32,
            b3: (b3 / b0) as f32,
        }
    }

    /// Causal pass into `scratch`, anti-causal pass back into `line`.
    /// Both passes start from the steady state of the replicated edge sample.
    fn filter(&self, line: &mut [f32], scratch: &mut [f32]) {
        let n = line.len();

        let (mut w1, mut w2, mut w3) = (line[0], line[0], line[0]);
        for i in 0..n {
            let w = self.gain * line[i] + self.b1 * w1 + self.b2 * w2 + self.b3 * w3;
            scratch[i] = w;
            w3 = w2;
            w2 = w1;
            w1 = w;
        }

        let last = scratch[n - 1];
        let (mut y1, mut y2, mut y3) = (last, last, last);
        for i in (0..n).rev() {
            let y = self.gain * scratch[i] + self.b1 * y1 + self.b2 * y2 + self.b3 * y3;
            line[i] = y;
            y3 = y2;
            y2 = y1;
            y1 = y;
        }
    }
}
