//! Edge-preserving guided filter (He, Sun and Tang) with its box mean and
//! resampling helpers.

use common::Buffer2;
use common::parallel::for_each_row_mut;

/// Mean over the `(2r+1)x(2r+1)` window around every sample. Windows are cut
/// at the borders and divided by the number of samples they actually cover.
pub fn box_mean(src: &Buffer2<f32>, radius: usize) -> Buffer2<f32> {
    let mut out = src.clone();
    if radius == 0 || src.is_empty() {
        return out;
    }

    box_rows(&mut out, radius);
    let mut transposed = out.transposed();
    box_rows(&mut transposed, radius);
    transposed.transposed()
}

fn box_rows(buf: &mut Buffer2<f32>, radius: usize) {
    for_each_row_mut(buf, |_, row| {
        let n = row.len();
        let line = row.to_vec();
        let mut sum: f64 = line[..radius.min(n - 1) + 1].iter().map(|&v| v as f64).sum();
        for x in 0..n {
            let lo = x.saturating_sub(radius);
            let hi = (x + radius).min(n - 1);
            row[x] = (sum / (hi - lo + 1) as f64) as f32;

            if x + radius + 1 < n {
                sum += line[x + radius + 1] as f64;
            }
            if x >= radius {
                sum -= line[x - radius] as f64;
            }
        }
    });
}

/// Bilinear resampling to `width x height` with pixel centres aligned.
pub fn resize_bilinear(src: &Buffer2<f32>, width: usize, height: usize) -> Buffer2<f32> {
    if src.width() == width && src.height() == height {
        return src.clone();
    }
    let mut dst = Buffer2::new_default(width, height);
    if src.is_empty() || width == 0 || height == 0 {
        return dst;
    }

    let sx = src.width() as f32 / width as f32;
    let sy = src.height() as f32 / height as f32;
    let max_x = src.width() - 1;
    let max_y = src.height() - 1;

    for_each_row_mut(&mut dst, |y, row| {
        let fy = ((y as f32 + 0.5) * sy - 0.5).clamp(0.0, max_y as f32);
        let y0 = fy as usize;
        let y1 = (y0 + 1).min(max_y);
        let ty = fy - y0 as f32;
        let r0 = src.row(y0);
        let r1 = src.row(y1);

        for (x, out) in row.iter_mut().enumerate() {
            let fx = ((x as f32 + 0.5) * sx - 0.5).clamp(0.0, max_x as f32);
            let x0 = fx as usize;
            let x1 = (x0 + 1).min(max_x);
            let tx = fx - x0 as f32;

            let top = r0[x0] + tx * (r0[x1] - r0[x0]);
            let bottom = r1[x0] + tx * (r1[x1] - r1[x0]);
            *out = top + ty * (bottom - top);
        }
    });
    dst
}

fn zip_map(a: &Buffer2<f32>, b: &Buffer2<f32>, f: impl Fn(f32, f32) -> f32) -> Buffer2<f32> {
    debug_assert!(a.same_size(b));
    let pixels = a.iter().zip(b.iter()).map(|(&a, &b)| f(a, b)).collect();
    Buffer2::new(a.width(), a.height(), pixels)
}

/// Smooths `src` while following the edges of `guide`, writing into `dst`.
///
/// Statistics are computed on a grid subsampled by `subsampling` and upsampled
/// again before the final `a * guide + b` step. The box radius is
/// `radius / subsampling`, limited so the window fits the subsampled plane.
/// Flat guides reproduce `src` smoothed by the box mean; a constant `src`
/// passes through unchanged.
pub fn guided_filter(
    guide: &Buffer2<f32>,
    src: &Buffer2<f32>,
    dst: &mut Buffer2<f32>,
    radius: f32,
    epsilon: f32,
    subsampling: usize,
) {
    assert!(
        guide.same_size(src) && src.same_size(dst),
        "Guide {}x{}, source {}x{} and destination {}x{} must share dimensions",
        guide.width(),
        guide.height(),
        src.width(),
        src.height(),
        dst.width(),
        dst.height()
    );
    if src.is_empty() {
        return;
    }

    let subsampling = subsampling.max(1);
    let w = (src.width() / subsampling).max(1);
    let h = (src.height() / subsampling).max(1);

    let limit = ((w.min(h) as isize - 1) / 2 - 1).max(0) as usize;
    let r = ((radius / subsampling as f32).max(0.0) as usize).min(limit);

    let guide_small = resize_bilinear(guide, w, h);
    let src_small = resize_bilinear(src, w, h);

    let mean_i = box_mean(&guide_small, r);
    let mean_p = box_mean(&src_small, r);
    let corr_ip = box_mean(&zip_map(&guide_small, &src_small, |i, p| i * p), r);
    let corr_ii = box_mean(&guide_small.map(|&i| i * i), r);

    let var_i = zip_map(&corr_ii, &mean_i, |c, m| c - m * m);
    let cov_ip = {
        let mean_ip = zip_map(&mean_i, &mean_p, |i, p| i * p);
        zip_map(&corr_ip, &mean_ip, |c, m| c - m)
    };

    let a = zip_map(&cov_ip, &var_i, |c, v| c / (v + epsilon));
    let b = {
        let a_mean_i = zip_map(&a, &mean_i, |a, i| a * i);
        zip_map(&mean_p, &a_mean_i, |p, ai| p - ai)
    };

    let mean_a = resize_bilinear(&box_mean(&a, r), src.width(), src.height());
    let mean_b = resize_bilinear(&box_mean(&b, r), src.width(), src.height());

    for_each_row_mut(dst, |y, row| {
        let g = guide.row(y);
        let ma = mean_a.row(y);
        let mb = mean_b.row(y);
        for x in 0..row.len() {
            row[x] = ma[x] * g[x] + mb[x];
        }
    });
}
