//! Hot, dead and zero pixel detection.

use common::Buffer2;
use common::parallel::for_each_row_mut;

use super::{DefectMap, EDGE_GUARD};
use crate::math::median9;

/// Maps the user threshold percentage to the residual ratio a site must exceed.
#[inline]
pub fn hot_dead_ratio(threshold: f32) -> f32 {
    ((20.0 * (threshold as f64 / 100.0) + 1.0) / 24.0) as f32
}

/// Residual of every site against the median of its 3x3 same-colour
/// neighbourhood sampled at stride 2. Sites within the edge guard get 0.
fn median_residuals(grid: &Buffer2<f32>) -> Buffer2<f32> {
    let width = grid.width();
    let height = grid.height();
    let mut residuals = Buffer2::new_default(width, height);
    if width <= 2 * EDGE_GUARD || height <= 2 * EDGE_GUARD {
        return residuals;
    }

    for_each_row_mut(&mut residuals, |y, row| {
        if y < EDGE_GUARD || y >= height - EDGE_GUARD {
            return;
        }
        let above = grid.row(y - 2);
        let center = grid.row(y);
        let below = grid.row(y + 2);
        for x in EDGE_GUARD..width - EDGE_GUARD {
            let median = median9([
                above[x - 2],
                above[x],
                above[x + 2],
                center[x - 2],
                center[x],
                center[x + 2],
                below[x - 2],
                below[x],
                below[x + 2],
            ]);
            row[x] = center[x] - median;
        }
    });

    residuals
}

/// Flags sites whose deviation from the local same-colour median dominates the
/// deviations around them.
///
/// A site is flagged when `|r| > ratio * (sum of |r| over its 5x5 window - |r|)`,
/// with `ratio` from [`hot_dead_ratio`]. Positive residuals are hot, negative
/// are dead; each kind can be disabled. Sites within two samples of an edge are
/// never flagged. Returns the number of sites flagged by this scan.
pub fn find_hot_dead_pixels(
    grid: &Buffer2<f32>,
    map: &mut DefectMap,
    threshold: f32,
    find_hot: bool,
    find_dead: bool,
) -> usize {
    assert!(
        map.width() == grid.width() && map.height() == grid.height(),
        "Grid dimensions {}x{} don't match defect map {}x{}",
        grid.width(),
        grid.height(),
        map.width(),
        map.height()
    );

    let width = grid.width();
    let height = grid.height();
    if width <= 2 * EDGE_GUARD || height <= 2 * EDGE_GUARD || !(find_hot || find_dead) {
        return 0;
    }

    let ratio = hot_dead_ratio(threshold);
    let residuals = median_residuals(grid);

    map.mark_rows(|y, bits| {
        if y < EDGE_GUARD || y >= height - EDGE_GUARD {
            return 0;
        }
        let mut found = 0;
        for x in EDGE_GUARD..width - EDGE_GUARD {
            let residual = residuals[(x, y)];
            if residual == 0.0
                || (!find_dead && residual < 0.0)
                || (!find_hot && residual > 0.0)
            {
                continue;
            }

            let deviation = residual.abs();
            let mut neighbourhood = -deviation;
            for yy in y - 2..=y + 2 {
                neighbourhood += residuals.row(yy)[x - 2..=x + 2]
                    .iter()
                    .map(|r| r.abs())
                    .sum::<f32>();
            }

            if deviation > ratio * neighbourhood {
                bits.set(x);
                found += 1;
            }
        }
        found
    })
}

/// Flags every site whose sample is exactly zero, border included.
/// Returns the number of sites flagged by this scan.
pub fn find_zero_pixels(grid: &Buffer2<f32>, map: &mut DefectMap) -> usize {
    assert!(
        map.width() == grid.width() && map.height() == grid.height(),
        "Grid dimensions {}x{} don't match defect map {}x{}",
        grid.width(),
        grid.height(),
        map.width(),
        map.height()
    );

    map.mark_rows(|y, bits| {
        let mut found = 0;
        for (x, &v) in grid.row(y).iter().enumerate() {
            if v == 0.0 {
                bits.set(x);
                found += 1;
            }
        }
        found
    })
}

/// Zero detection for interleaved storage: a site is flagged when any of its
/// `colors` samples is exactly zero.
pub(crate) fn find_zero_sites(grid: &Buffer2<f32>, colors: usize, map: &mut DefectMap) -> usize {
    debug_assert_eq!(map.width() * colors, grid.width());
    map.mark_rows(|y, bits| {
        let mut found = 0;
        for (x, site) in grid.row(y).chunks_exact(colors).enumerate() {
            if site.contains(&0.0) {
                bits.set(x);
                found += 1;
            }
        }
        found
    })
}
