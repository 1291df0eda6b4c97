use common::Buffer2;

use super::{DefectMap, PairSum, W_AXIS_1, W_DIAGONAL, collect_repairs};

/// Repairs flagged sites of an interleaved grid in place, where every site
/// stores `colors` samples side by side. `map` is indexed by site.
///
/// All channels of a site are interpolated together from the diagonal,
/// horizontal and vertical neighbour sites at distance 1, using the same
/// pairs for every channel. Falls back to the per-channel mean of the
/// unflagged sites on the stride-2 3x3 grid. Returns the number of repaired
/// sites.
pub fn interpolate_ncolor(map: &DefectMap, grid: &mut Buffer2<f32>, colors: usize) -> usize {
    assert!(colors > 0, "colors must be > 0");
    assert!(
        map.width() * colors == grid.width() && map.height() == grid.height(),
        "Grid dimensions {}x{} don't match defect map {}x{} with {} colours",
        grid.width(),
        grid.height(),
        map.width(),
        map.height(),
        colors
    );

    let repairs = {
        let grid: &Buffer2<f32> = grid;
        collect_repairs(map, |x, y| repair_site(grid, map, colors, x, y))
    };

    for (x, y, values) in &repairs {
        let start = grid.index(x * colors, *y);
        grid.pixels_mut()[start..start + colors].copy_from_slice(values);
    }
    repairs.len()
}

fn repair_site(
    grid: &Buffer2<f32>,
    map: &DefectMap,
    colors: usize,
    x: usize,
    y: usize,
) -> Option<Vec<f32>> {
    let sample = |sx: usize, sy: usize, c: usize| grid[(sx * colors + c, sy)];
    let mut pairs = vec![PairSum::default(); colors];

    let mut add_pair = |k: f32, (xa, ya): (usize, usize), (xb, yb): (usize, usize)| {
        if map.get(xa, ya) || map.get(xb, yb) {
            return;
        }
        for (c, pair) in pairs.iter_mut().enumerate() {
            pair.add(k, sample(xa, ya, c), sample(xb, yb, c));
        }
    };

    add_pair(W_DIAGONAL, (x - 1, y - 1), (x + 1, y + 1));
    add_pair(W_DIAGONAL, (x + 1, y - 1), (x - 1, y + 1));
    add_pair(W_AXIS_1, (x - 1, y), (x + 1, y));
    add_pair(W_AXIS_1, (x, y - 1), (x, y + 1));

    if pairs[0].value().is_some() {
        return pairs.iter().map(PairSum::value).collect();
    }

    let mut sums = vec![0.0f32; colors];
    let mut count = 0;
    for yy in [y - 2, y, y + 2] {
        for xx in [x - 2, x, x + 2] {
            if map.get(xx, yy) {
                continue;
            }
            for (c, sum) in sums.iter_mut().enumerate() {
                *sum += sample(xx, yy, c);
            }
            count += 1;
        }
    }
    (count > 0).then(|| sums.iter().map(|s| s / count as f32).collect())
}
