use common::Buffer2;

use super::{DefectMap, PairSum, W_AXIS_2, W_CORNER, W_DIAGONAL, collect_repairs};
use crate::raw::CfaPattern;

/// Repairs flagged sites of a Bayer grid in place. Returns the number of
/// repaired sites.
///
/// Green sites use their diagonal neighbours, red and blue sites the corners
/// of the 5x5 window; all sites add the horizontal and vertical neighbours at
/// distance 2. When no pair is usable the site falls back to the plain mean of
/// the unflagged same-colour sites on the stride-2 3x3 grid around it, and is
/// left untouched if there are none.
pub fn interpolate_bayer(map: &DefectMap, grid: &mut Buffer2<f32>, pattern: CfaPattern) -> usize {
    assert!(
        map.width() == grid.width() && map.height() == grid.height(),
        "Grid dimensions {}x{} don't match defect map {}x{}",
        grid.width(),
        grid.height(),
        map.width(),
        map.height()
    );

    let repairs = {
        let grid: &Buffer2<f32> = grid;
        collect_repairs(map, |x, y| repair_site(grid, map, pattern, x, y))
    };

    for &(x, y, value) in &repairs {
        grid[(x, y)] = value;
    }
    repairs.len()
}

fn repair_site(
    grid: &Buffer2<f32>,
    map: &DefectMap,
    pattern: CfaPattern,
    x: usize,
    y: usize,
) -> Option<f32> {
    let mut pairs = PairSum::default();

    if pattern.is_green(y, x) {
        // (x+1, y-1)/(x-1, y+1) and (x-1, y-1)/(x+1, y+1)
        for (xa, xb) in [(x - 1, x + 1), (x + 1, x - 1)] {
            if map.get(xa, y - 1) || map.get(xb, y + 1) {
                continue;
            }
            pairs.add(W_DIAGONAL, grid[(xa, y - 1)], grid[(xb, y + 1)]);
        }
    } else {
        for (xa, xb) in [(x - 2, x + 2), (x + 2, x - 2)] {
            if map.get(xa, y - 2) || map.get(xb, y + 2) {
                continue;
            }
            pairs.add(W_CORNER, grid[(xa, y - 2)], grid[(xb, y + 2)]);
        }
    }

    if !(map.get(x - 2, y) || map.get(x + 2, y)) {
        pairs.add(W_AXIS_2, grid[(x - 2, y)], grid[(x + 2, y)]);
    }
    if !(map.get(x, y - 2) || map.get(x, y + 2)) {
        pairs.add(W_AXIS_2, grid[(x, y - 2)], grid[(x, y + 2)]);
    }

    pairs.value().or_else(|| {
        let mut sum = 0.0f32;
        let mut count = 0;
        for yy in [y - 2, y, y + 2] {
            for xx in [x - 2, x, x + 2] {
                if !map.get(xx, yy) {
                    sum += grid[(xx, yy)];
                    count += 1;
                }
            }
        }
        (count > 0).then(|| sum / count as f32)
    })
}
