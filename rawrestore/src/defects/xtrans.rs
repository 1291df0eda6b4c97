use common::Buffer2;

use super::{
    DefectMap, PairSum, W_AXIS_1, W_AXIS_2, W_DIAGONAL, W_KNIGHT, collect_repairs,
};
use crate::raw::{GREEN, XTransPattern};

/// Repairs flagged sites of an X-Trans grid in place. Returns the number of
/// repaired sites.
///
/// There is no fallback: a site without any usable pair keeps its value.
pub fn interpolate_xtrans(map: &DefectMap, grid: &mut Buffer2<f32>, pattern: &XTransPattern) -> usize {
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
        collect_repairs(map, |x, y| {
            Neighbourhood {
                grid,
                map,
                pattern,
                x: x as isize,
                y: y as isize,
            }
            .repair()
        })
    };

    for &(x, y, value) in &repairs {
        grid[(x, y)] = value;
    }
    repairs.len()
}

/// Relative accessors around one flagged site. Offsets are `(dx, dy)`.
struct Neighbourhood<'a> {
    grid: &'a Buffer2<f32>,
    map: &'a DefectMap,
    pattern: &'a XTransPattern,
    x: isize,
    y: isize,
}

impl Neighbourhood<'_> {
    #[inline]
    fn color(&self, dx: isize, dy: isize) -> u8 {
        self.pattern
            .color_at((self.y + dy) as usize, (self.x + dx) as usize)
    }

    #[inline]
    fn flagged(&self, dx: isize, dy: isize) -> bool {
        self.map.get((self.x + dx) as usize, (self.y + dy) as usize)
    }

    #[inline]
    fn sample(&self, dx: isize, dy: isize) -> f32 {
        self.grid[((self.x + dx) as usize, (self.y + dy) as usize)]
    }

    /// Adds the pair `a`/`b` when neither member is flagged.
    #[inline]
    fn add_pair(&self, pairs: &mut PairSum, k: f32, a: (isize, isize), b: (isize, isize)) {
        if self.flagged(a.0, a.1) || self.flagged(b.0, b.1) {
            return;
        }
        pairs.add(k, self.sample(a.0, a.1), self.sample(b.0, b.1));
    }

    fn repair(&self) -> Option<f32> {
        let mut pairs = PairSum::default();
        let color = self.color(0, 0);

        if color == GREEN {
            if self.color(-1, 0) == self.color(1, 0) {
                self.solitary_green(&mut pairs);
            } else {
                self.block_green(&mut pairs);
            }
        } else {
            self.red_blue(&mut pairs, color);
        }

        pairs.value()
    }

    /// Green site whose left and right neighbours share a colour.
    ///
    /// ```text
    /// . 1 . 2 .
    /// 3 5 . 6 4
    /// . . P . .
    /// 4 6 . 5 3
    /// . 2 . 1 .
    /// ```
    fn solitary_green(&self, pairs: &mut PairSum) {
        for dx in [-1, 1] {
            self.add_pair(pairs, W_DIAGONAL, (dx, -1), (-dx, 1));
        }
        for dx in [-1, 1] {
            self.add_pair(pairs, W_KNIGHT, (dx, -2), (-dx, 2));
        }
        for dx in [-2, 2] {
            self.add_pair(pairs, W_KNIGHT, (dx, -1), (-dx, 1));
        }
    }

    /// Green site inside a 2x2 green block.
    ///
    /// ```text
    /// 1 . . 3
    /// . P 2 .
    /// . 2 1 .
    /// 3 . . .
    /// ```
    fn block_green(&self, pairs: &mut PairSum) {
        let offset1 = if self.color(-1, -1) == self.color(1, 1) {
            1
        } else {
            -1
        };
        self.add_pair(pairs, W_DIAGONAL, (-offset1, -1), (offset1, 1));

        let offset_y = if self.color(0, -1) != GREEN { 1 } else { -1 };
        let offset_x = offset1 * offset_y;
        self.add_pair(pairs, W_AXIS_1, (offset_x, 0), (0, offset_y));

        self.add_pair(
            pairs,
            W_KNIGHT,
            (2 * offset_x, -offset_y),
            (-offset_x, 2 * offset_y),
        );
    }

    /// Red or blue site: knight-move pairs plus the same-colour site at
    /// distance 2 paired with a synthesized mirror value.
    ///
    /// ```text
    /// . 1 . . .    . . X . .
    /// . . . . 2    1 . . . 2
    /// X . P . V    . . P . .
    /// . . . . 1    . . . . .
    /// . 2 . . .    . 2 V 1 .
    /// ```
    fn red_blue(&self, pairs: &mut PairSum, color: u8) {
        for (dy, counter_dy) in [(-2, 3), (2, -3)] {
            for (dx, counter_dx) in [(-1, 3), (1, -3)] {
                if self.color(dx, dy) == color {
                    self.add_pair(pairs, W_KNIGHT, (dx, dy), (dx + counter_dx, dy + counter_dy));
                }
            }
        }

        let horizontal = [-2, 2].into_iter().find(|&dx| self.color(dx, 0) == color);
        let (dx, dy) = match horizontal {
            Some(dx) => (dx, 0),
            None => match [-2, 2].into_iter().find(|&dy| self.color(0, dy) == color) {
                Some(dy) => (0, dy),
                None => return,
            },
        };

        let mirror = if dy == 0 {
            0.5 * (self.sample(-dx, -1) + self.sample(-dx, 1))
        } else {
            0.5 * (self.sample(-1, -dy) + self.sample(1, -dy))
        };
        pairs.add(W_AXIS_2, mirror, self.sample(dx, dy));
    }
}
