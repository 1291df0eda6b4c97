use common::Buffer2;
use common::parallel::for_each_row_mut;

use crate::math::median9;

/// Replaces every interior sample with the median of its 3x3 neighbourhood.
/// The one-sample border is left as is.
pub fn median_filter_3x3_interior(buf: &mut Buffer2<f32>) {
    let width = buf.width();
    let height = buf.height();
    if width < 3 || height < 3 {
        return;
    }

    let src = buf.clone();
    for_each_row_mut(buf, |y, row| {
        if y == 0 || y == height - 1 {
            return;
        }
        let above = src.row(y - 1);
        let center = src.row(y);
        let below = src.row(y + 1);
        for x in 1..width - 1 {
            row[x] = median9([
                above[x - 1],
                above[x],
                above[x + 1],
                center[x - 1],
                center[x],
                center[x + 1],
                below[x - 1],
                below[x],
                below[x + 1],
            ]);
        }
    });
}
