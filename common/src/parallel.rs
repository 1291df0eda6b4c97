//! Row-partitioned parallel helpers over [`Buffer2`].
//!
//! Writes are partitioned by rows so every element is owned by exactly one task.
//! Reductions use a fixed block height that does not depend on the thread count
//! and combine partial results in block order, so floating-point sums come out
//! identical on every machine.

use rayon::prelude::*;

use crate::Buffer2;

/// Multiplier for number of chunks relative to CPU threads.
const CHUNKS_PER_THREAD: usize = 2;

/// Row block height used by [`reduce_rows`].
pub const REDUCE_ROWS: usize = 16;

/// Rows per chunk that splits `height` into roughly `threads * 2` chunks.
/// Minimum of 1 row per chunk.
#[inline]
pub fn rows_per_chunk(height: usize) -> usize {
    let num_chunks = rayon::current_num_threads() * CHUNKS_PER_THREAD;
    (height / num_chunks).max(1)
}

/// Calls `f(y, row)` for every row of `buf` in parallel.
pub fn for_each_row_mut<T, F>(buf: &mut Buffer2<T>, f: F)
where
    T: Send,
    F: Fn(usize, &mut [T]) + Sync,
{
    let width = buf.width();
    if width == 0 || buf.height() == 0 {
        return;
    }
    let rows = rows_per_chunk(buf.height());

    buf.pixels_mut()
        .par_chunks_mut(width * rows)
        .enumerate()
        .for_each(|(chunk_idx, chunk)| {
            for (local_y, row) in chunk.chunks_exact_mut(width).enumerate() {
                f(chunk_idx * rows + local_y, row);
            }
        });
}

/// Folds every row of `buf` into an accumulator and combines the partial results.
///
/// Rows are grouped into blocks of [`REDUCE_ROWS`]. Each block is folded
/// sequentially starting from `identity()`, then block results are combined
/// left to right. The outcome is independent of scheduling.
pub fn reduce_rows<T, A, I, F, C>(buf: &Buffer2<T>, identity: I, fold: F, combine: C) -> A
where
    T: Sync,
    A: Send,
    I: Fn() -> A + Sync,
    F: Fn(A, usize, &[T]) -> A + Sync,
    C: Fn(A, A) -> A,
{
    let width = buf.width();
    if width == 0 || buf.height() == 0 {
        return identity();
    }

    let partials: Vec<A> = buf
        .pixels()
        .par_chunks(width * REDUCE_ROWS)
        .enumerate()
        .map(|(block_idx, block)| {
            block
                .chunks_exact(width)
                .enumerate()
                .fold(identity(), |acc, (local_y, row)| {
                    fold(acc, block_idx * REDUCE_ROWS + local_y, row)
                })
        })
        .collect();

    partials.into_iter().fold(identity(), combine)
}
