use rayon::prelude::*;

const WORD_BITS: usize = 64;

/// Bitmap of defective sensor sites.
///
/// Bits are packed into `u64` words and every row starts on a word boundary,
/// so rows can be written from different threads without sharing a word.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DefectMap {
    words: Vec<u64>,
    width: usize,
    height: usize,
    row_words: usize,
}

impl DefectMap {
    pub fn new(width: usize, height: usize) -> Self {
        let row_words = width.div_ceil(WORD_BITS);
        Self {
            words: vec![0; row_words * height],
            width,
            height,
            row_words,
        }
    }

    #[inline]
    pub fn width(&self) -> usize {
        self.width
    }

    #[inline]
    pub fn height(&self) -> usize {
        self.height
    }

    #[inline]
    fn word_index(&self, x: usize, y: usize) -> usize {
        debug_assert!(x < self.width && y < self.height);
        y * self.row_words + x / WORD_BITS
    }

    #[inline]
    pub fn get(&self, x: usize, y: usize) -> bool {
        self.words[self.word_index(x, y)] & (1 << (x % WORD_BITS)) != 0
    }

    #[inline]
    pub fn set(&mut self, x: usize, y: usize) {
        let i = self.word_index(x, y);
        self.words[i] |= 1 << (x % WORD_BITS);
    }

    #[inline]
    pub fn clear(&mut self, x: usize, y: usize) {
        let i = self.word_index(x, y);
        self.words[i] &= !(1 << (x % WORD_BITS));
    }

    /// Number of sites from `x` to the end of its word when that whole word is
    /// clear, otherwise 0.
    ///
    /// Scanners use it to jump over clean stretches of a row.
    #[inline]
    pub fn skip_if_zero(&self, x: usize, y: usize) -> usize {
        if self.words[self.word_index(x, y)] == 0 {
            WORD_BITS - x % WORD_BITS
        } else {
            0
        }
    }

    /// Flags every listed `(x, y)` position. Positions outside the map are
    /// ignored. Returns the number of positions applied.
    pub fn set_positions(&mut self, positions: &[(usize, usize)]) -> usize {
        let mut applied = 0;
        for &(x, y) in positions {
            if x < self.width && y < self.height {
                self.set(x, y);
                applied += 1;
            }
        }
        applied
    }

    /// Flags every site flagged in `other`.
    pub fn merge(&mut self, other: &DefectMap) {
        assert!(
            self.width == other.width && self.height == other.height,
            "DefectMap dimensions {}x{} don't match {}x{}",
            self.width,
            self.height,
            other.width,
            other.height
        );
        for (dst, src) in self.words.iter_mut().zip(&other.words) {
            *dst |= src;
        }
    }

    /// Number of flagged sites.
    pub fn count(&self) -> usize {
        self.words.iter().map(|w| w.count_ones() as usize).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.words.iter().all(|&w| w == 0)
    }

    /// Flagged positions in row-major order.
    pub fn iter(&self) -> impl Iterator<Item = (usize, usize)> + '_ {
        self.words
            .chunks_exact(self.row_words.max(1))
            .take(self.height)
            .enumerate()
            .flat_map(move |(y, row)| {
                row.iter().enumerate().flat_map(move |(wi, &word)| {
                    (0..WORD_BITS)
                        .filter(move |bit| word & (1 << bit) != 0)
                        .map(move |bit| (wi * WORD_BITS + bit, y))
                })
            })
    }

    /// Runs `f(y, row)` for every row in parallel and sums the returned counts.
    pub(crate) fn mark_rows<F>(&mut self, f: F) -> usize
    where
        F: Fn(usize, &mut RowBits<'_>) -> usize + Sync,
    {
        if self.row_words == 0 {
            return 0;
        }
        self.words
            .par_chunks_mut(self.row_words)
            .enumerate()
            .map(|(y, words)| f(y, &mut RowBits(words)))
            .sum()
    }
}

/// Mutable view of one row of a [`DefectMap`].
pub(crate) struct RowBits<'a>(&'a mut [u64]);

impl RowBits<'_> {
    #[inline]
    pub(crate) fn set(&mut self, x: usize) {
        self.0[x / WORD_BITS] |= 1 << (x % WORD_BITS);
    }
}
