use crate::element::Element;
use crate::error::Result;
use crate::matrix::{check_shape, Matrix};
use crate::multiplier::{check_dims, Multiplier};

/// Edge length of the square `(k, j)` tiles.
pub const BLOCK_SIZE: usize = 4;

/// Cache-blocked multiplier in jki order.
///
/// For each `(k, j)` pair the scalar `n[k, j]` is loaded once and broadcast
/// down column `j` of the result against column `k` of `m`. The `k` and `j`
/// loops are tiled into `BLOCK_SIZE x BLOCK_SIZE` blocks up to
/// `en = BLOCK_SIZE * floor(min(rows, k, cols) / BLOCK_SIZE)`, and three
/// remainder passes cover the tails:
///
/// ```text
///            j < en         j >= en
/// k < en   [ tiled      |  pass (a) ]
/// k >= en  [ pass (b)   |  pass (c) ]
/// ```
///
/// Every `(i, j, k)` triple is visited exactly once, and for a fixed output
/// cell `k` is visited in increasing order, so `f32` results round exactly
/// like [`NaiveMultiplier`](crate::cpu::NaiveMultiplier).
#[derive(Debug, Clone, Copy)]
pub struct BlockedMultiplier;

impl BlockedMultiplier {
    pub fn new() -> Self {
        BlockedMultiplier
    }
}

impl Default for BlockedMultiplier {
    fn default() -> Self {
        Self::new()
    }
}

impl Multiplier for BlockedMultiplier {
    fn name(&self) -> &str {
        "blocked"
    }

    fn multiply<T: Element>(&self, m: &Matrix<T>, n: &Matrix<T>) -> Result<Matrix<T>> {
        check_dims(m, n)?;

        let len = check_shape(m.rows(), n.cols())?;
        let mut out = Tile {
            a: m.data(),
            b: n.data(),
            r: vec![T::zero(); len],
            rows: m.rows(),
            k: m.cols(),
            cols: n.cols(),
        };

        let min = out.rows.min(out.k).min(out.cols);
        let en = BLOCK_SIZE * (min / BLOCK_SIZE);

        for kk in (0..en).step_by(BLOCK_SIZE) {
            for jj in (0..en).step_by(BLOCK_SIZE) {
                for k in kk..kk + BLOCK_SIZE {
                    for j in jj..jj + BLOCK_SIZE {
                        out.broadcast(k, j);
                    }
                }
            }
            // (a) columns past the last full tile, for this k tile.
            for k in kk..kk + BLOCK_SIZE {
                for j in en..out.cols {
                    out.broadcast(k, j);
                }
            }
        }

        // (b) rows of n past the last full tile, for the tiled columns.
        for jj in (0..en).step_by(BLOCK_SIZE) {
            for k in en..out.k {
                for j in jj..jj + BLOCK_SIZE {
                    out.broadcast(k, j);
                }
            }
        }

        // (c) both tails.
        for k in en..out.k {
            for j in en..out.cols {
                out.broadcast(k, j);
            }
        }

        Matrix::new(out.rows, out.cols, out.r)
    }
}

/// Working state of one blocked multiply.
struct Tile<'a, T: Element> {
    a: &'a [T],
    b: &'a [T],
    r: Vec<T>,
    rows: usize,
    k: usize,
    cols: usize,
}

impl<T: Element> Tile<'_, T> {
    /// r[i, j] += n[k, j] * m[i, k] for every row i.
    #[inline]
    fn broadcast(&mut self, k: usize, j: usize) {
        let rr = self.b[k * self.cols + j];
        for i in 0..self.rows {
            let idx = i * self.cols + j;
            self.r[idx] = T::mul_add(self.r[idx], self.a[i * self.k + k], rr);
        }
    }
}
