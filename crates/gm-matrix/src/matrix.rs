use std::fmt;

use rand::Rng;

use crate::element::{Element, ElementKind};
use crate::error::{MatrixError, Result};
use crate::oracle;

/// A dense `rows x cols` matrix of a single element kind.
///
/// Data is contiguous and row-major: element `(i, j)` lives at offset
/// `i * cols + j`. Both dimensions are always positive and
/// `data.len() == rows * cols`.
#[derive(Debug, Clone, PartialEq)]
pub struct Matrix<T: Element> {
    rows: usize,
    cols: usize,
    data: Vec<T>,
}

impl<T: Element> Matrix<T> {
    /// Create a matrix from row-major data.
    ///
    /// # Errors
    /// `EmptyDimension` if either dimension is zero, `TooLarge` if
    /// `rows * cols` overflows `usize`, `DataLength` if
    /// `data.len() != rows * cols`.
    pub fn new(rows: usize, cols: usize, data: Vec<T>) -> Result<Self> {
        let len = check_shape(rows, cols)?;
        if data.len() != len {
            return Err(MatrixError::DataLength {
                expected: len,
                got: data.len(),
            });
        }
        Ok(Matrix { rows, cols, data })
    }

    /// Create a zero-filled matrix.
    pub fn zeros(rows: usize, cols: usize) -> Result<Self> {
        let len = check_shape(rows, cols)?;
        Ok(Matrix {
            rows,
            cols,
            data: vec![T::zero(); len],
        })
    }

    /// Create the `n x n` identity matrix.
    pub fn identity(n: usize) -> Result<Self> {
        let mut m = Self::zeros(n, n)?;
        for i in 0..n {
            m.set(i, i, T::one());
        }
        Ok(m)
    }

    /// Create a matrix whose elements are uniform samples from `[0, 1)`
    /// cast to `T`, drawn from the thread-local RNG.
    pub fn random(rows: usize, cols: usize) -> Result<Self> {
        Self::random_with(rows, cols, &mut rand::thread_rng())
    }

    /// Like [`Matrix::random`], drawing from the given RNG.
    pub fn random_with<R: Rng + ?Sized>(rows: usize, cols: usize, rng: &mut R) -> Result<Self> {
        let len = check_shape(rows, cols)?;
        let data = (0..len)
            .map(|_| T::from_unit(rng.gen::<f64>()))
            .collect();
        Ok(Matrix { rows, cols, data })
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    /// Returns the element kind of this matrix.
    pub fn kind(&self) -> ElementKind {
        T::KIND
    }

    /// Number of elements (`rows * cols`).
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Returns true if the matrix holds no elements, which a constructed
    /// matrix never does.
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Size of the element buffer in bytes.
    pub fn size_in_bytes(&self) -> usize {
        self.data.len() * T::KIND.size_in_bytes()
    }

    /// Returns the row-major element buffer.
    pub fn data(&self) -> &[T] {
        &self.data
    }

    pub fn into_data(self) -> Vec<T> {
        self.data
    }

    /// Returns the flat offset of `(i, j)`.
    ///
    /// # Panics
    /// Panics if `i >= rows` or `j >= cols`. An out-of-range column is never
    /// allowed to spill into the next row.
    #[inline]
    pub fn index(&self, i: usize, j: usize) -> usize {
        assert!(
            i < self.rows && j < self.cols,
            "index ({}, {}) out of bounds for {}x{} matrix",
            i,
            j,
            self.rows,
            self.cols
        );
        i * self.cols + j
    }

    /// Returns the element at `(i, j)`.
    ///
    /// # Panics
    /// Panics on an out-of-range index.
    #[inline]
    pub fn get(&self, i: usize, j: usize) -> T {
        self.data[self.index(i, j)]
    }

    /// Overwrites the element at `(i, j)` in place.
    ///
    /// # Panics
    /// Panics on an out-of-range index.
    #[inline]
    pub fn set(&mut self, i: usize, j: usize, v: T) {
        let idx = self.index(i, j);
        self.data[idx] = v;
    }

    /// Checked variant of [`Matrix::get`].
    pub fn try_get(&self, i: usize, j: usize) -> Result<T> {
        self.check_index(i, j)?;
        Ok(self.data[i * self.cols + j])
    }

    /// Checked variant of [`Matrix::set`].
    pub fn try_set(&mut self, i: usize, j: usize, v: T) -> Result<()> {
        self.check_index(i, j)?;
        self.data[i * self.cols + j] = v;
        Ok(())
    }

    /// Approximate equality under the default oracle tolerance.
    pub fn approx_eq(&self, other: &Matrix<T>) -> bool {
        oracle::approx_eq(self, other)
    }

    fn check_index(&self, i: usize, j: usize) -> Result<()> {
        if i >= self.rows || j >= self.cols {
            return Err(MatrixError::IndexOutOfRange {
                i,
                j,
                rows: self.rows,
                cols: self.cols,
            });
        }
        Ok(())
    }
}

impl<T: Element> fmt::Display for Matrix<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for row in self.data.chunks(self.cols) {
            write!(f, "[")?;
            for (j, v) in row.iter().enumerate() {
                if j > 0 {
                    write!(f, " ")?;
                }
                write!(f, "{}", v)?;
            }
            writeln!(f, "]")?;
        }
        Ok(())
    }
}

/// Validates a shape and returns its element count.
pub(crate) fn check_shape(rows: usize, cols: usize) -> Result<usize> {
    if rows == 0 || cols == 0 {
        return Err(MatrixError::EmptyDimension { rows, cols });
    }
    rows.checked_mul(cols).ok_or(MatrixError::TooLarge { rows, cols })
}
