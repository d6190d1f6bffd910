use crate::element::Element;
use crate::error::Result;
use crate::matrix::{check_shape, Matrix};
use crate::multiplier::{check_dims, Multiplier};

/// Reference triple-loop multiplier.
///
/// Implemented with straightforward loops optimized for correctness rather
/// than peak performance. Every other strategy is validated against it.
#[derive(Debug, Clone, Copy)]
pub struct NaiveMultiplier;

impl NaiveMultiplier {
    pub fn new() -> Self {
        NaiveMultiplier
    }
}

impl Default for NaiveMultiplier {
    fn default() -> Self {
        Self::new()
    }
}

impl Multiplier for NaiveMultiplier {
    fn name(&self) -> &str {
        "naive"
    }

    fn multiply<T: Element>(&self, m: &Matrix<T>, n: &Matrix<T>) -> Result<Matrix<T>> {
        check_dims(m, n)?;

        let (rows, k, cols) = (m.rows(), m.cols(), n.cols());
        let a = m.data();
        let b = n.data();

        let mut c = vec![T::zero(); check_shape(rows, cols)?];
        for i in 0..rows {
            for j in 0..cols {
                let mut sum = T::zero();
                for p in 0..k {
                    sum = T::mul_add(sum, a[i * k + p], b[p * cols + j]);
                }
                c[i * cols + j] = sum;
            }
        }
        Matrix::new(rows, cols, c)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::MatrixError;

    #[test]
    fn test_multiply_basic() {
        // [1,2;3,4] @ [5,6;7,8] = [19,22;43,50]
        let a = Matrix::new(2, 2, vec![1.0f32, 2.0, 3.0, 4.0]).unwrap();
        let b = Matrix::new(2, 2, vec![5.0f32, 6.0, 7.0, 8.0]).unwrap();
        let c = NaiveMultiplier::new().multiply(&a, &b).unwrap();
        assert_eq!(c.rows(), 2);
        assert_eq!(c.cols(), 2);
        assert_eq!(c.data(), &[19.0, 22.0, 43.0, 50.0]);
    }

    #[test]
    fn test_multiply_outer_product() {
        // [1;2] @ ones(1x10)
        let a = Matrix::new(2, 1, vec![1u32, 2]).unwrap();
        let b = Matrix::new(1, 10, vec![1u32; 10]).unwrap();
        let c = NaiveMultiplier::new().multiply(&a, &b).unwrap();
        assert_eq!(c.rows(), 2);
        assert_eq!(c.cols(), 10);
        assert_eq!(&c.data()[..10], &[1; 10]);
        assert_eq!(&c.data()[10..], &[2; 10]);
    }

    #[test]
    fn test_multiply_inner_product() {
        // [1,2] @ [3;4] = [11]
        let a = Matrix::new(1, 2, vec![1i32, 2]).unwrap();
        let b = Matrix::new(2, 1, vec![3i32, 4]).unwrap();
        let c = NaiveMultiplier::new().multiply(&a, &b).unwrap();
        assert_eq!(c.data(), &[11]);
    }

    #[test]
    fn test_multiply_u8_wraps() {
        // 16*16 + 16*16 = 512, which wraps to 0 in u8.
        let a = Matrix::new(1, 2, vec![16u8, 16]).unwrap();
        let b = Matrix::new(2, 1, vec![16u8, 16]).unwrap();
        let c = NaiveMultiplier::new().multiply(&a, &b).unwrap();
        assert_eq!(c.data(), &[0]);
    }

    #[test]
    fn test_multiply_dimension_mismatch() {
        let a = Matrix::new(1, 3, vec![1.0f32, 2.0, 3.0]).unwrap();
        let b = Matrix::new(2, 2, vec![1.0f32, 2.0, 3.0, 4.0]).unwrap();
        assert!(matches!(
            NaiveMultiplier::new().multiply(&a, &b),
            Err(MatrixError::DimensionMismatch { .. })
        ));
    }
}
