use std::fmt::{self, Debug};
use std::str::FromStr;

use crate::accel::AcceleratorMultiplier;
use crate::cpu::{BlockedMultiplier, NaiveMultiplier};
use crate::element::Element;
use crate::error::{MatrixError, Result};
use crate::matrix::Matrix;

/// Trait for interchangeable matrix multiplication strategies.
///
/// Every implementation computes `r = m @ n` where `m` is `[rows x k]` and
/// `n` is `[k x cols]`, reads its inputs without mutating them and returns a
/// freshly allocated result. A dimension mismatch is reported before any
/// allocation or device work.
pub trait Multiplier: Debug + Send + Sync {
    /// Returns the name of this strategy (e.g., "naive", "blocked").
    fn name(&self) -> &str;

    /// Matrix multiplication: r = m @ n.
    fn multiply<T: Element>(&self, m: &Matrix<T>, n: &Matrix<T>) -> Result<Matrix<T>>;
}

/// Fails with `DimensionMismatch` unless `m.cols() == n.rows()`.
pub fn check_dims<T: Element>(m: &Matrix<T>, n: &Matrix<T>) -> Result<()> {
    if m.cols() != n.rows() {
        return Err(MatrixError::DimensionMismatch {
            m_rows: m.rows(),
            m_cols: m.cols(),
            n_rows: n.rows(),
            n_cols: n.cols(),
        });
    }
    Ok(())
}

/// Selects one of the built-in multipliers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Strategy {
    Naive,
    Blocked,
    /// Uses the process-wide accelerator handle.
    Accelerator,
}

impl Strategy {
    pub const ALL: [Strategy; 3] = [Strategy::Naive, Strategy::Blocked, Strategy::Accelerator];

    pub fn name(&self) -> &'static str {
        match self {
            Strategy::Naive => "naive",
            Strategy::Blocked => "blocked",
            Strategy::Accelerator => "accelerator",
        }
    }

    /// Multiplies `m @ n` with this strategy.
    pub fn multiply<T: Element>(self, m: &Matrix<T>, n: &Matrix<T>) -> Result<Matrix<T>> {
        match self {
            Strategy::Naive => NaiveMultiplier::new().multiply(m, n),
            Strategy::Blocked => BlockedMultiplier::new().multiply(m, n),
            Strategy::Accelerator => AcceleratorMultiplier::global().multiply(m, n),
        }
    }
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Strategy {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "naive" => Ok(Strategy::Naive),
            "blocked" | "block" => Ok(Strategy::Blocked),
            "accelerator" | "gpu" => Ok(Strategy::Accelerator),
            other => Err(format!("unknown strategy: {}", other)),
        }
    }
}

/// Multiplies `m @ n` with the given strategy.
pub fn multiply<T: Element>(strategy: Strategy, m: &Matrix<T>, n: &Matrix<T>) -> Result<Matrix<T>> {
    strategy.multiply(m, n)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_check_dims() {
        let a = Matrix::<f32>::zeros(2, 3).unwrap();
        let b = Matrix::<f32>::zeros(3, 4).unwrap();
        assert!(check_dims(&a, &b).is_ok());
        assert!(matches!(
            check_dims(&b, &a),
            Err(MatrixError::DimensionMismatch {
                m_rows: 3,
                m_cols: 4,
                n_rows: 2,
                n_cols: 3
            })
        ));
    }

    #[test]
    fn test_strategy_from_str() {
        assert_eq!("naive".parse::<Strategy>().unwrap(), Strategy::Naive);
        assert_eq!("Blocked".parse::<Strategy>().unwrap(), Strategy::Blocked);
        assert_eq!("gpu".parse::<Strategy>().unwrap(), Strategy::Accelerator);
        assert!("tiled".parse::<Strategy>().is_err());
    }

    #[test]
    fn test_strategy_display_roundtrip() {
        for s in Strategy::ALL {
            assert_eq!(s.to_string().parse::<Strategy>().unwrap(), s);
        }
    }

    #[test]
    fn test_cpu_strategies_basic() {
        let a = Matrix::new(2, 2, vec![1i32, 2, 3, 4]).unwrap();
        let b = Matrix::new(2, 2, vec![5i32, 6, 7, 8]).unwrap();
        for s in [Strategy::Naive, Strategy::Blocked] {
            let r = multiply(s, &a, &b).unwrap();
            assert_eq!(r.data(), &[19, 22, 43, 50]);
        }
    }

    #[test]
    fn test_every_strategy_rejects_mismatch() {
        let a = Matrix::<f32>::zeros(2, 3).unwrap();
        let b = Matrix::<f32>::zeros(2, 3).unwrap();
        for s in Strategy::ALL {
            assert!(matches!(
                s.multiply(&a, &b),
                Err(MatrixError::DimensionMismatch { .. })
            ));
        }
    }
}
