//! Equivalence checks used to certify that multiply strategies agree.

use crate::element::Element;
use crate::matrix::Matrix;

/// Default absolute tolerance for [`approx_eq`].
///
/// Applied uniformly regardless of element kind or magnitude; use
/// [`approx_eq_within`] when comparing large-magnitude results.
pub const EPSILON: f64 = 1e-7;

/// Returns true if `m` and `n` have the same shape and every element pair,
/// widened to `f64`, differs by at most [`EPSILON`].
pub fn approx_eq<T: Element>(m: &Matrix<T>, n: &Matrix<T>) -> bool {
    approx_eq_within(m, n, EPSILON)
}

/// [`approx_eq`] with a caller-chosen tolerance.
pub fn approx_eq_within<T: Element>(m: &Matrix<T>, n: &Matrix<T>, tol: f64) -> bool {
    if m.rows() != n.rows() || m.cols() != n.cols() {
        return false;
    }
    m.data()
        .iter()
        .zip(n.data())
        .all(|(&a, &b)| (a.to_f64() - b.to_f64()).abs() <= tol)
}

/// Largest elementwise absolute difference, or `None` if the shapes differ.
pub fn max_abs_diff<T: Element>(m: &Matrix<T>, n: &Matrix<T>) -> Option<f64> {
    if m.rows() != n.rows() || m.cols() != n.cols() {
        return None;
    }
    Some(
        m.data()
            .iter()
            .zip(n.data())
            .map(|(&a, &b)| (a.to_f64() - b.to_f64()).abs())
            .fold(0.0, f64::max),
    )
}
