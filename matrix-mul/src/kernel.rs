//! The unit of work every rank performs.

use crate::Error;
use crate::matrix::Matrix;

/// Computes `a × b` with the textbook triple loop.
///
/// `a` is `m×k`, `b` must be `k×n`; the result is `m×n`. Fails with
/// [`Error::Overflow`] instead of wrapping when an entry leaves the `i64`
/// range, including on intermediate sums.
pub fn multiply(a: &Matrix, b: &Matrix) -> Result<Matrix, Error> {
    if a.cols() != b.rows() {
        return Err(Error::DimensionMismatch(a.rows(), a.cols(), b.rows(), b.cols()));
    }

    let mut product = Matrix::zeros(a.rows(), b.cols());
    for i in 0..a.rows() {
        for j in 0..b.cols() {
            let mut sum: i64 = 0;
            for k in 0..a.cols() {
                sum = a
                    .get(i, k)
                    .checked_mul(b.get(k, j))
                    .and_then(|term| sum.checked_add(term))
                    .ok_or(Error::Overflow { row: i, col: j })?;
            }
            product.set(i, j, sum);
        }
    }
    Ok(product)
}
