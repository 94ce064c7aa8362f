//! Dense linear solves using nalgebra
//!
//! Newton-type iterations need `J * dx = -f` solved at every step. The
//! solve here reports a singular system as an error instead of handing back
//! infinities.

use nalgebra::{DMatrix, DVector};
use thiserror::Error;

/// Error when a linear system cannot be solved because the matrix is singular
#[derive(Error, Debug, Clone, PartialEq)]
#[error("singular matrix: determinant={determinant:.6e}")]
pub struct SingularMatrixError {
    /// The determinant value (zero, near-zero or non-finite)
    pub determinant: f64,
}

/// Solve `matrix * x = rhs` with an LU decomposition (partial pivoting)
///
/// Partial pivoting is invariant to column scaling, so badly scaled
/// unknowns (amps next to nano-amps) are fine as long as the matrix is
/// not actually singular.
///
/// # Arguments
/// * `matrix` - Square coefficient matrix
/// * `rhs` - Right-hand side, same number of rows as `matrix`
///
/// # Returns
/// * `Ok(DVector<f64>)` - The solution vector
/// * `Err(SingularMatrixError)` - If a pivot vanishes or the solution is not finite
pub fn solve_linear(
    matrix: &DMatrix<f64>,
    rhs: &DVector<f64>,
) -> Result<DVector<f64>, SingularMatrixError> {
    if !matrix.is_square() || matrix.nrows() != rhs.len() {
        return Err(SingularMatrixError {
            determinant: f64::NAN,
        });
    }

    matrix
        .clone()
        .lu()
        .solve(rhs)
        .filter(|x| x.iter().all(|v| v.is_finite()))
        .ok_or_else(|| SingularMatrixError {
            determinant: matrix.determinant(),
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_solve_identity() {
        let matrix = DMatrix::<f64>::identity(3, 3);
        let rhs = DVector::from_vec(vec![1.0, -2.0, 3.5]);

        let x = solve_linear(&matrix, &rhs).unwrap();

        assert_relative_eq!(x[0], 1.0, epsilon = 1e-12);
        assert_relative_eq!(x[1], -2.0, epsilon = 1e-12);
        assert_relative_eq!(x[2], 3.5, epsilon = 1e-12);
    }

    #[test]
    fn test_solve_roundtrip() {
        let matrix = DMatrix::from_row_slice(3, 3, &[4.0, 1.0, 0.5, 1.0, 3.0, -1.0, 0.0, 2.0, 5.0]);
        let expected = DVector::from_vec(vec![0.25, -1.5, 2.0]);
        let rhs = &matrix * &expected;

        let x = solve_linear(&matrix, &rhs).unwrap();

        for i in 0..3 {
            assert_relative_eq!(x[i], expected[i], epsilon = 1e-12);
        }
    }

    #[test]
    fn test_badly_scaled_columns() {
        // Second unknown lives around 1e-9, its column around 1e8
        let matrix = DMatrix::from_row_slice(2, 2, &[1.0, 2.0e8, 3.0, -1.0e8]);
        let expected = DVector::from_vec(vec![1.25, 6.0e-9]);
        let rhs = &matrix * &expected;

        let x = solve_linear(&matrix, &rhs).unwrap();

        assert_relative_eq!(x[0], expected[0], max_relative = 1e-12);
        assert_relative_eq!(x[1], expected[1], max_relative = 1e-12);
    }

    #[test]
    fn test_singular_matrix_error() {
        let matrix = DMatrix::from_row_slice(2, 2, &[1.0, 2.0, 2.0, 4.0]);
        let rhs = DVector::from_vec(vec![1.0, 1.0]);

        let err = solve_linear(&matrix, &rhs).unwrap_err();

        assert!(err.determinant.abs() < 1e-9);
    }

    #[test]
    fn test_shape_mismatch_is_rejected() {
        let matrix = DMatrix::<f64>::identity(2, 2);
        let rhs = DVector::from_vec(vec![1.0, 2.0, 3.0]);

        assert!(solve_linear(&matrix, &rhs).is_err());
    }
}
