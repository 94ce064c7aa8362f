//! Finite-difference Jacobian estimation
//!
//! Used as the default Jacobian of a [`NonlinearSystem`] and to cross-check
//! analytic Jacobians in tests.

use nalgebra::{DMatrix, DVector};

use crate::root_finding::NonlinearSystem;

/// Forward-difference Jacobian of `system` at `x`.
///
/// Column `j` is `(f(x + h_j e_j) - f(x)) / h_j` with the step
/// `h_j = sqrt(eps) * |x_j|` (or `sqrt(eps)` when `x_j` is zero), the same
/// relative step rule MINPACK uses. Relative steps matter here: unknowns
/// may sit twenty orders of magnitude apart.
///
/// # Arguments
/// * `system` - The system to differentiate
/// * `x` - Point of evaluation, `system.dimension()` entries
///
/// # Returns
/// Square Jacobian matrix with `d f_i / d x_j` at row `i`, column `j`
pub fn forward_difference_jacobian<S: NonlinearSystem + ?Sized>(
    system: &S,
    x: &DVector<f64>,
) -> DMatrix<f64> {
    let base = system.residuals(x);
    let sqrt_eps = f64::EPSILON.sqrt();
    let mut jacobian = DMatrix::zeros(base.len(), x.len());

    for col in 0..x.len() {
        let mut step = sqrt_eps * x[col].abs();
        if step == 0.0 {
            step = sqrt_eps;
        }

        let mut perturbed = x.clone();
        perturbed[col] += step;
        // Use the step that was actually representable
        let step = perturbed[col] - x[col];

        let shifted = system.residuals(&perturbed);
        jacobian.set_column(col, &((shifted - &base) / step));
    }

    jacobian
}
