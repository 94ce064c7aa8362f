//! Multivariate nonlinear root finding
//!
//! Solves `f(x) = 0` for square systems `f: R^n -> R^n`. Callers describe
//! their equations through [`NonlinearSystem`] and pick any algorithm
//! implementing [`RootFinder`]; the crate ships [`PowellHybrid`].
//!
//! # Algorithm
//!
//! [`PowellHybrid`] is Powell's hybrid (dogleg) trust-region method, the
//! scheme behind MINPACK's `hybrj`. Each iteration:
//! 1. Builds the Jacobian (analytic when the system provides one,
//!    forward-difference otherwise) and raises the per-unknown scale to the
//!    largest Jacobian column norm seen so far
//! 2. Solves for the full Newton correction; if its scaled size is below
//!    `tolerance` relative to the scaled iterate, the iterate is returned
//! 3. Takes the Newton step when it fits inside the trust region, otherwise
//!    the dogleg between the scaled steepest-descent (Cauchy) point and the
//!    Newton point, cut at the region boundary
//! 4. Compares the actual against the predicted decrease of `|f|^2`; the
//!    step is accepted on any real decrease and the region grows or shrinks
//!    with the agreement between the two

use std::fmt;

use log::debug;
use nalgebra::{DMatrix, DVector};
use thiserror::Error;

use crate::jacobian::forward_difference_jacobian;
use crate::linear::solve_linear;

/// Default relative step tolerance
pub const DEFAULT_TOLERANCE: f64 = 1e-12;

/// Default iteration budget
pub const DEFAULT_MAX_ITERATIONS: usize = 200;

/// Initial trust radius relative to the scaled starting point
const INITIAL_RADIUS_FACTOR: f64 = 100.0;

/// Smallest actual/predicted ratio at which a step is accepted
const ACCEPT_RATIO: f64 = 1e-4;

/// Accepted steps improving `|f|^2` by less than this count as slow
const SLOW_DECREASE: f64 = 1e-3;

/// Consecutive slow steps before giving up
const MAX_SLOW_STEPS: usize = 10;

/// A square system of nonlinear equations `f(x) = 0`.
///
/// Implementations must be pure: evaluating the same `x` twice gives the
/// same residuals and changes nothing.
pub trait NonlinearSystem {
    /// Number of unknowns (and equations)
    fn dimension(&self) -> usize;

    /// Residual vector `f(x)`, `dimension()` entries
    fn residuals(&self, x: &DVector<f64>) -> DVector<f64>;

    /// Jacobian `df_i/dx_j` at `x`
    ///
    /// Defaults to a forward-difference estimate; override when the
    /// derivatives are known in closed form.
    fn jacobian(&self, x: &DVector<f64>) -> DMatrix<f64> {
        forward_difference_jacobian(self, x)
    }
}

/// A converged root
#[derive(Debug, Clone, PartialEq)]
pub struct Root {
    /// Solution vector
    pub x: DVector<f64>,

    /// Residuals at `x`
    pub residual: DVector<f64>,

    /// Number of iterations performed
    pub iterations: usize,
}

/// Why a root-finding run stopped without converging
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    /// Iteration budget exhausted
    IterationLimit,
    /// The trust region collapsed or the residual stopped decreasing
    Stalled,
    /// Residuals or Jacobian became NaN or infinite
    NonFinite,
    /// Initial guess or residual length does not match the system dimension
    DimensionMismatch,
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureKind::IterationLimit => write!(f, "iteration limit reached"),
            FailureKind::Stalled => write!(f, "no further progress"),
            FailureKind::NonFinite => write!(f, "non-finite residual"),
            FailureKind::DimensionMismatch => write!(f, "dimension mismatch"),
        }
    }
}

/// Failure of a root-finding run, carrying the last iterate and residual
#[derive(Error, Debug, Clone, PartialEq)]
#[error("root finding failed: {kind} after {iterations} iterations (|f| = {:.3e})", .residual.norm())]
pub struct RootFindError {
    /// Reason the run stopped
    pub kind: FailureKind,

    /// Last accepted iterate
    pub iterate: DVector<f64>,

    /// Residuals at `iterate`
    pub residual: DVector<f64>,

    /// Iterations performed before stopping
    pub iterations: usize,
}

/// A multivariate root-finding algorithm
pub trait RootFinder {
    /// Search for a root of `system` starting from `initial`
    fn find_root<S: NonlinearSystem + ?Sized>(
        &self,
        system: &S,
        initial: DVector<f64>,
    ) -> Result<Root, RootFindError>;
}

/// Tolerance and iteration budget for [`PowellHybrid`]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HybridSettings {
    /// Relative (scaled) Newton step size at which the iterate is accepted
    pub tolerance: f64,

    /// Maximum number of iterations
    pub max_iterations: usize,
}

impl Default for HybridSettings {
    fn default() -> Self {
        Self {
            tolerance: DEFAULT_TOLERANCE,
            max_iterations: DEFAULT_MAX_ITERATIONS,
        }
    }
}

/// Powell's hybrid dogleg trust-region method
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct PowellHybrid {
    pub settings: HybridSettings,
}

impl PowellHybrid {
    /// Create a solver with the given settings
    pub fn new(settings: HybridSettings) -> Self {
        Self { settings }
    }
}

impl RootFinder for PowellHybrid {
    fn find_root<S: NonlinearSystem + ?Sized>(
        &self,
        system: &S,
        initial: DVector<f64>,
    ) -> Result<Root, RootFindError> {
        let n = system.dimension();
        let mut x = initial;

        if x.len() != n {
            return Err(RootFindError {
                kind: FailureKind::DimensionMismatch,
                iterate: x,
                residual: DVector::zeros(0),
                iterations: 0,
            });
        }

        let mut residual = system.residuals(&x);

        if residual.len() != n {
            return Err(RootFindError {
                kind: FailureKind::DimensionMismatch,
                iterate: x,
                residual,
                iterations: 0,
            });
        }

        if !all_finite(&x) || !all_finite(&residual) {
            return Err(RootFindError {
                kind: FailureKind::NonFinite,
                iterate: x,
                residual,
                iterations: 0,
            });
        }

        let mut scale = DVector::<f64>::zeros(n);
        let mut radius = INITIAL_RADIUS_FACTOR;
        let mut successes = 0;
        let mut slow_steps = 0;

        for iteration in 1..=self.settings.max_iterations {
            let jacobian = system.jacobian(&x);

            if !jacobian.iter().all(|v| v.is_finite()) {
                return Err(RootFindError {
                    kind: FailureKind::NonFinite,
                    iterate: x,
                    residual,
                    iterations: iteration - 1,
                });
            }

            scale = scale.zip_map(&column_scale(&jacobian), f64::max);
            let residual_norm = residual.norm();
            let newton_step = solve_linear(&jacobian, &-&residual).ok();

            let converged = residual_norm == 0.0
                || newton_step
                    .as_ref()
                    .is_some_and(|step| step_converged(step, &x, &scale, self.settings.tolerance));
            if converged {
                debug!(
                    "converged after {} iterations, |f| = {:.3e}",
                    iteration - 1,
                    residual_norm
                );
                return Ok(Root {
                    x,
                    residual,
                    iterations: iteration - 1,
                });
            }

            let scaled_x_norm = x.component_mul(&scale).norm();
            if iteration == 1 && scaled_x_norm > 0.0 {
                radius = INITIAL_RADIUS_FACTOR * scaled_x_norm;
            }

            let Some(step) = dogleg(&jacobian, &residual, &scale, newton_step.as_ref(), radius)
            else {
                return Err(RootFindError {
                    kind: FailureKind::Stalled,
                    iterate: x,
                    residual,
                    iterations: iteration,
                });
            };

            let step_norm = step.component_mul(&scale).norm();
            if iteration == 1 {
                radius = radius.min(step_norm);
            }

            let trial = &x + &step;
            let trial_residual = system.residuals(&trial);

            let predicted = 1.0 - ((&residual + &jacobian * &step).norm() / residual_norm).powi(2);
            let actual = if all_finite(&trial_residual) {
                1.0 - (trial_residual.norm() / residual_norm).powi(2)
            } else {
                -1.0
            };
            let ratio = if predicted > 0.0 {
                actual / predicted
            } else {
                0.0
            };

            if ratio < 0.1 {
                successes = 0;
                radius *= 0.5;
            } else {
                successes += 1;
                if ratio >= 0.5 || successes > 1 {
                    radius = radius.max(2.0 * step_norm);
                }
                if (ratio - 1.0).abs() <= 0.1 {
                    radius = 2.0 * step_norm;
                }
            }

            if ratio >= ACCEPT_RATIO {
                debug!(
                    "iteration {iteration}: step {step_norm:.3e} accepted (ratio {ratio:.3}), |f| = {:.3e}",
                    trial_residual.norm()
                );
                x = trial;
                residual = trial_residual;

                if actual < SLOW_DECREASE {
                    slow_steps += 1;
                } else {
                    slow_steps = 0;
                }
                if slow_steps >= MAX_SLOW_STEPS {
                    return Err(RootFindError {
                        kind: FailureKind::Stalled,
                        iterate: x,
                        residual,
                        iterations: iteration,
                    });
                }
            } else {
                debug!("iteration {iteration}: step rejected, radius now {radius:.3e}");

                if radius.is_nan() || radius <= self.settings.tolerance * scaled_x_norm {
                    return Err(RootFindError {
                        kind: FailureKind::Stalled,
                        iterate: x,
                        residual,
                        iterations: iteration,
                    });
                }
            }
        }

        Err(RootFindError {
            kind: FailureKind::IterationLimit,
            iterate: x,
            residual,
            iterations: self.settings.max_iterations,
        })
    }
}

/// Dogleg step of scaled length at most `radius`
///
/// Returns the Newton step when it fits, otherwise a point on the path
/// from the origin through the Cauchy point to the Newton point, in the
/// unknowns scaled by `scale`. `None` when the gradient of `|f|^2` vanishes
/// and no Newton step exists.
fn dogleg(
    jacobian: &DMatrix<f64>,
    residual: &DVector<f64>,
    scale: &DVector<f64>,
    newton: Option<&DVector<f64>>,
    radius: f64,
) -> Option<DVector<f64>> {
    let newton_scaled = newton.map(|step| step.component_mul(scale));

    if let (Some(step), Some(scaled)) = (newton, &newton_scaled) {
        if scaled.norm() <= radius {
            return Some(step.clone());
        }
    }

    let gradient = (jacobian.transpose() * residual).component_div(scale);
    let gradient_norm = gradient.norm();
    if gradient_norm.is_nan() || gradient_norm == 0.0 {
        return None;
    }

    // Minimiser of the linear model along -gradient, in scaled units
    let curvature = (jacobian * gradient.component_div(scale)).norm();
    let alpha = if curvature > 0.0 {
        (gradient_norm / curvature).powi(2)
    } else {
        f64::INFINITY
    };

    let scaled_step = match newton_scaled {
        Some(newton_scaled) if alpha * gradient_norm < radius => {
            let cauchy = &gradient * -alpha;
            let leg = newton_scaled - &cauchy;
            let a = leg.norm_squared();
            let b = 2.0 * cauchy.dot(&leg);
            let c = cauchy.norm_squared() - radius * radius;
            let tau = (-b + (b * b - 4.0 * a * c).sqrt()) / (2.0 * a);
            cauchy + leg * tau
        }
        _ => &gradient * (-radius / gradient_norm),
    };

    Some(scaled_step.component_div(scale))
}

fn all_finite(v: &DVector<f64>) -> bool {
    v.iter().all(|x| x.is_finite())
}

/// Column norms of the Jacobian, 1.0 where a column vanishes
fn column_scale(jacobian: &DMatrix<f64>) -> DVector<f64> {
    DVector::from_iterator(
        jacobian.ncols(),
        jacobian.column_iter().map(|column| {
            let norm = column.norm();
            if norm > 0.0 {
                norm
            } else {
                1.0
            }
        }),
    )
}

fn step_converged(
    step: &DVector<f64>,
    x: &DVector<f64>,
    scale: &DVector<f64>,
    tolerance: f64,
) -> bool {
    step.component_mul(scale).norm() <= tolerance * x.component_mul(scale).norm()
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    struct CircleLine;

    impl NonlinearSystem for CircleLine {
        fn dimension(&self) -> usize {
            2
        }

        fn residuals(&self, x: &DVector<f64>) -> DVector<f64> {
            DVector::from_vec(vec![x[0] * x[0] + x[1] * x[1] - 4.0, x[0] - x[1]])
        }
    }

    struct Rosenbrock;

    impl NonlinearSystem for Rosenbrock {
        fn dimension(&self) -> usize {
            2
        }

        fn residuals(&self, x: &DVector<f64>) -> DVector<f64> {
            DVector::from_vec(vec![10.0 * (x[1] - x[0] * x[0]), 1.0 - x[0]])
        }

        fn jacobian(&self, x: &DVector<f64>) -> DMatrix<f64> {
            DMatrix::from_row_slice(2, 2, &[-20.0 * x[0], 10.0, -1.0, 0.0])
        }
    }

    /// Diode-like pair: a tiny saturation current multiplied by a huge exponential
    struct DiodeLike;

    impl NonlinearSystem for DiodeLike {
        fn dimension(&self) -> usize {
            2
        }

        fn residuals(&self, x: &DVector<f64>) -> DVector<f64> {
            DVector::from_vec(vec![x[1] * x[0].exp_m1() - 8.4, x[0] - 18.6])
        }
    }

    /// Plain Newton iteration diverges from any start further than ~1.39
    /// from the root
    struct ArcTangent;

    impl NonlinearSystem for ArcTangent {
        fn dimension(&self) -> usize {
            1
        }

        fn residuals(&self, x: &DVector<f64>) -> DVector<f64> {
            DVector::from_vec(vec![(x[0] - 1.0).atan()])
        }

        fn jacobian(&self, x: &DVector<f64>) -> DMatrix<f64> {
            DMatrix::from_element(1, 1, 1.0 / (1.0 + (x[0] - 1.0).powi(2)))
        }
    }

    struct SteepExponential;

    impl NonlinearSystem for SteepExponential {
        fn dimension(&self) -> usize {
            1
        }

        fn residuals(&self, x: &DVector<f64>) -> DVector<f64> {
            DVector::from_vec(vec![x[0].exp() - 2.0])
        }

        fn jacobian(&self, x: &DVector<f64>) -> DMatrix<f64> {
            DMatrix::from_element(1, 1, x[0].exp())
        }
    }

    struct NoRealRoot;

    impl NonlinearSystem for NoRealRoot {
        fn dimension(&self) -> usize {
            1
        }

        fn residuals(&self, x: &DVector<f64>) -> DVector<f64> {
            DVector::from_vec(vec![x[0] * x[0] + 1.0])
        }
    }

    struct Logarithm;

    impl NonlinearSystem for Logarithm {
        fn dimension(&self) -> usize {
            1
        }

        fn residuals(&self, x: &DVector<f64>) -> DVector<f64> {
            DVector::from_vec(vec![x[0].ln()])
        }
    }

    #[test]
    fn test_circle_line_intersection() {
        let root = PowellHybrid::default()
            .find_root(&CircleLine, DVector::from_vec(vec![1.0, 0.5]))
            .unwrap();

        assert_relative_eq!(root.x[0], 2.0_f64.sqrt(), epsilon = 1e-10);
        assert_relative_eq!(root.x[1], 2.0_f64.sqrt(), epsilon = 1e-10);
        assert!(root.residual.norm() < 1e-10);
    }

    #[test]
    fn test_rosenbrock_with_analytic_jacobian() {
        let root = PowellHybrid::default()
            .find_root(&Rosenbrock, DVector::from_vec(vec![-1.2, 1.0]))
            .unwrap();

        assert_relative_eq!(root.x[0], 1.0, epsilon = 1e-10);
        assert_relative_eq!(root.x[1], 1.0, epsilon = 1e-10);
    }

    #[test]
    fn test_badly_scaled_unknowns() {
        let root = PowellHybrid::default()
            .find_root(&DiodeLike, DVector::from_vec(vec![18.0, 1.0e-7]))
            .unwrap();

        let expected = 8.4 / 18.6_f64.exp_m1();
        assert_relative_eq!(root.x[0], 18.6, max_relative = 1e-10);
        assert_relative_eq!(root.x[1], expected, max_relative = 1e-10);
    }

    #[test]
    fn test_trust_region_contains_divergent_newton_steps() {
        let root = PowellHybrid::default()
            .find_root(&ArcTangent, DVector::from_vec(vec![4.0]))
            .unwrap();

        assert_relative_eq!(root.x[0], 1.0, epsilon = 1e-12);
        assert!(root.iterations < 20, "took {} iterations", root.iterations);
    }

    #[test]
    fn test_far_start_on_steep_exponential() {
        // A full Newton step from -5 lands near 290
        let root = PowellHybrid::default()
            .find_root(&SteepExponential, DVector::from_vec(vec![-5.0]))
            .unwrap();

        assert_relative_eq!(root.x[0], 2.0_f64.ln(), epsilon = 1e-12);
    }

    #[test]
    fn test_iteration_limit_reports_last_iterate() {
        let solver = PowellHybrid::new(HybridSettings {
            tolerance: 1e-12,
            max_iterations: 1,
        });

        let err = solver
            .find_root(&Rosenbrock, DVector::from_vec(vec![-1.2, 1.0]))
            .unwrap_err();

        assert_eq!(err.kind, FailureKind::IterationLimit);
        assert_eq!(err.iterations, 1);
        assert_eq!(err.iterate.len(), 2);
        assert_eq!(err.residual.len(), 2);
    }

    #[test]
    fn test_stalls_without_real_root() {
        let err = PowellHybrid::default()
            .find_root(&NoRealRoot, DVector::from_vec(vec![1.0]))
            .unwrap_err();

        assert_eq!(err.kind, FailureKind::Stalled);
        assert!(err.residual[0] >= 1.0);
    }

    #[test]
    fn test_non_finite_start() {
        let err = PowellHybrid::default()
            .find_root(&Logarithm, DVector::from_vec(vec![-1.0]))
            .unwrap_err();

        assert_eq!(err.kind, FailureKind::NonFinite);
        assert_eq!(err.iterations, 0);
    }

    #[test]
    fn test_dimension_mismatch() {
        let err = PowellHybrid::default()
            .find_root(&CircleLine, DVector::from_vec(vec![1.0, 0.5, 0.0]))
            .unwrap_err();

        assert_eq!(err.kind, FailureKind::DimensionMismatch);
    }

    #[test]
    fn test_error_message_mentions_reason() {
        let err = PowellHybrid::default()
            .find_root(&NoRealRoot, DVector::from_vec(vec![1.0]))
            .unwrap_err();

        assert!(err.to_string().contains("no further progress"));
    }
}
