//! pv-math - Numerical building blocks for photovoltaic model extraction
//!
//! This crate holds the general-purpose numerics the extractor leans on,
//! with no knowledge of diodes or modules:
//!
//! - **Root finding** - multivariate nonlinear root-finding behind the
//!   [`RootFinder`] trait, with Powell's hybrid dogleg trust-region method
//! - **Jacobian** - forward-difference Jacobian estimation
//! - **Linear** - checked dense linear solves
//!
//! # Example
//!
//! ```
//! use nalgebra::DVector;
//! use pv_math::{NonlinearSystem, PowellHybrid, RootFinder};
//!
//! struct Circle;
//!
//! impl NonlinearSystem for Circle {
//!     fn dimension(&self) -> usize {
//!         2
//!     }
//!
//!     fn residuals(&self, x: &DVector<f64>) -> DVector<f64> {
//!         DVector::from_vec(vec![x[0] * x[0] + x[1] * x[1] - 4.0, x[0] - x[1]])
//!     }
//! }
//!
//! let root = PowellHybrid::default()
//!     .find_root(&Circle, DVector::from_vec(vec![1.0, 0.5]))
//!     .unwrap();
//! assert!((root.x[0] - 2.0_f64.sqrt()).abs() < 1e-10);
//! ```

pub mod jacobian;
pub mod linear;
pub mod root_finding;

pub use jacobian::forward_difference_jacobian;
pub use linear::{solve_linear, SingularMatrixError};
pub use root_finding::{
    FailureKind, HybridSettings, NonlinearSystem, PowellHybrid, Root, RootFindError, RootFinder,
};
