//! pv-extractor - Single-diode equivalent-circuit parameters for PV modules
//!
//! Derives the photogenerated current, diode ideality factor, reverse
//! saturation current, series resistance and shunt resistance of a module
//! from its datasheet ratings, two measured I-V slopes and an operating
//! condition.
//!
//! # Modules
//!
//! - **slope** - Tangent slope estimation from two cursor positions on a plotted curve
//! - **corrector** - Temperature and irradiance correction of datasheet values
//! - **equations** - The STC equation system in the three unknowns
//! - **solver** - Root-finding at STC and derivation of working parameters
//! - **session** - Unsolved/Solved state around one extraction
//! - **ratings** - Input records and validation
//!
//! # Example
//!
//! ```
//! use pv_extractor::{ExtractionSession, ModuleRatings, OperatingCondition, SolverSeed};
//!
//! let mut session = ExtractionSession::new(ModuleRatings::default(), OperatingCondition::stc());
//! let result = session.extract(&SolverSeed::default()).unwrap();
//!
//! assert!(result.r_sh > 0.0);
//! assert!(session.mismatch().unwrap().max_abs() < 1e-6);
//! ```

pub mod constants;
pub mod corrector;
pub mod equations;
pub mod error;
pub mod ratings;
pub mod result;
pub mod session;
pub mod slope;
pub mod solver;
pub mod units;

pub use corrector::{correct, shunt_resistance, WorkingConditions};
pub use equations::{DiodeUnknowns, EquationModel};
pub use error::ExtractionError;
pub use ratings::{ExtractionInputs, ModuleRatings, OperatingCondition, RatingsError, SolverSeed};
pub use result::{format_scientific, ExtractionReport, ExtractionResult, MismatchVector};
pub use session::ExtractionSession;
pub use slope::{
    estimate_slope, Calibration, CurveRegion, PixelSpan, ScreenPoint, SlopeAdvisory, SlopeError,
    TangentSlope,
};
pub use solver::{PlausibilityPolicy, Solver, SolverSettings, StcSolution};

pub use pv_math::{FailureKind, PowellHybrid, RootFinder};
