//! Root-finding of the STC unknowns and derivation of the working parameters
//!
//! The nonlinear solve runs once, at STC. Moving the solution to another
//! operating condition only re-evaluates one exponential for the
//! saturation current, see [`derive_result`].

use std::fmt;
use std::str::FromStr;

use log::{debug, warn};
use pv_math::{HybridSettings, PowellHybrid, RootFinder};
use serde::{Deserialize, Serialize};

use crate::constants::{BOLTZMANN, ELEMENTARY_CHARGE};
use crate::corrector::WorkingConditions;
use crate::equations::{DiodeUnknowns, EquationModel};
use crate::error::ExtractionError;
use crate::ratings::SolverSeed;
use crate::result::{ExtractionResult, MismatchVector};

/// What to do with a converged root that is not physically plausible
/// (`a <= 0`, `R_s < 0` or `I_o,stc <= 0`)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum PlausibilityPolicy {
    /// Accept silently
    PassThrough,
    /// Accept and log a warning
    #[default]
    Warn,
    /// Fail with [`ExtractionError::ImplausibleRoot`]
    Reject,
}

impl PlausibilityPolicy {
    /// Apply the policy to a converged root
    pub fn check(&self, unknowns: &DiodeUnknowns) -> Result<(), ExtractionError> {
        if unknowns.is_plausible() {
            return Ok(());
        }

        match self {
            PlausibilityPolicy::PassThrough => Ok(()),
            PlausibilityPolicy::Warn => {
                warn!(
                    "Root is not physically plausible: a={}, i_o={:e}, r_s={}",
                    unknowns.a, unknowns.i_o_stc, unknowns.r_s
                );
                Ok(())
            }
            PlausibilityPolicy::Reject => Err(ExtractionError::ImplausibleRoot {
                a: unknowns.a,
                i_o_stc: unknowns.i_o_stc,
                r_s: unknowns.r_s,
            }),
        }
    }
}

impl fmt::Display for PlausibilityPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PlausibilityPolicy::PassThrough => write!(f, "pass-through"),
            PlausibilityPolicy::Warn => write!(f, "warn"),
            PlausibilityPolicy::Reject => write!(f, "reject"),
        }
    }
}

impl FromStr for PlausibilityPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "pass-through" | "passthrough" => Ok(PlausibilityPolicy::PassThrough),
            "warn" => Ok(PlausibilityPolicy::Warn),
            "reject" => Ok(PlausibilityPolicy::Reject),
            other => Err(format!(
                "Unknown plausibility policy '{other}', expected pass-through, warn or reject"
            )),
        }
    }
}

/// Numeric budget and plausibility policy of an extraction
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SolverSettings {
    /// Relative step size at which the root is accepted
    pub tolerance: f64,

    /// Root-finder iteration budget
    pub max_iterations: usize,

    pub plausibility: PlausibilityPolicy,
}

impl Default for SolverSettings {
    fn default() -> Self {
        let hybrid = HybridSettings::default();
        Self {
            tolerance: hybrid.tolerance,
            max_iterations: hybrid.max_iterations,
            plausibility: PlausibilityPolicy::default(),
        }
    }
}

impl From<&SolverSettings> for HybridSettings {
    fn from(settings: &SolverSettings) -> Self {
        HybridSettings {
            tolerance: settings.tolerance,
            max_iterations: settings.max_iterations,
        }
    }
}

/// Converged STC root with its diagnostics
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StcSolution {
    pub unknowns: DiodeUnknowns,
    pub mismatch: MismatchVector,
    pub iterations: usize,
}

/// Drives a [`RootFinder`] over an [`EquationModel`]
#[derive(Debug, Clone)]
pub struct Solver<R: RootFinder = PowellHybrid> {
    root_finder: R,
    plausibility: PlausibilityPolicy,
}

impl Solver<PowellHybrid> {
    pub fn new(settings: &SolverSettings) -> Self {
        Self::with_root_finder(PowellHybrid::new(settings.into()), settings.plausibility)
    }
}

impl Default for Solver<PowellHybrid> {
    fn default() -> Self {
        Self::new(&SolverSettings::default())
    }
}

impl<R: RootFinder> Solver<R> {
    /// Use any conforming root-finding algorithm
    pub fn with_root_finder(root_finder: R, plausibility: PlausibilityPolicy) -> Self {
        Self {
            root_finder,
            plausibility,
        }
    }

    pub fn plausibility(&self) -> PlausibilityPolicy {
        self.plausibility
    }

    /// Find `(a, I_o,stc, R_s)` zeroing all three residuals of `model`.
    ///
    /// The starting saturation current is derived from `seed.a_init` with
    /// [`EquationModel::initial_saturation_current`].
    ///
    /// # Arguments
    /// * `model` - STC equation system
    /// * `seed` - Initial ideality factor and series resistance
    ///
    /// # Returns
    /// * `Ok(StcSolution)` - Converged root passing the plausibility policy
    /// * `Err(ExtractionError::NonConvergence)` - Root finder gave up; carries the last iterate
    /// * `Err(ExtractionError::ImplausibleRoot)` - Only under [`PlausibilityPolicy::Reject`]
    pub fn solve_stc(
        &self,
        model: &EquationModel,
        seed: &SolverSeed,
    ) -> Result<StcSolution, ExtractionError> {
        let initial = DiodeUnknowns::new(
            seed.a_init,
            model.initial_saturation_current(seed.a_init),
            seed.r_s_init,
        );
        debug!(
            "Starting solve from a={}, i_o={:e}, r_s={}",
            initial.a, initial.i_o_stc, initial.r_s
        );

        let root = self
            .root_finder
            .find_root(model, initial.to_vector())
            .map_err(|err| {
                let last_iterate = DiodeUnknowns::from_vector(&err.iterate);
                ExtractionError::NonConvergence {
                    reason: err.kind,
                    residual: model.residuals_at(&last_iterate),
                    last_iterate,
                    iterations: err.iterations,
                }
            })?;

        let unknowns = DiodeUnknowns::from_vector(&root.x);
        self.plausibility.check(&unknowns)?;

        Ok(StcSolution {
            unknowns,
            mismatch: model.residuals_at(&unknowns),
            iterations: root.iterations,
        })
    }
}

/// Reverse-saturation current at the working temperature.
///
/// Uses the temperature-corrected short-circuit current at STC irradiance
/// together with the temperature-corrected open-circuit voltage.
pub fn working_saturation_current(
    model: &EquationModel,
    a: f64,
    working: &WorkingConditions,
) -> f64 {
    let vt = model.ratings().n_cell as f64 * a * BOLTZMANN * working.temperature_k / ELEMENTARY_CHARGE;
    (working.i_sc_stc_irradiance - working.v_oc / working.r_sh) / (working.v_oc / vt).exp()
}

/// Full parameter set at the operating condition behind `working`
pub fn derive_result(
    model: &EquationModel,
    unknowns: &DiodeUnknowns,
    working: &WorkingConditions,
) -> ExtractionResult {
    let i_o = working_saturation_current(model, unknowns.a, working);
    debug!(
        "Working conditions at {:.2} K: i_sc={}, v_oc={}, i_o={:e}",
        working.temperature_k, working.i_sc, working.v_oc, i_o
    );

    ExtractionResult {
        i_ph: working.i_sc,
        a: unknowns.a,
        i_o,
        r_s: unknowns.r_s,
        r_sh: working.r_sh,
    }
}
