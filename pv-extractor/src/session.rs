//! Extraction session: inputs, solver and the Unsolved/Solved state
//!
//! A session is created Unsolved. [`ExtractionSession::extract`] moves it to
//! Solved on success and back to Unsolved on any failure; changing the
//! inputs or calling [`ExtractionSession::reset`] also returns it to
//! Unsolved. While Unsolved every query returns `None`.

use log::info;
use pv_math::{PowellHybrid, RootFinder};

use crate::corrector::correct;
use crate::equations::{DiodeUnknowns, EquationModel};
use crate::error::ExtractionError;
use crate::ratings::{ExtractionInputs, ModuleRatings, OperatingCondition, SolverSeed};
use crate::result::{ExtractionReport, ExtractionResult, MismatchVector};
use crate::solver::{derive_result, Solver, SolverSettings};

/// State kept after a successful solve
#[derive(Debug, Clone, Copy, PartialEq)]
struct Solved {
    model: EquationModel,
    root: DiodeUnknowns,
    result: ExtractionResult,
    iterations: usize,
}

/// One module's extraction and its outcome
#[derive(Debug, Clone)]
pub struct ExtractionSession<R: RootFinder = PowellHybrid> {
    ratings: ModuleRatings,
    condition: OperatingCondition,
    solver: Solver<R>,
    solved: Option<Solved>,
}

impl ExtractionSession<PowellHybrid> {
    /// Session with default solver settings
    pub fn new(ratings: ModuleRatings, condition: OperatingCondition) -> Self {
        Self::with_settings(ratings, condition, &SolverSettings::default())
    }

    pub fn with_settings(
        ratings: ModuleRatings,
        condition: OperatingCondition,
        settings: &SolverSettings,
    ) -> Self {
        Self::with_solver(ratings, condition, Solver::new(settings))
    }

    /// Session for `inputs`, returning the seed alongside for [`Self::extract`]
    pub fn from_inputs(
        inputs: &ExtractionInputs,
        settings: &SolverSettings,
    ) -> (Self, SolverSeed) {
        (
            Self::with_settings(inputs.ratings, inputs.condition, settings),
            inputs.seed,
        )
    }
}

impl<R: RootFinder> ExtractionSession<R> {
    pub fn with_solver(
        ratings: ModuleRatings,
        condition: OperatingCondition,
        solver: Solver<R>,
    ) -> Self {
        Self {
            ratings,
            condition,
            solver,
            solved: None,
        }
    }

    pub fn ratings(&self) -> &ModuleRatings {
        &self.ratings
    }

    pub fn condition(&self) -> &OperatingCondition {
        &self.condition
    }

    /// Replace the inputs; any previous solution is discarded
    pub fn set_inputs(&mut self, ratings: ModuleRatings, condition: OperatingCondition) {
        self.ratings = ratings;
        self.condition = condition;
        self.reset();
    }

    /// Discard the solution
    pub fn reset(&mut self) {
        self.solved = None;
    }

    pub fn is_solved(&self) -> bool {
        self.solved.is_some()
    }

    /// Run the full extraction from `seed`.
    ///
    /// The session is Unsolved while this runs and stays Unsolved if it
    /// fails; the error is returned unchanged.
    ///
    /// # Arguments
    /// * `seed` - Initial ideality factor and series resistance
    ///
    /// # Returns
    /// * `Ok(ExtractionResult)` - Parameters at the session's operating condition
    /// * `Err(ExtractionError)` - Invalid input, non-convergence or rejected root
    pub fn extract(&mut self, seed: &SolverSeed) -> Result<ExtractionResult, ExtractionError> {
        self.extract_report(seed).map(|report| report.result)
    }

    /// Like [`Self::extract`], also returning the mismatch and iteration count
    pub fn extract_report(
        &mut self,
        seed: &SolverSeed,
    ) -> Result<ExtractionReport, ExtractionError> {
        self.solved = None;

        self.ratings.validate()?;
        self.condition.validate()?;
        seed.validate()?;

        let working = correct(&self.ratings, &self.condition);
        let model = EquationModel::new(&self.ratings, working.r_sh);
        let solution = self.solver.solve_stc(&model, seed)?;
        let result = derive_result(&model, &solution.unknowns, &working);

        info!(
            "Extraction converged in {} iterations: {} (mismatch {})",
            solution.iterations, result, solution.mismatch
        );

        self.solved = Some(Solved {
            model,
            root: solution.unknowns,
            result,
            iterations: solution.iterations,
        });

        Ok(ExtractionReport {
            result,
            mismatch: solution.mismatch,
            iterations: solution.iterations,
        })
    }

    /// Parameters at the session's operating condition, `None` when Unsolved
    pub fn solution(&self) -> Option<ExtractionResult> {
        self.solved.map(|solved| solved.result)
    }

    /// Residuals at the STC root, `None` when Unsolved
    pub fn mismatch(&self) -> Option<MismatchVector> {
        self.solved
            .map(|solved| solved.model.residuals_at(&solved.root))
    }

    /// The STC-stage root `(a, I_o,stc, R_s)`, `None` when Unsolved
    pub fn stc_root(&self) -> Option<DiodeUnknowns> {
        self.solved.map(|solved| solved.root)
    }

    /// Root-finder iterations of the last solve, `None` when Unsolved
    pub fn iterations(&self) -> Option<usize> {
        self.solved.map(|solved| solved.iterations)
    }

    /// Parameters at another operating condition, reusing the STC root.
    ///
    /// Returns `None` when Unsolved or when `condition` is not finite.
    pub fn evaluate_at(&self, condition: &OperatingCondition) -> Option<ExtractionResult> {
        let solved = self.solved.as_ref()?;
        condition.validate().ok()?;

        let working = correct(&self.ratings, condition);
        Some(derive_result(&solved.model, &solved.root, &working))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn reference_session() -> ExtractionSession {
        ExtractionSession::new(ModuleRatings::default(), OperatingCondition::stc())
    }

    #[test]
    fn test_fresh_session_has_no_solution() {
        let session = reference_session();
        assert!(!session.is_solved());
        assert_eq!(session.solution(), None);
        assert_eq!(session.mismatch(), None);
        assert_eq!(session.stc_root(), None);
        assert_eq!(session.evaluate_at(&OperatingCondition::stc()), None);
    }

    #[test]
    fn test_extract_then_reset() {
        let mut session = reference_session();
        let result = session.extract(&SolverSeed::default()).unwrap();

        assert!(session.is_solved());
        assert_eq!(session.solution(), Some(result));
        assert!(session.mismatch().unwrap().max_abs() < 1e-6);

        session.reset();
        assert_eq!(session.solution(), None);
        assert_eq!(session.mismatch(), None);
    }

    #[test]
    fn test_report_matches_queries() {
        let mut session = reference_session();
        let report = session.extract_report(&SolverSeed::default()).unwrap();

        assert_eq!(session.solution(), Some(report.result));
        assert_eq!(session.mismatch(), Some(report.mismatch));
        assert_eq!(session.iterations(), Some(report.iterations));
    }

    #[test]
    fn test_new_inputs_discard_solution() {
        let mut session = reference_session();
        session.extract(&SolverSeed::default()).unwrap();

        session.set_inputs(ModuleRatings::default(), OperatingCondition::new(40.0, 800.0));
        assert!(!session.is_solved());
    }

    #[test]
    fn test_invalid_input_leaves_session_unsolved() {
        let mut session = reference_session();
        session.extract(&SolverSeed::default()).unwrap();

        let err = session
            .extract(&SolverSeed::new(f64::NAN, 0.3))
            .unwrap_err();

        assert!(matches!(err, ExtractionError::InvalidInput(_)));
        assert_eq!(session.solution(), None);
    }

    #[test]
    fn test_evaluate_at_own_condition_matches_solution() {
        let mut session =
            ExtractionSession::new(ModuleRatings::default(), OperatingCondition::new(45.0, 700.0));
        let result = session.extract(&SolverSeed::default()).unwrap();

        let again = session.evaluate_at(session.condition()).unwrap();
        assert_eq!(again, result);
    }

    #[test]
    fn test_evaluate_at_keeps_stc_root() {
        let mut session = reference_session();
        let stc = session.extract(&SolverSeed::default()).unwrap();

        let hot = session
            .evaluate_at(&OperatingCondition::new(60.0, 1000.0))
            .unwrap();

        assert_eq!(hot.a, stc.a);
        assert_eq!(hot.r_s, stc.r_s);
        assert_eq!(hot.r_sh, stc.r_sh);
        assert!(hot.i_o > stc.i_o);
        assert_relative_eq!(hot.i_ph, 8.53 * (1.0 + 0.00046 * 35.0), epsilon = 1e-9);

        assert_eq!(session.evaluate_at(&OperatingCondition::new(f64::NAN, 1.0)), None);
    }
}
