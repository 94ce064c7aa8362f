//! End-to-end extraction on the 72-cell reference module

use approx::assert_relative_eq;
use pv_extractor::{
    estimate_slope, Calibration, CurveRegion, EquationModel, ExtractionError, ExtractionSession,
    FailureKind, ModuleRatings, OperatingCondition, PlausibilityPolicy, ScreenPoint, SolverSeed,
    SolverSettings,
};

fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn solve(condition: OperatingCondition) -> pv_extractor::ExtractionResult {
    ExtractionSession::new(ModuleRatings::default(), condition)
        .extract(&SolverSeed::default())
        .unwrap()
}

#[test]
fn test_reference_dataset_converges() {
    init_logging();
    let mut session = ExtractionSession::new(ModuleRatings::default(), OperatingCondition::stc());
    let result = session.extract(&SolverSeed::default()).unwrap();

    for residual in session.mismatch().unwrap().as_array() {
        assert!(residual.abs() < 1e-6, "residual {residual:e}");
    }

    assert_relative_eq!(result.i_ph, 8.53, epsilon = 1e-12);
    assert_relative_eq!(result.a, 1.245919, epsilon = 1e-5);
    assert_relative_eq!(result.r_s, 0.217367, epsilon = 1e-5);
    assert_relative_eq!(result.r_sh, 401.929260, epsilon = 1e-5);
    assert_relative_eq!(result.i_o, 2.96588e-8, max_relative = 1e-4);
}

#[test]
fn test_mismatch_uses_stc_root_not_working_current() {
    init_logging();
    let ratings = ModuleRatings::default();
    let mut session = ExtractionSession::new(ratings, OperatingCondition::new(55.0, 600.0));
    session.extract(&SolverSeed::default()).unwrap();

    let root = session.stc_root().unwrap();
    let model = EquationModel::new(&ratings, session.solution().unwrap().r_sh);

    assert_eq!(session.mismatch(), Some(model.residuals_at(&root)));
    assert!(session.mismatch().unwrap().max_abs() < 1e-6);
    assert!(session.solution().unwrap().i_o > root.i_o_stc);
}

#[test]
fn test_extraction_is_idempotent() {
    let condition = OperatingCondition::new(35.0, 850.0);
    assert_eq!(solve(condition), solve(condition));

    let mut session = ExtractionSession::new(ModuleRatings::default(), condition);
    let first = session.extract(&SolverSeed::default()).unwrap();
    let second = session.extract(&SolverSeed::default()).unwrap();
    assert_eq!(first, second);
}

#[test]
fn test_irradiance_raises_photocurrent() {
    let mut previous = 0.0;
    for irradiance in [200.0, 500.0, 800.0, 1000.0] {
        let result = solve(OperatingCondition::new(25.0, irradiance));
        assert!(result.i_ph > previous);
        previous = result.i_ph;
    }
}

#[test]
fn test_temperature_raises_saturation_current() {
    let cold = solve(OperatingCondition::new(0.0, 1000.0));
    let hot = solve(OperatingCondition::new(70.0, 1000.0));

    assert!(hot.i_o > cold.i_o);
    assert_eq!(hot.a, cold.a);
}

#[test]
fn test_not_solved_is_not_an_error() {
    let mut session = ExtractionSession::new(ModuleRatings::default(), OperatingCondition::stc());
    assert_eq!(session.solution(), None);
    assert_eq!(session.mismatch(), None);

    session.extract(&SolverSeed::default()).unwrap();
    session.reset();
    assert_eq!(session.solution(), None);
    assert_eq!(session.mismatch(), None);
}

#[test]
fn test_failed_solve_leaves_session_unsolved() {
    init_logging();
    let settings = SolverSettings {
        max_iterations: 2,
        ..SolverSettings::default()
    };
    let mut session = ExtractionSession::with_settings(
        ModuleRatings::default(),
        OperatingCondition::stc(),
        &settings,
    );

    let err = session.extract(&SolverSeed::default()).unwrap_err();
    assert!(matches!(
        err,
        ExtractionError::NonConvergence {
            reason: FailureKind::IterationLimit,
            iterations: 2,
            ..
        }
    ));
    assert!(!session.is_solved());
    assert_eq!(session.mismatch(), None);
}

#[test]
fn test_zero_cell_count_is_invalid_input() {
    let ratings = ModuleRatings {
        n_cell: 0,
        ..ModuleRatings::default()
    };
    let err = ExtractionSession::new(ratings, OperatingCondition::stc())
        .extract(&SolverSeed::default())
        .unwrap_err();

    assert!(matches!(err, ExtractionError::InvalidInput(_)));
}

#[test]
fn test_reject_policy_accepts_plausible_reference_root() {
    let settings = SolverSettings {
        plausibility: PlausibilityPolicy::Reject,
        ..SolverSettings::default()
    };
    let mut session = ExtractionSession::with_settings(
        ModuleRatings::default(),
        OperatingCondition::stc(),
        &settings,
    );

    assert!(session.extract(&SolverSeed::default()).is_ok());
}

#[test]
fn test_measured_slope_feeds_extraction() {
    // Open-circuit cursors 10 px apart horizontally and 100 px vertically on a
    // plot with 1 A per 100 px and 5 V per 100 px: slope = -1 A / 0.5 V
    let slope = estimate_slope(
        CurveRegion::OpenCircuit,
        ScreenPoint::new(500.0, 300.0),
        ScreenPoint::new(510.0, 400.0),
        &Calibration::new(1.0, 100.0, 5.0, 100.0),
    )
    .unwrap();
    assert_relative_eq!(slope.value, -2.0, epsilon = 1e-12);
    assert!(!slope.was_clamped());

    let ratings = ModuleRatings {
        di_dv_oc: slope.value,
        ..ModuleRatings::default()
    };
    let mut session = ExtractionSession::new(ratings, OperatingCondition::stc());
    let result = session.extract(&SolverSeed::default()).unwrap();

    assert!(session.mismatch().unwrap().max_abs() < 1e-6);
    assert_relative_eq!(result.a, 1.220358, epsilon = 1e-5);
    assert_relative_eq!(result.r_s, 0.235111, epsilon = 1e-5);
}

#[test]
fn test_conventional_seed_range_reaches_reference_root() {
    init_logging();
    for a_init in [1.1, 1.2, 1.3, 1.4, 1.5, 1.6, 1.7, 1.8, 1.9, 2.0] {
        for r_s_init in [0.0, 0.25, 0.5, 0.75, 1.0] {
            let mut session =
                ExtractionSession::new(ModuleRatings::default(), OperatingCondition::stc());
            let result = session
                .extract(&SolverSeed::new(a_init, r_s_init))
                .unwrap_or_else(|err| panic!("seed ({a_init}, {r_s_init}): {err}"));

            let max_abs = session.mismatch().unwrap().max_abs();
            assert!(max_abs < 1e-6, "seed ({a_init}, {r_s_init}): mismatch {max_abs:e}");
            assert_relative_eq!(result.a, 1.245919, epsilon = 1e-5);
            assert_relative_eq!(result.r_s, 0.217367, epsilon = 1e-5);
        }
    }
}

/// 60-cell module with a stiffer open-circuit slope than the reference
fn sixty_cell_module() -> ModuleRatings {
    ModuleRatings {
        v_oc_stc: 37.8,
        i_sc_stc: 8.9,
        v_mp: 30.5,
        i_mp: 8.2,
        temp_coeff_i_perc: 0.05,
        temp_coeff_v_perc: -0.30,
        n_cell: 60,
        di_dv_sc: -1e-3,
        di_dv_oc: -3.0,
    }
}

#[test]
fn test_sixty_cell_module_away_from_stc() {
    init_logging();
    let mut session =
        ExtractionSession::new(sixty_cell_module(), OperatingCondition::new(50.0, 700.0));
    let result = session.extract(&SolverSeed::default()).unwrap();

    assert!(session.mismatch().unwrap().max_abs() < 1e-6);

    let root = session.stc_root().unwrap();
    assert_relative_eq!(root.a, 1.780876, epsilon = 1e-5);
    assert_relative_eq!(root.i_o_stc, 9.39946e-6, max_relative = 1e-4);
    assert_relative_eq!(root.r_s, 0.024596, epsilon = 1e-5);

    // 8.9 A · (1 + 0.0005 · 25) · 0.7
    assert_relative_eq!(result.i_ph, 6.307875, epsilon = 1e-9);
    assert_relative_eq!(result.r_sh, 1000.0, epsilon = 1e-9);
    assert_relative_eq!(result.i_o, 7.14954e-5, max_relative = 1e-4);
}

#[test]
fn test_sixty_cell_module_seed_range() {
    for a_init in [1.1, 1.3, 1.5, 1.7, 1.9, 2.0] {
        for r_s_init in [0.0, 0.25, 0.5, 0.75] {
            let mut session =
                ExtractionSession::new(sixty_cell_module(), OperatingCondition::stc());
            let result = session
                .extract(&SolverSeed::new(a_init, r_s_init))
                .unwrap_or_else(|err| panic!("seed ({a_init}, {r_s_init}): {err}"));

            assert!(session.mismatch().unwrap().max_abs() < 1e-6);
            assert_relative_eq!(result.a, 1.780876, epsilon = 1e-5);
        }
    }
}
