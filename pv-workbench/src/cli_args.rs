//! Command-line arguments shared by the workbench binaries

use clap::{Parser, ValueEnum};
use pv_extractor::constants::{DEFAULT_A_INIT, DEFAULT_R_S_INIT};
use pv_extractor::{
    Calibration, ExtractionInputs, ModuleRatings, OperatingCondition, PlausibilityPolicy,
    ScreenPoint, SolverSeed, SolverSettings,
};
use thiserror::Error;

/// Errors assembling a plot calibration from flags
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CalibrationArgsError {
    #[error("no {axis} pixel span: pass --{flag} or place --cal-p1/--cal-p2 on grid lines")]
    MissingPixelSpan {
        axis: &'static str,
        flag: &'static str,
    },
}

/// Parse a screen point in format "x,y"
pub fn parse_point(s: &str) -> Result<ScreenPoint, String> {
    let parts: Vec<&str> = s.split(',').collect();
    if parts.len() != 2 {
        return Err("Point must be in format 'x,y'".to_string());
    }

    let x = parts[0]
        .trim()
        .parse::<f64>()
        .map_err(|_| "Invalid x value".to_string())?;
    let y = parts[1]
        .trim()
        .parse::<f64>()
        .map_err(|_| "Invalid y value".to_string())?;

    Ok(ScreenPoint::new(x, y))
}

/// Plausibility policy choices on the command line
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum PlausibilityArg {
    /// Accept implausible roots silently
    PassThrough,
    /// Accept implausible roots with a warning
    Warn,
    /// Fail on implausible roots
    Reject,
}

impl std::fmt::Display for PlausibilityArg {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.to_policy())
    }
}

impl PlausibilityArg {
    pub fn to_policy(self) -> PlausibilityPolicy {
        match self {
            PlausibilityArg::PassThrough => PlausibilityPolicy::PassThrough,
            PlausibilityArg::Warn => PlausibilityPolicy::Warn,
            PlausibilityArg::Reject => PlausibilityPolicy::Reject,
        }
    }
}

/// Datasheet ratings and measured slopes; defaults are the 72-cell reference module
#[derive(Parser, Debug, Clone)]
pub struct ModuleArgs {
    /// Open-circuit voltage at STC (V)
    #[arg(long, default_value_t = 44.9)]
    pub v_oc_stc: f64,

    /// Short-circuit current at STC (A)
    #[arg(long, default_value_t = 8.53)]
    pub i_sc_stc: f64,

    /// Maximum power point voltage (V)
    #[arg(long, default_value_t = 36.1)]
    pub v_mp: f64,

    /// Maximum power point current (A)
    #[arg(long, default_value_t = 8.04)]
    pub i_mp: f64,

    /// Temperature coefficient of I_sc (%/°C)
    #[arg(long, default_value_t = 0.046, allow_negative_numbers = true)]
    pub temp_coeff_i_perc: f64,

    /// Temperature coefficient of V_oc (%/°C)
    #[arg(long, default_value_t = -0.33, allow_negative_numbers = true)]
    pub temp_coeff_v_perc: f64,

    /// Number of series cells
    #[arg(long, default_value_t = 72)]
    pub n_cell: u32,

    /// Slope dI/dV near short circuit (A/V)
    #[arg(long, default_value_t = -2.488e-3, allow_negative_numbers = true)]
    pub di_dv_sc: f64,

    /// Slope dI/dV near open circuit (A/V)
    #[arg(long, default_value_t = -2.05, allow_negative_numbers = true)]
    pub di_dv_oc: f64,
}

impl ModuleArgs {
    pub fn to_ratings(&self) -> ModuleRatings {
        ModuleRatings {
            v_oc_stc: self.v_oc_stc,
            i_sc_stc: self.i_sc_stc,
            v_mp: self.v_mp,
            i_mp: self.i_mp,
            temp_coeff_i_perc: self.temp_coeff_i_perc,
            temp_coeff_v_perc: self.temp_coeff_v_perc,
            n_cell: self.n_cell,
            di_dv_sc: self.di_dv_sc,
            di_dv_oc: self.di_dv_oc,
        }
    }
}

/// Root-finder seed and budget
#[derive(Parser, Debug, Clone)]
pub struct SolverArgs {
    /// Initial diode ideality factor
    #[arg(long, default_value_t = DEFAULT_A_INIT, allow_negative_numbers = true)]
    pub a_init: f64,

    /// Initial series resistance (Ω)
    #[arg(long, default_value_t = DEFAULT_R_S_INIT, allow_negative_numbers = true)]
    pub r_s_init: f64,

    /// Relative step tolerance for convergence
    #[arg(long, default_value_t = SolverSettings::default().tolerance)]
    pub tolerance: f64,

    /// Root-finder iteration budget
    #[arg(long, default_value_t = SolverSettings::default().max_iterations)]
    pub max_iterations: usize,

    /// What to do with a physically implausible root
    #[arg(long, default_value_t = PlausibilityArg::Warn)]
    pub plausibility: PlausibilityArg,
}

impl SolverArgs {
    pub fn to_seed(&self) -> SolverSeed {
        SolverSeed::new(self.a_init, self.r_s_init)
    }

    pub fn to_settings(&self) -> SolverSettings {
        SolverSettings {
            tolerance: self.tolerance,
            max_iterations: self.max_iterations,
            plausibility: self.plausibility.to_policy(),
        }
    }
}

/// Axis calibration of a plotted I-V curve.
///
/// `delta_i` amps span `delta_y` vertical pixels and `delta_v` volts span
/// `delta_x` horizontal pixels. The pixel spans come from two calibration
/// cursors placed on grid lines `delta_i` and `delta_v` apart, or are given
/// directly; a direct span overrides the cursors for its axis.
#[derive(Parser, Debug, Clone)]
pub struct CalibrationArgs {
    /// Current span |ΔI| between the calibration grid lines (A)
    #[arg(long)]
    pub delta_i: f64,

    /// Voltage span |ΔV| between the calibration grid lines (V)
    #[arg(long)]
    pub delta_v: f64,

    /// First calibration cursor in pixels (format: "x,y")
    #[arg(long, value_parser = parse_point, requires = "cal_p2")]
    pub cal_p1: Option<ScreenPoint>,

    /// Second calibration cursor in pixels (format: "x,y")
    #[arg(long, value_parser = parse_point, requires = "cal_p1")]
    pub cal_p2: Option<ScreenPoint>,

    /// Vertical pixel span |Δy| worth delta_i
    #[arg(long)]
    pub delta_y: Option<f64>,

    /// Horizontal pixel span |Δx| worth delta_v
    #[arg(long)]
    pub delta_x: Option<f64>,
}

impl CalibrationArgs {
    pub fn to_calibration(&self) -> Result<Calibration, CalibrationArgsError> {
        let cursors = match (self.cal_p1, self.cal_p2) {
            (Some(p1), Some(p2)) => Some(Calibration::from_cursors(
                p1,
                p2,
                self.delta_i,
                self.delta_v,
            )),
            _ => None,
        };

        let delta_y = self
            .delta_y
            .or(cursors.map(|c| c.delta_y))
            .ok_or(CalibrationArgsError::MissingPixelSpan {
                axis: "vertical",
                flag: "delta-y",
            })?;
        let delta_x = self
            .delta_x
            .or(cursors.map(|c| c.delta_x))
            .ok_or(CalibrationArgsError::MissingPixelSpan {
                axis: "horizontal",
                flag: "delta-x",
            })?;

        Ok(Calibration::new(self.delta_i, delta_y, self.delta_v, delta_x))
    }
}

/// Assemble extraction inputs from flag groups
pub fn inputs_from_args(
    module: &ModuleArgs,
    condition: OperatingCondition,
    solver: &SolverArgs,
) -> ExtractionInputs {
    ExtractionInputs {
        ratings: module.to_ratings(),
        condition,
        seed: solver.to_seed(),
    }
}
