//! Input records for an extraction: datasheet ratings, operating point and solver seed
//!
//! Field names double as the serialization keys of saved case files, so
//! they must stay stable.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::constants::{DEFAULT_A_INIT, DEFAULT_R_S_INIT, STC_IRRADIANCE, STC_TEMPERATURE_C};

/// Errors found while validating extraction inputs
#[derive(Error, Debug, Clone, PartialEq)]
pub enum RatingsError {
    #[error("{name} must be a finite number, got {value}")]
    NonFinite { name: &'static str, value: f64 },

    #[error("n_cell must be a positive integer")]
    ZeroCellCount,

    #[error("{name} must be negative, got {value}")]
    NonNegativeSlope { name: &'static str, value: f64 },
}

fn check_finite(name: &'static str, value: f64) -> Result<(), RatingsError> {
    if value.is_finite() {
        Ok(())
    } else {
        Err(RatingsError::NonFinite { name, value })
    }
}

fn check_negative_slope(name: &'static str, value: f64) -> Result<(), RatingsError> {
    check_finite(name, value)?;
    if value < 0.0 {
        Ok(())
    } else {
        Err(RatingsError::NonNegativeSlope { name, value })
    }
}

/// Datasheet ratings of a PV module plus the two measured I-V slopes.
///
/// Temperature coefficients are kept in percent per degree, the way
/// datasheets print them; use [`ModuleRatings::temp_coeff_i`] and
/// [`ModuleRatings::temp_coeff_v`] for the fractional values.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ModuleRatings {
    /// Open-circuit voltage at STC (V)
    pub v_oc_stc: f64,

    /// Short-circuit current at STC (A)
    pub i_sc_stc: f64,

    /// Maximum power point voltage (V)
    pub v_mp: f64,

    /// Maximum power point current (A)
    pub i_mp: f64,

    /// Temperature coefficient of I_sc (%/°C)
    pub temp_coeff_i_perc: f64,

    /// Temperature coefficient of V_oc (%/°C)
    pub temp_coeff_v_perc: f64,

    /// Number of series cells per module
    pub n_cell: u32,

    /// Slope dI/dV near short circuit (A/V), negative
    pub di_dv_sc: f64,

    /// Slope dI/dV near open circuit (A/V), negative
    pub di_dv_oc: f64,
}

impl ModuleRatings {
    /// Temperature coefficient of I_sc as a fraction per degree
    pub fn temp_coeff_i(&self) -> f64 {
        self.temp_coeff_i_perc / 100.0
    }

    /// Temperature coefficient of V_oc as a fraction per degree
    pub fn temp_coeff_v(&self) -> f64 {
        self.temp_coeff_v_perc / 100.0
    }

    /// Check that every value is finite, the cell count is positive and both
    /// slopes are strictly negative.
    pub fn validate(&self) -> Result<(), RatingsError> {
        check_finite("v_oc_stc", self.v_oc_stc)?;
        check_finite("i_sc_stc", self.i_sc_stc)?;
        check_finite("v_mp", self.v_mp)?;
        check_finite("i_mp", self.i_mp)?;
        check_finite("temp_coeff_i_perc", self.temp_coeff_i_perc)?;
        check_finite("temp_coeff_v_perc", self.temp_coeff_v_perc)?;
        if self.n_cell == 0 {
            return Err(RatingsError::ZeroCellCount);
        }
        check_negative_slope("di_dv_sc", self.di_dv_sc)?;
        check_negative_slope("di_dv_oc", self.di_dv_oc)
    }
}

impl Default for ModuleRatings {
    /// A 72-cell, 300 W class module used as the reference dataset
    fn default() -> Self {
        Self {
            v_oc_stc: 44.9,
            i_sc_stc: 8.53,
            v_mp: 36.1,
            i_mp: 8.04,
            temp_coeff_i_perc: 0.046,
            temp_coeff_v_perc: -0.33,
            n_cell: 72,
            di_dv_sc: -2.488e-3,
            di_dv_oc: -2.05,
        }
    }
}

/// Cell temperature and irradiance the parameters are wanted at
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct OperatingCondition {
    /// Temperature in degrees Celsius
    pub temperature_c: f64,

    /// Irradiance in W/m²
    pub solar_irr: f64,
}

impl OperatingCondition {
    pub fn new(temperature_c: f64, solar_irr: f64) -> Self {
        Self {
            temperature_c,
            solar_irr,
        }
    }

    /// Standard Test Conditions: 25 °C, 1000 W/m²
    pub fn stc() -> Self {
        Self::new(STC_TEMPERATURE_C, STC_IRRADIANCE)
    }

    pub fn validate(&self) -> Result<(), RatingsError> {
        check_finite("temperature_c", self.temperature_c)?;
        check_finite("solar_irr", self.solar_irr)
    }
}

impl Default for OperatingCondition {
    fn default() -> Self {
        Self::stc()
    }
}

/// Initial guess handed to the root finder.
///
/// `a` is conventionally in (1, 2] and `r_s` non-negative, but neither is
/// enforced; a poor seed shows up as non-convergence or an implausible root.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SolverSeed {
    /// Initial diode ideality factor
    pub a_init: f64,

    /// Initial series resistance (Ω)
    pub r_s_init: f64,
}

impl SolverSeed {
    pub fn new(a_init: f64, r_s_init: f64) -> Self {
        Self { a_init, r_s_init }
    }

    pub fn validate(&self) -> Result<(), RatingsError> {
        check_finite("a_init", self.a_init)?;
        check_finite("r_s_init", self.r_s_init)
    }
}

impl Default for SolverSeed {
    fn default() -> Self {
        Self::new(DEFAULT_A_INIT, DEFAULT_R_S_INIT)
    }
}

/// Everything one extraction consumes
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct ExtractionInputs {
    #[serde(flatten)]
    pub ratings: ModuleRatings,

    #[serde(flatten)]
    pub condition: OperatingCondition,

    #[serde(flatten)]
    pub seed: SolverSeed,
}

impl ExtractionInputs {
    pub fn validate(&self) -> Result<(), RatingsError> {
        self.ratings.validate()?;
        self.condition.validate()?;
        self.seed.validate()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_reference_ratings_are_valid() {
        assert_eq!(ExtractionInputs::default().validate(), Ok(()));
    }

    #[test]
    fn test_percent_coefficients_converted() {
        let ratings = ModuleRatings::default();
        assert_relative_eq!(ratings.temp_coeff_i(), 0.00046, epsilon = 1e-15);
        assert_relative_eq!(ratings.temp_coeff_v(), -0.0033, epsilon = 1e-15);
    }

    #[test]
    fn test_zero_cell_count_rejected() {
        let ratings = ModuleRatings {
            n_cell: 0,
            ..ModuleRatings::default()
        };
        assert_eq!(ratings.validate(), Err(RatingsError::ZeroCellCount));
    }

    #[test]
    fn test_non_negative_slopes_rejected() {
        let flat = ModuleRatings {
            di_dv_sc: 0.0,
            ..ModuleRatings::default()
        };
        assert!(matches!(
            flat.validate(),
            Err(RatingsError::NonNegativeSlope { name: "di_dv_sc", .. })
        ));

        let rising = ModuleRatings {
            di_dv_oc: 0.5,
            ..ModuleRatings::default()
        };
        assert!(matches!(
            rising.validate(),
            Err(RatingsError::NonNegativeSlope { name: "di_dv_oc", .. })
        ));
    }

    #[test]
    fn test_nan_rejected() {
        let condition = OperatingCondition::new(f64::NAN, 1000.0);
        assert!(matches!(
            condition.validate(),
            Err(RatingsError::NonFinite { name: "temperature_c", .. })
        ));

        let seed = SolverSeed::new(1.3, f64::INFINITY);
        assert!(matches!(
            seed.validate(),
            Err(RatingsError::NonFinite { name: "r_s_init", .. })
        ));
    }

    #[test]
    fn test_stc_default() {
        let stc = OperatingCondition::default();
        assert_eq!(stc.temperature_c, 25.0);
        assert_eq!(stc.solar_irr, 1000.0);
    }
}
