//! Closed-form correction of datasheet values to an operating condition
//!
//! Short-circuit current scales linearly with irradiance and with its
//! temperature coefficient; open-circuit voltage scales with its own
//! temperature coefficient only. Shunt resistance comes straight from the
//! short-circuit slope and does not depend on the operating point.

use crate::constants::{STC_IRRADIANCE, STC_TEMPERATURE_C};
use crate::ratings::{ModuleRatings, OperatingCondition};
use crate::units::celsius_to_kelvin;

/// Datasheet values moved to an operating condition
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WorkingConditions {
    /// Operating cell temperature (K)
    pub temperature_k: f64,

    /// Short-circuit current at the operating temperature and irradiance (A)
    pub i_sc: f64,

    /// Short-circuit current at the operating temperature and STC irradiance (A)
    pub i_sc_stc_irradiance: f64,

    /// Open-circuit voltage at the operating temperature (V)
    pub v_oc: f64,

    /// Shunt resistance (Ω)
    pub r_sh: f64,
}

/// Shunt resistance from the slope near short circuit.
///
/// Finite and positive for any finite negative slope.
pub fn shunt_resistance(di_dv_sc: f64) -> f64 {
    -1.0 / di_dv_sc
}

/// Temperature rise over STC in Kelvin
fn delta_t(condition: &OperatingCondition) -> f64 {
    celsius_to_kelvin(condition.temperature_c) - celsius_to_kelvin(STC_TEMPERATURE_C)
}

/// Move the datasheet short-circuit current and open-circuit voltage to
/// `condition`, and derive the shunt resistance.
///
/// # Arguments
/// * `ratings` - Datasheet ratings with measured slopes
/// * `condition` - Target temperature and irradiance
///
/// # Returns
/// * `WorkingConditions` for `condition`
pub fn correct(ratings: &ModuleRatings, condition: &OperatingCondition) -> WorkingConditions {
    let dt = delta_t(condition);

    let i_sc_stc_irradiance = ratings.i_sc_stc * (1.0 + ratings.temp_coeff_i() * dt);
    let i_sc = i_sc_stc_irradiance * condition.solar_irr / STC_IRRADIANCE;
    let v_oc = ratings.v_oc_stc * (1.0 + ratings.temp_coeff_v() * dt);

    WorkingConditions {
        temperature_k: celsius_to_kelvin(condition.temperature_c),
        i_sc,
        i_sc_stc_irradiance,
        v_oc,
        r_sh: shunt_resistance(ratings.di_dv_sc),
    }
}
