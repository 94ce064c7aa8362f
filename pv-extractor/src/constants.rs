//! Physical constants, reference conditions and numeric bounds

/// Elementary charge in coulombs (rounded as in the reference tooling)
pub const ELEMENTARY_CHARGE: f64 = 1.6e-19;

/// Boltzmann constant in J/K (rounded as in the reference tooling)
pub const BOLTZMANN: f64 = 1.38e-23;

/// Offset between the Celsius and Kelvin scales
pub const KELVIN_OFFSET: f64 = 273.15;

/// Standard Test Conditions cell temperature in degrees Celsius
pub const STC_TEMPERATURE_C: f64 = 25.0;

/// Standard Test Conditions irradiance in W/m²
pub const STC_IRRADIANCE: f64 = 1000.0;

/// Flattest slope (A/V) accepted near short circuit; anything above is clamped here
pub const SHORT_CIRCUIT_SLOPE_CEILING: f64 = -1e-6;

/// Steepest slope (A/V) accepted near open circuit; positive or steeper slopes are clamped here
pub const OPEN_CIRCUIT_SLOPE_FLOOR: f64 = -1e6;

/// Default initial guess for the diode ideality factor
pub const DEFAULT_A_INIT: f64 = 1.3;

/// Default initial guess for the series resistance in ohms
pub const DEFAULT_R_S_INIT: f64 = 0.3;
