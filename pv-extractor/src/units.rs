//! Temperature handling with the `uom` crate
//!
//! Operating temperatures arrive in degrees Celsius; every formula in the
//! extractor works in Kelvin.

use uom::si::f64::ThermodynamicTemperature;
use uom::si::thermodynamic_temperature::{degree_celsius, kelvin};

/// Type alias for temperature with convenient methods
pub type Temperature = ThermodynamicTemperature;

/// Extension trait for temperature conversions
pub trait TemperatureExt {
    /// Create temperature from degrees Celsius
    fn from_celsius(celsius: f64) -> Self;

    /// Get temperature in degrees Celsius
    fn as_celsius(&self) -> f64;

    /// Get temperature in Kelvin
    fn as_kelvin(&self) -> f64;
}

impl TemperatureExt for Temperature {
    fn from_celsius(celsius: f64) -> Self {
        Temperature::new::<degree_celsius>(celsius)
    }

    fn as_celsius(&self) -> f64 {
        self.get::<degree_celsius>()
    }

    fn as_kelvin(&self) -> f64 {
        self.get::<kelvin>()
    }
}

/// Convert degrees Celsius to Kelvin
pub fn celsius_to_kelvin(celsius: f64) -> f64 {
    Temperature::from_celsius(celsius).as_kelvin()
}
