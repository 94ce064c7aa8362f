//! Solved parameter set and solve-quality diagnostic

use std::fmt;

use serde::{Deserialize, Serialize};

/// Scientific notation with `precision` fraction digits and a signed
/// exponent of at least two digits, e.g. `2.96588e-08`
///
/// Non-finite values keep Rust's `NaN`/`inf` spelling.
pub fn format_scientific(value: f64, precision: usize) -> String {
    let text = format!("{value:.precision$e}");
    match text.split_once('e') {
        Some((mantissa, exponent)) => {
            let (sign, digits) = match exponent.strip_prefix('-') {
                Some(digits) => ('-', digits),
                None => ('+', exponent),
            };
            format!("{mantissa}e{sign}{digits:0>2}")
        }
        None => text,
    }
}

/// The five single-diode parameters at an operating condition
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ExtractionResult {
    /// Photogenerated current (A)
    pub i_ph: f64,

    /// Diode ideality factor
    pub a: f64,

    /// Reverse-saturation current at the operating condition (A)
    pub i_o: f64,

    /// Series resistance (Ω)
    pub r_s: f64,

    /// Shunt resistance (Ω)
    pub r_sh: f64,
}

impl ExtractionResult {
    pub fn format_i_ph(&self) -> String {
        format!("{:.5}", self.i_ph)
    }

    pub fn format_a(&self) -> String {
        format!("{:.5}", self.a)
    }

    pub fn format_i_o(&self) -> String {
        format_scientific(self.i_o, 5)
    }

    pub fn format_r_s(&self) -> String {
        format!("{:.5}", self.r_s)
    }

    pub fn format_r_sh(&self) -> String {
        format!("{:.5}", self.r_sh)
    }
}

impl fmt::Display for ExtractionResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "i_ph = {} A, a = {}, i_o = {} A, r_s = {} Ω, r_sh = {} Ω",
            self.format_i_ph(),
            self.format_a(),
            self.format_i_o(),
            self.format_r_s(),
            self.format_r_sh()
        )
    }
}

/// Residuals of the open-circuit, maximum-power and slope equations
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MismatchVector(pub [f64; 3]);

impl MismatchVector {
    /// Largest residual magnitude, NaN when any residual is NaN
    pub fn max_abs(&self) -> f64 {
        if self.0.iter().any(|r| r.is_nan()) {
            return f64::NAN;
        }
        self.0.iter().fold(0.0_f64, |acc, r| acc.max(r.abs()))
    }

    pub fn as_array(&self) -> [f64; 3] {
        self.0
    }
}

impl fmt::Display for MismatchVector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let [f1, f2, f3] = self.0.map(|r| format_scientific(r, 4));
        write!(f, "[{f1}, {f2}, {f3}]")
    }
}

/// Outcome of one successful extraction
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ExtractionReport {
    pub result: ExtractionResult,

    /// Residuals at the STC root
    pub mismatch: MismatchVector,

    /// Root-finder iterations used
    pub iterations: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_result_display() {
        let result = ExtractionResult {
            i_ph: 8.53,
            a: 1.2459189,
            i_o: 2.9658812e-8,
            r_s: 0.2173672,
            r_sh: 401.9292605,
        };

        assert_eq!(
            result.to_string(),
            "i_ph = 8.53000 A, a = 1.24592, i_o = 2.96588e-08 A, r_s = 0.21737 Ω, r_sh = 401.92926 Ω"
        );
    }

    #[test]
    fn test_mismatch_display() {
        let mismatch = MismatchVector([1.5e-13, -2.0e-14, 0.0]);
        assert_eq!(mismatch.to_string(), "[1.5000e-13, -2.0000e-14, 0.0000e+00]");
    }

    #[test]
    fn test_max_abs() {
        assert_eq!(MismatchVector([1e-9, -3e-9, 2e-9]).max_abs(), 3e-9);
    }

    #[test]
    fn test_nan_residual_is_never_small() {
        for mismatch in [
            MismatchVector([f64::NAN, 0.0, 0.0]),
            MismatchVector([0.0, f64::NAN, 1.0]),
            MismatchVector([0.0, 0.0, f64::NAN]),
        ] {
            assert!(mismatch.max_abs().is_nan());
            assert!(!(mismatch.max_abs() < 1e-6));
        }
        assert_eq!(MismatchVector([0.0, f64::INFINITY, 1.0]).max_abs(), f64::INFINITY);
    }

    #[test]
    fn test_scientific_exponent_has_two_digits() {
        assert_eq!(format_scientific(2.9658812e-8, 5), "2.96588e-08");
        assert_eq!(format_scientific(-2.488e-3, 5), "-2.48800e-03");
        assert_eq!(format_scientific(0.0, 4), "0.0000e+00");
        assert_eq!(format_scientific(7.14954e5, 2), "7.15e+05");
        assert_eq!(format_scientific(1.5e-120, 1), "1.5e-120");
        assert_eq!(format_scientific(f64::NAN, 3), "NaN");
        assert_eq!("2.96588e-08".parse::<f64>().unwrap(), 2.96588e-8);
    }
}
