//! Tangent slope estimation from two points picked on an I-V curve image
//!
//! The user places two cursors on a plotted I-V curve and tells us how many
//! amps a vertical pixel span is worth and how many volts a horizontal pixel
//! span is worth. The slope of the segment between the cursors, converted to
//! physical units, approximates dI/dV in that region:
//!
//! ```text
//! slope = -(y2 - y1) * (|ΔI| / |Δy|) / ((x2 - x1) * (|ΔV| / |Δx|))
//! ```
//!
//! The leading minus sign flips screen coordinates (y grows downward) into
//! physical ones (current grows upward).
//!
//! Each curve region has its own sanity clamp. Near short circuit the branch
//! is shallow in current, so a slope that is positive or flatter than
//! `-1e-6 A/V` is replaced by `-1e-6`. Near open circuit the branch plunges,
//! so a positive slope or one steeper than `-1e6 A/V` is replaced by `-1e6`.
//! The two policies are deliberately asymmetric.

use std::fmt;

use log::warn;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::constants::{OPEN_CIRCUIT_SLOPE_FLOOR, SHORT_CIRCUIT_SLOPE_CEILING};
use crate::result::format_scientific;

/// Errors from slope estimation
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SlopeError {
    #[error("invalid calibration: {name} must be a non-zero number, got {value}")]
    InvalidCalibration { name: &'static str, value: f64 },

    #[error("segment between ({x1}, {y1}) and ({x2}, {y2}) does not define a finite slope")]
    DegenerateSegment { x1: f64, y1: f64, x2: f64, y2: f64 },
}

/// A cursor position in screen pixels (y grows downward)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScreenPoint {
    pub x: f64,
    pub y: f64,
}

impl ScreenPoint {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// Absolute horizontal and vertical distance between two cursors
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PixelSpan {
    pub dx: f64,
    pub dy: f64,
}

impl PixelSpan {
    pub fn between(p1: ScreenPoint, p2: ScreenPoint) -> Self {
        Self {
            dx: (p1.x - p2.x).abs(),
            dy: (p1.y - p2.y).abs(),
        }
    }
}

/// Pixel-to-physical calibration of the plotted axes.
///
/// `delta_i` amps correspond to `delta_y` vertical pixels and `delta_v` volts
/// to `delta_x` horizontal pixels. Only magnitudes matter; signs are dropped.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Calibration {
    /// |ΔI| in amps
    pub delta_i: f64,

    /// |Δy| in pixels
    pub delta_y: f64,

    /// |ΔV| in volts
    pub delta_v: f64,

    /// |Δx| in pixels
    pub delta_x: f64,
}

impl Calibration {
    pub fn new(delta_i: f64, delta_y: f64, delta_v: f64, delta_x: f64) -> Self {
        Self {
            delta_i,
            delta_y,
            delta_v,
            delta_x,
        }
    }

    /// Calibration whose pixel spans are read off two cursors that were
    /// placed on known grid lines `delta_i` amps and `delta_v` volts apart.
    pub fn from_cursors(p1: ScreenPoint, p2: ScreenPoint, delta_i: f64, delta_v: f64) -> Self {
        let span = PixelSpan::between(p1, p2);
        Self::new(delta_i, span.dy, delta_v, span.dx)
    }

    /// Amps per vertical pixel and volts per horizontal pixel
    fn scales(&self) -> Result<(f64, f64), SlopeError> {
        let delta_i = magnitude("delta_i", self.delta_i)?;
        let delta_y = magnitude("delta_y", self.delta_y)?;
        let delta_v = magnitude("delta_v", self.delta_v)?;
        let delta_x = magnitude("delta_x", self.delta_x)?;
        Ok((delta_i / delta_y, delta_v / delta_x))
    }
}

fn magnitude(name: &'static str, value: f64) -> Result<f64, SlopeError> {
    if value.is_finite() && value != 0.0 {
        Ok(value.abs())
    } else {
        Err(SlopeError::InvalidCalibration { name, value })
    }
}

/// Region of the I-V curve a slope was taken from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CurveRegion {
    /// Near V = 0, feeds the shunt resistance
    ShortCircuit,
    /// Near I = 0, feeds the series resistance equation
    OpenCircuit,
}

impl CurveRegion {
    /// Apply this region's sanity clamp to a raw slope
    fn clamp(self, raw: f64) -> (f64, Option<SlopeAdvisory>) {
        match self {
            CurveRegion::ShortCircuit if raw > SHORT_CIRCUIT_SLOPE_CEILING => (
                SHORT_CIRCUIT_SLOPE_CEILING,
                Some(SlopeAdvisory::TooFlatOrPositive),
            ),
            CurveRegion::OpenCircuit if raw > 0.0 || raw < OPEN_CIRCUIT_SLOPE_FLOOR => (
                OPEN_CIRCUIT_SLOPE_FLOOR,
                Some(SlopeAdvisory::TooSteepOrPositive),
            ),
            _ => (raw, None),
        }
    }

    /// Text form of a slope the way this region is displayed
    pub fn format_slope(self, slope: f64) -> String {
        match self {
            CurveRegion::ShortCircuit => format_scientific(slope, 5),
            CurveRegion::OpenCircuit => format!("{slope:.5}"),
        }
    }
}

impl fmt::Display for CurveRegion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CurveRegion::ShortCircuit => write!(f, "short-circuit"),
            CurveRegion::OpenCircuit => write!(f, "open-circuit"),
        }
    }
}

/// Non-fatal notice that a slope was replaced by its region's bound
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SlopeAdvisory {
    /// Short-circuit slope was positive or flatter than the ceiling
    TooFlatOrPositive,
    /// Open-circuit slope was positive or steeper than the floor
    TooSteepOrPositive,
}

impl fmt::Display for SlopeAdvisory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SlopeAdvisory::TooFlatOrPositive => write!(
                f,
                "The I-V curve seems too flat or the slope appears positive. \
                 The slope is assumed to be {SHORT_CIRCUIT_SLOPE_CEILING:e} A/V. \
                 Please retry if necessary."
            ),
            SlopeAdvisory::TooSteepOrPositive => write!(
                f,
                "The I-V curve seems too steep or the slope appears positive. \
                 The slope is assumed to be {OPEN_CIRCUIT_SLOPE_FLOOR:e} A/V. \
                 Please retry if necessary."
            ),
        }
    }
}

/// A physically signed dI/dV estimate (A/V)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TangentSlope {
    /// Region the slope belongs to
    pub region: CurveRegion,

    /// Slope after clamping; this is the value to feed the extractor
    pub value: f64,

    /// Slope as computed from the cursors, before clamping
    pub raw: f64,

    /// Set when `value` differs from `raw` because of the region's clamp
    pub advisory: Option<SlopeAdvisory>,
}

impl TangentSlope {
    pub fn was_clamped(&self) -> bool {
        self.advisory.is_some()
    }
}

impl fmt::Display for TangentSlope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.region.format_slope(self.value))
    }
}

/// Estimate dI/dV in `region` from two cursor positions.
///
/// # Arguments
/// * `region` - Which part of the curve the cursors sit on
/// * `p1`, `p2` - Cursor positions in screen pixels
/// * `calibration` - Axis calibration; every magnitude must be finite and non-zero
///
/// # Returns
/// * `Ok(TangentSlope)` - Possibly clamped slope, with an advisory when clamped
/// * `Err(SlopeError::InvalidCalibration)` - A calibration magnitude is zero or not a number
/// * `Err(SlopeError::DegenerateSegment)` - The cursors share an x coordinate or
///   are not finite
pub fn estimate_slope(
    region: CurveRegion,
    p1: ScreenPoint,
    p2: ScreenPoint,
    calibration: &Calibration,
) -> Result<TangentSlope, SlopeError> {
    let (amps_per_pixel, volts_per_pixel) = calibration.scales()?;

    let degenerate = SlopeError::DegenerateSegment {
        x1: p1.x,
        y1: p1.y,
        x2: p2.x,
        y2: p2.y,
    };

    let run = (p2.x - p1.x) * volts_per_pixel;
    if run == 0.0 {
        return Err(degenerate);
    }

    let raw = -(p2.y - p1.y) * amps_per_pixel / run;
    if !raw.is_finite() {
        return Err(degenerate);
    }

    let (value, advisory) = region.clamp(raw);
    if let Some(advisory) = advisory {
        warn!("{region} slope {raw:e} A/V replaced by {value:e} A/V: {advisory}");
    }

    Ok(TangentSlope {
        region,
        value,
        raw,
        advisory,
    })
}
