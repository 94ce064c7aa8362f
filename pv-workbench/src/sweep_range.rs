//! Operating-condition sweep ranges for the command line
//!
//! A clap-compatible `start:stop:step` argument. `stop` is inclusive and a
//! range with `start == stop` is a single point.

use std::fmt;
use std::str::FromStr;

/// Slack, in steps, for including a `stop` that float accumulation misses
const STOP_SLACK: f64 = 1e-9;

/// Most points a single range may hold
pub const MAX_POINTS: usize = 10_000;

/// Inclusive sweep over one operating-condition variable.
///
/// # Format
/// `"start:stop:step"`, e.g. `"-10:70:10"` for temperatures in °C or
/// `"1000:200:-200"` for a falling irradiance sweep.
///
/// # Validation
/// - every component must be a finite number
/// - `step` must be non-zero
/// - `step` must point from `start` towards `stop`
/// - at most [`MAX_POINTS`] values
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SweepRange {
    start: f64,
    stop: f64,
    step: f64,
}

impl SweepRange {
    /// Validated range
    pub fn new(start: f64, stop: f64, step: f64) -> Result<Self, String> {
        if !(start.is_finite() && stop.is_finite() && step.is_finite()) {
            return Err("Range values must be finite numbers".to_string());
        }

        if step == 0.0 {
            return Err("Step cannot be zero".to_string());
        }

        if step > 0.0 && start > stop {
            return Err(format!(
                "Invalid range: stop ({stop}) < start ({start}) but step ({step}) is not negative"
            ));
        }

        if step < 0.0 && start < stop {
            return Err(format!(
                "Invalid range: stop ({stop}) > start ({start}) but step ({step}) is not positive"
            ));
        }

        if step_count(start, stop, step) >= MAX_POINTS as f64 {
            return Err(format!(
                "Invalid range: {start}:{stop}:{step} has more than {MAX_POINTS} points"
            ));
        }

        Ok(Self { start, stop, step })
    }

    /// Range holding just `value`
    pub fn single(value: f64) -> Self {
        Self {
            start: value,
            stop: value,
            step: 1.0,
        }
    }

    pub fn start(&self) -> f64 {
        self.start
    }

    pub fn stop(&self) -> f64 {
        self.stop
    }

    pub fn step(&self) -> f64 {
        self.step
    }

    /// Number of points in the range, at most [`MAX_POINTS`]
    pub fn len(&self) -> usize {
        step_count(self.start, self.stop, self.step) as usize + 1
    }

    pub fn is_empty(&self) -> bool {
        false
    }

    /// All values from `start` to `stop` inclusive.
    ///
    /// Values are computed as `start + i * step` so long sweeps do not drift.
    pub fn values(&self) -> Vec<f64> {
        (0..self.len())
            .map(|i| self.start + i as f64 * self.step)
            .collect()
    }
}

/// Whole steps from `start` to `stop`
fn step_count(start: f64, stop: f64, step: f64) -> f64 {
    ((stop - start) / step + STOP_SLACK).floor()
}

impl FromStr for SweepRange {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parts: Vec<&str> = s.split(':').collect();
        if parts.len() != 3 {
            return Err("Range must be in format 'start:stop:step'".to_string());
        }

        let parse = |text: &str, what: &str| {
            text.trim()
                .parse::<f64>()
                .map_err(|_| format!("Invalid {what} value '{}'", text.trim()))
        };

        Self::new(
            parse(parts[0], "start")?,
            parse(parts[1], "stop")?,
            parse(parts[2], "step")?,
        )
    }
}

impl fmt::Display for SweepRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.start, self.stop, self.step)
    }
}
