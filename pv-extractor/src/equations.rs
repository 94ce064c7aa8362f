//! The three STC conditions the diode unknowns must satisfy
//!
//! With the modified thermal voltage `vt = N_cell·a·k·T_stc/q` and
//! `v_d = V_mp + R_s·I_mp`:
//!
//! ```text
//! f1 = I_o·(exp(V_oc/vt) − 1) − (I_sc − V_oc/R_sh)           open circuit
//! f2 = I_mp − I_sc + I_o·(exp(v_d/vt) − 1) + v_d/R_sh          maximum power
//! f3 = R_s + 1/(dI/dV)_oc + vt/I_sc                            open-circuit slope
//! ```
//!
//! Every quantity except `(a, I_o, R_s)` is fixed at its datasheet value.
//! The root finder works on `(a, ln I_o, R_s)`.

use nalgebra::{DMatrix, DVector};
use pv_math::NonlinearSystem;
use serde::{Deserialize, Serialize};

use crate::constants::{BOLTZMANN, ELEMENTARY_CHARGE, STC_TEMPERATURE_C};
use crate::ratings::ModuleRatings;
use crate::result::MismatchVector;
use crate::units::celsius_to_kelvin;

/// The root-found unknowns
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DiodeUnknowns {
    /// Diode ideality factor
    pub a: f64,

    /// Reverse-saturation current at STC (A)
    pub i_o_stc: f64,

    /// Series resistance (Ω)
    pub r_s: f64,
}

impl DiodeUnknowns {
    pub fn new(a: f64, i_o_stc: f64, r_s: f64) -> Self {
        Self { a, i_o_stc, r_s }
    }

    /// Solver vector `[a, ln I_o,stc, R_s]`
    pub fn to_vector(&self) -> DVector<f64> {
        DVector::from_vec(vec![self.a, self.i_o_stc.ln(), self.r_s])
    }

    /// Read back a solver vector; missing entries become NaN
    pub fn from_vector(x: &DVector<f64>) -> Self {
        let at = |i: usize| x.get(i).copied().unwrap_or(f64::NAN);
        Self::new(at(0), at(1).exp(), at(2))
    }

    /// `a > 0`, `R_s >= 0` and `I_o,stc > 0`
    pub fn is_plausible(&self) -> bool {
        self.a > 0.0 && self.r_s >= 0.0 && self.i_o_stc > 0.0
    }
}

/// STC equation system closing over fixed ratings and shunt resistance
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EquationModel {
    ratings: ModuleRatings,
    r_sh: f64,
    t_stc_k: f64,
}

impl EquationModel {
    pub fn new(ratings: &ModuleRatings, r_sh: f64) -> Self {
        Self {
            ratings: *ratings,
            r_sh,
            t_stc_k: celsius_to_kelvin(STC_TEMPERATURE_C),
        }
    }

    pub fn ratings(&self) -> &ModuleRatings {
        &self.ratings
    }

    pub fn r_sh(&self) -> f64 {
        self.r_sh
    }

    /// `N_cell·a·k·T_stc/q` in volts
    pub fn modified_thermal_voltage(&self, a: f64) -> f64 {
        self.ratings.n_cell as f64 * a * BOLTZMANN * self.t_stc_k / ELEMENTARY_CHARGE
    }

    /// Reverse-saturation current that zeroes the open-circuit residual
    /// for ideality factor `a_init`; the starting point of the solve.
    pub fn initial_saturation_current(&self, a_init: f64) -> f64 {
        let r = &self.ratings;
        (r.i_sc_stc - r.v_oc_stc / self.r_sh) / (r.v_oc_stc / self.modified_thermal_voltage(a_init)).exp()
    }

    /// Diode voltage at the maximum power point for series resistance `r_s`
    fn mpp_diode_voltage(&self, r_s: f64) -> f64 {
        self.ratings.v_mp + r_s * self.ratings.i_mp
    }

    /// The three residuals at `unknowns`
    pub fn residuals_at(&self, unknowns: &DiodeUnknowns) -> MismatchVector {
        let r = &self.ratings;
        let DiodeUnknowns { a, i_o_stc, r_s } = *unknowns;
        let vt = self.modified_thermal_voltage(a);
        let v_d = self.mpp_diode_voltage(r_s);

        let open_circuit =
            i_o_stc * (r.v_oc_stc / vt).exp_m1() - (r.i_sc_stc - r.v_oc_stc / self.r_sh);
        let max_power = r.i_mp - r.i_sc_stc + i_o_stc * (v_d / vt).exp_m1() + v_d / self.r_sh;
        let slope = r_s + 1.0 / r.di_dv_oc + vt / r.i_sc_stc;

        MismatchVector([open_circuit, max_power, slope])
    }
}

impl NonlinearSystem for EquationModel {
    fn dimension(&self) -> usize {
        3
    }

    fn residuals(&self, x: &DVector<f64>) -> DVector<f64> {
        let MismatchVector(f) = self.residuals_at(&DiodeUnknowns::from_vector(x));
        DVector::from_column_slice(&f)
    }

    fn jacobian(&self, x: &DVector<f64>) -> DMatrix<f64> {
        let r = &self.ratings;
        let DiodeUnknowns { a, i_o_stc, r_s } = DiodeUnknowns::from_vector(x);
        let vt = self.modified_thermal_voltage(a);
        let v_d = self.mpp_diode_voltage(r_s);

        // d(vt)/da = vt/a, so d(exp(v/vt))/da = -exp(v/vt)·v/(vt·a);
        // d(I_o)/d(ln I_o) = I_o
        let e_oc = (r.v_oc_stc / vt).exp();
        let e_mp = (v_d / vt).exp();

        DMatrix::from_row_slice(
            3,
            3,
            &[
                -i_o_stc * e_oc * r.v_oc_stc / (vt * a),
                i_o_stc * (r.v_oc_stc / vt).exp_m1(),
                0.0,
                -i_o_stc * e_mp * v_d / (vt * a),
                i_o_stc * (v_d / vt).exp_m1(),
                i_o_stc * e_mp * r.i_mp / vt + r.i_mp / self.r_sh,
                vt / (a * r.i_sc_stc),
                0.0,
                1.0,
            ],
        )
    }
}
