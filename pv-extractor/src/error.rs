//! Extraction errors

use pv_math::FailureKind;
use thiserror::Error;

use crate::equations::DiodeUnknowns;
use crate::ratings::RatingsError;
use crate::result::MismatchVector;

/// Failure of an extraction run.
///
/// A missing solution is not an error; the session's queries return
/// `None` until a solve succeeds.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ExtractionError {
    #[error("invalid input: {0}")]
    InvalidInput(#[from] RatingsError),

    #[error(
        "solver did not converge ({reason}) after {iterations} iterations; \
         last iterate a={:.5}, i_o={:.5e}, r_s={:.5}, mismatch {residual}",
        .last_iterate.a,
        .last_iterate.i_o_stc,
        .last_iterate.r_s
    )]
    NonConvergence {
        reason: FailureKind,
        last_iterate: DiodeUnknowns,
        residual: MismatchVector,
        iterations: usize,
    },

    #[error("implausible root: a={a}, i_o={i_o_stc:e}, r_s={r_s}")]
    ImplausibleRoot { a: f64, i_o_stc: f64, r_s: f64 },
}
