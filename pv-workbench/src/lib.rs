//! pv-workbench - Tooling around the pv-extractor core
//!
//! - **case_file** - Persisted case files (inputs plus solution as text)
//! - **worker** - Background thread running one extraction at a time
//! - **sweep_range** - `start:stop:step` ranges for condition sweeps
//! - **cli_args** - Argument groups shared by the binaries

pub mod case_file;
pub mod cli_args;
pub mod sweep_range;
pub mod worker;

pub use case_file::{CaseFile, CaseFileError, CASE_FILE_TYPE};
pub use sweep_range::SweepRange;
pub use worker::{ExtractionJob, ExtractionOutcome, ExtractionWorker, WorkerError};
