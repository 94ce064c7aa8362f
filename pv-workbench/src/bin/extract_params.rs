//! Extract single-diode parameters for one module
//!
//! Inputs come from a case file (`--case`) or from flags whose defaults are
//! the 72-cell reference module. The extraction runs on the background
//! worker; the result can be written back as a case file with `--save`.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use log::info;
use pv_extractor::OperatingCondition;
use pv_workbench::cli_args::{inputs_from_args, ModuleArgs, SolverArgs};
use pv_workbench::{CaseFile, ExtractionJob, ExtractionWorker};

#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "Extract single-diode model parameters of a PV module"
)]
struct Args {
    /// Case file to read inputs from; module and seed flags are ignored when given
    #[arg(long)]
    case: Option<PathBuf>,

    #[command(flatten)]
    module: ModuleArgs,

    /// Cell temperature in degrees Celsius
    #[arg(long, default_value_t = 25.0, allow_negative_numbers = true)]
    temperature: f64,

    /// Irradiance in W/m²
    #[arg(long, default_value_t = 1000.0)]
    irradiance: f64,

    #[command(flatten)]
    solver: SolverArgs,

    /// Write inputs and solution to this case file (".json" appended if missing)
    #[arg(long)]
    save: Option<PathBuf>,
}

fn main() -> Result<()> {
    env_logger::init();

    let args = Args::parse();

    let inputs = match &args.case {
        Some(path) => {
            info!("Loading case file {}", path.display());
            CaseFile::load(path)
                .and_then(|case| case.inputs())
                .with_context(|| format!("Failed to read case file {}", path.display()))?
        }
        None => inputs_from_args(
            &args.module,
            OperatingCondition::new(args.temperature, args.irradiance),
            &args.solver,
        ),
    };

    let worker = ExtractionWorker::spawn();
    let outcome = worker.run(ExtractionJob::new(inputs, args.solver.to_settings()))?;
    worker.wait_for_completion();

    let report = outcome.report.context("Extraction failed")?;

    println!(
        "Operating condition: {} °C, {} W/m²",
        inputs.condition.temperature_c, inputs.condition.solar_irr
    );
    println!("  i_ph = {} A", report.result.format_i_ph());
    println!("  a    = {}", report.result.format_a());
    println!("  i_o  = {} A", report.result.format_i_o());
    println!("  r_s  = {} Ω", report.result.format_r_s());
    println!("  r_sh = {} Ω", report.result.format_r_sh());
    println!(
        "Mismatch: {} ({} iterations)",
        report.mismatch, report.iterations
    );

    if let Some(path) = &args.save {
        let written = CaseFile::new(&inputs, Some(&report.result))
            .save(path)
            .with_context(|| format!("Failed to save case file {}", path.display()))?;
        println!("Saved {}", written.display());
    }

    Ok(())
}
