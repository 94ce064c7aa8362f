//! Tabulate working-condition parameters over temperature and irradiance
//!
//! The nonlinear solve runs once at STC; every table row re-derives the
//! working parameters from that root.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use pv_extractor::{ExtractionSession, OperatingCondition};
use pv_workbench::cli_args::{inputs_from_args, ModuleArgs, SolverArgs};
use pv_workbench::{CaseFile, SweepRange};

#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "Sweep operating conditions for a solved PV module"
)]
struct Args {
    /// Case file to read the module from
    #[arg(long)]
    case: Option<PathBuf>,

    #[command(flatten)]
    module: ModuleArgs,

    #[command(flatten)]
    solver: SolverArgs,

    /// Temperature sweep in °C (format: "start:stop:step")
    #[arg(long, default_value = "0:75:25", allow_hyphen_values = true)]
    temperature_range: SweepRange,

    /// Irradiance sweep in W/m² (format: "start:stop:step")
    #[arg(long, default_value = "200:1000:200")]
    irradiance_range: SweepRange,
}

fn main() -> Result<()> {
    env_logger::init();

    let args = Args::parse();

    let inputs = match &args.case {
        Some(path) => CaseFile::load(path)
            .and_then(|case| case.inputs())
            .with_context(|| format!("Failed to read case file {}", path.display()))?,
        None => inputs_from_args(&args.module, OperatingCondition::stc(), &args.solver),
    };

    let mut session = ExtractionSession::with_settings(
        inputs.ratings,
        OperatingCondition::stc(),
        &args.solver.to_settings(),
    );
    let report = session
        .extract_report(&inputs.seed)
        .context("STC extraction failed")?;

    println!("STC solution: {}", report.result);
    println!("Mismatch: {}", report.mismatch);
    println!();
    println!(
        "{:>8} {:>10} {:>10} {:>12} {:>10}",
        "T (°C)", "G (W/m²)", "i_ph (A)", "i_o (A)", "v_oc (V)"
    );

    for temperature in args.temperature_range.values() {
        for irradiance in args.irradiance_range.values() {
            let condition = OperatingCondition::new(temperature, irradiance);
            let working = pv_extractor::correct(&inputs.ratings, &condition);
            let Some(result) = session.evaluate_at(&condition) else {
                continue;
            };
            println!(
                "{:>8.1} {:>10.1} {:>10} {:>12} {:>10.3}",
                temperature,
                irradiance,
                result.format_i_ph(),
                result.format_i_o(),
                working.v_oc
            );
        }
    }

    Ok(())
}
