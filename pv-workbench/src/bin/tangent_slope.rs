//! Tangent slope of a plotted I-V curve from two cursor positions
//!
//! The axis calibration is taken separately, from two cursors placed on
//! grid lines a known current and voltage apart (or from pixel spans given
//! directly).

use anyhow::Result;
use log::debug;
use clap::{Parser, ValueEnum};
use pv_extractor::{estimate_slope, CurveRegion, ScreenPoint};
use pv_workbench::cli_args::{parse_point, CalibrationArgs};

/// Curve region the cursors sit on
#[derive(Debug, Clone, Copy, ValueEnum)]
enum RegionArg {
    /// Near V = 0, gives di_dv_sc
    ShortCircuit,
    /// Near I = 0, gives di_dv_oc
    OpenCircuit,
}

impl std::fmt::Display for RegionArg {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.to_region())
    }
}

impl RegionArg {
    fn to_region(self) -> CurveRegion {
        match self {
            RegionArg::ShortCircuit => CurveRegion::ShortCircuit,
            RegionArg::OpenCircuit => CurveRegion::OpenCircuit,
        }
    }
}

#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "Estimate dI/dV of an I-V curve from two points picked on its plot"
)]
struct Args {
    /// Curve region
    #[arg(long, default_value_t = RegionArg::OpenCircuit)]
    region: RegionArg,

    /// First cursor on the curve in pixels (format: "x,y")
    #[arg(long, value_parser = parse_point)]
    p1: ScreenPoint,

    /// Second cursor on the curve in pixels (format: "x,y")
    #[arg(long, value_parser = parse_point)]
    p2: ScreenPoint,

    #[command(flatten)]
    calibration: CalibrationArgs,
}

fn main() -> Result<()> {
    env_logger::init();

    let args = Args::parse();

    let calibration = args.calibration.to_calibration()?;
    debug!("Calibration: {calibration:?}");

    let region = args.region.to_region();
    let slope = estimate_slope(region, args.p1, args.p2, &calibration)?;

    println!("{region} slope: {slope} A/V");
    if let Some(advisory) = slope.advisory {
        println!(
            "Note: {advisory} (measured {})",
            region.format_slope(slope.raw)
        );
    }

    Ok(())
}
