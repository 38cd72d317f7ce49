use clap::{Args, Parser};
use std::path::PathBuf;

/// Compute ecosystem service indicators from raster data.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub enum Cli {
    /// Cooling effect of vegetation and water on the urban heat
    /// island (°C).
    CoolingInUrbanAreas(CoolingInUrbanAreas),

    /// Reduced mortality attributable to green space (people).
    MortalityReduction(MortalityReduction),

    /// Particulate matter captured by vegetation (kg/ha/yr).
    PmRetention(PmRetention),
}

#[derive(Debug, Clone, Args)]
pub struct CoolingInUrbanAreas {
    /// Project file (JSON) naming the input and output data.
    pub project: PathBuf,
}

#[derive(Debug, Clone, Args)]
pub struct MortalityReduction {
    /// Project file (JSON) naming the input and output data.
    pub project: PathBuf,
}

#[derive(Debug, Clone, Args)]
pub struct PmRetention {
    /// Project file (JSON) naming the input and output data.
    pub project: PathBuf,
}
