//! Reduced mortality attributable to nearby green space (people).

use crate::{same_clone, Output};
use log::debug;
use raster::{
    assert_at_least, assert_in_range, named, windowed_average, Grid, RasterError, ScalarGrid,
    Window,
};
use serde::Deserialize;

pub struct Inputs<'a> {
    /// Summer average NDVI, `[-1, 1]`.
    pub ndvi: &'a ScalarGrid,
    /// Deaths per inhabitant per year.
    pub mort: &'a ScalarGrid,
    /// Inhabitants per cell.
    pub population: &'a ScalarGrid,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Coefficients {
    /// Radius (m) over which green space affects residents.
    pub window_distance: f64,
    /// NDVI increment the risk reduction is expressed per.
    pub ndvi_step: f64,
    /// Fractional reduction in mortality risk per `ndvi_step`.
    pub risk_reduction_per_step: f64,
}

impl Default for Coefficients {
    fn default() -> Self {
        Self {
            window_distance: 300.0,
            ndvi_step: 0.1,
            risk_reduction_per_step: 0.04,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Outputs {
    /// People per cell per year.
    pub mortality_reduction: ScalarGrid,
    /// People per year over the whole map.
    pub mortality_reduction_total: Option<f64>,
    /// People per 100 000 inhabitants per year.
    pub mortality_reduction_per_100k: Option<f64>,
}

impl Outputs {
    pub fn outputs(&self) -> Vec<(&'static str, Output<'_>)> {
        vec![
            ("mortality_reduction", Output::Grid(&self.mortality_reduction)),
            (
                "mortality_reduction_total",
                Output::Scalar(self.mortality_reduction_total),
            ),
            (
                "mortality_reduction_per_100k",
                Output::Scalar(self.mortality_reduction_per_100k),
            ),
        ]
    }
}

pub fn run(inputs: &Inputs<'_>, coefficients: &Coefficients) -> Result<Outputs, RasterError> {
    let Inputs {
        ndvi,
        mort,
        population,
    } = *inputs;
    same_clone(&[ndvi.spec(), mort.spec(), population.spec()])?;
    assert_in_range(&named("ndvi", ndvi), -1.0, 1.0)?;
    assert_in_range(&named("mort", mort), 0.0, 1.0)?;
    assert_at_least(&named("population", population), 0.0)?;

    let now = std::time::Instant::now();

    let ndvi_positive = Grid::if_then(&ndvi.gt(0.0), ndvi)?;
    let window = Window::zone(coefficients.window_distance).widened_by(ndvi.cell_size());
    let ndvi_average = windowed_average(&ndvi_positive, window)?;

    let reduction_fraction =
        &(&ndvi_average / coefficients.ndvi_step) * coefficients.risk_reduction_per_step;
    let mortality_reduction = reduction_fraction.mul(population)?.mul(mort)?;
    assert_at_least(&named("mortality_reduction", &mortality_reduction), 0.0)?;

    let mortality_reduction_total = mortality_reduction.total();
    let mortality_reduction_per_100k = match (mortality_reduction_total, population.total()) {
        (Some(total), Some(inhabitants)) if inhabitants != 0.0 => {
            Some(total / inhabitants * 100_000.0)
        }
        _ => None,
    };

    debug!(
        "mortality_reduction; total: {:?}, per_100k: {:?}, exec: {:?}",
        mortality_reduction_total,
        mortality_reduction_per_100k,
        now.elapsed()
    );

    Ok(Outputs {
        mortality_reduction,
        mortality_reduction_total,
        mortality_reduction_per_100k,
    })
}
