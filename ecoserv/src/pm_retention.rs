//! Particulate matter captured by vegetation (kg/ha/yr).

use crate::{same_clone, Output};
use log::debug;
use raster::{
    assert_at_least, assert_in_range, lookup_scalar, named, windowed_average, LookupTable,
    NominalGrid, RasterError, ScalarGrid, Window,
};
use serde::Deserialize;

pub struct Inputs<'a> {
    pub land_cover: &'a NominalGrid,
    /// PM10 concentration, μg/m³.
    pub pm_10: &'a ScalarGrid,
    /// PM2.5 concentration, μg/m³.
    pub pm_25: &'a ScalarGrid,
    /// Fraction of the cell covered by vegetation taller than 2.5 m.
    pub trees: &'a ScalarGrid,
    /// Fraction covered by vegetation between 1 and 2.5 m.
    pub shrubs: &'a ScalarGrid,
    /// Fraction covered by vegetation below 1 m.
    pub grass: &'a ScalarGrid,
    /// Deposition velocity (cm/s) of non-tree surfaces per land cover class.
    pub deposition: &'a LookupTable,
    /// Deposition velocity (cm/s) of trees per land cover class.
    pub deposition_trees: &'a LookupTable,
    pub resuspension_pm10: &'a LookupTable,
    pub resuspension_pm25: &'a LookupTable,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Coefficients {
    /// Radius (m) over which concentrations are smoothed.
    pub window_distance: f64,
    pub deposition_shrubs: f64,
    pub deposition_grass: f64,
    /// PM2.5 deposits at this fraction of the PM10 velocity.
    pub pm25_deposition_factor: f64,
    /// cm/s * μg/m³ to kg/ha/yr.
    pub unit_conversion: f64,
    /// kg/ha/yr captured to μg/m³ concentration change.
    pub concentration_change: f64,
    /// Smoothed PM10 may dip this far below zero before it's an
    /// error.
    pub tolerance: f64,
}

impl Default for Coefficients {
    fn default() -> Self {
        Self {
            window_distance: 100.0,
            deposition_shrubs: 0.3,
            deposition_grass: 0.2,
            pm25_deposition_factor: 0.2,
            unit_conversion: 0.031536,
            concentration_change: 0.00137,
            tolerance: 1e-5,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Outputs {
    pub capture_pm10: ScalarGrid,
    pub capture_pm25: ScalarGrid,
    pub map_total_pm10: Option<f64>,
    pub map_total_pm25: Option<f64>,
    /// Percentage of the local concentration removed.
    pub perc_conc_change_pm10: ScalarGrid,
    pub perc_conc_change_pm25: ScalarGrid,
}

impl Outputs {
    pub fn outputs(&self) -> Vec<(&'static str, Output<'_>)> {
        vec![
            ("capture_pm10", Output::Grid(&self.capture_pm10)),
            ("capture_pm25", Output::Grid(&self.capture_pm25)),
            ("map_total_pm10", Output::Scalar(self.map_total_pm10)),
            ("map_total_pm25", Output::Scalar(self.map_total_pm25)),
            ("perc_conc_change_pm10", Output::Grid(&self.perc_conc_change_pm10)),
            ("perc_conc_change_pm25", Output::Grid(&self.perc_conc_change_pm25)),
        ]
    }
}

pub fn run(inputs: &Inputs<'_>, coefficients: &Coefficients) -> Result<Outputs, RasterError> {
    let Inputs {
        land_cover,
        pm_10,
        pm_25,
        trees,
        shrubs,
        grass,
        deposition,
        deposition_trees,
        resuspension_pm10,
        resuspension_pm25,
    } = *inputs;
    same_clone(&[
        land_cover.spec(),
        pm_10.spec(),
        pm_25.spec(),
        trees.spec(),
        shrubs.spec(),
        grass.spec(),
    ])?;

    let now = std::time::Instant::now();

    let trees = trees.fill_undefined(0.0);
    let shrubs = shrubs.fill_undefined(0.0);
    let grass = grass.fill_undefined(0.0);

    let deposition_velocity = lookup_scalar(deposition, land_cover);
    let deposition_velocity_trees = lookup_scalar(deposition_trees, land_cover);
    let resuspension_pm10 = lookup_scalar(resuspension_pm10, land_cover);
    let resuspension_pm25 = lookup_scalar(resuspension_pm25, land_cover);

    assert_in_range(
        &[
            named("trees", &trees),
            named("shrubs", &shrubs),
            named("grass", &grass),
        ],
        0.0,
        1.0,
    )?;
    assert_in_range(&named("resuspension_fraction_pm10", &resuspension_pm10), 0.0, 1.0)?;
    assert_in_range(&named("resuspension_fraction_pm25", &resuspension_pm25), 0.0, 1.0)?;
    assert_at_least(
        &[
            named("deposition_velocity", &deposition_velocity),
            named("deposition_velocity_trees", &deposition_velocity_trees),
        ],
        0.0,
    )?;

    let vegetated = trees.add(&shrubs)?.add(&grass)?.clamp_max(1.0);
    let non_vegetated = 1.0 - &vegetated;

    let deposition_velocity = trees
        .mul(&deposition_velocity_trees)?
        .add(&(&shrubs * coefficients.deposition_shrubs))?
        .add(&(&grass * coefficients.deposition_grass))?
        .add(&non_vegetated.mul(&deposition_velocity)?)?;

    let window = Window::zone(coefficients.window_distance).widened_by(land_cover.cell_size());
    let pm_10 = windowed_average(pm_10, window)?;
    let pm_25 = windowed_average(pm_25, window)?;
    assert_at_least(&named("pm_10", &pm_10), -coefficients.tolerance)?;
    let pm_10 = pm_10.clamp_min(0.0);
    let pm_25 = pm_25.clamp_min(0.0);

    let capture_pm10 = &deposition_velocity
        .mul(&pm_10)?
        .mul(&(1.0 - &resuspension_pm10))?
        * coefficients.unit_conversion;
    let capture_pm25 = &(&deposition_velocity * coefficients.pm25_deposition_factor)
        .mul(&pm_25)?
        .mul(&(1.0 - &resuspension_pm25))?
        * coefficients.unit_conversion;

    let perc_conc_change_pm10 =
        &(&capture_pm10 * coefficients.concentration_change).div(&pm_10)? * 100.0;
    let perc_conc_change_pm25 =
        &(&capture_pm25 * coefficients.concentration_change).div(&pm_25)? * 100.0;

    assert_at_least(
        &[
            named("capture_pm10", &capture_pm10),
            named("capture_pm25", &capture_pm25),
            named("perc_conc_change_pm10", &perc_conc_change_pm10),
            named("perc_conc_change_pm25", &perc_conc_change_pm25),
        ],
        0.0,
    )?;

    let map_total_pm10 = capture_pm10.total();
    let map_total_pm25 = capture_pm25.total();

    debug!(
        "pm_retention; total_pm10: {:?}, total_pm25: {:?}, exec: {:?}",
        map_total_pm10,
        map_total_pm25,
        now.elapsed()
    );

    Ok(Outputs {
        capture_pm10,
        capture_pm25,
        map_total_pm10,
        map_total_pm25,
        perc_conc_change_pm10,
        perc_conc_change_pm25,
    })
}
