//! Cooling of the urban heat island (UHI) by vegetation and water (°C).

use crate::{same_clone, Output};
use log::debug;
use raster::{
    assert_at_least, assert_in_range, lookup_boolean, lookup_scalar, named, windowed_average,
    windowed_sum, Grid, LookupTable, NominalGrid, RasterError, ScalarGrid, Window,
};
use serde::Deserialize;

pub struct Inputs<'a> {
    pub land_cover: &'a NominalGrid,
    /// Average wind speed at 100 m height, reclassified by `wind_class`.
    pub wind_speed: &'a ScalarGrid,
    /// Inhabitants per cell.
    pub population: &'a ScalarGrid,
    pub trees: &'a ScalarGrid,
    pub shrubs: &'a ScalarGrid,
    pub grass: &'a ScalarGrid,
    /// Roughness length for momentum (m) per land cover class.
    pub roughness_length: &'a LookupTable,
    pub wind_class: &'a LookupTable,
    /// Land cover classes which are built up.
    pub built_up: &'a LookupTable,
    /// UHI reduction fraction of the non-green part of each land cover
    /// class.
    pub uhi_reduction: &'a LookupTable,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Coefficients {
    /// Distance (m) over which 10 m wind speed is smoothed.
    pub wind_distance: f64,
    /// Distance (m) over which residents add to the UHI effect.
    pub population_distance: f64,
    /// Distance (m) over which built up area adds to the UHI effect.
    pub built_up_distance: f64,
    /// Distance (m) over which green cools its surroundings.
    pub cooling_distance: f64,
    /// `max_uhi = intercept + population_slope * log10(pop) + wind_slope * wind`
    pub intercept: f64,
    pub population_slope: f64,
    pub wind_slope: f64,
    pub reduction_trees: f64,
    pub reduction_shrubs: f64,
    pub reduction_grass: f64,
    /// Smoothed wind speed may dip this far below zero before it's an
    /// error.
    pub tolerance: f64,
}

impl Default for Coefficients {
    fn default() -> Self {
        Self {
            wind_distance: 50.0,
            population_distance: 10_000.0,
            built_up_distance: 1_000.0,
            cooling_distance: 30.0,
            intercept: -1.605,
            population_slope: 1.062,
            wind_slope: -0.356,
            reduction_trees: 0.5,
            reduction_shrubs: 0.3,
            reduction_grass: 0.2,
            tolerance: 1e-6,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Outputs {
    pub maximum_uhi_effect: ScalarGrid,
    pub potential_uhi_effect: ScalarGrid,
    /// Cooling by the green and water in the cell itself.
    pub in_situ_cooling_effect: ScalarGrid,
    pub actual_uhi_effect: ScalarGrid,
    pub cooling_effect: ScalarGrid,
}

impl Outputs {
    pub fn outputs(&self) -> Vec<(&'static str, Output<'_>)> {
        vec![
            ("maximum_uhi_effect", Output::Grid(&self.maximum_uhi_effect)),
            ("potential_uhi_effect", Output::Grid(&self.potential_uhi_effect)),
            ("in_situ_cooling_effect", Output::Grid(&self.in_situ_cooling_effect)),
            ("actual_uhi_effect", Output::Grid(&self.actual_uhi_effect)),
            ("cooling_effect", Output::Grid(&self.cooling_effect)),
        ]
    }
}

pub fn run(inputs: &Inputs<'_>, coefficients: &Coefficients) -> Result<Outputs, RasterError> {
    let Inputs {
        land_cover,
        wind_speed,
        population,
        trees,
        shrubs,
        grass,
        roughness_length,
        wind_class,
        built_up,
        uhi_reduction,
    } = *inputs;
    same_clone(&[
        land_cover.spec(),
        wind_speed.spec(),
        population.spec(),
        trees.spec(),
        shrubs.spec(),
        grass.spec(),
    ])?;
    assert_at_least(&named("population", population), 0.0)?;
    assert_in_range(
        &[
            named("trees", trees),
            named("shrubs", shrubs),
            named("grass", grass),
        ],
        0.0,
        1.0,
    )?;

    let now = std::time::Instant::now();

    let mask = land_cover.defined();
    let trees = trees.fill_undefined_within(&mask, 0.0)?;
    let shrubs = shrubs.fill_undefined_within(&mask, 0.0)?;
    let grass = grass.fill_undefined_within(&mask, 0.0)?;

    let roughness_length = lookup_scalar(roughness_length, land_cover);
    let wind_speed_100m = lookup_scalar(wind_class, wind_speed);
    let built_up = lookup_boolean(built_up, land_cover);
    let uhi_reduction = lookup_scalar(uhi_reduction, land_cover);

    // Log wind profile from 100 m down to 10 m.
    let wind_speed_10m = wind_speed_100m
        .mul(&(10.0 / &roughness_length).ln())?
        .div(&(100.0 / &roughness_length).ln())?;
    let wind_speed_10m =
        windowed_average(&wind_speed_10m, Window::zone(coefficients.wind_distance))?;
    assert_at_least(&named("wind_speed_10m", &wind_speed_10m), -coefficients.tolerance)?;
    let wind_speed_10m = wind_speed_10m.clamp_min(0.0);

    let population_nearby =
        windowed_sum(population, Window::zone(coefficients.population_distance))?.clamp_min(0.0);

    let maximum_uhi_effect = (&(&population_nearby.log10() * coefficients.population_slope)
        + coefficients.intercept)
        .add(&(&wind_speed_10m * coefficients.wind_slope))?
        .clamp_min(0.0);
    assert_at_least(&named("maximum_uhi_effect", &maximum_uhi_effect), 0.0)?;

    let green = trees.add(&shrubs)?.add(&grass)?.clamp_max(1.0);
    let non_green = 1.0 - &green;
    let built_up_share = Grid::if_then_else(
        &built_up,
        &non_green,
        &ScalarGrid::filled(*land_cover.spec(), 0.0),
    )?;
    let built_up_nearby =
        windowed_average(&built_up_share, Window::zone(coefficients.built_up_distance))?
            .clamp_min(0.0);
    let potential_uhi_effect = maximum_uhi_effect.mul(&built_up_nearby)?;

    let reduction = (&trees * coefficients.reduction_trees)
        .add(&(&shrubs * coefficients.reduction_shrubs))?
        .add(&(&grass * coefficients.reduction_grass))?
        .add(&non_green.mul(&uhi_reduction)?)?
        .clamp_min(0.0);

    let in_situ_cooling_effect = potential_uhi_effect.mul(&reduction)?;

    let reduction_nearby =
        windowed_average(&reduction, Window::zone(coefficients.cooling_distance))?.clamp_min(0.0);
    let actual_uhi_effect = potential_uhi_effect.mul(&(1.0 - &reduction_nearby))?;
    let cooling_effect = maximum_uhi_effect.sub(&actual_uhi_effect)?;

    assert_at_least(
        &[
            named("maximum_uhi_effect", &maximum_uhi_effect),
            named("potential_uhi_effect", &potential_uhi_effect),
            named("in_situ_cooling_effect", &in_situ_cooling_effect),
            named("actual_uhi_effect", &actual_uhi_effect),
            named("cooling_effect", &cooling_effect),
        ],
        0.0,
    )?;

    debug!(
        "cooling; max_uhi: {:?}, mean_cooling: {:?}, exec: {:?}",
        maximum_uhi_effect.maximum(),
        cooling_effect.mean(),
        now.elapsed()
    );

    Ok(Outputs {
        maximum_uhi_effect,
        potential_uhi_effect,
        in_situ_cooling_effect,
        actual_uhi_effect,
        cooling_effect,
    })
}

#[cfg(test)]
mod tests {
    use super::{run, Coefficients, Inputs, Outputs};
    use crate::test_util::{spec, table};
    use approx::assert_relative_eq;
    use raster::{ClassKey, Limit, LookupTable, NominalGrid, RasterError, ScalarGrid};

    struct Fixture {
        land_cover: NominalGrid,
        wind_speed: ScalarGrid,
        population: ScalarGrid,
        trees: ScalarGrid,
        shrubs: ScalarGrid,
        grass: ScalarGrid,
    }

    impl Fixture {
        fn uniform() -> Self {
            let spec = spec(5, 5);
            Self {
                land_cover: NominalGrid::filled(spec, 1),
                wind_speed: ScalarGrid::filled(spec, 6.2),
                population: ScalarGrid::filled(spec, 1_000.0),
                trees: ScalarGrid::filled(spec, 0.2),
                shrubs: ScalarGrid::filled(spec, 0.1),
                grass: ScalarGrid::filled(spec, 0.1),
            }
        }

        fn run(&self) -> Result<Outputs, RasterError> {
            let wind_class = LookupTable::new(vec![
                (ClassKey::interval(None, Some(Limit::exclusive(4.0))), 3.0),
                (ClassKey::interval(Some(Limit::inclusive(4.0)), None), 5.0),
            ])
            .unwrap();
            self.run_with(&wind_class)
        }

        fn run_with(&self, wind_class: &LookupTable) -> Result<Outputs, RasterError> {
            run(
                &Inputs {
                    land_cover: &self.land_cover,
                    wind_speed: &self.wind_speed,
                    population: &self.population,
                    trees: &self.trees,
                    shrubs: &self.shrubs,
                    grass: &self.grass,
                    roughness_length: &table(&[(1, 0.5), (2, 0.03)]),
                    wind_class,
                    built_up: &table(&[(1, 1.0), (2, 0.0)]),
                    uhi_reduction: &table(&[(1, 0.1), (2, 0.4)]),
                },
                &Coefficients::default(),
            )
        }
    }

    #[test]
    fn test_uniform_city() {
        let out = Fixture::uniform().run().unwrap();

        let wind_10m = 5.0 * (10.0_f64 / 0.5).ln() / (100.0_f64 / 0.5).ln();
        let maximum = -1.605 + 1.062 * 25_000.0_f64.log10() - 0.356 * wind_10m;
        let green = 0.4;
        let potential = maximum * (1.0 - green);
        let reduction = 0.2 * 0.5 + 0.1 * 0.3 + 0.1 * 0.2 + (1.0 - green) * 0.1;
        let actual = potential * (1.0 - reduction);

        for cell in out.maximum_uhi_effect.cells() {
            assert_relative_eq!(cell.unwrap(), maximum, epsilon = 1e-9);
        }
        for cell in out.potential_uhi_effect.cells() {
            assert_relative_eq!(cell.unwrap(), potential, epsilon = 1e-9);
        }
        for cell in out.in_situ_cooling_effect.cells() {
            assert_relative_eq!(cell.unwrap(), potential * reduction, epsilon = 1e-9);
        }
        for cell in out.actual_uhi_effect.cells() {
            assert_relative_eq!(cell.unwrap(), actual, epsilon = 1e-9);
        }
        for cell in out.cooling_effect.cells() {
            assert_relative_eq!(cell.unwrap(), maximum - actual, epsilon = 1e-9);
        }
    }

    #[test]
    fn test_sparse_population_has_no_heat_island() {
        let mut fixture = Fixture::uniform();
        fixture.population = ScalarGrid::filled(*fixture.population.spec(), 1.0);
        let out = fixture.run().unwrap();
        // -1.605 + 1.062 * log10(25) - 0.356 * wind < 0
        assert_relative_eq!(out.maximum_uhi_effect.maximum().unwrap(), 0.0);
        assert_relative_eq!(out.cooling_effect.maximum().unwrap(), 0.0);
    }

    #[test]
    fn test_green_outside_land_cover_stays_undefined() {
        let mut fixture = Fixture::uniform();
        fixture.land_cover.set(0, 0, None);
        fixture.trees.set(0, 0, None);
        fixture.trees.set(4, 4, None);
        let out = fixture.run().unwrap();
        assert_eq!(out.in_situ_cooling_effect.get(0, 0), None);
        assert!(out.in_situ_cooling_effect.get(4, 4).is_some());
    }

    #[test]
    fn test_negative_population() {
        let mut fixture = Fixture::uniform();
        fixture.population.set(3, 1, Some(-1.0));
        assert!(matches!(
            fixture.run(),
            Err(RasterError::RangeViolation { ref subject, .. }) if subject == "population"
        ));
    }

    #[test]
    fn test_wind_speed_tolerance() {
        let fixture = Fixture::uniform();
        let all = |value| {
            LookupTable::new(vec![(ClassKey::interval(None, None), value)]).unwrap()
        };

        let out = fixture.run_with(&all(-1e-7)).unwrap();
        let maximum = -1.605 + 1.062 * 25_000.0_f64.log10();
        assert_relative_eq!(out.maximum_uhi_effect.maximum().unwrap(), maximum, epsilon = 1e-9);

        assert!(matches!(
            fixture.run_with(&all(-1.0)),
            Err(RasterError::RangeViolation { ref subject, .. }) if subject == "wind_speed_10m"
        ));
    }

    #[test]
    fn test_coefficient_overrides() {
        let coefficients: Coefficients =
            serde_json::from_str(r#"{ "cooling_distance": 60.0, "intercept": -2.0 }"#).unwrap();
        assert_eq!(coefficients.cooling_distance, 60.0);
        assert_eq!(coefficients.intercept, -2.0);
        assert_eq!(coefficients.wind_distance, 50.0);
        assert!(serde_json::from_str::<Coefficients>(r#"{ "colling_distance": 1.0 }"#).is_err());
    }
}
