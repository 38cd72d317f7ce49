//! Reading model inputs, running models, and writing their outputs.

use crate::{
    options::{CoolingInUrbanAreas, MortalityReduction, PmRetention},
    project::{Project, Section},
};
use anyhow::{Context, Result};
use ecoserv::{cooling, mortality, pm_retention, Output};
use gridio::{write_grid, Store};
use log::info;
use raster::{AnyGrid, GridSpec, LookupTable, ScalarGrid, ValueKind};
use std::{path::Path, sync::Arc, time::Instant};

impl CoolingInUrbanAreas {
    pub fn run(&self) -> Result<()> {
        run_project("cooling_in_urban_areas", &self.project, cooling_in_urban_areas)
    }
}

impl MortalityReduction {
    pub fn run(&self) -> Result<()> {
        run_project("mortality_reduction", &self.project, mortality_reduction)
    }
}

impl PmRetention {
    pub fn run(&self) -> Result<()> {
        run_project("pm_retention", &self.project, pm_retention)
    }
}

fn run_project(
    name: &str,
    path: &Path,
    model: impl FnOnce(&Project, &Store) -> Result<()>,
) -> Result<()> {
    let project = Project::load(path)?;
    let store = Store::new();
    let now = Instant::now();
    model(&project, &store)?;
    info!("{name}; inputs: {}, exec: {:?}", store.len(), now.elapsed());
    Ok(())
}

/// Model inputs of one project section, loaded through a shared
/// store.
struct Loader<'a, C> {
    project: &'a Project,
    section: &'a Section<C>,
    store: &'a Store,
}

impl<C> Loader<'_, C> {
    fn grid(&self, role: &str, kind: ValueKind) -> Result<Arc<AnyGrid>> {
        let path = self.project.input_raster(self.section, role);
        self.store
            .grid(&path, kind)
            .with_context(|| format!("reading {role} from {path:?}"))
    }

    fn table(&self, role: &str) -> Result<Arc<LookupTable>> {
        let path = self.project.input_table(self.section, role);
        self.store
            .table(&path)
            .with_context(|| format!("reading {role} from {path:?}"))
    }

    /// Writes every output, creating the output directory if needed.
    /// Map-wide values are written as uniform grids over `spec`.
    fn write(&self, outputs: &[(&str, Output<'_>)], spec: &GridSpec) -> Result<()> {
        let dir = self.project.output_raster_dir();
        std::fs::create_dir_all(&dir).with_context(|| format!("creating {dir:?}"))?;
        for (role, output) in outputs {
            let path = self.project.output_raster(self.section, role);
            match output {
                Output::Grid(grid) => write_grid(*grid, &path),
                Output::Scalar(Some(value)) => {
                    write_grid(&ScalarGrid::filled(*spec, *value), &path)
                }
                Output::Scalar(None) => write_grid(&ScalarGrid::undefined(*spec), &path),
            }
            .with_context(|| format!("writing {role} to {path:?}"))?;
            info!("wrote {role} to {path:?}");
        }
        Ok(())
    }
}

fn cooling_in_urban_areas(project: &Project, store: &Store) -> Result<()> {
    let section = project.cooling()?;
    let load = Loader {
        project,
        section,
        store,
    };

    let land_cover = load.grid("land_cover", ValueKind::Nominal)?;
    let wind_speed = load.grid("wind_speed", ValueKind::Scalar)?;
    let population = load.grid("population", ValueKind::Scalar)?;
    let trees = load.grid("trees", ValueKind::Scalar)?;
    let shrubs = load.grid("shrubs", ValueKind::Scalar)?;
    let grass = load.grid("grass", ValueKind::Scalar)?;
    let roughness_length = load.table("roughness_length")?;
    let wind_class = load.table("wind_class")?;
    let built_up = load.table("built_up")?;
    let uhi_reduction = load.table("uhi_reduction")?;

    let outputs = cooling::run(
        &cooling::Inputs {
            land_cover: land_cover.as_nominal()?,
            wind_speed: wind_speed.as_scalar()?,
            population: population.as_scalar()?,
            trees: trees.as_scalar()?,
            shrubs: shrubs.as_scalar()?,
            grass: grass.as_scalar()?,
            roughness_length: &roughness_length,
            wind_class: &wind_class,
            built_up: &built_up,
            uhi_reduction: &uhi_reduction,
        },
        &section.coefficients,
    )?;

    load.write(&outputs.outputs(), land_cover.spec())
}

fn mortality_reduction(project: &Project, store: &Store) -> Result<()> {
    let section = project.mortality()?;
    let load = Loader {
        project,
        section,
        store,
    };

    let ndvi = load.grid("ndvi", ValueKind::Scalar)?;
    let mort = load.grid("mort", ValueKind::Scalar)?;
    let population = load.grid("population", ValueKind::Scalar)?;

    let outputs = mortality::run(
        &mortality::Inputs {
            ndvi: ndvi.as_scalar()?,
            mort: mort.as_scalar()?,
            population: population.as_scalar()?,
        },
        &section.coefficients,
    )?;

    load.write(&outputs.outputs(), ndvi.spec())
}

fn pm_retention(project: &Project, store: &Store) -> Result<()> {
    let section = project.pm()?;
    let load = Loader {
        project,
        section,
        store,
    };

    let land_cover = load.grid("land_cover", ValueKind::Nominal)?;
    let pm_10 = load.grid("pm_10", ValueKind::Scalar)?;
    let pm_25 = load.grid("pm_25", ValueKind::Scalar)?;
    let trees = load.grid("trees", ValueKind::Scalar)?;
    let shrubs = load.grid("shrubs", ValueKind::Scalar)?;
    let grass = load.grid("grass", ValueKind::Scalar)?;
    let deposition = load.table("deposition")?;
    let deposition_trees = load.table("deposition_trees")?;
    let resuspension_pm10 = load.table("resuspension_pm10")?;
    let resuspension_pm25 = load.table("resuspension_pm25")?;

    let outputs = pm_retention::run(
        &pm_retention::Inputs {
            land_cover: land_cover.as_nominal()?,
            pm_10: pm_10.as_scalar()?,
            pm_25: pm_25.as_scalar()?,
            trees: trees.as_scalar()?,
            shrubs: shrubs.as_scalar()?,
            grass: grass.as_scalar()?,
            deposition: &deposition,
            deposition_trees: &deposition_trees,
            resuspension_pm10: &resuspension_pm10,
            resuspension_pm25: &resuspension_pm25,
        },
        &section.coefficients,
    )?;

    load.write(&outputs.outputs(), land_cover.spec())
}

#[cfg(test)]
mod tests {
    use super::{cooling_in_urban_areas, mortality_reduction, pm_retention};
    use crate::project::Project;
    use approx::assert_relative_eq;
    use geo::geometry::Coord;
    use gridio::{read_scalar, write_grid, Store};
    use raster::{GridSpec, NominalGrid, ScalarGrid};
    use std::path::{Path, PathBuf};

    fn write_project(dir: &Path, sections: &str) -> PathBuf {
        let project = format!(
            r#"{{
                "input": {{
                    "workspace": {ws:?}, "directory": "in", "raster": "raster", "table": "table"
                }},
                "output": {{ "workspace": {ws:?}, "directory": "out", "raster": "raster" }},
                {sections}
            }}"#,
            ws = dir.display().to_string()
        );
        let path = dir.join("project.json");
        std::fs::write(&path, project).unwrap();
        path
    }

    fn mortality_project(dir: &Path) -> PathBuf {
        write_project(
            dir,
            r#""mortality_reduction": {
                "input": { "population": "pop" },
                "output": { "mortality_reduction_total": "total" }
            }"#,
        )
    }

    struct Inputs {
        rasters: PathBuf,
        tables: PathBuf,
    }

    impl Inputs {
        fn new(dir: &Path) -> Self {
            let inputs = Self {
                rasters: dir.join("in").join("raster"),
                tables: dir.join("in").join("table"),
            };
            std::fs::create_dir_all(&inputs.rasters).unwrap();
            std::fs::create_dir_all(&inputs.tables).unwrap();
            inputs
        }

        fn scalar(&self, name: &str, spec: GridSpec, value: f64) {
            let path = self.rasters.join(format!("{name}.asc"));
            write_grid(&ScalarGrid::filled(spec, value), path).unwrap();
        }

        fn nominal(&self, name: &str, spec: GridSpec, value: i32) {
            let path = self.rasters.join(format!("{name}.asc"));
            write_grid(&NominalGrid::filled(spec, value), path).unwrap();
        }

        fn table(&self, name: &str, text: &str) {
            std::fs::write(self.tables.join(format!("{name}.tab")), text).unwrap();
        }
    }

    fn spec(rows: usize, cols: usize) -> GridSpec {
        GridSpec::new(rows, cols, 10.0, Coord { x: 0.0, y: 100.0 }).unwrap()
    }

    fn output(dir: &Path, name: &str) -> ScalarGrid {
        let path = dir.join("out").join("raster").join(format!("{name}.asc"));
        read_scalar(path).unwrap()
    }

    #[test]
    fn test_mortality_reduction_end_to_end() {
        let dir = tempfile::tempdir().unwrap();
        let inputs = Inputs::new(dir.path());
        let spec = spec(10, 10);
        inputs.scalar("ndvi", spec, 0.2);
        inputs.scalar("mort", spec, 0.01);
        inputs.scalar("pop", spec, 100.0);

        let project = Project::load(mortality_project(dir.path())).unwrap();
        mortality_reduction(&project, &Store::new()).unwrap();

        let per_cell = output(dir.path(), "mortality_reduction");
        assert_eq!(per_cell.spec(), &spec);
        assert_relative_eq!(per_cell.get(3, 7).unwrap(), 0.08, epsilon = 1e-9);

        let total = output(dir.path(), "total");
        assert_eq!(total.defined_count(), 100);
        assert_relative_eq!(total.get(0, 0).unwrap(), 8.0, epsilon = 1e-9);
        let per_100k = output(dir.path(), "mortality_reduction_per_100k");
        assert_relative_eq!(per_100k.get(9, 9).unwrap(), 80.0, epsilon = 1e-7);
    }

    #[test]
    fn test_cooling_in_urban_areas_end_to_end() {
        let dir = tempfile::tempdir().unwrap();
        let inputs = Inputs::new(dir.path());
        let spec = spec(5, 5);
        inputs.nominal("land_cover", spec, 1);
        inputs.scalar("wind_speed", spec, 6.2);
        inputs.scalar("population", spec, 1_000.0);
        inputs.scalar("trees", spec, 0.2);
        inputs.scalar("shrubs", spec, 0.1);
        inputs.scalar("grass", spec, 0.1);
        inputs.table("roughness_length", "1 0.5\n");
        inputs.table("wind_class", "<,4> 3.0\n[4,> 5.0\n");
        inputs.table("built_up", "1 1\n");
        inputs.table("uhi_reduction", "1 0.1\n");

        let project = Project::load(write_project(dir.path(), r#""cooling_in_urban_areas": {}"#));
        cooling_in_urban_areas(&project.unwrap(), &Store::new()).unwrap();

        let wind_10m = 5.0 * (10.0_f64 / 0.5).ln() / (100.0_f64 / 0.5).ln();
        let maximum = -1.605 + 1.062 * 25_000.0_f64.log10() - 0.356 * wind_10m;
        let potential = maximum * 0.6;
        let reduction = 0.2 * 0.5 + 0.1 * 0.3 + 0.1 * 0.2 + 0.6 * 0.1;
        let actual = potential * (1.0 - reduction);

        let cooling = output(dir.path(), "cooling_effect");
        assert_eq!(cooling.defined_count(), 25);
        assert_relative_eq!(cooling.get(2, 2).unwrap(), maximum - actual, epsilon = 1e-9);
        for name in [
            "maximum_uhi_effect",
            "potential_uhi_effect",
            "in_situ_cooling_effect",
            "actual_uhi_effect",
        ] {
            assert_eq!(output(dir.path(), name).spec(), &spec);
        }
    }

    #[test]
    fn test_pm_retention_end_to_end() {
        let dir = tempfile::tempdir().unwrap();
        let inputs = Inputs::new(dir.path());
        let spec = spec(6, 6);
        inputs.nominal("land_cover", spec, 1);
        inputs.scalar("pm_10", spec, 20.0);
        inputs.scalar("pm_25", spec, 10.0);
        inputs.scalar("trees", spec, 0.5);
        inputs.scalar("shrubs", spec, 0.2);
        inputs.scalar("grass", spec, 0.1);
        inputs.table("deposition", "1 1.0\n");
        inputs.table("deposition_trees", "1 2.0\n");
        inputs.table("resuspension_pm10", "1 0.5\n");
        inputs.table("resuspension_pm25", "1 0.25\n");

        let project = write_project(
            dir.path(),
            r#""pm_retention": { "output": { "map_total_pm10": "total_pm10" } }"#,
        );
        pm_retention(&Project::load(project).unwrap(), &Store::new()).unwrap();

        let capture_pm10 = 1.28 * 20.0 * 0.5 * 0.031536;
        let capture = output(dir.path(), "capture_pm10");
        assert_relative_eq!(capture.get(0, 5).unwrap(), capture_pm10, epsilon = 1e-12);
        let total = output(dir.path(), "total_pm10");
        assert_relative_eq!(total.get(5, 0).unwrap(), 36.0 * capture_pm10, epsilon = 1e-9);
        for name in [
            "capture_pm25",
            "map_total_pm25",
            "perc_conc_change_pm10",
            "perc_conc_change_pm25",
        ] {
            assert_eq!(output(dir.path(), name).defined_count(), 36);
        }
    }

    #[test]
    fn test_missing_input_names_path() {
        let dir = tempfile::tempdir().unwrap();
        let project = Project::load(mortality_project(dir.path())).unwrap();
        let err = mortality_reduction(&project, &Store::new()).unwrap_err();
        assert!(format!("{err:#}").contains("ndvi.asc"));
    }
}
