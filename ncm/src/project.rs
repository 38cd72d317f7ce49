//! Project files.
//!
//! A project names where model inputs are read from and where outputs
//! are written to:
//!
//! ```json
//! {
//!   "input":  { "workspace": "$HOME/ncm", "directory": "in",
//!               "raster": "raster", "table": "table" },
//!   "output": { "workspace": "$HOME/ncm", "directory": "out",
//!               "raster": "raster" },
//!   "mortality_reduction": {
//!     "input":  { "population": "pop_2022" },
//!     "output": { "mortality_reduction": "mr" },
//!     "coefficients": { "window_distance": 300.0 }
//!   }
//! }
//! ```
//!
//! Inputs and outputs a model section doesn't name use their role as
//! file name. Environment variables in path components are expanded at
//! load time.

use ecoserv::{cooling, mortality, pm_retention};
use raster::ErrorKind;
use serde::Deserialize;
use std::{
    collections::BTreeMap,
    path::{Path, PathBuf},
};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ProjectError {
    #[error("reading project {}: {source}", path.display())]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("parsing project {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },

    #[error("project has no {0} section")]
    MissingSection(&'static str),
}

impl ProjectError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Read { .. } => ErrorKind::Io,
            Self::Parse { .. } | Self::MissingSection(_) => ErrorKind::Config,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Input {
    pub workspace: String,
    pub directory: String,
    pub raster: String,
    pub table: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Output {
    pub workspace: String,
    pub directory: String,
    pub raster: String,
}

/// Per-model file names and coefficient overrides.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields, bound(deserialize = "C: Deserialize<'de> + Default"))]
pub struct Section<C> {
    /// Input role to file name (without extension).
    #[serde(default)]
    pub input: BTreeMap<String, String>,
    /// Output role to file name (without extension).
    #[serde(default)]
    pub output: BTreeMap<String, String>,
    #[serde(default)]
    pub coefficients: C,
}

impl<C> Section<C> {
    pub fn input_name<'a>(&'a self, role: &'a str) -> &'a str {
        self.input.get(role).map_or(role, String::as_str)
    }

    pub fn output_name<'a>(&'a self, role: &'a str) -> &'a str {
        self.output.get(role).map_or(role, String::as_str)
    }

    fn expand(&mut self) {
        for name in self.input.values_mut().chain(self.output.values_mut()) {
            *name = expand(name);
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Project {
    pub input: Input,
    pub output: Output,
    pub cooling_in_urban_areas: Option<Section<cooling::Coefficients>>,
    pub mortality_reduction: Option<Section<mortality::Coefficients>>,
    pub pm_retention: Option<Section<pm_retention::Coefficients>>,
}

impl Project {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ProjectError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ProjectError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let mut project: Project =
            serde_json::from_str(&text).map_err(|source| ProjectError::Parse {
                path: path.to_path_buf(),
                source,
            })?;
        project.expand();
        Ok(project)
    }

    pub fn cooling(&self) -> Result<&Section<cooling::Coefficients>, ProjectError> {
        self.cooling_in_urban_areas
            .as_ref()
            .ok_or(ProjectError::MissingSection("cooling_in_urban_areas"))
    }

    pub fn mortality(&self) -> Result<&Section<mortality::Coefficients>, ProjectError> {
        self.mortality_reduction
            .as_ref()
            .ok_or(ProjectError::MissingSection("mortality_reduction"))
    }

    pub fn pm(&self) -> Result<&Section<pm_retention::Coefficients>, ProjectError> {
        self.pm_retention
            .as_ref()
            .ok_or(ProjectError::MissingSection("pm_retention"))
    }

    pub fn input_raster<C>(&self, section: &Section<C>, role: &str) -> PathBuf {
        let mut path = self.input_dir().join(&self.input.raster);
        path.push(format!("{}.asc", section.input_name(role)));
        path
    }

    pub fn input_table<C>(&self, section: &Section<C>, role: &str) -> PathBuf {
        let mut path = self.input_dir().join(&self.input.table);
        path.push(format!("{}.tab", section.input_name(role)));
        path
    }

    pub fn output_raster_dir(&self) -> PathBuf {
        [&self.output.workspace, &self.output.directory, &self.output.raster]
            .iter()
            .collect()
    }

    pub fn output_raster<C>(&self, section: &Section<C>, role: &str) -> PathBuf {
        let mut path = self.output_raster_dir();
        path.push(format!("{}.asc", section.output_name(role)));
        path
    }
}

/// Private API.
impl Project {
    fn input_dir(&self) -> PathBuf {
        [&self.input.workspace, &self.input.directory].iter().collect()
    }

    fn expand(&mut self) {
        for part in [
            &mut self.input.workspace,
            &mut self.input.directory,
            &mut self.input.raster,
            &mut self.input.table,
            &mut self.output.workspace,
            &mut self.output.directory,
            &mut self.output.raster,
        ] {
            *part = expand(part);
        }
        if let Some(section) = &mut self.cooling_in_urban_areas {
            section.expand();
        }
        if let Some(section) = &mut self.mortality_reduction {
            section.expand();
        }
        if let Some(section) = &mut self.pm_retention {
            section.expand();
        }
    }
}

/// Replaces `$VAR` and `${VAR}` with their values. Unset variables are
/// left as written.
fn expand(text: &str) -> String {
    shellexpand::env_with_context_no_errors(text, |var| std::env::var(var).ok()).into_owned()
}

#[cfg(test)]
mod tests {
    use super::{expand, Project, ProjectError};
    use raster::ErrorKind;
    use std::{io::Write, path::PathBuf};

    const PROJECT: &str = r#"{
        "input": {
            "workspace": "${NCM_PROJECT_TEST_WS}",
            "directory": "in",
            "raster": "raster",
            "table": "table"
        },
        "output": {
            "workspace": "$NCM_PROJECT_TEST_WS",
            "directory": "out",
            "raster": "raster"
        },
        "mortality_reduction": {
            "input": { "population": "pop_$NCM_PROJECT_TEST_YEAR" },
            "output": { "mortality_reduction": "mr" },
            "coefficients": { "window_distance": 150.0 }
        }
    }"#;

    fn load(text: &str) -> Result<Project, ProjectError> {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(text.as_bytes()).unwrap();
        Project::load(file.path())
    }

    #[test]
    fn test_paths() {
        std::env::set_var("NCM_PROJECT_TEST_WS", "/data/ncm");
        std::env::set_var("NCM_PROJECT_TEST_YEAR", "2022");
        let project = load(PROJECT).unwrap();
        let section = project.mortality().unwrap();

        assert_eq!(
            project.input_raster(section, "population"),
            PathBuf::from("/data/ncm/in/raster/pop_2022.asc")
        );
        assert_eq!(
            project.input_raster(section, "ndvi"),
            PathBuf::from("/data/ncm/in/raster/ndvi.asc")
        );
        assert_eq!(
            project.input_table(section, "ndvi"),
            PathBuf::from("/data/ncm/in/table/ndvi.tab")
        );
        assert_eq!(
            project.output_raster(section, "mortality_reduction"),
            PathBuf::from("/data/ncm/out/raster/mr.asc")
        );
        assert_eq!(section.coefficients.window_distance, 150.0);
        assert_eq!(section.coefficients.ndvi_step, 0.1);
    }

    #[test]
    fn test_missing_section() {
        std::env::set_var("NCM_PROJECT_TEST_WS", "/data/ncm");
        let project = load(PROJECT).unwrap();
        let err = project.pm().unwrap_err();
        assert!(matches!(err, ProjectError::MissingSection("pm_retention")));
        assert_eq!(err.kind(), ErrorKind::Config);
    }

    #[test]
    fn test_unknown_coefficient() {
        let err = load(&PROJECT.replace("window_distance", "window_distanse")).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Config);
    }

    #[test]
    fn test_unknown_variable_is_kept() {
        assert_eq!(expand("$NCM_SURELY_UNSET_VARIABLE/in"), "$NCM_SURELY_UNSET_VARIABLE/in");
    }
}
