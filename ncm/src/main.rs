mod options;
mod project;
mod run;

use anyhow::Result;
use clap::Parser;
use gridio::GridIoError;
use options::Cli;
use project::ProjectError;
use raster::{ErrorKind, RasterError};
use std::process::ExitCode;

fn main() -> ExitCode {
    env_logger::init();
    let cli = Cli::parse();
    let result: Result<()> = match cli {
        Cli::CoolingInUrbanAreas(cooling) => cooling.run(),
        Cli::MortalityReduction(mortality) => mortality.run(),
        Cli::PmRetention(pm_retention) => pm_retention.run(),
    };
    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) if kind(&err).is_some() => {
            eprintln!("error: {err:#}");
            ExitCode::from(1)
        }
        Err(err) => {
            eprintln!("error: {err:?}");
            ExitCode::from(2)
        }
    }
}

/// The kind of the first known error in `err`'s chain.
fn kind(err: &anyhow::Error) -> Option<ErrorKind> {
    err.chain().find_map(|cause| {
        if let Some(err) = cause.downcast_ref::<GridIoError>() {
            Some(err.kind())
        } else if let Some(err) = cause.downcast_ref::<RasterError>() {
            Some(err.kind())
        } else {
            cause.downcast_ref::<ProjectError>().map(ProjectError::kind)
        }
    })
}

#[cfg(test)]
mod tests {
    use super::kind;
    use crate::project::ProjectError;
    use anyhow::{anyhow, Context};
    use gridio::GridIoError;
    use raster::{Bound, ErrorKind, RasterError};
    use std::io;

    fn wrapped<E>(err: E) -> anyhow::Error
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Err::<(), E>(err)
            .context("reading ndvi")
            .context("running mortality_reduction")
            .unwrap_err()
    }

    #[test]
    fn test_known_errors_are_classified() {
        let range = RasterError::RangeViolation {
            subject: "ndvi".to_owned(),
            value: 1.5,
            bound: Bound::Upper(1.0),
        };
        assert_eq!(kind(&wrapped(range)), Some(ErrorKind::Range));

        let io = GridIoError::from(io::Error::new(io::ErrorKind::NotFound, "ndvi.asc"));
        assert_eq!(kind(&wrapped(io)), Some(ErrorKind::Io));

        let parse = GridIoError::Parse {
            path: "wind_class.tab".into(),
            line: 3,
            msg: "invalid value".to_owned(),
        };
        assert_eq!(kind(&wrapped(parse)), Some(ErrorKind::Config));

        let section = ProjectError::MissingSection("pm_retention");
        assert_eq!(kind(&wrapped(section)), Some(ErrorKind::Config));
    }

    #[test]
    fn test_raster_error_wrapped_by_io_layer() {
        let err = GridIoError::from(RasterError::InvalidWindow {
            length: 0.0,
            cell_size: 10.0,
        });
        assert_eq!(kind(&wrapped(err)), Some(ErrorKind::Config));
    }

    #[test]
    fn test_unknown_errors_are_unclassified() {
        assert_eq!(kind(&anyhow!("thread pool poisoned")), None);
        let err = wrapped(std::fmt::Error);
        assert_eq!(kind(&err), None);
    }
}
