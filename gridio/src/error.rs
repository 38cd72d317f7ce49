use raster::{ErrorKind, RasterError};
use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum GridIoError {
    #[error("{0}")]
    Io(#[from] std::io::Error),

    #[error("{}:{line}: {msg}", path.display())]
    Parse {
        path: PathBuf,
        line: usize,
        msg: String,
    },

    #[error(transparent)]
    Raster(#[from] RasterError),
}

impl GridIoError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Io(_) => ErrorKind::Io,
            Self::Parse { .. } => ErrorKind::Config,
            Self::Raster(e) => e.kind(),
        }
    }
}
