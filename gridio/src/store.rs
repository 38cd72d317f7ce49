//! Read-only cache of loaded grids and tables.

use crate::{ascii, table, GridIoError};
use dashmap::DashMap;
use log::debug;
use raster::{AnyGrid, LookupTable, ValueKind};
use std::{
    path::{Path, PathBuf},
    sync::Arc,
};

/// Loads each grid and table at most once.
///
/// Entries are never replaced or mutated after insertion, so handing
/// out `Arc`s to them is safe from any thread.
#[derive(Default)]
pub struct Store {
    grids: DashMap<(PathBuf, ValueKind), Arc<AnyGrid>>,
    tables: DashMap<PathBuf, Arc<LookupTable>>,
}

impl Store {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the grid at `path` read as `kind`, loading it on first
    /// use.
    pub fn grid<P: AsRef<Path>>(
        &self,
        path: P,
        kind: ValueKind,
    ) -> Result<Arc<AnyGrid>, GridIoError> {
        let path = path.as_ref();
        self.grids
            .entry((path.to_path_buf(), kind))
            .or_try_insert_with(|| {
                debug!("loading {kind} grid {path:?}");
                ascii::read_grid(path, kind).map(Arc::new)
            })
            .map(|r| r.clone())
    }

    /// Returns the lookup table at `path`, loading it on first use.
    pub fn table<P: AsRef<Path>>(&self, path: P) -> Result<Arc<LookupTable>, GridIoError> {
        let path = path.as_ref();
        self.tables
            .entry(path.to_path_buf())
            .or_try_insert_with(|| {
                debug!("loading table {path:?}");
                table::read_lookup_table(path).map(Arc::new)
            })
            .map(|r| r.clone())
    }

    /// Number of cached grids and tables.
    pub fn len(&self) -> usize {
        self.grids.len() + self.tables.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
