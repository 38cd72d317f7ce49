//! Raster engine for ecosystem service models.
//!
//! Grids carry an explicit no-data state per cell. Everything built on
//! them ([`algebra`], [`window`], [`lookup`], [`validate`]) treats
//! no-data as "unknown" and never as zero.

pub mod algebra;
mod error;
mod grid;
pub mod lookup;
pub mod validate;
pub mod window;

pub use crate::{
    error::{Bound, ErrorKind, RasterError},
    grid::{AnyGrid, BooleanGrid, CellValue, Grid, GridSpec, NominalGrid, ScalarGrid, ValueKind},
    lookup::{lookup_boolean, lookup_scalar, ClassKey, Limit, LookupTable},
    validate::{assert_at_least, assert_at_most, assert_in_range, named, Checkable, Named},
    window::{windowed_average, windowed_sum, Window, WindowShape},
};
