//! Grid and lookup table files.

pub mod ascii;
mod error;
mod store;
pub mod table;

pub use crate::{
    ascii::{read_boolean, read_grid, read_nominal, read_scalar, write_grid},
    error::GridIoError,
    store::Store,
    table::read_lookup_table,
};
