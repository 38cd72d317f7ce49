//! Ecosystem service models.
//!
//! Each model is a pure function from borrowed input grids and lookup
//! tables to owned output grids. Inputs are range checked before any
//! computation and outputs are checked again before they are returned.

pub mod cooling;
pub mod mortality;
pub mod pm_retention;

use raster::{GridSpec, RasterError, ScalarGrid};

/// A named model result.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Output<'a> {
    Grid(&'a ScalarGrid),

    /// A map-wide value; `None` when every contributing cell was
    /// no-data.
    Scalar(Option<f64>),
}

/// Fails unless every spec equals the first.
fn same_clone(specs: &[&GridSpec]) -> Result<(), RasterError> {
    if let Some((first, rest)) = specs.split_first() {
        for spec in rest {
            first.ensure_same(spec)?;
        }
    }
    Ok(())
}

#[cfg(test)]
pub(crate) mod test_util {
    use geo::geometry::Coord;
    use raster::{ClassKey, GridSpec, LookupTable};

    pub fn spec(rows: usize, cols: usize) -> GridSpec {
        GridSpec::new(
            rows,
            cols,
            10.0,
            Coord {
                x: 155_000.0,
                y: 463_000.0,
            },
        )
        .unwrap()
    }

    pub fn table(rows: &[(i64, f64)]) -> LookupTable {
        LookupTable::new(
            rows.iter()
                .map(|(key, value)| (ClassKey::Exact(*key), *value))
                .collect(),
        )
        .unwrap()
    }
}
