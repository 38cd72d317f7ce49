//! Georeferenced grids with explicit no-data cells.

use crate::RasterError;
use geo::geometry::Coord;
use num_traits::ToPrimitive;
use std::fmt;

mod sealed {
    pub trait Sealed {}
    impl Sealed for bool {}
    impl Sealed for i32 {}
    impl Sealed for f64 {}
}

/// The value scale of a grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValueKind {
    Boolean,
    Nominal,
    Scalar,
}

impl fmt::Display for ValueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Boolean => "boolean",
            Self::Nominal => "nominal",
            Self::Scalar => "scalar",
        };
        f.write_str(name)
    }
}

/// A type that can be stored in a [`Grid`] cell.
///
/// Implemented for exactly `bool` (boolean), `i32` (nominal) and
/// `f64` (scalar).
pub trait CellValue: sealed::Sealed + Copy + PartialEq + fmt::Debug + Send + Sync + 'static {
    const KIND: ValueKind;

    fn to_f64(self) -> f64;

    /// Returns `None` for values that must be stored as no-data.
    fn checked(self) -> Option<Self> {
        Some(self)
    }
}

impl CellValue for bool {
    const KIND: ValueKind = ValueKind::Boolean;

    fn to_f64(self) -> f64 {
        if self {
            1.0
        } else {
            0.0
        }
    }
}

impl CellValue for i32 {
    const KIND: ValueKind = ValueKind::Nominal;

    fn to_f64(self) -> f64 {
        f64::from(self)
    }
}

impl CellValue for f64 {
    const KIND: ValueKind = ValueKind::Scalar;

    fn to_f64(self) -> f64 {
        self
    }

    /// Numeric exceptions (NaN, ±inf) become no-data.
    fn checked(self) -> Option<Self> {
        self.is_finite().then_some(self)
    }
}

/// Shape and georeference shared by all grids taking part in one
/// operation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GridSpec {
    rows: usize,
    cols: usize,
    /// Width and height of a cell in map units (meters).
    cell_size: f64,
    /// North-west corner of the north-west cell.
    origin: Coord<f64>,
}

impl GridSpec {
    pub fn new(
        rows: usize,
        cols: usize,
        cell_size: f64,
        origin: Coord<f64>,
    ) -> Result<Self, RasterError> {
        if rows == 0 || cols == 0 {
            return Err(RasterError::InvalidSpec(format!(
                "grid must have at least one cell, got {rows}x{cols}"
            )));
        }
        if rows.checked_mul(cols).is_none() {
            return Err(RasterError::InvalidSpec(format!(
                "{rows}x{cols} cells can't be addressed"
            )));
        }
        if !(cell_size.is_finite() && cell_size > 0.0) {
            return Err(RasterError::InvalidSpec(format!(
                "cell size must be positive, got {cell_size}"
            )));
        }
        if !(origin.x.is_finite() && origin.y.is_finite()) {
            return Err(RasterError::InvalidSpec(format!(
                "origin must be finite, got {origin:?}"
            )));
        }
        Ok(Self {
            rows,
            cols,
            cell_size,
            origin,
        })
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    pub fn cell_size(&self) -> f64 {
        self.cell_size
    }

    pub fn origin(&self) -> Coord<f64> {
        self.origin
    }

    /// Returns the number of cells.
    #[allow(clippy::len_without_is_empty)]
    pub fn len(&self) -> usize {
        self.rows * self.cols
    }

    /// Returns the center of the cell at `(row, col)`.
    #[allow(clippy::cast_precision_loss)]
    pub fn cell_center(&self, row: usize, col: usize) -> Coord<f64> {
        Coord {
            x: self.origin.x + (col as f64 + 0.5) * self.cell_size,
            y: self.origin.y - (row as f64 + 0.5) * self.cell_size,
        }
    }

    /// Returns the south-east corner of the south-east cell.
    #[allow(clippy::cast_precision_loss)]
    pub fn south_east(&self) -> Coord<f64> {
        Coord {
            x: self.origin.x + self.cols as f64 * self.cell_size,
            y: self.origin.y - self.rows as f64 * self.cell_size,
        }
    }

    /// Fails unless `other` describes the same clone as `self`.
    pub fn ensure_same(&self, other: &GridSpec) -> Result<(), RasterError> {
        if self == other {
            Ok(())
        } else {
            Err(RasterError::GeometryMismatch {
                expected: *self,
                actual: *other,
            })
        }
    }

    pub(crate) fn index(&self, row: usize, col: usize) -> usize {
        row * self.cols + col
    }
}

impl fmt::Display for GridSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}x{} cells of {} at ({}, {})",
            self.rows, self.cols, self.cell_size, self.origin.x, self.origin.y
        )
    }
}

/// A 2-D, row-major raster of `T` cells, where `None` is no-data.
#[derive(Debug, Clone, PartialEq)]
pub struct Grid<T: CellValue> {
    spec: GridSpec,
    cells: Vec<Option<T>>,
}

pub type BooleanGrid = Grid<bool>;
pub type NominalGrid = Grid<i32>;
pub type ScalarGrid = Grid<f64>;

impl<T: CellValue> Grid<T> {
    /// Returns a grid holding `cells` in row-major order.
    pub fn new(spec: GridSpec, cells: Vec<Option<T>>) -> Result<Self, RasterError> {
        if cells.len() != spec.len() {
            return Err(RasterError::CellCount {
                expected: spec.len(),
                actual: cells.len(),
            });
        }
        let cells = cells.into_iter().map(|c| c.and_then(T::checked)).collect();
        Ok(Self { spec, cells })
    }

    /// Returns a grid with `value` in every cell.
    pub fn filled(spec: GridSpec, value: T) -> Self {
        Self {
            spec,
            cells: vec![value.checked(); spec.len()],
        }
    }

    /// Returns a grid where every cell is no-data.
    pub fn undefined(spec: GridSpec) -> Self {
        Self {
            spec,
            cells: vec![None; spec.len()],
        }
    }

    /// Returns a grid whose cells are produced by `f(row, col)`.
    pub fn from_fn(spec: GridSpec, mut f: impl FnMut(usize, usize) -> Option<T>) -> Self {
        let mut cells = Vec::with_capacity(spec.len());
        for row in 0..spec.rows {
            for col in 0..spec.cols {
                cells.push(f(row, col).and_then(T::checked));
            }
        }
        Self { spec, cells }
    }

    /// Builds a grid from a cell vector already known to match `spec`.
    pub(crate) fn from_parts(spec: GridSpec, cells: Vec<Option<T>>) -> Self {
        debug_assert_eq!(cells.len(), spec.len());
        let cells = cells.into_iter().map(|c| c.and_then(T::checked)).collect();
        Self { spec, cells }
    }

    pub fn spec(&self) -> &GridSpec {
        &self.spec
    }

    pub fn rows(&self) -> usize {
        self.spec.rows
    }

    pub fn cols(&self) -> usize {
        self.spec.cols
    }

    pub fn cell_size(&self) -> f64 {
        self.spec.cell_size
    }

    pub fn kind(&self) -> ValueKind {
        T::KIND
    }

    /// Returns the value at `(row, col)`, or `None` when the cell is
    /// no-data or out of bounds.
    pub fn get(&self, row: usize, col: usize) -> Option<T> {
        if row < self.spec.rows && col < self.spec.cols {
            self.cells[self.spec.index(row, col)]
        } else {
            None
        }
    }

    /// Sets the cell at `(row, col)`.
    ///
    /// # Panics
    ///
    /// Panics if `(row, col)` is out of bounds.
    pub fn set(&mut self, row: usize, col: usize, value: Option<T>) {
        assert!(
            row < self.spec.rows && col < self.spec.cols,
            "cell ({row}, {col}) outside {}",
            self.spec
        );
        let idx = self.spec.index(row, col);
        self.cells[idx] = value.and_then(T::checked);
    }

    pub fn is_defined(&self, row: usize, col: usize) -> bool {
        self.get(row, col).is_some()
    }

    /// Row-major cell values.
    pub fn cells(&self) -> &[Option<T>] {
        &self.cells
    }

    /// Iterates over the defined values only.
    pub fn defined_values(&self) -> impl Iterator<Item = T> + '_ {
        self.cells.iter().filter_map(|c| *c)
    }

    pub fn defined_count(&self) -> usize {
        self.cells.iter().filter(|c| c.is_some()).count()
    }

    /// Returns a boolean grid, defined everywhere, which is true where
    /// `self` has a value.
    pub fn defined(&self) -> BooleanGrid {
        Grid {
            spec: self.spec,
            cells: self.cells.iter().map(|c| Some(c.is_some())).collect(),
        }
    }

    /// Applies `f` to every defined cell.
    pub fn map<U: CellValue>(&self, f: impl Fn(T) -> U) -> Grid<U> {
        self.filter_map(|v| Some(f(v)))
    }

    /// Applies `f` to every defined cell; `None` results become
    /// no-data.
    pub fn filter_map<U: CellValue>(&self, f: impl Fn(T) -> Option<U>) -> Grid<U> {
        Grid {
            spec: self.spec,
            cells: self
                .cells
                .iter()
                .map(|c| c.and_then(&f).and_then(U::checked))
                .collect(),
        }
    }

    /// Combines two grids cell by cell. A cell which is no-data in
    /// either input is no-data in the result.
    pub fn zip_with<U: CellValue, V: CellValue>(
        &self,
        other: &Grid<U>,
        f: impl Fn(T, U) -> V,
    ) -> Result<Grid<V>, RasterError> {
        self.spec.ensure_same(&other.spec)?;
        Ok(Grid {
            spec: self.spec,
            cells: self
                .cells
                .iter()
                .zip(other.cells.iter())
                .map(|(a, b)| match (a, b) {
                    (Some(a), Some(b)) => f(*a, *b).checked(),
                    _ => None,
                })
                .collect(),
        })
    }

    /// Returns a grid with `value` wherever `self` is defined.
    pub fn as_raster<U: CellValue>(&self, value: U) -> Grid<U> {
        self.map(|_| value)
    }

    /// Returns a scalar grid with zero wherever `self` is defined.
    pub fn zeros(&self) -> ScalarGrid {
        self.as_raster(0.0)
    }

    /// Converts cell values to scalars (`true` is 1, `false` is 0).
    pub fn cast_scalar(&self) -> ScalarGrid {
        self.map(T::to_f64)
    }
}

impl ScalarGrid {
    /// Builds a scalar grid from raw samples of any numeric type.
    ///
    /// Samples equal to `nodata`, or which don't fit in an `f64`,
    /// become no-data.
    pub fn from_samples<S: ToPrimitive>(
        spec: GridSpec,
        samples: &[S],
        nodata: Option<f64>,
    ) -> Result<Self, RasterError> {
        let cells = samples
            .iter()
            .map(|s| s.to_f64().filter(|v| Some(*v) != nodata))
            .collect();
        Self::new(spec, cells)
    }
}

/// A grid whose value kind is only known at run time, such as one
/// just read from disk.
#[derive(Debug, Clone, PartialEq)]
pub enum AnyGrid {
    Boolean(BooleanGrid),
    Nominal(NominalGrid),
    Scalar(ScalarGrid),
}

impl AnyGrid {
    pub fn kind(&self) -> ValueKind {
        match self {
            Self::Boolean(_) => ValueKind::Boolean,
            Self::Nominal(_) => ValueKind::Nominal,
            Self::Scalar(_) => ValueKind::Scalar,
        }
    }

    pub fn spec(&self) -> &GridSpec {
        match self {
            Self::Boolean(g) => g.spec(),
            Self::Nominal(g) => g.spec(),
            Self::Scalar(g) => g.spec(),
        }
    }

    pub fn as_boolean(&self) -> Result<&BooleanGrid, RasterError> {
        match self {
            Self::Boolean(g) => Ok(g),
            other => Err(other.mismatch(ValueKind::Boolean)),
        }
    }

    pub fn as_nominal(&self) -> Result<&NominalGrid, RasterError> {
        match self {
            Self::Nominal(g) => Ok(g),
            other => Err(other.mismatch(ValueKind::Nominal)),
        }
    }

    pub fn as_scalar(&self) -> Result<&ScalarGrid, RasterError> {
        match self {
            Self::Scalar(g) => Ok(g),
            other => Err(other.mismatch(ValueKind::Scalar)),
        }
    }

    pub fn into_boolean(self) -> Result<BooleanGrid, RasterError> {
        match self {
            Self::Boolean(g) => Ok(g),
            other => Err(other.mismatch(ValueKind::Boolean)),
        }
    }

    pub fn into_nominal(self) -> Result<NominalGrid, RasterError> {
        match self {
            Self::Nominal(g) => Ok(g),
            other => Err(other.mismatch(ValueKind::Nominal)),
        }
    }

    pub fn into_scalar(self) -> Result<ScalarGrid, RasterError> {
        match self {
            Self::Scalar(g) => Ok(g),
            other => Err(other.mismatch(ValueKind::Scalar)),
        }
    }

    fn mismatch(&self, expected: ValueKind) -> RasterError {
        RasterError::KindMismatch {
            expected,
            actual: self.kind(),
        }
    }
}

impl From<BooleanGrid> for AnyGrid {
    fn from(grid: BooleanGrid) -> Self {
        Self::Boolean(grid)
    }
}

impl From<NominalGrid> for AnyGrid {
    fn from(grid: NominalGrid) -> Self {
        Self::Nominal(grid)
    }
}

impl From<ScalarGrid> for AnyGrid {
    fn from(grid: ScalarGrid) -> Self {
        Self::Scalar(grid)
    }
}
