//! Cell-by-cell arithmetic, selection and reductions.
//!
//! Everything here propagates no-data: a cell which is no-data in any
//! operand is no-data in the result, unless the operation exists to
//! substitute a value (`fill_undefined`, `if_then_else`).

use crate::{BooleanGrid, CellValue, Grid, RasterError, ScalarGrid};
use std::ops::{Add, Div, Mul, Neg, Sub};

impl<T: CellValue> Grid<T> {
    /// Replaces every no-data cell with `value`.
    pub fn fill_undefined(&self, value: T) -> Self {
        let cells = self.cells().iter().map(|c| c.or(Some(value))).collect();
        Self::from_parts(*self.spec(), cells)
    }

    /// Replaces no-data cells with `value` wherever `mask` is true.
    ///
    /// Cells outside the mask keep their value (or lack of one).
    pub fn fill_undefined_within(&self, mask: &BooleanGrid, value: T) -> Result<Self, RasterError> {
        self.spec().ensure_same(mask.spec())?;
        let cells = self
            .cells()
            .iter()
            .zip(mask.cells())
            .map(|(c, m)| match (c, m) {
                (None, Some(true)) => Some(value),
                _ => *c,
            })
            .collect();
        Ok(Self::from_parts(*self.spec(), cells))
    }

    /// Returns `a` where `cond` is true, no-data elsewhere.
    pub fn if_then(cond: &BooleanGrid, a: &Self) -> Result<Self, RasterError> {
        cond.spec().ensure_same(a.spec())?;
        let cells = cond
            .cells()
            .iter()
            .zip(a.cells())
            .map(|(c, a)| match c {
                Some(true) => *a,
                _ => None,
            })
            .collect();
        Ok(Self::from_parts(*a.spec(), cells))
    }

    /// Returns `a` where `cond` is true, `b` where it is false, and
    /// no-data where `cond` is no-data.
    pub fn if_then_else(cond: &BooleanGrid, a: &Self, b: &Self) -> Result<Self, RasterError> {
        cond.spec().ensure_same(a.spec())?;
        cond.spec().ensure_same(b.spec())?;
        let cells = cond
            .cells()
            .iter()
            .zip(a.cells().iter().zip(b.cells()))
            .map(|(c, (a, b))| match c {
                Some(true) => *a,
                Some(false) => *b,
                None => None,
            })
            .collect();
        Ok(Self::from_parts(*a.spec(), cells))
    }
}

#[allow(clippy::should_implement_trait)]
impl ScalarGrid {
    pub fn add(&self, rhs: &Self) -> Result<Self, RasterError> {
        self.zip_with(rhs, |a, b| a + b)
    }

    pub fn sub(&self, rhs: &Self) -> Result<Self, RasterError> {
        self.zip_with(rhs, |a, b| a - b)
    }

    pub fn mul(&self, rhs: &Self) -> Result<Self, RasterError> {
        self.zip_with(rhs, |a, b| a * b)
    }

    /// Division by zero yields no-data.
    pub fn div(&self, rhs: &Self) -> Result<Self, RasterError> {
        self.zip_with(rhs, |a, b| a / b)
    }

    /// Cell-wise minimum of two grids.
    pub fn min_with(&self, rhs: &Self) -> Result<Self, RasterError> {
        self.zip_with(rhs, f64::min)
    }

    /// Cell-wise maximum of two grids.
    pub fn max_with(&self, rhs: &Self) -> Result<Self, RasterError> {
        self.zip_with(rhs, f64::max)
    }

    /// Natural logarithm; non-positive values become no-data.
    pub fn ln(&self) -> Self {
        self.map(f64::ln)
    }

    /// Base 10 logarithm; non-positive values become no-data.
    pub fn log10(&self) -> Self {
        self.map(f64::log10)
    }

    pub fn abs(&self) -> Self {
        self.map(f64::abs)
    }

    /// Raises every value below `floor` to `floor`.
    ///
    /// `clamp_min(0.0)` is the zero-floor clamp applied to physically
    /// non-negative quantities after aggregation.
    pub fn clamp_min(&self, floor: f64) -> Self {
        self.map(|v| v.max(floor))
    }

    /// Lowers every value above `ceiling` to `ceiling`.
    pub fn clamp_max(&self, ceiling: f64) -> Self {
        self.map(|v| v.min(ceiling))
    }

    pub fn gt(&self, value: f64) -> BooleanGrid {
        self.map(|v| v > value)
    }

    pub fn ge(&self, value: f64) -> BooleanGrid {
        self.map(|v| v >= value)
    }

    pub fn lt(&self, value: f64) -> BooleanGrid {
        self.map(|v| v < value)
    }

    pub fn le(&self, value: f64) -> BooleanGrid {
        self.map(|v| v <= value)
    }

    pub fn gt_grid(&self, rhs: &Self) -> Result<BooleanGrid, RasterError> {
        self.zip_with(rhs, |a, b| a > b)
    }

    pub fn lt_grid(&self, rhs: &Self) -> Result<BooleanGrid, RasterError> {
        self.zip_with(rhs, |a, b| a < b)
    }

    /// Sum over all defined cells.
    pub fn total(&self) -> Option<f64> {
        let mut values = self.defined_values().peekable();
        values.peek()?;
        Some(values.sum())
    }

    pub fn minimum(&self) -> Option<f64> {
        self.defined_values().reduce(f64::min)
    }

    pub fn maximum(&self) -> Option<f64> {
        self.defined_values().reduce(f64::max)
    }

    #[allow(clippy::cast_precision_loss)]
    pub fn mean(&self) -> Option<f64> {
        let count = self.defined_count();
        self.total().map(|total| total / count as f64)
    }
}

#[allow(clippy::should_implement_trait)]
impl BooleanGrid {
    pub fn and(&self, rhs: &Self) -> Result<Self, RasterError> {
        self.zip_with(rhs, |a, b| a && b)
    }

    pub fn or(&self, rhs: &Self) -> Result<Self, RasterError> {
        self.zip_with(rhs, |a, b| a || b)
    }

    pub fn not(&self) -> Self {
        self.map(|v| !v)
    }
}

macro_rules! scalar_ops {
    ($($trait:ident, $method:ident, $op:tt;)*) => {$(
        impl $trait<f64> for &ScalarGrid {
            type Output = ScalarGrid;

            fn $method(self, rhs: f64) -> ScalarGrid {
                self.map(|v| v $op rhs)
            }
        }

        impl $trait<&ScalarGrid> for f64 {
            type Output = ScalarGrid;

            fn $method(self, rhs: &ScalarGrid) -> ScalarGrid {
                rhs.map(|v| self $op v)
            }
        }
    )*};
}

scalar_ops! {
    Add, add, +;
    Sub, sub, -;
    Mul, mul, *;
    Div, div, /;
}

impl Neg for &ScalarGrid {
    type Output = ScalarGrid;

    fn neg(self) -> ScalarGrid {
        self.map(|v| -v)
    }
}
