//! Range assertions over grids and scalars.
//!
//! Only defined values are checked, so a grid holding nothing but
//! no-data always passes.

use crate::{error::Bound, NominalGrid, RasterError, ScalarGrid};

/// Callback receiving a subject and the smallest and largest defined
/// value found under it.
pub type Visit<'v> = dyn FnMut(&str, f64, f64) -> Result<(), RasterError> + 'v;

/// Something whose defined values can be range checked.
pub trait Checkable {
    /// Calls `visit` once per checked item that holds at least one
    /// defined value.
    fn extremes(&self, subject: &str, visit: &mut Visit<'_>) -> Result<(), RasterError>;
}

impl Checkable for f64 {
    fn extremes(&self, subject: &str, visit: &mut Visit<'_>) -> Result<(), RasterError> {
        if self.is_nan() {
            Ok(())
        } else {
            visit(subject, *self, *self)
        }
    }
}

impl Checkable for f32 {
    fn extremes(&self, subject: &str, visit: &mut Visit<'_>) -> Result<(), RasterError> {
        f64::from(*self).extremes(subject, visit)
    }
}

impl Checkable for ScalarGrid {
    fn extremes(&self, subject: &str, visit: &mut Visit<'_>) -> Result<(), RasterError> {
        match (self.minimum(), self.maximum()) {
            (Some(min), Some(max)) => visit(subject, min, max),
            _ => Ok(()),
        }
    }
}

impl Checkable for NominalGrid {
    fn extremes(&self, subject: &str, visit: &mut Visit<'_>) -> Result<(), RasterError> {
        match (self.defined_values().min(), self.defined_values().max()) {
            (Some(min), Some(max)) => visit(subject, f64::from(min), f64::from(max)),
            _ => Ok(()),
        }
    }
}

impl<T: Checkable> Checkable for [T] {
    fn extremes(&self, subject: &str, visit: &mut Visit<'_>) -> Result<(), RasterError> {
        for (i, item) in self.iter().enumerate() {
            item.extremes(&format!("{subject}[{i}]"), visit)?;
        }
        Ok(())
    }
}

impl<T: Checkable, const N: usize> Checkable for [T; N] {
    fn extremes(&self, subject: &str, visit: &mut Visit<'_>) -> Result<(), RasterError> {
        self.as_slice().extremes(subject, visit)
    }
}

impl<T: Checkable> Checkable for Vec<T> {
    fn extremes(&self, subject: &str, visit: &mut Visit<'_>) -> Result<(), RasterError> {
        self.as_slice().extremes(subject, visit)
    }
}

impl<T: Checkable + ?Sized> Checkable for &T {
    fn extremes(&self, subject: &str, visit: &mut Visit<'_>) -> Result<(), RasterError> {
        (**self).extremes(subject, visit)
    }
}

/// Attaches a label to a value, reported on violation.
pub struct Named<'a, T: ?Sized> {
    label: &'a str,
    value: &'a T,
}

pub fn named<'a, T: Checkable + ?Sized>(label: &'a str, value: &'a T) -> Named<'a, T> {
    Named { label, value }
}

impl<T: Checkable + ?Sized> Checkable for Named<'_, T> {
    fn extremes(&self, _subject: &str, visit: &mut Visit<'_>) -> Result<(), RasterError> {
        self.value.extremes(self.label, visit)
    }
}

pub fn assert_at_least<C: Checkable + ?Sized>(values: &C, low: f64) -> Result<(), RasterError> {
    values.extremes("value", &mut |subject, min, _| {
        if min < low {
            Err(RasterError::RangeViolation {
                subject: subject.to_owned(),
                value: min,
                bound: Bound::Lower(low),
            })
        } else {
            Ok(())
        }
    })
}

pub fn assert_at_most<C: Checkable + ?Sized>(values: &C, high: f64) -> Result<(), RasterError> {
    values.extremes("value", &mut |subject, _, max| {
        if max > high {
            Err(RasterError::RangeViolation {
                subject: subject.to_owned(),
                value: max,
                bound: Bound::Upper(high),
            })
        } else {
            Ok(())
        }
    })
}

/// Asserts `low <= v <= high` for every defined value.
pub fn assert_in_range<C: Checkable + ?Sized>(
    values: &C,
    low: f64,
    high: f64,
) -> Result<(), RasterError> {
    assert_at_least(values, low)?;
    assert_at_most(values, high)
}

#[cfg(test)]
mod tests {
    use super::{assert_at_least, assert_at_most, assert_in_range, named, Checkable};
    use crate::{error::Bound, GridSpec, NominalGrid, RasterError, ScalarGrid};
    use geo::geometry::Coord;

    fn spec() -> GridSpec {
        GridSpec::new(2, 2, 1.0, Coord { x: 0.0, y: 0.0 }).unwrap()
    }

    fn grid(values: [Option<f64>; 4]) -> ScalarGrid {
        ScalarGrid::new(spec(), values.to_vec()).unwrap()
    }

    #[test]
    fn test_scalar_bounds() {
        assert!(assert_in_range(&0.5, 0.0, 1.0).is_ok());
        assert!(assert_in_range(&0.0, 0.0, 1.0).is_ok());
        assert!(assert_at_least(&-0.1, 0.0).is_err());
        assert!(assert_at_most(&1.5_f32, 1.0).is_err());
        assert!(assert_at_least(&f64::NAN, 0.0).is_ok());
    }

    #[test]
    fn test_grid_checks_defined_cells_only() {
        let g = grid([Some(0.2), None, Some(0.9), None]);
        assert!(assert_in_range(&g, 0.0, 1.0).is_ok());
        assert!(assert_at_most(&g, 0.5).is_err());
    }

    #[test]
    fn test_undefined_grid_passes() {
        let g = ScalarGrid::undefined(spec());
        assert!(assert_in_range(&g, 0.0, 1.0).is_ok());
        assert!(assert_at_least(&NominalGrid::undefined(spec()), 100.0).is_ok());
    }

    #[test]
    fn test_sequences_recurse() {
        let a = grid([Some(0.0); 4]);
        let b = grid([Some(1.0), None, None, None]);
        let values: [&dyn Checkable; 3] = [&a, &b, &0.5];
        assert!(assert_in_range(&values, 0.0, 1.0).is_ok());

        let c = grid([Some(1.0), None, Some(-2.0), None]);
        let values: Vec<&dyn Checkable> = vec![&a, &c];
        match assert_in_range(&values, 0.0, 1.0) {
            Err(RasterError::RangeViolation {
                subject,
                value,
                bound,
            }) => {
                assert_eq!(subject, "value[1]");
                assert_eq!(value, -2.0);
                assert_eq!(bound, Bound::Lower(0.0));
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_named_subject() {
        let ndvi = grid([Some(1.5), None, None, None]);
        let err = assert_in_range(&[named("ndvi", &ndvi)], -1.0, 1.0).unwrap_err();
        assert_eq!(
            err.to_string(),
            "out of range value in ndvi: 1.5, expected <= 1"
        );
    }
}
