//! Table driven reclassification.

use crate::{BooleanGrid, CellValue, Grid, RasterError, ScalarGrid};
use std::{cmp::Ordering, collections::BTreeMap, fmt};

/// One end of an interval key.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Limit {
    pub value: f64,
    pub inclusive: bool,
}

impl Limit {
    pub fn inclusive(value: f64) -> Self {
        Self {
            value,
            inclusive: true,
        }
    }

    pub fn exclusive(value: f64) -> Self {
        Self {
            value,
            inclusive: false,
        }
    }
}

/// The key of a lookup table row.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ClassKey {
    /// A class id; booleans are `0` and `1`.
    Exact(i64),

    /// A numeric class. A missing limit is unbounded.
    Interval {
        low: Option<Limit>,
        high: Option<Limit>,
    },
}

impl ClassKey {
    pub fn interval(low: Option<Limit>, high: Option<Limit>) -> Self {
        Self::Interval { low, high }
    }

    /// Returns true if `value` falls in this class.
    #[allow(clippy::cast_precision_loss)]
    pub fn matches(&self, value: f64) -> bool {
        match *self {
            Self::Exact(id) => value == id as f64,
            Self::Interval { low, high } => {
                let above = low.map_or(true, |l| {
                    value > l.value || (l.inclusive && value == l.value)
                });
                let below = high.map_or(true, |h| {
                    value < h.value || (h.inclusive && value == h.value)
                });
                above && below
            }
        }
    }

    /// Returns the key as a pair of limits, `None` meaning unbounded.
    #[allow(clippy::cast_precision_loss)]
    fn limits(&self) -> (Option<Limit>, Option<Limit>) {
        match *self {
            Self::Exact(id) => (
                Some(Limit::inclusive(id as f64)),
                Some(Limit::inclusive(id as f64)),
            ),
            Self::Interval { low, high } => (low, high),
        }
    }

    fn is_empty(&self) -> bool {
        match self.limits() {
            (Some(low), Some(high)) => is_empty(low, high),
            _ => false,
        }
    }

    fn overlaps(&self, other: &ClassKey) -> bool {
        let (a_low, a_high) = self.limits();
        let (b_low, b_high) = other.limits();
        let low = tighter(a_low, b_low, Ordering::Greater);
        let high = tighter(a_high, b_high, Ordering::Less);
        match (low, high) {
            (Some(low), Some(high)) => !is_empty(low, high),
            _ => true,
        }
    }
}

/// Picks the more restrictive of two limits, where `toward` is the
/// direction of restriction. At equal values exclusive wins.
fn tighter(a: Option<Limit>, b: Option<Limit>, toward: Ordering) -> Option<Limit> {
    match (a, b) {
        (Some(a), Some(b)) => match a.value.partial_cmp(&b.value) {
            Some(ord) if ord == toward => Some(a),
            Some(Ordering::Equal) => Some(Limit {
                value: a.value,
                inclusive: a.inclusive && b.inclusive,
            }),
            _ => Some(b),
        },
        (a, None) => a,
        (None, b) => b,
    }
}

fn is_empty(low: Limit, high: Limit) -> bool {
    match low.value.partial_cmp(&high.value) {
        Some(Ordering::Less) => false,
        Some(Ordering::Equal) => !(low.inclusive && high.inclusive),
        _ => true,
    }
}

impl fmt::Display for ClassKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Exact(id) => write!(f, "{id}"),
            Self::Interval { low, high } => {
                match low {
                    Some(Limit {
                        value,
                        inclusive: true,
                    }) => write!(f, "[{value},")?,
                    Some(Limit { value, .. }) => write!(f, "<{value},")?,
                    None => f.write_str("<,")?,
                }
                match high {
                    Some(Limit {
                        value,
                        inclusive: true,
                    }) => write!(f, "{value}]"),
                    Some(Limit { value, .. }) => write!(f, "{value}>"),
                    None => f.write_str(">"),
                }
            }
        }
    }
}

/// An immutable mapping from classes to values.
#[derive(Debug, Clone, PartialEq)]
pub struct LookupTable {
    /// Rows in the order they were given.
    entries: Vec<(ClassKey, f64)>,
    exact: BTreeMap<i64, f64>,
    intervals: Vec<(ClassKey, f64)>,
}

impl LookupTable {
    /// Builds a table, rejecting duplicate, overlapping, and empty
    /// keys.
    pub fn new(entries: Vec<(ClassKey, f64)>) -> Result<Self, RasterError> {
        let mut exact = BTreeMap::new();
        let mut intervals = Vec::new();

        for (i, (key, value)) in entries.iter().enumerate() {
            if key.is_empty() {
                return Err(RasterError::EmptyKey(*key));
            }
            if let Some((prior, _)) = entries[..i].iter().find(|(prior, _)| prior.overlaps(key)) {
                return Err(if prior == key {
                    RasterError::DuplicateKey(*key)
                } else {
                    RasterError::OverlappingKeys(*prior, *key)
                });
            }
            match key {
                ClassKey::Exact(id) => {
                    exact.insert(*id, *value);
                }
                ClassKey::Interval { .. } => intervals.push((*key, *value)),
            }
        }

        Ok(Self {
            entries,
            exact,
            intervals,
        })
    }

    /// Returns the value of the class `key` falls in, if any.
    #[allow(clippy::cast_possible_truncation, clippy::cast_precision_loss)]
    pub fn get(&self, key: f64) -> Option<f64> {
        let id = key as i64;
        let exact = if id as f64 == key {
            self.exact.get(&id).copied()
        } else {
            None
        };
        exact.or_else(|| {
            self.intervals
                .iter()
                .find(|(class, _)| class.matches(key))
                .map(|(_, value)| *value)
        })
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &(ClassKey, f64)> {
        self.entries.iter()
    }
}

/// Reclassifies `keys` into values.
///
/// Cells whose key is no-data or absent from the table are no-data.
pub fn lookup_scalar<K: CellValue>(table: &LookupTable, keys: &Grid<K>) -> ScalarGrid {
    keys.filter_map(|key| table.get(key.to_f64()))
}

/// Reclassifies `keys` into a boolean grid; non-zero values are true.
///
/// A key absent from the table is not in the class and yields false.
/// A no-data key stays no-data.
pub fn lookup_boolean<K: CellValue>(table: &LookupTable, keys: &Grid<K>) -> BooleanGrid {
    keys.map(|key| table.get(key.to_f64()).map_or(false, |v| v != 0.0))
}

#[cfg(test)]
mod tests {
    use super::{lookup_boolean, lookup_scalar, ClassKey, Limit, LookupTable};
    use crate::{GridSpec, NominalGrid, RasterError, ScalarGrid};
    use geo::geometry::Coord;

    fn spec(cols: usize) -> GridSpec {
        GridSpec::new(1, cols, 1.0, Coord { x: 0.0, y: 0.0 }).unwrap()
    }

    fn wind_classes() -> LookupTable {
        LookupTable::new(vec![
            (ClassKey::interval(None, Some(Limit::exclusive(2.0))), 1.0),
            (
                ClassKey::interval(Some(Limit::inclusive(2.0)), Some(Limit::exclusive(4.0))),
                2.0,
            ),
            (ClassKey::interval(Some(Limit::inclusive(4.0)), None), 3.0),
        ])
        .unwrap()
    }

    #[test]
    fn test_key_display() {
        assert_eq!(ClassKey::Exact(7).to_string(), "7");
        assert_eq!(
            ClassKey::interval(Some(Limit::inclusive(2.0)), Some(Limit::exclusive(4.5)))
                .to_string(),
            "[2,4.5>"
        );
        assert_eq!(
            ClassKey::interval(None, Some(Limit::inclusive(1.0))).to_string(),
            "<,1]"
        );
        assert_eq!(
            ClassKey::interval(Some(Limit::exclusive(0.0)), None).to_string(),
            "<0,>"
        );
    }

    #[test]
    fn test_lookup_scalar_nominal() {
        let table =
            LookupTable::new(vec![(ClassKey::Exact(1), 0.5), (ClassKey::Exact(3), 2.0)]).unwrap();
        let classes = NominalGrid::new(spec(4), vec![Some(1), Some(2), None, Some(3)]).unwrap();
        assert_eq!(
            lookup_scalar(&table, &classes).cells(),
            &[Some(0.5), None, None, Some(2.0)]
        );
    }

    #[test]
    fn test_lookup_intervals() {
        let speeds = ScalarGrid::new(
            spec(5),
            vec![Some(0.0), Some(2.0), Some(3.99), Some(4.0), Some(100.0)],
        )
        .unwrap();
        assert_eq!(
            lookup_scalar(&wind_classes(), &speeds).cells(),
            &[Some(1.0), Some(2.0), Some(2.0), Some(3.0), Some(3.0)]
        );
    }

    #[test]
    fn test_lookup_boolean() {
        let table =
            LookupTable::new(vec![(ClassKey::Exact(1), 1.0), (ClassKey::Exact(2), 0.0)]).unwrap();
        let classes = NominalGrid::new(spec(4), vec![Some(1), Some(2), Some(9), None]).unwrap();
        assert_eq!(
            lookup_boolean(&table, &classes).cells(),
            &[Some(true), Some(false), Some(false), None]
        );
    }

    #[test]
    fn test_duplicate_keys_rejected() {
        let err = LookupTable::new(vec![(ClassKey::Exact(1), 0.5), (ClassKey::Exact(1), 0.7)])
            .unwrap_err();
        assert!(matches!(err, RasterError::DuplicateKey(ClassKey::Exact(1))));
    }

    #[test]
    fn test_overlapping_keys_rejected() {
        let touching = LookupTable::new(vec![
            (ClassKey::interval(None, Some(Limit::inclusive(2.0))), 1.0),
            (ClassKey::interval(Some(Limit::inclusive(2.0)), None), 2.0),
        ]);
        assert!(matches!(touching, Err(RasterError::OverlappingKeys(..))));

        let containing = LookupTable::new(vec![
            (ClassKey::interval(Some(Limit::inclusive(0.0)), Some(Limit::exclusive(10.0))), 1.0),
            (ClassKey::Exact(5), 2.0),
        ]);
        assert!(matches!(containing, Err(RasterError::OverlappingKeys(..))));

        let adjacent = LookupTable::new(vec![
            (ClassKey::interval(None, Some(Limit::exclusive(2.0))), 1.0),
            (ClassKey::interval(Some(Limit::inclusive(2.0)), None), 2.0),
        ]);
        assert!(adjacent.is_ok());
    }

    #[test]
    fn test_empty_key_rejected() {
        let err = LookupTable::new(vec![(
            ClassKey::interval(Some(Limit::inclusive(3.0)), Some(Limit::exclusive(3.0))),
            1.0,
        )])
        .unwrap_err();
        assert!(matches!(err, RasterError::EmptyKey(_)));
    }
}
