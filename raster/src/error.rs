use crate::{ClassKey, GridSpec, ValueKind};
use std::fmt;
use thiserror::Error;

/// A bound a validated value must respect.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Bound {
    /// Values must be `>=` this.
    Lower(f64),
    /// Values must be `<=` this.
    Upper(f64),
}

impl fmt::Display for Bound {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Lower(low) => write!(f, ">= {low}"),
            Self::Upper(high) => write!(f, "<= {high}"),
        }
    }
}

/// Coarse classification of errors, used when reporting to users.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// A physical invariant was violated.
    Range,
    /// Malformed table, mismatched grids, bad parameters.
    Config,
    /// Unreadable or unwritable resource.
    Io,
}

#[derive(Error, Debug)]
pub enum RasterError {
    #[error("out of range value in {subject}: {value}, expected {bound}")]
    RangeViolation {
        subject: String,
        value: f64,
        bound: Bound,
    },

    #[error("grid geometry mismatch: {expected} vs {actual}")]
    GeometryMismatch {
        expected: GridSpec,
        actual: GridSpec,
    },

    #[error("invalid grid geometry: {0}")]
    InvalidSpec(String),

    #[error("expected {expected} cells, got {actual}")]
    CellCount { expected: usize, actual: usize },

    #[error("window length {length} must be a finite value >= cell size {cell_size}")]
    InvalidWindow { length: f64, cell_size: f64 },

    #[error("duplicate lookup key {0}")]
    DuplicateKey(ClassKey),

    #[error("overlapping lookup keys {0} and {1}")]
    OverlappingKeys(ClassKey, ClassKey),

    #[error("lookup key {0} matches no value")]
    EmptyKey(ClassKey),

    #[error("expected a {expected} grid, got a {actual} grid")]
    KindMismatch {
        expected: ValueKind,
        actual: ValueKind,
    },
}

impl RasterError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::RangeViolation { .. } => ErrorKind::Range,
            _ => ErrorKind::Config,
        }
    }
}
