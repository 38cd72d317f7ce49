//! Lookup table (`.tab`) files.
//!
//! One `key value` row per line. Keys are class ids or intervals:
//!
//! ```text
//! # wind speed classes (m/s)
//! <,2>     1.5
//! [2,4>    3.0
//! [4,>     5.0
//! ```
//!
//! `[`/`]` include the limit, `<`/`>` exclude it, and an empty limit
//! is unbounded. Text after `#` is ignored.

use crate::GridIoError;
use log::{debug, warn};
use raster::{ClassKey, Limit, LookupTable};
use std::path::{Path, PathBuf};

pub fn read_lookup_table<P: AsRef<Path>>(path: P) -> Result<LookupTable, GridIoError> {
    let path = path.as_ref();
    let text = std::fs::read_to_string(path)?;
    let parse_err = |line: usize, msg: String| GridIoError::Parse {
        path: PathBuf::from(path),
        line,
        msg,
    };

    let mut rows = Vec::new();
    for (n, line) in text.lines().enumerate() {
        let line = line.split('#').next().unwrap_or_default().trim();
        if line.is_empty() {
            continue;
        }
        let (key, rest) = split_key(line);
        let key = parse_key(key).ok_or_else(|| parse_err(n + 1, format!("invalid key {key:?}")))?;
        let mut columns = rest.split_whitespace();
        let value = columns
            .next()
            .ok_or_else(|| parse_err(n + 1, format!("missing value for key {key}")))?;
        let value = value
            .parse::<f64>()
            .map_err(|_| parse_err(n + 1, format!("invalid value {value:?}")))?;
        if columns.next().is_some() {
            warn!("{path:?}:{}: ignoring extra columns", n + 1);
        }
        rows.push((key, value));
    }

    let table = LookupTable::new(rows)?;
    debug!("read {path:?}; rows: {}", table.len());
    Ok(table)
}

/// Splits a row into its key and the remainder. Interval keys may
/// contain spaces.
fn split_key(line: &str) -> (&str, &str) {
    if line.starts_with(['[', '<']) {
        if let Some(end) = line
            .find(',')
            .and_then(|comma| line[comma..].find([']', '>']).map(|i| comma + i))
        {
            return line.split_at(end + 1);
        }
    }
    line.split_once(char::is_whitespace).unwrap_or((line, ""))
}

/// Parses a class id (`7`) or an interval (`[2,4>`, `<,0]`).
pub fn parse_key(text: &str) -> Option<ClassKey> {
    let text = text.trim();
    let Some(inner) = text
        .strip_prefix(['[', '<'])
        .and_then(|inner| inner.strip_suffix([']', '>']))
    else {
        return text.parse::<i64>().ok().map(ClassKey::Exact);
    };
    let (low, high) = inner.split_once(',')?;
    let limit = |value: &str, inclusive: bool| -> Option<Option<Limit>> {
        let value = value.trim();
        if value.is_empty() {
            Some(None)
        } else {
            let value = value.parse::<f64>().ok().filter(|v| v.is_finite())?;
            Some(Some(Limit { value, inclusive }))
        }
    };
    let low = limit(low, text.starts_with('['))?;
    let high = limit(high, text.ends_with(']'))?;
    Some(ClassKey::interval(low, high))
}
