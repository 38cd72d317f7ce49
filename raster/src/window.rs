//! Moving window statistics.

use crate::{RasterError, ScalarGrid};
use log::debug;
use rayon::prelude::*;

/// Which cells around a target belong to its window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WindowShape {
    /// Cells whose center lies within `length / 2` of the target
    /// center along both axes.
    #[default]
    Square,

    /// Cells whose center lies within `length / 2` of the target
    /// center.
    Circle,
}

/// A neighborhood, measured in map units.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Window {
    /// Edge length (square) or diameter (circle).
    pub length: f64,
    pub shape: WindowShape,
}

impl Window {
    pub fn square(length: f64) -> Self {
        Self {
            length,
            shape: WindowShape::Square,
        }
    }

    pub fn circle(length: f64) -> Self {
        Self {
            length,
            shape: WindowShape::Circle,
        }
    }

    /// Returns a square window reaching `distance` from the target on
    /// every side, i.e. twice a zone of influence.
    pub fn zone(distance: f64) -> Self {
        Self::square(2.0 * distance)
    }

    /// Returns this window grown by `extra` map units.
    ///
    /// Adding one cell size guarantees the window still holds the
    /// target cell when the length would otherwise round below it.
    pub fn widened_by(self, extra: f64) -> Self {
        Self {
            length: self.length + extra,
            ..self
        }
    }

    /// Number of cells the window reaches on each side of the target.
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    pub fn half_width(&self, cell_size: f64) -> Result<usize, RasterError> {
        if !self.length.is_finite() || self.length < cell_size {
            return Err(RasterError::InvalidWindow {
                length: self.length,
                cell_size,
            });
        }
        Ok((self.radius_cells(cell_size) + 1e-9).floor() as usize)
    }

    fn radius_cells(&self, cell_size: f64) -> f64 {
        self.length / (2.0 * cell_size)
    }
}

impl From<f64> for Window {
    fn from(length: f64) -> Self {
        Self::square(length)
    }
}

/// Returns the mean of the defined cells in each cell's window.
///
/// A cell is no-data only when its whole window is, so a no-data
/// cell surrounded by data receives the neighborhood mean.
pub fn windowed_average(
    grid: &ScalarGrid,
    window: impl Into<Window>,
) -> Result<ScalarGrid, RasterError> {
    let window = window.into();
    let now = std::time::Instant::now();
    let sums = aggregate(grid, &window)?;
    #[allow(clippy::cast_precision_loss)]
    let cells = sums
        .into_iter()
        .map(|(sum, count)| (count > 0).then(|| sum / count as f64))
        .collect();
    debug!(
        "windowed_average; rows: {}, cols: {}, window: {:?}, exec: {:?}",
        grid.rows(),
        grid.cols(),
        window,
        now.elapsed()
    );
    Ok(ScalarGrid::from_parts(*grid.spec(), cells))
}

/// Returns the sum of the defined cells in each cell's window.
///
/// Every cell of the result is defined; a window with no data sums
/// to zero.
pub fn windowed_sum(
    grid: &ScalarGrid,
    window: impl Into<Window>,
) -> Result<ScalarGrid, RasterError> {
    let window = window.into();
    let now = std::time::Instant::now();
    let sums = aggregate(grid, &window)?;
    let cells = sums
        .into_iter()
        .map(|(sum, count)| Some(if count > 0 { sum } else { 0.0 }))
        .collect();
    debug!(
        "windowed_sum; rows: {}, cols: {}, window: {:?}, exec: {:?}",
        grid.rows(),
        grid.cols(),
        window,
        now.elapsed()
    );
    Ok(ScalarGrid::from_parts(*grid.spec(), cells))
}

/// Running sum of defined values and count of defined cells.
type Acc = (f64, u64);

/// Returns `(sum, count)` over every cell's window, row-major.
fn aggregate(grid: &ScalarGrid, window: &Window) -> Result<Vec<Acc>, RasterError> {
    let k = window.half_width(grid.cell_size())?;
    let sums = match window.shape {
        WindowShape::Square => square(grid, k),
        WindowShape::Circle => circle(grid, window.radius_cells(grid.cell_size()), k),
    };
    Ok(sums)
}

/// Separable box filter: horizontal pass per row, then vertical pass
/// over column prefix sums. O(rows * cols) regardless of `k`.
fn square(grid: &ScalarGrid, k: usize) -> Vec<Acc> {
    let (rows, cols) = (grid.rows(), grid.cols());

    let horizontal: Vec<Vec<Acc>> = grid
        .cells()
        .par_chunks(cols)
        .map(|row| {
            let prefix = prefix_sums(row.iter().copied());
            (0..cols)
                .map(|col| span_sum(&prefix, span(col, k, cols)))
                .collect()
        })
        .collect();

    // column_prefix[r][c] holds the sum of horizontal[..r][c].
    let mut column_prefix: Vec<Vec<Acc>> = Vec::with_capacity(rows + 1);
    column_prefix.push(vec![(0.0, 0); cols]);
    for row in &horizontal {
        let next = column_prefix[column_prefix.len() - 1]
            .iter()
            .zip(row)
            .map(|(p, h)| (p.0 + h.0, p.1 + h.1))
            .collect();
        column_prefix.push(next);
    }

    let column_prefix = &column_prefix;
    (0..rows)
        .into_par_iter()
        .flat_map_iter(move |row| {
            let (lo, hi) = span(row, k, rows);
            let (lo, hi) = (&column_prefix[lo], &column_prefix[hi]);
            (0..cols).map(move |col| (hi[col].0 - lo[col].0, hi[col].1 - lo[col].1))
        })
        .collect()
}

/// Circular window: per-row prefix sums, one span per window row.
/// O(rows * cols * k).
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss, clippy::cast_precision_loss)]
fn circle(grid: &ScalarGrid, radius: f64, k: usize) -> Vec<Acc> {
    let (rows, cols) = (grid.rows(), grid.cols());

    let row_prefix: Vec<Vec<Acc>> = grid
        .cells()
        .par_chunks(cols)
        .map(|row| prefix_sums(row.iter().copied()))
        .collect();

    // reach[dy] is the horizontal half width of the window dy rows
    // away from the target.
    let reach: Vec<usize> = (0..=k)
        .map(|dy| {
            let dy = dy as f64;
            ((radius * radius - dy * dy).max(0.0).sqrt() + 1e-9).floor() as usize
        })
        .collect();

    let (row_prefix, reach) = (&row_prefix, &reach);
    (0..rows)
        .into_par_iter()
        .flat_map_iter(move |row| {
            let (first, end) = span(row, k, rows);
            (0..cols).map(move |col| {
                let mut acc: Acc = (0.0, 0);
                for other in first..end {
                    let dx = reach[row.abs_diff(other)];
                    let (sum, count) = span_sum(&row_prefix[other], span(col, dx, cols));
                    acc.0 += sum;
                    acc.1 += count;
                }
                acc
            })
        })
        .collect()
}

fn prefix_sums(cells: impl Iterator<Item = Option<f64>>) -> Vec<Acc> {
    let mut prefix = Vec::with_capacity(cells.size_hint().0 + 1);
    let mut acc: Acc = (0.0, 0);
    prefix.push(acc);
    for cell in cells {
        if let Some(value) = cell {
            acc = (acc.0 + value, acc.1 + 1);
        }
        prefix.push(acc);
    }
    prefix
}

/// Returns `[lo, hi)`, the in-bounds indices within `k` of `i`.
fn span(i: usize, k: usize, len: usize) -> (usize, usize) {
    (i.saturating_sub(k), (i + k + 1).min(len))
}

fn span_sum(prefix: &[Acc], (lo, hi): (usize, usize)) -> Acc {
    (prefix[hi].0 - prefix[lo].0, prefix[hi].1 - prefix[lo].1)
}
