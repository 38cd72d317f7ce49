//! ESRI ASCII grid (`.asc`) files.
//!
//! ```text
//! ncols         4
//! nrows         2
//! xllcorner     155000.0
//! yllcorner     463000.0
//! cellsize      10.0
//! NODATA_value  -9999
//! 1 2 3 -9999
//! 5 6 7 8
//! ```
//!
//! Header keys are case-insensitive; `xllcenter`/`yllcenter` may
//! replace the corner keys and `NODATA_value` is optional.

use crate::GridIoError;
use geo::geometry::Coord;
use log::{debug, warn};
use raster::{AnyGrid, BooleanGrid, CellValue, Grid, GridSpec, NominalGrid, ScalarGrid, ValueKind};
use std::{
    fs::File,
    io::{BufWriter, Write},
    path::{Path, PathBuf},
};

/// Value written for no-data cells.
pub const NODATA: f64 = -9999.0;

pub fn read_scalar<P: AsRef<Path>>(path: P) -> Result<ScalarGrid, GridIoError> {
    read(path.as_ref(), Some)
}

/// Reads a grid of class ids. Every defined value must be an integer.
#[allow(clippy::cast_possible_truncation)]
pub fn read_nominal<P: AsRef<Path>>(path: P) -> Result<NominalGrid, GridIoError> {
    read(path.as_ref(), |v| {
        let integral = v.fract() == 0.0 && v >= f64::from(i32::MIN) && v <= f64::from(i32::MAX);
        integral.then_some(v as i32)
    })
}

/// Reads a grid of `0`/`1` values.
pub fn read_boolean<P: AsRef<Path>>(path: P) -> Result<BooleanGrid, GridIoError> {
    read(path.as_ref(), |v| match v {
        v if v == 0.0 => Some(false),
        v if v == 1.0 => Some(true),
        _ => None,
    })
}

/// Reads a grid whose value kind is chosen at run time.
pub fn read_grid<P: AsRef<Path>>(path: P, kind: ValueKind) -> Result<AnyGrid, GridIoError> {
    Ok(match kind {
        ValueKind::Boolean => read_boolean(path)?.into(),
        ValueKind::Nominal => read_nominal(path)?.into(),
        ValueKind::Scalar => read_scalar(path)?.into(),
    })
}

/// Writes `grid` to `path`, replacing any existing file.
pub fn write_grid<T: CellValue, P: AsRef<Path>>(
    grid: &Grid<T>,
    path: P,
) -> Result<(), GridIoError> {
    let path = path.as_ref();
    let spec = grid.spec();
    let mut out = BufWriter::new(File::create(path)?);

    writeln!(out, "ncols         {}", spec.cols())?;
    writeln!(out, "nrows         {}", spec.rows())?;
    writeln!(out, "xllcorner     {}", spec.origin().x)?;
    writeln!(out, "yllcorner     {}", spec.south_east().y)?;
    writeln!(out, "cellsize      {}", spec.cell_size())?;
    writeln!(out, "NODATA_value  {NODATA}")?;

    let mut collisions = 0_usize;
    for row in grid.cells().chunks(spec.cols()) {
        let mut sep = "";
        for cell in row {
            match cell {
                Some(value) => {
                    let value = value.to_f64();
                    if value == NODATA {
                        collisions += 1;
                    }
                    write!(out, "{sep}{value}")?;
                }
                None => write!(out, "{sep}{NODATA}")?,
            }
            sep = " ";
        }
        writeln!(out)?;
    }
    out.flush()?;

    if collisions > 0 {
        warn!("{collisions} cells of {path:?} hold {NODATA} and will read back as no-data");
    }
    debug!("wrote {path:?}; {spec}");
    Ok(())
}

#[derive(Default)]
struct Header {
    ncols: Option<usize>,
    nrows: Option<usize>,
    x: Option<(f64, bool)>,
    y: Option<(f64, bool)>,
    cell_size: Option<f64>,
    nodata: Option<f64>,
}

fn read<T: CellValue>(
    path: &Path,
    convert: impl Fn(f64) -> Option<T>,
) -> Result<Grid<T>, GridIoError> {
    let now = std::time::Instant::now();
    let text = std::fs::read_to_string(path)?;
    let parse_err = |line: usize, msg: String| GridIoError::Parse {
        path: PathBuf::from(path),
        line,
        msg,
    };

    let mut header = Header::default();
    let mut lines = text.lines().enumerate().peekable();

    while let Some((n, line)) = lines.peek().copied() {
        let mut tokens = line.split_whitespace();
        let Some(key) = tokens.next() else {
            lines.next();
            continue;
        };
        if !key.starts_with(|c: char| c.is_ascii_alphabetic()) {
            break;
        }
        lines.next();
        let value = tokens
            .next()
            .ok_or_else(|| parse_err(n + 1, format!("missing value for {key}")))?;
        let number = value
            .parse::<f64>()
            .map_err(|_| parse_err(n + 1, format!("invalid {key} {value:?}")))?;
        let count = || {
            value
                .parse::<usize>()
                .map_err(|_| parse_err(n + 1, format!("invalid {key} {value:?}")))
        };
        match key.to_ascii_lowercase().as_str() {
            "ncols" => header.ncols = Some(count()?),
            "nrows" => header.nrows = Some(count()?),
            "xllcorner" => header.x = Some((number, false)),
            "xllcenter" => header.x = Some((number, true)),
            "yllcorner" => header.y = Some((number, false)),
            "yllcenter" => header.y = Some((number, true)),
            "cellsize" => header.cell_size = Some(number),
            "nodata_value" => header.nodata = Some(number),
            _ => return Err(parse_err(n + 1, format!("unknown header key {key}"))),
        }
    }

    let (Some(ncols), Some(nrows), Some((x, x_center)), Some((y, y_center)), Some(cell_size)) =
        (header.ncols, header.nrows, header.x, header.y, header.cell_size)
    else {
        return Err(parse_err(1, "incomplete header".to_owned()));
    };

    #[allow(clippy::cast_precision_loss)]
    let origin = {
        let half = cell_size / 2.0;
        Coord {
            x: if x_center { x - half } else { x },
            y: (if y_center { y - half } else { y }) + nrows as f64 * cell_size,
        }
    };
    let spec = GridSpec::new(nrows, ncols, cell_size, origin)?;

    // Every value takes at least two bytes, so the file bounds the
    // allocation whatever the header claims.
    let mut cells = Vec::with_capacity(spec.len().min(text.len() / 2 + 1));
    let mut last_line = 0;
    for (n, line) in lines {
        last_line = n + 1;
        for token in line.split_whitespace() {
            let value = token
                .parse::<f64>()
                .map_err(|_| parse_err(n + 1, format!("invalid value {token:?}")))?;
            let cell = if Some(value) == header.nodata {
                None
            } else {
                Some(convert(value).ok_or_else(|| {
                    parse_err(n + 1, format!("{value} is not a {} value", T::KIND))
                })?)
            };
            cells.push(cell);
        }
    }
    if cells.len() != spec.len() {
        return Err(parse_err(
            last_line,
            format!("expected {} values, found {}", spec.len(), cells.len()),
        ));
    }

    let grid = Grid::new(spec, cells)?;
    debug!("read {path:?}; {spec}, exec: {:?}", now.elapsed());
    Ok(grid)
}
