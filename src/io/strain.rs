//! Plain-text time series and PSD files.
//!
//! Time series hold either one value per line (sample rate and start time are
//! supplied by the caller) or `time value` pairs. PSD files hold
//! `frequency value` pairs. Blank lines and `#` comments are ignored.
use std::fs;
use std::io::Write;
use std::path::Path;

use tracing::info;

use crate::core::signal::TimeSeries;
use crate::error::{Error, Result};

fn rows(path: &Path) -> Result<Vec<Vec<f64>>> {
    let text = fs::read_to_string(path)?;
    let mut rows = Vec::new();
    for (i, line) in text.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let row = line
            .split_whitespace()
            .map(|v| v.parse::<f64>())
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(|_| {
                Error::Config(format!("{}:{}: not a number row: {}", path.display(), i + 1, line))
            })?;
        rows.push(row);
    }
    Ok(rows)
}

/// Read a time series. `sample_rate` and `start_time` are required for single-column files.
pub fn read_time_series(
    path: &Path,
    sample_rate: Option<f64>,
    start_time: Option<f64>,
) -> Result<TimeSeries> {
    let rows = rows(path)?;
    let width = rows.first().map_or(0, Vec::len);
    if rows.iter().any(|r| r.len() != width) {
        return Err(Error::Config(format!("{}: ragged columns", path.display())));
    }
    let series = match width {
        1 => {
            let rate = sample_rate.ok_or(Error::MissingArgument {
                arg: "--sample-rate".to_string(),
            })?;
            TimeSeries::new(
                rows.into_iter().map(|r| r[0]).collect(),
                1.0 / rate,
                start_time.unwrap_or(0.0),
            )
        }
        2 => {
            if rows.len() < 2 {
                return Err(Error::Config(format!("{}: too few samples", path.display())));
            }
            let delta_t = rows[1][0] - rows[0][0];
            if delta_t <= 0.0 {
                return Err(Error::Config(format!("{}: times must increase", path.display())));
            }
            let start = rows[0][0];
            TimeSeries::new(rows.into_iter().map(|r| r[1]).collect(), delta_t, start)
        }
        _ => {
            return Err(Error::Config(format!(
                "{}: expected 1 or 2 columns, found {}",
                path.display(),
                width
            )));
        }
    };
    info!(
        "Read {} samples at {} Hz from {:?}",
        series.len(),
        series.sample_rate(),
        path
    );
    Ok(series)
}

/// Write `time value` pairs
pub fn write_time_series(series: &TimeSeries, path: &Path) -> Result<()> {
    let mut out = std::io::BufWriter::new(fs::File::create(path)?);
    for (i, v) in series.data.iter().enumerate() {
        writeln!(out, "{:.9} {:e}", series.start_time + i as f64 * series.delta_t, v)?;
    }
    out.flush()?;
    Ok(())
}

/// Read `frequency value` pairs
pub fn read_psd_samples(path: &Path) -> Result<(Vec<f64>, Vec<f64>)> {
    let rows = rows(path)?;
    if rows.iter().any(|r| r.len() != 2) {
        return Err(Error::Config(format!(
            "{}: PSD rows must be `frequency value`",
            path.display()
        )));
    }
    Ok(rows.into_iter().map(|r| (r[0], r[1])).unzip())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn two_column_roundtrip() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("H1.txt");
        let ts = TimeSeries::new(vec![1.0, -2.0, 3.5e-21], 0.25, 1000.0);
        write_time_series(&ts, &path).unwrap();
        let back = read_time_series(&path, None, None).unwrap();
        assert_eq!(back.data, ts.data);
        assert_eq!(back.delta_t, 0.25);
        assert_eq!(back.start_time, 1000.0);
    }

    #[test]
    fn single_column_needs_rate() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("L1.txt");
        fs::write(&path, "# comment\n1\n2\n\n3\n").unwrap();
        assert!(read_time_series(&path, None, None).is_err());
        let ts = read_time_series(&path, Some(4.0), Some(10.0)).unwrap();
        assert_eq!(ts.data, vec![1.0, 2.0, 3.0]);
        assert_eq!(ts.delta_t, 0.25);
        assert_eq!(ts.start_time, 10.0);
    }

    #[test]
    fn psd_rows_must_have_two_columns() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("psd.txt");
        fs::write(&path, "10 1e-46\n20\n").unwrap();
        assert!(read_psd_samples(&path).is_err());
    }
}
