//! Load logger series from CSV or Excel files.
//!
//! The timestamp column is located by keyword in the header row (falling
//! back to the first column); every other column becomes a channel. Rows
//! whose timestamp cannot be parsed are skipped with a warning.

use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use calamine::{open_workbook, Data, Reader, Xlsx};
use tracing::{debug, info, warn};

use crate::timeseries::series::{Channel, SeriesError, TimeSeries};
use crate::timeseries::timestamp::{excel_serial_to_datetime, parse_timestamp};

const TIMESTAMP_KEYWORDS: &[&str] = &["timestamp", "time stamp", "time"];

/// Load a series from a file, dispatching on the extension.
pub fn load(path: &Path) -> Result<TimeSeries, SeriesError> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_lowercase())
        .unwrap_or_default();

    match ext.as_str() {
        "csv" => {
            let series = read_csv(path)?;
            info!("File read as CSV: {}", path.display());
            Ok(series)
        }
        "xlsx" => {
            let series = read_xlsx(path)?;
            info!("File read as Excel: {}", path.display());
            Ok(series)
        }
        other => Err(SeriesError::UnsupportedFormat(other.to_string())),
    }
}

pub fn read_csv(path: &Path) -> Result<TimeSeries, SeriesError> {
    let mut reader = csv::Reader::from_path(path)?;

    let headers: Vec<String> = reader.headers()?.iter().map(|h| h.to_string()).collect();
    let ts_idx = timestamp_column_index(&headers);

    let mut series = TimeSeries::new(headers[ts_idx].clone());
    for (idx, name) in headers.iter().enumerate() {
        if idx != ts_idx {
            series.channels.push(Channel {
                name: name.clone(),
                values: Vec::new(),
            });
        }
    }

    let mut skipped = 0;
    for (row, record) in reader.records().enumerate() {
        let record = record?;
        let ts_cell = record.get(ts_idx).unwrap_or_default();
        let Some(ts) = parse_timestamp(ts_cell) else {
            warn!("Unparseable timestamp at row {}: '{}'", row + 2, ts_cell);
            skipped += 1;
            continue;
        };

        series.timestamps.push(ts);
        let mut channel = 0;
        for (idx, cell) in record.iter().enumerate() {
            if idx == ts_idx {
                continue;
            }
            if let Some(ch) = series.channels.get_mut(channel) {
                ch.values.push(parse_value(cell));
            }
            channel += 1;
        }
        // Short records pad with gaps so channels stay aligned.
        for ch in series.channels.iter_mut().skip(channel) {
            ch.values.push(None);
        }
    }

    if skipped > 0 {
        warn!("Skipped {} rows with unparseable timestamps", skipped);
    }
    if series.is_empty() {
        return Err(SeriesError::EmptySeries);
    }
    Ok(series)
}

pub fn read_xlsx(path: &Path) -> Result<TimeSeries, SeriesError> {
    let mut workbook: Xlsx<BufReader<File>> = open_workbook(path)
        .map_err(|e: calamine::XlsxError| SeriesError::WorkbookOpen(e.to_string()))?;

    let range = workbook
        .worksheet_range_at(0)
        .ok_or(SeriesError::EmptyWorkbook)?
        .map_err(|e| SeriesError::WorkbookOpen(e.to_string()))?;

    let (row_count, col_count) = range.get_size();
    if row_count < 2 {
        return Err(SeriesError::EmptySeries);
    }
    debug!("Worksheet has {} rows, {} columns", row_count, col_count);

    let headers: Vec<String> = (0..col_count)
        .map(|col| match range.get((0, col)) {
            Some(Data::String(s)) => s.trim().to_string(),
            Some(other) => other.to_string(),
            None => String::new(),
        })
        .collect();
    let ts_idx = timestamp_column_index(&headers);

    let mut series = TimeSeries::new(headers[ts_idx].clone());
    for (idx, name) in headers.iter().enumerate() {
        if idx != ts_idx {
            series.channels.push(Channel {
                name: name.clone(),
                values: Vec::new(),
            });
        }
    }

    let mut skipped = 0;
    for row in 1..row_count {
        let ts = match range.get((row, ts_idx)) {
            Some(Data::String(s)) => parse_timestamp(s),
            Some(Data::DateTime(dt)) => dt.as_datetime(),
            Some(Data::Float(f)) => excel_serial_to_datetime(*f),
            Some(Data::Int(i)) => excel_serial_to_datetime(*i as f64),
            _ => None,
        };
        let Some(ts) = ts else {
            warn!("Unparseable timestamp at worksheet row {}", row + 1);
            skipped += 1;
            continue;
        };

        series.timestamps.push(ts);
        let mut channel = 0;
        for col in 0..col_count {
            if col == ts_idx {
                continue;
            }
            let value = match range.get((row, col)) {
                Some(Data::Float(f)) => Some(*f),
                Some(Data::Int(i)) => Some(*i as f64),
                Some(Data::String(s)) => s.trim().parse::<f64>().ok(),
                _ => None,
            };
            if let Some(ch) = series.channels.get_mut(channel) {
                ch.values.push(value);
            }
            channel += 1;
        }
    }

    if skipped > 0 {
        warn!("Skipped {} rows with unparseable timestamps", skipped);
    }
    if series.is_empty() {
        return Err(SeriesError::EmptySeries);
    }
    Ok(series)
}

/// Index of the timestamp column: first header containing a timestamp
/// keyword, else column 0.
fn timestamp_column_index(headers: &[String]) -> usize {
    headers
        .iter()
        .position(|h| {
            let lower = h.to_lowercase();
            TIMESTAMP_KEYWORDS.iter().any(|k| lower.contains(k))
        })
        .unwrap_or(0)
}

fn parse_value(cell: &str) -> Option<f64> {
    let trimmed = cell.trim();
    if trimmed.is_empty() {
        return None;
    }
    trimmed.parse::<f64>().ok()
}
