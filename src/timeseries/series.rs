use std::collections::HashMap;
use std::path::Path;

use chrono::{Duration, NaiveDateTime};
use tracing::{debug, info};

use crate::timeseries::timestamp::TIMESTAMP_FORMAT;

#[derive(Debug, thiserror::Error)]
pub enum SeriesError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Failed to open workbook: {0}")]
    WorkbookOpen(String),

    #[error("Workbook has no sheets")]
    EmptyWorkbook,

    #[error("Unsupported file format: {0}")]
    UnsupportedFormat(String),

    #[error("File contains no data rows")]
    EmptySeries,

    #[error("Column not found: {0}")]
    ColumnNotFound(String),
}

/// One measured channel: a name (as it appeared in the source header) and a
/// value per timestamp. `None` marks a gap.
#[derive(Debug, Clone)]
pub struct Channel {
    pub name: String,
    pub values: Vec<Option<f64>>,
}

/// An in-memory logger series: a shared timestamp axis plus any number of
/// channels aligned to it.
///
/// Invariant: every channel holds exactly one value slot per timestamp.
#[derive(Debug, Clone)]
pub struct TimeSeries {
    pub timestamp_column: String,
    pub timestamps: Vec<NaiveDateTime>,
    pub channels: Vec<Channel>,
}

impl TimeSeries {
    pub fn new(timestamp_column: impl Into<String>) -> Self {
        Self {
            timestamp_column: timestamp_column.into(),
            timestamps: Vec::new(),
            channels: Vec::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.timestamps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.timestamps.is_empty()
    }

    pub fn column_names(&self) -> Vec<&str> {
        self.channels.iter().map(|c| c.name.as_str()).collect()
    }

    /// Look up a channel by its exact header name.
    pub fn channel(&self, name: &str) -> Option<&Channel> {
        self.channels.iter().find(|c| c.name == name)
    }

    /// Find the first channel whose name contains any of the keywords
    /// (case-insensitive).
    pub fn find_column(&self, keywords: &[&str]) -> Option<&Channel> {
        self.channels.iter().find(|c| {
            let lower = c.name.to_lowercase();
            keywords.iter().any(|k| lower.contains(&k.to_lowercase()))
        })
    }

    /// Stable ascending sort on the timestamp axis, carried through every
    /// channel.
    pub fn sort_by_timestamp(&mut self) {
        let mut order: Vec<usize> = (0..self.timestamps.len()).collect();
        order.sort_by_key(|&i| self.timestamps[i]);

        if order.iter().enumerate().all(|(pos, &i)| pos == i) {
            return;
        }

        self.timestamps = order.iter().map(|&i| self.timestamps[i]).collect();
        for channel in &mut self.channels {
            channel.values = order.iter().map(|&i| channel.values[i]).collect();
        }
    }

    /// Most common interval between successive timestamps. Ties resolve to
    /// the smaller interval; duplicates (zero deltas) are ignored.
    pub fn detect_interval(&self) -> Option<Duration> {
        if self.timestamps.len() < 2 {
            return None;
        }

        let mut counts: HashMap<i64, usize> = HashMap::new();
        for pair in self.timestamps.windows(2) {
            let delta = (pair[1] - pair[0]).num_seconds();
            if delta > 0 {
                *counts.entry(delta).or_insert(0) += 1;
            }
        }

        let mode = counts
            .into_iter()
            .min_by_key(|&(secs, count)| (std::cmp::Reverse(count), secs))?;

        debug!("Most common interval: {}s ({} occurrences)", mode.0, mode.1);
        Some(Duration::seconds(mode.0))
    }

    /// Reindex the series over the full `[first, last]` range at the given
    /// interval, inserting gap rows (all channels `None`) for missing
    /// timestamps. Samples that do not land on the grid are kept.
    ///
    /// Returns the number of rows inserted.
    pub fn fill_gaps(&mut self, interval: Duration) -> usize {
        if self.timestamps.len() < 2 || interval <= Duration::zero() {
            return 0;
        }
        self.sort_by_timestamp();

        let first = self.timestamps[0];
        let last = self.timestamps[self.timestamps.len() - 1];

        // Grid points not already present, in order.
        let mut missing = Vec::new();
        let mut cursor = first;
        let mut existing = self.timestamps.iter().peekable();
        while cursor <= last {
            while let Some(&&ts) = existing.peek() {
                if ts < cursor {
                    existing.next();
                } else {
                    break;
                }
            }
            if existing.peek() != Some(&&cursor) {
                missing.push(cursor);
            }
            cursor += interval;
        }

        if missing.is_empty() {
            debug!("No gaps to fill");
            return 0;
        }

        // Merge the two sorted lists, tracking where each original row and
        // each gap row lands.
        let total = self.timestamps.len() + missing.len();
        let mut merged = Vec::with_capacity(total);
        let mut sources = Vec::with_capacity(total);
        let mut orig = 0;
        let mut gap = 0;
        while orig < self.timestamps.len() || gap < missing.len() {
            let take_gap = match (self.timestamps.get(orig), missing.get(gap)) {
                (Some(&o), Some(&g)) => g < o,
                (None, Some(_)) => true,
                _ => false,
            };
            if take_gap {
                merged.push(missing[gap]);
                sources.push(None);
                gap += 1;
            } else {
                merged.push(self.timestamps[orig]);
                sources.push(Some(orig));
                orig += 1;
            }
        }

        self.timestamps = merged;
        for channel in &mut self.channels {
            channel.values = sources
                .iter()
                .map(|src| src.and_then(|i| channel.values[i]))
                .collect();
        }

        info!("{} gaps filled in the series", missing.len());
        missing.len()
    }

    /// Write the series as CSV: timestamps in the canonical format, gaps as
    /// empty cells.
    pub fn write_csv(&self, path: &Path) -> Result<(), SeriesError> {
        let mut writer = csv::Writer::from_path(path)?;

        let mut header = vec![self.timestamp_column.clone()];
        header.extend(self.channels.iter().map(|c| c.name.clone()));
        writer.write_record(&header)?;

        for (row, ts) in self.timestamps.iter().enumerate() {
            let mut record = vec![ts.format(TIMESTAMP_FORMAT).to_string()];
            for channel in &self.channels {
                record.push(match channel.values[row] {
                    Some(v) => v.to_string(),
                    None => String::new(),
                });
            }
            writer.write_record(&record)?;
        }

        writer.flush()?;
        info!("CSV file saved to {}", path.display());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn dt(d: u32, h: u32, mi: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 6, d)
            .unwrap()
            .and_hms_opt(h, mi, 0)
            .unwrap()
    }

    fn sample_series(timestamps: Vec<NaiveDateTime>, values: Vec<Option<f64>>) -> TimeSeries {
        TimeSeries {
            timestamp_column: "Timestamp".to_string(),
            channels: vec![Channel {
                name: "Depth (m)".to_string(),
                values,
            }],
            timestamps,
        }
    }

    #[test]
    fn test_sort_by_timestamp() {
        let mut series = sample_series(
            vec![dt(1, 10, 0), dt(1, 8, 0), dt(1, 9, 0)],
            vec![Some(3.0), Some(1.0), Some(2.0)],
        );
        series.sort_by_timestamp();

        assert_eq!(series.timestamps, vec![dt(1, 8, 0), dt(1, 9, 0), dt(1, 10, 0)]);
        assert_eq!(
            series.channels[0].values,
            vec![Some(1.0), Some(2.0), Some(3.0)]
        );
    }

    #[test]
    fn test_detect_interval_mode() {
        let series = sample_series(
            vec![
                dt(1, 8, 0),
                dt(1, 8, 2),
                dt(1, 8, 4),
                dt(1, 8, 6),
                // One ten-minute outlier
                dt(1, 8, 16),
            ],
            vec![None; 5],
        );
        assert_eq!(series.detect_interval(), Some(Duration::minutes(2)));
    }

    #[test]
    fn test_detect_interval_too_short() {
        let series = sample_series(vec![dt(1, 8, 0)], vec![None]);
        assert_eq!(series.detect_interval(), None);
    }

    #[test]
    fn test_fill_gaps_inserts_missing_rows() {
        let mut series = sample_series(
            vec![dt(1, 8, 0), dt(1, 8, 2), dt(1, 8, 8)],
            vec![Some(1.0), Some(2.0), Some(5.0)],
        );

        let filled = series.fill_gaps(Duration::minutes(2));
        assert_eq!(filled, 2);
        assert_eq!(
            series.timestamps,
            vec![dt(1, 8, 0), dt(1, 8, 2), dt(1, 8, 4), dt(1, 8, 6), dt(1, 8, 8)]
        );
        assert_eq!(
            series.channels[0].values,
            vec![Some(1.0), Some(2.0), None, None, Some(5.0)]
        );
    }

    #[test]
    fn test_fill_gaps_keeps_off_grid_samples() {
        let mut series = sample_series(
            vec![dt(1, 8, 0), dt(1, 8, 3), dt(1, 8, 4)],
            vec![Some(1.0), Some(9.9), Some(3.0)],
        );

        let filled = series.fill_gaps(Duration::minutes(2));
        // Grid point 08:02 is missing; the off-grid 08:03 sample survives.
        assert_eq!(filled, 1);
        assert_eq!(
            series.timestamps,
            vec![dt(1, 8, 0), dt(1, 8, 2), dt(1, 8, 3), dt(1, 8, 4)]
        );
        assert_eq!(
            series.channels[0].values,
            vec![Some(1.0), None, Some(9.9), Some(3.0)]
        );
    }

    #[test]
    fn test_fill_gaps_no_gaps() {
        let mut series = sample_series(
            vec![dt(1, 8, 0), dt(1, 8, 2), dt(1, 8, 4)],
            vec![Some(1.0), Some(2.0), Some(3.0)],
        );
        assert_eq!(series.fill_gaps(Duration::minutes(2)), 0);
        assert_eq!(series.len(), 3);
    }

    #[test]
    fn test_find_column_keywords() {
        let series = TimeSeries {
            timestamp_column: "Timestamp".to_string(),
            timestamps: vec![],
            channels: vec![
                Channel {
                    name: "Depth (m)".to_string(),
                    values: vec![],
                },
                Channel {
                    name: "Flow Rate (l/s)".to_string(),
                    values: vec![],
                },
            ],
        };

        assert_eq!(
            series.find_column(&["flow"]).map(|c| c.name.as_str()),
            Some("Flow Rate (l/s)")
        );
        assert!(series.find_column(&["rainfall"]).is_none());
    }
}
