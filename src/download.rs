//! Site acquisition: pull every channel of a site from the telemetry API,
//! merge the streams on their timestamps, and land the result as a repaired
//! CSV (sorted, interval detected, gaps filled).

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use chrono::{Duration, NaiveDateTime};
use futures::stream::{self, StreamExt};
use indicatif::{ProgressBar, ProgressStyle};
use tracing::{error, info, instrument, warn};

use crate::fetch_error::FetchError;
use crate::fetcher::{from_epoch_ms, to_epoch_ms, ChannelInfo, Fetcher, StreamSample};
use crate::timeseries::{loader, Channel, SeriesError, TimeSeries};

const CHANNEL_FETCH_CONCURRENCY: usize = 4;

#[derive(Debug, thiserror::Error)]
pub enum DownloadError {
    #[error("API error: {0}")]
    Fetch(#[from] FetchError),

    #[error("Series error: {0}")]
    Series(#[from] SeriesError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("No channels defined for site {0}")]
    NoChannels(String),

    #[error("No stream data retrieved for processing")]
    NoData,

    #[error("Could not determine the sample interval")]
    NoInterval,
}

/// Outcome of a site download or a local-file repair.
#[derive(Debug)]
pub struct SiteDownload {
    pub site_id: String,
    pub site_name: String,
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
    pub csv_path: PathBuf,
    pub gaps_filled: usize,
    pub interval: Duration,
}

pub struct DownloadService {
    fetcher: Fetcher,
    output_dir: PathBuf,
}

impl DownloadService {
    pub fn new(fetcher: Fetcher, output_dir: impl Into<PathBuf>) -> Self {
        Self {
            fetcher,
            output_dir: output_dir.into(),
        }
    }

    /// Download every channel of a site and save the merged, repaired
    /// series as `{first word of site name}.csv`.
    ///
    /// With no explicit range, each channel covers its own first sample to
    /// its `endDate`. Battery channels are dropped. The download succeeds
    /// if at least one channel produced data.
    #[instrument(skip(self))]
    pub async fn download_site(
        &self,
        site_id: &str,
        start: Option<NaiveDateTime>,
        end: Option<NaiveDateTime>,
    ) -> Result<SiteDownload, DownloadError> {
        let site = self.fetcher.get_site(site_id).await?;
        info!("Retrieved site {} ({})", site.site_id, site.site_name);

        let channels: Vec<ChannelInfo> = site
            .channels
            .iter()
            .filter(|c| {
                if c.name.contains("Battery") {
                    info!("Dropping battery channel {}", c.name.trim());
                    false
                } else {
                    true
                }
            })
            .cloned()
            .collect();
        if channels.is_empty() {
            return Err(DownloadError::NoChannels(site_id.to_string()));
        }

        let pb = ProgressBar::new(channels.len() as u64);
        pb.set_style(
            ProgressStyle::default_bar()
                .template("[{elapsed_precise}] {bar:40.cyan/blue} {pos}/{len} {msg}")
                .unwrap()
                .progress_chars("##-"),
        );
        pb.set_message("Fetching channels");

        let results: Vec<(ChannelInfo, Result<Vec<StreamSample>, FetchError>)> =
            stream::iter(channels)
                .map(|channel| {
                    let fetcher = self.fetcher.clone();
                    let pb = pb.clone();
                    let site_id = site_id.to_string();
                    async move {
                        let result =
                            fetch_channel(&fetcher, &site_id, &channel, start, end).await;
                        pb.inc(1);
                        (channel, result)
                    }
                })
                .buffered(CHANNEL_FETCH_CONCURRENCY)
                .collect()
                .await;
        pb.finish_and_clear();

        let mut streams = Vec::new();
        for (channel, result) in results {
            match result {
                Ok(samples) if !samples.is_empty() => streams.push((channel, samples)),
                Ok(_) => warn!("Channel {} returned no samples", channel.number),
                Err(e) => error!(
                    "Failed to retrieve channel data for channel number {}: {}",
                    channel.number, e
                ),
            }
        }
        if streams.is_empty() {
            return Err(DownloadError::NoData);
        }

        let mut series = merge_streams(&streams);
        info!(
            "Merged {} channels into {} rows",
            streams.len(),
            series.len()
        );

        let site_word = site.site_name.split_whitespace().next().unwrap_or("site");
        std::fs::create_dir_all(&self.output_dir)?;
        let csv_path = self.output_dir.join(format!("{site_word}.csv"));

        let interval = series.detect_interval().ok_or(DownloadError::NoInterval)?;
        let gaps_filled = series.fill_gaps(interval);
        series.write_csv(&csv_path)?;

        let (start, end) = series_range(&series).ok_or(DownloadError::NoData)?;
        info!("CSV file successfully processed and saved: {}", csv_path.display());

        Ok(SiteDownload {
            site_id: site.site_id,
            site_name: site.site_name,
            start,
            end,
            csv_path,
            gaps_filled,
            interval,
        })
    }
}

/// Repair a local CSV or XLSX export in place: sort, detect the interval,
/// fill gaps, and rewrite as CSV next to the source.
pub fn repair_file(path: &Path) -> Result<SiteDownload, DownloadError> {
    let mut series = loader::load(path)?;
    series.sort_by_timestamp();

    let interval = series.detect_interval().ok_or(DownloadError::NoInterval)?;
    let gaps_filled = series.fill_gaps(interval);

    let csv_path = path.with_extension("csv");
    series.write_csv(&csv_path)?;

    let (start, end) = series_range(&series).ok_or(DownloadError::NoData)?;
    let stem = path
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("file")
        .to_string();

    Ok(SiteDownload {
        site_id: stem.clone(),
        site_name: stem,
        start,
        end,
        csv_path,
        gaps_filled,
        interval,
    })
}

async fn fetch_channel(
    fetcher: &Fetcher,
    site_id: &str,
    channel: &ChannelInfo,
    start: Option<NaiveDateTime>,
    end: Option<NaiveDateTime>,
) -> Result<Vec<StreamSample>, FetchError> {
    let (start_epoch, end_epoch) = match (start, end) {
        (Some(s), Some(e)) => (to_epoch_ms(s), to_epoch_ms(e)),
        _ => {
            let details = fetcher.get_channel_details(site_id, &channel.number).await?;
            let first = details.first_sample().ok_or_else(|| {
                FetchError::InvalidTimestamp(format!(
                    "first sample of channel {}",
                    channel.number
                ))
            })?;
            (to_epoch_ms(first), details.end_date)
        }
    };
    fetcher
        .get_stream_data(site_id, &channel.number, start_epoch, end_epoch)
        .await
}

/// Outer-join the per-channel streams on their timestamps. Values are
/// rounded to 4 decimal places; timestamps that fail epoch conversion are
/// skipped.
fn merge_streams(streams: &[(ChannelInfo, Vec<StreamSample>)]) -> TimeSeries {
    let width = streams.len();
    let mut merged: BTreeMap<NaiveDateTime, Vec<Option<f64>>> = BTreeMap::new();

    for (idx, (channel, samples)) in streams.iter().enumerate() {
        for sample in samples {
            let Some(ts) = from_epoch_ms(sample.ts) else {
                warn!(
                    "Skipping sample with invalid timestamp {} on channel {}",
                    sample.ts, channel.number
                );
                continue;
            };
            merged.entry(ts).or_insert_with(|| vec![None; width])[idx] = Some(round4(sample.v));
        }
    }

    let mut series = TimeSeries::new("Timestamp");
    series.channels = streams
        .iter()
        .map(|(channel, _)| Channel {
            name: format!("{} ({})", channel.name.trim(), channel.units),
            values: Vec::with_capacity(merged.len()),
        })
        .collect();

    for (ts, row) in merged {
        series.timestamps.push(ts);
        for (idx, value) in row.into_iter().enumerate() {
            series.channels[idx].values.push(value);
        }
    }
    series
}

fn series_range(series: &TimeSeries) -> Option<(NaiveDateTime, NaiveDateTime)> {
    Some((
        *series.timestamps.first()?,
        *series.timestamps.last()?,
    ))
}

fn round4(v: f64) -> f64 {
    (v * 10_000.0).round() / 10_000.0
}

#[cfg(test)]
mod tests {
    use super::*;

    fn channel(number: &str, name: &str, units: &str) -> ChannelInfo {
        serde_json::from_value(serde_json::json!({
            "Number": number, "Name": name, "Units": units
        }))
        .unwrap()
    }

    #[test]
    fn test_merge_streams_outer_join() {
        let depth = channel("1", "Depth", "m");
        let velocity = channel("2", "Velocity", "m/s");
        // 2024-01-01 00:00 and 00:02 UTC
        let t0 = 1704067200000i64;
        let t2 = t0 + 120_000;

        let streams = vec![
            (
                depth,
                vec![
                    StreamSample { ts: t0, v: 0.123456 },
                    StreamSample { ts: t2, v: 0.2 },
                ],
            ),
            (velocity, vec![StreamSample { ts: t2, v: 0.9 }]),
        ];

        let series = merge_streams(&streams);
        assert_eq!(series.len(), 2);
        assert_eq!(series.channels[0].name, "Depth (m)");
        assert_eq!(series.channels[1].name, "Velocity (m/s)");
        // Rounded to 4 dp
        assert_eq!(series.channels[0].values, vec![Some(0.1235), Some(0.2)]);
        // Velocity has no sample at t0
        assert_eq!(series.channels[1].values, vec![None, Some(0.9)]);
    }

    #[test]
    fn test_round4() {
        assert_eq!(round4(1.23456789), 1.2346);
        assert_eq!(round4(-0.00004), -0.0);
    }
}
