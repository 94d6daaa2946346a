//! Interim report aggregation: weekly summary windows, a daily breakdown,
//! and a grand total over a monitored series.

use std::collections::BTreeMap;
use std::str::FromStr;

use chrono::{Duration, NaiveDate, NaiveDateTime};
use tracing::{debug, info};

use crate::reports::ReportError;
use crate::timeseries::TimeSeries;

/// The physical quantity the logger recorded; selects report columns.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MonitorType {
    Flow,
    Depth,
}

impl MonitorType {
    /// Keywords used to locate the monitored column in the header.
    pub fn keywords(&self) -> &'static [&'static str] {
        match self {
            MonitorType::Flow => &["flow"],
            MonitorType::Depth => &["depth", "level"],
        }
    }
}

impl FromStr for MonitorType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "flow" => Ok(MonitorType::Flow),
            "depth" => Ok(MonitorType::Depth),
            other => Err(format!("unknown monitor type '{other}' (expected flow or depth)")),
        }
    }
}

/// One weekly window with data. For flow monitors `total_m3` carries the
/// volume; for depth monitors `average` carries the mean level.
#[derive(Debug, Clone)]
pub struct WeeklySummary {
    pub period: String,
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
    pub total_m3: f64,
    pub average: f64,
    pub max: f64,
    pub min: f64,
}

impl WeeklySummary {
    pub fn date_range(&self) -> String {
        format!(
            "{} - {}",
            self.start.format("%d/%m/%Y"),
            self.end.format("%d/%m/%Y")
        )
    }
}

#[derive(Debug, Clone)]
pub struct DailySummary {
    pub date: NaiveDate,
    pub average: f64,
    pub max: f64,
    pub min: f64,
    pub total_m3: f64,
}

#[derive(Debug, Clone)]
pub struct GrandTotal {
    pub total_m3: f64,
    pub average: f64,
    pub max: f64,
    pub min: f64,
}

#[derive(Debug)]
pub struct InterimReport {
    pub monitor: MonitorType,
    pub value_column: String,
    pub interval: Duration,
    pub weekly: Vec<WeeklySummary>,
    pub grand_total: GrandTotal,
    pub daily: Vec<DailySummary>,
}

/// Build the interim report for a series.
///
/// The monitored column is either named explicitly or located by the
/// monitor type's keywords. The interval (for volume integration) is
/// detected from the timestamps unless supplied. Weekly windows start at
/// the first sample's midnight (or `start_date`) and run in 7-day blocks;
/// windows without usable samples are skipped.
pub fn build_report(
    series: &TimeSeries,
    monitor: MonitorType,
    column: Option<&str>,
    interval: Option<Duration>,
    start_date: Option<NaiveDate>,
    end_date: Option<NaiveDate>,
) -> Result<InterimReport, ReportError> {
    let value_column = resolve_column(series, monitor, column)?;
    info!("Using {:?} column: {}", monitor, value_column);

    let interval = match interval {
        Some(i) => i,
        None => series.detect_interval().ok_or(ReportError::NoInterval)?,
    };
    let interval_seconds = interval.num_seconds() as f64;

    let samples = collect_samples(series, &value_column);
    if samples.is_empty() {
        return Err(ReportError::EmptySeries);
    }

    let weekly = weekly_summaries(
        &samples,
        monitor,
        interval_seconds,
        start_date,
        end_date,
    );
    if weekly.is_empty() {
        return Err(ReportError::EmptySeries);
    }
    let grand_total = grand_total(&weekly, monitor);
    let daily = daily_summaries(&samples, interval_seconds);

    debug!(
        "Report has {} weekly windows and {} days",
        weekly.len(),
        daily.len()
    );

    Ok(InterimReport {
        monitor,
        value_column,
        interval,
        weekly,
        grand_total,
        daily,
    })
}

fn resolve_column(
    series: &TimeSeries,
    monitor: MonitorType,
    column: Option<&str>,
) -> Result<String, ReportError> {
    match column {
        Some(name) => series
            .channel(name)
            .map(|c| c.name.clone())
            .ok_or_else(|| ReportError::ColumnNotFound(name.to_string())),
        None => series
            .find_column(monitor.keywords())
            .map(|c| c.name.clone())
            .ok_or_else(|| ReportError::ColumnNotFound(monitor.keywords().join("/"))),
    }
}

/// Timestamp/value pairs for the monitored column, gaps and non-finite
/// values excluded. Sorted by timestamp.
fn collect_samples(series: &TimeSeries, column: &str) -> Vec<(NaiveDateTime, f64)> {
    let Some(channel) = series.channel(column) else {
        return Vec::new();
    };
    let mut samples: Vec<(NaiveDateTime, f64)> = series
        .timestamps
        .iter()
        .zip(channel.values.iter())
        .filter_map(|(&ts, &v)| v.filter(|x| x.is_finite()).map(|x| (ts, x)))
        .collect();
    samples.sort_by_key(|&(ts, _)| ts);
    samples
}

fn weekly_summaries(
    samples: &[(NaiveDateTime, f64)],
    monitor: MonitorType,
    interval_seconds: f64,
    start_date: Option<NaiveDate>,
    end_date: Option<NaiveDate>,
) -> Vec<WeeklySummary> {
    let first = samples[0].0;
    let last = samples[samples.len() - 1].0;

    let mut window_start = start_date
        .unwrap_or_else(|| first.date())
        .and_hms_opt(0, 0, 0)
        .unwrap_or(first);
    let range_end = end_date
        .unwrap_or_else(|| last.date())
        .and_hms_opt(23, 59, 59)
        .unwrap_or(last);

    let mut summaries = Vec::new();
    while window_start <= range_end {
        let window_end = window_start + Duration::days(6) + Duration::seconds(86_399);
        let window: Vec<f64> = samples
            .iter()
            .filter(|&&(ts, _)| ts >= window_start && ts <= window_end)
            .map(|&(_, v)| v)
            .collect();

        if !window.is_empty() {
            let stats = stats(&window);
            let total_m3 = match monitor {
                MonitorType::Flow => window.iter().sum::<f64>() * interval_seconds / 1000.0,
                MonitorType::Depth => 0.0,
            };
            summaries.push(WeeklySummary {
                period: format!("Interim {}", summaries.len() + 1),
                start: window_start,
                end: window_end,
                total_m3,
                average: stats.mean,
                max: stats.max,
                min: stats.min,
            });
        }
        window_start = window_end + Duration::seconds(1);
    }
    summaries
}

fn grand_total(weekly: &[WeeklySummary], monitor: MonitorType) -> GrandTotal {
    let max = weekly.iter().map(|w| w.max).fold(f64::NEG_INFINITY, f64::max);
    let min = weekly.iter().map(|w| w.min).fold(f64::INFINITY, f64::min);
    match monitor {
        MonitorType::Flow => GrandTotal {
            total_m3: weekly.iter().map(|w| w.total_m3).sum(),
            average: 0.0,
            max,
            min,
        },
        MonitorType::Depth => GrandTotal {
            total_m3: 0.0,
            average: weekly.iter().map(|w| w.average).sum::<f64>() / weekly.len() as f64,
            max,
            min,
        },
    }
}

fn daily_summaries(
    samples: &[(NaiveDateTime, f64)],
    interval_seconds: f64,
) -> Vec<DailySummary> {
    let mut by_day: BTreeMap<NaiveDate, Vec<f64>> = BTreeMap::new();
    for &(ts, v) in samples {
        by_day.entry(ts.date()).or_default().push(v);
    }

    by_day
        .into_iter()
        .map(|(date, values)| {
            let s = stats(&values);
            DailySummary {
                date,
                average: s.mean,
                max: s.max,
                min: s.min,
                total_m3: values.iter().sum::<f64>() * interval_seconds / 1000.0,
            }
        })
        .collect()
}

struct Stats {
    mean: f64,
    max: f64,
    min: f64,
}

fn stats(values: &[f64]) -> Stats {
    let sum: f64 = values.iter().sum();
    Stats {
        mean: sum / values.len() as f64,
        max: values.iter().copied().fold(f64::NEG_INFINITY, f64::max),
        min: values.iter().copied().fold(f64::INFINITY, f64::min),
    }
}
