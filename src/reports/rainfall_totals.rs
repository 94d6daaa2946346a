//! Daily and weekly rainfall totals.

use std::collections::BTreeMap;

use chrono::{Datelike, Duration, NaiveDate};
use tracing::info;

use crate::reports::ReportError;
use crate::timeseries::TimeSeries;

const RAINFALL_KEYWORDS: &[&str] = &["rainfall", "rain"];

#[derive(Debug, Clone)]
pub struct DailyTotal {
    pub date: NaiveDate,
    pub total_mm: f64,
}

#[derive(Debug, Clone)]
pub struct WeeklyTotal {
    pub week_starting: NaiveDate,
    pub total_mm: f64,
}

#[derive(Debug)]
pub struct RainfallTotals {
    pub rainfall_column: String,
    pub daily: Vec<DailyTotal>,
    pub weekly: Vec<WeeklyTotal>,
}

/// Sum the rainfall column per calendar day and per week starting Monday.
/// Gap cells contribute nothing.
pub fn build_totals(
    series: &TimeSeries,
    column: Option<&str>,
) -> Result<RainfallTotals, ReportError> {
    let channel = match column {
        Some(name) => series
            .channel(name)
            .ok_or_else(|| ReportError::ColumnNotFound(name.to_string()))?,
        None => series
            .find_column(RAINFALL_KEYWORDS)
            .ok_or_else(|| ReportError::ColumnNotFound(RAINFALL_KEYWORDS.join("/")))?,
    };
    info!("Using rainfall column: {}", channel.name);

    let mut daily: BTreeMap<NaiveDate, f64> = BTreeMap::new();
    let mut weekly: BTreeMap<NaiveDate, f64> = BTreeMap::new();
    let mut usable = 0usize;

    for (ts, value) in series.timestamps.iter().zip(channel.values.iter()) {
        let Some(v) = (*value).filter(|v| v.is_finite()) else {
            continue;
        };
        usable += 1;
        let date = ts.date();
        *daily.entry(date).or_insert(0.0) += v;
        *weekly.entry(week_start(date)).or_insert(0.0) += v;
    }

    if usable == 0 {
        return Err(ReportError::EmptySeries);
    }

    Ok(RainfallTotals {
        rainfall_column: channel.name.clone(),
        daily: daily
            .into_iter()
            .map(|(date, total_mm)| DailyTotal { date, total_mm })
            .collect(),
        weekly: weekly
            .into_iter()
            .map(|(week_starting, total_mm)| WeeklyTotal {
                week_starting,
                total_mm,
            })
            .collect(),
    })
}

/// Monday of the week the date falls in.
fn week_start(date: NaiveDate) -> NaiveDate {
    date - Duration::days(date.weekday().num_days_from_monday() as i64)
}
