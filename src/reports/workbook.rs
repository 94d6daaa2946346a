//! Excel output for the report module.
//!
//! The final report workbook carries three sheets (Values, Summary, Daily);
//! rainfall totals get their own two-sheet workbook; the optional split
//! export writes one small workbook per interim period.

use std::path::{Path, PathBuf};

use rust_xlsxwriter::{Workbook, Worksheet};
use tracing::info;

use crate::reports::interim::{DailySummary, InterimReport, MonitorType};
use crate::reports::rainfall_totals::RainfallTotals;
use crate::reports::ReportError;
use crate::timeseries::{TimeSeries, TIMESTAMP_FORMAT};

const DATE_FORMAT: &str = "%d/%m/%Y";

/// Write the full interim report workbook: raw values, weekly summary with
/// grand total, and the daily breakdown.
pub fn write_final_report(
    path: &Path,
    series: &TimeSeries,
    report: &InterimReport,
) -> Result<(), ReportError> {
    let mut workbook = Workbook::new();

    write_values_sheet(workbook.add_worksheet(), series, report)?;
    write_summary_sheet(workbook.add_worksheet(), report)?;
    write_daily_sheet(workbook.add_worksheet(), report)?;

    workbook.save(path)?;
    info!("Final report saved to {}", path.display());
    Ok(())
}

/// One workbook per interim period, each holding that period's daily rows,
/// under `{output_dir}/Interim N/Interim N.xlsx`.
pub fn write_interim_files(
    output_dir: &Path,
    report: &InterimReport,
) -> Result<Vec<PathBuf>, ReportError> {
    let mut written = Vec::new();

    for week in &report.weekly {
        let days: Vec<&DailySummary> = report
            .daily
            .iter()
            .filter(|d| d.date >= week.start.date() && d.date <= week.end.date())
            .collect();

        let dir = output_dir.join(&week.period);
        std::fs::create_dir_all(&dir)?;
        let path = dir.join(format!("{}.xlsx", week.period));

        let mut workbook = Workbook::new();
        let sheet = workbook.add_worksheet();
        write_daily_rows(sheet, report.monitor, days.into_iter())?;
        workbook.save(&path)?;

        written.push(path);
    }

    info!("Saved {} interim period files", written.len());
    Ok(written)
}

/// Two-sheet workbook with daily and weekly rainfall totals.
pub fn write_rainfall_totals(path: &Path, totals: &RainfallTotals) -> Result<(), ReportError> {
    let mut workbook = Workbook::new();

    let daily = workbook.add_worksheet();
    daily.set_name("Daily Totals")?;
    daily.write_string(0, 0, "Date")?;
    daily.write_string(0, 1, "Daily Total (mm)")?;
    for (row, total) in totals.daily.iter().enumerate() {
        let row = row as u32 + 1;
        daily.write_string(row, 0, total.date.format(DATE_FORMAT).to_string())?;
        daily.write_number(row, 1, total.total_mm)?;
    }

    let weekly = workbook.add_worksheet();
    weekly.set_name("Weekly Totals")?;
    weekly.write_string(0, 0, "Week Starting")?;
    weekly.write_string(0, 1, "Weekly Total (mm)")?;
    for (row, total) in totals.weekly.iter().enumerate() {
        let row = row as u32 + 1;
        weekly.write_string(row, 0, total.week_starting.format(DATE_FORMAT).to_string())?;
        weekly.write_number(row, 1, total.total_mm)?;
    }

    workbook.save(path)?;
    info!("Rainfall totals saved to {}", path.display());
    Ok(())
}

fn write_values_sheet(
    sheet: &mut Worksheet,
    series: &TimeSeries,
    report: &InterimReport,
) -> Result<(), ReportError> {
    sheet.set_name("Values")?;

    sheet.write_string(0, 0, series.timestamp_column.clone())?;
    for (col, name) in series.column_names().iter().enumerate() {
        sheet.write_string(0, col as u16 + 1, name.to_string())?;
    }
    // Flow monitors append the per-sample volume columns.
    let litres_col = series.channels.len() as u16 + 1;
    if report.monitor == MonitorType::Flow {
        sheet.write_string(0, litres_col, "L")?;
        sheet.write_string(0, litres_col + 1, "m3")?;
    }

    let interval_seconds = report.interval.num_seconds() as f64;
    let value_channel = series.channel(&report.value_column);

    for row in 0..series.len() {
        let out_row = row as u32 + 1;
        sheet.write_string(
            out_row,
            0,
            series.timestamps[row].format(TIMESTAMP_FORMAT).to_string(),
        )?;
        for (col, channel) in series.channels.iter().enumerate() {
            if let Some(v) = channel.values[row] {
                sheet.write_number(out_row, col as u16 + 1, v)?;
            }
        }
        if report.monitor == MonitorType::Flow {
            if let Some(v) = value_channel.and_then(|c| c.values[row]) {
                let litres = v * interval_seconds;
                sheet.write_number(out_row, litres_col, litres)?;
                sheet.write_number(out_row, litres_col + 1, litres / 1000.0)?;
            }
        }
    }
    Ok(())
}

fn write_summary_sheet(sheet: &mut Worksheet, report: &InterimReport) -> Result<(), ReportError> {
    sheet.set_name("Summary")?;

    let headers: [&str; 5] = match report.monitor {
        MonitorType::Flow => [
            "Interim Period",
            "Date Range",
            "Total Flow(m3)",
            "Max Flow(l/s)",
            "Min Flow(l/s)",
        ],
        MonitorType::Depth => [
            "Interim Period",
            "Date Range",
            "Average Level(m)",
            "Max Level(m)",
            "Min Level(m)",
        ],
    };
    for (col, header) in headers.iter().enumerate() {
        sheet.write_string(0, col as u16, *header)?;
    }

    for (row, week) in report.weekly.iter().enumerate() {
        let row = row as u32 + 1;
        sheet.write_string(row, 0, week.period.clone())?;
        sheet.write_string(row, 1, week.date_range())?;
        let lead = match report.monitor {
            MonitorType::Flow => week.total_m3,
            MonitorType::Depth => week.average,
        };
        sheet.write_number(row, 2, lead)?;
        sheet.write_number(row, 3, week.max)?;
        sheet.write_number(row, 4, week.min)?;
    }

    let total_row = report.weekly.len() as u32 + 1;
    sheet.write_string(total_row, 0, "Grand Total")?;
    sheet.write_string(total_row, 1, "")?;
    let lead = match report.monitor {
        MonitorType::Flow => report.grand_total.total_m3,
        MonitorType::Depth => report.grand_total.average,
    };
    sheet.write_number(total_row, 2, lead)?;
    sheet.write_number(total_row, 3, report.grand_total.max)?;
    sheet.write_number(total_row, 4, report.grand_total.min)?;
    Ok(())
}

fn write_daily_sheet(sheet: &mut Worksheet, report: &InterimReport) -> Result<(), ReportError> {
    sheet.set_name("Daily")?;
    write_daily_rows(sheet, report.monitor, report.daily.iter())
}

fn write_daily_rows<'a>(
    sheet: &mut Worksheet,
    monitor: MonitorType,
    days: impl Iterator<Item = &'a DailySummary>,
) -> Result<(), ReportError> {
    let headers: &[&str] = match monitor {
        MonitorType::Flow => &[
            "Date",
            "Average Flow(l/s)",
            "Max Flow(l/s)",
            "Min Flow(l/s)",
            "Flow (m3)",
        ],
        MonitorType::Depth => &[
            "Date",
            "Average Level(m)",
            "Max Level(m)",
            "Min Level(m)",
        ],
    };
    for (col, header) in headers.iter().enumerate() {
        sheet.write_string(0, col as u16, *header)?;
    }

    for (row, day) in days.enumerate() {
        let row = row as u32 + 1;
        sheet.write_string(row, 0, day.date.format(DATE_FORMAT).to_string())?;
        sheet.write_number(row, 1, day.average)?;
        sheet.write_number(row, 2, day.max)?;
        sheet.write_number(row, 3, day.min)?;
        if monitor == MonitorType::Flow {
            sheet.write_number(row, 4, day.total_m3)?;
        }
    }
    Ok(())
}
