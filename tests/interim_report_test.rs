// End-to-end tests for report generation: CSV in, Excel workbook out.
// Workbooks are read back with calamine to verify sheet contents.

use std::fs;
use std::io::Write as IoWrite;

use calamine::{open_workbook, Data, Reader, Xlsx};
use chrono::Duration;
use fdv_converter::reports::{
    build_report, build_totals, write_final_report, write_interim_files, write_rainfall_totals,
    MonitorType,
};
use fdv_converter::timeseries::loader;
use tempfile::tempdir;

/// Ten days of flow data, four samples a day at 5 l/s on a 2-minute grid.
fn write_flow_csv(path: &std::path::Path) {
    let mut file = fs::File::create(path).unwrap();
    writeln!(file, "Timestamp,Flow (l/s)").unwrap();
    for day in 1..=10 {
        for sample in 0..4 {
            writeln!(
                file,
                "2024-06-{:02} 00:{:02}:00,5.0",
                day,
                sample * 2
            )
            .unwrap();
        }
    }
}

#[test]
fn test_final_report_workbook() {
    let dir = tempdir().unwrap();
    let csv_path = dir.path().join("site.csv");
    write_flow_csv(&csv_path);

    let mut series = loader::load(&csv_path).unwrap();
    series.sort_by_timestamp();
    let report = build_report(&series, MonitorType::Flow, None, None, None, None).unwrap();

    let report_path = dir.path().join("site_final_report.xlsx");
    write_final_report(&report_path, &series, &report).unwrap();

    let mut workbook: Xlsx<_> = open_workbook(&report_path).unwrap();
    assert_eq!(
        workbook.sheet_names(),
        vec!["Values", "Summary", "Daily"]
    );

    // Summary: 2 weekly rows + grand total under the header
    let summary = workbook.worksheet_range("Summary").unwrap();
    assert_eq!(
        summary.get((0, 2)),
        Some(&Data::String("Total Flow(m3)".to_string()))
    );
    assert_eq!(
        summary.get((1, 0)),
        Some(&Data::String("Interim 1".to_string()))
    );
    assert_eq!(
        summary.get((1, 1)),
        Some(&Data::String("01/06/2024 - 07/06/2024".to_string()))
    );
    // Week 1: 7 days * 4 samples * 5 l/s * 120 s / 1000 = 16.8 m3
    assert_eq!(summary.get((1, 2)), Some(&Data::Float(16.8)));
    assert_eq!(
        summary.get((3, 0)),
        Some(&Data::String("Grand Total".to_string()))
    );
    // Grand total: 10 days * 2.4 m3
    assert_eq!(summary.get((3, 2)), Some(&Data::Float(24.0)));

    // Daily sheet has a header and ten day rows
    let daily = workbook.worksheet_range("Daily").unwrap();
    assert_eq!(daily.get_size().0, 11);
    assert_eq!(
        daily.get((1, 0)),
        Some(&Data::String("01/06/2024".to_string()))
    );
    assert_eq!(daily.get((1, 4)), Some(&Data::Float(2.4)));

    // Values sheet carries the L and m3 columns for flow monitors
    let values = workbook.worksheet_range("Values").unwrap();
    assert_eq!(values.get((0, 2)), Some(&Data::String("L".to_string())));
    assert_eq!(values.get((0, 3)), Some(&Data::String("m3".to_string())));
    assert_eq!(values.get((1, 2)), Some(&Data::Float(600.0)));
}

#[test]
fn test_interim_split_files() {
    let dir = tempdir().unwrap();
    let csv_path = dir.path().join("site.csv");
    write_flow_csv(&csv_path);

    let mut series = loader::load(&csv_path).unwrap();
    series.sort_by_timestamp();
    let report = build_report(&series, MonitorType::Flow, None, None, None, None).unwrap();

    let files = write_interim_files(dir.path(), &report).unwrap();
    assert_eq!(files.len(), 2);
    assert!(dir.path().join("Interim 1").join("Interim 1.xlsx").exists());
    assert!(dir.path().join("Interim 2").join("Interim 2.xlsx").exists());

    // The second period only covers days 8-10
    let mut workbook: Xlsx<_> = open_workbook(&files[1]).unwrap();
    let sheet_name = workbook.sheet_names()[0].clone();
    let sheet = workbook.worksheet_range(&sheet_name).unwrap();
    assert_eq!(sheet.get_size().0, 4);
    assert_eq!(
        sheet.get((1, 0)),
        Some(&Data::String("08/06/2024".to_string()))
    );
}

#[test]
fn test_depth_report_columns() {
    let dir = tempdir().unwrap();
    let csv_path = dir.path().join("levels.csv");
    let mut file = fs::File::create(&csv_path).unwrap();
    writeln!(file, "Timestamp,Level (m)").unwrap();
    for day in 1..=7 {
        writeln!(file, "2024-06-{day:02} 09:00:00,0.25").unwrap();
        writeln!(file, "2024-06-{day:02} 15:00:00,0.35").unwrap();
    }
    drop(file);

    let mut series = loader::load(&csv_path).unwrap();
    series.sort_by_timestamp();
    let report = build_report(
        &series,
        MonitorType::Depth,
        None,
        Some(Duration::minutes(360)),
        None,
        None,
    )
    .unwrap();
    assert_eq!(report.value_column, "Level (m)");

    let report_path = dir.path().join("levels_final_report.xlsx");
    write_final_report(&report_path, &series, &report).unwrap();

    let mut workbook: Xlsx<_> = open_workbook(&report_path).unwrap();
    let summary = workbook.worksheet_range("Summary").unwrap();
    assert_eq!(
        summary.get((0, 2)),
        Some(&Data::String("Average Level(m)".to_string()))
    );
    assert_eq!(summary.get((1, 2)), Some(&Data::Float(0.3)));
    assert_eq!(summary.get((1, 3)), Some(&Data::Float(0.35)));
    assert_eq!(summary.get((1, 4)), Some(&Data::Float(0.25)));

    // No L/m3 columns for depth monitors
    let values = workbook.worksheet_range("Values").unwrap();
    assert_eq!(values.get_size().1, 2);
}

#[test]
fn test_rainfall_totals_workbook() {
    let dir = tempdir().unwrap();
    let csv_path = dir.path().join("rain.csv");
    let mut file = fs::File::create(&csv_path).unwrap();
    writeln!(file, "Timestamp,Rainfall (mm)").unwrap();
    // Wed Jun 5 through Tue Jun 11, 0.5 mm twice a day
    for day in 5..=11 {
        writeln!(file, "2024-06-{day:02} 09:00:00,0.5").unwrap();
        writeln!(file, "2024-06-{day:02} 15:00:00,0.5").unwrap();
    }
    drop(file);

    let series = loader::load(&csv_path).unwrap();
    let totals = build_totals(&series, None).unwrap();

    let path = dir.path().join("rainfall_totals.xlsx");
    write_rainfall_totals(&path, &totals).unwrap();

    let mut workbook: Xlsx<_> = open_workbook(&path).unwrap();
    assert_eq!(
        workbook.sheet_names(),
        vec!["Daily Totals", "Weekly Totals"]
    );

    let daily = workbook.worksheet_range("Daily Totals").unwrap();
    assert_eq!(daily.get_size().0, 8);
    assert_eq!(
        daily.get((1, 0)),
        Some(&Data::String("05/06/2024".to_string()))
    );
    assert_eq!(daily.get((1, 1)), Some(&Data::Float(1.0)));

    let weekly = workbook.worksheet_range("Weekly Totals").unwrap();
    // Week of Mon Jun 3 (5 days in range) and week of Mon Jun 10 (2 days)
    assert_eq!(weekly.get_size().0, 3);
    assert_eq!(
        weekly.get((1, 0)),
        Some(&Data::String("03/06/2024".to_string()))
    );
    assert_eq!(weekly.get((1, 1)), Some(&Data::Float(5.0)));
    assert_eq!(weekly.get((2, 1)), Some(&Data::Float(2.0)))
}
