// Tests for the FDV rainfall writer, in particular the burst
// redistribution buffer. Expected value sequences verified against real
// converter output.

use chrono::{Duration, NaiveDate, NaiveDateTime};
use fdv_converter::fdv::{FdvError, FdvRainfallWriter};
use fdv_converter::timeseries::{Channel, TimeSeries};

fn dt(h: u32, m: u32) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2024, 3, 1)
        .unwrap()
        .and_hms_opt(h, m, 0)
        .unwrap()
}

fn rain_series(values: Vec<Option<f64>>) -> TimeSeries {
    let mut series = TimeSeries::new("Timestamp");
    series.timestamps = (0..values.len() as u32).map(|i| dt(0, i * 2)).collect();
    series.channels = vec![Channel {
        name: "Rainfall (mm)".to_string(),
        values,
    }];
    series
}

fn write_rain(values: Vec<Option<f64>>) -> (String, usize) {
    let series = rain_series(values.clone());
    let end = dt(0, (values.len() as u32 - 1) * 2);
    let mut writer = FdvRainfallWriter::new("Shuttertown", dt(0, 0), end, Duration::minutes(2));

    let mut out = Vec::new();
    let nulls = writer.write(&mut out, &series, "Rainfall (mm)").unwrap();
    (String::from_utf8(out).unwrap(), nulls)
}

fn value_section(output: &str) -> Vec<f64> {
    output
        .lines()
        .skip_while(|l| *l != "*CEND")
        .skip(1)
        .take_while(|l| !l.is_empty())
        .flat_map(|l| l.split_whitespace())
        .map(|v| v.parse::<f64>().unwrap())
        .collect()
}

#[test]
fn test_golden_redistribution() {
    let (output, nulls) = write_rain(vec![
        Some(0.0),
        Some(0.0),
        Some(1.2),
        Some(0.0),
        Some(0.0),
        Some(0.0),
        Some(0.0),
        Some(8.4),
        Some(0.0),
        Some(0.4),
        None,
        Some(0.2),
    ]);

    // 1.2 spreads over itself and the two dry samples before it; the 8.4
    // burst spreads the 6.0 cap over four dry samples and keeps the 2.4
    // excess; the trailing 0.4 and 0.2 each split with one dry sample.
    assert_eq!(
        value_section(&output),
        vec![0.4, 0.4, 0.4, 1.5, 1.5, 1.5, 1.5, 2.4, 0.2, 0.2, 0.1, 0.1]
    );
    assert_eq!(nulls, 1);
    assert!(output.contains("**IDENTIFIER:            1,SHUTTERTOWN\n"));
    assert!(output.contains("202403010000 202403010022   2\n*CEND\n"));
    assert!(output.ends_with("\n*END\n"));
}

#[test]
fn test_small_sample_spreads_evenly() {
    let (output, _) = write_rain(vec![Some(0.0), Some(0.0), Some(0.0), Some(0.9)]);
    // 0.9 over three dry samples plus itself.
    let values = value_section(&output);
    assert_eq!(values.len(), 4);
    for v in values {
        assert!((v - 0.225).abs() < 0.051); // printed at one decimal place
    }
}

#[test]
fn test_dry_series_passes_through() {
    let (output, nulls) = write_rain(vec![Some(0.0); 7]);
    assert_eq!(value_section(&output), vec![0.0; 7]);
    assert_eq!(nulls, 0);
}

#[test]
fn test_lookback_stops_at_wet_sample() {
    // The wet 2.0 sample fences the look-back: the final 1.0 only spreads
    // over the two dry samples after it.
    let (output, _) = write_rain(vec![Some(2.0), Some(0.0), Some(0.0), Some(1.0)]);
    let values = value_section(&output);
    assert!((values[0] - 2.0).abs() < 0.05);
    assert!((values[1] - 0.3).abs() < 0.05);
    assert!((values[2] - 0.3).abs() < 0.05);
    assert!((values[3] - 0.3).abs() < 0.05);
}

#[test]
fn test_records_are_fifteen_wide_five_per_line() {
    let (output, _) = write_rain(vec![Some(0.1); 12]);
    let lines: Vec<&str> = output
        .lines()
        .skip_while(|l| *l != "*CEND")
        .skip(1)
        .take_while(|l| !l.is_empty())
        .collect();
    assert_eq!(lines.len(), 3);
    assert_eq!(lines[0].len(), 75);
    assert_eq!(lines[2].len(), 30);
}

#[test]
fn test_empty_column_name_rejected() {
    let series = rain_series(vec![Some(0.0)]);
    let mut writer =
        FdvRainfallWriter::new("Shuttertown", dt(0, 0), dt(0, 2), Duration::minutes(2));
    let mut out = Vec::new();
    let result = writer.write(&mut out, &series, "");
    assert!(matches!(result, Err(FdvError::MissingRainfallColumn)));
}
