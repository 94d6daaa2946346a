// Tests for the FDV flow writer: header block, fixed-width records, null
// accounting. Expected output verified against real converter output.

use chrono::{Duration, NaiveDate, NaiveDateTime};
use fdv_converter::fdv::FdvFlowWriter;
use fdv_converter::geometry::{build_geometry, PipeShape};
use fdv_converter::timeseries::{Channel, TimeSeries};

fn dt(h: u32, m: u32) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2024, 3, 1)
        .unwrap()
        .and_hms_opt(h, m, 0)
        .unwrap()
}

fn sample_series() -> TimeSeries {
    let mut series = TimeSeries::new("Timestamp");
    series.timestamps = (0..7).map(|i| dt(0, i * 2)).collect();
    series.channels = vec![
        Channel {
            name: "Depth (m)".to_string(),
            values: vec![
                Some(0.1),
                Some(0.2),
                None,
                Some(0.3),
                Some(0.0),
                Some(0.25),
                Some(0.15),
            ],
        },
        Channel {
            name: "Velocity (m/s)".to_string(),
            values: vec![
                Some(0.5),
                Some(0.6),
                Some(0.7),
                Some(0.8),
                Some(0.9),
                None,
                Some(0.55),
            ],
        },
    ];
    series
}

fn write_sample(site_name: &str) -> (String, usize) {
    let series = sample_series();
    let built = build_geometry(PipeShape::Circular, "450").unwrap();

    let mut writer = FdvFlowWriter::new(site_name, dt(0, 0), dt(0, 12), Duration::minutes(2));
    if let Some(size) = built.pipe_size_m {
        writer.set_pipe_size(size);
    }

    let mut out = Vec::new();
    let nulls = writer
        .write(
            &mut out,
            &series,
            Some("Depth (m)"),
            Some("Velocity (m/s)"),
            built.geometry.as_ref(),
        )
        .unwrap();
    (String::from_utf8(out).unwrap(), nulls)
}

#[test]
fn test_golden_output() {
    let (output, nulls) = write_sample("Shuttertown Main Outfall");

    let expected = "\
**DATA_FORMAT:           1,ASCII
**IDENTIFIER:            1,SHUTTERTOWN MAI
**FIELD:                 3,FLOW,DEPTH,VELOCITY
**UNITS:                 3,L/S,MM,M/S
**FORMAT:                3,2I5,F5,[5]
**RECORD_LENGTH:         I2,75
**CONSTANTS:             6,HEIGHT,MIN_VEL,MANHOLE_NO,
*+START,END,INTERVAL
**C_UNITS:               6,MM,M/S,,GMT,GMT,MIN
**C_FORMAT:              10,I5,1X,F5,1X,A20/D10,1X,D10,1X,I2
*CSTART
  0.450 UNKNOWN
202403010000 202403010012   2
*CEND
   13  100 0.50   41  200 0.60    0    0 0.70   90  300 0.80    0    0 0.90
    0  250 0.00   26  150 0.55

*END
";
    assert_eq!(output, expected);
    assert_eq!(nulls, 1);
}

#[test]
fn test_null_depth_becomes_zero_record() {
    let (output, _) = write_sample("Shuttertown");
    // Row 3 has a null depth: flow and depth are zero but the velocity is
    // still carried through.
    assert!(output.contains("    0    0 0.70"));
}

#[test]
fn test_zero_depth_or_velocity_suppresses_flow() {
    let (output, _) = write_sample("Shuttertown");
    // Depth 0.0 at 0.9 m/s and depth 0.25 with null velocity both give
    // zero flow.
    assert!(output.contains("    0    0 0.90"));
    assert!(output.contains("    0  250 0.00"));
}

#[test]
fn test_five_records_per_line() {
    let (output, _) = write_sample("Shuttertown");
    let values: Vec<&str> = output
        .lines()
        .skip_while(|l| *l != "*CEND")
        .skip(1)
        .take_while(|l| !l.is_empty())
        .collect();
    // 7 records = one full line of 5 plus one of 2; each record is 15
    // characters wide.
    assert_eq!(values.len(), 2);
    assert_eq!(values[0].len(), 75);
    assert_eq!(values[1].len(), 30);
}

#[test]
fn test_missing_columns_write_zeros_without_nulls() {
    let series = sample_series();
    let built = build_geometry(PipeShape::Circular, "450").unwrap();
    let mut writer =
        FdvFlowWriter::new("Shuttertown", dt(0, 0), dt(0, 12), Duration::minutes(2));

    let mut out = Vec::new();
    let nulls = writer
        .write(
            &mut out,
            &series,
            Some("No Such Column"),
            None,
            built.geometry.as_ref(),
        )
        .unwrap();

    // A column that does not exist is all zeros, not null readings.
    assert_eq!(nulls, 0);
    let output = String::from_utf8(out).unwrap();
    assert!(output.contains("    0    0 0.00"));
}

#[test]
fn test_eggs_leave_pipe_size_unset() {
    let series = sample_series();
    let built = build_geometry(PipeShape::EggType1, "450,675,675").unwrap();
    assert_eq!(built.pipe_size_m, None);

    let mut writer =
        FdvFlowWriter::new("Shuttertown", dt(0, 0), dt(0, 12), Duration::minutes(2));
    let mut out = Vec::new();
    writer
        .write(
            &mut out,
            &series,
            Some("Depth (m)"),
            Some("Velocity (m/s)"),
            built.geometry.as_ref(),
        )
        .unwrap();

    let output = String::from_utf8(out).unwrap();
    assert!(output.contains(" -1.000 UNKNOWN\n"));
}
