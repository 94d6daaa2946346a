//! FDV flow file writer.
//!
//! A flow FDV carries FLOW/DEPTH/VELOCITY triplets: a fixed header block,
//! a constants section closed by `*CEND`, then fixed-width records five to
//! a line and an `*END` terminator. Flow is computed from depth and
//! velocity through the selected pipe geometry.

use std::io::Write;

use chrono::{Duration, NaiveDateTime};
use tracing::{debug, warn};

use crate::fdv::{identifier, FdvError};
use crate::geometry::FlowGeometry;
use crate::timeseries::{Channel, TimeSeries};

pub struct FdvFlowWriter {
    site_name: String,
    start: NaiveDateTime,
    end: NaiveDateTime,
    interval_minutes: i64,
    pipe_size_m: Option<f64>,
    value_count: usize,
    null_readings: usize,
}

impl FdvFlowWriter {
    pub fn new(
        site_name: impl Into<String>,
        start: NaiveDateTime,
        end: NaiveDateTime,
        interval: Duration,
    ) -> Self {
        Self {
            site_name: site_name.into(),
            start,
            end,
            interval_minutes: interval.num_seconds() / 60,
            pipe_size_m: None,
            value_count: 0,
            null_readings: 0,
        }
    }

    /// Record the pipe size constant (meters). Shapes without a single
    /// size (eggs, composites) leave it unset and the header carries -1.
    pub fn set_pipe_size(&mut self, meters: f64) {
        if meters > 0.0 {
            self.pipe_size_m = Some(meters);
        }
    }

    pub fn null_readings(&self) -> usize {
        self.null_readings
    }

    /// Write the complete FDV file. Returns the number of null depth
    /// readings encountered (they are emitted as zeros).
    pub fn write<W: Write>(
        &mut self,
        out: &mut W,
        series: &TimeSeries,
        depth_column: Option<&str>,
        velocity_column: Option<&str>,
        geometry: &dyn FlowGeometry,
    ) -> Result<usize, FdvError> {
        self.write_header(out)?;
        self.write_values(out, series, depth_column, velocity_column, geometry)?;
        self.write_tail(out)?;
        Ok(self.null_readings)
    }

    fn header_lines(&self) -> Vec<String> {
        vec![
            "**DATA_FORMAT:           1,ASCII".to_string(),
            format!("**IDENTIFIER:            1,{}", identifier(&self.site_name)),
            "**FIELD:                 3,FLOW,DEPTH,VELOCITY".to_string(),
            "**UNITS:                 3,L/S,MM,M/S".to_string(),
            "**FORMAT:                3,2I5,F5,[5]".to_string(),
            "**RECORD_LENGTH:         I2,75".to_string(),
            "**CONSTANTS:             6,HEIGHT,MIN_VEL,MANHOLE_NO,".to_string(),
            "*+START,END,INTERVAL".to_string(),
            "**C_UNITS:               6,MM,M/S,,GMT,GMT,MIN".to_string(),
            "**C_FORMAT:              10,I5,1X,F5,1X,A20/D10,1X,D10,1X,I2".to_string(),
            "*CSTART".to_string(),
            format!("{:7.3} UNKNOWN", self.pipe_size_m.unwrap_or(-1.0)),
        ]
    }

    fn write_header<W: Write>(&self, out: &mut W) -> Result<(), FdvError> {
        for line in self.header_lines() {
            writeln!(out, "{line}")?;
        }
        write!(out, "{} ", self.start.format("%Y%m%d%H%M"))?;
        write!(out, "{}   ", self.end.format("%Y%m%d%H%M"))?;
        writeln!(out, "{}", self.interval_minutes)?;
        writeln!(out, "*CEND")?;
        Ok(())
    }

    fn write_values<W: Write>(
        &mut self,
        out: &mut W,
        series: &TimeSeries,
        depth_column: Option<&str>,
        velocity_column: Option<&str>,
        geometry: &dyn FlowGeometry,
    ) -> Result<(), FdvError> {
        self.value_count = 1;
        self.null_readings = 0;

        let depth = resolve_column(series, depth_column, "Depth");
        let velocity = resolve_column(series, velocity_column, "Velocity");

        for row in 0..series.len() {
            let depth_value = match cell(depth, row) {
                Some(v) => v,
                None => {
                    if depth.is_some() {
                        self.null_readings += 1;
                    }
                    0.0
                }
            };
            let velocity_value = cell(velocity, row).unwrap_or(0.0);

            let flow = if depth_value == 0.0 || velocity_value == 0.0 {
                0.0
            } else {
                geometry.flow_rate(depth_value, velocity_value)
            };

            write!(
                out,
                "{:5.0}{:5.0}{:5.2}",
                flow,
                depth_value * 1000.0,
                velocity_value
            )?;
            if self.value_count % 5 == 0 {
                writeln!(out)?;
            }
            self.value_count += 1;
        }

        if self.value_count % 5 != 0 {
            writeln!(out)?;
        }

        debug!(
            "Wrote {} flow records ({} null depth readings)",
            series.len(),
            self.null_readings
        );
        Ok(())
    }

    fn write_tail<W: Write>(&self, out: &mut W) -> Result<(), FdvError> {
        writeln!(out)?;
        writeln!(out, "*END")?;
        Ok(())
    }
}

/// Look up a value column; a requested name that is not in the series is
/// treated as all zeros, matching the converter's tolerance of partial
/// exports.
fn resolve_column<'a>(
    series: &'a TimeSeries,
    name: Option<&str>,
    role: &str,
) -> Option<&'a Channel> {
    let name = name?;
    let channel = series.channel(name);
    if channel.is_none() {
        warn!("{role} column '{name}' not found in series; filling with 0.0");
    }
    channel
}

fn cell(channel: Option<&Channel>, row: usize) -> Option<f64> {
    channel
        .and_then(|c| c.values.get(row).copied().flatten())
        .filter(|v| v.is_finite())
}
