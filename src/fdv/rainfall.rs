//! FDV rainfall file writer.
//!
//! Rainfall FDVs carry a single INTENSITY field. Tipping-bucket exports
//! often register an entire shower on one sample with dead samples before
//! it, so values pass through a look-back buffer that redistributes each
//! burst across up to four preceding dry samples before anything is
//! written out.

use std::collections::VecDeque;
use std::io::Write;

use chrono::{Duration, NaiveDateTime};
use tracing::{debug, warn};

use crate::fdv::{identifier, FdvError};
use crate::timeseries::TimeSeries;

/// Values below this are treated as dry samples.
const WET_THRESHOLD: f64 = 1.0e-5;
/// Redistribution never reaches further back than this many dry samples.
const LOOKBACK: usize = 4;
/// Intensity spread over the look-back window is capped at this total; the
/// remainder stays on the current sample.
const SPREAD_CAP: f64 = 6.0;
const DRAIN_SIZE: usize = 10;

pub struct FdvRainfallWriter {
    site_name: String,
    start: NaiveDateTime,
    end: NaiveDateTime,
    interval_minutes: i64,
    buffer: VecDeque<f64>,
    value_count: usize,
    null_readings: usize,
}

impl FdvRainfallWriter {
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
            buffer: VecDeque::new(),
            value_count: 0,
            null_readings: 0,
        }
    }

    pub fn null_readings(&self) -> usize {
        self.null_readings
    }

    /// Write the complete rainfall FDV. Returns the number of null
    /// readings (gap cells written as zeros).
    pub fn write<W: Write>(
        &mut self,
        out: &mut W,
        series: &TimeSeries,
        rainfall_column: &str,
    ) -> Result<usize, FdvError> {
        if rainfall_column.is_empty() {
            return Err(FdvError::MissingRainfallColumn);
        }

        self.write_header(out)?;
        self.write_values(out, series, rainfall_column)?;
        self.write_tail(out)?;
        Ok(self.null_readings)
    }

    fn header_lines(&self) -> Vec<String> {
        vec![
            "**DATA_FORMAT:           1,ASCII".to_string(),
            format!("**IDENTIFIER:            1,{}", identifier(&self.site_name)),
            "**FIELD:                 1,INTENSITY".to_string(),
            "**UNITS:                 1,MM/HR".to_string(),
            "**FORMAT:                2,F15.1,[5]".to_string(),
            "**RECORD_LENGTH:         I2,75".to_string(),
            "**CONSTANTS:             35,LOCATION,0_ANT_RAIN,1_ANT_RAIN,2_ANT_RAIN,".to_string(),
            "*+                       3_ANT_RAIN,4_ANT_RAIN,5_ANT_RAIN,6_ANT_RAIN,".to_string(),
            "*+                       7_ANT_RAIN,8_ANT_RAIN,9_ANT_RAIN,10_ANT_RAIN,".to_string(),
            "*+                       11_ANT_RAIN,12_ANT_RAIN,13_ANT_RAIN,14_ANT_RAIN,"
                .to_string(),
            "*+                       15_ANT_RAIN,16_ANT_RAIN,17_ANT_RAIN,18_ANT_RAIN,"
                .to_string(),
            "*+                       19_ANT_RAIN,20_ANT_RAIN,21_ANT_RAIN,22_ANT_RAIN,"
                .to_string(),
            "*+                       23_ANT_RAIN,24_ANT_RAIN,25_ANT_RAIN,26_ANT_RAIN,"
                .to_string(),
            "*+                       27_ANT_RAIN,28_ANT_RAIN,29_ANT_RAIN,30_ANT_RAIN,"
                .to_string(),
            "*+                       START,END,INTERVAL".to_string(),
            "**C_UNITS:               35, ,MM,MM,MM,MM,MM,MM,MM,MM,MM,MM,".to_string(),
            "**C_UNITS:               MM,MM,MM,MM,MM,MM,MM,MM,MM,MM,MM,".to_string(),
            "**C_UNITS:               MM,MM,MM,MM,MM,MM,MM,MM,MM,MM,GMT,GMT,MIN".to_string(),
            "**C_FORMAT:              8,A20,F7.2/15F5.1/15F5.1/D10,2X,D10,I4".to_string(),
            "*CSTART".to_string(),
            "UNKNOWN              -1.0 ".to_string(),
            "-1.0 -1.0 -1.0 -1.0 -1.0 -1.0 -1.0 -1.0 -1.0 -1.0 -1.0 -1.0 -1.0 -1.0 -1.0 "
                .to_string(),
            "-1.0 -1.0 -1.0 -1.0 -1.0 -1.0 -1.0 -1.0 -1.0 -1.0 -1.0 -1.0 -1.0 -1.0 -1.0 "
                .to_string(),
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
        rainfall_column: &str,
    ) -> Result<(), FdvError> {
        self.value_count = 1;
        self.null_readings = 0;
        self.buffer.clear();

        let channel = series.channel(rainfall_column);
        if channel.is_none() {
            warn!("Rainfall column '{rainfall_column}' not found in series; filling with 0.0");
        }

        for row in 0..series.len() {
            let value = channel.and_then(|c| c.values.get(row).copied().flatten());
            let sample = match value {
                Some(v) if v.is_finite() => v,
                _ => {
                    if channel.is_some() {
                        self.null_readings += 1;
                    }
                    0.0
                }
            };
            self.insert_value(out, sample)?;
        }

        self.drain(out, 0)?;
        debug!(
            "Wrote {} rainfall records ({} null readings)",
            series.len(),
            self.null_readings
        );
        Ok(())
    }

    /// Push one sample through the redistribution buffer.
    ///
    /// A wet sample scans back over up to four trailing dry entries; the
    /// intensity is spread evenly across them and itself. Bursts over the
    /// cap spread the capped amount and keep the excess on the current
    /// slot.
    fn insert_value<W: Write>(&mut self, out: &mut W, raw: f64) -> Result<(), FdvError> {
        let mut sample = raw;

        if sample > WET_THRESHOLD {
            let mut count = 0usize;
            let mut divisor = 1.0f64;
            let mut offs = self.buffer.len() as isize - 1;
            while offs >= 0 && count < LOOKBACK {
                if self.buffer[offs as usize] >= WET_THRESHOLD {
                    break;
                }
                divisor += 1.0;
                count += 1;
                offs -= 1;
            }
            let first_dry = (offs + 1) as usize;

            if count > 0 && sample > SPREAD_CAP {
                let spread = SPREAD_CAP / (divisor - 1.0);
                for slot in first_dry..self.buffer.len() {
                    self.buffer[slot] = spread;
                }
                sample = raw - SPREAD_CAP;
            } else {
                sample /= divisor;
                for slot in first_dry..self.buffer.len() {
                    self.buffer[slot] = sample;
                }
            }
        }

        self.buffer.push_back(sample);
        if self.buffer.len() >= DRAIN_SIZE {
            self.drain(out, DRAIN_SIZE)?;
        }
        Ok(())
    }

    fn drain<W: Write>(&mut self, out: &mut W, keep: usize) -> Result<(), FdvError> {
        while self.buffer.len() > keep {
            let Some(sample) = self.buffer.pop_front() else {
                break;
            };
            write!(out, "{:15.1}", sample)?;
            if self.value_count % 5 == 0 {
                writeln!(out)?;
            }
            self.value_count += 1;
        }
        Ok(())
    }

    fn write_tail<W: Write>(&self, out: &mut W) -> Result<(), FdvError> {
        if (self.value_count - 1) % 5 != 0 {
            writeln!(out)?;
        }
        writeln!(out)?;
        writeln!(out, "*END")?;
        Ok(())
    }
}
