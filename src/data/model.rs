use std::collections::BTreeMap;
use std::fmt;
use std::ops::Range;

use crate::error::{AnalysisError, Result};

// ---------------------------------------------------------------------------
// Validity rule
// ---------------------------------------------------------------------------

/// Lowest physically plausible reading, °C.
pub const VALID_MIN: f64 = 0.0;
/// Highest physically plausible reading, °C.
pub const VALID_MAX: f64 = 300.0;
/// Status flag written by the acquisition system for a good reading.
pub const STATUS_OK: i64 = 1;

/// A reading is valid when it lies in `[VALID_MIN, VALID_MAX]` and its status
/// flag is [`STATUS_OK`]. NaN never passes the range check.
pub fn is_valid_reading(value: f64, status: i64) -> bool {
    (VALID_MIN..=VALID_MAX).contains(&value) && status == STATUS_OK
}

// ---------------------------------------------------------------------------
// Column keys – the only place that knows about header names
// ---------------------------------------------------------------------------

/// Infix between the column kind and the sensor number in production files.
pub const SENSOR_TAG: &str = "FO";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ColumnKind {
    Value,
    Status,
}

impl ColumnKind {
    fn prefix(self) -> &'static str {
        match self {
            ColumnKind::Value => "Value",
            ColumnKind::Status => "Status",
        }
    }
}

impl fmt::Display for ColumnKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.prefix())
    }
}

/// Header name for a sensor column, e.g. `ValueFO007`.
pub fn column_key(kind: ColumnKind, sensor: u32) -> String {
    format!("{kind}{SENSOR_TAG}{sensor:03}")
}

/// Inverse of [`column_key`]. Accepts any alphabetic infix (or none), so
/// `ValueFO007`, `Value007` and `StatusXY12` all parse. Returns `None` for
/// headers that are not sensor columns.
pub fn parse_column_key(name: &str) -> Option<(ColumnKind, u32)> {
    let name = name.trim();
    let (kind, rest) = if let Some(rest) = name.strip_prefix(ColumnKind::Value.prefix()) {
        (ColumnKind::Value, rest)
    } else if let Some(rest) = name.strip_prefix(ColumnKind::Status.prefix()) {
        (ColumnKind::Status, rest)
    } else {
        return None;
    };

    let digits = rest.trim_start_matches(|c: char| c.is_ascii_alphabetic());
    if digits.is_empty() || !digits.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    digits.parse().ok().map(|id| (kind, id))
}

// ---------------------------------------------------------------------------
// AnalysisWindow
// ---------------------------------------------------------------------------

/// Half-open range of time steps `[start, start + offset)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AnalysisWindow {
    pub start: usize,
    pub offset: usize,
}

impl AnalysisWindow {
    pub fn new(start: usize, offset: usize) -> Self {
        Self { start, offset }
    }

    /// One past the last step, saturating at `usize::MAX`.
    pub fn end(&self) -> usize {
        self.start.saturating_add(self.offset)
    }

    pub fn range(&self) -> Range<usize> {
        self.start..self.end()
    }
}

// ---------------------------------------------------------------------------
// SensorSeries – the Value/Status column pair of one sensor
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq)]
pub struct SensorSeries {
    pub values: Vec<f64>,
    pub status: Vec<i64>,
}

impl SensorSeries {
    pub fn new(values: Vec<f64>, status: Vec<i64>) -> Self {
        Self { values, status }
    }

    /// Reading at time step `t`, if it passes the validity rule.
    pub fn valid_at(&self, t: usize) -> Option<f64> {
        let value = self.values[t];
        is_valid_reading(value, self.status[t]).then_some(value)
    }
}

// ---------------------------------------------------------------------------
// SensorTable – the complete loaded dataset
// ---------------------------------------------------------------------------

/// Immutable table of sensor readings, one row per time step.
#[derive(Debug, Clone, Default)]
pub struct SensorTable {
    len: usize,
    sensors: BTreeMap<u32, SensorSeries>,
}

impl SensorTable {
    /// Build the table, checking that every column has the same length.
    pub fn from_sensors(sensors: BTreeMap<u32, SensorSeries>) -> Result<Self> {
        let len = sensors.values().next().map_or(0, |s| s.values.len());
        for (id, series) in &sensors {
            if series.values.len() != len || series.status.len() != len {
                return Err(AnalysisError::Validation(format!(
                    "sensor {id}: {} values and {} status flags, expected {len}",
                    series.values.len(),
                    series.status.len()
                )));
            }
        }
        Ok(Self { len, sensors })
    }

    /// Number of time steps.
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Sensor ids present in the table, ascending.
    pub fn sensor_ids(&self) -> impl Iterator<Item = u32> + '_ {
        self.sensors.keys().copied()
    }

    pub fn sensor(&self, id: u32) -> Result<&SensorSeries> {
        self.sensors.get(&id).ok_or(AnalysisError::UnknownSensor(id))
    }

    /// Fail with [`AnalysisError::Index`] when the window overruns the table.
    pub fn check_window(&self, window: AnalysisWindow) -> Result<()> {
        let fits = window
            .start
            .checked_add(window.offset)
            .is_some_and(|end| end <= self.len);
        if !fits {
            return Err(AnalysisError::Index {
                start: window.start,
                offset: window.offset,
                len: self.len,
            });
        }
        Ok(())
    }
}
