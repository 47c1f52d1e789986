use std::collections::{BTreeMap, BTreeSet};
use std::fmt::Display;
use std::path::Path;
use std::sync::Arc;

use arrow::array::{Array, Float32Array, Float64Array, Int32Array, Int64Array};
use arrow::datatypes::DataType;
use log::{debug, info, warn};
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;

use super::model::{parse_column_key, ColumnKind, SensorSeries, SensorTable};
use crate::error::{AnalysisError, Result};

/// Field separator of the acquisition system's export files.
pub const DELIMITER: u8 = b';';

// ---------------------------------------------------------------------------
// Public entry-point
// ---------------------------------------------------------------------------

/// Load a sensor dataset from a file.  Dispatch by extension.
///
/// Supported formats:
/// * `.csv` / `.txt` – semicolon-delimited export with `Value…`/`Status…` headers
/// * `.parquet`      – same column naming, numeric columns
pub fn load_file(path: &Path) -> Result<SensorTable> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_ascii_lowercase();

    let table = match ext.as_str() {
        "csv" | "txt" => load_csv(path)?,
        "parquet" | "pq" => load_parquet(path)?,
        other => return Err(load_error(path, format!("unsupported file extension .{other}"))),
    };

    info!(
        "Loaded {} time steps for {} sensors from {}",
        table.len(),
        table.sensor_ids().count(),
        path.display()
    );
    Ok(table)
}

fn load_error(path: &Path, reason: impl Display) -> AnalysisError {
    AnalysisError::Load {
        path: path.to_path_buf(),
        reason: reason.to_string(),
    }
}

// ---------------------------------------------------------------------------
// Header layout shared by both formats
// ---------------------------------------------------------------------------

/// Positions of the sensor columns within a header.
#[derive(Debug, Default)]
struct SensorColumns {
    values: Vec<(usize, u32)>,
    status: Vec<(usize, u32)>,
}

impl SensorColumns {
    fn from_headers<'a>(headers: impl Iterator<Item = &'a str>) -> Self {
        let mut columns = SensorColumns::default();
        for (idx, name) in headers.enumerate() {
            match parse_column_key(name) {
                Some((ColumnKind::Value, id)) => columns.values.push((idx, id)),
                Some((ColumnKind::Status, id)) => columns.status.push((idx, id)),
                None => debug!("Ignoring non-sensor column '{name}'"),
            }
        }
        columns
    }

    /// Every sensor must carry both a value and a status column.
    fn check(&self, path: &Path) -> Result<()> {
        if self.values.is_empty() {
            return Err(load_error(path, "no Value columns in header"));
        }
        let with_value: BTreeSet<u32> = self.values.iter().map(|&(_, id)| id).collect();
        let with_status: BTreeSet<u32> = self.status.iter().map(|&(_, id)| id).collect();
        if with_value.len() != self.values.len() || with_status.len() != self.status.len() {
            return Err(load_error(path, "duplicate sensor column in header"));
        }
        if let Some(id) = with_value.symmetric_difference(&with_status).next() {
            return Err(load_error(
                path,
                format!("sensor {id} lacks a matching Value/Status column"),
            ));
        }
        Ok(())
    }
}

/// Accumulates columns while reading, then freezes into a [`SensorTable`].
#[derive(Debug)]
struct TableBuilder {
    sensors: BTreeMap<u32, SensorSeries>,
}

impl TableBuilder {
    fn new(columns: &SensorColumns) -> Self {
        let sensors = columns
            .values
            .iter()
            .map(|&(_, id)| (id, SensorSeries::default()))
            .collect();
        Self { sensors }
    }

    fn push_value(&mut self, id: u32, value: f64) {
        self.sensors.entry(id).or_default().values.push(value);
    }

    fn push_status(&mut self, id: u32, status: i64) {
        self.sensors.entry(id).or_default().status.push(status);
    }

    fn finish(self, path: &Path) -> Result<SensorTable> {
        let table = SensorTable::from_sensors(self.sensors).map_err(|e| load_error(path, e))?;
        if table.is_empty() {
            warn!("{} contains no data rows", path.display());
        }
        Ok(table)
    }
}

// ---------------------------------------------------------------------------
// CSV loader
// ---------------------------------------------------------------------------

/// Semicolon-delimited text, one row per time step.  Empty value cells load
/// as NaN (invalid), empty status cells as 0 (invalid).  Decimal commas are
/// accepted since the field separator is `;`.
fn load_csv(path: &Path) -> Result<SensorTable> {
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(DELIMITER)
        .from_path(path)
        .map_err(|e| load_error(path, e))?;

    let columns = {
        let headers = reader.headers().map_err(|e| load_error(path, e))?;
        SensorColumns::from_headers(headers.iter())
    };
    columns.check(path)?;

    let mut builder = TableBuilder::new(&columns);
    for (row_no, result) in reader.records().enumerate() {
        let record = result.map_err(|e| load_error(path, format!("row {row_no}: {e}")))?;

        for &(idx, id) in &columns.values {
            let cell = record.get(idx).unwrap_or("");
            let value = parse_value(cell)
                .ok_or_else(|| load_error(path, format!("row {row_no}: '{cell}' is not a number")))?;
            builder.push_value(id, value);
        }
        for &(idx, id) in &columns.status {
            let cell = record.get(idx).unwrap_or("");
            let status = parse_status(cell)
                .ok_or_else(|| load_error(path, format!("row {row_no}: '{cell}' is not a status flag")))?;
            builder.push_status(id, status);
        }
    }

    builder.finish(path)
}

fn parse_value(cell: &str) -> Option<f64> {
    let cell = cell.trim();
    if cell.is_empty() {
        return Some(f64::NAN);
    }
    cell.parse::<f64>()
        .ok()
        .or_else(|| cell.replace(',', ".").parse::<f64>().ok())
}

fn parse_status(cell: &str) -> Option<i64> {
    let cell = cell.trim();
    if cell.is_empty() {
        return Some(0);
    }
    if let Ok(i) = cell.parse::<i64>() {
        return Some(i);
    }
    // Columns holding a NaN get written back as floats ("1.0").
    parse_value(cell).map(|f| if f.fract() == 0.0 { f as i64 } else { 0 })
}

// ---------------------------------------------------------------------------
// Parquet loader
// ---------------------------------------------------------------------------

/// Load a Parquet file with the same `Value…`/`Status…` column naming.
/// Value columns may be Float64/Float32/Int64/Int32; nulls load as NaN for
/// values and 0 for status flags.
fn load_parquet(path: &Path) -> Result<SensorTable> {
    let file = std::fs::File::open(path).map_err(|e| load_error(path, e))?;
    let builder = ParquetRecordBatchReaderBuilder::try_new(file)
        .map_err(|e| load_error(path, format!("reading parquet metadata: {e}")))?;

    let columns = SensorColumns::from_headers(
        builder
            .schema()
            .fields()
            .iter()
            .map(|f| f.name().as_str()),
    );
    columns.check(path)?;

    let reader = builder
        .build()
        .map_err(|e| load_error(path, format!("building parquet reader: {e}")))?;

    let mut table = TableBuilder::new(&columns);
    for batch_result in reader {
        let batch = batch_result.map_err(|e| load_error(path, format!("reading record batch: {e}")))?;

        for &(idx, id) in &columns.values {
            for value in numeric_column(batch.column(idx)).map_err(|e| load_error(path, e))? {
                table.push_value(id, value.unwrap_or(f64::NAN));
            }
        }
        for &(idx, id) in &columns.status {
            for status in numeric_column(batch.column(idx)).map_err(|e| load_error(path, e))? {
                table.push_status(id, status.map_or(0, |s| s as i64));
            }
        }
    }

    table.finish(path)
}

/// Read a numeric Arrow column as `f64`, keeping nulls as `None`.
fn numeric_column(col: &Arc<dyn Array>) -> std::result::Result<Vec<Option<f64>>, String> {
    let any = col.as_any();
    let values: Vec<Option<f64>> = match col.data_type() {
        DataType::Float64 => downcast::<Float64Array>(any)?.iter().collect(),
        DataType::Float32 => downcast::<Float32Array>(any)?
            .iter()
            .map(|v| v.map(f64::from))
            .collect(),
        DataType::Int64 => downcast::<Int64Array>(any)?
            .iter()
            .map(|v| v.map(|i| i as f64))
            .collect(),
        DataType::Int32 => downcast::<Int32Array>(any)?
            .iter()
            .map(|v| v.map(f64::from))
            .collect(),
        other => return Err(format!("expected a numeric column, got {other:?}")),
    };
    Ok(values)
}

fn downcast<T: 'static>(any: &dyn std::any::Any) -> std::result::Result<&T, String> {
    any.downcast_ref::<T>()
        .ok_or_else(|| format!("unexpected array type {}", std::any::type_name::<T>()))
}
