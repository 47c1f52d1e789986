//! Run configuration.
//!
//! Everything has a default matching the production furnace layout, so a run
//! works without any config file. A JSON file may override any subset of
//! fields; command-line flags are applied on top in `main`.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::analysis::screening::SCREEN_THRESHOLD;
use crate::error::{AnalysisError, Result};

// ---------------------------------------------------------------------------
// SensorGrid
// ---------------------------------------------------------------------------

/// Rectangular sensor layout, numbered 1-based in row-major order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SensorGrid {
    pub rows: usize,
    pub columns: usize,
}

impl Default for SensorGrid {
    fn default() -> Self {
        Self { rows: 14, columns: 32 }
    }
}

impl SensorGrid {
    pub fn new(rows: usize, columns: usize) -> Self {
        Self { rows, columns }
    }

    /// `row*columns + column + 1`, both indices 0-based.  Fails when the id
    /// does not fit a `u32`.
    pub fn sensor_id(&self, row: usize, column: usize) -> Result<u32> {
        row.checked_mul(self.columns)
            .and_then(|base| base.checked_add(column)?.checked_add(1))
            .and_then(|id| u32::try_from(id).ok())
            .ok_or_else(|| {
                AnalysisError::Validation(format!(
                    "sensor at row {row}, column {column} has no u32 id"
                ))
            })
    }

    /// Sensors of one grid row, left to right.
    pub fn row_sensors(&self, row: usize) -> impl Iterator<Item = Result<u32>> + '_ {
        (0..self.columns).map(move |c| self.sensor_id(row, c))
    }

    /// Sensors of one 1-based grid column, top to bottom, limited to `rows`.
    pub fn column_sensors(&self, column: usize, rows: usize) -> Result<Vec<u32>> {
        (0..rows.min(self.rows))
            .map(|r| self.sensor_id(r, column - 1))
            .collect()
    }
}

// ---------------------------------------------------------------------------
// Image settings
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ImageConfig {
    /// Pixels.
    pub width: u32,
    pub height: u32,
    pub font_size: u32,
}

impl Default for ImageConfig {
    fn default() -> Self {
        Self {
            width: 3000,
            height: 1800,
            font_size: 16,
        }
    }
}

// ---------------------------------------------------------------------------
// RunConfig
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunConfig {
    pub dataset_dir: PathBuf,
    pub output_dir: PathBuf,
    pub grid: SensorGrid,
    /// Input file name, relative to `dataset_dir`.
    pub file_name: String,
    pub start_index: usize,
    /// Number of time steps in the analysis window.
    pub offset: usize,
    /// Number of sensor rows analysed, counted from the top.
    pub rows: usize,
    /// Derivative sampling interval in time steps.
    pub stride: usize,
    pub threshold: f64,
    /// 1-based grid columns to report; `None` means all of them.
    pub columns: Option<Vec<usize>>,
    pub image: ImageConfig,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            dataset_dir: PathBuf::from("dataset"),
            output_dir: PathBuf::from("visualisation"),
            grid: SensorGrid::default(),
            file_name: "SMS_DC_DataFile_017.csv".to_string(),
            start_index: 7300,
            offset: 300,
            rows: 5,
            stride: 10,
            threshold: SCREEN_THRESHOLD,
            columns: None,
            image: ImageConfig::default(),
        }
    }
}

impl RunConfig {
    /// Read a JSON config file; missing fields keep their defaults.
    pub fn from_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        serde_json::from_str(&text).map_err(|e| AnalysisError::Load {
            path: path.to_path_buf(),
            reason: format!("parsing config: {e}"),
        })
    }

    pub fn input_path(&self) -> PathBuf {
        self.dataset_dir.join(&self.file_name)
    }

    /// File name without its extension, used to name the charts.
    pub fn input_stem(&self) -> &str {
        Path::new(&self.file_name)
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or(&self.file_name)
    }

    /// Grid columns to report, 1-based.
    pub fn selected_columns(&self) -> Vec<usize> {
        match &self.columns {
            Some(cols) => cols.clone(),
            None => (1..=self.grid.columns).collect(),
        }
    }

    pub fn validate(&self) -> Result<()> {
        let fail = |msg: String| Err(AnalysisError::Validation(msg));
        if self.grid.rows == 0 || self.grid.columns == 0 {
            return fail(format!(
                "sensor grid must be non-empty, got {}x{}",
                self.grid.rows, self.grid.columns
            ));
        }
        let fits_u32 = self
            .grid
            .rows
            .checked_mul(self.grid.columns)
            .is_some_and(|n| u32::try_from(n).is_ok());
        if !fits_u32 {
            return fail(format!(
                "sensor grid {}x{} has more sensors than u32 ids",
                self.grid.rows, self.grid.columns
            ));
        }
        if self.offset == 0 {
            return fail("offset must be at least 1".to_string());
        }
        if self.start_index.checked_add(self.offset).is_none() {
            return fail(format!(
                "window {} + {} overflows",
                self.start_index, self.offset
            ));
        }
        if self.rows == 0 {
            return fail("rows must be at least 1".to_string());
        }
        if self.stride == 0 {
            return fail("stride must be at least 1".to_string());
        }
        if !self.threshold.is_finite() {
            return fail(format!("threshold must be finite, got {}", self.threshold));
        }
        if let Some(bad) = self
            .selected_columns()
            .into_iter()
            .find(|&c| c == 0 || c > self.grid.columns)
        {
            return fail(format!(
                "column {bad} outside 1..={}",
                self.grid.columns
            ));
        }
        if self.image.width == 0 || self.image.height == 0 {
            return fail("image size must be non-zero".to_string());
        }
        Ok(())
    }
}
