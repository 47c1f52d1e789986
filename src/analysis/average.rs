use ndarray::{Array2, ArrayView1};

use crate::config::SensorGrid;
use crate::data::model::{AnalysisWindow, SensorTable};
use crate::error::Result;

/// Per-row mean temperature over an analysis window, `rows × offset`.
#[derive(Debug, Clone, PartialEq)]
pub struct AverageMatrix {
    data: Array2<f64>,
}

impl AverageMatrix {
    /// Number of grid rows covered.
    pub fn rows(&self) -> usize {
        self.data.nrows()
    }

    /// Number of time steps (the window offset).
    pub fn len(&self) -> usize {
        self.data.ncols()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Mean series of one row.  Panics if `row >= self.rows()`.
    pub fn row(&self, row: usize) -> ArrayView1<'_, f64> {
        self.data.row(row)
    }

    pub fn get(&self, row: usize, i: usize) -> Option<f64> {
        self.data.get((row, i)).copied()
    }
}

/// Mean of the valid readings in each of the top `row_count` grid rows, at
/// every time step of the window.  A row with no valid reading averages to
/// exactly 0.  `row_count` is clamped to the grid height.
pub fn row_averages(
    table: &SensorTable,
    grid: &SensorGrid,
    window: AnalysisWindow,
    row_count: usize,
) -> Result<AverageMatrix> {
    table.check_window(window)?;
    let rows = row_count.min(grid.rows);
    let mut data = Array2::<f64>::zeros((rows, window.offset));

    for r in 0..rows {
        let sensors = grid
            .row_sensors(r)
            .map(|id| table.sensor(id?))
            .collect::<Result<Vec<_>>>()?;

        for (i, t) in window.range().enumerate() {
            let (sum, count) = sensors
                .iter()
                .filter_map(|s| s.valid_at(t))
                .fold((0.0, 0usize), |(sum, n), v| (sum + v, n + 1));
            if count > 0 {
                data[[r, i]] = sum / count as f64;
            }
        }
    }

    Ok(AverageMatrix { data })
}
