use crate::config::SensorGrid;
use crate::data::model::{AnalysisWindow, SensorTable};
use crate::error::{AnalysisError, Result};

use super::average::AverageMatrix;

/// Row of the average matrix a sensor is compared against: `sensor / columns`.
///
/// Integer division on the 1-based id, so the last sensor of each grid row
/// maps onto the next row.
pub fn deviation_row(grid: &SensorGrid, sensor: u32) -> usize {
    sensor as usize / grid.columns
}

/// Reading minus its row mean at each step of the window; 0 wherever the
/// reading is invalid.
///
/// Fails with [`AnalysisError::Range`] when the derived row is greater than
/// the matrix row count, and with [`AnalysisError::RowIndex`] when it equals it
/// (one past the last row).
pub fn deviation(
    table: &SensorTable,
    grid: &SensorGrid,
    averages: &AverageMatrix,
    window: AnalysisWindow,
    sensor: u32,
) -> Result<Vec<f64>> {
    let row = deviation_row(grid, sensor);
    if row > averages.rows() {
        return Err(AnalysisError::Range {
            row,
            rows: averages.rows(),
        });
    }
    if row == averages.rows() {
        return Err(AnalysisError::RowIndex {
            row,
            rows: averages.rows(),
        });
    }
    if averages.len() < window.offset {
        return Err(AnalysisError::Validation(format!(
            "average matrix covers {} steps, window needs {}",
            averages.len(),
            window.offset
        )));
    }

    table.check_window(window)?;
    let series = table.sensor(sensor)?;
    let means = averages.row(row);

    Ok(window
        .range()
        .enumerate()
        .map(|(i, t)| series.valid_at(t).map_or(0.0, |v| v - means[i]))
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::average::row_averages;
    use crate::analysis::fixtures::{constant, table};

    #[test]
    fn difference_from_row_mean() {
        // Sensor 1 is in row 0 by the id/columns rule with columns = 2.
        let t = table(&[constant(1, 10.0, 4), constant(2, 20.0, 4)]);
        let grid = SensorGrid::new(1, 2);
        let window = AnalysisWindow::new(0, 4);
        let avg = row_averages(&t, &grid, window, 1).unwrap();
        assert_eq!(deviation(&t, &grid, &avg, window, 1).unwrap(), vec![-5.0; 4]);
    }

    #[test]
    fn invalid_reading_gives_zero() {
        let t = table(&[
            (1, vec![350.0, 10.0, 10.0], vec![1, 0, 1]),
            constant(2, 20.0, 3),
            constant(3, 0.0, 3),
            constant(4, 0.0, 3),
        ]);
        let grid = SensorGrid::new(2, 2);
        let window = AnalysisWindow::new(0, 3);
        let avg = row_averages(&t, &grid, window, 2).unwrap();
        // Step 0 out of range, step 1 flagged bad: both zero whatever the mean.
        assert_eq!(deviation(&t, &grid, &avg, window, 1).unwrap(), vec![0.0, 0.0, -5.0]);
    }

    #[test]
    fn row_boundary_checks() {
        let t = table(&[
            constant(1, 1.0, 2),
            constant(2, 1.0, 2),
            constant(3, 1.0, 2),
            constant(4, 1.0, 2),
            constant(5, 1.0, 2),
            constant(6, 1.0, 2),
        ]);
        let grid = SensorGrid::new(3, 2);
        let window = AnalysisWindow::new(0, 2);
        let avg = row_averages(&t, &grid, window, 1).unwrap();

        // id 1 → row 0: fine.
        assert!(deviation(&t, &grid, &avg, window, 1).is_ok());
        // id 2 → row 1 == rows: one past the end.
        assert!(matches!(
            deviation(&t, &grid, &avg, window, 2),
            Err(AnalysisError::RowIndex { row: 1, rows: 1 })
        ));
        // id 4 → row 2 > rows.
        assert!(matches!(
            deviation(&t, &grid, &avg, window, 4),
            Err(AnalysisError::Range { row: 2, rows: 1 })
        ));
    }

    #[test]
    fn window_longer_than_matrix() {
        let t = table(&[constant(1, 1.0, 4), constant(2, 1.0, 4)]);
        let grid = SensorGrid::new(1, 2);
        let avg = row_averages(&t, &grid, AnalysisWindow::new(0, 2), 1).unwrap();
        assert!(matches!(
            deviation(&t, &grid, &avg, AnalysisWindow::new(0, 4), 1),
            Err(AnalysisError::Validation(_))
        ));
    }
}
