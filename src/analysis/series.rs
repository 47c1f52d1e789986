use crate::data::model::{AnalysisWindow, SensorTable};
use crate::error::Result;

/// Raw readings of one sensor over the window, with no validity filtering.
pub fn extract_raw(table: &SensorTable, window: AnalysisWindow, sensor: u32) -> Result<Vec<f64>> {
    table.check_window(window)?;
    let series = table.sensor(sensor)?;
    Ok(series.values[window.range()].to_vec())
}
