use crate::data::model::{AnalysisWindow, SensorTable};
use crate::error::{AnalysisError, Result};

/// Number of derivative samples for a window: `offset / stride`.
pub fn derivative_len(window: AnalysisWindow, stride: usize) -> usize {
    window.offset / stride
}

/// Coarse first difference of a sensor sampled every `stride` steps.
///
/// Element `i` (for `i >= 1`) is `value[curr] - value[curr - stride]` with
/// `curr = start + i*stride`, or 0 unless both readings are valid.  Element 0
/// has no predecessor inside the window and is always 0.
pub fn derivative(
    table: &SensorTable,
    window: AnalysisWindow,
    sensor: u32,
    stride: usize,
) -> Result<Vec<f64>> {
    if stride == 0 {
        return Err(AnalysisError::Validation(
            "derivative stride must be at least 1".to_string(),
        ));
    }
    table.check_window(window)?;
    let series = table.sensor(sensor)?;

    let mut result = vec![0.0; derivative_len(window, stride)];
    for (i, slot) in result.iter_mut().enumerate().skip(1) {
        let curr = window.start + i * stride;
        let prev = curr - stride;
        if let (Some(now), Some(before)) = (series.valid_at(curr), series.valid_at(prev)) {
            *slot = now - before;
        }
    }
    Ok(result)
}
