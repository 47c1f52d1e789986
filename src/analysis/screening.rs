/// Minimum peak derivative (°C per stride) for a sensor to be reported.
pub const SCREEN_THRESHOLD: f64 = 2.5;

/// Largest element of a derivative series, `None` for an empty one.
pub fn peak(derivative: &[f64]) -> Option<f64> {
    derivative.iter().copied().reduce(f64::max)
}

/// A sensor passes when its peak derivative is strictly above `threshold`.
/// An empty series never passes.
pub fn passes(derivative: &[f64], threshold: f64) -> bool {
    peak(derivative).is_some_and(|p| p > threshold)
}
