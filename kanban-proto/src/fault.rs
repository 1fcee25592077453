//! Failure injection shared by the mock store and the demo server.

/// Rolls a failure with probability `rate`.
///
/// Rates outside `[0, 1]` are clamped; `NaN` never fails.
#[must_use]
pub fn roll_failure(rate: f64) -> bool {
    if rate.is_nan() || rate <= 0.0 {
        return false;
    }
    rate >= 1.0 || rand::random_bool(rate)
}
