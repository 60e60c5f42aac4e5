// =============================================================================
// Rate of Change (ROC), Momentum, Price Velocity
// =============================================================================
//
// All three compare a value with the value `period` bars earlier:
//   ROC       = (value - value_n) / value_n * 100
//   Momentum  = value - value_n
//   Velocity  = (value - value_n) / value_n
//
// The first `period` positions have no lagged value and are NaN. A zero lagged
// value yields ±inf or NaN, which is passed through unchanged.

use super::rolling::shift;

/// Fractional change over `period` bars.
pub fn pct_change(values: &[f64], period: usize) -> Vec<f64> {
    let lagged = shift(values, period);
    values
        .iter()
        .zip(&lagged)
        .map(|(v, prev)| (v - prev) / prev)
        .collect()
}

/// Rate of change in percent.
pub fn calculate_roc(values: &[f64], period: usize) -> Vec<f64> {
    pct_change(values, period).into_iter().map(|r| r * 100.0).collect()
}

/// Absolute change over `period` bars.
pub fn calculate_momentum(values: &[f64], period: usize) -> Vec<f64> {
    let lagged = shift(values, period);
    values.iter().zip(&lagged).map(|(v, prev)| v - prev).collect()
}
