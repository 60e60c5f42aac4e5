// =============================================================================
// Exponential Moving Average (EMA)
// =============================================================================
//
// EMA gives more weight to recent prices, making it more responsive to new
// information than the Simple Moving Average (SMA).
//
// Formula:
//   alpha  = 2 / (period + 1)
//   EMA_t  = alpha * value_t + (1 - alpha) * EMA_{t-1}
//
// The recurrence is seeded with the first defined value (EMA_0 = value_0), so
// there is no warm-up blanking.
// =============================================================================

/// Smoothing factor for a span of `period` observations.
pub fn alpha(period: usize) -> f64 {
    2.0 / (period as f64 + 1.0)
}

/// Run the exponential recurrence over `values` with smoothing factor `alpha`.
///
/// # Edge cases
/// - Leading NaNs stay NaN; the first defined value seeds the recurrence.
/// - A NaN after the seed repeats the previous EMA.
pub fn ewm(values: &[f64], alpha: f64) -> Vec<f64> {
    let mut out = Vec::with_capacity(values.len());
    let mut prev: Option<f64> = None;

    for &value in values {
        let next = match prev {
            None if value.is_nan() => None,
            None => Some(value),
            Some(p) if value.is_nan() => Some(p),
            Some(p) => Some(alpha * value + (1.0 - alpha) * p),
        };
        out.push(next.unwrap_or(f64::NAN));
        prev = next;
    }

    out
}

/// Compute the EMA series for `values` over `period`.
pub fn calculate_ema(values: &[f64], period: usize) -> Vec<f64> {
    ewm(values, alpha(period))
}
