// =============================================================================
// Average True Range (ATR) — simple rolling mean of True Range
// =============================================================================
//
// ATR measures market volatility by decomposing the entire range of a bar.
//
// True Range (TR) for each bar:
//   TR = max(H - L, |H - prevClose|, |L - prevClose|)
//
// Undefined terms are left out of the max rather than counted as zero, so the
// first bar (no previous close) has TR = H - L.
//
//   ATR_t = mean(TR_{t-period+1} ..= TR_t)
// =============================================================================

use super::rolling::sma;

/// Per-bar True Range, aligned with the input.
pub fn true_range(high: &[f64], low: &[f64], close: &[f64]) -> Vec<f64> {
    (0..close.len())
        .map(|i| {
            let prev_close = if i == 0 { f64::NAN } else { close[i - 1] };
            [
                high[i] - low[i],
                (high[i] - prev_close).abs(),
                (low[i] - prev_close).abs(),
            ]
            .into_iter()
            .filter(|v| !v.is_nan())
            .reduce(f64::max)
            .unwrap_or(f64::NAN)
        })
        .collect()
}

/// ATR series over `period` bars.
pub fn calculate_atr(high: &[f64], low: &[f64], close: &[f64], period: usize) -> Vec<f64> {
    sma(&true_range(high, low, close), period)
}
