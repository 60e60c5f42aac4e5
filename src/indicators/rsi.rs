// =============================================================================
// Relative Strength Index (RSI) — simple-average variant
// =============================================================================
//
// RSI measures the speed and magnitude of recent price changes to evaluate
// whether an asset is overbought or oversold.
//
// Step 1 — Compute close-to-close deltas. The first bar has no predecessor;
//          its delta counts as zero in both splits.
// Step 2 — Split into gains (positive deltas) and losses (|negative deltas|).
// Step 3 — Trailing mean of each over `period` bars.
// Step 4 — RS  = mean_gain / mean_loss
//          RSI = 100 - 100 / (1 + RS)
//
// When mean_loss is zero RS is infinite and RSI saturates at 100.
// Thresholds:  RSI > 70 => OVERBOUGHT,  RSI < 30 => OVERSOLD.
// =============================================================================

use super::rolling::sma;

/// Compute the full RSI series for `closes` over `period`.
///
/// Defined from index `period - 1`; earlier positions are NaN.
pub fn calculate_rsi(closes: &[f64], period: usize) -> Vec<f64> {
    let (gains, losses) = split_deltas(closes);
    let mean_gain = sma(&gains, period);
    let mean_loss = sma(&losses, period);

    mean_gain
        .iter()
        .zip(&mean_loss)
        .map(|(&g, &l)| rsi_from_averages(g, l))
        .collect()
}

/// Gain and loss series, aligned with `closes`.
fn split_deltas(closes: &[f64]) -> (Vec<f64>, Vec<f64>) {
    let mut gains = Vec::with_capacity(closes.len());
    let mut losses = Vec::with_capacity(closes.len());

    for i in 0..closes.len() {
        if i == 0 {
            gains.push(0.0);
            losses.push(0.0);
            continue;
        }
        let delta = closes[i] - closes[i - 1];
        if delta.is_nan() {
            gains.push(f64::NAN);
            losses.push(f64::NAN);
        } else {
            gains.push(delta.max(0.0));
            losses.push((-delta).max(0.0));
        }
    }

    (gains, losses)
}

/// Convert average gain / average loss into an RSI value in [0, 100].
fn rsi_from_averages(avg_gain: f64, avg_loss: f64) -> f64 {
    if avg_gain.is_nan() || avg_loss.is_nan() {
        return f64::NAN;
    }
    if avg_loss == 0.0 {
        return 100.0;
    }
    let rs = avg_gain / avg_loss;
    100.0 - 100.0 / (1.0 + rs)
}

// =============================================================================
// Unit Tests
// =============================================================================
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rsi_empty_input() {
        assert!(calculate_rsi(&[], 14).is_empty());
    }

    #[test]
    fn rsi_warmup_is_period_minus_one() {
        let closes: Vec<f64> = (1..=20).map(|x| x as f64).collect();
        let series = calculate_rsi(&closes, 14);
        assert_eq!(series.len(), 20);
        assert!(series[..13].iter().all(|v| v.is_nan()));
        assert!(!series[13].is_nan());
    }

    #[test]
    fn rsi_all_gains() {
        // Strictly ascending prices => RSI should be 100.
        let closes: Vec<f64> = (0..30).map(|x| 100.0 + x as f64).collect();
        let series = calculate_rsi(&closes, 14);
        for &v in &series[14..] {
            assert!((v - 100.0).abs() < 1e-10, "expected 100.0, got {v}");
        }
    }

    #[test]
    fn rsi_all_losses() {
        // Strictly descending prices => RSI should be 0.
        let closes: Vec<f64> = (1..=30).rev().map(|x| x as f64).collect();
        let series = calculate_rsi(&closes, 14);
        for &v in &series[13..] {
            assert!(v.abs() < 1e-10, "expected 0.0, got {v}");
        }
    }

    #[test]
    fn rsi_flat_market_saturates() {
        let series = calculate_rsi(&[100.0; 30], 14);
        for &v in &series[13..] {
            assert_eq!(v, 100.0);
        }
    }

    #[test]
    fn rsi_known_value() {
        // Deltas: +2, -1, +3 with period 3 over closes [10, 12, 11, 14]
        // Window at index 3: gains [2, 0, 3] => 5/3, losses [0, 1, 0] => 1/3
        // RS = 5, RSI = 100 - 100/6
        let series = calculate_rsi(&[10.0, 12.0, 11.0, 14.0], 3);
        assert!((series[3] - (100.0 - 100.0 / 6.0)).abs() < 1e-10);
    }

    #[test]
    fn rsi_range_check() {
        // Arbitrary data — RSI must always be in [0, 100].
        let closes = vec![
            44.34, 44.09, 44.15, 43.61, 44.33, 44.83, 45.10, 45.42, 45.84, 46.08,
            45.89, 46.03, 44.18, 44.22, 44.57, 43.42, 42.66, 43.13,
        ];
        let series = calculate_rsi(&closes, 14);
        for &v in series.iter().filter(|v| !v.is_nan()) {
            assert!((0.0..=100.0).contains(&v), "RSI {v} out of range");
        }
    }

    #[test]
    fn rsi_missing_close_blanks_its_windows() {
        let closes = [f64::NAN, f64::NAN, 10.0, 11.0, 12.0, 13.0];
        let series = calculate_rsi(&closes, 2);
        // Deltas at 1 and 2 are undefined.
        assert!(series[1].is_nan());
        assert!(series[2].is_nan());
        assert!(series[3].is_nan());
        assert_eq!(series[4], 100.0);
    }
}
