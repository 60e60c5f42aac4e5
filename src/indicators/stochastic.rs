// =============================================================================
// Range oscillators: Williams %R and the Stochastic Oscillator
// =============================================================================
//
// Both place the close inside the trailing high/low range:
//   %R = (HH - close) / (HH - LL) * -100          (-100 .. 0)
//   %K = (close - LL) / (HH - LL) * 100           (0 .. 100)
//   %D = SMA(%K, d_period)
//
// A flat range (HH == LL) divides by zero and yields NaN or ±inf.

use serde::Serialize;

use super::rolling::{rolling_max, rolling_min, sma};

/// %K and its signal line %D.
#[derive(Debug, Clone, Serialize)]
pub struct Stochastic {
    pub k: Vec<f64>,
    pub d: Vec<f64>,
}

pub fn calculate_williams_r(high: &[f64], low: &[f64], close: &[f64], period: usize) -> Vec<f64> {
    let hh = rolling_max(high, period);
    let ll = rolling_min(low, period);

    close
        .iter()
        .enumerate()
        .map(|(i, c)| (hh[i] - c) / (hh[i] - ll[i]) * -100.0)
        .collect()
}

pub fn calculate_stochastic(
    high: &[f64],
    low: &[f64],
    close: &[f64],
    k_period: usize,
    d_period: usize,
) -> Stochastic {
    let hh = rolling_max(high, k_period);
    let ll = rolling_min(low, k_period);

    let k: Vec<f64> = close
        .iter()
        .enumerate()
        .map(|(i, c)| (c - ll[i]) / (hh[i] - ll[i]) * 100.0)
        .collect();
    let d = sma(&k, d_period);

    Stochastic { k, d }
}
