// =============================================================================
// Volume indicators: On-Balance Volume, volume velocity
// =============================================================================
//
// OBV is the one inherently sequential indicator in the engine, so it lives
// in its own single left-to-right scan:
//   OBV_0 = volume_0
//   OBV_t = OBV_{t-1} + volume_t   if close_t > close_{t-1}
//         = OBV_{t-1} - volume_t   if close_t < close_{t-1}
//         = OBV_{t-1}              otherwise

use super::rolling::sma;

pub fn on_balance_volume(close: &[f64], volume: &[f64]) -> Vec<f64> {
    let mut out = Vec::with_capacity(close.len());
    let Some(&first) = volume.first() else {
        return out;
    };

    let mut acc = first;
    out.push(acc);
    for i in 1..close.len() {
        if close[i] > close[i - 1] {
            acc += volume[i];
        } else if close[i] < close[i - 1] {
            acc -= volume[i];
        }
        out.push(acc);
    }
    out
}

/// Current volume relative to its `period`-bar average.
pub fn calculate_volume_velocity(volume: &[f64], period: usize) -> Vec<f64> {
    let avg = sma(volume, period);
    volume.iter().zip(&avg).map(|(v, a)| v / a).collect()
}
