// =============================================================================
// Bollinger Bands
// =============================================================================
//
// Bollinger Bands consist of a middle band (SMA), an upper band (SMA + k*σ),
// and a lower band (SMA - k*σ), where σ is the trailing *sample* standard
// deviation (n - 1 denominator) of the closes over the same window.

use serde::Serialize;

use super::rolling::{rolling_std, sma};

/// Upper, middle and lower bands, aligned with the input closes.
#[derive(Debug, Clone, Serialize)]
pub struct BollingerBands {
    pub upper: Vec<f64>,
    pub middle: Vec<f64>,
    pub lower: Vec<f64>,
}

impl BollingerBands {
    /// Normalised band width, (upper - lower) / middle * 100.
    pub fn width(&self) -> Vec<f64> {
        self.upper
            .iter()
            .zip(&self.lower)
            .zip(&self.middle)
            .map(|((u, l), m)| (u - l) / m * 100.0)
            .collect()
    }
}

pub fn calculate_bollinger(closes: &[f64], period: usize, num_std: f64) -> BollingerBands {
    let middle = sma(closes, period);
    let std = rolling_std(closes, period);

    let upper = middle.iter().zip(&std).map(|(m, s)| m + s * num_std).collect();
    let lower = middle.iter().zip(&std).map(|(m, s)| m - s * num_std).collect();

    BollingerBands {
        upper,
        middle,
        lower,
    }
}
