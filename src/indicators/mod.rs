// =============================================================================
// Technical Indicators Module
// =============================================================================
//
// Pure, side-effect-free implementations of the indicators used for velocity
// detection. The per-indicator modules work on plain slices and always return
// a vector aligned with their input, NaN where a value is undefined.
//
// `Indicators` is the checked entry point: it owns forward-filled column
// buffers, validates parameters and column names, and refuses to compute over
// an empty or entirely undefined column.

pub mod atr;
pub mod bollinger;
pub mod ema;
pub mod macd;
pub mod roc;
pub mod rolling;
pub mod rsi;
pub mod stochastic;
pub mod volume;

pub use bollinger::BollingerBands;
pub use macd::Macd;
pub use stochastic::Stochastic;

use crate::error::{IndicatorError, Result};
use crate::market_data::{OhlcvColumns, Series};
use crate::signals::velocity::{self, VelocitySignals};
use crate::types::Column;

/// Largest window or lag accepted by any indicator.
pub const MAX_PERIOD: usize = 1_000_000;

/// Indicator engine over one OHLCV series.
#[derive(Debug, Clone)]
pub struct Indicators {
    columns: OhlcvColumns,
    filled_gaps: usize,
}

impl Indicators {
    /// Take ownership of `columns`, forward-filling any NaN gaps.
    pub fn new(mut columns: OhlcvColumns) -> Self {
        let filled_gaps = Column::ALL
            .iter()
            .map(|&col| rolling::forward_fill(columns.get_mut(col)))
            .sum::<usize>();
        Self {
            columns,
            filled_gaps,
        }
    }

    pub fn from_series(series: &Series) -> Self {
        Self::new(series.columns())
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    /// Number of cells replaced by forward-filling at construction.
    pub fn filled_gaps(&self) -> usize {
        self.filled_gaps
    }

    pub fn columns(&self) -> &OhlcvColumns {
        &self.columns
    }

    /// A column that holds at least one defined value.
    pub fn column(&self, column: Column) -> Result<&[f64]> {
        let values = self.columns.get(column);
        if values.is_empty() {
            return Err(IndicatorError::InsufficientData(
                "series is empty".to_string(),
            ));
        }
        if values.iter().all(|v| v.is_nan()) {
            return Err(IndicatorError::InsufficientData(format!(
                "column '{column}' has no defined values"
            )));
        }
        Ok(values)
    }

    fn named_column(&self, name: &str) -> Result<&[f64]> {
        self.column(name.parse()?)
    }

    // -------------------------------------------------------------------------
    // Moving averages
    // -------------------------------------------------------------------------

    pub fn sma(&self, period: usize, column: &str) -> Result<Vec<f64>> {
        check_period("period", period)?;
        Ok(rolling::sma(self.named_column(column)?, period))
    }

    pub fn ema(&self, period: usize, column: &str) -> Result<Vec<f64>> {
        check_period("period", period)?;
        Ok(ema::calculate_ema(self.named_column(column)?, period))
    }

    // -------------------------------------------------------------------------
    // Momentum
    // -------------------------------------------------------------------------

    pub fn roc(&self, period: usize, column: &str) -> Result<Vec<f64>> {
        check_period("period", period)?;
        Ok(roc::calculate_roc(self.named_column(column)?, period))
    }

    pub fn momentum(&self, period: usize, column: &str) -> Result<Vec<f64>> {
        check_period("period", period)?;
        Ok(roc::calculate_momentum(self.named_column(column)?, period))
    }

    pub fn rsi(&self, period: usize) -> Result<Vec<f64>> {
        check_period("period", period)?;
        Ok(rsi::calculate_rsi(self.column(Column::Close)?, period))
    }

    pub fn williams_r(&self, period: usize) -> Result<Vec<f64>> {
        check_period("period", period)?;
        let (high, low, close) = self.hlc()?;
        Ok(stochastic::calculate_williams_r(high, low, close, period))
    }

    pub fn stochastic_oscillator(&self, k_period: usize, d_period: usize) -> Result<Stochastic> {
        check_period("k_period", k_period)?;
        check_period("d_period", d_period)?;
        let (high, low, close) = self.hlc()?;
        Ok(stochastic::calculate_stochastic(
            high, low, close, k_period, d_period,
        ))
    }

    pub fn macd(&self, fast_period: usize, slow_period: usize, signal_period: usize) -> Result<Macd> {
        check_period("fast_period", fast_period)?;
        check_period("slow_period", slow_period)?;
        check_period("signal_period", signal_period)?;
        Ok(macd::calculate_macd(
            self.column(Column::Close)?,
            fast_period,
            slow_period,
            signal_period,
        ))
    }

    // -------------------------------------------------------------------------
    // Volatility
    // -------------------------------------------------------------------------

    pub fn bollinger_bands(&self, period: usize, std_dev: f64) -> Result<BollingerBands> {
        check_period("period", period)?;
        if !std_dev.is_finite() || std_dev < 0.0 {
            return Err(IndicatorError::Parameter(format!(
                "std_dev must be finite and >= 0, got {std_dev}"
            )));
        }
        Ok(bollinger::calculate_bollinger(
            self.column(Column::Close)?,
            period,
            std_dev,
        ))
    }

    pub fn atr(&self, period: usize) -> Result<Vec<f64>> {
        check_period("period", period)?;
        let (high, low, close) = self.hlc()?;
        Ok(atr::calculate_atr(high, low, close, period))
    }

    // -------------------------------------------------------------------------
    // Volume
    // -------------------------------------------------------------------------

    pub fn volume_sma(&self, period: usize) -> Result<Vec<f64>> {
        self.sma(period, Column::Volume.name())
    }

    pub fn obv(&self) -> Result<Vec<f64>> {
        let close = self.column(Column::Close)?;
        let volume = self.column(Column::Volume)?;
        Ok(volume::on_balance_volume(close, volume))
    }

    // -------------------------------------------------------------------------
    // Velocity
    // -------------------------------------------------------------------------

    /// Fractional change of close over `period` bars.
    pub fn price_velocity(&self, period: usize) -> Result<Vec<f64>> {
        check_period("period", period)?;
        Ok(roc::pct_change(self.column(Column::Close)?, period))
    }

    /// Volume relative to its `period`-bar average.
    pub fn volume_velocity(&self, period: usize) -> Result<Vec<f64>> {
        check_period("period", period)?;
        Ok(volume::calculate_volume_velocity(
            self.column(Column::Volume)?,
            period,
        ))
    }

    /// Tri-state velocity flags per bar; see [`velocity::detect_velocity_signals`].
    pub fn detect_velocity_signals(
        &self,
        roc_threshold: f64,
        volume_multiplier: f64,
    ) -> Result<VelocitySignals> {
        velocity::detect_velocity_signals(self, roc_threshold, volume_multiplier)
    }

    fn hlc(&self) -> Result<(&[f64], &[f64], &[f64])> {
        Ok((
            self.column(Column::High)?,
            self.column(Column::Low)?,
            self.column(Column::Close)?,
        ))
    }
}

fn check_period(name: &str, period: usize) -> Result<()> {
    if period == 0 {
        return Err(IndicatorError::Parameter(format!("{name} must be >= 1")));
    }
    if period > MAX_PERIOD {
        return Err(IndicatorError::Parameter(format!(
            "{name} {period} exceeds maximum of {MAX_PERIOD}"
        )));
    }
    Ok(())
}

// =============================================================================
// Unit Tests
// =============================================================================
#[cfg(test)]
mod tests {
    use super::*;
    use crate::market_data::Bar;
    use chrono::{TimeZone, Utc};

    const NAN: f64 = f64::NAN;

    /// Series of bars whose closes are `closes`, with a 1-point range around
    /// each close and constant volume.
    fn series_from_closes(closes: &[f64], volume: f64) -> Series {
        let bars = closes
            .iter()
            .enumerate()
            .map(|(i, &c)| {
                let ts = Utc.timestamp_millis_opt(i as i64 * 3_600_000).unwrap();
                Bar::new(ts, c, c + 1.0, c - 1.0, c, volume).unwrap()
            })
            .collect();
        Series::new("BTC/USDT", "1h", "test", bars).unwrap()
    }

    fn rising(n: usize) -> Indicators {
        let closes: Vec<f64> = (0..n).map(|i| 100.0 + i as f64).collect();
        Indicators::from_series(&series_from_closes(&closes, 10.0))
    }

    fn assert_nan_prefix(values: &[f64], n: usize) {
        assert!(values[..n].iter().all(|v| v.is_nan()), "expected {n} NaNs");
        assert!(values[n..].iter().all(|v| !v.is_nan()), "unexpected NaN after {n}");
    }

    #[test]
    fn sma_scenario() {
        let ind = Indicators::from_series(&series_from_closes(&[1.0, 2.0, 3.0, 4.0, 5.0], 1.0));
        let sma = ind.sma(3, "close").unwrap();
        assert!(sma[0].is_nan() && sma[1].is_nan());
        assert_eq!(&sma[2..], &[2.0, 3.0, 4.0]);
    }

    #[test]
    fn roc_scenario() {
        let ind = Indicators::from_series(&series_from_closes(&[100.0, 110.0], 1.0));
        let roc = ind.roc(1, "close").unwrap();
        assert!(roc[0].is_nan());
        assert!((roc[1] - 10.0).abs() < 1e-10);
    }

    #[test]
    fn outputs_are_aligned_with_warmup() {
        let ind = rising(40);
        for p in [1, 2, 5, 14] {
            let sma = ind.sma(p, "close").unwrap();
            assert_eq!(sma.len(), 40);
            assert_nan_prefix(&sma, p - 1);

            let ema = ind.ema(p, "close").unwrap();
            assert_eq!(ema.len(), 40);
            assert_nan_prefix(&ema, 0);

            let roc = ind.roc(p, "close").unwrap();
            assert_nan_prefix(&roc, p);

            let mom = ind.momentum(p, "open").unwrap();
            assert_nan_prefix(&mom, p);
        }
    }

    #[test]
    fn rising_series_obv_and_rsi() {
        let ind = rising(30);
        let obv = ind.obv().unwrap();
        for t in 1..30 {
            assert!(obv[t] > obv[t - 1], "OBV not increasing at {t}");
        }
        let rsi = ind.rsi(14).unwrap();
        for &v in &rsi[14..] {
            assert!((v - 100.0).abs() < 1e-10);
        }
    }

    #[test]
    fn flat_series_rsi_saturates_and_obv_is_constant() {
        let ind = Indicators::from_series(&series_from_closes(&[50.0; 30], 7.0));
        let rsi = ind.rsi(14).unwrap();
        assert!(rsi[13..].iter().all(|&v| v == 100.0));
        let obv = ind.obv().unwrap();
        assert!(obv.iter().all(|&v| v == 7.0));
    }

    #[test]
    fn rsi_is_bounded() {
        let closes: Vec<f64> = (0..200)
            .map(|i| 100.0 + (i as f64 * 0.45).sin() * 12.0 + (i % 5) as f64)
            .collect();
        let ind = Indicators::from_series(&series_from_closes(&closes, 3.0));
        for &v in ind.rsi(14).unwrap().iter().filter(|v| !v.is_nan()) {
            assert!((0.0..=100.0).contains(&v), "RSI {v} out of range");
        }
    }

    #[test]
    fn obv_recomputation_is_bit_identical() {
        let closes: Vec<f64> = (0..100).map(|i| 20.0 + (i as f64).cos() * 3.0).collect();
        let ind = Indicators::from_series(&series_from_closes(&closes, 2.5));
        let a: Vec<u64> = ind.obv().unwrap().iter().map(|v| v.to_bits()).collect();
        let b: Vec<u64> = ind.obv().unwrap().iter().map(|v| v.to_bits()).collect();
        assert_eq!(a, b);
    }

    #[test]
    fn bollinger_band_ordering_holds() {
        let closes: Vec<f64> = (0..80).map(|i| 30.0 + (i as f64 * 0.9).sin() * 4.0).collect();
        let ind = Indicators::from_series(&series_from_closes(&closes, 1.0));
        let bb = ind.bollinger_bands(20, 2.0).unwrap();
        for i in 19..80 {
            assert!(bb.upper[i] >= bb.middle[i] && bb.middle[i] >= bb.lower[i]);
        }
    }

    #[test]
    fn unknown_column_is_schema_error() {
        let ind = rising(5);
        let err = ind.sma(3, "vwap").unwrap_err();
        assert_eq!(
            err,
            IndicatorError::Schema {
                column: "vwap".into()
            }
        );
    }

    #[test]
    fn empty_series_is_insufficient_data() {
        let ind = Indicators::from_series(&series_from_closes(&[], 1.0));
        assert_eq!(ind.len(), 0);
        assert!(matches!(ind.sma(3, "close"), Err(IndicatorError::InsufficientData(_))));
        assert!(matches!(ind.obv(), Err(IndicatorError::InsufficientData(_))));
        assert!(matches!(ind.macd(12, 26, 9), Err(IndicatorError::InsufficientData(_))));
        assert!(matches!(
            ind.detect_velocity_signals(2.0, 1.5),
            Err(IndicatorError::InsufficientData(_))
        ));
    }

    #[test]
    fn parameters_are_checked_before_columns() {
        let ind = Indicators::from_series(&series_from_closes(&[], 1.0));
        assert!(matches!(ind.sma(0, "vwap"), Err(IndicatorError::Parameter(_))));
        assert!(matches!(ind.rsi(MAX_PERIOD + 1), Err(IndicatorError::Parameter(_))));
        assert!(matches!(ind.stochastic_oscillator(14, 0), Err(IndicatorError::Parameter(_))));
        assert!(matches!(ind.bollinger_bands(20, -1.0), Err(IndicatorError::Parameter(_))));
        assert!(matches!(ind.bollinger_bands(20, f64::NAN), Err(IndicatorError::Parameter(_))));
    }

    #[test]
    fn gaps_are_forward_filled() {
        let cols = OhlcvColumns::new(
            vec![1.0, NAN, 3.0],
            vec![2.0, NAN, 4.0],
            vec![0.5, NAN, 2.5],
            vec![1.5, NAN, 3.5],
            vec![10.0, 20.0, NAN],
        )
        .unwrap();
        let ind = Indicators::new(cols);
        assert_eq!(ind.filled_gaps(), 5);
        assert_eq!(ind.column(Column::Close).unwrap(), &[1.5, 1.5, 3.5]);
        assert_eq!(ind.column(Column::Volume).unwrap(), &[10.0, 20.0, 20.0]);
    }

    #[test]
    fn all_nan_column_is_insufficient_data() {
        let cols = OhlcvColumns::new(
            vec![1.0, 2.0],
            vec![1.0, 2.0],
            vec![1.0, 2.0],
            vec![1.0, 2.0],
            vec![NAN, NAN],
        )
        .unwrap();
        let ind = Indicators::new(cols);
        assert!(matches!(ind.volume_sma(2), Err(IndicatorError::InsufficientData(_))));
        assert!(ind.sma(2, "close").is_ok());
    }

    #[test]
    fn window_longer_than_series_is_all_undefined() {
        let ind = rising(5);
        let atr = ind.atr(14).unwrap();
        assert_eq!(atr.len(), 5);
        assert!(atr.iter().all(|v| v.is_nan()));
    }

    #[test]
    fn velocity_helpers() {
        let ind = Indicators::from_series(&series_from_closes(&[100.0, 110.0, 99.0], 4.0));
        let pv = ind.price_velocity(1).unwrap();
        assert!(pv[0].is_nan());
        assert!((pv[1] - 0.1).abs() < 1e-12);
        assert!((pv[2] + 0.1).abs() < 1e-12);

        let vv = ind.volume_velocity(2).unwrap();
        assert!(vv[0].is_nan());
        assert!((vv[1] - 1.0).abs() < 1e-12);
    }

    #[test]
    fn williams_and_stochastic_through_facade() {
        let ind = rising(20);
        let wr = ind.williams_r(14).unwrap();
        let st = ind.stochastic_oscillator(14, 3).unwrap();
        assert_nan_prefix(&wr, 13);
        assert_nan_prefix(&st.k, 13);
        assert_nan_prefix(&st.d, 15);
        // Close sits 1 below the window high, range is 15 wide.
        assert!((wr[19] - (-100.0 / 15.0)).abs() < 1e-10);
    }
}
