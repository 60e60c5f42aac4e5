// =============================================================================
// Velocity Signal Detection — tri-state boolean flags per bar
// =============================================================================
//
// Each flag is derived independently from one or more indicators:
//
//   strong_upward_momentum    ROC(14) >  roc_threshold
//   strong_downward_momentum  ROC(14) < -roc_threshold
//   overbought                RSI(14) > 70
//   oversold                  RSI(14) < 30
//   high_volume               VolumeVelocity(20) > volume_multiplier
//   macd_bullish              line > signal AND histogram > 0
//   macd_bearish              line < signal AND histogram < 0
//   price_above_upper_bb      close > Bollinger(20, 2.0).upper
//   price_below_lower_bb      close < Bollinger(20, 2.0).lower
//
// A flag is `None` wherever any indicator it reads is undefined, so warm-up
// bars never show up as a confident `false`.
// =============================================================================

use serde::Serialize;

use crate::error::{IndicatorError, Result};
use crate::indicators::Indicators;
use crate::types::Column;

pub const DEFAULT_ROC_THRESHOLD: f64 = 2.0;
pub const DEFAULT_VOLUME_MULTIPLIER: f64 = 1.5;

const MOMENTUM_PERIOD: usize = 14;
const RSI_PERIOD: usize = 14;
const RSI_OVERBOUGHT: f64 = 70.0;
const RSI_OVERSOLD: f64 = 30.0;
const VOLUME_PERIOD: usize = 20;
const BOLLINGER_PERIOD: usize = 20;
const BOLLINGER_STD: f64 = 2.0;

/// One tri-state flag per bar for each velocity condition.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct VelocitySignals {
    pub strong_upward_momentum: Vec<Option<bool>>,
    pub strong_downward_momentum: Vec<Option<bool>>,
    pub overbought: Vec<Option<bool>>,
    pub oversold: Vec<Option<bool>>,
    pub high_volume: Vec<Option<bool>>,
    pub macd_bullish: Vec<Option<bool>>,
    pub macd_bearish: Vec<Option<bool>>,
    pub price_above_upper_bb: Vec<Option<bool>>,
    pub price_below_lower_bb: Vec<Option<bool>>,
}

impl VelocitySignals {
    /// Every flag series paired with its name, in declaration order.
    pub fn flags(&self) -> [(&'static str, &[Option<bool>]); 9] {
        [
            ("strong_upward_momentum", self.strong_upward_momentum.as_slice()),
            ("strong_downward_momentum", self.strong_downward_momentum.as_slice()),
            ("overbought", self.overbought.as_slice()),
            ("oversold", self.oversold.as_slice()),
            ("high_volume", self.high_volume.as_slice()),
            ("macd_bullish", self.macd_bullish.as_slice()),
            ("macd_bearish", self.macd_bearish.as_slice()),
            ("price_above_upper_bb", self.price_above_upper_bb.as_slice()),
            ("price_below_lower_bb", self.price_below_lower_bb.as_slice()),
        ]
    }

    pub fn len(&self) -> usize {
        self.overbought.len()
    }

    pub fn is_empty(&self) -> bool {
        self.overbought.is_empty()
    }

    /// Names of the flags that are definitely set at bar `index`.
    pub fn active_at(&self, index: usize) -> Vec<&'static str> {
        self.flags()
            .into_iter()
            .filter(|(_, series)| series.get(index).copied().flatten() == Some(true))
            .map(|(name, _)| name)
            .collect()
    }

    /// Active flags on the most recent bar.
    pub fn latest_active(&self) -> Vec<&'static str> {
        match self.len().checked_sub(1) {
            Some(last) => self.active_at(last),
            None => Vec::new(),
        }
    }
}

/// Compute every velocity flag for the series behind `indicators`.
pub fn detect_velocity_signals(
    indicators: &Indicators,
    roc_threshold: f64,
    volume_multiplier: f64,
) -> Result<VelocitySignals> {
    if !roc_threshold.is_finite() {
        return Err(IndicatorError::Parameter(format!(
            "roc_threshold must be finite, got {roc_threshold}"
        )));
    }
    if !volume_multiplier.is_finite() || volume_multiplier < 0.0 {
        return Err(IndicatorError::Parameter(format!(
            "volume_multiplier must be finite and >= 0, got {volume_multiplier}"
        )));
    }

    let close = indicators.column(Column::Close)?;
    let roc = indicators.roc(MOMENTUM_PERIOD, Column::Close.name())?;
    let rsi = indicators.rsi(RSI_PERIOD)?;
    let volume_velocity = indicators.volume_velocity(VOLUME_PERIOD)?;
    let macd = indicators.macd(12, 26, 9)?;
    let bb = indicators.bollinger_bands(BOLLINGER_PERIOD, BOLLINGER_STD)?;

    Ok(VelocitySignals {
        strong_upward_momentum: unary(&roc, |r| r > roc_threshold),
        strong_downward_momentum: unary(&roc, |r| r < -roc_threshold),
        overbought: unary(&rsi, |r| r > RSI_OVERBOUGHT),
        oversold: unary(&rsi, |r| r < RSI_OVERSOLD),
        high_volume: unary(&volume_velocity, |v| v > volume_multiplier),
        macd_bullish: ternary(&macd.line, &macd.signal, &macd.histogram, |m, s, h| {
            m > s && h > 0.0
        }),
        macd_bearish: ternary(&macd.line, &macd.signal, &macd.histogram, |m, s, h| {
            m < s && h < 0.0
        }),
        price_above_upper_bb: binary(close, &bb.upper, |c, u| c > u),
        price_below_lower_bb: binary(close, &bb.lower, |c, l| c < l),
    })
}

fn defined(v: f64) -> Option<f64> {
    (!v.is_nan()).then_some(v)
}

fn unary(a: &[f64], pred: impl Fn(f64) -> bool) -> Vec<Option<bool>> {
    a.iter().map(|&x| defined(x).map(&pred)).collect()
}

fn binary(a: &[f64], b: &[f64], pred: impl Fn(f64, f64) -> bool) -> Vec<Option<bool>> {
    a.iter()
        .zip(b)
        .map(|(&x, &y)| Some(pred(defined(x)?, defined(y)?)))
        .collect()
}

fn ternary(
    a: &[f64],
    b: &[f64],
    c: &[f64],
    pred: impl Fn(f64, f64, f64) -> bool,
) -> Vec<Option<bool>> {
    a.iter()
        .zip(b)
        .zip(c)
        .map(|((&x, &y), &z)| Some(pred(defined(x)?, defined(y)?, defined(z)?)))
        .collect()
}
