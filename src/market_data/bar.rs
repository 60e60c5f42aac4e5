use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{IndicatorError, Result};
use crate::types::Column;

// ---------------------------------------------------------------------------
// Raw exchange records
// ---------------------------------------------------------------------------

/// A candle exactly as the exchange returns it:
/// `(timestamp_ms, open, high, low, close, volume)`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RawCandle {
    pub timestamp_ms: i64,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
}

impl From<(i64, f64, f64, f64, f64, f64)> for RawCandle {
    fn from(t: (i64, f64, f64, f64, f64, f64)) -> Self {
        Self {
            timestamp_ms: t.0,
            open: t.1,
            high: t.2,
            low: t.3,
            close: t.4,
            volume: t.5,
        }
    }
}

// ---------------------------------------------------------------------------
// Bar
// ---------------------------------------------------------------------------

/// A single validated OHLCV bar. Immutable once constructed.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Bar {
    timestamp: DateTime<Utc>,
    open: f64,
    high: f64,
    low: f64,
    close: f64,
    volume: f64,
}

impl Bar {
    /// Build a bar, rejecting any OHLC or volume invariant violation.
    pub fn new(
        timestamp: DateTime<Utc>,
        open: f64,
        high: f64,
        low: f64,
        close: f64,
        volume: f64,
    ) -> Result<Self> {
        for (name, value) in [
            ("open", open),
            ("high", high),
            ("low", low),
            ("close", close),
            ("volume", volume),
        ] {
            if !value.is_finite() {
                return Err(IndicatorError::Validation(format!(
                    "{name} ({value}) must be finite"
                )));
            }
        }
        if high < low {
            return Err(IndicatorError::Validation(format!(
                "high ({high}) cannot be less than low ({low})"
            )));
        }
        if high < open || high < close {
            return Err(IndicatorError::Validation(format!(
                "high ({high}) must be >= open ({open}) and close ({close})"
            )));
        }
        if low > open || low > close {
            return Err(IndicatorError::Validation(format!(
                "low ({low}) must be <= open ({open}) and close ({close})"
            )));
        }
        if volume < 0.0 {
            return Err(IndicatorError::Validation(format!(
                "volume ({volume}) cannot be negative"
            )));
        }

        Ok(Self {
            timestamp,
            open,
            high,
            low,
            close,
            volume,
        })
    }

    /// Validate a raw exchange candle.
    pub fn from_raw(raw: &RawCandle) -> Result<Self> {
        let timestamp = Utc
            .timestamp_millis_opt(raw.timestamp_ms)
            .single()
            .ok_or_else(|| {
                IndicatorError::Validation(format!(
                    "timestamp {} ms is out of range",
                    raw.timestamp_ms
                ))
            })?;
        Self::new(timestamp, raw.open, raw.high, raw.low, raw.close, raw.volume)
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    pub fn open(&self) -> f64 {
        self.open
    }

    pub fn high(&self) -> f64 {
        self.high
    }

    pub fn low(&self) -> f64 {
        self.low
    }

    pub fn close(&self) -> f64 {
        self.close
    }

    pub fn volume(&self) -> f64 {
        self.volume
    }

    pub fn get(&self, column: Column) -> f64 {
        match column {
            Column::Open => self.open,
            Column::High => self.high,
            Column::Low => self.low,
            Column::Close => self.close,
            Column::Volume => self.volume,
        }
    }
}

// ---------------------------------------------------------------------------
// Series
// ---------------------------------------------------------------------------

/// Chronologically ordered bars plus the metadata identifying where they came
/// from. Timestamps are strictly increasing.
#[derive(Debug, Clone, Serialize)]
pub struct Series {
    symbol: String,
    timeframe: String,
    exchange: String,
    bars: Vec<Bar>,
}

impl Series {
    /// Wrap `bars`, rejecting out-of-order or duplicate timestamps.
    pub fn new(
        symbol: impl Into<String>,
        timeframe: impl Into<String>,
        exchange: impl Into<String>,
        bars: Vec<Bar>,
    ) -> Result<Self> {
        if let Some(w) = bars
            .windows(2)
            .find(|w| w[1].timestamp() <= w[0].timestamp())
        {
            return Err(IndicatorError::Validation(format!(
                "bar timestamps must be strictly increasing: {} followed by {}",
                w[0].timestamp(),
                w[1].timestamp()
            )));
        }

        Ok(Self {
            symbol: symbol.into(),
            timeframe: timeframe.into(),
            exchange: exchange.into(),
            bars,
        })
    }

    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    pub fn timeframe(&self) -> &str {
        &self.timeframe
    }

    pub fn exchange(&self) -> &str {
        &self.exchange
    }

    pub fn bars(&self) -> &[Bar] {
        &self.bars
    }

    pub fn len(&self) -> usize {
        self.bars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bars.is_empty()
    }

    pub fn timestamps(&self) -> Vec<DateTime<Utc>> {
        self.bars.iter().map(Bar::timestamp).collect()
    }

    /// Columnar copy of the bars, one buffer per field.
    pub fn columns(&self) -> OhlcvColumns {
        let pick = |col: Column| self.bars.iter().map(|b| b.get(col)).collect();
        OhlcvColumns {
            open: pick(Column::Open),
            high: pick(Column::High),
            low: pick(Column::Low),
            close: pick(Column::Close),
            volume: pick(Column::Volume),
        }
    }
}

// ---------------------------------------------------------------------------
// Columnar buffers
// ---------------------------------------------------------------------------

/// Five equal-length numeric buffers, positionally aligned with the series
/// they came from. Unlike [`Bar`], raw columns may carry NaN gaps.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct OhlcvColumns {
    pub(crate) open: Vec<f64>,
    pub(crate) high: Vec<f64>,
    pub(crate) low: Vec<f64>,
    pub(crate) close: Vec<f64>,
    pub(crate) volume: Vec<f64>,
}

impl OhlcvColumns {
    pub fn new(
        open: Vec<f64>,
        high: Vec<f64>,
        low: Vec<f64>,
        close: Vec<f64>,
        volume: Vec<f64>,
    ) -> Result<Self> {
        let len = open.len();
        for (col, buf) in [
            (Column::High, &high),
            (Column::Low, &low),
            (Column::Close, &close),
            (Column::Volume, &volume),
        ] {
            if buf.len() != len {
                return Err(IndicatorError::Validation(format!(
                    "column '{col}' has {} rows, expected {len}",
                    buf.len()
                )));
            }
        }
        Ok(Self {
            open,
            high,
            low,
            close,
            volume,
        })
    }

    pub fn len(&self) -> usize {
        self.open.len()
    }

    pub fn is_empty(&self) -> bool {
        self.open.is_empty()
    }

    pub fn get(&self, column: Column) -> &[f64] {
        match column {
            Column::Open => &self.open,
            Column::High => &self.high,
            Column::Low => &self.low,
            Column::Close => &self.close,
            Column::Volume => &self.volume,
        }
    }

    pub(crate) fn get_mut(&mut self, column: Column) -> &mut Vec<f64> {
        match column {
            Column::Open => &mut self.open,
            Column::High => &mut self.high,
            Column::Low => &mut self.low,
            Column::Close => &mut self.close,
            Column::Volume => &mut self.volume,
        }
    }
}
