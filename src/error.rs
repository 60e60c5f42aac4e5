// =============================================================================
// Engine error taxonomy
// =============================================================================
//
// Every failure raised by the bar model and the indicator engine. None of
// these are transient, so nothing here is ever retried. Floating-point edge
// results (±inf, NaN from a zero denominator) are values, not errors.

use thiserror::Error;

/// Errors surfaced by [`crate::market_data`] construction and the indicator
/// engine.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IndicatorError {
    /// A bar or series violates an OHLCV invariant.
    #[error("validation error: {0}")]
    Validation(String),

    /// A requested column does not exist on the series.
    #[error("column '{column}' not found in data")]
    Schema { column: String },

    /// Empty series, or a column with no defined values.
    #[error("insufficient data: {0}")]
    InsufficientData(String),

    /// Invalid scalar argument supplied to an indicator.
    #[error("invalid parameter: {0}")]
    Parameter(String),
}

pub type Result<T> = std::result::Result<T, IndicatorError>;
