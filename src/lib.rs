// =============================================================================
// velodetect — OHLCV series assembly and velocity indicators
// =============================================================================
//
// Data flow:
//   CandleSource (binance) → SeriesAssembler → Series → Indicators → signals
//
// Everything below `indicators` and `signals` is pure and synchronous; the
// exchange client and the assembler are the only async, I/O-bound parts.
// =============================================================================

pub mod binance;
pub mod config;
pub mod error;
pub mod indicators;
pub mod market_data;
pub mod signals;
pub mod types;

pub use error::{IndicatorError, Result};
pub use indicators::Indicators;
pub use market_data::{Bar, Series};
pub use signals::VelocitySignals;
