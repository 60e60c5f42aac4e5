pub mod assembler;
pub mod bar;

pub use assembler::{parse_date_to_timestamp, CandleSource, SeriesAssembler};
pub use bar::{Bar, OhlcvColumns, RawCandle, Series};
