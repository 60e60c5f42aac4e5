// =============================================================================
// Series Assembler — paged candle fetch into a validated Series
// =============================================================================
//
// Exchanges cap how many candles a single request returns, so a date range is
// walked page by page:
//   1. request up to `page_limit` candles starting at the cursor, never more
//      than the source itself will serve
//   2. keep candles strictly before `until`
//   3. advance the cursor to the last returned timestamp + 1 ms
//   4. stop on an empty page, a short page, or once the cursor reaches `until`
//
// The result is sorted, de-duplicated and validated, so it can be handed to
// the indicator engine as-is.
// =============================================================================

use std::future::Future;

use anyhow::{Context, Result};
use chrono::{DateTime, NaiveDate, NaiveDateTime};
use tracing::{debug, info, instrument, warn};

use super::bar::{Bar, RawCandle, Series};

/// Most exchanges serve at most this many candles per request.
pub const DEFAULT_PAGE_LIMIT: usize = 1000;

/// Anything that can serve one page of raw candles.
pub trait CandleSource {
    /// Identifier recorded on the assembled [`Series`], e.g. `"binance"`.
    fn exchange_id(&self) -> &str;

    /// Return at most `limit` candles with `timestamp_ms >= since_ms`, oldest
    /// first.
    fn fetch_page(
        &self,
        symbol: &str,
        timeframe: &str,
        since_ms: i64,
        limit: usize,
    ) -> impl Future<Output = Result<Vec<RawCandle>>> + Send;

    /// Largest page the source will return for one request. Asking for more
    /// yields at most this many candles.
    fn max_page_size(&self) -> usize {
        usize::MAX
    }
}

/// Walks a date range page by page and produces one [`Series`].
#[derive(Debug, Clone)]
pub struct SeriesAssembler<S> {
    source: S,
    page_limit: usize,
}

impl<S: CandleSource> SeriesAssembler<S> {
    pub fn new(source: S) -> Self {
        Self {
            source,
            page_limit: DEFAULT_PAGE_LIMIT,
        }
    }

    /// Override the page size. Zero is clamped to 1.
    pub fn with_page_limit(mut self, page_limit: usize) -> Self {
        self.page_limit = page_limit.max(1);
        self
    }

    /// Candles requested per page: the configured limit, capped by the
    /// source's own page size.
    pub fn page_limit(&self) -> usize {
        self.page_limit.min(self.source.max_page_size()).max(1)
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    /// Fetch every candle in `[since_ms, until_ms)` for `symbol`/`timeframe`.
    #[instrument(skip(self), name = "assembler::assemble")]
    pub async fn assemble(
        &self,
        symbol: &str,
        timeframe: &str,
        since_ms: i64,
        until_ms: i64,
    ) -> Result<Series> {
        let mut raw: Vec<RawCandle> = Vec::new();
        let mut cursor = since_ms;
        let mut pages = 0usize;
        let page_limit = self.page_limit();
        if page_limit < self.page_limit {
            debug!(
                requested = self.page_limit,
                served = page_limit,
                "page limit capped by source"
            );
        }

        while cursor < until_ms {
            let page = self
                .source
                .fetch_page(symbol, timeframe, cursor, page_limit)
                .await
                .with_context(|| {
                    format!("failed to fetch {symbol} {timeframe} candles since {cursor}")
                })?;
            pages += 1;

            let Some(last) = page.last() else {
                debug!(cursor, "empty page, range exhausted");
                break;
            };
            let next_cursor = last.timestamp_ms + 1;

            let before = raw.len();
            raw.extend(page.iter().filter(|c| c.timestamp_ms < until_ms));
            debug!(
                page = pages,
                cursor,
                returned = page.len(),
                kept = raw.len() - before,
                "candle page fetched"
            );

            if page.len() < page_limit {
                break;
            }
            if next_cursor <= cursor {
                warn!(cursor, next_cursor, "source did not advance, stopping");
                break;
            }
            cursor = next_cursor;
        }

        let mut bars = raw
            .iter()
            .map(Bar::from_raw)
            .collect::<std::result::Result<Vec<_>, _>>()
            .with_context(|| format!("invalid candle in {symbol} {timeframe} response"))?;

        bars.sort_by_key(Bar::timestamp);
        let fetched = bars.len();
        bars.dedup_by_key(|b| b.timestamp());
        if bars.len() < fetched {
            debug!(dropped = fetched - bars.len(), "duplicate candles removed");
        }

        let series = Series::new(symbol, timeframe, self.source.exchange_id(), bars)?;
        info!(
            symbol,
            timeframe,
            exchange = self.source.exchange_id(),
            pages,
            bars = series.len(),
            "series assembled"
        );
        Ok(series)
    }

    /// Same as [`assemble`](Self::assemble) with ISO date strings for the
    /// range bounds.
    pub async fn assemble_range(
        &self,
        symbol: &str,
        timeframe: &str,
        since: &str,
        until: &str,
    ) -> Result<Series> {
        let since_ms = parse_date_to_timestamp(since)?;
        let until_ms = parse_date_to_timestamp(until)?;
        self.assemble(symbol, timeframe, since_ms, until_ms).await
    }
}

/// Parse `YYYY-MM-DD`, `YYYY-MM-DD HH:MM:SS`, `YYYY-MM-DDTHH:MM:SS` or an
/// RFC 3339 string into UTC epoch milliseconds. Naive values are read as UTC.
pub fn parse_date_to_timestamp(date: &str) -> Result<i64> {
    let date = date.trim();

    if let Ok(dt) = DateTime::parse_from_rfc3339(date) {
        return Ok(dt.timestamp_millis());
    }
    for fmt in ["%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M", "%Y-%m-%d %H:%M"] {
        if let Ok(dt) = NaiveDateTime::parse_from_str(date, fmt) {
            return Ok(dt.and_utc().timestamp_millis());
        }
    }
    let day = NaiveDate::parse_from_str(date, "%Y-%m-%d")
        .with_context(|| format!("unrecognised date '{date}', expected YYYY-MM-DD"))?;
    let midnight = day
        .and_hms_opt(0, 0, 0)
        .context("midnight is always a valid time")?;
    Ok(midnight.and_utc().timestamp_millis())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    const MINUTE: i64 = 60_000;

    fn candle(ts: i64, close: f64) -> RawCandle {
        RawCandle::from((ts, close, close + 1.0, close - 1.0, close, 5.0))
    }

    /// Serves candles from an in-memory list, honouring `since` and `limit`,
    /// and records every cursor it was asked for.
    struct ScriptedSource {
        candles: Vec<RawCandle>,
        cap: usize,
        requests: Mutex<Vec<i64>>,
    }

    impl ScriptedSource {
        fn new(candles: Vec<RawCandle>) -> Self {
            Self {
                candles,
                cap: usize::MAX,
                requests: Mutex::new(Vec::new()),
            }
        }

        /// Serve at most `cap` candles per request, whatever the caller asks.
        fn capped(candles: Vec<RawCandle>, cap: usize) -> Self {
            Self {
                cap,
                ..Self::new(candles)
            }
        }

        fn requests(&self) -> Vec<i64> {
            self.requests.lock().unwrap().clone()
        }
    }

    impl CandleSource for ScriptedSource {
        fn exchange_id(&self) -> &str {
            "scripted"
        }

        async fn fetch_page(
            &self,
            _symbol: &str,
            _timeframe: &str,
            since_ms: i64,
            limit: usize,
        ) -> Result<Vec<RawCandle>> {
            self.requests.lock().unwrap().push(since_ms);
            Ok(self
                .candles
                .iter()
                .filter(|c| c.timestamp_ms >= since_ms)
                .take(limit.min(self.cap))
                .copied()
                .collect())
        }

        fn max_page_size(&self) -> usize {
            self.cap
        }
    }

    fn minutes(n: i64) -> Vec<RawCandle> {
        (0..n).map(|i| candle(i * MINUTE, 100.0 + i as f64)).collect()
    }

    #[tokio::test]
    async fn pages_advance_from_last_timestamp_plus_one() {
        let source = ScriptedSource::new(minutes(25));
        let assembler = SeriesAssembler::new(source).with_page_limit(10);

        let series = assembler.assemble("BTCUSDT", "1m", 0, 100 * MINUTE).await.unwrap();

        assert_eq!(series.len(), 25);
        assert_eq!(series.exchange(), "scripted");
        assert_eq!(
            assembler.source().requests(),
            vec![0, 9 * MINUTE + 1, 19 * MINUTE + 1]
        );
    }

    #[tokio::test]
    async fn page_limit_above_source_cap_still_covers_range() {
        let source = ScriptedSource::capped(minutes(2500), 1000);
        let assembler = SeriesAssembler::new(source).with_page_limit(1500);
        assert_eq!(assembler.page_limit(), 1000);

        let series = assembler
            .assemble("BTCUSDT", "1m", 0, 10_000 * MINUTE)
            .await
            .unwrap();

        assert_eq!(series.len(), 2500);
        assert_eq!(
            assembler.source().requests(),
            vec![0, 999 * MINUTE + 1, 1999 * MINUTE + 1]
        );
    }

    #[tokio::test]
    async fn short_page_stops_the_loop() {
        let source = ScriptedSource::new(minutes(7));
        let assembler = SeriesAssembler::new(source).with_page_limit(10);

        let series = assembler.assemble("BTCUSDT", "1m", 0, 100 * MINUTE).await.unwrap();

        assert_eq!(series.len(), 7);
        assert_eq!(assembler.source().requests().len(), 1);
    }

    #[tokio::test]
    async fn end_boundary_is_excluded() {
        let source = ScriptedSource::new(minutes(30));
        let assembler = SeriesAssembler::new(source).with_page_limit(10);

        let series = assembler.assemble("BTCUSDT", "1m", 0, 12 * MINUTE).await.unwrap();

        assert_eq!(series.len(), 12);
        let last = series.bars().last().unwrap();
        assert_eq!(last.timestamp().timestamp_millis(), 11 * MINUTE);
        // The cursor passes `until` after the second page.
        assert_eq!(assembler.source().requests().len(), 2);
    }

    #[tokio::test]
    async fn empty_range_yields_empty_series() {
        let source = ScriptedSource::new(Vec::new());
        let assembler = SeriesAssembler::new(source);

        let series = assembler.assemble("BTCUSDT", "1h", 0, MINUTE).await.unwrap();
        assert_eq!(series.len(), 0);
    }

    #[tokio::test]
    async fn duplicates_and_disorder_are_normalised() {
        let candles = vec![
            candle(2 * MINUTE, 3.0),
            candle(0, 1.0),
            candle(MINUTE, 2.0),
            candle(MINUTE, 9.0),
        ];
        let source = ScriptedSource::new(candles);
        let assembler = SeriesAssembler::new(source).with_page_limit(10);

        let series = assembler.assemble("X", "1m", 0, 10 * MINUTE).await.unwrap();

        let closes: Vec<f64> = series.bars().iter().map(Bar::close).collect();
        assert_eq!(closes, vec![1.0, 2.0, 3.0]);
    }

    #[tokio::test]
    async fn invalid_candle_fails_assembly() {
        let mut candles = minutes(3);
        candles[1] = RawCandle::from((MINUTE, 10.0, 10.0, 20.0, 15.0, 1.0));
        let assembler = SeriesAssembler::new(ScriptedSource::new(candles));

        let err = assembler.assemble("X", "1m", 0, 10 * MINUTE).await.unwrap_err();
        let root = err.root_cause().to_string();
        assert!(root.contains("cannot be less than low"), "{root}");
    }

    #[tokio::test]
    async fn stalled_source_does_not_loop_forever() {
        struct Stuck;
        impl CandleSource for Stuck {
            fn exchange_id(&self) -> &str {
                "stuck"
            }
            async fn fetch_page(
                &self,
                _symbol: &str,
                _timeframe: &str,
                _since_ms: i64,
                limit: usize,
            ) -> Result<Vec<RawCandle>> {
                // Always the same full page, ignoring `since`.
                Ok((0..limit as i64).map(|i| candle(i - 1000 * MINUTE, 1.0)).collect())
            }
        }

        let assembler = SeriesAssembler::new(Stuck).with_page_limit(5);
        let series = assembler.assemble("X", "1m", 0, MINUTE).await.unwrap();
        assert_eq!(series.len(), 5);
    }

    #[test]
    fn parses_supported_date_formats() {
        assert_eq!(parse_date_to_timestamp("2024-01-01").unwrap(), 1_704_067_200_000);
        assert_eq!(
            parse_date_to_timestamp("2024-01-01 01:00:00").unwrap(),
            1_704_070_800_000
        );
        assert_eq!(
            parse_date_to_timestamp("2024-01-01T01:00:00").unwrap(),
            1_704_070_800_000
        );
        assert_eq!(
            parse_date_to_timestamp("2024-01-01T01:00:00+01:00").unwrap(),
            1_704_067_200_000
        );
        assert!(parse_date_to_timestamp("01/02/2024").is_err());
    }
}
