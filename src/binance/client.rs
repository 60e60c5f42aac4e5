// =============================================================================
// Binance REST API Client — public kline data
// =============================================================================
//
// Serves one page of candles per request from GET /api/v3/klines. Pagination
// across a date range is the assembler's job; this client only knows how to
// fetch a single page starting at a given timestamp.
//
// SECURITY: The optional API key is sent as the X-MBX-APIKEY header and is
// never logged or serialized.
// =============================================================================

use std::sync::Arc;

use anyhow::{Context, Result};
use reqwest::header::{HeaderMap, HeaderValue};
use tracing::{debug, instrument};

use super::rate_limit::RateLimitTracker;
use crate::market_data::{CandleSource, RawCandle};

/// Default production endpoint.
pub const DEFAULT_BASE_URL: &str = "https://api.binance.com";

/// Binance serves at most this many klines per request.
pub const MAX_KLINES_PER_REQUEST: usize = 1000;

/// Binance REST API client for public market data.
#[derive(Clone)]
pub struct BinanceClient {
    api_key: Option<String>,
    base_url: String,
    client: reqwest::Client,
    rate_limit: Arc<RateLimitTracker>,
}

impl BinanceClient {
    // -------------------------------------------------------------------------
    // Construction
    // -------------------------------------------------------------------------

    /// Create a new `BinanceClient`.
    ///
    /// # Arguments
    /// * `api_key`  — optional Binance API key; public endpoints work without.
    /// * `base_url` — REST root, e.g. [`DEFAULT_BASE_URL`].
    pub fn new(api_key: Option<String>, base_url: impl Into<String>) -> Result<Self> {
        let api_key = api_key.filter(|k| !k.is_empty());

        let mut default_headers = HeaderMap::new();
        if let Some(key) = &api_key {
            let val = HeaderValue::from_str(key).context("API key is not a valid header value")?;
            default_headers.insert("X-MBX-APIKEY", val);
        }

        let client = reqwest::Client::builder()
            .default_headers(default_headers)
            .timeout(std::time::Duration::from_secs(10))
            .build()
            .context("failed to build reqwest client")?;

        let base_url = base_url.into().trim_end_matches('/').to_string();
        debug!(base_url = %base_url, authenticated = api_key.is_some(), "BinanceClient initialised");

        Ok(Self {
            api_key,
            base_url,
            client,
            rate_limit: Arc::new(RateLimitTracker::new()),
        })
    }

    pub fn rate_limit(&self) -> &RateLimitTracker {
        &self.rate_limit
    }

    // -------------------------------------------------------------------------
    // Public market data
    // -------------------------------------------------------------------------

    /// GET /api/v3/klines starting at `start_time_ms`.
    ///
    /// Array indices of each entry:
    ///   [0] openTime, [1] open, [2] high, [3] low, [4] close, [5] volume,
    ///   [6] closeTime, ...
    #[instrument(skip(self), name = "binance::get_klines")]
    pub async fn get_klines(
        &self,
        symbol: &str,
        interval: &str,
        start_time_ms: i64,
        limit: usize,
    ) -> Result<Vec<RawCandle>> {
        let symbol = exchange_symbol(symbol);
        let limit = limit.clamp(1, MAX_KLINES_PER_REQUEST);

        self.rate_limit.wait_for_budget(kline_weight(limit)).await;

        let url = format!(
            "{}/api/v3/klines?symbol={}&interval={}&startTime={}&limit={}",
            self.base_url, symbol, interval, start_time_ms, limit
        );

        let resp = self
            .client
            .get(&url)
            .send()
            .await
            .context("GET /api/v3/klines request failed")?;

        self.rate_limit.update_from_headers(resp.headers());

        let status = resp.status();
        let body: serde_json::Value = resp
            .json()
            .await
            .context("failed to parse klines response")?;

        if !status.is_success() {
            anyhow::bail!(
                "Binance GET /api/v3/klines returned {}: {}",
                status,
                body
            );
        }

        let candles = parse_klines(&body)?;
        debug!(symbol = %symbol, interval, count = candles.len(), "klines fetched");
        Ok(candles)
    }
}

impl CandleSource for BinanceClient {
    fn exchange_id(&self) -> &str {
        "binance"
    }

    async fn fetch_page(
        &self,
        symbol: &str,
        timeframe: &str,
        since_ms: i64,
        limit: usize,
    ) -> Result<Vec<RawCandle>> {
        self.get_klines(symbol, timeframe, since_ms, limit).await
    }

    fn max_page_size(&self) -> usize {
        MAX_KLINES_PER_REQUEST
    }
}

impl std::fmt::Debug for BinanceClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BinanceClient")
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("base_url", &self.base_url)
            .field("rate_limit", &self.rate_limit)
            .finish()
    }
}

// -----------------------------------------------------------------------------
// Internal helpers
// -----------------------------------------------------------------------------

/// `"BTC/USDT"` → `"BTCUSDT"`.
fn exchange_symbol(symbol: &str) -> String {
    symbol
        .chars()
        .filter(|c| c.is_ascii_alphanumeric())
        .collect::<String>()
        .to_uppercase()
}

/// Request weight Binance charges for a klines call of `limit` rows.
fn kline_weight(limit: usize) -> u32 {
    match limit {
        0..=99 => 1,
        100..=499 => 2,
        500..=1000 => 5,
        _ => 10,
    }
}

/// Parse Binance's array-of-arrays kline payload.
fn parse_klines(body: &serde_json::Value) -> Result<Vec<RawCandle>> {
    let raw = body.as_array().context("klines response is not an array")?;

    let mut candles = Vec::with_capacity(raw.len());
    for (i, entry) in raw.iter().enumerate() {
        let arr = entry.as_array().context("kline entry is not an array")?;

        if arr.len() < 6 {
            anyhow::bail!(
                "kline entry {i} has {} elements, expected at least 6",
                arr.len()
            );
        }

        let timestamp_ms = arr[0].as_i64().context("kline open time is not an integer")?;
        candles.push(RawCandle {
            timestamp_ms,
            open: parse_str_f64(&arr[1])?,
            high: parse_str_f64(&arr[2])?,
            low: parse_str_f64(&arr[3])?,
            close: parse_str_f64(&arr[4])?,
            volume: parse_str_f64(&arr[5])?,
        });
    }
    Ok(candles)
}

/// Parse a JSON value that may be either a string or a number into `f64`.
fn parse_str_f64(val: &serde_json::Value) -> Result<f64> {
    if let Some(s) = val.as_str() {
        s.parse::<f64>()
            .with_context(|| format!("failed to parse '{s}' as f64"))
    } else if let Some(n) = val.as_f64() {
        Ok(n)
    } else {
        anyhow::bail!("expected string or number, got: {val}")
    }
}
