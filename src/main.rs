// =============================================================================
// velodetect — Main Entry Point
// =============================================================================
//
// Fetches one OHLCV series for the configured symbol and date range, runs the
// velocity indicators over it and prints a one-line JSON summary of the most
// recent bar.
// =============================================================================

use anyhow::Context;
use serde::Serialize;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use velodetect::binance::client::{BinanceClient, DEFAULT_BASE_URL};
use velodetect::config::AppConfig;
use velodetect::market_data::SeriesAssembler;
use velodetect::Indicators;

const CONFIG_PATH: &str = "velodetect.json";

/// Latest-bar snapshot printed at the end of a run.
#[derive(Debug, Serialize)]
struct Summary<'a> {
    symbol: &'a str,
    timeframe: &'a str,
    exchange: &'a str,
    bars: usize,
    filled_gaps: usize,
    price_velocity: Option<f64>,
    roc_14: Option<f64>,
    rsi_14: Option<f64>,
    macd_line: Option<f64>,
    macd_signal: Option<f64>,
    macd_histogram: Option<f64>,
    volume_velocity: Option<f64>,
    active_signals: Vec<&'static str>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // ── 1. Environment & config ──────────────────────────────────────────
    let _ = dotenv::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let mut config = AppConfig::load(CONFIG_PATH).unwrap_or_else(|e| {
        warn!(error = %e, "Failed to load config, using defaults");
        AppConfig::default()
    });
    config.apply_env_overrides();
    config.validate().context("invalid configuration")?;

    info!(
        exchange = %config.exchange,
        symbol = %config.symbol,
        timeframe = %config.timeframe,
        since = %config.since,
        until = %config.until,
        "velodetect starting"
    );

    if config.exchange != "binance" {
        anyhow::bail!("unsupported exchange '{}'", config.exchange);
    }

    // ── 2. Assemble the series ───────────────────────────────────────────
    let client = BinanceClient::new(config.api_key.clone(), DEFAULT_BASE_URL)?;
    let assembler = SeriesAssembler::new(client).with_page_limit(config.page_limit);
    let series = assembler
        .assemble_range(&config.symbol, &config.timeframe, &config.since, &config.until)
        .await?;

    if series.is_empty() {
        warn!(symbol = %config.symbol, "no candles in range, nothing to evaluate");
        return Ok(());
    }

    // ── 3. Indicators & signals ──────────────────────────────────────────
    let indicators = Indicators::from_series(&series);
    if indicators.filled_gaps() > 0 {
        warn!(filled = indicators.filled_gaps(), "forward-filled missing values");
    }

    let price_velocity = indicators.price_velocity(1)?;
    let roc = indicators.roc(14, "close")?;
    let rsi = indicators.rsi(14)?;
    let macd = indicators.macd(12, 26, 9)?;
    let volume_velocity = indicators.volume_velocity(20)?;
    let signals =
        indicators.detect_velocity_signals(config.roc_threshold, config.volume_multiplier)?;

    let summary = Summary {
        symbol: series.symbol(),
        timeframe: series.timeframe(),
        exchange: series.exchange(),
        bars: series.len(),
        filled_gaps: indicators.filled_gaps(),
        price_velocity: latest(&price_velocity),
        roc_14: latest(&roc),
        rsi_14: latest(&rsi),
        macd_line: latest(&macd.line),
        macd_signal: latest(&macd.signal),
        macd_histogram: latest(&macd.histogram),
        volume_velocity: latest(&volume_velocity),
        active_signals: signals.latest_active(),
    };

    if summary.active_signals.is_empty() {
        info!("no active signals on the latest bar");
    } else {
        info!(signals = ?summary.active_signals, "active signals on the latest bar");
    }

    println!("{}", serde_json::to_string(&summary)?);
    Ok(())
}

fn latest(values: &[f64]) -> Option<f64> {
    values.last().copied().filter(|v| v.is_finite())
}
