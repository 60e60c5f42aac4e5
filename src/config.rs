// =============================================================================
// Application Configuration — what to fetch and how to judge it
// =============================================================================
//
// Loaded from an optional JSON file, then overridden from the environment.
// All fields carry `#[serde(default)]` so that a partial file (or `{}`) loads
// cleanly.
//
// Environment overrides:
//   VELODETECT_SYMBOL, VELODETECT_TIMEFRAME, VELODETECT_SINCE,
//   VELODETECT_UNTIL, BINANCE_API_KEY
// =============================================================================

use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::market_data::assembler::DEFAULT_PAGE_LIMIT;
use crate::market_data::parse_date_to_timestamp;
use crate::signals::velocity::{DEFAULT_ROC_THRESHOLD, DEFAULT_VOLUME_MULTIPLIER};

// =============================================================================
// Default-value helpers (required by serde `default = "..."` attribute)
// =============================================================================

fn default_exchange() -> String {
    "binance".to_string()
}

fn default_symbol() -> String {
    "BTC/USDT".to_string()
}

fn default_timeframe() -> String {
    "1h".to_string()
}

fn default_since() -> String {
    "2024-01-01".to_string()
}

fn default_until() -> String {
    "2024-02-01".to_string()
}

fn default_page_limit() -> usize {
    DEFAULT_PAGE_LIMIT
}

fn default_roc_threshold() -> f64 {
    DEFAULT_ROC_THRESHOLD
}

fn default_volume_multiplier() -> f64 {
    DEFAULT_VOLUME_MULTIPLIER
}

// =============================================================================
// AppConfig
// =============================================================================

#[derive(Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Exchange identifier; only `"binance"` has a client.
    #[serde(default = "default_exchange")]
    pub exchange: String,

    /// Trading pair, e.g. `"BTC/USDT"`.
    #[serde(default = "default_symbol")]
    pub symbol: String,

    /// Candle interval, e.g. `"1m"`, `"1h"`, `"1d"`.
    #[serde(default = "default_timeframe")]
    pub timeframe: String,

    /// Inclusive range start (date or date-time, UTC).
    #[serde(default = "default_since")]
    pub since: String,

    /// Exclusive range end.
    #[serde(default = "default_until")]
    pub until: String,

    #[serde(default = "default_page_limit")]
    pub page_limit: usize,

    /// Percent ROC(14) beyond which momentum counts as strong.
    #[serde(default = "default_roc_threshold")]
    pub roc_threshold: f64,

    /// Volume / SMA(volume, 20) ratio above which volume counts as high.
    #[serde(default = "default_volume_multiplier")]
    pub volume_multiplier: f64,

    /// Only ever sourced from the environment.
    #[serde(skip)]
    pub api_key: Option<String>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            exchange: default_exchange(),
            symbol: default_symbol(),
            timeframe: default_timeframe(),
            since: default_since(),
            until: default_until(),
            page_limit: default_page_limit(),
            roc_threshold: default_roc_threshold(),
            volume_multiplier: default_volume_multiplier(),
            api_key: None,
        }
    }
}

impl AppConfig {
    /// Load configuration from a JSON file at `path`.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config from {}", path.display()))?;

        let config: Self = serde_json::from_str(&content)
            .with_context(|| format!("failed to parse config JSON from {}", path.display()))?;

        info!(
            path = %path.display(),
            symbol = %config.symbol,
            timeframe = %config.timeframe,
            "config loaded"
        );

        Ok(config)
    }

    /// Apply `VELODETECT_*` / `BINANCE_API_KEY` overrides from the process
    /// environment.
    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let var = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        if let Some(symbol) = var("VELODETECT_SYMBOL") {
            self.symbol = symbol.to_uppercase();
        }
        if let Some(timeframe) = var("VELODETECT_TIMEFRAME") {
            self.timeframe = timeframe;
        }
        if let Some(since) = var("VELODETECT_SINCE") {
            self.since = since;
        }
        if let Some(until) = var("VELODETECT_UNTIL") {
            self.until = until;
        }
        if let Some(key) = var("BINANCE_API_KEY") {
            self.api_key = Some(key);
        }
    }

    /// Check that the configuration describes a fetchable, evaluable run.
    pub fn validate(&self) -> Result<()> {
        if self.symbol.trim().is_empty() {
            anyhow::bail!("symbol must not be empty");
        }
        if self.timeframe.trim().is_empty() {
            anyhow::bail!("timeframe must not be empty");
        }
        if self.page_limit == 0 {
            anyhow::bail!("page_limit must be at least 1");
        }
        if !self.roc_threshold.is_finite() {
            anyhow::bail!("roc_threshold must be finite, got {}", self.roc_threshold);
        }
        if !self.volume_multiplier.is_finite() || self.volume_multiplier < 0.0 {
            anyhow::bail!(
                "volume_multiplier must be finite and >= 0, got {}",
                self.volume_multiplier
            );
        }

        let since = parse_date_to_timestamp(&self.since).context("invalid `since`")?;
        let until = parse_date_to_timestamp(&self.until).context("invalid `until`")?;
        if since >= until {
            anyhow::bail!("since ({}) must be before until ({})", self.since, self.until);
        }
        Ok(())
    }
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("exchange", &self.exchange)
            .field("symbol", &self.symbol)
            .field("timeframe", &self.timeframe)
            .field("since", &self.since)
            .field("until", &self.until)
            .field("page_limit", &self.page_limit)
            .field("roc_threshold", &self.roc_threshold)
            .field("volume_multiplier", &self.volume_multiplier)
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}
