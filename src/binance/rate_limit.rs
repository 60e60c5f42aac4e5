// =============================================================================
// Rate-Limit Tracker — monitors Binance request weight to avoid 429s
// =============================================================================
//
// Binance allows 1200 request weight per minute per IP; we hard-cap ourselves
// at 1000. The tracker reads the `X-MBX-USED-WEIGHT-1M` response header after
// every request and keeps an atomic counter that any task may query lock-free.
// A paged kline walk checks the budget before each page and sits out the rest
// of the minute when it would overshoot.
// =============================================================================

use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

use serde::Serialize;
use tracing::{debug, warn};

/// Hard ceiling at which we refuse to send additional requests.
const WEIGHT_HARD_LIMIT: u32 = 1000;
/// Soft warning threshold.
const WEIGHT_WARN_THRESHOLD: u32 = 800;
/// Length of the weight accounting window.
const WEIGHT_WINDOW: Duration = Duration::from_secs(60);

/// Thread-safe request-weight tracker backed by an atomic counter.
pub struct RateLimitTracker {
    used_weight_1m: AtomicU32,
}

/// Immutable snapshot of the current rate-limit state.
#[derive(Debug, Clone, Serialize)]
pub struct RateLimitSnapshot {
    pub used_weight_1m: u32,
}

impl RateLimitTracker {
    /// Create a new tracker with the counter at zero.
    pub fn new() -> Self {
        Self {
            used_weight_1m: AtomicU32::new(0),
        }
    }

    /// Update the counter from the `X-MBX-USED-WEIGHT-1M` response header.
    pub fn update_from_headers(&self, headers: &reqwest::header::HeaderMap) {
        let Some(w) = headers
            .get("X-MBX-USED-WEIGHT-1M")
            .and_then(|v| v.to_str().ok())
            .and_then(|s| s.parse::<u32>().ok())
        else {
            return;
        };

        let prev = self.used_weight_1m.swap(w, Ordering::Relaxed);
        if w >= WEIGHT_WARN_THRESHOLD && prev < WEIGHT_WARN_THRESHOLD {
            warn!(
                used_weight = w,
                hard_limit = WEIGHT_HARD_LIMIT,
                "rate-limit weight crossed warning threshold"
            );
        }
        debug!(used_weight_1m = w, "rate-limit weight updated from header");
    }

    /// Return `true` if we can afford to spend `weight` more request weight
    /// without exceeding the hard limit.
    pub fn can_send_request(&self, weight: u32) -> bool {
        let current = self.used_weight_1m.load(Ordering::Relaxed);
        current.saturating_add(weight) <= WEIGHT_HARD_LIMIT
    }

    /// Sleep out the current weight window if `weight` does not fit in it.
    pub async fn wait_for_budget(&self, weight: u32) {
        if self.can_send_request(weight) {
            return;
        }
        warn!(
            current_weight = self.used_weight_1m.load(Ordering::Relaxed),
            requested_weight = weight,
            pause_secs = WEIGHT_WINDOW.as_secs(),
            "request weight budget exhausted, pausing"
        );
        tokio::time::sleep(WEIGHT_WINDOW).await;
        self.reset_1m_weight();
    }

    /// Reset the 1-minute weight counter.
    pub fn reset_1m_weight(&self) {
        self.used_weight_1m.store(0, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> RateLimitSnapshot {
        RateLimitSnapshot {
            used_weight_1m: self.used_weight_1m.load(Ordering::Relaxed),
        }
    }
}

impl Default for RateLimitTracker {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for RateLimitTracker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RateLimitTracker")
            .field("used_weight_1m", &self.used_weight_1m.load(Ordering::Relaxed))
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::header::{HeaderMap, HeaderValue};

    fn headers(weight: &str) -> HeaderMap {
        let mut h = HeaderMap::new();
        h.insert("X-MBX-USED-WEIGHT-1M", HeaderValue::from_str(weight).unwrap());
        h
    }

    #[test]
    fn header_updates_counter() {
        let tracker = RateLimitTracker::new();
        tracker.update_from_headers(&headers("42"));
        assert_eq!(tracker.snapshot().used_weight_1m, 42);
    }

    #[test]
    fn snapshot_serialises_weight() {
        let tracker = RateLimitTracker::new();
        tracker.update_from_headers(&headers("7"));
        let json = serde_json::to_value(tracker.snapshot()).unwrap();
        assert_eq!(json, serde_json::json!({ "used_weight_1m": 7 }));
    }

    #[test]
    fn malformed_header_is_ignored() {
        let tracker = RateLimitTracker::new();
        tracker.update_from_headers(&headers("12"));
        tracker.update_from_headers(&headers("lots"));
        assert_eq!(tracker.snapshot().used_weight_1m, 12);
    }

    #[test]
    fn budget_respects_hard_limit() {
        let tracker = RateLimitTracker::new();
        tracker.update_from_headers(&headers("995"));
        assert!(tracker.can_send_request(5));
        assert!(!tracker.can_send_request(6));
        tracker.reset_1m_weight();
        assert!(tracker.can_send_request(6));
    }

    #[tokio::test(start_paused = true)]
    async fn wait_for_budget_pauses_then_resets() {
        let tracker = RateLimitTracker::new();
        tracker.update_from_headers(&headers("1000"));
        tracker.wait_for_budget(5).await;
        assert_eq!(tracker.snapshot().used_weight_1m, 0);
    }
}
