//! Market data provider contract and the global-market HTTP adapter.
//!
//! The provider performs exactly one bounded fetch per call and classifies
//! failures; it never retries. Retry policy lives in the dispatch layer so
//! provider and notifier failures share one backoff budget per cycle.

use std::collections::BTreeMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use serde::Deserialize;
use thiserror::Error;

use crate::domain::MarketSnapshot;
use crate::http_client::{HttpClient, HttpRequest};
use crate::ValidationError;

/// Default global-market endpoint.
pub const DEFAULT_MARKET_API_URL: &str = "https://api.coingecko.com/api/v3/global";

/// Upper bound on a single fetch.
pub const FETCH_TIMEOUT_MS: u64 = 15_000;

/// How much of an offending payload is kept for diagnostics.
const PAYLOAD_SNIPPET_LEN: usize = 512;

/// Fetch-layer error classification.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ProviderError {
    #[error("market data transport error: {0}")]
    Network(String),
    #[error("market data endpoint returned status {0}")]
    HttpStatus(u16),
    #[error("malformed market data payload: {reason}")]
    MalformedPayload {
        reason: String,
        /// Truncated copy of the offending body.
        payload: String,
    },
}

impl ProviderError {
    fn malformed(reason: impl Into<String>, body: &str) -> Self {
        Self::MalformedPayload {
            reason: reason.into(),
            payload: snippet(body),
        }
    }
}

/// Data source contract for market snapshots.
pub trait MarketDataProvider: Send + Sync {
    /// Fetch one snapshot.
    ///
    /// # Errors
    ///
    /// Returns [`ProviderError`] on transport failure, a non-2xx upstream
    /// status, or a body that does not validate into a snapshot shape.
    fn fetch<'a>(
        &'a self,
    ) -> Pin<Box<dyn Future<Output = Result<MarketSnapshot, ProviderError>> + Send + 'a>>;
}

/// Production adapter for CoinGecko-style global market endpoints.
#[derive(Clone)]
pub struct GlobalMarketProvider {
    http_client: Arc<dyn HttpClient>,
    endpoint: String,
}

impl GlobalMarketProvider {
    pub fn new(http_client: Arc<dyn HttpClient>, endpoint: impl Into<String>) -> Self {
        Self {
            http_client,
            endpoint: endpoint.into(),
        }
    }

    pub fn with_default_endpoint(http_client: Arc<dyn HttpClient>) -> Self {
        Self::new(http_client, DEFAULT_MARKET_API_URL)
    }

    async fn fetch_snapshot(&self) -> Result<MarketSnapshot, ProviderError> {
        let request = HttpRequest::get(&self.endpoint)
            .with_header("user-agent", crate::CLIENT_IDENT)
            .with_header("accept", "application/json")
            .with_timeout_ms(FETCH_TIMEOUT_MS);

        let response = self
            .http_client
            .execute(request)
            .await
            .map_err(|e| ProviderError::Network(e.message().to_owned()))?;

        if !response.is_success() {
            return Err(ProviderError::HttpStatus(response.status));
        }

        parse_snapshot(&response.body)
    }
}

impl MarketDataProvider for GlobalMarketProvider {
    fn fetch<'a>(
        &'a self,
    ) -> Pin<Box<dyn Future<Output = Result<MarketSnapshot, ProviderError>> + Send + 'a>> {
        Box::pin(self.fetch_snapshot())
    }
}

// Upstream payload structure. The `data` wrapper and the per-currency
// `total_market_cap` map follow the CoinGecko global endpoint; the per-asset
// `market_caps` map is the capitalization-only variant some mirrors serve.
#[derive(Debug, Deserialize)]
struct GlobalEnvelope {
    data: Option<GlobalFigures>,
}

#[derive(Debug, Deserialize)]
struct GlobalFigures {
    #[serde(default)]
    market_cap_percentage: Option<BTreeMap<String, f64>>,
    #[serde(default)]
    market_caps: Option<BTreeMap<String, f64>>,
    #[serde(default)]
    total_market_cap: Option<BTreeMap<String, f64>>,
    #[serde(rename = "market_cap_change_percentage_24h_usd", default)]
    change_24h: Option<f64>,
}

fn parse_snapshot(body: &str) -> Result<MarketSnapshot, ProviderError> {
    let envelope: GlobalEnvelope = serde_json::from_str(body)
        .map_err(|e| ProviderError::malformed(format!("not valid JSON: {e}"), body))?;

    let figures = envelope
        .data
        .ok_or_else(|| ProviderError::malformed("missing 'data' object", body))?;

    let total_cap = figures
        .total_market_cap
        .as_ref()
        .and_then(|by_currency| by_currency.get("usd"))
        .copied();

    let dominance = figures
        .market_cap_percentage
        .filter(|map| !map.is_empty());
    let caps = figures.market_caps.filter(|map| !map.is_empty());

    let build = |result: Result<MarketSnapshot, ValidationError>| {
        result.map_err(|e| ProviderError::malformed(e.to_string(), body))
    };

    match (dominance, caps, total_cap) {
        (Some(dominance), Some(caps), Some(total)) => {
            build(MarketSnapshot::combined(dominance, caps, total, figures.change_24h))
        }
        (Some(dominance), _, total) => {
            build(MarketSnapshot::dominance(dominance, total, figures.change_24h))
        }
        (None, Some(caps), Some(total)) => {
            build(MarketSnapshot::capitalization(caps, total, figures.change_24h))
        }
        (None, Some(_), None) => Err(ProviderError::malformed(
            "capitalization figures without an aggregate total",
            body,
        )),
        (None, None, _) => Err(ProviderError::malformed(
            "neither dominance percentages nor capitalization figures present",
            body,
        )),
    }
}

fn snippet(body: &str) -> String {
    if body.len() <= PAYLOAD_SNIPPET_LEN {
        return body.to_owned();
    }
    let mut end = PAYLOAD_SNIPPET_LEN;
    while !body.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}…", &body[..end])
}
