//! # Dompulse Core
//!
//! Domain types and the fetch → derive → notify pipeline for the dompulse
//! market notifier.
//!
//! ## Overview
//!
//! - **Market snapshot domain** modeling the supported upstream payload
//!   shapes as a tagged union with per-shape validation
//! - **Pure metric derivation** (dominance, altcoin index, scaled totals)
//! - **Provider adapter** for CoinGecko-style global market endpoints
//! - **Notifier contract** with a Telegram Bot API adapter and explicit
//!   rate-limit signaling
//! - **Dispatch policy** driving one cycle with a shared retry budget,
//!   linear backoff, and bounded rate-limit waits
//!
//! ## Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`calc`] | Pure indicator derivation |
//! | [`dispatch`] | Cycle orchestration and message formatting |
//! | [`domain`] | Snapshot and metric value objects |
//! | [`error`] | Core error types |
//! | [`http_client`] | HTTP client abstraction |
//! | [`notify`] | Notifier contract and Telegram adapter |
//! | [`provider`] | Market data source contract and adapter |
//! | [`retry`] | Attempt budget, backoff, and jitter |
//!
//! ## Error Handling
//!
//! Each pipeline stage has its own error type: [`ProviderError`] (retryable),
//! [`CalculationError`] (non-retryable schema drift), and [`NotifierError`]
//! (transient or rate-limited). The dispatch policy is the only place retry
//! decisions are made.
//!
//! ## Security
//!
//! The bot credential is read from the environment once, travels only inside
//! the notifier adapter, and is scrubbed from transport errors.

pub mod calc;
pub mod dispatch;
pub mod domain;
pub mod error;
pub mod http_client;
pub mod notify;
pub mod provider;
pub mod retry;

/// Descriptive client identifier sent with every upstream request.
pub const CLIENT_IDENT: &str = concat!("dompulse/", env!("CARGO_PKG_VERSION"));

// Re-export commonly used types at crate root for convenience

pub use calc::{derive, CalculationError, CAP_TRILLIONS_SCALE};
pub use dispatch::{
    AlertThresholds, AttemptOutcome, CycleOutcome, CycleReport, DispatchConfig, DispatchPolicy,
    NotificationAttempt,
};
pub use domain::{DerivedMetrics, MarketSnapshot, SnapshotShape};
pub use error::ValidationError;
pub use http_client::{
    HttpClient, HttpError, HttpMethod, HttpRequest, HttpResponse, NoopHttpClient,
    ReqwestHttpClient,
};
pub use notify::{Notification, NotificationTarget, Notifier, NotifierError, TelegramNotifier};
pub use provider::{
    GlobalMarketProvider, MarketDataProvider, ProviderError, DEFAULT_MARKET_API_URL,
};
pub use retry::{Backoff, RetryConfig};
