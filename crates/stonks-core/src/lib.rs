//! # Stonks Core
//!
//! Daily price history with technical indicators, served from a chain of
//! market-data providers that always ends in a synthetic fallback.
//!
//! ## Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`adapters`] | Yahoo (session and chart), Alpha Vantage, Finnhub, Polygon, synthetic |
//! | [`config`] | Timeouts, retries and user agent |
//! | [`data_source`] | Adapter trait, request type and source errors |
//! | [`domain`] | Symbols, periods and row types |
//! | [`error`] | Validation and umbrella errors |
//! | [`http_client`] | HTTP transport abstraction |
//! | [`indicators`] | SMA, EMA, RSI, MACD and Bollinger Bands |
//! | [`news`] | Google News RSS headlines |
//! | [`observer`] | Fetch diagnostics hook |
//! | [`quote`] | Current price lookup |
//! | [`retry`] | Backoff policy for HTTP retries |
//! | [`routing`] | Fallback orchestration |
//! | [`service`] | Facade over history, price and news |
//! | [`source`] | Provider identifiers and selectors |
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use stonks_core::{Period, ProviderSelector, StockDataService};
//!
//! #[tokio::main]
//! async fn main() {
//!     let service = StockDataService::from_env();
//!     let outcome = service
//!         .history("AAPL", Period::OneYear, ProviderSelector::Yahoo, None)
//!         .await;
//!
//!     if outcome.meta.synthetic {
//!         eprintln!("providers unavailable; rows are synthetic");
//!     }
//!     if let Some(last) = outcome.rows.last() {
//!         println!("{} close {:.2} rsi {:?}", last.date(), last.close(), last.rsi);
//!     }
//! }
//! ```
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────┐
//! │ StockDataService │
//! └────────┬─────────┘
//!          │
//!          ▼
//! ┌─────────────────┐     ┌──────────────────┐
//! │  HistoryRouter  │────▶│ Period policy    │
//! └────────┬────────┘     └──────────────────┘
//!          │
//!          ▼
//! ┌─────────────────┐     ┌──────────────────┐
//! │ HistorySource   │────▶│ HTTP Client      │
//! │ (Adapter Trait) │     │ (reqwest/offline)│
//! └────────┬────────┘     └──────────────────┘
//!          │
//!          ▼
//! ┌─────────────────┐
//! │ Indicator engine│
//! └─────────────────┘
//! ```
//!
//! ## Security
//!
//! - API keys are passed per call and redacted from `Debug` output and logs
//! - Tickers are validated before they are placed in a URL

pub mod adapters;
pub mod config;
pub mod data_source;
pub mod domain;
pub mod error;
pub mod http_client;
pub mod indicators;
pub mod news;
pub mod observer;
pub mod quote;
pub mod retry;
pub mod routing;
pub mod service;
pub mod source;

// Adapter implementations
pub use adapters::{
    AlphaVantageAdapter, FinnhubAdapter, PolygonAdapter, SyntheticGenerator, YahooAdapter,
    YahooAuthManager, YahooChartAdapter,
};

// Configuration
pub use config::{ServiceConfig, DEFAULT_USER_AGENT};

// Data source trait and types
pub use data_source::{HistoryFuture, HistoryRequest, HistorySource, SourceError, SourceErrorKind};

// Domain models
pub use domain::{
    canonicalize, filter_by_period, plan_window, widen_for_indicators, IndicatorRow, NewsItem,
    Period, PriceRow, Symbol, WindowPlan, CALENDAR_MAX_DAYS, SYNTHETIC_MAX_DAYS,
};

// Error types
pub use error::{CoreError, ValidationError};

// HTTP client types
pub use http_client::{
    HttpAuth, HttpClient, HttpError, HttpRequest, HttpResponse, OfflineHttpClient,
    ReqwestHttpClient,
};

// Indicator engine
pub use indicators::{compute, try_compute, IndicatorError};

// Auxiliary lookups
pub use news::NewsFeed;
pub use quote::PriceLookup;

// Diagnostics
pub use observer::{FetchEvent, FetchObserver, TracingObserver};

// Retry logic
pub use retry::{Backoff, RetryConfig};

// Routing types
pub use routing::{
    provider_chain, AttemptError, FetchMeta, FetchOutcome, HistoryRouter, HistoryRouterBuilder,
};

pub use service::StockDataService;

// Source identifiers
pub use source::{ProviderId, ProviderSelector};
