//! Fallback orchestration across history providers.
//!
//! ```text
//!   mock ─────────────────────────────────────────────┐
//!   alpha_vantage | finnhub | polygon ── paid ──fail──┤
//!   yahoo (default) ── yahoo ──fail── yahoo_chart ─fail┤
//!                                                     ▼
//!                                          synthetic (terminal)
//! ```
//!
//! [`HistoryRouter::fetch`] is total: every failure, timeout included, moves
//! the call to the next state and the terminal synthetic state always
//! succeeds. [`FetchMeta::synthetic`] tells callers which state served them.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use tokio::runtime::{Handle, RuntimeFlavor};
use uuid::Uuid;

use crate::adapters::{
    today_utc, AlphaVantageAdapter, FinnhubAdapter, PolygonAdapter, SyntheticGenerator,
    YahooAdapter, YahooChartAdapter,
};
use crate::data_source::{HistoryRequest, HistorySource, SourceError};
use crate::http_client::{HttpClient, OfflineHttpClient, ReqwestHttpClient};
use crate::indicators::{compute, try_compute, IndicatorError};
use crate::observer::{FetchEvent, FetchObserver, TracingObserver};
use crate::{
    canonicalize, filter_by_period, plan_window, IndicatorRow, Period, ProviderId, ProviderSelector,
    ServiceConfig, Symbol, ValidationError, WindowPlan,
};

/// One failed state of the chain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttemptError {
    /// `None` when the request failed before any provider was tried.
    pub provider: Option<ProviderId>,
    pub code: String,
    pub message: String,
    /// Whether the same call may succeed if repeated later.
    #[serde(default)]
    pub retryable: bool,
}

impl AttemptError {
    fn source(provider: ProviderId, error: &SourceError) -> Self {
        Self {
            provider: Some(provider),
            code: error.code().to_owned(),
            message: error.message().to_owned(),
            retryable: error.retryable(),
        }
    }

    fn indicator(provider: ProviderId, error: &IndicatorError) -> Self {
        Self {
            provider: Some(provider),
            code: String::from("indicator.precondition"),
            message: error.to_string(),
            retryable: false,
        }
    }

    fn validation(error: &ValidationError) -> Self {
        Self {
            provider: None,
            code: String::from("validation.symbol"),
            message: error.to_string(),
            retryable: false,
        }
    }

    fn unregistered(provider: ProviderId) -> Self {
        Self {
            provider: Some(provider),
            code: String::from("source.unregistered"),
            message: format!("no adapter registered for {provider}"),
            retryable: false,
        }
    }
}

/// Diagnostics attached to every fetch result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FetchMeta {
    pub request_id: Uuid,
    pub symbol: String,
    pub period: Period,
    pub provider: ProviderSelector,
    pub served_by: ProviderId,
    /// True when the terminal synthetic state produced the rows.
    pub synthetic: bool,
    pub source_chain: Vec<ProviderId>,
    pub errors: Vec<AttemptError>,
    pub warnings: Vec<String>,
    pub latency_ms: u64,
}

/// Indicator rows plus the diagnostics of the call that produced them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FetchOutcome {
    pub meta: FetchMeta,
    pub rows: Vec<IndicatorRow>,
}

/// Ordered providers tried for a selector before the synthetic state.
pub fn provider_chain(selector: ProviderSelector) -> Vec<ProviderId> {
    match selector {
        ProviderSelector::Mock => Vec::new(),
        ProviderSelector::Yahoo => vec![ProviderId::Yahoo, ProviderId::YahooChart],
        paid => paid.paid_provider().into_iter().collect(),
    }
}

/// Adapter registry and fallback engine.
pub struct HistoryRouter {
    sources: HashMap<ProviderId, Arc<dyn HistorySource>>,
    synthetic: SyntheticGenerator,
    observer: Arc<dyn FetchObserver>,
    attempt_timeout: Duration,
}

impl Default for HistoryRouter {
    fn default() -> Self {
        HistoryRouterBuilder::new().build()
    }
}

impl HistoryRouter {
    pub fn builder() -> HistoryRouterBuilder {
        HistoryRouterBuilder::new()
    }

    /// Fetch from string tokens, parsing both leniently: unknown periods mean
    /// `2y` and unknown providers take the default Yahoo path.
    pub async fn fetch_tokens(
        &self,
        ticker: &str,
        period: &str,
        provider: &str,
        api_key: Option<&str>,
    ) -> FetchOutcome {
        self.fetch(
            ticker,
            Period::parse_lenient(period),
            ProviderSelector::parse_lenient(provider),
            api_key,
        )
        .await
    }

    /// Daily history with indicators; never fails and never returns empty rows.
    pub async fn fetch(
        &self,
        ticker: &str,
        period: Period,
        provider: ProviderSelector,
        api_key: Option<&str>,
    ) -> FetchOutcome {
        let mut call = Call::new(ticker, period, provider);

        let symbol = match Symbol::parse(ticker) {
            Ok(symbol) => Some(symbol),
            Err(error) => {
                call.errors.push(AttemptError::validation(&error));
                None
            }
        };

        if let Some(symbol) = symbol {
            for provider_id in provider_chain(provider) {
                if let Some(rows) = self.attempt(&mut call, provider_id, &symbol, api_key).await {
                    return call.finish(provider_id, rows);
                }
            }
        }

        self.synthetic_outcome(call)
    }

    /// Rows of [`fetch`](Self::fetch) without diagnostics.
    pub async fn fetch_rows(
        &self,
        ticker: &str,
        period: Period,
        provider: ProviderSelector,
        api_key: Option<&str>,
    ) -> Vec<IndicatorRow> {
        self.fetch(ticker, period, provider, api_key).await.rows
    }

    /// Run [`fetch`](Self::fetch) from synchronous code.
    ///
    /// Outside a runtime this drives a private current-thread runtime. Inside a
    /// multi-thread runtime the worker is handed over with `block_in_place`.
    /// A current-thread runtime cannot be blocked, so the synthetic state
    /// serves the call with a warning, as it does when no runtime can start.
    pub fn fetch_blocking(
        &self,
        ticker: &str,
        period: Period,
        provider: ProviderSelector,
        api_key: Option<&str>,
    ) -> FetchOutcome {
        if let Ok(handle) = Handle::try_current() {
            if handle.runtime_flavor() == RuntimeFlavor::MultiThread {
                return tokio::task::block_in_place(|| {
                    handle.block_on(self.fetch(ticker, period, provider, api_key))
                });
            }
            let mut call = Call::new(ticker, period, provider);
            call.warnings.push(String::from(
                "blocking fetch called on a current-thread runtime",
            ));
            return self.synthetic_outcome(call);
        }

        match tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
        {
            Ok(runtime) => runtime.block_on(self.fetch(ticker, period, provider, api_key)),
            Err(error) => {
                let mut call = Call::new(ticker, period, provider);
                call.warnings
                    .push(format!("could not start async runtime: {error}"));
                self.synthetic_outcome(call)
            }
        }
    }

    async fn attempt(
        &self,
        call: &mut Call,
        provider: ProviderId,
        symbol: &Symbol,
        api_key: Option<&str>,
    ) -> Option<Vec<IndicatorRow>> {
        let Some(source) = self.sources.get(&provider) else {
            call.fail(self.observer.as_ref(), AttemptError::unregistered(provider), 0);
            return None;
        };

        let plan = plan_window(call.period, provider);
        call.source_chain.push(provider);
        self.observer.on_event(&FetchEvent::AttemptStarted {
            request_id: call.request_id,
            provider,
            window: plan.fetch,
        });

        let started = Instant::now();
        let request = HistoryRequest::new(symbol.clone(), plan.fetch, api_key.map(str::to_owned));
        let fetched = match tokio::time::timeout(self.attempt_timeout, source.daily_history(request)).await {
            Ok(result) => result,
            Err(_) => Err(SourceError::timeout(format!(
                "{provider} exceeded the {}ms attempt timeout",
                self.attempt_timeout.as_millis()
            ))),
        };

        match fetched
            .map_err(|error| AttemptError::source(provider, &error))
            .and_then(|rows| finish_rows(provider, symbol, rows, plan))
        {
            Ok(rows) => {
                self.observer.on_event(&FetchEvent::AttemptSucceeded {
                    request_id: call.request_id,
                    provider,
                    rows: rows.len(),
                    elapsed_ms: elapsed_ms(started),
                });
                Some(rows)
            }
            Err(error) => {
                call.fail(self.observer.as_ref(), error, elapsed_ms(started));
                None
            }
        }
    }

    fn synthetic_outcome(&self, mut call: Call) -> FetchOutcome {
        let attempts_failed = call.errors.len();
        self.observer.on_event(&FetchEvent::SyntheticFallback {
            request_id: call.request_id,
            window: call.period,
            attempts_failed,
        });
        if attempts_failed > 0 {
            call.warnings.push(format!(
                "served synthetic data after {attempts_failed} failed attempt(s)"
            ));
        }

        call.source_chain.push(ProviderId::Synthetic);
        let rows = compute(&self.synthetic.generate(call.period));
        call.finish(ProviderId::Synthetic, rows)
    }
}

/// Canonicalize and post-filter provider rows, then run the indicator engine.
///
/// The strict engine entry point only rejects non-finite closes here.
fn finish_rows(
    provider: ProviderId,
    symbol: &Symbol,
    rows: Vec<crate::PriceRow>,
    plan: WindowPlan,
) -> Result<Vec<IndicatorRow>, AttemptError> {
    let rows = canonicalize(rows);
    let rows = match plan.post_filter {
        Some(period) => filter_by_period(rows, period, today_utc()),
        None => rows,
    };
    if rows.is_empty() {
        return Err(AttemptError::source(
            provider,
            &SourceError::empty_series(provider, symbol),
        ));
    }

    try_compute(&rows).map_err(|error| AttemptError::indicator(provider, &error))
}

fn elapsed_ms(started: Instant) -> u64 {
    u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX)
}

/// Mutable state of one fetch call.
struct Call {
    request_id: Uuid,
    started: Instant,
    symbol: String,
    period: Period,
    provider: ProviderSelector,
    source_chain: Vec<ProviderId>,
    errors: Vec<AttemptError>,
    warnings: Vec<String>,
}

impl Call {
    fn new(ticker: &str, period: Period, provider: ProviderSelector) -> Self {
        Self {
            request_id: Uuid::new_v4(),
            started: Instant::now(),
            symbol: ticker.trim().to_ascii_uppercase(),
            period,
            provider,
            source_chain: Vec::new(),
            errors: Vec::new(),
            warnings: Vec::new(),
        }
    }

    fn fail(&mut self, observer: &dyn FetchObserver, error: AttemptError, elapsed_ms: u64) {
        observer.on_event(&FetchEvent::AttemptFailed {
            request_id: self.request_id,
            error: &error,
            elapsed_ms,
        });
        self.errors.push(error);
    }

    fn finish(self, served_by: ProviderId, rows: Vec<IndicatorRow>) -> FetchOutcome {
        FetchOutcome {
            meta: FetchMeta {
                request_id: self.request_id,
                symbol: self.symbol,
                period: self.period,
                provider: self.provider,
                served_by,
                synthetic: served_by == ProviderId::Synthetic,
                source_chain: self.source_chain,
                errors: self.errors,
                warnings: self.warnings,
                latency_ms: elapsed_ms(self.started),
            },
            rows,
        }
    }
}

/// Builder wiring adapters to one HTTP client and configuration.
///
/// # Example
///
/// ```rust,ignore
/// use stonks_core::{HistoryRouter, Period, ProviderSelector};
///
/// let router = HistoryRouter::builder().with_synthetic_seed(7).build();
/// let outcome = router.fetch("AAPL", Period::OneYear, ProviderSelector::Yahoo, None).await;
/// ```
#[derive(Default)]
pub struct HistoryRouterBuilder {
    config: ServiceConfig,
    http_client: Option<Arc<dyn HttpClient>>,
    observer: Option<Arc<dyn FetchObserver>>,
    synthetic_seed: Option<u64>,
    sources: Vec<Arc<dyn HistorySource>>,
}

impl HistoryRouterBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(mut self, config: ServiceConfig) -> Self {
        self.config = config;
        self
    }

    pub fn with_http_client(mut self, http_client: Arc<dyn HttpClient>) -> Self {
        self.http_client = Some(http_client);
        self
    }

    /// Refuse all network access; every call ends in the synthetic state.
    pub fn offline(self) -> Self {
        self.with_http_client(Arc::new(OfflineHttpClient))
    }

    pub fn with_observer(mut self, observer: Arc<dyn FetchObserver>) -> Self {
        self.observer = Some(observer);
        self
    }

    pub fn with_synthetic_seed(mut self, seed: u64) -> Self {
        self.synthetic_seed = Some(seed);
        self
    }

    /// Replace the built-in adapter with the same [`HistorySource::id`].
    ///
    /// A source registered as [`ProviderId::Synthetic`] is never consulted:
    /// the terminal state always uses the built-in generator.
    pub fn with_source(mut self, source: Arc<dyn HistorySource>) -> Self {
        self.sources.push(source);
        self
    }

    pub fn build(self) -> HistoryRouter {
        let config = self.config;
        let http_client = self
            .http_client
            .unwrap_or_else(|| Arc::new(ReqwestHttpClient::new(&config.user_agent)));

        let defaults: [Arc<dyn HistorySource>; 5] = [
            Arc::new(YahooAdapter::new(http_client.clone(), &config)),
            Arc::new(YahooChartAdapter::new(http_client.clone(), &config)),
            Arc::new(AlphaVantageAdapter::new(http_client.clone(), &config)),
            Arc::new(FinnhubAdapter::new(http_client.clone(), &config)),
            Arc::new(PolygonAdapter::new(http_client, &config)),
        ];

        let mut sources = HashMap::new();
        for source in defaults.into_iter().chain(self.sources) {
            sources.insert(source.id(), source);
        }

        HistoryRouter {
            sources,
            synthetic: self
                .synthetic_seed
                .map_or_else(SyntheticGenerator::new, SyntheticGenerator::seeded),
            observer: self
                .observer
                .unwrap_or_else(|| Arc::new(TracingObserver)),
            attempt_timeout: config.attempt_timeout,
        }
    }
}
