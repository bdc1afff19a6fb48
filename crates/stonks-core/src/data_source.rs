//! Adapter contract shared by every history provider.
//!
//! Each adapter turns `(ticker, window, key?)` into canonical [`PriceRow`]s
//! or a [`SourceError`]. The router treats every error kind uniformly as
//! "adapter failed"; the kind only feeds diagnostics.
//!
//! ```rust,ignore
//! use stonks_core::{HistoryRequest, HistorySource, Period, Symbol, YahooChartAdapter};
//!
//! async fn last_close(adapter: &YahooChartAdapter) -> Option<f64> {
//!     let request = HistoryRequest::new(Symbol::parse("AAPL").ok()?, Period::SixMonths, None);
//!     let rows = adapter.daily_history(request).await.ok()?;
//!     rows.last().map(|row| row.close)
//! }
//! ```

use std::fmt::{Display, Formatter};
use std::future::Future;
use std::pin::Pin;

use crate::http_client::HttpError;
use crate::{Period, PriceRow, ProviderId, Symbol};

/// Adapter-level error classification.
///
/// `Configuration`, `Upstream` and `Parse` are the three failure families;
/// `RateLimited` and `Timeout` are upstream failures worth telling apart in
/// diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceErrorKind {
    Configuration,
    Upstream,
    RateLimited,
    Parse,
    Timeout,
}

/// Structured source error used by router fallback.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceError {
    kind: SourceErrorKind,
    message: String,
    retryable: bool,
}

impl SourceError {
    pub fn configuration(message: impl Into<String>) -> Self {
        Self {
            kind: SourceErrorKind::Configuration,
            message: message.into(),
            retryable: false,
        }
    }

    pub fn missing_api_key(provider: ProviderId) -> Self {
        Self::configuration(format!("{provider} requires an API key"))
    }

    pub fn upstream(message: impl Into<String>) -> Self {
        Self {
            kind: SourceErrorKind::Upstream,
            message: message.into(),
            retryable: true,
        }
    }

    pub fn rate_limited(message: impl Into<String>) -> Self {
        Self {
            kind: SourceErrorKind::RateLimited,
            message: message.into(),
            retryable: true,
        }
    }

    pub fn parse(message: impl Into<String>) -> Self {
        Self {
            kind: SourceErrorKind::Parse,
            message: message.into(),
            retryable: false,
        }
    }

    pub fn timeout(message: impl Into<String>) -> Self {
        Self {
            kind: SourceErrorKind::Timeout,
            message: message.into(),
            retryable: true,
        }
    }

    pub fn empty_series(provider: ProviderId, symbol: &Symbol) -> Self {
        Self::upstream(format!("{provider} returned no rows for {symbol}"))
    }

    pub fn transport(provider: ProviderId, error: &HttpError) -> Self {
        Self::upstream(format!("{provider} transport error: {}", error.message()))
    }

    pub fn status(provider: ProviderId, status: u16) -> Self {
        Self::status_of(provider.as_str(), status)
    }

    /// Non-success status from a named upstream; 429 is rate limiting.
    pub fn status_of(upstream: &str, status: u16) -> Self {
        if status == 429 {
            Self::rate_limited(format!("{upstream} returned status 429"))
        } else {
            Self::upstream(format!("{upstream} returned status {status}"))
        }
    }

    pub const fn kind(&self) -> SourceErrorKind {
        self.kind
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub const fn retryable(&self) -> bool {
        self.retryable
    }

    pub const fn code(&self) -> &'static str {
        match self.kind {
            SourceErrorKind::Configuration => "source.configuration",
            SourceErrorKind::Upstream => "source.upstream",
            SourceErrorKind::RateLimited => "source.rate_limited",
            SourceErrorKind::Parse => "source.parse",
            SourceErrorKind::Timeout => "source.timeout",
        }
    }
}

impl Display for SourceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({})", self.message, self.code())
    }
}

impl std::error::Error for SourceError {}

/// Request payload for daily history.
#[derive(Clone, PartialEq, Eq)]
pub struct HistoryRequest {
    pub symbol: Symbol,
    /// Window already normalized by [`plan_window`](crate::plan_window).
    pub window: Period,
    pub api_key: Option<String>,
}

impl HistoryRequest {
    pub fn new(symbol: Symbol, window: Period, api_key: Option<String>) -> Self {
        Self {
            symbol,
            window,
            api_key,
        }
    }

    /// Non-blank API key, or a configuration error naming the provider.
    pub fn require_api_key(&self, provider: ProviderId) -> Result<&str, SourceError> {
        self.api_key
            .as_deref()
            .map(str::trim)
            .filter(|key| !key.is_empty())
            .ok_or_else(|| SourceError::missing_api_key(provider))
    }
}

impl std::fmt::Debug for HistoryRequest {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HistoryRequest")
            .field("symbol", &self.symbol)
            .field("window", &self.window)
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

pub type HistoryFuture<'a> =
    Pin<Box<dyn Future<Output = Result<Vec<PriceRow>, SourceError>> + Send + 'a>>;

/// Daily history adapter contract.
///
/// Implementations return rows sorted ascending by date with unique dates
/// (see [`canonicalize`](crate::canonicalize)) and fail with a
/// [`SourceError`] on a missing key, a non-success status, a provider-level
/// error payload or an empty series.
pub trait HistorySource: Send + Sync {
    /// Returns the unique provider identifier.
    fn id(&self) -> ProviderId;

    /// Fetches daily OHLCV rows for the requested window.
    fn daily_history<'a>(&'a self, req: HistoryRequest) -> HistoryFuture<'a>;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(api_key: Option<&str>) -> HistoryRequest {
        HistoryRequest::new(
            Symbol::parse("AAPL").expect("valid symbol"),
            Period::OneYear,
            api_key.map(str::to_owned),
        )
    }

    #[test]
    fn blank_api_key_counts_as_missing() {
        let error = request(Some("   "))
            .require_api_key(ProviderId::Polygon)
            .expect_err("blank key must fail");
        assert_eq!(error.kind(), SourceErrorKind::Configuration);
        assert!(error.message().contains("polygon"));
    }

    #[test]
    fn debug_output_redacts_api_key() {
        let rendered = format!("{:?}", request(Some("super-secret")));
        assert!(!rendered.contains("super-secret"));
        assert!(rendered.contains("<redacted>"));
    }

    #[test]
    fn status_429_is_rate_limited() {
        assert_eq!(
            SourceError::status(ProviderId::Finnhub, 429).kind(),
            SourceErrorKind::RateLimited
        );
        assert_eq!(
            SourceError::status(ProviderId::Finnhub, 503).code(),
            "source.upstream"
        );
    }
}
