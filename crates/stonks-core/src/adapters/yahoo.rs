use std::sync::{Arc, Mutex, PoisonError};

use serde::Deserialize;

use crate::adapters::Transport;
use crate::data_source::{HistoryFuture, HistoryRequest, HistorySource, SourceError};
use crate::http_client::{HttpClient, HttpRequest, HttpResponse};
use crate::{canonicalize, PriceRow, ProviderId, ServiceConfig, Symbol};

const COOKIE_URL: &str = "https://fc.yahoo.com";
const CRUMB_URLS: [&str; 2] = [
    "https://query1.finance.yahoo.com/v1/test/getcrumb",
    "https://query2.finance.yahoo.com/v1/test/getcrumb",
];
const SESSION_CHART_BASE: &str = "https://query2.finance.yahoo.com/v8/finance/chart";
const CHART_BASE: &str = "https://query1.finance.yahoo.com/v8/finance/chart";
const REFERER: &str = "https://finance.yahoo.com/";

// ============================================================================
// Session auth
// ============================================================================

/// Yahoo cookie/crumb session.
///
/// The session cookie lands in the HTTP client's cookie jar when
/// `fc.yahoo.com` is visited; the crumb is cached here and appended to chart
/// URLs until a 401/429 invalidates it.
#[derive(Debug, Default)]
pub struct YahooAuthManager {
    crumb: Mutex<Option<String>>,
}

impl YahooAuthManager {
    pub fn cached_crumb(&self) -> Option<String> {
        self.crumb
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn invalidate(&self) {
        *self.crumb.lock().unwrap_or_else(PoisonError::into_inner) = None;
    }

    async fn crumb(&self, transport: &Transport) -> Result<String, SourceError> {
        if let Some(crumb) = self.cached_crumb() {
            return Ok(crumb);
        }

        let crumb = Self::handshake(transport).await?;
        *self.crumb.lock().unwrap_or_else(PoisonError::into_inner) = Some(crumb.clone());
        Ok(crumb)
    }

    async fn handshake(transport: &Transport) -> Result<String, SourceError> {
        // fc.yahoo.com answers 404 but still sets the session cookie
        transport
            .send(HttpRequest::get(COOKIE_URL).with_header("referer", REFERER))
            .await
            .map_err(|error| {
                SourceError::upstream(format!(
                    "failed to open yahoo session: {}",
                    error.message()
                ))
            })?;

        for endpoint in CRUMB_URLS {
            let request = HttpRequest::get(endpoint).with_header("referer", REFERER);
            let Ok(response) = transport.send(request).await else {
                continue;
            };
            if !response.is_success() {
                continue;
            }

            let body = response.body.trim();
            if body.to_ascii_lowercase().contains("too many requests") {
                return Err(SourceError::rate_limited(
                    "yahoo rate limited the crumb request",
                ));
            }
            if is_plausible_crumb(body) {
                return Ok(body.to_owned());
            }
        }

        Err(SourceError::upstream(
            "failed to obtain a yahoo crumb from any endpoint",
        ))
    }
}

fn is_plausible_crumb(body: &str) -> bool {
    !body.is_empty()
        && body.len() < 100
        && !body.contains(char::is_whitespace)
        && !body.contains('<')
}

// ============================================================================
// Session adapter
// ============================================================================

/// Yahoo adapter that authenticates like the Yahoo web client.
///
/// Tried first on the default path; on any failure the router moves on to
/// [`YahooChartAdapter`] with the same window.
#[derive(Clone)]
pub struct YahooAdapter {
    transport: Transport,
    auth: Arc<YahooAuthManager>,
}

impl YahooAdapter {
    pub fn new(http_client: Arc<dyn HttpClient>, config: &ServiceConfig) -> Self {
        Self {
            transport: Transport::new(http_client, config),
            auth: Arc::new(YahooAuthManager::default()),
        }
    }

    pub fn auth(&self) -> &YahooAuthManager {
        &self.auth
    }

    async fn fetch(&self, req: &HistoryRequest) -> Result<Vec<PriceRow>, SourceError> {
        let crumb = self.auth.crumb(&self.transport).await?;
        let mut response = self.chart_request(req, &crumb).await?;

        if response.status == 401 || response.status == 429 {
            tracing::debug!(status = response.status, "yahoo session rejected; re-authenticating");
            self.auth.invalidate();
            let crumb = self.auth.crumb(&self.transport).await?;
            response = self.chart_request(req, &crumb).await?;
        }

        if !response.is_success() {
            return Err(SourceError::status(self.id(), response.status));
        }

        rows_from_chart(self.id(), &req.symbol, &response.body)
    }

    async fn chart_request(
        &self,
        req: &HistoryRequest,
        crumb: &str,
    ) -> Result<HttpResponse, SourceError> {
        let url = format!(
            "{}&crumb={}",
            chart_url(SESSION_CHART_BASE, &req.symbol, req.window.as_str()),
            urlencoding::encode(crumb)
        );
        let request = HttpRequest::get(url).with_header("referer", REFERER);

        self.transport
            .send(request)
            .await
            .map_err(|error| SourceError::transport(self.id(), &error))
    }
}

impl HistorySource for YahooAdapter {
    fn id(&self) -> ProviderId {
        ProviderId::Yahoo
    }

    fn daily_history<'a>(&'a self, req: HistoryRequest) -> HistoryFuture<'a> {
        Box::pin(async move { self.fetch(&req).await })
    }
}

// ============================================================================
// Raw chart adapter
// ============================================================================

/// Anonymous request to Yahoo's public chart endpoint.
#[derive(Clone)]
pub struct YahooChartAdapter {
    transport: Transport,
    user_agent: String,
}

impl YahooChartAdapter {
    pub fn new(http_client: Arc<dyn HttpClient>, config: &ServiceConfig) -> Self {
        Self {
            transport: Transport::new(http_client, config),
            user_agent: config.user_agent.clone(),
        }
    }

    /// Raw chart payload for `range`; also used by the current-price lookup.
    pub(crate) async fn chart(&self, symbol: &Symbol, range: &str) -> Result<String, SourceError> {
        let request = HttpRequest::get(chart_url(CHART_BASE, symbol, range))
            .with_header("user-agent", self.user_agent.as_str());
        self.transport.get_ok(self.id(), request).await
    }
}

impl HistorySource for YahooChartAdapter {
    fn id(&self) -> ProviderId {
        ProviderId::YahooChart
    }

    fn daily_history<'a>(&'a self, req: HistoryRequest) -> HistoryFuture<'a> {
        Box::pin(async move {
            let body = self.chart(&req.symbol, req.window.as_str()).await?;
            rows_from_chart(self.id(), &req.symbol, &body)
        })
    }
}

// ============================================================================
// Chart payload
// ============================================================================

fn chart_url(base: &str, symbol: &Symbol, range: &str) -> String {
    format!(
        "{base}/{}?interval=1d&range={range}",
        urlencoding::encode(symbol.as_str())
    )
}

/// Decode a chart payload into its first result, surfacing `chart.error`.
pub(crate) fn parse_chart(provider: ProviderId, body: &str) -> Result<ChartResult, SourceError> {
    let envelope: ChartEnvelope = serde_json::from_str(body)
        .map_err(|e| SourceError::parse(format!("failed to parse {provider} chart: {e}")))?;

    if let Some(error) = envelope.chart.error {
        return Err(SourceError::upstream(format!(
            "{provider} chart error: {}",
            error.describe()
        )));
    }

    envelope
        .chart
        .result
        .and_then(|results| results.into_iter().next())
        .ok_or_else(|| SourceError::upstream(format!("{provider} chart has no result")))
}

fn rows_from_chart(
    provider: ProviderId,
    symbol: &Symbol,
    body: &str,
) -> Result<Vec<PriceRow>, SourceError> {
    let rows = parse_chart(provider, body)?.rows();
    if rows.is_empty() {
        return Err(SourceError::empty_series(provider, symbol));
    }
    tracing::debug!(%provider, %symbol, rows = rows.len(), "decoded chart");
    Ok(rows)
}

#[derive(Debug, Deserialize)]
struct ChartEnvelope {
    chart: ChartBody,
}

#[derive(Debug, Deserialize)]
struct ChartBody {
    #[serde(default)]
    result: Option<Vec<ChartResult>>,
    #[serde(default)]
    error: Option<ChartError>,
}

#[derive(Debug, Deserialize)]
struct ChartError {
    code: Option<String>,
    description: Option<String>,
}

impl ChartError {
    fn describe(&self) -> String {
        match (&self.code, &self.description) {
            (Some(code), Some(description)) => format!("{code}: {description}"),
            (Some(text), None) | (None, Some(text)) => text.clone(),
            (None, None) => String::from("unspecified"),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct ChartResult {
    #[serde(default)]
    pub(crate) meta: ChartMeta,
    #[serde(default)]
    timestamp: Vec<i64>,
    #[serde(default)]
    indicators: ChartIndicators,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct ChartMeta {
    #[serde(rename = "regularMarketPrice")]
    pub(crate) regular_market_price: Option<f64>,
    /// Exchange offset from UTC in seconds.
    #[serde(default)]
    gmtoffset: i64,
}

#[derive(Debug, Default, Deserialize)]
struct ChartIndicators {
    #[serde(default)]
    quote: Vec<ChartQuote>,
}

#[derive(Debug, Default, Deserialize)]
struct ChartQuote {
    #[serde(default)]
    open: Vec<Option<f64>>,
    #[serde(default)]
    high: Vec<Option<f64>>,
    #[serde(default)]
    low: Vec<Option<f64>>,
    #[serde(default)]
    close: Vec<Option<f64>>,
    #[serde(default)]
    volume: Vec<Option<f64>>,
}

impl ChartResult {
    /// Canonical rows dated in exchange-local time.
    pub(crate) fn rows(&self) -> Vec<PriceRow> {
        let Some(quote) = self.indicators.quote.first() else {
            return Vec::new();
        };
        let at = |column: &[Option<f64>], index: usize| column.get(index).copied().flatten();

        let rows = self
            .timestamp
            .iter()
            .enumerate()
            .filter_map(|(index, ts)| {
                let date = super::utc_date(ts.saturating_add(self.meta.gmtoffset))?;
                PriceRow::from_partial(
                    date,
                    at(&quote.open, index),
                    at(&quote.high, index),
                    at(&quote.low, index),
                    at(&quote.close, index),
                    at(&quote.volume, index),
                )
            })
            .collect();

        canonicalize(rows)
    }

    /// Last non-null close in the payload.
    pub(crate) fn last_close(&self) -> Option<f64> {
        self.indicators
            .quote
            .first()?
            .close
            .iter()
            .rev()
            .flatten()
            .copied()
            .find(|close| close.is_finite())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::test_support::StubHttpClient;
    use crate::data_source::SourceErrorKind;
    use crate::retry::RetryConfig;
    use crate::Period;
    use time::macros::date;

    const CHART_JSON: &str = r#"{
        "chart": {
            "result": [{
                "meta": {"regularMarketPrice": 187.5, "gmtoffset": -18000},
                "timestamp": [1704157200, 1704205800, 1704292200, 1704292260],
                "indicators": {"quote": [{
                    "open":   [100.0, 101.0, null, 103.5],
                    "high":   [101.0, null,  104.0, 104.5],
                    "low":    [99.0,  null,  102.0, 102.5],
                    "close":  [100.5, 102.0, 103.0, 104.0],
                    "volume": [1000,  2000,  3000, 4000]
                }]}
            }],
            "error": null
        }
    }"#;

    fn config() -> ServiceConfig {
        ServiceConfig::default().with_retry(RetryConfig::no_retry())
    }

    fn request() -> HistoryRequest {
        HistoryRequest::new(Symbol::parse("AAPL").expect("symbol"), Period::SixMonths, None)
    }

    #[test]
    fn chart_rows_use_exchange_local_dates_and_collapse_duplicates() {
        let result = parse_chart(ProviderId::YahooChart, CHART_JSON).expect("parse");
        let rows = result.rows();

        // 01:00 UTC on Jan 2 is still Jan 1 in New York
        assert_eq!(rows[0].date, date!(2024 - 01 - 01));
        assert_eq!(rows[1].date, date!(2024 - 01 - 02));
        assert_eq!(rows[1].high, 102.0);
        assert_eq!(rows[1].low, 101.0);
        // null open on the first Jan 3 bar drops it; the second bar survives
        assert_eq!(rows.len(), 3);
        assert_eq!(rows[2].date, date!(2024 - 01 - 03));
        assert_eq!(rows[2].close, 104.0);
        assert_eq!(result.last_close(), Some(104.0));
        assert_eq!(result.meta.regular_market_price, Some(187.5));
    }

    #[test]
    fn chart_error_object_is_upstream_failure() {
        let body = r#"{"chart":{"result":null,"error":{"code":"Not Found","description":"No data found, symbol may be delisted"}}}"#;
        let error = parse_chart(ProviderId::YahooChart, body).expect_err("must fail");
        assert_eq!(error.kind(), SourceErrorKind::Upstream);
        assert!(error.message().contains("delisted"));
    }

    #[test]
    fn malformed_chart_is_parse_failure() {
        let error = parse_chart(ProviderId::Yahoo, "<html>").expect_err("must fail");
        assert_eq!(error.kind(), SourceErrorKind::Parse);
    }

    #[tokio::test]
    async fn chart_adapter_requests_window_with_browser_agent() {
        let client = Arc::new(StubHttpClient::new().json("/v8/finance/chart/AAPL", CHART_JSON));
        let adapter = YahooChartAdapter::new(client.clone(), &config());

        let rows = adapter.daily_history(request()).await.expect("rows");
        assert_eq!(rows.len(), 3);

        let sent = client.requests();
        assert_eq!(
            sent[0].url,
            "https://query1.finance.yahoo.com/v8/finance/chart/AAPL?interval=1d&range=6mo"
        );
        assert!(sent[0]
            .headers
            .get("user-agent")
            .is_some_and(|agent| agent.starts_with("Mozilla/5.0")));
    }

    #[tokio::test]
    async fn chart_adapter_maps_empty_series() {
        let body = r#"{"chart":{"result":[{"meta":{},"indicators":{"quote":[{}]}}],"error":null}}"#;
        let client = Arc::new(StubHttpClient::new().json("/v8/finance/chart/", body));
        let adapter = YahooChartAdapter::new(client, &config());

        let error = adapter.daily_history(request()).await.expect_err("empty");
        assert_eq!(error.kind(), SourceErrorKind::Upstream);
    }

    #[tokio::test]
    async fn session_adapter_sends_crumb_and_reauthenticates_once() {
        let client = Arc::new(
            StubHttpClient::new()
                .status("fc.yahoo.com", 404)
                .json("getcrumb", "crumb-1")
                .json("getcrumb", "crumb-2")
                .status("query2.finance.yahoo.com/v8", 401)
                .json("query2.finance.yahoo.com/v8", CHART_JSON),
        );
        let adapter = YahooAdapter::new(client.clone(), &config());

        let rows = adapter.daily_history(request()).await.expect("rows after re-auth");
        assert_eq!(rows.len(), 3);
        assert_eq!(client.count("fc.yahoo.com"), 2);

        let charts = client
            .requests()
            .into_iter()
            .filter(|request| request.url.contains("/v8/finance/chart/"))
            .map(|request| request.url)
            .collect::<Vec<_>>();
        assert_eq!(charts.len(), 2);
        assert!(charts[0].ends_with("&crumb=crumb-1"));
        assert!(charts[1].ends_with("&crumb=crumb-2"));
        assert_eq!(adapter.auth().cached_crumb().as_deref(), Some("crumb-2"));
    }

    #[tokio::test]
    async fn session_adapter_fails_without_crumb() {
        let client = Arc::new(
            StubHttpClient::new()
                .status("fc.yahoo.com", 404)
                .json("getcrumb", "<html>blocked</html>"),
        );
        let adapter = YahooAdapter::new(client.clone(), &config());

        let error = adapter.daily_history(request()).await.expect_err("no crumb");
        assert_eq!(error.kind(), SourceErrorKind::Upstream);
        assert_eq!(client.count("/v8/finance/chart/"), 0);
    }
}
