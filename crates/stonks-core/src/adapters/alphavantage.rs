use std::collections::BTreeMap;
use std::sync::Arc;

use serde::Deserialize;
use time::macros::format_description;
use time::Date;

use crate::adapters::Transport;
use crate::data_source::{HistoryFuture, HistoryRequest, HistorySource, SourceError};
use crate::http_client::{redact_query, HttpClient, HttpRequest};
use crate::{canonicalize, PriceRow, ProviderId, ServiceConfig};

const QUERY_URL: &str = "https://www.alphavantage.co/query";

/// Alpha Vantage `TIME_SERIES_DAILY` adapter.
///
/// The free tier answers HTTP 200 for throttling and bad symbols alike, so
/// the payload keys decide success.
#[derive(Clone)]
pub struct AlphaVantageAdapter {
    transport: Transport,
}

impl AlphaVantageAdapter {
    pub fn new(http_client: Arc<dyn HttpClient>, config: &ServiceConfig) -> Self {
        Self {
            transport: Transport::new(http_client, config),
        }
    }

    async fn fetch(&self, req: &HistoryRequest) -> Result<Vec<PriceRow>, SourceError> {
        let api_key = req.require_api_key(self.id())?;

        let url = format!(
            "{QUERY_URL}?function=TIME_SERIES_DAILY&symbol={}&outputsize={}&apikey={}",
            urlencoding::encode(req.symbol.as_str()),
            req.window.alpha_vantage_output_size(),
            urlencoding::encode(api_key)
        );
        tracing::debug!(url = redact_query(&url), "requesting alpha vantage daily series");

        let body = self.transport.get_ok(self.id(), HttpRequest::get(url)).await?;
        let payload: DailyResponse = serde_json::from_str(&body)
            .map_err(|e| SourceError::parse(format!("failed to parse alpha_vantage series: {e}")))?;

        if let Some(message) = payload.error_message {
            return Err(SourceError::upstream(format!("alpha_vantage error: {message}")));
        }
        if let Some(message) = payload.note.or(payload.information) {
            return Err(SourceError::rate_limited(format!(
                "alpha_vantage throttled the request: {message}"
            )));
        }

        let series = payload.series.unwrap_or_default();
        let rows = canonicalize(
            series
                .iter()
                .filter_map(|(day, bar)| bar.to_row(day))
                .collect(),
        );

        if rows.is_empty() {
            return Err(SourceError::empty_series(self.id(), &req.symbol));
        }
        Ok(rows)
    }
}

impl HistorySource for AlphaVantageAdapter {
    fn id(&self) -> ProviderId {
        ProviderId::AlphaVantage
    }

    fn daily_history<'a>(&'a self, req: HistoryRequest) -> HistoryFuture<'a> {
        Box::pin(async move { self.fetch(&req).await })
    }
}

#[derive(Debug, Deserialize)]
struct DailyResponse {
    #[serde(rename = "Error Message")]
    error_message: Option<String>,
    #[serde(rename = "Note")]
    note: Option<String>,
    #[serde(rename = "Information")]
    information: Option<String>,
    #[serde(rename = "Time Series (Daily)")]
    series: Option<BTreeMap<String, DailyBar>>,
}

/// Values arrive as decimal strings.
#[derive(Debug, Deserialize)]
struct DailyBar {
    #[serde(rename = "1. open")]
    open: Option<String>,
    #[serde(rename = "2. high")]
    high: Option<String>,
    #[serde(rename = "3. low")]
    low: Option<String>,
    #[serde(rename = "4. close")]
    close: Option<String>,
    #[serde(rename = "5. volume")]
    volume: Option<String>,
}

impl DailyBar {
    fn to_row(&self, day: &str) -> Option<PriceRow> {
        let date = Date::parse(day, format_description!("[year]-[month]-[day]")).ok()?;
        let number = |field: &Option<String>| field.as_deref()?.trim().parse::<f64>().ok();

        PriceRow::from_partial(
            date,
            number(&self.open),
            number(&self.high),
            number(&self.low),
            number(&self.close),
            number(&self.volume),
        )
    }
}
