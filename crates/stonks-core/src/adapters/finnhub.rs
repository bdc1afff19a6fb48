use std::sync::Arc;

use serde::Deserialize;
use time::OffsetDateTime;

use crate::adapters::{utc_date, Transport};
use crate::data_source::{HistoryFuture, HistoryRequest, HistorySource, SourceError};
use crate::http_client::{HttpAuth, HttpClient, HttpRequest};
use crate::{canonicalize, PriceRow, ProviderId, ServiceConfig, CALENDAR_MAX_DAYS};

const CANDLE_URL: &str = "https://finnhub.io/api/v1/stock/candle";

/// Finnhub daily candle adapter.
#[derive(Clone)]
pub struct FinnhubAdapter {
    transport: Transport,
}

impl FinnhubAdapter {
    pub fn new(http_client: Arc<dyn HttpClient>, config: &ServiceConfig) -> Self {
        Self {
            transport: Transport::new(http_client, config),
        }
    }

    async fn fetch(&self, req: &HistoryRequest) -> Result<Vec<PriceRow>, SourceError> {
        let token = req.require_api_key(self.id())?;

        let to = OffsetDateTime::now_utc().unix_timestamp();
        let from = to - i64::from(req.window.lookback_days(CALENDAR_MAX_DAYS)) * 86_400;
        let url = format!(
            "{CANDLE_URL}?symbol={}&resolution=D&from={from}&to={to}",
            urlencoding::encode(req.symbol.as_str())
        );
        let auth = HttpAuth::Header {
            name: String::from("X-Finnhub-Token"),
            value: token.to_owned(),
        };

        let body = self
            .transport
            .get_ok(self.id(), HttpRequest::get(url).with_auth(&auth))
            .await?;
        let candles: CandleResponse = serde_json::from_str(&body)
            .map_err(|e| SourceError::parse(format!("failed to parse finnhub candles: {e}")))?;

        let rows = candles.into_rows()?;
        if rows.is_empty() {
            return Err(SourceError::empty_series(self.id(), &req.symbol));
        }
        Ok(rows)
    }
}

impl HistorySource for FinnhubAdapter {
    fn id(&self) -> ProviderId {
        ProviderId::Finnhub
    }

    fn daily_history<'a>(&'a self, req: HistoryRequest) -> HistoryFuture<'a> {
        Box::pin(async move { self.fetch(&req).await })
    }
}

/// Parallel arrays keyed by single letters.
#[derive(Debug, Deserialize)]
struct CandleResponse {
    #[serde(default)]
    s: Option<String>,
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    t: Vec<i64>,
    #[serde(default)]
    o: Vec<Option<f64>>,
    #[serde(default)]
    h: Vec<Option<f64>>,
    #[serde(default)]
    l: Vec<Option<f64>>,
    #[serde(default)]
    c: Vec<Option<f64>>,
    #[serde(default)]
    v: Vec<Option<f64>>,
}

impl CandleResponse {
    fn into_rows(self) -> Result<Vec<PriceRow>, SourceError> {
        if let Some(error) = self.error {
            return Err(SourceError::upstream(format!("finnhub error: {error}")));
        }
        match self.s.as_deref() {
            Some("ok") => {}
            Some("no_data") => return Err(SourceError::upstream("finnhub returned no_data")),
            other => {
                return Err(SourceError::upstream(format!(
                    "finnhub returned status {}",
                    other.unwrap_or("<missing>")
                )))
            }
        }

        let len = self.t.len();
        let lengths = [self.o.len(), self.h.len(), self.l.len(), self.c.len()];
        if lengths.iter().any(|column| *column != len) || (!self.v.is_empty() && self.v.len() != len) {
            return Err(SourceError::parse(format!(
                "finnhub candle arrays disagree: t={len}, o/h/l/c={lengths:?}, v={}",
                self.v.len()
            )));
        }

        let rows = self
            .t
            .iter()
            .enumerate()
            .filter_map(|(i, ts)| {
                PriceRow::from_partial(
                    utc_date(*ts)?,
                    self.o[i],
                    self.h[i],
                    self.l[i],
                    self.c[i],
                    self.v.get(i).copied().flatten(),
                )
            })
            .collect();

        Ok(canonicalize(rows))
    }
}
