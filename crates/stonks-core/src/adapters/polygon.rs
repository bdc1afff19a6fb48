use std::sync::Arc;

use serde::Deserialize;
use time::macros::format_description;
use time::{Date, Duration};

use crate::adapters::{today_utc, utc_date, Transport};
use crate::data_source::{HistoryFuture, HistoryRequest, HistorySource, SourceError};
use crate::http_client::{HttpAuth, HttpClient, HttpRequest};
use crate::{canonicalize, PriceRow, ProviderId, ServiceConfig, CALENDAR_MAX_DAYS};

const AGGS_URL: &str = "https://api.polygon.io/v2/aggs/ticker";

/// Polygon daily aggregates adapter.
#[derive(Clone)]
pub struct PolygonAdapter {
    transport: Transport,
}

impl PolygonAdapter {
    pub fn new(http_client: Arc<dyn HttpClient>, config: &ServiceConfig) -> Self {
        Self {
            transport: Transport::new(http_client, config),
        }
    }

    async fn fetch(&self, req: &HistoryRequest) -> Result<Vec<PriceRow>, SourceError> {
        let api_key = req.require_api_key(self.id())?;

        let to = today_utc();
        let from = to.saturating_sub(Duration::days(i64::from(
            req.window.lookback_days(CALENDAR_MAX_DAYS),
        )));
        let url = format!(
            "{AGGS_URL}/{}/range/1/day/{}/{}?adjusted=true&sort=asc",
            urlencoding::encode(req.symbol.as_str()),
            iso(from)?,
            iso(to)?
        );

        let request =
            HttpRequest::get(url).with_auth(&HttpAuth::BearerToken(api_key.to_owned()));
        let body = self.transport.get_ok(self.id(), request).await?;
        let aggs: AggsResponse = serde_json::from_str(&body)
            .map_err(|e| SourceError::parse(format!("failed to parse polygon aggregates: {e}")))?;

        match aggs.status.as_deref() {
            Some("OK") | Some("DELAYED") => {}
            other => {
                let detail = aggs
                    .error
                    .or(aggs.message)
                    .unwrap_or_else(|| other.unwrap_or("<missing>").to_owned());
                return Err(SourceError::upstream(format!("polygon error: {detail}")));
            }
        }

        let rows = canonicalize(
            aggs.results
                .iter()
                .filter_map(|bar| {
                    PriceRow::from_partial(
                        utc_date(bar.t.div_euclid(1000))?,
                        bar.o,
                        bar.h,
                        bar.l,
                        bar.c,
                        bar.v,
                    )
                })
                .collect(),
        );

        if rows.is_empty() {
            return Err(SourceError::empty_series(self.id(), &req.symbol));
        }
        Ok(rows)
    }
}

impl HistorySource for PolygonAdapter {
    fn id(&self) -> ProviderId {
        ProviderId::Polygon
    }

    fn daily_history<'a>(&'a self, req: HistoryRequest) -> HistoryFuture<'a> {
        Box::pin(async move { self.fetch(&req).await })
    }
}

fn iso(date: Date) -> Result<String, SourceError> {
    date.format(format_description!("[year]-[month]-[day]"))
        .map_err(|e| SourceError::configuration(format!("cannot format polygon range: {e}")))
}

#[derive(Debug, Deserialize)]
struct AggsResponse {
    status: Option<String>,
    error: Option<String>,
    message: Option<String>,
    #[serde(default)]
    results: Vec<AggBar>,
}

/// `t` is the bar start in epoch milliseconds, UTC.
#[derive(Debug, Deserialize)]
struct AggBar {
    t: i64,
    o: Option<f64>,
    h: Option<f64>,
    l: Option<f64>,
    c: Option<f64>,
    v: Option<f64>,
}
