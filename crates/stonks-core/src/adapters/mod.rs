//! Provider adapters behind the [`HistorySource`](crate::HistorySource) contract.
//!
//! | Adapter | Provider | Auth |
//! |---------|----------|------|
//! | [`YahooAdapter`] | Yahoo session client | cookie + crumb |
//! | [`YahooChartAdapter`] | Yahoo chart endpoint | none |
//! | [`AlphaVantageAdapter`] | Alpha Vantage | `apikey` query param |
//! | [`FinnhubAdapter`] | Finnhub | `X-Finnhub-Token` header |
//! | [`PolygonAdapter`] | Polygon | bearer token |
//! | [`SyntheticGenerator`] | local random walk | none |

mod alphavantage;
mod finnhub;
mod polygon;
mod synthetic;
mod yahoo;

pub use alphavantage::AlphaVantageAdapter;
pub use finnhub::FinnhubAdapter;
pub use polygon::PolygonAdapter;
pub use synthetic::SyntheticGenerator;
pub use yahoo::{YahooAdapter, YahooAuthManager, YahooChartAdapter};

pub(crate) use yahoo::parse_chart;

use std::sync::Arc;
use std::time::Duration;

use time::{Date, OffsetDateTime};

use crate::data_source::SourceError;
use crate::http_client::{execute_with_retry, HttpClient, HttpError, HttpRequest, HttpResponse};
use crate::retry::RetryConfig;
use crate::{ProviderId, ServiceConfig};

/// HTTP plumbing shared by the network adapters.
#[derive(Clone)]
pub(crate) struct Transport {
    client: Arc<dyn HttpClient>,
    request_timeout: Duration,
    retry: RetryConfig,
}

impl Transport {
    pub(crate) fn new(client: Arc<dyn HttpClient>, config: &ServiceConfig) -> Self {
        Self {
            client,
            request_timeout: config.request_timeout,
            retry: config.retry.clone(),
        }
    }

    /// Send with the configured timeout and retry policy, returning whatever
    /// status the provider answered with.
    pub(crate) async fn send(&self, request: HttpRequest) -> Result<HttpResponse, HttpError> {
        let request = request.with_timeout(self.request_timeout);
        execute_with_retry(self.client.as_ref(), request, &self.retry).await
    }

    /// Send and require a 2xx status; the body is returned on success.
    pub(crate) async fn get_ok(
        &self,
        provider: ProviderId,
        request: HttpRequest,
    ) -> Result<String, SourceError> {
        let response = self
            .send(request)
            .await
            .map_err(|error| SourceError::transport(provider, &error))?;

        if !response.is_success() {
            return Err(SourceError::status(provider, response.status));
        }

        Ok(response.body)
    }
}

/// Calendar date of a UTC epoch-seconds value.
pub(crate) fn utc_date(epoch_seconds: i64) -> Option<Date> {
    OffsetDateTime::from_unix_timestamp(epoch_seconds)
        .ok()
        .map(OffsetDateTime::date)
}

/// Today's UTC calendar date.
pub(crate) fn today_utc() -> Date {
    OffsetDateTime::now_utc().date()
}
