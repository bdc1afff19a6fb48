use std::sync::Arc;

use crate::adapters::{parse_chart, YahooChartAdapter};
use crate::data_source::{HistorySource, SourceError};
use crate::http_client::HttpClient;
use crate::{ServiceConfig, Symbol};

/// Best-effort latest traded price.
///
/// Reads `meta.regularMarketPrice` from a one-day chart and falls back to the
/// last non-null close in the same payload.
#[derive(Clone)]
pub struct PriceLookup {
    chart: YahooChartAdapter,
}

impl PriceLookup {
    pub fn new(http_client: Arc<dyn HttpClient>, config: &ServiceConfig) -> Self {
        Self {
            chart: YahooChartAdapter::new(http_client, config),
        }
    }

    /// `None` whenever no price is available; failures are logged, not raised.
    pub async fn current_price(&self, ticker: &str) -> Option<f64> {
        match self.lookup(ticker).await {
            Ok(price) => price,
            Err(error) => {
                tracing::warn!(ticker, code = error.code(), "price lookup failed: {}", error.message());
                None
            }
        }
    }

    async fn lookup(&self, ticker: &str) -> Result<Option<f64>, SourceError> {
        let symbol = Symbol::parse(ticker)
            .map_err(|error| SourceError::configuration(error.to_string()))?;
        let body = self.chart.chart(&symbol, "1d").await?;
        let chart = parse_chart(self.chart.id(), &body)?;

        Ok(chart
            .meta
            .regular_market_price
            .filter(|price| price.is_finite() && *price > 0.0)
            .or_else(|| chart.last_close()))
    }
}
