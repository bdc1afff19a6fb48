use std::sync::Arc;

use crate::http_client::{HttpClient, OfflineHttpClient, ReqwestHttpClient};
use crate::observer::FetchObserver;
use crate::{
    FetchOutcome, HistoryRouter, NewsFeed, NewsItem, Period, PriceLookup, ProviderSelector,
    ServiceConfig,
};

/// History, price and news lookups over one HTTP client and configuration.
pub struct StockDataService {
    router: HistoryRouter,
    prices: PriceLookup,
    news: NewsFeed,
}

impl StockDataService {
    pub fn new(config: ServiceConfig) -> Self {
        let http_client = Arc::new(ReqwestHttpClient::new(&config.user_agent));
        Self::with_http_client(http_client, config)
    }

    /// Configuration from `STONKS_*` variables.
    pub fn from_env() -> Self {
        Self::new(ServiceConfig::from_env())
    }

    /// No network: history is synthetic, price is `None`, news is empty.
    pub fn offline(config: ServiceConfig) -> Self {
        Self::with_http_client(Arc::new(OfflineHttpClient), config)
    }

    pub fn with_http_client(http_client: Arc<dyn HttpClient>, config: ServiceConfig) -> Self {
        Self::build(http_client, config, None)
    }

    pub fn with_observer(
        http_client: Arc<dyn HttpClient>,
        config: ServiceConfig,
        observer: Arc<dyn FetchObserver>,
    ) -> Self {
        Self::build(http_client, config, Some(observer))
    }

    fn build(
        http_client: Arc<dyn HttpClient>,
        config: ServiceConfig,
        observer: Option<Arc<dyn FetchObserver>>,
    ) -> Self {
        let prices = PriceLookup::new(http_client.clone(), &config);
        let news = NewsFeed::new(http_client.clone(), &config);

        let mut router = HistoryRouter::builder().with_http_client(http_client);
        if let Some(observer) = observer {
            router = router.with_observer(observer);
        }

        Self {
            router: router.with_config(config).build(),
            prices,
            news,
        }
    }

    pub fn router(&self) -> &HistoryRouter {
        &self.router
    }

    pub async fn history(
        &self,
        ticker: &str,
        period: Period,
        provider: ProviderSelector,
        api_key: Option<&str>,
    ) -> FetchOutcome {
        self.router.fetch(ticker, period, provider, api_key).await
    }

    pub async fn current_price(&self, ticker: &str) -> Option<f64> {
        self.prices.current_price(ticker).await
    }

    pub async fn news(&self, ticker: &str) -> Vec<NewsItem> {
        self.news.fetch_news(ticker).await
    }
}
