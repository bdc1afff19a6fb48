#[path = "../support/mod.rs"]
mod support;

use std::sync::Arc;

use stonks_core::{
    AlphaVantageAdapter, FinnhubAdapter, HistoryRequest, HistorySource, Period, PolygonAdapter,
    PriceRow, ProviderId, SourceErrorKind, Symbol, SyntheticGenerator, YahooAdapter,
    YahooChartAdapter,
};

use support::{
    alpha_vantage_series, finnhub_candles, polygon_aggs, quiet_config, yahoo_chart, ScriptedHttp,
};

struct ProviderCase {
    id: ProviderId,
    source: Arc<dyn HistorySource>,
    needs_key: bool,
}

fn provider_cases() -> Vec<ProviderCase> {
    let http = Arc::new(
        ScriptedHttp::new()
            .status("fc.yahoo.com", 404)
            .body("getcrumb", "crumbValue1")
            .body("finance.yahoo.com/v8/finance/chart/", yahoo_chart(400))
            .body("alphavantage.co", alpha_vantage_series(400))
            .body("finnhub.io", finnhub_candles(400))
            .body("api.polygon.io", polygon_aggs(400)),
    );
    let config = quiet_config();

    vec![
        ProviderCase {
            id: ProviderId::Yahoo,
            source: Arc::new(YahooAdapter::new(http.clone(), &config)),
            needs_key: false,
        },
        ProviderCase {
            id: ProviderId::YahooChart,
            source: Arc::new(YahooChartAdapter::new(http.clone(), &config)),
            needs_key: false,
        },
        ProviderCase {
            id: ProviderId::AlphaVantage,
            source: Arc::new(AlphaVantageAdapter::new(http.clone(), &config)),
            needs_key: true,
        },
        ProviderCase {
            id: ProviderId::Finnhub,
            source: Arc::new(FinnhubAdapter::new(http.clone(), &config)),
            needs_key: true,
        },
        ProviderCase {
            id: ProviderId::Polygon,
            source: Arc::new(PolygonAdapter::new(http, &config)),
            needs_key: true,
        },
        ProviderCase {
            id: ProviderId::Synthetic,
            source: Arc::new(SyntheticGenerator::seeded(9)),
            needs_key: false,
        },
    ]
}

fn request(key: Option<&str>) -> HistoryRequest {
    HistoryRequest::new(
        Symbol::parse("IBM").expect("valid symbol"),
        Period::OneYear,
        key.map(str::to_owned),
    )
}

fn assert_canonical(id: ProviderId, rows: &[PriceRow]) {
    assert!(!rows.is_empty(), "{id} returned no rows");
    assert!(
        rows.windows(2).all(|pair| pair[0].date < pair[1].date),
        "{id} rows must be sorted with unique dates"
    );
    for row in rows {
        for (field, value) in [
            ("open", row.open),
            ("high", row.high),
            ("low", row.low),
            ("close", row.close),
        ] {
            assert!(
                value.is_finite() && value > 0.0,
                "{id} {field} on {} is {value}",
                row.date
            );
        }
    }
}

#[test]
fn identifiers_match_registration() {
    for case in provider_cases() {
        assert_eq!(case.source.id(), case.id);
        assert_eq!(case.id.requires_api_key(), case.needs_key);
    }
}

#[tokio::test]
async fn every_source_returns_canonical_rows() {
    for case in provider_cases() {
        let rows = case
            .source
            .daily_history(request(Some("contract-key")))
            .await
            .unwrap_or_else(|error| panic!("{} failed: {error}", case.id));

        assert_canonical(case.id, &rows);
    }
}

#[tokio::test]
async fn keyed_sources_reject_missing_keys_as_configuration_errors() {
    for case in provider_cases().into_iter().filter(|case| case.needs_key) {
        let error = case
            .source
            .daily_history(request(None))
            .await
            .expect_err("missing key must fail");

        assert_eq!(error.kind(), SourceErrorKind::Configuration, "{}", case.id);
        assert_eq!(error.code(), "source.configuration");
        assert!(error.message().contains(case.id.as_str()));
    }
}

#[tokio::test]
async fn keyless_sources_ignore_a_supplied_key() {
    for case in provider_cases().into_iter().filter(|case| !case.needs_key) {
        let with_key = case.source.daily_history(request(Some("unused"))).await;
        let without = case.source.daily_history(request(None)).await;

        assert!(with_key.is_ok() && without.is_ok(), "{}", case.id);
    }
}

#[tokio::test]
async fn unreachable_upstream_is_an_error_not_a_panic() {
    let http = Arc::new(ScriptedHttp::new());
    let config = quiet_config();
    let sources: Vec<Arc<dyn HistorySource>> = vec![
        Arc::new(YahooAdapter::new(http.clone(), &config)),
        Arc::new(YahooChartAdapter::new(http.clone(), &config)),
        Arc::new(AlphaVantageAdapter::new(http.clone(), &config)),
        Arc::new(FinnhubAdapter::new(http.clone(), &config)),
        Arc::new(PolygonAdapter::new(http, &config)),
    ];

    for source in sources {
        let error = source
            .daily_history(request(Some("key")))
            .await
            .expect_err("no network");
        assert_ne!(error.kind(), SourceErrorKind::Parse, "{}", source.id());
    }
}
