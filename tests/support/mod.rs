//! Shared fixtures for the integration suites: a scripted HTTP client and
//! provider payloads dated relative to today.

#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use serde_json::json;
use stonks_core::{
    HistoryRouter, HttpClient, HttpError, HttpRequest, HttpResponse, RetryConfig, ServiceConfig,
};
use time::{Duration, OffsetDateTime};

type Reply = Result<HttpResponse, HttpError>;

/// Answers requests by URL substring; unmatched URLs fail like a dead network.
///
/// Several replies for one pattern are consumed in order, the last repeats.
#[derive(Default)]
pub struct ScriptedHttp {
    routes: Mutex<Vec<(String, Reply)>>,
    requests: Mutex<Vec<HttpRequest>>,
}

impl ScriptedHttp {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on(self, pattern: &str, reply: Reply) -> Self {
        self.routes
            .lock()
            .expect("routes lock")
            .push((pattern.to_owned(), reply));
        self
    }

    pub fn body(self, pattern: &str, body: impl Into<String>) -> Self {
        self.on(pattern, Ok(HttpResponse::ok_json(body)))
    }

    pub fn status(self, pattern: &str, status: u16) -> Self {
        self.on(pattern, Ok(HttpResponse::with_status(status, "")))
    }

    pub fn requests(&self) -> Vec<HttpRequest> {
        self.requests.lock().expect("requests lock").clone()
    }

    pub fn count(&self, pattern: &str) -> usize {
        self.requests()
            .iter()
            .filter(|request| request.url.contains(pattern))
            .count()
    }
}

impl HttpClient for ScriptedHttp {
    fn execute<'a>(&'a self, request: HttpRequest) -> stonks_core::http_client::HttpFuture<'a> {
        let reply = {
            let mut routes = self.routes.lock().expect("routes lock");
            let matching = routes
                .iter()
                .enumerate()
                .filter(|(_, (pattern, _))| request.url.contains(pattern.as_str()))
                .map(|(index, _)| index)
                .collect::<Vec<_>>();

            match matching.as_slice() {
                [] => Err(HttpError::new(format!("connection refused: {}", request.url))),
                [only] => routes[*only].1.clone(),
                [first, ..] => routes.remove(*first).1,
            }
        };
        self.requests.lock().expect("requests lock").push(request);
        Box::pin(async move { reply })
    }
}

pub fn quiet_config() -> ServiceConfig {
    ServiceConfig::default().with_retry(RetryConfig::no_retry())
}

pub fn router(http: Arc<ScriptedHttp>) -> HistoryRouter {
    HistoryRouter::builder()
        .with_config(quiet_config())
        .with_http_client(http)
        .with_synthetic_seed(42)
        .build()
}

/// Midnight UTC timestamps for the last `days` days, oldest first.
pub fn recent_days(days: i64) -> Vec<OffsetDateTime> {
    let today = OffsetDateTime::now_utc().date().midnight().assume_utc();
    (0..days)
        .rev()
        .map(|back| today - Duration::days(back))
        .collect()
}

fn price_at(index: usize) -> f64 {
    100.0 + (index as f64 * 0.37).sin() * 5.0 + index as f64 * 0.1
}

pub fn yahoo_chart(days: i64) -> String {
    let stamps = recent_days(days);
    let closes = (0..stamps.len()).map(price_at).collect::<Vec<_>>();
    json!({
        "chart": {
            "result": [{
                "meta": {"regularMarketPrice": closes.last(), "gmtoffset": 0},
                "timestamp": stamps.iter().map(|t| t.unix_timestamp()).collect::<Vec<_>>(),
                "indicators": {"quote": [{
                    "open": closes.iter().map(|c| c - 0.5).collect::<Vec<_>>(),
                    "high": closes.iter().map(|c| c + 1.0).collect::<Vec<_>>(),
                    "low": closes.iter().map(|c| c - 1.0).collect::<Vec<_>>(),
                    "close": closes,
                    "volume": vec![1_500_000_u64; stamps.len()],
                }]}
            }],
            "error": null
        }
    })
    .to_string()
}

pub fn alpha_vantage_series(days: i64) -> String {
    let series = recent_days(days)
        .iter()
        .enumerate()
        .map(|(index, stamp)| {
            let close = price_at(index);
            (
                stamp.date().to_string(),
                json!({
                    "1. open": format!("{:.4}", close - 0.5),
                    "2. high": format!("{:.4}", close + 1.0),
                    "3. low": format!("{:.4}", close - 1.0),
                    "4. close": format!("{close:.4}"),
                    "5. volume": "2500000",
                }),
            )
        })
        .collect::<serde_json::Map<_, _>>();

    json!({"Meta Data": {"2. Symbol": "IBM"}, "Time Series (Daily)": series}).to_string()
}

pub fn finnhub_candles(days: i64) -> String {
    let stamps = recent_days(days);
    let closes = (0..stamps.len()).map(price_at).collect::<Vec<_>>();
    json!({
        "s": "ok",
        "t": stamps.iter().map(|t| t.unix_timestamp()).collect::<Vec<_>>(),
        "o": closes.iter().map(|c| c - 0.5).collect::<Vec<_>>(),
        "h": closes.iter().map(|c| c + 1.0).collect::<Vec<_>>(),
        "l": closes.iter().map(|c| c - 1.0).collect::<Vec<_>>(),
        "c": closes,
        "v": vec![2_000_000.0; stamps.len()],
    })
    .to_string()
}

pub fn polygon_aggs(days: i64) -> String {
    let results = recent_days(days)
        .iter()
        .enumerate()
        .map(|(index, stamp)| {
            let close = price_at(index);
            json!({
                "t": stamp.unix_timestamp() * 1000,
                "o": close - 0.5,
                "h": close + 1.0,
                "l": close - 1.0,
                "c": close,
                "v": 3_000_000.0,
            })
        })
        .collect::<Vec<_>>();

    json!({"status": "OK", "resultsCount": results.len(), "results": results}).to_string()
}
