use std::collections::BTreeMap;
use std::fmt::{Display, Formatter};
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use crate::retry::RetryConfig;

/// Authentication strategy applied to outgoing HTTP requests.
#[derive(Clone, PartialEq, Eq)]
pub enum HttpAuth {
    BearerToken(String),
    Header { name: String, value: String },
}

impl HttpAuth {
    pub fn apply(&self, headers: &mut BTreeMap<String, String>) {
        match self {
            Self::BearerToken(token) => {
                headers.insert(String::from("authorization"), format!("Bearer {token}"));
            }
            Self::Header { name, value } => {
                headers.insert(name.to_ascii_lowercase(), value.clone());
            }
        }
    }
}

impl std::fmt::Debug for HttpAuth {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::BearerToken(_) => f.write_str("BearerToken(<redacted>)"),
            Self::Header { name, .. } => write!(f, "Header({name}: <redacted>)"),
        }
    }
}

/// GET request envelope used by adapter transport calls.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpRequest {
    pub url: String,
    pub headers: BTreeMap<String, String>,
    pub timeout_ms: u64,
}

impl HttpRequest {
    pub fn get(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            headers: BTreeMap::new(),
            timeout_ms: 10_000,
        }
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers
            .insert(name.into().to_ascii_lowercase(), value.into());
        self
    }

    pub fn with_auth(mut self, auth: &HttpAuth) -> Self {
        auth.apply(&mut self.headers);
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout_ms = timeout.as_millis().min(u128::from(u64::MAX)) as u64;
        self
    }
}

/// HTTP response envelope returned by an adapter transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    pub body: String,
}

impl HttpResponse {
    pub fn ok_json(body: impl Into<String>) -> Self {
        Self::with_status(200, body)
    }

    pub fn with_status(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    pub const fn is_success(&self) -> bool {
        self.status >= 200 && self.status < 300
    }
}

/// Transport-level HTTP error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpError {
    message: String,
    retryable: bool,
}

impl HttpError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            retryable: true,
        }
    }

    pub fn non_retryable(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            retryable: false,
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub const fn retryable(&self) -> bool {
        self.retryable
    }
}

impl Display for HttpError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.message)
    }
}

impl std::error::Error for HttpError {}

pub type HttpFuture<'a> = Pin<Box<dyn Future<Output = Result<HttpResponse, HttpError>> + Send + 'a>>;

/// Adapter transport contract.
pub trait HttpClient: Send + Sync {
    fn execute<'a>(&'a self, request: HttpRequest) -> HttpFuture<'a>;
}

/// Execute a request, retrying retryable transport errors and the statuses
/// listed in `retry`.
///
/// The last response is returned as-is once retries are exhausted so the
/// caller can map its status.
pub async fn execute_with_retry(
    client: &dyn HttpClient,
    request: HttpRequest,
    retry: &RetryConfig,
) -> Result<HttpResponse, HttpError> {
    let max_retries = if retry.enabled { retry.max_retries } else { 0 };
    let mut attempt = 0;

    loop {
        let outcome = client.execute(request.clone()).await;
        let should_retry = attempt < max_retries
            && match &outcome {
                Ok(response) => retry.should_retry_status(response.status),
                Err(error) => error.retryable(),
            };

        if !should_retry {
            return outcome;
        }

        tokio::time::sleep(retry.delay_for_attempt(attempt)).await;
        attempt += 1;
    }
}

/// Transport that refuses every request; used for offline runs where the
/// router should go straight to its terminal fallback.
#[derive(Debug, Default)]
pub struct OfflineHttpClient;

impl HttpClient for OfflineHttpClient {
    fn execute<'a>(&'a self, request: HttpRequest) -> HttpFuture<'a> {
        Box::pin(async move {
            Err(HttpError::non_retryable(format!(
                "network disabled; refused GET {}",
                redact_query(&request.url)
            )))
        })
    }
}

/// Production HTTP client using reqwest, with a cookie store for session
/// based providers.
#[derive(Debug, Clone)]
pub struct ReqwestHttpClient {
    client: Arc<reqwest::Client>,
}

impl ReqwestHttpClient {
    pub fn new(user_agent: &str) -> Self {
        Self {
            client: Arc::new(
                reqwest::Client::builder()
                    .user_agent(user_agent)
                    .cookie_store(true)
                    .build()
                    .unwrap_or_else(|_| reqwest::Client::new()),
            ),
        }
    }
}

impl HttpClient for ReqwestHttpClient {
    fn execute<'a>(&'a self, request: HttpRequest) -> HttpFuture<'a> {
        Box::pin(async move {
            let mut builder = self.client.get(&request.url);

            for (name, value) in &request.headers {
                builder = builder.header(name, value);
            }

            builder = builder.timeout(Duration::from_millis(request.timeout_ms));

            let response = builder.send().await.map_err(|e| {
                if e.is_timeout() {
                    HttpError::new(format!("request timeout: {}", e.without_url()))
                } else if e.is_connect() {
                    HttpError::new(format!("connection failed: {}", e.without_url()))
                } else {
                    HttpError::new(format!("request failed: {}", e.without_url()))
                }
            })?;

            let status = response.status().as_u16();
            let body = response
                .text()
                .await
                .map_err(|e| HttpError::new(format!("failed to read response body: {e}")))?;

            Ok(HttpResponse { status, body })
        })
    }
}

/// Strip the query string so keys passed as parameters never reach logs.
pub fn redact_query(url: &str) -> &str {
    url.split_once('?').map_or(url, |(base, _)| base)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    struct ScriptedClient {
        responses: Mutex<Vec<Result<HttpResponse, HttpError>>>,
        calls: Mutex<usize>,
    }

    impl ScriptedClient {
        fn new(mut responses: Vec<Result<HttpResponse, HttpError>>) -> Self {
            responses.reverse();
            Self {
                responses: Mutex::new(responses),
                calls: Mutex::new(0),
            }
        }

        fn calls(&self) -> usize {
            *self.calls.lock().expect("lock")
        }
    }

    impl HttpClient for ScriptedClient {
        fn execute<'a>(&'a self, _request: HttpRequest) -> HttpFuture<'a> {
            *self.calls.lock().expect("lock") += 1;
            let next = self
                .responses
                .lock()
                .expect("lock")
                .pop()
                .unwrap_or_else(|| Err(HttpError::non_retryable("script exhausted")));
            Box::pin(async move { next })
        }
    }

    fn fast_retry(max_retries: u32) -> RetryConfig {
        RetryConfig::fixed(Duration::from_millis(1), max_retries)
    }

    #[test]
    fn bearer_auth_populates_authorization_header() {
        let request = HttpRequest::get("https://example.test/aggs")
            .with_auth(&HttpAuth::BearerToken(String::from("token-123")));

        assert_eq!(
            request.headers.get("authorization").map(String::as_str),
            Some("Bearer token-123")
        );
    }

    #[test]
    fn custom_header_auth_is_lowercased_and_redacted_in_debug() {
        let auth = HttpAuth::Header {
            name: String::from("X-Finnhub-Token"),
            value: String::from("demo"),
        };
        let request = HttpRequest::get("https://example.test/candle").with_auth(&auth);

        assert_eq!(
            request.headers.get("x-finnhub-token").map(String::as_str),
            Some("demo")
        );
        assert!(!format!("{auth:?}").contains("demo"));
    }

    #[test]
    fn redact_query_drops_parameters() {
        assert_eq!(
            redact_query("https://example.test/query?apikey=secret"),
            "https://example.test/query"
        );
        assert_eq!(redact_query("https://example.test/"), "https://example.test/");
    }

    #[tokio::test]
    async fn retries_transient_status_then_succeeds() {
        let client = ScriptedClient::new(vec![
            Ok(HttpResponse::with_status(503, "")),
            Ok(HttpResponse::ok_json("{}")),
        ]);

        let response = execute_with_retry(&client, HttpRequest::get("u"), &fast_retry(2))
            .await
            .expect("second attempt succeeds");

        assert_eq!(response.status, 200);
        assert_eq!(client.calls(), 2);
    }

    #[tokio::test]
    async fn does_not_retry_non_retryable_errors() {
        let client = ScriptedClient::new(vec![Err(HttpError::non_retryable("tls failure"))]);

        let error = execute_with_retry(&client, HttpRequest::get("u"), &fast_retry(3))
            .await
            .expect_err("must fail");

        assert_eq!(error.message(), "tls failure");
        assert_eq!(client.calls(), 1);
    }

    #[tokio::test]
    async fn returns_last_response_when_retries_exhausted() {
        let client = ScriptedClient::new(vec![
            Ok(HttpResponse::with_status(500, "")),
            Ok(HttpResponse::with_status(502, "")),
        ]);

        let response = execute_with_retry(&client, HttpRequest::get("u"), &fast_retry(1))
            .await
            .expect("status responses are not transport errors");

        assert_eq!(response.status, 502);
        assert_eq!(client.calls(), 2);
    }

    #[tokio::test]
    async fn offline_client_refuses_without_leaking_query() {
        let error = OfflineHttpClient
            .execute(HttpRequest::get("https://example.test/q?apikey=secret"))
            .await
            .expect_err("offline");
        assert!(!error.retryable());
        assert!(!error.message().contains("secret"));
    }
}
