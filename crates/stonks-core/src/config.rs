use std::env;
use std::time::Duration;

use crate::retry::RetryConfig;

/// Desktop browser agent; Yahoo rejects obvious library agents.
pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) \
AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0.0.0 Safari/537.36";

/// Runtime settings shared by every adapter and lookup of one service.
///
/// # Environment Variables
///
/// | Variable | Field | Default |
/// |----------|-------|---------|
/// | `STONKS_REQUEST_TIMEOUT_MS` | `request_timeout` | 10000 |
/// | `STONKS_ATTEMPT_TIMEOUT_MS` | `attempt_timeout` | 20000 |
/// | `STONKS_HTTP_MAX_RETRIES` | `retry.max_retries` | 1 |
/// | `STONKS_USER_AGENT` | `user_agent` | desktop Chrome |
#[derive(Debug, Clone, PartialEq)]
pub struct ServiceConfig {
    /// Bound on a single HTTP request.
    pub request_timeout: Duration,
    /// Bound on one adapter attempt, retries and session handshakes included.
    pub attempt_timeout: Duration,
    pub retry: RetryConfig,
    pub user_agent: String,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            request_timeout: Duration::from_secs(10),
            attempt_timeout: Duration::from_secs(20),
            retry: RetryConfig::default(),
            user_agent: String::from(DEFAULT_USER_AGENT),
        }
    }
}

impl ServiceConfig {
    /// Defaults overridden by any well-formed `STONKS_*` variable.
    pub fn from_env() -> Self {
        Self::from_lookup(|name| env::var(name).ok())
    }

    pub(crate) fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();

        if let Some(ms) = parse_var::<u64>(&lookup, "STONKS_REQUEST_TIMEOUT_MS") {
            config.request_timeout = Duration::from_millis(ms);
        }
        if let Some(ms) = parse_var::<u64>(&lookup, "STONKS_ATTEMPT_TIMEOUT_MS") {
            config.attempt_timeout = Duration::from_millis(ms);
        }
        if let Some(retries) = parse_var::<u32>(&lookup, "STONKS_HTTP_MAX_RETRIES") {
            config.retry = if retries == 0 {
                RetryConfig::no_retry()
            } else {
                RetryConfig::exponential(retries)
            };
        }
        if let Some(agent) = lookup("STONKS_USER_AGENT").filter(|value| !value.trim().is_empty()) {
            config.user_agent = agent;
        }

        config
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    pub fn with_attempt_timeout(mut self, timeout: Duration) -> Self {
        self.attempt_timeout = timeout;
        self
    }

    pub fn with_retry(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }
}

fn parse_var<T: std::str::FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    name: &str,
) -> Option<T> {
    let raw = lookup(name)?;
    match raw.trim().parse() {
        Ok(value) => Some(value),
        Err(_) => {
            tracing::warn!(variable = name, value = %raw, "ignoring malformed setting");
            None
        }
    }
}
