mod history;
mod news;
mod price;

use std::time::Duration;

use serde_json::Value;
use stonks_core::{AttemptError, CoreError, ProviderId, ServiceConfig, StockDataService};
use uuid::Uuid;

use crate::cli::{Cli, Command};

/// Payload and diagnostics of one command, before rendering.
pub struct CommandResult {
    pub command: &'static str,
    pub request_id: Uuid,
    pub data: Value,
    pub served_by: Option<ProviderId>,
    pub synthetic: bool,
    pub source_chain: Vec<ProviderId>,
    pub errors: Vec<AttemptError>,
    pub warnings: Vec<String>,
    pub latency_ms: u64,
}

impl CommandResult {
    pub fn ok(command: &'static str, data: Value) -> Self {
        Self {
            command,
            request_id: Uuid::new_v4(),
            data,
            served_by: None,
            synthetic: false,
            source_chain: Vec::new(),
            errors: Vec::new(),
            warnings: Vec::new(),
            latency_ms: 0,
        }
    }

    pub fn with_error(mut self, error: AttemptError) -> Self {
        self.errors.push(error);
        self
    }

    pub fn with_latency(mut self, latency_ms: u64) -> Self {
        self.latency_ms = latency_ms;
        self
    }
}

pub async fn run(cli: &Cli) -> Result<CommandResult, CoreError> {
    let service = build_service(cli);

    match &cli.command {
        Command::History(args) => history::run(args, &service).await,
        Command::Price(args) => price::run(args, &service).await,
        Command::News(args) => news::run(args, &service).await,
    }
}

fn build_service(cli: &Cli) -> StockDataService {
    let mut config = ServiceConfig::from_env();
    if let Some(timeout_ms) = cli.timeout_ms {
        config = config.with_request_timeout(Duration::from_millis(timeout_ms));
    }

    if cli.offline {
        tracing::debug!("offline mode: network lookups disabled");
        StockDataService::offline(config)
    } else {
        StockDataService::new(config)
    }
}

fn elapsed_ms(started: std::time::Instant) -> u64 {
    u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX)
}
