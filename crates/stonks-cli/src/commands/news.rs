use std::time::Instant;

use serde::Serialize;
use stonks_core::{CoreError, NewsItem, StockDataService};

use crate::cli::TickerArgs;

use super::{elapsed_ms, CommandResult};

#[derive(Debug, Serialize)]
struct NewsResponseData {
    symbol: String,
    items: Vec<NewsItem>,
}

pub async fn run(args: &TickerArgs, service: &StockDataService) -> Result<CommandResult, CoreError> {
    let started = Instant::now();
    let items = service.news(&args.ticker).await;
    let empty = items.is_empty();

    let data = serde_json::to_value(NewsResponseData {
        symbol: args.ticker.trim().to_ascii_uppercase(),
        items,
    })?;
    let mut result = CommandResult::ok("news", data).with_latency(elapsed_ms(started));

    if empty {
        result.warnings.push(String::from("no headlines available"));
    }
    Ok(result)
}
