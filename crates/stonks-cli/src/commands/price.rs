use std::time::Instant;

use serde::Serialize;
use stonks_core::{AttemptError, CoreError, StockDataService};

use crate::cli::TickerArgs;

use super::{elapsed_ms, CommandResult};

#[derive(Debug, Serialize)]
struct PriceResponseData {
    symbol: String,
    price: Option<f64>,
}

pub async fn run(args: &TickerArgs, service: &StockDataService) -> Result<CommandResult, CoreError> {
    let started = Instant::now();
    let price = service.current_price(&args.ticker).await;

    let data = serde_json::to_value(PriceResponseData {
        symbol: args.ticker.trim().to_ascii_uppercase(),
        price,
    })?;
    let mut result = CommandResult::ok("price", data).with_latency(elapsed_ms(started));

    if price.is_none() {
        result = result.with_error(AttemptError {
            provider: None,
            code: String::from("price.unavailable"),
            message: format!("no current price for '{}'", args.ticker),
            retryable: true,
        });
    }
    Ok(result)
}
