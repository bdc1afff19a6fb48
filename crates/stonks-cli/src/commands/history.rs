use serde::Serialize;
use stonks_core::{CoreError, IndicatorRow, Period, ProviderSelector, StockDataService};

use crate::cli::HistoryArgs;

use super::CommandResult;

#[derive(Debug, Serialize)]
struct HistoryResponseData {
    symbol: String,
    period: Period,
    provider: ProviderSelector,
    rows: Vec<IndicatorRow>,
}

pub async fn run(args: &HistoryArgs, service: &StockDataService) -> Result<CommandResult, CoreError> {
    // The library is lenient about tokens; the command line is not.
    let period = args.period.parse::<Period>()?;
    let provider = args.provider.parse::<ProviderSelector>()?;

    let outcome = service
        .history(&args.ticker, period, provider, args.api_key.as_deref())
        .await;
    let meta = outcome.meta;

    let data = serde_json::to_value(HistoryResponseData {
        symbol: meta.symbol,
        period: meta.period,
        provider: meta.provider,
        rows: tail(outcome.rows, args.tail),
    })?;

    Ok(CommandResult {
        served_by: Some(meta.served_by),
        synthetic: meta.synthetic,
        source_chain: meta.source_chain,
        errors: meta.errors,
        warnings: meta.warnings,
        latency_ms: meta.latency_ms,
        request_id: meta.request_id,
        ..CommandResult::ok("history", data)
    })
}

fn tail(mut rows: Vec<IndicatorRow>, keep: Option<usize>) -> Vec<IndicatorRow> {
    if let Some(keep) = keep {
        let skip = rows.len().saturating_sub(keep);
        rows.drain(..skip);
    }
    rows
}
