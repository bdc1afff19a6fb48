//! CLI argument definitions for stonks.
//!
//! # Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `history` | Daily OHLCV history with indicators |
//! | `price` | Latest traded price |
//! | `news` | Recent headlines |
//!
//! # Global Options
//!
//! | Option | Default | Description |
//! |--------|---------|-------------|
//! | `--pretty` | `false` | Pretty-print JSON output |
//! | `--offline` | `false` | Never touch the network |
//! | `--strict` | `false` | Fail when history falls back after errors |
//! | `--timeout-ms` | from env | Per-request HTTP timeout |
//!
//! # Examples
//!
//! ```bash
//! stonks history AAPL --period 6mo --pretty
//! STONKS_API_KEY=... stonks history MSFT --provider polygon
//! stonks price TSLA
//! stonks news NVDA
//! ```

use clap::{Args, Parser, Subcommand};

/// Daily stock history with indicators, prices and headlines.
#[derive(Debug, Parser)]
#[command(
    name = "stonks",
    author,
    version,
    about = "Daily stock history with technical indicators",
    long_about = "Fetches daily price history from Yahoo Finance or a paid provider \
(Alpha Vantage, Finnhub, Polygon), computes SMA/EMA/RSI/MACD/Bollinger indicators, \
and falls back to synthetic data when every provider fails."
)]
pub struct Cli {
    /// Pretty-print JSON output with indentation.
    #[arg(long, global = true, default_value_t = false)]
    pub pretty: bool,

    /// Serve history from the synthetic generator without network access.
    #[arg(long, global = true, default_value_t = false)]
    pub offline: bool,

    /// Exit with code 5 when history was synthesized after provider errors.
    #[arg(long, global = true, default_value_t = false)]
    pub strict: bool,

    /// Per-request HTTP timeout in milliseconds.
    #[arg(long, global = true)]
    pub timeout_ms: Option<u64>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Daily history with indicators.
    History(HistoryArgs),
    /// Latest traded price.
    Price(TickerArgs),
    /// Recent headlines.
    News(TickerArgs),
}

#[derive(Debug, Clone, Args)]
pub struct HistoryArgs {
    pub ticker: String,

    /// One of 1mo, 3mo, 6mo, 1y, 2y, 5y, max.
    #[arg(long, default_value = "2y")]
    pub period: String,

    /// One of yahoo, alpha_vantage, finnhub, polygon, mock.
    #[arg(long, default_value = "yahoo")]
    pub provider: String,

    /// Key for paid providers.
    #[arg(long, env = "STONKS_API_KEY", hide_env_values = true)]
    pub api_key: Option<String>,

    /// Only print the last N rows.
    #[arg(long)]
    pub tail: Option<usize>,
}

#[derive(Debug, Clone, Args)]
pub struct TickerArgs {
    pub ticker: String,
}
