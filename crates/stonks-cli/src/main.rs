mod cli;
mod commands;
mod error;
mod output;

use clap::Parser;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

use crate::cli::{Cli, Command};
use crate::error::CliError;
use crate::output::Envelope;

#[tokio::main]
async fn main() -> ExitCode {
    init_tracing();

    match run().await {
        Ok(code) => code,
        Err(error) => {
            eprintln!("error: {error}");
            ExitCode::from(error.exit_code())
        }
    }
}

/// Diagnostics go to stderr so stdout carries only the JSON envelope.
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("stonks=info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

async fn run() -> Result<ExitCode, CliError> {
    let cli = Cli::parse();

    let result = commands::run(&cli).await?;
    let envelope = Envelope::from_result(result);
    output::render(&envelope, cli.pretty)?;

    if cli.strict && matches!(cli.command, Command::History(_)) && envelope.is_degraded() {
        return Err(CliError::StrictModeViolation {
            served_by: envelope
                .meta
                .served_by
                .map(|id| id.to_string())
                .unwrap_or_default(),
            error_count: envelope.errors.len(),
        });
    }

    if envelope.is_degraded() {
        return Ok(ExitCode::from(3));
    }

    Ok(ExitCode::SUCCESS)
}
