use serde::Serialize;
use serde_json::Value;
use stonks_core::{AttemptError, ProviderId};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::commands::CommandResult;
use crate::error::CliError;

/// JSON document written to stdout for every command.
#[derive(Debug, Serialize)]
pub struct Envelope {
    pub meta: EnvelopeMeta,
    pub data: Value,
    pub errors: Vec<AttemptError>,
}

#[derive(Debug, Serialize)]
pub struct EnvelopeMeta {
    pub request_id: Uuid,
    pub command: &'static str,
    #[serde(with = "time::serde::rfc3339")]
    pub generated_at: OffsetDateTime,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub served_by: Option<ProviderId>,
    pub synthetic: bool,
    pub source_chain: Vec<ProviderId>,
    pub warnings: Vec<String>,
    pub latency_ms: u64,
}

impl Envelope {
    pub fn from_result(result: CommandResult) -> Self {
        Self {
            meta: EnvelopeMeta {
                request_id: result.request_id,
                command: result.command,
                generated_at: OffsetDateTime::now_utc(),
                served_by: result.served_by,
                synthetic: result.synthetic,
                source_chain: result.source_chain,
                warnings: result.warnings,
                latency_ms: result.latency_ms,
            },
            data: result.data,
            errors: result.errors,
        }
    }

    /// Errors were recorded and no real provider served the data.
    pub fn is_degraded(&self) -> bool {
        !self.errors.is_empty()
            && self
                .meta
                .served_by
                .map_or(true, |_| self.meta.synthetic)
    }
}

pub fn to_json(envelope: &Envelope, pretty: bool) -> Result<String, CliError> {
    let payload = if pretty {
        serde_json::to_string_pretty(envelope)?
    } else {
        serde_json::to_string(envelope)?
    };
    Ok(payload)
}

pub fn render(envelope: &Envelope, pretty: bool) -> Result<(), CliError> {
    let payload = to_json(envelope, pretty)?;
    println!("{payload}");
    Ok(())
}
