//! Diagnostics hook for the fallback chain.

use uuid::Uuid;

use crate::routing::AttemptError;
use crate::{Period, ProviderId};

/// State transition inside one [`HistoryRouter::fetch`](crate::HistoryRouter::fetch) call.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FetchEvent<'a> {
    AttemptStarted {
        request_id: Uuid,
        provider: ProviderId,
        window: Period,
    },
    AttemptSucceeded {
        request_id: Uuid,
        provider: ProviderId,
        rows: usize,
        elapsed_ms: u64,
    },
    AttemptFailed {
        request_id: Uuid,
        error: &'a AttemptError,
        elapsed_ms: u64,
    },
    /// Terminal state; the synthetic generator serves the call.
    SyntheticFallback {
        request_id: Uuid,
        window: Period,
        attempts_failed: usize,
    },
}

/// Receives every [`FetchEvent`]; implementations must not block.
pub trait FetchObserver: Send + Sync {
    fn on_event(&self, event: &FetchEvent<'_>);
}

/// Default observer emitting `tracing` events.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingObserver;

impl FetchObserver for TracingObserver {
    fn on_event(&self, event: &FetchEvent<'_>) {
        match *event {
            FetchEvent::AttemptStarted {
                request_id,
                provider,
                window,
            } => {
                tracing::debug!(%request_id, %provider, %window, "attempting provider");
            }
            FetchEvent::AttemptSucceeded {
                request_id,
                provider,
                rows,
                elapsed_ms,
            } => {
                tracing::info!(%request_id, %provider, rows, elapsed_ms, "provider served history");
            }
            FetchEvent::AttemptFailed {
                request_id,
                error,
                elapsed_ms,
            } => {
                tracing::warn!(
                    %request_id,
                    provider = error.provider.map_or("none", ProviderId::as_str),
                    code = %error.code,
                    elapsed_ms,
                    "provider failed: {}",
                    error.message
                );
            }
            FetchEvent::SyntheticFallback {
                request_id,
                window,
                attempts_failed,
            } => {
                if attempts_failed > 0 {
                    tracing::warn!(%request_id, %window, attempts_failed, "serving synthetic history");
                } else {
                    tracing::info!(%request_id, %window, "serving synthetic history");
                }
            }
        }
    }
}
