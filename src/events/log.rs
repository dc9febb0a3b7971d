//! Console consumer of the event stream.

use tokio::sync::broadcast::{self, error::RecvError};
use tokio_util::sync::CancellationToken;

use super::types::RegistryEvent;

/// Writes every event to the log until shutdown or until the bus is dropped.
pub async fn run_event_log(
    mut events: broadcast::Receiver<RegistryEvent>,
    shutdown: CancellationToken,
) {
    loop {
        tokio::select! {
            _ = shutdown.cancelled() => {
                tracing::debug!("Event log shutting down");
                break;
            }
            received = events.recv() => match received {
                Ok(event) => log_event(&event),
                Err(RecvError::Lagged(skipped)) => {
                    tracing::warn!("Event log lagged behind, skipped {} events", skipped);
                }
                Err(RecvError::Closed) => break,
            },
        }
    }
}

pub fn log_event(event: &RegistryEvent) {
    match event {
        RegistryEvent::Registered {
            identity,
            address,
            port,
        } => {
            tracing::info!("Registered: {} at {}:{}", identity, address, port);
        }
        RegistryEvent::Refreshed {
            identity,
            address,
            port,
        } => {
            tracing::info!("Updated: {} from {}:{}", identity, address, port);
        }
        RegistryEvent::Evicted {
            identity,
            silent_ms,
        } => {
            tracing::warn!(
                "REMOVED (timeout): {} (no heartbeat for {}ms)",
                identity,
                silent_ms
            );
        }
        RegistryEvent::MembershipSnapshot { members } => {
            tracing::info!("Active services: {}", members.len());
            for member in members {
                tracing::info!(
                    "  - {} running @ {}:{} (last seen: {}ms ago)",
                    member.identity,
                    member.address,
                    member.port,
                    member.silent_ms
                );
            }
        }
    }
}
