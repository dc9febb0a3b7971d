use anyhow::{Context, Result};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::UdpSocket;
use tokio_util::sync::CancellationToken;

use super::protocol::{Announcement, DecodeError, MAX_DATAGRAM_SIZE, decode};
use crate::events::bus::EventBus;
use crate::events::types::RegistryEvent;
use crate::registry::store::MembershipStore;
use crate::registry::types::UpsertOutcome;

const RECV_ERROR_BACKOFF: Duration = Duration::from_millis(100);

/// Consecutive receive failures after which the socket is considered unusable.
const MAX_CONSECUTIVE_RECV_ERRORS: u32 = 50;

/// UDP heartbeat receiver feeding the membership store.
pub struct AnnouncementIngestor {
    socket: UdpSocket,
    store: Arc<MembershipStore>,
    events: EventBus,
}

impl AnnouncementIngestor {
    /// Binds the heartbeat socket. Failing to bind is a fatal startup error.
    pub async fn bind(
        addr: SocketAddr,
        store: Arc<MembershipStore>,
        events: EventBus,
    ) -> Result<Arc<Self>> {
        let socket = UdpSocket::bind(addr)
            .await
            .with_context(|| format!("failed to bind heartbeat listener on {}", addr))?;

        tracing::info!("Heartbeat listener started on UDP {}", socket.local_addr()?);

        Ok(Arc::new(Self {
            socket,
            store,
            events,
        }))
    }

    pub fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.socket.local_addr()?)
    }

    /// Receives datagrams until `shutdown` fires.
    ///
    /// Decode failures and transient receive errors never stop the loop. Only a socket
    /// that keeps failing is reported back as an error.
    pub async fn run(self: Arc<Self>, shutdown: CancellationToken) -> Result<()> {
        // One spare byte so a datagram longer than the limit is detectable.
        let mut buf = vec![0u8; MAX_DATAGRAM_SIZE + 1];
        let mut failures = RecvFailures::new(MAX_CONSECUTIVE_RECV_ERRORS);

        loop {
            let received = tokio::select! {
                _ = shutdown.cancelled() => {
                    tracing::info!("Heartbeat listener shutting down");
                    return Ok(());
                }
                received = self.socket.recv_from(&mut buf) => received,
            };

            match received {
                Ok((len, src)) => {
                    failures.reset();
                    if let Err(e) = self.handle_datagram(&buf[..len], src) {
                        tracing::warn!("Discarded datagram from {}: {}", src, e);
                    }
                }
                Err(e) => {
                    tracing::error!("Failed to receive UDP packet: {}", e);
                    failures.record(e)?;

                    tokio::select! {
                        _ = shutdown.cancelled() => return Ok(()),
                        _ = tokio::time::sleep(RECV_ERROR_BACKOFF) => {}
                    }
                }
            }
        }
    }

    /// Decodes one datagram received from `src` and applies it to the store.
    ///
    /// Returns the upsert outcome for heartbeats and `None` for ignored message types.
    pub fn handle_datagram(
        &self,
        payload: &[u8],
        src: SocketAddr,
    ) -> Result<Option<UpsertOutcome>, DecodeError> {
        match decode(payload)? {
            Announcement::Heartbeat { service, port } => {
                let address = src.ip().to_canonical();
                let now = tokio::time::Instant::now().into_std();
                let outcome = self.store.upsert_at(service.clone(), address, port, now);

                let event = match outcome {
                    UpsertOutcome::Registered => RegistryEvent::Registered {
                        identity: service,
                        address,
                        port,
                    },
                    UpsertOutcome::Refreshed => RegistryEvent::Refreshed {
                        identity: service,
                        address,
                        port,
                    },
                };
                self.events.publish(event);

                Ok(Some(outcome))
            }
            Announcement::Unknown { kind } => {
                tracing::debug!("Ignoring '{}' message from {}", kind, src);
                Ok(None)
            }
        }
    }
}

/// Counts receive errors in a row; a run reaching `limit` means the socket is unusable.
#[derive(Debug)]
pub(crate) struct RecvFailures {
    consecutive: u32,
    limit: u32,
}

impl RecvFailures {
    pub(crate) fn new(limit: u32) -> Self {
        Self {
            consecutive: 0,
            limit: limit.max(1),
        }
    }

    pub(crate) fn reset(&mut self) {
        self.consecutive = 0;
    }

    /// Records one failure. Transient failures return `Ok`; the one reaching the limit is
    /// returned as the fatal error.
    pub(crate) fn record(&mut self, error: std::io::Error) -> Result<()> {
        self.consecutive += 1;

        if self.consecutive >= self.limit {
            return Err(anyhow::Error::new(error).context(format!(
                "heartbeat socket failed {} times in a row",
                self.consecutive
            )));
        }

        Ok(())
    }
}
