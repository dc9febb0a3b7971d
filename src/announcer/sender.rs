use anyhow::{Context, Result};
use rand::Rng;
use std::net::SocketAddr;
use std::time::Duration;
use tokio::net::UdpSocket;
use tokio_util::sync::CancellationToken;

use crate::config::types::AnnouncerConfig;
use crate::ingest::protocol::encode_heartbeat;

pub struct HeartbeatSender {
    socket: UdpSocket,
    target: SocketAddr,
    payload: Vec<u8>,
    service: String,
    min_delay: Duration,
    max_delay: Duration,
}

impl HeartbeatSender {
    /// Resolves the registry address and opens an unbound-peer UDP socket for sending.
    pub async fn connect(config: &AnnouncerConfig) -> Result<Self> {
        config.validate()?;

        let target = tokio::net::lookup_host((config.registry_host.as_str(), config.registry_port))
            .await
            .with_context(|| format!("failed to resolve registry {}", config.registry_host))?
            .next()
            .ok_or_else(|| anyhow::anyhow!("no address found for {}", config.registry_host))?;

        let local: SocketAddr = if target.is_ipv4() {
            SocketAddr::from(([0, 0, 0, 0], 0))
        } else {
            SocketAddr::from(([0u16; 8], 0))
        };
        let socket = UdpSocket::bind(local).await?;

        Ok(Self {
            socket,
            target,
            payload: encode_heartbeat(&config.service, config.port)?,
            service: config.service.clone(),
            min_delay: Duration::from_millis(config.min_delay_ms),
            max_delay: Duration::from_millis(config.max_delay_ms),
        })
    }

    pub fn target(&self) -> SocketAddr {
        self.target
    }

    pub async fn send_once(&self) -> Result<()> {
        self.socket.send_to(&self.payload, self.target).await?;
        Ok(())
    }

    /// Random delay before the next heartbeat, spreading nodes out over time.
    pub fn next_delay(&self) -> Duration {
        rand::thread_rng().gen_range(self.min_delay..=self.max_delay)
    }

    /// Sends heartbeats until `shutdown` fires. Send failures are logged and retried on the
    /// next cycle.
    pub async fn run(self, shutdown: CancellationToken) {
        tracing::info!("Sending heartbeats for {} to {}", self.service, self.target);

        loop {
            match self.send_once().await {
                Ok(()) => {
                    tracing::info!(
                        "Heartbeat sent: {}",
                        String::from_utf8_lossy(&self.payload)
                    );
                }
                Err(e) => {
                    tracing::warn!("Failed to send heartbeat to {}: {}", self.target, e);
                }
            }

            let delay = self.next_delay();
            tracing::debug!("Next heartbeat in {:?}", delay);

            tokio::select! {
                _ = shutdown.cancelled() => {
                    tracing::info!("Heartbeat sender shutting down");
                    break;
                }
                _ = tokio::time::sleep(delay) => {}
            }
        }
    }
}
