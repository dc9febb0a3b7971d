use anyhow::{Context, Result};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;

use crate::config::types::RegistryConfig;
use crate::events::bus::EventBus;
use crate::events::log::run_event_log;
use crate::http;
use crate::ingest::listener::AnnouncementIngestor;
use crate::registry::store::MembershipStore;
use crate::sweeper::sweeper::ExpirySweeper;

pub struct Coordinator {
    store: Arc<MembershipStore>,
    events: EventBus,
    ingestor: Arc<AnnouncementIngestor>,
    sweeper: Arc<ExpirySweeper>,
    http_listener: Option<TcpListener>,
    shutdown: CancellationToken,
}

impl Coordinator {
    /// Validates `config` and binds every socket up front, so that startup failures surface
    /// before any background task is spawned.
    pub async fn bind(config: &RegistryConfig) -> Result<Self> {
        config.validate()?;

        let store = MembershipStore::new();
        let events = EventBus::new(config.event_capacity);

        let ingestor =
            AnnouncementIngestor::bind(config.listen, store.clone(), events.clone()).await?;
        let sweeper = ExpirySweeper::new(store.clone(), events.clone(), config.sweep_policy());

        let http_listener = match config.http_addr {
            Some(addr) => Some(
                TcpListener::bind(addr)
                    .await
                    .with_context(|| format!("failed to bind HTTP view on {}", addr))?,
            ),
            None => None,
        };

        Ok(Self {
            store,
            events,
            ingestor,
            sweeper,
            http_listener,
            shutdown: CancellationToken::new(),
        })
    }

    pub fn store(&self) -> Arc<MembershipStore> {
        self.store.clone()
    }

    pub fn events(&self) -> EventBus {
        self.events.clone()
    }

    pub fn heartbeat_addr(&self) -> Result<SocketAddr> {
        self.ingestor.local_addr()
    }

    pub fn http_addr(&self) -> Option<SocketAddr> {
        self.http_listener
            .as_ref()
            .and_then(|listener| listener.local_addr().ok())
    }

    /// Token that stops every task when cancelled.
    pub fn shutdown_token(&self) -> CancellationToken {
        self.shutdown.clone()
    }

    /// Runs until shutdown is requested or a task fails fatally.
    pub async fn run(self) -> Result<()> {
        let mut tasks: JoinSet<Result<()>> = JoinSet::new();

        {
            let events = self.events.subscribe();
            let shutdown = self.shutdown.clone();
            tasks.spawn(async move {
                run_event_log(events, shutdown).await;
                Ok(())
            });
        }

        tasks.spawn(self.ingestor.clone().run(self.shutdown.clone()));

        {
            let sweeper = self.sweeper.clone();
            let shutdown = self.shutdown.clone();
            tasks.spawn(async move {
                sweeper.run(shutdown).await;
                Ok(())
            });
        }

        if let Some(listener) = self.http_listener {
            tasks.spawn(http::serve(listener, self.store.clone(), self.shutdown.clone()));
        }

        tracing::info!("Registry is running");

        supervise(tasks, &self.shutdown).await?;

        tracing::info!("Registry stopped");
        Ok(())
    }
}

/// Waits for every task to finish. The first task that fails or panics cancels `shutdown`,
/// the remaining tasks are aborted and the failure is returned.
pub(crate) async fn supervise(
    mut tasks: JoinSet<Result<()>>,
    shutdown: &CancellationToken,
) -> Result<()> {
    while let Some(joined) = tasks.join_next().await {
        let outcome: Result<()> = match joined {
            Ok(result) => result,
            Err(e) => Err(anyhow::anyhow!("registry task panicked: {}", e)),
        };

        if let Err(e) = outcome {
            tracing::error!("Registry task failed: {:#}", e);
            shutdown.cancel();
            return Err(e);
        }
    }

    Ok(())
}
