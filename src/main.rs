use clap::Parser;
use heartbeat_registry::config::types::RegistryConfig;
use heartbeat_registry::coordinator::service::Coordinator;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = RegistryConfig::parse();

    tracing::info!("=== Registry starting ===");
    tracing::info!(
        "Evicting services silent for more than {}ms (sweep every {}ms)",
        config.stale_after_ms,
        config.sweep_interval_ms
    );

    // 1. Bind everything up front; a taken port is a startup failure:
    let coordinator = Coordinator::bind(&config).await?;
    tracing::info!("Heartbeats accepted on UDP {}", coordinator.heartbeat_addr()?);
    if let Some(http_addr) = coordinator.http_addr() {
        tracing::info!("Membership view at http://{}/members", http_addr);
    }

    // 2. Ctrl+C stops every loop:
    let shutdown = coordinator.shutdown_token();
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                tracing::info!("Shutdown requested");
                shutdown.cancel();
            }
            Err(e) => tracing::error!("Failed to listen for Ctrl+C: {}", e),
        }
    });

    tracing::info!("Waiting for service nodes to register...");

    // 3. Run until shutdown or a fatal socket error:
    coordinator.run().await
}
