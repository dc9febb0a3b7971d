use clap::Parser;
use heartbeat_registry::announcer::sender::HeartbeatSender;
use heartbeat_registry::config::types::AnnouncerConfig;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = AnnouncerConfig::parse();

    tracing::info!("Starting {} on port {}", config.service, config.port);

    let sender = HeartbeatSender::connect(&config).await?;
    tracing::info!("Sending heartbeats to {}", sender.target());

    let shutdown = CancellationToken::new();
    {
        let shutdown = shutdown.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                shutdown.cancel();
            }
        });
    }

    sender.run(shutdown).await;
    Ok(())
}
