//! HTTP Membership View
//!
//! Read-only operator endpoints over the membership store:
//! - `GET /members`: the current membership, ordered by identity.
//! - `GET /health`: liveness of the registry process itself.

pub mod handlers;


use anyhow::Result;
use axum::{Router, extract::Extension, routing::get};
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;

use crate::registry::store::MembershipStore;
use handlers::{handle_health, handle_members};

pub const ENDPOINT_MEMBERS: &str = "/members";
pub const ENDPOINT_HEALTH: &str = "/health";

pub fn router(store: Arc<MembershipStore>) -> Router {
    Router::new()
        .route(ENDPOINT_MEMBERS, get(handle_members))
        .route(ENDPOINT_HEALTH, get(handle_health))
        .layer(Extension(store))
}

/// Serves the membership view on `listener` until `shutdown` fires.
pub async fn serve(
    listener: TcpListener,
    store: Arc<MembershipStore>,
    shutdown: CancellationToken,
) -> Result<()> {
    tracing::info!("HTTP membership view listening on {}", listener.local_addr()?);

    axum::serve(listener, router(store))
        .with_graceful_shutdown(async move { shutdown.cancelled().await })
        .await?;

    Ok(())
}
