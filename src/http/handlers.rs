use axum::{Json, extract::Extension};
use serde::Serialize;
use std::sync::Arc;

use crate::events::types::MemberSummary;
use crate::registry::store::MembershipStore;

#[derive(Debug, Serialize)]
pub struct MembersResponse {
    pub count: usize,
    pub members: Vec<MemberSummary>,
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub members: usize,
}

pub async fn handle_members(
    Extension(store): Extension<Arc<MembershipStore>>,
) -> Json<MembersResponse> {
    let now = tokio::time::Instant::now().into_std();
    let members: Vec<MemberSummary> = store
        .snapshot()
        .iter()
        .map(|record| MemberSummary::from_record(record, now))
        .collect();

    Json(MembersResponse {
        count: members.len(),
        members,
    })
}

pub async fn handle_health(
    Extension(store): Extension<Arc<MembershipStore>>,
) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        members: store.len(),
    })
}
