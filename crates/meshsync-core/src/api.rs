//! HTTP surface peer control planes poll for this zone's state.
//!
//! - `GET /state` - every local service with its instances
//! - `GET /state/:service_name` - one service, 404 when unknown

use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use meshsync_types::models::{ServiceInstances, ServicesState};
use tracing::debug;

use crate::sync::LocalZoneStateChanges;

pub fn state_router(local: LocalZoneStateChanges) -> Router {
    Router::new()
        .route("/state", get(handle_get_state))
        .route("/state/:service_name", get(handle_get_service_state))
        .with_state(local)
}

/// Empty until discovery delivered its first snapshot.
async fn handle_get_state(State(local): State<LocalZoneStateChanges>) -> Json<ServicesState> {
    let state = local.latest().unwrap_or_default();
    debug!("[StateApi] serving {} services of zone {}", state.len(), local.zone());
    Json(state)
}

async fn handle_get_service_state(
    State(local): State<LocalZoneStateChanges>,
    Path(service_name): Path<String>,
) -> Result<Json<ServiceInstances>, (StatusCode, String)> {
    local
        .latest()
        .and_then(|state| state.get(&service_name).cloned())
        .map(Json)
        .ok_or_else(|| (StatusCode::NOT_FOUND, format!("Service {service_name} not found")))
}
