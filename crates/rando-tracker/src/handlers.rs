//! Debug REST handlers.
//!
//! Only mounted when [`HubConfig::debug_routes`](crate::server::HubConfig)
//! is set. Lets integration tests drive tracked values without a game.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, State};
use serde::{Deserialize, Serialize};

use crate::error::HubError;
use crate::hub::TrackerHub;
use crate::source::GameStateSource;

/// Body of `POST /debug/states/{tracking_id}`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct SetStateRequest {
    /// Raw value to write.
    pub value: i64,
}

/// Response of a successful debug write.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SetStateResponse {
    /// Tracking id that was written.
    pub tracking_id: String,
    /// Uber state group of the written state.
    pub group: u32,
    /// Uber state index of the written state.
    pub state: u32,
    /// Raw value written.
    pub value: i64,
}

/// Write a tracked value by tracking id.
///
/// # Route
///
/// `POST /debug/states/{tracking_id}`
pub async fn set_state<S: GameStateSource>(
    State(hub): State<Arc<TrackerHub<S>>>,
    Path(tracking_id): Path<String>,
    Json(request): Json<SetStateRequest>,
) -> Result<Json<SetStateResponse>, HubError> {
    let id = hub.debug_set_state(&tracking_id, request.value).await?;
    Ok(Json(SetStateResponse {
        tracking_id,
        group: id.group,
        state: id.state,
        value: request.value,
    }))
}
