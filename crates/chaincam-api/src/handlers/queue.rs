//! Queue admin handlers.

use axum::extract::{Path, State};
use axum::Json;
use serde::Serialize;

use chaincam_models::{QueueItem, QueueItemId, QueueStats};

use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

#[derive(Serialize)]
pub struct QueueListResponse {
    pub success: bool,
    pub items: Vec<QueueItem>,
}

/// List queue items in priority order.
pub async fn get_queue(State(state): State<AppState>) -> Json<QueueListResponse> {
    Json(QueueListResponse {
        success: true,
        items: state.queue.get_all_items(),
    })
}

/// Aggregate queue counts.
pub async fn queue_stats(State(state): State<AppState>) -> Json<QueueStats> {
    Json(state.queue.get_queue_stats())
}

#[derive(Serialize)]
pub struct CleanupResponse {
    pub removed: usize,
}

/// Remove completed items and terminal failures.
pub async fn cleanup_queue(State(state): State<AppState>) -> Json<CleanupResponse> {
    Json(CleanupResponse {
        removed: state.queue.cleanup_queue(),
    })
}

#[derive(Serialize)]
pub struct RemoveResponse {
    pub success: bool,
}

/// Remove a single queue item.
pub async fn remove_queue_item(
    State(state): State<AppState>,
    Path(item_id): Path<String>,
) -> ApiResult<Json<RemoveResponse>> {
    let item_id = QueueItemId::from_string(item_id);
    if state.queue.remove_from_queue(&item_id) {
        Ok(Json(RemoveResponse { success: true }))
    } else {
        Err(ApiError::not_found(format!("queue item {item_id}")))
    }
}
