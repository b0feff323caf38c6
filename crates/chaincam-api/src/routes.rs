//! API routes.

use axum::extract::DefaultBodyLimit;
use axum::middleware;
use axum::routing::{delete, get, post};
use axum::Router;

use crate::handlers::health::health;
use crate::handlers::queue::{cleanup_queue, get_queue, queue_stats, remove_queue_item};
use crate::handlers::videos::{
    ai_processed, get_video, list_videos, next_for_processing, upload_video,
};
use crate::middleware::{cors_layer, request_logging};
use crate::state::AppState;

/// Create the API router.
pub fn create_router(state: AppState) -> Router {
    let video_routes = Router::new()
        .route("/videos", post(upload_video).get(list_videos))
        .route("/videos/next-for-processing", get(next_for_processing))
        .route("/videos/ai-processed", post(ai_processed))
        .route("/videos/:video_id", get(get_video));

    let queue_routes = Router::new()
        .route("/queue", get(get_queue))
        .route("/queue/stats", get(queue_stats))
        .route("/queue/cleanup", post(cleanup_queue))
        .route("/queue/:item_id", delete(remove_queue_item));

    let api_routes = Router::new().merge(video_routes).merge(queue_routes);

    let health_routes = Router::new()
        .route("/health", get(health))
        .route("/healthz", get(health));

    Router::new()
        .nest("/api", api_routes)
        .merge(health_routes)
        .layer(DefaultBodyLimit::max(state.config.max_body_size))
        .layer(cors_layer(&state.config.cors_origins))
        .layer(middleware::from_fn(request_logging))
        .with_state(state)
}
