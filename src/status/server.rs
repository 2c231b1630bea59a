use super::handlers::{
    handle_flush, handle_get_status, handle_health, handle_stats, handle_update,
};
use crate::serializer::SerializerHandle;

use axum::routing::{get, post};
use axum::{Extension, Router};

pub const ENDPOINT_HEALTH: &str = "/api/health";
pub const ENDPOINT_UPDATE: &str = "/api/update";
/// Anything under the update path is routed to the same handler.
pub const ENDPOINT_UPDATE_PREFIX: &str = "/api/update/*rest";
pub const ENDPOINT_STATS: &str = "/api/stats";
pub const ENDPOINT_STATUS: &str = "/api/status/:container_id";
pub const ENDPOINT_FLUSH: &str = "/api/flush";

/// Builds the HTTP API in front of the serializer.
pub fn build_router(serializer: SerializerHandle) -> Router {
    Router::new()
        .route(ENDPOINT_HEALTH, get(handle_health))
        .route(ENDPOINT_UPDATE, post(handle_update))
        .route(ENDPOINT_UPDATE_PREFIX, post(handle_update))
        .route(ENDPOINT_STATS, get(handle_stats))
        .route(ENDPOINT_STATUS, get(handle_get_status))
        .route(ENDPOINT_FLUSH, post(handle_flush))
        .layer(Extension(serializer))
}
