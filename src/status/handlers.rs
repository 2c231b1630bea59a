use super::types::{ContainerReport, HealthResponse, ResponseBody};
use crate::serializer::{EntityView, SerializerHandle, SerializerStats};

use axum::body::Bytes;
use axum::extract::Path;
use axum::http::StatusCode;
use axum::{Extension, Json};

/// Decodes a status report and hands it to the serializer.
///
/// A 200 means the report was queued, not that it was stored.
pub async fn handle_update(
    Extension(serializer): Extension<SerializerHandle>,
    body: Bytes,
) -> (StatusCode, Json<ResponseBody>) {
    let report: ContainerReport = match serde_json::from_slice(&body) {
        Ok(report) => report,
        Err(e) => {
            tracing::warn!("Failed to decode status report: {}", e);
            return (
                StatusCode::BAD_REQUEST,
                Json(ResponseBody::error(
                    StatusCode::BAD_REQUEST.as_u16(),
                    "Failed to decode request body",
                    e,
                )),
            );
        }
    };

    let container_id = report.container_id.clone();
    if let Err(e) = serializer.submit(report).await {
        tracing::error!("Failed to queue update for container {}: {}", container_id, e);
        return (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(ResponseBody::error(
                StatusCode::INTERNAL_SERVER_ERROR.as_u16(),
                "Failed to queue update",
                e,
            )),
        );
    }

    tracing::debug!("Queued update for container {}", container_id);
    (
        StatusCode::OK,
        Json(ResponseBody::ok(StatusCode::OK.as_u16(), "ok")),
    )
}

pub async fn handle_health() -> Json<HealthResponse> {
    Json(HealthResponse { ok: true })
}

pub async fn handle_stats(
    Extension(serializer): Extension<SerializerHandle>,
) -> (StatusCode, Json<Option<SerializerStats>>) {
    match serializer.stats().await {
        Ok(stats) => (StatusCode::OK, Json(Some(stats))),
        Err(e) => {
            tracing::error!("Failed to read serializer stats: {}", e);
            (StatusCode::INTERNAL_SERVER_ERROR, Json(None))
        }
    }
}

pub async fn handle_get_status(
    Extension(serializer): Extension<SerializerHandle>,
    Path(container_id): Path<String>,
) -> (StatusCode, Json<Option<EntityView>>) {
    match serializer.lookup(&container_id).await {
        Ok(view) if view.is_empty() => {
            tracing::debug!("No status known for container {}", container_id);
            (StatusCode::NOT_FOUND, Json(None))
        }
        Ok(view) => (StatusCode::OK, Json(Some(view))),
        Err(e) => {
            tracing::error!("Failed to look up container {}: {}", container_id, e);
            (StatusCode::INTERNAL_SERVER_ERROR, Json(None))
        }
    }
}

/// Triggers an immediate retry of every pending report.
pub async fn handle_flush(
    Extension(serializer): Extension<SerializerHandle>,
) -> (StatusCode, Json<ResponseBody>) {
    match serializer.flush().await {
        Ok(()) => (
            StatusCode::ACCEPTED,
            Json(ResponseBody::ok(StatusCode::ACCEPTED.as_u16(), "flush queued")),
        ),
        Err(e) => {
            tracing::error!("Failed to queue flush: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ResponseBody::error(
                    StatusCode::INTERNAL_SERVER_ERROR.as_u16(),
                    "Failed to queue flush",
                    e,
                )),
            )
        }
    }
}
