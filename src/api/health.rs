use axum::Json;
use chrono::{DateTime, Utc};
use serde::Serialize;

/// Liveness of the worker that served the request.
#[cfg_attr(feature = "swagger", derive(utoipa::ToSchema))]
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    status: String,
    /// OS process id of the worker, useful for targeting it from outside.
    pid: u32,
    timestamp: DateTime<Utc>,
}

impl HealthResponse {
    fn healthy() -> Self {
        Self {
            status: "healthy".to_string(),
            pid: std::process::id(),
            timestamp: Utc::now(),
        }
    }
}

/// GET /healthz - Liveness probe
///
/// Returns 200 as long as this worker is accepting requests
#[cfg_attr(feature = "swagger", utoipa::path(
    get,
    path = "/healthz",
    responses((status = 200, body = HealthResponse)),
    tag = "health"
))]
pub async fn healthz() -> Json<HealthResponse> {
    Json(HealthResponse::healthy())
}
