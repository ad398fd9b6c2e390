use axum::{http::StatusCode, response::Json as ResponseJson};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Liveness of the usage info service
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct HealthResponse {
    /// Always `ok` while the process serves requests
    pub status: String,
    /// Version of the `api` crate serving the usage info listing
    pub version: String,
}

/// Health check endpoint
///
/// Answers from the router alone: it neither queries `usage_info` nor takes a
/// pooled connection, so a slow database does not fail liveness checks. Use
/// `GET /` to check that reporting queries work.
#[utoipa::path(
    get,
    path = "/health",
    responses(
        (status = 200, description = "Usage info service is up", body = HealthResponse),
    ),
    tag = "Health"
)]
pub async fn health_check() -> (StatusCode, ResponseJson<HealthResponse>) {
    (
        StatusCode::OK,
        ResponseJson(HealthResponse {
            status: "ok".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        }),
    )
}
