//! Liveness and readiness endpoints.

use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use serde::Serialize;

use crate::context::AppContext;

/// Fixed banner returned by `GET /`.
pub const ROOT_MESSAGE: &str = "Sales Insights Backend Running";

#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct RootResponse {
    pub message: String,
}

#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct HealthResponse {
    /// `ok` or `unavailable`.
    pub status: String,
    /// Active backend, `sqlite` or `postgres`.
    pub database: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// GET /
#[utoipa::path(
    get,
    path = "/",
    responses(
        (status = 200, description = "Service banner", body = RootResponse)
    )
)]
pub async fn root() -> Json<RootResponse> {
    Json(RootResponse {
        message: ROOT_MESSAGE.to_string(),
    })
}

/// GET /health
#[utoipa::path(
    get,
    path = "/health",
    responses(
        (status = 200, description = "Database reachable", body = HealthResponse),
        (status = 503, description = "Database unreachable", body = HealthResponse)
    )
)]
pub async fn health_check(State(ctx): State<AppContext>) -> (StatusCode, Json<HealthResponse>) {
    let database = ctx.store.backend().to_string();
    match ctx.store.ping().await {
        Ok(()) => (
            StatusCode::OK,
            Json(HealthResponse {
                status: "ok".into(),
                database,
                error: None,
            }),
        ),
        Err(e) => {
            tracing::warn!(error = %e, "Health check failed");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(HealthResponse {
                    status: "unavailable".into(),
                    database,
                    error: Some(e.to_string()),
                }),
            )
        }
    }
}
