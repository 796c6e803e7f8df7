use axum::extract::Extension;
use axum::http::StatusCode;
use axum::Json;
use serde::Serialize;

use crate::AppState;

#[derive(Serialize)]
pub struct HealthResponse {
    status: &'static str,
}

/// `GET /` — liveness only, no store access.
pub async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse { status: "ok" })
}

#[derive(Serialize)]
pub struct CheckDbResponse {
    status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

/// `GET /checkdb` — store reachability, per §6.
pub async fn checkdb_handler(Extension(state): Extension<AppState>) -> (StatusCode, Json<CheckDbResponse>) {
    match tokio::time::timeout(
        std::time::Duration::from_secs(5),
        sqlx::query("SELECT 1").execute(&state.db_pool),
    )
    .await
    {
        Ok(Ok(_)) => (
            StatusCode::OK,
            Json(CheckDbResponse {
                status: "ok".to_string(),
                error: None,
            }),
        ),
        Ok(Err(e)) => (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(CheckDbResponse {
                status: "error".to_string(),
                error: Some(e.to_string()),
            }),
        ),
        Err(_) => (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(CheckDbResponse {
                status: "error".to_string(),
                error: Some("query timeout".to_string()),
            }),
        ),
    }
}
