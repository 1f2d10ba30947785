//! Liveness endpoint.

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use serde_json::json;

use crate::AppState;

/// `200` when the database answers, `503` otherwise.
pub async fn health_check(State(state): State<AppState>) -> impl IntoResponse {
    let database_ok = state.db.health_check().await;
    let status = if database_ok {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    (
        status,
        Json(json!({
            "status": if database_ok { "ok" } else { "degraded" },
            "database": if database_ok { "ok" } else { "unavailable" },
            "service": "billing-api",
            "version": env!("CARGO_PKG_VERSION"),
        })),
    )
}
