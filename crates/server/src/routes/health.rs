use axum::{Router, extract::State, http::StatusCode, response::Json as ResponseJson, routing::get};
use serde_json::{Value, json};
use tracing::error;

use crate::AppState;

/// GET /health
pub async fn health(State(state): State<AppState>) -> (StatusCode, ResponseJson<Value>) {
    match sqlx::query("SELECT 1").execute(&state.db.pool).await {
        Ok(_) => (StatusCode::OK, ResponseJson(json!({ "status": "ok" }))),
        Err(e) => {
            error!(error = %e, "Health check could not reach the database");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                ResponseJson(json!({ "status": "unavailable" })),
            )
        }
    }
}

pub fn router() -> Router<AppState> {
    Router::new().route("/health", get(health))
}
