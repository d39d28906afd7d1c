use axum::{
    Router,
    http::{HeaderValue, Method, header},
    middleware::from_fn,
};
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tracing::warn;

use crate::{AppState, middleware::request_logging};

pub mod health;
pub mod reviews;

fn cors_layer(allowed_origins: &[String]) -> CorsLayer {
    let layer = CorsLayer::new()
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION]);

    if allowed_origins.is_empty() {
        return layer.allow_origin(Any);
    }

    let origins: Vec<HeaderValue> = allowed_origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                warn!(origin = %origin, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect();

    // The admin session travels in a cookie, so listed origins get credentials.
    layer
        .allow_origin(AllowOrigin::list(origins))
        .allow_credentials(true)
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .merge(health::router())
        .merge(reviews::router(&state))
        .layer(cors_layer(&state.config.cors_allowed_origins))
        .layer(from_fn(request_logging))
        .with_state(state)
}
