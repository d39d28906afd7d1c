use std::time::Instant;

use axum::{
    extract::{Request, State},
    http::header,
    middleware::Next,
    response::{IntoResponse, Response},
};
use tracing::{debug, info, warn};
use utils::jwt::{self, TokenError};

use crate::{AppState, error::ApiError};

/// Extract the admin session token: the `token` cookie set by the CMS login,
/// or an `Authorization: Bearer` header.
fn session_token(req: &Request) -> Option<String> {
    let headers = req.headers();

    let from_cookie = headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .find_map(jwt::token_from_cookie_header);
    if let Some(token) = from_cookie {
        return Some(token.to_string());
    }

    headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(String::from)
}

/// Gate for the CMS write endpoints.
pub async fn require_admin(State(state): State<AppState>, mut req: Request, next: Next) -> Response {
    let Some(token) = session_token(&req) else {
        return ApiError::Unauthorized("authentication required".to_string()).into_response();
    };

    match jwt::validate_token(&state.config.admin_jwt_secret, &token) {
        Ok(claims) => {
            debug!(subject = %claims.sub, "Admin request authorized");
            req.extensions_mut().insert(claims);
            next.run(req).await
        }
        Err(err) => {
            warn!(path = %req.uri().path(), error = %err, "Rejected admin request");
            let msg = match err {
                TokenError::Expired => "session expired",
                _ => "invalid session",
            };
            ApiError::Unauthorized(msg.to_string()).into_response()
        }
    }
}

pub async fn request_logging(req: Request, next: Next) -> Response {
    let method = req.method().clone();
    let path = req.uri().path().to_string();
    let started = Instant::now();

    let response = next.run(req).await;

    info!(
        method = %method,
        path = %path,
        status = response.status().as_u16(),
        elapsed_ms = started.elapsed().as_millis() as u64,
        "HTTP request"
    );
    response
}
