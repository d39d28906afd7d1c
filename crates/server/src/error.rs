use axum::{
    extract::rejection::{JsonRejection, QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Json as ResponseJson, Response},
};
use services::services::{review_stats::StatsError, reviews::ReviewServiceError};
use thiserror::Error;
use utils::response::ErrorBody;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error(transparent)]
    ReviewService(#[from] ReviewServiceError),
    #[error("{0}")]
    BadRequest(String),
    #[error("{0}")]
    Unauthorized(String),
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            ApiError::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, msg),
            ApiError::ReviewService(err) => match err {
                ReviewServiceError::Validation(msg) => (StatusCode::BAD_REQUEST, msg),
                ReviewServiceError::NotFound(_) => {
                    (StatusCode::NOT_FOUND, "Review not found".to_string())
                }
                ReviewServiceError::NoData | ReviewServiceError::Stats(StatsError::NoSnapshot) => {
                    // Already logged by the service; the snapshot row is seeded by migration.
                    (
                        StatusCode::INTERNAL_SERVER_ERROR,
                        "Review statistics have not been initialized".to_string(),
                    )
                }
                ReviewServiceError::Database(_)
                | ReviewServiceError::Stats(StatsError::Database(_))
                | ReviewServiceError::Timeout(_) => (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Failed to process review request".to_string(),
                ),
            },
        };

        (status, ResponseJson(ErrorBody::new(message))).into_response()
    }
}
