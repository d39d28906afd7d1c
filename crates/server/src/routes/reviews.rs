use axum::{
    Extension, Json, Router,
    extract::{
        Query, State,
        rejection::{JsonRejection, QueryRejection},
    },
    middleware::from_fn_with_state,
    response::{IntoResponse, Json as ResponseJson, Response},
    routing::{delete, get, post, put},
};
use db::models::{
    review::{CreateReview, UpdateReview},
    review_stats::{AggregateView, UpdateStatsSettings},
};
use serde::Deserialize;
use tracing::info;
use utils::jwt::AdminClaims;

use crate::{AppState, error::ApiError, middleware::require_admin};

/// `?id=` as sent by the site; kept as text so a malformed id is a 400 with
/// our own message rather than an extractor rejection.
#[derive(Debug, Deserialize)]
pub struct ReviewIdQuery {
    pub id: Option<String>,
}

/// Review ids are positive integers.
pub fn parse_review_id(raw: &str) -> Result<i64, ApiError> {
    match raw.trim().parse::<i64>() {
        Ok(id) if id > 0 => Ok(id),
        _ => Err(ApiError::BadRequest(format!("invalid review id: {raw:?}"))),
    }
}

fn required_id(query: &ReviewIdQuery) -> Result<i64, ApiError> {
    match query.id.as_deref() {
        Some(raw) => parse_review_id(raw),
        None => Err(ApiError::BadRequest("review id is required".to_string())),
    }
}

/// GET /reviews, or GET /reviews?id={n} for a single review
pub async fn get_reviews(
    State(state): State<AppState>,
    query: Result<Query<ReviewIdQuery>, QueryRejection>,
) -> Result<Response, ApiError> {
    let Query(query) = query?;
    match query.id.as_deref() {
        Some(raw) => {
            let id = parse_review_id(raw)?;
            let review = state.reviews.get_review_by_id(id).await?;
            Ok(ResponseJson(review).into_response())
        }
        None => {
            let view = state.reviews.get_aggregate_view().await?;
            Ok(ResponseJson(view).into_response())
        }
    }
}

/// POST /reviews
pub async fn create_review(
    State(state): State<AppState>,
    Extension(admin): Extension<AdminClaims>,
    payload: Result<Json<CreateReview>, JsonRejection>,
) -> Result<ResponseJson<AggregateView>, ApiError> {
    let Json(payload) = payload?;
    let view = state.reviews.create_review(&payload).await?;
    info!(admin = %admin.sub, name = %payload.name, "Admin created review");
    Ok(ResponseJson(view))
}

/// PUT /reviews
pub async fn update_review(
    State(state): State<AppState>,
    Extension(admin): Extension<AdminClaims>,
    payload: Result<Json<UpdateReview>, JsonRejection>,
) -> Result<ResponseJson<AggregateView>, ApiError> {
    let Json(payload) = payload?;
    let id = match payload.id {
        Some(id) if id > 0 => id,
        Some(id) => return Err(ApiError::BadRequest(format!("invalid review id: {id}"))),
        None => return Err(ApiError::BadRequest("review id is required".to_string())),
    };
    let view = state.reviews.update_review(id, &payload.fields).await?;
    info!(admin = %admin.sub, review_id = id, "Admin updated review");
    Ok(ResponseJson(view))
}

/// DELETE /reviews?id={n}
pub async fn delete_review(
    State(state): State<AppState>,
    Extension(admin): Extension<AdminClaims>,
    query: Result<Query<ReviewIdQuery>, QueryRejection>,
) -> Result<ResponseJson<AggregateView>, ApiError> {
    let Query(query) = query?;
    let id = required_id(&query)?;
    let view = state.reviews.delete_review(id).await?;
    info!(admin = %admin.sub, review_id = id, "Admin deleted review");
    Ok(ResponseJson(view))
}

/// PUT /reviews/stats
pub async fn update_stats_settings(
    State(state): State<AppState>,
    Extension(admin): Extension<AdminClaims>,
    payload: Result<Json<UpdateStatsSettings>, JsonRejection>,
) -> Result<ResponseJson<AggregateView>, ApiError> {
    let Json(payload) = payload?;
    let view = state.reviews.update_stats_settings(&payload).await?;
    info!(admin = %admin.sub, "Admin updated statistics settings");
    Ok(ResponseJson(view))
}

pub fn router(state: &AppState) -> Router<AppState> {
    let admin = from_fn_with_state(state.clone(), require_admin);

    Router::new()
        .route(
            "/reviews",
            get(get_reviews).merge(
                post(create_review)
                    .merge(put(update_review))
                    .merge(delete(delete_review))
                    .route_layer(admin.clone()),
            ),
        )
        .route(
            "/reviews/stats",
            put(update_stats_settings).route_layer(admin),
        )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_review_id() {
        assert_eq!(parse_review_id("42").unwrap(), 42);
        assert_eq!(parse_review_id(" 7 ").unwrap(), 7);
        assert!(matches!(parse_review_id("0"), Err(ApiError::BadRequest(_))));
        assert!(matches!(parse_review_id("-3"), Err(ApiError::BadRequest(_))));
        assert!(matches!(parse_review_id("abc"), Err(ApiError::BadRequest(_))));
        assert!(matches!(parse_review_id(""), Err(ApiError::BadRequest(_))));
    }

    #[test]
    fn test_delete_requires_id() {
        let err = required_id(&ReviewIdQuery { id: None }).unwrap_err();
        assert!(matches!(err, ApiError::BadRequest(msg) if msg == "review id is required"));
    }
}
