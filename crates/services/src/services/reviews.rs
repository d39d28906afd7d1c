//! Review CRUD with the derived statistics kept in step.
//!
//! Every mutation runs as one transaction: write the review, recompute the
//! statistics, read back the aggregate view, commit. Any failure drops the
//! transaction, which rolls all of it back.

use std::{future::Future, time::Duration};

use db::models::{
    review::{CreateReview, Review},
    review_stats::{AggregateView, FeaturedAvatar, ReviewStats, StatsView, UpdateStatsSettings},
};
use sqlx::{SqliteConnection, SqlitePool};
use thiserror::Error;
use tracing::{debug, error, info};

use super::review_stats::{ReviewStatsService, StatsError};

pub const MIN_RATING: i32 = 1;
pub const MAX_RATING: i32 = 5;

#[derive(Debug, Error)]
pub enum ReviewServiceError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error(transparent)]
    Stats(#[from] StatsError),
    #[error("{0}")]
    Validation(String),
    #[error("review {0} not found")]
    NotFound(i64),
    #[error("no review statistics available")]
    NoData,
    #[error("operation timed out after {0:?}")]
    Timeout(Duration),
}

impl ReviewServiceError {
    /// Caller mistakes, as opposed to failures of the service itself.
    pub fn is_client_error(&self) -> bool {
        matches!(self, Self::Validation(_) | Self::NotFound(_))
    }
}

/// Reject out-of-range ratings and blank text fields before touching the store.
pub fn validate_review(data: &CreateReview) -> Result<(), ReviewServiceError> {
    if !(MIN_RATING..=MAX_RATING).contains(&data.rating) {
        return Err(ReviewServiceError::Validation(format!(
            "rating must be between {MIN_RATING} and {MAX_RATING}, got {}",
            data.rating
        )));
    }

    let required = [
        ("name", &data.name),
        ("location", &data.location),
        ("avatarSrc", &data.avatar_src),
        ("content", &data.content),
    ];
    if let Some((field, _)) = required.iter().find(|(_, value)| value.trim().is_empty()) {
        return Err(ReviewServiceError::Validation(format!("{field} is required")));
    }

    Ok(())
}

fn validate_settings(settings: &UpdateStatsSettings) -> Result<(), ReviewServiceError> {
    let fields = [
        ("totalProjects", settings.total_projects),
        ("yearsInBusiness", settings.years_in_business),
        ("serviceAreas", settings.service_areas),
    ];
    match fields.iter().find(|(_, value)| *value < 0) {
        Some((field, _)) => Err(ReviewServiceError::Validation(format!(
            "{field} must not be negative"
        ))),
        None => Ok(()),
    }
}

async fn load_aggregate_view(
    conn: &mut SqliteConnection,
) -> Result<AggregateView, ReviewServiceError> {
    let stats = ReviewStats::find_current(&mut *conn)
        .await?
        .ok_or(ReviewServiceError::NoData)?;
    let featured = FeaturedAvatar::find_by_stats_id(&mut *conn, stats.id).await?;
    let testimonials = Review::find_all(&mut *conn).await?;

    Ok(AggregateView {
        stats: StatsView::new(&stats, featured),
        testimonials,
    })
}

fn log_failure(operation: &str, err: &ReviewServiceError) {
    if err.is_client_error() {
        debug!(operation, error = %err, "Review request rejected");
    } else {
        error!(operation, error = %err, "Review operation failed; changes rolled back");
    }
}

#[derive(Clone)]
pub struct ReviewService {
    pool: SqlitePool,
    operation_timeout: Duration,
}

impl ReviewService {
    pub fn new(pool: SqlitePool, operation_timeout: Duration) -> Self {
        Self {
            pool,
            operation_timeout,
        }
    }

    /// Run `operation` under the configured deadline. On expiry the future is
    /// dropped together with any open transaction, so nothing is committed.
    async fn bounded<T, F>(&self, operation: &str, fut: F) -> Result<T, ReviewServiceError>
    where
        F: Future<Output = Result<T, ReviewServiceError>>,
    {
        let result = match tokio::time::timeout(self.operation_timeout, fut).await {
            Ok(result) => result,
            Err(_) => Err(ReviewServiceError::Timeout(self.operation_timeout)),
        };
        if let Err(err) = &result {
            log_failure(operation, err);
        }
        result
    }

    /// Current statistics and every review.
    pub async fn get_aggregate_view(&self) -> Result<AggregateView, ReviewServiceError> {
        self.bounded("get_aggregate_view", async {
            let mut tx = self.pool.begin().await?;
            let view = load_aggregate_view(&mut tx).await?;
            tx.commit().await?;
            Ok::<_, ReviewServiceError>(view)
        })
        .await
    }

    pub async fn get_review_by_id(&self, id: i64) -> Result<Review, ReviewServiceError> {
        self.bounded("get_review_by_id", async {
            Review::find_by_id(&self.pool, id)
                .await?
                .ok_or(ReviewServiceError::NotFound(id))
        })
        .await
    }

    pub async fn create_review(
        &self,
        data: &CreateReview,
    ) -> Result<AggregateView, ReviewServiceError> {
        if let Err(err) = validate_review(data) {
            log_failure("create_review", &err);
            return Err(err);
        }

        self.bounded("create_review", async {
            let mut tx = self.pool.begin().await?;
            let review = Review::create(&mut *tx, data).await?;
            let derived = ReviewStatsService::recompute(&mut tx).await?;
            let view = load_aggregate_view(&mut tx).await?;
            tx.commit().await?;

            info!(
                review_id = review.id,
                rating = review.rating,
                average_rating = derived.average_rating,
                "Review created"
            );
            Ok::<_, ReviewServiceError>(view)
        })
        .await
    }

    pub async fn update_review(
        &self,
        id: i64,
        data: &CreateReview,
    ) -> Result<AggregateView, ReviewServiceError> {
        if let Err(err) = validate_review(data) {
            log_failure("update_review", &err);
            return Err(err);
        }

        self.bounded("update_review", async {
            let mut tx = self.pool.begin().await?;
            let review = Review::update(&mut *tx, id, data)
                .await?
                .ok_or(ReviewServiceError::NotFound(id))?;
            let derived = ReviewStatsService::recompute(&mut tx).await?;
            let view = load_aggregate_view(&mut tx).await?;
            tx.commit().await?;

            info!(
                review_id = review.id,
                rating = review.rating,
                average_rating = derived.average_rating,
                "Review updated"
            );
            Ok::<_, ReviewServiceError>(view)
        })
        .await
    }

    pub async fn delete_review(&self, id: i64) -> Result<AggregateView, ReviewServiceError> {
        self.bounded("delete_review", async {
            let mut tx = self.pool.begin().await?;
            if Review::delete(&mut *tx, id).await? == 0 {
                return Err(ReviewServiceError::NotFound(id));
            }
            let derived = ReviewStatsService::recompute(&mut tx).await?;
            let view = load_aggregate_view(&mut tx).await?;
            tx.commit().await?;

            info!(
                review_id = id,
                average_rating = derived.average_rating,
                "Review deleted"
            );
            Ok::<_, ReviewServiceError>(view)
        })
        .await
    }

    /// Set the hand-entered business figures on the current snapshot.
    pub async fn update_stats_settings(
        &self,
        settings: &UpdateStatsSettings,
    ) -> Result<AggregateView, ReviewServiceError> {
        if let Err(err) = validate_settings(settings) {
            log_failure("update_stats_settings", &err);
            return Err(err);
        }

        self.bounded("update_stats_settings", async {
            let mut tx = self.pool.begin().await?;
            if ReviewStats::update_current_settings(&mut *tx, settings).await? == 0 {
                return Err(ReviewServiceError::NoData);
            }
            let view = load_aggregate_view(&mut tx).await?;
            tx.commit().await?;

            info!(
                total_projects = settings.total_projects,
                years_in_business = settings.years_in_business,
                service_areas = settings.service_areas,
                "Statistics settings updated"
            );
            Ok::<_, ReviewServiceError>(view)
        })
        .await
    }
}
