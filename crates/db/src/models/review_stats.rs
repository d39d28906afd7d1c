use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{Executor, FromRow, Sqlite};
use ts_rs::TS;

use super::review::Review;

/// Stored statistics snapshot. Business figures are entered by hand; the rating
/// fields are derived from the review table.
#[derive(Debug, Clone, FromRow, PartialEq)]
pub struct ReviewStats {
    pub id: i64,
    pub total_projects: i64,
    pub years_in_business: i64,
    pub service_areas: i64,
    pub average_rating: f64,
    pub customer_satisfaction: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, FromRow, PartialEq)]
pub struct FeaturedAvatar {
    pub stats_id: i64,
    pub avatar_src: String,
    pub display_order: i64,
}

/// Request body for the hand-entered business figures
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, TS)]
#[serde(rename_all = "camelCase")]
pub struct UpdateStatsSettings {
    #[ts(type = "number")]
    pub total_projects: i64,
    #[ts(type = "number")]
    pub years_in_business: i64,
    #[ts(type = "number")]
    pub service_areas: i64,
}

/// Statistics as shown on the public site
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, TS)]
#[serde(rename_all = "camelCase")]
pub struct StatsView {
    #[ts(type = "number")]
    pub total_projects: i64,
    #[ts(type = "number")]
    pub years_in_business: i64,
    #[ts(type = "number")]
    pub service_areas: i64,
    pub average_rating: f64,
    #[ts(type = "number")]
    pub customer_satisfaction: i64,
    pub featured_avatars: Vec<String>,
}

impl StatsView {
    pub fn new(stats: &ReviewStats, featured: Vec<FeaturedAvatar>) -> Self {
        Self {
            total_projects: stats.total_projects,
            years_in_business: stats.years_in_business,
            service_areas: stats.service_areas,
            average_rating: stats.average_rating,
            customer_satisfaction: stats.customer_satisfaction,
            featured_avatars: featured.into_iter().map(|a| a.avatar_src).collect(),
        }
    }
}

/// Statistics plus every testimonial, most recent first
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, TS)]
pub struct AggregateView {
    pub stats: StatsView,
    pub testimonials: Vec<Review>,
}

impl ReviewStats {
    /// The authoritative snapshot: the most recently created row.
    pub async fn find_current<'e, E>(executor: E) -> Result<Option<Self>, sqlx::Error>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        sqlx::query_as!(
            ReviewStats,
            r#"SELECT id                    as "id!: i64",
                      total_projects        as "total_projects!: i64",
                      years_in_business     as "years_in_business!: i64",
                      service_areas         as "service_areas!: i64",
                      average_rating        as "average_rating!: f64",
                      customer_satisfaction as "customer_satisfaction!: i64",
                      created_at            as "created_at!: DateTime<Utc>",
                      updated_at            as "updated_at!: DateTime<Utc>"
               FROM review_stats
               ORDER BY created_at DESC, id DESC
               LIMIT 1"#
        )
        .fetch_optional(executor)
        .await
    }

    pub async fn update_derived<'e, E>(
        executor: E,
        id: i64,
        average_rating: f64,
        customer_satisfaction: i64,
    ) -> Result<u64, sqlx::Error>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        let result = sqlx::query!(
            r#"UPDATE review_stats
               SET average_rating = $2,
                   customer_satisfaction = $3,
                   updated_at = datetime('now', 'subsec')
               WHERE id = $1"#,
            id,
            average_rating,
            customer_satisfaction
        )
        .execute(executor)
        .await?;
        Ok(result.rows_affected())
    }

    /// Writes the hand-entered figures onto the current snapshot in a single
    /// statement. Returns the number of rows touched (0 when no snapshot exists).
    pub async fn update_current_settings<'e, E>(
        executor: E,
        settings: &UpdateStatsSettings,
    ) -> Result<u64, sqlx::Error>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        let result = sqlx::query!(
            r#"UPDATE review_stats
               SET total_projects = $1,
                   years_in_business = $2,
                   service_areas = $3,
                   updated_at = datetime('now', 'subsec')
               WHERE id = (
                   SELECT id FROM review_stats
                   ORDER BY created_at DESC, id DESC
                   LIMIT 1
               )"#,
            settings.total_projects,
            settings.years_in_business,
            settings.service_areas
        )
        .execute(executor)
        .await?;
        Ok(result.rows_affected())
    }
}

impl FeaturedAvatar {
    pub async fn find_by_stats_id<'e, E>(executor: E, stats_id: i64) -> Result<Vec<Self>, sqlx::Error>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        sqlx::query_as!(
            FeaturedAvatar,
            r#"SELECT stats_id      as "stats_id!: i64",
                      avatar_src,
                      display_order as "display_order!: i64"
               FROM featured_avatars
               WHERE stats_id = $1
               ORDER BY display_order ASC"#,
            stats_id
        )
        .fetch_all(executor)
        .await
    }

    pub async fn delete_by_stats_id<'e, E>(executor: E, stats_id: i64) -> Result<u64, sqlx::Error>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        let result = sqlx::query!("DELETE FROM featured_avatars WHERE stats_id = $1", stats_id)
            .execute(executor)
            .await?;
        Ok(result.rows_affected())
    }

    pub async fn create<'e, E>(
        executor: E,
        stats_id: i64,
        avatar_src: &str,
        display_order: i64,
    ) -> Result<(), sqlx::Error>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        sqlx::query!(
            r#"INSERT INTO featured_avatars (stats_id, avatar_src, display_order)
               VALUES ($1, $2, $3)"#,
            stats_id,
            avatar_src,
            display_order
        )
        .execute(executor)
        .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::test_db;

    #[tokio::test]
    async fn test_migration_seeds_single_snapshot() {
        let t = test_db().await;
        let stats = ReviewStats::find_current(&t.db.pool).await.unwrap().unwrap();
        assert_eq!(stats.average_rating, 0.0);
        assert_eq!(stats.customer_satisfaction, 0);
        assert_eq!(stats.total_projects, 0);
    }

    #[tokio::test]
    async fn test_update_derived_leaves_business_figures() {
        let t = test_db().await;
        let stats = ReviewStats::find_current(&t.db.pool).await.unwrap().unwrap();
        let settings = UpdateStatsSettings {
            total_projects: 250,
            years_in_business: 12,
            service_areas: 8,
        };
        let rows = ReviewStats::update_current_settings(&t.db.pool, &settings)
            .await
            .unwrap();
        assert_eq!(rows, 1);
        let rows = ReviewStats::update_derived(&t.db.pool, stats.id, 4.33, 67)
            .await
            .unwrap();
        assert_eq!(rows, 1);

        let stats = ReviewStats::find_current(&t.db.pool).await.unwrap().unwrap();
        assert_eq!(stats.total_projects, 250);
        assert_eq!(stats.years_in_business, 12);
        assert_eq!(stats.service_areas, 8);
        assert_eq!(stats.average_rating, 4.33);
        assert_eq!(stats.customer_satisfaction, 67);
    }

    #[tokio::test]
    async fn test_featured_avatars_replace() {
        let t = test_db().await;
        let stats = ReviewStats::find_current(&t.db.pool).await.unwrap().unwrap();
        for (i, src) in ["/a.jpg", "/b.jpg"].iter().enumerate() {
            FeaturedAvatar::create(&t.db.pool, stats.id, src, i as i64)
                .await
                .unwrap();
        }
        let removed = FeaturedAvatar::delete_by_stats_id(&t.db.pool, stats.id)
            .await
            .unwrap();
        assert_eq!(removed, 2);

        FeaturedAvatar::create(&t.db.pool, stats.id, "/c.jpg", 0)
            .await
            .unwrap();
        let view = StatsView::new(
            &stats,
            FeaturedAvatar::find_by_stats_id(&t.db.pool, stats.id)
                .await
                .unwrap(),
        );
        assert_eq!(view.featured_avatars, vec!["/c.jpg".to_string()]);
    }

    #[test]
    fn test_aggregate_view_json_shape() {
        let view = AggregateView {
            stats: StatsView {
                total_projects: 1,
                years_in_business: 2,
                service_areas: 3,
                average_rating: 4.5,
                customer_satisfaction: 100,
                featured_avatars: vec!["/a.jpg".to_string()],
            },
            testimonials: vec![],
        };
        let json = serde_json::to_value(&view).unwrap();
        assert_eq!(json["stats"]["totalProjects"], 1);
        assert_eq!(json["stats"]["averageRating"], 4.5);
        assert_eq!(json["stats"]["featuredAvatars"][0], "/a.jpg");
        assert!(json["testimonials"].as_array().unwrap().is_empty());
    }
}
