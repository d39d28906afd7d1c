use chrono::{DateTime, NaiveDate};
use serde::{Deserialize, Deserializer, Serialize, de};
use sqlx::{Executor, FromRow, Sqlite};
use ts_rs::TS;

/// A customer testimonial.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize, PartialEq, TS)]
#[serde(rename_all = "camelCase")]
pub struct Review {
    #[ts(type = "number")]
    pub id: i64,
    pub name: String,
    pub location: String,
    pub avatar_src: String,
    pub rating: i32,
    pub date: NaiveDate,
    pub content: String,
}

/// Request body for submitting a review
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, TS)]
#[serde(rename_all = "camelCase")]
pub struct CreateReview {
    pub name: String,
    pub location: String,
    pub avatar_src: String,
    pub rating: i32,
    #[serde(deserialize_with = "deserialize_review_date")]
    pub date: NaiveDate,
    pub content: String,
}

/// Request body for editing a review. `id` is optional so a missing id can be
/// reported as a validation failure instead of a decode failure.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
pub struct UpdateReview {
    #[ts(type = "number | null")]
    pub id: Option<i64>,
    #[serde(flatten)]
    #[ts(flatten)]
    pub fields: CreateReview,
}

/// Accepts a plain `YYYY-MM-DD` date or a full RFC 3339 timestamp.
pub fn parse_review_date(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .or_else(|| DateTime::parse_from_rfc3339(raw).ok().map(|dt| dt.date_naive()))
}

fn deserialize_review_date<'de, D>(deserializer: D) -> Result<NaiveDate, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    parse_review_date(&raw).ok_or_else(|| de::Error::custom(format!("invalid review date `{raw}`")))
}

impl Review {
    pub async fn find_by_id<'e, E>(executor: E, id: i64) -> Result<Option<Self>, sqlx::Error>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        sqlx::query_as!(
            Review,
            r#"SELECT id          as "id!: i64",
                      name,
                      location,
                      avatar_src,
                      rating      as "rating!: i32",
                      review_date as "date!: NaiveDate",
                      content
               FROM reviews
               WHERE id = $1"#,
            id
        )
        .fetch_optional(executor)
        .await
    }

    /// All reviews, most recent review date first.
    pub async fn find_all<'e, E>(executor: E) -> Result<Vec<Self>, sqlx::Error>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        sqlx::query_as!(
            Review,
            r#"SELECT id          as "id!: i64",
                      name,
                      location,
                      avatar_src,
                      rating      as "rating!: i32",
                      review_date as "date!: NaiveDate",
                      content
               FROM reviews
               ORDER BY review_date DESC, id DESC"#
        )
        .fetch_all(executor)
        .await
    }

    pub async fn create<'e, E>(executor: E, data: &CreateReview) -> Result<Self, sqlx::Error>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        sqlx::query_as!(
            Review,
            r#"INSERT INTO reviews (name, location, avatar_src, rating, review_date, content)
               VALUES ($1, $2, $3, $4, $5, $6)
               RETURNING id          as "id!: i64",
                         name        as "name!",
                         location    as "location!",
                         avatar_src  as "avatar_src!",
                         rating      as "rating!: i32",
                         review_date as "date!: NaiveDate",
                         content     as "content!""#,
            data.name,
            data.location,
            data.avatar_src,
            data.rating,
            data.date,
            data.content
        )
        .fetch_one(executor)
        .await
    }

    /// Returns `None` when no review has the given id.
    pub async fn update<'e, E>(
        executor: E,
        id: i64,
        data: &CreateReview,
    ) -> Result<Option<Self>, sqlx::Error>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        sqlx::query_as!(
            Review,
            r#"UPDATE reviews
               SET name = $2,
                   location = $3,
                   avatar_src = $4,
                   rating = $5,
                   review_date = $6,
                   content = $7,
                   updated_at = datetime('now', 'subsec')
               WHERE id = $1
               RETURNING id          as "id!: i64",
                         name        as "name!",
                         location    as "location!",
                         avatar_src  as "avatar_src!",
                         rating      as "rating!: i32",
                         review_date as "date!: NaiveDate",
                         content     as "content!""#,
            id,
            data.name,
            data.location,
            data.avatar_src,
            data.rating,
            data.date,
            data.content
        )
        .fetch_optional(executor)
        .await
    }

    pub async fn delete<'e, E>(executor: E, id: i64) -> Result<u64, sqlx::Error>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        let result = sqlx::query!("DELETE FROM reviews WHERE id = $1", id)
            .execute(executor)
            .await?;
        Ok(result.rows_affected())
    }
}
