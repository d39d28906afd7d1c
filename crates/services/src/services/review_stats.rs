//! Derives the rating statistics shown next to the testimonials and keeps the
//! stored snapshot in line with the review table.

use db::models::{
    review::Review,
    review_stats::{FeaturedAvatar, ReviewStats},
};
use sqlx::SqliteConnection;
use thiserror::Error;
use tracing::debug;

/// Lowest rating that counts as a satisfied customer and gets the avatar featured.
pub const SATISFIED_RATING: i32 = 4;

#[derive(Debug, Error)]
pub enum StatsError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("no statistics snapshot exists; the database was not seeded")]
    NoSnapshot,
}

/// Statistics derived purely from the review collection.
#[derive(Debug, Clone, PartialEq)]
pub struct DerivedStats {
    pub average_rating: f64,
    pub customer_satisfaction: i64,
    pub featured_avatars: Vec<String>,
}

/// `numerator / denominator` rounded half up to a whole number. Both are
/// non-negative, so this matches rounding half away from zero.
fn div_round_half_up(numerator: i64, denominator: i64) -> i64 {
    (2 * numerator + denominator) / (2 * denominator)
}

/// Compute the derived statistics for `reviews`, in any input order.
///
/// Featured avatars come from satisfied reviews ordered by review date, newest
/// first; an avatar shared by several reviews is listed once.
pub fn compute_stats(reviews: &[Review]) -> DerivedStats {
    if reviews.is_empty() {
        return DerivedStats {
            average_rating: 0.0,
            customer_satisfaction: 0,
            featured_avatars: Vec::new(),
        };
    }

    let total = reviews.len() as i64;
    let rating_sum: i64 = reviews.iter().map(|r| i64::from(r.rating)).sum();
    let satisfied = reviews
        .iter()
        .filter(|r| r.rating >= SATISFIED_RATING)
        .count() as i64;

    let mut by_recency: Vec<&Review> = reviews.iter().collect();
    by_recency.sort_by(|a, b| b.date.cmp(&a.date).then(b.id.cmp(&a.id)));

    let mut featured_avatars: Vec<String> = Vec::new();
    for review in by_recency
        .into_iter()
        .filter(|r| r.rating >= SATISFIED_RATING)
    {
        if !featured_avatars.contains(&review.avatar_src) {
            featured_avatars.push(review.avatar_src.clone());
        }
    }

    DerivedStats {
        // Rounded in hundredths so a mean like 1.005 lands on 1.01.
        average_rating: div_round_half_up(rating_sum * 100, total) as f64 / 100.0,
        customer_satisfaction: div_round_half_up(satisfied * 100, total),
        featured_avatars,
    }
}

pub struct ReviewStatsService;

impl ReviewStatsService {
    /// Rewrite the derived fields and featured avatars of the current snapshot
    /// from the reviews visible on `conn`.
    ///
    /// Meant to run inside the same transaction as the review mutation that
    /// triggered it. Business-entered figures are left untouched.
    pub async fn recompute(conn: &mut SqliteConnection) -> Result<DerivedStats, StatsError> {
        let reviews = Review::find_all(&mut *conn).await?;
        let derived = compute_stats(&reviews);

        let stats = ReviewStats::find_current(&mut *conn)
            .await?
            .ok_or(StatsError::NoSnapshot)?;

        let updated = ReviewStats::update_derived(
            &mut *conn,
            stats.id,
            derived.average_rating,
            derived.customer_satisfaction,
        )
        .await?;
        if updated == 0 {
            return Err(StatsError::NoSnapshot);
        }

        FeaturedAvatar::delete_by_stats_id(&mut *conn, stats.id).await?;
        for (display_order, avatar_src) in derived.featured_avatars.iter().enumerate() {
            FeaturedAvatar::create(&mut *conn, stats.id, avatar_src, display_order as i64).await?;
        }

        debug!(
            stats_id = stats.id,
            reviews = reviews.len(),
            average_rating = derived.average_rating,
            customer_satisfaction = derived.customer_satisfaction,
            featured = derived.featured_avatars.len(),
            "Recomputed review statistics"
        );

        Ok(derived)
    }
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use super::*;

    fn review(id: i64, rating: i32, date: &str, avatar: &str) -> Review {
        Review {
            id,
            name: format!("customer {id}"),
            location: "Denver".to_string(),
            avatar_src: avatar.to_string(),
            rating,
            date: NaiveDate::parse_from_str(date, "%Y-%m-%d").unwrap(),
            content: "Fast and tidy.".to_string(),
        }
    }

    #[test]
    fn test_empty_collection_is_all_zero() {
        let derived = compute_stats(&[]);
        assert_eq!(derived.average_rating, 0.0);
        assert_eq!(derived.customer_satisfaction, 0);
        assert!(derived.featured_avatars.is_empty());
    }

    #[test]
    fn test_average_and_satisfaction_rounding() {
        let reviews = [
            review(1, 5, "2024-01-01", "/1.jpg"),
            review(2, 3, "2024-02-01", "/2.jpg"),
            review(3, 5, "2024-03-01", "/3.jpg"),
        ];
        let derived = compute_stats(&reviews);
        assert_eq!(derived.average_rating, 4.33);
        assert_eq!(derived.customer_satisfaction, 67);
    }

    #[test]
    fn test_featured_avatars_newest_first_and_satisfied_only() {
        let reviews = [
            review(1, 4, "2023-06-01", "/old.jpg"),
            review(2, 2, "2024-06-01", "/unhappy.jpg"),
            review(3, 5, "2024-01-01", "/new.jpg"),
        ];
        let derived = compute_stats(&reviews);
        assert_eq!(derived.featured_avatars, vec!["/new.jpg", "/old.jpg"]);
    }

    #[test]
    fn test_same_day_reviews_order_by_id_and_shared_avatar_listed_once() {
        let reviews = [
            review(1, 5, "2024-05-05", "/shared.jpg"),
            review(2, 5, "2024-05-05", "/two.jpg"),
            review(3, 4, "2024-01-01", "/shared.jpg"),
        ];
        let derived = compute_stats(&reviews);
        assert_eq!(derived.featured_avatars, vec!["/two.jpg", "/shared.jpg"]);
    }

    #[test]
    fn test_half_percent_rounds_up() {
        // 1 of 8 satisfied is 12.5%
        let mut reviews = vec![review(1, 5, "2024-01-01", "/a.jpg")];
        reviews.extend((2..=8).map(|id| review(id, 1, "2024-01-01", "/b.jpg")));
        let derived = compute_stats(&reviews);
        assert_eq!(derived.customer_satisfaction, 13);
        assert_eq!(derived.average_rating, 1.5);
    }

    #[test]
    fn test_average_half_hundredth_rounds_up() {
        // 201 / 200 = 1.005
        let mut reviews: Vec<Review> = (1..=199)
            .map(|id| review(id, 1, "2024-01-01", "/a.jpg"))
            .collect();
        reviews.push(review(200, 2, "2024-01-01", "/b.jpg"));
        assert_eq!(compute_stats(&reviews).average_rating, 1.01);

        // 161 / 40 = 4.025
        let mut reviews: Vec<Review> = (1..=39)
            .map(|id| review(id, 4, "2024-01-01", "/a.jpg"))
            .collect();
        reviews.push(review(40, 5, "2024-01-01", "/b.jpg"));
        let derived = compute_stats(&reviews);
        assert_eq!(derived.average_rating, 4.03);
        assert_eq!(derived.customer_satisfaction, 100);
    }
}
