pub mod review_stats;
pub mod reviews;
