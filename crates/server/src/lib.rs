use std::sync::Arc;

use db::DBService;
use services::services::reviews::ReviewService;

pub mod config;
pub mod error;
pub mod middleware;
pub mod routes;

use config::ServerConfig;

#[derive(Clone)]
pub struct AppState {
    pub db: DBService,
    pub reviews: ReviewService,
    pub config: Arc<ServerConfig>,
}

impl AppState {
    pub fn new(db: DBService, config: ServerConfig) -> Self {
        let reviews = ReviewService::new(db.pool.clone(), config.operation_timeout);
        Self {
            db,
            reviews,
            config: Arc::new(config),
        }
    }
}
