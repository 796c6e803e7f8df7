use sqlx::PgPool;

use crate::config::Config;

/// Shared application state handed to every route handler.
#[derive(Clone)]
pub struct AppState {
    pub db_pool: PgPool,
    pub config: std::sync::Arc<Config>,
}

impl AppState {
    pub fn new(db_pool: PgPool, config: Config) -> Self {
        Self {
            db_pool,
            config: std::sync::Arc::new(config),
        }
    }
}
