use std::sync::Arc;

use tracing::{info, warn};

use super::{
    config::Config,
    database::{RedisStore, init_redis},
    error::AppError,
    store::{MemoryStore, RecipeStore},
};

pub const MEMORY_URL: &str = "memory://";

pub struct State {
    pub config: Config,
    pub store: Arc<dyn RecipeStore>,
}

impl State {
    pub async fn new(config: Config) -> Result<Arc<Self>, AppError> {
        let store: Arc<dyn RecipeStore> = if config.database_url == MEMORY_URL {
            warn!("Using the in-memory store, recipes will not survive a restart");
            Arc::new(MemoryStore::new())
        } else {
            info!("Connecting to {}", config.database_url);
            let connection = init_redis(&config.database_url).await?;
            Arc::new(RedisStore::new(connection, &config.database_name))
        };

        Ok(Self::with_store(config, store))
    }

    pub fn with_store(config: Config, store: Arc<dyn RecipeStore>) -> Arc<Self> {
        Arc::new(Self { config, store })
    }
}
