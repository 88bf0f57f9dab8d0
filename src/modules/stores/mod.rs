//! Backend implementations of [`ProximityStore`]

mod mongo;
mod postgis;
mod redis;
mod redis_index;

use std::sync::Arc;

pub use mongo::MongoStore;
pub use postgis::PostgisStore;
pub use redis::RedisStore;

use crate::core::config::StoreConfig;
use crate::core::database;
use crate::core::error::{AppError, Result};
use crate::features::geo::models::Backend;
use crate::features::geo::store::ProximityStore;

/// Connected stores, one per configured backend
#[derive(Default)]
pub struct StoreSet {
    postgis: Option<Arc<PostgisStore>>,
    mongo: Option<Arc<MongoStore>>,
    redis: Option<Arc<RedisStore>>,
}

impl StoreSet {
    /// Connect every configured backend in `selected`, running PostGIS
    /// migrations and creating Mongo indexes on the way
    pub async fn connect(config: &StoreConfig, selected: &[Backend]) -> Result<Self> {
        let mut stores = Self::default();

        for backend in selected {
            match backend {
                Backend::Postgis => {
                    let db_config = config.postgis.as_ref().ok_or_else(|| not_configured(*backend))?;
                    let pool = database::create_pool(db_config).await?;
                    tracing::info!("PostGIS connection pool created");

                    tracing::info!("Running database migrations...");
                    sqlx::migrate!("./migrations")
                        .run(&pool)
                        .await
                        .map_err(|e| AppError::Internal(format!("Migration failed: {}", e)))?;
                    tracing::info!("Database migrations completed successfully");

                    stores.postgis = Some(Arc::new(PostgisStore::new(pool)));
                }
                Backend::Mongo => {
                    let mongo_config = config.mongo.as_ref().ok_or_else(|| not_configured(*backend))?;
                    let db = database::connect_mongo(mongo_config).await?;
                    let store = MongoStore::new(db);
                    store.ensure_indexes().await?;
                    tracing::info!("MongoDB database '{}' ready", mongo_config.database);

                    stores.mongo = Some(Arc::new(store));
                }
                Backend::Redis => {
                    let redis_config = config.redis.as_ref().ok_or_else(|| not_configured(*backend))?;
                    let pool = database::create_redis_pool(redis_config).await?;
                    tracing::info!(
                        "Redis pool created (max {} connections)",
                        redis_config.max_connections
                    );

                    stores.redis = Some(Arc::new(RedisStore::new(pool)));
                }
            }
        }

        Ok(stores)
    }

    pub fn get(&self, backend: Backend) -> Option<Arc<dyn ProximityStore>> {
        match backend {
            Backend::Postgis => self
                .postgis
                .clone()
                .map(|store| store as Arc<dyn ProximityStore>),
            Backend::Mongo => self
                .mongo
                .clone()
                .map(|store| store as Arc<dyn ProximityStore>),
            Backend::Redis => self
                .redis
                .clone()
                .map(|store| store as Arc<dyn ProximityStore>),
        }
    }

    /// The Redis store with its index-only operations
    pub fn redis(&self) -> Option<Arc<RedisStore>> {
        self.redis.clone()
    }
}

fn not_configured(backend: Backend) -> AppError {
    AppError::Misconfiguration(format!("Backend '{}' is not configured", backend))
}
