use crate::core::config::{DatabaseConfig, MongoConfig, RedisConfig};
use bb8_redis::{bb8, redis::RedisError, RedisConnectionManager};
use sqlx::{postgres::PgPoolOptions, PgPool};
use std::time::Duration;

/// Pooled multiplexed Redis connections
pub type RedisPool = bb8::Pool<RedisConnectionManager>;

pub async fn create_pool(config: &DatabaseConfig) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(config.max_connections)
        .min_connections(config.min_connections)
        .acquire_timeout(Duration::from_secs(config.acquire_timeout_secs))
        .idle_timeout(Duration::from_secs(config.idle_timeout_secs))
        .max_lifetime(Duration::from_secs(config.max_lifetime_secs))
        .connect(&config.url)
        .await
}

pub async fn connect_mongo(
    config: &MongoConfig,
) -> Result<mongodb::Database, mongodb::error::Error> {
    let client = mongodb::Client::with_uri_str(&config.url).await?;
    Ok(client.database(&config.database))
}

pub async fn create_redis_pool(config: &RedisConfig) -> Result<RedisPool, RedisError> {
    let manager = RedisConnectionManager::new(config.url.as_str())?;
    bb8::Pool::builder()
        .max_size(config.max_connections)
        .build(manager)
        .await
}
