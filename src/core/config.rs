use std::env;
use std::path::PathBuf;

use crate::core::error::AppError;
use crate::features::geo::models::Backend;

#[derive(Debug, Clone)]
pub struct Config {
    pub app: AppConfig,
    pub stores: StoreConfig,
    pub swagger: SwaggerConfig,
    pub seed: SeedConfig,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    pub cors_allowed_origins: Vec<String>,
}

/// Which backing stores are enabled. A backend is enabled when its URL is set.
#[derive(Debug, Clone)]
pub struct StoreConfig {
    pub postgis: Option<DatabaseConfig>,
    pub mongo: Option<MongoConfig>,
    pub redis: Option<RedisConfig>,
    /// Backend additionally mounted at the unprefixed `/api/v1` path
    pub primary: Option<Backend>,
}

#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub min_connections: u32,
    pub acquire_timeout_secs: u64,
    pub idle_timeout_secs: u64,
    pub max_lifetime_secs: u64,
}

#[derive(Debug, Clone)]
pub struct MongoConfig {
    pub url: String,
    pub database: String,
}

#[derive(Debug, Clone)]
pub struct RedisConfig {
    pub url: String,
    pub max_connections: u32,
}

#[derive(Debug, Clone)]
pub struct SwaggerConfig {
    pub username: Option<String>,
    pub password: Option<String>,
    pub title: String,
    pub version: String,
    pub description: String,
}

#[derive(Debug, Clone, Default)]
pub struct SeedConfig {
    /// Overrides the bundled city/district dataset
    pub file: Option<PathBuf>,
}

impl Config {
    pub fn from_env() -> Result<Self, AppError> {
        // Load .env file if exists, ignore if not found (optional for production)
        let _ = dotenvy::dotenv();

        Ok(Config {
            app: AppConfig::from_env()?,
            stores: StoreConfig::from_env()?,
            swagger: SwaggerConfig::from_env(),
            seed: SeedConfig::from_env(),
        })
    }
}

impl AppConfig {
    pub fn from_env() -> Result<Self, AppError> {
        let host = env::var("HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
        let port = env::var("PORT")
            .unwrap_or_else(|_| "8080".to_string())
            .parse::<u16>()
            .map_err(|e| AppError::Misconfiguration(format!("Invalid PORT: {}", e)))?;

        // Parse CORS allowed origins from comma-separated string
        let cors_allowed_origins = env::var("CORS_ALLOWED_ORIGINS")
            .unwrap_or_else(|_| "*".to_string())
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        Ok(Self {
            host,
            port,
            cors_allowed_origins,
        })
    }

    pub fn server_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl StoreConfig {
    pub fn from_env() -> Result<Self, AppError> {
        let postgis = match non_empty_var("POSTGIS_DATABASE_URL") {
            Some(url) => Some(DatabaseConfig::from_env(url)?),
            None => None,
        };

        let mongo = match non_empty_var("MONGO_URL") {
            Some(url) => Some(MongoConfig::from_env(url)?),
            None => None,
        };

        let redis = match non_empty_var("REDIS_URL") {
            Some(url) => Some(RedisConfig::from_env(url)?),
            None => None,
        };

        let primary = non_empty_var("PRIMARY_BACKEND")
            .map(|name| name.parse::<Backend>())
            .transpose()?;

        let config = Self {
            postgis,
            mongo,
            redis,
            primary,
        };
        config.validate()?;

        Ok(config)
    }

    /// Backends with a configured URL, in mount order
    pub fn enabled(&self) -> Vec<Backend> {
        let mut backends = Vec::new();
        if self.postgis.is_some() {
            backends.push(Backend::Postgis);
        }
        if self.mongo.is_some() {
            backends.push(Backend::Mongo);
        }
        if self.redis.is_some() {
            backends.push(Backend::Redis);
        }
        backends
    }

    pub fn validate(&self) -> Result<(), AppError> {
        let enabled = self.enabled();
        if enabled.is_empty() {
            return Err(AppError::Misconfiguration(
                "At least one of POSTGIS_DATABASE_URL, MONGO_URL or REDIS_URL must be set"
                    .to_string(),
            ));
        }

        if let Some(primary) = self.primary {
            if !enabled.contains(&primary) {
                return Err(AppError::Misconfiguration(format!(
                    "PRIMARY_BACKEND '{}' is not configured",
                    primary
                )));
            }
        }

        Ok(())
    }
}

impl DatabaseConfig {
    // Default values for database connection pool (conservative defaults for small-medium apps)
    const DEFAULT_MAX_CONNECTIONS: u32 = 10;
    const DEFAULT_MIN_CONNECTIONS: u32 = 1;
    const DEFAULT_ACQUIRE_TIMEOUT_SECS: u64 = 5;
    const DEFAULT_IDLE_TIMEOUT_SECS: u64 = 600; // 10 minutes
    const DEFAULT_MAX_LIFETIME_SECS: u64 = 1800; // 30 minutes

    const SCHEMES: &'static [&'static str] = &["postgres", "postgresql"];

    pub fn from_env(url: String) -> Result<Self, AppError> {
        validate_scheme("POSTGIS_DATABASE_URL", &url, Self::SCHEMES)?;

        Ok(Self {
            url,
            max_connections: parse_var("DB_MAX_CONNECTIONS", Self::DEFAULT_MAX_CONNECTIONS)?,
            min_connections: parse_var("DB_MIN_CONNECTIONS", Self::DEFAULT_MIN_CONNECTIONS)?,
            acquire_timeout_secs: parse_var(
                "DB_ACQUIRE_TIMEOUT_SECS",
                Self::DEFAULT_ACQUIRE_TIMEOUT_SECS,
            )?,
            idle_timeout_secs: parse_var("DB_IDLE_TIMEOUT_SECS", Self::DEFAULT_IDLE_TIMEOUT_SECS)?,
            max_lifetime_secs: parse_var("DB_MAX_LIFETIME_SECS", Self::DEFAULT_MAX_LIFETIME_SECS)?,
        })
    }
}

impl MongoConfig {
    const SCHEMES: &'static [&'static str] = &["mongodb", "mongodb+srv"];

    pub fn from_env(url: String) -> Result<Self, AppError> {
        validate_scheme("MONGO_URL", &url, Self::SCHEMES)?;
        let database = env::var("MONGO_DATABASE").unwrap_or_else(|_| "geoprox".to_string());

        Ok(Self { url, database })
    }
}

impl RedisConfig {
    const DEFAULT_MAX_CONNECTIONS: u32 = 10;

    const SCHEMES: &'static [&'static str] = &["redis", "rediss", "redis+unix"];

    pub fn from_env(url: String) -> Result<Self, AppError> {
        validate_scheme("REDIS_URL", &url, Self::SCHEMES)?;

        Ok(Self {
            url,
            max_connections: parse_var("REDIS_MAX_CONNECTIONS", Self::DEFAULT_MAX_CONNECTIONS)?,
        })
    }
}

impl SwaggerConfig {
    pub fn from_env() -> Self {
        // Only use credentials if they are non-empty
        let username = non_empty_var("SWAGGER_USERNAME");
        let password = non_empty_var("SWAGGER_PASSWORD");
        let title = env::var("SWAGGER_TITLE").unwrap_or_else(|_| "Geoprox API".to_string());
        let version = env::var("SWAGGER_VERSION").unwrap_or_else(|_| "0.1.0".to_string());
        let description = env::var("SWAGGER_DESCRIPTION")
            .unwrap_or_else(|_| "Nearest city and district lookups".to_string());

        Self {
            username,
            password,
            title,
            version,
            description,
        }
    }

    /// Returns credentials in "username:password" format if auth is enabled
    pub fn credentials(&self) -> Option<String> {
        match (&self.username, &self.password) {
            (Some(user), Some(pass)) => Some(format!("{}:{}", user, pass)),
            _ => None,
        }
    }
}

impl SeedConfig {
    pub fn from_env() -> Self {
        Self {
            file: non_empty_var("SEED_FILE").map(PathBuf::from),
        }
    }
}

fn non_empty_var(name: &str) -> Option<String> {
    env::var(name).ok().filter(|s| !s.trim().is_empty())
}

fn parse_var<T: std::str::FromStr>(name: &str, default: T) -> Result<T, AppError> {
    match non_empty_var(name) {
        Some(raw) => raw
            .parse::<T>()
            .map_err(|_| AppError::Misconfiguration(format!("{} must be a valid number", name))),
        None => Ok(default),
    }
}

/// Rejects datastore URLs whose scheme the matching driver cannot serve
pub fn validate_scheme(name: &str, url: &str, allowed: &[&str]) -> Result<(), AppError> {
    let scheme = url
        .split_once("://")
        .map(|(scheme, _)| scheme.to_ascii_lowercase())
        .ok_or_else(|| AppError::Misconfiguration(format!("{} is not a valid URL", name)))?;

    if allowed.contains(&scheme.as_str()) {
        Ok(())
    } else {
        Err(AppError::Misconfiguration(format!(
            "{} has unsupported scheme '{}', expected one of: {}",
            name,
            scheme,
            allowed.join(", ")
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_scheme_accepts_known_schemes() {
        assert!(validate_scheme("X", "postgres://u:p@localhost/db", DatabaseConfig::SCHEMES).is_ok());
        assert!(validate_scheme("X", "postgresql://localhost/db", DatabaseConfig::SCHEMES).is_ok());
        assert!(validate_scheme("X", "mongodb+srv://cluster0", MongoConfig::SCHEMES).is_ok());
        assert!(validate_scheme("X", "REDIS://localhost:6379", RedisConfig::SCHEMES).is_ok());
    }

    #[test]
    fn test_validate_scheme_rejects_unsupported() {
        let err = validate_scheme("POSTGIS_DATABASE_URL", "jdbc:mysql://localhost", DatabaseConfig::SCHEMES)
            .unwrap_err();
        assert!(matches!(err, AppError::Misconfiguration(_)));

        let err = validate_scheme("MONGO_URL", "localhost:27017", MongoConfig::SCHEMES).unwrap_err();
        assert!(err.to_string().contains("not a valid URL"));
    }

    fn redis_only() -> StoreConfig {
        StoreConfig {
            postgis: None,
            mongo: None,
            redis: Some(RedisConfig {
                url: "redis://localhost:6379".to_string(),
                max_connections: 4,
            }),
            primary: None,
        }
    }

    #[test]
    fn test_store_config_requires_a_backend() {
        let mut config = redis_only();
        config.redis = None;
        assert!(matches!(
            config.validate(),
            Err(AppError::Misconfiguration(_))
        ));
    }

    #[test]
    fn test_primary_backend_must_be_enabled() {
        let mut config = redis_only();
        config.primary = Some(Backend::Postgis);
        assert!(config.validate().is_err());

        config.primary = Some(Backend::Redis);
        assert!(config.validate().is_ok());
        assert_eq!(config.enabled(), vec![Backend::Redis]);
    }

    #[test]
    fn test_swagger_credentials() {
        let mut swagger = SwaggerConfig {
            username: Some("admin".to_string()),
            password: None,
            title: String::new(),
            version: String::new(),
            description: String::new(),
        };
        assert_eq!(swagger.credentials(), None);

        swagger.password = Some("secret".to_string());
        assert_eq!(swagger.credentials(), Some("admin:secret".to_string()));
    }
}
