use std::str::FromStr;

use serde::Serialize;

use crate::core::error::AppError;
use crate::features::geo::models::DistanceUnit;

/// Storage engine behind a proximity store
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Backend {
    Postgis,
    Mongo,
    Redis,
}

impl Backend {
    pub fn as_str(&self) -> &'static str {
        match self {
            Backend::Postgis => "postgis",
            Backend::Mongo => "mongo",
            Backend::Redis => "redis",
        }
    }

    /// Route prefix the backend is mounted under
    pub fn prefix(&self) -> String {
        format!("/api/v1/{}", self.as_str())
    }

    /// Unit of the `{distance}` path parameter for this backend.
    ///
    /// PostGIS works on the geography type's native meters; MongoDB and Redis
    /// routes take kilometers.
    pub fn distance_unit(&self) -> DistanceUnit {
        match self {
            Backend::Postgis => DistanceUnit::Meters,
            Backend::Mongo | Backend::Redis => DistanceUnit::Kilometers,
        }
    }
}

impl std::fmt::Display for Backend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Backend {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "postgis" | "postgres" => Ok(Backend::Postgis),
            "mongo" | "mongodb" => Ok(Backend::Mongo),
            "redis" => Ok(Backend::Redis),
            other => Err(AppError::Misconfiguration(format!(
                "Unknown backend '{}', expected postgis, mongo or redis",
                other
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_backend() {
        assert_eq!("PostGIS".parse::<Backend>().unwrap(), Backend::Postgis);
        assert_eq!("mongodb".parse::<Backend>().unwrap(), Backend::Mongo);
        assert!(matches!(
            "cassandra".parse::<Backend>(),
            Err(AppError::Misconfiguration(_))
        ));
    }

    #[test]
    fn test_backend_units_and_prefix() {
        assert_eq!(Backend::Postgis.distance_unit(), DistanceUnit::Meters);
        assert_eq!(Backend::Redis.distance_unit(), DistanceUnit::Kilometers);
        assert_eq!(Backend::Mongo.prefix(), "/api/v1/mongo");
    }

    #[test]
    fn test_display_round_trips_through_from_str() {
        for backend in [Backend::Postgis, Backend::Mongo, Backend::Redis] {
            assert_eq!(backend.to_string().parse::<Backend>().unwrap(), backend);
        }
        assert_eq!(Backend::Postgis.to_string(), "postgis");
    }
}
