use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::features::geo::models::{BoundingBox, Coordinates, GeoPoint};

/// The two entity collections every backend carries
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum EntityKind {
    City,
    District,
}

impl EntityKind {
    pub const ALL: [EntityKind; 2] = [EntityKind::City, EntityKind::District];

    pub fn as_str(&self) -> &'static str {
        match self {
            EntityKind::City => "city",
            EntityKind::District => "district",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            EntityKind::City => "City",
            EntityKind::District => "District",
        }
    }
}

impl std::fmt::Display for EntityKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Opaque entity identity: the seed file's id, or a random UUID for API-created records
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EntityId(String);

impl EntityId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_inner(self) -> String {
        self.0
    }
}

impl std::fmt::Display for EntityId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// A city or district as persisted by any backend
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeoEntity {
    pub id: EntityId,
    pub kind: EntityKind,
    pub title: String,
    pub coordinates: Coordinates,
    pub bounds: Option<BoundingBox>,
    /// Owning city, always set for districts
    pub city_id: Option<EntityId>,
    pub created_at: DateTime<Utc>,
}

impl GeoEntity {
    /// Point geometry used by spatial queries, derived from the coordinates
    pub fn location(&self) -> GeoPoint {
        self.coordinates.to_point()
    }
}

/// Input for creating a single entity through the API
#[derive(Debug, Clone)]
pub struct NewEntity {
    pub kind: EntityKind,
    pub title: String,
    pub coordinates: Coordinates,
    pub city_id: Option<EntityId>,
}

impl NewEntity {
    /// Assign a fresh identity and creation time
    pub fn into_entity(self) -> GeoEntity {
        GeoEntity {
            id: EntityId::generate(),
            kind: self.kind,
            title: self.title,
            coordinates: self.coordinates,
            bounds: None,
            city_id: self.city_id,
            created_at: Utc::now(),
        }
    }
}
