//! The `city-district.json` seed format: cities with nested districts.
//!
//! Numeric fields may be JSON numbers or decimal strings. Any `location`
//! key is ignored; geometry is always derived from lat/lng.

use std::path::Path;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer};

use crate::core::error::{AppError, Result};
use crate::features::geo::models::{BoundingBox, Coordinates, EntityId, EntityKind, GeoEntity};
use crate::features::geo::store::EntityBatch;

const BUNDLED_DATASET: &str = include_str!("../../../data/city-district.json");

#[derive(Deserialize)]
#[serde(untagged)]
enum Scalar {
    Number(serde_json::Number),
    Text(String),
}

impl Scalar {
    fn into_text(self) -> String {
        match self {
            Scalar::Number(n) => n.to_string(),
            Scalar::Text(s) => s.trim().to_string(),
        }
    }
}

fn id_text<'de, D: Deserializer<'de>>(deserializer: D) -> std::result::Result<String, D::Error> {
    let id = Scalar::deserialize(deserializer)?.into_text();
    if id.is_empty() {
        return Err(serde::de::Error::custom("id must not be empty"));
    }
    Ok(id)
}

fn decimal<'de, D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Decimal, D::Error> {
    let text = Scalar::deserialize(deserializer)?.into_text();
    Decimal::from_str(&text).map_err(serde::de::Error::custom)
}

/// Missing, null and empty values all read as `None`
fn optional_decimal<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> std::result::Result<Option<Decimal>, D::Error> {
    match Option::<Scalar>::deserialize(deserializer)?.map(Scalar::into_text) {
        Some(text) if !text.is_empty() => Decimal::from_str(&text)
            .map(Some)
            .map_err(serde::de::Error::custom),
        _ => Ok(None),
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct SeedRecord {
    #[serde(deserialize_with = "id_text")]
    pub id: String,
    pub title: String,
    #[serde(deserialize_with = "decimal")]
    pub lat: Decimal,
    #[serde(deserialize_with = "decimal")]
    pub lng: Decimal,
    #[serde(default, deserialize_with = "optional_decimal")]
    pub northeast_lat: Option<Decimal>,
    #[serde(default, deserialize_with = "optional_decimal")]
    pub northeast_lng: Option<Decimal>,
    #[serde(default, deserialize_with = "optional_decimal")]
    pub southwest_lat: Option<Decimal>,
    #[serde(default, deserialize_with = "optional_decimal")]
    pub southwest_lng: Option<Decimal>,
    #[serde(default)]
    pub districts: Vec<SeedRecord>,
}

impl SeedRecord {
    fn to_entity(
        &self,
        kind: EntityKind,
        city_id: Option<&str>,
        created_at: DateTime<Utc>,
    ) -> Result<GeoEntity> {
        let invalid = |e: AppError| AppError::SeedData(format!("{} {}: {}", kind, self.id, e));

        let title = self.title.trim();
        if title.is_empty() {
            return Err(AppError::SeedData(format!("{} {} has no title", kind, self.id)));
        }

        Ok(GeoEntity {
            id: EntityId::new(self.id.clone()),
            kind,
            title: title.to_string(),
            coordinates: Coordinates::from_decimal(self.lat, self.lng).map_err(invalid)?,
            bounds: BoundingBox::from_corners(
                self.northeast_lat,
                self.northeast_lng,
                self.southwest_lat,
                self.southwest_lng,
            )
            .map_err(invalid)?,
            city_id: city_id.map(EntityId::new),
            created_at,
        })
    }
}

/// Cities in file order, each with its districts
#[derive(Debug, Clone, Deserialize)]
#[serde(transparent)]
pub struct SeedDataset {
    pub cities: Vec<SeedRecord>,
}

impl SeedDataset {
    pub fn parse(json: &str) -> Result<Self> {
        serde_json::from_str(json)
            .map_err(|e| AppError::SeedData(format!("Invalid seed dataset: {}", e)))
    }

    /// The dataset compiled into the binary
    pub fn bundled() -> Result<Self> {
        Self::parse(BUNDLED_DATASET)
    }

    pub async fn from_path(path: &Path) -> Result<Self> {
        let json = tokio::fs::read_to_string(path).await.map_err(|e| {
            AppError::SeedData(format!("Failed to read {}: {}", path.display(), e))
        })?;
        Self::parse(&json)
    }

    /// `path` when given, otherwise the bundled dataset
    pub async fn load(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::from_path(path).await,
            None => Self::bundled(),
        }
    }

    pub fn district_count(&self) -> usize {
        self.cities.iter().map(|c| c.districts.len()).sum()
    }

    /// Flatten into entities; a district's city is the record it is nested in
    pub fn to_batch(&self) -> Result<EntityBatch> {
        let created_at = Utc::now();
        let mut batch = EntityBatch {
            cities: Vec::with_capacity(self.cities.len()),
            districts: Vec::with_capacity(self.district_count()),
        };

        for city in &self.cities {
            batch
                .cities
                .push(city.to_entity(EntityKind::City, None, created_at)?);
            for district in &city.districts {
                batch.districts.push(district.to_entity(
                    EntityKind::District,
                    Some(&city.id),
                    created_at,
                )?);
            }
        }

        Ok(batch)
    }
}
