//! MongoDB-backed proximity store
//!
//! One collection per kind. `location` is a GeoJSON point behind a
//! `2dsphere` index and proximity uses `$near`, which returns nearest first.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures::TryStreamExt;
use mongodb::bson::{doc, DateTime as BsonDateTime, Document};
use mongodb::{Collection, Database, IndexModel};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::core::error::{AppError, Result};
use crate::features::geo::models::{
    Backend, BoundingBox, Coordinates, Distance, EntityId, EntityKind, GeoEntity, GeoPoint,
    NewEntity,
};
use crate::features::geo::store::{EntityBatch, ProximityStore, SeedReport};
use crate::shared::constants::{MONGO_CITY_COLLECTION, MONGO_DISTRICT_COLLECTION};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct GeoJsonPoint {
    #[serde(rename = "type")]
    kind: String,
    coordinates: [f64; 2],
}

impl From<GeoPoint> for GeoJsonPoint {
    fn from(point: GeoPoint) -> Self {
        Self {
            kind: "Point".to_string(),
            coordinates: point.coordinates(),
        }
    }
}

/// Stored document; decimals are kept as strings to preserve precision
#[derive(Debug, Clone, Serialize, Deserialize)]
struct GeoDocument {
    #[serde(rename = "_id")]
    id: String,
    title: String,
    lat: Decimal,
    lng: Decimal,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    northeast_lat: Option<Decimal>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    northeast_lng: Option<Decimal>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    southwest_lat: Option<Decimal>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    southwest_lng: Option<Decimal>,
    location: GeoJsonPoint,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    district_city_id: Option<String>,
    created_at: BsonDateTime,
}

impl From<&GeoEntity> for GeoDocument {
    fn from(entity: &GeoEntity) -> Self {
        let bounds = entity.bounds.as_ref();
        Self {
            id: entity.id.to_string(),
            title: entity.title.clone(),
            lat: entity.coordinates.lat(),
            lng: entity.coordinates.lng(),
            northeast_lat: bounds.map(|b| b.northeast.lat()),
            northeast_lng: bounds.map(|b| b.northeast.lng()),
            southwest_lat: bounds.map(|b| b.southwest.lat()),
            southwest_lng: bounds.map(|b| b.southwest.lng()),
            location: entity.location().into(),
            district_city_id: entity.city_id.as_ref().map(|id| id.to_string()),
            created_at: BsonDateTime::from_millis(entity.created_at.timestamp_millis()),
        }
    }
}

impl GeoDocument {
    fn into_entity(self, kind: EntityKind) -> Result<GeoEntity> {
        let created_at: DateTime<Utc> =
            DateTime::from_timestamp_millis(self.created_at.timestamp_millis()).ok_or_else(|| {
                AppError::Internal(format!("Document {} has an invalid created_at", self.id))
            })?;

        Ok(GeoEntity {
            id: EntityId::new(self.id),
            kind,
            title: self.title,
            coordinates: Coordinates::from_decimal(self.lat, self.lng)?,
            bounds: BoundingBox::from_corners(
                self.northeast_lat,
                self.northeast_lng,
                self.southwest_lat,
                self.southwest_lng,
            )?,
            city_id: self.district_city_id.map(EntityId::new),
            created_at,
        })
    }
}

fn collection_name(kind: EntityKind) -> &'static str {
    match kind {
        EntityKind::City => MONGO_CITY_COLLECTION,
        EntityKind::District => MONGO_DISTRICT_COLLECTION,
    }
}

/// `$near` filter; `$maxDistance` is in meters for GeoJSON points
fn near_filter(point: GeoPoint, radius: Distance) -> Document {
    let [lng, lat] = point.coordinates();
    doc! {
        "location": {
            "$near": {
                "$geometry": { "type": "Point", "coordinates": [lng, lat] },
                "$maxDistance": radius.as_meters(),
            }
        }
    }
}

pub struct MongoStore {
    db: Database,
}

impl MongoStore {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    fn collection(&self, kind: EntityKind) -> Collection<GeoDocument> {
        self.db.collection(collection_name(kind))
    }

    /// Create the geo and title indexes; a no-op when they already exist
    pub async fn ensure_indexes(&self) -> Result<()> {
        for kind in EntityKind::ALL {
            let collection = self.collection(kind);
            collection
                .create_index(
                    IndexModel::builder()
                        .keys(doc! { "location": "2dsphere" })
                        .build(),
                )
                .await?;
            collection
                .create_index(IndexModel::builder().keys(doc! { "title": 1 }).build())
                .await?;
        }
        Ok(())
    }

    async fn find(&self, kind: EntityKind, filter: Document) -> Result<Vec<GeoEntity>> {
        let documents: Vec<GeoDocument> = self
            .collection(kind)
            .find(filter)
            .await?
            .try_collect()
            .await?;

        documents
            .into_iter()
            .map(|document| document.into_entity(kind))
            .collect()
    }
}

#[async_trait]
impl ProximityStore for MongoStore {
    fn backend(&self) -> Backend {
        Backend::Mongo
    }

    async fn create(&self, entity: NewEntity) -> Result<GeoEntity> {
        if let Some(city_id) = &entity.city_id {
            self.find_by_id(EntityKind::City, city_id).await?;
        }

        let created = entity.into_entity();
        self.collection(created.kind)
            .insert_one(GeoDocument::from(&created))
            .await?;

        Ok(created)
    }

    async fn find_all(&self, kind: EntityKind) -> Result<Vec<GeoEntity>> {
        self.find(kind, doc! {}).await
    }

    async fn find_by_id(&self, kind: EntityKind, id: &EntityId) -> Result<GeoEntity> {
        self.collection(kind)
            .find_one(doc! { "_id": id.as_str() })
            .await?
            .ok_or_else(|| AppError::NotFound(format!("{} with id '{}' not found", kind.label(), id)))?
            .into_entity(kind)
    }

    async fn find_nearest(
        &self,
        kind: EntityKind,
        point: GeoPoint,
        radius: Distance,
    ) -> Result<Vec<GeoEntity>> {
        let hits = self.find(kind, near_filter(point, radius)).await?;
        debug!("Mongo nearest {}: {} hits", kind, hits.len());
        Ok(hits)
    }

    async fn save_all(&self, entities: Vec<GeoEntity>) -> Result<u64> {
        for entity in &entities {
            self.collection(entity.kind)
                .replace_one(doc! { "_id": entity.id.as_str() }, GeoDocument::from(entity))
                .upsert(true)
                .await?;
        }
        Ok(entities.len() as u64)
    }

    async fn count(&self, kind: EntityKind) -> Result<u64> {
        Ok(self.collection(kind).count_documents(doc! {}).await?)
    }

    async fn reseed(&self, batch: EntityBatch) -> Result<SeedReport> {
        for kind in EntityKind::ALL {
            self.collection(kind).drop().await?;
            self.db.create_collection(collection_name(kind)).await?;
        }
        self.ensure_indexes().await?;
        info!("Recreated Mongo collections and indexes");

        for (kind, entities) in [
            (EntityKind::City, &batch.cities),
            (EntityKind::District, &batch.districts),
        ] {
            if entities.is_empty() {
                continue;
            }
            let documents: Vec<GeoDocument> = entities.iter().map(GeoDocument::from).collect();
            self.collection(kind).insert_many(documents).await?;
        }

        Ok(SeedReport {
            backend: Backend::Mongo,
            cities: self.count(EntityKind::City).await?,
            districts: self.count(EntityKind::District).await?,
        })
    }
}
