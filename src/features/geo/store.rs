//! The storage seam shared by every backend.

use async_trait::async_trait;
use serde::Serialize;

use crate::core::error::Result;
use crate::features::geo::models::{
    Backend, Distance, EntityId, EntityKind, GeoEntity, GeoPoint, NewEntity,
};

/// Full contents written by a destructive reseed, cities before districts
#[derive(Debug, Clone, Default)]
pub struct EntityBatch {
    pub cities: Vec<GeoEntity>,
    pub districts: Vec<GeoEntity>,
}

/// Entity counts left in a store after a reseed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SeedReport {
    pub backend: Backend,
    pub cities: u64,
    pub districts: u64,
}

/// Entity persistence plus the "within distance D of point P" query.
///
/// Distance units are normalised at this seam: `radius` is a typed
/// [`Distance`]. PostGIS and Mongo return hits nearest first; Redis leaves
/// them in set order.
#[async_trait]
pub trait ProximityStore: Send + Sync {
    fn backend(&self) -> Backend;

    /// Persist a new entity under a server-generated id.
    /// Districts must reference an existing city.
    async fn create(&self, entity: NewEntity) -> Result<GeoEntity>;

    async fn find_all(&self, kind: EntityKind) -> Result<Vec<GeoEntity>>;

    async fn find_by_id(&self, kind: EntityKind, id: &EntityId) -> Result<GeoEntity>;

    async fn find_nearest(
        &self,
        kind: EntityKind,
        point: GeoPoint,
        radius: Distance,
    ) -> Result<Vec<GeoEntity>>;

    /// Bulk upsert by id, rewriting each stored geometry from its coordinates
    async fn save_all(&self, entities: Vec<GeoEntity>) -> Result<u64>;

    async fn count(&self, kind: EntityKind) -> Result<u64>;

    /// Drop every city and district, rebuild indexes and insert `batch`
    async fn reseed(&self, batch: EntityBatch) -> Result<SeedReport>;
}
