use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::core::error::{AppError, Result};
use crate::features::geo::models::{
    Backend, Distance, EntityId, EntityKind, GeoEntity, GeoPoint, NewEntity,
};
use crate::features::geo::store::{EntityBatch, ProximityStore, SeedReport};

/// `ProximityStore` kept in memory, filtering with the Haversine distance.
/// Results come back nearest first.
pub struct InMemoryStore {
    backend: Backend,
    entities: RwLock<Vec<GeoEntity>>,
}

impl InMemoryStore {
    pub fn new(backend: Backend) -> Self {
        Self {
            backend,
            entities: RwLock::new(Vec::new()),
        }
    }

    pub fn shared(backend: Backend) -> Arc<Self> {
        Arc::new(Self::new(backend))
    }
}

#[async_trait]
impl ProximityStore for InMemoryStore {
    fn backend(&self) -> Backend {
        self.backend
    }

    async fn create(&self, entity: NewEntity) -> Result<GeoEntity> {
        if let Some(city_id) = &entity.city_id {
            self.find_by_id(EntityKind::City, city_id).await?;
        }

        let created = entity.into_entity();
        self.entities.write().await.push(created.clone());
        Ok(created)
    }

    async fn find_all(&self, kind: EntityKind) -> Result<Vec<GeoEntity>> {
        Ok(self
            .entities
            .read()
            .await
            .iter()
            .filter(|e| e.kind == kind)
            .cloned()
            .collect())
    }

    async fn find_by_id(&self, kind: EntityKind, id: &EntityId) -> Result<GeoEntity> {
        self.entities
            .read()
            .await
            .iter()
            .find(|e| e.kind == kind && &e.id == id)
            .cloned()
            .ok_or_else(|| AppError::NotFound(format!("{} with id '{}' not found", kind.label(), id)))
    }

    async fn find_nearest(
        &self,
        kind: EntityKind,
        point: GeoPoint,
        radius: Distance,
    ) -> Result<Vec<GeoEntity>> {
        let mut hits: Vec<(f64, GeoEntity)> = self
            .entities
            .read()
            .await
            .iter()
            .filter(|e| e.kind == kind)
            .map(|e| (point.distance_to(&e.location()).as_meters(), e.clone()))
            .filter(|(meters, _)| *meters <= radius.as_meters())
            .collect();
        hits.sort_by(|a, b| a.0.total_cmp(&b.0));

        Ok(hits.into_iter().map(|(_, e)| e).collect())
    }

    async fn save_all(&self, entities: Vec<GeoEntity>) -> Result<u64> {
        let mut stored = self.entities.write().await;
        let count = entities.len() as u64;
        for entity in entities {
            match stored
                .iter_mut()
                .find(|e| e.kind == entity.kind && e.id == entity.id)
            {
                Some(existing) => *existing = entity,
                None => stored.push(entity),
            }
        }
        Ok(count)
    }

    async fn count(&self, kind: EntityKind) -> Result<u64> {
        Ok(self
            .entities
            .read()
            .await
            .iter()
            .filter(|e| e.kind == kind)
            .count() as u64)
    }

    async fn reseed(&self, batch: EntityBatch) -> Result<SeedReport> {
        let mut stored = self.entities.write().await;
        stored.clear();
        for entity in batch.cities.into_iter().chain(batch.districts) {
            if stored
                .iter()
                .any(|e| e.kind == entity.kind && e.id == entity.id)
            {
                return Err(AppError::Conflict(format!(
                    "Duplicate {} id '{}'",
                    entity.kind, entity.id
                )));
            }
            stored.push(entity);
        }

        let cities = stored.iter().filter(|e| e.kind == EntityKind::City).count() as u64;
        Ok(SeedReport {
            backend: self.backend,
            cities,
            districts: stored.len() as u64 - cities,
        })
    }
}
