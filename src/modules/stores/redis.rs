//! Redis-backed proximity store
//!
//! Positions live in one geo sorted set per kind with the entity id as the
//! member. The entity itself is kept as JSON in an id-keyed hash, so titles
//! are display data and may repeat. Radius queries over-fetch from the index
//! and are filtered on the entities' stored coordinates.

use async_trait::async_trait;
use bb8_redis::redis;
use tracing::{info, warn};

use crate::core::database::RedisPool;
use crate::core::error::{AppError, Result};
use crate::features::geo::models::{
    Backend, Distance, EntityId, EntityKind, GeoEntity, GeoLocation, GeoPoint, NewEntity,
};
use crate::features::geo::store::{EntityBatch, ProximityStore, SeedReport};
use crate::modules::stores::redis_index::{
    ensure_indexable, search_radius, GeoHit, RadiusQuery, RedisGeoIndex,
};
use crate::shared::constants::{
    ANNOTATED_SEARCH_LIMIT, REDIS_CITY_ENTITY_KEY, REDIS_CITY_GEO_KEY,
    REDIS_DISTRICT_ENTITY_KEY, REDIS_DISTRICT_GEO_KEY,
};

fn entity_key(kind: EntityKind) -> &'static str {
    match kind {
        EntityKind::City => REDIS_CITY_ENTITY_KEY,
        EntityKind::District => REDIS_DISTRICT_ENTITY_KEY,
    }
}

/// Entities whose stored coordinates lie within `radius` of `point`, order kept
fn within_radius(entities: Vec<GeoEntity>, point: GeoPoint, radius: Distance) -> Vec<GeoEntity> {
    entities
        .into_iter()
        .filter(|entity| entity.location().distance_to(&point).as_meters() <= radius.as_meters())
        .collect()
}

/// Join hits to entities by member id in hit order; hits without an entity are dropped
fn project_hits(hits: Vec<GeoHit>, entities: &[GeoEntity]) -> Vec<GeoLocation> {
    hits.into_iter()
        .filter_map(|hit| {
            let GeoHit {
                member,
                point,
                distance,
                geohash,
            } = hit;
            entities
                .iter()
                .find(|entity| entity.id == member)
                .map(|entity| GeoLocation {
                    name: entity.title.clone(),
                    member,
                    point,
                    distance,
                    geohash,
                })
        })
        .collect()
}

pub struct RedisStore {
    pool: RedisPool,
    cities: RedisGeoIndex,
    districts: RedisGeoIndex,
}

impl RedisStore {
    pub fn new(pool: RedisPool) -> Self {
        Self {
            cities: RedisGeoIndex::new(pool.clone(), REDIS_CITY_GEO_KEY),
            districts: RedisGeoIndex::new(pool.clone(), REDIS_DISTRICT_GEO_KEY),
            pool,
        }
    }

    fn index(&self, kind: EntityKind) -> &RedisGeoIndex {
        match kind {
            EntityKind::City => &self.cities,
            EntityKind::District => &self.districts,
        }
    }

    /// Titles of every member of the kind's geo set, in set order
    pub async fn member_titles(&self, kind: EntityKind) -> Result<Vec<String>> {
        let members = self.index(kind).members().await?;
        Ok(self
            .load(kind, &members)
            .await?
            .into_iter()
            .map(|entity| entity.title)
            .collect())
    }

    /// Nearest districts first, capped, with distance and geohash attached
    pub async fn nearest_annotated(
        &self,
        point: GeoPoint,
        radius: Distance,
    ) -> Result<Vec<GeoLocation>> {
        let hits = self
            .districts
            .search(
                point,
                search_radius(radius)?,
                RadiusQuery::annotated(ANNOTATED_SEARCH_LIMIT),
            )
            .await?;
        let members: Vec<EntityId> = hits.iter().map(|hit| hit.member.clone()).collect();
        let entities = within_radius(
            self.load(EntityKind::District, &members).await?,
            point,
            radius,
        );

        Ok(project_hits(hits, &entities))
    }

    /// Entities for `ids` in the same order; ids without a stored entity are skipped
    async fn load(&self, kind: EntityKind, ids: &[EntityId]) -> Result<Vec<GeoEntity>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let raw: Vec<Option<String>> = {
            let mut conn = self.pool.get().await?;
            redis::cmd("HMGET")
                .arg(entity_key(kind))
                .arg(ids.iter().map(EntityId::as_str).collect::<Vec<_>>())
                .query_async(&mut *conn)
                .await?
        };

        let mut entities = Vec::with_capacity(raw.len());
        for (id, json) in ids.iter().zip(raw) {
            match json {
                Some(json) => entities.push(serde_json::from_str(&json)?),
                None => warn!("Redis {} member {} has no stored entity", kind, id),
            }
        }
        Ok(entities)
    }

    /// Write the geo member and the entity hash entry in one transaction;
    /// true when the member is new
    async fn write(&self, entity: &GeoEntity) -> Result<bool> {
        let point = entity.location();
        ensure_indexable(point)?;
        let json = serde_json::to_string(entity)?;

        let mut conn = self.pool.get().await?;
        let (added,): (i64,) = redis::pipe()
            .atomic()
            .add_command(self.index(entity.kind).geoadd(point, &entity.id))
            .cmd("HSET")
            .arg(entity_key(entity.kind))
            .arg(entity.id.as_str())
            .arg(json)
            .ignore()
            .query_async(&mut *conn)
            .await?;
        Ok(added > 0)
    }
}

#[async_trait]
impl ProximityStore for RedisStore {
    fn backend(&self) -> Backend {
        Backend::Redis
    }

    async fn create(&self, entity: NewEntity) -> Result<GeoEntity> {
        if let Some(city_id) = &entity.city_id {
            self.find_by_id(EntityKind::City, city_id).await?;
        }

        let created = entity.into_entity();
        self.write(&created).await?;
        Ok(created)
    }

    async fn find_all(&self, kind: EntityKind) -> Result<Vec<GeoEntity>> {
        let raw: Vec<String> = {
            let mut conn = self.pool.get().await?;
            redis::cmd("HVALS")
                .arg(entity_key(kind))
                .query_async(&mut *conn)
                .await?
        };

        let mut entities = raw
            .iter()
            .map(|json| serde_json::from_str::<GeoEntity>(json))
            .collect::<std::result::Result<Vec<_>, _>>()?;
        entities.sort_by(|a, b| a.created_at.cmp(&b.created_at).then_with(|| a.id.cmp(&b.id)));
        Ok(entities)
    }

    async fn find_by_id(&self, kind: EntityKind, id: &EntityId) -> Result<GeoEntity> {
        let raw: Option<String> = {
            let mut conn = self.pool.get().await?;
            redis::cmd("HGET")
                .arg(entity_key(kind))
                .arg(id.as_str())
                .query_async(&mut *conn)
                .await?
        };

        let json = raw.ok_or_else(|| {
            AppError::NotFound(format!("{} with id '{}' not found", kind.label(), id))
        })?;
        Ok(serde_json::from_str(&json)?)
    }

    async fn find_nearest(
        &self,
        kind: EntityKind,
        point: GeoPoint,
        radius: Distance,
    ) -> Result<Vec<GeoEntity>> {
        let hits = self
            .index(kind)
            .search(point, search_radius(radius)?, RadiusQuery::default())
            .await?;
        let members: Vec<EntityId> = hits.into_iter().map(|hit| hit.member).collect();
        Ok(within_radius(self.load(kind, &members).await?, point, radius))
    }

    async fn save_all(&self, entities: Vec<GeoEntity>) -> Result<u64> {
        for entity in &entities {
            self.write(entity).await?;
        }
        Ok(entities.len() as u64)
    }

    async fn count(&self, kind: EntityKind) -> Result<u64> {
        let mut conn = self.pool.get().await?;
        let count: u64 = redis::cmd("HLEN")
            .arg(entity_key(kind))
            .query_async(&mut *conn)
            .await?;
        Ok(count)
    }

    async fn reseed(&self, batch: EntityBatch) -> Result<SeedReport> {
        for kind in EntityKind::ALL {
            self.index(kind).clear().await?;
            let mut conn = self.pool.get().await?;
            let _: i64 = redis::cmd("DEL")
                .arg(entity_key(kind))
                .query_async(&mut *conn)
                .await?;
        }
        info!("Cleared Redis geo sets and entity hashes");

        for entity in batch.cities.iter().chain(batch.districts.iter()) {
            if !self.write(entity).await? {
                return Err(AppError::Conflict(format!(
                    "Duplicate {} id '{}' in seed data",
                    entity.kind, entity.id
                )));
            }
        }

        Ok(SeedReport {
            backend: Backend::Redis,
            cities: self.count(EntityKind::City).await?,
            districts: self.count(EntityKind::District).await?,
        })
    }
}
