//! Redis geo sorted set wrapper
//!
//! Every radius query goes through [`RedisGeoIndex::search`]; ordering,
//! limits and distance/geohash annotation are options of that one call.

use bb8_redis::redis;

use crate::core::database::RedisPool;
use crate::core::error::{AppError, Result};
use crate::features::geo::models::{Distance, DistanceUnit, EntityId, GeoPoint};

/// Largest latitude `GEOADD` accepts (the Web Mercator limit)
pub const MAX_INDEXABLE_LATITUDE: f64 = 85.05112878;

/// Worst-case gap between a stored position and its decoded geohash cell
const CELL_ERROR_METERS: f64 = 1.0;

/// Redis measures with a slightly larger Earth radius than the Haversine filter
const EARTH_RADIUS_SLACK: f64 = 0.001;

/// Rejects positions the geo index cannot store
pub fn ensure_indexable(point: GeoPoint) -> Result<()> {
    if point.latitude().abs() > MAX_INDEXABLE_LATITUDE {
        return Err(AppError::Validation(format!(
            "Latitude {} is outside the indexable range of ±{}",
            point.latitude(),
            MAX_INDEXABLE_LATITUDE
        )));
    }
    Ok(())
}

/// Radius to send to `GEOSEARCH` so members on the boundary are not lost.
///
/// Hits must be filtered back to `radius` from the entities' stored coordinates.
pub fn search_radius(radius: Distance) -> Result<Distance> {
    Distance::new(
        radius.as_meters() * (1.0 + EARTH_RADIUS_SLACK) + CELL_ERROR_METERS,
        DistanceUnit::Meters,
    )
}

/// Shape of a `GEOSEARCH` call
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RadiusQuery {
    pub ascending: bool,
    pub limit: Option<usize>,
    /// Attach the distance from the query point and the member's geohash
    pub annotate: bool,
}

impl RadiusQuery {
    /// Nearest first, at most `limit` hits, with distance and geohash
    pub fn annotated(limit: usize) -> Self {
        Self {
            ascending: true,
            limit: Some(limit),
            annotate: true,
        }
    }
}

/// One member returned by a radius search
#[derive(Debug, Clone, PartialEq)]
pub struct GeoHit {
    pub member: EntityId,
    pub point: GeoPoint,
    pub distance: Option<Distance>,
    pub geohash: Option<String>,
}

/// `GEOSEARCH` arguments after the key. Distances are exchanged in km;
/// `WITHCOORD` is always requested so hits carry their position.
fn search_args(point: GeoPoint, radius: Distance, query: RadiusQuery) -> Vec<String> {
    let unit = DistanceUnit::Kilometers;
    let mut args = vec![
        "FROMLONLAT".to_string(),
        point.longitude().to_string(),
        point.latitude().to_string(),
        "BYRADIUS".to_string(),
        radius.in_unit(unit).to_string(),
        unit.redis_arg().to_string(),
    ];
    if query.ascending {
        args.push("ASC".to_string());
    }
    if let Some(limit) = query.limit {
        args.push("COUNT".to_string());
        args.push(limit.to_string());
    }
    args.push("WITHDIST".to_string());
    args.push("WITHCOORD".to_string());
    args
}

pub struct RedisGeoIndex {
    pool: RedisPool,
    key: &'static str,
}

impl RedisGeoIndex {
    pub fn new(pool: RedisPool, key: &'static str) -> Self {
        Self { pool, key }
    }

    /// `GEOADD` for one member, to be queued with the entity write.
    /// Replies 1 when the member was not in the set before.
    pub fn geoadd(&self, point: GeoPoint, member: &EntityId) -> redis::Cmd {
        let mut cmd = redis::cmd("GEOADD");
        cmd.arg(self.key)
            .arg(point.longitude())
            .arg(point.latitude())
            .arg(member.as_str());
        cmd
    }

    /// All members in score (geohash) order
    pub async fn members(&self) -> Result<Vec<EntityId>> {
        let mut conn = self.pool.get().await?;
        let members: Vec<String> = redis::cmd("ZRANGE")
            .arg(self.key)
            .arg(0)
            .arg(-1)
            .query_async(&mut *conn)
            .await?;
        Ok(members.into_iter().map(EntityId::new).collect())
    }

    pub async fn search(
        &self,
        point: GeoPoint,
        radius: Distance,
        query: RadiusQuery,
    ) -> Result<Vec<GeoHit>> {
        let raw: Vec<(String, f64, (f64, f64))> = {
            let mut conn = self.pool.get().await?;
            redis::cmd("GEOSEARCH")
                .arg(self.key)
                .arg(search_args(point, radius, query))
                .query_async(&mut *conn)
                .await?
        };

        let mut hits = Vec::with_capacity(raw.len());
        for (member, km, (lng, lat)) in raw {
            hits.push(GeoHit {
                member: EntityId::new(member),
                point: GeoPoint::new(lng, lat),
                distance: if query.annotate {
                    Some(Distance::new(km, DistanceUnit::Kilometers)?)
                } else {
                    None
                },
                geohash: None,
            });
        }

        if query.annotate && !hits.is_empty() {
            let members: Vec<EntityId> = hits.iter().map(|h| h.member.clone()).collect();
            let hashes = self.geohash(&members).await?;
            for (hit, hash) in hits.iter_mut().zip(hashes) {
                hit.geohash = hash;
            }
        }

        Ok(hits)
    }

    /// `GEOHASH` for each member, `None` for members not in the set
    pub async fn geohash(&self, members: &[EntityId]) -> Result<Vec<Option<String>>> {
        if members.is_empty() {
            return Ok(Vec::new());
        }
        let mut conn = self.pool.get().await?;
        let hashes: Vec<Option<String>> = redis::cmd("GEOHASH")
            .arg(self.key)
            .arg(members.iter().map(EntityId::as_str).collect::<Vec<_>>())
            .query_async(&mut *conn)
            .await?;
        Ok(hashes)
    }

    pub async fn clear(&self) -> Result<()> {
        let mut conn = self.pool.get().await?;
        let _: i64 = redis::cmd("DEL")
            .arg(self.key)
            .query_async(&mut *conn)
            .await?;
        Ok(())
    }
}
