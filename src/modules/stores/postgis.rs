//! PostgreSQL/PostGIS-backed proximity store
//!
//! Entities live in the `city` and `district` tables. The `location`
//! column is a `geography(Point, 4326)` written from the row's own lat/lng in
//! the same statement, so it can never drift from the scalar columns.
//! Proximity uses `ST_DWithin` on the geography type, so radii are meters.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::{FromRow, PgPool, Postgres, Transaction};
use tracing::{debug, info};

use crate::core::error::{AppError, Result};
use crate::features::geo::models::{
    Backend, BoundingBox, Coordinates, Distance, EntityId, EntityKind, GeoEntity, GeoPoint,
    NewEntity, SRID_WGS84,
};
use crate::features::geo::store::{EntityBatch, ProximityStore, SeedReport};

/// Row shape shared by both tables
#[derive(Debug, Clone, FromRow)]
struct GeoRow {
    id: String,
    title: String,
    lat: Decimal,
    lng: Decimal,
    northeast_lat: Option<Decimal>,
    northeast_lng: Option<Decimal>,
    southwest_lat: Option<Decimal>,
    southwest_lng: Option<Decimal>,
    city_id: Option<String>,
    created_at: DateTime<Utc>,
}

impl GeoRow {
    fn into_entity(self, kind: EntityKind) -> Result<GeoEntity> {
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
            city_id: self.city_id.map(EntityId::new),
            created_at: self.created_at,
        })
    }
}

fn table(kind: EntityKind) -> &'static str {
    match kind {
        EntityKind::City => "city",
        EntityKind::District => "district",
    }
}

fn select_columns(kind: EntityKind) -> &'static str {
    match kind {
        EntityKind::City => {
            "id, title, lat, lng, northeast_lat, northeast_lng, southwest_lat, southwest_lng, \
             NULL::text AS city_id, created_at"
        }
        EntityKind::District => {
            "id, title, lat, lng, northeast_lat, northeast_lng, southwest_lat, southwest_lng, \
             district_city_id AS city_id, created_at"
        }
    }
}

/// `geography` point expression over two bind parameters, x (longitude) first
fn point_expr(x_param: usize, y_param: usize) -> String {
    format!(
        "ST_SetSRID(ST_MakePoint(${}, ${}), {})::geography",
        x_param, y_param, SRID_WGS84
    )
}

fn nearest_sql(kind: EntityKind) -> String {
    let point = point_expr(1, 2);
    format!(
        "SELECT {} FROM {} WHERE ST_DWithin(location, {point}, $3) ORDER BY ST_Distance(location, {point}) ASC",
        select_columns(kind),
        table(kind),
        point = point,
    )
}

/// Insert statement; `upsert` turns it into the bulk-save form
fn insert_sql(kind: EntityKind, upsert: bool) -> String {
    let location = point_expr(9, 10);
    let (city_column, city_value) = match kind {
        EntityKind::City => ("", ""),
        EntityKind::District => (", district_city_id", ", $12"),
    };

    let mut sql = format!(
        "INSERT INTO {} (id, title, lat, lng, northeast_lat, northeast_lng, southwest_lat, southwest_lng, location, created_at{}) \
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, {}, $11{})",
        table(kind),
        city_column,
        location,
        city_value,
    );

    if upsert {
        sql.push_str(
            " ON CONFLICT (id) DO UPDATE SET title = EXCLUDED.title, lat = EXCLUDED.lat, lng = EXCLUDED.lng, \
             northeast_lat = EXCLUDED.northeast_lat, northeast_lng = EXCLUDED.northeast_lng, \
             southwest_lat = EXCLUDED.southwest_lat, southwest_lng = EXCLUDED.southwest_lng, \
             location = EXCLUDED.location",
        );
        if kind == EntityKind::District {
            sql.push_str(", district_city_id = EXCLUDED.district_city_id");
        }
    }

    sql
}

pub struct PostgisStore {
    pool: PgPool,
}

impl PostgisStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn insert_one(
        tx: &mut Transaction<'_, Postgres>,
        entity: &GeoEntity,
        upsert: bool,
    ) -> Result<()> {
        let sql = insert_sql(entity.kind, upsert);
        let point = entity.location();
        let bounds = entity.bounds.as_ref();

        let mut query = sqlx::query(&sql)
            .bind(entity.id.as_str())
            .bind(&entity.title)
            .bind(entity.coordinates.lat())
            .bind(entity.coordinates.lng())
            .bind(bounds.map(|b| b.northeast.lat()))
            .bind(bounds.map(|b| b.northeast.lng()))
            .bind(bounds.map(|b| b.southwest.lat()))
            .bind(bounds.map(|b| b.southwest.lng()))
            .bind(point.x())
            .bind(point.y())
            .bind(entity.created_at);

        if entity.kind == EntityKind::District {
            let city_id = entity.city_id.as_ref().ok_or_else(|| {
                AppError::Validation(format!("District '{}' has no city", entity.id))
            })?;
            query = query.bind(city_id.as_str());
        }

        query.execute(&mut **tx).await?;
        Ok(())
    }
}

#[async_trait]
impl ProximityStore for PostgisStore {
    fn backend(&self) -> Backend {
        Backend::Postgis
    }

    async fn create(&self, entity: NewEntity) -> Result<GeoEntity> {
        if let Some(city_id) = &entity.city_id {
            self.find_by_id(EntityKind::City, city_id).await?;
        }

        let created = entity.into_entity();
        let mut tx = self.pool.begin().await?;
        Self::insert_one(&mut tx, &created, false).await?;
        tx.commit().await?;

        Ok(created)
    }

    async fn find_all(&self, kind: EntityKind) -> Result<Vec<GeoEntity>> {
        let sql = format!(
            "SELECT {} FROM {} ORDER BY created_at ASC, id ASC",
            select_columns(kind),
            table(kind)
        );
        let rows = sqlx::query_as::<_, GeoRow>(&sql)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| {
                tracing::error!("Failed to fetch {} rows: {:?}", kind, e);
                AppError::from(e)
            })?;

        rows.into_iter().map(|row| row.into_entity(kind)).collect()
    }

    async fn find_by_id(&self, kind: EntityKind, id: &EntityId) -> Result<GeoEntity> {
        let sql = format!(
            "SELECT {} FROM {} WHERE id = $1",
            select_columns(kind),
            table(kind)
        );
        sqlx::query_as::<_, GeoRow>(&sql)
            .bind(id.as_str())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| {
                tracing::error!("Failed to fetch {} by id {}: {:?}", kind, id, e);
                AppError::from(e)
            })?
            .ok_or_else(|| AppError::NotFound(format!("{} with id '{}' not found", kind.label(), id)))?
            .into_entity(kind)
    }

    async fn find_nearest(
        &self,
        kind: EntityKind,
        point: GeoPoint,
        radius: Distance,
    ) -> Result<Vec<GeoEntity>> {
        let rows = sqlx::query_as::<_, GeoRow>(&nearest_sql(kind))
            .bind(point.x())
            .bind(point.y())
            .bind(radius.as_meters())
            .fetch_all(&self.pool)
            .await
            .map_err(|e| {
                tracing::error!("Nearest {} query failed: {:?}", kind, e);
                AppError::from(e)
            })?;

        debug!("PostGIS nearest {}: {} hits", kind, rows.len());
        rows.into_iter().map(|row| row.into_entity(kind)).collect()
    }

    async fn save_all(&self, entities: Vec<GeoEntity>) -> Result<u64> {
        let mut tx = self.pool.begin().await?;
        // Cities first so district foreign keys resolve
        let (cities, districts): (Vec<_>, Vec<_>) = entities
            .iter()
            .partition(|e| e.kind == EntityKind::City);
        for entity in cities.into_iter().chain(districts) {
            Self::insert_one(&mut tx, entity, true).await?;
        }
        tx.commit().await?;

        Ok(entities.len() as u64)
    }

    async fn count(&self, kind: EntityKind) -> Result<u64> {
        let sql = format!("SELECT COUNT(*) FROM {}", table(kind));
        let count: i64 = sqlx::query_scalar(&sql).fetch_one(&self.pool).await?;
        Ok(count as u64)
    }

    async fn reseed(&self, batch: EntityBatch) -> Result<SeedReport> {
        let mut tx = self.pool.begin().await?;

        sqlx::query("TRUNCATE TABLE district, city")
            .execute(&mut *tx)
            .await?;
        info!("Truncated PostGIS city and district tables");

        for entity in batch.cities.iter().chain(batch.districts.iter()) {
            Self::insert_one(&mut tx, entity, false).await?;
        }
        tx.commit().await?;

        Ok(SeedReport {
            backend: Backend::Postgis,
            cities: self.count(EntityKind::City).await?,
            districts: self.count(EntityKind::District).await?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SCHEMA: &str = include_str!("../../../migrations/20250101000000_create_geo_tables.sql");

    /// Whitespace-collapsed schema, so assertions do not depend on line breaks
    fn schema() -> String {
        SCHEMA.split_whitespace().collect::<Vec<_>>().join(" ")
    }

    #[test]
    fn test_deleting_a_city_cascades_to_its_districts() {
        assert!(schema().contains(
            "CONSTRAINT fk_district_city_id FOREIGN KEY (district_city_id) \
             REFERENCES city (id) ON DELETE CASCADE"
        ));
    }

    #[test]
    fn test_schema_columns_match_store_queries() {
        let schema = schema();
        assert!(schema.contains("lng NUMERIC(11, 8) NOT NULL"));
        assert!(schema.contains("location geography(Point, 4326)"));
        assert!(schema.contains("ON district USING GIST (location)"));
        assert!(schema.contains("district_city_id TEXT NOT NULL"));
    }

    #[test]
    fn test_point_expression_is_x_then_y() {
        assert_eq!(
            point_expr(1, 2),
            "ST_SetSRID(ST_MakePoint($1, $2), 4326)::geography"
        );
    }

    #[test]
    fn test_nearest_sql_filters_and_orders() {
        let sql = nearest_sql(EntityKind::District);
        assert!(sql.contains("FROM district"));
        assert!(sql.contains("ST_DWithin(location, ST_SetSRID(ST_MakePoint($1, $2), 4326)::geography, $3)"));
        assert!(sql.contains("district_city_id AS city_id"));
        assert!(sql.ends_with("ASC"));
    }

    #[test]
    fn test_insert_sql_binds_district_city() {
        let city = insert_sql(EntityKind::City, false);
        assert!(!city.contains("district_city_id"));
        assert!(!city.contains("ON CONFLICT"));

        let district = insert_sql(EntityKind::District, true);
        assert!(district.contains("district_city_id) VALUES"));
        assert!(district.contains("$12)"));
        assert!(district.contains("location = EXCLUDED.location"));
    }
}
