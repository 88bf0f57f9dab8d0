use std::sync::Arc;

use crate::core::error::{AppError, Result};
use crate::features::geo::models::{
    Backend, Coordinates, Distance, EntityId, EntityKind, GeoEntity, NewEntity,
};
use crate::features::geo::store::ProximityStore;

/// Proximity queries against a single backend
pub struct ProximityService {
    store: Arc<dyn ProximityStore>,
}

impl ProximityService {
    pub fn new(store: Arc<dyn ProximityStore>) -> Self {
        Self { store }
    }

    pub fn backend(&self) -> Backend {
        self.store.backend()
    }

    /// Create a city, or a district under an existing city
    pub async fn create(
        &self,
        kind: EntityKind,
        title: &str,
        lat: f64,
        lng: f64,
        city_id: Option<&str>,
    ) -> Result<GeoEntity> {
        let title = title.trim();
        if title.is_empty() {
            return Err(AppError::Validation("Title must not be empty".to_string()));
        }

        let city_id = match (kind, city_id.map(str::trim).filter(|s| !s.is_empty())) {
            (EntityKind::City, _) => None,
            (EntityKind::District, Some(id)) => Some(EntityId::new(id)),
            (EntityKind::District, None) => {
                return Err(AppError::Validation(
                    "A district requires the id of its city".to_string(),
                ))
            }
        };

        let entity = NewEntity {
            kind,
            title: title.to_string(),
            coordinates: Coordinates::new(lat, lng)?,
            city_id,
        };

        let created = self.store.create(entity).await?;
        tracing::info!(
            "Created {} {} '{}' in {}",
            kind,
            created.id,
            created.title,
            self.backend()
        );

        Ok(created)
    }

    pub async fn list(&self, kind: EntityKind) -> Result<Vec<GeoEntity>> {
        self.store.find_all(kind).await
    }

    /// Entities within `distance` (in the backend's path unit) of `(lat, lng)`
    pub async fn find_nearest(
        &self,
        kind: EntityKind,
        lat: f64,
        lng: f64,
        distance: f64,
    ) -> Result<Vec<GeoEntity>> {
        let point = Coordinates::new(lat, lng)?.to_point();
        let radius = Distance::new(distance, self.backend().distance_unit())?;

        tracing::debug!(
            "Nearest {} query on {}: ({}, {}) within {}m",
            kind,
            self.backend(),
            lat,
            lng,
            radius.as_meters()
        );

        self.store.find_nearest(kind, point, radius).await
    }

    /// Entities within `distance` of an existing entity's position
    pub async fn find_nearest_by_entity_id(
        &self,
        kind: EntityKind,
        id: &str,
        distance: f64,
    ) -> Result<Vec<GeoEntity>> {
        let radius = Distance::new(distance, self.backend().distance_unit())?;
        let reference = self.store.find_by_id(kind, &EntityId::new(id)).await?;

        self.store
            .find_nearest(kind, reference.location(), radius)
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shared::test_helpers::InMemoryStore;

    fn service(backend: Backend) -> ProximityService {
        ProximityService::new(Arc::new(InMemoryStore::new(backend)))
    }

    #[tokio::test]
    async fn test_created_city_found_at_zero_distance() {
        let service = service(Backend::Postgis);
        let city = service
            .create(EntityKind::City, "ELMADAĞ", 39.9208333, 33.2308333, None)
            .await
            .unwrap();

        let found = service
            .find_nearest(EntityKind::City, 39.9208333, 33.2308333, 0.0)
            .await
            .unwrap();

        assert_eq!(found.len(), 1);
        assert_eq!(found[0].id, city.id);
    }

    #[tokio::test]
    async fn test_find_nearest_uses_backend_unit() {
        // 5 means 5km on mongo and 5m on postgis
        let mongo = service(Backend::Mongo);
        let postgis = service(Backend::Postgis);
        for service in [&mongo, &postgis] {
            service
                .create(EntityKind::City, "ELMADAĞ", 39.9208333, 33.2308333, None)
                .await
                .unwrap();
        }

        let km = mongo
            .find_nearest(EntityKind::City, 39.92, 33.23, 5.0)
            .await
            .unwrap();
        let meters = postgis
            .find_nearest(EntityKind::City, 39.92, 33.23, 5.0)
            .await
            .unwrap();

        assert_eq!(km.len(), 1);
        assert!(meters.is_empty());
    }

    #[tokio::test]
    async fn test_far_point_returns_empty() {
        let service = service(Backend::Redis);
        service
            .create(EntityKind::City, "ELMADAĞ", 39.9208333, 33.2308333, None)
            .await
            .unwrap();

        // Roughly 500km west of Elmadağ
        let found = service
            .find_nearest(EntityKind::City, 39.92, 27.40, 0.001)
            .await
            .unwrap();
        assert!(found.is_empty());
    }

    #[tokio::test]
    async fn test_by_entity_id_missing_is_not_found() {
        let service = service(Backend::Mongo);
        let err = service
            .find_nearest_by_entity_id(EntityKind::City, "404", 10.0)
            .await
            .unwrap_err();

        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_by_entity_id_includes_reference() {
        let service = service(Backend::Mongo);
        let ankara = service
            .create(EntityKind::City, "ANKARA", 39.9334, 32.8597, None)
            .await
            .unwrap();
        service
            .create(EntityKind::City, "İSTANBUL", 41.0082, 28.9784, None)
            .await
            .unwrap();

        let found = service
            .find_nearest_by_entity_id(EntityKind::City, ankara.id.as_str(), 100.0)
            .await
            .unwrap();

        assert_eq!(found.len(), 1);
        assert_eq!(found[0].title, "ANKARA");
    }

    #[tokio::test]
    async fn test_district_requires_existing_city() {
        let service = service(Backend::Postgis);

        let missing_ref = service
            .create(EntityKind::District, "ÇANKAYA", 39.9179, 32.8627, None)
            .await
            .unwrap_err();
        assert!(matches!(missing_ref, AppError::Validation(_)));

        let unknown_city = service
            .create(EntityKind::District, "ÇANKAYA", 39.9179, 32.8627, Some("6"))
            .await
            .unwrap_err();
        assert!(matches!(unknown_city, AppError::NotFound(_)));

        let city = service
            .create(EntityKind::City, "ANKARA", 39.9334, 32.8597, None)
            .await
            .unwrap();
        let district = service
            .create(
                EntityKind::District,
                "ÇANKAYA",
                39.9179,
                32.8627,
                Some(city.id.as_str()),
            )
            .await
            .unwrap();
        assert_eq!(district.city_id, Some(city.id));
    }

    #[tokio::test]
    async fn test_create_validates_input() {
        let service = service(Backend::Postgis);

        assert!(matches!(
            service.create(EntityKind::City, "   ", 10.0, 10.0, None).await,
            Err(AppError::Validation(_))
        ));
        assert!(matches!(
            service.create(EntityKind::City, "X", 95.0, 10.0, None).await,
            Err(AppError::Validation(_))
        ));
        assert!(matches!(
            service.find_nearest(EntityKind::City, 10.0, 10.0, -1.0).await,
            Err(AppError::Validation(_))
        ));
    }
}
