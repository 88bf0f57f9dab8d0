use std::sync::Arc;

use tracing::info;

use crate::core::error::{AppError, Result};
use crate::features::geo::models::{Backend, EntityKind};
use crate::features::geo::store::{ProximityStore, SeedReport};
use crate::features::seed::dataset::SeedDataset;

/// Write-path operations run from the CLI against one store
pub struct SeedService {
    store: Arc<dyn ProximityStore>,
}

impl SeedService {
    pub fn new(store: Arc<dyn ProximityStore>) -> Self {
        Self { store }
    }

    pub fn backend(&self) -> Backend {
        self.store.backend()
    }

    async fn total(&self) -> Result<u64> {
        let mut total = 0;
        for kind in EntityKind::ALL {
            total += self.store.count(kind).await?;
        }
        Ok(total)
    }

    /// Replace the store's contents with `dataset`.
    ///
    /// A store that already holds entities is left alone unless `force` is set.
    pub async fn reseed(&self, dataset: &SeedDataset, force: bool) -> Result<SeedReport> {
        let existing = self.total().await?;
        if existing > 0 && !force {
            return Err(AppError::Conflict(format!(
                "{} already holds {} entities, pass --force to reseed",
                self.backend(),
                existing
            )));
        }

        let batch = dataset.to_batch()?;
        info!(
            "Reseeding {} with {} cities and {} districts",
            self.backend(),
            batch.cities.len(),
            batch.districts.len()
        );

        let report = self.store.reseed(batch).await?;
        info!(
            "Reseed of {} complete: {} cities, {} districts",
            report.backend, report.cities, report.districts
        );
        Ok(report)
    }

    /// Rewrite every stored geometry from its coordinates
    pub async fn backfill(&self) -> Result<u64> {
        let mut saved = 0;
        for kind in EntityKind::ALL {
            let entities = self.store.find_all(kind).await?;
            let count = self.store.save_all(entities).await?;
            info!("Backfilled {} {} geometries in {}", count, kind, self.backend());
            saved += count;
        }
        Ok(saved)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shared::test_helpers::InMemoryStore;

    fn service() -> SeedService {
        SeedService::new(InMemoryStore::shared(Backend::Mongo))
    }

    #[tokio::test]
    async fn test_reseed_twice_is_idempotent() {
        let service = service();
        let dataset = SeedDataset::bundled().unwrap();

        let first = service.reseed(&dataset, false).await.unwrap();
        let first_titles: Vec<String> = service
            .store
            .find_all(EntityKind::District)
            .await
            .unwrap()
            .into_iter()
            .map(|d| d.title)
            .collect();

        let second = service.reseed(&dataset, true).await.unwrap();
        let second_titles: Vec<String> = service
            .store
            .find_all(EntityKind::District)
            .await
            .unwrap()
            .into_iter()
            .map(|d| d.title)
            .collect();

        assert_eq!(first, second);
        assert_eq!(first.cities, dataset.cities.len() as u64);
        assert_eq!(first.districts, dataset.district_count() as u64);
        assert_eq!(first_titles, second_titles);
    }

    #[tokio::test]
    async fn test_reseed_refuses_non_empty_store() {
        let service = service();
        let dataset = SeedDataset::bundled().unwrap();
        service.reseed(&dataset, false).await.unwrap();

        let err = service.reseed(&dataset, false).await.unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));
    }

    #[tokio::test]
    async fn test_duplicate_ids_conflict() {
        let service = service();
        let dataset = SeedDataset::parse(
            r#"[
                {"id": 6, "title": "ANKARA", "lat": "39.93", "lng": "32.85"},
                {"id": "6", "title": "ANKARA", "lat": "39.93", "lng": "32.85"}
            ]"#,
        )
        .unwrap();

        let err = service.reseed(&dataset, false).await.unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));
    }

    #[tokio::test]
    async fn test_backfill_keeps_entities() {
        let service = service();
        let dataset = SeedDataset::bundled().unwrap();
        let report = service.reseed(&dataset, false).await.unwrap();

        let saved = service.backfill().await.unwrap();
        assert_eq!(saved, report.cities + report.districts);
        assert_eq!(
            service.store.count(EntityKind::City).await.unwrap(),
            report.cities
        );
    }
}
