//! Time-boxed cache of catalog records
//!
//! Reads prefer a fresh row from the [`AnimeCacheStore`], fall back to the
//! [`CatalogSource`] when the row is stale or missing, and write the fetched
//! record back. Single-title reads never fail because of the store: a broken
//! store degrades to a direct catalog fetch. Bulk population does surface
//! store failures to its caller.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::Utc;

use crate::{
    db::AnimeCacheStore,
    error::AppResult,
    models::{Anime, AnimeId, CachedAnime},
    services::catalog::CatalogSource,
};

#[derive(Clone)]
pub struct AnimeCacheService {
    store: Arc<dyn AnimeCacheStore>,
    catalog: Arc<dyn CatalogSource>,
}

impl AnimeCacheService {
    pub fn new(store: Arc<dyn AnimeCacheStore>, catalog: Arc<dyn CatalogSource>) -> Self {
        Self { store, catalog }
    }

    pub fn catalog(&self) -> &Arc<dyn CatalogSource> {
        &self.catalog
    }

    /// Returns the anime with `id`, or `None` if the catalog does not have it
    ///
    /// Errors from the store or the catalog are logged, never returned.
    pub async fn get_anime(&self, id: AnimeId) -> Option<Anime> {
        match self.lookup(id).await {
            Ok(anime) => anime,
            Err(e) => {
                tracing::error!(
                    anime_id = id,
                    error = %e,
                    "Anime cache unavailable, falling back to catalog"
                );
                self.fetch_from_catalog(id).await
            }
        }
    }

    async fn lookup(&self, id: AnimeId) -> AppResult<Option<Anime>> {
        match self.store.get(id).await? {
            Some(row) if row.is_fresh(Utc::now()) => {
                tracing::debug!(anime_id = id, "Anime cache hit");
                return Ok(Some(Anime::from(row)));
            }
            Some(row) => {
                tracing::debug!(
                    anime_id = id,
                    last_updated = %row.last_updated,
                    "Anime cache entry is stale"
                );
            }
            None => tracing::debug!(anime_id = id, "Anime cache miss"),
        }

        let Some(anime) = self.fetch_from_catalog(id).await else {
            tracing::info!(anime_id = id, "Anime not found in catalog");
            return Ok(None);
        };

        let row = CachedAnime::from_anime(&anime, Utc::now());
        match self.store.upsert(&row).await {
            Ok(()) => tracing::debug!(anime_id = id, "Anime cached"),
            Err(e) => tracing::warn!(
                anime_id = id,
                error = %e,
                "Failed to write anime to cache, serving catalog result"
            ),
        }

        Ok(Some(anime))
    }

    async fn fetch_from_catalog(&self, id: AnimeId) -> Option<Anime> {
        match self.catalog.fetch_anime(id).await {
            Ok(anime) => anime,
            Err(e) => {
                tracing::error!(
                    anime_id = id,
                    provider = self.catalog.name(),
                    error = %e,
                    "Catalog fetch failed"
                );
                None
            }
        }
    }

    /// Writes every record to the cache in one batch, stamped with the current time
    ///
    /// An empty slice is a no-op. A repeated id is written once, with its last
    /// occurrence. A store failure is returned to the caller.
    pub async fn cache_popular_anime(&self, animes: &[Anime]) -> AppResult<()> {
        if animes.is_empty() {
            tracing::debug!("No anime to cache");
            return Ok(());
        }

        let now = Utc::now();
        let mut rows: Vec<CachedAnime> = Vec::with_capacity(animes.len());
        let mut positions: HashMap<AnimeId, usize> = HashMap::with_capacity(animes.len());
        for anime in animes {
            let row = CachedAnime::from_anime(anime, now);
            match positions.get(&anime.id) {
                Some(&idx) => rows[idx] = row,
                None => {
                    positions.insert(anime.id, rows.len());
                    rows.push(row);
                }
            }
        }

        self.store.upsert_many(&rows).await.map_err(|e| {
            tracing::error!(count = rows.len(), error = %e, "Failed to cache popular anime");
            e
        })?;

        tracing::info!(count = rows.len(), "Cached popular anime");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::anime_cache::MockAnimeCacheStore;
    use crate::error::AppError;
    use crate::models::anime::fixtures::{anime, frieren};
    use crate::services::catalog::MockCatalogSource;
    use chrono::Duration;
    use std::sync::Mutex;
    use tokio_test::assert_ok;

    fn service(store: MockAnimeCacheStore, catalog: MockCatalogSource) -> AnimeCacheService {
        AnimeCacheService::new(Arc::new(store), Arc::new(catalog))
    }

    fn catalog_named() -> MockCatalogSource {
        let mut catalog = MockCatalogSource::new();
        catalog.expect_name().return_const("mock");
        catalog
    }

    #[tokio::test]
    async fn test_fresh_entry_is_served_without_catalog() {
        let cached = frieren();
        let row = CachedAnime::from_anime(&cached, Utc::now() - Duration::days(6));

        let mut store = MockAnimeCacheStore::new();
        store
            .expect_get()
            .withf(|id| *id == 154587)
            .times(1)
            .returning(move |_| Ok(Some(row.clone())));
        store.expect_upsert().never();

        let mut catalog = catalog_named();
        catalog.expect_fetch_anime().never();

        let result = service(store, catalog).get_anime(154587).await;
        assert_eq!(result, Some(cached));
    }

    #[tokio::test]
    async fn test_stale_entry_is_refetched_and_rewritten() {
        let mut stale = frieren();
        stale.average_score = Some(70);
        let stale_row = CachedAnime::from_anime(&stale, Utc::now() - Duration::days(7));

        let remote = frieren();
        let remote_clone = remote.clone();
        let started = Utc::now();

        let mut store = MockAnimeCacheStore::new();
        store
            .expect_get()
            .times(1)
            .returning(move |_| Ok(Some(stale_row.clone())));
        store
            .expect_upsert()
            .withf(move |row| row.average_score == Some(91) && row.last_updated >= started)
            .times(1)
            .returning(|_| Ok(()));

        let mut catalog = catalog_named();
        catalog
            .expect_fetch_anime()
            .times(1)
            .returning(move |_| Ok(Some(remote_clone.clone())));

        let result = service(store, catalog).get_anime(154587).await;
        assert_eq!(result, Some(remote));
    }

    #[tokio::test]
    async fn test_missing_entry_fetches_once_and_caches() {
        let remote = anime(30, "Neon Genesis Evangelion", &["Action", "Mecha"], 83);
        let remote_clone = remote.clone();
        let written: Arc<Mutex<Vec<CachedAnime>>> = Arc::default();
        let written_clone = written.clone();
        let started = Utc::now();

        let mut store = MockAnimeCacheStore::new();
        store.expect_get().times(1).returning(|_| Ok(None));
        store.expect_upsert().times(1).returning(move |row| {
            written_clone.lock().unwrap().push(row.clone());
            Ok(())
        });

        let mut catalog = catalog_named();
        catalog
            .expect_fetch_anime()
            .withf(|id| *id == 30)
            .times(1)
            .returning(move |_| Ok(Some(remote_clone.clone())));

        let result = service(store, catalog).get_anime(30).await;
        assert_eq!(result.as_ref(), Some(&remote));

        let written = written.lock().unwrap();
        assert_eq!(written.len(), 1);
        assert!(written[0].last_updated >= started);
        assert_eq!(Anime::from(written[0].clone()), remote);
    }

    #[tokio::test]
    async fn test_not_found_upstream_returns_none_without_write() {
        let mut store = MockAnimeCacheStore::new();
        store.expect_get().times(1).returning(|_| Ok(None));
        store.expect_upsert().never();

        let mut catalog = catalog_named();
        catalog
            .expect_fetch_anime()
            .times(1)
            .returning(|_| Ok(None));

        assert_eq!(service(store, catalog).get_anime(999999).await, None);
    }

    #[tokio::test]
    async fn test_catalog_error_on_refresh_returns_none_without_retry() {
        let mut store = MockAnimeCacheStore::new();
        store.expect_get().times(1).returning(|_| Ok(None));
        store.expect_upsert().never();

        let mut catalog = catalog_named();
        catalog
            .expect_fetch_anime()
            .times(1)
            .returning(|_| Err(AppError::ExternalApi("AniList returned status 500".to_string())));

        assert_eq!(service(store, catalog).get_anime(5).await, None);
    }

    #[tokio::test]
    async fn test_write_failure_still_returns_fetched_record() {
        let remote = anime(1, "Cowboy Bebop", &["Action", "Sci-Fi"], 86);
        let remote_clone = remote.clone();

        let mut store = MockAnimeCacheStore::new();
        store.expect_get().times(1).returning(|_| Ok(None));
        store
            .expect_upsert()
            .times(1)
            .returning(|_| Err(AppError::Internal("connection reset".to_string())));

        let mut catalog = catalog_named();
        catalog
            .expect_fetch_anime()
            .times(1)
            .returning(move |_| Ok(Some(remote_clone.clone())));

        assert_eq!(service(store, catalog).get_anime(1).await, Some(remote));
    }

    #[tokio::test]
    async fn test_read_failure_falls_back_to_catalog() {
        let remote = anime(20, "Naruto", &["Action"], 79);
        let remote_clone = remote.clone();

        let mut store = MockAnimeCacheStore::new();
        store
            .expect_get()
            .times(1)
            .returning(|_| Err(AppError::Internal("pool timed out".to_string())));
        store.expect_upsert().never();

        let mut catalog = catalog_named();
        catalog
            .expect_fetch_anime()
            .times(1)
            .returning(move |_| Ok(Some(remote_clone.clone())));

        assert_eq!(service(store, catalog).get_anime(20).await, Some(remote));
    }

    #[tokio::test]
    async fn test_read_failure_and_catalog_failure_yield_none() {
        let mut store = MockAnimeCacheStore::new();
        store
            .expect_get()
            .returning(|_| Err(AppError::Internal("pool timed out".to_string())));

        let mut catalog = catalog_named();
        catalog
            .expect_fetch_anime()
            .times(1)
            .returning(|_| Err(AppError::ExternalApi("timeout".to_string())));

        assert_eq!(service(store, catalog).get_anime(20).await, None);
    }

    #[tokio::test]
    async fn test_cache_popular_empty_is_noop() {
        let mut store = MockAnimeCacheStore::new();
        store.expect_upsert_many().never();

        let result = service(store, MockCatalogSource::new())
            .cache_popular_anime(&[])
            .await;
        assert_ok!(result);
    }

    #[tokio::test]
    async fn test_cache_popular_writes_every_record_in_one_batch() {
        let animes = vec![
            anime(1, "Cowboy Bebop", &["Action"], 86),
            anime(5, "Cowboy Bebop: The Movie", &["Action"], 82),
            anime(6, "Trigun", &["Action", "Comedy"], 79),
        ];
        let started = Utc::now();

        let mut store = MockAnimeCacheStore::new();
        store
            .expect_upsert_many()
            .withf(move |rows| {
                rows.iter().map(|r| r.id).collect::<Vec<_>>() == vec![1, 5, 6]
                    && rows.iter().all(|r| r.last_updated >= started)
            })
            .times(1)
            .returning(|_| Ok(()));

        let result = service(store, MockCatalogSource::new())
            .cache_popular_anime(&animes)
            .await;
        assert_ok!(result);
    }

    #[tokio::test]
    async fn test_cache_popular_writes_repeated_id_once_with_last_record() {
        let animes = vec![
            anime(1, "Cowboy Bebop", &["Action"], 80),
            anime(6, "Trigun", &["Action"], 79),
            anime(1, "Cowboy Bebop", &["Action"], 86),
        ];

        let mut store = MockAnimeCacheStore::new();
        store
            .expect_upsert_many()
            .withf(|rows| {
                rows.iter().map(|r| r.id).collect::<Vec<_>>() == vec![1, 6]
                    && rows[0].average_score == Some(86)
            })
            .times(1)
            .returning(|_| Ok(()));

        let result = service(store, MockCatalogSource::new())
            .cache_popular_anime(&animes)
            .await;
        assert_ok!(result);
    }

    #[tokio::test]
    async fn test_cache_popular_propagates_store_failure() {
        let mut store = MockAnimeCacheStore::new();
        store
            .expect_upsert_many()
            .times(1)
            .returning(|_| Err(AppError::Internal("disk full".to_string())));

        let result = service(store, MockCatalogSource::new())
            .cache_popular_anime(&[frieren()])
            .await;
        assert!(matches!(result, Err(AppError::Internal(_))));
    }
}
