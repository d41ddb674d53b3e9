use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::RwLock;
use uuid::Uuid;

use super::{AnimeCacheStore, WatchlistStore};
use crate::{
    error::AppResult,
    models::{AnimeId, CachedAnime, WatchlistEntry},
};

/// In-process store used when no database is configured, and by tests
///
/// Cloning shares the underlying maps. Nothing is persisted.
#[derive(Clone, Default)]
pub struct MemoryStore {
    inner: Arc<RwLock<MemoryStoreInner>>,
}

#[derive(Default)]
struct MemoryStoreInner {
    anime: HashMap<AnimeId, CachedAnime>,
    watchlists: HashMap<(Uuid, AnimeId), WatchlistEntry>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of cached anime rows
    pub async fn cached_len(&self) -> usize {
        self.inner.read().await.anime.len()
    }
}

#[async_trait::async_trait]
impl AnimeCacheStore for MemoryStore {
    async fn get(&self, id: AnimeId) -> AppResult<Option<CachedAnime>> {
        Ok(self.inner.read().await.anime.get(&id).cloned())
    }

    async fn upsert(&self, row: &CachedAnime) -> AppResult<()> {
        self.inner.write().await.anime.insert(row.id, row.clone());
        Ok(())
    }

    async fn upsert_many(&self, rows: &[CachedAnime]) -> AppResult<()> {
        let mut inner = self.inner.write().await;
        for row in rows {
            inner.anime.insert(row.id, row.clone());
        }
        Ok(())
    }
}

#[async_trait::async_trait]
impl WatchlistStore for MemoryStore {
    async fn get(&self, user_id: Uuid, anime_id: AnimeId) -> AppResult<Option<WatchlistEntry>> {
        Ok(self
            .inner
            .read()
            .await
            .watchlists
            .get(&(user_id, anime_id))
            .cloned())
    }

    async fn list(&self, user_id: Uuid) -> AppResult<Vec<WatchlistEntry>> {
        let inner = self.inner.read().await;
        let mut entries: Vec<WatchlistEntry> = inner
            .watchlists
            .values()
            .filter(|entry| entry.user_id == user_id)
            .cloned()
            .collect();
        entries.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
        Ok(entries)
    }

    async fn save(&self, entry: &WatchlistEntry) -> AppResult<()> {
        self.inner
            .write()
            .await
            .watchlists
            .insert((entry.user_id, entry.anime_id), entry.clone());
        Ok(())
    }

    async fn remove(&self, user_id: Uuid, anime_id: AnimeId) -> AppResult<bool> {
        Ok(self
            .inner
            .write()
            .await
            .watchlists
            .remove(&(user_id, anime_id))
            .is_some())
    }
}
