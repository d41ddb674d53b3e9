use std::sync::Arc;

use crate::{
    db::{AnimeCacheStore, MemoryStore, WatchlistStore},
    services::{AnimeCacheService, CatalogSource, WatchlistService},
};

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub anime: AnimeCacheService,
    pub watchlist: WatchlistService,
}

impl AppState {
    pub fn new(
        anime_store: Arc<dyn AnimeCacheStore>,
        watchlist_store: Arc<dyn WatchlistStore>,
        catalog: Arc<dyn CatalogSource>,
    ) -> Self {
        let anime = AnimeCacheService::new(anime_store, catalog);
        let watchlist = WatchlistService::new(watchlist_store, anime.clone());
        Self { anime, watchlist }
    }

    /// State backed by a fresh [`MemoryStore`]
    pub fn in_memory(catalog: Arc<dyn CatalogSource>) -> Self {
        let store = MemoryStore::new();
        Self::new(Arc::new(store.clone()), Arc::new(store), catalog)
    }
}
