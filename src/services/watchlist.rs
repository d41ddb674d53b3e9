use std::sync::Arc;

use tokio::task::JoinSet;
use uuid::Uuid;

use crate::{
    db::WatchlistStore,
    error::{AppError, AppResult},
    models::{AnimeId, WatchStatus, WatchlistEntry, WatchlistItem, WatchlistUpdate},
    services::anime_cache::AnimeCacheService,
};

/// Watchlist operations, with catalog data resolved through the anime cache
#[derive(Clone)]
pub struct WatchlistService {
    store: Arc<dyn WatchlistStore>,
    anime: AnimeCacheService,
}

fn validate_anime_id(anime_id: AnimeId) -> AppResult<()> {
    if anime_id <= 0 {
        return Err(AppError::InvalidInput(format!(
            "Anime id must be positive, got {}",
            anime_id
        )));
    }
    Ok(())
}

impl WatchlistService {
    pub fn new(store: Arc<dyn WatchlistStore>, anime: AnimeCacheService) -> Self {
        Self { store, anime }
    }

    pub fn anime(&self) -> &AnimeCacheService {
        &self.anime
    }

    /// Adds a title, or changes its status if it is already listed
    pub async fn add(
        &self,
        user_id: Uuid,
        anime_id: AnimeId,
        status: Option<WatchStatus>,
    ) -> AppResult<WatchlistEntry> {
        validate_anime_id(anime_id)?;

        if let Some(mut entry) = self.store.get(user_id, anime_id).await? {
            if let Some(status) = status {
                WatchlistUpdate {
                    status: Some(status),
                    ..Default::default()
                }
                .apply_to(&mut entry);
                self.store.save(&entry).await?;
            }
            return Ok(entry);
        }

        if self.anime.get_anime(anime_id).await.is_none() {
            return Err(AppError::NotFound(format!("Anime {} not found", anime_id)));
        }

        let entry = WatchlistEntry::new(user_id, anime_id, status.unwrap_or_default());
        self.store.save(&entry).await?;

        tracing::info!(
            user_id = %user_id,
            anime_id,
            status = entry.status.as_str(),
            "Added anime to watchlist"
        );

        Ok(entry)
    }

    pub async fn get(&self, user_id: Uuid, anime_id: AnimeId) -> AppResult<WatchlistEntry> {
        self.store
            .get(user_id, anime_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Anime {} is not on the watchlist", anime_id)))
    }

    pub async fn update(
        &self,
        user_id: Uuid,
        anime_id: AnimeId,
        update: WatchlistUpdate,
    ) -> AppResult<WatchlistEntry> {
        update.validate()?;

        let mut entry = self.get(user_id, anime_id).await?;
        update.apply_to(&mut entry);
        self.store.save(&entry).await?;

        Ok(entry)
    }

    /// Returns whether the title was on the watchlist
    pub async fn remove(&self, user_id: Uuid, anime_id: AnimeId) -> AppResult<bool> {
        let removed = self.store.remove(user_id, anime_id).await?;
        if removed {
            tracing::info!(user_id = %user_id, anime_id, "Removed anime from watchlist");
        }
        Ok(removed)
    }

    /// Entries without catalog data
    pub async fn entries(&self, user_id: Uuid) -> AppResult<Vec<WatchlistEntry>> {
        self.store.list(user_id).await
    }

    /// Entries joined with their anime, most recently updated first
    ///
    /// Lookups run concurrently. A title the catalog no longer has is listed
    /// with `anime: None`.
    pub async fn list(&self, user_id: Uuid) -> AppResult<Vec<WatchlistItem>> {
        let entries = self.store.list(user_id).await?;

        let mut lookups = JoinSet::new();
        for (index, entry) in entries.iter().enumerate() {
            let anime = self.anime.clone();
            let anime_id = entry.anime_id;
            lookups.spawn(async move { (index, anime.get_anime(anime_id).await) });
        }

        let mut resolved = vec![None; entries.len()];
        while let Some(joined) = lookups.join_next().await {
            match joined {
                Ok((index, anime)) => resolved[index] = anime,
                Err(e) => tracing::error!(error = %e, "Watchlist lookup task failed"),
            }
        }

        Ok(entries
            .into_iter()
            .zip(resolved)
            .map(|(entry, anime)| WatchlistItem { entry, anime })
            .collect())
    }
}
