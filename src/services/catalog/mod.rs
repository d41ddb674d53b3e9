//! Anime catalog abstraction
//!
//! Cache logic and the listing endpoints only talk to the catalog through
//! [`CatalogSource`], so the AniList client can be swapped for another source,
//! or for a fake in tests.

use crate::{
    error::AppResult,
    models::{Anime, AnimeId, AnimePage},
};

pub mod anilist;

pub use anilist::AniListClient;

/// Largest page size the catalog serves
pub const MAX_PER_PAGE: u32 = 50;

/// Remote source of anime metadata
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait CatalogSource: Send + Sync {
    /// Fetch one title by catalog id
    ///
    /// An id the catalog does not know is `Ok(None)`, not an error.
    async fn fetch_anime(&self, id: AnimeId) -> AppResult<Option<Anime>>;

    /// Search titles by name, most popular first
    async fn search_anime(&self, query: &str) -> AppResult<Vec<Anime>>;

    /// One page of the popularity ranking
    async fn popular_anime(&self, page: u32, per_page: u32) -> AppResult<AnimePage>;

    /// Source name for logging
    fn name(&self) -> &'static str;
}
