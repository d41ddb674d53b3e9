//! Browsing helpers over catalog listings: genre and episode filters, and
//! the anime of the day.

use rand::seq::IndexedRandom;

use crate::{
    error::AppResult,
    models::Anime,
    services::catalog::{CatalogSource, MAX_PER_PAGE},
};

/// An upper episode bound at or above this value means "no upper bound"
pub const UNBOUNDED_MAX_EPISODES: u32 = 100;

/// Narrowing applied to a listing page
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AnimeFilter {
    /// A title must carry every one of these genres
    pub genres: Vec<String>,
    pub min_episodes: Option<u32>,
    pub max_episodes: Option<u32>,
}

impl AnimeFilter {
    /// Builds a filter from a comma-separated genre list and episode bounds
    pub fn from_query(genres: Option<&str>, min_episodes: Option<u32>, max_episodes: Option<u32>) -> Self {
        let genres = genres
            .map(|list| {
                list.split(',')
                    .map(str::trim)
                    .filter(|g| !g.is_empty())
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default();

        Self {
            genres,
            min_episodes,
            max_episodes,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.genres.is_empty()
            && self.min_episodes.unwrap_or(0) == 0
            && self.max_episodes.map_or(true, |max| max >= UNBOUNDED_MAX_EPISODES)
    }

    /// Whether a title passes the filter
    ///
    /// Episode bounds only apply to titles with a known episode count.
    pub fn matches(&self, anime: &Anime) -> bool {
        if !self.genres.iter().all(|g| anime.genres.contains(g)) {
            return false;
        }

        let Some(episodes) = anime.episodes.and_then(|e| u32::try_from(e).ok()) else {
            return true;
        };
        if episodes == 0 {
            return true;
        }

        if let Some(min) = self.min_episodes {
            if min > 0 && episodes < min {
                return false;
            }
        }
        if let Some(max) = self.max_episodes {
            if max < UNBOUNDED_MAX_EPISODES && episodes > max {
                return false;
            }
        }

        true
    }

    /// Keeps the titles that pass, in their original order
    pub fn apply(&self, media: Vec<Anime>) -> Vec<Anime> {
        if self.is_empty() {
            return media;
        }
        media.into_iter().filter(|a| self.matches(a)).collect()
    }
}

/// A random title from the first popularity page, `None` if the page is empty
pub async fn anime_of_the_day(catalog: &dyn CatalogSource) -> AppResult<Option<Anime>> {
    let listing = catalog.popular_anime(1, MAX_PER_PAGE).await?;
    let pick = pick_random(&listing.media).cloned();

    if let Some(anime) = &pick {
        tracing::info!(anime_id = anime.id, title = %anime.display_title(), "Anime of the day picked");
    }

    Ok(pick)
}

fn pick_random(media: &[Anime]) -> Option<&Anime> {
    media.choose(&mut rand::rng())
}
