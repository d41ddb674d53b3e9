pub mod anime;
pub mod watchlist;

pub use anime::{
    Anime, AnimeId, AnimePage, AnimeTitle, CachedAnime, CoverImage, MediaSeason, MediaStatus,
    PageInfo, CACHE_FRESHNESS_SECS,
};
pub use watchlist::{WatchStatus, WatchlistEntry, WatchlistItem, WatchlistUpdate};
