pub mod anime_cache;
pub mod catalog;
pub mod discovery;
pub mod links;
pub mod recommendations;
pub mod watchlist;

pub use anime_cache::AnimeCacheService;
pub use catalog::{AniListClient, CatalogSource};
pub use watchlist::WatchlistService;
