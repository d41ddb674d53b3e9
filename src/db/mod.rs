pub mod anime_cache;
pub mod memory;
pub mod postgres;
pub mod redis;
pub mod watchlist;

pub use anime_cache::{AnimeCacheStore, PgAnimeCacheStore};
pub use memory::MemoryStore;
pub use postgres::{create_pool, run_migrations};
pub use self::redis::create_redis_client;
pub use self::redis::Cache;
pub use self::redis::CacheKey;
pub use self::redis::CacheWriterHandle;
pub use watchlist::{PgWatchlistStore, WatchlistStore};
