use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::{
    error::AppResult,
    models::{AnimeId, WatchStatus, WatchlistEntry},
};

/// Per-user watchlists
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait WatchlistStore: Send + Sync {
    async fn get(&self, user_id: Uuid, anime_id: AnimeId) -> AppResult<Option<WatchlistEntry>>;

    /// Entries of one user, most recently updated first
    async fn list(&self, user_id: Uuid) -> AppResult<Vec<WatchlistEntry>>;

    /// Inserts the entry or overwrites the one with the same (user, anime) key
    async fn save(&self, entry: &WatchlistEntry) -> AppResult<()>;

    /// Returns whether an entry was removed
    async fn remove(&self, user_id: Uuid, anime_id: AnimeId) -> AppResult<bool>;
}

#[derive(sqlx::FromRow)]
struct WatchlistRow {
    user_id: Uuid,
    anime_id: AnimeId,
    status: String,
    rating: Option<i16>,
    notes: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<WatchlistRow> for WatchlistEntry {
    type Error = crate::error::AppError;

    fn try_from(row: WatchlistRow) -> Result<Self, Self::Error> {
        Ok(WatchlistEntry {
            user_id: row.user_id,
            anime_id: row.anime_id,
            status: row.status.parse::<WatchStatus>()?,
            rating: row.rating,
            notes: row.notes,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

/// `watchlist` table in PostgreSQL
#[derive(Clone)]
pub struct PgWatchlistStore {
    pool: PgPool,
}

impl PgWatchlistStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait::async_trait]
impl WatchlistStore for PgWatchlistStore {
    async fn get(&self, user_id: Uuid, anime_id: AnimeId) -> AppResult<Option<WatchlistEntry>> {
        let row = sqlx::query_as::<_, WatchlistRow>(
            r#"
            SELECT user_id, anime_id, status, rating, notes, created_at, updated_at
            FROM watchlist
            WHERE user_id = $1 AND anime_id = $2
            "#,
        )
        .bind(user_id)
        .bind(anime_id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(WatchlistEntry::try_from).transpose()
    }

    async fn list(&self, user_id: Uuid) -> AppResult<Vec<WatchlistEntry>> {
        let rows = sqlx::query_as::<_, WatchlistRow>(
            r#"
            SELECT user_id, anime_id, status, rating, notes, created_at, updated_at
            FROM watchlist
            WHERE user_id = $1
            ORDER BY updated_at DESC
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(WatchlistEntry::try_from).collect()
    }

    async fn save(&self, entry: &WatchlistEntry) -> AppResult<()> {
        sqlx::query(
            r#"
            INSERT INTO watchlist (user_id, anime_id, status, rating, notes, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            ON CONFLICT (user_id, anime_id) DO UPDATE SET
                status = EXCLUDED.status,
                rating = EXCLUDED.rating,
                notes = EXCLUDED.notes,
                updated_at = EXCLUDED.updated_at
            "#,
        )
        .bind(entry.user_id)
        .bind(entry.anime_id)
        .bind(entry.status.as_str())
        .bind(entry.rating)
        .bind(&entry.notes)
        .bind(entry.created_at)
        .bind(entry.updated_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn remove(&self, user_id: Uuid, anime_id: AnimeId) -> AppResult<bool> {
        let result = sqlx::query("DELETE FROM watchlist WHERE user_id = $1 AND anime_id = $2")
            .bind(user_id)
            .bind(anime_id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}
