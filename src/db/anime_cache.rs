use sqlx::{PgPool, Postgres, QueryBuilder};

use crate::{
    error::AppResult,
    models::{AnimeId, CachedAnime},
};

/// Largest number of rows sent in one INSERT; keeps binds under the Postgres limit
const UPSERT_CHUNK_SIZE: usize = 1000;

const COLUMNS: &str = "id, title_english, title_romaji, title_native, description, \
     cover_image_large, cover_image_medium, average_score, episodes, season_year, \
     genres, status, season, site_url, last_updated";

const ON_CONFLICT_UPDATE: &str = r#"
    ON CONFLICT (id) DO UPDATE SET
        title_english = EXCLUDED.title_english,
        title_romaji = EXCLUDED.title_romaji,
        title_native = EXCLUDED.title_native,
        description = EXCLUDED.description,
        cover_image_large = EXCLUDED.cover_image_large,
        cover_image_medium = EXCLUDED.cover_image_medium,
        average_score = EXCLUDED.average_score,
        episodes = EXCLUDED.episodes,
        season_year = EXCLUDED.season_year,
        genres = EXCLUDED.genres,
        status = EXCLUDED.status,
        season = EXCLUDED.season,
        site_url = EXCLUDED.site_url,
        last_updated = EXCLUDED.last_updated
"#;

/// Persistent store of cached anime rows, keyed by catalog id
///
/// Every write is an upsert: at most one row exists per id.
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait AnimeCacheStore: Send + Sync {
    /// Point read of a single row
    async fn get(&self, id: AnimeId) -> AppResult<Option<CachedAnime>>;

    /// Inserts the row or overwrites the existing one with the same id
    async fn upsert(&self, row: &CachedAnime) -> AppResult<()>;

    /// Upserts all rows as one unit; either every row is written or none is
    async fn upsert_many(&self, rows: &[CachedAnime]) -> AppResult<()>;
}

/// `anime_cache` table in PostgreSQL
#[derive(Clone)]
pub struct PgAnimeCacheStore {
    pool: PgPool,
}

impl PgAnimeCacheStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    fn build_upsert(rows: &[CachedAnime]) -> QueryBuilder<'_, Postgres> {
        let mut builder =
            QueryBuilder::<Postgres>::new(format!("INSERT INTO anime_cache ({}) ", COLUMNS));

        builder.push_values(rows, |mut b, row| {
            b.push_bind(row.id)
                .push_bind(&row.title_english)
                .push_bind(&row.title_romaji)
                .push_bind(&row.title_native)
                .push_bind(&row.description)
                .push_bind(&row.cover_image_large)
                .push_bind(&row.cover_image_medium)
                .push_bind(row.average_score)
                .push_bind(row.episodes)
                .push_bind(row.season_year)
                .push_bind(&row.genres)
                .push_bind(&row.status)
                .push_bind(&row.season)
                .push_bind(&row.site_url)
                .push_bind(row.last_updated);
        });

        builder.push(ON_CONFLICT_UPDATE);
        builder
    }
}

#[async_trait::async_trait]
impl AnimeCacheStore for PgAnimeCacheStore {
    async fn get(&self, id: AnimeId) -> AppResult<Option<CachedAnime>> {
        let row = sqlx::query_as::<_, CachedAnime>(&format!(
            "SELECT {} FROM anime_cache WHERE id = $1",
            COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row)
    }

    async fn upsert(&self, row: &CachedAnime) -> AppResult<()> {
        Self::build_upsert(std::slice::from_ref(row))
            .build()
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    async fn upsert_many(&self, rows: &[CachedAnime]) -> AppResult<()> {
        if rows.is_empty() {
            return Ok(());
        }

        let mut tx = self.pool.begin().await?;
        for chunk in rows.chunks(UPSERT_CHUNK_SIZE) {
            Self::build_upsert(chunk).build().execute(&mut *tx).await?;
        }
        tx.commit().await?;

        tracing::debug!(rows = rows.len(), "Bulk upserted anime cache rows");

        Ok(())
    }
}
