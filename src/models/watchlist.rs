use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::anime::{Anime, AnimeId};
use crate::error::{AppError, AppResult};

/// Where a user is with a title
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum WatchStatus {
    Watching,
    Completed,
    #[default]
    Planning,
    Dropped,
    Paused,
}

impl WatchStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            WatchStatus::Watching => "WATCHING",
            WatchStatus::Completed => "COMPLETED",
            WatchStatus::Planning => "PLANNING",
            WatchStatus::Dropped => "DROPPED",
            WatchStatus::Paused => "PAUSED",
        }
    }
}

impl std::str::FromStr for WatchStatus {
    type Err = AppError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "WATCHING" => Ok(WatchStatus::Watching),
            "COMPLETED" => Ok(WatchStatus::Completed),
            "PLANNING" => Ok(WatchStatus::Planning),
            "DROPPED" => Ok(WatchStatus::Dropped),
            "PAUSED" => Ok(WatchStatus::Paused),
            other => Err(AppError::Internal(format!(
                "Unknown watch status in store: {}",
                other
            ))),
        }
    }
}

/// A title on a user's watchlist
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct WatchlistEntry {
    pub user_id: Uuid,
    pub anime_id: AnimeId,
    pub status: WatchStatus,
    pub rating: Option<i16>,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl WatchlistEntry {
    pub fn new(user_id: Uuid, anime_id: AnimeId, status: WatchStatus) -> Self {
        let now = Utc::now();
        Self {
            user_id,
            anime_id,
            status,
            rating: None,
            notes: None,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Partial update of an existing entry; `None` leaves a field untouched
#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
pub struct WatchlistUpdate {
    pub status: Option<WatchStatus>,
    pub rating: Option<i16>,
    pub notes: Option<String>,
}

impl WatchlistUpdate {
    /// Rejects ratings outside 1..=10
    pub fn validate(&self) -> AppResult<()> {
        match self.rating {
            Some(rating) if !(1..=10).contains(&rating) => Err(AppError::InvalidInput(format!(
                "Rating must be between 1 and 10, got {}",
                rating
            ))),
            _ => Ok(()),
        }
    }

    pub fn apply_to(self, entry: &mut WatchlistEntry) {
        if let Some(status) = self.status {
            entry.status = status;
        }
        if let Some(rating) = self.rating {
            entry.rating = Some(rating);
        }
        if let Some(notes) = self.notes {
            entry.notes = Some(notes);
        }
        entry.updated_at = Utc::now();
    }
}

/// Watchlist entry joined with its catalog record
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct WatchlistItem {
    #[serde(flatten)]
    pub entry: WatchlistEntry,
    pub anime: Option<Anime>,
}
