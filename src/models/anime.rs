use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt::Display;

/// Catalog identifier shared by AniList and the cache table
pub type AnimeId = i32;

/// How long a cached row is served before it is refetched
pub const CACHE_FRESHNESS_SECS: i64 = 604800; // 7 days

/// Reads an explicit `null` as the type's default
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// Anime record in the shape the AniList API returns it
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Anime {
    pub id: AnimeId,
    #[serde(default, deserialize_with = "null_as_default")]
    pub title: AnimeTitle,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub cover_image: CoverImage,
    #[serde(default)]
    pub average_score: Option<i32>,
    #[serde(default)]
    pub episodes: Option<i32>,
    #[serde(default)]
    pub season_year: Option<i32>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub genres: Vec<String>,
    #[serde(default)]
    pub status: Option<MediaStatus>,
    #[serde(default)]
    pub season: Option<MediaSeason>,
    #[serde(default)]
    pub site_url: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct AnimeTitle {
    #[serde(default)]
    pub romaji: Option<String>,
    #[serde(default)]
    pub english: Option<String>,
    #[serde(default)]
    pub native: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct CoverImage {
    #[serde(default)]
    pub large: Option<String>,
    #[serde(default)]
    pub medium: Option<String>,
}

impl Anime {
    /// Best human-readable title: English, then romaji, then native
    pub fn display_title(&self) -> &str {
        self.title
            .english
            .as_deref()
            .or(self.title.romaji.as_deref())
            .or(self.title.native.as_deref())
            .unwrap_or("Untitled")
    }
}

/// Airing status as reported by AniList
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MediaStatus {
    Finished,
    Releasing,
    NotYetReleased,
    Cancelled,
    Hiatus,
    #[serde(other)]
    Unknown,
}

impl MediaStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            MediaStatus::Finished => "FINISHED",
            MediaStatus::Releasing => "RELEASING",
            MediaStatus::NotYetReleased => "NOT_YET_RELEASED",
            MediaStatus::Cancelled => "CANCELLED",
            MediaStatus::Hiatus => "HIATUS",
            MediaStatus::Unknown => "UNKNOWN",
        }
    }

    pub fn parse(value: &str) -> Self {
        match value {
            "FINISHED" => MediaStatus::Finished,
            "RELEASING" => MediaStatus::Releasing,
            "NOT_YET_RELEASED" => MediaStatus::NotYetReleased,
            "CANCELLED" => MediaStatus::Cancelled,
            "HIATUS" => MediaStatus::Hiatus,
            _ => MediaStatus::Unknown,
        }
    }
}

impl Display for MediaStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Broadcast season
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MediaSeason {
    Winter,
    Spring,
    Summer,
    Fall,
    #[serde(other)]
    Unknown,
}

impl MediaSeason {
    pub fn as_str(&self) -> &'static str {
        match self {
            MediaSeason::Winter => "WINTER",
            MediaSeason::Spring => "SPRING",
            MediaSeason::Summer => "SUMMER",
            MediaSeason::Fall => "FALL",
            MediaSeason::Unknown => "UNKNOWN",
        }
    }

    pub fn parse(value: &str) -> Self {
        match value {
            "WINTER" => MediaSeason::Winter,
            "SPRING" => MediaSeason::Spring,
            "SUMMER" => MediaSeason::Summer,
            "FALL" => MediaSeason::Fall,
            _ => MediaSeason::Unknown,
        }
    }
}

impl Display for MediaSeason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Row of the `anime_cache` table
///
/// Mirrors [`Anime`] with flattened, prefixed columns plus the time the row
/// was last written.
#[derive(Debug, Clone, PartialEq, sqlx::FromRow)]
pub struct CachedAnime {
    pub id: AnimeId,
    pub title_english: Option<String>,
    pub title_romaji: Option<String>,
    pub title_native: Option<String>,
    pub description: Option<String>,
    pub cover_image_large: Option<String>,
    pub cover_image_medium: Option<String>,
    pub average_score: Option<i32>,
    pub episodes: Option<i32>,
    pub season_year: Option<i32>,
    pub genres: Vec<String>,
    pub status: Option<String>,
    pub season: Option<String>,
    pub site_url: Option<String>,
    pub last_updated: DateTime<Utc>,
}

impl CachedAnime {
    /// Builds a cache row from a catalog record, stamped with `last_updated`
    pub fn from_anime(anime: &Anime, last_updated: DateTime<Utc>) -> Self {
        Self {
            id: anime.id,
            title_english: anime.title.english.clone(),
            title_romaji: anime.title.romaji.clone(),
            title_native: anime.title.native.clone(),
            description: anime.description.clone(),
            cover_image_large: anime.cover_image.large.clone(),
            cover_image_medium: anime.cover_image.medium.clone(),
            average_score: anime.average_score,
            episodes: anime.episodes,
            season_year: anime.season_year,
            genres: anime.genres.clone(),
            status: anime.status.map(|s| s.as_str().to_string()),
            season: anime.season.map(|s| s.as_str().to_string()),
            site_url: anime.site_url.clone(),
            last_updated,
        }
    }

    /// Whether the row is younger than the freshness window at `now`
    pub fn is_fresh(&self, now: DateTime<Utc>) -> bool {
        now - self.last_updated < Duration::seconds(CACHE_FRESHNESS_SECS)
    }
}

impl From<CachedAnime> for Anime {
    fn from(row: CachedAnime) -> Self {
        Anime {
            id: row.id,
            title: AnimeTitle {
                romaji: row.title_romaji,
                english: row.title_english,
                native: row.title_native,
            },
            description: row.description,
            cover_image: CoverImage {
                large: row.cover_image_large,
                medium: row.cover_image_medium,
            },
            average_score: row.average_score,
            episodes: row.episodes,
            season_year: row.season_year,
            genres: row.genres,
            status: row.status.as_deref().map(MediaStatus::parse),
            season: row.season.as_deref().map(MediaSeason::parse),
            site_url: row.site_url,
        }
    }
}

/// One page of a catalog listing
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AnimePage {
    pub page_info: PageInfo,
    pub media: Vec<Anime>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PageInfo {
    #[serde(default)]
    pub total: Option<i32>,
    #[serde(default)]
    pub current_page: Option<i32>,
    #[serde(default)]
    pub last_page: Option<i32>,
    #[serde(default)]
    pub has_next_page: Option<bool>,
    #[serde(default)]
    pub per_page: Option<i32>,
}


#[cfg(test)]
mod tests {
    use super::fixtures::frieren;
    use super::*;

    #[test]
    fn test_cache_row_round_trip_preserves_every_field() {
        let anime = frieren();
        let row = CachedAnime::from_anime(&anime, Utc::now());

        assert_eq!(row.title_english.as_deref(), Some("Frieren: Beyond Journey's End"));
        assert_eq!(row.cover_image_large, anime.cover_image.large);
        assert_eq!(row.status.as_deref(), Some("FINISHED"));
        assert_eq!(row.season.as_deref(), Some("FALL"));

        assert_eq!(Anime::from(row), anime);
    }

    #[test]
    fn test_round_trip_with_missing_optional_fields() {
        let anime = Anime {
            id: 1,
            title: AnimeTitle::default(),
            description: None,
            cover_image: CoverImage::default(),
            average_score: None,
            episodes: None,
            season_year: None,
            genres: vec![],
            status: None,
            season: None,
            site_url: None,
        };

        let row = CachedAnime::from_anime(&anime, Utc::now());
        assert_eq!(Anime::from(row), anime);
    }

    #[test]
    fn test_freshness_boundary() {
        let now = Utc::now();
        let mut row = CachedAnime::from_anime(&frieren(), now);

        assert!(row.is_fresh(now));

        row.last_updated = now - Duration::seconds(CACHE_FRESHNESS_SECS - 1);
        assert!(row.is_fresh(now));

        row.last_updated = now - Duration::seconds(CACHE_FRESHNESS_SECS);
        assert!(!row.is_fresh(now));

        row.last_updated = now - Duration::days(30);
        assert!(!row.is_fresh(now));
    }

    #[test]
    fn test_deserialize_anilist_media() {
        let json = r#"{
            "id": 21,
            "title": {"romaji": "ONE PIECE", "english": "ONE PIECE", "native": "ONE PIECE"},
            "description": "Gold Roger was known as the Pirate King.",
            "coverImage": {"large": "https://img/l.jpg", "medium": "https://img/m.jpg"},
            "averageScore": 88,
            "episodes": null,
            "seasonYear": 1999,
            "genres": ["Action", "Adventure"],
            "status": "RELEASING",
            "season": "FALL",
            "siteUrl": "https://anilist.co/anime/21"
        }"#;

        let anime: Anime = serde_json::from_str(json).unwrap();
        assert_eq!(anime.id, 21);
        assert_eq!(anime.episodes, None);
        assert_eq!(anime.status, Some(MediaStatus::Releasing));
        assert_eq!(anime.season, Some(MediaSeason::Fall));
        assert_eq!(anime.genres, vec!["Action", "Adventure"]);
    }

    #[test]
    fn test_unknown_status_does_not_fail_deserialization() {
        let json = r#"{
            "id": 5,
            "title": {"romaji": "Test"},
            "coverImage": {},
            "status": "SOMETHING_NEW"
        }"#;

        let anime: Anime = serde_json::from_str(json).unwrap();
        assert_eq!(anime.status, Some(MediaStatus::Unknown));
        assert!(anime.genres.is_empty());
    }

    #[test]
    fn test_null_nested_fields_read_as_empty() {
        let json = r#"{"id":7,"title":{"romaji":"X"},"coverImage":{},"genres":null}"#;
        let anime: Anime = serde_json::from_str(json).unwrap();
        assert!(anime.genres.is_empty());
        assert_eq!(anime.display_title(), "X");

        let json = r#"{"id":8,"title":null,"coverImage":null,"genres":["Drama"]}"#;
        let anime: Anime = serde_json::from_str(json).unwrap();
        assert_eq!(anime.title, AnimeTitle::default());
        assert_eq!(anime.cover_image, CoverImage::default());
        assert_eq!(anime.genres, vec!["Drama"]);
        assert_eq!(anime.display_title(), "Untitled");
    }

    #[test]
    fn test_serializes_in_public_shape() {
        let value = serde_json::to_value(frieren()).unwrap();

        assert_eq!(value["coverImage"]["large"], "https://img.anili.st/large/154587.jpg");
        assert_eq!(value["averageScore"], 91);
        assert_eq!(value["seasonYear"], 2023);
        assert_eq!(value["siteUrl"], "https://anilist.co/anime/154587");
        assert_eq!(value["status"], "FINISHED");
    }

    #[test]
    fn test_display_title_prefers_english() {
        let mut anime = frieren();
        assert_eq!(anime.display_title(), "Frieren: Beyond Journey's End");

        anime.title.english = None;
        assert_eq!(anime.display_title(), "Sousou no Frieren");
    }
}
