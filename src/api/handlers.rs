use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Extension, Json,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use uuid::Uuid;

use crate::{
    error::{AppError, AppResult},
    middleware::request_id::RequestId,
    models::{Anime, AnimeId, AnimePage, WatchStatus, WatchlistEntry, WatchlistItem, WatchlistUpdate},
    services::{
        catalog::MAX_PER_PAGE,
        discovery::{self, AnimeFilter},
        links, recommendations,
        recommendations::ChatReply,
    },
};

use super::AppState;

// Request/Response types

#[derive(Debug, Deserialize)]
pub struct SearchQuery {
    pub q: String,
}

#[derive(Debug, Deserialize)]
pub struct PopularQuery {
    pub page: Option<u32>,
    pub per_page: Option<u32>,
    /// Comma-separated; a title must carry all of them
    pub genres: Option<String>,
    pub min_episodes: Option<u32>,
    pub max_episodes: Option<u32>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnimeDetailsResponse {
    #[serde(flatten)]
    pub anime: Anime,
    pub watch_url: String,
}

impl From<Anime> for AnimeDetailsResponse {
    fn from(anime: Anime) -> Self {
        let watch_url = links::crunchyroll_url(anime.display_title());
        Self { anime, watch_url }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddToWatchlistRequest {
    pub anime_id: AnimeId,
    pub status: Option<WatchStatus>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatRequest {
    pub user_id: Uuid,
    pub message: String,
}

// Handlers

/// Health check endpoint
pub async fn health_check() -> (StatusCode, Json<Value>) {
    (StatusCode::OK, Json(json!({ "status": "healthy" })))
}

/// Get one anime, served from the cache when fresh
pub async fn get_anime(
    State(state): State<AppState>,
    Extension(request_id): Extension<RequestId>,
    Path(id): Path<AnimeId>,
) -> AppResult<Json<AnimeDetailsResponse>> {
    if id <= 0 {
        return Err(AppError::InvalidInput(format!(
            "Anime id must be positive, got {}",
            id
        )));
    }

    tracing::debug!(request_id = %request_id, anime_id = id, "Looking up anime");

    let anime = state
        .anime
        .get_anime(id)
        .await
        .ok_or_else(|| AppError::NotFound(format!("Anime {} not found", id)))?;

    Ok(Json(AnimeDetailsResponse::from(anime)))
}

/// Search the catalog by title
pub async fn search_anime(
    State(state): State<AppState>,
    Query(params): Query<SearchQuery>,
) -> AppResult<Json<Vec<Anime>>> {
    let results = state.anime.catalog().search_anime(&params.q).await?;
    Ok(Json(results))
}

/// One page of the popularity ranking, optionally narrowed by genre and episodes
///
/// The whole page is written to the anime cache before filtering.
pub async fn popular_anime(
    State(state): State<AppState>,
    Extension(request_id): Extension<RequestId>,
    Query(params): Query<PopularQuery>,
) -> AppResult<Json<AnimePage>> {
    let page = params.page.unwrap_or(1);
    let per_page = params.per_page.unwrap_or(MAX_PER_PAGE);
    let filter = AnimeFilter::from_query(
        params.genres.as_deref(),
        params.min_episodes,
        params.max_episodes,
    );

    let mut listing = state.anime.catalog().popular_anime(page, per_page).await?;
    state.anime.cache_popular_anime(&listing.media).await?;

    let fetched = listing.media.len();
    listing.media = filter.apply(listing.media);

    tracing::info!(
        request_id = %request_id,
        page,
        fetched,
        results = listing.media.len(),
        "Popular anime served"
    );

    Ok(Json(listing))
}

/// A random title from the top of the popularity ranking
pub async fn anime_of_the_day(
    State(state): State<AppState>,
) -> AppResult<Json<AnimeDetailsResponse>> {
    let anime = discovery::anime_of_the_day(state.anime.catalog().as_ref())
        .await?
        .ok_or_else(|| AppError::NotFound("No popular anime available".to_string()))?;

    Ok(Json(AnimeDetailsResponse::from(anime)))
}

/// List a user's watchlist with anime details
pub async fn get_watchlist(
    State(state): State<AppState>,
    Path(user_id): Path<Uuid>,
) -> AppResult<Json<Vec<WatchlistItem>>> {
    Ok(Json(state.watchlist.list(user_id).await?))
}

/// Add a title to a user's watchlist
pub async fn add_to_watchlist(
    State(state): State<AppState>,
    Path(user_id): Path<Uuid>,
    Json(request): Json<AddToWatchlistRequest>,
) -> AppResult<(StatusCode, Json<WatchlistEntry>)> {
    let entry = state
        .watchlist
        .add(user_id, request.anime_id, request.status)
        .await?;
    Ok((StatusCode::CREATED, Json(entry)))
}

/// Get one watchlist entry; 404 when the title is not listed
pub async fn get_watchlist_entry(
    State(state): State<AppState>,
    Path((user_id, anime_id)): Path<(Uuid, AnimeId)>,
) -> AppResult<Json<WatchlistEntry>> {
    Ok(Json(state.watchlist.get(user_id, anime_id).await?))
}

/// Change status, rating or notes of a watchlist entry
pub async fn update_watchlist_entry(
    State(state): State<AppState>,
    Path((user_id, anime_id)): Path<(Uuid, AnimeId)>,
    Json(update): Json<WatchlistUpdate>,
) -> AppResult<Json<WatchlistEntry>> {
    Ok(Json(state.watchlist.update(user_id, anime_id, update).await?))
}

/// Remove a title from a user's watchlist
pub async fn remove_from_watchlist(
    State(state): State<AppState>,
    Path((user_id, anime_id)): Path<(Uuid, AnimeId)>,
) -> AppResult<StatusCode> {
    if state.watchlist.remove(user_id, anime_id).await? {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(AppError::NotFound(format!(
            "Anime {} is not on the watchlist",
            anime_id
        )))
    }
}

/// Recommendation chat
pub async fn chat(
    State(state): State<AppState>,
    Extension(request_id): Extension<RequestId>,
    Json(request): Json<ChatRequest>,
) -> AppResult<Json<ChatReply>> {
    tracing::info!(
        request_id = %request_id,
        user_id = %request.user_id,
        "Processing chat request"
    );

    let reply = recommendations::recommend(&state.watchlist, request.user_id, &request.message).await?;
    Ok(Json(reply))
}
