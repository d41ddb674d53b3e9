//! AniList GraphQL catalog
//!
//! Every operation is a POST of `{query, variables}` to the GraphQL endpoint.
//! Search results and popularity pages are memoized in Redis. Single-title
//! lookups are not: the Postgres-backed anime cache sits in front of them.

use crate::{
    cached,
    db::{Cache, CacheKey},
    error::{AppError, AppResult},
    models::{Anime, AnimeId, AnimePage},
    services::catalog::{CatalogSource, MAX_PER_PAGE},
};
use reqwest::{Client as HttpClient, StatusCode};
use serde::{de::DeserializeOwned, Deserialize};
use serde_json::{json, Value};
use std::time::Duration;

const SEARCH_CACHE_TTL: u64 = 3600; // 1 hour
const POPULAR_CACHE_TTL: u64 = 3600; // 1 hour
const SEARCH_PAGE_SIZE: u32 = 10;

const MEDIA_FIELDS: &str = r#"
    id
    title { romaji english native }
    description
    coverImage { large medium }
    averageScore
    episodes
    seasonYear
    genres
    status
    season
    siteUrl
"#;

#[derive(Debug, Deserialize)]
struct GraphQlResponse<T> {
    data: Option<T>,
    #[serde(default)]
    errors: Vec<GraphQlError>,
}

#[derive(Debug, Deserialize)]
struct GraphQlError {
    message: String,
    #[serde(default)]
    status: Option<u16>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct MediaData {
    media: Option<Anime>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct PageData {
    page: AnimePage,
}

#[derive(Clone)]
pub struct AniListClient {
    http_client: HttpClient,
    api_url: String,
    cache: Cache,
}

impl AniListClient {
    pub fn new(cache: Cache, api_url: String, timeout: Duration) -> AppResult<Self> {
        let http_client = HttpClient::builder().timeout(timeout).build()?;

        Ok(Self {
            http_client,
            api_url,
            cache,
        })
    }

    fn media_query() -> String {
        format!(
            "query ($id: Int) {{ Media(id: $id, type: ANIME) {{ {} }} }}",
            MEDIA_FIELDS
        )
    }

    fn page_query(arguments: &str) -> String {
        format!(
            "query ($page: Int, $perPage: Int{}) {{ Page(page: $page, perPage: $perPage) {{ \
             pageInfo {{ total currentPage lastPage hasNextPage perPage }} \
             media({}) {{ {} }} }} }}",
            if arguments.contains("$search") {
                ", $search: String"
            } else {
                ""
            },
            arguments,
            MEDIA_FIELDS
        )
    }

    /// Sends a GraphQL request and returns the raw status and body
    async fn post_graphql(&self, query: String, variables: Value) -> AppResult<(StatusCode, String)> {
        let response = self
            .http_client
            .post(&self.api_url)
            .header("Accept", "application/json")
            .json(&json!({ "query": query, "variables": variables }))
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;
        Ok((status, body))
    }

    /// Decodes a GraphQL body, surfacing `errors` when `data` is absent
    fn decode<T: DeserializeOwned>(status: StatusCode, body: &str) -> AppResult<T> {
        if !status.is_success() && status != StatusCode::NOT_FOUND {
            return Err(AppError::ExternalApi(format!(
                "AniList returned status {}: {}",
                status, body
            )));
        }

        let response: GraphQlResponse<T> = serde_json::from_str(body)
            .map_err(|e| AppError::ExternalApi(format!("Invalid AniList response: {}", e)))?;

        match response.data {
            Some(data) if response.errors.is_empty() || status.is_success() => Ok(data),
            _ => {
                let messages: Vec<&str> =
                    response.errors.iter().map(|e| e.message.as_str()).collect();
                Err(AppError::ExternalApi(format!(
                    "AniList query failed: {}",
                    messages.join("; ")
                )))
            }
        }
    }

    /// Interprets a single-title response; an unknown id is `None`
    ///
    /// Only a GraphQL error carrying status 404 means the id is unknown. Any
    /// other 404, such as a wrong endpoint, is a catalog error.
    fn parse_media(status: StatusCode, body: &str) -> AppResult<Option<Anime>> {
        if status == StatusCode::NOT_FOUND {
            let not_found = serde_json::from_str::<GraphQlResponse<Value>>(body)
                .map(|r| r.errors.iter().any(|e| e.status == Some(404)))
                .unwrap_or(false);
            if not_found {
                return Ok(None);
            }
        }

        let data: MediaData = Self::decode(status, body)?;
        Ok(data.media)
    }
}

#[async_trait::async_trait]
impl CatalogSource for AniListClient {
    async fn fetch_anime(&self, id: AnimeId) -> AppResult<Option<Anime>> {
        let (status, body) = self
            .post_graphql(Self::media_query(), json!({ "id": id }))
            .await?;
        let anime = Self::parse_media(status, &body)?;

        tracing::debug!(
            anime_id = id,
            found = anime.is_some(),
            provider = "anilist",
            "Fetched anime from catalog"
        );

        Ok(anime)
    }

    async fn search_anime(&self, query: &str) -> AppResult<Vec<Anime>> {
        let query = query.trim();
        if query.is_empty() {
            return Err(AppError::InvalidInput(
                "Search query cannot be empty".to_string(),
            ));
        }

        cached!(
            self.cache,
            CacheKey::AnimeSearch(query.to_string()),
            SEARCH_CACHE_TTL,
            async move {
                let (status, body) = self
                    .post_graphql(
                        Self::page_query("search: $search, type: ANIME, sort: POPULARITY_DESC"),
                        json!({ "page": 1, "perPage": SEARCH_PAGE_SIZE, "search": query }),
                    )
                    .await?;
                let data: PageData = Self::decode(status, &body)?;

                tracing::info!(
                    query = %query,
                    results = data.page.media.len(),
                    provider = "anilist",
                    "Anime search completed"
                );

                Ok::<_, AppError>(data.page.media)
            }
        )
    }

    async fn popular_anime(&self, page: u32, per_page: u32) -> AppResult<AnimePage> {
        let page = page.max(1);
        let per_page = per_page.clamp(1, MAX_PER_PAGE);

        cached!(
            self.cache,
            CacheKey::PopularPage { page, per_page },
            POPULAR_CACHE_TTL,
            async move {
                let (status, body) = self
                    .post_graphql(
                        Self::page_query("type: ANIME, sort: POPULARITY_DESC"),
                        json!({ "page": page, "perPage": per_page }),
                    )
                    .await?;
                let data: PageData = Self::decode(status, &body)?;

                tracing::info!(
                    page,
                    per_page,
                    results = data.page.media.len(),
                    provider = "anilist",
                    "Popular anime page fetched"
                );

                Ok::<_, AppError>(data.page)
            }
        )
    }

    fn name(&self) -> &'static str {
        "anilist"
    }
}
