use std::collections::{HashMap, HashSet};

use serde::Serialize;
use uuid::Uuid;

use crate::{
    error::{AppError, AppResult},
    models::{Anime, AnimeId, WatchStatus},
    services::{catalog::MAX_PER_PAGE, watchlist::WatchlistService},
};

const MAX_RECOMMENDATIONS: usize = 3;

/// A suggested title and the watchlist genres it shares
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Recommendation {
    pub anime: Anime,
    pub matched_genres: Vec<String>,
    pub score: u32,
}

/// Reply to a chat message
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ChatReply {
    pub response: String,
    pub recommendations: Vec<Recommendation>,
}

/// Genre weights over the given titles, one count per title and genre
///
/// Callers pass only the titles that should shape the profile.
pub fn genre_profile<'a>(watched: impl IntoIterator<Item = &'a Anime>) -> HashMap<String, u32> {
    let mut profile = HashMap::new();
    for anime in watched {
        for genre in &anime.genres {
            *profile.entry(genre.clone()).or_insert(0) += 1;
        }
    }
    profile
}

/// Ranks candidates against a genre profile
///
/// Titles already on the watchlist are skipped. With an empty profile the
/// best-rated candidates are returned instead.
pub fn rank_candidates(
    profile: &HashMap<String, u32>,
    candidates: Vec<Anime>,
    exclude: &HashSet<AnimeId>,
    limit: usize,
) -> Vec<Recommendation> {
    let mut ranked: Vec<Recommendation> = candidates
        .into_iter()
        .filter(|anime| !exclude.contains(&anime.id))
        .map(|anime| {
            let matched_genres: Vec<String> = anime
                .genres
                .iter()
                .filter(|g| profile.contains_key(*g))
                .cloned()
                .collect();
            let score = matched_genres.iter().map(|g| profile[g]).sum();
            Recommendation {
                anime,
                matched_genres,
                score,
            }
        })
        .filter(|r| profile.is_empty() || r.score > 0)
        .collect();

    ranked.sort_by(|a, b| {
        b.score
            .cmp(&a.score)
            .then_with(|| b.anime.average_score.cmp(&a.anime.average_score))
    });
    ranked.truncate(limit);
    ranked
}

/// Plain-text chat reply describing the picks
pub fn compose_reply(message: &str, recommendations: &[Recommendation]) -> String {
    if recommendations.is_empty() {
        return format!(
            "I couldn't find anything new to suggest for \"{}\" right now. \
             Try adding a few more titles to your watchlist.",
            message
        );
    }

    let mut reply = format!("You asked: \"{}\". Based on your watchlist, I recommend:\n", message);
    for (position, rec) in recommendations.iter().enumerate() {
        let reason = if rec.matched_genres.is_empty() {
            "one of the highest rated titles right now".to_string()
        } else {
            format!("you seem to enjoy {}", rec.matched_genres.join(", "))
        };
        reply.push_str(&format!(
            "\n{}. \"{}\" - {}",
            position + 1,
            rec.anime.display_title(),
            reason
        ));
    }
    reply
}

/// Genre-overlap recommendations for a user's chat message
pub async fn recommend(
    watchlist: &WatchlistService,
    user_id: Uuid,
    message: &str,
) -> AppResult<ChatReply> {
    let message = message.trim();
    if message.is_empty() {
        return Err(AppError::InvalidInput("Message cannot be empty".to_string()));
    }

    let items = watchlist.list(user_id).await?;
    let exclude: HashSet<AnimeId> = items.iter().map(|i| i.entry.anime_id).collect();
    let profile = genre_profile(
        items
            .iter()
            .filter(|i| i.entry.status != WatchStatus::Dropped)
            .filter_map(|i| i.anime.as_ref()),
    );

    let candidates = watchlist
        .anime()
        .catalog()
        .popular_anime(1, MAX_PER_PAGE)
        .await?
        .media;

    let recommendations = rank_candidates(&profile, candidates, &exclude, MAX_RECOMMENDATIONS);

    tracing::info!(
        user_id = %user_id,
        watchlist_size = items.len(),
        profile_genres = profile.len(),
        recommendations = recommendations.len(),
        "Generated recommendations"
    );

    Ok(ChatReply {
        response: compose_reply(message, &recommendations),
        recommendations,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::anime::fixtures::anime;

    #[test]
    fn test_genre_profile_counts_each_title() {
        let watched = [
            anime(1, "A", &["Action", "Drama"], 80),
            anime(2, "B", &["Action", "Comedy"], 70),
        ];

        let profile = genre_profile(&watched);
        assert_eq!(profile["Action"], 2);
        assert_eq!(profile["Drama"], 1);
        assert_eq!(profile["Comedy"], 1);
    }

    #[test]
    fn test_rank_prefers_overlap_then_score() {
        let profile = genre_profile(&[anime(1, "A", &["Action", "Action", "Drama"], 80)]);
        let candidates = vec![
            anime(10, "Drama only", &["Drama"], 95),
            anime(11, "Action drama", &["Action", "Drama"], 60),
            anime(12, "Action", &["Action"], 90),
            anime(13, "Romance", &["Romance"], 99),
        ];

        let ranked = rank_candidates(&profile, candidates, &HashSet::new(), 3);
        let ids: Vec<AnimeId> = ranked.iter().map(|r| r.anime.id).collect();

        assert_eq!(ids, vec![11, 12, 10]);
        assert_eq!(ranked[0].matched_genres, vec!["Action", "Drama"]);
    }

    #[test]
    fn test_rank_skips_titles_already_listed() {
        let profile = genre_profile(&[anime(1, "A", &["Action"], 80)]);
        let candidates = vec![anime(1, "A", &["Action"], 80), anime(2, "B", &["Action"], 70)];
        let exclude: HashSet<AnimeId> = [1].into_iter().collect();

        let ranked = rank_candidates(&profile, candidates, &exclude, 3);
        assert_eq!(ranked.len(), 1);
        assert_eq!(ranked[0].anime.id, 2);
    }

    #[test]
    fn test_rank_with_empty_profile_uses_average_score() {
        let candidates = vec![
            anime(1, "A", &["Action"], 70),
            anime(2, "B", &["Drama"], 90),
            anime(3, "C", &["Comedy"], 80),
        ];

        let ranked = rank_candidates(&HashMap::new(), candidates, &HashSet::new(), 2);
        let ids: Vec<AnimeId> = ranked.iter().map(|r| r.anime.id).collect();
        assert_eq!(ids, vec![2, 3]);
    }

    #[test]
    fn test_compose_reply_lists_picks() {
        let recs = vec![Recommendation {
            anime: anime(16498, "Shingeki no Kyojin", &["Action"], 85),
            matched_genres: vec!["Action".to_string()],
            score: 1,
        }];

        let reply = compose_reply("something dark", &recs);
        assert!(reply.contains("\"something dark\""));
        assert!(reply.contains("1. \"Shingeki no Kyojin\" - you seem to enjoy Action"));
    }

    #[test]
    fn test_compose_reply_without_picks() {
        let reply = compose_reply("anything", &[]);
        assert!(reply.contains("couldn't find anything new"));
    }

    #[tokio::test]
    async fn test_recommend_ignores_genres_of_dropped_titles() {
        use crate::db::MemoryStore;
        use crate::models::{AnimePage, PageInfo};
        use crate::services::{catalog::MockCatalogSource, AnimeCacheService};
        use std::sync::Arc;

        let mut catalog = MockCatalogSource::new();
        catalog.expect_name().return_const("mock");
        catalog.expect_fetch_anime().returning(|id| {
            Ok(match id {
                1 => Some(anime(1, "Kept", &["Action"], 80)),
                2 => Some(anime(2, "Dropped", &["Romance"], 80)),
                _ => None,
            })
        });
        catalog.expect_popular_anime().returning(|_, _| {
            Ok(AnimePage {
                page_info: PageInfo::default(),
                media: vec![
                    anime(10, "Action pick", &["Action"], 70),
                    anime(11, "Romance pick", &["Romance"], 90),
                ],
            })
        });

        let store = MemoryStore::new();
        let anime_cache = AnimeCacheService::new(Arc::new(store.clone()), Arc::new(catalog));
        let watchlist = WatchlistService::new(Arc::new(store), anime_cache);

        let user = Uuid::new_v4();
        watchlist.add(user, 1, Some(WatchStatus::Completed)).await.unwrap();
        watchlist.add(user, 2, Some(WatchStatus::Dropped)).await.unwrap();

        let reply = recommend(&watchlist, user, "more please").await.unwrap();
        let ids: Vec<AnimeId> = reply.recommendations.iter().map(|r| r.anime.id).collect();
        assert_eq!(ids, vec![10]);
    }
}
