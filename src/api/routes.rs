use axum::{
    middleware,
    routing::{get, post},
    Router,
};
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use super::handlers;
use super::AppState;
use crate::middleware::request_id::{make_span_with_request_id, request_id_middleware};

/// Creates the application router with all routes
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(handlers::health_check))
        .nest("/api/v1", api_routes())
        .with_state(state)
        .layer(
            ServiceBuilder::new()
                .layer(CorsLayer::permissive())
                .layer(middleware::from_fn(request_id_middleware))
                .layer(TraceLayer::new_for_http().make_span_with(make_span_with_request_id)),
        )
}

/// API routes under /api/v1
fn api_routes() -> Router<AppState> {
    Router::new()
        // Anime
        .route("/anime/search", get(handlers::search_anime))
        .route("/anime/popular", get(handlers::popular_anime))
        .route("/anime/daily", get(handlers::anime_of_the_day))
        .route("/anime/:id", get(handlers::get_anime))
        // Watchlist
        .route(
            "/users/:user_id/watchlist",
            get(handlers::get_watchlist).post(handlers::add_to_watchlist),
        )
        .route(
            "/users/:user_id/watchlist/:anime_id",
            get(handlers::get_watchlist_entry)
                .patch(handlers::update_watchlist_entry)
                .delete(handlers::remove_from_watchlist),
        )
        // Recommendations
        .route("/chat", post(handlers::chat))
}
