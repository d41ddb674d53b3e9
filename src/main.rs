use std::sync::Arc;
use std::time::Duration;

use anime_cache_api::{
    api::{create_router, AppState},
    config::Config,
    db::{
        create_pool, create_redis_client, run_migrations, Cache, MemoryStore, PgAnimeCacheStore,
        PgWatchlistStore,
    },
    services::AniListClient,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("anime_cache_api=debug,tower_http=info")),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env()?;

    let redis_client = create_redis_client(&config.redis_url)?;
    let (cache, cache_writer) = Cache::new(redis_client);

    let catalog = Arc::new(AniListClient::new(
        cache,
        config.anilist_api_url.clone(),
        Duration::from_secs(config.http_timeout_secs),
    )?);

    let state = match &config.database_url {
        Some(database_url) => {
            let pool = create_pool(database_url).await?;
            run_migrations(&pool).await?;
            AppState::new(
                Arc::new(PgAnimeCacheStore::new(pool.clone())),
                Arc::new(PgWatchlistStore::new(pool)),
                catalog,
            )
        }
        None => {
            tracing::warn!("DATABASE_URL not set, using in-memory stores");
            let store = MemoryStore::new();
            AppState::new(Arc::new(store.clone()), Arc::new(store), catalog)
        }
    };

    let app = create_router(state);

    let listener = tokio::net::TcpListener::bind(config.bind_addr()).await?;
    tracing::info!(addr = %config.bind_addr(), "Server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    cache_writer.shutdown().await;
    tracing::info!("Server stopped");

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
    }
    tracing::info!("Shutdown signal received");
}
