use std::{net::SocketAddr, sync::Arc};

use anyhow::Context;
use tokio::signal;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use cinematch_api::{
    build_app,
    config::Config,
    db::{create_pool, create_redis_client, run_migrations, Cache, MovieStore, PgMovieStore},
    routes::{AppState, ResultLimits},
    services::{
        catalog::{CachedCatalog, CatalogApi, TmdbClient},
        oracle::{GeminiOracle, MovieOracle},
        recommendations::RecommendationService,
        scoring::ScoringEngine,
    },
};

fn init_tracing() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "cinematch_api=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for Ctrl+C");
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutdown signal received");
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    let config = Config::from_env()?;

    let tmdb = TmdbClient::new(
        config.tmdb_api_key.clone(),
        config.tmdb_api_url.clone(),
        config.retry_policy(),
        config.upstream_timeout(),
    )?;

    let mut cache_writer = None;
    let catalog: Arc<dyn CatalogApi> = match &config.redis_url {
        Some(redis_url) => {
            let (cache, writer) = Cache::new(create_redis_client(redis_url)?);
            cache_writer = Some(writer);
            tracing::info!("Catalog responses cached in Redis");
            Arc::new(CachedCatalog::new(tmdb, cache))
        }
        None => {
            tracing::info!("REDIS_URL not set, catalog caching disabled");
            Arc::new(tmdb)
        }
    };

    let pool = create_pool(&config.database_url)
        .await
        .context("Failed to connect to Postgres")?;
    run_migrations(&pool).await?;
    let store: Arc<dyn MovieStore> = Arc::new(PgMovieStore::new(pool));

    let oracle: Arc<dyn MovieOracle> = Arc::new(GeminiOracle::new(
        config.gemini_api_key.clone(),
        config.gemini_api_url.clone(),
        config.gemini_model.clone(),
        config.upstream_timeout(),
    )?);

    let recommender = RecommendationService::new(
        Arc::clone(&catalog),
        ScoringEngine::new(config.scoring_weights()),
        config.recommendation_concurrency,
    )
    .with_deadline(config.recommendation_deadline());

    let state = AppState::new(catalog, Arc::new(recommender), oracle, store).with_limits(
        ResultLimits {
            default: config.recommendation_default_limit,
            max: config.recommendation_max_limit,
        },
    );

    let addr: SocketAddr = format!("{}:{}", config.host, config.port)
        .parse()
        .context("Invalid HOST/PORT")?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!(%addr, "Server listening");

    axum::serve(listener, build_app(state))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    if let Some(writer) = cache_writer {
        writer.shutdown().await;
    }

    tracing::info!("Server stopped");
    Ok(())
}
