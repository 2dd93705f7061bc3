use std::sync::Arc;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use taste_match::{
    api::{create_router, AppState},
    config::{Config, StoreBackend},
    db::{create_pool, create_redis_client, RedisRunLock},
    services::PlatformProvider,
    store::PgResultStore,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("taste_match=info,tower_http=info")),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env()?;

    let provider = Arc::new(PlatformProvider::new(
        config.platform_api_key.clone(),
        config.platform_api_url.clone(),
    )?);

    let state = match config.store_backend {
        StoreBackend::Postgres => {
            let pool = create_pool(&config.database_url).await?;
            let redis_client = create_redis_client(&config.redis_url)?;
            AppState::new(
                provider,
                Arc::new(PgResultStore::new(pool)),
                Arc::new(RedisRunLock::new(redis_client, config.run_lock_ttl_secs)),
                config.retry_policy(),
            )
        }
        StoreBackend::Memory => {
            tracing::warn!("Using in-memory store; results are lost on restart");
            AppState::in_memory(provider, config.retry_policy())
        }
    };

    let app = create_router(state);

    let addr = format!("{}:{}", config.host, config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!(address = %addr, backend = ?config.store_backend, "Server listening");
    axum::serve(listener, app).await?;

    Ok(())
}
