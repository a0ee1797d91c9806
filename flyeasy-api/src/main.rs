use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use flyeasy_api::{app, AppState, AuthConfig};
use flyeasy_core::SystemClock;
use flyeasy_store::{Config, DbClient, RedisClient, Repositories, StoreBackend};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "flyeasy_api=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::load().context("Failed to load config")?;
    tracing::info!("Starting FlyEasy API on port {}", config.server.port);

    let repos = match config.store.backend {
        StoreBackend::Memory => {
            tracing::warn!("Using the in-memory store; data is lost on restart");
            Repositories::in_memory()
        }
        StoreBackend::Postgres => {
            let db = DbClient::new(&config.database.url, config.database.max_connections)
                .await
                .context("Failed to connect to Postgres")?;
            db.migrate().await.context("Failed to run migrations")?;
            Repositories::postgres(&db)
        }
    };

    let mut state = AppState::new(
        repos,
        AuthConfig {
            secret: config.auth.jwt_secret.clone(),
            expiration: config.auth.jwt_expiration_seconds,
            bootstrap_admin_email: config.auth.bootstrap_admin_email.clone(),
            bcrypt_cost: config.auth.bcrypt_cost,
        },
        config.business_rules.clone(),
        &config.payments.currency,
        Arc::new(SystemClock),
    );

    if let Some(url) = &config.redis.url {
        match RedisClient::new(url).await {
            Ok(redis) => state = state.with_redis(redis),
            Err(e) => tracing::warn!("Redis unavailable, rate limiting disabled: {}", e),
        }
    }

    let app = app(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.server.port));
    tracing::info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await?;
    Ok(())
}
