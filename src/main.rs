use mimalloc::MiMalloc;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

#[global_allocator]
static GLOBAL: MiMalloc = MiMalloc;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();

    let cfg = &repolens::config::CONFIG;

    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(cfg.loglevel.clone()));
    tracing_subscriber::registry()
        .with(env_filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_level(true)
                .with_target(false),
        )
        .init();

    info!(
        database_url = %cfg.database_url,
        frontend_url = %cfg.frontend_url,
        loglevel = %cfg.loglevel,
    );
    if cfg.uses_default_jwt_secret() {
        warn!("REPOLENS_JWT_SECRET not set; using the development default");
    }
    if cfg.github_client_id.is_empty() {
        warn!("REPOLENS_GITHUB_CLIENT_ID not set; GitHub login will not work");
    }

    let pool = repolens::db::connect(&cfg.database_url).await?;
    let store = repolens::db::AuditStore::new(pool);
    store.init_schema().await?;

    // Build axum router and serve
    let state = repolens::router::LensState::new(store, Arc::new(repolens::NoopEngine));
    let app = repolens::router::lens_router(state);

    let listener = TcpListener::bind(cfg.listen_addr.as_str()).await?;
    info!("HTTP server listening on {}", cfg.listen_addr);
    axum::serve(listener, app).await?;
    Ok(())
}
