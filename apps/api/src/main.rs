use anyhow::Result;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use folio_api::config::Config;
use folio_api::db::create_pool;
use folio_api::export::browser::ChromiumLauncher;
use folio_api::repository::PgRepository;
use folio_api::routes::build_router;
use folio_api::state::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration first (fails on missing required env vars)
    let config = Config::from_env()?;

    // Initialize structured logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!("folio_api={},tower_http=info", &config.rust_log))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Folio API v{}", env!("CARGO_PKG_VERSION"));

    // Initialize PostgreSQL (runs pending migrations)
    let db = create_pool(&config.database_url).await?;
    let repo = Arc::new(PgRepository::new(db));

    // One Chromium process per banner export
    let browser = Arc::new(ChromiumLauncher::new(
        config.chrome_bin.clone(),
        Duration::from_secs(config.export_timeout_secs),
    ));
    info!(
        chrome_bin = %config.chrome_bin,
        public_base_url = %config.public_base_url,
        "Banner export configured"
    );

    let state = AppState {
        resumes: repo.clone(),
        preferences: repo.clone(),
        users: repo,
        browser,
        config: config.clone(),
    };

    let app = build_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive()); // TODO: restrict origins once the editor's domain is fixed

    let addr: SocketAddr = format!("0.0.0.0:{}", config.port).parse()?;
    info!("Listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
