use db::DBService;
use server::{AppState, ServerConfig, auth::AdminTokenService, routes};
use services::services::{
    aha::AhaClient,
    config::{AhaConfig, SummarizerConfig},
    summarizer::SummaryService,
    sync::SyncService,
};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = ServerConfig::from_env()?;

    let db = DBService::new(&config.database_url).await?;

    let aha_config = AhaConfig::from_env();
    if aha_config.is_none() {
        warn!("Aha! credentials not configured; sync will be unavailable");
    }
    let aha = AhaClient::new(aha_config);
    let summarizer = SummaryService::new(SummarizerConfig::from_env());
    let sync = SyncService::new(db.clone(), aha.clone(), summarizer.clone());
    let admin_token = AdminTokenService::new(config.token_secret.clone());

    if config.admin_password.is_none() {
        warn!("ADMIN_PASSWORD not set; admin login is disabled");
    }

    let state = AppState::new(db, aha, summarizer, sync, admin_token, config.clone());
    let app = routes::router(state);

    let addr = format!("{}:{}", config.host, config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!(%addr, "roadmap server listening");
    axum::serve(listener, app).await?;
    Ok(())
}
