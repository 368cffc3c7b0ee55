use anyhow::Context;
use db::DBService;
use secrecy::SecretString;
use services::services::{aha::AhaClient, summarizer::SummaryService, sync::SyncService};

use crate::auth::AdminTokenService;

pub mod auth;
pub mod error;
pub mod middleware;
pub mod routes;

/// Server-level configuration, read once at startup.
#[derive(Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub database_url: String,
    /// Plain admin password or `sha256:<hex>`; login is disabled when
    /// absent.
    pub admin_password: Option<SecretString>,
    pub token_secret: SecretString,
}

impl ServerConfig {
    pub fn from_env() -> anyhow::Result<ServerConfig> {
        let token_secret = std::env::var("JWT_SECRET")
            .context("JWT_SECRET must be set")?;
        Ok(ServerConfig {
            host: std::env::var("HOST").unwrap_or_else(|_| "127.0.0.1".to_string()),
            port: std::env::var("PORT")
                .ok()
                .and_then(|s| s.trim().parse().ok())
                .unwrap_or(3001),
            database_url: std::env::var("DATABASE_URL")
                .unwrap_or_else(|_| "sqlite://roadmap.db".to_string()),
            admin_password: std::env::var("ADMIN_PASSWORD")
                .ok()
                .filter(|v| !v.is_empty())
                .map(SecretString::from),
            token_secret: SecretString::from(token_secret),
        })
    }
}

/// Explicit dependency container, constructed once at process startup and
/// handed to the HTTP layer.
#[derive(Clone)]
pub struct AppState {
    db: DBService,
    aha: AhaClient,
    summarizer: SummaryService,
    sync: SyncService,
    admin_token: AdminTokenService,
    config: ServerConfig,
}

impl AppState {
    pub fn new(
        db: DBService,
        aha: AhaClient,
        summarizer: SummaryService,
        sync: SyncService,
        admin_token: AdminTokenService,
        config: ServerConfig,
    ) -> Self {
        Self {
            db,
            aha,
            summarizer,
            sync,
            admin_token,
            config,
        }
    }

    pub fn db(&self) -> &DBService {
        &self.db
    }

    pub fn aha(&self) -> &AhaClient {
        &self.aha
    }

    pub fn summarizer(&self) -> &SummaryService {
        &self.summarizer
    }

    pub fn sync(&self) -> &SyncService {
        &self.sync
    }

    pub fn admin_token(&self) -> &AdminTokenService {
        &self.admin_token
    }

    pub fn config(&self) -> &ServerConfig {
        &self.config
    }
}
