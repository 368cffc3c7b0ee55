use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, SqlitePool};
use tracing::warn;

/// Well-known configuration keys.
pub const AI_PROVIDER: &str = "ai_provider";
pub const PRODUCT_NAME: &str = "product_name";
pub const SELECTED_RELEASES: &str = "selected_releases";

/// A key/value configuration pair; each key is unique and absence of a
/// key implies a default.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct ConfigEntry {
    pub config_key: String,
    pub config_value: String,
    pub updated_at: DateTime<Utc>,
}

impl ConfigEntry {
    pub async fn all(pool: &SqlitePool) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, ConfigEntry>(
            "SELECT config_key, config_value, updated_at FROM admin_config ORDER BY config_key",
        )
        .fetch_all(pool)
        .await
    }

    pub async fn get(pool: &SqlitePool, key: &str) -> Result<Option<String>, sqlx::Error> {
        sqlx::query_scalar::<_, String>(
            "SELECT config_value FROM admin_config WHERE config_key = $1",
        )
        .bind(key)
        .fetch_optional(pool)
        .await
    }

    /// Insert-or-update a single key.
    pub async fn set(pool: &SqlitePool, key: &str, value: &str) -> Result<(), sqlx::Error> {
        sqlx::query(
            "INSERT INTO admin_config (config_key, config_value)
             VALUES ($1, $2)
             ON CONFLICT (config_key) DO UPDATE SET
                 config_value = excluded.config_value,
                 updated_at = datetime('now', 'subsec')",
        )
        .bind(key)
        .bind(value)
        .execute(pool)
        .await?;
        Ok(())
    }

    /// Release names selected for sync; missing or malformed → empty.
    pub async fn selected_releases(pool: &SqlitePool) -> Result<Vec<String>, sqlx::Error> {
        let Some(raw) = Self::get(pool, SELECTED_RELEASES).await? else {
            return Ok(Vec::new());
        };
        match serde_json::from_str(&raw) {
            Ok(names) => Ok(names),
            Err(error) => {
                warn!(%error, "selected_releases config is not a JSON string array; ignoring");
                Ok(Vec::new())
            }
        }
    }

    pub async fn set_selected_releases(
        pool: &SqlitePool,
        names: &[String],
    ) -> Result<(), sqlx::Error> {
        let raw = serde_json::to_string(names).unwrap_or_else(|_| "[]".to_string());
        Self::set(pool, SELECTED_RELEASES, &raw).await
    }

    /// Configured summarization model id, if any.
    pub async fn ai_provider(pool: &SqlitePool) -> Result<Option<String>, sqlx::Error> {
        Self::get(pool, AI_PROVIDER).await
    }
}
