use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, SqlitePool};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(rename_all = "lowercase")]
pub enum SyncStatus {
    Success,
    Failed,
}

/// Immutable audit record of one sync attempt. Created exactly once per
/// attempt, never updated or deleted.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct SyncLog {
    pub id: Uuid,
    pub sync_status: SyncStatus,
    pub sync_message: String,
    pub initiatives_synced: i64,
    pub synced_by: String,
    pub synced_at: DateTime<Utc>,
}

impl SyncLog {
    pub async fn create(
        pool: &SqlitePool,
        status: SyncStatus,
        message: &str,
        initiatives_synced: i64,
        synced_by: &str,
    ) -> Result<Self, sqlx::Error> {
        let id = Uuid::new_v4();
        sqlx::query_as::<_, SyncLog>(
            "INSERT INTO sync_logs (id, sync_status, sync_message, initiatives_synced, synced_by)
             VALUES ($1, $2, $3, $4, $5)
             RETURNING id, sync_status, sync_message, initiatives_synced, synced_by, synced_at",
        )
        .bind(id)
        .bind(status)
        .bind(message)
        .bind(initiatives_synced)
        .bind(synced_by)
        .fetch_one(pool)
        .await
    }

    /// Most recent attempts, newest first.
    pub async fn find_recent(pool: &SqlitePool, limit: i64) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, SyncLog>(
            "SELECT id, sync_status, sync_message, initiatives_synced, synced_by, synced_at
             FROM sync_logs
             ORDER BY synced_at DESC
             LIMIT $1",
        )
        .bind(limit)
        .fetch_all(pool)
        .await
    }
}
