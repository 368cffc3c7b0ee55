use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, SqlitePool, types::Json};
use uuid::Uuid;

/// Kanban lane an initiative occupies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(rename_all = "lowercase")]
pub enum BoardColumn {
    Done,
    Now,
    Next,
    Explore,
}

/// A roadmap card, mirrored from Aha! and optionally curated by an admin.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Initiative {
    pub id: Uuid,
    /// Aha! feature id, unique, used as the upsert key during sync
    pub aha_id: String,
    pub title: String,
    pub description: String,
    pub ai_summary: Option<String>,
    pub custom_tags: Json<Vec<String>>,
    /// Human-readable month/year or release name
    pub timeline: Option<String>,
    pub column_name: BoardColumn,
    pub sort_order: i64,
    pub is_visible: bool,
    /// Raw snapshot of the Aha! record this row was synced from
    pub raw_aha_data: Option<Json<serde_json::Value>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Customer-facing projection: hidden rows excluded, `ai_summary`
/// surfaced as the description, internal fields dropped.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct CustomerInitiative {
    pub id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub custom_tags: Json<Vec<String>>,
    pub timeline: Option<String>,
    pub column_name: BoardColumn,
    pub sort_order: i64,
}

/// Partial admin edit; unspecified fields are retained.
#[derive(Debug, Default, Deserialize)]
pub struct UpdateInitiative {
    pub title: Option<String>,
    pub description: Option<String>,
    pub ai_summary: Option<String>,
    pub custom_tags: Option<Vec<String>>,
    pub timeline: Option<String>,
    pub column_name: Option<BoardColumn>,
    pub sort_order: Option<i64>,
    pub is_visible: Option<bool>,
}

/// One normalized, summarized Aha! feature ready to be upserted.
#[derive(Debug, Clone)]
pub struct SyncedFeature {
    pub aha_id: String,
    pub title: String,
    pub description: String,
    pub ai_summary: String,
    pub timeline: Option<String>,
    pub column_name: BoardColumn,
    pub raw_aha_data: serde_json::Value,
}

const ALL_COLUMNS: &str = "id, aha_id, title, description, ai_summary, custom_tags, timeline, \
                           column_name, sort_order, is_visible, raw_aha_data, created_at, updated_at";

impl Initiative {
    /// All initiatives, hidden ones included, in board order.
    pub async fn find_all(pool: &SqlitePool) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, Initiative>(&format!(
            "SELECT {ALL_COLUMNS}
             FROM initiatives
             ORDER BY column_name, sort_order, created_at DESC"
        ))
        .fetch_all(pool)
        .await
    }

    /// Visible initiatives with customer-projected fields, in board order.
    pub async fn find_visible(pool: &SqlitePool) -> Result<Vec<CustomerInitiative>, sqlx::Error> {
        sqlx::query_as::<_, CustomerInitiative>(
            "SELECT id, title, ai_summary AS description, custom_tags, timeline,
                    column_name, sort_order
             FROM initiatives
             WHERE is_visible = 1
             ORDER BY column_name, sort_order, created_at DESC",
        )
        .fetch_all(pool)
        .await
    }

    pub async fn find_by_id(pool: &SqlitePool, id: Uuid) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Initiative>(&format!(
            "SELECT {ALL_COLUMNS} FROM initiatives WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(pool)
        .await
    }

    /// Apply a partial admin edit, keeping any unspecified field.
    pub async fn update(
        pool: &SqlitePool,
        id: Uuid,
        data: &UpdateInitiative,
    ) -> Result<Self, sqlx::Error> {
        let existing = Self::find_by_id(pool, id)
            .await?
            .ok_or(sqlx::Error::RowNotFound)?;

        let title = data.title.clone().unwrap_or(existing.title);
        let description = data.description.clone().unwrap_or(existing.description);
        let ai_summary = data.ai_summary.clone().or(existing.ai_summary);
        let custom_tags = data
            .custom_tags
            .clone()
            .map(Json)
            .unwrap_or(existing.custom_tags);
        let timeline = data.timeline.clone().or(existing.timeline);
        let column_name = data.column_name.unwrap_or(existing.column_name);
        let sort_order = data.sort_order.unwrap_or(existing.sort_order);
        let is_visible = data.is_visible.unwrap_or(existing.is_visible);

        sqlx::query_as::<_, Initiative>(&format!(
            "UPDATE initiatives
             SET title = $2, description = $3, ai_summary = $4, custom_tags = $5,
                 timeline = $6, column_name = $7, sort_order = $8, is_visible = $9,
                 updated_at = datetime('now', 'subsec')
             WHERE id = $1
             RETURNING {ALL_COLUMNS}"
        ))
        .bind(id)
        .bind(title)
        .bind(description)
        .bind(ai_summary)
        .bind(custom_tags)
        .bind(timeline)
        .bind(column_name)
        .bind(sort_order)
        .bind(is_visible)
        .fetch_one(pool)
        .await
    }

    /// Insert or update a synced feature, matching on `aha_id`.
    ///
    /// On insert the row starts visible; on update `is_visible` is left
    /// untouched so manual admin hides/shows survive repeated syncs.
    pub async fn upsert_synced(
        pool: &SqlitePool,
        feature: &SyncedFeature,
    ) -> Result<Self, sqlx::Error> {
        let id = Uuid::new_v4();
        sqlx::query_as::<_, Initiative>(&format!(
            "INSERT INTO initiatives
                 (id, aha_id, title, description, ai_summary, timeline, column_name,
                  raw_aha_data, is_visible)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, 1)
             ON CONFLICT (aha_id) DO UPDATE SET
                 title = excluded.title,
                 description = excluded.description,
                 ai_summary = excluded.ai_summary,
                 timeline = excluded.timeline,
                 column_name = excluded.column_name,
                 raw_aha_data = excluded.raw_aha_data,
                 updated_at = datetime('now', 'subsec')
             RETURNING {ALL_COLUMNS}"
        ))
        .bind(id)
        .bind(&feature.aha_id)
        .bind(&feature.title)
        .bind(&feature.description)
        .bind(&feature.ai_summary)
        .bind(&feature.timeline)
        .bind(feature.column_name)
        .bind(Json(feature.raw_aha_data.clone()))
        .fetch_one(pool)
        .await
    }

    pub async fn delete(pool: &SqlitePool, id: Uuid) -> Result<u64, sqlx::Error> {
        let result = sqlx::query("DELETE FROM initiatives WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;
        Ok(result.rows_affected())
    }

    /// Remove every initiative; returns the number of deleted rows.
    pub async fn delete_all(pool: &SqlitePool) -> Result<u64, sqlx::Error> {
        let result = sqlx::query("DELETE FROM initiatives").execute(pool).await?;
        Ok(result.rows_affected())
    }
}
