//! The synchronization pipeline coordinator: fetch features from Aha!,
//! summarize them, and upsert the board, reporting progress through a
//! single shared snapshot with cooperative cancellation.

use std::sync::{Arc, Mutex, RwLock};

use db::{
    DBService,
    models::{
        config::ConfigEntry,
        initiative::{Initiative, SyncedFeature},
        sync_log::{SyncLog, SyncStatus},
    },
};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use crate::services::{
    aha::{AhaClient, AhaError},
    summarizer::{SummaryBackend, SummaryService},
};

/// Actor recorded in the sync audit log.
const SYNC_ACTOR: &str = "admin";

#[derive(Debug, Error)]
pub enum SyncError {
    #[error("Sync already in progress")]
    AlreadyInProgress,
    #[error("No sync in progress")]
    NoSyncInProgress,
    #[error("Sync cancelled by user")]
    Cancelled,
    #[error(transparent)]
    Aha(#[from] AhaError),
    #[error(transparent)]
    Database(#[from] sqlx::Error),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncStep {
    Idle,
    FetchingConfig,
    FetchingFeatures,
    AiSummaries,
    Saving,
    Completed,
    Error,
}

/// The transient snapshot describing an in-flight sync. Exactly one
/// exists per process; a new sync attempt overwrites it.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncProgress {
    pub in_progress: bool,
    pub step: SyncStep,
    pub message: String,
    pub current: u64,
    pub total: u64,
    pub percentage: u8,
    pub cancel_requested: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl Default for SyncProgress {
    fn default() -> Self {
        SyncProgress {
            in_progress: false,
            step: SyncStep::Idle,
            message: String::new(),
            current: 0,
            total: 0,
            percentage: 0,
            cancel_requested: false,
            error: None,
        }
    }
}

struct SyncOutcome {
    synced: u64,
    message: String,
}

/// Drives the sync pipeline. The shared in-memory `progress` snapshot
/// doubles as the single-sync lock, so this is not safe across multiple
/// server processes.
#[derive(Clone)]
pub struct SyncService {
    db: DBService,
    aha: AhaClient,
    summarizer: SummaryService,
    progress: Arc<RwLock<SyncProgress>>,
    cancel: Arc<Mutex<Option<CancellationToken>>>,
}

impl SyncService {
    pub fn new(db: DBService, aha: AhaClient, summarizer: SummaryService) -> Self {
        SyncService {
            db,
            aha,
            summarizer,
            progress: Arc::new(RwLock::new(SyncProgress::default())),
            cancel: Arc::new(Mutex::new(None)),
        }
    }

    /// Start a sync in the background and return immediately; the caller
    /// polls [`Self::progress`] separately. At most one sync runs at a
    /// time.
    ///
    /// The snapshot lock and the cancel slot lock are never held at the
    /// same time, here or anywhere else.
    pub fn start(&self) -> Result<(), SyncError> {
        {
            let mut progress = self.progress.write().expect("sync progress lock poisoned");
            if progress.in_progress {
                return Err(SyncError::AlreadyInProgress);
            }
            *progress = SyncProgress {
                in_progress: true,
                step: SyncStep::FetchingConfig,
                message: "Reading configuration...".to_string(),
                percentage: 5,
                ..Default::default()
            };
        }

        let token = CancellationToken::new();
        *self.cancel.lock().expect("cancel slot lock poisoned") = Some(token.clone());

        let service = self.clone();
        tokio::spawn(async move {
            service.run(token).await;
        });
        Ok(())
    }

    /// Request cooperative cancellation of the running sync. Takes effect
    /// at the next checkpoint, not mid-call.
    pub fn cancel(&self) -> Result<(), SyncError> {
        // Clone the token out so the slot guard is released before the
        // snapshot lock is taken.
        let token = self
            .cancel
            .lock()
            .expect("cancel slot lock poisoned")
            .clone();
        match token {
            Some(token) => {
                token.cancel();
                self.update_progress(|p| p.cancel_requested = true);
                info!("sync cancellation requested");
                Ok(())
            }
            None => Err(SyncError::NoSyncInProgress),
        }
    }

    /// Current snapshot; never blocks on the pipeline.
    pub fn progress(&self) -> SyncProgress {
        self.progress
            .read()
            .expect("sync progress lock poisoned")
            .clone()
    }

    fn update_progress(&self, apply: impl FnOnce(&mut SyncProgress)) {
        let mut progress = self.progress.write().expect("sync progress lock poisoned");
        apply(&mut progress);
    }

    async fn run(&self, cancel: CancellationToken) {
        info!("starting Aha! sync");
        let result = self.pipeline(&cancel).await;

        // Exactly one audit row per attempt. A failure writing it is
        // logged but never masks the sync outcome.
        let log_result = match &result {
            Ok(outcome) => {
                SyncLog::create(
                    &self.db.pool,
                    SyncStatus::Success,
                    &outcome.message,
                    outcome.synced as i64,
                    SYNC_ACTOR,
                )
                .await
            }
            Err(e) => {
                SyncLog::create(&self.db.pool, SyncStatus::Failed, &e.to_string(), 0, SYNC_ACTOR)
                    .await
            }
        };
        if let Err(log_error) = log_result {
            error!(%log_error, "failed to write sync log entry");
        }

        // Clear the slot before publishing the terminal snapshot: once
        // `in_progress` drops, a new sync may start and install its own
        // token, which this task must not overwrite.
        *self.cancel.lock().expect("cancel slot lock poisoned") = None;

        match result {
            Ok(outcome) => {
                info!(synced = outcome.synced, "sync completed");
                self.update_progress(|p| {
                    *p = SyncProgress {
                        step: SyncStep::Completed,
                        message: outcome.message.clone(),
                        current: outcome.synced,
                        total: outcome.synced,
                        percentage: 100,
                        ..Default::default()
                    };
                });
            }
            Err(e) => {
                error!(error = %e, "sync failed");
                self.update_progress(|p| {
                    *p = SyncProgress {
                        step: SyncStep::Error,
                        message: format!("Sync failed: {e}"),
                        error: Some(e.to_string()),
                        ..Default::default()
                    };
                });
            }
        }
    }

    async fn pipeline(&self, cancel: &CancellationToken) -> Result<SyncOutcome, SyncError> {
        let selected = ConfigEntry::selected_releases(&self.db.pool).await?;
        if selected.is_empty() {
            // Fetching zero releases is a successful no-op, not an error.
            return Ok(SyncOutcome {
                synced: 0,
                message: "No releases selected; nothing to sync".to_string(),
            });
        }

        // Checkpoint: before fetching features.
        if cancel.is_cancelled() {
            return Err(SyncError::Cancelled);
        }
        self.update_progress(|p| {
            p.step = SyncStep::FetchingFeatures;
            p.message = format!("Fetching features from {} releases...", selected.len());
            p.percentage = 10;
        });

        let features = self.aha.fetch_features(&selected).await?;
        if features.is_empty() {
            return Ok(SyncOutcome {
                synced: 0,
                message: "No features found in selected releases".to_string(),
            });
        }

        let model_id = ConfigEntry::ai_provider(&self.db.pool).await?.unwrap_or_default();
        let backend = SummaryBackend::resolve(&model_id);

        let total = features.len() as u64;
        self.update_progress(|p| {
            p.step = SyncStep::AiSummaries;
            p.message = format!("Generating AI summaries for {total} features...");
            p.percentage = 30;
            p.total = total;
        });

        // Per-item progress scaled into the 30-90% band.
        let summarized = self
            .summarizer
            .batch_summarize(features, backend, cancel, |batch| {
                self.update_progress(|p| {
                    p.current = batch.current;
                    p.message = batch.message.clone();
                    p.percentage = 30 + ((batch.current * 60) / batch.total.max(1)) as u8;
                });
            })
            .await
            .map_err(|_| SyncError::Cancelled)?;

        self.update_progress(|p| {
            p.step = SyncStep::Saving;
            p.message = "Saving features to database...".to_string();
            p.percentage = 95;
        });

        // Each upsert commits independently: a crash mid-sync leaves a
        // partial but consistent set of rows.
        let mut synced: u64 = 0;
        for item in summarized {
            if cancel.is_cancelled() {
                return Err(SyncError::Cancelled);
            }
            let row = SyncedFeature {
                aha_id: item.feature.aha_id,
                title: item.feature.title,
                description: item.feature.description,
                ai_summary: item.ai_summary,
                timeline: item.feature.timeline,
                column_name: item.feature.column_name,
                raw_aha_data: item.feature.raw,
            };
            Initiative::upsert_synced(&self.db.pool, &row).await?;
            synced += 1;
        }

        Ok(SyncOutcome {
            synced,
            message: format!("Successfully synced {synced} features"),
        })
    }
}
