//! Client for the Aha! catalog API: release listing, per-release feature
//! queries, and normalization of raw feature records into board rows.

use std::{collections::HashSet, sync::LazyLock, time::Duration};

use chrono::NaiveDate;
use db::models::initiative::BoardColumn;
use regex::Regex;
use reqwest::Client;
use secrecy::ExposeSecret;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{info, warn};

use crate::services::config::AhaConfig;

/// Releases (and completed features) older than this are not interesting
/// for the board.
static HISTORY_CUTOFF: LazyLock<NaiveDate> =
    LazyLock::new(|| NaiveDate::from_ymd_opt(2025, 1, 1).expect("valid cutoff date"));

static HTML_TAG: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"<[^>]*>").expect("valid HTML tag pattern"));

#[derive(Debug, Error)]
pub enum AhaError {
    #[error("Aha! API configuration is incomplete")]
    ConfigurationMissing,
    #[error("Aha! API request failed: {0}")]
    Upstream(#[from] reqwest::Error),
}

/// A release as offered to the admin release selector.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReleaseSummary {
    pub id: String,
    pub name: String,
    pub release_date: Option<NaiveDate>,
}

/// One Aha! feature after transformation and filtering, before
/// summarization.
#[derive(Debug, Clone, Serialize)]
pub struct NormalizedFeature {
    pub aha_id: String,
    pub title: String,
    pub description: String,
    pub timeline: Option<String>,
    pub column_name: BoardColumn,
    /// Raw source record, persisted alongside the normalized fields
    pub raw: serde_json::Value,
}

#[derive(Debug, Deserialize)]
struct ReleasesPage {
    #[serde(default)]
    releases: Vec<ReleaseSummary>,
}

#[derive(Debug, Deserialize)]
struct FeaturesPage {
    #[serde(default)]
    features: Vec<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
struct RawFeature {
    id: String,
    name: String,
    #[serde(default)]
    description: Option<RawDescription>,
    #[serde(default)]
    workflow_status: Option<RawWorkflowStatus>,
    #[serde(default)]
    release: Option<RawFeatureRelease>,
}

/// Aha! returns descriptions either as a plain string or as an object
/// carrying a `body` field, depending on the requested fields.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RawDescription {
    Text(String),
    Rich {
        #[serde(default)]
        body: Option<String>,
    },
}

#[derive(Debug, Deserialize)]
struct RawWorkflowStatus {
    #[serde(default)]
    name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RawFeatureRelease {
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    release_date: Option<NaiveDate>,
}

#[derive(Clone)]
pub struct AhaClient {
    http: Client,
    config: Option<AhaConfig>,
}

impl AhaClient {
    const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);
    const PAGE_SIZE: u32 = 200;
    const FEATURE_FIELDS: &'static str = "id,name,description,workflow_status,release,created_at";

    pub fn new(config: Option<AhaConfig>) -> Self {
        let http = Client::builder()
            .timeout(Self::REQUEST_TIMEOUT)
            .user_agent(concat!("roadmap-board/", env!("CARGO_PKG_VERSION")))
            .build()
            .expect("failed to build HTTP client");
        Self { http, config }
    }

    fn config(&self) -> Result<&AhaConfig, AhaError> {
        self.config.as_ref().ok_or(AhaError::ConfigurationMissing)
    }

    /// Page through every release of the configured product and return the
    /// ones worth showing: dated on/after the history cutoff, or undated
    /// ("upcoming"), sorted ascending by date with undated releases last.
    pub async fn list_releases(&self) -> Result<Vec<ReleaseSummary>, AhaError> {
        let config = self.config()?;
        let url = format!(
            "{}/products/{}/releases",
            config.api_url, config.product_id
        );

        let mut all = Vec::new();
        let mut page: u32 = 1;
        loop {
            let body: ReleasesPage = self
                .http
                .get(&url)
                .bearer_auth(config.api_key.expose_secret())
                .query(&[
                    ("per_page", Self::PAGE_SIZE.to_string()),
                    ("page", page.to_string()),
                ])
                .send()
                .await?
                .error_for_status()?
                .json()
                .await?;

            let fetched = body.releases.len();
            all.extend(body.releases);
            if fetched < Self::PAGE_SIZE as usize {
                break;
            }
            page += 1;
        }

        let mut retained: Vec<ReleaseSummary> = all
            .into_iter()
            .filter(|r| r.release_date.is_none_or(|d| d >= *HISTORY_CUTOFF))
            .collect();
        retained.sort_by_key(|r| r.release_date.unwrap_or(NaiveDate::MAX));
        Ok(retained)
    }

    /// Fetch and normalize the features of the selected releases.
    ///
    /// An empty selection returns an empty result without touching the
    /// network, so an unconfigured board never syncs the entire backlog.
    /// A failure fetching one release is logged and skipped; results are
    /// de-duplicated by Aha! id across releases.
    pub async fn fetch_features(
        &self,
        selected_release_names: &[String],
    ) -> Result<Vec<NormalizedFeature>, AhaError> {
        if selected_release_names.is_empty() {
            return Ok(Vec::new());
        }
        let config = self.config()?;
        let url = format!(
            "{}/products/{}/features",
            config.api_url, config.product_id
        );

        let per_page = Self::PAGE_SIZE.to_string();
        let mut raw_features = Vec::new();
        for name in selected_release_names {
            let query = format!("release.name:\"{name}\"");
            let result: Result<FeaturesPage, reqwest::Error> = async {
                self.http
                    .get(&url)
                    .bearer_auth(config.api_key.expose_secret())
                    .query(&[
                        ("q", query.as_str()),
                        ("per_page", per_page.as_str()),
                        ("fields", Self::FEATURE_FIELDS),
                    ])
                    .send()
                    .await?
                    .error_for_status()?
                    .json()
                    .await
            }
            .await;

            match result {
                Ok(body) => {
                    info!(release = %name, count = body.features.len(), "fetched features");
                    raw_features.extend(body.features);
                }
                Err(error) => {
                    warn!(release = %name, %error, "failed to fetch features for release; skipping");
                }
            }
        }

        let mut seen = HashSet::new();
        let normalized = raw_features
            .iter()
            .filter_map(normalize_feature)
            .filter(|f| seen.insert(f.aha_id.clone()))
            .collect();
        Ok(normalized)
    }
}

/// Transform one raw Aha! feature into a board row.
///
/// Returns `None` for records the board drops: unparsable entries,
/// "will not do" statuses, and completed work older than the cutoff.
pub fn normalize_feature(raw: &serde_json::Value) -> Option<NormalizedFeature> {
    let feature: RawFeature = match serde_json::from_value(raw.clone()) {
        Ok(f) => f,
        Err(error) => {
            warn!(%error, "skipping malformed feature record");
            return None;
        }
    };

    let status = feature
        .workflow_status
        .as_ref()
        .and_then(|s| s.name.as_deref())
        .unwrap_or("");
    if status.to_lowercase().contains("will not") {
        return None;
    }

    let column = map_status_to_column(status);
    let release_date = feature.release.as_ref().and_then(|r| r.release_date);
    // Completed items only stay on the board while recent; anything done
    // without a known date is stale history too.
    if column == BoardColumn::Done && !release_date.is_some_and(|d| d >= *HISTORY_CUTOFF) {
        return None;
    }

    Some(NormalizedFeature {
        aha_id: feature.id,
        title: feature.name,
        description: feature
            .description
            .as_ref()
            .map(extract_description)
            .unwrap_or_default(),
        timeline: feature.release.as_ref().and_then(extract_timeline),
        column_name: column,
        raw: raw.clone(),
    })
}

/// Derive the board column from the workflow-status label via
/// case-insensitive substring matching. Unrecognized statuses land in
/// `explore`.
fn map_status_to_column(status: &str) -> BoardColumn {
    const DONE: &[&str] = &["shipped", "released", "done", "complete", "live"];
    const NOW: &[&str] = &["in progress", "development", "building", "active", "working"];
    const NEXT: &[&str] = &["planned", "ready", "scheduled", "approved", "committed"];

    let status = status.to_lowercase();
    if DONE.iter().any(|k| status.contains(k)) {
        BoardColumn::Done
    } else if NOW.iter().any(|k| status.contains(k)) {
        BoardColumn::Now
    } else if NEXT.iter().any(|k| status.contains(k)) {
        BoardColumn::Next
    } else {
        BoardColumn::Explore
    }
}

/// "Month Year" from the release date, falling back to the release name.
fn extract_timeline(release: &RawFeatureRelease) -> Option<String> {
    match release.release_date {
        Some(date) => Some(date.format("%B %Y").to_string()),
        None => release.name.clone(),
    }
}

fn extract_description(description: &RawDescription) -> String {
    let body = match description {
        RawDescription::Text(text) => text.as_str(),
        RawDescription::Rich { body } => body.as_deref().unwrap_or(""),
    };
    clean_html(body)
}

/// Strip HTML tags and decode the entities Aha! descriptions carry.
pub fn clean_html(text: &str) -> String {
    let stripped = HTML_TAG.replace_all(text, "");
    // `&amp;` last, so already-escaped entities are not decoded twice.
    stripped
        .replace("&nbsp;", " ")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&amp;", "&")
        .trim()
        .to_string()
}
