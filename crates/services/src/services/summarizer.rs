//! Summarization clients: produce a short customer-facing blurb for a
//! feature via one of the interchangeable AI backends, degrading to a
//! deterministic local summary whenever a backend cannot deliver.

use std::time::Duration;

use reqwest::Client;
use secrecy::ExposeSecret;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::services::{aha::NormalizedFeature, aha::clean_html, config::SummarizerConfig};

const INSTRUCTION: &str = "Create a customer-friendly summary of this product feature in 1-2 \
                           sentences. Focus on the benefit to customers, avoid technical jargon:";
const MAX_SUMMARY_TOKENS: u32 = 150;
const FALLBACK_MAX_CHARS: usize = 150;

/// The summarization backends the board can route to. Resolved once from
/// the configured model id when the orchestrator reads configuration, not
/// per call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SummaryBackend {
    OneAdvanced,
    Gemini,
}

impl SummaryBackend {
    /// Model ids beginning with `gemini` route to Gemini; everything else
    /// (including the unset default) routes to OneAdvanced.
    pub fn resolve(model_id: &str) -> SummaryBackend {
        if model_id.to_lowercase().starts_with("gemini") {
            SummaryBackend::Gemini
        } else {
            SummaryBackend::OneAdvanced
        }
    }

    pub fn id(&self) -> &'static str {
        match self {
            SummaryBackend::OneAdvanced => "oneadvanced",
            SummaryBackend::Gemini => "gemini",
        }
    }
}

#[derive(Debug, Error)]
enum SummarizeError {
    #[error("{0} credentials are not configured")]
    ConfigurationMissing(&'static str),
    #[error("summarization request failed: {0}")]
    Upstream(#[from] reqwest::Error),
    #[error("summarization response carried no text")]
    EmptyResponse,
}

/// Per-item progress reported by [`SummaryService::batch_summarize`].
#[derive(Debug, Clone)]
pub struct BatchProgress {
    pub current: u64,
    pub total: u64,
    pub message: String,
}

/// Raised when the batch observes a cancelled token between items.
#[derive(Debug, Error)]
#[error("summarization batch cancelled")]
pub struct BatchCancelled;

/// A normalized feature with its generated customer-facing blurb.
#[derive(Debug, Clone)]
pub struct SummarizedFeature {
    pub feature: NormalizedFeature,
    pub ai_summary: String,
}

#[derive(Clone)]
pub struct SummaryService {
    http: Client,
    config: SummarizerConfig,
}

impl SummaryService {
    const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);
    /// Pause between backend calls; the third-party APIs rate-limit.
    const INTER_CALL_DELAY: Duration = Duration::from_millis(500);

    pub fn new(config: SummarizerConfig) -> Self {
        let http = Client::builder()
            .timeout(Self::REQUEST_TIMEOUT)
            .user_agent(concat!("roadmap-board/", env!("CARGO_PKG_VERSION")))
            .build()
            .expect("failed to build HTTP client");
        Self { http, config }
    }

    /// The backends whose credentials are present. Availability is
    /// capability-gated, not a fixed list.
    pub fn available_backends(&self) -> Vec<SummaryBackend> {
        let mut backends = Vec::new();
        if self.config.oneadvanced_url.is_some() && self.config.oneadvanced_key.is_some() {
            backends.push(SummaryBackend::OneAdvanced);
        }
        if self.config.gemini_key.is_some() {
            backends.push(SummaryBackend::Gemini);
        }
        backends
    }

    /// Summarize `text` with the given backend. Never fails: missing
    /// credentials, network errors, and malformed responses all degrade to
    /// the deterministic local fallback.
    pub async fn summarize(&self, text: &str, backend: SummaryBackend) -> String {
        let result = match backend {
            SummaryBackend::OneAdvanced => self.summarize_with_oneadvanced(text).await,
            SummaryBackend::Gemini => self.summarize_with_gemini(text).await,
        };
        match result {
            Ok(summary) => summary,
            Err(error) => {
                warn!(backend = backend.id(), %error, "summarization failed; using fallback");
                fallback_summary(text)
            }
        }
    }

    async fn summarize_with_oneadvanced(&self, text: &str) -> Result<String, SummarizeError> {
        let (Some(url), Some(key)) = (
            self.config.oneadvanced_url.as_deref(),
            self.config.oneadvanced_key.as_ref(),
        ) else {
            return Err(SummarizeError::ConfigurationMissing("OneAdvanced"));
        };

        #[derive(Serialize)]
        struct Request {
            prompt: String,
            max_tokens: u32,
        }
        #[derive(Deserialize)]
        struct Response {
            #[serde(default)]
            summary: Option<String>,
            #[serde(default)]
            text: Option<String>,
        }

        let response: Response = self
            .http
            .post(url)
            .bearer_auth(key.expose_secret())
            .json(&Request {
                prompt: format!("{INSTRUCTION}\n\n{text}"),
                max_tokens: MAX_SUMMARY_TOKENS,
            })
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        response
            .summary
            .or(response.text)
            .filter(|s| !s.trim().is_empty())
            .ok_or(SummarizeError::EmptyResponse)
    }

    async fn summarize_with_gemini(&self, text: &str) -> Result<String, SummarizeError> {
        let Some(key) = self.config.gemini_key.as_ref() else {
            return Err(SummarizeError::ConfigurationMissing("Gemini"));
        };

        #[derive(Serialize)]
        struct Part {
            text: String,
        }
        #[derive(Serialize)]
        struct Content {
            parts: Vec<Part>,
        }
        #[derive(Serialize)]
        #[serde(rename_all = "camelCase")]
        struct GenerationConfig {
            max_output_tokens: u32,
            temperature: f32,
        }
        #[derive(Serialize)]
        #[serde(rename_all = "camelCase")]
        struct Request {
            contents: Vec<Content>,
            generation_config: GenerationConfig,
        }
        #[derive(Deserialize)]
        struct ResponsePart {
            #[serde(default)]
            text: Option<String>,
        }
        #[derive(Deserialize)]
        struct ResponseContent {
            #[serde(default)]
            parts: Vec<ResponsePart>,
        }
        #[derive(Deserialize)]
        struct Candidate {
            #[serde(default)]
            content: Option<ResponseContent>,
        }
        #[derive(Deserialize)]
        struct Response {
            #[serde(default)]
            candidates: Vec<Candidate>,
        }

        let url = format!(
            "https://generativelanguage.googleapis.com/v1beta/models/gemini-pro:generateContent?key={}",
            key.expose_secret()
        );
        let response: Response = self
            .http
            .post(&url)
            .json(&Request {
                contents: vec![Content {
                    parts: vec![Part {
                        text: format!("{INSTRUCTION}\n\n{text}"),
                    }],
                }],
                generation_config: GenerationConfig {
                    max_output_tokens: MAX_SUMMARY_TOKENS,
                    temperature: 0.7,
                },
            })
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        response
            .candidates
            .into_iter()
            .next()
            .and_then(|c| c.content)
            .and_then(|c| c.parts.into_iter().next())
            .and_then(|p| p.text)
            .filter(|s| !s.trim().is_empty())
            .ok_or(SummarizeError::EmptyResponse)
    }

    /// Summarize each feature strictly in sequence, pausing between calls
    /// and reporting per-item progress. The cancellation token is checked
    /// once per item; a cancelled token aborts the rest of the batch.
    pub async fn batch_summarize<F>(
        &self,
        items: Vec<NormalizedFeature>,
        backend: SummaryBackend,
        cancel: &CancellationToken,
        mut on_progress: F,
    ) -> Result<Vec<SummarizedFeature>, BatchCancelled>
    where
        F: FnMut(BatchProgress),
    {
        let total = items.len() as u64;
        let mut summarized = Vec::with_capacity(items.len());

        for (index, feature) in items.into_iter().enumerate() {
            if cancel.is_cancelled() {
                return Err(BatchCancelled);
            }

            let text = format!("{}. {}", feature.title, feature.description);
            let ai_summary = self.summarize(&text, backend).await;
            debug!(aha_id = %feature.aha_id, "generated summary");

            on_progress(BatchProgress {
                current: index as u64 + 1,
                total,
                message: format!("Summarized \"{}\"", feature.title),
            });
            summarized.push(SummarizedFeature {
                feature,
                ai_summary,
            });

            tokio::time::sleep(Self::INTER_CALL_DELAY).await;
        }

        Ok(summarized)
    }
}

/// Deterministic local summary: HTML-stripped text, truncated to 147
/// characters plus an ellipsis when longer than 150.
pub fn fallback_summary(text: &str) -> String {
    let cleaned = clean_html(text);
    if cleaned.chars().count() > FALLBACK_MAX_CHARS {
        let truncated: String = cleaned.chars().take(FALLBACK_MAX_CHARS - 3).collect();
        format!("{truncated}...")
    } else {
        cleaned
    }
}

#[cfg(test)]
mod tests {
    use db::models::initiative::BoardColumn;
    use serde_json::json;

    use super::*;

    fn feature(aha_id: &str, title: &str) -> NormalizedFeature {
        NormalizedFeature {
            aha_id: aha_id.to_string(),
            title: title.to_string(),
            description: "Does things".to_string(),
            timeline: None,
            column_name: BoardColumn::Explore,
            raw: json!({ "id": aha_id }),
        }
    }

    #[test]
    fn model_ids_resolve_by_prefix() {
        assert_eq!(SummaryBackend::resolve("gemini"), SummaryBackend::Gemini);
        assert_eq!(SummaryBackend::resolve("Gemini-2.0"), SummaryBackend::Gemini);
        assert_eq!(SummaryBackend::resolve("oneadvanced"), SummaryBackend::OneAdvanced);
        assert_eq!(SummaryBackend::resolve(""), SummaryBackend::OneAdvanced);
    }

    #[test]
    fn availability_is_gated_on_credentials() {
        let none = SummaryService::new(SummarizerConfig::default());
        assert!(none.available_backends().is_empty());

        let gemini_only = SummaryService::new(SummarizerConfig {
            gemini_key: Some("key".into()),
            ..Default::default()
        });
        assert_eq!(gemini_only.available_backends(), vec![SummaryBackend::Gemini]);

        // A OneAdvanced URL without a key is not a usable backend.
        let url_only = SummaryService::new(SummarizerConfig {
            oneadvanced_url: Some("https://ai.example.com".to_string()),
            ..Default::default()
        });
        assert!(url_only.available_backends().is_empty());
    }

    #[test]
    fn fallback_strips_html_and_truncates() {
        assert_eq!(fallback_summary("<p>short</p>"), "short");
        assert_eq!(fallback_summary(""), "");

        let long = "x".repeat(200);
        let summary = fallback_summary(&long);
        assert_eq!(summary.chars().count(), 150);
        assert!(summary.ends_with("..."));

        let exactly_150 = "y".repeat(150);
        assert_eq!(fallback_summary(&exactly_150), exactly_150);
    }

    #[tokio::test]
    async fn unconfigured_backend_degrades_to_fallback() {
        let service = SummaryService::new(SummarizerConfig::default());
        let summary = service
            .summarize("Dark mode. Draws less power", SummaryBackend::OneAdvanced)
            .await;
        assert_eq!(summary, "Dark mode. Draws less power");
    }

    #[tokio::test]
    async fn batch_reports_progress_per_item() {
        let service = SummaryService::new(SummarizerConfig::default());
        let cancel = CancellationToken::new();
        let mut seen = Vec::new();

        let out = service
            .batch_summarize(
                vec![feature("F1", "One"), feature("F2", "Two")],
                SummaryBackend::OneAdvanced,
                &cancel,
                |p| seen.push((p.current, p.total)),
            )
            .await
            .unwrap();

        assert_eq!(out.len(), 2);
        assert!(!out[0].ai_summary.is_empty());
        assert_eq!(seen, vec![(1, 2), (2, 2)]);
    }

    #[tokio::test]
    async fn cancelled_token_aborts_the_batch() {
        let service = SummaryService::new(SummarizerConfig::default());
        let cancel = CancellationToken::new();
        cancel.cancel();

        let result = service
            .batch_summarize(
                vec![feature("F1", "One")],
                SummaryBackend::OneAdvanced,
                &cancel,
                |_| {},
            )
            .await;
        assert!(result.is_err());
    }
}
