use crate::{analytics::Summary, catalog::Catalog};
use anyhow::{Context, Result};
use serde::Deserialize;
use std::{collections::BTreeSet, future::Future, time::Duration};
use tracing::{debug, warn};

const GEMINI_API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta";
pub const DEFAULT_MODEL: &str = "gemini-3-flash-preview";

/// Fixed text shown in place of a generated summary.
#[derive(Clone, Copy, Debug)]
pub struct Fallback {
    pub empty_reply: &'static str,
    pub failed: &'static str,
}

pub const REFLECTION_FALLBACK: Fallback = Fallback {
    empty_reply: "Day completed with excellence! 🌟",
    failed: "Another day of progress stored in the archives! 🚀",
};

pub const REVIEW_FALLBACK: Fallback = Fallback {
    empty_reply: "Crushing your goals! Python and fitness are the ultimate combo. 🐍🏋️‍♂️",
    failed: "Crushing your goals! Python and fitness are the ultimate combo. 🐍🏋️‍♂️",
};

/// Remote text generation. Failures are expected and handled by [`summarize`].
pub trait Summarizer {
    fn generate(&self, prompt: &str) -> impl Future<Output = Result<String>> + Send;
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Unavailable {
    EmptyReply,
    Failed,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SummaryOutcome {
    Summary(String),
    Unavailable(Unavailable),
}

impl SummaryOutcome {
    pub fn or_fallback(self, fallback: Fallback) -> String {
        match self {
            SummaryOutcome::Summary(text) => text,
            SummaryOutcome::Unavailable(Unavailable::EmptyReply) => {
                fallback.empty_reply.to_string()
            }
            SummaryOutcome::Unavailable(Unavailable::Failed) => fallback.failed.to_string(),
        }
    }
}

/// Best-effort call: errors and blank replies become `Unavailable`.
pub async fn summarize<Z: Summarizer>(z: &Z, prompt: &str) -> SummaryOutcome {
    match z.generate(prompt).await {
        Ok(text) if !text.trim().is_empty() => SummaryOutcome::Summary(text.trim().to_string()),
        Ok(_) => {
            warn!("summarizer returned an empty reply");
            SummaryOutcome::Unavailable(Unavailable::EmptyReply)
        }
        Err(err) => {
            warn!("summarizer unavailable: {err:#}");
            SummaryOutcome::Unavailable(Unavailable::Failed)
        }
    }
}

/// End-of-day prompt listing the completed activities in catalog order.
pub fn reflection_prompt(catalog: &Catalog, completed: &BTreeSet<String>) -> String {
    let activities = catalog
        .items()
        .iter()
        .filter(|it| completed.contains(&it.id))
        .map(|it| it.activity.as_str())
        .collect::<Vec<_>>()
        .join(", ");
    format!(
        "I completed these tasks today: {activities}. Write a very brief, high-energy success summary (1-2 sentences) of my day to save in my archive. Use emojis."
    )
}

pub fn performance_prompt(summary: &Summary, done_today: usize, catalog_len: usize) -> String {
    format!(
        "Schedule: 5AM to 12AM. Python, College and Fitness focus. Average completion: {}%. Streak: {}. Today: {}/{}. Provide a sharp motivational analysis. One tip to maintain the streak. Use emojis. 2 sentences max.",
        summary.average_completion, summary.streak, done_today, catalog_len
    )
}

#[derive(Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Deserialize)]
struct Candidate {
    content: Option<Content>,
}

#[derive(Deserialize)]
struct Content {
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Deserialize)]
struct Part {
    text: Option<String>,
}

impl GenerateContentResponse {
    fn text(&self) -> String {
        self.candidates
            .first()
            .and_then(|c| c.content.as_ref())
            .map(|c| {
                c.parts
                    .iter()
                    .filter_map(|p| p.text.as_deref())
                    .collect::<String>()
            })
            .unwrap_or_default()
    }
}

/// Google Generative Language API client.
#[derive(Clone)]
pub struct GeminiSummarizer {
    api_key: String,
    model: String,
    base_url: String,
    client: reqwest::Client,
}

impl GeminiSummarizer {
    pub fn new(api_key: String, model: String, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to build HTTP client")?;
        Ok(Self {
            api_key,
            model,
            base_url: GEMINI_API_BASE.to_string(),
            client,
        })
    }

    pub fn with_base_url(mut self, base_url: &str) -> Self {
        self.base_url = base_url.trim_end_matches('/').to_string();
        self
    }

    fn endpoint(&self) -> String {
        format!("{}/models/{}:generateContent", self.base_url, self.model)
    }
}

impl Summarizer for GeminiSummarizer {
    async fn generate(&self, prompt: &str) -> Result<String> {
        let body = serde_json::json!({
            "contents": [
                { "parts": [ { "text": prompt } ] }
            ],
        });

        debug!("POST {}", self.endpoint());
        let response = self
            .client
            .post(self.endpoint())
            .header("x-goog-api-key", &self.api_key)
            .json(&body)
            .send()
            .await
            .context("Failed to send generateContent request")?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            anyhow::bail!("generateContent error ({}): {}", status, error_text);
        }

        let parsed: GenerateContentResponse = response
            .json()
            .await
            .context("Failed to parse generateContent response")?;
        Ok(parsed.text())
    }
}

/// Used when no API key is configured; every call falls back.
#[derive(Clone, Copy, Debug, Default)]
pub struct OfflineSummarizer;

impl Summarizer for OfflineSummarizer {
    async fn generate(&self, _prompt: &str) -> Result<String> {
        anyhow::bail!("no API key configured")
    }
}
