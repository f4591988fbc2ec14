//! Optional AI summarization of sanitized analyzer output.
//!
//! The summarizer is an external collaborator: text in, text out. Failures
//! here never fail the scan; the caller logs them and keeps the raw output.

use std::time::Duration;

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use serde_json::json;
use tracing::debug;
use url::Url;

/// Environment variable holding the summarizer API key.
pub const API_KEY_ENV: &str = "SOLISCAN_OPENAI_API_KEY";

const DEFAULT_API_URL: &str = "https://api.openai.com/v1/";
const DEFAULT_MODEL: &str = "gpt-4o-mini";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

const SYSTEM_PROMPT: &str = "You are a smart-contract security assistant. \
    Summarize the following static-analyzer output for a developer: list each \
    finding with severity and affected function, and omit tool boilerplate.";

#[async_trait]
pub trait Summarizer: Send + Sync {
    /// Produces a normalized text summary of one file's sanitized output.
    /// `owner` identifies the requesting user for accounting on the far side.
    async fn summarize(&self, owner: &str, output: &str) -> Result<String>;
}

/// Client for an OpenAI-compatible chat-completions endpoint.
pub struct OpenAiSummarizer {
    client: reqwest::Client,
    api_url: Url,
    api_key: String,
    model: String,
}

impl OpenAiSummarizer {
    /// Builds a client from the environment; `None` when no API key is set.
    pub fn from_env() -> Result<Option<Self>> {
        let api_key = match std::env::var(API_KEY_ENV) {
            Ok(key) if !key.trim().is_empty() => key,
            _ => return Ok(None),
        };
        let api_url = Url::parse(DEFAULT_API_URL).expect("default API URL parses");
        Ok(Some(Self::new(api_url, api_key, DEFAULT_MODEL.to_owned())?))
    }

    pub fn new(api_url: Url, api_key: String, model: String) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .context("failed to build summarizer HTTP client")?;
        Ok(OpenAiSummarizer { client, api_url, api_key, model })
    }
}

#[async_trait]
impl Summarizer for OpenAiSummarizer {
    async fn summarize(&self, owner: &str, output: &str) -> Result<String> {
        let endpoint =
            self.api_url.join("chat/completions").context("invalid summarizer API URL")?;
        debug!("Summarizing {} bytes of analyzer output for {owner}", output.len());

        let body = json!({
            "model": self.model,
            "user": owner,
            "messages": [
                { "role": "system", "content": SYSTEM_PROMPT },
                { "role": "user", "content": output },
            ],
        });

        let response = self
            .client
            .post(endpoint)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .context("summarizer request failed")?;

        let status = response.status();
        if !status.is_success() {
            bail!("summarizer returned {status}");
        }

        let payload: serde_json::Value =
            response.json().await.context("summarizer response is not JSON")?;
        let content = payload
            .pointer("/choices/0/message/content")
            .and_then(|v| v.as_str())
            .context("summarizer response has no message content")?;
        Ok(content.trim().to_owned())
    }
}
