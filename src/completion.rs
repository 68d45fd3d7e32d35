//! Language-model completion capability.
//!
//! Defines the [`ChatModel`] trait — "given a prompt, return text" — and the
//! [`OpenAiChat`] implementation calling the OpenAI chat-completions API.
//! The model's output is free-form and occasionally malformed; callers that
//! need structure parse it downstream (see [`crate::generate`]).
//!
//! Uses the same retry strategy as the embeddings client: 429/5xx/network
//! errors retry with exponential backoff, other 4xx fail immediately.

use anyhow::{anyhow, bail, Result};
use async_trait::async_trait;
use std::time::Duration;

use crate::config::OpenAiConfig;

/// A single-shot text completion capability.
#[async_trait]
pub trait ChatModel: Send + Sync {
    /// Complete the prompt once and return the raw model text.
    async fn complete(&self, prompt: &str) -> Result<String>;
}

/// Chat model backed by the OpenAI chat-completions API.
///
/// Requires the `OPENAI_API_KEY` environment variable. Temperature is pinned
/// to 0 for repeatable study artifacts.
pub struct OpenAiChat {
    model: String,
    api_key: String,
    timeout: Duration,
    max_retries: u32,
}

impl OpenAiChat {
    pub fn from_config(config: &OpenAiConfig) -> Result<Self> {
        let api_key = std::env::var("OPENAI_API_KEY")
            .map_err(|_| anyhow!("OPENAI_API_KEY environment variable not set"))?;

        Ok(Self {
            model: config.chat_model.clone(),
            api_key,
            timeout: Duration::from_secs(config.timeout_secs),
            max_retries: config.max_retries,
        })
    }
}

#[async_trait]
impl ChatModel for OpenAiChat {
    async fn complete(&self, prompt: &str) -> Result<String> {
        let client = reqwest::Client::builder().timeout(self.timeout).build()?;
        let body = serde_json::json!({
            "model": self.model,
            "temperature": 0.0,
            "messages": [{"role": "user", "content": prompt}],
        });

        let mut last_err = None;

        for attempt in 0..=self.max_retries {
            if attempt > 0 {
                let delay = Duration::from_secs(1 << (attempt - 1).min(5));
                tokio::time::sleep(delay).await;
            }

            let resp = client
                .post("https://api.openai.com/v1/chat/completions")
                .header("Authorization", format!("Bearer {}", self.api_key))
                .header("Content-Type", "application/json")
                .json(&body)
                .send()
                .await;

            match resp {
                Ok(response) => {
                    let status = response.status();

                    if status.is_success() {
                        let json: serde_json::Value = response.json().await?;
                        return parse_completion_response(&json);
                    }

                    if status.as_u16() == 429 || status.is_server_error() {
                        let body_text = response.text().await.unwrap_or_default();
                        last_err = Some(anyhow!("Completions API error {}: {}", status, body_text));
                        continue;
                    }

                    let body_text = response.text().await.unwrap_or_default();
                    bail!("Completions API error {}: {}", status, body_text);
                }
                Err(e) => {
                    last_err = Some(e.into());
                    continue;
                }
            }
        }

        Err(last_err.unwrap_or_else(|| anyhow!("Completion failed after retries")))
    }
}

/// Pull the first choice's message content out of a completions response.
fn parse_completion_response(json: &serde_json::Value) -> Result<String> {
    json.get("choices")
        .and_then(|c| c.as_array())
        .and_then(|c| c.first())
        .and_then(|c| c.get("message"))
        .and_then(|m| m.get("content"))
        .and_then(|t| t.as_str())
        .map(|s| s.to_string())
        .ok_or_else(|| anyhow!("Invalid completions response: missing message content"))
}
