//! Language-model providers for answer generation.
//!
//! [`ChatCompletionsModel`] speaks the OpenAI-compatible `/chat/completions`
//! protocol, which covers both Perplexity (default, `sonar-pro`) and OpenAI.
//! The prompt is sent as a single user message.
//!
//! Unlike the embedding providers, generation is never retried: a failed call
//! surfaces to the caller immediately.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{anyhow, bail, Result};
use async_trait::async_trait;

use crate::config::LlmConfig;
use crate::error::RagError;

const PERPLEXITY_URL: &str = "https://api.perplexity.ai/chat/completions";
const OPENAI_URL: &str = "https://api.openai.com/v1/chat/completions";

#[async_trait]
pub trait LanguageModel: Send + Sync {
    fn model_name(&self) -> &str;

    /// Send `prompt` and return the model's text output unchanged.
    async fn generate(&self, prompt: &str) -> Result<String>;
}

/// Build the configured language model.
///
/// Fails with [`RagError::MissingCredential`] (inside the `anyhow::Error`)
/// when the API key variable is unset.
pub fn create_model(config: &LlmConfig) -> Result<Arc<dyn LanguageModel>> {
    Ok(Arc::new(ChatCompletionsModel::new(config)?))
}

/// Read the API key named by `llm.api_key_env`.
pub fn require_api_key(config: &LlmConfig) -> Result<String, RagError> {
    match std::env::var(&config.api_key_env) {
        Ok(key) if !key.trim().is_empty() => Ok(key),
        _ => Err(RagError::MissingCredential(config.api_key_env.clone())),
    }
}

pub struct ChatCompletionsModel {
    model: String,
    url: String,
    temperature: f32,
    api_key: String,
    client: reqwest::Client,
}

impl ChatCompletionsModel {
    pub fn new(config: &LlmConfig) -> Result<Self> {
        let api_key = require_api_key(config)?;
        let url = match (&config.url, config.provider.as_str()) {
            (Some(url), _) => url.clone(),
            (None, "perplexity") => PERPLEXITY_URL.to_string(),
            (None, "openai") => OPENAI_URL.to_string(),
            (None, other) => bail!("Unknown llm provider: {}", other),
        };

        let mut builder = reqwest::Client::builder();
        if let Some(secs) = config.timeout_secs {
            builder = builder.timeout(Duration::from_secs(secs));
        }

        Ok(Self {
            model: config.model.clone(),
            url,
            temperature: config.temperature,
            api_key,
            client: builder.build()?,
        })
    }
}

#[async_trait]
impl LanguageModel for ChatCompletionsModel {
    fn model_name(&self) -> &str {
        &self.model
    }

    async fn generate(&self, prompt: &str) -> Result<String> {
        let body = serde_json::json!({
            "model": self.model,
            "temperature": self.temperature,
            "messages": [
                { "role": "user", "content": prompt }
            ],
        });

        let resp = self
            .client
            .post(&self.url)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let text = resp.text().await.unwrap_or_default();
            bail!("{} returned {}: {}", self.model, status, text);
        }

        let json: serde_json::Value = resp.json().await?;
        parse_completion(&json)
    }
}

/// Extracts `choices[0].message.content`.
fn parse_completion(json: &serde_json::Value) -> Result<String> {
    if let Some(err) = json.get("error") {
        bail!("API returned error: {}", err);
    }
    json.get("choices")
        .and_then(|c| c.get(0))
        .and_then(|c| c.get("message"))
        .and_then(|m| m.get("content"))
        .and_then(|c| c.as_str())
        .map(str::to_string)
        .ok_or_else(|| anyhow!("Invalid chat completion response: missing choices[0].message.content"))
}
