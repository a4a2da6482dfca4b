//! Text-generation abstraction and prompt construction.
//!
//! The answer step is delegated to a [`TextGenerator`]. The core builds
//! the prompts (a fixed system prompt plus a numbered context block and
//! the question) and treats whatever the generator returns, or any error
//! it raises, as opaque.
//!
//! Implementations:
//! - **[`DisabledGenerator`]** always fails; used when `[llm] provider = "disabled"`.
//! - **[`OpenAiGenerator`]** talks to any OpenAI-compatible `/chat/completions` endpoint.
//!
//! # Retry Strategy
//!
//! The OpenAI client retries transient failures with exponential backoff:
//! - HTTP 429 (rate limited) and 5xx (server error) → retry
//! - HTTP 4xx (client error, not 429) → fail immediately
//! - Network errors and timeouts → retry
//! - Backoff: 1s, 2s, 4s, 8s, 16s, 32s (capped at 2^5)

use anyhow::{anyhow, bail, Result};
use async_trait::async_trait;
use std::time::Duration;

use crate::config::LlmConfig;
use crate::models::Source;

/// Instructions sent with every question.
pub const SYSTEM_PROMPT: &str = "You are a document assistant. Answer the question using only \
the numbered sources provided. Cite the sources you rely on as [Source N]. If the sources do \
not contain the answer, say that the uploaded documents do not cover it.";

/// A text-completion service.
#[async_trait]
pub trait TextGenerator: Send + Sync {
    /// Model identifier, for logging.
    fn model_name(&self) -> &str;

    /// Produce an answer for the given prompts.
    async fn generate(&self, system_prompt: &str, user_prompt: &str) -> Result<String>;
}

/// Render sources as `[Source i] title: content` blocks, 1-based,
/// separated by blank lines.
pub fn build_context(sources: &[Source]) -> String {
    sources
        .iter()
        .enumerate()
        .map(|(i, s)| format!("[Source {}] {}: {}", i + 1, s.document_title, s.content))
        .collect::<Vec<_>>()
        .join("\n\n")
}

/// The user prompt: context block followed by the question.
pub fn build_user_prompt(query: &str, sources: &[Source]) -> String {
    format!(
        "Sources:\n{}\n\nQuestion: {}",
        build_context(sources),
        query.trim()
    )
}

/// Build the configured generator.
pub fn create_generator(config: &LlmConfig) -> Result<Box<dyn TextGenerator>> {
    match config.provider.as_str() {
        "disabled" => Ok(Box::new(DisabledGenerator)),
        "openai" => Ok(Box::new(OpenAiGenerator::new(config)?)),
        other => bail!("Unknown llm provider: {}", other),
    }
}

// ============ Disabled Generator ============

/// A generator that always fails; used when no provider is configured.
#[derive(Debug)]
pub struct DisabledGenerator;

#[async_trait]
impl TextGenerator for DisabledGenerator {
    fn model_name(&self) -> &str {
        "disabled"
    }

    async fn generate(&self, _system_prompt: &str, _user_prompt: &str) -> Result<String> {
        bail!("llm provider is disabled; set [llm] provider in config")
    }
}

// ============ OpenAI Generator ============

/// Chat-completions client for OpenAI and compatible APIs.
///
/// Reads the API key from `OPENAI_API_KEY` unless constructed with
/// [`OpenAiGenerator::with_api_key`].
pub struct OpenAiGenerator {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
    model: String,
    temperature: f32,
    max_tokens: u32,
    max_retries: u32,
}

impl OpenAiGenerator {
    /// # Errors
    ///
    /// Returns an error if `llm.model` is not set or `OPENAI_API_KEY` is
    /// not in the environment.
    pub fn new(config: &LlmConfig) -> Result<Self> {
        let api_key = std::env::var("OPENAI_API_KEY")
            .map_err(|_| anyhow!("OPENAI_API_KEY environment variable not set"))?;
        Self::with_api_key(config, api_key)
    }

    pub fn with_api_key(config: &LlmConfig, api_key: impl Into<String>) -> Result<Self> {
        let model = config
            .model
            .clone()
            .ok_or_else(|| anyhow!("llm.model required for OpenAI provider"))?;

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            model,
            temperature: config.temperature,
            max_tokens: config.max_tokens,
            max_retries: config.max_retries,
        })
    }
}

#[async_trait]
impl TextGenerator for OpenAiGenerator {
    fn model_name(&self) -> &str {
        &self.model
    }

    async fn generate(&self, system_prompt: &str, user_prompt: &str) -> Result<String> {
        let url = format!("{}/chat/completions", self.base_url);
        let body = serde_json::json!({
            "model": self.model,
            "temperature": self.temperature,
            "max_tokens": self.max_tokens,
            "messages": [
                { "role": "system", "content": system_prompt },
                { "role": "user", "content": user_prompt },
            ],
        });

        let mut last_err = None;

        for attempt in 0..=self.max_retries {
            if attempt > 0 {
                // Exponential backoff: 1s, 2s, 4s, 8s, ...
                let delay = Duration::from_secs(1 << (attempt - 1).min(5));
                tracing::warn!(attempt, ?delay, "retrying chat completion");
                tokio::time::sleep(delay).await;
            }

            let resp = self
                .client
                .post(&url)
                .bearer_auth(&self.api_key)
                .json(&body)
                .send()
                .await;

            match resp {
                Ok(response) => {
                    let status = response.status();

                    if status.is_success() {
                        let json: serde_json::Value = response.json().await?;
                        return parse_chat_response(&json);
                    }

                    // Rate limited or server error: retry
                    if status.as_u16() == 429 || status.is_server_error() {
                        let body_text = response.text().await.unwrap_or_default();
                        last_err = Some(anyhow!("LLM API error {}: {}", status, body_text));
                        continue;
                    }

                    // Client error (not 429): fail now
                    let body_text = response.text().await.unwrap_or_default();
                    bail!("LLM API error {}: {}", status, body_text);
                }
                Err(e) => {
                    last_err = Some(e.into());
                    continue;
                }
            }
        }

        Err(last_err.unwrap_or_else(|| anyhow!("chat completion failed after retries")))
    }
}

/// Extract `choices[0].message.content` from a chat-completions response.
fn parse_chat_response(json: &serde_json::Value) -> Result<String> {
    json.pointer("/choices/0/message/content")
        .and_then(|c| c.as_str())
        .map(|c| c.trim().to_string())
        .ok_or_else(|| anyhow!("Invalid chat completion response: missing choices[0].message.content"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn source(title: &str, content: &str) -> Source {
        Source {
            document_id: "d1".to_string(),
            document_title: title.to_string(),
            chunk_id: "c1".to_string(),
            content: content.to_string(),
            start: 0,
            end: content.chars().count(),
            confidence: 0.5,
        }
    }

    #[test]
    fn context_numbers_sources_from_one() {
        let ctx = build_context(&[source("Policy", "Data is encrypted."), source("FAQ", "Ask us.")]);
        assert_eq!(
            ctx,
            "[Source 1] Policy: Data is encrypted.\n\n[Source 2] FAQ: Ask us."
        );
    }

    #[test]
    fn user_prompt_ends_with_question() {
        let prompt = build_user_prompt("  What is encrypted? ", &[source("Policy", "Data.")]);
        assert!(prompt.starts_with("Sources:\n[Source 1] Policy: Data."));
        assert!(prompt.ends_with("Question: What is encrypted?"));
    }

    #[test]
    fn parses_chat_completion() {
        let json = serde_json::json!({
            "choices": [{ "message": { "role": "assistant", "content": " Encrypted. [Source 1]\n" } }]
        });
        assert_eq!(parse_chat_response(&json).unwrap(), "Encrypted. [Source 1]");
    }

    #[test]
    fn rejects_malformed_response() {
        assert!(parse_chat_response(&serde_json::json!({ "choices": [] })).is_err());
    }

    #[tokio::test]
    async fn disabled_generator_fails() {
        let generator = create_generator(&LlmConfig::default()).unwrap();
        assert_eq!(generator.model_name(), "disabled");
        assert!(generator.generate("s", "u").await.is_err());
    }
}
