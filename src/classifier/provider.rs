//! Completion provider seam for the classification service.
//!
//! The classifier talks to any OpenAI-compatible chat-completions endpoint.
//! `CompletionProvider` is the trait boundary; tests swap in mocks.

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;

use crate::config::ClassifierConfig;
use crate::error::ClassifierError;

/// Max tokens for a classification call (kept tight — runs on every message).
const CLASSIFY_MAX_TOKENS: u32 = 512;

/// Temperature for classification (deterministic-ish).
const CLASSIFY_TEMPERATURE: f32 = 0.1;

/// Abstraction over the external NLP completion service.
#[async_trait]
pub trait CompletionProvider: Send + Sync {
    /// Model identifier, for logging.
    fn model_name(&self) -> &str;

    /// Run one system+user completion and return the raw text content.
    async fn complete(
        &self,
        system_prompt: &str,
        user_prompt: &str,
    ) -> Result<String, ClassifierError>;
}

/// HTTP provider for OpenAI-compatible chat-completions endpoints.
pub struct HttpCompletionProvider {
    client: reqwest::Client,
    base_url: String,
    api_key: SecretString,
    model: String,
    timeout: std::time::Duration,
}

impl HttpCompletionProvider {
    /// Create a provider. The configured timeout is baked into the HTTP
    /// client, so a hung service cannot stall a classification call.
    pub fn new(
        base_url: impl Into<String>,
        api_key: SecretString,
        model: impl Into<String>,
        config: &ClassifierConfig,
    ) -> Result<Self, ClassifierError> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| ClassifierError::RequestFailed(e.to_string()))?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key,
            model: model.into(),
            timeout: config.timeout,
        })
    }
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChatChoiceMessage {
    content: Option<String>,
}

#[async_trait]
impl CompletionProvider for HttpCompletionProvider {
    fn model_name(&self) -> &str {
        &self.model
    }

    async fn complete(
        &self,
        system_prompt: &str,
        user_prompt: &str,
    ) -> Result<String, ClassifierError> {
        let body = serde_json::json!({
            "model": self.model,
            "messages": [
                { "role": "system", "content": system_prompt },
                { "role": "user", "content": user_prompt },
            ],
            "temperature": CLASSIFY_TEMPERATURE,
            "max_tokens": CLASSIFY_MAX_TOKENS,
        });

        let resp = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(self.api_key.expose_secret())
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    ClassifierError::Timeout(self.timeout)
                } else {
                    ClassifierError::RequestFailed(e.to_string())
                }
            })?;

        if !resp.status().is_success() {
            let status = resp.status();
            let detail = resp.text().await.unwrap_or_default();
            return Err(ClassifierError::RequestFailed(format!(
                "{status}: {detail}"
            )));
        }

        let parsed: ChatCompletionResponse = resp
            .json()
            .await
            .map_err(|e| ClassifierError::InvalidResponse(e.to_string()))?;

        parsed
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .ok_or_else(|| {
                ClassifierError::InvalidResponse("response contained no choices".into())
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn provider_constructs_and_strips_trailing_slash() {
        let provider = HttpCompletionProvider::new(
            "https://api.example.com/v1/",
            SecretString::from("test-key"),
            "gpt-4o-mini",
            &ClassifierConfig::default(),
        )
        .unwrap();
        assert_eq!(provider.model_name(), "gpt-4o-mini");
        assert_eq!(provider.base_url, "https://api.example.com/v1");
    }
}
