//! Messaging gateway — delivers follow-up text back into chat groups.
//!
//! The engine never retries a failed send itself: the ticket stays stale and
//! the next sweep naturally picks it up again.

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;

use crate::error::GatewayError;

/// Receipt for a delivered message.
#[derive(Debug, Clone)]
pub struct SendReceipt {
    pub message_id: Option<String>,
}

/// Outbound messaging seam. Implementations are pure I/O.
#[async_trait]
pub trait MessageGateway: Send + Sync {
    /// Deliver `text` to the group identified by `channel_ref`.
    async fn send(
        &self,
        channel_ref: &str,
        text: &str,
        ticket_id: &str,
    ) -> Result<SendReceipt, GatewayError>;
}

/// HTTP gateway client (JSON POST to the messaging service).
pub struct HttpMessageGateway {
    client: reqwest::Client,
    base_url: String,
    token: SecretString,
}

#[derive(Debug, Deserialize)]
struct SendResponse {
    #[serde(default)]
    message_id: Option<String>,
}

impl HttpMessageGateway {
    pub fn new(base_url: impl Into<String>, token: SecretString) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            token,
        }
    }
}

#[async_trait]
impl MessageGateway for HttpMessageGateway {
    async fn send(
        &self,
        channel_ref: &str,
        text: &str,
        ticket_id: &str,
    ) -> Result<SendReceipt, GatewayError> {
        let body = serde_json::json!({
            "channel_ref": channel_ref,
            "text": text,
            "ticket_id": ticket_id,
        });

        let resp = self
            .client
            .post(format!("{}/messages", self.base_url))
            .bearer_auth(self.token.expose_secret())
            .json(&body)
            .send()
            .await
            .map_err(|e| GatewayError::SendFailed {
                channel_ref: channel_ref.to_string(),
                reason: e.to_string(),
            })?;

        if !resp.status().is_success() {
            let status = resp.status();
            let detail = resp.text().await.unwrap_or_default();
            return Err(GatewayError::SendFailed {
                channel_ref: channel_ref.to_string(),
                reason: format!("{status}: {detail}"),
            });
        }

        let parsed: SendResponse = resp.json().await.unwrap_or(SendResponse {
            message_id: None,
        });
        tracing::debug!(channel_ref = %channel_ref, ticket_id = %ticket_id, "Follow-up delivered");
        Ok(SendReceipt {
            message_id: parsed.message_id,
        })
    }
}
