//! Messenger Send API client.
//!
//! Replies are fire-and-forget from the conversation handler's point of
//! view: the webhook ack has already gone out, so send failures are logged
//! by the caller and never retried or surfaced upstream.

use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;

use shoplink_core::{ActionPayload, OutboundMessage};

#[derive(Debug, Error)]
pub enum SendError {
    #[error("send transport error: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("send api responded {status}: {body}")]
    Status {
        status: reqwest::StatusCode,
        body: String,
    },
}

/// What the platform returns for an accepted message.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SendReceipt {
    pub message_id: Option<String>,
    pub recipient_id: Option<String>,
}

/// Seam between the conversation handler and the platform's send endpoint.
#[async_trait]
pub trait SendApi: Send + Sync {
    async fn send(&self, msg: &OutboundMessage) -> Result<SendReceipt, SendError>;
}

/// Graph API implementation. The page access token is carried as a query
/// parameter, which is the platform's contract for this endpoint.
pub struct MessengerSender {
    http: reqwest::Client,
    api_base: String,
    page_token: String,
}

impl MessengerSender {
    pub fn new(
        http: reqwest::Client,
        api_base: Option<String>,
        page_token: impl Into<String>,
    ) -> Self {
        let base = api_base.unwrap_or_else(|| "https://graph.facebook.com/v2.6".into());
        Self {
            http,
            api_base: base.trim_end_matches('/').to_string(),
            page_token: page_token.into(),
        }
    }

    pub fn api_base(&self) -> &str {
        &self.api_base
    }

    fn build_url(&self, path: &str) -> String {
        format!(
            "{}/{}?access_token={}",
            self.api_base,
            path,
            urlencoding::encode(&self.page_token)
        )
    }

    async fn post_json(&self, path: &str, payload: &Value) -> Result<Value, SendError> {
        let response = self
            .http
            .post(self.build_url(path))
            .json(payload)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(SendError::Status { status, body });
        }
        Ok(response.json().await.unwrap_or(Value::Null))
    }

    /// Request body for the messenger-profile setup: greeting text plus
    /// the "get started" postback, which carries [`ActionPayload::GetStarted`]
    /// so a brand new conversation opens on the root menu.
    pub fn profile_payload(greeting: &str) -> Value {
        serde_json::json!({
            "get_started": {
                "payload": ActionPayload::GetStarted.to_payload(),
            },
            "greeting": [
                { "locale": "default", "text": greeting }
            ]
        })
    }

    /// One-shot messenger-profile setup.
    pub async fn ensure_profile(&self, greeting: &str) -> Result<(), SendError> {
        let payload = Self::profile_payload(greeting);

        if self.api_base.starts_with("mock://") {
            return Ok(());
        }

        self.post_json("me/messenger_profile", &payload).await?;
        tracing::info!("messenger profile configured");
        Ok(())
    }
}

#[async_trait]
impl SendApi for MessengerSender {
    async fn send(&self, msg: &OutboundMessage) -> Result<SendReceipt, SendError> {
        let payload = msg.to_send_payload();

        if self.api_base.starts_with("mock://") {
            return Ok(SendReceipt {
                message_id: Some(format!("mock:{}", msg.recipient_id)),
                recipient_id: Some(msg.recipient_id.clone()),
            });
        }

        let raw = self.post_json("me/messages", &payload).await?;
        let receipt = SendReceipt {
            message_id: raw
                .get("message_id")
                .and_then(|v| v.as_str())
                .map(str::to_string),
            recipient_id: raw
                .get("recipient_id")
                .and_then(|v| v.as_str())
                .map(str::to_string),
        };
        tracing::debug!(
            recipient = %msg.recipient_id,
            message_id = receipt.message_id.as_deref().unwrap_or("n/a"),
            "send api call succeeded"
        );
        Ok(receipt)
    }
}
