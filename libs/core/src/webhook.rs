use serde::{Deserialize, Serialize};

/// Batched callback envelope POSTed by the Messenger platform.
///
/// The platform may coalesce several page entries, each carrying several
/// messaging events, into a single HTTP call. Events must be handled in
/// array order.
///
/// ```
/// use shoplink_core::WebhookEnvelope;
///
/// let env: WebhookEnvelope = serde_json::from_str(
///     r#"{"object":"page","entry":[{"id":"99","time":1700000000,"messaging":[]}]}"#,
/// )
/// .unwrap();
/// assert_eq!(env.object, "page");
/// assert_eq!(env.entry.len(), 1);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct WebhookEnvelope {
    pub object: String,
    #[serde(default)]
    pub entry: Vec<Entry>,
}

/// One page's slice of a batched callback.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Entry {
    pub id: String,
    pub time: i64,
    #[serde(default)]
    pub messaging: Vec<MessagingEvent>,
}

/// Sender or recipient reference (a user id or a page id).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Principal {
    pub id: String,
}

/// A single messaging event. At most one of `message`, `delivery`, or
/// `postback` is populated; which one decides the [`EventKind`].
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MessagingEvent {
    pub sender: Principal,
    pub recipient: Principal,
    #[serde(default)]
    pub timestamp: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<InboundMessage>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub delivery: Option<Delivery>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub postback: Option<Postback>,
}

/// Message body of a [`EventKind::Message`] event.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct InboundMessage {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mid: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quick_reply: Option<QuickReplyResponse>,
}

/// The tapped quick reply attached to an inbound message.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct QuickReplyResponse {
    pub payload: String,
}

/// Structured button tap carrying a developer-defined payload string.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Postback {
    pub payload: String,
}

/// Delivery confirmation; `watermark` marks the timestamp before which all
/// messages have been delivered.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Delivery {
    #[serde(default)]
    pub mids: Vec<String>,
    pub watermark: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seq: Option<i64>,
}

/// Classified shape of a [`MessagingEvent`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    Message,
    Delivery,
    Postback,
    Unsupported,
}

impl MessagingEvent {
    /// Classifies the event in fixed priority order: message, then delivery
    /// receipt, then postback. Anything else is [`EventKind::Unsupported`]
    /// and gets logged and skipped by the dispatcher, never treated as an
    /// error.
    pub fn kind(&self) -> EventKind {
        if self.message.is_some() {
            EventKind::Message
        } else if self.delivery.is_some() {
            EventKind::Delivery
        } else if self.postback.is_some() {
            EventKind::Postback
        } else {
            EventKind::Unsupported
        }
    }
}
