use std::borrow::Cow;

use serde_json::{Value, json};

use crate::action::ActionPayload;

/// Maximum character count the platform accepts for one message text.
pub const MESSAGE_CHAR_LIMIT: usize = 640;

/// A reply addressed to one recipient, constructed per request and never
/// persisted.
#[derive(Debug, Clone, PartialEq)]
pub struct OutboundMessage {
    pub recipient_id: String,
    pub body: MessageBody,
}

/// The three reply shapes the conversation handler produces.
#[derive(Debug, Clone, PartialEq)]
pub enum MessageBody {
    /// Plain text, optionally with tappable quick replies underneath.
    Text {
        text: String,
        quick_replies: Vec<QuickReply>,
    },
    /// Button template: a prompt plus up to three buttons.
    ButtonTemplate {
        text: String,
        buttons: Vec<Button>,
    },
    /// Generic template: a horizontally scrollable carousel. An empty
    /// carousel is legal.
    GenericTemplate { elements: Vec<Element> },
}

#[derive(Debug, Clone, PartialEq)]
pub enum Button {
    Postback {
        title: String,
        action: ActionPayload,
    },
    WebUrl {
        title: String,
        url: String,
    },
}

/// One-tap suggested response rendered inline with a message.
#[derive(Debug, Clone, PartialEq)]
pub struct QuickReply {
    pub title: String,
    pub action: ActionPayload,
}

/// One card of a generic template.
#[derive(Debug, Clone, PartialEq)]
pub struct Element {
    pub title: String,
    pub subtitle: String,
    pub image_url: Option<String>,
    pub buttons: Vec<Button>,
}

impl OutboundMessage {
    pub fn text(recipient_id: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            recipient_id: recipient_id.into(),
            body: MessageBody::Text {
                text: text.into(),
                quick_replies: Vec::new(),
            },
        }
    }

    /// Renders the Send API request body for this message.
    pub fn to_send_payload(&self) -> Value {
        json!({
            "recipient": { "id": self.recipient_id },
            "message": self.body.to_message_value(),
        })
    }
}

impl MessageBody {
    fn to_message_value(&self) -> Value {
        match self {
            MessageBody::Text {
                text,
                quick_replies,
            } => {
                let mut message = json!({ "text": text });
                if !quick_replies.is_empty() {
                    message["quick_replies"] = quick_replies
                        .iter()
                        .map(QuickReply::to_value)
                        .collect::<Vec<_>>()
                        .into();
                }
                message
            }
            MessageBody::ButtonTemplate { text, buttons } => json!({
                "attachment": {
                    "type": "template",
                    "payload": {
                        "template_type": "button",
                        "text": text,
                        "buttons": buttons.iter().map(Button::to_value).collect::<Vec<_>>(),
                    }
                }
            }),
            MessageBody::GenericTemplate { elements } => json!({
                "attachment": {
                    "type": "template",
                    "payload": {
                        "template_type": "generic",
                        "elements": elements.iter().map(Element::to_value).collect::<Vec<_>>(),
                    }
                }
            }),
        }
    }
}

impl Button {
    fn to_value(&self) -> Value {
        match self {
            Button::Postback { title, action } => json!({
                "type": "postback",
                "title": title,
                "payload": action.to_payload(),
            }),
            Button::WebUrl { title, url } => json!({
                "type": "web_url",
                "title": title,
                "url": url,
            }),
        }
    }
}

impl QuickReply {
    fn to_value(&self) -> Value {
        json!({
            "content_type": "text",
            "title": self.title,
            "payload": self.action.to_payload(),
        })
    }
}

impl Element {
    fn to_value(&self) -> Value {
        let mut element = json!({
            "title": self.title,
            "subtitle": self.subtitle,
            "buttons": self.buttons.iter().map(Button::to_value).collect::<Vec<_>>(),
        });
        if let Some(src) = &self.image_url {
            element["image_url"] = json!(src);
        }
        element
    }
}

/// Cuts `text` to at most [`MESSAGE_CHAR_LIMIT`] characters, respecting char
/// boundaries. Shorter input is returned borrowed and unmodified.
///
/// ```
/// use shoplink_core::{MESSAGE_CHAR_LIMIT, truncate_message};
///
/// let long = "x".repeat(1000);
/// assert_eq!(truncate_message(&long).chars().count(), MESSAGE_CHAR_LIMIT);
/// assert_eq!(truncate_message("short"), "short");
/// ```
pub fn truncate_message(text: &str) -> Cow<'_, str> {
    match text.char_indices().nth(MESSAGE_CHAR_LIMIT) {
        Some((cut, _)) => Cow::Owned(text[..cut].to_string()),
        None => Cow::Borrowed(text),
    }
}
