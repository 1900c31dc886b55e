//! Conversation handler: one classified inbound event in, at most one
//! outbound reply out.
//!
//! The menu has two levels. "help" (or the get-started postback) opens the
//! root button template; postbacks and quick replies carry an
//! [`ActionPayload`] into a branch, and every branch reply offers a quick
//! reply back to the product list so the conversation can loop. Any other
//! text is echoed verbatim, bounded to the platform's character limit.

use shoplink_catalog::{CatalogError, Product};
use shoplink_core::{
    ActionPayload, Button, Element, MessageBody, MessagingEvent, OutboundMessage, QuickReply,
    truncate_message,
};
use shoplink_messenger::SendError;

use crate::routes::AppState;

const PRODUCT_LIST_LIMIT: u32 = 3;
const HELP_KEYWORD: &str = "help";
const FALLBACK_TEXT: &str =
    "Sorry, our product catalog is currently unavailable. Please try again in a moment.";

/// Entry point for one messaging event. Catalog failures are absorbed here
/// (fallback reply); send failures bubble up so the dispatcher task can log
/// them.
pub async fn handle_event(state: &AppState, event: &MessagingEvent) -> Result<(), SendError> {
    let sender_id = event.sender.id.as_str();
    // Same priority order as EventKind: message, delivery, postback.
    if let Some(message) = &event.message {
        if let Some(quick_reply) = &message.quick_reply {
            return handle_action(state, sender_id, &quick_reply.payload).await;
        }
        match message.text.as_deref() {
            Some(text) if !text.trim().is_empty() => handle_text(state, sender_id, text).await,
            _ => {
                tracing::debug!(sender = sender_id, "message without text, skipping");
                Ok(())
            }
        }
    } else if let Some(delivery) = &event.delivery {
        tracing::debug!(
            sender = sender_id,
            watermark = delivery.watermark,
            delivered = delivery.mids.len(),
            "delivery receipt"
        );
        Ok(())
    } else if let Some(postback) = &event.postback {
        handle_action(state, sender_id, &postback.payload).await
    } else {
        tracing::info!(sender = sender_id, "unsupported event shape, ignoring");
        Ok(())
    }
}

async fn handle_text(state: &AppState, sender_id: &str, text: &str) -> Result<(), SendError> {
    if text.trim().eq_ignore_ascii_case(HELP_KEYWORD) {
        return send_root_menu(state, sender_id).await;
    }
    // No keyword matched: echo it back, bounded to the platform limit.
    let reply = OutboundMessage::text(sender_id, truncate_message(text).into_owned());
    state.sender.send(&reply).await.map(drop)
}

async fn send_root_menu(state: &AppState, sender_id: &str) -> Result<(), SendError> {
    let menu = OutboundMessage {
        recipient_id: sender_id.to_string(),
        body: MessageBody::ButtonTemplate {
            text: format!(
                "Tap the button below to see {PRODUCT_LIST_LIMIT} of our products."
            ),
            buttons: vec![Button::Postback {
                title: format!("Get {PRODUCT_LIST_LIMIT} products"),
                action: ActionPayload::ProductList {
                    limit: PRODUCT_LIST_LIMIT,
                },
            }],
        },
    };
    state.sender.send(&menu).await.map(drop)
}

async fn handle_action(state: &AppState, sender_id: &str, raw: &str) -> Result<(), SendError> {
    let action = match ActionPayload::parse(raw) {
        Ok(action) => action,
        Err(err) => {
            tracing::warn!(sender = sender_id, payload = raw, error = %err, "rejecting unknown action payload");
            return Ok(());
        }
    };

    match action {
        // A brand new conversation: the get-started tap opens the root
        // menu, exactly like the "help" keyword.
        ActionPayload::GetStarted => send_root_menu(state, sender_id).await,
        ActionPayload::ProductList { limit } => match state.catalog.list_products(limit).await {
            Ok(products) => {
                let reply = product_carousel(state, sender_id, &products);
                state.sender.send(&reply).await.map(drop)
            }
            Err(err) => send_fallback(state, sender_id, "list products", err).await,
        },
        ActionPayload::ProductDescription { id } => match state.catalog.get_product(id).await {
            Ok(product) => {
                let reply = text_with_back_link(sender_id, &product.body_html);
                state.sender.send(&reply).await.map(drop)
            }
            Err(err) => send_fallback(state, sender_id, "product description", err).await,
        },
        ActionPayload::ProductOptions { id } => match state.catalog.get_product(id).await {
            Ok(product) => {
                let reply = text_with_back_link(sender_id, &options_summary(&product));
                state.sender.send(&reply).await.map(drop)
            }
            Err(err) => send_fallback(state, sender_id, "product options", err).await,
        },
    }
}

fn product_carousel(state: &AppState, sender_id: &str, products: &[Product]) -> OutboundMessage {
    let elements = products
        .iter()
        .map(|product| Element {
            title: product.title.clone(),
            subtitle: product.tags.clone(),
            image_url: product.image.as_ref().map(|image| image.src.clone()),
            buttons: vec![
                Button::Postback {
                    title: "Read description".into(),
                    action: ActionPayload::ProductDescription { id: product.id },
                },
                Button::Postback {
                    title: "View options".into(),
                    action: ActionPayload::ProductOptions { id: product.id },
                },
                Button::WebUrl {
                    title: "View on site".into(),
                    url: format!(
                        "{}/product_description?id={}",
                        state.config.public_base_url, product.id
                    ),
                },
            ],
        })
        .collect();

    OutboundMessage {
        recipient_id: sender_id.to_string(),
        body: MessageBody::GenericTemplate { elements },
    }
}

fn text_with_back_link(sender_id: &str, text: &str) -> OutboundMessage {
    OutboundMessage {
        recipient_id: sender_id.to_string(),
        body: MessageBody::Text {
            text: truncate_message(text).into_owned(),
            quick_replies: vec![QuickReply {
                title: format!("Get {PRODUCT_LIST_LIMIT} products"),
                action: ActionPayload::ProductList {
                    limit: PRODUCT_LIST_LIMIT,
                },
            }],
        },
    }
}

fn options_summary(product: &Product) -> String {
    if product.options.is_empty() {
        return format!("{} has no options.", product.title);
    }
    product
        .options
        .iter()
        .map(|option| format!("{}: {}", option.name, option.values.join(", ")))
        .collect::<Vec<_>>()
        .join("\n")
}

async fn send_fallback(
    state: &AppState,
    sender_id: &str,
    what: &str,
    err: CatalogError,
) -> Result<(), SendError> {
    tracing::warn!(sender = sender_id, error = %err, "catalog lookup failed for {what}, sending fallback");
    state
        .sender
        .send(&OutboundMessage::text(sender_id, FALLBACK_TEXT))
        .await
        .map(drop)
}
