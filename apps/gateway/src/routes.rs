//! HTTP surface of the gateway.
//!
//! `POST /webhook` acknowledges the platform with a 200 as soon as the
//! envelope parses; per-event work runs in spawned tasks whose outcome is
//! logged, so slow catalog or send calls never eat into the platform's
//! response-time ceiling.

use std::sync::Arc;

use axum::{
    Router,
    body::Bytes,
    extract::{Query, State},
    http::{HeaderMap, StatusCode},
    response::{Html, IntoResponse, Response},
    routing::get,
};
use serde::Deserialize;

use shoplink_catalog::{CatalogApi, CatalogError};
use shoplink_core::WebhookEnvelope;
use shoplink_messenger::SendApi;

use crate::config::Config;
use crate::handler;
use crate::verify;

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub catalog: Arc<dyn CatalogApi>,
    pub sender: Arc<dyn SendApi>,
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/webhook", get(verify_subscription).post(receive))
        .route("/product_description", get(product_description))
        .route("/healthz", get(healthz))
}

#[derive(Deserialize)]
struct SubscriptionQs {
    #[serde(rename = "hub.mode")]
    mode: Option<String>,
    #[serde(rename = "hub.challenge")]
    challenge: Option<String>,
    #[serde(rename = "hub.verify_token")]
    token: Option<String>,
}

/// Webhook subscription handshake: echo the challenge iff mode and token
/// match exactly, 403 otherwise.
async fn verify_subscription(
    State(state): State<AppState>,
    Query(q): Query<SubscriptionQs>,
) -> impl IntoResponse {
    if q.mode.as_deref() == Some("subscribe")
        && q.token.as_deref() == Some(state.config.verify_token.as_str())
    {
        tracing::info!("validating webhook subscription");
        (StatusCode::OK, q.challenge.unwrap_or_default())
    } else {
        tracing::warn!("webhook subscription validation failed");
        (StatusCode::FORBIDDEN, "forbidden".to_string())
    }
}

async fn receive(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> StatusCode {
    // Signature over the raw bytes, before any parsing.
    if let Err(err) = verify::check(
        &state.config.app_secret,
        &headers,
        &body,
        state.config.allow_unsigned,
    ) {
        tracing::warn!(error = %err, "rejecting webhook callback");
        return StatusCode::UNAUTHORIZED;
    }

    let envelope: WebhookEnvelope = match serde_json::from_slice(&body) {
        Ok(envelope) => envelope,
        Err(err) => {
            tracing::warn!(error = %err, "failed to decode webhook envelope");
            return StatusCode::BAD_REQUEST;
        }
    };

    if envelope.object != "page" {
        tracing::debug!(object = %envelope.object, "ignoring non-page callback");
        return StatusCode::OK;
    }

    dispatch(&state, envelope);
    StatusCode::OK
}

/// Fans the batched envelope out to one handler task per inner event, in
/// array order. The ack does not wait on any of them; each task logs its
/// own failure.
fn dispatch(state: &AppState, envelope: WebhookEnvelope) {
    for entry in envelope.entry {
        for event in entry.messaging {
            tracing::debug!(
                page = %entry.id,
                sender = %event.sender.id,
                kind = ?event.kind(),
                "dispatching webhook event"
            );
            let state = state.clone();
            tokio::spawn(async move {
                if let Err(err) = handler::handle_event(&state, &event).await {
                    tracing::error!(
                        sender = %event.sender.id,
                        error = %err,
                        "reply could not be delivered"
                    );
                }
            });
        }
    }
}

#[derive(Deserialize)]
struct DescriptionQs {
    id: Option<String>,
}

/// Plain HTML view of a product description, used as the deep-link target
/// for the carousel's "View on site" button.
async fn product_description(
    State(state): State<AppState>,
    Query(q): Query<DescriptionQs>,
) -> Response {
    let id = match q.id.as_deref().and_then(|raw| raw.parse::<u64>().ok()) {
        Some(id) => id,
        None => {
            return (StatusCode::BAD_REQUEST, "missing or invalid product id").into_response();
        }
    };

    match state.catalog.get_product(id).await {
        Ok(product) => Html(product.body_html).into_response(),
        Err(CatalogError::NotFound { .. }) => {
            (StatusCode::NOT_FOUND, "product not found").into_response()
        }
        Err(err) => {
            tracing::error!(id, error = %err, "product description lookup failed");
            (StatusCode::BAD_GATEWAY, "catalog unavailable").into_response()
        }
    }
}

async fn healthz() -> impl IntoResponse {
    StatusCode::NO_CONTENT
}


#[cfg(test)]
mod tests {
    use super::test_support::{FailingCatalog, StaticCatalog, state_with};
    use super::*;
    use axum::body::Body;
    use axum::http::Request;
    use http_body_util::BodyExt;
    use tower::ServiceExt;

    fn app(state: AppState) -> Router {
        router().with_state(state)
    }

    async fn body_string(response: Response) -> String {
        let bytes = response
            .into_body()
            .collect()
            .await
            .expect("collect")
            .to_bytes();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    #[tokio::test]
    async fn subscription_echoes_challenge_on_exact_match() {
        let (state, _) = state_with(Arc::new(StaticCatalog::with_products(0)));
        let response = app(state)
            .oneshot(
                Request::builder()
                    .uri("/webhook?hub.mode=subscribe&hub.verify_token=tok&hub.challenge=1158201444")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_string(response).await, "1158201444");
    }

    #[tokio::test]
    async fn subscription_rejects_any_mismatch() {
        for uri in [
            "/webhook?hub.mode=subscribe&hub.verify_token=wrong&hub.challenge=1",
            "/webhook?hub.mode=unsubscribe&hub.verify_token=tok&hub.challenge=1",
            "/webhook",
        ] {
            let (state, _) = state_with(Arc::new(StaticCatalog::with_products(0)));
            let response = app(state)
                .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
                .await
                .unwrap();
            assert_eq!(response.status(), StatusCode::FORBIDDEN, "{uri}");
        }
    }

    fn signed_post(body: &str, secret: &str) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri("/webhook")
            .header("content-type", "application/json")
            .header(
                crate::verify::SIGNATURE_HEADER,
                crate::verify::sign(secret, body.as_bytes()),
            )
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    #[tokio::test]
    async fn post_with_valid_signature_acks_200() {
        let (state, _) = state_with(Arc::new(StaticCatalog::with_products(0)));
        let body = r#"{"object":"page","entry":[]}"#;
        let response = app(state)
            .oneshot(signed_post(body, "s3cret"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn post_with_bad_signature_is_unauthorized() {
        let (state, _) = state_with(Arc::new(StaticCatalog::with_products(0)));
        let body = r#"{"object":"page","entry":[]}"#;
        let response = app(state)
            .oneshot(signed_post(body, "wrong-secret"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn post_without_signature_is_unauthorized_by_default() {
        let (state, _) = state_with(Arc::new(StaticCatalog::with_products(0)));
        let response = app(state)
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/webhook")
                    .header("content-type", "application/json")
                    .body(Body::from(r#"{"object":"page","entry":[]}"#))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn post_with_unparseable_body_is_bad_request() {
        let (state, _) = state_with(Arc::new(StaticCatalog::with_products(0)));
        let response = app(state)
            .oneshot(signed_post("not json", "s3cret"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn non_page_object_is_acked_and_skipped() {
        let (state, sender) = state_with(Arc::new(StaticCatalog::with_products(1)));
        let body = r#"{"object":"instagram","entry":[]}"#;
        let response = app(state)
            .oneshot(signed_post(body, "s3cret"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert!(sender.sent().is_empty());
    }

    #[tokio::test]
    async fn product_description_serves_html_body() {
        let (state, _) = state_with(Arc::new(StaticCatalog::with_products(1)));
        let response = app(state)
            .oneshot(
                Request::builder()
                    .uri("/product_description?id=1")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_string(response).await, "d".repeat(1000));
    }

    #[tokio::test]
    async fn product_description_requires_an_id() {
        for uri in ["/product_description", "/product_description?id=shirt"] {
            let (state, _) = state_with(Arc::new(StaticCatalog::with_products(1)));
            let response = app(state)
                .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
                .await
                .unwrap();
            assert_eq!(response.status(), StatusCode::BAD_REQUEST, "{uri}");
        }
    }

    #[tokio::test]
    async fn product_description_maps_not_found() {
        let (state, _) = state_with(Arc::new(StaticCatalog::with_products(1)));
        let response = app(state)
            .oneshot(
                Request::builder()
                    .uri("/product_description?id=999")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn product_description_maps_catalog_outage_to_bad_gateway() {
        let (state, _) = state_with(Arc::new(FailingCatalog));
        let response = app(state)
            .oneshot(
                Request::builder()
                    .uri("/product_description?id=1")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
    }

    /// Polls the recording sender until `count` replies arrived; the ack
    /// has already been returned by then, so this observes the spawned
    /// handler tasks finishing behind it.
    async fn await_sent(
        sender: &test_support::RecordingSender,
        count: usize,
    ) -> Vec<shoplink_core::OutboundMessage> {
        for _ in 0..200 {
            let sent = sender.sent();
            if sent.len() >= count {
                return sent;
            }
            tokio::time::sleep(std::time::Duration::from_millis(5)).await;
        }
        panic!("timed out waiting for {count} outbound messages");
    }

    #[tokio::test]
    async fn help_message_flows_to_one_button_template_after_ack() {
        let (state, sender) = state_with(Arc::new(StaticCatalog::with_products(3)));
        let body = serde_json::json!({
            "object": "page",
            "entry": [{
                "id": "1812",
                "time": 1_700_000_000_i64,
                "messaging": [{
                    "sender": {"id": "4242"},
                    "recipient": {"id": "1812"},
                    "timestamp": 1_700_000_001_i64,
                    "message": {"mid": "m.1", "text": "Help"}
                }]
            }]
        })
        .to_string();

        let response = app(state)
            .oneshot(signed_post(&body, "s3cret"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let sent = await_sent(&sender, 1).await;
        assert_eq!(sent.len(), 1);
        assert!(matches!(
            sent[0].body,
            shoplink_core::MessageBody::ButtonTemplate { .. }
        ));
        assert_eq!(sent[0].recipient_id, "4242");
    }

    #[tokio::test]
    async fn batched_entries_each_get_a_reply() {
        let (state, sender) = state_with(Arc::new(StaticCatalog::with_products(3)));
        let event = |text: &str| {
            serde_json::json!({
                "sender": {"id": "4242"},
                "recipient": {"id": "1812"},
                "message": {"text": text}
            })
        };
        let body = serde_json::json!({
            "object": "page",
            "entry": [
                {"id": "1812", "time": 0, "messaging": [event("first"), event("second")]},
                {"id": "1813", "time": 0, "messaging": [event("third")]}
            ]
        })
        .to_string();

        let response = app(state)
            .oneshot(signed_post(&body, "s3cret"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let sent = await_sent(&sender, 3).await;
        let mut texts: Vec<String> = sent
            .iter()
            .map(|msg| match &msg.body {
                shoplink_core::MessageBody::Text { text, .. } => text.clone(),
                other => panic!("expected echo, got {other:?}"),
            })
            .collect();
        texts.sort();
        assert_eq!(texts, vec!["first", "second", "third"]);
    }

    #[tokio::test]
    async fn healthz_is_no_content() {
        let (state, _) = state_with(Arc::new(StaticCatalog::with_products(0)));
        let response = app(state)
            .oneshot(
                Request::builder()
                    .uri("/healthz")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NO_CONTENT);
    }
}
