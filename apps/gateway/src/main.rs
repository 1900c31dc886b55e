//! Shoplink gateway: relays Messenger webhook callbacks to the storefront
//! catalog and replies with product templates.
//!
//! ```text
//! Messenger POSTs /webhook; verified events are handled off the request
//! path and replies go back out through the Send API.
//! ```

use std::sync::Arc;

use anyhow::{Context, Result};

use shoplink_catalog::RestCatalog;
use shoplink_messenger::MessengerSender;

mod config;
mod handler;
mod routes;
mod verify;

use config::Config;
use routes::AppState;

const GREETING: &str = "Hi {{user_first_name}}! Send \"help\" to browse our products.";

#[tokio::main]
async fn main() -> Result<()> {
    shoplink_telemetry::install("shoplink-gateway")?;
    let config = Config::from_env()?;

    let http = reqwest::Client::new();
    let catalog = RestCatalog::new(
        http.clone(),
        &config.shop_api_base,
        &config.shop_api_key,
        &config.shop_api_password,
    )
    .context("catalog client setup")?;
    let sender = MessengerSender::new(
        http,
        Some(config.graph_api_base.clone()),
        &config.page_token,
    );

    // Best effort: a broken profile still leaves the webhook usable.
    if let Err(err) = sender.ensure_profile(GREETING).await {
        tracing::warn!(error = %err, "messenger profile setup failed, continuing");
    }

    let state = AppState {
        config: Arc::new(config),
        catalog: Arc::new(catalog),
        sender: Arc::new(sender),
    };

    let addr: std::net::SocketAddr = state
        .config
        .bind
        .parse()
        .with_context(|| format!("invalid BIND address {}", state.config.bind))?;
    let app = routes::router().with_state(state);

    tracing::info!("shoplink-gateway listening on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app.into_make_service()).await?;
    Ok(())
}
