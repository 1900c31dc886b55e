use anyhow::{Context, Result};

use shoplink_catalog::RestCatalog;

/// Immutable process configuration, read once at startup and passed by
/// reference into each component. Missing required values abort startup.
#[derive(Debug, Clone)]
pub struct Config {
    /// Shared app secret used to verify webhook signatures.
    pub app_secret: String,
    /// Pre-shared token echoed back during webhook subscription.
    pub verify_token: String,
    /// Page access token for the Send API.
    pub page_token: String,
    pub shop_api_key: String,
    pub shop_api_password: String,
    /// Versioned root of the catalog API.
    pub shop_api_base: String,
    /// Graph API root for outbound sends.
    pub graph_api_base: String,
    /// Public host URL used to build deep links back into this service.
    pub public_base_url: String,
    pub bind: String,
    /// Dev-mode lenience: accept webhook calls without a signature header.
    /// Off by default; a missing signature is then rejected like a mismatch.
    pub allow_unsigned: bool,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Builds the config from any name → value source. Keeps tests away
    /// from process-global environment mutation.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let required = |name: &str| {
            lookup(name)
                .filter(|value| !value.is_empty())
                .with_context(|| format!("missing config value {name}"))
        };

        let shop_name = required("SHOP_NAME")?;
        let shop_api_base = lookup("SHOP_API_BASE")
            .unwrap_or_else(|| RestCatalog::base_url_for_shop(&shop_name));

        Ok(Self {
            app_secret: required("APP_SECRET")?,
            verify_token: required("VERIFY_TOKEN")?,
            page_token: required("PAGE_ACCESS_TOKEN")?,
            shop_api_key: required("SHOP_API_KEY")?,
            shop_api_password: required("SHOP_API_PASSWORD")?,
            shop_api_base,
            graph_api_base: lookup("GRAPH_API_BASE")
                .unwrap_or_else(|| "https://graph.facebook.com/v2.6".into()),
            public_base_url: required("PUBLIC_BASE_URL")?
                .trim_end_matches('/')
                .to_string(),
            bind: lookup("BIND").unwrap_or_else(|| "0.0.0.0:8080".into()),
            allow_unsigned: lookup("ALLOW_UNSIGNED")
                .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
                .unwrap_or(false),
        })
    }
}
