//! Read-only client for the storefront catalog.
//!
//! The commerce platform owns the product data; this crate only lists and
//! fetches it. [`CatalogApi`] is the seam the conversation handler talks
//! through, [`RestCatalog`] is the reqwest implementation against the
//! Admin REST API.

use async_trait::async_trait;
use reqwest::{Client, StatusCode, Url};
use serde::Deserialize;
use thiserror::Error;

/// External product entity, read-only from this system's perspective.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct Product {
    pub id: u64,
    pub title: String,
    #[serde(default)]
    pub tags: String,
    #[serde(default)]
    pub body_html: String,
    #[serde(default)]
    pub image: Option<ProductImage>,
    #[serde(default)]
    pub options: Vec<ProductOption>,
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct ProductImage {
    pub src: String,
}

/// Named option/value set, e.g. `Size: S, M, L`.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct ProductOption {
    pub name: String,
    #[serde(default)]
    pub values: Vec<String>,
}

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("catalog transport error: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("catalog responded {status}: {body}")]
    Status { status: StatusCode, body: String },
    #[error("product {id} not found")]
    NotFound { id: u64 },
    #[error("catalog configuration error: {0}")]
    Config(String),
}

/// The two catalog operations the conversation consumes. Both are plain
/// network calls; no retries and no caching here.
#[async_trait]
pub trait CatalogApi: Send + Sync {
    /// Lists up to `limit` products in the catalog's own order.
    async fn list_products(&self, limit: u32) -> Result<Vec<Product>, CatalogError>;

    /// Fetches one product by id.
    async fn get_product(&self, id: u64) -> Result<Product, CatalogError>;
}

/// Admin REST API implementation, authenticated with the shop's API
/// key/password pair via HTTP basic auth.
pub struct RestCatalog {
    http: Client,
    base_url: Url,
    api_key: String,
    api_password: String,
}

#[derive(Deserialize)]
struct ProductListBody {
    #[serde(default)]
    products: Vec<Product>,
}

#[derive(Deserialize)]
struct ProductBody {
    product: Product,
}

impl RestCatalog {
    /// `base_url` is the versioned API root, e.g.
    /// `https://{shop}.myshopify.com/admin/api/2024-01/`.
    pub fn new(
        http: Client,
        base_url: &str,
        api_key: impl Into<String>,
        api_password: impl Into<String>,
    ) -> Result<Self, CatalogError> {
        let mut url =
            Url::parse(base_url).map_err(|err| CatalogError::Config(err.to_string()))?;
        if !base_url.ends_with('/') {
            url = url
                .join("./")
                .map_err(|err| CatalogError::Config(err.to_string()))?;
        }
        Ok(Self {
            http,
            base_url: url,
            api_key: api_key.into(),
            api_password: api_password.into(),
        })
    }

    /// Derives the canonical API root for a shop name.
    pub fn base_url_for_shop(shop_name: &str) -> String {
        format!("https://{shop_name}.myshopify.com/admin/api/2024-01/")
    }

    fn endpoint(&self, path: &str) -> Result<Url, CatalogError> {
        self.base_url
            .join(path)
            .map_err(|err| CatalogError::Config(err.to_string()))
    }

    async fn get_json<T: serde::de::DeserializeOwned>(
        &self,
        url: Url,
    ) -> Result<T, CatalogError> {
        let response = self
            .http
            .get(url)
            .basic_auth(&self.api_key, Some(&self.api_password))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(CatalogError::Status { status, body });
        }
        Ok(response.json().await?)
    }
}

#[async_trait]
impl CatalogApi for RestCatalog {
    async fn list_products(&self, limit: u32) -> Result<Vec<Product>, CatalogError> {
        let mut url = self.endpoint("products.json")?;
        url.query_pairs_mut()
            .append_pair("limit", &limit.to_string());
        let body: ProductListBody = self.get_json(url).await?;
        tracing::debug!(count = body.products.len(), limit, "listed products");
        Ok(body.products)
    }

    async fn get_product(&self, id: u64) -> Result<Product, CatalogError> {
        let url = self.endpoint(&format!("products/{id}.json"))?;
        match self.get_json::<ProductBody>(url).await {
            Ok(body) => Ok(body.product),
            Err(CatalogError::Status { status, .. }) if status == StatusCode::NOT_FOUND => {
                Err(CatalogError::NotFound { id })
            }
            Err(err) => Err(err),
        }
    }
}
