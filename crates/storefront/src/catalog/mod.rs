//! WooCommerce REST catalog client.
//!
//! Reads products and categories from `{site}/wp-json/wc/{version}/`,
//! authenticating with the consumer key and secret as query parameters.
//! Responses other than searches are cached using `moka` (5-minute TTL).

mod types;

pub use types::{Category, CategoryQuery, CategoryRef, Product, ProductQuery};

use std::sync::Arc;
use std::time::Duration;

use kp_core::ProductId;
use moka::future::Cache;
use secrecy::ExposeSecret;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use thiserror::Error;
use tracing::{debug, instrument};

use crate::config::WooCommerceConfig;

/// Errors that can occur when calling the REST catalog.
#[derive(Debug, Error)]
pub enum CatalogError {
    /// HTTP request failed. The URL is stripped since it carries credentials.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The API answered with an error status.
    #[error("WooCommerce API error ({status}): {message}")]
    Api { status: u16, message: String },

    /// JSON parsing failed.
    #[error("JSON parse error: {0}")]
    Parse(#[from] serde_json::Error),

    /// Resource not found.
    #[error("Not found: {0}")]
    NotFound(String),
}

/// Error body returned by the WordPress REST API.
#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    #[serde(default)]
    message: Option<String>,
}

fn api_error(status: reqwest::StatusCode, body: &str) -> CatalogError {
    let message = serde_json::from_str::<ApiErrorBody>(body)
        .ok()
        .and_then(|b| b.message)
        .filter(|m| !m.is_empty())
        .unwrap_or_else(|| {
            status
                .canonical_reason()
                .unwrap_or("request failed")
                .to_string()
        });
    CatalogError::Api {
        status: status.as_u16(),
        message,
    }
}

#[derive(Debug, Clone, Hash, PartialEq, Eq)]
enum CacheKey {
    Products(ProductQuery),
    Product(ProductId),
    Categories(CategoryQuery),
}

#[derive(Debug, Clone)]
enum CacheValue {
    Products(Vec<Product>),
    Product(Box<Product>),
    Categories(Vec<Category>),
}

// =============================================================================
// CatalogClient
// =============================================================================

/// Client for the WooCommerce REST product API.
#[derive(Clone)]
pub struct CatalogClient {
    inner: Arc<CatalogClientInner>,
}

struct CatalogClientInner {
    client: reqwest::Client,
    base: String,
    consumer_key: String,
    consumer_secret: String,
    cache: Cache<CacheKey, CacheValue>,
}

impl std::fmt::Debug for CatalogClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CatalogClient")
            .field("base", &self.inner.base)
            .finish_non_exhaustive()
    }
}

impl CatalogClient {
    /// Create a new catalog client.
    #[must_use]
    pub fn new(config: &WooCommerceConfig) -> Self {
        let cache = Cache::builder()
            .max_capacity(500)
            .time_to_live(Duration::from_secs(300)) // 5 minutes
            .build();

        Self {
            inner: Arc::new(CatalogClientInner {
                client: reqwest::Client::new(),
                base: rest_base(config),
                consumer_key: config.consumer_key.expose_secret().to_string(),
                consumer_secret: config.consumer_secret.expose_secret().to_string(),
                cache,
            }),
        }
    }

    fn url(&self, endpoint: &str) -> String {
        format!("{}/{endpoint}", self.inner.base)
    }

    /// GET an endpoint and decode the JSON body.
    async fn request<T, P>(&self, endpoint: &str, params: &P) -> Result<T, CatalogError>
    where
        T: DeserializeOwned,
        P: serde::Serialize + ?Sized,
    {
        let response = self
            .inner
            .client
            .get(self.url(endpoint))
            .header("Accept", "application/json")
            .query(&[
                ("consumer_key", self.inner.consumer_key.as_str()),
                ("consumer_secret", self.inner.consumer_secret.as_str()),
            ])
            .query(params)
            .send()
            .await
            .map_err(reqwest::Error::without_url)?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(reqwest::Error::without_url)?;

        if !status.is_success() {
            tracing::error!(
                status = %status,
                endpoint,
                body = %body.chars().take(500).collect::<String>(),
                "WooCommerce API returned non-success status"
            );
            return Err(api_error(status, &body));
        }

        serde_json::from_str(&body).map_err(|e| {
            tracing::error!(error = %e, endpoint, "Failed to parse WooCommerce response");
            CatalogError::Parse(e)
        })
    }

    /// List products matching a query.
    ///
    /// Search queries bypass the cache.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails.
    #[instrument(skip(self))]
    pub async fn get_products(&self, query: &ProductQuery) -> Result<Vec<Product>, CatalogError> {
        let cacheable = query.search.is_none();
        let cache_key = CacheKey::Products(query.clone());

        if cacheable
            && let Some(CacheValue::Products(products)) = self.inner.cache.get(&cache_key).await
        {
            debug!("Cache hit for products");
            return Ok(products);
        }

        let products: Vec<Product> = self.request("products", query).await?;

        if cacheable {
            self.inner
                .cache
                .insert(cache_key, CacheValue::Products(products.clone()))
                .await;
        }

        Ok(products)
    }

    /// Get one product by id.
    ///
    /// # Errors
    ///
    /// Returns [`CatalogError::NotFound`] if the product does not exist, or
    /// another error if the API request fails.
    #[instrument(skip(self), fields(product_id = %id))]
    pub async fn get_product(&self, id: ProductId) -> Result<Product, CatalogError> {
        let cache_key = CacheKey::Product(id);

        if let Some(CacheValue::Product(product)) = self.inner.cache.get(&cache_key).await {
            debug!("Cache hit for product");
            return Ok(*product);
        }

        let product: Product = self
            .request(&format!("products/{id}"), &[] as &[(&str, &str)])
            .await
            .map_err(|e| match e {
                CatalogError::Api { status: 404, .. } => {
                    CatalogError::NotFound(format!("Product not found: {id}"))
                }
                other => other,
            })?;

        self.inner
            .cache
            .insert(cache_key, CacheValue::Product(Box::new(product.clone())))
            .await;

        Ok(product)
    }

    /// List product categories.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails.
    #[instrument(skip(self))]
    pub async fn get_categories(
        &self,
        query: &CategoryQuery,
    ) -> Result<Vec<Category>, CatalogError> {
        let cache_key = CacheKey::Categories(query.clone());

        if let Some(CacheValue::Categories(categories)) = self.inner.cache.get(&cache_key).await {
            debug!("Cache hit for categories");
            return Ok(categories);
        }

        let categories: Vec<Category> = self.request("products/categories", query).await?;

        self.inner
            .cache
            .insert(cache_key, CacheValue::Categories(categories.clone()))
            .await;

        Ok(categories)
    }

    /// Full-text product search. Never cached.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails.
    pub async fn search_products(&self, term: &str) -> Result<Vec<Product>, CatalogError> {
        self.get_products(&ProductQuery::search(term)).await
    }
}

fn rest_base(config: &WooCommerceConfig) -> String {
    format!(
        "{}/wp-json/wc/{}",
        config.base_url.as_str().trim_end_matches('/'),
        config.api_version
    )
}
