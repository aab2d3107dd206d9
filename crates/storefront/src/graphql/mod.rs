//! WooGraphQL API client.
//!
//! Uses `graphql_client` operation traits with `reqwest` 0.13 for HTTP.
//! Product lookups are cached using `moka` (5-minute TTL); cart, checkout,
//! and auth operations always go to the server.
//!
//! # Sessions
//!
//! WooCommerce ties a cart to a session token returned in the
//! `woocommerce-session` response header. The client captures it and sends
//! it back on every request, so a guest cart survives between calls. After
//! login the bearer token identifies the customer instead.

mod conversions;
pub mod queries;
pub mod types;

pub use types::*;

use std::sync::{Arc, PoisonError, RwLock};
use std::time::Duration;

use graphql_client::{GraphQLQuery, Response};
use kp_core::{LineKey, ProductId, parse_amount};
use moka::future::Cache;
use secrecy::{ExposeSecret, SecretString};
use thiserror::Error;
use tracing::{debug, instrument};

use crate::config::GraphQLConfig;

use conversions::{
    convert_cart, convert_checkout, convert_checkout_input, convert_coupon_cart, convert_login,
    convert_product, convert_refresh, convert_register_input, convert_registered_user,
    convert_shipping_packages,
};
use queries::{
    AddToCart, ApplyCoupon, Checkout, FeaturedProducts, GetCart, GetProduct, GetShippingMethods,
    Login, RefreshToken, RegisterUser, RemoveItemsFromCart, UpdateItemQuantities,
    UpdateShippingMethod, add_to_cart, apply_coupon, checkout, featured_products, get_cart,
    get_product, get_shipping_methods, login, refresh_token, register_user,
    remove_items_from_cart, update_item_quantities, update_shipping_method,
};

/// Response and request header carrying the WooCommerce session token.
pub const SESSION_HEADER: &str = "woocommerce-session";

// =============================================================================
// Errors
// =============================================================================

/// Errors that can occur when talking to the WooGraphQL API.
#[derive(Debug, Error)]
pub enum WooError {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// GraphQL query returned errors.
    #[error("GraphQL errors: {}", format_graphql_errors(.0))]
    GraphQL(Vec<GraphQLError>),

    /// JSON parsing failed.
    #[error("JSON parse error: {0}")]
    Parse(#[from] serde_json::Error),

    /// Resource not found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Rate limited by the server.
    #[error("Rate limited, retry after {0} seconds")]
    RateLimited(u64),

    /// The mutation ran but reported a problem with its input.
    #[error("User error: {0}")]
    UserError(String),
}

/// A GraphQL error returned by the API.
#[derive(Debug, Clone)]
pub struct GraphQLError {
    /// Error message.
    pub message: String,
    /// Source locations in the query.
    pub locations: Vec<GraphQLErrorLocation>,
    /// Path to the error in the response.
    pub path: Vec<serde_json::Value>,
}

impl GraphQLError {
    fn message(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            locations: vec![],
            path: vec![],
        }
    }
}

/// Location in a GraphQL query where an error occurred.
#[derive(Debug, Clone)]
pub struct GraphQLErrorLocation {
    /// Line number (1-indexed).
    pub line: i64,
    /// Column number (1-indexed).
    pub column: i64,
}

fn format_graphql_errors(errors: &[GraphQLError]) -> String {
    if errors.is_empty() {
        return "(no error details provided)".to_string();
    }

    errors
        .iter()
        .enumerate()
        .map(|(i, e)| {
            let mut parts = Vec::new();

            if !e.message.is_empty() {
                parts.push(e.message.clone());
            }

            if !e.path.is_empty() {
                let path_str = e
                    .path
                    .iter()
                    .map(|p| match p {
                        serde_json::Value::String(s) => s.clone(),
                        other => other.to_string(),
                    })
                    .collect::<Vec<_>>()
                    .join(".");
                parts.push(format!("path: {path_str}"));
            }

            if let Some(loc) = e.locations.first() {
                parts.push(format!("at line {}:{}", loc.line, loc.column));
            }

            if parts.is_empty() {
                format!("[error {}]: (no details)", i + 1)
            } else {
                parts.join(" ")
            }
        })
        .collect::<Vec<_>>()
        .join("; ")
}

fn truncate(body: &str, max: usize) -> String {
    body.chars().take(max).collect()
}

/// Strip the optional `Session ` scheme from a session header value.
fn session_token_from_header(value: &str) -> Option<String> {
    let token = value.trim();
    let token = token.strip_prefix("Session ").unwrap_or(token).trim();
    (!token.is_empty()).then(|| token.to_string())
}

#[derive(Debug, Clone)]
enum CacheValue {
    Product(Box<CatalogProduct>),
    Products(Vec<CatalogProduct>),
}

// =============================================================================
// GraphQLClient
// =============================================================================

/// Client for the WooGraphQL API.
///
/// Cheap to clone; clones share the HTTP connection pool, the product
/// cache, and the current auth and session tokens.
#[derive(Clone)]
pub struct GraphQLClient {
    inner: Arc<GraphQLClientInner>,
}

struct GraphQLClientInner {
    client: reqwest::Client,
    endpoint: String,
    origin: String,
    auth_token: RwLock<Option<SecretString>>,
    session_token: RwLock<Option<String>>,
    cache: Cache<String, CacheValue>,
}

impl std::fmt::Debug for GraphQLClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GraphQLClient")
            .field("endpoint", &self.inner.endpoint)
            .field("authenticated", &self.is_authenticated())
            .finish_non_exhaustive()
    }
}

impl GraphQLClient {
    /// Create a new GraphQL client.
    #[must_use]
    pub fn new(config: &GraphQLConfig) -> Self {
        let cache = Cache::builder()
            .max_capacity(1000)
            .time_to_live(Duration::from_secs(300)) // 5 minutes
            .build();

        Self {
            inner: Arc::new(GraphQLClientInner {
                client: reqwest::Client::new(),
                endpoint: config.endpoint.to_string(),
                origin: config.origin.clone(),
                auth_token: RwLock::new(None),
                session_token: RwLock::new(None),
                cache,
            }),
        }
    }

    /// Set or clear the bearer token sent with every request.
    pub fn set_auth_token(&self, token: Option<SecretString>) {
        *self
            .inner
            .auth_token
            .write()
            .unwrap_or_else(PoisonError::into_inner) = token;
    }

    /// Whether a bearer token is currently set.
    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        self.inner
            .auth_token
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .is_some()
    }

    /// Set or clear the WooCommerce session token.
    pub fn set_session_token(&self, token: Option<String>) {
        *self
            .inner
            .session_token
            .write()
            .unwrap_or_else(PoisonError::into_inner) = token;
    }

    /// The current WooCommerce session token, if the server issued one.
    #[must_use]
    pub fn session_token(&self) -> Option<String> {
        self.inner
            .session_token
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Execute a GraphQL operation.
    async fn execute<Q: GraphQLQuery>(
        &self,
        variables: Q::Variables,
    ) -> Result<Q::ResponseData, WooError>
    where
        Q::Variables: serde::Serialize,
    {
        let request_body = Q::build_query(variables);

        let mut request = self
            .inner
            .client
            .post(&self.inner.endpoint)
            .header("Content-Type", "application/json")
            .header("Accept", "application/json")
            .header("Origin", &self.inner.origin)
            .json(&request_body);

        // Token values are copied out so no lock is held across the await.
        let auth_token = self
            .inner
            .auth_token
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
            .map(|t| t.expose_secret().to_string());
        if let Some(token) = auth_token {
            request = request.bearer_auth(token);
        }
        if let Some(session) = self.session_token() {
            request = request.header(SESSION_HEADER, format!("Session {session}"));
        }

        let response = request.send().await?;
        let status = response.status();

        if let Some(session) = response
            .headers()
            .get(SESSION_HEADER)
            .and_then(|v| v.to_str().ok())
            .and_then(session_token_from_header)
        {
            debug!("Captured WooCommerce session token");
            self.set_session_token(Some(session));
        }

        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            let retry_after = response
                .headers()
                .get("Retry-After")
                .and_then(|v| v.to_str().ok())
                .and_then(|s| s.parse::<u64>().ok())
                .unwrap_or(1);
            return Err(WooError::RateLimited(retry_after));
        }

        // Body as text first for better error diagnostics
        let response_text = response.text().await?;

        if !status.is_success() {
            tracing::error!(
                status = %status,
                operation = request_body.operation_name,
                body = %truncate(&response_text, 500),
                "GraphQL API returned non-success status"
            );
            return Err(WooError::GraphQL(vec![GraphQLError::message(format!(
                "HTTP {status}: {}",
                truncate(&response_text, 200)
            ))]));
        }

        let response: Response<Q::ResponseData> = match serde_json::from_str(&response_text) {
            Ok(r) => r,
            Err(e) => {
                tracing::error!(
                    error = %e,
                    operation = request_body.operation_name,
                    body = %truncate(&response_text, 500),
                    "Failed to parse GraphQL response"
                );
                return Err(WooError::Parse(e));
            }
        };

        if let Some(errors) = response.errors
            && !errors.is_empty()
        {
            debug!(errors = ?errors, "GraphQL errors in response");

            return Err(WooError::GraphQL(
                errors
                    .into_iter()
                    .map(|e| GraphQLError {
                        message: e.message,
                        locations: e.locations.map_or_else(Vec::new, |locs| {
                            locs.into_iter()
                                .map(|l| GraphQLErrorLocation {
                                    line: i64::from(l.line),
                                    column: i64::from(l.column),
                                })
                                .collect()
                        }),
                        path: e.path.map_or_else(Vec::new, |p| {
                            p.into_iter()
                                .map(|fragment| match fragment {
                                    graphql_client::PathFragment::Key(s) => {
                                        serde_json::Value::String(s)
                                    }
                                    graphql_client::PathFragment::Index(i) => {
                                        serde_json::Value::Number(i.into())
                                    }
                                })
                                .collect()
                        }),
                    })
                    .collect(),
            ));
        }

        response.data.ok_or_else(|| {
            tracing::error!(
                operation = request_body.operation_name,
                body = %truncate(&response_text, 500),
                "GraphQL response has no data and no errors"
            );
            WooError::GraphQL(vec![GraphQLError::message("No data in response")])
        })
    }

    // =========================================================================
    // Cart Methods
    // =========================================================================

    /// Fetch the session's cart.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails.
    #[instrument(skip(self))]
    pub async fn get_cart(&self) -> Result<RemoteCart, WooError> {
        let data = self.execute::<GetCart>(get_cart::Variables).await?;
        Ok(data.cart.map(convert_cart).unwrap_or_default())
    }

    /// Add units of a product to the cart.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails.
    #[instrument(skip(self), fields(product_id = %product_id))]
    pub async fn add_to_cart(&self, product_id: ProductId, quantity: u32) -> Result<(), WooError> {
        let variables = add_to_cart::Variables {
            input: add_to_cart::AddToCartInput {
                client_mutation_id: None,
                product_id: product_id.as_i64(),
                quantity: Some(i64::from(quantity)),
                variation_id: None,
            },
        };
        let data = self.execute::<AddToCart>(variables).await?;
        data.add_to_cart
            .and_then(|p| p.cart_item)
            .map(|_| ())
            .ok_or_else(|| WooError::UserError(format!("product {product_id} was not added")))
    }

    /// Set the quantity of one cart entry.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails.
    #[instrument(skip(self), fields(key = %key))]
    pub async fn update_item_quantity(&self, key: &LineKey, quantity: u32) -> Result<(), WooError> {
        let variables = update_item_quantities::Variables {
            input: update_item_quantities::UpdateItemQuantitiesInput {
                client_mutation_id: None,
                items: Some(vec![Some(update_item_quantities::CartItemQuantityInput {
                    key: key.as_str().to_string(),
                    quantity: i64::from(quantity),
                })]),
            },
        };
        self.execute::<UpdateItemQuantities>(variables).await?;
        Ok(())
    }

    /// Remove one cart entry.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails.
    #[instrument(skip(self), fields(key = %key))]
    pub async fn remove_item(&self, key: &LineKey) -> Result<(), WooError> {
        let variables = remove_items_from_cart::Variables {
            input: remove_items_from_cart::RemoveItemsFromCartInput {
                client_mutation_id: None,
                keys: Some(vec![Some(key.as_str().to_string())]),
                all: None,
            },
        };
        self.execute::<RemoveItemsFromCart>(variables).await?;
        Ok(())
    }

    /// Apply a coupon code to the cart.
    ///
    /// # Errors
    ///
    /// Returns an error if the code is rejected or the API request fails.
    #[instrument(skip(self))]
    pub async fn apply_coupon(&self, code: &str) -> Result<CouponResult, WooError> {
        let variables = apply_coupon::Variables {
            input: apply_coupon::ApplyCouponInput {
                client_mutation_id: None,
                code: code.to_string(),
            },
        };
        let data = self.execute::<ApplyCoupon>(variables).await?;
        data.apply_coupon
            .and_then(|p| p.cart)
            .map(convert_coupon_cart)
            .ok_or_else(|| WooError::UserError(format!("coupon {code} was not applied")))
    }

    /// List the shipping rates available for the cart.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails.
    #[instrument(skip(self))]
    pub async fn get_shipping_methods(&self) -> Result<Vec<ShippingPackage>, WooError> {
        let data = self
            .execute::<GetShippingMethods>(get_shipping_methods::Variables)
            .await?;
        Ok(convert_shipping_packages(
            data.cart.and_then(|c| c.available_shipping_methods),
        ))
    }

    /// Choose shipping rates by id, one per package.
    ///
    /// Returns the packages with the new selection and the updated totals.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails.
    #[instrument(skip(self))]
    pub async fn update_shipping_method(
        &self,
        rate_ids: Vec<String>,
    ) -> Result<(Vec<ShippingPackage>, CartTotals), WooError> {
        let variables = update_shipping_method::Variables {
            input: update_shipping_method::UpdateShippingMethodInput {
                client_mutation_id: None,
                shipping_methods: Some(rate_ids.into_iter().map(Some).collect()),
            },
        };
        let data = self.execute::<UpdateShippingMethod>(variables).await?;
        let cart = data
            .update_shipping_method
            .and_then(|p| p.cart)
            .ok_or_else(|| WooError::UserError("shipping method was not updated".to_string()))?;

        let totals = CartTotals {
            shipping: cart
                .shipping_total
                .as_deref()
                .and_then(|s| parse_amount(s).ok()),
            total: cart.total.as_deref().and_then(|s| parse_amount(s).ok()),
            ..CartTotals::default()
        };
        Ok((
            convert_shipping_packages(cart.available_shipping_methods),
            totals,
        ))
    }

    /// Place an order from the current cart.
    ///
    /// # Errors
    ///
    /// Returns an error if checkout is rejected or the API request fails.
    #[instrument(skip(self, input), fields(payment_method = %input.payment_method))]
    pub async fn checkout(&self, input: CheckoutInput) -> Result<CheckoutResult, WooError> {
        let data = self
            .execute::<Checkout>(checkout::Variables {
                input: convert_checkout_input(input),
            })
            .await?;
        data.checkout
            .map(convert_checkout)
            .ok_or_else(|| WooError::UserError("checkout returned no result".to_string()))
    }

    // =========================================================================
    // Product Methods
    // =========================================================================

    /// Get featured products.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails.
    #[instrument(skip(self))]
    pub async fn get_featured_products(&self) -> Result<Vec<CatalogProduct>, WooError> {
        let cache_key = "featured".to_string();

        if let Some(CacheValue::Products(products)) = self.inner.cache.get(&cache_key).await {
            debug!("Cache hit for featured products");
            return Ok(products);
        }

        let data = self
            .execute::<FeaturedProducts>(featured_products::Variables)
            .await?;
        let products: Vec<CatalogProduct> = data
            .products
            .map(|p| p.nodes.into_iter().map(convert_product).collect())
            .unwrap_or_default();

        self.inner
            .cache
            .insert(cache_key, CacheValue::Products(products.clone()))
            .await;

        Ok(products)
    }

    /// Get a product by its database id.
    ///
    /// # Errors
    ///
    /// Returns an error if the product is not found or the API request fails.
    #[instrument(skip(self), fields(product_id = %id))]
    pub async fn get_product(&self, id: ProductId) -> Result<CatalogProduct, WooError> {
        let cache_key = format!("product:{id}");

        if let Some(CacheValue::Product(product)) = self.inner.cache.get(&cache_key).await {
            debug!("Cache hit for product");
            return Ok(*product);
        }

        let data = self
            .execute::<GetProduct>(get_product::Variables { id: id.to_string() })
            .await?;
        let product = data
            .product
            .map(convert_product)
            .ok_or_else(|| WooError::NotFound(format!("Product not found: {id}")))?;

        self.inner
            .cache
            .insert(cache_key, CacheValue::Product(Box::new(product.clone())))
            .await;

        Ok(product)
    }

    // =========================================================================
    // Auth Methods
    // =========================================================================

    /// Log in with a username (or email) and password.
    ///
    /// Does not change the client's tokens; the caller decides what to keep.
    ///
    /// # Errors
    ///
    /// Returns an error if the credentials are rejected or the request fails.
    #[instrument(skip(self, password))]
    pub async fn login(
        &self,
        username: &str,
        password: &SecretString,
    ) -> Result<LoginPayload, WooError> {
        let variables = login::Variables {
            username: username.to_string(),
            password: password.expose_secret().to_string(),
        };
        let data = self.execute::<Login>(variables).await?;
        let payload = data
            .login
            .ok_or_else(|| WooError::UserError("login returned no result".to_string()))?;
        convert_login(payload)
    }

    /// Create a customer account.
    ///
    /// # Errors
    ///
    /// Returns an error if registration is rejected or the request fails.
    #[instrument(skip(self, input), fields(username = %input.username))]
    pub async fn register(&self, input: RegisterInput) -> Result<RegisteredUser, WooError> {
        let data = self
            .execute::<RegisterUser>(register_user::Variables {
                input: convert_register_input(input),
            })
            .await?;
        data.register_user
            .and_then(|p| p.user)
            .map(convert_registered_user)
            .ok_or_else(|| WooError::UserError("registration returned no user".to_string()))
    }

    /// Exchange a refresh token for a new auth token.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails.
    #[instrument(skip(self, token))]
    pub async fn refresh_token(&self, token: &SecretString) -> Result<RefreshPayload, WooError> {
        let variables = refresh_token::Variables {
            token: token.expose_secret().to_string(),
        };
        let data = self.execute::<RefreshToken>(variables).await?;
        let payload = data
            .refresh_token
            .ok_or_else(|| WooError::UserError("refresh returned no result".to_string()))?;
        Ok(convert_refresh(payload))
    }
}
