//! Application state shared across consumers.

use std::sync::Arc;

use tracing::info;

use crate::auth::AuthSession;
use crate::cart::{CartBackend, CartStore, LocalCartBackend, RemoteCartBackend};
use crate::catalog::CatalogClient;
use crate::config::{CartMode, StorefrontConfig};
use crate::graphql::GraphQLClient;
use crate::storage::{FileStore, KeyValueStore};

/// Everything a consumer needs, built once per process.
///
/// This struct is cheaply cloneable via `Arc`. The cart store inside it is
/// the only cart for the lifetime of the state.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: StorefrontConfig,
    storage: Arc<dyn KeyValueStore>,
    catalog: CatalogClient,
    graphql: GraphQLClient,
    auth: AuthSession,
    cart: CartStore,
}

impl AppState {
    /// Build the state with slots stored under `config.data_dir`.
    pub async fn new(config: StorefrontConfig) -> Self {
        let storage = Arc::new(FileStore::new(config.data_dir.clone()));
        Self::with_storage(config, storage).await
    }

    /// Build the state on top of the given slot storage.
    ///
    /// Restores any stored customer session first, so that a remote cart is
    /// fetched with the customer's credentials.
    pub async fn with_storage(config: StorefrontConfig, storage: Arc<dyn KeyValueStore>) -> Self {
        let graphql = GraphQLClient::new(&config.graphql);
        let catalog = CatalogClient::new(&config.woocommerce);

        let auth = AuthSession::new(Arc::new(graphql.clone()), storage.clone());
        auth.restore();

        let backend: Arc<dyn CartBackend> = match config.cart_mode {
            CartMode::Local => Arc::new(LocalCartBackend::new(storage.clone())),
            CartMode::Remote => Arc::new(RemoteCartBackend::new(Arc::new(graphql.clone()))),
        };
        let cart = CartStore::load(backend).await;

        info!(cart_mode = %config.cart_mode, "Storefront state ready");

        Self {
            inner: Arc::new(AppStateInner {
                config,
                storage,
                catalog,
                graphql,
                auth,
                cart,
            }),
        }
    }

    /// Get a reference to the storefront configuration.
    #[must_use]
    pub fn config(&self) -> &StorefrontConfig {
        &self.inner.config
    }

    /// Get a reference to the slot storage.
    #[must_use]
    pub fn storage(&self) -> &Arc<dyn KeyValueStore> {
        &self.inner.storage
    }

    /// Get a reference to the REST catalog client.
    #[must_use]
    pub fn catalog(&self) -> &CatalogClient {
        &self.inner.catalog
    }

    /// Get a reference to the WooGraphQL client.
    #[must_use]
    pub fn graphql(&self) -> &GraphQLClient {
        &self.inner.graphql
    }

    /// Get a reference to the customer session.
    #[must_use]
    pub fn auth(&self) -> &AuthSession {
        &self.inner.auth
    }

    /// Get a reference to the cart store.
    #[must_use]
    pub fn cart(&self) -> &CartStore {
        &self.inner.cart
    }

    /// Save state that must outlive the process, such as the WooCommerce
    /// session token of a guest cart.
    pub fn persist(&self) {
        self.inner.auth.persist_woo_session();
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::cart::CART_SLOT;
    use crate::storage::MemoryStore;
    use std::collections::HashMap;

    fn config(mode: &str) -> StorefrontConfig {
        let vars: HashMap<&str, &str> = HashMap::from([
            ("WORDPRESS_URL", "https://shop.test"),
            ("WOOCOMMERCE_CONSUMER_KEY", "ck_1234"),
            (
                "WOOCOMMERCE_CONSUMER_SECRET",
                "cs_4f9a1c7e2b8d3a6f0e5c9b1d7a2e4f8c3b6d0a9e",
            ),
            ("KP_CART_MODE", mode),
        ]);
        StorefrontConfig::from_source(&move |key: &str| vars.get(key).map(|v| (*v).to_string()))
            .unwrap()
    }

    #[tokio::test]
    async fn test_local_mode_loads_stored_cart() {
        let storage = Arc::new(MemoryStore::new());
        storage
            .put(
                CART_SLOT,
                r#"[{"key":"1","product_id":1,"name":"Dress","unit_price":"2500","quantity":2}]"#,
            )
            .unwrap();

        let state = AppState::with_storage(config("local"), storage).await;

        assert_eq!(state.cart().backend_name(), "local");
        let snap = state.cart().read();
        assert_eq!(snap.count, 2);
        assert_eq!(snap.total, rust_decimal::Decimal::from(5000));
        assert!(!state.auth().is_authenticated());
    }

    #[tokio::test]
    async fn test_clones_share_one_cart() {
        let state = AppState::with_storage(config("local"), Arc::new(MemoryStore::new())).await;
        let other = state.clone();

        let product = kp_core::ProductInput {
            id: kp_core::ProductId::new(3),
            name: "Scarf".to_string(),
            price: "450".to_string(),
            images: vec![],
        };
        state.cart().add_item(&product).await.unwrap();
        assert_eq!(other.cart().read().count, 1);
    }
}
