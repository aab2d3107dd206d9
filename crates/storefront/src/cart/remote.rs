//! Cart held by the WooCommerce server.
//!
//! Every change is one GraphQL mutation carrying only the delta, followed by
//! one refetch of the whole cart; the refetched cart replaces local state.

use std::sync::Arc;

use async_trait::async_trait;
use kp_core::{Cart, LineKey, ProductId};
use tracing::{debug, instrument};

use super::backend::{CartBackend, CartMutation, CartState};
use super::CartError;
use crate::graphql::{GraphQLClient, RemoteCart, WooError};

/// The cart operations the remote backend needs from the API.
#[async_trait]
pub trait RemoteCartApi: Send + Sync {
    async fn fetch_cart(&self) -> Result<RemoteCart, WooError>;

    async fn add_to_cart(&self, product_id: ProductId, quantity: u32) -> Result<(), WooError>;

    async fn update_item_quantity(&self, key: &LineKey, quantity: u32) -> Result<(), WooError>;

    async fn remove_item(&self, key: &LineKey) -> Result<(), WooError>;
}

#[async_trait]
impl RemoteCartApi for GraphQLClient {
    async fn fetch_cart(&self) -> Result<RemoteCart, WooError> {
        self.get_cart().await
    }

    async fn add_to_cart(&self, product_id: ProductId, quantity: u32) -> Result<(), WooError> {
        Self::add_to_cart(self, product_id, quantity).await
    }

    async fn update_item_quantity(&self, key: &LineKey, quantity: u32) -> Result<(), WooError> {
        Self::update_item_quantity(self, key, quantity).await
    }

    async fn remove_item(&self, key: &LineKey) -> Result<(), WooError> {
        Self::remove_item(self, key).await
    }
}

/// Synchronizes every change with the server cart.
#[derive(Clone)]
pub struct RemoteCartBackend {
    api: Arc<dyn RemoteCartApi>,
}

impl std::fmt::Debug for RemoteCartBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RemoteCartBackend").finish_non_exhaustive()
    }
}

impl RemoteCartBackend {
    #[must_use]
    pub fn new(api: Arc<dyn RemoteCartApi>) -> Self {
        Self { api }
    }

    async fn fetch(&self) -> Result<CartState, CartError> {
        let remote = self.api.fetch_cart().await?;
        let cart = remote.to_cart().map_err(CartError::RemotePrice)?;
        debug!(lines = cart.items().len(), "Fetched server cart");
        Ok(CartState {
            cart,
            server_totals: Some(remote.totals),
        })
    }
}

#[async_trait]
impl CartBackend for RemoteCartBackend {
    fn name(&self) -> &'static str {
        "remote"
    }

    async fn load(&self) -> Result<CartState, CartError> {
        self.fetch().await
    }

    #[instrument(skip(self, _current), fields(action = mutation.action(), key = %mutation.key()))]
    async fn apply(
        &self,
        _current: &Cart,
        mutation: CartMutation,
    ) -> Result<CartState, CartError> {
        match mutation {
            CartMutation::Add(product) => self.api.add_to_cart(product.id, 1).await?,
            CartMutation::UpdateQuantity { key, quantity } => {
                self.api.update_item_quantity(&key, quantity).await?;
            }
            CartMutation::Remove { key } => self.api.remove_item(&key).await?,
        }
        self.fetch().await
    }
}
