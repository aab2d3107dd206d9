//! Cart kept in a key-value slot, with no network calls.

use std::sync::Arc;

use async_trait::async_trait;
use kp_core::Cart;
use tracing::{debug, error, warn};

use super::backend::{CartBackend, CartMutation, CartState};
use super::CartError;
use crate::storage::KeyValueStore;

/// Slot holding the local cart as a JSON array of line items.
pub const CART_SLOT: &str = "kp-cart";

/// Persists the whole cart to one slot after every change.
#[derive(Debug, Clone)]
pub struct LocalCartBackend {
    store: Arc<dyn KeyValueStore>,
    slot: String,
}

impl LocalCartBackend {
    /// Back the cart with the default [`CART_SLOT`].
    #[must_use]
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self::with_slot(store, CART_SLOT)
    }

    #[must_use]
    pub fn with_slot(store: Arc<dyn KeyValueStore>, slot: impl Into<String>) -> Self {
        Self {
            store,
            slot: slot.into(),
        }
    }

    /// Read the slot. A missing or malformed slot is an empty cart.
    fn read(&self) -> Result<Cart, CartError> {
        let Some(json) = self.store.get(&self.slot)? else {
            return Ok(Cart::new());
        };
        match serde_json::from_str::<Cart>(&json) {
            Ok(cart) if cart.checked_total().is_some() => Ok(cart),
            Ok(_) => {
                warn!(slot = %self.slot, "Stored cart total overflows; starting empty");
                Ok(Cart::new())
            }
            Err(e) => {
                warn!(error = %e, slot = %self.slot, "Stored cart is malformed; starting empty");
                Ok(Cart::new())
            }
        }
    }

    /// Write the slot. Failures are logged; the in-memory cart stays
    /// authoritative.
    fn write(&self, cart: &Cart) {
        let json = match serde_json::to_string(cart) {
            Ok(json) => json,
            Err(e) => {
                error!(error = %e, "Failed to serialize cart");
                return;
            }
        };
        match self.store.put(&self.slot, &json) {
            Ok(()) => debug!(slot = %self.slot, lines = cart.items().len(), "Cart saved"),
            Err(e) => error!(error = %e, slot = %self.slot, "Failed to save cart"),
        }
    }
}

#[async_trait]
impl CartBackend for LocalCartBackend {
    fn name(&self) -> &'static str {
        "local"
    }

    async fn load(&self) -> Result<CartState, CartError> {
        Ok(CartState {
            cart: self.read()?,
            server_totals: None,
        })
    }

    async fn apply(
        &self,
        current: &Cart,
        mutation: CartMutation,
    ) -> Result<CartState, CartError> {
        let mut cart = current.clone();
        match mutation {
            CartMutation::Add(product) => {
                let item = product
                    .to_line_item()
                    .map_err(|source| CartError::InvalidPrice {
                        product_id: product.id,
                        source,
                    })?;
                cart.add(item);
            }
            CartMutation::UpdateQuantity { key, quantity } => {
                cart.set_quantity(&key, i64::from(quantity));
            }
            CartMutation::Remove { key } => {
                cart.remove(&key);
            }
        }
        if cart.checked_total().is_none() {
            warn!(slot = %self.slot, "Cart total would overflow; change rejected");
            return Err(CartError::Overflow);
        }
        self.write(&cart);
        Ok(CartState {
            cart,
            server_totals: None,
        })
    }
}
