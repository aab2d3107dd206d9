//! The persistence seam between the cart store and where carts live.

use std::fmt::Debug;

use async_trait::async_trait;
use kp_core::{Cart, LineKey, ProductInput};

use super::CartError;
use crate::graphql::CartTotals;

/// One change requested of a cart.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CartMutation {
    /// Add one unit of a product, merging with an existing line.
    ///
    /// The local backend prices the line from the product; the remote
    /// backend sends only the product id and lets the server price it.
    Add(ProductInput),
    /// Set a line's quantity. Already clamped to at least 1.
    UpdateQuantity { key: LineKey, quantity: u32 },
    /// Drop a line.
    Remove { key: LineKey },
}

impl CartMutation {
    /// Whether applying this mutation to `cart` can change anything.
    ///
    /// Updates and removals of unknown keys are no-ops.
    #[must_use]
    pub fn applies_to(&self, cart: &Cart) -> bool {
        match self {
            Self::Add(_) => true,
            Self::UpdateQuantity { key, .. } | Self::Remove { key } => cart.contains(key),
        }
    }

    pub(crate) const fn action(&self) -> &'static str {
        match self {
            Self::Add(_) => "add",
            Self::UpdateQuantity { .. } => "update_quantity",
            Self::Remove { .. } => "remove",
        }
    }

    /// The line this mutation targets. Adds name the product's local key.
    pub(crate) fn key(&self) -> LineKey {
        match self {
            Self::Add(product) => LineKey::for_product(product.id),
            Self::UpdateQuantity { key, .. } | Self::Remove { key } => key.clone(),
        }
    }
}

/// Cart contents as a backend last saw them.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CartState {
    pub cart: Cart,
    /// Server-computed totals; only the remote backend reports them.
    pub server_totals: Option<CartTotals>,
}

/// Where cart state is made durable or authoritative.
#[async_trait]
pub trait CartBackend: Send + Sync + Debug {
    /// Short name for logs (`local` or `remote`).
    fn name(&self) -> &'static str;

    /// Read the current cart.
    async fn load(&self) -> Result<CartState, CartError>;

    /// Apply one mutation to `current` and return the resulting state.
    ///
    /// On error the caller keeps `current`.
    async fn apply(&self, current: &Cart, mutation: CartMutation)
    -> Result<CartState, CartError>;
}
