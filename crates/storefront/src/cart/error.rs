//! Cart error types.

use kp_core::{PriceError, ProductId};
use thiserror::Error;

use crate::graphql::WooError;
use crate::storage::StorageError;

/// Errors that can occur during cart operations.
#[derive(Debug, Error)]
pub enum CartError {
    /// The product's price is not a valid amount; the cart is unchanged.
    #[error("invalid price for product {product_id}: {source}")]
    InvalidPrice {
        product_id: ProductId,
        #[source]
        source: PriceError,
    },

    /// The cart total would not fit in a decimal; the cart is unchanged.
    #[error("cart total exceeds the largest representable amount")]
    Overflow,

    /// The server cart could not be updated or fetched.
    #[error("remote cart error: {0}")]
    Remote(#[from] WooError),

    /// A server cart line carried no usable price.
    #[error("remote cart line has no usable price: {0}")]
    RemotePrice(#[source] PriceError),

    /// The local cart slot could not be read.
    #[error("cart storage error: {0}")]
    Storage(#[from] StorageError),
}
