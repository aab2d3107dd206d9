//! KP Storefront library.
//!
//! Client-side state and backend access for the KP storefront:
//!
//! - [`cart`] - The cart store and its local and remote persistence backends
//! - [`catalog`] - WooCommerce REST products and categories
//! - [`graphql`] - WooGraphQL cart, checkout, and customer auth
//! - [`auth`] - Customer session kept in key-value slots
//! - [`storage`] - Durable key-value slots
//! - [`state`] - Composition root that builds all of the above once
//!
//! # Example
//!
//! ```rust,ignore
//! use kp_storefront::{config::StorefrontConfig, state::AppState};
//!
//! let state = AppState::new(StorefrontConfig::from_env()?).await;
//!
//! let product = state.catalog().get_product(ProductId::new(42)).await?;
//! let snapshot = state.cart().add_item(&product.to_product_input()).await?;
//! println!("{} items, {}", snapshot.count, format_price(snapshot.total));
//! ```

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod auth;
pub mod cart;
pub mod catalog;
pub mod config;
pub mod error;
pub mod graphql;
pub mod state;
pub mod storage;

pub use error::{Result, StorefrontError};
