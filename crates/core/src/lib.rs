//! KP Core - Shared types library.
//!
//! This crate provides common types used across the KP storefront crates:
//! - `storefront` - Cart engine, WooCommerce clients, and customer session
//! - `cli` - Command-line consumer of the storefront library
//!
//! # Architecture
//!
//! The core crate contains only types and pure logic - no I/O, no storage,
//! no HTTP clients. This keeps it lightweight and allows it to be used anywhere.
//!
//! # Modules
//!
//! - [`types`] - Newtype IDs, prices, and spelled-out amounts
//! - [`cart`] - Line items, cart merge rules, and derived totals

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod cart;
pub mod types;

pub use cart::{Cart, LineItem, PLACEHOLDER_IMAGE, ProductImage, ProductInput, clamp_quantity};
pub use types::*;
