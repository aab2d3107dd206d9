//! Core types for the KP storefront.
//!
//! This module provides type-safe wrappers for common domain concepts.

pub mod id;
pub mod price;
pub mod words;

pub use id::*;
pub use price::{CurrencyCode, Price, PriceError, format_price, parse_amount};
pub use words::amount_in_words;
