//! Cart line items and the merge rules every cart obeys.
//!
//! [`Cart`] is a plain value: it owns the ordered line items and applies the
//! add/update/remove rules, while totals are always computed from the items.
//! Persistence and synchronization live in the storefront crate.
//!
//! # Rules
//!
//! - A line's quantity is never below 1; smaller requests clamp to 1.
//! - Keys are unique; adding an existing key bumps its quantity by one.
//! - The latest product data observed for a line wins: re-adding a product
//!   refreshes its name, price, and image.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::types::{LineKey, PriceError, ProductId, parse_amount};

/// Image shown for lines without a product image.
pub const PLACEHOLDER_IMAGE: &str = "/placeholder.png";

/// One product-and-quantity entry in a cart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineItem {
    /// Unique key of this entry within the cart.
    pub key: LineKey,
    /// Catalog id of the product.
    pub product_id: ProductId,
    /// Product display name.
    pub name: String,
    /// Price of a single unit.
    pub unit_price: Decimal,
    /// Number of units, at least 1.
    pub quantity: u32,
    /// Product image, if the catalog has one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
}

impl LineItem {
    /// `unit_price * quantity`, saturating at [`Decimal::MAX`].
    #[must_use]
    pub fn line_total(&self) -> Decimal {
        self.unit_price.saturating_mul(Decimal::from(self.quantity))
    }

    /// `unit_price * quantity`, or `None` if it does not fit in a [`Decimal`].
    #[must_use]
    pub fn checked_line_total(&self) -> Option<Decimal> {
        self.unit_price.checked_mul(Decimal::from(self.quantity))
    }

    /// The product image, or [`PLACEHOLDER_IMAGE`].
    #[must_use]
    pub fn image(&self) -> &str {
        self.image_url.as_deref().unwrap_or(PLACEHOLDER_IMAGE)
    }
}

/// An image reference on a catalog product.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductImage {
    pub src: String,
}

/// Product data supplied when adding to a cart.
///
/// Mirrors the fields of a WooCommerce REST product, so a catalog response
/// can be deserialized straight into it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductInput {
    pub id: ProductId,
    pub name: String,
    /// Price as reported by the catalog; must parse as a decimal.
    pub price: String,
    #[serde(default)]
    pub images: Vec<ProductImage>,
}

impl ProductInput {
    /// Build the line item this product starts as in a local cart.
    ///
    /// # Errors
    ///
    /// Returns a [`PriceError`] if the price is not a valid amount.
    pub fn to_line_item(&self) -> Result<LineItem, PriceError> {
        Ok(LineItem {
            key: LineKey::for_product(self.id),
            product_id: self.id,
            name: self.name.clone(),
            unit_price: parse_amount(&self.price)?,
            quantity: 1,
            image_url: self.images.first().map(|image| image.src.clone()),
        })
    }
}

/// Clamp a requested quantity to the valid range `1..=u32::MAX`.
#[must_use]
pub fn clamp_quantity(requested: i64) -> u32 {
    u32::try_from(requested.max(1)).unwrap_or(u32::MAX)
}

/// An ordered list of line items with unique keys.
///
/// Serializes as a bare JSON array of line items.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "Vec<LineItem>", into = "Vec<LineItem>")]
pub struct Cart {
    items: Vec<LineItem>,
}

impl Cart {
    /// An empty cart.
    #[must_use]
    pub const fn new() -> Self {
        Self { items: Vec::new() }
    }

    /// Build a cart from stored items, restoring the invariants.
    ///
    /// Zero quantities become 1 and duplicate keys are folded into the
    /// first occurrence (quantities summed).
    #[must_use]
    pub fn from_items(items: impl IntoIterator<Item = LineItem>) -> Self {
        let mut cart = Self::new();
        for mut item in items {
            item.quantity = item.quantity.max(1);
            match cart.position(&item.key) {
                Some(index) => {
                    if let Some(existing) = cart.items.get_mut(index) {
                        existing.quantity = existing.quantity.saturating_add(item.quantity);
                    }
                }
                None => cart.items.push(item),
            }
        }
        cart
    }

    /// Line items in display order.
    #[must_use]
    pub fn items(&self) -> &[LineItem] {
        &self.items
    }

    /// Look up a line by key.
    #[must_use]
    pub fn get(&self, key: &LineKey) -> Option<&LineItem> {
        self.items.iter().find(|item| &item.key == key)
    }

    #[must_use]
    pub fn contains(&self, key: &LineKey) -> bool {
        self.get(key).is_some()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Sum of `unit_price * quantity` over all lines.
    ///
    /// Saturates at [`Decimal::MAX`]; use [`Cart::checked_total`] to detect
    /// a cart whose total cannot be represented.
    #[must_use]
    pub fn total(&self) -> Decimal {
        self.checked_total().unwrap_or(Decimal::MAX)
    }

    /// Sum of `unit_price * quantity` over all lines, or `None` on overflow.
    #[must_use]
    pub fn checked_total(&self) -> Option<Decimal> {
        self.items.iter().try_fold(Decimal::ZERO, |total, item| {
            total.checked_add(item.checked_line_total()?)
        })
    }

    /// Sum of quantities over all lines.
    #[must_use]
    pub fn count(&self) -> u64 {
        self.items.iter().map(|item| u64::from(item.quantity)).sum()
    }

    /// Add one unit of a line.
    ///
    /// If the key already exists its quantity goes up by one and its
    /// product data is replaced with the incoming values; otherwise the line
    /// is appended with quantity 1.
    pub fn add(&mut self, item: LineItem) {
        match self.items.iter_mut().find(|existing| existing.key == item.key) {
            Some(existing) => {
                existing.quantity = existing.quantity.saturating_add(1);
                existing.name = item.name;
                existing.unit_price = item.unit_price;
                existing.image_url = item.image_url;
            }
            None => self.items.push(LineItem { quantity: 1, ..item }),
        }
    }

    /// Set a line's quantity, clamped to at least 1.
    ///
    /// Returns `false` (and changes nothing) if the key is unknown.
    pub fn set_quantity(&mut self, key: &LineKey, quantity: i64) -> bool {
        match self.items.iter_mut().find(|item| &item.key == key) {
            Some(item) => {
                item.quantity = clamp_quantity(quantity);
                true
            }
            None => false,
        }
    }

    /// Remove a line. Returns `false` if the key is unknown.
    pub fn remove(&mut self, key: &LineKey) -> bool {
        let before = self.items.len();
        self.items.retain(|item| &item.key != key);
        self.items.len() != before
    }

    fn position(&self, key: &LineKey) -> Option<usize> {
        self.items.iter().position(|item| &item.key == key)
    }
}

impl From<Vec<LineItem>> for Cart {
    fn from(items: Vec<LineItem>) -> Self {
        Self::from_items(items)
    }
}

impl From<Cart> for Vec<LineItem> {
    fn from(cart: Cart) -> Self {
        cart.items
    }
}
