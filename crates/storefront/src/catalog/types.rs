//! WooCommerce REST product and category shapes.
//!
//! Only the fields the storefront reads are declared; the REST API returns
//! many more, which serde ignores.

use kp_core::{CategoryId, ProductId, ProductImage, ProductInput};
use serde::{Deserialize, Serialize};

/// A product from `GET /products`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Product {
    pub id: ProductId,
    pub name: String,
    #[serde(default)]
    pub slug: String,
    #[serde(default)]
    pub permalink: Option<String>,
    /// Current price as a decimal string; empty for unpriced products.
    #[serde(default)]
    pub price: String,
    #[serde(default)]
    pub regular_price: String,
    #[serde(default)]
    pub sale_price: String,
    #[serde(default)]
    pub on_sale: bool,
    #[serde(default)]
    pub featured: bool,
    #[serde(default)]
    pub stock_status: Option<String>,
    #[serde(default)]
    pub short_description: String,
    #[serde(default)]
    pub images: Vec<ProductImage>,
    #[serde(default)]
    pub categories: Vec<CategoryRef>,
}

impl Product {
    /// Descriptor for adding this product to a cart.
    #[must_use]
    pub fn to_product_input(&self) -> ProductInput {
        ProductInput {
            id: self.id,
            name: self.name.clone(),
            price: self.price.clone(),
            images: self.images.clone(),
        }
    }
}

/// Category summary embedded in a product.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryRef {
    pub id: CategoryId,
    pub name: String,
    #[serde(default)]
    pub slug: String,
}

/// A product category from `GET /products/categories`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Category {
    pub id: CategoryId,
    pub name: String,
    #[serde(default)]
    pub slug: String,
    /// Parent category id, `0` for top-level categories.
    #[serde(default)]
    pub parent: i64,
    #[serde(default)]
    pub description: String,
    /// Number of published products in the category.
    #[serde(default)]
    pub count: u64,
    #[serde(default)]
    pub image: Option<ProductImage>,
}

/// Filters for `GET /products`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize)]
pub struct ProductQuery {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub featured: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<CategoryId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub per_page: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub search: Option<String>,
}

impl ProductQuery {
    /// Featured products only.
    #[must_use]
    pub fn featured() -> Self {
        Self {
            featured: Some(true),
            ..Self::default()
        }
    }

    /// Products matching a search term.
    #[must_use]
    pub fn search(term: impl Into<String>) -> Self {
        Self {
            search: Some(term.into()),
            ..Self::default()
        }
    }
}

/// Filters for `GET /products/categories`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize)]
pub struct CategoryQuery {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hide_empty: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub per_page: Option<u32>,
}
