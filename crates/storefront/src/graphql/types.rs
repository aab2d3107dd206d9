//! Domain types for the WooGraphQL API.
//!
//! These types provide a clean API separate from the raw response shapes in
//! [`super::queries`].

use chrono::{DateTime, Utc};
use kp_core::{Cart, CustomerId, LineItem, LineKey, PriceError, ProductId, UserId, parse_amount};
use rust_decimal::Decimal;
use secrecy::SecretString;
use serde::{Deserialize, Serialize};

// =============================================================================
// Cart Types
// =============================================================================

/// Server-reported cart totals.
///
/// WooGraphQL returns formatted strings; amounts that fail to parse are
/// left as `None` rather than guessed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartTotals {
    pub subtotal: Option<Decimal>,
    pub shipping: Option<Decimal>,
    pub discount: Option<Decimal>,
    pub total: Option<Decimal>,
}

/// One entry of the server-side cart.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteCartItem {
    /// Server-issued entry key.
    pub key: LineKey,
    pub product_id: ProductId,
    pub name: String,
    /// Unit price as reported by the product (display string).
    pub price: Option<String>,
    pub image_url: Option<String>,
    pub quantity: u32,
    /// Line total (display string).
    pub total: Option<String>,
}

impl RemoteCartItem {
    /// Convert to a local line item.
    ///
    /// The unit price comes from the product price when it parses, otherwise
    /// from the line total divided by the quantity.
    ///
    /// # Errors
    ///
    /// Returns a [`PriceError`] if neither price yields an amount.
    pub fn to_line_item(&self) -> Result<LineItem, PriceError> {
        let quantity = self.quantity.max(1);
        let unit_price = match (self.price.as_deref().map(parse_amount), self.total.as_deref()) {
            (Some(Ok(price)), _) => price,
            (_, Some(total)) => parse_amount(total)? / Decimal::from(quantity),
            (Some(Err(e)), None) => return Err(e),
            (None, None) => return Err(PriceError::Empty),
        };
        Ok(LineItem {
            key: self.key.clone(),
            product_id: self.product_id,
            name: self.name.clone(),
            unit_price,
            quantity,
            image_url: self.image_url.clone(),
        })
    }
}

/// The authoritative server-side cart.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RemoteCart {
    pub items: Vec<RemoteCartItem>,
    pub totals: CartTotals,
}

impl RemoteCart {
    /// Convert to the local cart shape, preserving server order and keys.
    ///
    /// # Errors
    ///
    /// Returns a [`PriceError`] if any line has no usable price.
    pub fn to_cart(&self) -> Result<Cart, PriceError> {
        let items = self
            .items
            .iter()
            .map(RemoteCartItem::to_line_item)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Cart::from_items(items))
    }
}

/// A coupon applied to the cart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppliedCoupon {
    pub code: String,
    pub discount_amount: Option<Decimal>,
}

/// Result of applying a coupon.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CouponResult {
    pub applied: Vec<AppliedCoupon>,
    pub totals: CartTotals,
}

/// A shipping rate offered for a package.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShippingRate {
    /// Rate id, passed back to select the method (e.g. `flat_rate:1`).
    pub id: String,
    pub label: Option<String>,
    pub cost: Option<Decimal>,
}

/// Shipping options for one package of the cart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShippingPackage {
    pub package_details: Option<String>,
    pub rates: Vec<ShippingRate>,
}

// =============================================================================
// Checkout Types
// =============================================================================

/// Billing or shipping address for checkout.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomerAddressInput {
    pub first_name: String,
    pub last_name: String,
    pub address1: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address2: Option<String>,
    pub city: String,
    pub state: String,
    pub postcode: String,
    /// ISO 3166-1 alpha-2 country code (e.g. `IN`).
    pub country: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
}

/// Input for placing an order from the current cart.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutInput {
    pub billing: CustomerAddressInput,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub shipping: Option<CustomerAddressInput>,
    pub ship_to_different_address: bool,
    /// Payment gateway id (e.g. `cod`, `razorpay`).
    pub payment_method: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub customer_note: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub shipping_method: Vec<String>,
}

/// An order created by checkout.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlacedOrder {
    pub id: String,
    pub order_key: Option<String>,
    pub order_number: Option<String>,
    pub status: Option<String>,
    pub total: Option<Decimal>,
}

/// Outcome of a checkout.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckoutResult {
    pub order: Option<PlacedOrder>,
    /// Gateway result, usually `success`.
    pub result: Option<String>,
    /// Payment gateway redirect URL, if the gateway needs one.
    pub redirect: Option<String>,
}

// =============================================================================
// Product Types
// =============================================================================

/// A product as returned by WooGraphQL product queries.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogProduct {
    /// GraphQL node id.
    pub id: String,
    pub database_id: ProductId,
    pub name: String,
    pub on_sale: bool,
    pub description: Option<String>,
    pub image_url: Option<String>,
    pub image_alt: Option<String>,
    /// Display price; a range for variable products.
    pub price: Option<String>,
    pub regular_price: Option<String>,
    pub sale_price: Option<String>,
    pub stock_status: Option<String>,
    pub stock_quantity: Option<i64>,
}

impl CatalogProduct {
    /// Descriptor for adding this product to a cart.
    ///
    /// A product without a price yields an empty price string, which the
    /// cart rejects.
    #[must_use]
    pub fn to_product_input(&self) -> kp_core::ProductInput {
        kp_core::ProductInput {
            id: self.database_id,
            name: self.name.clone(),
            price: self.price.clone().unwrap_or_default(),
            images: self
                .image_url
                .iter()
                .map(|src| kp_core::ProductImage { src: src.clone() })
                .collect(),
        }
    }
}

// =============================================================================
// Auth Types
// =============================================================================

/// A WordPress user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthUser {
    pub id: String,
    pub database_id: UserId,
    pub name: Option<String>,
    pub email: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub username: Option<String>,
}

/// The WooCommerce customer record linked to a user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthCustomer {
    pub id: String,
    pub database_id: Option<CustomerId>,
    pub email: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
}

/// Tokens and profile returned by a successful login.
#[derive(Debug, Clone)]
pub struct LoginPayload {
    pub auth_token: SecretString,
    pub auth_token_expires_at: Option<DateTime<Utc>>,
    pub refresh_token: SecretString,
    pub refresh_token_expires_at: Option<DateTime<Utc>>,
    pub user: AuthUser,
    pub customer: Option<AuthCustomer>,
    /// WooCommerce session token tying the server cart to this customer.
    pub session_token: Option<String>,
}

/// Result of exchanging a refresh token.
#[derive(Debug, Clone)]
pub struct RefreshPayload {
    pub success: bool,
    pub auth_token: Option<SecretString>,
    pub auth_token_expires_at: Option<DateTime<Utc>>,
}

/// Input for creating a customer account.
#[derive(Debug, Clone)]
pub struct RegisterInput {
    pub username: String,
    pub email: String,
    pub password: SecretString,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
}

/// A newly registered user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegisteredUser {
    pub id: String,
    pub name: Option<String>,
    pub email: Option<String>,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn item(price: Option<&str>, total: Option<&str>, quantity: u32) -> RemoteCartItem {
        RemoteCartItem {
            key: LineKey::new("a1b2"),
            product_id: ProductId::new(12),
            name: "Linen Dress".to_string(),
            price: price.map(str::to_string),
            image_url: None,
            quantity,
            total: total.map(str::to_string),
        }
    }

    #[test]
    fn test_unit_price_prefers_product_price() {
        let line = item(Some("&#8377;1,250.00"), Some("&#8377;5,000.00"), 2)
            .to_line_item()
            .unwrap();
        assert_eq!(line.unit_price, Decimal::from(1250));
        assert_eq!(line.key.as_str(), "a1b2");
    }

    #[test]
    fn test_unit_price_falls_back_to_line_total() {
        let line = item(Some("₹100 - ₹200"), Some("₹600.00"), 3)
            .to_line_item()
            .unwrap();
        assert_eq!(line.unit_price, Decimal::from(200));

        let line = item(None, Some("₹600.00"), 2).to_line_item().unwrap();
        assert_eq!(line.unit_price, Decimal::from(300));
    }

    #[test]
    fn test_unpriced_line_is_an_error() {
        assert!(item(None, None, 1).to_line_item().is_err());
        assert!(item(Some("free"), None, 1).to_line_item().is_err());
    }

    #[test]
    fn test_remote_cart_keeps_server_order() {
        let mut second = item(Some("10"), None, 1);
        second.key = LineKey::new("zz");
        second.product_id = ProductId::new(3);
        let remote = RemoteCart {
            items: vec![second, item(Some("20"), None, 2)],
            totals: CartTotals::default(),
        };
        let cart = remote.to_cart().unwrap();
        let keys: Vec<_> = cart.items().iter().map(|i| i.key.as_str()).collect();
        assert_eq!(keys, ["zz", "a1b2"]);
        assert_eq!(cart.total(), Decimal::from(50));
        assert_eq!(cart.count(), 3);
    }

    #[test]
    fn test_product_input_from_catalog_product() {
        let product = CatalogProduct {
            id: "cHJvZHVjdDox".to_string(),
            database_id: ProductId::new(1),
            name: "Kurta".to_string(),
            on_sale: false,
            description: None,
            image_url: Some("https://cdn.example/kurta.jpg".to_string()),
            image_alt: None,
            price: Some("₹899.00".to_string()),
            regular_price: None,
            sale_price: None,
            stock_status: None,
            stock_quantity: None,
        };
        let input = product.to_product_input();
        assert_eq!(input.images.len(), 1);
        assert_eq!(input.to_line_item().unwrap().unit_price, Decimal::from(899));
    }
}
