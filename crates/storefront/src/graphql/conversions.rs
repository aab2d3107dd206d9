//! Conversions between generated GraphQL types and domain types.

use chrono::{DateTime, Utc};
use kp_core::{CustomerId, LineKey, ProductId, UserId, clamp_quantity, parse_amount};
use rust_decimal::Decimal;
use secrecy::{ExposeSecret, SecretString};
use serde::Serialize;
use tracing::warn;

use super::WooError;
use super::queries::{
    apply_coupon, checkout, featured_products, get_cart, get_product, get_shipping_methods, login,
    refresh_token, register_user, update_shipping_method,
};
use super::types::{
    AppliedCoupon, AuthCustomer, AuthUser, CartTotals, CatalogProduct, CheckoutInput,
    CheckoutResult, CouponResult, CustomerAddressInput, LoginPayload, PlacedOrder, RefreshPayload,
    RegisterInput, RegisteredUser, RemoteCart, RemoteCartItem, ShippingPackage, ShippingRate,
};

/// Parse a WooGraphQL money string, dropping values that are not amounts.
fn amount(raw: Option<&str>) -> Option<Decimal> {
    raw.and_then(|s| parse_amount(s).ok())
}

/// The wire name of a generated enum value.
fn enum_value<E: Serialize>(value: &E) -> Option<String> {
    match serde_json::to_value(value) {
        Ok(serde_json::Value::String(s)) => Some(s),
        _ => None,
    }
}

/// Parse a token expiration, sent as unix seconds or RFC 3339.
fn expiration(raw: Option<&str>) -> Option<DateTime<Utc>> {
    let raw = raw?.trim();
    raw.parse::<i64>()
        .ok()
        .and_then(|secs| DateTime::from_timestamp(secs, 0))
        .or_else(|| {
            DateTime::parse_from_rfc3339(raw)
                .ok()
                .map(|dt| dt.with_timezone(&Utc))
        })
}

// =============================================================================
// Cart
// =============================================================================

/// Product fields a cart line keeps.
struct LineProduct {
    id: ProductId,
    name: String,
    image_url: Option<String>,
    price: Option<String>,
}

/// The cart fragments for each product type share one shape.
macro_rules! line_product {
    ($product:expr) => {{
        let product = $product;
        LineProduct {
            id: ProductId::new(product.database_id),
            name: product.name.unwrap_or_default(),
            image_url: product.image.and_then(|i| i.source_url),
            price: product.price,
        }
    }};
}

fn convert_line_product(node: get_cart::GetCartCartContentsNodesProductNode) -> LineProduct {
    use get_cart::GetCartCartContentsNodesProductNode as Node;
    match node {
        Node::SimpleProduct(p) => line_product!(p),
        Node::VariableProduct(p) => line_product!(p),
        Node::ExternalProduct(p) => line_product!(p),
        Node::GroupProduct(p) => line_product!(p),
    }
}

pub fn convert_cart(cart: get_cart::GetCartCart) -> RemoteCart {
    let items = cart
        .contents
        .map(|c| c.nodes)
        .unwrap_or_default()
        .into_iter()
        .filter_map(convert_cart_item)
        .collect();

    RemoteCart {
        items,
        totals: CartTotals {
            subtotal: amount(cart.subtotal.as_deref()),
            shipping: amount(cart.shipping_total.as_deref()),
            discount: amount(cart.discount_total.as_deref()),
            total: amount(cart.total.as_deref()),
        },
    }
}

/// Lines whose product has been deleted come back without one; they are
/// skipped.
fn convert_cart_item(item: get_cart::GetCartCartContentsNodes) -> Option<RemoteCartItem> {
    let Some(edge) = item.product else {
        warn!(key = %item.key, "Skipping cart line without product");
        return None;
    };
    let product = convert_line_product(edge.node);

    Some(RemoteCartItem {
        key: LineKey::new(item.key),
        product_id: product.id,
        name: product.name,
        price: product.price,
        image_url: product.image_url,
        quantity: clamp_quantity(item.quantity.unwrap_or(1)),
        total: item.total,
    })
}

pub fn convert_coupon_cart(cart: apply_coupon::ApplyCouponApplyCouponCart) -> CouponResult {
    CouponResult {
        applied: cart
            .applied_coupons
            .unwrap_or_default()
            .into_iter()
            .flatten()
            .map(|c| AppliedCoupon {
                code: c.code,
                discount_amount: amount(Some(&c.discount_amount)),
            })
            .collect(),
        totals: CartTotals {
            subtotal: amount(cart.subtotal.as_deref()),
            shipping: None,
            discount: amount(cart.discount_total.as_deref()),
            total: amount(cart.total.as_deref()),
        },
    }
}

// =============================================================================
// Shipping
// =============================================================================

/// Implemented by each operation's copy of the `ShippingPackageFields`
/// fragment.
pub trait ShippingPackageData {
    fn into_package(self) -> ShippingPackage;
}

macro_rules! impl_shipping_package_data {
    ($($fragment:ty),+ $(,)?) => {$(
        impl ShippingPackageData for $fragment {
            fn into_package(self) -> ShippingPackage {
                ShippingPackage {
                    package_details: self.package_details,
                    rates: self
                        .rates
                        .unwrap_or_default()
                        .into_iter()
                        .flatten()
                        .map(|r| ShippingRate {
                            id: r.id,
                            label: r.label,
                            cost: amount(r.cost.as_deref()),
                        })
                        .collect(),
                }
            }
        }
    )+};
}

impl_shipping_package_data!(
    get_shipping_methods::ShippingPackageFields,
    update_shipping_method::ShippingPackageFields,
);

pub fn convert_shipping_packages<P: ShippingPackageData>(
    packages: Option<Vec<Option<P>>>,
) -> Vec<ShippingPackage> {
    packages
        .unwrap_or_default()
        .into_iter()
        .flatten()
        .map(ShippingPackageData::into_package)
        .collect()
}

// =============================================================================
// Checkout
// =============================================================================

fn convert_address(address: CustomerAddressInput) -> checkout::CustomerAddressInput {
    checkout::CustomerAddressInput {
        first_name: Some(address.first_name),
        last_name: Some(address.last_name),
        company: None,
        address1: Some(address.address1),
        address2: address.address2,
        city: Some(address.city),
        state: Some(address.state),
        postcode: Some(address.postcode),
        country: Some(checkout::CountriesEnum::Other(address.country)),
        email: address.email,
        phone: address.phone,
    }
}

pub fn convert_checkout_input(input: CheckoutInput) -> checkout::CheckoutInput {
    checkout::CheckoutInput {
        client_mutation_id: None,
        payment_method: Some(input.payment_method),
        shipping_method: (!input.shipping_method.is_empty())
            .then(|| input.shipping_method.into_iter().map(Some).collect()),
        ship_to_different_address: Some(input.ship_to_different_address),
        billing: Some(convert_address(input.billing)),
        shipping: input.shipping.map(convert_address),
        customer_note: input.customer_note,
    }
}

pub fn convert_checkout(payload: checkout::CheckoutCheckout) -> CheckoutResult {
    CheckoutResult {
        order: payload.order.map(|o| PlacedOrder {
            id: o.id,
            order_key: o.order_key,
            order_number: o.order_number,
            status: o.status.as_ref().and_then(enum_value),
            total: amount(o.total.as_deref()),
        }),
        result: payload.result,
        redirect: payload.redirect,
    }
}

// =============================================================================
// Products
// =============================================================================

/// Implemented by each operation's copy of the product fragments and by the
/// product node enums that hold them.
pub trait ProductData {
    fn into_product(self) -> CatalogProduct;
}

macro_rules! impl_product_data {
    (@product $product:ident, $stock_status:expr, $stock_quantity:expr) => {{
        let (image_url, image_alt) = $product
            .image
            .map_or((None, None), |i| (i.source_url, i.alt_text));
        CatalogProduct {
            id: $product.id,
            database_id: ProductId::new($product.database_id),
            name: $product.name.unwrap_or_default(),
            on_sale: $product.on_sale.unwrap_or(false),
            description: $product.description,
            image_url,
            image_alt,
            price: $product.price,
            regular_price: $product.regular_price,
            sale_price: $product.sale_price,
            stock_status: $stock_status,
            stock_quantity: $stock_quantity,
        }
    }};
    (stocked: $($fragment:ty),+ $(,)?) => {$(
        impl ProductData for $fragment {
            fn into_product(self) -> CatalogProduct {
                let product = self;
                let stock_status = product.stock_status.as_ref().and_then(enum_value);
                let stock_quantity = product.stock_quantity;
                impl_product_data!(@product product, stock_status, stock_quantity)
            }
        }
    )+};
    (unstocked: $($fragment:ty),+ $(,)?) => {$(
        impl ProductData for $fragment {
            fn into_product(self) -> CatalogProduct {
                let product = self;
                impl_product_data!(@product product, None, None)
            }
        }
    )+};
    (nodes: $($node:ident::$enum:ident),+ $(,)?) => {$(
        impl ProductData for $node::$enum {
            fn into_product(self) -> CatalogProduct {
                match self {
                    Self::SimpleProduct(p) => p.into_product(),
                    Self::VariableProduct(p) => p.into_product(),
                    Self::ExternalProduct(p) => p.into_product(),
                    Self::GroupProduct(p) => p.into_product(),
                }
            }
        }
    )+};
}

impl_product_data!(stocked:
    featured_products::SimpleProductFields,
    featured_products::VariableProductFields,
    get_product::SimpleProductFields,
    get_product::VariableProductFields,
);
impl_product_data!(unstocked:
    featured_products::ExternalProductFields,
    featured_products::GroupProductFields,
    get_product::ExternalProductFields,
    get_product::GroupProductFields,
);
impl_product_data!(nodes:
    featured_products::FeaturedProductsProductsNodes,
    get_product::GetProductProduct,
);

pub fn convert_product<P: ProductData>(product: P) -> CatalogProduct {
    product.into_product()
}

// =============================================================================
// Auth
// =============================================================================

/// # Errors
///
/// Returns [`WooError::UserError`] if the payload lacks a token or user.
pub fn convert_login(payload: login::LoginLogin) -> Result<LoginPayload, WooError> {
    let auth_token = payload
        .auth_token
        .ok_or_else(|| WooError::UserError("login returned no auth token".to_string()))?;
    let refresh_token = payload
        .refresh_token
        .ok_or_else(|| WooError::UserError("login returned no refresh token".to_string()))?;
    let user = payload
        .user
        .ok_or_else(|| WooError::UserError("login returned no user".to_string()))?;

    Ok(LoginPayload {
        auth_token: SecretString::from(auth_token),
        auth_token_expires_at: expiration(payload.auth_token_expiration.as_deref()),
        refresh_token: SecretString::from(refresh_token),
        refresh_token_expires_at: expiration(payload.refresh_token_expiration.as_deref()),
        user: AuthUser {
            id: user.id,
            database_id: UserId::new(user.database_id),
            name: user.name,
            email: user.email,
            first_name: user.first_name,
            last_name: user.last_name,
            username: user.username,
        },
        customer: payload.customer.map(|c| AuthCustomer {
            id: c.id,
            database_id: c.database_id.map(CustomerId::new),
            email: c.email,
            first_name: c.first_name,
            last_name: c.last_name,
        }),
        session_token: payload.woo_session_token,
    })
}

pub fn convert_refresh(payload: refresh_token::RefreshTokenRefreshToken) -> RefreshPayload {
    let auth_token = payload.auth_token.map(SecretString::from);
    RefreshPayload {
        success: payload.success.unwrap_or(auth_token.is_some()) && auth_token.is_some(),
        auth_token,
        auth_token_expires_at: expiration(payload.auth_token_expiration.as_deref()),
    }
}

pub fn convert_register_input(input: RegisterInput) -> register_user::RegisterUserInput {
    register_user::RegisterUserInput {
        client_mutation_id: None,
        username: input.username,
        email: Some(input.email),
        password: Some(input.password.expose_secret().to_string()),
        first_name: input.first_name,
        last_name: input.last_name,
    }
}

pub fn convert_registered_user(
    user: register_user::RegisterUserRegisterUserUser,
) -> RegisteredUser {
    RegisteredUser {
        id: user.id,
        name: user.name,
        email: user.email,
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use super::*;

    #[test]
    fn test_convert_cart_from_response_json() {
        let json = r#"{
            "cart": {
                "contents": { "nodes": [
                    {
                        "key": "c4ca4238a0b923820dcc509a6f75849b",
                        "product": { "node": {
                            "__typename": "SimpleProduct",
                            "databaseId": 1,
                            "name": "Linen Dress",
                            "image": { "sourceUrl": "https://cdn.example/dress.jpg" },
                            "price": "&#8377;2,500.00"
                        }},
                        "quantity": 2,
                        "total": "&#8377;5,000.00"
                    },
                    {
                        "key": "eccbc87e4b5ce2fe28308fd9f2a7baf3",
                        "product": { "node": {
                            "__typename": "VariableProduct",
                            "databaseId": 3,
                            "name": "Kurta",
                            "image": null,
                            "price": "&#8377;900.00 - &#8377;1,200.00"
                        }},
                        "quantity": 1,
                        "total": "&#8377;900.00"
                    },
                    { "key": "orphan", "product": null, "quantity": 1, "total": "10" }
                ]},
                "total": "&#8377;6,000.00",
                "subtotal": "&#8377;5,900.00",
                "shippingTotal": "&#8377;100.00",
                "discountTotal": "&#8377;0.00"
            }
        }"#;
        let data: get_cart::ResponseData = serde_json::from_str(json).unwrap();
        let cart = convert_cart(data.cart.unwrap());

        assert_eq!(cart.items.len(), 2);
        let line = &cart.items[0];
        assert_eq!(line.key.as_str(), "c4ca4238a0b923820dcc509a6f75849b");
        assert_eq!(line.product_id, ProductId::new(1));
        assert_eq!(line.quantity, 2);
        assert_eq!(line.image_url.as_deref(), Some("https://cdn.example/dress.jpg"));
        assert_eq!(cart.items[1].product_id, ProductId::new(3));
        assert_eq!(cart.totals.total, Some(Decimal::from(6000)));
        assert_eq!(cart.totals.shipping, Some(Decimal::from(100)));

        let local = cart.to_cart().unwrap();
        assert_eq!(local.total(), Decimal::from(5900));
    }

    #[test]
    fn test_convert_shipping_skips_null_rates() {
        let json = r#"{
            "cart": { "availableShippingMethods": [
                { "packageDetails": "Linen Dress &times;1", "rates": [
                    { "id": "flat_rate:1", "cost": "100.00", "label": "Flat rate" },
                    null
                ]},
                null
            ]}
        }"#;
        let data: get_shipping_methods::ResponseData = serde_json::from_str(json).unwrap();
        let packages = convert_shipping_packages(data.cart.unwrap().available_shipping_methods);
        assert_eq!(packages.len(), 1);
        assert_eq!(packages[0].rates.len(), 1);
        assert_eq!(packages[0].rates[0].cost, Some(Decimal::from(100)));
    }

    #[test]
    fn test_convert_product_by_type() {
        let json = r#"{
            "product": {
                "__typename": "SimpleProduct",
                "id": "cHJvZHVjdDox",
                "databaseId": 1,
                "name": "Linen Dress",
                "onSale": true,
                "description": "<p>Handwoven.</p>",
                "image": { "sourceUrl": "https://cdn.example/dress.jpg", "altText": "Dress" },
                "price": "&#8377;2,000.00",
                "regularPrice": "&#8377;2,500.00",
                "salePrice": "&#8377;2,000.00",
                "stockStatus": "IN_STOCK",
                "stockQuantity": 4
            }
        }"#;
        let data: get_product::ResponseData = serde_json::from_str(json).unwrap();
        let product = convert_product(data.product.unwrap());
        assert_eq!(product.database_id, ProductId::new(1));
        assert!(product.on_sale);
        assert_eq!(product.image_alt.as_deref(), Some("Dress"));
        assert_eq!(product.stock_status.as_deref(), Some("IN_STOCK"));
        assert_eq!(product.stock_quantity, Some(4));

        let json = r#"{
            "products": { "nodes": [
                {
                    "__typename": "ExternalProduct",
                    "id": "cHJvZHVjdDo5",
                    "databaseId": 9,
                    "name": "Gift Card",
                    "onSale": null,
                    "description": null,
                    "image": null,
                    "price": "500",
                    "regularPrice": "500",
                    "salePrice": null
                }
            ]}
        }"#;
        let data: featured_products::ResponseData = serde_json::from_str(json).unwrap();
        let products: Vec<_> = data
            .products
            .unwrap()
            .nodes
            .into_iter()
            .map(convert_product)
            .collect();
        assert_eq!(products.len(), 1);
        assert_eq!(products[0].name, "Gift Card");
        assert!(!products[0].on_sale);
        assert_eq!(products[0].stock_status, None);
    }

    #[test]
    fn test_convert_checkout_input() {
        let input = CheckoutInput {
            billing: CustomerAddressInput {
                first_name: "Asha".to_string(),
                last_name: "Rao".to_string(),
                address1: "12 MG Road".to_string(),
                city: "Bengaluru".to_string(),
                state: "KA".to_string(),
                postcode: "560001".to_string(),
                country: "IN".to_string(),
                ..CustomerAddressInput::default()
            },
            payment_method: "cod".to_string(),
            shipping_method: vec!["flat_rate:1".to_string()],
            ..CheckoutInput::default()
        };
        let json = serde_json::to_value(convert_checkout_input(input)).unwrap();
        assert_eq!(json["paymentMethod"], "cod");
        assert_eq!(json["billing"]["address1"], "12 MG Road");
        assert_eq!(json["billing"]["country"], "IN");
        assert_eq!(json["shippingMethod"][0], "flat_rate:1");
        assert_eq!(json["shipToDifferentAddress"], false);
        assert!(json["shipping"].is_null());
    }

    #[test]
    fn test_convert_checkout_order_status() {
        let json = r#"{
            "checkout": {
                "clientMutationId": null,
                "order": {
                    "id": "b3JkZXI6MTA=",
                    "orderKey": "wc_order_abc",
                    "orderNumber": "10",
                    "status": "PROCESSING",
                    "total": "&#8377;2,600.00"
                },
                "result": "success",
                "redirect": null
            }
        }"#;
        let data: checkout::ResponseData = serde_json::from_str(json).unwrap();
        let result = convert_checkout(data.checkout.unwrap());
        let order = result.order.unwrap();
        assert_eq!(order.status.as_deref(), Some("PROCESSING"));
        assert_eq!(order.total, Some(Decimal::from(2600)));
        assert_eq!(result.result.as_deref(), Some("success"));
    }

    #[test]
    fn test_convert_login_requires_tokens() {
        let json = r#"{
            "login": {
                "authToken": "jwt-auth",
                "authTokenExpiration": "1767225600",
                "refreshToken": "jwt-refresh",
                "refreshTokenExpiration": null,
                "user": {
                    "id": "dXNlcjox", "databaseId": 7, "name": "Asha",
                    "email": "asha@example.com", "firstName": null, "lastName": null,
                    "username": "asha"
                },
                "wooSessionToken": "woo-session",
                "customer": null
            }
        }"#;
        let data: login::ResponseData = serde_json::from_str(json).unwrap();
        let payload = convert_login(data.login.unwrap()).unwrap();
        assert_eq!(payload.auth_token.expose_secret(), "jwt-auth");
        assert_eq!(payload.user.database_id, UserId::new(7));
        assert_eq!(
            payload.auth_token_expires_at.map(|t| t.timestamp()),
            Some(1_767_225_600)
        );
        assert_eq!(payload.session_token.as_deref(), Some("woo-session"));

        let json = r#"{ "login": {
            "authToken": null, "authTokenExpiration": null,
            "refreshToken": null, "refreshTokenExpiration": null,
            "user": null, "wooSessionToken": null, "customer": null
        } }"#;
        let data: login::ResponseData = serde_json::from_str(json).unwrap();
        assert!(matches!(
            convert_login(data.login.unwrap()),
            Err(WooError::UserError(_))
        ));
    }

    #[test]
    fn test_convert_refresh_without_token_is_failure() {
        let payload = refresh_token::RefreshTokenRefreshToken {
            auth_token: None,
            auth_token_expiration: None,
            success: Some(true),
        };
        assert!(!convert_refresh(payload).success);
    }

    #[test]
    fn test_convert_register_input_sends_password() {
        let input = RegisterInput {
            username: "asha".to_string(),
            email: "asha@example.com".to_string(),
            password: SecretString::from("hunter2-long"),
            first_name: None,
            last_name: None,
        };
        let json = serde_json::to_value(convert_register_input(input)).unwrap();
        assert_eq!(json["username"], "asha");
        assert_eq!(json["password"], "hunter2-long");
    }

    #[test]
    fn test_expiration_formats() {
        assert!(expiration(Some("2026-01-01T00:00:00Z")).is_some());
        assert!(expiration(Some("soon")).is_none());
        assert!(expiration(None).is_none());
    }
}
