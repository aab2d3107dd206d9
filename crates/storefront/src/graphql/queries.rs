//! GraphQL query definitions for the WooGraphQL API.
//!
//! Operations live in `graphql/woo/queries/*.graphql` and are checked
//! against the schema excerpt in `graphql/woo/schema.graphql` at compile
//! time.

use graphql_client::GraphQLQuery;

// Cart queries and mutations
#[derive(GraphQLQuery)]
#[graphql(
    schema_path = "graphql/woo/schema.graphql",
    query_path = "graphql/woo/queries/cart.graphql",
    response_derives = "Debug, Clone"
)]
pub struct GetCart;

#[derive(GraphQLQuery)]
#[graphql(
    schema_path = "graphql/woo/schema.graphql",
    query_path = "graphql/woo/queries/cart.graphql",
    response_derives = "Debug, Clone"
)]
pub struct AddToCart;

#[derive(GraphQLQuery)]
#[graphql(
    schema_path = "graphql/woo/schema.graphql",
    query_path = "graphql/woo/queries/cart.graphql",
    response_derives = "Debug, Clone"
)]
pub struct UpdateItemQuantities;

#[derive(GraphQLQuery)]
#[graphql(
    schema_path = "graphql/woo/schema.graphql",
    query_path = "graphql/woo/queries/cart.graphql",
    response_derives = "Debug, Clone"
)]
pub struct RemoveItemsFromCart;

#[derive(GraphQLQuery)]
#[graphql(
    schema_path = "graphql/woo/schema.graphql",
    query_path = "graphql/woo/queries/cart.graphql",
    response_derives = "Debug, Clone"
)]
pub struct ApplyCoupon;

#[derive(GraphQLQuery)]
#[graphql(
    schema_path = "graphql/woo/schema.graphql",
    query_path = "graphql/woo/queries/cart.graphql",
    response_derives = "Debug, Clone"
)]
pub struct GetShippingMethods;

#[derive(GraphQLQuery)]
#[graphql(
    schema_path = "graphql/woo/schema.graphql",
    query_path = "graphql/woo/queries/cart.graphql",
    response_derives = "Debug, Clone"
)]
pub struct UpdateShippingMethod;

// Checkout
#[derive(GraphQLQuery)]
#[graphql(
    schema_path = "graphql/woo/schema.graphql",
    query_path = "graphql/woo/queries/checkout.graphql",
    response_derives = "Debug, Clone"
)]
pub struct Checkout;

// Product queries
#[derive(GraphQLQuery)]
#[graphql(
    schema_path = "graphql/woo/schema.graphql",
    query_path = "graphql/woo/queries/products.graphql",
    response_derives = "Debug, Clone"
)]
pub struct FeaturedProducts;

#[derive(GraphQLQuery)]
#[graphql(
    schema_path = "graphql/woo/schema.graphql",
    query_path = "graphql/woo/queries/products.graphql",
    response_derives = "Debug, Clone"
)]
pub struct GetProduct;

// Auth mutations. Login and refresh responses carry tokens, so they do not
// derive Debug.
#[derive(GraphQLQuery)]
#[graphql(
    schema_path = "graphql/woo/schema.graphql",
    query_path = "graphql/woo/queries/auth.graphql"
)]
pub struct Login;

#[derive(GraphQLQuery)]
#[graphql(
    schema_path = "graphql/woo/schema.graphql",
    query_path = "graphql/woo/queries/auth.graphql",
    response_derives = "Debug, Clone"
)]
pub struct RegisterUser;

#[derive(GraphQLQuery)]
#[graphql(
    schema_path = "graphql/woo/schema.graphql",
    query_path = "graphql/woo/queries/auth.graphql"
)]
pub struct RefreshToken;

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_build_query_carries_operation_name() {
        let body = GetCart::build_query(get_cart::Variables);
        assert_eq!(body.operation_name, "GetCart");
        assert!(body.query.contains("fragment SimpleCartProduct on SimpleProduct"));
        assert!(body.query.contains("...SimpleCartProduct"));
    }

    #[test]
    fn test_add_to_cart_variables_are_camel_case() {
        let body = AddToCart::build_query(add_to_cart::Variables {
            input: add_to_cart::AddToCartInput {
                client_mutation_id: None,
                product_id: 12,
                quantity: Some(1),
                variation_id: None,
            },
        });
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["variables"]["input"]["productId"], 12);
        assert_eq!(json["operationName"], "AddToCart");
    }

    #[test]
    fn test_product_query_looks_up_by_database_id() {
        let body = GetProduct::build_query(get_product::Variables {
            id: "7".to_string(),
        });
        assert!(body.query.contains("fragment SimpleProductFields on SimpleProduct"));
        assert!(body.query.contains("idType: DATABASE_ID"));
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["variables"]["id"], "7");
    }
}
