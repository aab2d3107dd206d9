//! Catalog browsing.

use clap::Subcommand;
use kp_core::{ProductId, format_price, parse_amount};
use kp_storefront::catalog::{Category, CategoryQuery, Product, ProductQuery};
use kp_storefront::state::AppState;

#[derive(Subcommand)]
pub enum ProductsAction {
    /// List featured products
    Featured,
    /// Search products by term
    Search {
        /// Search term
        term: String,
    },
    /// Show one product
    Show {
        /// WooCommerce product id
        id: i64,
    },
    /// List product categories
    Categories {
        /// Include categories without products
        #[arg(long)]
        all: bool,
    },
}

/// Run a catalog command.
///
/// # Errors
///
/// Returns an error if the catalog request fails.
pub async fn run(state: &AppState, action: ProductsAction) -> kp_storefront::Result<()> {
    let catalog = state.catalog();
    match action {
        ProductsAction::Featured => {
            let products = catalog.get_products(&ProductQuery::featured()).await?;
            print_products(&products);
        }
        ProductsAction::Search { term } => {
            let products = catalog.search_products(&term).await?;
            print_products(&products);
        }
        ProductsAction::Show { id } => {
            let product = catalog.get_product(ProductId::new(id)).await?;
            print_product(&product);
        }
        ProductsAction::Categories { all } => {
            let query = CategoryQuery {
                hide_empty: Some(!all),
                ..CategoryQuery::default()
            };
            let categories = catalog.get_categories(&query).await?;
            print_categories(&categories);
        }
    }
    Ok(())
}

fn display_price(raw: &str) -> String {
    parse_amount(raw).map_or_else(|_| raw.to_string(), format_price)
}

#[allow(clippy::print_stdout)]
fn print_products(products: &[Product]) {
    if products.is_empty() {
        println!("No products found.");
        return;
    }
    for product in products {
        println!(
            "{:>6}  {:<40}  {:>10}",
            product.id.to_string(),
            product.name,
            display_price(&product.price)
        );
    }
}

#[allow(clippy::print_stdout)]
fn print_product(product: &Product) {
    println!("{} (#{})", product.name, product.id);
    println!("  Price:  {}", display_price(&product.price));
    if product.on_sale {
        println!("  Was:    {}", display_price(&product.regular_price));
    }
    if let Some(status) = &product.stock_status {
        println!("  Stock:  {status}");
    }
    if !product.categories.is_empty() {
        let names: Vec<&str> = product.categories.iter().map(|c| c.name.as_str()).collect();
        println!("  In:     {}", names.join(", "));
    }
    if let Some(link) = &product.permalink {
        println!("  Link:   {link}");
    }
}

#[allow(clippy::print_stdout)]
fn print_categories(categories: &[Category]) {
    for category in categories {
        println!(
            "{:>6}  {:<30}  {:>4}",
            category.id.to_string(),
            category.name,
            category.count
        );
    }
}
