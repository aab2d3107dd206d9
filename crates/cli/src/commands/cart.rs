//! Cart commands.
//!
//! Add, update, and remove work with either cart backend. Coupons, shipping,
//! and checkout act on the server cart and need `KP_CART_MODE=remote`.

use clap::{Args, Subcommand};
use kp_core::{LineKey, ProductId, format_price};
use kp_storefront::StorefrontError;
use kp_storefront::cart::CartSnapshot;
use kp_storefront::config::CartMode;
use kp_storefront::graphql::{
    AppliedCoupon, CartTotals, CheckoutInput, CheckoutResult, CustomerAddressInput, ShippingPackage,
};
use kp_storefront::state::AppState;
use tracing::info;

#[derive(Subcommand)]
pub enum CartAction {
    /// Show the cart
    Show,
    /// Add one unit of a product
    Add {
        /// WooCommerce product id
        product_id: i64,
    },
    /// Set the quantity of a line (values below 1 become 1)
    Update {
        /// Line key shown by `cart show`
        key: String,
        /// New quantity
        #[arg(allow_negative_numbers = true)]
        quantity: i64,
    },
    /// Remove a line
    Remove {
        /// Line key shown by `cart show`
        key: String,
    },
    /// Apply a coupon code
    Coupon {
        /// Coupon code
        code: String,
    },
    /// List shipping rates, or choose one per package
    Shipping {
        /// Rate ids to select, one per package
        #[arg(long, value_delimiter = ',')]
        select: Vec<String>,
    },
    /// Place an order from the cart
    Checkout(CheckoutArgs),
}

#[derive(Args)]
pub struct CheckoutArgs {
    #[arg(long)]
    first_name: String,
    #[arg(long)]
    last_name: String,
    #[arg(long)]
    address: String,
    #[arg(long)]
    address2: Option<String>,
    #[arg(long)]
    city: String,
    #[arg(long)]
    state: String,
    #[arg(long)]
    postcode: String,
    #[arg(long, default_value = "IN")]
    country: String,
    #[arg(long)]
    email: String,
    #[arg(long)]
    phone: Option<String>,
    /// Payment gateway id
    #[arg(long, default_value = "cod")]
    payment_method: String,
    #[arg(long)]
    note: Option<String>,
}

impl From<CheckoutArgs> for CheckoutInput {
    fn from(args: CheckoutArgs) -> Self {
        Self {
            billing: CustomerAddressInput {
                first_name: args.first_name,
                last_name: args.last_name,
                address1: args.address,
                address2: args.address2,
                city: args.city,
                state: args.state,
                postcode: args.postcode,
                country: args.country,
                email: Some(args.email),
                phone: args.phone,
            },
            shipping: None,
            ship_to_different_address: false,
            payment_method: args.payment_method,
            customer_note: args.note,
            shipping_method: Vec::new(),
        }
    }
}

/// Run a cart command.
///
/// # Errors
///
/// Returns an error if a request fails, a product price is invalid, or a
/// server-only command is used with the local cart.
pub async fn run(state: &AppState, action: CartAction) -> kp_storefront::Result<()> {
    let cart = state.cart();
    match action {
        CartAction::Show => print_cart(&cart.read()),
        CartAction::Add { product_id } => {
            let product = state.catalog().get_product(ProductId::new(product_id)).await?;
            let snapshot = cart.add_item(&product.to_product_input()).await?;
            info!(product_id, count = snapshot.count, "Added to cart");
            print_cart(&snapshot);
        }
        CartAction::Update { key, quantity } => {
            let snapshot = cart.update_quantity(&LineKey::new(key), quantity).await?;
            print_cart(&snapshot);
        }
        CartAction::Remove { key } => {
            let snapshot = cart.remove_item(&LineKey::new(key)).await?;
            print_cart(&snapshot);
        }
        CartAction::Coupon { code } => {
            require_remote(state, "coupon")?;
            let result = state.graphql().apply_coupon(&code).await?;
            print_coupons(&result.applied);
            print_totals(&result.totals);
            cart.refresh().await?;
        }
        CartAction::Shipping { select } => {
            require_remote(state, "shipping")?;
            if select.is_empty() {
                let packages = state.graphql().get_shipping_methods().await?;
                print_packages(&packages);
            } else {
                let (packages, totals) = state.graphql().update_shipping_method(select).await?;
                print_packages(&packages);
                print_totals(&totals);
                cart.refresh().await?;
            }
        }
        CartAction::Checkout(args) => {
            require_remote(state, "checkout")?;
            if cart.read().is_empty() {
                return Err(StorefrontError::BadRequest("cart is empty".to_string()));
            }
            let result = state.graphql().checkout(args.into()).await?;
            print_checkout(&result);
            cart.refresh().await?;
        }
    }
    Ok(())
}

fn require_remote(state: &AppState, command: &str) -> kp_storefront::Result<()> {
    match state.config().cart_mode {
        CartMode::Remote => Ok(()),
        CartMode::Local => Err(StorefrontError::BadRequest(format!(
            "`cart {command}` needs KP_CART_MODE=remote"
        ))),
    }
}

#[allow(clippy::print_stdout)]
fn print_cart(snapshot: &CartSnapshot) {
    if snapshot.is_empty() {
        println!("Your cart is empty.");
        return;
    }
    for item in &snapshot.items {
        println!(
            "{:<14}  {:<36}  {:>3} x {:>10}  {:>10}",
            item.key.as_str(),
            item.name,
            item.quantity,
            format_price(item.unit_price),
            format_price(item.line_total())
        );
    }
    println!("{} item(s), total {}", snapshot.count, format_price(snapshot.total));
    if let Some(totals) = &snapshot.server_totals {
        print_totals(totals);
    }
}

#[allow(clippy::print_stdout)]
fn print_totals(totals: &CartTotals) {
    let rows = [
        ("Subtotal", totals.subtotal),
        ("Shipping", totals.shipping),
        ("Discount", totals.discount),
        ("Total", totals.total),
    ];
    for (label, amount) in rows {
        if let Some(amount) = amount {
            println!("  {label:<9} {:>10}", format_price(amount));
        }
    }
}

#[allow(clippy::print_stdout)]
fn print_coupons(applied: &[AppliedCoupon]) {
    for coupon in applied {
        match coupon.discount_amount {
            Some(amount) => println!("Coupon {} saves {}", coupon.code, format_price(amount)),
            None => println!("Coupon {} applied", coupon.code),
        }
    }
}

#[allow(clippy::print_stdout)]
fn print_packages(packages: &[ShippingPackage]) {
    if packages.is_empty() {
        println!("No shipping rates available.");
        return;
    }
    for (index, package) in packages.iter().enumerate() {
        println!(
            "Package {}: {}",
            index + 1,
            package.package_details.as_deref().unwrap_or("")
        );
        for rate in &package.rates {
            let cost = rate.cost.map(format_price).unwrap_or_default();
            println!(
                "  {:<24}  {:<30}  {cost:>8}",
                rate.id,
                rate.label.as_deref().unwrap_or("")
            );
        }
    }
}

#[allow(clippy::print_stdout)]
fn print_checkout(result: &CheckoutResult) {
    match &result.order {
        Some(order) => {
            let number = order.order_number.as_deref().unwrap_or(&order.id);
            println!("Order {number} placed.");
            if let Some(status) = &order.status {
                println!("  Status: {status}");
            }
            if let Some(total) = order.total {
                println!("  Total:  {}", format_price(total));
            }
        }
        None => println!("Checkout finished without an order."),
    }
    if let Some(redirect) = &result.redirect {
        println!("Complete payment at {redirect}");
    }
}
