//! KP CLI - Command-line storefront.
//!
//! # Usage
//!
//! ```bash
//! # Browse the catalog
//! kp-cli products featured
//! kp-cli products search "rose quartz"
//! kp-cli products show 42
//!
//! # Work with the cart (local or remote, per KP_CART_MODE)
//! kp-cli cart add 42
//! kp-cli cart update 42 3
//! kp-cli cart show
//!
//! # Customer session
//! echo "$PASSWORD" | kp-cli auth login -u asha
//! kp-cli auth whoami
//!
//! # Spell out an amount
//! kp-cli words 2500.50
//! ```
//!
//! # Commands
//!
//! - `products` - Featured products, search, product details, categories
//! - `cart` - Show, add, update, remove; coupons, shipping, and checkout in remote mode
//! - `auth` - Login, register, logout, token refresh, current customer
//! - `words` - Amount in words

#![cfg_attr(not(test), forbid(unsafe_code))]

use clap::{Parser, Subcommand};
use kp_storefront::config::StorefrontConfig;
use kp_storefront::state::AppState;
use sentry::integrations::tracing as sentry_tracing;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod commands;

use commands::auth::AuthAction;
use commands::cart::CartAction;
use commands::products::ProductsAction;

#[derive(Parser)]
#[command(name = "kp-cli")]
#[command(version, about = "KP storefront CLI")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Browse the product catalog
    Products {
        #[command(subcommand)]
        action: ProductsAction,
    },
    /// Manage the cart
    Cart {
        #[command(subcommand)]
        action: CartAction,
    },
    /// Manage the customer session
    Auth {
        #[command(subcommand)]
        action: AuthAction,
    },
    /// Print an amount in words, e.g. "two thousand five hundred"
    Words {
        /// Amount, optionally with a currency symbol
        amount: String,
    },
}

/// Initialize Sentry error tracking and return guard that must be kept alive.
fn init_sentry(config: &StorefrontConfig) -> Option<sentry::ClientInitGuard> {
    let dsn = config.sentry_dsn.as_ref()?;

    let guard = sentry::init((
        dsn.as_str(),
        sentry::ClientOptions {
            release: sentry::release_name!(),
            environment: config
                .sentry_environment
                .clone()
                .map(std::borrow::Cow::Owned),
            attach_stacktrace: true,
            ..Default::default()
        },
    ));

    tracing::info!("Sentry initialized");
    Some(guard)
}

/// Filter tracing events to Sentry event types.
fn sentry_event_filter(metadata: &tracing::Metadata<'_>) -> sentry_tracing::EventFilter {
    match *metadata.level() {
        tracing::Level::ERROR | tracing::Level::WARN => sentry_tracing::EventFilter::Event,
        tracing::Level::INFO | tracing::Level::DEBUG => sentry_tracing::EventFilter::Breadcrumb,
        _ => sentry_tracing::EventFilter::Ignore,
    }
}

fn init_tracing() {
    // Defaults to info level for our crates if RUST_LOG is not set
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "kp_storefront=info,kp_cli=info".into());

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(sentry_tracing::layer().event_filter(sentry_event_filter))
        .init();
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    // Words needs no configuration or network
    if let Commands::Words { amount } = &cli.command {
        init_tracing();
        if let Err(e) = commands::words::run(amount) {
            e.report();
            std::process::exit(2);
        }
        return;
    }

    let config = match StorefrontConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            init_tracing();
            tracing::error!(error = %e, "Failed to load configuration");
            std::process::exit(2);
        }
    };

    // Sentry must be initialized before the tracing subscriber
    let _sentry_guard = init_sentry(&config);
    init_tracing();

    let state = AppState::new(config).await;
    let result = run(&state, cli.command).await;
    state.persist();

    if let Err(e) = result {
        e.report();
        std::process::exit(1);
    }
}

async fn run(state: &AppState, command: Commands) -> kp_storefront::Result<()> {
    match command {
        Commands::Products { action } => commands::products::run(state, action).await,
        Commands::Cart { action } => commands::cart::run(state, action).await,
        Commands::Auth { action } => commands::auth::run(state, action).await,
        Commands::Words { amount } => commands::words::run(&amount),
    }
}
