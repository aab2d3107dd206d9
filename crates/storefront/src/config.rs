//! Storefront configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Required
//! - `WORDPRESS_URL` - WordPress site URL; GraphQL is served at `{url}/graphql`
//! - `WOOCOMMERCE_CONSUMER_KEY` - WooCommerce REST API consumer key
//! - `WOOCOMMERCE_CONSUMER_SECRET` - WooCommerce REST API consumer secret
//!
//! ## Optional
//! - `WOOCOMMERCE_URL` - REST API site URL (default: `WORDPRESS_URL`)
//! - `WOOCOMMERCE_API_VERSION` - REST API version (default: v3)
//! - `STOREFRONT_ORIGIN` - `Origin` header sent to GraphQL (default: `WORDPRESS_URL`)
//! - `KP_CART_MODE` - `local` or `remote` (default: local)
//! - `KP_DATA_DIR` - Directory for locally persisted state (default: .kp)
//! - `SENTRY_DSN` - Sentry error tracking DSN
//! - `SENTRY_ENVIRONMENT` - Sentry environment name

use std::collections::HashMap;
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use secrecy::SecretString;
use thiserror::Error;
use url::Url;

const MIN_ENTROPY_BITS_PER_CHAR: f64 = 3.3;

/// Blocklist of common placeholder patterns (case-insensitive)
const PLACEHOLDER_PATTERNS: &[&str] = &[
    "your-",
    "changeme",
    "replace",
    "placeholder",
    "example",
    "password",
    "xxx",
    "todo",
    "fixme",
    "insert",
    "enter-",
    "put-your",
    "add-your",
];

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
    #[error("Insecure secret in {0}: {1}")]
    InsecureSecret(String, String),
}

/// How the cart is kept durable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CartMode {
    /// Cart lives in a local key-value slot; no network calls.
    #[default]
    Local,
    /// Cart lives on the WooCommerce server and is mirrored over GraphQL.
    Remote,
}

impl FromStr for CartMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "local" => Ok(Self::Local),
            "remote" => Ok(Self::Remote),
            other => Err(format!("expected `local` or `remote`, got `{other}`")),
        }
    }
}

impl fmt::Display for CartMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Local => f.write_str("local"),
            Self::Remote => f.write_str("remote"),
        }
    }
}

/// Storefront application configuration.
#[derive(Debug, Clone)]
pub struct StorefrontConfig {
    /// WooGraphQL API configuration
    pub graphql: GraphQLConfig,
    /// WooCommerce REST API configuration
    pub woocommerce: WooCommerceConfig,
    /// Cart persistence strategy
    pub cart_mode: CartMode,
    /// Directory holding locally persisted slots
    pub data_dir: PathBuf,
    /// Sentry DSN for error tracking
    pub sentry_dsn: Option<String>,
    /// Sentry environment name
    pub sentry_environment: Option<String>,
}

/// WooGraphQL endpoint configuration.
#[derive(Debug, Clone)]
pub struct GraphQLConfig {
    /// Full GraphQL endpoint URL
    pub endpoint: Url,
    /// Value of the `Origin` header
    pub origin: String,
}

/// WooCommerce REST API configuration.
///
/// Implements `Debug` manually to redact secret fields.
#[derive(Clone)]
pub struct WooCommerceConfig {
    /// Site URL (the REST API lives under `/wp-json/wc/`)
    pub base_url: Url,
    /// REST API version (e.g., v3)
    pub api_version: String,
    /// Consumer key
    pub consumer_key: SecretString,
    /// Consumer secret
    pub consumer_secret: SecretString,
}

impl fmt::Debug for WooCommerceConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WooCommerceConfig")
            .field("base_url", &self.base_url.as_str())
            .field("api_version", &self.api_version)
            .field("consumer_key", &"[REDACTED]")
            .field("consumer_secret", &"[REDACTED]")
            .finish()
    }
}

impl StorefrontConfig {
    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if required variables are missing, invalid, or
    /// if secrets fail validation (placeholder detection, entropy check).
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();
        Self::from_source(&|key: &str| std::env::var(key).ok())
    }

    /// Load configuration from an arbitrary variable source.
    ///
    /// # Errors
    ///
    /// Same as [`StorefrontConfig::from_env`].
    pub fn from_source(source: &dyn Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let env = Env(source);

        let wordpress_url = env.url("WORDPRESS_URL")?;
        let woocommerce_url = match env.optional("WOOCOMMERCE_URL") {
            Some(raw) => parse_url("WOOCOMMERCE_URL", &raw)?,
            None => wordpress_url.clone(),
        };

        let graphql = GraphQLConfig {
            endpoint: graphql_endpoint(&wordpress_url)?,
            origin: env
                .optional("STOREFRONT_ORIGIN")
                .unwrap_or_else(|| wordpress_url.as_str().trim_end_matches('/').to_string()),
        };

        let woocommerce = WooCommerceConfig {
            base_url: woocommerce_url,
            api_version: env.or_default("WOOCOMMERCE_API_VERSION", "v3"),
            consumer_key: SecretString::from(env.required("WOOCOMMERCE_CONSUMER_KEY")?),
            consumer_secret: env.validated_secret("WOOCOMMERCE_CONSUMER_SECRET")?,
        };

        let cart_mode = env
            .or_default("KP_CART_MODE", "local")
            .parse::<CartMode>()
            .map_err(|e| ConfigError::InvalidEnvVar("KP_CART_MODE".to_string(), e))?;

        Ok(Self {
            graphql,
            woocommerce,
            cart_mode,
            data_dir: PathBuf::from(env.or_default("KP_DATA_DIR", ".kp")),
            sentry_dsn: env.optional("SENTRY_DSN"),
            sentry_environment: env.optional("SENTRY_ENVIRONMENT"),
        })
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

struct Env<'a>(&'a dyn Fn(&str) -> Option<String>);

impl Env<'_> {
    /// Get an optional variable; empty values count as unset.
    fn optional(&self, key: &str) -> Option<String> {
        (self.0)(key).filter(|value| !value.trim().is_empty())
    }

    /// Get a required variable.
    fn required(&self, key: &str) -> Result<String, ConfigError> {
        self.optional(key)
            .ok_or_else(|| ConfigError::MissingEnvVar(key.to_string()))
    }

    /// Get a variable with a default value.
    fn or_default(&self, key: &str, default: &str) -> String {
        self.optional(key).unwrap_or_else(|| default.to_string())
    }

    fn url(&self, key: &str) -> Result<Url, ConfigError> {
        parse_url(key, &self.required(key)?)
    }

    /// Load and validate a secret.
    fn validated_secret(&self, key: &str) -> Result<SecretString, ConfigError> {
        let value = self.required(key)?;
        validate_secret_strength(&value, key)?;
        Ok(SecretString::from(value))
    }
}

fn parse_url(key: &str, raw: &str) -> Result<Url, ConfigError> {
    let url =
        Url::parse(raw).map_err(|e| ConfigError::InvalidEnvVar(key.to_string(), e.to_string()))?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(ConfigError::InvalidEnvVar(
            key.to_string(),
            format!("unsupported scheme `{}`", url.scheme()),
        ));
    }
    Ok(url)
}

/// `{wordpress_url}/graphql`, keeping any sub-path the site is mounted under.
fn graphql_endpoint(wordpress_url: &Url) -> Result<Url, ConfigError> {
    let raw = format!("{}/graphql", wordpress_url.as_str().trim_end_matches('/'));
    parse_url("WORDPRESS_URL", &raw)
}

/// Calculate Shannon entropy in bits per character.
fn shannon_entropy(s: &str) -> f64 {
    if s.is_empty() {
        return 0.0;
    }

    let mut freq: HashMap<char, usize> = HashMap::new();
    for c in s.chars() {
        *freq.entry(c).or_insert(0) += 1;
    }

    #[allow(clippy::cast_precision_loss)] // String length will never exceed f64 precision
    let len = s.chars().count() as f64;
    freq.values()
        .map(|&count| {
            #[allow(clippy::cast_precision_loss)] // Character count will never exceed f64 precision
            let p = count as f64 / len;
            -p * p.log2()
        })
        .sum()
}

/// Validate that a secret is not a placeholder and has sufficient entropy.
fn validate_secret_strength(secret: &str, var_name: &str) -> Result<(), ConfigError> {
    let lower = secret.to_lowercase();

    for pattern in PLACEHOLDER_PATTERNS {
        if lower.contains(pattern) {
            return Err(ConfigError::InsecureSecret(
                var_name.to_string(),
                format!("appears to be a placeholder (contains '{pattern}')"),
            ));
        }
    }

    // Real consumer secrets are random hex and clear this easily
    let entropy = shannon_entropy(secret);
    if entropy < MIN_ENTROPY_BITS_PER_CHAR {
        return Err(ConfigError::InsecureSecret(
            var_name.to_string(),
            format!(
                "entropy too low ({entropy:.2} bits/char, need >= {MIN_ENTROPY_BITS_PER_CHAR:.1}). Use the generated API secret."
            ),
        ));
    }

    Ok(())
}
