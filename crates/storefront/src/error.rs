//! Unified error handling with Sentry integration.
//!
//! Provides a unified `StorefrontError` for consumers of the library. Errors
//! that point at a failing backend are captured to Sentry by
//! [`StorefrontError::report`]; input errors are not.

use thiserror::Error;

use crate::auth::AuthError;
use crate::cart::CartError;
use crate::catalog::CatalogError;
use crate::config::ConfigError;
use crate::graphql::WooError;
use crate::storage::StorageError;

/// Library-level error type for the storefront.
#[derive(Debug, Error)]
pub enum StorefrontError {
    /// Configuration is missing or invalid.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Key-value storage failed.
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    /// REST catalog request failed.
    #[error("Catalog error: {0}")]
    Catalog(#[from] CatalogError),

    /// GraphQL request failed.
    #[error("GraphQL error: {0}")]
    GraphQL(#[from] WooError),

    /// Authentication operation failed.
    #[error("Auth error: {0}")]
    Auth(#[from] AuthError),

    /// Cart operation failed.
    #[error("Cart error: {0}")]
    Cart(#[from] CartError),

    /// Resource not found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Bad input from the caller.
    #[error("Bad request: {0}")]
    BadRequest(String),
}

impl StorefrontError {
    /// Whether the error points at a failing backend rather than bad input.
    #[must_use]
    pub const fn is_server_error(&self) -> bool {
        match self {
            Self::Storage(_) => true,
            Self::GraphQL(err) => !matches!(err, WooError::NotFound(_)),
            Self::Catalog(err) => !matches!(err, CatalogError::NotFound(_)),
            Self::Auth(err) => matches!(err, AuthError::Api(_) | AuthError::Storage(_)),
            Self::Cart(err) => !matches!(err, CartError::InvalidPrice { .. } | CartError::Overflow),
            Self::Config(_) | Self::NotFound(_) | Self::BadRequest(_) => false,
        }
    }

    /// Log the error and, for server errors, capture it to Sentry.
    pub fn report(&self) {
        if self.is_server_error() {
            let event_id = sentry::capture_error(self);
            tracing::error!(
                error = %self,
                sentry_event_id = %event_id,
                "Storefront error"
            );
        } else {
            tracing::warn!(error = %self, "Request failed");
        }
    }
}

/// Result type alias for `StorefrontError`.
pub type Result<T> = std::result::Result<T, StorefrontError>;

/// Set the Sentry user context from a user ID.
///
/// Call this after successful authentication to associate errors with users.
pub fn set_sentry_user(user_id: &impl ToString, email: Option<&str>) {
    sentry::configure_scope(|scope| {
        scope.set_user(Some(sentry::User {
            id: Some(user_id.to_string()),
            email: email.map(String::from),
            ..Default::default()
        }));
    });
}

/// Clear the Sentry user context.
pub fn clear_sentry_user() {
    sentry::configure_scope(|scope| {
        scope.set_user(None);
    });
}

/// Add a breadcrumb for user actions.
///
/// Breadcrumbs appear in Sentry error reports to show the trail of user actions
/// leading up to an error.
///
/// # Example
///
/// ```rust,ignore
/// add_breadcrumb("cart", "add", Some(&[("key", "42")]));
/// ```
pub fn add_breadcrumb(category: &str, message: &str, data: Option<&[(&str, &str)]>) {
    let mut breadcrumb = sentry::Breadcrumb {
        category: Some(category.to_string()),
        message: Some(message.to_string()),
        level: sentry::Level::Info,
        ..Default::default()
    };

    if let Some(pairs) = data {
        for (key, value) in pairs {
            breadcrumb.data.insert(
                (*key).to_string(),
                serde_json::Value::String((*value).to_string()),
            );
        }
    }

    sentry::add_breadcrumb(breadcrumb);
}
