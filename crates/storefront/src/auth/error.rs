//! Authentication error types.

use thiserror::Error;

use crate::graphql::WooError;
use crate::storage::StorageError;

/// Errors that can occur during authentication operations.
#[derive(Debug, Error)]
pub enum AuthError {
    /// Invalid email format.
    #[error("invalid email: {0}")]
    InvalidEmail(String),

    /// Password too weak or invalid.
    #[error("password validation failed: {0}")]
    WeakPassword(String),

    /// The server rejected the username or password.
    #[error("invalid credentials")]
    InvalidCredentials,

    /// No refresh token is stored.
    #[error("not signed in")]
    NotSignedIn,

    /// WooGraphQL request failed.
    #[error("api error: {0}")]
    Api(#[from] WooError),

    /// Session slots could not be read or written.
    #[error("storage error: {0}")]
    Storage(#[from] StorageError),

    /// Profile could not be serialized for storage.
    #[error("serialization error: {0}")]
    Serialize(#[from] serde_json::Error),
}
