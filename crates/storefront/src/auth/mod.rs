//! Customer session management.
//!
//! Logs customers in against WooGraphQL and keeps the resulting tokens and
//! profile in key-value slots, so a later process can pick the session up
//! again with [`AuthSession::restore`]. The bearer token is handed to the
//! GraphQL client through the [`AuthApi`] seam.

mod error;

pub use error::AuthError;

use std::sync::{Arc, PoisonError, RwLock};

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use tracing::{error, info, instrument, warn};

use crate::error::{clear_sentry_user, set_sentry_user};
use crate::graphql::{
    AuthCustomer, AuthUser, GraphQLClient, LoginPayload, RefreshPayload, RegisterInput,
    RegisteredUser, WooError,
};
use crate::storage::KeyValueStore;

/// Slot holding the bearer token.
pub const TOKEN_SLOT: &str = "kp-auth-token";
/// Slot holding the refresh token.
pub const REFRESH_TOKEN_SLOT: &str = "kp-refresh-token";
/// Slot holding the signed-in user as JSON.
pub const USER_SLOT: &str = "kp-user";
/// Slot holding the linked customer as JSON.
pub const CUSTOMER_SLOT: &str = "kp-customer";
/// Slot holding the WooCommerce session token.
pub const WOO_SESSION_SLOT: &str = "kp-woo-session";

/// Minimum password length.
const MIN_PASSWORD_LENGTH: usize = 8;

/// Login error codes WooGraphQL reports for bad credentials.
const CREDENTIAL_ERROR_CODES: &[&str] = &["invalid_username", "invalid_email", "incorrect_password"];

/// The auth operations the session needs from the API.
#[async_trait]
pub trait AuthApi: Send + Sync {
    async fn login(&self, username: &str, password: &SecretString)
    -> Result<LoginPayload, WooError>;

    async fn register(&self, input: RegisterInput) -> Result<RegisteredUser, WooError>;

    async fn refresh_token(&self, token: &SecretString) -> Result<RefreshPayload, WooError>;

    /// Set or clear the bearer token on subsequent requests.
    fn set_auth_token(&self, token: Option<SecretString>);

    /// Set or clear the WooCommerce session token.
    fn set_session_token(&self, token: Option<String>);

    /// The session token most recently issued by the server.
    fn session_token(&self) -> Option<String>;
}

#[async_trait]
impl AuthApi for GraphQLClient {
    async fn login(
        &self,
        username: &str,
        password: &SecretString,
    ) -> Result<LoginPayload, WooError> {
        Self::login(self, username, password).await
    }

    async fn register(&self, input: RegisterInput) -> Result<RegisteredUser, WooError> {
        Self::register(self, input).await
    }

    async fn refresh_token(&self, token: &SecretString) -> Result<RefreshPayload, WooError> {
        Self::refresh_token(self, token).await
    }

    fn set_auth_token(&self, token: Option<SecretString>) {
        Self::set_auth_token(self, token);
    }

    fn set_session_token(&self, token: Option<String>) {
        Self::set_session_token(self, token);
    }

    fn session_token(&self) -> Option<String> {
        Self::session_token(self)
    }
}

/// The signed-in customer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignedIn {
    pub user: AuthUser,
    pub customer: Option<AuthCustomer>,
}

/// Login state backed by key-value slots.
pub struct AuthSession {
    api: Arc<dyn AuthApi>,
    store: Arc<dyn KeyValueStore>,
    current: RwLock<Option<SignedIn>>,
}

impl std::fmt::Debug for AuthSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthSession")
            .field("current", &self.current())
            .finish_non_exhaustive()
    }
}

impl AuthSession {
    /// Create a signed-out session. Call [`Self::restore`] to load stored state.
    #[must_use]
    pub fn new(api: Arc<dyn AuthApi>, store: Arc<dyn KeyValueStore>) -> Self {
        Self {
            api,
            store,
            current: RwLock::new(None),
        }
    }

    /// The signed-in customer, if any.
    #[must_use]
    pub fn current(&self) -> Option<SignedIn> {
        self.current
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Whether a customer is signed in.
    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        self.current
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .is_some()
    }

    fn set_current(&self, signed_in: Option<SignedIn>) {
        *self
            .current
            .write()
            .unwrap_or_else(PoisonError::into_inner) = signed_in;
    }

    fn read_slot(&self, key: &str) -> Option<String> {
        match self.store.get(key) {
            Ok(value) => value.filter(|v| !v.is_empty()),
            Err(e) => {
                warn!(error = %e, slot = key, "Failed to read session slot");
                None
            }
        }
    }

    /// Load a stored session.
    ///
    /// The session is restored only when both the token and the user
    /// profile are present and the profile parses; anything else leaves the
    /// session signed out. A stored WooCommerce session token is handed to
    /// the API either way, so a guest cart carries over.
    ///
    /// Returns whether a customer is now signed in.
    #[instrument(skip(self))]
    pub fn restore(&self) -> bool {
        if let Some(session) = self.read_slot(WOO_SESSION_SLOT) {
            self.api.set_session_token(Some(session));
        }

        let (Some(token), Some(user_json)) = (self.read_slot(TOKEN_SLOT), self.read_slot(USER_SLOT))
        else {
            return false;
        };

        let user: AuthUser = match serde_json::from_str(&user_json) {
            Ok(user) => user,
            Err(e) => {
                warn!(error = %e, "Stored user profile is malformed; staying signed out");
                return false;
            }
        };
        let customer = self.read_slot(CUSTOMER_SLOT).and_then(|json| {
            serde_json::from_str::<AuthCustomer>(&json)
                .inspect_err(|e| warn!(error = %e, "Stored customer profile is malformed"))
                .ok()
        });

        self.api.set_auth_token(Some(SecretString::from(token)));
        set_sentry_user(&user.database_id, user.email.as_deref());
        info!(user_id = %user.database_id, "Session restored");
        self.set_current(Some(SignedIn { user, customer }));
        true
    }

    /// Log in with a username (or email) and password.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::InvalidCredentials`] if the server rejects the
    /// credentials, or another error if the request or storage fails.
    #[instrument(skip(self, password))]
    pub async fn login(
        &self,
        username: &str,
        password: &SecretString,
    ) -> Result<SignedIn, AuthError> {
        let payload = self
            .api
            .login(username, password)
            .await
            .map_err(|e| match e {
                WooError::GraphQL(ref errors)
                    if errors.iter().any(|err| {
                        CREDENTIAL_ERROR_CODES
                            .iter()
                            .any(|code| err.message.contains(code))
                    }) =>
                {
                    AuthError::InvalidCredentials
                }
                other => AuthError::Api(other),
            })?;

        self.store
            .put(TOKEN_SLOT, payload.auth_token.expose_secret())?;
        self.store
            .put(REFRESH_TOKEN_SLOT, payload.refresh_token.expose_secret())?;
        self.store
            .put(USER_SLOT, &serde_json::to_string(&payload.user)?)?;
        match &payload.customer {
            Some(customer) => self
                .store
                .put(CUSTOMER_SLOT, &serde_json::to_string(customer)?)?,
            None => self.store.delete(CUSTOMER_SLOT)?,
        }

        self.api.set_auth_token(Some(payload.auth_token));
        if let Some(session) = payload.session_token {
            self.store.put(WOO_SESSION_SLOT, &session)?;
            self.api.set_session_token(Some(session));
        }

        set_sentry_user(&payload.user.database_id, payload.user.email.as_deref());
        info!(user_id = %payload.user.database_id, "Logged in");

        let signed_in = SignedIn {
            user: payload.user,
            customer: payload.customer,
        };
        self.set_current(Some(signed_in.clone()));
        Ok(signed_in)
    }

    /// Create a customer account. Does not log in.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::InvalidEmail`] or [`AuthError::WeakPassword`] for
    /// bad input, or [`AuthError::Api`] if the server rejects it.
    #[instrument(skip(self, input), fields(username = %input.username))]
    pub async fn register(&self, input: RegisterInput) -> Result<RegisteredUser, AuthError> {
        validate_email(&input.email)?;
        validate_password(input.password.expose_secret())?;

        let user = self.api.register(input).await?;
        info!(user_id = %user.id, "Registered");
        Ok(user)
    }

    /// Sign out and forget every stored credential.
    #[instrument(skip(self))]
    pub fn logout(&self) {
        for slot in [
            TOKEN_SLOT,
            REFRESH_TOKEN_SLOT,
            USER_SLOT,
            CUSTOMER_SLOT,
            WOO_SESSION_SLOT,
        ] {
            if let Err(e) = self.store.delete(slot) {
                error!(error = %e, slot, "Failed to remove session slot");
            }
        }
        self.api.set_auth_token(None);
        self.api.set_session_token(None);
        self.set_current(None);
        clear_sentry_user();
        info!("Logged out");
    }

    /// Exchange the stored refresh token for a new auth token.
    ///
    /// Returns `true` on success. A missing refresh token, a rejected
    /// refresh, or a failed request all sign the customer out and return
    /// `false`.
    #[instrument(skip(self))]
    pub async fn refresh(&self) -> bool {
        let Some(refresh_token) = self.read_slot(REFRESH_TOKEN_SLOT) else {
            self.logout();
            return false;
        };

        match self
            .api
            .refresh_token(&SecretString::from(refresh_token))
            .await
        {
            Ok(RefreshPayload {
                success: true,
                auth_token: Some(token),
                ..
            }) => {
                if let Err(e) = self.store.put(TOKEN_SLOT, token.expose_secret()) {
                    error!(error = %e, "Failed to store refreshed token");
                }
                self.api.set_auth_token(Some(token));
                info!("Auth token refreshed");
                true
            }
            Ok(_) => {
                warn!("Refresh token rejected");
                self.logout();
                false
            }
            Err(e) => {
                error!(error = %e, "Token refresh failed");
                self.logout();
                false
            }
        }
    }

    /// Store the WooCommerce session token the API currently holds.
    ///
    /// Call after cart operations so the next process resumes the same
    /// server-side cart.
    pub fn persist_woo_session(&self) {
        let result = match self.api.session_token() {
            Some(token) => self.store.put(WOO_SESSION_SLOT, &token),
            None => Ok(()),
        };
        if let Err(e) = result {
            error!(error = %e, "Failed to store WooCommerce session");
        }
    }
}

fn validate_email(email: &str) -> Result<(), AuthError> {
    let valid = email
        .split_once('@')
        .is_some_and(|(local, domain)| !local.is_empty() && domain.contains('.'));
    if valid {
        Ok(())
    } else {
        Err(AuthError::InvalidEmail(email.to_string()))
    }
}

fn validate_password(password: &str) -> Result<(), AuthError> {
    if password.chars().count() < MIN_PASSWORD_LENGTH {
        return Err(AuthError::WeakPassword(format!(
            "password must be at least {MIN_PASSWORD_LENGTH} characters"
        )));
    }
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::graphql::GraphQLError;
    use crate::storage::MemoryStore;
    use kp_core::UserId;
    use std::sync::Mutex;

    #[derive(Default)]
    struct FakeAuthApi {
        auth_token: Mutex<Option<String>>,
        session_token: Mutex<Option<String>>,
        refresh_ok: bool,
        refresh_calls: Mutex<u32>,
    }

    fn user() -> AuthUser {
        AuthUser {
            id: "dXNlcjo3".to_string(),
            database_id: UserId::new(7),
            name: Some("Asha".to_string()),
            email: Some("asha@example.com".to_string()),
            first_name: Some("Asha".to_string()),
            last_name: None,
            username: Some("asha".to_string()),
        }
    }

    #[async_trait]
    impl AuthApi for FakeAuthApi {
        async fn login(
            &self,
            username: &str,
            password: &SecretString,
        ) -> Result<LoginPayload, WooError> {
            if username != "asha" || password.expose_secret() != "correct horse" {
                return Err(WooError::GraphQL(vec![GraphQLError {
                    message: "incorrect_password".to_string(),
                    locations: vec![],
                    path: vec![],
                }]));
            }
            Ok(LoginPayload {
                auth_token: SecretString::from("auth-1"),
                auth_token_expires_at: None,
                refresh_token: SecretString::from("refresh-1"),
                refresh_token_expires_at: None,
                user: user(),
                customer: None,
                session_token: Some("woo-1".to_string()),
            })
        }

        async fn register(&self, input: RegisterInput) -> Result<RegisteredUser, WooError> {
            Ok(RegisteredUser {
                id: "dXNlcjo4".to_string(),
                name: Some(input.username),
                email: Some(input.email),
            })
        }

        async fn refresh_token(&self, token: &SecretString) -> Result<RefreshPayload, WooError> {
            *self.refresh_calls.lock().unwrap() += 1;
            assert_eq!(token.expose_secret(), "refresh-1");
            Ok(RefreshPayload {
                success: self.refresh_ok,
                auth_token: self.refresh_ok.then(|| SecretString::from("auth-2")),
                auth_token_expires_at: None,
            })
        }

        fn set_auth_token(&self, token: Option<SecretString>) {
            *self.auth_token.lock().unwrap() = token.map(|t| t.expose_secret().to_string());
        }

        fn set_session_token(&self, token: Option<String>) {
            *self.session_token.lock().unwrap() = token;
        }

        fn session_token(&self) -> Option<String> {
            self.session_token.lock().unwrap().clone()
        }
    }

    fn session(refresh_ok: bool) -> (AuthSession, Arc<FakeAuthApi>, Arc<MemoryStore>) {
        let api = Arc::new(FakeAuthApi {
            refresh_ok,
            ..FakeAuthApi::default()
        });
        let store = Arc::new(MemoryStore::new());
        (
            AuthSession::new(api.clone(), store.clone()),
            api,
            store,
        )
    }

    #[tokio::test]
    async fn test_login_persists_tokens_and_profile() {
        let (auth, api, store) = session(true);
        let signed_in = auth
            .login("asha", &SecretString::from("correct horse"))
            .await
            .unwrap();

        assert_eq!(signed_in.user.database_id, UserId::new(7));
        assert!(auth.is_authenticated());
        assert_eq!(store.get(TOKEN_SLOT).unwrap().as_deref(), Some("auth-1"));
        assert_eq!(
            store.get(REFRESH_TOKEN_SLOT).unwrap().as_deref(),
            Some("refresh-1")
        );
        assert!(store.get(USER_SLOT).unwrap().is_some());
        assert!(store.get(CUSTOMER_SLOT).unwrap().is_none());
        assert_eq!(api.auth_token.lock().unwrap().as_deref(), Some("auth-1"));
        assert_eq!(api.session_token().as_deref(), Some("woo-1"));
    }

    #[tokio::test]
    async fn test_login_with_wrong_password() {
        let (auth, api, store) = session(true);
        let err = auth
            .login("asha", &SecretString::from("wrong"))
            .await
            .unwrap_err();

        assert!(matches!(err, AuthError::InvalidCredentials));
        assert!(!auth.is_authenticated());
        assert!(store.get(TOKEN_SLOT).unwrap().is_none());
        assert!(api.auth_token.lock().unwrap().is_none());
    }

    #[tokio::test]
    async fn test_logout_clears_everything() {
        let (auth, api, store) = session(true);
        auth.login("asha", &SecretString::from("correct horse"))
            .await
            .unwrap();

        auth.logout();

        assert!(!auth.is_authenticated());
        for slot in [TOKEN_SLOT, REFRESH_TOKEN_SLOT, USER_SLOT, CUSTOMER_SLOT] {
            assert!(store.get(slot).unwrap().is_none(), "{slot} survived logout");
        }
        assert!(api.auth_token.lock().unwrap().is_none());
    }

    #[tokio::test]
    async fn test_refresh_success_replaces_token() {
        let (auth, api, store) = session(true);
        auth.login("asha", &SecretString::from("correct horse"))
            .await
            .unwrap();

        assert!(auth.refresh().await);
        assert_eq!(store.get(TOKEN_SLOT).unwrap().as_deref(), Some("auth-2"));
        assert_eq!(api.auth_token.lock().unwrap().as_deref(), Some("auth-2"));
        assert!(auth.is_authenticated());
    }

    #[tokio::test]
    async fn test_refresh_rejected_logs_out() {
        let (auth, api, store) = session(false);
        auth.login("asha", &SecretString::from("correct horse"))
            .await
            .unwrap();

        assert!(!auth.refresh().await);
        assert!(!auth.is_authenticated());
        assert!(store.get(TOKEN_SLOT).unwrap().is_none());
        assert!(api.auth_token.lock().unwrap().is_none());
    }

    #[tokio::test]
    async fn test_refresh_without_token_logs_out_without_calling_api() {
        let (auth, api, _store) = session(true);
        assert!(!auth.refresh().await);
        assert_eq!(*api.refresh_calls.lock().unwrap(), 0);
    }

    #[test]
    fn test_restore_requires_token_and_user() {
        let (auth, api, store) = session(true);
        store.put(TOKEN_SLOT, "auth-1").unwrap();
        assert!(!auth.restore());

        store
            .put(USER_SLOT, &serde_json::to_string(&user()).unwrap())
            .unwrap();
        store.put(CUSTOMER_SLOT, "{not json").unwrap();
        assert!(auth.restore());
        assert_eq!(api.auth_token.lock().unwrap().as_deref(), Some("auth-1"));
        let current = auth.current().unwrap();
        assert_eq!(current.user, user());
        assert!(current.customer.is_none());
    }

    #[test]
    fn test_restore_with_corrupt_user_stays_signed_out() {
        let (auth, api, store) = session(true);
        store.put(TOKEN_SLOT, "auth-1").unwrap();
        store.put(USER_SLOT, "[1, 2").unwrap();
        store.put(WOO_SESSION_SLOT, "woo-guest").unwrap();

        assert!(!auth.restore());
        assert!(api.auth_token.lock().unwrap().is_none());
        assert_eq!(api.session_token().as_deref(), Some("woo-guest"));
    }

    #[tokio::test]
    async fn test_register_validates_input() {
        let (auth, _api, _store) = session(true);
        let input = |email: &str, password: &str| RegisterInput {
            username: "ravi".to_string(),
            email: email.to_string(),
            password: SecretString::from(password.to_string()),
            first_name: None,
            last_name: None,
        };

        assert!(matches!(
            auth.register(input("ravi.example.com", "long enough")).await,
            Err(AuthError::InvalidEmail(_))
        ));
        assert!(matches!(
            auth.register(input("ravi@example.com", "short")).await,
            Err(AuthError::WeakPassword(_))
        ));
        let user = auth
            .register(input("ravi@example.com", "long enough"))
            .await
            .unwrap();
        assert_eq!(user.email.as_deref(), Some("ravi@example.com"));
        assert!(!auth.is_authenticated());
    }

    #[test]
    fn test_persist_woo_session() {
        let (auth, api, store) = session(true);
        auth.persist_woo_session();
        assert!(store.get(WOO_SESSION_SLOT).unwrap().is_none());

        api.set_session_token(Some("woo-9".to_string()));
        auth.persist_woo_session();
        assert_eq!(store.get(WOO_SESSION_SLOT).unwrap().as_deref(), Some("woo-9"));
    }
}
