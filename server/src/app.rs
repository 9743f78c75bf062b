//! Shared request state and router assembly.
//!
//! Everything in `AppState` is built once at startup and only read while
//! serving; cloning the state clones `Arc`s.

use std::sync::Arc;

use axum::{
    Router, middleware,
    routing::{get, post},
};
use secrecy::ExposeSecret;

use crate::auth::{
    Argon2PasswordHasher, AuthenticationManager, CredentialVerifier, IpAllowlist, PolicyChain,
    SigningKey, SigningKeyError, TokenError, TokenIssuer, authorize_request, login_interceptor,
};
use crate::config::ServerConfig;
use crate::directory::UserDirectory;
use crate::handlers;
use crate::time::TimeSource;
use crate::users::UserService;

/// Error returned when the shared state cannot be assembled.
///
/// Always fatal: the process must not serve without a usable signing setup.
#[derive(Debug)]
pub enum StartupError {
    /// The signing key could not be derived.
    SigningKey(SigningKeyError),
    /// The token issuer rejected its configuration.
    TokenIssuer(TokenError),
}

impl std::fmt::Display for StartupError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::SigningKey(e) => write!(f, "invalid signing key: {e}"),
            Self::TokenIssuer(e) => write!(f, "invalid token issuer: {e}"),
        }
    }
}

impl std::error::Error for StartupError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::SigningKey(e) => Some(e),
            Self::TokenIssuer(e) => Some(e),
        }
    }
}

impl From<SigningKeyError> for StartupError {
    fn from(e: SigningKeyError) -> Self {
        Self::SigningKey(e)
    }
}

impl From<TokenError> for StartupError {
    fn from(e: TokenError) -> Self {
        Self::TokenIssuer(e)
    }
}

#[derive(Clone)]
pub struct AppState {
    /// Server configuration.
    pub config: Arc<ServerConfig>,
    /// User lookups and signup.
    pub users: Arc<UserService>,
    /// Credential check used by the login interceptor.
    pub authentication: Arc<AuthenticationManager>,
    /// Signs tokens for successful logins.
    pub tokens: Arc<TokenIssuer>,
    /// Same key as `tokens`, used to verify bearer tokens.
    pub signing_key: Arc<SigningKey>,
    /// Compiled authorization rules.
    pub policy: Arc<PolicyChain>,
    /// Clock for issuance and expiry checks.
    pub clock: Arc<dyn TimeSource>,
}

impl AppState {
    /// Assemble the shared state from configuration and collaborators.
    ///
    /// # Errors
    /// Returns `StartupError` if the signing key or token issuer cannot be
    /// built from `config`.
    pub fn new(
        config: ServerConfig,
        directory: Arc<dyn UserDirectory>,
        hasher: Arc<Argon2PasswordHasher>,
        clock: Arc<dyn TimeSource>,
    ) -> Result<Self, StartupError> {
        let signing_key = Arc::new(SigningKey::from_secret(
            config.token_secret.expose_secret(),
        )?);
        let tokens = TokenIssuer::new(Arc::clone(&signing_key), config.token_expiration_ms.get())?;
        let policy = PolicyChain::standard(IpAllowlist::new(config.gateway_ips.clone()));
        let verifier: Arc<dyn CredentialVerifier> = hasher.clone();
        let authentication = AuthenticationManager::new(Arc::clone(&directory), verifier);
        let users = UserService::new(directory, hasher);

        Ok(Self {
            config: Arc::new(config),
            users: Arc::new(users),
            authentication: Arc::new(authentication),
            tokens: Arc::new(tokens),
            signing_key,
            policy: Arc::new(policy),
            clock,
        })
    }
}

/// Build the service router.
///
/// The authorization chain wraps everything, the login interceptor sits
/// inside it, and the user-service routes are innermost.
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health-check", get(handlers::health_check))
        .route("/actuator/health", get(handlers::actuator_health))
        .route("/actuator/info", get(handlers::actuator_info))
        .route("/user-service/welcome", get(handlers::welcome))
        .route("/user-service/signup", post(handlers::signup))
        .route("/user-service/users", get(handlers::list_users))
        .route("/user-service/users/{user_id}", get(handlers::get_user))
        .fallback(handlers::not_found)
        .layer(middleware::from_fn_with_state(
            state.clone(),
            login_interceptor,
        ))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            authorize_request,
        ))
        .with_state(state)
}
