//! Login interceptor.
//!
//! Middleware that owns exactly one route: `POST` on the configured login
//! path. Every other request is handed to `next` untouched.
//!
//! A login runs in two stages on a blocking thread:
//! - `verify`: credentials are checked by the authentication manager.
//! - `issue`: the full user record is re-read by email and a token is signed
//!   for its id.
//!
//! # Post-conditions
//! - Success responses carry both the `token` and `userId` headers.
//! - Failure responses carry neither, and never say whether the email or
//!   the password was wrong.

use axum::{
    body::{Body, to_bytes},
    extract::{Request, State},
    http::{HeaderName, HeaderValue, Method, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};
use serde::Deserialize;

use super::jwt::TokenError;
use super::manager::{AuthenticationError, Credentials, Principal};
use crate::app::AppState;
use crate::directory::DirectoryError;

/// Response header carrying the signed token.
pub const TOKEN_HEADER: HeaderName = HeaderName::from_static("token");
/// Response header carrying the user id. Header names are case-insensitive
/// and normalized to lowercase on the wire.
pub const USER_ID_HEADER: HeaderName = HeaderName::from_static("userid");

/// Largest login body accepted.
const MAX_LOGIN_BODY_BYTES: usize = 16 * 1024;

#[derive(Deserialize)]
struct LoginRequest {
    email: String,
    password: String,
}

/// Why a login produced no token.
#[derive(Debug)]
pub enum LoginError {
    /// The body is not `{"email": ..., "password": ...}`.
    MalformedCredentials(String),
    /// Unknown email, wrong password or an unusable directory.
    AuthenticationFailed,
    /// The token could not be produced.
    Issuance(TokenError),
}

impl std::fmt::Display for LoginError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::MalformedCredentials(reason) => write!(f, "malformed credentials: {reason}"),
            Self::AuthenticationFailed => write!(f, "authentication failed"),
            Self::Issuance(e) => write!(f, "token issuance failed: {e}"),
        }
    }
}

impl std::error::Error for LoginError {}

impl IntoResponse for LoginError {
    fn into_response(self) -> Response {
        let status = match self {
            Self::MalformedCredentials(_) => StatusCode::BAD_REQUEST,
            Self::AuthenticationFailed => StatusCode::UNAUTHORIZED,
            Self::Issuance(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        status.into_response()
    }
}

/// Headers of a successful login, fully built before anything is sent.
#[derive(Debug)]
pub struct IssuedLogin {
    token: HeaderValue,
    user_id: HeaderValue,
}

impl IntoResponse for IssuedLogin {
    fn into_response(self) -> Response {
        (
            StatusCode::OK,
            [(TOKEN_HEADER, self.token), (USER_ID_HEADER, self.user_id)],
        )
            .into_response()
    }
}

/// Intercept login requests; pass everything else through.
pub async fn login_interceptor(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Response {
    if request.method() != Method::POST || request.uri().path() != state.config.login_path {
        return next.run(request).await;
    }

    match attempt_login(state, request.into_body()).await {
        Ok(issued) => issued.into_response(),
        Err(e) => {
            tracing::debug!("login rejected: {e}");
            e.into_response()
        }
    }
}

async fn attempt_login(state: AppState, body: Body) -> Result<IssuedLogin, LoginError> {
    let credentials = parse_credentials(body).await?;

    tokio::task::spawn_blocking(move || {
        let principal = verify(&state, &credentials)?;
        issue(&state, &principal)
    })
    .await
    .map_err(|e| {
        tracing::error!("login task failed: {e}");
        LoginError::AuthenticationFailed
    })?
}

async fn parse_credentials(body: Body) -> Result<Credentials, LoginError> {
    let bytes = to_bytes(body, MAX_LOGIN_BODY_BYTES)
        .await
        .map_err(|e| LoginError::MalformedCredentials(e.to_string()))?;
    let request: LoginRequest = serde_json::from_slice(&bytes)
        .map_err(|e| LoginError::MalformedCredentials(e.to_string()))?;
    Ok(Credentials::new(request.email, request.password))
}

/// Stage one: delegate the credential check.
///
/// The distinguishing reason is logged here and collapsed before it leaves.
fn verify(state: &AppState, credentials: &Credentials) -> Result<Principal, LoginError> {
    state
        .authentication
        .authenticate(credentials)
        .map_err(|e| {
            match &e {
                AuthenticationError::UnknownPrincipal | AuthenticationError::BadCredentials => {
                    tracing::info!(reason = %e, "login failed");
                }
                AuthenticationError::Directory(_) => {
                    tracing::warn!(reason = %e, "login failed");
                }
            }
            LoginError::AuthenticationFailed
        })
}

/// Stage two: resolve the full record and sign a token for it.
fn issue(state: &AppState, principal: &Principal) -> Result<IssuedLogin, LoginError> {
    let user = state
        .users
        .directory()
        .find_by_email(principal.email())
        .map_err(|e: DirectoryError| {
            tracing::warn!("user lookup after authentication failed: {e}");
            LoginError::AuthenticationFailed
        })?
        .ok_or_else(|| {
            tracing::warn!("authenticated user disappeared before token issuance");
            LoginError::AuthenticationFailed
        })?;
    if user.id != principal.id() {
        tracing::warn!("authenticated user was replaced before token issuance");
        return Err(LoginError::AuthenticationFailed);
    }

    let signed = state
        .tokens
        .issue(&user.id, state.clock.now_ms())
        .map_err(|e| {
            tracing::error!("refusing to issue token: {e}");
            LoginError::Issuance(e)
        })?;

    let token = HeaderValue::from_str(&signed.token)
        .map_err(|e| LoginError::Issuance(TokenError::Signing(e.to_string())))?;
    let user_id = HeaderValue::from_str(&user.id)
        .map_err(|e| LoginError::Issuance(TokenError::Signing(e.to_string())))?;

    tracing::info!(user_id = %user.id, expires_at_ms = signed.claims.expires_at_ms, "issued token");
    Ok(IssuedLogin { token, user_id })
}
