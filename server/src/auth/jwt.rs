//! JWT issuance and verification module.
//!
//! Issues HS256 access tokens for authenticated users and verifies tokens
//! presented on later requests.
//!
//! # Pre-conditions
//! - The signing key is derived from a non-empty secret.
//! - The token lifetime is positive.
//!
//! # Post-conditions
//! - Issued claims satisfy `expires_at_ms == issued_at_ms + ttl_ms`.
//! - On successful verification, the user ID from the 'sub' claim is returned.
//!
//! # Invariants
//! - Issuance and verification are stateless and do not modify any external state.
//! - The same inputs always produce the same outputs: HS256 is deterministic,
//!   so identical claims and key give byte-identical tokens.

use std::sync::Arc;

use jsonwebtoken::{Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};

use super::signing_key::{SIGNING_ALGORITHM, SigningKey};

/// Claims of an issued token.
///
/// Timestamps are milliseconds since the Unix epoch. On the wire they are
/// encoded as whole seconds in the registered `iat`/`exp` claims.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenClaims {
    /// User identifier the token was issued for.
    pub subject: String,
    /// Instant of issuance.
    pub issued_at_ms: u64,
    /// Instant after which the token is no longer accepted.
    pub expires_at_ms: u64,
}

/// Registered claims as serialized into the token payload.
#[derive(Debug, Serialize, Deserialize)]
struct WireClaims {
    /// Subject claim containing the user identifier.
    sub: String,
    /// Issued-at, seconds since epoch.
    iat: u64,
    /// Expiration, seconds since epoch.
    exp: u64,
}

impl From<&TokenClaims> for WireClaims {
    fn from(claims: &TokenClaims) -> Self {
        Self {
            sub: claims.subject.clone(),
            iat: claims.issued_at_ms / 1000,
            // Rounded up so the signed token never lives shorter than the ttl.
            exp: claims.expires_at_ms.div_ceil(1000),
        }
    }
}

/// A compact signed token together with the claims it carries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignedToken {
    /// Compact `header.payload.signature` representation.
    pub token: String,
    /// Claims embedded in `token`.
    pub claims: TokenClaims,
}

/// Error returned when a token cannot be issued.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TokenError {
    /// The issuer is not configured to produce a valid, expiring token.
    Configuration(String),
    /// The subject is empty.
    EmptySubject,
    /// Signing the claims failed.
    Signing(String),
}

impl std::fmt::Display for TokenError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Configuration(reason) => write!(f, "token configuration error: {reason}"),
            Self::EmptySubject => write!(f, "token subject must not be empty"),
            Self::Signing(reason) => write!(f, "failed to sign token: {reason}"),
        }
    }
}

impl std::error::Error for TokenError {}

/// Issues signed, time-bound access tokens.
///
/// Holds the process-wide signing key and the configured lifetime. Both are
/// read-only after construction, so one issuer is shared by every request.
#[derive(Debug)]
pub struct TokenIssuer {
    key: Arc<SigningKey>,
    ttl_ms: u64,
}

impl TokenIssuer {
    /// Create an issuer.
    ///
    /// # Errors
    /// Returns `TokenError::Configuration` if `ttl_ms` is zero.
    pub fn new(key: Arc<SigningKey>, ttl_ms: u64) -> Result<Self, TokenError> {
        let issuer = Self { key, ttl_ms };
        issuer.check_configuration()?;
        Ok(issuer)
    }

    /// Build and sign claims for `user_id` issued at `now_ms`.
    ///
    /// # Post-conditions
    /// - `claims.subject == user_id`
    /// - `claims.expires_at_ms - claims.issued_at_ms == ttl_ms`
    ///
    /// # Errors
    /// Returns `TokenError::Configuration` if the lifetime is unusable at
    /// `now_ms`, `TokenError::EmptySubject` for an empty user id, and
    /// `TokenError::Signing` if encoding fails.
    pub fn issue(&self, user_id: &str, now_ms: u64) -> Result<SignedToken, TokenError> {
        self.check_configuration()?;
        if user_id.is_empty() {
            return Err(TokenError::EmptySubject);
        }

        let expires_at_ms = now_ms.checked_add(self.ttl_ms).ok_or_else(|| {
            TokenError::Configuration("token expiration overflows the clock".to_string())
        })?;
        let claims = TokenClaims {
            subject: user_id.to_string(),
            issued_at_ms: now_ms,
            expires_at_ms,
        };

        let token = encode(
            &Header::new(SIGNING_ALGORITHM),
            &WireClaims::from(&claims),
            self.key.encoding_key(),
        )
        .map_err(|e| TokenError::Signing(e.to_string()))?;

        Ok(SignedToken { token, claims })
    }

    fn check_configuration(&self) -> Result<(), TokenError> {
        if self.ttl_ms == 0 {
            return Err(TokenError::Configuration(
                "token expiration time must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

/// Error returned when JWT verification fails.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JwtError {
    /// The JWT signature is invalid.
    InvalidSignature,
    /// The JWT has expired.
    TokenExpired,
    /// The JWT is malformed or cannot be parsed.
    MalformedToken,
    /// The 'sub' claim is missing from the JWT.
    MissingSubClaim,
}

impl std::fmt::Display for JwtError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidSignature => write!(f, "invalid JWT signature"),
            Self::TokenExpired => write!(f, "JWT has expired"),
            Self::MalformedToken => write!(f, "malformed JWT"),
            Self::MissingSubClaim => write!(f, "missing 'sub' claim in JWT"),
        }
    }
}

impl std::error::Error for JwtError {}

/// Verifies a JWT and extracts the user ID from the 'sub' claim.
///
/// Expiry is checked against `now_ms` rather than the system clock so that
/// verification is a pure function of its inputs.
///
/// # Errors
/// Returns `JwtError` if verification fails for any reason.
pub fn verify_token(token: &str, key: &SigningKey, now_ms: u64) -> Result<String, JwtError> {
    let mut validation = Validation::new(SIGNING_ALGORITHM);
    validation.validate_exp = false;
    validation.set_required_spec_claims(&["exp", "sub"]);

    let token_data =
        decode::<WireClaims>(token, key.decoding_key(), &validation).map_err(map_jwt_error)?;
    let claims = token_data.claims;

    if claims.exp.saturating_mul(1000) <= now_ms {
        return Err(JwtError::TokenExpired);
    }
    if claims.sub.is_empty() {
        return Err(JwtError::MissingSubClaim);
    }

    Ok(claims.sub)
}

/// Maps jsonwebtoken errors to our JwtError type.
fn map_jwt_error(error: jsonwebtoken::errors::Error) -> JwtError {
    use jsonwebtoken::errors::ErrorKind;

    match error.kind() {
        ErrorKind::InvalidSignature => JwtError::InvalidSignature,
        ErrorKind::ExpiredSignature => JwtError::TokenExpired,
        ErrorKind::MissingRequiredClaim(claim) if claim == "sub" => JwtError::MissingSubClaim,
        _ => JwtError::MalformedToken,
    }
}
