//! Symmetric signing key for access tokens.
//!
//! # Pre-conditions
//! - The configured secret must be non-empty.
//!
//! # Post-conditions
//! - `SigningKey` instances are immutable once created.
//!
//! # Invariants
//! - The encoding and decoding halves are derived from the same bytes, so a
//!   token signed with a key always verifies with that key.

use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey};

/// Algorithm used for every token this service signs or accepts.
pub const SIGNING_ALGORITHM: Algorithm = Algorithm::HS256;

/// Error returned when a signing key cannot be derived.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SigningKeyError {
    /// The secret is empty.
    EmptySecret,
}

impl std::fmt::Display for SigningKeyError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EmptySecret => write!(f, "token secret must not be empty"),
        }
    }
}

impl std::error::Error for SigningKeyError {}

/// HMAC-SHA256 key material shared by the token issuer and verifier.
///
/// Derived once at startup from the UTF-8 bytes of the configured secret.
pub struct SigningKey {
    encoding: EncodingKey,
    decoding: DecodingKey,
}

impl SigningKey {
    /// Derive a key from a secret string.
    ///
    /// # Errors
    /// Returns `SigningKeyError::EmptySecret` if the secret is empty.
    pub fn from_secret(secret: &str) -> Result<Self, SigningKeyError> {
        Self::from_bytes(secret.as_bytes())
    }

    /// Derive a key from raw bytes.
    ///
    /// # Errors
    /// Returns `SigningKeyError::EmptySecret` if `secret` is empty.
    pub fn from_bytes(secret: &[u8]) -> Result<Self, SigningKeyError> {
        if secret.is_empty() {
            return Err(SigningKeyError::EmptySecret);
        }
        Ok(Self {
            encoding: EncodingKey::from_secret(secret),
            decoding: DecodingKey::from_secret(secret),
        })
    }

    #[must_use]
    pub const fn encoding_key(&self) -> &EncodingKey {
        &self.encoding
    }

    #[must_use]
    pub const fn decoding_key(&self) -> &DecodingKey {
        &self.decoding
    }
}

impl std::fmt::Debug for SigningKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SigningKey")
            .field("algorithm", &SIGNING_ALGORITHM)
            .finish_non_exhaustive()
    }
}
