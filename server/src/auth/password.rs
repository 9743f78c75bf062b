//! Password hashing and verification.
//!
//! The authentication core only sees the `CredentialVerifier` trait; the
//! Argon2id implementation below is what the service wires in.

use argon2::password_hash::SaltString;
use argon2::{Algorithm, Argon2, Params, PasswordHash, PasswordHasher, PasswordVerifier, Version};
use rand::RngCore;

/// Salt length in bytes.
const SALT_LEN: usize = 16;

/// One-way check of a plaintext secret against a stored hash.
pub trait CredentialVerifier: Send + Sync {
    /// Returns whether `plaintext` hashes to `hash`.
    fn verify(&self, plaintext: &str, hash: &str) -> bool;
}

/// Error returned when hashing a password fails.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PasswordHashError {
    /// The Argon2 parameters are invalid.
    InvalidParams(String),
    /// Hashing failed.
    Hashing(String),
}

impl std::fmt::Display for PasswordHashError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidParams(reason) => write!(f, "invalid Argon2 parameters: {reason}"),
            Self::Hashing(reason) => write!(f, "failed to hash password: {reason}"),
        }
    }
}

impl std::error::Error for PasswordHashError {}

/// Argon2id hasher producing PHC-format strings.
#[derive(Debug, Clone)]
pub struct Argon2PasswordHasher {
    params: Params,
}

impl Argon2PasswordHasher {
    /// Create a hasher with the recommended default cost parameters.
    #[must_use]
    pub fn new() -> Self {
        Self {
            params: Params::default(),
        }
    }

    /// Create a hasher with explicit cost parameters.
    ///
    /// # Errors
    /// Returns `PasswordHashError::InvalidParams` if Argon2 rejects the costs.
    pub fn with_costs(m_cost: u32, t_cost: u32, p_cost: u32) -> Result<Self, PasswordHashError> {
        let params = Params::new(m_cost, t_cost, p_cost, None)
            .map_err(|e| PasswordHashError::InvalidParams(e.to_string()))?;
        Ok(Self { params })
    }

    fn argon2(&self) -> Argon2<'static> {
        Argon2::new(Algorithm::Argon2id, Version::V0x13, self.params.clone())
    }

    /// Hash `plaintext` with a fresh random salt.
    ///
    /// # Errors
    /// Returns `PasswordHashError::Hashing` if Argon2 fails.
    pub fn hash(&self, plaintext: &str) -> Result<String, PasswordHashError> {
        let mut salt_bytes = [0u8; SALT_LEN];
        rand::rng().fill_bytes(&mut salt_bytes);
        let salt = SaltString::encode_b64(&salt_bytes)
            .map_err(|e| PasswordHashError::Hashing(e.to_string()))?;

        let hash = self
            .argon2()
            .hash_password(plaintext.as_bytes(), &salt)
            .map_err(|e| PasswordHashError::Hashing(e.to_string()))?;
        Ok(hash.to_string())
    }
}

impl Default for Argon2PasswordHasher {
    fn default() -> Self {
        Self::new()
    }
}

impl CredentialVerifier for Argon2PasswordHasher {
    fn verify(&self, plaintext: &str, hash: &str) -> bool {
        let parsed = match PasswordHash::new(hash) {
            Ok(parsed) => parsed,
            Err(e) => {
                tracing::warn!("stored password hash is not a valid PHC string: {e}");
                return false;
            }
        };
        // Parameters are read from the PHC string, not from `self`.
        self.argon2()
            .verify_password(plaintext.as_bytes(), &parsed)
            .is_ok()
    }
}
