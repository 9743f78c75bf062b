//! Authentication manager.
//!
//! Decides whether a set of credentials belongs to a real account by
//! combining a directory lookup with a password hash check.
//!
//! # Post-conditions
//! - On success, the returned `Principal` is authenticated and carries the
//!   email that was looked up.
//!
//! # Invariants
//! - Credentials are never logged; only the failure kind is.

use std::sync::Arc;

use secrecy::{ExposeSecret, SecretString};

use super::password::CredentialVerifier;
use crate::directory::{DirectoryError, UserDirectory};

/// Login credentials for a single attempt.
pub struct Credentials {
    /// The account identifier (email).
    pub identifier: String,
    /// The plaintext password.
    pub secret: SecretString,
}

impl Credentials {
    #[must_use]
    pub fn new(identifier: impl Into<String>, secret: impl Into<String>) -> Self {
        Self {
            identifier: identifier.into(),
            secret: SecretString::from(secret.into()),
        }
    }
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials").finish_non_exhaustive()
    }
}

/// The verified identity produced by a successful authentication.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Principal {
    id: String,
    email: String,
    authenticated: bool,
}

impl Principal {
    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }

    #[must_use]
    pub fn email(&self) -> &str {
        &self.email
    }

    #[must_use]
    pub const fn is_authenticated(&self) -> bool {
        self.authenticated
    }
}

/// Why an authentication attempt was rejected.
///
/// Callers above the manager must not reveal which variant occurred.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthenticationError {
    /// No account exists for the identifier.
    UnknownPrincipal,
    /// The password does not match the stored hash.
    BadCredentials,
    /// The directory could not be consulted.
    Directory(DirectoryError),
}

impl std::fmt::Display for AuthenticationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::UnknownPrincipal => write!(f, "unknown principal"),
            Self::BadCredentials => write!(f, "bad credentials"),
            Self::Directory(e) => write!(f, "directory error: {e}"),
        }
    }
}

impl std::error::Error for AuthenticationError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Directory(e) => Some(e),
            Self::UnknownPrincipal | Self::BadCredentials => None,
        }
    }
}

impl From<DirectoryError> for AuthenticationError {
    fn from(e: DirectoryError) -> Self {
        Self::Directory(e)
    }
}

/// Verifies credentials against the user directory.
///
/// Stateless apart from its shared collaborators, so one instance serves
/// every request concurrently.
pub struct AuthenticationManager {
    directory: Arc<dyn UserDirectory>,
    verifier: Arc<dyn CredentialVerifier>,
}

impl AuthenticationManager {
    #[must_use]
    pub fn new(directory: Arc<dyn UserDirectory>, verifier: Arc<dyn CredentialVerifier>) -> Self {
        Self {
            directory,
            verifier,
        }
    }

    /// Authenticate `credentials`.
    ///
    /// This blocks on the directory and on password hashing; async callers
    /// should run it on a blocking thread.
    ///
    /// # Errors
    /// Returns `AuthenticationError::UnknownPrincipal` if no user has the
    /// identifier, `AuthenticationError::BadCredentials` if the password does
    /// not match, and `AuthenticationError::Directory` if the lookup fails.
    pub fn authenticate(&self, credentials: &Credentials) -> Result<Principal, AuthenticationError> {
        let Some(user) = self.directory.find_by_email(&credentials.identifier)? else {
            return Err(AuthenticationError::UnknownPrincipal);
        };

        if !self
            .verifier
            .verify(credentials.secret.expose_secret(), &user.password_hash)
        {
            return Err(AuthenticationError::BadCredentials);
        }

        Ok(Principal {
            id: user.id,
            email: user.email,
            authenticated: true,
        })
    }
}

impl std::fmt::Debug for AuthenticationManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthenticationManager").finish_non_exhaustive()
    }
}
