//! Authentication module.
//!
//! Login interception, credential verification, token issuance and the
//! per-request authorization policy chain.
//!
//! # Pre-conditions
//! - The signing key and policy chain are built once at startup.
//!
//! # Post-conditions
//! - Authentication configuration is immutable once loaded.
//!
//! # Invariants
//! - No response reveals which credential check failed.

pub mod jwt;
pub mod login;
pub mod manager;
pub mod middleware;
pub mod password;
pub mod policy;
pub mod signing_key;

pub use jwt::{JwtError, SignedToken, TokenClaims, TokenError, TokenIssuer, verify_token};
pub use login::{LoginError, TOKEN_HEADER, USER_ID_HEADER, login_interceptor};
pub use manager::{AuthenticationError, AuthenticationManager, Credentials, Principal};
pub use middleware::{AuthenticatedUser, authorize_request};
pub use password::{Argon2PasswordHasher, CredentialVerifier, PasswordHashError};
pub use policy::{
    AuthState, AuthorizationRule, Decision, IpAllowlist, PathPattern, Policy, PolicyChain,
};
pub use signing_key::{SigningKey, SigningKeyError};
