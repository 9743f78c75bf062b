//! Server configuration module.
//!
//! This module provides configuration loading for the user service from
//! environment variables.
//!
//! # Environment Variables
//!
//! - `USER_SERVICE_TOKEN_SECRET`: Key material for signing tokens (required)
//! - `USER_SERVICE_TOKEN_EXPIRATION_TIME`: Token lifetime in milliseconds (required)
//! - `USER_SERVICE_GATEWAY_IP`: Comma-separated IP allowlist (default: loopback only)
//! - `USER_SERVICE_LISTEN_ADDRESS`: Address to bind (default: `127.0.0.1`)
//! - `USER_SERVICE_LISTEN_PORT`: Port to listen on (default: `3000`)
//! - `USER_SERVICE_LOGIN_PATH`: Path intercepted for login (default: `/user-service/login`)
//! - `USER_SERVICE_GREETING_MESSAGE`: Text served by the welcome endpoint
//!
//! # Invariants
//!
//! - `token_secret` is never empty
//! - `token_expiration_ms` is always positive
//! - every entry of `gateway_ips` is a parsed IP address
//! - the configuration is immutable once loaded

use std::net::IpAddr;
use std::num::NonZeroU64;

use secrecy::{ExposeSecret, SecretString};

const TOKEN_SECRET: &str = "USER_SERVICE_TOKEN_SECRET";
const TOKEN_EXPIRATION_TIME: &str = "USER_SERVICE_TOKEN_EXPIRATION_TIME";
const GATEWAY_IP: &str = "USER_SERVICE_GATEWAY_IP";
const LISTEN_ADDRESS: &str = "USER_SERVICE_LISTEN_ADDRESS";
const LISTEN_PORT: &str = "USER_SERVICE_LISTEN_PORT";
const LOGIN_PATH: &str = "USER_SERVICE_LOGIN_PATH";
const GREETING_MESSAGE: &str = "USER_SERVICE_GREETING_MESSAGE";

/// Server configuration.
///
/// Contains all configuration parameters needed to run the user service.
///
/// # Pre-conditions
///
/// When constructed via `from_env()`:
/// - All required environment variables must be set
/// - All values must be valid for their respective types
///
/// # Post-conditions
///
/// - `token_secret` is non-empty and `token_expiration_ms` is positive
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Secret string the signing key is derived from (`token.secret`).
    pub token_secret: SecretString,
    /// Lifetime of issued tokens in milliseconds (`token.expiration-time`).
    pub token_expiration_ms: NonZeroU64,
    /// Source addresses allowed through the gateway rule (`gateway.ip`).
    /// Empty means loopback only.
    pub gateway_ips: Vec<IpAddr>,
    /// Address to bind the listener to.
    pub listen_address: IpAddr,
    /// Port to listen on for HTTP connections.
    pub listen_port: u16,
    /// Path whose `POST` requests are handled by the login interceptor.
    pub login_path: String,
    /// Message returned by the welcome endpoint.
    pub greeting_message: String,
}

/// Error returned when loading configuration fails.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// An environment variable is missing.
    MissingEnvVar(String),
    /// An environment variable has an invalid value.
    InvalidValue { name: String, message: String },
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::MissingEnvVar(name) => {
                write!(f, "missing required environment variable: {name}")
            }
            Self::InvalidValue { name, message } => {
                write!(f, "invalid value for {name}: {message}")
            }
        }
    }
}

impl std::error::Error for ConfigError {}

impl ServerConfig {
    /// Default port for the server.
    pub const DEFAULT_PORT: u16 = 3000;
    /// Default bind address.
    pub const DEFAULT_LISTEN_ADDRESS: &'static str = "127.0.0.1";
    /// Default login path.
    pub const DEFAULT_LOGIN_PATH: &'static str = "/user-service/login";
    /// Default greeting served by the welcome endpoint.
    pub const DEFAULT_GREETING_MESSAGE: &'static str = "Welcome to the user service.";

    /// Load configuration from environment variables.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - `USER_SERVICE_TOKEN_SECRET` is not set or is empty
    /// - `USER_SERVICE_TOKEN_EXPIRATION_TIME` is not set or not a positive integer
    /// - any entry of `USER_SERVICE_GATEWAY_IP` is not an IP address
    /// - `USER_SERVICE_LISTEN_ADDRESS` or `USER_SERVICE_LISTEN_PORT` is set but invalid
    /// - `USER_SERVICE_LOGIN_PATH` is set but does not start with `/`
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Load configuration through an arbitrary variable lookup.
    ///
    /// `from_env` delegates here; tests pass a closure over a map instead of
    /// mutating the process environment.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let token_secret = load_token_secret(&lookup)?;
        let token_expiration_ms = load_token_expiration(&lookup)?;
        let gateway_ips = load_gateway_ips(&lookup)?;
        let listen_address = load_listen_address(&lookup)?;
        let listen_port = load_listen_port(&lookup)?;
        let login_path = load_login_path(&lookup)?;
        let greeting_message = lookup(GREETING_MESSAGE)
            .unwrap_or_else(|| Self::DEFAULT_GREETING_MESSAGE.to_string());

        Ok(Self {
            token_secret,
            token_expiration_ms,
            gateway_ips,
            listen_address,
            listen_port,
            login_path,
            greeting_message,
        })
    }
}

fn invalid(name: &str, message: impl Into<String>) -> ConfigError {
    ConfigError::InvalidValue {
        name: name.to_string(),
        message: message.into(),
    }
}

/// Load the token secret.
///
/// # Errors
///
/// Returns an error if the variable is not set or is empty.
fn load_token_secret<F>(lookup: &F) -> Result<SecretString, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let secret = lookup(TOKEN_SECRET)
        .map(SecretString::from)
        .ok_or_else(|| ConfigError::MissingEnvVar(TOKEN_SECRET.to_string()))?;

    if secret.expose_secret().is_empty() {
        return Err(invalid(TOKEN_SECRET, "must not be empty"));
    }

    Ok(secret)
}

/// Load the token expiration time in milliseconds.
///
/// # Errors
///
/// Returns an error if the variable is not set, is not an integer, or is zero.
fn load_token_expiration<F>(lookup: &F) -> Result<NonZeroU64, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let value = lookup(TOKEN_EXPIRATION_TIME)
        .ok_or_else(|| ConfigError::MissingEnvVar(TOKEN_EXPIRATION_TIME.to_string()))?;

    value
        .trim()
        .parse::<NonZeroU64>()
        .map_err(|_| invalid(TOKEN_EXPIRATION_TIME, format!("'{value}' is not a positive integer")))
}

/// Load the gateway allowlist.
///
/// Entries are comma separated; blank entries are skipped.
fn load_gateway_ips<F>(lookup: &F) -> Result<Vec<IpAddr>, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let Some(value) = lookup(GATEWAY_IP) else {
        return Ok(Vec::new());
    };

    value
        .split(',')
        .map(str::trim)
        .filter(|entry| !entry.is_empty())
        .map(|entry| {
            entry
                .parse::<IpAddr>()
                .map_err(|_| invalid(GATEWAY_IP, format!("'{entry}' is not an IP address")))
        })
        .collect()
}

fn load_listen_address<F>(lookup: &F) -> Result<IpAddr, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let value = lookup(LISTEN_ADDRESS).unwrap_or_else(|| ServerConfig::DEFAULT_LISTEN_ADDRESS.to_string());
    value
        .parse::<IpAddr>()
        .map_err(|_| invalid(LISTEN_ADDRESS, format!("'{value}' is not an IP address")))
}

/// Load the listen port.
///
/// Returns the default if not set.
///
/// # Errors
///
/// Returns an error if the value is set but not a valid port number.
fn load_listen_port<F>(lookup: &F) -> Result<u16, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    match lookup(LISTEN_PORT) {
        Some(value) => value.parse::<u16>().map_err(|_| {
            invalid(
                LISTEN_PORT,
                format!("'{value}' is not a valid port number (must be 1-65535)"),
            )
        }),
        None => Ok(ServerConfig::DEFAULT_PORT),
    }
}

fn load_login_path<F>(lookup: &F) -> Result<String, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let path = lookup(LOGIN_PATH).unwrap_or_else(|| ServerConfig::DEFAULT_LOGIN_PATH.to_string());
    if !path.starts_with('/') {
        return Err(invalid(LOGIN_PATH, "must start with '/'"));
    }
    Ok(path)
}
