#![cfg_attr(test, allow(clippy::disallowed_methods))]
// Forbid unwrap() in production code to prevent panics at startup.
// Test code is allowed to use unwrap() for convenience.
#![cfg_attr(not(test), deny(clippy::unwrap_used))]
use std::net::SocketAddr;
use std::sync::Arc;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use user_service::{
    AppState, auth::Argon2PasswordHasher, build_router, config::ServerConfig,
    directory::InMemoryUserDirectory, time::SystemTimeSource,
};

#[tokio::main]
async fn main() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "user_service=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration from environment variables
    let config = match ServerConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            tracing::error!("Failed to load configuration: {e}");
            std::process::exit(1);
        }
    };

    tracing::info!(
        "Loaded configuration: listen={}:{}, login_path={}, token_expiration_ms={}, gateway_ips={:?}",
        config.listen_address,
        config.listen_port,
        config.login_path,
        config.token_expiration_ms,
        config.gateway_ips
    );

    let addr = SocketAddr::new(config.listen_address, config.listen_port);

    // Signing key and policy chain are derived here, once; a bad secret or
    // ttl stops the process before anything is served.
    let state = match AppState::new(
        config,
        Arc::new(InMemoryUserDirectory::new()),
        Arc::new(Argon2PasswordHasher::new()),
        Arc::new(SystemTimeSource),
    ) {
        Ok(state) => state,
        Err(e) => {
            tracing::error!("Failed to initialize authentication: {e}");
            std::process::exit(1);
        }
    };
    tracing::info!(
        "Gateway allowlist: {:?}",
        state.policy.allowlist().addresses()
    );

    let app = build_router(state);

    tracing::info!("listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .unwrap_or_else(|e| {
            tracing::error!("Failed to bind: {e}");
            std::process::exit(1);
        });

    // Connection info carries the peer address the allowlist is checked against.
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await
    .unwrap_or_else(|e| {
        tracing::error!("Server error: {e}");
        std::process::exit(1);
    });
}
