//! Common helpers for end-to-end tests.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    Router,
    body::{Body, to_bytes},
    extract::ConnectInfo,
    http::{HeaderMap, Method, Request, StatusCode},
};
use tower::ServiceExt;

use crate::app::{AppState, build_router};
use crate::auth::{Argon2PasswordHasher, TOKEN_HEADER, USER_ID_HEADER};
use crate::config::ServerConfig;
use crate::directory::InMemoryUserDirectory;
use crate::time::ManualTimeSource;
use crate::users::NewUser;

pub const TEST_SECRET: &str = "e2e-test-secret-key-that-is-long-enough";
pub const TEST_TTL_MS: u64 = 3_600_000;
/// Start of the test clock (November 2023).
pub const TEST_NOW_MS: u64 = 1_700_000_000_000;

pub const LOOPBACK: &str = "127.0.0.1:50000";
pub const FOREIGN: &str = "203.0.113.7:50000";

/// A response with its body already collected.
pub struct TestResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: String,
}

impl TestResponse {
    #[must_use]
    pub fn token(&self) -> Option<&str> {
        self.headers.get(TOKEN_HEADER).and_then(|v| v.to_str().ok())
    }

    #[must_use]
    pub fn user_id(&self) -> Option<&str> {
        self.headers.get(USER_ID_HEADER).and_then(|v| v.to_str().ok())
    }

    #[must_use]
    pub fn json(&self) -> serde_json::Value {
        #[allow(clippy::expect_used)]
        serde_json::from_str(&self.body).expect("Response body should be JSON")
    }
}

/// The full router over an in-memory directory and a manual clock.
pub struct TestServer {
    pub router: Router,
    pub state: AppState,
    pub clock: Arc<ManualTimeSource>,
    pub runtime: tokio::runtime::Runtime,
}

impl TestServer {
    /// Server with the default (loopback) allowlist.
    #[must_use]
    pub fn new() -> Self {
        Self::with_env(&[])
    }

    /// Server with extra configuration variables on top of the required ones.
    #[must_use]
    pub fn with_env(extra: &[(&str, &str)]) -> Self {
        let ttl = TEST_TTL_MS.to_string();
        let mut vars: HashMap<String, String> = HashMap::from([
            ("USER_SERVICE_TOKEN_SECRET".to_string(), TEST_SECRET.to_string()),
            ("USER_SERVICE_TOKEN_EXPIRATION_TIME".to_string(), ttl),
        ]);
        for (name, value) in extra {
            vars.insert((*name).to_string(), (*value).to_string());
        }

        #[allow(clippy::expect_used)]
        let config = ServerConfig::from_lookup(|name| vars.get(name).cloned())
            .expect("Test configuration should be valid");

        #[allow(clippy::expect_used)]
        let hasher = Argon2PasswordHasher::with_costs(8, 1, 1).expect("Valid Argon2 params");
        let clock = Arc::new(ManualTimeSource::new(TEST_NOW_MS));

        #[allow(clippy::expect_used)]
        let state = AppState::new(
            config,
            Arc::new(InMemoryUserDirectory::new()),
            Arc::new(hasher),
            clock.clone(),
        )
        .expect("Test state should build");

        #[allow(clippy::expect_used)]
        let runtime = tokio::runtime::Runtime::new().expect("Failed to create runtime");

        Self {
            router: build_router(state.clone()),
            state,
            clock,
            runtime,
        }
    }

    /// Register a user directly through the user service; returns its id.
    pub fn register(&self, email: &str, password: &str) -> String {
        #[allow(clippy::expect_used)]
        let view = self
            .state
            .users
            .create_user(NewUser {
                email: email.to_string(),
                name: "Test User".to_string(),
                pwd: password.to_string(),
            })
            .expect("Failed to register test user");
        view.user_id
    }

    /// Send a request from `source` and collect the response.
    pub fn send(
        &self,
        method: Method,
        path: &str,
        source: &str,
        body: Option<&str>,
        headers: &[(&str, &str)],
    ) -> TestResponse {
        let mut builder = Request::builder().method(method).uri(path);
        if body.is_some() {
            builder = builder.header("content-type", "application/json");
        }
        for (name, value) in headers {
            builder = builder.header(*name, *value);
        }

        #[allow(clippy::expect_used)]
        let mut request = builder
            .body(body.map_or_else(Body::empty, |b| Body::from(b.to_string())))
            .expect("Failed to build request");
        #[allow(clippy::expect_used)]
        let addr: SocketAddr = source.parse().expect("Valid socket address");
        request.extensions_mut().insert(ConnectInfo(addr));

        self.runtime.block_on(async {
            #[allow(clippy::expect_used)]
            let response = self
                .router
                .clone()
                .oneshot(request)
                .await
                .expect("Router is infallible");
            let status = response.status();
            let headers = response.headers().clone();
            #[allow(clippy::expect_used)]
            let bytes = to_bytes(response.into_body(), usize::MAX)
                .await
                .expect("Failed to read body");
            TestResponse {
                status,
                headers,
                body: String::from_utf8_lossy(&bytes).into_owned(),
            }
        })
    }

    pub fn get(&self, path: &str, source: &str) -> TestResponse {
        self.send(Method::GET, path, source, None, &[])
    }

    pub fn post(&self, path: &str, source: &str, body: &str) -> TestResponse {
        self.send(Method::POST, path, source, Some(body), &[])
    }

    /// `POST /user-service/login` from loopback.
    pub fn login(&self, email: &str, password: &str) -> TestResponse {
        let body = serde_json::json!({ "email": email, "password": password }).to_string();
        self.post("/user-service/login", LOOPBACK, &body)
    }
}
