//! Test bearer tokens against rules that require authentication.
//!
//! The service's own chain lets the address gate decide every non-exempt
//! path, so these tests swap in a router whose chain has an authenticated
//! section ahead of the gate.

use std::sync::Arc;

use axum::http::{Method, StatusCode};

use crate::app::build_router;
use crate::auth::{IpAllowlist, Policy, PolicyChain};
use crate::e2e_tests::helpers::*;

fn server_with_authenticated_users_route() -> TestServer {
    let mut test = TestServer::new();
    let chain = PolicyChain::builder(IpAllowlist::loopback())
        .rule("/health-check/**", Policy::AllowAll)
        .rule("/user-service/users/**", Policy::RequireAuthenticated)
        .rule("/**", Policy::RequireAllowlistedIp)
        .build();
    test.state.policy = Arc::new(chain);
    test.router = build_router(test.state.clone());
    test
}

fn bearer(token: &str) -> String {
    format!("Bearer {token}")
}

#[test]
fn test_valid_token_grants_access() {
    let test = server_with_authenticated_users_route();
    let user_id = test.register("a@b.com", "password123");
    let login = test.login("a@b.com", "password123");
    let auth = bearer(login.token().expect("token"));

    let resp = test.send(
        Method::GET,
        &format!("/user-service/users/{user_id}"),
        FOREIGN,
        None,
        &[("authorization", auth.as_str())],
    );
    assert_eq!(resp.status, StatusCode::OK);
}

#[test]
fn test_missing_token_is_unauthenticated() {
    let test = server_with_authenticated_users_route();

    let resp = test.get("/user-service/users", LOOPBACK);
    assert_eq!(resp.status, StatusCode::UNAUTHORIZED);
}

#[test]
fn test_tampered_token_is_unauthenticated() {
    let test = server_with_authenticated_users_route();
    test.register("a@b.com", "password123");
    let login = test.login("a@b.com", "password123");
    let mut token = login.token().expect("token").to_string();
    token.push('x');
    let auth = bearer(&token);

    let resp = test.send(
        Method::GET,
        "/user-service/users",
        LOOPBACK,
        None,
        &[("authorization", auth.as_str())],
    );
    assert_eq!(resp.status, StatusCode::UNAUTHORIZED);
}

#[test]
fn test_expired_token_is_unauthenticated() {
    let test = server_with_authenticated_users_route();
    test.register("a@b.com", "password123");
    let login = test.login("a@b.com", "password123");
    let auth = bearer(login.token().expect("token"));

    test.clock.advance(TEST_TTL_MS);

    let resp = test.send(
        Method::GET,
        "/user-service/users",
        LOOPBACK,
        None,
        &[("authorization", auth.as_str())],
    );
    assert_eq!(resp.status, StatusCode::UNAUTHORIZED);
}

#[test]
fn test_token_does_not_bypass_address_gate_in_standard_chain() {
    let test = TestServer::new();
    test.register("a@b.com", "password123");
    let login = test.login("a@b.com", "password123");
    let auth = bearer(login.token().expect("token"));

    let resp = test.send(
        Method::GET,
        "/user-service/users",
        FOREIGN,
        None,
        &[("authorization", auth.as_str())],
    );
    assert_eq!(resp.status, StatusCode::FORBIDDEN);
}
