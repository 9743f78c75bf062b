//! Test the login interceptor end to end.

use axum::http::{Method, StatusCode};

use crate::auth::{JwtError, verify_token};
use crate::e2e_tests::helpers::*;

#[test]
fn test_login_success_sets_token_and_user_id() {
    let test = TestServer::new();
    let user_id = test.register("a@b.com", "correct-password");

    let resp = test.login("a@b.com", "correct-password");

    assert_eq!(resp.status, StatusCode::OK);
    assert_eq!(resp.user_id(), Some(user_id.as_str()));
    assert!(resp.body.is_empty());

    let token = resp.token().expect("token header");
    let subject =
        verify_token(token, &test.state.signing_key, TEST_NOW_MS).expect("token verifies");
    assert_eq!(subject, user_id);
}

#[test]
fn test_login_user_id_header_is_case_insensitive() {
    let test = TestServer::new();
    let user_id = test.register("a@b.com", "correct-password");

    let resp = test.login("a@b.com", "correct-password");
    let header = resp.headers.get("userId").and_then(|v| v.to_str().ok());
    assert_eq!(header, Some(user_id.as_str()));
}

#[test]
fn test_login_wrong_password() {
    let test = TestServer::new();
    test.register("a@b.com", "correct-password");

    let resp = test.login("a@b.com", "wrong-password");

    assert_eq!(resp.status, StatusCode::UNAUTHORIZED);
    assert!(resp.token().is_none());
    assert!(resp.user_id().is_none());
    assert!(resp.body.is_empty());
}

#[test]
fn test_login_unknown_email_is_indistinguishable_from_wrong_password() {
    let test = TestServer::new();
    test.register("a@b.com", "correct-password");

    let unknown = test.login("nobody@b.com", "correct-password");
    let wrong = test.login("a@b.com", "wrong-password");

    assert_eq!(unknown.status, wrong.status);
    assert_eq!(unknown.body, wrong.body);
    assert_eq!(unknown.headers.len(), wrong.headers.len());
    assert!(unknown.token().is_none());
}

#[test]
fn test_login_malformed_body() {
    let test = TestServer::new();
    test.register("a@b.com", "correct-password");

    for body in ["", "{", r#"{"email":"a@b.com"}"#, r#"{"email":1,"password":2}"#] {
        let resp = test.post("/user-service/login", LOOPBACK, body);
        assert_eq!(resp.status, StatusCode::BAD_REQUEST, "body {body:?}");
        assert!(resp.token().is_none());
    }
}

#[test]
fn test_login_path_only_intercepts_post() {
    let test = TestServer::new();

    let resp = test.get("/user-service/login", LOOPBACK);
    assert_eq!(resp.status, StatusCode::NOT_FOUND);
    assert!(resp.token().is_none());
}

#[test]
fn test_login_is_gated_by_source_address() {
    let test = TestServer::new();
    test.register("a@b.com", "correct-password");

    let body = r#"{"email":"a@b.com","password":"correct-password"}"#;
    let resp = test.post("/user-service/login", FOREIGN, body);

    assert_eq!(resp.status, StatusCode::FORBIDDEN);
    assert!(resp.token().is_none());
}

#[test]
fn test_login_at_same_instant_yields_identical_tokens() {
    let test = TestServer::new();
    test.register("a@b.com", "correct-password");

    let first = test.login("a@b.com", "correct-password");
    let second = test.login("a@b.com", "correct-password");
    assert_eq!(first.token(), second.token());

    test.clock.advance(1_000);
    let later = test.login("a@b.com", "correct-password");
    assert_ne!(first.token(), later.token());
}

#[test]
fn test_login_token_expires_after_ttl() {
    let test = TestServer::new();
    test.register("a@b.com", "correct-password");

    let resp = test.login("a@b.com", "correct-password");
    let token = resp.token().expect("token header");

    let key = &test.state.signing_key;
    assert!(verify_token(token, key, TEST_NOW_MS + TEST_TTL_MS - 1).is_ok());
    assert_eq!(
        verify_token(token, key, TEST_NOW_MS + TEST_TTL_MS),
        Err(JwtError::TokenExpired)
    );
}

#[test]
fn test_login_custom_path() {
    let test = TestServer::with_env(&[("USER_SERVICE_LOGIN_PATH", "/auth/login")]);
    test.register("a@b.com", "correct-password");
    let body = r#"{"email":"a@b.com","password":"correct-password"}"#;

    let custom = test.send(Method::POST, "/auth/login", LOOPBACK, Some(body), &[]);
    assert_eq!(custom.status, StatusCode::OK);
    assert!(custom.token().is_some());

    let default = test.post("/user-service/login", LOOPBACK, body);
    assert_eq!(default.status, StatusCode::NOT_FOUND);
}

#[test]
fn test_login_token_issued_mid_second_lives_full_ttl() {
    let test = TestServer::with_env(&[("USER_SERVICE_TOKEN_EXPIRATION_TIME", "500")]);
    test.register("a@b.com", "correct-password");
    test.clock.advance(100);

    let resp = test.login("a@b.com", "correct-password");
    let token = resp.token().expect("token header");

    let now = TEST_NOW_MS + 100;
    let subject = verify_token(token, &test.state.signing_key, now + 499);
    assert_eq!(subject.as_deref().ok(), resp.user_id());
}
