//! Test signup and user lookups.

use axum::http::StatusCode;

use crate::e2e_tests::helpers::*;

const SIGNUP: &str = "/user-service/signup";

#[test]
fn test_signup_then_login() {
    let test = TestServer::new();

    let resp = test.post(
        SIGNUP,
        LOOPBACK,
        r#"{"email":"a@b.com","name":"Alice","pwd":"password123"}"#,
    );
    assert_eq!(resp.status, StatusCode::CREATED);

    let body = resp.json();
    assert_eq!(body["email"], "a@b.com");
    assert_eq!(body["name"], "Alice");
    assert!(body.get("pwd").is_none());
    let user_id = body["userId"].as_str().expect("userId").to_string();

    let login = test.login("a@b.com", "password123");
    assert_eq!(login.status, StatusCode::OK);
    assert_eq!(login.user_id(), Some(user_id.as_str()));
}

#[test]
fn test_signup_duplicate_email() {
    let test = TestServer::new();
    test.register("a@b.com", "password123");

    let resp = test.post(
        SIGNUP,
        LOOPBACK,
        r#"{"email":"a@b.com","name":"Other","pwd":"password456"}"#,
    );
    assert_eq!(resp.status, StatusCode::CONFLICT);
}

#[test]
fn test_signup_invalid_fields() {
    let test = TestServer::new();

    let resp = test.post(
        SIGNUP,
        LOOPBACK,
        r#"{"email":"a@b.com","name":"Alice","pwd":"short"}"#,
    );
    assert_eq!(resp.status, StatusCode::BAD_REQUEST);
    assert!(resp.json()["error"].as_str().is_some());
}

#[test]
fn test_signup_missing_fields_rejected_by_extractor() {
    let test = TestServer::new();

    let resp = test.post(SIGNUP, LOOPBACK, r#"{"email":"a@b.com"}"#);
    assert!(resp.status.is_client_error());
}

#[test]
fn test_get_user_by_id() {
    let test = TestServer::new();
    let user_id = test.register("a@b.com", "password123");

    let resp = test.get(&format!("/user-service/users/{user_id}"), LOOPBACK);
    assert_eq!(resp.status, StatusCode::OK);
    assert_eq!(resp.json()["userId"], user_id.as_str());

    let missing = test.get("/user-service/users/does-not-exist", LOOPBACK);
    assert_eq!(missing.status, StatusCode::NOT_FOUND);
}

#[test]
fn test_list_users() {
    let test = TestServer::new();
    test.register("b@b.com", "password123");
    test.register("a@b.com", "password123");

    let resp = test.get("/user-service/users", LOOPBACK);
    assert_eq!(resp.status, StatusCode::OK);

    let users = resp.json();
    let emails: Vec<&str> = users
        .as_array()
        .expect("array")
        .iter()
        .filter_map(|u| u["email"].as_str())
        .collect();
    assert_eq!(emails, vec!["a@b.com", "b@b.com"]);
}
