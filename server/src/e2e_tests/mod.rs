//! End-to-end tests at the HTTP request/response level.
//!
//! Each test file covers a specific scenario, driving the full router
//! (authorization chain, login interceptor, handlers) with deterministic
//! inputs and a pinned clock.

#![cfg(test)]

mod helpers;

mod test_login;
mod test_signup;
mod test_token_verification;
