// Life of a request:
// 1. Authorization chain: exempt paths pass, everything else must come from
//    an allowlisted address (or carry a token where a rule asks for one)
// 2. Login interceptor: POST on the login path is answered here
//    - verify credentials against the user directory
//    - re-read the user and sign a token
//    - respond with `token` and `userId` headers
// 3. Everything else is routed to the user-service handlers
//
// System components:
//  - Authentication manager + password verifier
//  - Token issuer
//  - Policy chain
//  - User directory

pub mod app;
pub mod auth;
pub mod config;
pub mod directory;
pub mod handlers;
pub mod time;
pub mod users;

#[cfg(test)]
mod e2e_tests;

pub use app::{AppState, StartupError, build_router};
