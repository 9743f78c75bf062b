//! Authorization middleware: runs the policy chain on every request.

use std::net::{IpAddr, SocketAddr};

use axum::{
    extract::{ConnectInfo, Request, State},
    http::{HeaderMap, StatusCode, header::AUTHORIZATION},
    middleware::Next,
    response::{IntoResponse, Response},
};

use super::jwt::verify_token;
use super::policy::{AuthState, Decision};
use crate::app::AppState;

/// Identity established from a valid bearer token.
///
/// Inserted into request extensions when the request is allowed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthenticatedUser {
    pub user_id: String,
}

pub async fn authorize_request(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Response {
    let source = source_address(&request);
    let user = authenticated_user(&state, request.headers());
    let auth = if user.is_some() {
        AuthState::Authenticated
    } else {
        AuthState::Anonymous
    };

    let decision = state.policy.evaluate(request.uri().path(), source, auth);
    tracing::debug!(
        path = request.uri().path(),
        source = ?source,
        decision = ?decision,
        "authorization decision"
    );

    match decision {
        Decision::Allowed => {
            if let Some(user) = user {
                request.extensions_mut().insert(user);
            }
            next.run(request).await
        }
        Decision::Unauthenticated => StatusCode::UNAUTHORIZED.into_response(),
        Decision::ForbiddenBySourceIp | Decision::NoMatchingRule => {
            StatusCode::FORBIDDEN.into_response()
        }
    }
}

/// Peer address of the connection, with IPv4-mapped IPv6 folded to IPv4.
fn source_address(request: &Request) -> Option<IpAddr> {
    request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.ip().to_canonical())
}

fn authenticated_user(state: &AppState, headers: &HeaderMap) -> Option<AuthenticatedUser> {
    let token = extract_bearer(headers)?;
    match verify_token(token, &state.signing_key, state.clock.now_ms()) {
        Ok(user_id) => Some(AuthenticatedUser { user_id }),
        Err(e) => {
            tracing::debug!("ignoring bearer token: {e}");
            None
        }
    }
}

fn extract_bearer(headers: &HeaderMap) -> Option<&str> {
    let header = headers.get(AUTHORIZATION)?.to_str().ok()?;
    let token = header.strip_prefix("Bearer ")?.trim();
    if token.is_empty() {
        return None;
    }
    Some(token)
}
