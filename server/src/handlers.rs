//! HTTP handlers for the user-service routes.
//!
//! Login is not here: the login interceptor answers it before routing.

use std::net::SocketAddr;

use axum::{
    Extension, Json,
    extract::{ConnectInfo, OriginalUri, Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;

use crate::app::AppState;
use crate::auth::AuthenticatedUser;
use crate::users::{NewUser, UserServiceError, UserView};

impl IntoResponse for UserServiceError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            Self::Validation(reason) => (StatusCode::BAD_REQUEST, reason.clone()),
            Self::DuplicateEmail => (StatusCode::CONFLICT, self.to_string()),
            Self::NotFound => (StatusCode::NOT_FOUND, self.to_string()),
            Self::Directory(_) | Self::Hashing(_) | Self::Interrupted(_) => {
                tracing::error!("user service failure: {self}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal error".to_string(),
                )
            }
        };
        (status, Json(json!({ "error": message }))).into_response()
    }
}

/// Service status. Never echoes the token secret.
pub async fn health_check(State(state): State<AppState>) -> String {
    format!(
        "It's Working in User Service, port(server.port)={}, token expiration time={}",
        state.config.listen_port, state.config.token_expiration_ms
    )
}

pub async fn actuator_health() -> Json<serde_json::Value> {
    Json(json!({ "status": "UP" }))
}

pub async fn actuator_info() -> Json<serde_json::Value> {
    Json(json!({
        "name": env!("CARGO_PKG_NAME"),
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

pub async fn welcome(
    State(state): State<AppState>,
    OriginalUri(uri): OriginalUri,
    peer: Option<Extension<ConnectInfo<SocketAddr>>>,
    user: Option<Extension<AuthenticatedUser>>,
) -> String {
    tracing::info!(
        remote = ?peer.map(|Extension(ConnectInfo(addr))| addr),
        uri = %uri,
        user_id = ?user.map(|Extension(user)| user.user_id),
        "users.welcome"
    );
    state.config.greeting_message.clone()
}

pub async fn signup(
    State(state): State<AppState>,
    Json(new_user): Json<NewUser>,
) -> Result<(StatusCode, Json<UserView>), UserServiceError> {
    let users = state.users.clone();
    let created = tokio::task::spawn_blocking(move || users.create_user(new_user))
        .await
        .map_err(|e| UserServiceError::Interrupted(e.to_string()))??;
    Ok((StatusCode::CREATED, Json(created)))
}

pub async fn list_users(
    State(state): State<AppState>,
) -> Result<Json<Vec<UserView>>, UserServiceError> {
    Ok(Json(state.users.all_users()?))
}

pub async fn get_user(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> Result<Json<UserView>, UserServiceError> {
    Ok(Json(state.users.user_by_id(&user_id)?))
}

pub async fn not_found() -> StatusCode {
    StatusCode::NOT_FOUND
}
