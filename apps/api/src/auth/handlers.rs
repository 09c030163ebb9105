use axum::{extract::State, http::HeaderMap, Json};
use serde_json::{json, Value};

use crate::auth::{bearer_token, AccessToken, AuthError, LoginRequest, RegisterRequest};
use crate::errors::AppError;
use crate::state::AppState;

/// POST /auth/register
pub async fn handle_register(
    State(state): State<AppState>,
    Json(request): Json<RegisterRequest>,
) -> Result<Json<Value>, AppError> {
    state.auth.register(request).await?;
    Ok(Json(json!({ "message": "User registered successfully" })))
}

/// POST /auth/login
pub async fn handle_login(
    State(state): State<AppState>,
    Json(request): Json<LoginRequest>,
) -> Result<Json<AccessToken>, AppError> {
    Ok(Json(state.auth.login(request).await?))
}

/// POST /auth/logout
///
/// Revokes the presented bearer token for the rest of its lifetime.
pub async fn handle_logout(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<Value>, AppError> {
    let token = bearer_token(&headers).ok_or(AuthError::MissingToken)?;
    state.auth.logout(token).await?;
    Ok(Json(json!({ "message": "Logged out successfully" })))
}
