//! Identity provider — registration, login, token verification and logout.
//!
//! Secret material comes from configuration; revoked tokens live in a
//! `RevocationList` (Redis in production) rather than process memory.

use std::sync::Arc;

use axum::{
    extract::{Request, State},
    http::{header::AUTHORIZATION, HeaderMap},
    middleware::Next,
    response::Response,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::info;

pub mod handlers;
pub mod password;
pub mod revocation;
pub mod tokens;
pub mod users;

use crate::errors::AppError;
use crate::state::AppState;
use password::{hash_password, verify_password};
use revocation::RevocationList;
use tokens::{Claims, TokenIssuer};
use users::{NewUser, UserStore};

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Passwords do not match")]
    PasswordMismatch,

    #[error("Invalid email address: {0}")]
    InvalidEmail(String),

    #[error("Username already exists")]
    UsernameTaken,

    #[error("Invalid username or password")]
    InvalidCredentials,

    #[error("Missing bearer token")]
    MissingToken,

    #[error("Invalid token: {0}")]
    InvalidToken(String),

    #[error("Token has been revoked")]
    Revoked,

    #[error("User store error: {0}")]
    Store(#[from] sqlx::Error),

    #[error("Revocation list error: {0}")]
    Revocation(String),

    #[error("{0}")]
    Hashing(String),

    #[error("Token signing failed: {0}")]
    Signing(String),
}

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub username: String,
    pub password: String,
    pub confirm_password: String,
    pub email: String,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct AccessToken {
    pub access_token: String,
    pub token_type: &'static str,
}

/// Identity of the caller, inserted into request extensions by `require_auth`.
#[derive(Debug, Clone)]
pub struct AuthenticatedUser {
    pub username: String,
}

#[derive(Clone)]
pub struct AuthService {
    users: Arc<dyn UserStore>,
    revocations: Arc<dyn RevocationList>,
    tokens: TokenIssuer,
}

impl AuthService {
    pub fn new(
        users: Arc<dyn UserStore>,
        revocations: Arc<dyn RevocationList>,
        tokens: TokenIssuer,
    ) -> Self {
        Self {
            users,
            revocations,
            tokens,
        }
    }

    pub async fn register(&self, request: RegisterRequest) -> Result<(), AuthError> {
        if request.password != request.confirm_password {
            return Err(AuthError::PasswordMismatch);
        }
        if !looks_like_email(&request.email) {
            return Err(AuthError::InvalidEmail(request.email));
        }
        if self.users.find_by_username(&request.username).await?.is_some() {
            return Err(AuthError::UsernameTaken);
        }

        let user = self
            .users
            .insert(NewUser {
                username: request.username,
                email: request.email,
                password_hash: hash_password(&request.password)?,
            })
            .await?;
        info!("Registered user {} ({})", user.username, user.id);
        Ok(())
    }

    pub async fn login(&self, request: LoginRequest) -> Result<AccessToken, AuthError> {
        let user = self
            .users
            .find_by_username(&request.username)
            .await?
            .ok_or(AuthError::InvalidCredentials)?;
        if !verify_password(&request.password, &user.password_hash) {
            return Err(AuthError::InvalidCredentials);
        }

        let (access_token, _) = self.tokens.issue(&user.username)?;
        info!("Issued access token for {}", user.username);
        Ok(AccessToken {
            access_token,
            token_type: "bearer",
        })
    }

    /// Signature, expiry, then revocation.
    pub async fn verify(&self, token: &str) -> Result<Claims, AuthError> {
        let claims = self.tokens.decode(token)?;
        if self.revocations.is_revoked(&claims.jti).await? {
            return Err(AuthError::Revoked);
        }
        Ok(claims)
    }

    pub async fn logout(&self, token: &str) -> Result<(), AuthError> {
        let claims = self.verify(token).await?;
        self.revocations
            .revoke(&claims.jti, claims.remaining_secs())
            .await?;
        info!("Revoked token {} for {}", claims.jti, claims.sub);
        Ok(())
    }
}

fn looks_like_email(email: &str) -> bool {
    match email.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty()
                && !domain.contains('@')
                && domain.contains('.')
                && !domain.starts_with('.')
                && !domain.ends_with('.')
        }
        None => false,
    }
}

pub fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|t| !t.is_empty())
}

/// Route layer guarding endpoints when `REQUIRE_AUTH` is enabled.
pub async fn require_auth(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let token = bearer_token(request.headers())
        .ok_or(AuthError::MissingToken)?
        .to_string();
    let claims = state.auth.verify(&token).await?;
    request
        .extensions_mut()
        .insert(AuthenticatedUser { username: claims.sub });
    Ok(next.run(request).await)
}
