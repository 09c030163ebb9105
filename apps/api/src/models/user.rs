use sqlx::FromRow;
use uuid::Uuid;

/// A registered account as the auth flow reads it. Never serialized: the
/// hash stays server-side.
#[derive(Debug, Clone, FromRow)]
pub struct User {
    pub id: Uuid,
    pub username: String,
    pub password_hash: String,
}
