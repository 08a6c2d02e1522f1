use sqlx::FromRow;
use time::OffsetDateTime;
use uuid::Uuid;

/// User record in the database. Never sent to clients; see `PublicUser`.
#[derive(Debug, Clone, FromRow)]
pub struct User {
    pub id: Uuid,
    pub name: String,
    pub email: String, // trimmed + lower-cased
    pub password_hash: String, // Argon2 hash
    pub created_at: OffsetDateTime,
}
