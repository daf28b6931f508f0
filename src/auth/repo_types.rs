use sqlx::FromRow;
use time::OffsetDateTime;
use uuid::Uuid;

/// User record in the database.
#[derive(Debug, Clone, FromRow)]
pub struct User {
    pub id: Uuid,                     // unique user ID
    pub email: String,                // normalized email, unique
    pub password_hash: String,        // Argon2 PHC string
    pub is_active: bool,
    pub is_admin: bool,
    pub created_at: OffsetDateTime,   // creation timestamp
}

/// Insert payload. Only the email and the hash come from the caller;
/// flags take the store defaults.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub email: String,
    pub password_hash: String,
}
