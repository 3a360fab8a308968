use sqlx::FromRow;
use time::OffsetDateTime;
use uuid::Uuid;

/// Opaque bearer token; one per user.
#[derive(Debug, Clone, FromRow)]
pub struct AuthToken {
    pub key: String,
    pub user_id: Uuid,
    pub created: OffsetDateTime,
}
