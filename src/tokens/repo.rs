use axum::async_trait;
use uuid::Uuid;

use crate::db::{PgStore, StoreError};
use crate::tokens::repo_types::AuthToken;

#[async_trait]
pub trait TokenStore: Send + Sync {
    /// Returns the user's existing token, or stores `candidate_key` as a new one.
    async fn get_or_create_for_user(
        &self,
        user_id: Uuid,
        candidate_key: &str,
    ) -> Result<AuthToken, StoreError>;
    async fn find_by_key(&self, key: &str) -> Result<Option<AuthToken>, StoreError>;
}

#[async_trait]
impl TokenStore for PgStore {
    async fn get_or_create_for_user(
        &self,
        user_id: Uuid,
        candidate_key: &str,
    ) -> Result<AuthToken, StoreError> {
        // The no-op DO UPDATE makes RETURNING yield the existing row on conflict.
        let token = sqlx::query_as::<_, AuthToken>(
            r#"
            INSERT INTO auth_tokens (key, user_id)
            VALUES ($1, $2)
            ON CONFLICT (user_id) DO UPDATE SET user_id = EXCLUDED.user_id
            RETURNING key, user_id, created
            "#,
        )
        .bind(candidate_key)
        .bind(user_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(token)
    }

    async fn find_by_key(&self, key: &str) -> Result<Option<AuthToken>, StoreError> {
        let token = sqlx::query_as::<_, AuthToken>(
            r#"SELECT key, user_id, created FROM auth_tokens WHERE key = $1"#,
        )
        .bind(key)
        .fetch_optional(&self.pool)
        .await?;
        Ok(token)
    }
}
