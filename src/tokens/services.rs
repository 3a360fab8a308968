use rand::{rngs::OsRng, RngCore};
use time::OffsetDateTime;
use tracing::{debug, info, warn};

use crate::error::ApiResult;
use crate::tokens::{repo::TokenStore, repo_types::AuthToken};
use crate::users::{repo::UserStore, repo_types::User};

pub const KEY_BYTES: usize = 20;

/// 40 lowercase hex chars from the OS RNG.
pub fn generate_key() -> String {
    let mut buf = [0u8; KEY_BYTES];
    OsRng.fill_bytes(&mut buf);
    hex::encode(buf)
}

/// Reuses the user's token or creates one, then stamps `last_login`.
/// A failed stamp is logged; the token is already stored and is still returned.
pub async fn issue_token(
    tokens: &dyn TokenStore,
    users: &dyn UserStore,
    user: &User,
) -> ApiResult<AuthToken> {
    let candidate = generate_key();
    let token = tokens.get_or_create_for_user(user.id, &candidate).await?;
    if token.key == candidate {
        info!(user_id = %user.id, "auth token created");
    } else {
        debug!(user_id = %user.id, "auth token reused");
    }
    if let Err(e) = users.record_login(user.id, OffsetDateTime::now_utc()).await {
        warn!(user_id = %user.id, error = %e, "failed to record last_login");
    }
    Ok(token)
}

#[cfg(test)]
mod tests {
    use axum::async_trait;
    use uuid::Uuid;

    use super::*;
    use crate::db::StoreError;
    use crate::memory::MemoryStore;
    use crate::users::manager::{ExtraFields, UserManager};
    use crate::users::repo_types::NewUser;

    /// Delegates to a memory store but cannot stamp `last_login`.
    struct NoLoginStamp(MemoryStore);

    #[async_trait]
    impl UserStore for NoLoginStamp {
        async fn insert_user(&self, new: NewUser) -> Result<User, StoreError> {
            self.0.insert_user(new).await
        }
        async fn find_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
            self.0.find_by_email(email).await
        }
        async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, StoreError> {
            self.0.find_by_id(id).await
        }
        async fn update_user(&self, user: &User) -> Result<User, StoreError> {
            self.0.update_user(user).await
        }
        async fn record_login(&self, _id: Uuid, _at: OffsetDateTime) -> Result<(), StoreError> {
            Err(StoreError::NotFound)
        }
    }

    #[test]
    fn generated_keys_are_hex_and_unique() {
        let a = generate_key();
        let b = generate_key();
        assert_eq!(a.len(), 40);
        assert!(a.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
        assert_ne!(a, b);
    }

    #[tokio::test]
    async fn issue_token_reuses_existing_key() {
        let store = MemoryStore::new();
        let user = UserManager::new(&store)
            .create_user("test@example.com", "testpass123", ExtraFields::default())
            .await
            .unwrap();

        let first = issue_token(&store, &store, &user).await.unwrap();
        let second = issue_token(&store, &store, &user).await.unwrap();
        assert_eq!(first.key, second.key);
        assert_eq!(first.user_id, user.id);

        let reloaded = store.find_by_id(user.id).await.unwrap().unwrap();
        assert!(reloaded.last_login.is_some());
    }

    #[tokio::test]
    async fn token_returned_when_last_login_stamp_fails() {
        let users = NoLoginStamp(MemoryStore::new());
        let tokens = MemoryStore::new();
        let user = UserManager::new(&users)
            .create_user("test@example.com", "testpass123", ExtraFields::default())
            .await
            .unwrap();

        let token = issue_token(&tokens, &users, &user).await.unwrap();
        assert_eq!(token.user_id, user.id);
        assert_eq!(tokens.find_by_key(&token.key).await.unwrap().unwrap().user_id, user.id);
    }
}
