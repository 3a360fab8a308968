use axum::async_trait;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::db::{PgStore, StoreError};
use crate::users::repo_types::{NewUser, User};

#[async_trait]
pub trait UserStore: Send + Sync {
    /// Inserts a user; a taken email yields `StoreError::DuplicateEmail`.
    async fn insert_user(&self, new: NewUser) -> Result<User, StoreError>;
    async fn find_by_email(&self, email: &str) -> Result<Option<User>, StoreError>;
    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, StoreError>;
    /// Writes every mutable column of `user` in one statement.
    async fn update_user(&self, user: &User) -> Result<User, StoreError>;
    async fn record_login(&self, id: Uuid, at: OffsetDateTime) -> Result<(), StoreError>;
}

const USER_COLUMNS: &str = "id, email, password_hash, name, is_active, is_staff, is_superuser, date_joined, last_login";

#[async_trait]
impl UserStore for PgStore {
    async fn insert_user(&self, new: NewUser) -> Result<User, StoreError> {
        let sql = format!(
            r#"
            INSERT INTO users (id, email, password_hash, name, is_active, is_staff, is_superuser)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING {USER_COLUMNS}
            "#
        );
        sqlx::query_as::<_, User>(&sql)
            .bind(Uuid::new_v4())
            .bind(&new.email)
            .bind(&new.password_hash)
            .bind(&new.name)
            .bind(new.is_active)
            .bind(new.is_staff)
            .bind(new.is_superuser)
            .fetch_one(&self.pool)
            .await
            .map_err(StoreError::from_user_write)
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE email = $1");
        let user = sqlx::query_as::<_, User>(&sql)
            .bind(email)
            .fetch_optional(&self.pool)
            .await?;
        Ok(user)
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, StoreError> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1");
        let user = sqlx::query_as::<_, User>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(user)
    }

    async fn update_user(&self, user: &User) -> Result<User, StoreError> {
        let sql = format!(
            r#"
            UPDATE users
               SET email = $2, password_hash = $3, name = $4,
                   is_active = $5, is_staff = $6, is_superuser = $7
             WHERE id = $1
            RETURNING {USER_COLUMNS}
            "#
        );
        sqlx::query_as::<_, User>(&sql)
            .bind(user.id)
            .bind(&user.email)
            .bind(&user.password_hash)
            .bind(&user.name)
            .bind(user.is_active)
            .bind(user.is_staff)
            .bind(user.is_superuser)
            .fetch_optional(&self.pool)
            .await
            .map_err(StoreError::from_user_write)?
            .ok_or(StoreError::NotFound)
    }

    async fn record_login(&self, id: Uuid, at: OffsetDateTime) -> Result<(), StoreError> {
        sqlx::query("UPDATE users SET last_login = $2 WHERE id = $1")
            .bind(id)
            .bind(at)
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}
