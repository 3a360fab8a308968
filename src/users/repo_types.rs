use std::fmt;

use sqlx::FromRow;
use time::OffsetDateTime;
use uuid::Uuid;

use super::password::{hash_password, verify_password};

/// User record in the database. Email is the login identifier.
#[derive(Clone, FromRow)]
pub struct User {
    pub id: Uuid,
    pub email: String,
    pub password_hash: String, // Argon2 PHC string
    pub name: String,
    pub is_active: bool,
    pub is_staff: bool,
    pub is_superuser: bool,
    pub date_joined: OffsetDateTime,
    pub last_login: Option<OffsetDateTime>,
}

impl User {
    /// Replaces the stored hash; the change is persisted by the caller.
    pub fn set_password(&mut self, plain: &str) -> anyhow::Result<()> {
        self.password_hash = hash_password(plain)?;
        Ok(())
    }

    /// A malformed stored hash never matches.
    pub fn check_password(&self, plain: &str) -> bool {
        verify_password(plain, &self.password_hash).unwrap_or(false)
    }
}

impl fmt::Debug for User {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("User")
            .field("id", &self.id)
            .field("email", &self.email)
            .field("name", &self.name)
            .field("is_active", &self.is_active)
            .field("is_staff", &self.is_staff)
            .field("is_superuser", &self.is_superuser)
            .field("date_joined", &self.date_joined)
            .field("last_login", &self.last_login)
            .finish_non_exhaustive()
    }
}

/// Row to insert; the password is already hashed.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub email: String,
    pub password_hash: String,
    pub name: String,
    pub is_active: bool,
    pub is_staff: bool,
    pub is_superuser: bool,
}

impl NewUser {
    pub fn into_user(self, id: Uuid, date_joined: OffsetDateTime) -> User {
        User {
            id,
            email: self.email,
            password_hash: self.password_hash,
            name: self.name,
            is_active: self.is_active,
            is_staff: self.is_staff,
            is_superuser: self.is_superuser,
            date_joined,
            last_login: None,
        }
    }
}

/// Validated profile changes. `password` is still plaintext here and is
/// hashed through [`User::set_password`] when applied.
#[derive(Default, Clone)]
pub struct UserChanges {
    pub email: Option<String>,
    pub name: Option<String>,
    pub password: Option<String>,
}

impl fmt::Debug for UserChanges {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UserChanges")
            .field("email", &self.email)
            .field("name", &self.name)
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}
