use tracing::{info, instrument};

use crate::config::SuperuserConfig;
use crate::error::{ApiError, ApiResult, ValidationErrors};
use crate::users::{
    password::hash_password,
    repo::UserStore,
    repo_types::{NewUser, User},
};

/// Lowercases the domain part (after the last `@`) and leaves the local part alone.
/// Input without an `@` is returned unchanged.
pub fn normalize_email(email: &str) -> String {
    match email.trim().rsplit_once('@') {
        Some((local, domain)) => format!("{}@{}", local, domain.to_lowercase()),
        None => email.to_string(),
    }
}

/// Optional columns accepted by [`UserManager::create_user`].
#[derive(Debug, Clone, Default)]
pub struct ExtraFields {
    pub name: Option<String>,
    pub is_active: Option<bool>,
    pub is_staff: Option<bool>,
    pub is_superuser: Option<bool>,
}

/// Every user record is created through here.
pub struct UserManager<'a> {
    store: &'a dyn UserStore,
}

impl<'a> UserManager<'a> {
    pub fn new(store: &'a dyn UserStore) -> Self {
        Self { store }
    }

    #[instrument(skip(self, password, extra))]
    pub async fn create_user(
        &self,
        email: &str,
        password: &str,
        extra: ExtraFields,
    ) -> ApiResult<User> {
        if email.trim().is_empty() {
            return Err(ApiError::Validation(ValidationErrors::single(
                "email",
                "required",
                "The given email must be set.",
            )));
        }

        let new = NewUser {
            email: normalize_email(email),
            password_hash: hash_password(password)?,
            name: extra.name.unwrap_or_default(),
            is_active: extra.is_active.unwrap_or(true),
            is_staff: extra.is_staff.unwrap_or(false),
            is_superuser: extra.is_superuser.unwrap_or(false),
        };
        let user = self.store.insert_user(new).await?;
        info!(user_id = %user.id, email = %user.email, is_staff = user.is_staff, "user created");
        Ok(user)
    }

    pub async fn create_superuser(&self, email: &str, password: &str) -> ApiResult<User> {
        self.create_user(
            email,
            password,
            ExtraFields {
                is_staff: Some(true),
                is_superuser: Some(true),
                ..ExtraFields::default()
            },
        )
        .await
    }
}

/// Creates the configured superuser unless that email is already registered.
pub async fn bootstrap_superuser(
    store: &dyn UserStore,
    cfg: &SuperuserConfig,
) -> ApiResult<Option<User>> {
    if store.find_by_email(&normalize_email(&cfg.email)).await?.is_some() {
        info!(email = %cfg.email, "bootstrap superuser already present");
        return Ok(None);
    }
    let user = UserManager::new(store)
        .create_superuser(&cfg.email, &cfg.password)
        .await?;
    Ok(Some(user))
}
