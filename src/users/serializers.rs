use tracing::{info, warn};

use crate::error::{ApiError, ApiResult, ValidationErrors};
use crate::users::{
    dto::{AuthTokenPayload, UserOut, UserPayload},
    manager::{normalize_email, ExtraFields, UserManager},
    repo::UserStore,
    repo_types::{User, UserChanges},
    services::{authenticate, is_valid_email},
};

pub const EMAIL_MAX_LENGTH: usize = 255;
pub const NAME_MAX_LENGTH: usize = 255;
pub const PASSWORD_MIN_LENGTH: usize = 8;
pub const PASSWORD_MAX_LENGTH: usize = 128;

const REQUIRED: &str = "This field is required.";
const BLANK: &str = "This field may not be blank.";
const NULL: &str = "This field may not be null.";

/// Unwraps a wire field. An explicit `null` is always an error; a missing
/// key is one only when `required`.
fn present(
    errors: &mut ValidationErrors,
    field: &str,
    value: Option<Option<String>>,
    required: bool,
) -> Option<String> {
    match value {
        Some(Some(v)) => Some(v),
        Some(None) => {
            errors.add(field, "null", NULL);
            None
        }
        None => {
            if required {
                errors.add(field, "required", REQUIRED);
            }
            None
        }
    }
}

fn clean_email(errors: &mut ValidationErrors, raw: String) -> Option<String> {
    let email = raw.trim();
    if email.is_empty() {
        errors.add("email", "blank", BLANK);
        return None;
    }
    if email.chars().count() > EMAIL_MAX_LENGTH {
        errors.add(
            "email",
            "max_length",
            format!("Ensure this field has no more than {EMAIL_MAX_LENGTH} characters."),
        );
        return None;
    }
    if !is_valid_email(email) {
        errors.add("email", "invalid", "Enter a valid email address.");
        return None;
    }
    Some(email.to_string())
}

/// Length rules only; the password is taken verbatim, never trimmed.
fn clean_password(errors: &mut ValidationErrors, raw: String) -> Option<String> {
    if raw.trim().is_empty() {
        errors.add("password", "blank", BLANK);
        return None;
    }
    let len = raw.chars().count();
    if len < PASSWORD_MIN_LENGTH {
        errors.add(
            "password",
            "min_length",
            format!("Ensure this field has at least {PASSWORD_MIN_LENGTH} characters."),
        );
        return None;
    }
    if len > PASSWORD_MAX_LENGTH {
        errors.add(
            "password",
            "max_length",
            format!("Ensure this field has no more than {PASSWORD_MAX_LENGTH} characters."),
        );
        return None;
    }
    Some(raw)
}

fn clean_name(errors: &mut ValidationErrors, raw: String) -> Option<String> {
    let name = raw.trim();
    if name.chars().count() > NAME_MAX_LENGTH {
        errors.add(
            "name",
            "max_length",
            format!("Ensure this field has no more than {NAME_MAX_LENGTH} characters."),
        );
        return None;
    }
    Some(name.to_string())
}

async fn check_unique_email(
    store: &dyn UserStore,
    errors: &mut ValidationErrors,
    email: &str,
    exclude: Option<&User>,
) -> ApiResult<()> {
    if let Some(existing) = store.find_by_email(&normalize_email(email)).await? {
        if exclude.map(|u| u.id) != Some(existing.id) {
            errors.add("email", "unique", "user with this email already exists.");
        }
    }
    Ok(())
}

/// How much of the payload an update must carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateMode {
    /// PATCH: only the fields present are validated and applied.
    Partial,
    /// PUT: email and password are required, as on create.
    Full,
}

/// Validated create input, handed to the user manager.
#[derive(Clone)]
pub struct CreateInput {
    pub email: String,
    pub password: String,
    pub name: String,
}

pub struct UserSerializer;

impl UserSerializer {
    pub async fn validate_create(
        store: &dyn UserStore,
        payload: UserPayload,
    ) -> ApiResult<CreateInput> {
        let mut errors = ValidationErrors::new();
        let email = present(&mut errors, "email", payload.email, true)
            .and_then(|e| clean_email(&mut errors, e));
        let password = present(&mut errors, "password", payload.password, true)
            .and_then(|p| clean_password(&mut errors, p));
        let name = match present(&mut errors, "name", payload.name, false) {
            Some(n) => clean_name(&mut errors, n),
            None => Some(String::new()),
        };
        if let Some(email) = email.as_deref() {
            check_unique_email(store, &mut errors, email, None).await?;
        }
        errors.into_result()?;

        match (email, password, name) {
            (Some(email), Some(password), Some(name)) => Ok(CreateInput {
                email,
                password,
                name,
            }),
            _ => Err(ApiError::Internal(anyhow::anyhow!(
                "create validation passed with missing fields"
            ))),
        }
    }

    pub async fn validate_update(
        store: &dyn UserStore,
        current: &User,
        payload: UserPayload,
        mode: UpdateMode,
    ) -> ApiResult<UserChanges> {
        let mut errors = ValidationErrors::new();
        let full = mode == UpdateMode::Full;
        let email = present(&mut errors, "email", payload.email, full)
            .and_then(|e| clean_email(&mut errors, e));
        let password = present(&mut errors, "password", payload.password, full)
            .and_then(|p| clean_password(&mut errors, p));
        let name = present(&mut errors, "name", payload.name, false)
            .and_then(|n| clean_name(&mut errors, n));
        if let Some(email) = email.as_deref() {
            check_unique_email(store, &mut errors, email, Some(current)).await?;
        }
        errors.into_result()?;
        Ok(UserChanges {
            email,
            name,
            password,
        })
    }

    /// Validates and delegates to the user manager, which owns hashing.
    pub async fn create(store: &dyn UserStore, payload: UserPayload) -> ApiResult<User> {
        let input = Self::validate_create(store, payload).await?;
        UserManager::new(store)
            .create_user(
                &input.email,
                &input.password,
                ExtraFields {
                    name: Some(input.name),
                    ..ExtraFields::default()
                },
            )
            .await
    }

    /// Plain fields are assigned directly; the password goes through
    /// [`User::set_password`]. One store write at the end.
    pub async fn update(
        store: &dyn UserStore,
        mut user: User,
        payload: UserPayload,
        mode: UpdateMode,
    ) -> ApiResult<User> {
        let UserChanges {
            email,
            name,
            password,
        } = Self::validate_update(store, &user, payload, mode).await?;

        if let Some(email) = email {
            user.email = normalize_email(&email);
        }
        if let Some(name) = name {
            user.name = name;
        }
        let password_changed = password.is_some();
        if let Some(password) = password {
            user.set_password(&password)?;
        }

        let user = store.update_user(&user).await?;
        info!(user_id = %user.id, password_changed, "user profile updated");
        Ok(user)
    }

    pub fn to_representation(user: &User) -> UserOut {
        UserOut {
            email: user.email.clone(),
            name: user.name.clone(),
        }
    }
}

pub struct AuthTokenSerializer;

impl AuthTokenSerializer {
    pub const AUTHORIZATION_FAILED: &'static str = "Unable to log in with provided credentials.";

    /// Returns the authenticated user. Unknown email and wrong password
    /// produce the same `authorization` error.
    pub async fn validate(store: &dyn UserStore, payload: AuthTokenPayload) -> ApiResult<User> {
        let mut errors = ValidationErrors::new();
        let email = present(&mut errors, "email", payload.email, true)
            .and_then(|e| clean_email(&mut errors, e));
        let password = present(&mut errors, "password", payload.password, true);
        let password = match password {
            Some(p) if p.is_empty() => {
                errors.add("password", "blank", BLANK);
                None
            }
            other => other,
        };
        errors.into_result()?;

        let (Some(email), Some(password)) = (email, password) else {
            return Err(ApiError::Internal(anyhow::anyhow!(
                "token validation passed with missing fields"
            )));
        };

        match authenticate(store, &email, &password).await? {
            Some(user) => Ok(user),
            None => {
                warn!("token request with invalid credentials");
                Err(ApiError::Validation(ValidationErrors::single(
                    ValidationErrors::NON_FIELD,
                    "authorization",
                    Self::AUTHORIZATION_FAILED,
                )))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryStore;

    fn payload(email: Option<&str>, password: Option<&str>, name: Option<&str>) -> UserPayload {
        UserPayload {
            email: email.map(|v| Some(v.into())),
            password: password.map(|v| Some(v.into())),
            name: name.map(|v| Some(v.into())),
        }
    }

    fn validation(err: ApiError) -> ValidationErrors {
        match err {
            ApiError::Validation(errors) => errors,
            other => panic!("expected validation error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn create_hashes_through_manager() {
        let store = MemoryStore::new();
        let user = UserSerializer::create(
            &store,
            payload(Some("test@test.com"), Some("testpass123"), Some("Test Name")),
        )
        .await
        .unwrap();
        assert_eq!(user.name, "Test Name");
        assert!(user.check_password("testpass123"));

        let out = serde_json::to_value(UserSerializer::to_representation(&user)).unwrap();
        assert_eq!(
            out,
            serde_json::json!({ "email": "test@test.com", "name": "Test Name" })
        );
    }

    #[tokio::test]
    async fn create_collects_all_field_errors() {
        let store = MemoryStore::new();
        let errors = validation(
            UserSerializer::create(&store, payload(Some("not-an-email"), Some("pw"), None))
                .await
                .unwrap_err(),
        );
        assert!(errors.has_code("email", "invalid"));
        assert!(errors.has_code("password", "min_length"));
        assert_eq!(store.user_count().await, 0);
    }

    #[tokio::test]
    async fn create_requires_email_and_password() {
        let store = MemoryStore::new();
        let errors = validation(
            UserSerializer::create(&store, payload(None, None, Some("x")))
                .await
                .unwrap_err(),
        );
        assert!(errors.has_code("email", "required"));
        assert!(errors.has_code("password", "required"));

        let errors = validation(
            UserSerializer::create(&store, payload(Some("  "), Some("testpass123"), None))
                .await
                .unwrap_err(),
        );
        assert!(errors.has_code("email", "blank"));
    }

    #[tokio::test]
    async fn create_rejects_overlong_password() {
        let store = MemoryStore::new();
        let long = "x".repeat(PASSWORD_MAX_LENGTH + 1);
        let errors = validation(
            UserSerializer::create(&store, payload(Some("a@b.com"), Some(&long), None))
                .await
                .unwrap_err(),
        );
        assert!(errors.has_code("password", "max_length"));
    }

    #[tokio::test]
    async fn create_rejects_duplicate_after_normalizing() {
        let store = MemoryStore::new();
        UserSerializer::create(&store, payload(Some("test@test.com"), Some("testpass123"), None))
            .await
            .unwrap();
        let errors = validation(
            UserSerializer::create(&store, payload(Some("test@TEST.com"), Some("testpass123"), None))
                .await
                .unwrap_err(),
        );
        assert!(errors.has_code("email", "unique"));
        assert_eq!(store.user_count().await, 1);
    }

    #[tokio::test]
    async fn partial_update_rehashes_password() {
        let store = MemoryStore::new();
        let user = UserSerializer::create(
            &store,
            payload(Some("test@test.com"), Some("testpass123"), Some("Old")),
        )
        .await
        .unwrap();

        let updated = UserSerializer::update(
            &store,
            user,
            payload(None, Some("newpassword123"), Some("Update name")),
            UpdateMode::Partial,
        )
        .await
        .unwrap();

        assert_eq!(updated.name, "Update name");
        assert_eq!(updated.email, "test@test.com");
        let stored = store.find_by_id(updated.id).await.unwrap().unwrap();
        assert!(stored.check_password("newpassword123"));
        assert!(!stored.check_password("testpass123"));
    }

    #[tokio::test]
    async fn partial_update_keeps_password_when_absent() {
        let store = MemoryStore::new();
        let user = UserSerializer::create(&store, payload(Some("a@b.com"), Some("testpass123"), None))
            .await
            .unwrap();
        let hash = user.password_hash.clone();
        let updated = UserSerializer::update(&store, user, payload(None, None, Some("N")), UpdateMode::Partial)
            .await
            .unwrap();
        assert_eq!(updated.password_hash, hash);
    }

    #[tokio::test]
    async fn full_update_requires_email_and_password() {
        let store = MemoryStore::new();
        let user = UserSerializer::create(&store, payload(Some("a@b.com"), Some("testpass123"), None))
            .await
            .unwrap();
        let errors = validation(
            UserSerializer::update(&store, user, payload(None, None, Some("N")), UpdateMode::Full)
                .await
                .unwrap_err(),
        );
        assert!(errors.has_code("email", "required"));
        assert!(errors.has_code("password", "required"));
    }

    #[tokio::test]
    async fn update_short_password_rejected_and_unchanged() {
        let store = MemoryStore::new();
        let user = UserSerializer::create(&store, payload(Some("a@b.com"), Some("testpass123"), None))
            .await
            .unwrap();
        let id = user.id;
        let errors = validation(
            UserSerializer::update(&store, user, payload(None, Some("short"), None), UpdateMode::Partial)
                .await
                .unwrap_err(),
        );
        assert!(errors.has_code("password", "min_length"));
        let stored = store.find_by_id(id).await.unwrap().unwrap();
        assert!(stored.check_password("testpass123"));
    }

    #[tokio::test]
    async fn update_rejects_explicit_nulls() {
        let store = MemoryStore::new();
        let user = UserSerializer::create(&store, payload(Some("a@b.com"), Some("testpass123"), Some("N")))
            .await
            .unwrap();
        let id = user.id;
        let nulls = UserPayload {
            email: Some(None),
            password: Some(None),
            name: Some(None),
        };
        let errors = validation(
            UserSerializer::update(&store, user, nulls, UpdateMode::Partial)
                .await
                .unwrap_err(),
        );
        assert!(errors.has_code("email", "null"));
        assert!(errors.has_code("password", "null"));
        assert!(errors.has_code("name", "null"));

        let stored = store.find_by_id(id).await.unwrap().unwrap();
        assert_eq!(stored.name, "N");
        assert!(stored.check_password("testpass123"));
    }

    #[tokio::test]
    async fn create_rejects_null_name() {
        let store = MemoryStore::new();
        let mut p = payload(Some("a@b.com"), Some("testpass123"), None);
        p.name = Some(None);
        let errors = validation(UserSerializer::create(&store, p).await.unwrap_err());
        assert!(errors.has_code("name", "null"));
        assert_eq!(store.user_count().await, 0);
    }

    #[tokio::test]
    async fn update_email_to_own_address_is_allowed() {
        let store = MemoryStore::new();
        let user = UserSerializer::create(&store, payload(Some("a@b.com"), Some("testpass123"), None))
            .await
            .unwrap();
        let updated = UserSerializer::update(
            &store,
            user,
            payload(Some("a@B.com"), None, None),
            UpdateMode::Partial,
        )
        .await
        .unwrap();
        assert_eq!(updated.email, "a@b.com");
    }

    #[tokio::test]
    async fn token_serializer_hides_which_part_failed() {
        let store = MemoryStore::new();
        UserSerializer::create(&store, payload(Some("test@test.com"), Some("goodpass"), None))
            .await
            .unwrap();

        let wrong_password = validation(
            AuthTokenSerializer::validate(
                &store,
                AuthTokenPayload {
                    email: Some(Some("test@test.com".into())),
                    password: Some(Some("badpass".into())),
                },
            )
            .await
            .unwrap_err(),
        );
        let unknown_email = validation(
            AuthTokenSerializer::validate(
                &store,
                AuthTokenPayload {
                    email: Some(Some("other@test.com".into())),
                    password: Some(Some("goodpass".into())),
                },
            )
            .await
            .unwrap_err(),
        );
        assert_eq!(wrong_password, unknown_email);
        assert!(wrong_password.has_code(ValidationErrors::NON_FIELD, "authorization"));
    }

    #[tokio::test]
    async fn token_serializer_requires_password() {
        let store = MemoryStore::new();
        let errors = validation(
            AuthTokenSerializer::validate(
                &store,
                AuthTokenPayload {
                    email: Some(Some("test@test.com".into())),
                    password: None,
                },
            )
            .await
            .unwrap_err(),
        );
        assert!(errors.has_code("password", "required"));

        let errors = validation(
            AuthTokenSerializer::validate(
                &store,
                AuthTokenPayload {
                    email: Some(Some("test@test.com".into())),
                    password: Some(Some(String::new())),
                },
            )
            .await
            .unwrap_err(),
        );
        assert!(errors.has_code("password", "blank"));
    }

    #[tokio::test]
    async fn token_serializer_returns_user() {
        let store = MemoryStore::new();
        let created = UserSerializer::create(&store, payload(Some("test@example.com"), Some("test-user-password123"), None))
            .await
            .unwrap();
        let user = AuthTokenSerializer::validate(
            &store,
            AuthTokenPayload {
                email: Some(Some("test@example.com".into())),
                password: Some(Some("test-user-password123".into())),
            },
        )
        .await
        .unwrap();
        assert_eq!(user.id, created.id);
    }
}
