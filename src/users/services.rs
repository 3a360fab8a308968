use lazy_static::lazy_static;
use regex::Regex;
use tracing::debug;

use crate::db::StoreError;
use crate::users::{
    manager::normalize_email, password::burn_dummy_verify, repo::UserStore, repo_types::User,
};

pub(crate) fn is_valid_email(email: &str) -> bool {
    lazy_static! {
        static ref EMAIL_RE: Regex = Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap();
    }
    EMAIL_RE.is_match(email)
}

/// Credential check: the user must exist, the password must match and the
/// account must be active. All failures collapse to `None`.
pub async fn authenticate(
    store: &dyn UserStore,
    email: &str,
    password: &str,
) -> Result<Option<User>, StoreError> {
    let Some(user) = store.find_by_email(&normalize_email(email)).await? else {
        burn_dummy_verify(password);
        debug!("authenticate: unknown email");
        return Ok(None);
    };
    if !user.check_password(password) {
        debug!(user_id = %user.id, "authenticate: wrong password");
        return Ok(None);
    }
    if !user.is_active {
        debug!(user_id = %user.id, "authenticate: inactive user");
        return Ok(None);
    }
    Ok(Some(user))
}
