use axum::{
    async_trait,
    extract::FromRequestParts,
    http::{header::AUTHORIZATION, request::Parts},
};
use tracing::warn;

use crate::error::ApiError;
use crate::state::AppState;
use crate::users::repo_types::User;

/// Resolves `Authorization: Token <key>` (or `Bearer <key>`) to an active user.
pub struct AuthUser(pub User);

/// Returns the key, or the message to reject with.
fn parse_authorization(header: &str) -> Result<&str, &'static str> {
    let mut parts = header.split_whitespace();
    let scheme = parts.next().unwrap_or_default();
    if !scheme.eq_ignore_ascii_case("token") && !scheme.eq_ignore_ascii_case("bearer") {
        return Err("Authentication credentials were not provided.");
    }
    let key = parts
        .next()
        .ok_or("Invalid token header. No credentials provided.")?;
    if parts.next().is_some() {
        return Err("Invalid token header. Token string should not contain spaces.");
    }
    Ok(key)
}

#[async_trait]
impl FromRequestParts<AppState> for AuthUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let header = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|h| h.to_str().ok())
            .ok_or(ApiError::Unauthorized(
                "Authentication credentials were not provided.",
            ))?;
        let key = parse_authorization(header).map_err(ApiError::Unauthorized)?;

        let Some(token) = state.tokens.find_by_key(key).await? else {
            warn!("unknown auth token");
            return Err(ApiError::Unauthorized("Invalid token."));
        };
        let user = match state.users.find_by_id(token.user_id).await? {
            Some(u) if u.is_active => u,
            _ => {
                warn!(user_id = %token.user_id, "token for inactive or missing user");
                return Err(ApiError::Unauthorized("User inactive or deleted."));
            }
        };
        Ok(AuthUser(user))
    }
}
