use serde::{Deserialize, Deserializer, Serialize};

/// Keeps an explicit `null` apart from a missing key: missing is `None`,
/// `null` is `Some(None)`.
fn nullable<'de, D>(deserializer: D) -> Result<Option<Option<String>>, D::Error>
where
    D: Deserializer<'de>,
{
    Option::<String>::deserialize(deserializer).map(Some)
}

/// Inbound user payload. Every field is optional at the wire level so that
/// missing or null fields surface as field errors instead of a body rejection.
#[derive(Default, Deserialize)]
pub struct UserPayload {
    #[serde(default, deserialize_with = "nullable")]
    pub email: Option<Option<String>>,
    #[serde(default, deserialize_with = "nullable")]
    pub password: Option<Option<String>>,
    #[serde(default, deserialize_with = "nullable")]
    pub name: Option<Option<String>>,
}

impl std::fmt::Debug for UserPayload {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UserPayload")
            .field("email", &self.email)
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

/// Request body for the token endpoint.
#[derive(Default, Deserialize)]
pub struct AuthTokenPayload {
    #[serde(default, deserialize_with = "nullable")]
    pub email: Option<Option<String>>,
    #[serde(default, deserialize_with = "nullable")]
    pub password: Option<Option<String>>,
}

/// Public view of a user. There is no password field to leak.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UserOut {
    pub email: String,
    pub name: String,
}

#[derive(Debug, Serialize)]
pub struct TokenResponse {
    pub token: String,
}
