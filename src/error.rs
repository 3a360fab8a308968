use std::collections::BTreeMap;

use axum::{
    extract::rejection::JsonRejection,
    http::{header, HeaderValue, Method, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::{ser::SerializeMap, Serialize, Serializer};
use serde_json::json;
use tracing::error;

use crate::db::StoreError;

pub type ApiResult<T> = Result<T, ApiError>;

/// A single failed rule on one input field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldError {
    pub code: &'static str,
    pub message: String,
}

/// Field-keyed validation failures, rendered as `{"field": ["message", ...]}`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationErrors {
    fields: BTreeMap<String, Vec<FieldError>>,
}

impl ValidationErrors {
    pub const NON_FIELD: &'static str = "non_field_errors";

    pub fn new() -> Self {
        Self::default()
    }

    pub fn single(field: &str, code: &'static str, message: impl Into<String>) -> Self {
        let mut errors = Self::new();
        errors.add(field, code, message);
        errors
    }

    pub fn add(&mut self, field: &str, code: &'static str, message: impl Into<String>) {
        self.fields
            .entry(field.to_string())
            .or_default()
            .push(FieldError {
                code,
                message: message.into(),
            });
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn field(&self, name: &str) -> Option<&[FieldError]> {
        self.fields.get(name).map(Vec::as_slice)
    }

    pub fn has_code(&self, name: &str, code: &str) -> bool {
        self.field(name)
            .map(|errs| errs.iter().any(|e| e.code == code))
            .unwrap_or(false)
    }

    /// `Ok(())` when nothing was recorded.
    pub fn into_result(self) -> Result<(), ValidationErrors> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(self)
        }
    }
}

impl Serialize for ValidationErrors {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.fields.len()))?;
        for (field, errs) in &self.fields {
            let messages: Vec<&str> = errs.iter().map(|e| e.message.as_str()).collect();
            map.serialize_entry(field, &messages)?;
        }
        map.end()
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("validation failed: {0:?}")]
    Validation(ValidationErrors),
    #[error("bad request: {0}")]
    BadRequest(String),
    #[error("unauthorized: {0}")]
    Unauthorized(&'static str),
    #[error("not found")]
    NotFound,
    #[error("method {0} not allowed")]
    MethodNotAllowed(Method),
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Validation(_) | ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ApiError::NotFound => StatusCode::NOT_FOUND,
            ApiError::MethodNotAllowed(_) => StatusCode::METHOD_NOT_ALLOWED,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<ValidationErrors> for ApiError {
    fn from(errors: ValidationErrors) -> Self {
        ApiError::Validation(errors)
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::DuplicateEmail => ApiError::Validation(ValidationErrors::single(
                "email",
                "unique",
                "user with this email already exists.",
            )),
            StoreError::NotFound => ApiError::NotFound,
            StoreError::InvalidValue(msg) => ApiError::BadRequest(msg),
            StoreError::Database(e) => ApiError::Internal(anyhow::Error::new(e).context("database")),
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        match self {
            ApiError::Validation(errors) => (status, Json(errors)).into_response(),
            ApiError::BadRequest(detail) => (status, Json(json!({ "detail": detail }))).into_response(),
            ApiError::Unauthorized(detail) => {
                let mut res = (status, Json(json!({ "detail": detail }))).into_response();
                res.headers_mut()
                    .insert(header::WWW_AUTHENTICATE, HeaderValue::from_static("Token"));
                res
            }
            ApiError::NotFound => (status, Json(json!({ "detail": "Not found." }))).into_response(),
            ApiError::MethodNotAllowed(method) => (
                status,
                Json(json!({ "detail": format!("Method \"{}\" not allowed.", method) })),
            )
                .into_response(),
            ApiError::Internal(e) => {
                error!(error = ?e, "request failed");
                (status, Json(json!({ "detail": "internal server error" }))).into_response()
            }
        }
    }
}
