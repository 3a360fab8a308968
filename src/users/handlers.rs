use axum::{
    extract::{rejection::JsonRejection, State},
    http::{Method, StatusCode},
    routing::{get, post},
    Json, Router,
};
use tracing::{info, instrument};

use crate::{
    error::{ApiError, ApiResult},
    state::AppState,
    tokens::services::issue_token,
    users::{
        dto::{AuthTokenPayload, TokenResponse, UserOut, UserPayload},
        extractors::AuthUser,
        serializers::{AuthTokenSerializer, UpdateMode, UserSerializer},
    },
};

pub fn user_routes() -> Router<AppState> {
    Router::new()
        .route("/user/create", post(create_user))
        .route("/user/token", post(create_token))
        .route(
            "/user/me",
            get(retrieve_me)
                .patch(partial_update_me)
                .put(update_me)
                .post(post_me),
        )
}

#[instrument(skip(state, payload))]
pub async fn create_user(
    State(state): State<AppState>,
    payload: Result<Json<UserPayload>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<UserOut>)> {
    let Json(payload) = payload?;
    let user = UserSerializer::create(state.users.as_ref(), payload).await?;
    info!(user_id = %user.id, email = %user.email, "user registered");
    Ok((
        StatusCode::CREATED,
        Json(UserSerializer::to_representation(&user)),
    ))
}

#[instrument(skip(state, payload))]
pub async fn create_token(
    State(state): State<AppState>,
    payload: Result<Json<AuthTokenPayload>, JsonRejection>,
) -> ApiResult<Json<TokenResponse>> {
    let Json(payload) = payload?;
    let user = AuthTokenSerializer::validate(state.users.as_ref(), payload).await?;
    let token = issue_token(state.tokens.as_ref(), state.users.as_ref(), &user).await?;
    info!(user_id = %user.id, "user logged in");
    Ok(Json(TokenResponse { token: token.key }))
}

#[instrument(skip_all, fields(user_id = %user.id))]
pub async fn retrieve_me(AuthUser(user): AuthUser) -> Json<UserOut> {
    Json(UserSerializer::to_representation(&user))
}

#[instrument(skip_all, fields(user_id = %user.id))]
pub async fn partial_update_me(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    payload: Result<Json<UserPayload>, JsonRejection>,
) -> ApiResult<Json<UserOut>> {
    let Json(payload) = payload?;
    let user = UserSerializer::update(state.users.as_ref(), user, payload, UpdateMode::Partial).await?;
    Ok(Json(UserSerializer::to_representation(&user)))
}

#[instrument(skip_all, fields(user_id = %user.id))]
pub async fn update_me(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    payload: Result<Json<UserPayload>, JsonRejection>,
) -> ApiResult<Json<UserOut>> {
    let Json(payload) = payload?;
    let user = UserSerializer::update(state.users.as_ref(), user, payload, UpdateMode::Full).await?;
    Ok(Json(UserSerializer::to_representation(&user)))
}

/// Authentication runs first, so anonymous callers see 401 rather than 405.
pub async fn post_me(AuthUser(_user): AuthUser) -> ApiError {
    ApiError::MethodNotAllowed(Method::POST)
}
