use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    routing::post,
    Json, Router,
};
use tracing::instrument;

use crate::{
    auth::dto::{AuthResponse, LoginRequest, RegisterRequest},
    error::AppError,
    response::{self, ApiResponse},
    state::AppState,
};

type AuthResult = Result<(StatusCode, Json<ApiResponse<AuthResponse>>), AppError>;

pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/auth/register", post(register))
        .route("/auth/login", post(login))
}

#[instrument(skip(state, payload))]
pub async fn register(
    State(state): State<AppState>,
    payload: Result<Json<RegisterRequest>, JsonRejection>,
) -> AuthResult {
    let Json(payload) =
        payload.map_err(|_| AppError::Validation("Enter user in valid format".into()))?;
    let user = state.users.register(payload).await?;
    let token = state.keys.issue(user.id, &user.email)?;
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::ok(response::REGISTERED, AuthResponse::bearer(token))),
    ))
}

#[instrument(skip(state, payload))]
pub async fn login(
    State(state): State<AppState>,
    payload: Result<Json<LoginRequest>, JsonRejection>,
) -> AuthResult {
    let Json(payload) =
        payload.map_err(|_| AppError::Validation("Enter credentials in valid format".into()))?;
    let user = state.users.login(payload).await?;
    let token = state.keys.issue(user.id, &user.email)?;
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::ok(response::LOGGED_IN, AuthResponse::bearer(token))),
    ))
}
