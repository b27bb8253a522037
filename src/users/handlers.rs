use axum::{
    extract::{rejection::JsonRejection, State},
    routing::get,
    Json, Router,
};
use tracing::instrument;

use super::dto::{UpdateUserRequest, UserResponse};
use crate::{
    auth::extractors::AuthUser,
    error::AppError,
    response::{self, ApiResponse},
    state::AppState,
};

pub fn me_routes() -> Router<AppState> {
    Router::new().route("/users/me", get(get_me).put(update_me).delete(delete_me))
}

#[instrument(skip(state, auth), fields(user_id = %auth.user_id))]
pub async fn get_me(
    State(state): State<AppState>,
    auth: AuthUser,
) -> Result<Json<ApiResponse<UserResponse>>, AppError> {
    let user = state.users.get(auth.user_id).await?;
    Ok(Json(ApiResponse::ok(response::FETCHED, user.into())))
}

#[instrument(skip(state, auth, payload), fields(user_id = %auth.user_id))]
pub async fn update_me(
    State(state): State<AppState>,
    auth: AuthUser,
    payload: Result<Json<UpdateUserRequest>, JsonRejection>,
) -> Result<Json<ApiResponse<UserResponse>>, AppError> {
    let Json(body) =
        payload.map_err(|_| AppError::Validation("Enter user in valid format".into()))?;
    let user = state.users.update_username(auth.user_id, &body.username).await?;
    Ok(Json(ApiResponse::ok(response::UPDATED, user.into())))
}

#[instrument(skip(state, auth), fields(user_id = %auth.user_id))]
pub async fn delete_me(
    State(state): State<AppState>,
    auth: AuthUser,
) -> Result<Json<ApiResponse<()>>, AppError> {
    state.users.delete(auth.user_id).await?;
    Ok(Json(ApiResponse::message(response::DELETED)))
}
