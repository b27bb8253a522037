use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection},
        Path, State,
    },
    http::StatusCode,
    routing::{get, put},
    Json, Router,
};
use tracing::instrument;
use uuid::Uuid;

use super::dto::{CreateTodoRequest, TodoResponse, UpdateTodoRequest};
use crate::{
    auth::extractors::AuthUser,
    error::AppError,
    response::{self, ApiResponse},
    state::AppState,
};

pub fn todo_routes() -> Router<AppState> {
    Router::new()
        .route("/todos", get(list_todos).post(create_todo))
        .route(
            "/todos/:id",
            get(get_todo).put(update_todo).delete(delete_todo),
        )
        .route("/todos/toggle/:id", put(toggle_todo))
}

fn todo_id(path: Result<Path<Uuid>, PathRejection>) -> Result<Uuid, AppError> {
    path.map(|Path(id)| id)
        .map_err(|_| AppError::Validation("Invalid todo id".into()))
}

fn todo_body<T>(payload: Result<Json<T>, JsonRejection>) -> Result<T, AppError> {
    payload
        .map(|Json(body)| body)
        .map_err(|_| AppError::Validation("Enter todo in valid format".into()))
}

#[instrument(skip(state, auth), fields(user_id = %auth.user_id))]
pub async fn list_todos(
    State(state): State<AppState>,
    auth: AuthUser,
) -> Result<Json<ApiResponse<Vec<TodoResponse>>>, AppError> {
    let todos = state.todos.list(auth.user_id).await?;
    let items = todos.into_iter().map(TodoResponse::from).collect();
    Ok(Json(ApiResponse::ok(response::FETCHED, items)))
}

#[instrument(skip(state, auth, path), fields(user_id = %auth.user_id))]
pub async fn get_todo(
    State(state): State<AppState>,
    auth: AuthUser,
    path: Result<Path<Uuid>, PathRejection>,
) -> Result<Json<ApiResponse<TodoResponse>>, AppError> {
    let id = todo_id(path)?;
    let todo = state.todos.get(auth.user_id, id).await?;
    Ok(Json(ApiResponse::ok(response::FETCHED, todo.into())))
}

#[instrument(skip(state, auth, payload), fields(user_id = %auth.user_id))]
pub async fn create_todo(
    State(state): State<AppState>,
    auth: AuthUser,
    payload: Result<Json<CreateTodoRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<ApiResponse<TodoResponse>>), AppError> {
    let body = todo_body(payload)?;
    let todo = state.todos.create(auth.user_id, body).await?;
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::ok(response::ADDED, todo.into())),
    ))
}

#[instrument(skip(state, auth, path, payload), fields(user_id = %auth.user_id))]
pub async fn update_todo(
    State(state): State<AppState>,
    auth: AuthUser,
    path: Result<Path<Uuid>, PathRejection>,
    payload: Result<Json<UpdateTodoRequest>, JsonRejection>,
) -> Result<Json<ApiResponse<TodoResponse>>, AppError> {
    let id = todo_id(path)?;
    let body = todo_body(payload)?;
    let todo = state.todos.update(auth.user_id, id, body).await?;
    Ok(Json(ApiResponse::ok(response::UPDATED, todo.into())))
}

#[instrument(skip(state, auth, path), fields(user_id = %auth.user_id))]
pub async fn toggle_todo(
    State(state): State<AppState>,
    auth: AuthUser,
    path: Result<Path<Uuid>, PathRejection>,
) -> Result<Json<ApiResponse<TodoResponse>>, AppError> {
    let id = todo_id(path)?;
    let todo = state.todos.toggle(auth.user_id, id).await?;
    Ok(Json(ApiResponse::ok(response::UPDATED, todo.into())))
}

#[instrument(skip(state, auth, path), fields(user_id = %auth.user_id))]
pub async fn delete_todo(
    State(state): State<AppState>,
    auth: AuthUser,
    path: Result<Path<Uuid>, PathRejection>,
) -> Result<Json<ApiResponse<()>>, AppError> {
    let id = todo_id(path)?;
    state.todos.delete(auth.user_id, id).await?;
    Ok(Json(ApiResponse::message(response::DELETED)))
}
