use std::sync::Arc;

use time::OffsetDateTime;
use tracing::{info, instrument, warn};
use uuid::Uuid;

use super::{
    dto::{CreateTodoRequest, UpdateTodoRequest},
    repo::TodoRepository,
    repo_types::Todo,
};
use crate::{db::RepoError, error::AppError, users::repo::UserRepository};

pub const TITLE_TOO_SHORT: &str = "Todo title must be longer than 3 characters";
pub const DESCRIPTION_TOO_SHORT: &str = "Todo description must be longer than 5 characters";
const TODO_NOT_FOUND: &str = "Todo not found";
const NOT_OWNER: &str = "You do not own this todo";
const USER_NOT_FOUND: &str = "User not found";

fn validate_fields(title: &str, description: &str) -> Result<(), AppError> {
    if title.chars().count() <= 3 {
        return Err(AppError::Validation(TITLE_TOO_SHORT.into()));
    }
    if description.chars().count() <= 5 {
        return Err(AppError::Validation(DESCRIPTION_TOO_SHORT.into()));
    }
    Ok(())
}

impl CreateTodoRequest {
    pub fn validate(&self) -> Result<(), AppError> {
        validate_fields(&self.title, &self.description)
    }
}

impl UpdateTodoRequest {
    pub fn validate(&self) -> Result<(), AppError> {
        validate_fields(&self.title, &self.description)
    }
}

/// CRUD on todos where every single-record operation re-checks ownership
/// after the fetch.
#[derive(Clone)]
pub struct TodoService {
    todos: Arc<dyn TodoRepository>,
    users: Arc<dyn UserRepository>,
}

impl TodoService {
    pub fn new(todos: Arc<dyn TodoRepository>, users: Arc<dyn UserRepository>) -> Self {
        Self { todos, users }
    }

    pub async fn list(&self, user_id: Uuid) -> Result<Vec<Todo>, AppError> {
        Ok(self.todos.list_by_owner(user_id).await?)
    }

    pub async fn get(&self, user_id: Uuid, todo_id: Uuid) -> Result<Todo, AppError> {
        self.fetch_owned(user_id, todo_id).await
    }

    #[instrument(skip(self, req))]
    pub async fn create(&self, user_id: Uuid, req: CreateTodoRequest) -> Result<Todo, AppError> {
        req.validate()?;
        if self.users.find_by_id(user_id).await?.is_none() {
            warn!(%user_id, "todo create for a user that no longer exists");
            return Err(AppError::NotFound(USER_NOT_FOUND.into()));
        }

        let now = OffsetDateTime::now_utc();
        let todo = self
            .todos
            .create(Todo {
                id: Uuid::new_v4(),
                user_id,
                title: req.title,
                description: req.description,
                is_completed: false,
                created_at: now,
                updated_at: now,
            })
            .await
            .map_err(|e| match e {
                // The owner was deleted after the check above.
                RepoError::MissingReference(_) => AppError::NotFound(USER_NOT_FOUND.into()),
                other => other.into(),
            })?;
        info!(todo_id = %todo.id, "todo created");
        Ok(todo)
    }

    #[instrument(skip(self, req))]
    pub async fn update(
        &self,
        user_id: Uuid,
        todo_id: Uuid,
        req: UpdateTodoRequest,
    ) -> Result<Todo, AppError> {
        req.validate()?;
        let mut todo = self.fetch_owned(user_id, todo_id).await?;
        todo.title = req.title;
        todo.description = req.description;
        todo.is_completed = req.is_completed;
        todo.updated_at = OffsetDateTime::now_utc();
        self.save(&todo).await
    }

    #[instrument(skip(self))]
    pub async fn toggle(&self, user_id: Uuid, todo_id: Uuid) -> Result<Todo, AppError> {
        let mut todo = self.fetch_owned(user_id, todo_id).await?;
        todo.is_completed = !todo.is_completed;
        todo.updated_at = OffsetDateTime::now_utc();
        self.save(&todo).await
    }

    #[instrument(skip(self))]
    pub async fn delete(&self, user_id: Uuid, todo_id: Uuid) -> Result<(), AppError> {
        self.fetch_owned(user_id, todo_id).await?;
        self.todos.delete(todo_id).await.map_err(todo_not_found)?;
        info!(%todo_id, "todo deleted");
        Ok(())
    }

    /// `NotFound` when absent, `Forbidden` when it belongs to someone else.
    async fn fetch_owned(&self, user_id: Uuid, todo_id: Uuid) -> Result<Todo, AppError> {
        let todo = self
            .todos
            .find_by_id(todo_id)
            .await?
            .ok_or_else(|| AppError::NotFound(TODO_NOT_FOUND.into()))?;
        if todo.user_id != user_id {
            warn!(%user_id, %todo_id, "access to a todo owned by another user");
            return Err(AppError::Forbidden(NOT_OWNER.into()));
        }
        Ok(todo)
    }

    async fn save(&self, todo: &Todo) -> Result<Todo, AppError> {
        self.todos.update(todo).await.map_err(todo_not_found)
    }
}

// Deleted between our fetch and the write.
fn todo_not_found(e: RepoError) -> AppError {
    match e {
        RepoError::NotFound => AppError::NotFound(TODO_NOT_FOUND.into()),
        other => other.into(),
    }
}
