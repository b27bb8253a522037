use std::collections::HashMap;

use async_trait::async_trait;
use sqlx::PgPool;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::repo_types::Todo;
use crate::db::{RepoError, RepoResult};

/// Storage contract for todos. `find_by_id` is deliberately owner-agnostic;
/// ownership is enforced by `TodoService`.
#[async_trait]
pub trait TodoRepository: Send + Sync {
    async fn list_by_owner(&self, user_id: Uuid) -> RepoResult<Vec<Todo>>;
    async fn find_by_id(&self, id: Uuid) -> RepoResult<Option<Todo>>;
    async fn create(&self, todo: Todo) -> RepoResult<Todo>;
    /// Writes title, description, completion and `updated_at`. Owner and
    /// `created_at` are left as stored.
    async fn update(&self, todo: &Todo) -> RepoResult<Todo>;
    async fn delete(&self, id: Uuid) -> RepoResult<()>;
}

pub struct PgTodoRepository {
    db: PgPool,
}

impl PgTodoRepository {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

#[async_trait]
impl TodoRepository for PgTodoRepository {
    async fn list_by_owner(&self, user_id: Uuid) -> RepoResult<Vec<Todo>> {
        let rows = sqlx::query_as::<_, Todo>(
            r#"
            SELECT id, user_id, title, description, is_completed, created_at, updated_at
            FROM todos
            WHERE user_id = $1
            ORDER BY created_at ASC
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.db)
        .await?;
        Ok(rows)
    }

    async fn find_by_id(&self, id: Uuid) -> RepoResult<Option<Todo>> {
        let row = sqlx::query_as::<_, Todo>(
            r#"
            SELECT id, user_id, title, description, is_completed, created_at, updated_at
            FROM todos
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.db)
        .await?;
        Ok(row)
    }

    async fn create(&self, todo: Todo) -> RepoResult<Todo> {
        let row = sqlx::query_as::<_, Todo>(
            r#"
            INSERT INTO todos (id, user_id, title, description, is_completed, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING id, user_id, title, description, is_completed, created_at, updated_at
            "#,
        )
        .bind(todo.id)
        .bind(todo.user_id)
        .bind(&todo.title)
        .bind(&todo.description)
        .bind(todo.is_completed)
        .bind(todo.created_at)
        .bind(todo.updated_at)
        .fetch_one(&self.db)
        .await?;
        Ok(row)
    }

    async fn update(&self, todo: &Todo) -> RepoResult<Todo> {
        let row = sqlx::query_as::<_, Todo>(
            r#"
            UPDATE todos
               SET title = $1, description = $2, is_completed = $3, updated_at = $4
             WHERE id = $5
            RETURNING id, user_id, title, description, is_completed, created_at, updated_at
            "#,
        )
        .bind(&todo.title)
        .bind(&todo.description)
        .bind(todo.is_completed)
        .bind(todo.updated_at)
        .bind(todo.id)
        .fetch_optional(&self.db)
        .await?;
        row.ok_or(RepoError::NotFound)
    }

    async fn delete(&self, id: Uuid) -> RepoResult<()> {
        let done = sqlx::query("DELETE FROM todos WHERE id = $1")
            .bind(id)
            .execute(&self.db)
            .await?;
        if done.rows_affected() == 0 {
            return Err(RepoError::NotFound);
        }
        Ok(())
    }
}

/// Process-local store for tests and `APP_STORAGE=memory`.
#[derive(Default)]
pub struct InMemoryTodoRepository {
    todos: RwLock<HashMap<Uuid, Todo>>,
}

impl InMemoryTodoRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl TodoRepository for InMemoryTodoRepository {
    async fn list_by_owner(&self, user_id: Uuid) -> RepoResult<Vec<Todo>> {
        let mut rows: Vec<Todo> = self
            .todos
            .read()
            .await
            .values()
            .filter(|t| t.user_id == user_id)
            .cloned()
            .collect();
        rows.sort_by_key(|t| t.created_at);
        Ok(rows)
    }

    async fn find_by_id(&self, id: Uuid) -> RepoResult<Option<Todo>> {
        Ok(self.todos.read().await.get(&id).cloned())
    }

    async fn create(&self, todo: Todo) -> RepoResult<Todo> {
        let mut todos = self.todos.write().await;
        if todos.contains_key(&todo.id) {
            return Err(RepoError::Conflict(format!("todo {} already exists", todo.id)));
        }
        todos.insert(todo.id, todo.clone());
        Ok(todo)
    }

    async fn update(&self, todo: &Todo) -> RepoResult<Todo> {
        let mut todos = self.todos.write().await;
        let stored = todos.get_mut(&todo.id).ok_or(RepoError::NotFound)?;
        stored.title = todo.title.clone();
        stored.description = todo.description.clone();
        stored.is_completed = todo.is_completed;
        stored.updated_at = todo.updated_at;
        Ok(stored.clone())
    }

    async fn delete(&self, id: Uuid) -> RepoResult<()> {
        self.todos
            .write()
            .await
            .remove(&id)
            .map(|_| ())
            .ok_or(RepoError::NotFound)
    }
}
