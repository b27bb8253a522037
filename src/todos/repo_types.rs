use sqlx::FromRow;
use time::OffsetDateTime;
use uuid::Uuid;

/// Todo record in the database. `user_id` is the owner and never changes.
#[derive(Debug, Clone, PartialEq, Eq, FromRow)]
pub struct Todo {
    pub id: Uuid,
    pub user_id: Uuid,
    pub title: String,
    pub description: String,
    pub is_completed: bool,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
}
