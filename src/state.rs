use std::sync::Arc;

use tracing::{info, warn};

use crate::{
    auth::jwt::SessionKeys,
    config::{AppConfig, StorageBackend},
    db,
    todos::{
        repo::{InMemoryTodoRepository, PgTodoRepository, TodoRepository},
        services::TodoService,
    },
    users::{
        repo::{InMemoryUserRepository, PgUserRepository, UserRepository},
        services::UserService,
    },
};

/// Per-process state. Immutable after startup; the pool inside the Postgres
/// repositories is the only shared resource.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub keys: SessionKeys,
    pub users: UserService,
    pub todos: TodoService,
}

impl AppState {
    pub async fn init(config: AppConfig) -> anyhow::Result<Self> {
        let config = Arc::new(config);

        let (users, todos): (Arc<dyn UserRepository>, Arc<dyn TodoRepository>) =
            match config.storage {
                StorageBackend::Postgres => {
                    let pool = db::connect(&config.database).await?;
                    if let Err(e) = db::migrate(&pool).await {
                        warn!(error = %e, "migration failed; continuing");
                    }
                    (
                        Arc::new(PgUserRepository::new(pool.clone())),
                        Arc::new(PgTodoRepository::new(pool)),
                    )
                }
                StorageBackend::Memory => {
                    warn!("using in-memory storage; data is lost on restart");
                    (
                        Arc::new(InMemoryUserRepository::new()),
                        Arc::new(InMemoryTodoRepository::new()),
                    )
                }
            };

        info!(storage = ?config.storage, "state initialised");
        Ok(Self::from_parts(config, users, todos))
    }

    pub fn from_parts(
        config: Arc<AppConfig>,
        users: Arc<dyn UserRepository>,
        todos: Arc<dyn TodoRepository>,
    ) -> Self {
        Self {
            keys: SessionKeys::new(&config.jwt),
            users: UserService::new(users.clone()),
            todos: TodoService::new(todos, users),
            config,
        }
    }

    #[cfg(test)]
    pub fn fake() -> Self {
        use crate::config::{DatabaseConfig, JwtConfig};
        use std::time::Duration;

        let config = Arc::new(AppConfig {
            host: "127.0.0.1".into(),
            port: 0,
            storage: StorageBackend::Memory,
            database: DatabaseConfig {
                url: None,
                max_connections: 1,
                idle_timeout: Duration::from_secs(1),
                acquire_timeout: Duration::from_secs(1),
            },
            jwt: JwtConfig {
                secret: "test".into(),
                ttl_minutes: 60 * 24,
            },
            request_timeout: Duration::from_secs(5),
        });
        Self::from_parts(
            config,
            Arc::new(InMemoryUserRepository::new()),
            Arc::new(InMemoryTodoRepository::new()),
        )
    }
}
