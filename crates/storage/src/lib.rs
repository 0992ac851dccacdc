use std::{str::FromStr, time::Duration};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{
    migrate::MigrateError,
    sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous},
    SqlitePool,
};
use thiserror::Error;

use todo_backend_core::{RepositoryError, Todo, TodoId, TodoRepository};

/// Top-level database handle that owns the SQLite connection pool.
#[derive(Clone)]
pub struct Database {
    pool: SqlitePool,
}

impl Database {
    /// Establishes a new SQLite connection pool for the provided connection string.
    ///
    /// The database file is created when it does not exist yet.
    pub async fn connect(database_url: &str) -> Result<Self, StorageError> {
        let options = SqliteConnectOptions::from_str(database_url)
            .map_err(StorageError::Connect)?
            .create_if_missing(true)
            .foreign_keys(true)
            .journal_mode(SqliteJournalMode::Wal)
            .synchronous(SqliteSynchronous::Normal)
            .busy_timeout(Duration::from_millis(5000));

        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(options)
            .await
            .map_err(StorageError::Connect)?;

        Ok(Self { pool })
    }

    /// Applies migrations located under `migrations/`.
    pub async fn run_migrations(&self) -> Result<(), StorageError> {
        sqlx::migrate!("../../migrations")
            .run(&self.pool)
            .await
            .map_err(StorageError::Migration)?;
        Ok(())
    }

    /// Returns a handle to interact with the `todos` table.
    pub fn todos(&self) -> SqliteTodoRepository {
        SqliteTodoRepository {
            pool: self.pool.clone(),
        }
    }

    /// Exposes the inner pool when lower level access is required.
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

/// General storage level errors.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("failed to connect to sqlite: {0}")]
    Connect(sqlx::Error),
    #[error("failed to run database migrations: {0}")]
    Migration(MigrateError),
}

/// Repository responsible for the `todos` table.
#[derive(Clone)]
pub struct SqliteTodoRepository {
    pool: SqlitePool,
}

const SELECT_TODOS: &str =
    "SELECT id, description, is_completed, created_on, last_modified FROM todos";

#[async_trait]
impl TodoRepository for SqliteTodoRepository {
    async fn create(&self, todo: &Todo) -> Result<TodoId, RepositoryError> {
        let id: i64 = sqlx::query_scalar(
            "INSERT INTO todos (description, is_completed, created_on, last_modified) \
             VALUES (?, ?, ?, ?) \
             RETURNING id",
        )
        .bind(todo.description())
        .bind(todo.is_completed())
        .bind(todo.created_on())
        .bind(todo.last_modified())
        .fetch_one(&self.pool)
        .await
        .map_err(backend)?;

        Ok(TodoId::new(id))
    }

    async fn get(&self, id: TodoId) -> Result<Todo, RepositoryError> {
        let row = sqlx::query_as::<_, TodoRow>(&format!("{SELECT_TODOS} WHERE id = ?"))
            .bind(id.get())
            .fetch_optional(&self.pool)
            .await
            .map_err(backend)?
            .ok_or(RepositoryError::NotFound(id))?;

        row.into_domain()
    }

    async fn update(&self, todo: &Todo) -> Result<(), RepositoryError> {
        let result = sqlx::query(
            "UPDATE todos \
             SET description = ?, is_completed = ?, last_modified = ? \
             WHERE id = ?",
        )
        .bind(todo.description())
        .bind(todo.is_completed())
        .bind(todo.last_modified())
        .bind(todo.id().get())
        .execute(&self.pool)
        .await
        .map_err(backend)?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound(todo.id()));
        }
        Ok(())
    }

    async fn delete(&self, id: TodoId) -> Result<(), RepositoryError> {
        let result = sqlx::query("DELETE FROM todos WHERE id = ?")
            .bind(id.get())
            .execute(&self.pool)
            .await
            .map_err(backend)?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound(id));
        }
        Ok(())
    }

    async fn get_all(&self) -> Result<Vec<Todo>, RepositoryError> {
        let rows = sqlx::query_as::<_, TodoRow>(&format!("{SELECT_TODOS} ORDER BY id"))
            .fetch_all(&self.pool)
            .await
            .map_err(backend)?;

        rows.into_iter().map(TodoRow::into_domain).collect()
    }

    async fn get_incomplete(&self) -> Result<Vec<Todo>, RepositoryError> {
        let rows = sqlx::query_as::<_, TodoRow>(&format!(
            "{SELECT_TODOS} WHERE is_completed = 0 ORDER BY id"
        ))
        .fetch_all(&self.pool)
        .await
        .map_err(backend)?;

        rows.into_iter().map(TodoRow::into_domain).collect()
    }
}

/// Raw row of the `todos` table.
#[derive(Debug, sqlx::FromRow)]
struct TodoRow {
    id: i64,
    description: String,
    is_completed: bool,
    created_on: DateTime<Utc>,
    last_modified: DateTime<Utc>,
}

impl TodoRow {
    /// Converts the row into a domain todo, re-checking the entity invariants.
    fn into_domain(self) -> Result<Todo, RepositoryError> {
        let id = TodoId::new(self.id);
        Todo::restore(
            id,
            self.description,
            self.is_completed,
            self.created_on,
            self.last_modified,
        )
        .map_err(|source| RepositoryError::Corrupt { id, source })
    }
}

fn backend(err: sqlx::Error) -> RepositoryError {
    RepositoryError::Backend(Box::new(err))
}
