use async_trait::async_trait;

use crate::error::RepositoryError;
use crate::todo::{Todo, TodoId};

/// Storage contract consumed by [`crate::service::TodoService`].
///
/// Implementations report missing rows as [`RepositoryError::NotFound`] and
/// never retry on failure.
#[async_trait]
pub trait TodoRepository: Send + Sync {
    /// Persists a new todo and returns the identifier assigned by storage.
    async fn create(&self, todo: &Todo) -> Result<TodoId, RepositoryError>;

    async fn get(&self, id: TodoId) -> Result<Todo, RepositoryError>;

    /// Overwrites the stored description, completion flag and last modified
    /// time of `todo`.
    async fn update(&self, todo: &Todo) -> Result<(), RepositoryError>;

    async fn delete(&self, id: TodoId) -> Result<(), RepositoryError>;

    /// Lists every todo in insertion order.
    async fn get_all(&self) -> Result<Vec<Todo>, RepositoryError>;

    /// Lists todos that are not completed, in insertion order.
    async fn get_incomplete(&self) -> Result<Vec<Todo>, RepositoryError>;
}
