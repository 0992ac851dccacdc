use std::sync::Arc;

use chrono::{DateTime, Utc};

use crate::error::ServiceError;
use crate::patch::TodoPatch;
use crate::repository::TodoRepository;
use crate::todo::{Todo, TodoId};

/// Source of the current time for timestamping todos.
pub type Clock = Arc<dyn Fn() -> DateTime<Utc> + Send + Sync>;

/// Orchestrates fetch-mutate-save sequences on top of a [`TodoRepository`].
#[derive(Clone)]
pub struct TodoService {
    repository: Arc<dyn TodoRepository>,
    clock: Clock,
}

impl TodoService {
    /// Creates a service backed by the system clock.
    pub fn new(repository: Arc<dyn TodoRepository>) -> Self {
        Self::with_clock(repository, Arc::new(Utc::now))
    }

    pub fn with_clock(repository: Arc<dyn TodoRepository>, clock: Clock) -> Self {
        Self { repository, clock }
    }

    fn now(&self) -> DateTime<Utc> {
        (self.clock)()
    }

    /// Creates and persists an incomplete todo, returning it with its new id.
    pub async fn create_todo(&self, description: &str) -> Result<Todo, ServiceError> {
        let now = self.now();
        let todo = Todo::create(description, false, now, now)?;
        let id = self.repository.create(&todo).await?;
        Ok(todo.with_id(id))
    }

    pub async fn get_todo(&self, id: TodoId) -> Result<Todo, ServiceError> {
        Ok(self.repository.get(id).await?)
    }

    pub async fn get_all_todos(&self) -> Result<Vec<Todo>, ServiceError> {
        Ok(self.repository.get_all().await?)
    }

    pub async fn get_incomplete_todos(&self) -> Result<Vec<Todo>, ServiceError> {
        Ok(self.repository.get_incomplete().await?)
    }

    /// Applies a partial update and persists the result with a single write.
    ///
    /// An empty patch is not a mutation: nothing is written and the stored
    /// todo is returned as is.
    pub async fn update_todo(&self, id: TodoId, patch: &TodoPatch) -> Result<Todo, ServiceError> {
        let mut todo = self.repository.get(id).await?;
        if patch.is_empty() {
            return Ok(todo);
        }

        todo.apply(patch, self.now())?;
        self.repository.update(&todo).await?;
        Ok(todo)
    }

    pub async fn update_description(
        &self,
        id: TodoId,
        description: &str,
    ) -> Result<Todo, ServiceError> {
        self.update_todo(id, &TodoPatch::description(description)).await
    }

    pub async fn complete_todo(&self, id: TodoId) -> Result<Todo, ServiceError> {
        self.update_todo(id, &TodoPatch::completion(true)).await
    }

    pub async fn uncomplete_todo(&self, id: TodoId) -> Result<Todo, ServiceError> {
        self.update_todo(id, &TodoPatch::completion(false)).await
    }

    pub async fn delete_todo(&self, id: TodoId) -> Result<(), ServiceError> {
        Ok(self.repository.delete(id).await?)
    }
}
