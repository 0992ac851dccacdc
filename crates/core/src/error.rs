use thiserror::Error;

use crate::todo::TodoId;

/// Input that violates the todo invariants.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("Description cannot be empty or whitespace.")]
    EmptyDescription,
    #[error("Description cannot exceed {max} characters (got {actual}).")]
    DescriptionTooLong { max: usize, actual: usize },
    #[error("Last modified time cannot precede the creation time.")]
    ModifiedBeforeCreated,
}

impl ValidationError {
    /// Name of the offending field as exposed over the API.
    pub fn field(&self) -> &'static str {
        match self {
            Self::EmptyDescription | Self::DescriptionTooLong { .. } => "description",
            Self::ModifiedBeforeCreated => "lastModified",
        }
    }
}

/// Completion transition that is not allowed from the current state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum TransitionError {
    #[error("Cannot complete a completed todo.")]
    AlreadyCompleted,
    #[error("Cannot reset completion on an incomplete todo.")]
    NotCompleted,
}

/// Failure while applying a change to a todo.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TodoError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error(transparent)]
    InvalidState(#[from] TransitionError),
}

/// Errors surfaced by [`crate::repository::TodoRepository`] implementations.
#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("Todo with ID {0} not found.")]
    NotFound(TodoId),
    #[error("stored todo {id} is invalid: {source}")]
    Corrupt {
        id: TodoId,
        #[source]
        source: ValidationError,
    },
    #[error("storage error: {0}")]
    Backend(#[source] Box<dyn std::error::Error + Send + Sync>),
}

/// Errors returned by [`crate::service::TodoService`].
#[derive(Debug, Error)]
pub enum ServiceError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error(transparent)]
    InvalidState(#[from] TransitionError),
    #[error("Todo with ID {0} not found.")]
    NotFound(TodoId),
    #[error(transparent)]
    Repository(RepositoryError),
}

impl From<TodoError> for ServiceError {
    fn from(err: TodoError) -> Self {
        match err {
            TodoError::Validation(err) => Self::Validation(err),
            TodoError::InvalidState(err) => Self::InvalidState(err),
        }
    }
}

impl From<RepositoryError> for ServiceError {
    fn from(err: RepositoryError) -> Self {
        match err {
            RepositoryError::NotFound(id) => Self::NotFound(id),
            other => Self::Repository(other),
        }
    }
}
