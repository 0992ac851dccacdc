//! Domain layer of the todo backend: the [`Todo`] entity, partial updates,
//! the storage contract and the application service built on top of it.

pub mod error;
pub mod patch;
pub mod repository;
pub mod service;
pub mod todo;

pub use error::{RepositoryError, ServiceError, TodoError, TransitionError, ValidationError};
pub use patch::TodoPatch;
pub use repository::TodoRepository;
pub use service::{Clock, TodoService};
pub use todo::{Description, Todo, TodoId, MAX_DESCRIPTION_CHARS};
