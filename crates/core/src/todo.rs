use std::fmt;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::error::{TransitionError, ValidationError};

/// Maximum description length, counted in characters rather than bytes.
pub const MAX_DESCRIPTION_CHARS: usize = 80;

/// Storage-assigned identifier of a todo.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct TodoId(i64);

impl TodoId {
    /// Placeholder carried by todos that have not been persisted yet.
    pub const UNASSIGNED: TodoId = TodoId(0);

    pub fn new(value: i64) -> Self {
        Self(value)
    }

    pub fn get(self) -> i64 {
        self.0
    }

    pub fn is_assigned(self) -> bool {
        self != Self::UNASSIGNED
    }
}

impl fmt::Display for TodoId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Validated todo description.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct Description(String);

impl Description {
    /// Validates the raw text, rejecting blank values and values longer than
    /// [`MAX_DESCRIPTION_CHARS`] characters.
    pub fn parse<S: Into<String>>(value: S) -> Result<Self, ValidationError> {
        let value = value.into();
        if value.trim().is_empty() {
            return Err(ValidationError::EmptyDescription);
        }

        let length = value.chars().count();
        if length > MAX_DESCRIPTION_CHARS {
            return Err(ValidationError::DescriptionTooLong {
                max: MAX_DESCRIPTION_CHARS,
                actual: length,
            });
        }

        Ok(Self(value))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// A single todo item.
///
/// Instances only exist in a valid state: the description has been validated
/// and `last_modified` never precedes `created_on`. State changes go through
/// [`Todo::complete`], [`Todo::reset_completion`] and
/// [`Todo::update_description`], each of which takes the current time from
/// the caller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Todo {
    id: TodoId,
    description: Description,
    is_completed: bool,
    created_on: DateTime<Utc>,
    last_modified: DateTime<Utc>,
}

impl Todo {
    /// Builds a todo that has not been persisted yet.
    pub fn create<S: Into<String>>(
        description: S,
        is_completed: bool,
        created_on: DateTime<Utc>,
        last_modified: DateTime<Utc>,
    ) -> Result<Self, ValidationError> {
        Self::restore(
            TodoId::UNASSIGNED,
            description,
            is_completed,
            created_on,
            last_modified,
        )
    }

    /// Rebuilds a todo with a known identifier, e.g. from a storage row.
    pub fn restore<S: Into<String>>(
        id: TodoId,
        description: S,
        is_completed: bool,
        created_on: DateTime<Utc>,
        last_modified: DateTime<Utc>,
    ) -> Result<Self, ValidationError> {
        let description = Description::parse(description)?;
        if last_modified < created_on {
            return Err(ValidationError::ModifiedBeforeCreated);
        }

        Ok(Self {
            id,
            description,
            is_completed,
            created_on,
            last_modified,
        })
    }

    /// Returns the same todo carrying the storage-assigned identifier.
    pub fn with_id(self, id: TodoId) -> Self {
        Self { id, ..self }
    }

    pub fn id(&self) -> TodoId {
        self.id
    }

    pub fn description(&self) -> &str {
        self.description.as_str()
    }

    pub fn is_completed(&self) -> bool {
        self.is_completed
    }

    pub fn created_on(&self) -> DateTime<Utc> {
        self.created_on
    }

    pub fn last_modified(&self) -> DateTime<Utc> {
        self.last_modified
    }

    /// Marks the todo as completed.
    pub fn complete(&mut self, now: DateTime<Utc>) -> Result<(), TransitionError> {
        if self.is_completed {
            return Err(TransitionError::AlreadyCompleted);
        }
        self.is_completed = true;
        self.touch(now);
        Ok(())
    }

    /// Moves a completed todo back to the incomplete state.
    pub fn reset_completion(&mut self, now: DateTime<Utc>) -> Result<(), TransitionError> {
        if !self.is_completed {
            return Err(TransitionError::NotCompleted);
        }
        self.is_completed = false;
        self.touch(now);
        Ok(())
    }

    /// Replaces the description. The todo is left untouched when the new
    /// value does not validate.
    pub fn update_description<S: Into<String>>(
        &mut self,
        description: S,
        now: DateTime<Utc>,
    ) -> Result<(), ValidationError> {
        self.description = Description::parse(description)?;
        self.touch(now);
        Ok(())
    }

    // A clock that steps backwards must not break last_modified >= created_on.
    fn touch(&mut self, now: DateTime<Utc>) {
        self.last_modified = now.max(self.last_modified);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn at(seconds: i64) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap() + Duration::seconds(seconds)
    }

    fn fresh(description: &str) -> Todo {
        Todo::create(description, false, at(0), at(0)).expect("valid todo")
    }

    #[test]
    fn create_accepts_valid_descriptions() {
        let boundary = "x".repeat(MAX_DESCRIPTION_CHARS);
        for description in ["a", "Buy milk", "  padded  ", boundary.as_str()] {
            let todo = fresh(description);
            assert_eq!(todo.description(), description);
            assert!(!todo.is_completed());
            assert_eq!(todo.created_on(), todo.last_modified());
            assert_eq!(todo.id(), TodoId::UNASSIGNED);
        }
    }

    #[test]
    fn create_counts_characters_not_bytes() {
        let accented = "é".repeat(MAX_DESCRIPTION_CHARS);
        assert!(accented.len() > MAX_DESCRIPTION_CHARS);
        assert!(Todo::create(accented, false, at(0), at(0)).is_ok());
    }

    #[test]
    fn create_rejects_blank_descriptions() {
        for description in ["", " ", "   ", "\t\n"] {
            let err = Todo::create(description, false, at(0), at(0)).unwrap_err();
            assert_eq!(err, ValidationError::EmptyDescription);
        }
    }

    #[test]
    fn create_rejects_long_descriptions() {
        let err = Todo::create("x".repeat(81), false, at(0), at(0)).unwrap_err();
        assert_eq!(
            err,
            ValidationError::DescriptionTooLong {
                max: MAX_DESCRIPTION_CHARS,
                actual: 81
            }
        );
    }

    #[test]
    fn create_rejects_modified_before_created() {
        let err = Todo::create("Buy milk", false, at(10), at(5)).unwrap_err();
        assert_eq!(err, ValidationError::ModifiedBeforeCreated);
    }

    #[test]
    fn restore_keeps_identifier() {
        let todo = Todo::restore(TodoId::new(7), "Walk dog", true, at(0), at(3)).expect("valid");
        assert_eq!(todo.id().get(), 7);
        assert!(todo.is_completed());
        assert_eq!(todo.last_modified(), at(3));
    }

    #[test]
    fn complete_sets_flag_and_advances_last_modified() {
        let mut todo = fresh("Buy milk");
        todo.complete(at(5)).expect("complete");
        assert!(todo.is_completed());
        assert_eq!(todo.last_modified(), at(5));
        assert_eq!(todo.created_on(), at(0));
    }

    #[test]
    fn complete_twice_is_rejected_without_changes() {
        let mut todo = fresh("Buy milk");
        todo.complete(at(5)).expect("complete");
        let before = todo.clone();

        let err = todo.complete(at(9)).unwrap_err();
        assert_eq!(err, TransitionError::AlreadyCompleted);
        assert_eq!(todo, before);
    }

    #[test]
    fn reset_completion_reopens_completed_todo() {
        let mut todo = fresh("Buy milk");
        todo.complete(at(5)).expect("complete");
        todo.reset_completion(at(8)).expect("reset");
        assert!(!todo.is_completed());
        assert_eq!(todo.last_modified(), at(8));
    }

    #[test]
    fn reset_completion_on_incomplete_todo_is_rejected() {
        let mut todo = fresh("Buy milk");
        let err = todo.reset_completion(at(5)).unwrap_err();
        assert_eq!(err, TransitionError::NotCompleted);
        assert_eq!(todo.last_modified(), at(0));
    }

    #[test]
    fn update_description_replaces_text_and_keeps_created_on() {
        let mut todo = fresh("Buy milk");
        todo.update_description("Buy oat milk", at(4)).expect("update");
        assert_eq!(todo.description(), "Buy oat milk");
        assert_eq!(todo.last_modified(), at(4));
        assert_eq!(todo.created_on(), at(0));
    }

    #[test]
    fn update_description_with_invalid_value_leaves_todo_unchanged() {
        let mut todo = fresh("Buy milk");
        let before = todo.clone();
        assert!(todo.update_description("   ", at(4)).is_err());
        assert!(todo.update_description("y".repeat(81), at(4)).is_err());
        assert_eq!(todo, before);
    }

    #[test]
    fn mutation_with_earlier_clock_keeps_last_modified() {
        let mut todo = Todo::create("Buy milk", false, at(0), at(10)).expect("valid");
        todo.complete(at(3)).expect("complete");
        assert_eq!(todo.last_modified(), at(10));
        assert!(todo.last_modified() >= todo.created_on());
    }

    #[test]
    fn serializes_with_camel_case_fields() {
        let todo = fresh("Buy milk").with_id(TodoId::new(3));
        let value = serde_json::to_value(&todo).expect("serialize");
        assert_eq!(value["id"], 3);
        assert_eq!(value["description"], "Buy milk");
        assert_eq!(value["isCompleted"], false);
        assert_eq!(value["createdOn"], "2024-01-01T00:00:00Z");
        assert_eq!(value["lastModified"], "2024-01-01T00:00:00Z");
    }
}
