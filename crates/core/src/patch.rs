use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::TodoError;
use crate::todo::Todo;

/// Partial update of a todo. Only the fields that are present are applied.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TodoPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_completed: Option<bool>,
}

impl TodoPatch {
    pub fn description<S: Into<String>>(description: S) -> Self {
        Self {
            description: Some(description.into()),
            is_completed: None,
        }
    }

    pub fn completion(is_completed: bool) -> Self {
        Self {
            description: None,
            is_completed: Some(is_completed),
        }
    }

    /// Returns `true` when the patch carries no field at all.
    pub fn is_empty(&self) -> bool {
        self.description.is_none() && self.is_completed.is_none()
    }
}

impl Todo {
    /// Applies `patch` as a single change stamped with `now`.
    ///
    /// The description is applied before the completion flag. If any step
    /// fails the todo is left exactly as it was.
    pub fn apply(&mut self, patch: &TodoPatch, now: DateTime<Utc>) -> Result<(), TodoError> {
        let mut working = self.clone();

        if let Some(description) = &patch.description {
            working.update_description(description.as_str(), now)?;
        }

        match patch.is_completed {
            Some(true) => working.complete(now)?,
            Some(false) => working.reset_completion(now)?,
            None => {}
        }

        *self = working;
        Ok(())
    }
}
