//! Task validation rules.

use crate::task::Task;

/// Maximum length of a task name.
pub const MAX_NAME_LEN: usize = 500;

/// Error type for validation failures.
#[derive(Debug, thiserror::Error, PartialEq)]
pub enum ValidationError {
    #[error("name is required")]
    NameRequired,

    #[error("name must be 500 characters or less (got {0})")]
    NameTooLong(usize),

    #[error("priority cannot be negative (got {0})")]
    NegativePriority(i32),

    #[error("invalid task kind: {0:?}")]
    InvalidKind(String),

    #[error("external id must not be empty when present")]
    EmptyExternalId,

    #[error("assignee is required")]
    AssigneeRequired,
}

/// Validates a task before it is written to the store.
pub fn validate(task: &Task) -> Result<(), ValidationError> {
    if task.name.trim().is_empty() {
        return Err(ValidationError::NameRequired);
    }
    if task.name.len() > MAX_NAME_LEN {
        return Err(ValidationError::NameTooLong(task.name.len()));
    }
    if task.priority < 0 {
        return Err(ValidationError::NegativePriority(task.priority));
    }
    if !task.kind.is_valid() {
        return Err(ValidationError::InvalidKind(task.kind.as_str().to_owned()));
    }
    if task.external_id.as_deref().is_some_and(str::is_empty) {
        return Err(ValidationError::EmptyExternalId);
    }
    if task.assignee.is_empty() {
        return Err(ValidationError::AssigneeRequired);
    }
    Ok(())
}
