//! Filter types for querying tasks.

use crate::enums::TaskKind;

/// Filter for task listings. Empty fields match everything.
#[derive(Debug, Clone, Default)]
pub struct TaskFilter {
    /// `Some(false)` lists pending tasks only, `Some(true)` completed only.
    pub completed: Option<bool>,
    pub kind: Option<TaskKind>,
    pub assignee: Option<String>,
    pub limit: Option<usize>,
}

impl TaskFilter {
    /// Pending tasks, the console's default listing.
    pub fn pending() -> Self {
        Self {
            completed: Some(false),
            ..Self::default()
        }
    }
}
