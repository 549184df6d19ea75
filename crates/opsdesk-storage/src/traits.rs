//! The [`TaskStore`] trait -- the public API for local task persistence.
//!
//! Consumers depend on the trait rather than on [`SqliteStore`](crate::SqliteStore)
//! so that the console can be exercised against in-memory fakes.

use std::collections::BTreeMap;

use opsdesk_core::filter::TaskFilter;
use opsdesk_core::route::Route;
use opsdesk_core::task::Task;

use crate::error::Result;

/// Counters of one bulk import.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ImportReport {
    pub added: usize,
    /// Tasks whose external id was already stored.
    pub skipped: usize,
}

/// Local task and route history store.
pub trait TaskStore {
    // -- Tasks ---------------------------------------------------------------

    /// Validates and stores a task, generating an id when it has none.
    fn add_task(&self, task: &Task) -> Result<String>;

    /// Stores many tasks atomically, skipping known external ids.
    fn import_tasks(&self, tasks: &[Task]) -> Result<ImportReport>;

    fn get_task(&self, id: &str) -> Result<Task>;

    fn get_task_by_external_id(&self, external_id: &str) -> Result<Task>;

    /// Tasks matching `filter`, newest first.
    fn list_tasks(&self, filter: &TaskFilter) -> Result<Vec<Task>>;

    /// Flips the completion flag, returning the new value.
    fn toggle_completion(&self, id: &str) -> Result<bool>;

    fn set_completed(&self, id: &str, completed: bool) -> Result<()>;

    fn delete_task(&self, id: &str) -> Result<()>;

    // -- Route history -------------------------------------------------------

    fn add_route(&self, route: &Route) -> Result<i64>;

    /// The latest `limit` routes of a unit, most recent start first.
    fn recent_routes(&self, unidad: &str, limit: usize) -> Result<Vec<Route>>;

    // -- Config --------------------------------------------------------------

    fn get_config(&self, key: &str) -> Result<String>;

    fn set_config(&self, key: &str, value: &str) -> Result<()>;

    fn all_config(&self) -> Result<BTreeMap<String, String>>;
}
