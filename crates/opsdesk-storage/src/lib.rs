//! Local storage for the opsdesk console.
//!
//! Provides the [`TaskStore`] trait, a SQLite implementation
//! ([`SqliteStore`]) and the [`SqliteDataProvider`] answering form
//! external-data references from the store.

pub mod error;
pub mod provider;
pub mod sqlite;
pub mod traits;

pub use error::StorageError;
pub use provider::SqliteDataProvider;
pub use sqlite::SqliteStore;
pub use traits::{ImportReport, TaskStore};

// ---------------------------------------------------------------------------
// TaskStore implementation for SqliteStore
// ---------------------------------------------------------------------------

use std::collections::BTreeMap;

use opsdesk_core::filter::TaskFilter;
use opsdesk_core::route::Route;
use opsdesk_core::task::Task;

use crate::error::Result;

impl TaskStore for SqliteStore {
    fn add_task(&self, task: &Task) -> Result<String> {
        self.add_task_impl(task)
    }

    fn import_tasks(&self, tasks: &[Task]) -> Result<ImportReport> {
        self.import_tasks_impl(tasks)
    }

    fn get_task(&self, id: &str) -> Result<Task> {
        self.get_task_impl(id)
    }

    fn get_task_by_external_id(&self, external_id: &str) -> Result<Task> {
        self.get_task_by_external_id_impl(external_id)
    }

    fn list_tasks(&self, filter: &TaskFilter) -> Result<Vec<Task>> {
        self.list_tasks_impl(filter)
    }

    fn toggle_completion(&self, id: &str) -> Result<bool> {
        self.toggle_completion_impl(id)
    }

    fn set_completed(&self, id: &str, completed: bool) -> Result<()> {
        self.set_completed_impl(id, completed)
    }

    fn delete_task(&self, id: &str) -> Result<()> {
        self.delete_task_impl(id)
    }

    fn add_route(&self, route: &Route) -> Result<i64> {
        self.add_route_impl(route)
    }

    fn recent_routes(&self, unidad: &str, limit: usize) -> Result<Vec<Route>> {
        self.recent_routes_impl(unidad, limit)
    }

    fn get_config(&self, key: &str) -> Result<String> {
        self.get_config_impl(key)
    }

    fn set_config(&self, key: &str, value: &str) -> Result<()> {
        self.set_config_impl(key, value)
    }

    fn all_config(&self) -> Result<BTreeMap<String, String>> {
        self.all_config_impl()
    }
}
