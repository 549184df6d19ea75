//! Task CRUD operations for [`SqliteStore`].

use chrono::{DateTime, Utc};
use rusqlite::{Connection, Row, params};
use serde_json::{Map, Value};
use tracing::{debug, info};

use opsdesk_core::enums::TaskKind;
use opsdesk_core::filter::TaskFilter;
use opsdesk_core::idgen::generate_task_id;
use opsdesk_core::task::Task;
use opsdesk_core::validation::validate;

use crate::error::{Result, StorageError};
use crate::sqlite::store::SqliteStore;
use crate::traits::ImportReport;

/// Attempts at finding a free generated id before giving up.
const MAX_ID_NONCE: u32 = 16;

pub(crate) const TASK_COLUMNS: &str = "id, external_id, name, kind, task_definition_key, \
    form_key, process_instance_id, business_key, assignee, priority, is_completed, \
    permanent, variables, created_at";

pub(crate) fn format_datetime(dt: &DateTime<Utc>) -> String {
    dt.format("%Y-%m-%dT%H:%M:%S%.3fZ").to_string()
}

/// Parses an ISO 8601 TEXT column, falling back to the epoch for garbage.
pub(crate) fn parse_datetime(s: &str) -> DateTime<Utc> {
    s.parse::<DateTime<Utc>>().unwrap_or_else(|_| {
        chrono::NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S")
            .map(|ndt| ndt.and_utc())
            .unwrap_or_default()
    })
}

pub(crate) fn scan_task(row: &Row<'_>) -> rusqlite::Result<Task> {
    let kind: String = row.get("kind")?;
    let variables: String = row.get("variables")?;
    let created_at: String = row.get("created_at")?;
    let variables = match serde_json::from_str::<Value>(&variables) {
        Ok(Value::Object(map)) => map,
        _ => Map::new(),
    };

    Ok(Task {
        id: row.get("id")?,
        external_id: row.get("external_id")?,
        name: row.get("name")?,
        kind: TaskKind::from(kind.as_str()),
        task_definition_key: row.get("task_definition_key")?,
        form_key: row.get("form_key")?,
        process_instance_id: row.get("process_instance_id")?,
        business_key: row.get("business_key")?,
        assignee: row.get("assignee")?,
        priority: row.get("priority")?,
        is_completed: row.get::<_, i64>("is_completed")? != 0,
        permanent: row.get::<_, i64>("permanent")? != 0,
        variables,
        created_at: parse_datetime(&created_at),
    })
}

fn id_exists(conn: &Connection, id: &str) -> Result<bool> {
    let count: i64 = conn.query_row(
        "SELECT COUNT(*) FROM tasks WHERE id = ?1",
        params![id],
        |row| row.get(0),
    )?;
    Ok(count > 0)
}

fn find_by_external_id(conn: &Connection, external_id: &str) -> Result<Option<Task>> {
    let sql = format!("SELECT {TASK_COLUMNS} FROM tasks WHERE external_id = ?1");
    match conn.query_row(&sql, params![external_id], scan_task) {
        Ok(task) => Ok(Some(task)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(StorageError::Query(e)),
    }
}

/// Picks a free id for `task` when it has none.
fn assign_id(conn: &Connection, task: &Task) -> Result<String> {
    if !task.id.is_empty() {
        return Ok(task.id.clone());
    }
    for nonce in 0..MAX_ID_NONCE {
        let id = generate_task_id(
            &task.name,
            task.external_id.as_deref(),
            task.created_at,
            nonce,
        );
        if !id_exists(conn, &id)? {
            return Ok(id);
        }
        debug!(%id, nonce, "task id collision, retrying");
    }
    Err(StorageError::Internal(format!(
        "no free task id after {MAX_ID_NONCE} attempts"
    )))
}

/// Validates and inserts a task, returning its id.
pub(crate) fn insert_task(conn: &Connection, task: &Task) -> Result<String> {
    validate(task)?;
    if let Some(external_id) = task.external_id.as_deref() {
        if let Some(existing) = find_by_external_id(conn, external_id)? {
            return Err(StorageError::Duplicate {
                external_id: external_id.to_owned(),
                id: existing.id,
            });
        }
    }

    let id = assign_id(conn, task)?;
    let variables = serde_json::to_string(&task.variables)?;
    conn.execute(
        &format!(
            "INSERT INTO tasks ({TASK_COLUMNS}) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14)"
        ),
        params![
            id,
            task.external_id,
            task.name,
            task.kind.as_str(),
            task.task_definition_key,
            task.form_key,
            task.process_instance_id,
            task.business_key,
            task.assignee,
            task.priority,
            task.is_completed,
            task.permanent,
            variables,
            format_datetime(&task.created_at),
        ],
    )?;
    debug!(%id, name = %task.name, "task stored");
    Ok(id)
}

pub(crate) fn get_task_on_conn(conn: &Connection, id: &str) -> Result<Task> {
    let sql = format!("SELECT {TASK_COLUMNS} FROM tasks WHERE id = ?1");
    conn.query_row(&sql, params![id], scan_task)
        .map_err(|e| match e {
            rusqlite::Error::QueryReturnedNoRows => StorageError::not_found("task", id),
            other => StorageError::Query(other),
        })
}

fn set_completed_on_conn(conn: &Connection, id: &str, completed: bool) -> Result<()> {
    let completed_at = completed.then(|| format_datetime(&Utc::now()));
    let changed = conn.execute(
        "UPDATE tasks SET is_completed = ?1, completed_at = ?2 WHERE id = ?3",
        params![completed, completed_at, id],
    )?;
    if changed == 0 {
        return Err(StorageError::not_found("task", id));
    }
    Ok(())
}

impl SqliteStore {
    pub fn add_task_impl(&self, task: &Task) -> Result<String> {
        let conn = self.lock_conn()?;
        insert_task(&conn, task)
    }

    /// Imports tasks in one transaction. Tasks whose external id is already
    /// stored are skipped.
    pub fn import_tasks_impl(&self, tasks: &[Task]) -> Result<ImportReport> {
        let conn = self.lock_conn()?;
        let tx = conn
            .unchecked_transaction()
            .map_err(|e| StorageError::Internal(format!("failed to begin: {e}")))?;
        let mut report = ImportReport::default();
        for task in tasks {
            match insert_task(&tx, task) {
                Ok(_) => report.added += 1,
                Err(StorageError::Duplicate { external_id, .. }) => {
                    debug!(%external_id, "task already imported, skipping");
                    report.skipped += 1;
                }
                Err(e) => return Err(e),
            }
        }
        tx.commit()
            .map_err(|e| StorageError::Internal(format!("failed to commit: {e}")))?;
        info!(added = report.added, skipped = report.skipped, "tasks imported");
        Ok(report)
    }

    pub fn get_task_impl(&self, id: &str) -> Result<Task> {
        let conn = self.lock_conn()?;
        get_task_on_conn(&conn, id)
    }

    pub fn get_task_by_external_id_impl(&self, external_id: &str) -> Result<Task> {
        let conn = self.lock_conn()?;
        find_by_external_id(&conn, external_id)?
            .ok_or_else(|| StorageError::not_found("task", format!("external_id={external_id}")))
    }

    /// Lists tasks matching `filter`, newest first.
    pub fn list_tasks_impl(&self, filter: &TaskFilter) -> Result<Vec<Task>> {
        let conn = self.lock_conn()?;

        let mut where_clauses: Vec<String> = Vec::new();
        let mut param_values: Vec<Box<dyn rusqlite::types::ToSql>> = Vec::new();
        if let Some(completed) = filter.completed {
            param_values.push(Box::new(completed));
            where_clauses.push(format!("is_completed = ?{}", param_values.len()));
        }
        if let Some(ref kind) = filter.kind {
            param_values.push(Box::new(kind.as_str().to_string()));
            where_clauses.push(format!("kind = ?{}", param_values.len()));
        }
        if let Some(ref assignee) = filter.assignee {
            param_values.push(Box::new(assignee.clone()));
            where_clauses.push(format!("assignee = ?{}", param_values.len()));
        }

        let mut sql = format!("SELECT {TASK_COLUMNS} FROM tasks");
        if !where_clauses.is_empty() {
            sql.push_str(" WHERE ");
            sql.push_str(&where_clauses.join(" AND "));
        }
        sql.push_str(" ORDER BY created_at DESC, rowid DESC");
        if let Some(limit) = filter.limit {
            sql.push_str(&format!(" LIMIT {limit}"));
        }

        let mut stmt = conn.prepare(&sql)?;
        let params = rusqlite::params_from_iter(param_values.iter().map(|p| p.as_ref()));
        let rows = stmt.query_map(params, scan_task)?;
        let mut tasks = Vec::new();
        for row in rows {
            tasks.push(row?);
        }
        Ok(tasks)
    }

    /// Flips the completion flag and returns the new value.
    pub fn toggle_completion_impl(&self, id: &str) -> Result<bool> {
        let conn = self.lock_conn()?;
        let task = get_task_on_conn(&conn, id)?;
        let completed = !task.is_completed;
        set_completed_on_conn(&conn, id, completed)?;
        Ok(completed)
    }

    pub fn set_completed_impl(&self, id: &str, completed: bool) -> Result<()> {
        let conn = self.lock_conn()?;
        set_completed_on_conn(&conn, id, completed)
    }

    pub fn delete_task_impl(&self, id: &str) -> Result<()> {
        let conn = self.lock_conn()?;
        let changed = conn.execute("DELETE FROM tasks WHERE id = ?1", params![id])?;
        if changed == 0 {
            return Err(StorageError::not_found("task", id));
        }
        Ok(())
    }
}
