//! Task struct -- a unit of work surfaced to operators by the workflow engine.

use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

use crate::enums::TaskKind;

/// Assignee used when the engine does not name one.
pub const DEFAULT_ASSIGNEE: &str = "general";

fn default_assignee() -> String {
    DEFAULT_ASSIGNEE.to_owned()
}

fn is_false(b: &bool) -> bool {
    !b
}

/// A task as stored locally.
///
/// Tasks that carry an `external_id` are mirrored from the workflow engine
/// and render their form from the engine's deployed schema. Field aliases
/// accept the camelCase names used by the engine's webhook records.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    #[serde(default)]
    pub id: String,

    /// Engine-side task ID.
    #[serde(
        default,
        alias = "camundaId",
        skip_serializing_if = "Option::is_none"
    )]
    pub external_id: Option<String>,

    #[serde(default)]
    pub name: String,

    #[serde(
        default,
        rename = "kind",
        alias = "type",
        skip_serializing_if = "TaskKind::is_default"
    )]
    pub kind: TaskKind,

    #[serde(
        default,
        alias = "taskDefinitionKey",
        skip_serializing_if = "String::is_empty"
    )]
    pub task_definition_key: String,

    #[serde(default, alias = "formKey", skip_serializing_if = "Option::is_none")]
    pub form_key: Option<String>,

    #[serde(
        default,
        alias = "processInstanceId",
        skip_serializing_if = "Option::is_none"
    )]
    pub process_instance_id: Option<String>,

    #[serde(
        default,
        alias = "businessKey",
        skip_serializing_if = "Option::is_none"
    )]
    pub business_key: Option<String>,

    #[serde(default = "default_assignee", alias = "asignee")]
    pub assignee: String,

    #[serde(default)]
    pub priority: i32,

    #[serde(default, alias = "isCompleted", skip_serializing_if = "is_false")]
    pub is_completed: bool,

    /// Permanent tasks are never marked done locally after a submission.
    #[serde(default, skip_serializing_if = "is_false")]
    pub permanent: bool,

    /// Process variables captured when the task was created.
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub variables: Map<String, Value>,

    #[serde(
        default = "Utc::now",
        alias = "createdAt",
        deserialize_with = "deserialize_timestamp"
    )]
    pub created_at: DateTime<Utc>,
}

/// Accepts either an RFC3339 string or epoch milliseconds.
fn deserialize_timestamp<'de, D: Deserializer<'de>>(d: D) -> Result<DateTime<Utc>, D::Error> {
    use serde::de::Error;

    match Value::deserialize(d)? {
        Value::String(s) => DateTime::parse_from_rfc3339(&s)
            .map(|dt| dt.with_timezone(&Utc))
            .map_err(D::Error::custom),
        Value::Number(n) => n
            .as_i64()
            .and_then(|ms| Utc.timestamp_millis_opt(ms).single())
            .ok_or_else(|| D::Error::custom(format!("invalid epoch millis: {n}"))),
        other => Err(D::Error::custom(format!("invalid timestamp: {other}"))),
    }
}

impl Default for Task {
    fn default() -> Self {
        Self {
            id: String::new(),
            external_id: None,
            name: String::new(),
            kind: TaskKind::default(),
            task_definition_key: String::new(),
            form_key: None,
            process_instance_id: None,
            business_key: None,
            assignee: default_assignee(),
            priority: 0,
            is_completed: false,
            permanent: false,
            variables: Map::new(),
            created_at: Utc::now(),
        }
    }
}

impl Task {
    /// Returns `true` if the task renders a form fetched from the engine.
    pub fn has_engine_form(&self) -> bool {
        self.external_id.as_deref().is_some_and(|id| !id.is_empty())
    }

    /// Process variables as a JSON object value.
    pub fn variables_value(&self) -> Value {
        Value::Object(self.variables.clone())
    }

    /// Fills fields that webhook records commonly leave empty.
    pub fn set_defaults(&mut self) {
        if self.assignee.is_empty() {
            self.assignee = default_assignee();
        }
        if self.kind.as_str().is_empty() {
            self.kind = TaskKind::default();
        }
    }
}

/// Builder for constructing a [`Task`] with a fluent API.
pub struct TaskBuilder {
    task: Task,
}

impl TaskBuilder {
    pub fn new(name: impl Into<String>) -> Self {
        let task = Task {
            name: name.into(),
            ..Task::default()
        };
        Self { task }
    }

    pub fn id(mut self, id: impl Into<String>) -> Self {
        self.task.id = id.into();
        self
    }

    pub fn external_id(mut self, external_id: impl Into<String>) -> Self {
        self.task.external_id = Some(external_id.into());
        self
    }

    pub fn kind(mut self, kind: TaskKind) -> Self {
        self.task.kind = kind;
        self
    }

    pub fn task_definition_key(mut self, key: impl Into<String>) -> Self {
        self.task.task_definition_key = key.into();
        self
    }

    pub fn form_key(mut self, key: impl Into<String>) -> Self {
        self.task.form_key = Some(key.into());
        self
    }

    pub fn process_instance_id(mut self, id: impl Into<String>) -> Self {
        self.task.process_instance_id = Some(id.into());
        self
    }

    pub fn assignee(mut self, assignee: impl Into<String>) -> Self {
        self.task.assignee = assignee.into();
        self
    }

    pub fn priority(mut self, priority: i32) -> Self {
        self.task.priority = priority;
        self
    }

    pub fn permanent(mut self, permanent: bool) -> Self {
        self.task.permanent = permanent;
        self
    }

    pub fn completed(mut self, completed: bool) -> Self {
        self.task.is_completed = completed;
        self
    }

    pub fn variables(mut self, variables: Map<String, Value>) -> Self {
        self.task.variables = variables;
        self
    }

    pub fn created_at(mut self, at: DateTime<Utc>) -> Self {
        self.task.created_at = at;
        self
    }

    pub fn build(self) -> Task {
        self.task
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn builder_defaults() {
        let t = TaskBuilder::new("Subir reporte").build();
        assert_eq!(t.assignee, "general");
        assert_eq!(t.kind, TaskKind::Any);
        assert!(!t.has_engine_form());
    }

    #[test]
    fn deserialize_webhook_shape() {
        let v = json!({
            "camundaId": "c-1",
            "name": "Revisar unidad",
            "asignee": "mario",
            "taskDefinitionKey": "revision",
            "processInstanceId": "p-9",
            "createdAt": 1_756_952_331_000_i64,
            "variables": {"unidad": "T-12"}
        });
        let t: Task = serde_json::from_value(v).unwrap();
        assert_eq!(t.external_id.as_deref(), Some("c-1"));
        assert_eq!(t.assignee, "mario");
        assert_eq!(t.task_definition_key, "revision");
        assert_eq!(t.created_at.timestamp_millis(), 1_756_952_331_000);
        assert_eq!(t.variables["unidad"], json!("T-12"));
        assert!(t.has_engine_form());
    }

    #[test]
    fn serialize_skips_empty() {
        let ts = DateTime::parse_from_rfc3339("2025-01-01T00:00:00Z")
            .unwrap()
            .with_timezone(&Utc);
        let t = TaskBuilder::new("A").id("od-1").created_at(ts).build();
        let v = serde_json::to_value(&t).unwrap();
        assert_eq!(
            v,
            json!({
                "id": "od-1",
                "name": "A",
                "assignee": "general",
                "priority": 0,
                "created_at": "2025-01-01T00:00:00Z"
            })
        );
    }

    #[test]
    fn empty_external_id_has_no_form() {
        let t = TaskBuilder::new("A").external_id("").build();
        assert!(!t.has_engine_form());
    }
}
