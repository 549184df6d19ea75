//! The single-active-task console.
//!
//! Exactly one task is selected at a time. Every remote call is split into
//! a ticket taken from the console, a `run` that performs the call without
//! borrowing the console, and an `apply` that commits the result only if
//! the ticket still matches the current selection. A result that arrives
//! after the operator moved on is dropped.

use serde_json::Value;
use tracing::{debug, info, warn};

use opsdesk_core::task::Task;
use opsdesk_forms::inject::{InjectionReport, inject_external_data};
use opsdesk_forms::{DataProvider, EngineError, FormDefinition, FormSession, WorkflowEngine};

use crate::error::{ConsoleError, Result};

/// Form status of the selected task.
#[derive(Debug)]
pub enum FormPhase {
    /// The task has no engine form (local-only task).
    NoForm,
    /// A schema fetch is in flight.
    Loading,
    Ready(Box<FormSession>),
    /// The fetch failed; [`TaskConsole::retry_fetch`] starts another.
    Failed(String),
    /// The task was completed through this console.
    Submitted,
}

/// Whether a result was committed to the console.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Applied {
    Applied,
    /// The selection changed while the call was in flight.
    Stale,
}

/// Identity captured when a remote call starts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Selection {
    pub generation: u64,
    pub task_id: String,
}

/// A schema fetch to perform for the selected task.
#[derive(Debug, Clone)]
pub struct FetchTicket {
    pub(crate) selection: Selection,
    external_id: String,
    variables: Value,
}

/// The result of running a [`FetchTicket`].
#[derive(Debug)]
pub struct FetchOutcome {
    selection: Selection,
    variables: Value,
    result: std::result::Result<(FormDefinition, InjectionReport), EngineError>,
}

impl FetchTicket {
    pub fn external_id(&self) -> &str {
        &self.external_id
    }

    /// Fetches the schema and injects external data when a provider is given.
    pub fn run(
        self,
        engine: &dyn WorkflowEngine,
        provider: Option<&dyn DataProvider>,
    ) -> FetchOutcome {
        let result = engine
            .fetch_form(&self.external_id, &self.variables)
            .map(|definition| match provider {
                Some(provider) => inject_external_data(&definition, provider, &self.variables),
                None => (definition, InjectionReport::default()),
            });
        FetchOutcome {
            selection: self.selection,
            variables: self.variables,
            result,
        }
    }
}

/// Console state for the selected task.
#[derive(Debug)]
pub struct TaskConsole {
    selected: Option<Task>,
    /// External id of the task whose schema was last requested.
    last_fetched: Option<String>,
    phase: FormPhase,
    generation: u64,
}

impl Default for TaskConsole {
    fn default() -> Self {
        Self::new()
    }
}

impl TaskConsole {
    pub fn new() -> Self {
        Self {
            selected: None,
            last_fetched: None,
            phase: FormPhase::NoForm,
            generation: 0,
        }
    }

    pub fn selected(&self) -> Option<&Task> {
        self.selected.as_ref()
    }

    pub fn phase(&self) -> &FormPhase {
        &self.phase
    }

    pub fn session(&self) -> Option<&FormSession> {
        match &self.phase {
            FormPhase::Ready(session) => Some(session.as_ref()),
            _ => None,
        }
    }

    /// Mutable access for edits. Edits only ever touch the active session.
    pub fn session_mut(&mut self) -> Option<&mut FormSession> {
        match &mut self.phase {
            FormPhase::Ready(session) => Some(session.as_mut()),
            _ => None,
        }
    }

    pub(crate) fn current(&self) -> Option<Selection> {
        self.selected.as_ref().map(|task| Selection {
            generation: self.generation,
            task_id: task.id.clone(),
        })
    }

    pub(crate) fn is_current(&self, selection: &Selection) -> bool {
        self.current().as_ref() == Some(selection)
    }

    /// Selects `task`, returning the schema fetch to run, if any.
    ///
    /// Re-selecting the task whose schema was already requested returns
    /// `None` and leaves its session (and any edits) untouched.
    pub fn select(&mut self, task: Task) -> Option<FetchTicket> {
        let external_id = task
            .external_id
            .clone()
            .filter(|_| task.has_engine_form());
        let same_task = self.selected.as_ref().is_some_and(|t| t.id == task.id);
        if same_task && external_id.is_some() && external_id == self.last_fetched {
            debug!(task = %task.id, "task already loaded, keeping session");
            self.selected = Some(task);
            return None;
        }

        self.generation += 1;
        self.selected = Some(task);
        match external_id {
            Some(external_id) => {
                self.last_fetched = Some(external_id);
                self.phase = FormPhase::Loading;
                self.ticket()
            }
            None => {
                self.last_fetched = None;
                self.phase = FormPhase::NoForm;
                None
            }
        }
    }

    /// Drops the selection. In-flight results become stale.
    pub fn clear(&mut self) {
        self.generation += 1;
        self.selected = None;
        self.last_fetched = None;
        self.phase = FormPhase::NoForm;
    }

    /// Starts another fetch after a failure.
    pub fn retry_fetch(&mut self) -> Option<FetchTicket> {
        if !matches!(self.phase, FormPhase::Failed(_)) {
            return None;
        }
        self.generation += 1;
        self.phase = FormPhase::Loading;
        self.ticket()
    }

    fn ticket(&self) -> Option<FetchTicket> {
        let task = self.selected.as_ref()?;
        Some(FetchTicket {
            selection: self.current()?,
            external_id: task.external_id.clone()?,
            variables: task.variables_value(),
        })
    }

    /// Commits a fetch result if it still belongs to the selection.
    ///
    /// A successful fetch creates the session, seeded from the task's
    /// variables. A failed fetch leaves the form unrendered and is returned
    /// as [`ConsoleError::SchemaFetch`].
    pub fn apply_fetch(&mut self, outcome: FetchOutcome) -> Result<Applied> {
        if !self.is_current(&outcome.selection) {
            debug!(task = %outcome.selection.task_id, "dropping stale schema");
            return Ok(Applied::Stale);
        }
        match outcome.result {
            Ok((definition, report)) => {
                info!(
                    task = %outcome.selection.task_id,
                    components = definition.components.len(),
                    injected = report.resolved,
                    "form ready"
                );
                let session = FormSession::new(definition, &outcome.variables);
                self.phase = FormPhase::Ready(Box::new(session));
                Ok(Applied::Applied)
            }
            Err(e) => {
                warn!(task = %outcome.selection.task_id, error = %e, "schema fetch failed");
                self.phase = FormPhase::Failed(e.to_string());
                Err(ConsoleError::SchemaFetch(e))
            }
        }
    }

    /// Marks the selected task as submitted after a successful completion.
    pub(crate) fn finish(&mut self, selection: &Selection, completed: bool) {
        if !self.is_current(selection) {
            return;
        }
        if let Some(task) = self.selected.as_mut() {
            task.is_completed = task.is_completed || completed;
        }
        self.phase = FormPhase::Submitted;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{FakeEngine, task};
    use opsdesk_forms::FormValue;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn selecting_a_local_task_fetches_nothing() {
        let mut console = TaskConsole::new();
        let local = opsdesk_core::task::TaskBuilder::new("Lavar unidad").id("od-1").build();
        assert!(console.select(local).is_none());
        assert!(matches!(console.phase(), FormPhase::NoForm));
    }

    #[test]
    fn fetch_seeds_the_session() {
        let engine = FakeEngine::new();
        let mut console = TaskConsole::new();
        let ticket = console.select(task("a", json!({"placa": "ABC"}))).unwrap();
        assert_eq!(ticket.external_id(), "ext-a");
        let outcome = ticket.run(&engine, None);
        assert_eq!(console.apply_fetch(outcome).unwrap(), Applied::Applied);
        assert_eq!(
            console.session().unwrap().get("placa").value().map(FormValue::to_json),
            Some(json!("ABC"))
        );
    }

    #[test]
    fn reselecting_keeps_edits() {
        let engine = FakeEngine::new();
        let mut console = TaskConsole::new();
        let ticket = console.select(task("a", json!({}))).unwrap();
        console.apply_fetch(ticket.run(&engine, None)).unwrap();
        console
            .session_mut()
            .unwrap()
            .set_input("placa", "XYZ")
            .unwrap();

        assert!(console.select(task("a", json!({}))).is_none());
        assert_eq!(engine.calls(), vec!["fetch ext-a"]);
        assert_eq!(
            console.session().unwrap().get("placa").value().map(FormValue::to_json),
            Some(json!("XYZ"))
        );
    }

    #[test]
    fn late_schema_for_previous_task_is_dropped() {
        let engine = FakeEngine::new();
        let mut console = TaskConsole::new();
        let ticket_a = console.select(task("a", json!({"placa": "AAA"}))).unwrap();
        let ticket_b = console.select(task("b", json!({"placa": "BBB"}))).unwrap();

        let outcome_b = ticket_b.run(&engine, None);
        assert_eq!(console.apply_fetch(outcome_b).unwrap(), Applied::Applied);
        console.session_mut().unwrap().set_input("placa", "B-edit").unwrap();

        let outcome_a = ticket_a.run(&engine, None);
        assert_eq!(console.apply_fetch(outcome_a).unwrap(), Applied::Stale);
        assert_eq!(console.selected().unwrap().id, "b");
        assert_eq!(
            console.session().unwrap().get("placa").value().map(FormValue::to_json),
            Some(json!("B-edit"))
        );
    }

    #[test]
    fn schema_arriving_before_the_switch_is_applied_then_replaced() {
        let engine = FakeEngine::new();
        let mut console = TaskConsole::new();
        let ticket_a = console.select(task("a", json!({}))).unwrap();
        let outcome_a = ticket_a.run(&engine, None);
        let _ticket_b = console.select(task("b", json!({}))).unwrap();
        assert_eq!(console.apply_fetch(outcome_a).unwrap(), Applied::Stale);
        assert!(matches!(console.phase(), FormPhase::Loading));
    }

    #[test]
    fn failed_fetch_can_be_retried() {
        let engine = FakeEngine::new();
        engine.fail_fetches(1);
        let mut console = TaskConsole::new();
        let ticket = console.select(task("a", json!({}))).unwrap();
        let err = console.apply_fetch(ticket.run(&engine, None)).unwrap_err();
        assert!(matches!(err, ConsoleError::SchemaFetch(_)));
        assert!(err.is_retryable());
        assert!(matches!(console.phase(), FormPhase::Failed(_)));

        let retry = console.retry_fetch().unwrap();
        assert_eq!(console.apply_fetch(retry.run(&engine, None)).unwrap(), Applied::Applied);
        assert!(console.retry_fetch().is_none());
    }

    #[test]
    fn missing_engine_id_is_a_fetch_error() {
        let engine = FakeEngine::new();
        let mut console = TaskConsole::new();
        let mut blank = task("a", json!({}));
        blank.external_id = Some("   ".into());
        let ticket = console.select(blank).unwrap();
        let err = console.apply_fetch(ticket.run(&engine, None)).unwrap_err();
        assert!(matches!(err, ConsoleError::SchemaFetch(EngineError::MissingTaskId)));
    }
}
