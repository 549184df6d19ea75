//! The upload-then-complete submission protocol.
//!
//! [`TaskConsole::prepare_submission`] snapshots the active session,
//! [`SubmitTicket::execute`] serializes it (uploading every attachment in
//! order) and only then issues the completion call, and
//! [`TaskConsole::apply_submission`] records a success locally. A failure
//! at any step returns before anything later runs, leaving the session
//! intact for a retry.

use chrono::NaiveDate;
use serde_json::{Map, Value};
use tracing::{debug, info, warn};

use opsdesk_forms::serialize::serialize_variables;
use opsdesk_forms::{FormDefinition, FormState, Uploader, WorkflowEngine};
use opsdesk_storage::TaskStore;

use crate::console::{Applied, Selection, TaskConsole};
use crate::error::{ConsoleError, Result};

/// Submission switches.
#[derive(Debug, Clone, Copy)]
pub struct SubmitOptions {
    /// Run field validation before anything is uploaded.
    pub validate: bool,
    /// Reference day for "no passed dates" rules.
    pub today: NaiveDate,
}

impl SubmitOptions {
    pub fn new(today: NaiveDate) -> Self {
        Self {
            validate: true,
            today,
        }
    }
}

/// Snapshot of a session taken when the operator submits.
#[derive(Debug, Clone)]
pub struct SubmitTicket {
    selection: Selection,
    external_id: String,
    permanent: bool,
    definition: FormDefinition,
    state: FormState,
}

/// The result of running a [`SubmitTicket`].
#[derive(Debug)]
pub struct SubmitOutcome {
    selection: Selection,
    permanent: bool,
    result: Result<Map<String, Value>>,
}

impl SubmitOutcome {
    /// The payload sent to the engine, when the completion succeeded.
    pub fn payload(&self) -> Option<&Map<String, Value>> {
        self.result.as_ref().ok()
    }
}

impl SubmitTicket {
    pub fn external_id(&self) -> &str {
        &self.external_id
    }

    /// Serializes the snapshot, uploading attachments, without completing.
    pub fn payload(&self, uploader: &dyn Uploader) -> Result<Map<String, Value>> {
        Ok(serialize_variables(&self.definition, &self.state, uploader)?)
    }

    /// Uploads every attachment, then completes the task with the payload.
    ///
    /// The completion call is issued only after every upload succeeded.
    pub fn execute(self, uploader: &dyn Uploader, engine: &dyn WorkflowEngine) -> SubmitOutcome {
        let result = self.payload(uploader).and_then(|payload| {
            engine
                .complete(&self.external_id, &payload)
                .map_err(ConsoleError::Completion)?;
            Ok(payload)
        });
        if let Err(e) = &result {
            warn!(task = %self.selection.task_id, error = %e, "submission failed");
        }
        SubmitOutcome {
            selection: self.selection,
            permanent: self.permanent,
            result,
        }
    }
}

impl TaskConsole {
    /// Snapshots the active session for submission.
    pub fn prepare_submission(&self, options: SubmitOptions) -> Result<SubmitTicket> {
        let (Some(task), Some(selection), Some(session)) =
            (self.selected(), self.current(), self.session())
        else {
            return Err(ConsoleError::NoActiveForm);
        };
        if options.validate {
            let issues = session.validate(options.today);
            if !issues.is_empty() {
                debug!(task = %task.id, issues = issues.len(), "submission blocked by validation");
                return Err(ConsoleError::Invalid(issues));
            }
        }
        Ok(SubmitTicket {
            selection,
            external_id: task.external_id.clone().unwrap_or_default(),
            permanent: task.permanent,
            definition: session.definition().clone(),
            state: session.state().clone(),
        })
    }

    /// Records a submission result.
    ///
    /// On success the task is marked completed in the store (unless it is
    /// permanent), whether or not it is still selected. A failure is handed
    /// back unchanged and nothing is recorded.
    pub fn apply_submission(
        &mut self,
        outcome: SubmitOutcome,
        store: &dyn TaskStore,
    ) -> Result<Applied> {
        let payload = outcome.result?;
        let task_id = &outcome.selection.task_id;
        if outcome.permanent {
            debug!(task = %task_id, "permanent task, completion flag untouched");
        } else {
            store.set_completed(task_id, true)?;
        }
        info!(task = %task_id, variables = payload.len(), "task submitted");

        let applied = if self.is_current(&outcome.selection) {
            Applied::Applied
        } else {
            Applied::Stale
        };
        self.finish(&outcome.selection, !outcome.permanent);
        Ok(applied)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::console::FormPhase;
    use crate::testing::{FakeEngine, FakeUploader, task};
    use opsdesk_core::filter::TaskFilter;
    use opsdesk_forms::{FormValue, LocalFile, StorageId};
    use opsdesk_storage::SqliteStore;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 9, 4).unwrap()
    }

    fn files(names: &[&str]) -> Vec<LocalFile> {
        names.iter().map(|n| LocalFile::new(format!("/tmp/{n}"))).collect()
    }

    /// Console with task `a` loaded and stored.
    fn loaded(engine: &FakeEngine, store: &SqliteStore, permanent: bool) -> TaskConsole {
        let mut t = task("a", json!({"operador": "Ana"}));
        t.permanent = permanent;
        store.add_task(&t).unwrap();
        let mut console = TaskConsole::new();
        let ticket = console.select(t).unwrap();
        console.apply_fetch(ticket.run(engine, None)).unwrap();
        console
    }

    #[test]
    fn uploads_finish_before_completion() {
        let engine = FakeEngine::new();
        let uploader = FakeUploader::sharing(&engine);
        let store = SqliteStore::open_in_memory().unwrap();
        let mut console = loaded(&engine, &store, false);
        let session = console.session_mut().unwrap();
        session.attach_files("fotos", files(&["a.jpg", "b.jpg"])).unwrap();
        session.attach_files("facturas", files(&["c.pdf", "d.pdf", "e.pdf"])).unwrap();

        let ticket = console.prepare_submission(SubmitOptions::new(today())).unwrap();
        let outcome = ticket.execute(&uploader, &engine);
        let payload = outcome.payload().unwrap().clone();
        assert_eq!(payload["fotos"], json!(["st-1", "st-2"]));
        assert_eq!(payload["facturas"], json!(["st-3", "st-4", "st-5"]));
        assert_eq!(
            engine.calls(),
            vec![
                "fetch ext-a",
                "upload a.jpg",
                "upload b.jpg",
                "upload c.pdf",
                "upload d.pdf",
                "upload e.pdf",
                "complete ext-a",
            ]
        );

        assert_eq!(console.apply_submission(outcome, &store).unwrap(), Applied::Applied);
        assert!(store.get_task("a").unwrap().is_completed);
        assert!(matches!(console.phase(), FormPhase::Submitted));
    }

    #[test]
    fn upload_failure_never_completes() {
        let engine = FakeEngine::new();
        let uploader = FakeUploader::sharing(&engine);
        let store = SqliteStore::open_in_memory().unwrap();
        let mut console = loaded(&engine, &store, false);
        console
            .session_mut()
            .unwrap()
            .attach_files("fotos", files(&["a.jpg", "fail.jpg"]))
            .unwrap();

        let outcome = console
            .prepare_submission(SubmitOptions::new(today()))
            .unwrap()
            .execute(&uploader, &engine);
        let err = console.apply_submission(outcome, &store).unwrap_err();
        match &err {
            ConsoleError::Upload { field, uploaded, .. } => {
                assert_eq!(field, "fotos");
                assert_eq!(uploaded, &vec![StorageId("st-1".into())]);
            }
            other => panic!("unexpected error: {other}"),
        }
        assert!(err.is_retryable());
        assert!(!engine.calls().iter().any(|c| c.starts_with("complete")));
        assert!(!store.get_task("a").unwrap().is_completed);
        // The session survives for a retry.
        assert!(console.session().unwrap().get("fotos").value().is_some());
    }

    #[test]
    fn rejected_completion_leaves_task_pending() {
        let engine = FakeEngine::new();
        engine.fail_completions(1);
        let uploader = FakeUploader::sharing(&engine);
        let store = SqliteStore::open_in_memory().unwrap();
        let mut console = loaded(&engine, &store, false);

        let outcome = console
            .prepare_submission(SubmitOptions::new(today()))
            .unwrap()
            .execute(&uploader, &engine);
        let err = console.apply_submission(outcome, &store).unwrap_err();
        assert!(matches!(err, ConsoleError::Completion(_)));
        assert!(!store.get_task("a").unwrap().is_completed);
        assert!(console.session().is_some());

        // Retrying from the same session succeeds.
        let outcome = console
            .prepare_submission(SubmitOptions::new(today()))
            .unwrap()
            .execute(&uploader, &engine);
        console.apply_submission(outcome, &store).unwrap();
        assert!(store.get_task("a").unwrap().is_completed);
    }

    #[test]
    fn permanent_tasks_stay_pending() {
        let engine = FakeEngine::new();
        let uploader = FakeUploader::sharing(&engine);
        let store = SqliteStore::open_in_memory().unwrap();
        let mut console = loaded(&engine, &store, true);
        let outcome = console
            .prepare_submission(SubmitOptions::new(today()))
            .unwrap()
            .execute(&uploader, &engine);
        console.apply_submission(outcome, &store).unwrap();
        assert!(!store.get_task("a").unwrap().is_completed);
        assert_eq!(store.list_tasks(&TaskFilter::pending()).unwrap().len(), 1);
    }

    #[test]
    fn validation_blocks_before_uploads() {
        let engine = FakeEngine::new();
        let store = SqliteStore::open_in_memory().unwrap();
        let mut console = loaded(&engine, &store, false);
        console.session_mut().unwrap().clear_field("operador").unwrap();

        let err = console.prepare_submission(SubmitOptions::new(today())).unwrap_err();
        let ConsoleError::Invalid(issues) = err else {
            panic!("expected validation issues");
        };
        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].path, "operador");

        let skip = SubmitOptions {
            validate: false,
            ..SubmitOptions::new(today())
        };
        assert!(console.prepare_submission(skip).is_ok());
    }

    #[test]
    fn completion_after_switching_tasks_still_marks_the_store() {
        let engine = FakeEngine::new();
        let uploader = FakeUploader::sharing(&engine);
        let store = SqliteStore::open_in_memory().unwrap();
        let mut console = loaded(&engine, &store, false);
        let ticket = console.prepare_submission(SubmitOptions::new(today())).unwrap();

        let next = console.select(task("b", json!({}))).unwrap();
        console.apply_fetch(next.run(&engine, None)).unwrap();
        console.session_mut().unwrap().set_field("placa", FormValue::text("B")).unwrap();

        let outcome = ticket.execute(&uploader, &engine);
        assert_eq!(console.apply_submission(outcome, &store).unwrap(), Applied::Stale);
        assert!(store.get_task("a").unwrap().is_completed);
        assert_eq!(console.selected().unwrap().id, "b");
        assert!(console.session().is_some());
    }

    #[test]
    fn nothing_to_submit_without_a_form() {
        let console = TaskConsole::new();
        assert!(matches!(
            console.prepare_submission(SubmitOptions::new(today())),
            Err(ConsoleError::NoActiveForm)
        ));
    }
}
