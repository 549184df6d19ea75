//! Recording fakes for console tests.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use serde_json::{Map, Value};

use opsdesk_core::task::{Task, TaskBuilder};
use opsdesk_forms::parser::parse_json;
use opsdesk_forms::{
    EngineError, FormDefinition, LocalFile, StorageId, UploadError, Uploader, WorkflowEngine,
};

const SCHEMA: &str = r#"{"id": "salida", "components": [
    {"id": "p", "type": "textfield", "key": "placa"},
    {"id": "o", "type": "textfield", "key": "operador", "validate": {"required": true}},
    {"id": "f1", "type": "filepicker", "key": "fotos", "multiple": true},
    {"id": "f2", "type": "filepicker", "key": "facturas", "multiple": true}
]}"#;

pub(crate) type CallLog = Rc<RefCell<Vec<String>>>;

/// Engine answering [`SCHEMA`] for every task, logging each call.
pub(crate) struct FakeEngine {
    log: CallLog,
    fetch_failures: Cell<usize>,
    completion_failures: Cell<usize>,
}

impl FakeEngine {
    pub fn new() -> Self {
        Self {
            log: Rc::default(),
            fetch_failures: Cell::new(0),
            completion_failures: Cell::new(0),
        }
    }

    pub fn fail_fetches(&self, n: usize) {
        self.fetch_failures.set(n);
    }

    pub fn fail_completions(&self, n: usize) {
        self.completion_failures.set(n);
    }

    pub fn calls(&self) -> Vec<String> {
        self.log.borrow().clone()
    }

    fn take_failure(counter: &Cell<usize>) -> bool {
        let left = counter.get();
        counter.set(left.saturating_sub(1));
        left > 0
    }
}

impl WorkflowEngine for FakeEngine {
    fn fetch_form(
        &self,
        external_id: &str,
        _variables: &Value,
    ) -> Result<FormDefinition, EngineError> {
        if external_id.trim().is_empty() {
            return Err(EngineError::MissingTaskId);
        }
        self.log.borrow_mut().push(format!("fetch {external_id}"));
        if Self::take_failure(&self.fetch_failures) {
            return Err(EngineError::Transport("connection refused".into()));
        }
        Ok(parse_json(SCHEMA).unwrap())
    }

    fn complete(
        &self,
        external_id: &str,
        _variables: &Map<String, Value>,
    ) -> Result<(), EngineError> {
        self.log.borrow_mut().push(format!("complete {external_id}"));
        if Self::take_failure(&self.completion_failures) {
            return Err(EngineError::status(500, "engine unavailable"));
        }
        Ok(())
    }
}

/// Uploader writing into the engine's log; files named `fail*` fail.
pub(crate) struct FakeUploader {
    log: CallLog,
    next: Cell<usize>,
}

impl FakeUploader {
    pub fn sharing(engine: &FakeEngine) -> Self {
        Self {
            log: Rc::clone(&engine.log),
            next: Cell::new(0),
        }
    }
}

impl Uploader for FakeUploader {
    fn upload(&self, file: &LocalFile) -> Result<Option<StorageId>, UploadError> {
        self.log.borrow_mut().push(format!("upload {}", file.name));
        if file.name.starts_with("fail") {
            return Err(UploadError::Transport("connection reset".into()));
        }
        self.next.set(self.next.get() + 1);
        Ok(Some(StorageId(format!("st-{}", self.next.get()))))
    }
}

/// A task with engine id `ext-<id>`.
pub(crate) fn task(id: &str, variables: Value) -> Task {
    TaskBuilder::new(format!("Tarea {id}"))
        .id(id)
        .external_id(format!("ext-{id}"))
        .variables(variables.as_object().cloned().unwrap_or_default())
        .build()
}
