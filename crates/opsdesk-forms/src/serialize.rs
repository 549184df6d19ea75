//! Submission-time serialization of form state into a variable bag.
//!
//! The tree is walked in order. A group with a `path` nests its children's
//! output under that path; a pathless group merges its children into the
//! current level. Each bound field contributes its value, except:
//!
//! - an absent value is omitted, never sent as an explicit null;
//! - a single file is uploaded and replaced by its storage identifier, or
//!   omitted if the upload yields nothing;
//! - a file list is uploaded one file at a time, in order, and replaced by
//!   the list of identifiers, or omitted if no upload yields one.
//!
//! Raw results captured by external data injection are then added as
//! top-level entries, keyed by the component's binding key or id.

use serde_json::{Map, Value};
use tracing::{debug, info};

use crate::error::{SerializeError, UploadError};
use crate::state::{FormState, FormValue, LocalFile, Lookup, StorageId};
use crate::types::{FormComponent, FormDefinition};
use crate::variables::insert_path;
use crate::walk::{child_path, resolve_binding, walk};
use opsdesk_core::enums::ComponentType;

/// Two-step attachment upload to durable storage.
pub trait Uploader {
    /// Stores one file. `Ok(None)` means the store accepted the transfer but
    /// returned no identifier.
    fn upload(&self, file: &LocalFile) -> Result<Option<StorageId>, UploadError>;
}

/// Builds the nested variable bag for a submission.
pub fn serialize_variables(
    definition: &FormDefinition,
    state: &FormState,
    uploader: &dyn Uploader,
) -> Result<Map<String, Value>, SerializeError> {
    let mut run = Run {
        state,
        uploader,
        uploaded: Vec::new(),
    };
    let mut out = Map::new();
    run.level(&definition.components, "", &mut out)?;

    for visit in walk(&definition.components) {
        let component = visit.component;
        let Some(raw) = &component.injected else {
            continue;
        };
        let name = component.binding_key().unwrap_or(&component.id);
        if name.is_empty() || out.contains_key(name) {
            continue;
        }
        out.insert(name.to_owned(), raw.clone());
    }

    info!(
        entries = out.len(),
        uploads = run.uploaded.len(),
        "serialized form variables"
    );
    Ok(out)
}

struct Run<'a> {
    state: &'a FormState,
    uploader: &'a dyn Uploader,
    /// Every identifier obtained so far, in upload order.
    uploaded: Vec<StorageId>,
}

impl Run<'_> {
    fn level(
        &mut self,
        components: &[FormComponent],
        group_path: &str,
        out: &mut Map<String, Value>,
    ) -> Result<(), SerializeError> {
        for component in components {
            match &component.component_type {
                ComponentType::Group => match component.group_path() {
                    Some(path) => {
                        let mut nested = Map::new();
                        self.level(
                            &component.components,
                            &child_path(group_path, Some(path)),
                            &mut nested,
                        )?;
                        if !nested.is_empty() {
                            insert_path(out, path, Value::Object(nested));
                        }
                    }
                    None => self.level(&component.components, group_path, out)?,
                },
                ComponentType::Unsupported(tag) => {
                    debug!(id = %component.id, tag = %tag, "skipping unsupported component");
                }
                _ if component.component_type.is_presentational() => {}
                _ => {
                    let Some(key) = component.binding_key() else {
                        continue;
                    };
                    let path = resolve_binding(group_path, key);
                    if let Some(value) = self.field(&path)? {
                        insert_path(out, key, value);
                    }
                }
            }
        }
        Ok(())
    }

    /// Serialized value of one bound field, `None` to omit it.
    fn field(&mut self, path: &str) -> Result<Option<Value>, SerializeError> {
        let state = self.state;
        let value = match state.get(path) {
            Lookup::Absent => return Ok(None),
            Lookup::Present(value) => value,
        };
        match value {
            FormValue::File(file) => Ok(self.upload(path, file)?.map(|id| Value::String(id.0))),
            FormValue::Files(files) if files.is_empty() => Ok(None),
            FormValue::Files(files) => {
                let mut ids = Vec::with_capacity(files.len());
                for file in files {
                    if let Some(id) = self.upload(path, file)? {
                        ids.push(Value::String(id.0));
                    }
                }
                if ids.is_empty() {
                    return Ok(None);
                }
                Ok(Some(Value::Array(ids)))
            }
            other => Ok(Some(other.to_json())),
        }
    }

    fn upload(
        &mut self,
        path: &str,
        file: &LocalFile,
    ) -> Result<Option<StorageId>, SerializeError> {
        match self.uploader.upload(file) {
            Ok(Some(id)) => {
                debug!(field = path, file = %file.name, storage_id = %id, "attachment stored");
                self.uploaded.push(id.clone());
                Ok(Some(id))
            }
            Ok(None) => {
                debug!(field = path, file = %file.name, "upload yielded no identifier");
                Ok(None)
            }
            Err(source) => Err(SerializeError::Upload {
                field: path.to_owned(),
                uploaded: std::mem::take(&mut self.uploaded),
                source,
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse_json;
    use crate::variables::state_from_variables;
    use pretty_assertions::assert_eq;
    use serde_json::json;
    use std::cell::RefCell;

    /// Hands out sequential ids; fails on files named `fail*`, yields
    /// nothing on files named `empty*`.
    struct FakeUploader {
        log: RefCell<Vec<String>>,
    }

    impl FakeUploader {
        fn new() -> Self {
            Self {
                log: RefCell::new(Vec::new()),
            }
        }
    }

    impl Uploader for FakeUploader {
        fn upload(&self, file: &LocalFile) -> Result<Option<StorageId>, UploadError> {
            if file.name.starts_with("fail") {
                return Err(UploadError::Transport("connection reset".into()));
            }
            if file.name.starts_with("empty") {
                return Ok(None);
            }
            let mut log = self.log.borrow_mut();
            log.push(file.name.clone());
            Ok(Some(StorageId(format!("st-{}", log.len()))))
        }
    }

    fn files(names: &[&str]) -> FormValue {
        FormValue::Files(names.iter().map(|n| LocalFile::new(format!("/tmp/{n}"))).collect())
    }

    #[test]
    fn driver_group_scenario() {
        let def = parse_json(
            r#"{"components": [{
                "id": "g", "type": "group", "path": "driver", "components": [
                    {"id": "n", "type": "textfield", "key": "name"},
                    {"id": "l", "type": "textfield", "key": "license"}
                ]
            }]}"#,
        )
        .unwrap();
        let state = state_from_variables(&json!({"driver": {"name": "Juan", "license": "ABC123"}}))
            .set("driver.name", FormValue::text("Juan Pérez"));
        let out = serialize_variables(&def, &state, &FakeUploader::new()).unwrap();
        assert_eq!(
            Value::Object(out),
            json!({"driver": {"name": "Juan Pérez", "license": "ABC123"}})
        );
    }

    #[test]
    fn absent_values_are_omitted_and_pathless_groups_merge() {
        let def = parse_json(
            r#"{"components": [
                {"id": "t", "type": "text", "text": "Instrucciones"},
                {"id": "a", "type": "textfield", "key": "a"},
                {"id": "g", "type": "group", "components": [
                    {"id": "b", "type": "checkbox", "key": "b"},
                    {"id": "c", "type": "number", "key": "c"}
                ]},
                {"id": "x", "type": "totally-unknown", "key": "x"}
            ]}"#,
        )
        .unwrap();
        let state = FormState::new()
            .set("b", FormValue::Bool(false))
            .set("x", FormValue::text("ignored"));
        let out = serialize_variables(&def, &state, &FakeUploader::new()).unwrap();
        assert_eq!(Value::Object(out), json!({"b": false}));
    }

    #[test]
    fn file_arrays_upload_in_order() {
        let def = parse_json(
            r#"{"components": [
                {"id": "f1", "type": "filepicker", "key": "fotos", "multiple": true},
                {"id": "f2", "type": "filepicker", "key": "facturas", "multiple": true},
                {"id": "f3", "type": "filepicker", "key": "firma"}
            ]}"#,
        )
        .unwrap();
        let state = FormState::new()
            .set("fotos", files(&["a.jpg", "b.jpg"]))
            .set("facturas", files(&["c.pdf", "d.pdf", "e.pdf"]))
            .set("firma", FormValue::File(LocalFile::new("/tmp/empty.png")));
        let uploader = FakeUploader::new();
        let out = serialize_variables(&def, &state, &uploader).unwrap();
        assert_eq!(*uploader.log.borrow(), vec!["a.jpg", "b.jpg", "c.pdf", "d.pdf", "e.pdf"]);
        assert_eq!(out["fotos"], json!(["st-1", "st-2"]));
        assert_eq!(out["facturas"], json!(["st-3", "st-4", "st-5"]));
        assert!(!out.contains_key("firma"));
    }

    #[test]
    fn file_list_without_identifiers_is_omitted() {
        let def = parse_json(
            r#"{"components": [
                {"id": "f1", "type": "filepicker", "key": "fotos", "multiple": true},
                {"id": "f2", "type": "filepicker", "key": "facturas", "multiple": true}
            ]}"#,
        )
        .unwrap();
        let state = FormState::new()
            .set("fotos", files(&["empty-a.jpg", "empty-b.jpg"]))
            .set("facturas", files(&["empty-c.pdf", "d.pdf"]));
        let out = serialize_variables(&def, &state, &FakeUploader::new()).unwrap();
        assert_eq!(Value::Object(out), json!({"facturas": ["st-1"]}));
    }

    #[test]
    fn upload_failure_reports_completed_ids() {
        let def = parse_json(
            r#"{"components": [
                {"id": "f1", "type": "filepicker", "key": "fotos", "multiple": true},
                {"id": "f2", "type": "filepicker", "key": "facturas", "multiple": true}
            ]}"#,
        )
        .unwrap();
        let state = FormState::new()
            .set("fotos", files(&["a.jpg"]))
            .set("facturas", files(&["c.pdf", "fail.pdf", "e.pdf"]));
        let uploader = FakeUploader::new();
        let err = serialize_variables(&def, &state, &uploader).unwrap_err();
        let SerializeError::Upload { field, uploaded, .. } = &err;
        assert_eq!(field, "facturas");
        assert_eq!(uploaded, &vec![StorageId("st-1".into()), StorageId("st-2".into())]);
        // Nothing after the failing file is attempted.
        assert_eq!(uploader.log.borrow().len(), 2);
    }

    #[test]
    fn injected_results_become_top_level_entries() {
        let mut def = parse_json(
            r#"{"components": [
                {"id": "g", "type": "group", "path": "viaje", "components": [
                    {"id": "hist", "type": "textfield", "key": "historial"}
                ]},
                {"id": "anon", "type": "expression"}
            ]}"#,
        )
        .unwrap();
        def.components[0].components[0].injected = Some(json!([{"unidad": "T-1"}]));
        def.components[1].injected = Some(json!([1]));
        let out = serialize_variables(&def, &FormState::new(), &FakeUploader::new()).unwrap();
        assert_eq!(
            Value::Object(out),
            json!({"historial": [{"unidad": "T-1"}], "anon": [1]})
        );
    }

    #[test]
    fn stored_references_pass_through() {
        let def =
            parse_json(r#"{"components": [{"id": "f", "type": "filepicker", "key": "doc"}]}"#)
                .unwrap();
        let state = FormState::new().set("doc", FormValue::Stored(StorageId("st-9".into())));
        let out = serialize_variables(&def, &state, &FakeUploader::new()).unwrap();
        assert_eq!(out["doc"], json!("st-9"));
    }
}
