//! A live editing session for one task's form.
//!
//! The session owns the definition, the seeded task variables and the
//! current [`FormState`]. Every edit replaces the state with a new one and
//! then recomputes expression fields until they settle.

use chrono::NaiveDate;
use opsdesk_core::enums::ComponentType;
use serde_json::{Map, Value};
use tracing::{debug, warn};

use crate::error::{FormError, Result, SerializeError};
use crate::expr::{self, Scope, build_scope};
use crate::options::{ResolvedOptions, display_text, resolve_options};
use crate::serialize::{Uploader, serialize_variables};
use crate::state::{FormState, FormValue, LocalFile, Lookup};
use crate::types::{FormComponent, FormDefinition, OptionItem};
use crate::validate::{FieldIssue, validate_form};
use crate::variables::{seed_variables, state_from_variables};
use crate::walk::{Visit, find_binding, walk};

/// Editing session over one form definition.
#[derive(Debug, Clone)]
pub struct FormSession {
    definition: FormDefinition,
    variables: Value,
    state: FormState,
}

impl FormSession {
    /// Creates a session seeded from the task's variable bag.
    ///
    /// Seeding flattens the normalized variables into state, then applies
    /// declared defaults to still-empty fields, then computes expressions.
    pub fn new(definition: FormDefinition, variables: &Value) -> Self {
        let mut session = Self {
            definition,
            variables: seed_variables(variables),
            state: state_from_variables(variables),
        };
        session.apply_defaults();
        session.recompute();
        session
    }

    pub fn definition(&self) -> &FormDefinition {
        &self.definition
    }

    pub fn state(&self) -> &FormState {
        &self.state
    }

    /// The normalized task variables the session was seeded from.
    pub fn variables(&self) -> &Value {
        &self.variables
    }

    pub fn get(&self, path: &str) -> Lookup<'_> {
        self.state.get(path)
    }

    /// Scope for expression evaluation over the current state.
    pub fn scope(&self) -> Scope {
        build_scope(&self.state, &self.variables)
    }

    /// Resolved options of a choice component.
    pub fn options(&self, component: &FormComponent) -> ResolvedOptions {
        resolve_options(component, &self.state, &self.scope())
    }

    /// Stores a value at the path of a bound field.
    pub fn set_field(&mut self, path: &str, value: FormValue) -> Result<()> {
        self.bound_field(path)?;
        self.state = self.state.set(path, value);
        self.recompute();
        Ok(())
    }

    /// Removes the value of a bound field.
    pub fn clear_field(&mut self, path: &str) -> Result<()> {
        self.bound_field(path)?;
        self.state = self.state.remove(path);
        self.recompute();
        Ok(())
    }

    /// Parses operator text into the field's value type and stores it.
    pub fn set_input(&mut self, path: &str, raw: &str) -> Result<()> {
        let visit = self.bound_field(path)?;
        let component = visit.component;
        if component.readonly || component.disabled {
            return Err(FormError::invalid_input(path, "field is read-only"));
        }
        let value = match &component.component_type {
            ComponentType::Number => {
                let f: f64 = raw
                    .trim()
                    .parse()
                    .map_err(|_| {
                        FormError::invalid_input(path, format!("{raw:?} is not a number"))
                    })?;
                FormValue::number(f)
                    .ok_or_else(|| FormError::invalid_input(path, "number is not finite"))?
            }
            ComponentType::Checkbox => FormValue::Bool(parse_flag(raw).ok_or_else(|| {
                FormError::invalid_input(path, format!("{raw:?} is not a yes/no value"))
            })?),
            ComponentType::Select | ComponentType::Radio => {
                let options = self.options(component);
                FormValue::from_json(&match_option(&options.items, raw.trim()))
            }
            ComponentType::Checklist | ComponentType::Taglist => {
                let options = self.options(component);
                FormValue::List(
                    raw.split(',')
                        .map(str::trim)
                        .filter(|token| !token.is_empty())
                        .map(|token| FormValue::from_json(&match_option(&options.items, token)))
                        .collect(),
                )
            }
            ComponentType::Filepicker => {
                let files: Vec<LocalFile> = raw
                    .split(',')
                    .map(str::trim)
                    .filter(|p| !p.is_empty())
                    .map(LocalFile::new)
                    .collect();
                return self.attach_files(path, files);
            }
            ComponentType::Expression => {
                return Err(FormError::invalid_input(path, "computed fields cannot be edited"));
            }
            _ => FormValue::text(raw),
        };
        self.set_field(path, value)
    }

    /// Attaches local files to a file picker: one file for a single picker,
    /// all of them for a `multiple` picker.
    pub fn attach_files(&mut self, path: &str, mut files: Vec<LocalFile>) -> Result<()> {
        let visit = self.bound_field(path)?;
        if visit.component.component_type != ComponentType::Filepicker {
            return Err(FormError::invalid_input(path, "field does not accept files"));
        }
        let value = if visit.component.multiple {
            FormValue::Files(files)
        } else if files.len() > 1 {
            return Err(FormError::invalid_input(path, "field accepts a single file"));
        } else {
            match files.pop() {
                Some(file) => FormValue::File(file),
                None => return self.clear_field(path),
            }
        };
        self.set_field(path, value)
    }

    /// Field validation against today's date.
    pub fn validate(&self, today: NaiveDate) -> Vec<FieldIssue> {
        validate_form(&self.definition, &self.state, today)
    }

    /// Builds the submission payload, uploading attachments.
    pub fn serialize(
        &self,
        uploader: &dyn Uploader,
    ) -> std::result::Result<Map<String, Value>, SerializeError> {
        serialize_variables(&self.definition, &self.state, uploader)
    }

    fn bound_field(&self, path: &str) -> Result<Visit<'_>> {
        find_binding(&self.definition.components, path).ok_or_else(|| FormError::UnknownField {
            path: path.to_owned(),
        })
    }

    // -- Derived values ------------------------------------------------------

    fn apply_defaults(&mut self) {
        let mut state = self.state.clone();
        for visit in walk(&self.definition.components) {
            let component = visit.component;
            let (Some(default), Some(path)) = (&component.default_value, visit.binding_path())
            else {
                continue;
            };
            if !visit.is_field() || !state.get(&path).is_absent() {
                continue;
            }
            if component.component_type == ComponentType::Select {
                let scope = build_scope(&state, &self.variables);
                let options = resolve_options(component, &state, &scope);
                if !options.contains_value(default) {
                    debug!(id = %component.id, "select default has no matching option");
                    continue;
                }
            }
            state = state.set(&path, FormValue::from_json(default));
        }
        self.state = state;
    }

    /// Re-evaluates expression fields until no computed value changes.
    fn recompute(&mut self) {
        let computed: Vec<(String, String)> = walk(&self.definition.components)
            .into_iter()
            .filter(|v| v.is_field() && v.component.component_type == ComponentType::Expression)
            .filter_map(|v| {
                let expression = v.component.expression.clone()?;
                Some((v.binding_path()?, expression))
            })
            .collect();
        if computed.is_empty() {
            return;
        }

        for _ in 0..=computed.len() {
            let scope = build_scope(&self.state, &self.variables);
            let mut next = self.state.clone();
            for (path, expression) in &computed {
                let value = expr::evaluate(expression, &scope).map(|e| e.to_form_value());
                let unchanged = match (next.get(path), &value) {
                    (Lookup::Present(current), Some(value)) => current == value,
                    (Lookup::Absent, None) => true,
                    _ => false,
                };
                if unchanged {
                    continue;
                }
                next = match value {
                    Some(value) => next.set(path, value),
                    None => next.remove(path),
                };
            }
            if next == self.state {
                return;
            }
            self.state = next;
        }
        warn!(fields = computed.len(), "computed fields did not settle");
    }
}

/// The option whose value or label matches `token`, else the token as text.
fn match_option(options: &[OptionItem], token: &str) -> Value {
    options
        .iter()
        .find(|o| display_text(&o.value) == token)
        .or_else(|| options.iter().find(|o| o.label == token))
        .map(|o| o.value.clone())
        .unwrap_or_else(|| Value::String(token.to_owned()))
}

fn parse_flag(raw: &str) -> Option<bool> {
    match raw.trim().to_lowercase().as_str() {
        "true" | "on" | "yes" | "y" | "si" | "sí" | "1" => Some(true),
        "false" | "off" | "no" | "n" | "0" => Some(false),
        _ => None,
    }
}
