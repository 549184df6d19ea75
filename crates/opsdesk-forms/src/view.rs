//! Render view model: a flat, pre-ordered list of field views.
//!
//! Every component type maps to exactly one view kind, with an explicit
//! placeholder for types the interpreter does not render.

use opsdesk_core::enums::{ComponentType, DateSubtype};
use serde_json::Value;

use crate::session::FormSession;
use crate::state::FormValue;
use crate::types::OptionItem;
use crate::walk::{Visit, VisitKind, walk};

/// Placeholder text shown for unsupported components.
pub const UNSUPPORTED_TEXT: &str = "Tipo de campo no soportado";

/// Text shown when a choice component resolves no options.
pub const NO_OPTIONS_TEXT: &str = "No hay opciones disponibles";

/// Input widget flavour.
#[derive(Debug, Clone, PartialEq)]
pub enum InputKind {
    Textfield,
    Textarea,
    Number {
        min: Option<f64>,
        max: Option<f64>,
        step: Option<f64>,
        decimals: Option<u32>,
    },
    Checkbox,
    Date(DateSubtype),
}

/// Options of a choice view.
#[derive(Debug, Clone, PartialEq)]
pub enum OptionsView {
    Available(Vec<OptionItem>),
    NoneAvailable,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ViewKind {
    Text {
        text: String,
    },
    Group {
        outlined: bool,
    },
    Input {
        input: InputKind,
        value: Option<Value>,
        required: bool,
        disabled: bool,
        readonly: bool,
        prefix: Option<String>,
        suffix: Option<String>,
    },
    Choice {
        multiple: bool,
        searchable: bool,
        required: bool,
        options: OptionsView,
        selected: Option<Value>,
    },
    FilePicker {
        multiple: bool,
        accept: Option<String>,
        files: Vec<String>,
    },
    /// Expression fields render as a read-only computed value.
    Computed {
        value: Option<Value>,
    },
    Unsupported {
        type_tag: String,
    },
}

/// One row of the rendered form.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldView {
    pub id: String,
    pub depth: usize,
    pub label: Option<String>,
    pub description: Option<String>,
    pub path: Option<String>,
    pub kind: ViewKind,
}

/// Builds the view of a session's form in traversal order.
pub fn build_view(session: &FormSession) -> Vec<FieldView> {
    walk(&session.definition().components)
        .iter()
        .map(|visit| field_view(session, visit))
        .collect()
}

fn field_view(session: &FormSession, visit: &Visit<'_>) -> FieldView {
    let component = visit.component;
    let path = visit.binding_path();
    let current = path
        .as_deref()
        .and_then(|p| session.get(p).value())
        .cloned();
    let required = component.is_required();
    let appearance = component.appearance.clone().unwrap_or_default();

    let kind = match &visit.kind {
        VisitKind::Unsupported { type_tag } => ViewKind::Unsupported {
            type_tag: (*type_tag).to_owned(),
        },
        VisitKind::Group => ViewKind::Group {
            outlined: component.show_outline,
        },
        VisitKind::Field => {
            let input = |input: InputKind| ViewKind::Input {
                input,
                value: current.as_ref().map(FormValue::to_json),
                required,
                disabled: component.disabled,
                readonly: component.readonly,
                prefix: appearance.prefix_adorner.clone(),
                suffix: appearance.suffix_adorner.clone(),
            };
            match &component.component_type {
                ComponentType::Text => ViewKind::Text {
                    text: component.text.clone().unwrap_or_default(),
                },
                ComponentType::Textfield => input(InputKind::Textfield),
                ComponentType::Textarea => input(InputKind::Textarea),
                ComponentType::Number => {
                    let rules = component.validate.clone().unwrap_or_default();
                    input(InputKind::Number {
                        min: rules.min,
                        max: rules.max,
                        step: component.increment,
                        decimals: component.decimal_digits,
                    })
                }
                ComponentType::Checkbox => input(InputKind::Checkbox),
                ComponentType::Datetime => {
                    input(InputKind::Date(component.subtype.clone().unwrap_or_default()))
                }
                ComponentType::Expression => ViewKind::Computed {
                    value: current.as_ref().map(FormValue::to_json),
                },
                ComponentType::Checklist
                | ComponentType::Radio
                | ComponentType::Select
                | ComponentType::Taglist => {
                    let resolved = session.options(component);
                    ViewKind::Choice {
                        multiple: component.component_type.is_multi_choice(),
                        searchable: component.searchable,
                        required,
                        options: if resolved.is_empty() {
                            OptionsView::NoneAvailable
                        } else {
                            OptionsView::Available(resolved.items)
                        },
                        selected: current.as_ref().map(FormValue::to_json),
                    }
                }
                ComponentType::Filepicker => ViewKind::FilePicker {
                    multiple: component.multiple,
                    accept: component.accept.clone(),
                    files: file_names(current.as_ref()),
                },
                // Walk reports groups and unknown tags as their own kinds.
                ComponentType::Group => ViewKind::Group {
                    outlined: component.show_outline,
                },
                ComponentType::Unsupported(tag) => ViewKind::Unsupported {
                    type_tag: tag.clone(),
                },
            }
        }
    };

    FieldView {
        id: component.id.clone(),
        depth: visit.depth,
        label: component.label.clone().filter(|l| !l.is_empty()),
        description: component.description.clone(),
        path,
        kind,
    }
}

fn file_names(value: Option<&FormValue>) -> Vec<String> {
    match value {
        Some(FormValue::File(f)) => vec![f.name.clone()],
        Some(FormValue::Files(fs)) => fs.iter().map(|f| f.name.clone()).collect(),
        Some(FormValue::Stored(id)) => vec![id.to_string()],
        Some(FormValue::StoredList(ids)) => ids.iter().map(ToString::to_string).collect(),
        _ => Vec::new(),
    }
}
