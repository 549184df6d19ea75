//! Form schema model.
//!
//! A form is an ordered sequence of component nodes; groups nest child
//! sequences recursively. Parsing is lenient per node: a node that cannot be
//! decoded becomes an [`ComponentType::Unsupported`] component carrying its
//! original type tag, so one bad node never fails the whole tree.

use opsdesk_core::enums::{ComponentType, DateSubtype};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};
use tracing::warn;

/// Tag used when a malformed node does not even carry a string `type`.
pub const MALFORMED_TAG: &str = "malformed";

fn is_false(b: &bool) -> bool {
    !b
}

/// A form definition as deployed for a task.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FormDefinition {
    /// Schema identifier.
    #[serde(default)]
    pub id: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schema_version: Option<i64>,

    #[serde(default, deserialize_with = "deserialize_components")]
    pub components: Vec<FormComponent>,

    /// Where this definition was loaded from (set by the parser).
    #[serde(skip)]
    pub source: String,
}

/// One node of the form tree.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FormComponent {
    #[serde(default)]
    pub id: String,

    #[serde(rename = "type", default)]
    pub component_type: ComponentType,

    /// Binding key; absent for purely presentational nodes.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,

    /// Prose of `text` components.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_value: Option<Value>,

    // ----- number -----
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub decimal_digits: Option<u32>,

    #[serde(
        default,
        deserialize_with = "deserialize_lenient_number",
        skip_serializing_if = "Option::is_none"
    )]
    pub increment: Option<f64>,

    // ----- flags -----
    #[serde(default, deserialize_with = "deserialize_flag", skip_serializing_if = "is_false")]
    pub disabled: bool,

    #[serde(default, deserialize_with = "deserialize_flag", skip_serializing_if = "is_false")]
    pub readonly: bool,

    // ----- datetime -----
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subtype: Option<DateSubtype>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date_label: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time_label: Option<String>,

    #[serde(default, deserialize_with = "deserialize_flag", skip_serializing_if = "is_false")]
    pub disallow_passed_dates: bool,

    // ----- expression -----
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expression: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub compute_on: Option<String>,

    // ----- filepicker -----
    #[serde(default, deserialize_with = "deserialize_flag", skip_serializing_if = "is_false")]
    pub multiple: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub accept: Option<String>,

    // ----- option sources -----
    /// Statically declared options.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub values: Vec<OptionItem>,

    /// State key holding an array of option records.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub values_key: Option<String>,

    /// Expression evaluating to an array of option records.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub values_expression: Option<String>,

    #[serde(default, deserialize_with = "deserialize_flag", skip_serializing_if = "is_false")]
    pub searchable: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub appearance: Option<Appearance>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub validate: Option<ValidateRules>,

    // ----- group -----
    /// Path prefix this group introduces for its descendants.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,

    #[serde(default, deserialize_with = "deserialize_flag", skip_serializing_if = "is_false")]
    pub show_outline: bool,

    #[serde(
        default,
        deserialize_with = "deserialize_components",
        skip_serializing_if = "Vec::is_empty"
    )]
    pub components: Vec<FormComponent>,

    /// Reference identifier for the internal data provider.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub external_data: Option<String>,

    /// Raw provider result attached by injection to non-choice components.
    #[serde(skip)]
    pub injected: Option<Value>,

    /// Attributes this interpreter does not model (layout and the like).
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl FormComponent {
    /// Creates a component of the given type with only an id set.
    pub fn new(id: impl Into<String>, component_type: ComponentType) -> Self {
        Self {
            id: id.into(),
            component_type,
            ..Self::default()
        }
    }

    /// Builder-style binding key setter.
    pub fn with_key(mut self, key: impl Into<String>) -> Self {
        self.key = Some(key.into());
        self
    }

    /// Builder-style label setter.
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    /// Builder-style child setter for groups.
    pub fn with_components(mut self, components: Vec<FormComponent>) -> Self {
        self.components = components;
        self
    }

    /// Builder-style group path setter.
    pub fn with_path(mut self, path: impl Into<String>) -> Self {
        self.path = Some(path.into());
        self
    }

    /// Non-empty binding key, if any.
    pub fn binding_key(&self) -> Option<&str> {
        self.key.as_deref().filter(|k| !k.is_empty())
    }

    /// Non-empty group path, if any.
    pub fn group_path(&self) -> Option<&str> {
        self.path.as_deref().filter(|p| !p.is_empty())
    }

    /// Display label: the label, or the key, or the id.
    pub fn display_label(&self) -> &str {
        self.label
            .as_deref()
            .filter(|l| !l.is_empty())
            .or(self.binding_key())
            .unwrap_or(&self.id)
    }

    /// Whether the field must hold a value at submission.
    pub fn is_required(&self) -> bool {
        self.validate.as_ref().is_some_and(|v| v.required)
    }

    /// Placeholder for a node that could not be decoded.
    fn malformed(node: &Value) -> Self {
        let tag = node
            .get("type")
            .and_then(Value::as_str)
            .unwrap_or(MALFORMED_TAG);
        let id = node
            .get("id")
            .and_then(Value::as_str)
            .unwrap_or_default();
        let mut component = Self::new(id, ComponentType::Unsupported(tag.to_owned()));
        component.key = node.get("key").and_then(Value::as_str).map(str::to_owned);
        component.label = node.get("label").and_then(Value::as_str).map(str::to_owned);
        component
    }
}

/// A `(label, value)` pair offered by a choice component.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OptionItem {
    #[serde(default)]
    pub label: String,
    #[serde(default)]
    pub value: Value,
}

impl OptionItem {
    pub fn new(label: impl Into<String>, value: impl Into<Value>) -> Self {
        Self {
            label: label.into(),
            value: value.into(),
        }
    }
}

/// Text shown before or after an input.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Appearance {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prefix_adorner: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub suffix_adorner: Option<String>,
}

/// Declarative validation attached to a field.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidateRules {
    #[serde(default, deserialize_with = "deserialize_flag", skip_serializing_if = "is_false")]
    pub required: bool,

    #[serde(
        default,
        deserialize_with = "deserialize_lenient_number",
        skip_serializing_if = "Option::is_none"
    )]
    pub min: Option<f64>,

    #[serde(
        default,
        deserialize_with = "deserialize_lenient_number",
        skip_serializing_if = "Option::is_none"
    )]
    pub max: Option<f64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_length: Option<usize>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_length: Option<usize>,
}

// ---------------------------------------------------------------------------
// Lenient field decoders
// ---------------------------------------------------------------------------

/// Decodes each child node independently.
fn deserialize_components<'de, D: Deserializer<'de>>(d: D) -> Result<Vec<FormComponent>, D::Error> {
    let nodes = Option::<Vec<Value>>::deserialize(d)?.unwrap_or_default();
    Ok(nodes.iter().map(decode_component).collect())
}

/// Decodes one node, degrading to an unsupported placeholder on failure.
pub fn decode_component(node: &Value) -> FormComponent {
    match FormComponent::deserialize(node) {
        Ok(component) => component,
        Err(e) => {
            let placeholder = FormComponent::malformed(node);
            warn!(
                id = %placeholder.id,
                tag = %placeholder.component_type,
                error = %e,
                "malformed form component, rendering placeholder"
            );
            placeholder
        }
    }
}

/// Accepts `true`/`false`, the checkbox strings `"on"`/`"true"`, or null.
fn deserialize_flag<'de, D: Deserializer<'de>>(d: D) -> Result<bool, D::Error> {
    Ok(match Value::deserialize(d)? {
        Value::Bool(b) => b,
        Value::String(s) => matches!(s.as_str(), "on" | "true"),
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        _ => false,
    })
}

/// Accepts a number or a numeric string; anything else is `None`.
fn deserialize_lenient_number<'de, D: Deserializer<'de>>(d: D) -> Result<Option<f64>, D::Error> {
    Ok(match Value::deserialize(d)? {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok().filter(|f| f.is_finite()),
        _ => None,
    })
}
