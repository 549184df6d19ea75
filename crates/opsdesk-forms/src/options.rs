//! Option lists for choice components.
//!
//! Sources, strictly in this order:
//! 1. the static `values` list, when non-empty;
//! 2. the array held in state at `valuesKey`;
//! 3. the array produced by `valuesExpression`;
//! 4. nothing (the renderer shows a "no options" state).

use serde_json::Value;
use tracing::debug;

use crate::expr::{self, Evaluated, Scope};
use crate::state::{FormState, FormValue, Lookup};
use crate::types::{FormComponent, OptionItem};

/// Which source produced an option list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OptionSource {
    Static,
    ValuesKey,
    Expression,
    Empty,
}

/// A resolved option list and where it came from.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedOptions {
    pub items: Vec<OptionItem>,
    pub source: OptionSource,
}

impl ResolvedOptions {
    fn empty() -> Self {
        Self {
            items: Vec::new(),
            source: OptionSource::Empty,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Returns `true` if some option carries `value`.
    pub fn contains_value(&self, value: &Value) -> bool {
        self.items.iter().any(|item| &item.value == value)
    }
}

/// Resolves the option list of a component against the current state.
pub fn resolve_options(
    component: &FormComponent,
    state: &FormState,
    scope: &Scope,
) -> ResolvedOptions {
    if !component.values.is_empty() {
        return ResolvedOptions {
            items: component.values.clone(),
            source: OptionSource::Static,
        };
    }

    if let Some(key) = component.values_key.as_deref().filter(|k| !k.is_empty()) {
        match state.get(key) {
            Lookup::Present(FormValue::List(items)) => {
                let json: Vec<Value> = items.iter().map(FormValue::to_json).collect();
                return ResolvedOptions {
                    items: normalize_items(&json),
                    source: OptionSource::ValuesKey,
                };
            }
            other => debug!(
                id = %component.id,
                key,
                absent = other.is_absent(),
                "valuesKey holds no array"
            ),
        }
    }

    if let Some(expression) = component.values_expression.as_deref() {
        if let Some(Evaluated::Array(items)) = expr::evaluate(expression, scope) {
            return ResolvedOptions {
                items: normalize_items(&items),
                source: OptionSource::Expression,
            };
        }
        debug!(id = %component.id, "valuesExpression produced no array");
    }

    ResolvedOptions::empty()
}

/// Maps raw records onto `(label, value)` pairs.
pub fn normalize_items(items: &[Value]) -> Vec<OptionItem> {
    items
        .iter()
        .enumerate()
        .map(|(i, item)| normalize_item(item, i))
        .collect()
}

/// Maps one record: `label` falls back to the record's display text;
/// `value` falls back to the display text, then to `option_<index>`.
pub fn normalize_item(item: &Value, index: usize) -> OptionItem {
    let display = display_text(item);
    let label = match item.get("label") {
        Some(label) if is_truthy(label) => display_text(label),
        _ => display.clone(),
    };
    let value = match item.get("value") {
        Some(value) if is_truthy(value) => value.clone(),
        _ if !display.is_empty() => Value::String(display),
        _ => Value::String(format!("option_{index}")),
    };
    OptionItem { label, value }
}

/// Display text of a raw value: strings verbatim, everything else as JSON.
pub fn display_text(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0 && !f.is_nan()),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expr::build_scope;
    use crate::types::decode_component;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn resolve(component: serde_json::Value, vars: serde_json::Value) -> ResolvedOptions {
        let c = decode_component(&component);
        let state = FormState::from_json(&vars);
        let scope = build_scope(&state, &vars);
        resolve_options(&c, &state, &scope)
    }

    #[test]
    fn static_list_wins_over_values_key() {
        let r = resolve(
            json!({"id": "s", "type": "select", "values": [{"label": "A", "value": "a"}], "valuesKey": "opts"}),
            json!({"opts": [{"label": "B", "value": "b"}]}),
        );
        assert_eq!(r.source, OptionSource::Static);
        assert_eq!(r.items, vec![OptionItem::new("A", "a")]);
    }

    #[test]
    fn values_key_array_is_normalized() {
        let r = resolve(
            json!({"id": "s", "type": "select", "valuesKey": "unidades"}),
            json!({"unidades": ["T-1", {"label": "Tractor 2", "value": "T-2"}, {"value": "T-3"}]}),
        );
        assert_eq!(r.source, OptionSource::ValuesKey);
        assert_eq!(
            r.items,
            vec![
                OptionItem::new("T-1", "T-1"),
                OptionItem::new("Tractor 2", "T-2"),
                OptionItem::new(r#"{"value":"T-3"}"#, "T-3"),
            ]
        );
    }

    #[test]
    fn values_key_without_array_falls_through_to_expression() {
        let r = resolve(
            json!({"id": "s", "type": "radio", "valuesKey": "missing", "valuesExpression": "=[\"x\", \"y\"]"}),
            json!({}),
        );
        assert_eq!(r.source, OptionSource::Expression);
        assert_eq!(r.items, vec![OptionItem::new("x", "x"), OptionItem::new("y", "y")]);
    }

    #[test]
    fn expression_uses_variables() {
        let r = resolve(
            json!({"id": "s", "type": "select", "valuesExpression": "=rutas"}),
            json!({"rutas": [{"label": "MTY-CDMX", "value": "r1"}]}),
        );
        assert_eq!(r.items, vec![OptionItem::new("MTY-CDMX", "r1")]);
    }

    #[test]
    fn no_source_is_empty_not_error() {
        let r = resolve(json!({"id": "s", "type": "select"}), json!({}));
        assert_eq!(r.source, OptionSource::Empty);
        assert!(r.is_empty());
    }

    #[test]
    fn falsy_fields_fall_back() {
        assert_eq!(normalize_item(&json!(""), 3), OptionItem::new("", "option_3"));
        assert_eq!(normalize_item(&json!(7), 0), OptionItem::new("7", "7"));
        assert_eq!(
            normalize_item(&json!({"label": "", "value": 0}), 1),
            OptionItem::new(r#"{"label":"","value":0}"#, r#"{"label":"","value":0}"#)
        );
    }
}
