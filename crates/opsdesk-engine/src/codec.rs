//! Typed-variable wire codec of the workflow engine.
//!
//! The engine expects every process variable wrapped as `{"value": ..}`,
//! with a `type` tag where the raw JSON value would be ambiguous.

use chrono::{DateTime, Utc};
use serde_json::{Map, Value, json};

use opsdesk_forms::variables::parse_iso_instant;

/// Wraps every top-level entry of a serialized variable bag.
///
/// - ISO-8601 date-times become `{"value": "yyyy-MM-ddTHH:mm:ss.SSS+0000", "type": "Date"}`;
/// - objects and arrays become `{"value": "<json text>", "type": "Json"}`;
/// - anything else is sent as `{"value": v}`.
pub fn encode_variables(variables: &Map<String, Value>) -> Map<String, Value> {
    variables
        .iter()
        .map(|(k, v)| (k.clone(), encode_value(v)))
        .collect()
}

fn encode_value(value: &Value) -> Value {
    match value {
        Value::String(s) => match engine_date(s) {
            Some(dt) => json!({"value": format_engine_date(dt), "type": "Date"}),
            None => json!({"value": s}),
        },
        Value::Object(_) | Value::Array(_) => json!({"value": value.to_string(), "type": "Json"}),
        other => json!({"value": other}),
    }
}

/// Request body of a task completion.
pub fn completion_body(variables: &Map<String, Value>) -> Value {
    json!({
        "variables": encode_variables(variables),
        "withVariablesInReturn": true,
    })
}

/// Date format understood by the engine's `Date` type.
pub fn format_engine_date(dt: DateTime<Utc>) -> String {
    dt.format("%Y-%m-%dT%H:%M:%S%.3f+0000").to_string()
}

/// Parses `s` when it has the shape
/// `YYYY-MM-DDTHH:MM[:SS][.mmm][Z|+HH:MM|-HH:MM]`.
fn engine_date(s: &str) -> Option<DateTime<Utc>> {
    if !has_engine_date_shape(s.as_bytes()) {
        return None;
    }
    parse_iso_instant(s)
}

fn has_engine_date_shape(b: &[u8]) -> bool {
    fn digits(b: &[u8], range: std::ops::Range<usize>) -> bool {
        b.get(range).is_some_and(|s| s.iter().all(u8::is_ascii_digit))
    }

    if !(digits(b, 0..4)
        && b.get(4) == Some(&b'-')
        && digits(b, 5..7)
        && b.get(7) == Some(&b'-')
        && digits(b, 8..10)
        && b.get(10) == Some(&b'T')
        && digits(b, 11..13)
        && b.get(13) == Some(&b':')
        && digits(b, 14..16))
    {
        return false;
    }
    let mut rest = &b[16..];
    if rest.first() == Some(&b':') {
        if !digits(rest, 1..3) {
            return false;
        }
        rest = &rest[3..];
    }
    if rest.first() == Some(&b'.') {
        if !digits(rest, 1..4) {
            return false;
        }
        rest = &rest[4..];
    }
    match rest {
        [] | [b'Z'] => true,
        [sign, offset @ ..] if matches!(*sign, b'+' | b'-') => {
            offset.len() == 5 && offset[2] == b':' && digits(offset, 0..2) && digits(offset, 3..5)
        }
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn bag(value: Value) -> Map<String, Value> {
        value.as_object().unwrap().clone()
    }

    #[test]
    fn wraps_each_kind_of_value() {
        let encoded = encode_variables(&bag(json!({
            "placa": "ABC123",
            "litros": 120.5,
            "listo": true,
            "nada": null,
            "salida": "2025-09-04T02:18:51.000Z",
            "driver": {"name": "Juan"},
            "fotos": ["st-1", "st-2"]
        })));
        assert_eq!(
            Value::Object(encoded),
            json!({
                "placa": {"value": "ABC123"},
                "litros": {"value": 120.5},
                "listo": {"value": true},
                "nada": {"value": null},
                "salida": {"value": "2025-09-04T02:18:51.000+0000", "type": "Date"},
                "driver": {"value": "{\"name\":\"Juan\"}", "type": "Json"},
                "fotos": {"value": "[\"st-1\",\"st-2\"]", "type": "Json"}
            })
        );
    }

    #[test]
    fn offsets_are_normalized_to_utc() {
        let encoded = encode_variables(&bag(json!({"d": "2025-09-04T08:30-06:00"})));
        assert_eq!(encoded["d"]["value"], json!("2025-09-04T14:30:00.000+0000"));
    }

    #[test]
    fn near_dates_stay_strings() {
        for s in ["2025-09-04", "2025-09-04 10:00", "2025-09-04T10:00:00.123456Z", "ayer"] {
            let encoded = encode_variables(&bag(json!({ "d": s })));
            assert_eq!(encoded["d"], json!({ "value": s }), "{s}");
        }
    }

    #[test]
    fn completion_requests_variables_back() {
        let body = completion_body(&bag(json!({"ok": true})));
        assert_eq!(
            body,
            json!({"variables": {"ok": {"value": true}}, "withVariablesInReturn": true})
        );
    }
}
