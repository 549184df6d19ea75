//! Task variable bags: flatten/nest and seeding normalization.
//!
//! `flatten` turns a nested object into `dotted.path -> leaf` entries (arrays
//! and empty objects are leaves); `nest` rebuilds the object. For trees whose
//! keys contain no `.`, `nest(flatten(x)) == x`.

use std::collections::BTreeMap;

use chrono::{DateTime, NaiveDate, NaiveDateTime, SecondsFormat, Utc};
use serde_json::{Map, Value};
use tracing::{debug, warn};

use crate::state::{FormState, FormValue, join_path};

/// Flattens a nested object into dotted-path entries.
///
/// A non-object root flattens to nothing.
pub fn flatten(value: &Value) -> BTreeMap<String, Value> {
    let mut out = BTreeMap::new();
    if let Value::Object(map) = value {
        flatten_into(map, "", &mut out);
    }
    out
}

fn flatten_into(map: &Map<String, Value>, prefix: &str, out: &mut BTreeMap<String, Value>) {
    for (key, value) in map {
        let path = join_path(prefix, key);
        match value {
            Value::Object(child) if !child.is_empty() => flatten_into(child, &path, out),
            leaf => {
                out.insert(path, leaf.clone());
            }
        }
    }
}

/// Rebuilds a nested object from dotted-path entries.
///
/// Entries are applied in key order; a later path through an existing leaf
/// replaces that leaf with an object.
pub fn nest(flat: &BTreeMap<String, Value>) -> Value {
    let mut root = Map::new();
    for (path, value) in flat {
        insert_path(&mut root, path, value.clone());
    }
    Value::Object(root)
}

/// Inserts `value` at a dotted path inside `map`, creating objects as needed.
///
/// When the target and the existing entry are both objects they are merged.
pub fn insert_path(map: &mut Map<String, Value>, path: &str, value: Value) {
    let (parents, leaf) = match path.rsplit_once('.') {
        Some((parents, leaf)) => (Some(parents), leaf),
        None => (None, path),
    };
    let mut node = map;
    for seg in parents.into_iter().flat_map(|p| p.split('.')) {
        let slot = node
            .entry(seg.to_owned())
            .or_insert_with(|| Value::Object(Map::new()));
        if !slot.is_object() {
            *slot = Value::Object(Map::new());
        }
        node = match slot {
            Value::Object(child) => child,
            _ => return,
        };
    }
    merge_entry(node, leaf, value);
}

fn merge_entry(map: &mut Map<String, Value>, key: &str, value: Value) {
    if let Value::Object(incoming) = value {
        if let Some(Value::Object(existing)) = map.get_mut(key) {
            for (k, v) in incoming {
                merge_entry(existing, &k, v);
            }
            return;
        }
        map.insert(key.to_owned(), Value::Object(incoming));
        return;
    }
    map.insert(key.to_owned(), value);
}

// ---------------------------------------------------------------------------
// Seeding
// ---------------------------------------------------------------------------

/// Normalizes a task variable bag before it seeds a form.
///
/// Top-level strings that start with `[` or `{` and parse as JSON are
/// replaced by the parsed value. Top-level strings that look like dates are
/// rewritten as ISO-8601 UTC with millisecond precision. Anything that fails
/// to parse is kept as is.
pub fn seed_variables(variables: &Value) -> Value {
    let Value::Object(map) = variables else {
        return variables.clone();
    };
    let seeded = map
        .iter()
        .map(|(key, value)| (key.clone(), seed_entry(key, value)))
        .collect();
    Value::Object(seeded)
}

fn seed_entry(key: &str, value: &Value) -> Value {
    let Value::String(s) = value else {
        return value.clone();
    };
    if s.starts_with('[') || s.starts_with('{') {
        return match serde_json::from_str::<Value>(s) {
            Ok(parsed) => {
                debug!(key, "parsed JSON-encoded variable");
                parsed
            }
            Err(e) => {
                warn!(key, error = %e, "variable looks like JSON but does not parse");
                value.clone()
            }
        };
    }
    if looks_like_date(s) {
        if let Some(iso) = normalize_date(s) {
            return Value::String(iso);
        }
        debug!(key, value = %s, "date-like variable kept verbatim");
    }
    value.clone()
}

/// Builds the initial form state from a task variable bag.
pub fn state_from_variables(variables: &Value) -> FormState {
    let seeded = seed_variables(variables);
    FormState::from_flat(
        flatten(&seeded)
            .into_iter()
            .map(|(path, value)| (path, FormValue::from_json(&value))),
    )
}

// ---------------------------------------------------------------------------
// Dates
// ---------------------------------------------------------------------------

/// Locale-style format produced by the engine, e.g. `Sep 4, 2025, 2:18:51 AM`.
const LOCALE_DATETIME: &str = "%b %d, %Y, %I:%M:%S %p";

/// Cheap shape test for the date formats seeding recognises.
pub fn looks_like_date(s: &str) -> bool {
    let b = s.as_bytes();
    let digits = |range: std::ops::Range<usize>| {
        range.clone().all(|i| b.get(i).is_some_and(u8::is_ascii_digit))
    };
    // 2025-09-04T02:18:51...
    let iso = digits(0..4)
        && b.get(4) == Some(&b'-')
        && digits(5..7)
        && b.get(7) == Some(&b'-')
        && digits(8..10)
        && b.get(10) == Some(&b'T')
        && digits(11..13)
        && b.get(13) == Some(&b':')
        && digits(14..16)
        && b.get(16) == Some(&b':')
        && digits(17..19);
    // 9/4/2025 or 09/04/2025
    let slashed = {
        let mut parts = s.splitn(3, '/');
        let m = parts.next().unwrap_or_default();
        let d = parts.next().unwrap_or_default();
        let y = parts.next().unwrap_or_default();
        (1..=2).contains(&m.len())
            && m.bytes().all(|c| c.is_ascii_digit())
            && (1..=2).contains(&d.len())
            && d.bytes().all(|c| c.is_ascii_digit())
            && y.len() >= 4
            && y.bytes().take(4).all(|c| c.is_ascii_digit())
    };
    // Sep 4, 2025, 2:18:51 AM
    let locale = b.len() > 4
        && b[..3].iter().all(u8::is_ascii_alphabetic)
        && b[3].is_ascii_whitespace()
        && (s.ends_with("AM") || s.ends_with("PM") || s.ends_with("am") || s.ends_with("pm"));
    iso || slashed || locale
}

/// Parses a date string in any recognised format and renders it as
/// ISO-8601 UTC with millisecond precision. Zone-less inputs are read as UTC.
pub fn normalize_date(s: &str) -> Option<String> {
    parse_any_date(s).map(format_iso_millis)
}

/// Formats as `2025-09-04T02:18:51.000Z`.
pub fn format_iso_millis(dt: DateTime<Utc>) -> String {
    dt.to_rfc3339_opts(SecondsFormat::Millis, true)
}

fn parse_any_date(s: &str) -> Option<DateTime<Utc>> {
    // Locale output may separate the time and meridiem with narrow spaces.
    let cleaned: String = s
        .trim()
        .chars()
        .map(|c| if c == '\u{202f}' || c == '\u{a0}' { ' ' } else { c })
        .collect();
    if let Some(dt) = parse_iso_instant(&cleaned) {
        return Some(dt);
    }
    for fmt in [
        LOCALE_DATETIME,
        "%m/%d/%Y, %I:%M:%S %p",
        "%m/%d/%Y %H:%M:%S",
        "%Y-%m-%dT%H:%M:%S%.f%z",
    ] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(&cleaned, fmt) {
            return Some(naive.and_utc());
        }
        if let Ok(dt) = DateTime::parse_from_str(&cleaned, fmt) {
            return Some(dt.with_timezone(&Utc));
        }
    }
    NaiveDate::parse_from_str(&cleaned, "%m/%d/%Y")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}

/// Parses an ISO date-time: `YYYY-MM-DDTHH:MM`, optional `:SS`, optional
/// fraction, optional `Z` or `±HH:MM` offset. Zone-less values are UTC.
pub fn parse_iso_instant(s: &str) -> Option<DateTime<Utc>> {
    if s.as_bytes().get(10) != Some(&b'T') {
        return None;
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }
    if let Ok(dt) = DateTime::parse_from_str(s, "%Y-%m-%dT%H:%M%:z") {
        return Some(dt.with_timezone(&Utc));
    }
    if let Some(stripped) = s.strip_suffix(['Z', 'z']) {
        return parse_naive_iso(stripped);
    }
    parse_naive_iso(s)
}

fn parse_naive_iso(s: &str) -> Option<DateTime<Utc>> {
    ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%dT%H:%M"]
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(s, fmt).ok())
        .map(|naive| naive.and_utc())
}
