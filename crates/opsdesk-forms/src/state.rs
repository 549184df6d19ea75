//! Path-addressed form state with structural sharing.
//!
//! [`FormState`] is a persistent tree: [`FormState::set`] returns a new state
//! that shares every untouched branch with the old one. Values are addressed
//! by dotted paths (`driver.name`); [`FormState::flatten`] and
//! [`FormState::from_flat`] bridge the flat and nested views of the same data.

use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

use serde_json::{Map, Number, Value};
use tracing::debug;

/// Children of an object node.
pub type Branch = Arc<BTreeMap<String, FormValue>>;

/// A file chosen locally and not yet uploaded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalFile {
    pub path: PathBuf,
    /// File name as shown to the operator.
    pub name: String,
    /// Declared content type; guessed from the extension when `None`.
    pub content_type: Option<String>,
}

impl LocalFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        Self {
            path,
            name,
            content_type: None,
        }
    }

    pub fn with_content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = Some(content_type.into());
        self
    }
}

/// Opaque identifier returned by the blob store for a stored attachment.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct StorageId(pub String);

impl StorageId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for StorageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A value held in the form state.
///
/// Pending local files and already stored attachments are distinct cases.
#[derive(Debug, Clone, PartialEq)]
pub enum FormValue {
    Null,
    Bool(bool),
    Number(Number),
    Text(String),
    List(Vec<FormValue>),
    Object(Branch),
    File(LocalFile),
    Files(Vec<LocalFile>),
    Stored(StorageId),
    StoredList(Vec<StorageId>),
}

impl FormValue {
    /// Converts a JSON value; objects become nested branches.
    pub fn from_json(value: &Value) -> Self {
        match value {
            Value::Null => Self::Null,
            Value::Bool(b) => Self::Bool(*b),
            Value::Number(n) => Self::Number(n.clone()),
            Value::String(s) => Self::Text(s.clone()),
            Value::Array(items) => Self::List(items.iter().map(Self::from_json).collect()),
            Value::Object(map) => Self::Object(Arc::new(
                map.iter()
                    .map(|(k, v)| (k.clone(), Self::from_json(v)))
                    .collect(),
            )),
        }
    }

    /// Converts to JSON. Files render as their names, stored attachments as
    /// their identifiers.
    pub fn to_json(&self) -> Value {
        match self {
            Self::Null => Value::Null,
            Self::Bool(b) => Value::Bool(*b),
            Self::Number(n) => Value::Number(n.clone()),
            Self::Text(s) => Value::String(s.clone()),
            Self::List(items) => Value::Array(items.iter().map(Self::to_json).collect()),
            Self::Object(map) => Value::Object(
                map.iter()
                    .map(|(k, v)| (k.clone(), v.to_json()))
                    .collect::<Map<_, _>>(),
            ),
            Self::File(f) => Value::String(f.name.clone()),
            Self::Files(fs) => {
                Value::Array(fs.iter().map(|f| Value::String(f.name.clone())).collect())
            }
            Self::Stored(id) => Value::String(id.0.clone()),
            Self::StoredList(ids) => {
                Value::Array(ids.iter().map(|id| Value::String(id.0.clone())).collect())
            }
        }
    }

    /// Numeric value built from an `f64`, kept integral when it is one.
    pub fn number(f: f64) -> Option<Self> {
        number_from_f64(f).map(Self::Number)
    }

    pub fn text(s: impl Into<String>) -> Self {
        Self::Text(s.into())
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Number(n) => n.as_f64(),
            Self::Text(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Returns `true` if the value holds no operator input.
    pub fn is_empty(&self) -> bool {
        match self {
            Self::Null => true,
            Self::Text(s) => s.trim().is_empty(),
            Self::List(items) => items.is_empty(),
            Self::Files(files) => files.is_empty(),
            Self::StoredList(ids) => ids.is_empty(),
            Self::Object(map) => map.is_empty(),
            Self::Bool(_) | Self::Number(_) | Self::File(_) | Self::Stored(_) => false,
        }
    }

    pub fn is_object(&self) -> bool {
        matches!(self, Self::Object(_))
    }
}

/// JSON number from an `f64`: integral values become integers.
pub fn number_from_f64(f: f64) -> Option<Number> {
    if !f.is_finite() {
        return None;
    }
    // Below 2^53 every integral f64 is exact as an i64.
    if f.fract() == 0.0 && f.abs() < 9_007_199_254_740_992.0 {
        return Some(Number::from(f as i64));
    }
    Number::from_f64(f)
}

/// Result of a path lookup.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Lookup<'a> {
    /// Nothing is stored at the path.
    Absent,
    /// A value, possibly `Null`, is stored at the path.
    Present(&'a FormValue),
}

impl<'a> Lookup<'a> {
    pub fn is_absent(&self) -> bool {
        matches!(self, Self::Absent)
    }

    pub fn value(self) -> Option<&'a FormValue> {
        match self {
            Self::Absent => None,
            Self::Present(v) => Some(v),
        }
    }
}

/// Splits a dotted path; `None` if any segment is empty.
fn segments(path: &str) -> Option<Vec<&str>> {
    let segs: Vec<&str> = path.split('.').collect();
    if segs.iter().any(|s| s.is_empty()) {
        None
    } else {
        Some(segs)
    }
}

/// Joins a group path and a key the way bindings are addressed.
pub fn join_path(prefix: &str, key: &str) -> String {
    if prefix.is_empty() {
        key.to_owned()
    } else {
        format!("{prefix}.{key}")
    }
}

/// Immutable-per-update form state.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct FormState {
    root: Branch,
}

impl FormState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a state from a JSON object; other values give an empty state.
    pub fn from_json(value: &Value) -> Self {
        match FormValue::from_json(value) {
            FormValue::Object(root) => Self { root },
            _ => Self::default(),
        }
    }

    /// Builds a state from flat `path -> value` entries.
    pub fn from_flat<I, K>(entries: I) -> Self
    where
        I: IntoIterator<Item = (K, FormValue)>,
        K: AsRef<str>,
    {
        entries
            .into_iter()
            .fold(Self::new(), |state, (path, value)| state.set(path.as_ref(), value))
    }

    /// The root branch.
    pub fn root(&self) -> &Branch {
        &self.root
    }

    pub fn is_empty(&self) -> bool {
        self.root.is_empty()
    }

    /// Reads the value at a dotted path.
    pub fn get(&self, path: &str) -> Lookup<'_> {
        let Some(segs) = segments(path) else {
            return Lookup::Absent;
        };
        let mut node = &self.root;
        let (last, parents) = match segs.split_last() {
            Some(split) => split,
            None => return Lookup::Absent,
        };
        for seg in parents {
            match node.get(*seg) {
                Some(FormValue::Object(child)) => node = child,
                _ => return Lookup::Absent,
            }
        }
        match node.get(*last) {
            Some(v) => Lookup::Present(v),
            None => Lookup::Absent,
        }
    }

    /// Returns a new state with `value` stored at `path`.
    ///
    /// Missing intermediate segments become objects; a non-object value at an
    /// intermediate segment is overwritten by an object. Untouched branches are
    /// shared with `self`.
    pub fn set(&self, path: &str, value: FormValue) -> Self {
        match segments(path) {
            Some(segs) => Self {
                root: set_in(&self.root, &segs, value),
            },
            None => {
                debug!(path, "ignoring set on malformed path");
                self.clone()
            }
        }
    }

    /// Returns a new state without the value at `path`.
    pub fn remove(&self, path: &str) -> Self {
        match segments(path) {
            Some(segs) if !self.get(path).is_absent() => Self {
                root: remove_in(&self.root, &segs),
            },
            _ => self.clone(),
        }
    }

    /// Flat view: every leaf keyed by its dotted path. Empty objects are leaves.
    pub fn flatten(&self) -> BTreeMap<String, FormValue> {
        let mut out = BTreeMap::new();
        flatten_into(&self.root, "", &mut out);
        out
    }

    /// Nested JSON view of the whole state.
    pub fn to_json(&self) -> Value {
        FormValue::Object(self.root.clone()).to_json()
    }
}

fn set_in(node: &Branch, segs: &[&str], value: FormValue) -> Branch {
    let mut next = BTreeMap::clone(node);
    match segs {
        [] => {}
        [leaf] => {
            next.insert((*leaf).to_owned(), value);
        }
        [head, rest @ ..] => {
            let child = match node.get(*head) {
                Some(FormValue::Object(child)) => child.clone(),
                _ => Branch::default(),
            };
            next.insert((*head).to_owned(), FormValue::Object(set_in(&child, rest, value)));
        }
    }
    Arc::new(next)
}

fn remove_in(node: &Branch, segs: &[&str]) -> Branch {
    let mut next = BTreeMap::clone(node);
    match segs {
        [] => {}
        [leaf] => {
            next.remove(*leaf);
        }
        [head, rest @ ..] => {
            if let Some(FormValue::Object(child)) = node.get(*head) {
                next.insert((*head).to_owned(), FormValue::Object(remove_in(child, rest)));
            }
        }
    }
    Arc::new(next)
}

fn flatten_into(node: &Branch, prefix: &str, out: &mut BTreeMap<String, FormValue>) {
    for (key, value) in node.iter() {
        let path = join_path(prefix, key);
        match value {
            FormValue::Object(child) if !child.is_empty() => flatten_into(child, &path, out),
            other => {
                out.insert(path, other.clone());
            }
        }
    }
}
