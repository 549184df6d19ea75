//! Restricted expression evaluation for computed fields.
//!
//! An expression is a template, optionally prefixed with `=`. Every known
//! variable name (whole word, dotted paths allowed) is replaced by its JSON
//! encoding; the result is then evaluated as one of:
//!
//! - an arithmetic expression (number literals, whitespace and `+-*/()`
//!   only), parsed by a small recursive-descent grammar into a number;
//! - a JSON array literal;
//! - anything else: the substituted text itself, unless it has the shape of
//!   code (`=>`, `;`, a backtick, or a name directly followed by `(`), in
//!   which case there is no value.
//!
//! Evaluation never fails to the caller: problems are logged and yield `None`.

use std::collections::BTreeMap;

use serde_json::{Number, Value};
use tracing::{debug, warn};

use crate::state::{FormState, FormValue, number_from_f64};
use crate::variables::flatten;

/// Maximum nesting of parentheses and unary signs.
const MAX_DEPTH: usize = 64;

/// Variable name to value, including dotted leaf paths.
pub type Scope = BTreeMap<String, Value>;

/// Result of a successful evaluation.
#[derive(Debug, Clone, PartialEq)]
pub enum Evaluated {
    Number(Number),
    Array(Vec<Value>),
    Text(String),
}

impl Evaluated {
    pub fn to_json(&self) -> Value {
        match self {
            Self::Number(n) => Value::Number(n.clone()),
            Self::Array(items) => Value::Array(items.clone()),
            Self::Text(s) => Value::String(s.clone()),
        }
    }

    pub fn to_form_value(&self) -> FormValue {
        FormValue::from_json(&self.to_json())
    }
}

/// Why an expression produced no value.
#[derive(Debug, thiserror::Error)]
pub enum ExprError {
    #[error("array literal does not parse: {0}")]
    Array(serde_json::Error),

    #[error("disallowed characters in expression")]
    Disallowed,

    #[error("unexpected character {found:?} at offset {pos}")]
    UnexpectedChar { found: char, pos: usize },

    #[error("unexpected end of expression")]
    UnexpectedEnd,

    #[error("invalid number literal {0:?}")]
    InvalidNumber(String),

    #[error("expression nests too deeply")]
    TooDeep,

    #[error("arithmetic result is not finite")]
    NonFinite,
}

/// Builds the evaluation scope: task variables overlaid by form state.
///
/// Both contribute their top-level keys and every dotted leaf path.
pub fn build_scope(state: &FormState, variables: &Value) -> Scope {
    let mut scope = Scope::new();
    add_tree(&mut scope, variables);
    add_tree(&mut scope, &state.to_json());
    scope
}

fn add_tree(scope: &mut Scope, tree: &Value) {
    if let Value::Object(map) = tree {
        for (key, value) in map {
            scope.insert(key.clone(), value.clone());
        }
    }
    scope.extend(flatten(tree));
}

/// Evaluates an expression against a scope.
pub fn evaluate(input: &str, scope: &Scope) -> Option<Evaluated> {
    let trimmed = input.trim();
    let body = trimmed.strip_prefix('=').unwrap_or(trimmed).trim();
    if body.is_empty() {
        return None;
    }
    let substituted = substitute(body, scope);
    match classify(&substituted) {
        Ok(value) => {
            debug!(expression = input, "expression evaluated");
            Some(value)
        }
        Err(e) => {
            warn!(expression = input, error = %e, "expression evaluation failed");
            None
        }
    }
}

fn classify(text: &str) -> Result<Evaluated, ExprError> {
    let text = text.trim();
    if text.starts_with('[') {
        let items: Vec<Value> = serde_json::from_str(text).map_err(ExprError::Array)?;
        return Ok(Evaluated::Array(items));
    }
    if is_arithmetic(text) {
        let n = eval_arithmetic(text)?;
        return number_from_f64(n)
            .map(Evaluated::Number)
            .ok_or(ExprError::NonFinite);
    }
    if contains_code(text) {
        return Err(ExprError::Disallowed);
    }
    Ok(Evaluated::Text(text.to_owned()))
}

// ---------------------------------------------------------------------------
// Substitution
// ---------------------------------------------------------------------------

fn is_ident_start(b: u8) -> bool {
    b.is_ascii_alphabetic() || b == b'_' || b == b'$'
}

fn is_ident_cont(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'_' || b == b'$' || b >= 0x80
}

/// Index just past a quoted literal starting at `start`.
fn skip_quoted(bytes: &[u8], start: usize) -> usize {
    let quote = bytes[start];
    let mut i = start + 1;
    while i < bytes.len() {
        match bytes[i] {
            b'\\' => i += 2,
            b if b == quote => return i + 1,
            _ => i += 1,
        }
    }
    bytes.len()
}

/// Replaces whole-word variable names with their JSON encoding.
///
/// A dotted name (`driver.age`) is matched longest-first against the scope.
/// Quoted literals are copied untouched.
pub fn substitute(text: &str, scope: &Scope) -> String {
    let bytes = text.as_bytes();
    let len = bytes.len();
    let mut out = String::with_capacity(len);
    let mut copied = 0;
    let mut i = 0;
    while i < len {
        let b = bytes[i];
        if b == b'"' || b == b'\'' {
            i = skip_quoted(bytes, i).min(len);
            continue;
        }
        let at_word_start = i == 0 || !(is_ident_cont(bytes[i - 1]) || bytes[i - 1] == b'.');
        if !(is_ident_start(b) && at_word_start) {
            i += 1;
            continue;
        }

        // Segment ends of the dotted token starting at i.
        let mut ends = Vec::new();
        let mut end = i;
        loop {
            end += 1;
            while end < len && is_ident_cont(bytes[end]) {
                end += 1;
            }
            ends.push(end);
            if end + 1 < len && bytes[end] == b'.' && is_ident_start(bytes[end + 1]) {
                end += 1;
            } else {
                break;
            }
        }

        let hit = ends
            .iter()
            .rev()
            .find_map(|&e| scope.get(&text[i..e]).map(|value| (e, value)));
        match hit {
            Some((e, value)) => {
                out.push_str(&text[copied..i]);
                out.push_str(&value.to_string());
                copied = e;
                i = e;
            }
            None => i = end,
        }
    }
    out.push_str(&text[copied..]);
    out
}

// ---------------------------------------------------------------------------
// Classification helpers
// ---------------------------------------------------------------------------

fn is_arithmetic(text: &str) -> bool {
    let bytes = text.as_bytes();
    bytes.iter().any(u8::is_ascii_digit)
        && bytes.iter().enumerate().all(|(i, &b)| {
            b.is_ascii_digit()
                || b.is_ascii_whitespace()
                || b"+-*/().".contains(&b)
                || (matches!(b, b'e' | b'E') && is_exponent_marker(bytes, i))
        })
}

/// Whether the `e` at `i` continues a number literal (`1e21`, `2.5E-7`).
fn is_exponent_marker(bytes: &[u8], i: usize) -> bool {
    let after_mantissa = i > 0 && (bytes[i - 1].is_ascii_digit() || bytes[i - 1] == b'.');
    let digits_at = |j: usize| bytes.get(j).is_some_and(u8::is_ascii_digit);
    let exponent = match bytes.get(i + 1) {
        Some(b'+' | b'-') => digits_at(i + 2),
        _ => digits_at(i + 1),
    };
    after_mantissa && exponent
}

/// Code shapes outside quoted literals: arrows, statement separators,
/// template strings and calls.
fn contains_code(text: &str) -> bool {
    let bytes = text.as_bytes();
    let mut i = 0;
    while i < bytes.len() {
        match bytes[i] {
            b'"' | b'\'' => i = skip_quoted(bytes, i),
            b';' | b'`' => return true,
            b'=' if bytes.get(i + 1) == Some(&b'>') => return true,
            b'(' if i > 0 && is_ident_cont(bytes[i - 1]) => return true,
            _ => i += 1,
        }
    }
    false
}

// ---------------------------------------------------------------------------
// Arithmetic
// ---------------------------------------------------------------------------

/// Evaluates `+ - * /` with parentheses and unary signs.
pub fn eval_arithmetic(text: &str) -> Result<f64, ExprError> {
    let mut parser = Arith {
        bytes: text.as_bytes(),
        pos: 0,
        depth: 0,
    };
    let value = parser.expr()?;
    parser.skip_ws();
    match parser.peek() {
        None => Ok(value),
        Some(b) => Err(ExprError::UnexpectedChar {
            found: char::from(b),
            pos: parser.pos,
        }),
    }
}

struct Arith<'a> {
    bytes: &'a [u8],
    pos: usize,
    depth: usize,
}

impl Arith<'_> {
    fn peek(&self) -> Option<u8> {
        self.bytes.get(self.pos).copied()
    }

    fn skip_ws(&mut self) {
        while self.peek().is_some_and(|b| b.is_ascii_whitespace()) {
            self.pos += 1;
        }
    }

    fn expr(&mut self) -> Result<f64, ExprError> {
        let mut acc = self.term()?;
        loop {
            self.skip_ws();
            match self.peek() {
                Some(b'+') => {
                    self.pos += 1;
                    acc += self.term()?;
                }
                Some(b'-') => {
                    self.pos += 1;
                    acc -= self.term()?;
                }
                _ => return Ok(acc),
            }
        }
    }

    fn term(&mut self) -> Result<f64, ExprError> {
        let mut acc = self.factor()?;
        loop {
            self.skip_ws();
            match self.peek() {
                Some(b'*') => {
                    self.pos += 1;
                    acc *= self.factor()?;
                }
                Some(b'/') => {
                    self.pos += 1;
                    acc /= self.factor()?;
                }
                _ => return Ok(acc),
            }
        }
    }

    fn factor(&mut self) -> Result<f64, ExprError> {
        self.skip_ws();
        match self.peek() {
            Some(b'+') => {
                self.pos += 1;
                self.nested(Self::factor)
            }
            Some(b'-') => {
                self.pos += 1;
                self.nested(Self::factor).map(|v| -v)
            }
            Some(b'(') => {
                self.pos += 1;
                let value = self.nested(Self::expr)?;
                self.skip_ws();
                match self.peek() {
                    Some(b')') => {
                        self.pos += 1;
                        Ok(value)
                    }
                    Some(b) => Err(ExprError::UnexpectedChar {
                        found: char::from(b),
                        pos: self.pos,
                    }),
                    None => Err(ExprError::UnexpectedEnd),
                }
            }
            Some(b) if b.is_ascii_digit() || b == b'.' => self.number(),
            Some(b) => Err(ExprError::UnexpectedChar {
                found: char::from(b),
                pos: self.pos,
            }),
            None => Err(ExprError::UnexpectedEnd),
        }
    }

    fn nested(&mut self, f: fn(&mut Self) -> Result<f64, ExprError>) -> Result<f64, ExprError> {
        if self.depth >= MAX_DEPTH {
            return Err(ExprError::TooDeep);
        }
        self.depth += 1;
        let result = f(self);
        self.depth -= 1;
        result
    }

    fn number(&mut self) -> Result<f64, ExprError> {
        let start = self.pos;
        while self.peek().is_some_and(|b| b.is_ascii_digit() || b == b'.') {
            self.pos += 1;
        }
        if matches!(self.peek(), Some(b'e' | b'E')) && is_exponent_marker(self.bytes, self.pos) {
            self.pos += 1;
            if matches!(self.peek(), Some(b'+' | b'-')) {
                self.pos += 1;
            }
            while self.peek().is_some_and(|b| b.is_ascii_digit()) {
                self.pos += 1;
            }
        }
        let literal = String::from_utf8_lossy(&self.bytes[start..self.pos]);
        literal
            .parse::<f64>()
            .map_err(|_| ExprError::InvalidNumber(literal.into_owned()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn make_scope(pairs: &[(&str, Value)]) -> Scope {
        pairs
            .iter()
            .map(|(k, v)| ((*k).to_owned(), v.clone()))
            .collect()
    }

    fn number(v: i64) -> Option<Evaluated> {
        Some(Evaluated::Number(Number::from(v)))
    }

    #[test]
    fn plain_arithmetic() {
        let empty = Scope::new();
        assert_eq!(evaluate("2 + 2", &empty), number(4));
        assert_eq!(evaluate("=2 * (3 + 4) - 1", &empty), number(13));
        assert_eq!(evaluate("10 / 4", &empty).map(|e| e.to_json()), Some(json!(2.5)));
        assert_eq!(evaluate("-3 + +5", &empty), number(2));
    }

    #[test]
    fn code_is_rejected_without_panicking() {
        let empty = Scope::new();
        assert_eq!(evaluate("() => fetch('x')", &empty), None);
        assert_eq!(evaluate("alert(1); 2", &empty), None);
        assert_eq!(evaluate("`x`", &empty), None);
        assert_eq!(evaluate("=x => x", &empty), None);
        assert_eq!(evaluate("=parseInt(\"4\")", &empty), None);
    }

    #[test]
    fn punctuated_templates_keep_their_text() {
        let scope = make_scope(&[("unidad", json!("T-12")), ("driver", json!({"name": "Juan"}))]);
        assert_eq!(
            evaluate("=Viaje (unidad)", &scope),
            Some(Evaluated::Text("Viaje (\"T-12\")".into()))
        );
        assert_eq!(
            evaluate("=driver", &scope),
            Some(Evaluated::Text("{\"name\":\"Juan\"}".into()))
        );
        assert_eq!(
            evaluate("=Caja 'B' = unidad", &scope),
            Some(Evaluated::Text("Caja 'B' = \"T-12\"".into()))
        );
    }

    #[test]
    fn exponent_literals_stay_arithmetic() {
        let scope = make_scope(&[("a", json!(1e21)), ("b", json!(1e-7))]);
        assert_eq!(evaluate("=a * 2", &scope).map(|e| e.to_json()), Some(json!(2e21)));
        assert_eq!(evaluate("=b * 2", &scope).map(|e| e.to_json()), Some(json!(2e-7)));
        assert_eq!(evaluate("2.5E+2 + 1", &Scope::new()), number(251));
        assert_eq!(
            evaluate("=e + 1", &Scope::new()),
            Some(Evaluated::Text("e + 1".into()))
        );
    }

    #[test]
    fn arithmetic_failures_are_no_value() {
        let empty = Scope::new();
        assert_eq!(evaluate("1 / 0", &empty), None);
        assert_eq!(evaluate("(1 + 2", &empty), None);
        assert_eq!(evaluate("1..2 + 3", &empty), None);
        assert_eq!(evaluate("2 3", &empty), None);
        assert_eq!(evaluate(&format!("{}1{}", "(".repeat(100), ")".repeat(100)), &empty), None);
    }

    #[test]
    fn substitutes_variables_before_arithmetic() {
        let scope = make_scope(&[("litros", json!(120)), ("precio", json!(22.5))]);
        assert_eq!(evaluate("=litros * precio", &scope), number(2700));
    }

    #[test]
    fn dotted_names_match_longest() {
        let scope = make_scope(&[
            ("driver", json!({"age": 30})),
            ("driver.age", json!(30)),
        ]);
        assert_eq!(evaluate("=driver.age + 1", &scope), number(31));
    }

    #[test]
    fn substitution_is_whole_word() {
        let scope = make_scope(&[("a", json!(1))]);
        assert_eq!(substitute("ab + a + ba", &scope), "ab + 1 + ba");
        assert_eq!(substitute("x.a + a", &scope), "x.a + 1");
        assert_eq!(substitute("\"a\" a", &scope), "\"a\" 1");
        assert_eq!(substitute("año a", &scope), "año 1");
    }

    #[test]
    fn array_literals() {
        let scope = make_scope(&[("rutas", json!([{"label": "A", "value": "a"}]))]);
        assert_eq!(
            evaluate("=rutas", &scope),
            Some(Evaluated::Array(vec![json!({"label": "A", "value": "a"})]))
        );
        assert_eq!(
            evaluate("[1, \"dos\"]", &Scope::new()),
            Some(Evaluated::Array(vec![json!(1), json!("dos")]))
        );
        assert_eq!(evaluate("[1, 2", &Scope::new()), None);
    }

    #[test]
    fn other_shapes_are_substituted_text() {
        let scope = make_scope(&[("unidad", json!("T-12"))]);
        assert_eq!(
            evaluate("=Unidad unidad lista", &scope),
            Some(Evaluated::Text("Unidad \"T-12\" lista".into()))
        );
        assert_eq!(evaluate("=", &scope), None);
    }

    #[test]
    fn scope_overlays_state_on_variables() {
        let state = FormState::from_json(&json!({"litros": 50}));
        let scope = build_scope(&state, &json!({"litros": 10, "trip": {"km": 300}}));
        assert_eq!(scope["litros"], json!(50));
        assert_eq!(scope["trip.km"], json!(300));
        assert_eq!(scope["trip"], json!({"km": 300}));
    }
}
