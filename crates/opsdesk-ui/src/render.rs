//! Text rendering of a form view for the terminal.
//!
//! One line per field, indented two spaces per nesting level. Choice
//! options and attached files follow on their own lines under the field.

use std::fmt::Write;

use opsdesk_forms::view::{
    FieldView, InputKind, NO_OPTIONS_TEXT, OptionsView, UNSUPPORTED_TEXT, ViewKind,
};
use serde_json::Value;

use crate::styles::{ACCENT, FAIL, ICON_WARN, MUTED, WARN, paint, paint_bold};
use crate::terminal::supports_color;

/// Renders form views. With `color` off the output is plain text.
#[derive(Debug, Clone, Copy)]
pub struct Renderer {
    color: bool,
}

impl Default for Renderer {
    fn default() -> Self {
        Self::new()
    }
}

impl Renderer {
    /// A renderer that colors output when the terminal supports it.
    pub fn new() -> Self {
        Self {
            color: supports_color(),
        }
    }

    pub fn plain() -> Self {
        Self { color: false }
    }

    pub fn with_color(color: bool) -> Self {
        Self { color }
    }

    pub fn render_view(&self, rows: &[FieldView]) -> String {
        let mut out = String::new();
        for row in rows {
            self.render_row(&mut out, row);
        }
        out
    }

    fn render_row(&self, out: &mut String, row: &FieldView) {
        let indent = "  ".repeat(row.depth);
        let label = row.label.as_deref().unwrap_or(&row.id);
        let path = row
            .path
            .as_deref()
            .map(|p| format!(" {}", paint(&format!("[{p}]"), MUTED, self.color)))
            .unwrap_or_default();

        match &row.kind {
            ViewKind::Text { text } => {
                let _ = writeln!(out, "{indent}{text}");
            }
            ViewKind::Group { outlined } => {
                let header = paint_bold(label, ACCENT, self.color);
                if *outlined {
                    let _ = writeln!(out, "{indent}\u{250C} {header}{path}");
                } else {
                    let _ = writeln!(out, "{indent}{header}{path}");
                }
            }
            ViewKind::Input {
                input,
                value,
                required,
                disabled,
                readonly,
                prefix,
                suffix,
            } => {
                let shown = match value {
                    Some(v) => format!(
                        "{}{}{}",
                        prefix.as_deref().unwrap_or_default(),
                        display_value(v, input),
                        suffix.as_deref().unwrap_or_default()
                    ),
                    None => paint("-", MUTED, self.color),
                };
                let mut flags = Vec::new();
                if *disabled {
                    flags.push("disabled");
                }
                if *readonly {
                    flags.push("read-only");
                }
                let flags = if flags.is_empty() {
                    String::new()
                } else {
                    format!(" {}", paint(&format!("({})", flags.join(", ")), MUTED, self.color))
                };
                let _ = writeln!(
                    out,
                    "{indent}{label}{}{path}: {shown}{}{flags}",
                    self.required_marker(*required),
                    bounds(input)
                );
            }
            ViewKind::Choice {
                multiple,
                required,
                options,
                selected,
                ..
            } => {
                let _ = writeln!(out, "{indent}{label}{}{path}:", self.required_marker(*required));
                match options {
                    OptionsView::NoneAvailable => {
                        let _ = writeln!(
                            out,
                            "{indent}  {}",
                            paint(NO_OPTIONS_TEXT, MUTED, self.color)
                        );
                    }
                    OptionsView::Available(items) => {
                        for item in items {
                            let on = is_selected(selected.as_ref(), &item.value);
                            let mark = match (*multiple, on) {
                                (true, true) => "[x]",
                                (true, false) => "[ ]",
                                (false, true) => "(\u{2022})",
                                (false, false) => "( )",
                            };
                            let _ = writeln!(out, "{indent}  {mark} {}", item.label);
                        }
                    }
                }
            }
            ViewKind::FilePicker { multiple, accept, files } => {
                let accept = accept
                    .as_deref()
                    .map(|a| format!(" {}", paint(&format!("<{a}>"), MUTED, self.color)))
                    .unwrap_or_default();
                let many = if *multiple { " (multiple)" } else { "" };
                let _ = writeln!(out, "{indent}{label}{path}{many}{accept}:");
                if files.is_empty() {
                    let _ = writeln!(out, "{indent}  {}", paint("(no files)", MUTED, self.color));
                }
                for file in files {
                    let _ = writeln!(out, "{indent}  - {file}");
                }
            }
            ViewKind::Computed { value } => {
                let shown = value
                    .as_ref()
                    .map(|v| display_value(v, &InputKind::Textfield))
                    .unwrap_or_else(|| "-".to_owned());
                let line = format!("= {label}{path}: {shown}");
                let _ = writeln!(out, "{indent}{}", paint(&line, MUTED, self.color));
            }
            ViewKind::Unsupported { type_tag } => {
                let line = format!("{ICON_WARN} {UNSUPPORTED_TEXT} ({type_tag})");
                let _ = writeln!(out, "{indent}{}", paint(&line, WARN, self.color));
            }
        }

        if let Some(description) = row.description.as_deref().filter(|d| !d.is_empty()) {
            let _ = writeln!(out, "{indent}  {}", paint(description, MUTED, self.color));
        }
    }

    fn required_marker(&self, required: bool) -> String {
        if required {
            format!(" {}", paint("*", FAIL, self.color))
        } else {
            String::new()
        }
    }
}

fn display_value(value: &Value, input: &InputKind) -> String {
    match (value, input) {
        (Value::Bool(b), InputKind::Checkbox) => (if *b { "[x]" } else { "[ ]" }).to_owned(),
        (Value::Number(n), InputKind::Number { decimals: Some(d), .. }) => match n.as_f64() {
            Some(f) => format!("{f:.prec$}", prec = *d as usize),
            None => n.to_string(),
        },
        (Value::String(s), _) => s.clone(),
        (other, _) => other.to_string(),
    }
}

fn bounds(input: &InputKind) -> String {
    let InputKind::Number { min, max, .. } = input else {
        return String::new();
    };
    match (min, max) {
        (Some(lo), Some(hi)) => format!(" ({lo}..{hi})"),
        (Some(lo), None) => format!(" (>= {lo})"),
        (None, Some(hi)) => format!(" (<= {hi})"),
        (None, None) => String::new(),
    }
}

fn is_selected(selected: Option<&Value>, option: &Value) -> bool {
    match selected {
        Some(Value::Array(values)) => values.contains(option),
        Some(value) => value == option,
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use opsdesk_forms::FormSession;
    use opsdesk_forms::parser::parse_json;
    use opsdesk_forms::view::build_view;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn render(schema: &str, vars: Value) -> String {
        let session = FormSession::new(parse_json(schema).unwrap(), &vars);
        Renderer::plain().render_view(&build_view(&session))
    }

    #[test]
    fn nested_group_with_inputs() {
        let out = render(
            r#"{"components": [{
                "id": "g", "type": "group", "label": "Chofer", "path": "driver",
                "components": [
                    {"id": "n", "type": "textfield", "key": "name", "label": "Nombre", "validate": {"required": true}},
                    {"id": "l", "type": "number", "key": "litros", "label": "Litros", "validate": {"min": 1, "max": 400},
                     "appearance": {"suffixAdorner": " L"}}
                ]
            }]}"#,
            json!({"driver": {"name": "Juan", "litros": 120}}),
        );
        assert_eq!(
            out,
            "Chofer\n  Nombre * [driver.name]: Juan\n  Litros [driver.litros]: 120 L (1..400)\n"
        );
    }

    #[test]
    fn choice_marks_selection() {
        let out = render(
            r#"{"components": [
                {"id": "r", "type": "radio", "key": "turno", "label": "Turno",
                 "values": [{"label": "Día", "value": "d"}, {"label": "Noche", "value": "n"}]},
                {"id": "c", "type": "checklist", "key": "docs", "label": "Docs",
                 "values": [{"label": "Carta porte", "value": "cp"}, {"label": "Factura", "value": "f"}]},
                {"id": "s", "type": "select", "key": "caja", "label": "Caja"}
            ]}"#,
            json!({"turno": "n", "docs": ["f"]}),
        );
        assert_eq!(
            out,
            "Turno [turno]:\n  ( ) Día\n  (\u{2022}) Noche\nDocs [docs]:\n  [ ] Carta porte\n  [x] Factura\nCaja [caja]:\n  No hay opciones disponibles\n"
        );
    }

    #[test]
    fn unsupported_and_computed_rows() {
        let out = render(
            r#"{"components": [
                {"id": "x", "type": "signature"},
                {"id": "e", "type": "expression", "key": "doble", "label": "Doble", "expression": "=n * 2"},
                {"id": "f", "type": "filepicker", "key": "fotos", "label": "Fotos", "multiple": true}
            ]}"#,
            json!({"n": 3}),
        );
        assert_eq!(
            out,
            "\u{26A0} Tipo de campo no soportado (signature)\n= Doble [doble]: 6\nFotos [fotos] (multiple):\n  (no files)\n"
        );
    }

    #[test]
    fn color_output_carries_escape_codes() {
        let session = FormSession::new(
            parse_json(r#"{"components": [{"id": "a", "type": "textfield", "key": "a", "validate": {"required": true}}]}"#)
                .unwrap(),
            &json!({}),
        );
        let out = Renderer::with_color(true).render_view(&build_view(&session));
        assert!(out.contains("\u{1b}["));
    }
}
