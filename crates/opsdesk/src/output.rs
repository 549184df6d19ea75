//! Output formatting helpers for the `opsdesk` CLI.

use std::io::{self, Write};

use chrono::{DateTime, Utc};
use serde::Serialize;

use opsdesk_core::route::Route;
use opsdesk_core::task::Task;
use opsdesk_ui::styles::{render_muted, render_task_line};

/// Print a value as pretty-printed JSON to stdout.
///
/// Terminates the process with exit code 1 if serialization fails.
pub fn output_json<T: Serialize>(value: &T) {
    match serde_json::to_string_pretty(value) {
        Ok(json) => {
            let stdout = io::stdout();
            let mut handle = stdout.lock();
            // Ignore broken pipe errors (e.g., piped to `head`)
            let _ = writeln!(handle, "{}", json);
        }
        Err(e) => {
            eprintln!("Error: failed to serialize JSON: {}", e);
            std::process::exit(1);
        }
    }
}

/// Print a simple table with headers and rows, columns padded to fit.
pub fn output_table(headers: &[&str], rows: &[Vec<String>]) {
    if rows.is_empty() {
        return;
    }
    let stdout = io::stdout();
    let mut handle = stdout.lock();
    let _ = write!(handle, "{}", format_table(headers, rows));
}

fn format_table(headers: &[&str], rows: &[Vec<String>]) -> String {
    let mut widths: Vec<usize> = headers.iter().map(|h| h.chars().count()).collect();
    for row in rows {
        for (width, cell) in widths.iter_mut().zip(row) {
            *width = (*width).max(cell.chars().count());
        }
    }

    let line = |cells: Vec<String>| {
        let padded: Vec<String> = cells
            .iter()
            .enumerate()
            .map(|(i, cell)| match widths.get(i) {
                Some(width) => format!("{cell:<width$}"),
                None => cell.clone(),
            })
            .collect();
        format!("{}\n", padded.join("  ").trim_end())
    };

    let mut out = line(headers.iter().map(|h| h.to_string()).collect());
    out.push_str(&line(widths.iter().map(|w| "-".repeat(*w)).collect()));
    for row in rows {
        out.push_str(&line(row.clone()));
    }
    out
}

pub fn format_task_compact(task: &Task) -> String {
    render_task_line(task)
}

/// Multi-line task detail.
pub fn format_task_detail(task: &Task) -> String {
    let mut lines = vec![render_task_line(task)];
    let mut field = |name: &str, value: &str| {
        lines.push(format!("  {} {}", render_muted(&format!("{name}:")), value));
    };
    field("Status", if task.is_completed { "completed" } else { "pending" });
    if task.permanent {
        field("Permanent", "yes");
    }
    if let Some(external_id) = &task.external_id {
        field("Engine task", external_id);
    }
    if !task.task_definition_key.is_empty() {
        field("Definition", &task.task_definition_key);
    }
    if let Some(form_key) = &task.form_key {
        field("Form key", form_key);
    }
    if let Some(process) = &task.process_instance_id {
        field("Process", process);
    }
    if let Some(business_key) = &task.business_key {
        field("Business key", business_key);
    }
    field("Priority", &task.priority.to_string());
    field("Created", &task.created_at.format("%Y-%m-%d %H:%M").to_string());
    if !task.variables.is_empty() {
        let vars = serde_json::to_string_pretty(&task.variables).unwrap_or_default();
        lines.push(format!("  {}", render_muted("Variables:")));
        for line in vars.lines() {
            lines.push(format!("    {line}"));
        }
    }
    lines.join("\n")
}

pub fn route_row(route: &Route) -> Vec<String> {
    let time = |ms: Option<i64>| {
        ms.and_then(DateTime::<Utc>::from_timestamp_millis)
            .map(|dt| dt.format("%Y-%m-%d %H:%M").to_string())
            .unwrap_or_else(|| "-".to_string())
    };
    vec![
        route.id.map(|id| id.to_string()).unwrap_or_default(),
        route.operador.clone(),
        route.caja.clone().unwrap_or_default(),
        format!("{} -> {}", route.origen, route.destino),
        time(Some(route.inicio)),
        time(route.fin),
    ]
}

pub const ROUTE_HEADERS: &[&str] = &["ID", "OPERADOR", "CAJA", "RUTA", "INICIO", "FIN"];
