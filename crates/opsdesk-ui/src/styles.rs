//! Ayu color theme and styling functions for opsdesk CLI output.
//!
//! Only states that need attention get color: pending tasks stay in
//! standard text, completed tasks are dimmed, required markers and
//! unsupported fields are highlighted.

use opsdesk_core::enums::TaskKind;
use opsdesk_core::task::Task;
use owo_colors::OwoColorize;

use crate::terminal::supports_color;

// ---------------------------------------------------------------------------
// Ayu Dark color palette (RGB values)
// ---------------------------------------------------------------------------

pub(crate) const PASS: (u8, u8, u8) = (0xc2, 0xd9, 0x4c); // #c2d94c
pub(crate) const WARN: (u8, u8, u8) = (0xff, 0xb4, 0x54); // #ffb454
pub(crate) const FAIL: (u8, u8, u8) = (0xf0, 0x71, 0x78); // #f07178
pub(crate) const MUTED: (u8, u8, u8) = (0x6c, 0x76, 0x80); // #6c7680
pub(crate) const ACCENT: (u8, u8, u8) = (0x59, 0xc2, 0xff); // #59c2ff

const DONE: (u8, u8, u8) = (0x80, 0x90, 0xa0); // #8090a0
const KIND_FREIGHT: (u8, u8, u8) = (0xd2, 0xa6, 0xff); // #d2a6ff
const KIND_REPORT: (u8, u8, u8) = (0xff, 0x8f, 0x40); // #ff8f40

// ---------------------------------------------------------------------------
// Icons
// ---------------------------------------------------------------------------

/// Pending task (hollow circle).
pub const TASK_ICON_PENDING: &str = "\u{25CB}";
/// Completed task (checkmark).
pub const TASK_ICON_DONE: &str = "\u{2713}";
/// Permanent task (pin).
pub const TASK_ICON_PERMANENT: &str = "\u{25C6}";

pub const ICON_PASS: &str = "\u{2713}";
pub const ICON_WARN: &str = "\u{26A0}";
pub const ICON_FAIL: &str = "\u{2716}";

pub const SEPARATOR_LIGHT: &str = "\u{2500}\u{2500}\u{2500}\u{2500}\u{2500}\u{2500}\u{2500}\u{2500}\u{2500}\u{2500}\u{2500}\u{2500}\u{2500}\u{2500}\u{2500}\u{2500}\u{2500}\u{2500}\u{2500}\u{2500}\u{2500}\u{2500}\u{2500}\u{2500}\u{2500}\u{2500}\u{2500}\u{2500}\u{2500}\u{2500}\u{2500}\u{2500}\u{2500}\u{2500}\u{2500}\u{2500}\u{2500}\u{2500}\u{2500}\u{2500}";

// ---------------------------------------------------------------------------
// Painting
// ---------------------------------------------------------------------------

/// Applies truecolor foreground when `color` is set.
pub fn paint(s: &str, rgb: (u8, u8, u8), color: bool) -> String {
    if color {
        s.truecolor(rgb.0, rgb.1, rgb.2).to_string()
    } else {
        s.to_string()
    }
}

/// Applies truecolor foreground plus bold when `color` is set.
pub fn paint_bold(s: &str, rgb: (u8, u8, u8), color: bool) -> String {
    if color {
        s.truecolor(rgb.0, rgb.1, rgb.2).bold().to_string()
    } else {
        s.to_string()
    }
}

pub fn render_pass(s: &str) -> String {
    paint(s, PASS, supports_color())
}

pub fn render_warn(s: &str) -> String {
    paint(s, WARN, supports_color())
}

pub fn render_fail(s: &str) -> String {
    paint(s, FAIL, supports_color())
}

pub fn render_muted(s: &str) -> String {
    paint(s, MUTED, supports_color())
}

pub fn render_accent(s: &str) -> String {
    paint(s, ACCENT, supports_color())
}

pub fn render_bold(s: &str) -> String {
    if supports_color() {
        s.bold().to_string()
    } else {
        s.to_string()
    }
}

pub fn render_separator() -> String {
    render_muted(SEPARATOR_LIGHT)
}

pub fn render_pass_icon() -> String {
    render_pass(ICON_PASS)
}

pub fn render_warn_icon() -> String {
    render_warn(ICON_WARN)
}

pub fn render_fail_icon() -> String {
    render_fail(ICON_FAIL)
}

// ---------------------------------------------------------------------------
// Task rendering
// ---------------------------------------------------------------------------

pub fn task_icon(task: &Task) -> &'static str {
    if task.is_completed {
        TASK_ICON_DONE
    } else if task.permanent {
        TASK_ICON_PERMANENT
    } else {
        TASK_ICON_PENDING
    }
}

/// Colors builtin kinds that need a closer look; custom kinds stay plain.
pub fn render_kind(kind: &TaskKind, color: bool) -> String {
    match kind {
        TaskKind::Freight => paint(kind.as_str(), KIND_FREIGHT, color),
        TaskKind::UploadReport => paint(kind.as_str(), KIND_REPORT, color),
        other => other.as_str().to_string(),
    }
}

/// One-line task summary: `ICON ID [kind] name (assignee)`.
///
/// Completed tasks are dimmed as a whole.
pub fn task_line(task: &Task, color: bool) -> String {
    let engine = task
        .external_id
        .as_deref()
        .map(|id| format!(" {}", paint(&format!("ext:{id}"), MUTED, color)))
        .unwrap_or_default();
    if task.is_completed {
        let line = format!(
            "{} {} [{}] {} ({})",
            task_icon(task),
            task.id,
            task.kind.as_str(),
            task.name,
            task.assignee
        );
        return format!("{}{engine}", paint(&line, DONE, color));
    }
    format!(
        "{} {} [{}] {} ({}){engine}",
        task_icon(task),
        task.id,
        render_kind(&task.kind, color),
        task.name,
        task.assignee,
    )
}

pub fn render_task_line(task: &Task) -> String {
    task_line(task, supports_color())
}
