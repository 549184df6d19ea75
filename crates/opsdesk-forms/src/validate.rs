//! Field-level validation run before a submission starts.

use std::fmt;

use chrono::NaiveDate;
use opsdesk_core::enums::ComponentType;

use crate::state::{FormState, FormValue, Lookup};
use crate::types::FormDefinition;
use crate::walk::walk;

/// What is wrong with one field.
#[derive(Debug, Clone, PartialEq)]
pub enum Problem {
    Required,
    BelowMin { min: f64, actual: f64 },
    AboveMax { max: f64, actual: f64 },
    TooShort { min: usize, actual: usize },
    TooLong { max: usize, actual: usize },
    PassedDate { date: NaiveDate },
}

/// A validation finding for one bound field.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldIssue {
    pub path: String,
    pub label: String,
    pub problem: Problem,
}

impl fmt::Display for FieldIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({}): ", self.label, self.path)?;
        match &self.problem {
            Problem::Required => write!(f, "a value is required"),
            Problem::BelowMin { min, actual } => write!(f, "{actual} is below the minimum {min}"),
            Problem::AboveMax { max, actual } => write!(f, "{actual} is above the maximum {max}"),
            Problem::TooShort { min, actual } => {
                write!(f, "needs at least {min} characters (got {actual})")
            }
            Problem::TooLong { max, actual } => {
                write!(f, "allows at most {max} characters (got {actual})")
            }
            Problem::PassedDate { date } => write!(f, "{date} is in the past"),
        }
    }
}

/// Checks every bound, editable field against its declared rules.
///
/// Disabled and read-only fields are skipped, as are unsupported nodes.
pub fn validate_form(
    definition: &FormDefinition,
    state: &FormState,
    today: NaiveDate,
) -> Vec<FieldIssue> {
    let mut issues = Vec::new();
    for visit in walk(&definition.components) {
        if !visit.is_field() {
            continue;
        }
        let component = visit.component;
        if component.disabled || component.readonly {
            continue;
        }
        let Some(path) = visit.binding_path() else {
            continue;
        };
        let value = match state.get(&path) {
            Lookup::Present(v) => Some(v),
            Lookup::Absent => None,
        };
        let mut push = |problem| {
            issues.push(FieldIssue {
                path: path.clone(),
                label: component.display_label().to_owned(),
                problem,
            })
        };

        if component.is_required() && value.is_none_or(FormValue::is_empty) {
            push(Problem::Required);
            continue;
        }
        let Some(value) = value else {
            continue;
        };
        let rules = component.validate.clone().unwrap_or_default();

        if component.component_type == ComponentType::Number {
            if let Some(actual) = value.as_f64() {
                if let Some(min) = rules.min.filter(|min| actual < *min) {
                    push(Problem::BelowMin { min, actual });
                }
                if let Some(max) = rules.max.filter(|max| actual > *max) {
                    push(Problem::AboveMax { max, actual });
                }
            }
        }

        if let Some(text) = value.as_str() {
            let actual = text.chars().count();
            if let Some(min) = rules.min_length.filter(|min| actual < *min && actual > 0) {
                push(Problem::TooShort { min, actual });
            }
            if let Some(max) = rules.max_length.filter(|max| actual > *max) {
                push(Problem::TooLong { max, actual });
            }
        }

        if component.component_type == ComponentType::Datetime && component.disallow_passed_dates {
            if let Some(date) = value.as_str().and_then(leading_date) {
                if date < today {
                    push(Problem::PassedDate { date });
                }
            }
        }
    }
    issues
}

/// The `YYYY-MM-DD` prefix of a date or date-time string.
fn leading_date(s: &str) -> Option<NaiveDate> {
    s.get(..10)
        .and_then(|prefix| NaiveDate::parse_from_str(prefix, "%Y-%m-%d").ok())
}
