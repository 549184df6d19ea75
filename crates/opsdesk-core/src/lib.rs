//! Core types for the opsdesk operations console.
//!
//! Holds the task record surfaced by the workflow engine, route history
//! records, task filters, the closed enums shared by the form interpreter,
//! and JSONL task import/export.

pub mod enums;
pub mod filter;
pub mod idgen;
pub mod jsonl;
pub mod route;
pub mod task;
pub mod validation;
