//! Terminal UI components for the opsdesk console.
//!
//! Provides Ayu-themed color styling, terminal detection, and a text
//! renderer for form views.

pub mod render;
pub mod styles;
pub mod terminal;
