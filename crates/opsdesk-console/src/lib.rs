//! The opsdesk task console.
//!
//! Holds the single active task, guards schema fetches and submissions
//! against stale results, and runs the upload-then-complete protocol.

pub mod console;
pub mod error;
pub mod submit;

#[cfg(test)]
mod testing;

pub use console::{Applied, FetchOutcome, FetchTicket, FormPhase, TaskConsole};
pub use error::ConsoleError;
pub use submit::{SubmitOptions, SubmitOutcome, SubmitTicket};
