//! Command handlers, one module per subcommand.

pub mod completion;
pub mod config_cmd;
pub mod form;
pub mod init;
pub mod routes;
pub mod tasks;
pub mod version;

use anyhow::{Result, bail};

/// Splits a `path=value` flag at the first `=`.
pub fn split_assignment(raw: &str) -> Result<(&str, &str)> {
    match raw.split_once('=') {
        Some((path, value)) if !path.trim().is_empty() => Ok((path.trim(), value)),
        _ => bail!("expected PATH=VALUE, got {raw:?}"),
    }
}
