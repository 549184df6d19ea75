//! Configuration management for the opsdesk console.
//!
//! This crate loads the layered console configuration (defaults,
//! `.opsdesk/config.yaml`, `.opsdesk/config.toml`, then `OPSDESK_*`
//! environment variables), saves it back as YAML, and discovers the
//! `.opsdesk/` directory in the filesystem.

pub mod config;
pub mod opsdesk_dir;

pub use config::{ConfigError, ConsoleConfig, load_config, save_config};
