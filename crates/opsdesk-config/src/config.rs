//! Configuration types and loading for the opsdesk console.
//!
//! The main entry point is [`ConsoleConfig`]. It is loaded with
//! [`load_config`], which layers serialized defaults, `config.yaml`,
//! `config.toml` and `OPSDESK_*` environment variables (nested keys split
//! on `__`, e.g. `OPSDESK_ENGINE__BASE_URL`), and saved with
//! [`save_config`].

use std::path::Path;

use figment::Figment;
use figment::providers::{Env, Format, Serialized, Toml, Yaml};
use serde::{Deserialize, Serialize};
use serde_yaml::Value;
use thiserror::Error;
use tracing::debug;

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

/// Errors that can occur during configuration operations.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    ReadError(#[from] std::io::Error),

    #[error("failed to parse config file: {0}")]
    ParseError(#[from] serde_yaml::Error),

    /// A layer could not be merged or extracted.
    #[error("failed to load configuration: {0}")]
    LoadError(#[from] figment::Error),

    #[error("no .opsdesk directory found (run 'opsdesk init' first)")]
    DirNotFound,

    #[error("unknown configuration key '{0}'")]
    UnknownKey(String),

    #[error("invalid configuration value for key '{key}': {reason}")]
    InvalidValue { key: String, reason: String },
}

/// A specialized `Result` type for configuration operations.
pub type Result<T> = std::result::Result<T, ConfigError>;

/// File name of the YAML layer (also the file [`save_config`] writes).
pub const CONFIG_FILE: &str = "config.yaml";

/// File name of the optional TOML layer.
pub const TOML_CONFIG_FILE: &str = "config.toml";

/// Prefix of environment overrides.
pub const ENV_PREFIX: &str = "OPSDESK_";

/// Every settable dotted key.
pub const KEYS: &[&str] = &[
    "engine.base_url",
    "engine.auth_token",
    "engine.timeout_secs",
    "blob.upload_url_endpoint",
    "blob.auth_token",
    "database.file",
    "log.filter",
];

// ---------------------------------------------------------------------------
// Sections
// ---------------------------------------------------------------------------

/// Workflow engine connection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Bearer token sent with every engine request.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auth_token: Option<String>,

    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            auth_token: None,
            timeout_secs: default_timeout_secs(),
        }
    }
}

fn default_base_url() -> String {
    "http://localhost:8080".to_string()
}

fn default_timeout_secs() -> u64 {
    30
}

/// Blob store used for attachments.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct BlobConfig {
    /// URL that issues one-time upload targets.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub upload_url_endpoint: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auth_token: Option<String>,
}

/// Local task database.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// Database file, relative to `.opsdesk/` unless absolute.
    #[serde(default = "default_database_file")]
    pub file: String,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            file: default_database_file(),
        }
    }
}

fn default_database_file() -> String {
    "opsdesk.db".to_string()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct LogConfig {
    /// `tracing` env-filter directive, e.g. `opsdesk_forms=debug`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filter: Option<String>,
}

// ---------------------------------------------------------------------------
// Main config struct
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct ConsoleConfig {
    #[serde(default)]
    pub engine: EngineConfig,

    #[serde(default)]
    pub blob: BlobConfig,

    #[serde(default)]
    pub database: DatabaseConfig,

    #[serde(default)]
    pub log: LogConfig,
}

impl ConsoleConfig {
    /// Path of the database file for a given `.opsdesk/` directory.
    pub fn database_path(&self, opsdesk_dir: &Path) -> std::path::PathBuf {
        let file = Path::new(&self.database.file);
        if file.is_absolute() {
            file.to_path_buf()
        } else {
            opsdesk_dir.join(file)
        }
    }

    /// Reads a dotted key, `None` when it is unset.
    pub fn get_value(&self, key: &str) -> Result<Option<String>> {
        check_key(key)?;
        let tree = serde_yaml::to_value(self)?;
        let node = key.split('.').try_fold(&tree, |node, segment| node.get(segment));
        match node {
            None | Some(Value::Null) => Ok(None),
            Some(Value::String(s)) => Ok(Some(s.clone())),
            Some(other) => Ok(Some(serde_yaml::to_string(other)?.trim_end().to_string())),
        }
    }

    /// Sets a dotted key from its textual form.
    ///
    /// The text is read as a YAML scalar first (so `30` is a number and an
    /// empty value unsets an optional key), falling back to a plain string.
    pub fn set_value(&mut self, key: &str, raw: &str) -> Result<()> {
        check_key(key)?;
        let parsed: Value =
            serde_yaml::from_str(raw).unwrap_or_else(|_| Value::String(raw.to_string()));
        let updated = self
            .with_value(key, parsed)
            .or_else(|_| self.with_value(key, Value::String(raw.to_string())))
            .map_err(|e| ConfigError::InvalidValue {
                key: key.to_string(),
                reason: e.to_string(),
            })?;
        *self = updated;
        Ok(())
    }

    fn with_value(&self, key: &str, value: Value) -> std::result::Result<Self, serde_yaml::Error> {
        let mut tree = serde_yaml::to_value(self)?;
        let mut node = &mut tree;
        let mut segments = key.split('.').peekable();
        while let Some(segment) = segments.next() {
            if segments.peek().is_none() {
                if let Value::Mapping(map) = node {
                    map.insert(Value::String(segment.to_string()), value);
                }
                break;
            }
            let Some(child) = node.get_mut(segment) else {
                break;
            };
            node = child;
        }
        serde_yaml::from_value(tree)
    }
}

fn check_key(key: &str) -> Result<()> {
    if KEYS.contains(&key) {
        Ok(())
    } else {
        Err(ConfigError::UnknownKey(key.to_string()))
    }
}

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

/// Loads the layered configuration for an `.opsdesk/` directory.
///
/// Missing files are skipped; later layers win.
pub fn load_config(opsdesk_dir: &Path) -> Result<ConsoleConfig> {
    load_layers(opsdesk_dir)
        .merge(Env::prefixed(ENV_PREFIX).split("__"))
        .extract()
        .map_err(Into::into)
}

/// File layers only, without environment overrides.
pub fn load_file_config(opsdesk_dir: &Path) -> Result<ConsoleConfig> {
    load_layers(opsdesk_dir).extract().map_err(Into::into)
}

fn load_layers(opsdesk_dir: &Path) -> Figment {
    let yaml = opsdesk_dir.join(CONFIG_FILE);
    let toml = opsdesk_dir.join(TOML_CONFIG_FILE);
    debug!(?yaml, ?toml, "loading configuration layers");
    let mut figment = Figment::from(Serialized::defaults(ConsoleConfig::default()));
    // An empty YAML file is valid and contributes nothing.
    if std::fs::metadata(&yaml).is_ok_and(|m| m.len() > 0) {
        figment = figment.merge(Yaml::file(yaml));
    }
    figment.merge(Toml::file(toml))
}

/// Writes `config.yaml` into the `.opsdesk/` directory.
pub fn save_config(opsdesk_dir: &Path, config: &ConsoleConfig) -> Result<()> {
    std::fs::create_dir_all(opsdesk_dir)?;
    let yaml = serde_yaml::to_string(config)?;
    std::fs::write(opsdesk_dir.join(CONFIG_FILE), yaml)?;
    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
