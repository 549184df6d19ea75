//! Runtime context for command execution.
//!
//! The [`RuntimeContext`] holds the global flags and knows how to locate
//! the `.opsdesk` directory, load its configuration, and open the
//! collaborators a command needs.

use std::env;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};

use opsdesk_config::opsdesk_dir::{OPSDESK_DIR_NAME, find_opsdesk_dir};
use opsdesk_config::{ConsoleConfig, load_config};
use opsdesk_engine::{EngineClient, HttpBlobStore};
use opsdesk_forms::{LocalFile, StorageId, UploadError, Uploader};
use opsdesk_storage::SqliteStore;

use crate::cli::GlobalArgs;

/// Runtime context passed to every command handler.
#[derive(Debug)]
pub struct RuntimeContext {
    /// Explicit `--dir`.
    pub dir: Option<PathBuf>,
    pub json: bool,
    pub verbose: bool,
    pub quiet: bool,
}

impl RuntimeContext {
    pub fn from_global_args(global: &GlobalArgs) -> Self {
        Self {
            dir: global.dir.clone(),
            json: global.json,
            verbose: global.verbose,
            quiet: global.quiet,
        }
    }

    /// Locates the `.opsdesk` directory: `--dir`, then `$OPSDESK_DIR`,
    /// then a search upwards from the current directory.
    pub fn find_dir(&self) -> Option<PathBuf> {
        if let Some(dir) = &self.dir {
            return dir.is_dir().then(|| dir.clone());
        }
        let cwd = env::current_dir().ok()?;
        find_opsdesk_dir(&cwd)
    }

    pub fn resolve_dir(&self) -> Result<PathBuf> {
        self.find_dir().with_context(|| {
            format!("no {OPSDESK_DIR_NAME} directory found. Run 'opsdesk init' to create one.")
        })
    }

    /// Where `init` creates the directory.
    pub fn init_target(&self) -> Result<PathBuf> {
        match &self.dir {
            Some(dir) => Ok(dir.clone()),
            None => Ok(env::current_dir()
                .context("failed to get current directory")?
                .join(OPSDESK_DIR_NAME)),
        }
    }

    pub fn config(&self) -> Result<(PathBuf, ConsoleConfig)> {
        let dir = self.resolve_dir()?;
        let config = load_config(&dir)
            .with_context(|| format!("failed to load configuration from {}", dir.display()))?;
        Ok((dir, config))
    }

    /// `log.filter` of a discoverable configuration, if any.
    pub fn configured_log_filter(&self) -> Option<String> {
        let dir = self.find_dir()?;
        load_config(&dir).ok()?.log.filter
    }

    pub fn open_store(&self) -> Result<SqliteStore> {
        let (dir, config) = self.config()?;
        open_store_at(&dir, &config)
    }
}

pub fn open_store_at(dir: &std::path::Path, config: &ConsoleConfig) -> Result<SqliteStore> {
    let db_path = config.database_path(dir);
    if !db_path.exists() {
        anyhow::bail!(
            "no opsdesk database found at {}\nHint: run 'opsdesk init' to create one",
            db_path.display()
        );
    }
    SqliteStore::open(&db_path)
        .with_context(|| format!("failed to open database: {}", db_path.display()))
}

pub fn engine_client(config: &ConsoleConfig) -> EngineClient {
    EngineClient::new(&config.engine.base_url)
        .with_token(config.engine.auth_token.clone())
        .with_timeout(Duration::from_secs(config.engine.timeout_secs))
}

/// The configured blob store, or an uploader that refuses every file when
/// no upload endpoint is set.
pub fn uploader(config: &ConsoleConfig) -> Box<dyn Uploader> {
    match config.blob.upload_url_endpoint.as_deref().filter(|u| !u.is_empty()) {
        Some(endpoint) => Box::new(
            HttpBlobStore::new(endpoint)
                .with_token(config.blob.auth_token.clone())
                .with_timeout(Duration::from_secs(config.engine.timeout_secs)),
        ),
        None => Box::new(Unconfigured),
    }
}

struct Unconfigured;

impl Uploader for Unconfigured {
    fn upload(&self, _file: &LocalFile) -> Result<Option<StorageId>, UploadError> {
        Err(UploadError::Target("blob.upload_url_endpoint is not configured".into()))
    }
}

/// Hands out placeholder identifiers without transferring anything.
pub struct DryRunUploader;

impl Uploader for DryRunUploader {
    fn upload(&self, file: &LocalFile) -> Result<Option<StorageId>, UploadError> {
        Ok(Some(StorageId(format!("dry-run:{}", file.name))))
    }
}
