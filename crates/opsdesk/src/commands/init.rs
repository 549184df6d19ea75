//! `opsdesk init` -- create the `.opsdesk` directory.

use std::fs;

use anyhow::{Context, Result, bail};

use opsdesk_config::{ConsoleConfig, save_config};
use opsdesk_config::config::CONFIG_FILE;
use opsdesk_storage::SqliteStore;

use crate::cli::InitArgs;
use crate::context::RuntimeContext;
use crate::output::output_json;

const GITIGNORE_CONTENT: &str = r#"# opsdesk database files
*.db
*.db-journal
*.db-wal
*.db-shm
"#;

pub fn run(ctx: &RuntimeContext, args: &InitArgs) -> Result<()> {
    let dir = ctx.init_target()?;
    let config = ConsoleConfig::default();
    let db_path = config.database_path(&dir);

    if !args.force && db_path.exists() {
        bail!(
            "Found existing database in {}\n\n\
            This directory is already initialized.\n\
            Use --force to re-initialize.",
            dir.display()
        );
    }

    fs::create_dir_all(&dir)
        .with_context(|| format!("failed to create directory: {}", dir.display()))?;

    let config_path = dir.join(CONFIG_FILE);
    if args.force || !config_path.exists() {
        save_config(&dir, &config)
            .with_context(|| format!("failed to write {}", config_path.display()))?;
    }

    let gitignore_path = dir.join(".gitignore");
    if !gitignore_path.exists() {
        fs::write(&gitignore_path, GITIGNORE_CONTENT).with_context(|| {
            format!("failed to create .gitignore: {}", gitignore_path.display())
        })?;
    }

    // Opening creates the schema and seeds the default settings.
    SqliteStore::open(&db_path)
        .with_context(|| format!("failed to create database: {}", db_path.display()))?;

    if ctx.json {
        output_json(&serde_json::json!({
            "directory": dir.display().to_string(),
            "database": db_path.display().to_string(),
        }));
    } else if !ctx.quiet {
        println!();
        println!("opsdesk initialized successfully!");
        println!();
        println!("  Directory: {}", dir.display());
        println!("  Database:  {}", db_path.display());
        println!();
        println!("Set the engine URL with `opsdesk config set engine.base_url <url>`.");
        println!();
    }
    Ok(())
}
