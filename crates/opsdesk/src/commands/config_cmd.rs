//! `opsdesk config` -- show, get and set configuration.
//!
//! Dotted keys (`engine.base_url`) live in `config.yaml`; plain keys
//! (`route_history_limit`) are settings stored in the database.

use anyhow::{Context, Result, bail};

use opsdesk_config::config::load_file_config;
use opsdesk_config::save_config;
use opsdesk_storage::TaskStore;

use crate::cli::{ConfigArgs, ConfigCommands};
use crate::context::{RuntimeContext, open_store_at};
use crate::output::output_json;

pub fn run(ctx: &RuntimeContext, args: &ConfigArgs) -> Result<()> {
    match &args.command {
        ConfigCommands::Show => run_show(ctx),
        ConfigCommands::Get(get) => run_get(ctx, &get.key),
        ConfigCommands::Set(set) => run_set(ctx, &set.key, &set.value),
    }
}

fn is_file_key(key: &str) -> bool {
    key.contains('.')
}

fn run_show(ctx: &RuntimeContext) -> Result<()> {
    let (dir, config) = ctx.config()?;
    let settings = open_store_at(&dir, &config)?.all_config()?;

    if ctx.json {
        output_json(&serde_json::json!({
            "config": config,
            "settings": settings,
        }));
        return Ok(());
    }
    let yaml = serde_yaml::to_string(&config).context("failed to render configuration")?;
    print!("{yaml}");
    if !settings.is_empty() {
        println!("settings:");
        for (key, value) in &settings {
            println!("  {key}: {value}");
        }
    }
    Ok(())
}

fn run_get(ctx: &RuntimeContext, key: &str) -> Result<()> {
    let (dir, config) = ctx.config()?;
    let value = if is_file_key(key) {
        config.get_value(key)?
    } else {
        match open_store_at(&dir, &config)?.get_config(key) {
            Ok(value) => Some(value),
            Err(e) if e.is_not_found() => None,
            Err(e) => return Err(e.into()),
        }
    };

    if ctx.json {
        output_json(&serde_json::json!({
            "key": key,
            "value": value,
        }));
        return Ok(());
    }
    match value {
        Some(v) => println!("{v}"),
        None => bail!("key '{key}' is not set"),
    }
    Ok(())
}

fn run_set(ctx: &RuntimeContext, key: &str, value: &str) -> Result<()> {
    let dir = ctx.resolve_dir()?;
    if is_file_key(key) {
        // Environment overrides are not written back.
        let mut config = load_file_config(&dir)?;
        config.set_value(key, value)?;
        save_config(&dir, &config)
            .with_context(|| format!("failed to save configuration in {}", dir.display()))?;
    } else {
        let (_, config) = ctx.config()?;
        open_store_at(&dir, &config)?
            .set_config(key, value)
            .with_context(|| format!("failed to set config key '{key}'"))?;
    }

    if ctx.json {
        output_json(&serde_json::json!({
            "key": key,
            "value": value,
        }));
    } else if !ctx.quiet {
        println!("Set {key} = {value}");
    }
    Ok(())
}
