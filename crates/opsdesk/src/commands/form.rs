//! `opsdesk form` -- render task forms and submit them.
//!
//! `show` and `submit` go through the console: the task is selected, its
//! deployed form fetched from the engine and external data injected from
//! the local store. `submit` then applies the operator's input, validates,
//! uploads attachments and completes the task.

use std::collections::BTreeMap;
use std::fs;

use anyhow::{Context, Result, bail};
use chrono::Local;
use serde_json::{Value, json};
use tracing::debug;

use opsdesk_console::{ConsoleError, SubmitOptions, TaskConsole};
use opsdesk_engine::{EngineClient, completion_body};
use opsdesk_forms::inject::inject_external_data;
use opsdesk_forms::parser::load_definition;
use opsdesk_forms::view::build_view;
use opsdesk_forms::{DataProvider, FormSession, LocalFile};
use opsdesk_storage::{SqliteDataProvider, SqliteStore, TaskStore};
use opsdesk_ui::render::Renderer;
use opsdesk_ui::styles::{render_bold, render_fail_icon, render_muted, render_pass_icon};

use crate::cli::{FormArgs, FormCommands, FormPreviewArgs, FormShowArgs, FormSubmitArgs};
use crate::commands::split_assignment;
use crate::context::{DryRunUploader, RuntimeContext, engine_client, open_store_at, uploader};
use crate::output::output_json;

pub fn run(ctx: &RuntimeContext, args: &FormArgs) -> Result<()> {
    match &args.command {
        FormCommands::Show(show) => run_show(ctx, show),
        FormCommands::Preview(preview) => run_preview(ctx, preview),
        FormCommands::Submit(submit) => run_submit(ctx, submit),
    }
}

/// Selects a task and loads its form into the console.
fn load_form(store: &SqliteStore, engine: &EngineClient, task_id: &str) -> Result<TaskConsole> {
    let task = store.get_task(task_id)?;
    let mut console = TaskConsole::new();
    let ticket = console
        .select(task)
        .with_context(|| format!("task {task_id} has no engine form"))?;
    debug!(task = task_id, external_id = ticket.external_id(), "fetching deployed form");

    let provider = SqliteDataProvider::new(store);
    let outcome = ticket.run(engine, Some(&provider as &dyn DataProvider));
    console
        .apply_fetch(outcome)
        .with_context(|| format!("failed to load the form of task {task_id}"))?;
    Ok(console)
}

fn print_form(ctx: &RuntimeContext, title: &str, session: &FormSession) {
    if ctx.json {
        output_json(&json!({
            "title": title,
            "values": session.state().to_json(),
        }));
        return;
    }
    println!("{}", render_bold(title));
    println!();
    print!("{}", Renderer::new().render_view(&build_view(session)));
}

fn run_show(ctx: &RuntimeContext, args: &FormShowArgs) -> Result<()> {
    let (dir, config) = ctx.config()?;
    let store = open_store_at(&dir, &config)?;
    let engine = engine_client(&config);
    let console = load_form(&store, &engine, &args.task_id)?;

    let title = console.selected().map(|t| t.name.clone()).unwrap_or_default();
    let session = console.session().context("form is not loaded")?;
    print_form(ctx, &title, session);
    Ok(())
}

fn run_preview(ctx: &RuntimeContext, args: &FormPreviewArgs) -> Result<()> {
    let definition = load_definition(&args.schema)
        .with_context(|| format!("failed to load schema {}", args.schema.display()))?;
    let variables: Value = match &args.vars {
        Some(path) => {
            let content = fs::read_to_string(path)
                .with_context(|| format!("failed to read {}", path.display()))?;
            serde_json::from_str(&content)
                .with_context(|| format!("invalid JSON in {}", path.display()))?
        }
        None => json!({}),
    };

    // External data comes from the local store when there is one.
    let definition = match ctx.open_store() {
        Ok(store) => {
            let provider = SqliteDataProvider::new(&store);
            let (injected, report) = inject_external_data(&definition, &provider, &variables);
            debug!(?report, "external data injected into preview");
            injected
        }
        Err(e) => {
            debug!(error = %e, "previewing without local store");
            definition
        }
    };

    let title = args
        .schema
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let session = FormSession::new(definition, &variables);
    print_form(ctx, &title, &session);
    Ok(())
}

fn run_submit(ctx: &RuntimeContext, args: &FormSubmitArgs) -> Result<()> {
    let (dir, config) = ctx.config()?;
    let store = open_store_at(&dir, &config)?;
    let engine = engine_client(&config);
    let mut console = load_form(&store, &engine, &args.task_id)?;

    {
        let session = console.session_mut().context("form is not loaded")?;
        for flag in &args.set {
            let (path, raw) = split_assignment(flag)?;
            session
                .set_input(path, raw)
                .with_context(|| format!("cannot set {path}"))?;
        }
        for (path, files) in group_files(&args.files)? {
            session
                .attach_files(path, files)
                .with_context(|| format!("cannot attach files to {path}"))?;
        }
    }

    let options = SubmitOptions {
        validate: !args.no_validate,
        today: Local::now().date_naive(),
    };
    let ticket = match console.prepare_submission(options) {
        Err(ConsoleError::Invalid(issues)) => {
            for issue in &issues {
                eprintln!("  {} {}", render_fail_icon(), issue);
            }
            bail!("{} field(s) need attention", issues.len());
        }
        other => other?,
    };

    if args.dry_run {
        let payload = ticket.payload(&DryRunUploader)?;
        output_json(&completion_body(&payload));
        return Ok(());
    }

    let uploader = uploader(&config);
    let outcome = ticket.execute(uploader.as_ref(), &engine);
    let payload = outcome.payload().cloned();
    console.apply_submission(outcome, &store)?;

    if ctx.json {
        output_json(&json!({
            "id": args.task_id,
            "submitted": true,
            "variables": payload,
        }));
    } else if !ctx.quiet {
        println!("{} Submitted task {}", render_pass_icon(), args.task_id);
        if let Some(payload) = payload {
            println!("  {}", render_muted(&format!("{} variable(s) sent", payload.len())));
        }
    }
    Ok(())
}

/// Groups `path=FILE` flags by field, keeping the order files were given.
fn group_files(flags: &[String]) -> Result<BTreeMap<&str, Vec<LocalFile>>> {
    let mut grouped: BTreeMap<&str, Vec<LocalFile>> = BTreeMap::new();
    for flag in flags {
        let (path, file) = split_assignment(flag)?;
        if file.is_empty() {
            bail!("no file given for {path}");
        }
        grouped.entry(path).or_default().push(LocalFile::new(file));
    }
    Ok(grouped)
}
