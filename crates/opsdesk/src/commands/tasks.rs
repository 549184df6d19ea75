//! `opsdesk tasks` -- list, show, add, import, toggle and delete tasks.

use std::fs::File;
use std::io::{self, BufReader, BufWriter};

use anyhow::{Context, Result};
use serde_json::{Map, Value};

use opsdesk_core::enums::TaskKind;
use opsdesk_core::filter::TaskFilter;
use opsdesk_core::jsonl::{read_jsonl, write_jsonl};
use opsdesk_core::task::{Task, TaskBuilder};
use opsdesk_forms::variables::insert_path;
use opsdesk_storage::TaskStore;

use crate::cli::{
    TaskAddArgs, TaskExportArgs, TaskIdArgs, TaskImportArgs, TaskListArgs, TasksArgs,
    TasksCommands,
};
use crate::commands::split_assignment;
use crate::context::RuntimeContext;
use crate::output::{format_task_compact, format_task_detail, output_json};

pub fn run(ctx: &RuntimeContext, args: &TasksArgs) -> Result<()> {
    let store = ctx.open_store()?;
    match &args.command {
        TasksCommands::List(list) => run_list(ctx, &store, list),
        TasksCommands::Show(show) => run_show(ctx, &store, show),
        TasksCommands::Add(add) => run_add(ctx, &store, add),
        TasksCommands::Import(import) => run_import(ctx, &store, import),
        TasksCommands::Export(export) => run_export(ctx, &store, export),
        TasksCommands::Toggle(toggle) => run_toggle(ctx, &store, toggle),
        TasksCommands::Delete(delete) => run_delete(ctx, &store, delete),
    }
}

fn run_list(ctx: &RuntimeContext, store: &dyn TaskStore, args: &TaskListArgs) -> Result<()> {
    let filter = TaskFilter {
        completed: if args.all {
            None
        } else {
            Some(args.completed)
        },
        kind: args.kind.as_deref().map(TaskKind::from),
        assignee: args.assignee.clone(),
        limit: args.limit,
    };
    let tasks = store.list_tasks(&filter)?;

    if ctx.json {
        output_json(&tasks);
    } else if tasks.is_empty() {
        if !ctx.quiet {
            println!("No tasks found.");
        }
    } else {
        for task in &tasks {
            println!("{}", format_task_compact(task));
        }
    }
    Ok(())
}

fn run_show(ctx: &RuntimeContext, store: &dyn TaskStore, args: &TaskIdArgs) -> Result<()> {
    let task = store.get_task(&args.id)?;
    if ctx.json {
        output_json(&task);
    } else {
        println!("{}", format_task_detail(&task));
    }
    Ok(())
}

fn run_add(ctx: &RuntimeContext, store: &dyn TaskStore, args: &TaskAddArgs) -> Result<()> {
    let task = build_task(args)?;
    let id = store.add_task(&task)?;

    if ctx.json {
        let stored = store.get_task(&id)?;
        output_json(&stored);
    } else if !ctx.quiet {
        println!("Added task {}: {}", id, task.name);
    }
    Ok(())
}

fn build_task(args: &TaskAddArgs) -> Result<Task> {
    let mut builder = TaskBuilder::new(&args.name)
        .priority(args.priority)
        .permanent(args.permanent)
        .variables(parse_var_flags(&args.vars)?);
    if let Some(id) = &args.id {
        builder = builder.id(id);
    }
    if let Some(external_id) = &args.external_id {
        builder = builder.external_id(external_id);
    }
    if let Some(kind) = &args.kind {
        builder = builder.kind(TaskKind::from(kind.as_str()));
    }
    if let Some(assignee) = &args.assignee {
        builder = builder.assignee(assignee);
    }
    Ok(builder.build())
}

/// Builds the variable object from `path=value` flags. Values are JSON
/// when they parse as JSON and plain strings otherwise.
pub fn parse_var_flags(flags: &[String]) -> Result<Map<String, Value>> {
    let mut vars = Map::new();
    for flag in flags {
        let (path, raw) = split_assignment(flag)?;
        let value = serde_json::from_str(raw).unwrap_or_else(|_| Value::String(raw.to_string()));
        insert_path(&mut vars, path, value);
    }
    Ok(vars)
}

fn run_import(ctx: &RuntimeContext, store: &dyn TaskStore, args: &TaskImportArgs) -> Result<()> {
    let file = File::open(&args.file)
        .with_context(|| format!("failed to open {}", args.file.display()))?;
    let tasks = read_jsonl(BufReader::new(file))
        .collect::<Result<Vec<Task>, _>>()
        .with_context(|| format!("failed to read {}", args.file.display()))?;
    let report = store.import_tasks(&tasks)?;

    if ctx.json {
        output_json(&serde_json::json!({
            "added": report.added,
            "skipped": report.skipped,
        }));
    } else if !ctx.quiet {
        println!(
            "Imported {} task(s), skipped {} already known",
            report.added, report.skipped
        );
    }
    Ok(())
}

fn run_export(ctx: &RuntimeContext, store: &dyn TaskStore, args: &TaskExportArgs) -> Result<()> {
    let filter = if args.all {
        TaskFilter::default()
    } else {
        TaskFilter::pending()
    };
    let tasks = store.list_tasks(&filter)?;

    match &args.output {
        Some(path) => {
            let file = File::create(path)
                .with_context(|| format!("failed to create {}", path.display()))?;
            let mut writer = BufWriter::new(file);
            write_jsonl(&mut writer, &tasks)?;
            if !ctx.quiet && !ctx.json {
                println!("Exported {} task(s) to {}", tasks.len(), path.display());
            }
        }
        None => {
            let stdout = io::stdout();
            let mut handle = stdout.lock();
            write_jsonl(&mut handle, &tasks)?;
        }
    }
    Ok(())
}

fn run_toggle(ctx: &RuntimeContext, store: &dyn TaskStore, args: &TaskIdArgs) -> Result<()> {
    let completed = store.toggle_completion(&args.id)?;
    if ctx.json {
        output_json(&serde_json::json!({
            "id": args.id,
            "is_completed": completed,
        }));
    } else if !ctx.quiet {
        let state = if completed { "completed" } else { "pending" };
        println!("Task {} is now {}", args.id, state);
    }
    Ok(())
}

fn run_delete(ctx: &RuntimeContext, store: &dyn TaskStore, args: &TaskIdArgs) -> Result<()> {
    store.delete_task(&args.id)?;
    if ctx.json {
        output_json(&serde_json::json!({
            "id": args.id,
            "deleted": true,
        }));
    } else if !ctx.quiet {
        println!("Deleted task {}", args.id);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn var_flags_nest_and_parse_json() {
        let vars = parse_var_flags(&[
            "unidad=T-12".to_string(),
            "viaje.km=120".to_string(),
            "viaje.activo=true".to_string(),
        ])
        .unwrap();
        assert_eq!(
            Value::Object(vars),
            json!({"unidad": "T-12", "viaje": {"km": 120, "activo": true}})
        );
    }

    #[test]
    fn add_args_build_task() {
        let args = TaskAddArgs {
            name: "Revisar caja".into(),
            external_id: Some("cam-1".into()),
            id: None,
            kind: Some("freight".into()),
            assignee: None,
            priority: 2,
            vars: vec!["unidad=T-1".into()],
            permanent: true,
        };
        let task = build_task(&args).unwrap();
        assert_eq!(task.kind, TaskKind::Freight);
        assert_eq!(task.external_id.as_deref(), Some("cam-1"));
        assert!(task.permanent);
        assert_eq!(task.variables["unidad"], json!("T-1"));
    }
}
