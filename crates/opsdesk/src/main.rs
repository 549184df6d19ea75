//! `opsdesk` -- operations console for workflow engine tasks.
//!
//! Parses CLI arguments with clap, resolves the runtime context, and
//! dispatches to command handlers.

mod cli;
mod commands;
mod context;
mod output;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use cli::{Cli, Commands};
use context::RuntimeContext;

/// Filter used by `--verbose`.
const VERBOSE_FILTER: &str = concat!(
    "opsdesk=debug,",
    "opsdesk_console=debug,",
    "opsdesk_forms=debug,",
    "opsdesk_engine=debug,",
    "opsdesk_storage=debug"
);

fn main() {
    let cli = Cli::parse();
    let ctx = RuntimeContext::from_global_args(&cli.global);

    init_logging(&ctx);

    let result = match cli.command {
        Some(Commands::Version) => commands::version::run(&ctx),
        Some(Commands::Init(args)) => commands::init::run(&ctx, &args),
        Some(Commands::Tasks(args)) => commands::tasks::run(&ctx, &args),
        Some(Commands::Routes(args)) => commands::routes::run(&ctx, &args),
        Some(Commands::Form(args)) => commands::form::run(&ctx, &args),
        Some(Commands::Config(args)) => commands::config_cmd::run(&ctx, &args),
        Some(Commands::Completion(args)) => commands::completion::run(&ctx, &args),
        None => {
            use clap::CommandFactory;
            Cli::command().print_help().ok();
            println!();
            Ok(())
        }
    };

    if let Err(e) = result {
        if cli.global.json {
            let err_json = serde_json::json!({
                "error": format!("{:#}", e),
            });
            if let Ok(s) = serde_json::to_string_pretty(&err_json) {
                eprintln!("{}", s);
            }
        } else {
            eprintln!("Error: {:#}", e);
        }
        std::process::exit(1);
    }
}

/// Logs go to stderr. `--verbose` wins, then `RUST_LOG`, then the
/// `log.filter` config key; otherwise only warnings are shown.
fn init_logging(ctx: &RuntimeContext) {
    let filter = if ctx.verbose {
        EnvFilter::new(VERBOSE_FILTER)
    } else if let Ok(filter) = EnvFilter::try_from_default_env() {
        filter
    } else if let Some(directive) = ctx.configured_log_filter() {
        EnvFilter::try_new(&directive).unwrap_or_else(|_| EnvFilter::new("warn"))
    } else {
        EnvFilter::new("warn")
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}
