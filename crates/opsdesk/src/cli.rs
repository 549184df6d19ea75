//! Clap CLI definitions for the `opsdesk` command.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

/// opsdesk -- operations console for workflow engine tasks.
///
/// Lists the tasks the workflow engine issued, renders their deployed
/// forms, and completes them with uploaded attachments.
#[derive(Parser, Debug)]
#[command(
    name = "opsdesk",
    about = "Operations console for workflow engine tasks",
    long_about = "Lists the tasks the workflow engine issued, renders their deployed forms, and completes them with uploaded attachments.",
    version,
    propagate_version = true
)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalArgs,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Global flags available to all subcommands.
#[derive(Args, Debug, Clone)]
pub struct GlobalArgs {
    /// Output in JSON format.
    #[arg(long, global = true)]
    pub json: bool,

    /// Enable verbose/debug output.
    #[arg(short = 'v', long, global = true)]
    pub verbose: bool,

    /// Suppress non-essential output (errors only).
    #[arg(short = 'q', long, global = true)]
    pub quiet: bool,

    /// The `.opsdesk` directory (default: $OPSDESK_DIR, then search upwards).
    #[arg(long, global = true)]
    pub dir: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Initialize an `.opsdesk` directory here.
    Init(InitArgs),

    /// Manage local tasks.
    Tasks(TasksArgs),

    /// Manage route history of fleet units.
    Routes(RoutesArgs),

    /// Render and submit task forms.
    Form(FormArgs),

    /// Show or change configuration.
    Config(ConfigArgs),

    /// Generate shell completions.
    Completion(CompletionArgs),

    /// Print version information.
    Version,
}

// ---------------------------------------------------------------------------
// init
// ---------------------------------------------------------------------------

#[derive(Args, Debug)]
pub struct InitArgs {
    /// Re-initialize even if a database already exists.
    #[arg(long)]
    pub force: bool,
}

// ---------------------------------------------------------------------------
// tasks
// ---------------------------------------------------------------------------

#[derive(Args, Debug)]
pub struct TasksArgs {
    #[command(subcommand)]
    pub command: TasksCommands,
}

#[derive(Subcommand, Debug)]
pub enum TasksCommands {
    /// List tasks (pending only by default).
    List(TaskListArgs),

    /// Show one task.
    Show(TaskIdArgs),

    /// Add a task.
    #[command(alias = "create")]
    Add(TaskAddArgs),

    /// Import tasks from a JSONL file of engine task records.
    Import(TaskImportArgs),

    /// Export tasks as JSONL.
    Export(TaskExportArgs),

    /// Flip the completion flag of a task.
    Toggle(TaskIdArgs),

    /// Delete a task.
    #[command(alias = "rm")]
    Delete(TaskIdArgs),
}

#[derive(Args, Debug)]
pub struct TaskListArgs {
    /// Include completed tasks.
    #[arg(long, conflicts_with = "completed")]
    pub all: bool,

    /// Only completed tasks.
    #[arg(long)]
    pub completed: bool,

    /// Filter by kind.
    #[arg(long)]
    pub kind: Option<String>,

    /// Filter by assignee.
    #[arg(long)]
    pub assignee: Option<String>,

    /// Maximum number of tasks to show.
    #[arg(short = 'n', long)]
    pub limit: Option<usize>,
}

#[derive(Args, Debug)]
pub struct TaskIdArgs {
    /// Local task ID.
    pub id: String,
}

#[derive(Args, Debug)]
pub struct TaskAddArgs {
    /// Task name.
    #[arg(long)]
    pub name: String,

    /// Engine-side task ID. Tasks with one render the engine's form.
    #[arg(long)]
    pub external_id: Option<String>,

    /// Explicit local ID (default: generated).
    #[arg(long)]
    pub id: Option<String>,

    /// Task kind (any, freight, subirReporteMovimientos, or custom).
    #[arg(long)]
    pub kind: Option<String>,

    #[arg(long)]
    pub assignee: Option<String>,

    #[arg(short = 'p', long, default_value_t = 0)]
    pub priority: i32,

    /// Process variable as `path=value`; values are parsed as JSON when possible.
    #[arg(long = "var", value_name = "PATH=VALUE")]
    pub vars: Vec<String>,

    /// Never mark this task completed after a submission.
    #[arg(long)]
    pub permanent: bool,
}

#[derive(Args, Debug)]
pub struct TaskImportArgs {
    /// JSONL file, one task record per line.
    pub file: PathBuf,
}

#[derive(Args, Debug)]
pub struct TaskExportArgs {
    /// Output file (default: stdout).
    #[arg(short = 'o', long)]
    pub output: Option<PathBuf>,

    /// Include completed tasks.
    #[arg(long)]
    pub all: bool,
}

// ---------------------------------------------------------------------------
// routes
// ---------------------------------------------------------------------------

#[derive(Args, Debug)]
pub struct RoutesArgs {
    #[command(subcommand)]
    pub command: RoutesCommands,
}

#[derive(Subcommand, Debug)]
pub enum RoutesCommands {
    /// Record a route.
    Add(RouteAddArgs),

    /// Show the most recent routes of a unit.
    List(RouteListArgs),
}

#[derive(Args, Debug)]
pub struct RouteAddArgs {
    /// Fleet unit.
    #[arg(long)]
    pub unidad: String,

    #[arg(long, default_value = "")]
    pub operador: String,

    /// Trailer.
    #[arg(long)]
    pub caja: Option<String>,

    #[arg(long, default_value = "")]
    pub origen: String,

    #[arg(long, default_value = "")]
    pub destino: String,

    /// Start time, RFC 3339 (default: now).
    #[arg(long)]
    pub inicio: Option<String>,

    /// End time, RFC 3339.
    #[arg(long)]
    pub fin: Option<String>,
}

#[derive(Args, Debug)]
pub struct RouteListArgs {
    /// Fleet unit.
    pub unidad: String,

    #[arg(short = 'n', long, default_value_t = 10)]
    pub limit: usize,
}

// ---------------------------------------------------------------------------
// form
// ---------------------------------------------------------------------------

#[derive(Args, Debug)]
pub struct FormArgs {
    #[command(subcommand)]
    pub command: FormCommands,
}

#[derive(Subcommand, Debug)]
pub enum FormCommands {
    /// Fetch a task's form from the engine and render it.
    Show(FormShowArgs),

    /// Render a local schema file without contacting the engine.
    Preview(FormPreviewArgs),

    /// Fill in and submit a task's form.
    Submit(FormSubmitArgs),
}

#[derive(Args, Debug)]
pub struct FormShowArgs {
    /// Local task ID.
    pub task_id: String,
}

#[derive(Args, Debug)]
pub struct FormPreviewArgs {
    /// Form schema JSON file.
    pub schema: PathBuf,

    /// JSON file with the variables to seed the form with.
    #[arg(long)]
    pub vars: Option<PathBuf>,
}

#[derive(Args, Debug)]
pub struct FormSubmitArgs {
    /// Local task ID.
    pub task_id: String,

    /// Field input as `path=value`, parsed by the field's type.
    #[arg(long = "set", value_name = "PATH=VALUE")]
    pub set: Vec<String>,

    /// Attach a file as `path=FILE`. Repeat for multi-file pickers.
    #[arg(long = "file", value_name = "PATH=FILE")]
    pub files: Vec<String>,

    /// Print the completion payload without uploading or completing.
    #[arg(long)]
    pub dry_run: bool,

    /// Skip field validation.
    #[arg(long)]
    pub no_validate: bool,
}

// ---------------------------------------------------------------------------
// config
// ---------------------------------------------------------------------------

#[derive(Args, Debug)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommands,
}

#[derive(Subcommand, Debug)]
pub enum ConfigCommands {
    /// Show the effective configuration.
    Show,

    /// Get a value. Dotted keys address config.yaml, others the database.
    Get(ConfigGetArgs),

    /// Set a value. Dotted keys address config.yaml, others the database.
    Set(ConfigSetArgs),
}

#[derive(Args, Debug)]
pub struct ConfigGetArgs {
    pub key: String,
}

#[derive(Args, Debug)]
pub struct ConfigSetArgs {
    pub key: String,
    pub value: String,
}

// ---------------------------------------------------------------------------
// completion
// ---------------------------------------------------------------------------

#[derive(Args, Debug)]
pub struct CompletionArgs {
    #[command(subcommand)]
    pub command: CompletionCommands,
}

#[derive(Subcommand, Debug)]
pub enum CompletionCommands {
    Bash,
    Zsh,
    Fish,
    Powershell,
}
