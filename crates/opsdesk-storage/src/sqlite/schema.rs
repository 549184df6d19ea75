//! DDL statements and migrations for the SQLite schema.
//!
//! Timestamps are stored as TEXT in ISO 8601 format. Route times are the
//! engine's epoch milliseconds (INTEGER). Booleans are INTEGER (0/1) and
//! task variables are a JSON object stored as TEXT.

/// Current schema version. Bumped whenever DDL or migrations change.
pub const CURRENT_SCHEMA_VERSION: i32 = 1;

/// Core DDL statements executed during `init_schema`.
pub const SCHEMA_STATEMENTS: &[&str] = &[
    // -- Tasks table ---------------------------------------------------------
    r#"
    CREATE TABLE IF NOT EXISTS tasks (
        id                  TEXT PRIMARY KEY,
        external_id         TEXT UNIQUE,
        name                TEXT NOT NULL,
        kind                TEXT NOT NULL DEFAULT 'any',
        task_definition_key TEXT NOT NULL DEFAULT '',
        form_key            TEXT,
        process_instance_id TEXT,
        business_key        TEXT,
        assignee            TEXT NOT NULL DEFAULT 'general',
        priority            INTEGER NOT NULL DEFAULT 0,
        is_completed        INTEGER NOT NULL DEFAULT 0,
        permanent           INTEGER NOT NULL DEFAULT 0,
        variables           TEXT NOT NULL DEFAULT '{}',
        created_at          TEXT NOT NULL,
        completed_at        TEXT
    )
    "#,
    "CREATE INDEX IF NOT EXISTS idx_tasks_completed ON tasks(is_completed)",
    "CREATE INDEX IF NOT EXISTS idx_tasks_created_at ON tasks(created_at)",
    // -- Route history -------------------------------------------------------
    r#"
    CREATE TABLE IF NOT EXISTS recorridos (
        id       INTEGER PRIMARY KEY AUTOINCREMENT,
        unidad   TEXT NOT NULL,
        operador TEXT NOT NULL DEFAULT '',
        caja     TEXT,
        origen   TEXT NOT NULL DEFAULT '',
        destino  TEXT NOT NULL DEFAULT '',
        inicio   INTEGER NOT NULL,
        fin      INTEGER
    )
    "#,
    // -- Config & metadata ---------------------------------------------------
    r#"
    CREATE TABLE IF NOT EXISTS config (
        key   TEXT PRIMARY KEY,
        value TEXT NOT NULL
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS metadata (
        key   TEXT PRIMARY KEY,
        value TEXT NOT NULL
    )
    "#,
];

/// Key of the number of previous routes returned by route history lookups.
pub const ROUTE_HISTORY_LIMIT_KEY: &str = "route_history_limit";

/// Default configuration values inserted on first init.
pub const DEFAULT_CONFIG: &[(&str, &str)] = &[
    ("default_assignee", "general"),
    (ROUTE_HISTORY_LIMIT_KEY, "2"),
];

/// Migrations applied after the DDL, tracked in `metadata`.
pub const MIGRATIONS: &[(&str, &str)] = &[(
    "001_recorridos_unidad_inicio",
    "CREATE INDEX IF NOT EXISTS idx_recorridos_unidad_inicio ON recorridos(unidad, inicio DESC)",
)];
