//! SQL migration definitions for the proposal-state database.
//!
//! Migrations are applied in order on database open. Each migration has a
//! version number and a set of SQL statements executed as one batch.

/// A database migration with a version and SQL statements.
pub(crate) struct Migration {
    pub version: u32,
    pub description: &'static str,
    pub sql: &'static str,
}

/// All migrations, in ascending version order.
pub(crate) fn all_migrations() -> Vec<Migration> {
    vec![Migration {
        version: 1,
        description: "Initial schema: runs, project_fields",
        sql: r#"
-- Schema version tracking
CREATE TABLE IF NOT EXISTS schema_migrations (
    version   INTEGER PRIMARY KEY,
    applied_at TEXT NOT NULL DEFAULT (datetime('now'))
);

-- One row per extraction run
CREATE TABLE IF NOT EXISTS runs (
    id            TEXT PRIMARY KEY,
    created_at    TEXT NOT NULL,
    input_sha256  TEXT NOT NULL DEFAULT ''
);

-- Project-state fields, one row per (run, top-level key)
CREATE TABLE IF NOT EXISTS project_fields (
    run_id      TEXT NOT NULL REFERENCES runs(id) ON DELETE CASCADE,
    field       TEXT NOT NULL,
    value_json  TEXT NOT NULL,
    updated_at  TEXT NOT NULL,
    PRIMARY KEY (run_id, field)
);

CREATE INDEX IF NOT EXISTS idx_project_fields_run ON project_fields(run_id);

INSERT INTO schema_migrations (version) VALUES (1);
"#,
    }]
}
