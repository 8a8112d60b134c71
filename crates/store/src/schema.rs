//! Schema creation and versioned migrations.
//!
//! The database carries a single-row `schema_version` table. A fresh database
//! reports version 0 and is migrated forward step by step; a database written
//! by a newer build is refused.

use rusqlite::{params, Connection, OptionalExtension};
use tracker::StoreError;

/// Schema version written by this build.
pub const CURRENT_SCHEMA_VERSION: i64 = 1;

const V1: &str = r#"
CREATE TABLE IF NOT EXISTS projects (
    id                  INTEGER PRIMARY KEY AUTOINCREMENT,
    name                TEXT    NOT NULL UNIQUE,
    description         TEXT    NOT NULL DEFAULT '',
    status              TEXT    NOT NULL,
    risk                TEXT    NOT NULL,
    summary             TEXT    NOT NULL DEFAULT '',
    next_task           TEXT    NOT NULL DEFAULT '',
    repo_name           TEXT,
    auto_status_enabled INTEGER NOT NULL DEFAULT 0,
    auto_sync_issues    INTEGER NOT NULL DEFAULT 0,
    stale_days          INTEGER NOT NULL DEFAULT 7,
    created_at          TEXT    NOT NULL,
    updated_at          TEXT    NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_projects_repo
    ON projects(repo_name) WHERE repo_name IS NOT NULL;

CREATE TABLE IF NOT EXISTS tasks (
    id           INTEGER PRIMARY KEY AUTOINCREMENT,
    project_id   INTEGER NOT NULL REFERENCES projects(id) ON DELETE CASCADE,
    title        TEXT    NOT NULL,
    description  TEXT    NOT NULL DEFAULT '',
    status       TEXT    NOT NULL,
    priority     TEXT    NOT NULL,
    due_date     TEXT,
    source_issue INTEGER,
    created_at   TEXT    NOT NULL,
    updated_at   TEXT    NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_tasks_project ON tasks(project_id);

CREATE TABLE IF NOT EXISTS links (
    id         INTEGER PRIMARY KEY AUTOINCREMENT,
    project_id INTEGER NOT NULL REFERENCES projects(id) ON DELETE CASCADE,
    title      TEXT    NOT NULL,
    url        TEXT    NOT NULL,
    kind       TEXT    NOT NULL,
    created_at TEXT    NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_links_project ON links(project_id);

CREATE TABLE IF NOT EXISTS logs (
    id         INTEGER PRIMARY KEY AUTOINCREMENT,
    project_id INTEGER NOT NULL REFERENCES projects(id) ON DELETE CASCADE,
    message    TEXT    NOT NULL,
    timestamp  TEXT    NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_logs_project ON logs(project_id, timestamp);
"#;

/// Creates the version table if needed and brings the schema up to
/// [`CURRENT_SCHEMA_VERSION`].
pub(crate) fn migrate(conn: &Connection) -> Result<(), StoreError> {
    conn.execute_batch(
        r#"
        CREATE TABLE IF NOT EXISTS schema_version (
            id INTEGER PRIMARY KEY CHECK (id = 1),
            version INTEGER NOT NULL
        );
        "#,
    )
    .map_err(|e| StoreError::storage("create schema_version table", e.to_string()))?;

    let from_version: i64 = conn
        .query_row(
            "SELECT version FROM schema_version WHERE id = 1",
            [],
            |row| row.get(0),
        )
        .optional()
        .map_err(|e| StoreError::storage("get schema version", e.to_string()))?
        .unwrap_or(0);

    if from_version > CURRENT_SCHEMA_VERSION {
        return Err(StoreError::storage(
            "schema version",
            format!(
                "database schema version {from_version} is newer than supported version \
                 {CURRENT_SCHEMA_VERSION}; upgrade repo-tracker"
            ),
        ));
    }
    if from_version == CURRENT_SCHEMA_VERSION {
        return Ok(());
    }

    if from_version < 1 {
        conn.execute_batch(V1)
            .map_err(|e| StoreError::storage("migration v1", e.to_string()))?;
    }

    conn.execute(
        "INSERT OR REPLACE INTO schema_version (id, version) VALUES (1, ?1)",
        params![CURRENT_SCHEMA_VERSION],
    )
    .map_err(|e| StoreError::storage("update schema version", e.to_string()))?;

    tracing::info!(
        from = from_version,
        to = CURRENT_SCHEMA_VERSION,
        "database schema migrated"
    );
    Ok(())
}
