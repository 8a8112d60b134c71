//! SQLite implementation of [`ProjectStore`].

use std::path::Path;
use std::sync::{Arc, Mutex, PoisonError};

use async_trait::async_trait;
use rusqlite::{params, Connection, ErrorCode, OptionalExtension};
use tracing::{debug, warn};
use tracker::store::task_order;
use tracker::{
    IssueNumber, Link, LogEntry, NewLink, NewProject, NewTask, Project, ProjectId, ProjectStatus,
    ProjectStore, RepositoryId, RiskLevel, StoreError, Task, TaskId, TaskStatus, Timestamp,
};

use crate::rows::{self, date_text, timestamp_text};
use crate::schema;

const IN_MEMORY: &str = ":memory:";

/// SQLite-backed project store.
///
/// Synchronous rusqlite calls run under `tokio::task::spawn_blocking` so they
/// never stall the async runtime.
#[derive(Debug, Clone)]
pub struct SqliteStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteStore {
    /// Opens (creating if necessary) the database at `path` and migrates it.
    ///
    /// The connection is configured with `journal_mode = WAL`,
    /// `foreign_keys = ON` and a 5 s busy timeout.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, StoreError> {
        let path = path.as_ref();
        let path_str = path.to_string_lossy();
        let is_in_memory = path_str == IN_MEMORY;

        if !is_in_memory {
            if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                std::fs::create_dir_all(parent).map_err(|e| {
                    StoreError::storage(
                        "create database directory",
                        format!("{}: {e}", parent.display()),
                    )
                })?;
            }
        }

        let conn = Connection::open(path)
            .map_err(|e| StoreError::storage("open database", e.to_string()))?;

        // In-memory databases report "memory" and cannot switch to WAL.
        let journal_mode: String = conn
            .query_row("PRAGMA journal_mode = WAL", [], |row| row.get(0))
            .map_err(|e| StoreError::storage("set journal_mode", e.to_string()))?;
        let journal_mode_ok = journal_mode.eq_ignore_ascii_case("wal")
            || (is_in_memory && journal_mode.eq_ignore_ascii_case("memory"));
        if !journal_mode_ok {
            warn!(
                path = %path.display(),
                journal_mode = %journal_mode,
                "SQLite did not enable WAL; continuing with reduced concurrency"
            );
        }

        conn.execute_batch(
            r#"
            PRAGMA foreign_keys = ON;
            PRAGMA busy_timeout = 5000;
            "#,
        )
        .map_err(|e| StoreError::storage("configure pragmas", e.to_string()))?;

        schema::migrate(&conn)?;
        debug!(path = %path.display(), "project store opened");

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Opens a private in-memory database. Nothing survives the store.
    pub fn in_memory() -> Result<Self, StoreError> {
        Self::open(IN_MEMORY)
    }

    /// Runs `f` against the connection on the blocking pool.
    async fn call<T, F>(&self, operation: &'static str, f: F) -> Result<T, StoreError>
    where
        T: Send + 'static,
        F: FnOnce(&Connection) -> Result<T, StoreError> + Send + 'static,
    {
        let conn = Arc::clone(&self.conn);
        tokio::task::spawn_blocking(move || {
            let conn = conn.lock().unwrap_or_else(PoisonError::into_inner);
            f(&conn)
        })
        .await
        .map_err(|e| StoreError::storage(operation, e.to_string()))?
    }
}

// ---------------------------------------------------------------------------
// Helpers (run with the connection lock held)
// ---------------------------------------------------------------------------

fn storage(operation: &'static str) -> impl Fn(rusqlite::Error) -> StoreError {
    move |e| StoreError::storage(operation, e.to_string())
}

fn is_constraint_violation(error: &rusqlite::Error) -> bool {
    matches!(
        error,
        rusqlite::Error::SqliteFailure(failure, _) if failure.code == ErrorCode::ConstraintViolation
    )
}

fn name_conflict(name: &str) -> StoreError {
    StoreError::Conflict(format!("project name '{name}' already exists"))
}

fn not_found(kind: &'static str, id: i64) -> StoreError {
    StoreError::NotFound { kind, id }
}

fn fetch_project(conn: &Connection, id: ProjectId) -> Result<Option<Project>, StoreError> {
    conn.query_row(
        &format!("SELECT {} FROM projects WHERE id = ?1", rows::PROJECT_COLUMNS),
        params![id.as_i64()],
        rows::project,
    )
    .optional()
    .map_err(storage("get project"))
}

fn fetch_task(conn: &Connection, id: TaskId) -> Result<Option<Task>, StoreError> {
    conn.query_row(
        &format!("SELECT {} FROM tasks WHERE id = ?1", rows::TASK_COLUMNS),
        params![id.as_i64()],
        rows::task,
    )
    .optional()
    .map_err(storage("get task"))
}

fn require_project(conn: &Connection, id: ProjectId) -> Result<(), StoreError> {
    let exists: bool = conn
        .query_row(
            "SELECT EXISTS(SELECT 1 FROM projects WHERE id = ?1)",
            params![id.as_i64()],
            |row| row.get(0),
        )
        .map_err(storage("check project"))?;
    if exists {
        Ok(())
    } else {
        Err(not_found("project", id.as_i64()))
    }
}

fn collect<T>(
    conn: &Connection,
    operation: &'static str,
    sql: &str,
    params: impl rusqlite::Params,
    map: fn(&rusqlite::Row<'_>) -> rusqlite::Result<T>,
) -> Result<Vec<T>, StoreError> {
    let mut stmt = conn.prepare(sql).map_err(storage(operation))?;
    let rows = stmt.query_map(params, map).map_err(storage(operation))?;
    rows.collect::<Result<Vec<_>, _>>().map_err(storage(operation))
}

// ---------------------------------------------------------------------------
// ProjectStore
// ---------------------------------------------------------------------------

#[async_trait]
impl ProjectStore for SqliteStore {
    async fn create_project(&self, project: NewProject) -> Result<Project, StoreError> {
        self.call("create_project", move |conn| {
            let now = timestamp_text(Timestamp::now());
            let inserted = conn.execute(
                "INSERT INTO projects (name, description, status, risk, summary, next_task,
                                       repo_name, auto_status_enabled, auto_sync_issues,
                                       stale_days, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?11)",
                params![
                    project.name,
                    project.description,
                    project.status.as_str(),
                    project.risk.as_str(),
                    project.summary,
                    project.next_task,
                    project.repo_name.as_ref().map(RepositoryId::as_str),
                    project.automation.auto_status_enabled,
                    project.automation.auto_sync_issues,
                    project.automation.stale_days,
                    now,
                ],
            );
            match inserted {
                Ok(_) => {}
                Err(e) if is_constraint_violation(&e) => return Err(name_conflict(&project.name)),
                Err(e) => return Err(StoreError::storage("create_project", e.to_string())),
            }
            let id = ProjectId::new(conn.last_insert_rowid());
            fetch_project(conn, id)?.ok_or_else(|| not_found("project", id.as_i64()))
        })
        .await
    }

    async fn project(&self, id: ProjectId) -> Result<Option<Project>, StoreError> {
        self.call("project", move |conn| fetch_project(conn, id)).await
    }

    async fn project_by_name(&self, name: &str) -> Result<Option<Project>, StoreError> {
        let name = name.to_string();
        self.call("project_by_name", move |conn| {
            conn.query_row(
                &format!("SELECT {} FROM projects WHERE name = ?1", rows::PROJECT_COLUMNS),
                params![name],
                rows::project,
            )
            .optional()
            .map_err(storage("project_by_name"))
        })
        .await
    }

    async fn project_by_repo(&self, repo: &RepositoryId) -> Result<Option<Project>, StoreError> {
        let repo = repo.as_str().to_string();
        self.call("project_by_repo", move |conn| {
            conn.query_row(
                &format!(
                    "SELECT {} FROM projects WHERE repo_name = ?1 ORDER BY id ASC LIMIT 1",
                    rows::PROJECT_COLUMNS
                ),
                params![repo],
                rows::project,
            )
            .optional()
            .map_err(storage("project_by_repo"))
        })
        .await
    }

    async fn list_projects(&self) -> Result<Vec<Project>, StoreError> {
        self.call("list_projects", |conn| {
            collect(
                conn,
                "list_projects",
                &format!(
                    "SELECT {} FROM projects ORDER BY updated_at DESC, id DESC",
                    rows::PROJECT_COLUMNS
                ),
                [],
                rows::project,
            )
        })
        .await
    }

    async fn save_project(&self, project: &Project) -> Result<Project, StoreError> {
        let project = project.clone();
        self.call("save_project", move |conn| {
            let updated = conn.execute(
                "UPDATE projects SET name = ?2, description = ?3, status = ?4, risk = ?5,
                        summary = ?6, next_task = ?7, repo_name = ?8,
                        auto_status_enabled = ?9, auto_sync_issues = ?10, stale_days = ?11,
                        updated_at = ?12
                 WHERE id = ?1",
                params![
                    project.id.as_i64(),
                    project.name,
                    project.description,
                    project.status.as_str(),
                    project.risk.as_str(),
                    project.summary,
                    project.next_task,
                    project.repo_name.as_ref().map(RepositoryId::as_str),
                    project.automation.auto_status_enabled,
                    project.automation.auto_sync_issues,
                    project.automation.stale_days,
                    timestamp_text(Timestamp::now()),
                ],
            );
            match updated {
                Ok(0) => Err(not_found("project", project.id.as_i64())),
                Ok(_) => fetch_project(conn, project.id)?
                    .ok_or_else(|| not_found("project", project.id.as_i64())),
                Err(e) if is_constraint_violation(&e) => Err(name_conflict(&project.name)),
                Err(e) => Err(StoreError::storage("save_project", e.to_string())),
            }
        })
        .await
    }

    async fn set_project_status(
        &self,
        id: ProjectId,
        status: ProjectStatus,
    ) -> Result<(), StoreError> {
        self.call("set_project_status", move |conn| {
            let updated = conn
                .execute(
                    "UPDATE projects SET status = ?2, updated_at = ?3 WHERE id = ?1",
                    params![id.as_i64(), status.as_str(), timestamp_text(Timestamp::now())],
                )
                .map_err(storage("set_project_status"))?;
            if updated == 0 {
                return Err(not_found("project", id.as_i64()));
            }
            Ok(())
        })
        .await
    }

    async fn set_project_risk(&self, id: ProjectId, risk: RiskLevel) -> Result<(), StoreError> {
        self.call("set_project_risk", move |conn| {
            let updated = conn
                .execute(
                    "UPDATE projects SET risk = ?2, updated_at = ?3 WHERE id = ?1",
                    params![id.as_i64(), risk.as_str(), timestamp_text(Timestamp::now())],
                )
                .map_err(storage("set_project_risk"))?;
            if updated == 0 {
                return Err(not_found("project", id.as_i64()));
            }
            Ok(())
        })
        .await
    }

    async fn delete_project(&self, id: ProjectId) -> Result<bool, StoreError> {
        self.call("delete_project", move |conn| {
            let deleted = conn
                .execute("DELETE FROM projects WHERE id = ?1", params![id.as_i64()])
                .map_err(storage("delete_project"))?;
            Ok(deleted > 0)
        })
        .await
    }

    async fn create_task(&self, task: NewTask) -> Result<Task, StoreError> {
        self.call("create_task", move |conn| {
            require_project(conn, task.project_id)?;
            let now = timestamp_text(Timestamp::now());
            conn.execute(
                "INSERT INTO tasks (project_id, title, description, status, priority, due_date,
                                    source_issue, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?8)",
                params![
                    task.project_id.as_i64(),
                    task.title,
                    task.description,
                    task.status.as_str(),
                    task.priority.as_str(),
                    task.due_date.map(date_text),
                    task.source_issue.map(|n| n.as_u64() as i64),
                    now,
                ],
            )
            .map_err(storage("create_task"))?;
            let id = TaskId::new(conn.last_insert_rowid());
            fetch_task(conn, id)?.ok_or_else(|| not_found("task", id.as_i64()))
        })
        .await
    }

    async fn task(&self, id: TaskId) -> Result<Option<Task>, StoreError> {
        self.call("task", move |conn| fetch_task(conn, id)).await
    }

    async fn tasks_for_project(&self, project: ProjectId) -> Result<Vec<Task>, StoreError> {
        let mut tasks = self
            .call("tasks_for_project", move |conn| {
                collect(
                    conn,
                    "tasks_for_project",
                    &format!("SELECT {} FROM tasks WHERE project_id = ?1", rows::TASK_COLUMNS),
                    params![project.as_i64()],
                    rows::task,
                )
            })
            .await?;
        tasks.sort_by(task_order);
        Ok(tasks)
    }

    async fn open_tasks(&self) -> Result<Vec<Task>, StoreError> {
        self.call("open_tasks", |conn| {
            collect(
                conn,
                "open_tasks",
                &format!(
                    "SELECT {} FROM tasks WHERE status != ?1 ORDER BY id",
                    rows::TASK_COLUMNS
                ),
                params![TaskStatus::Done.as_str()],
                rows::task,
            )
        })
        .await
    }

    async fn set_task_status(&self, id: TaskId, status: TaskStatus) -> Result<(), StoreError> {
        self.call("set_task_status", move |conn| {
            let updated = conn
                .execute(
                    "UPDATE tasks SET status = ?2, updated_at = ?3 WHERE id = ?1",
                    params![id.as_i64(), status.as_str(), timestamp_text(Timestamp::now())],
                )
                .map_err(storage("set_task_status"))?;
            if updated == 0 {
                return Err(not_found("task", id.as_i64()));
            }
            Ok(())
        })
        .await
    }

    async fn set_issue_task_status(
        &self,
        project: ProjectId,
        issue: IssueNumber,
        status: TaskStatus,
    ) -> Result<usize, StoreError> {
        let marker = tracker::issue_marker(issue);
        self.call("set_issue_task_status", move |conn| {
            conn.execute(
                "UPDATE tasks SET status = ?1, updated_at = ?2
                 WHERE project_id = ?3 AND (source_issue = ?4 OR instr(title, ?5) > 0)",
                params![
                    status.as_str(),
                    timestamp_text(Timestamp::now()),
                    project.as_i64(),
                    issue.as_u64() as i64,
                    marker,
                ],
            )
            .map_err(storage("set_issue_task_status"))
        })
        .await
    }

    async fn add_link(&self, link: NewLink) -> Result<Link, StoreError> {
        self.call("add_link", move |conn| {
            require_project(conn, link.project_id)?;
            conn.execute(
                "INSERT INTO links (project_id, title, url, kind, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![
                    link.project_id.as_i64(),
                    link.title,
                    link.url,
                    link.kind.as_str(),
                    timestamp_text(Timestamp::now()),
                ],
            )
            .map_err(storage("add_link"))?;
            let id = conn.last_insert_rowid();
            conn.query_row(
                &format!("SELECT {} FROM links WHERE id = ?1", rows::LINK_COLUMNS),
                params![id],
                rows::link,
            )
            .map_err(storage("add_link"))
        })
        .await
    }

    async fn links(&self, project: ProjectId) -> Result<Vec<Link>, StoreError> {
        self.call("links", move |conn| {
            collect(
                conn,
                "links",
                &format!(
                    "SELECT {} FROM links WHERE project_id = ?1 ORDER BY kind, title",
                    rows::LINK_COLUMNS
                ),
                params![project.as_i64()],
                rows::link,
            )
        })
        .await
    }

    async fn append_log(&self, project: ProjectId, message: &str) -> Result<LogEntry, StoreError> {
        let message = message.to_string();
        self.call("append_log", move |conn| {
            require_project(conn, project)?;
            conn.execute(
                "INSERT INTO logs (project_id, message, timestamp) VALUES (?1, ?2, ?3)",
                params![project.as_i64(), message, timestamp_text(Timestamp::now())],
            )
            .map_err(storage("append_log"))?;
            let id = conn.last_insert_rowid();
            conn.query_row(
                &format!("SELECT {} FROM logs WHERE id = ?1", rows::LOG_COLUMNS),
                params![id],
                rows::log_entry,
            )
            .map_err(storage("append_log"))
        })
        .await
    }

    async fn recent_logs(
        &self,
        project: ProjectId,
        limit: usize,
    ) -> Result<Vec<LogEntry>, StoreError> {
        let limit = i64::try_from(limit).unwrap_or(i64::MAX);
        self.call("recent_logs", move |conn| {
            collect(
                conn,
                "recent_logs",
                &format!(
                    "SELECT {} FROM logs WHERE project_id = ?1
                     ORDER BY timestamp DESC, id DESC LIMIT ?2",
                    rows::LOG_COLUMNS
                ),
                params![project.as_i64(), limit],
                rows::log_entry,
            )
        })
        .await
    }
}

#[cfg(test)]
mod tests;
