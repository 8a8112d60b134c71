//! Record-store port.
//!
//! [`ProjectStore`] is the only persistence seam. Every mutation the domain
//! performs is a single call here, so an implementation only has to make each
//! call atomic on its own (read-committed per record). Concurrent webhook
//! deliveries are not otherwise serialised.

use async_trait::async_trait;
use thiserror::Error;

use crate::{
    IssueNumber, Link, LogEntry, NewLink, NewProject, NewTask, Project, ProjectId, ProjectStatus,
    RepositoryId, RiskLevel, Task, TaskId, TaskStatus,
};

/// Failures reported by a [`ProjectStore`].
#[derive(Debug, Error)]
pub enum StoreError {
    /// A uniqueness constraint was violated (e.g. duplicate project name).
    #[error("conflict: {0}")]
    Conflict(String),

    /// The record a mutation targeted does not exist.
    #[error("{kind} {id} not found")]
    NotFound {
        /// `"project"`, `"task"`, ...
        kind: &'static str,
        id: i64,
    },

    /// The backing storage failed.
    #[error("storage error during {operation}: {message}")]
    Storage {
        operation: String,
        message: String,
    },
}

impl StoreError {
    pub fn storage(operation: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Storage {
            operation: operation.into(),
            message: message.into(),
        }
    }
}

/// Persistent storage for projects and their child records.
#[async_trait]
pub trait ProjectStore: Send + Sync {
    // -- projects -----------------------------------------------------------

    /// Creates a project. Fails with [`StoreError::Conflict`] when the name is
    /// taken.
    async fn create_project(&self, project: NewProject) -> Result<Project, StoreError>;

    async fn project(&self, id: ProjectId) -> Result<Option<Project>, StoreError>;

    async fn project_by_name(&self, name: &str) -> Result<Option<Project>, StoreError>;

    /// Finds the project linked to `repo` by exact match. When several share
    /// the repository, the one with the lowest id wins.
    async fn project_by_repo(&self, repo: &RepositoryId) -> Result<Option<Project>, StoreError>;

    /// All projects, most recently updated first.
    async fn list_projects(&self) -> Result<Vec<Project>, StoreError>;

    /// Writes every editable field of `project` and bumps `updated_at`.
    async fn save_project(&self, project: &Project) -> Result<Project, StoreError>;

    /// Atomically sets one project's status.
    async fn set_project_status(
        &self,
        id: ProjectId,
        status: ProjectStatus,
    ) -> Result<(), StoreError>;

    /// Atomically sets one project's risk level.
    async fn set_project_risk(&self, id: ProjectId, risk: RiskLevel) -> Result<(), StoreError>;

    /// Deletes a project with its tasks, links and log entries. Returns
    /// whether a project was removed.
    async fn delete_project(&self, id: ProjectId) -> Result<bool, StoreError>;

    // -- tasks --------------------------------------------------------------

    async fn create_task(&self, task: NewTask) -> Result<Task, StoreError>;

    async fn task(&self, id: TaskId) -> Result<Option<Task>, StoreError>;

    /// Tasks of one project, by priority (most pressing first), then due date
    /// (undated last), then newest first.
    async fn tasks_for_project(&self, project: ProjectId) -> Result<Vec<Task>, StoreError>;

    /// Every task across all projects whose status is not `DONE`.
    async fn open_tasks(&self) -> Result<Vec<Task>, StoreError>;

    async fn set_task_status(&self, id: TaskId, status: TaskStatus) -> Result<(), StoreError>;

    /// Sets `status` on every task of `project` that mirrors `issue` (see
    /// [`crate::Task::mirrors_issue`]). Returns the number of tasks touched.
    async fn set_issue_task_status(
        &self,
        project: ProjectId,
        issue: IssueNumber,
        status: TaskStatus,
    ) -> Result<usize, StoreError>;

    // -- links and audit trail ----------------------------------------------

    async fn add_link(&self, link: NewLink) -> Result<Link, StoreError>;

    /// Links of one project, by kind then title.
    async fn links(&self, project: ProjectId) -> Result<Vec<Link>, StoreError>;

    async fn append_log(&self, project: ProjectId, message: &str) -> Result<LogEntry, StoreError>;

    /// The newest `limit` log entries of one project, newest first.
    async fn recent_logs(&self, project: ProjectId, limit: usize)
        -> Result<Vec<LogEntry>, StoreError>;
}

/// The ordering [`ProjectStore::tasks_for_project`] promises.
pub fn task_order(a: &Task, b: &Task) -> std::cmp::Ordering {
    b.priority
        .rank()
        .cmp(&a.priority.rank())
        .then_with(|| match (a.due_date, b.due_date) {
            (Some(x), Some(y)) => x.cmp(&y),
            (Some(_), None) => std::cmp::Ordering::Less,
            (None, Some(_)) => std::cmp::Ordering::Greater,
            (None, None) => std::cmp::Ordering::Equal,
        })
        .then_with(|| b.created_at.cmp(&a.created_at))
        .then_with(|| b.id.cmp(&a.id))
}
