//! Issue-to-task synchronisation.
//!
//! Mirrors GitHub issue lifecycle events into tasks of the linked project when
//! the project's `auto_sync_issues` flag is set:
//!
//! | Issue action | Task effect |
//! |--------------|-------------|
//! | `opened` | new `TODO` task titled `GH Issue #<n>: <title>` |
//! | `closed` | every mirroring task set to `DONE` |
//! | `reopened` | every mirroring task set to `TODO` |
//! | anything else | nothing |
//!
//! Repeated `opened` deliveries create repeated tasks; there is no
//! idempotency key.

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::{
    issue_marker, AutomationConfig, IssueNumber, NewTask, ProjectId, ProjectStore, TaskId,
    TaskPriority, TaskStatus, TrackerError,
};

/// Longest task description copied from an issue body, in characters.
pub const MAX_DESCRIPTION_CHARS: usize = 500;

/// The issue fields synchronisation reads.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IssueSnapshot {
    pub number: IssueNumber,
    pub title: String,
    pub body: Option<String>,
    pub labels: Vec<String>,
}

/// An issue webhook `action`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IssueAction {
    Opened,
    Closed,
    Reopened,
    Other(String),
}

impl IssueAction {
    pub fn parse(action: &str) -> Self {
        match action {
            "opened" => Self::Opened,
            "closed" => Self::Closed,
            "reopened" => Self::Reopened,
            other => Self::Other(other.to_string()),
        }
    }
}

/// What synchronisation did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncOutcome {
    /// `auto_sync_issues` is off.
    Disabled,
    Created(TaskId),
    /// Mirroring tasks were moved to a new status.
    Updated { tasks: usize },
    /// The action has no task effect.
    Unchanged,
}

/// Task priority implied by issue labels.
///
/// Case-insensitive, first rule that matches any label wins:
/// `critical`/`urgent` → `URGENT`, `high` → `HIGH`, `low` → `LOW`, otherwise
/// `MEDIUM`.
pub fn priority_from_labels<S: AsRef<str>>(labels: &[S]) -> TaskPriority {
    let has = |names: &[&str]| {
        labels
            .iter()
            .any(|l| names.iter().any(|n| n.eq_ignore_ascii_case(l.as_ref())))
    };
    if has(&["critical", "urgent"]) {
        TaskPriority::Urgent
    } else if has(&["high"]) {
        TaskPriority::High
    } else if has(&["low"]) {
        TaskPriority::Low
    } else {
        TaskPriority::Medium
    }
}

/// Builds the task an `opened` issue becomes.
pub fn task_for_issue(project: ProjectId, issue: &IssueSnapshot) -> NewTask {
    let description = issue
        .body
        .as_deref()
        .map(|body| body.chars().take(MAX_DESCRIPTION_CHARS).collect())
        .unwrap_or_default();
    NewTask {
        project_id: project,
        title: format!("{}: {}", issue_marker(issue.number), issue.title),
        description,
        status: TaskStatus::Todo,
        priority: priority_from_labels(issue.labels.as_slice()),
        due_date: None,
        source_issue: Some(issue.number),
    }
}

/// Applies one issue event to the tasks of `project`.
pub async fn sync_issue(
    store: &dyn ProjectStore,
    project: ProjectId,
    automation: &AutomationConfig,
    action: &IssueAction,
    issue: &IssueSnapshot,
) -> Result<SyncOutcome, TrackerError> {
    if !automation.auto_sync_issues {
        return Ok(SyncOutcome::Disabled);
    }

    let status = match action {
        IssueAction::Opened => {
            let task = store.create_task(task_for_issue(project, issue)).await?;
            info!(%project, issue = %issue.number, task = %task.id, "task created from issue");
            return Ok(SyncOutcome::Created(task.id));
        }
        IssueAction::Closed => TaskStatus::Done,
        IssueAction::Reopened => TaskStatus::Todo,
        IssueAction::Other(_) => return Ok(SyncOutcome::Unchanged),
    };

    let tasks = store
        .set_issue_task_status(project, issue.number, status)
        .await?;
    info!(%project, issue = %issue.number, %status, tasks, "issue tasks updated");
    Ok(SyncOutcome::Updated { tasks })
}
