//! The project aggregate: [`Project`] and its owned [`Task`], [`Link`] and
//! [`LogEntry`] records.
//!
//! Child records belong to exactly one project and are removed with it. Log
//! entries are an append-only audit trail, read newest-first.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::{
    AutomationConfig, IssueNumber, LinkId, LinkKind, LogEntryId, ProjectId, ProjectStatus,
    RepositoryId, RiskLevel, TaskId, TaskPriority, TaskStatus, Timestamp, UnknownVariant,
};

// ---------------------------------------------------------------------------
// Project
// ---------------------------------------------------------------------------

/// A tracked project. `name` is unique across the store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Project {
    pub id: ProjectId,
    pub name: String,
    pub description: String,
    pub status: ProjectStatus,
    pub risk: RiskLevel,
    pub summary: String,
    pub next_task: String,
    /// `None` means the project has no GitHub linkage and all GitHub-derived
    /// automation is inert.
    pub repo_name: Option<RepositoryId>,
    pub automation: AutomationConfig,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl Project {
    /// Returns the linked repository when the project is repo-linked.
    pub fn repository(&self) -> Option<&RepositoryId> {
        self.repo_name.as_ref()
    }

    /// True when status/risk may be derived from GitHub activity: the
    /// project is repo-linked and `auto_status_enabled` is set.
    pub fn derives_status(&self) -> bool {
        self.repo_name.is_some() && self.automation.auto_status_enabled
    }
}

/// Input for creating a project.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NewProject {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub status: ProjectStatus,
    #[serde(default)]
    pub risk: RiskLevel,
    #[serde(default)]
    pub summary: String,
    #[serde(default)]
    pub next_task: String,
    #[serde(default)]
    pub repo_name: Option<RepositoryId>,
    #[serde(default)]
    pub automation: AutomationConfig,
}

impl NewProject {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }
}

/// A partial update to a project, as submitted from an edit form.
///
/// Every field is optional; absent fields keep their current value. Status and
/// risk arrive as text and must name a member of their enumeration.
/// `stale_days` also arrives as text, but unlike status/risk an unparseable
/// value is ignored rather than rejected.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProjectEdit {
    pub status: Option<String>,
    pub risk: Option<String>,
    pub summary: Option<String>,
    pub next_task: Option<String>,
    pub description: Option<String>,
    /// An empty string unlinks the repository.
    pub repo_name: Option<String>,
    pub auto_status_enabled: Option<bool>,
    pub auto_sync_issues: Option<bool>,
    pub stale_days: Option<String>,
}

/// Rejection of a [`ProjectEdit`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EditError {
    #[error(transparent)]
    UnknownVariant(#[from] UnknownVariant),

    #[error("invalid repository '{0}', expected owner/repo")]
    InvalidRepository(String),
}

impl ProjectEdit {
    /// Applies the edit to `project` in place. Nothing is modified when an
    /// error is returned.
    pub fn apply(&self, project: &mut Project) -> Result<(), EditError> {
        let status = self
            .status
            .as_deref()
            .map(str::parse::<ProjectStatus>)
            .transpose()?;
        let risk = self
            .risk
            .as_deref()
            .map(str::parse::<RiskLevel>)
            .transpose()?;
        let repo_name = match self.repo_name.as_deref().map(str::trim) {
            None => project.repo_name.clone(),
            Some("") => None,
            Some(raw) => Some(
                RepositoryId::new(raw).ok_or_else(|| EditError::InvalidRepository(raw.into()))?,
            ),
        };

        if let Some(status) = status {
            project.status = status;
        }
        if let Some(risk) = risk {
            project.risk = risk;
        }
        if let Some(summary) = &self.summary {
            project.summary.clone_from(summary);
        }
        if let Some(next_task) = &self.next_task {
            project.next_task.clone_from(next_task);
        }
        if let Some(description) = &self.description {
            project.description.clone_from(description);
        }
        project.repo_name = repo_name;
        if let Some(enabled) = self.auto_status_enabled {
            project.automation.auto_status_enabled = enabled;
        }
        if let Some(enabled) = self.auto_sync_issues {
            project.automation.auto_sync_issues = enabled;
        }
        if let Some(raw) = &self.stale_days {
            project.automation.apply_stale_days(raw);
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Task
// ---------------------------------------------------------------------------

/// A unit of work inside a project.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    pub id: TaskId,
    pub project_id: ProjectId,
    pub title: String,
    pub description: String,
    pub status: TaskStatus,
    pub priority: TaskPriority,
    pub due_date: Option<NaiveDate>,
    /// The GitHub issue this task mirrors, when it was created by issue sync.
    pub source_issue: Option<IssueNumber>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl Task {
    /// A task is urgent when its priority is `URGENT` or it is due on or
    /// before `today`.
    pub fn is_urgent(&self, today: NaiveDate) -> bool {
        self.priority == TaskPriority::Urgent || self.due_date.is_some_and(|due| due <= today)
    }

    pub fn is_done(&self) -> bool {
        self.status == TaskStatus::Done
    }
}

/// Input for creating a task.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewTask {
    pub project_id: ProjectId,
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub status: TaskStatus,
    #[serde(default)]
    pub priority: TaskPriority,
    #[serde(default)]
    pub due_date: Option<NaiveDate>,
    #[serde(default)]
    pub source_issue: Option<IssueNumber>,
}

impl NewTask {
    pub fn new(project_id: ProjectId, title: impl Into<String>) -> Self {
        Self {
            project_id,
            title: title.into(),
            description: String::new(),
            status: TaskStatus::default(),
            priority: TaskPriority::default(),
            due_date: None,
            source_issue: None,
        }
    }
}

/// Text that correlates a task title with a GitHub issue.
///
/// Tasks created by issue sync are titled `"GH Issue #<n>: <title>"`; any task
/// whose title contains this marker is treated as mirroring issue `n`. The
/// match is a plain substring test, so `"GH Issue #1"` also matches a task for
/// issue 12.
pub fn issue_marker(number: IssueNumber) -> String {
    format!("GH Issue #{number}")
}

impl Task {
    /// Whether this task mirrors `issue`, either through its recorded source
    /// issue or through the title marker.
    pub fn mirrors_issue(&self, issue: IssueNumber) -> bool {
        self.source_issue == Some(issue) || self.title.contains(&issue_marker(issue))
    }
}

// ---------------------------------------------------------------------------
// Link
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Link {
    pub id: LinkId,
    pub project_id: ProjectId,
    pub title: String,
    pub url: String,
    pub kind: LinkKind,
    pub created_at: Timestamp,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewLink {
    pub project_id: ProjectId,
    pub title: String,
    pub url: String,
    #[serde(default)]
    pub kind: LinkKind,
}

// ---------------------------------------------------------------------------
// LogEntry
// ---------------------------------------------------------------------------

/// One immutable line of a project's audit trail.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogEntry {
    pub id: LogEntryId,
    pub project_id: ProjectId,
    pub message: String,
    pub timestamp: Timestamp,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn project() -> Project {
        Project {
            id: ProjectId::new(1),
            name: "Website".into(),
            description: String::new(),
            status: ProjectStatus::Planning,
            risk: RiskLevel::Low,
            summary: String::new(),
            next_task: String::new(),
            repo_name: RepositoryId::new("fmu/website"),
            automation: AutomationConfig::default(),
            created_at: Timestamp::now(),
            updated_at: Timestamp::now(),
        }
    }

    fn task(title: &str, source_issue: Option<u64>) -> Task {
        Task {
            id: TaskId::new(1),
            project_id: ProjectId::new(1),
            title: title.into(),
            description: String::new(),
            status: TaskStatus::Todo,
            priority: TaskPriority::Medium,
            due_date: None,
            source_issue: source_issue.map(IssueNumber::new),
            created_at: Timestamp::now(),
            updated_at: Timestamp::now(),
        }
    }

    #[test]
    fn edit_applies_only_present_fields() {
        let mut p = project();
        let edit = ProjectEdit {
            status: Some("blocked".into()),
            summary: Some("waiting on vendor".into()),
            ..ProjectEdit::default()
        };
        edit.apply(&mut p).unwrap();
        assert_eq!(p.status, ProjectStatus::Blocked);
        assert_eq!(p.risk, RiskLevel::Low);
        assert_eq!(p.summary, "waiting on vendor");
        assert_eq!(p.repo_name.as_ref().map(RepositoryId::as_str), Some("fmu/website"));
    }

    #[test]
    fn edit_rejects_unknown_status_without_partial_update() {
        let mut p = project();
        let edit = ProjectEdit {
            status: Some("ALMOST_DONE".into()),
            summary: Some("changed".into()),
            ..ProjectEdit::default()
        };
        assert!(matches!(edit.apply(&mut p), Err(EditError::UnknownVariant(_))));
        assert_eq!(p.summary, "");
        assert_eq!(p.status, ProjectStatus::Planning);
    }

    #[test]
    fn edit_ignores_bad_stale_days() {
        let mut p = project();
        p.automation.stale_days = 30;
        let edit = ProjectEdit {
            stale_days: Some("a month".into()),
            auto_status_enabled: Some(true),
            ..ProjectEdit::default()
        };
        edit.apply(&mut p).unwrap();
        assert_eq!(p.automation.stale_days, 30);
        assert!(p.automation.auto_status_enabled);
    }

    #[test]
    fn empty_repo_name_unlinks() {
        let mut p = project();
        let edit = ProjectEdit {
            repo_name: Some(String::new()),
            ..ProjectEdit::default()
        };
        edit.apply(&mut p).unwrap();
        assert!(p.repo_name.is_none());
        assert!(!p.derives_status());
    }

    #[test]
    fn urgency_from_priority_or_due_date() {
        let today = NaiveDate::from_ymd_opt(2024, 5, 10).unwrap();
        let mut t = task("ship it", None);
        assert!(!t.is_urgent(today));

        t.due_date = NaiveDate::from_ymd_opt(2024, 5, 10);
        assert!(t.is_urgent(today));

        t.due_date = NaiveDate::from_ymd_opt(2024, 5, 11);
        assert!(!t.is_urgent(today));

        t.priority = TaskPriority::Urgent;
        assert!(t.is_urgent(today));
    }

    #[test]
    fn issue_correlation_uses_source_or_title_substring() {
        let n = IssueNumber::new(4);
        assert!(task("GH Issue #4: crash on save", None).mirrors_issue(n));
        assert!(task("renamed by hand", Some(4)).mirrors_issue(n));
        assert!(task("GH Issue #42: other", None).mirrors_issue(n));
        assert!(!task("Issue 4", None).mirrors_issue(n));
    }
}
