//! Reconciliation engine: GitHub activity in, project status and risk out.
//!
//! The decision rules are pure functions of a project snapshot and freshly
//! fetched activity ([`derive_status`], [`derive_risk`], [`status_change`],
//! [`risk_change`]). [`StatusEngine`] wraps them with the fetch-and-persist
//! steps, and is shared by the manual trigger and the webhook path so both
//! reach identical decisions.
//!
//! ## Status rules, in order
//!
//! 1. No repository, or `auto_status_enabled` off: nothing happens.
//! 2. Any open PR: `BLOCKED` if any of them is a draft, else `IN_PROGRESS`.
//! 3. No open PRs and the newest commit is older than `stale_days`: `STALE`.
//! 4. Otherwise undetermined; the current status is kept.
//!
//! ## Risk rules
//!
//! `HIGH` when any open issue carries a critical label, else `MEDIUM` when
//! more than five issues are open, else `LOW`.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument};

use crate::{
    ActivityGateway, Commit, Issue, ItemState, Project, ProjectId, ProjectStatus, ProjectStore,
    PullRequest, RiskLevel, Timestamp, TrackerError,
};

/// Labels that escalate risk straight to `HIGH` (compared case-insensitively).
pub const CRITICAL_LABELS: &[&str] = &["critical", "urgent", "blocker", "security"];

/// Open-issue count above which risk is at least `MEDIUM`.
pub const BUSY_ISSUE_THRESHOLD: usize = 5;

/// Commits fetched for the staleness check.
pub const COMMIT_WINDOW: u32 = 10;

// ---------------------------------------------------------------------------
// Pure decision rules
// ---------------------------------------------------------------------------

/// Derives a status from open PRs and recent commits (newest first).
///
/// Returns `None` when the activity does not determine a status. A commit
/// whose date is missing or malformed carries no signal.
pub fn derive_status(
    open_prs: &[PullRequest],
    commits: &[Commit],
    stale_days: u32,
    now: Timestamp,
) -> Option<ProjectStatus> {
    if !open_prs.is_empty() {
        return if open_prs.iter().any(|pr| pr.draft) {
            Some(ProjectStatus::Blocked)
        } else {
            Some(ProjectStatus::InProgress)
        };
    }

    let last_commit = commits
        .first()
        .and_then(|c| c.date.as_deref())
        .and_then(Timestamp::parse)?;
    if last_commit.whole_days_until(now) > i64::from(stale_days) {
        Some(ProjectStatus::Stale)
    } else {
        None
    }
}

/// Whether `label` is one of [`CRITICAL_LABELS`].
pub fn is_critical_label(label: &str) -> bool {
    CRITICAL_LABELS.iter().any(|c| c.eq_ignore_ascii_case(label))
}

/// Derives a risk level from the open issues of a repository.
pub fn derive_risk(open_issues: &[Issue]) -> RiskLevel {
    let critical = open_issues
        .iter()
        .filter(|issue| issue.labels.iter().any(|l| is_critical_label(l)))
        .count();
    if critical > 0 {
        RiskLevel::High
    } else if open_issues.len() > BUSY_ISSUE_THRESHOLD {
        RiskLevel::Medium
    } else {
        RiskLevel::Low
    }
}

/// The status `project` should move to, or `None` when it should stay put
/// (automation off, undetermined, or already in that status).
pub fn status_change(
    project: &Project,
    open_prs: &[PullRequest],
    commits: &[Commit],
    now: Timestamp,
) -> Option<ProjectStatus> {
    if !project.derives_status() {
        return None;
    }
    derive_status(open_prs, commits, project.automation.stale_days, now)
        .filter(|next| *next != project.status)
}

/// The risk level `project` should move to, or `None` when it should stay.
pub fn risk_change(project: &Project, open_issues: &[Issue]) -> Option<RiskLevel> {
    if !project.derives_status() {
        return None;
    }
    Some(derive_risk(open_issues)).filter(|next| *next != project.risk)
}

// ---------------------------------------------------------------------------
// Applying engine
// ---------------------------------------------------------------------------

/// Result of a manual update.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateReport {
    pub project: ProjectId,
    pub status: ProjectStatus,
    pub risk: RiskLevel,
    /// Whether status or risk changed.
    pub changed: bool,
}

/// Fetches activity, applies the decision rules and persists changes.
///
/// Every method takes the caller's project snapshot and updates it in place
/// when something is written, so a handler can run several steps on the same
/// snapshot.
#[derive(Clone)]
pub struct StatusEngine {
    gateway: Arc<dyn ActivityGateway>,
    store: Arc<dyn ProjectStore>,
}

impl StatusEngine {
    pub fn new(gateway: Arc<dyn ActivityGateway>, store: Arc<dyn ProjectStore>) -> Self {
        Self { gateway, store }
    }

    /// Recomputes status from open PRs and recent commits. Returns whether the
    /// status changed.
    #[instrument(skip_all, fields(project = %project.id))]
    pub async fn update_status(&self, project: &mut Project) -> Result<bool, TrackerError> {
        let Some(repo) = project.repository().filter(|_| project.derives_status()) else {
            return Ok(false);
        };
        let prs = self.gateway.fetch_pull_requests(repo, ItemState::Open).await;
        let commits = self.gateway.fetch_commits(repo, COMMIT_WINDOW).await;

        let Some(next) = status_change(project, &prs, &commits, Timestamp::now()) else {
            debug!(status = %project.status, open_prs = prs.len(), "status unchanged");
            return Ok(false);
        };
        self.store.set_project_status(project.id, next).await?;
        info!(from = %project.status, to = %next, "project status updated");
        project.status = next;
        Ok(true)
    }

    /// Recomputes risk from open issues. Returns whether the risk changed.
    #[instrument(skip_all, fields(project = %project.id))]
    pub async fn update_risk(&self, project: &mut Project) -> Result<bool, TrackerError> {
        let Some(repo) = project.repository().filter(|_| project.derives_status()) else {
            return Ok(false);
        };
        let issues = self.gateway.fetch_issues(repo, ItemState::Open).await;

        let Some(next) = risk_change(project, &issues) else {
            debug!(risk = %project.risk, open_issues = issues.len(), "risk unchanged");
            return Ok(false);
        };
        self.store.set_project_risk(project.id, next).await?;
        info!(from = %project.risk, to = %next, "project risk updated");
        project.risk = next;
        Ok(true)
    }

    /// Runs both updates. Risk is always attempted, even when status changed.
    pub async fn auto_update(&self, project: &mut Project) -> Result<bool, TrackerError> {
        let status_updated = self.update_status(project).await?;
        let risk_updated = self.update_risk(project).await?;
        Ok(status_updated || risk_updated)
    }

    /// Manual trigger: loads the project, runs [`StatusEngine::auto_update`]
    /// and reports the resulting state.
    ///
    /// Fails with [`TrackerError::NoRepository`] when the project is not
    /// repo-linked.
    #[instrument(skip(self))]
    pub async fn trigger_update(&self, id: ProjectId) -> Result<UpdateReport, TrackerError> {
        let mut project = self
            .store
            .project(id)
            .await?
            .ok_or(TrackerError::ProjectNotFound(id))?;
        if project.repo_name.is_none() {
            return Err(TrackerError::NoRepository { project: id });
        }
        let changed = self.auto_update(&mut project).await?;
        Ok(UpdateReport {
            project: id,
            status: project.status,
            risk: project.risk,
            changed,
        })
    }

    /// Forces a project into `BLOCKED`, bypassing the derivation rules.
    ///
    /// Used for failed CI runs. Only acts when `auto_status_enabled` is set;
    /// returns whether a write happened.
    #[instrument(skip_all, fields(project = %project.id))]
    pub async fn force_blocked(&self, project: &mut Project) -> Result<bool, TrackerError> {
        if !project.automation.auto_status_enabled {
            return Ok(false);
        }
        self.store
            .set_project_status(project.id, ProjectStatus::Blocked)
            .await?;
        info!(from = %project.status, "project forced to BLOCKED");
        project.status = ProjectStatus::Blocked;
        Ok(true)
    }
}
