//! Read models and manual operations behind the dashboard pages.

use std::collections::HashMap;

use chrono::NaiveDate;
use serde::Serialize;

use crate::{
    ActivityGateway, Commit, Issue, ItemState, Link, LogEntry, Project, ProjectEdit, ProjectId,
    ProjectStore, PullRequest, Task, TaskId, TaskPriority, TrackerError,
};

/// Log entries shown on a project page.
pub const DETAIL_LOG_LIMIT: usize = 10;

/// Commits shown on a project page.
pub const DETAIL_COMMIT_LIMIT: u32 = 5;

/// Live GitHub activity shown next to a repo-linked project.
#[derive(Debug, Clone, Default, Serialize)]
pub struct LiveActivity {
    pub pull_requests: Vec<PullRequest>,
    pub commits: Vec<Commit>,
    pub issues: Vec<Issue>,
}

/// Everything the project page shows.
#[derive(Debug, Clone, Serialize)]
pub struct ProjectDetail {
    pub project: Project,
    pub open_tasks: usize,
    pub tasks: Vec<Task>,
    pub links: Vec<Link>,
    pub logs: Vec<LogEntry>,
    /// `None` when the project is not repo-linked.
    pub activity: Option<LiveActivity>,
}

pub async fn project_detail(
    store: &dyn ProjectStore,
    gateway: &dyn ActivityGateway,
    id: ProjectId,
) -> Result<ProjectDetail, TrackerError> {
    let project = store
        .project(id)
        .await?
        .ok_or(TrackerError::ProjectNotFound(id))?;
    let tasks = store.tasks_for_project(id).await?;
    let links = store.links(id).await?;
    let logs = store.recent_logs(id, DETAIL_LOG_LIMIT).await?;

    let activity = match project.repository() {
        Some(repo) => Some(LiveActivity {
            pull_requests: gateway.fetch_pull_requests(repo, ItemState::Open).await,
            commits: gateway.fetch_commits(repo, DETAIL_COMMIT_LIMIT).await,
            issues: gateway.fetch_issues(repo, ItemState::Open).await,
        }),
        None => None,
    };

    Ok(ProjectDetail {
        open_tasks: tasks.iter().filter(|t| !t.is_done()).count(),
        project,
        tasks,
        links,
        logs,
        activity,
    })
}

/// Applies a manual edit and persists it.
pub async fn edit_project(
    store: &dyn ProjectStore,
    id: ProjectId,
    edit: &ProjectEdit,
) -> Result<Project, TrackerError> {
    let mut project = store
        .project(id)
        .await?
        .ok_or(TrackerError::ProjectNotFound(id))?;
    edit.apply(&mut project)?;
    Ok(store.save_project(&project).await?)
}

/// Advances a task one step through the manual toggle cycle.
pub async fn toggle_task(store: &dyn ProjectStore, id: TaskId) -> Result<Task, TrackerError> {
    let mut task = store.task(id).await?.ok_or(TrackerError::TaskNotFound(id))?;
    task.status = task.status.toggled();
    store.set_task_status(id, task.status).await?;
    Ok(task)
}

/// A task on the "today" page, with the name of its project.
#[derive(Debug, Clone, Serialize)]
pub struct AgendaItem {
    pub project_name: String,
    pub task: Task,
}

/// Tasks that need attention today.
///
/// Includes every not-done task that is `URGENT` or `HIGH` priority or is
/// overdue (due strictly before `today`), most pressing first, then by due
/// date with undated tasks last.
pub async fn today(
    store: &dyn ProjectStore,
    today: NaiveDate,
) -> Result<Vec<AgendaItem>, TrackerError> {
    let names: HashMap<ProjectId, String> = store
        .list_projects()
        .await?
        .into_iter()
        .map(|p| (p.id, p.name))
        .collect();

    let mut tasks: Vec<Task> = store
        .open_tasks()
        .await?
        .into_iter()
        .filter(|t| {
            t.priority.rank() >= TaskPriority::High.rank() || t.due_date.is_some_and(|d| d < today)
        })
        .collect();
    tasks.sort_by(|a, b| {
        b.priority
            .rank()
            .cmp(&a.priority.rank())
            .then_with(|| match (a.due_date, b.due_date) {
                (Some(x), Some(y)) => x.cmp(&y),
                (Some(_), None) => std::cmp::Ordering::Less,
                (None, Some(_)) => std::cmp::Ordering::Greater,
                (None, None) => std::cmp::Ordering::Equal,
            })
    });

    Ok(tasks
        .into_iter()
        .map(|task| AgendaItem {
            project_name: names.get(&task.project_id).cloned().unwrap_or_default(),
            task,
        })
        .collect())
}

/// An open pull request awaiting review, with the project it belongs to.
#[derive(Debug, Clone, Serialize)]
pub struct QueuedPullRequest {
    pub project_id: ProjectId,
    pub project_name: String,
    pub pull_request: PullRequest,
}

/// Open pull requests across every repo-linked project, most recently
/// updated first.
pub async fn review_queue(
    store: &dyn ProjectStore,
    gateway: &dyn ActivityGateway,
) -> Result<Vec<QueuedPullRequest>, TrackerError> {
    let mut queue = Vec::new();
    for project in store.list_projects().await? {
        let Some(repo) = project.repository() else {
            continue;
        };
        for pull_request in gateway.fetch_pull_requests(repo, ItemState::Open).await {
            queue.push(QueuedPullRequest {
                project_id: project.id,
                project_name: project.name.clone(),
                pull_request,
            });
        }
    }
    // GitHub timestamps are uniform ISO 8601, so text order is time order.
    queue.sort_by(|a, b| {
        b.pull_request
            .updated_at
            .as_deref()
            .unwrap_or("")
            .cmp(a.pull_request.updated_at.as_deref().unwrap_or(""))
    });
    Ok(queue)
}
