//! In-memory [`ProjectStore`].
//!
//! Backs tests and `--ephemeral` runs. A single mutex guards all tables, so
//! every trait call is atomic.

use std::sync::{Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;

use crate::store::task_order;
use crate::{
    IssueNumber, Link, LinkId, LogEntry, LogEntryId, NewLink, NewProject, NewTask, Project,
    ProjectId, ProjectStatus, ProjectStore, RepositoryId, RiskLevel, StoreError, Task, TaskId,
    TaskStatus, Timestamp,
};

#[derive(Debug, Default)]
struct Tables {
    next_id: i64,
    projects: Vec<Project>,
    tasks: Vec<Task>,
    links: Vec<Link>,
    logs: Vec<LogEntry>,
}

impl Tables {
    fn allocate(&mut self) -> i64 {
        self.next_id += 1;
        self.next_id
    }

    fn project_mut(&mut self, id: ProjectId) -> Result<&mut Project, StoreError> {
        self.projects
            .iter_mut()
            .find(|p| p.id == id)
            .ok_or(StoreError::NotFound {
                kind: "project",
                id: id.as_i64(),
            })
    }

    fn require_project(&self, id: ProjectId) -> Result<(), StoreError> {
        if self.projects.iter().any(|p| p.id == id) {
            Ok(())
        } else {
            Err(StoreError::NotFound {
                kind: "project",
                id: id.as_i64(),
            })
        }
    }
}

/// A [`ProjectStore`] held entirely in process memory.
#[derive(Debug, Default)]
pub struct MemoryStore {
    tables: Mutex<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Tables> {
        self.tables.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[async_trait]
impl ProjectStore for MemoryStore {
    async fn create_project(&self, project: NewProject) -> Result<Project, StoreError> {
        let mut tables = self.lock();
        if tables.projects.iter().any(|p| p.name == project.name) {
            return Err(StoreError::Conflict(format!(
                "project name '{}' already exists",
                project.name
            )));
        }
        let now = Timestamp::now();
        let created = Project {
            id: ProjectId::new(tables.allocate()),
            name: project.name,
            description: project.description,
            status: project.status,
            risk: project.risk,
            summary: project.summary,
            next_task: project.next_task,
            repo_name: project.repo_name,
            automation: project.automation,
            created_at: now,
            updated_at: now,
        };
        tables.projects.push(created.clone());
        Ok(created)
    }

    async fn project(&self, id: ProjectId) -> Result<Option<Project>, StoreError> {
        Ok(self.lock().projects.iter().find(|p| p.id == id).cloned())
    }

    async fn project_by_name(&self, name: &str) -> Result<Option<Project>, StoreError> {
        Ok(self.lock().projects.iter().find(|p| p.name == name).cloned())
    }

    async fn project_by_repo(&self, repo: &RepositoryId) -> Result<Option<Project>, StoreError> {
        Ok(self
            .lock()
            .projects
            .iter()
            .filter(|p| p.repo_name.as_ref() == Some(repo))
            .min_by_key(|p| p.id)
            .cloned())
    }

    async fn list_projects(&self) -> Result<Vec<Project>, StoreError> {
        let mut projects = self.lock().projects.clone();
        projects.sort_by(|a, b| b.updated_at.cmp(&a.updated_at).then(b.id.cmp(&a.id)));
        Ok(projects)
    }

    async fn save_project(&self, project: &Project) -> Result<Project, StoreError> {
        let mut tables = self.lock();
        if tables
            .projects
            .iter()
            .any(|p| p.id != project.id && p.name == project.name)
        {
            return Err(StoreError::Conflict(format!(
                "project name '{}' already exists",
                project.name
            )));
        }
        let stored = tables.project_mut(project.id)?;
        let created_at = stored.created_at;
        *stored = project.clone();
        stored.created_at = created_at;
        stored.updated_at = Timestamp::now();
        Ok(stored.clone())
    }

    async fn set_project_status(
        &self,
        id: ProjectId,
        status: ProjectStatus,
    ) -> Result<(), StoreError> {
        let mut tables = self.lock();
        let project = tables.project_mut(id)?;
        project.status = status;
        project.updated_at = Timestamp::now();
        Ok(())
    }

    async fn set_project_risk(&self, id: ProjectId, risk: RiskLevel) -> Result<(), StoreError> {
        let mut tables = self.lock();
        let project = tables.project_mut(id)?;
        project.risk = risk;
        project.updated_at = Timestamp::now();
        Ok(())
    }

    async fn delete_project(&self, id: ProjectId) -> Result<bool, StoreError> {
        let mut tables = self.lock();
        let before = tables.projects.len();
        tables.projects.retain(|p| p.id != id);
        if tables.projects.len() == before {
            return Ok(false);
        }
        tables.tasks.retain(|t| t.project_id != id);
        tables.links.retain(|l| l.project_id != id);
        tables.logs.retain(|l| l.project_id != id);
        Ok(true)
    }

    async fn create_task(&self, task: NewTask) -> Result<Task, StoreError> {
        let mut tables = self.lock();
        tables.require_project(task.project_id)?;
        let now = Timestamp::now();
        let created = Task {
            id: TaskId::new(tables.allocate()),
            project_id: task.project_id,
            title: task.title,
            description: task.description,
            status: task.status,
            priority: task.priority,
            due_date: task.due_date,
            source_issue: task.source_issue,
            created_at: now,
            updated_at: now,
        };
        tables.tasks.push(created.clone());
        Ok(created)
    }

    async fn task(&self, id: TaskId) -> Result<Option<Task>, StoreError> {
        Ok(self.lock().tasks.iter().find(|t| t.id == id).cloned())
    }

    async fn tasks_for_project(&self, project: ProjectId) -> Result<Vec<Task>, StoreError> {
        let mut tasks: Vec<Task> = self
            .lock()
            .tasks
            .iter()
            .filter(|t| t.project_id == project)
            .cloned()
            .collect();
        tasks.sort_by(task_order);
        Ok(tasks)
    }

    async fn open_tasks(&self) -> Result<Vec<Task>, StoreError> {
        Ok(self
            .lock()
            .tasks
            .iter()
            .filter(|t| !t.is_done())
            .cloned()
            .collect())
    }

    async fn set_task_status(&self, id: TaskId, status: TaskStatus) -> Result<(), StoreError> {
        let mut tables = self.lock();
        let task = tables
            .tasks
            .iter_mut()
            .find(|t| t.id == id)
            .ok_or(StoreError::NotFound {
                kind: "task",
                id: id.as_i64(),
            })?;
        task.status = status;
        task.updated_at = Timestamp::now();
        Ok(())
    }

    async fn set_issue_task_status(
        &self,
        project: ProjectId,
        issue: IssueNumber,
        status: TaskStatus,
    ) -> Result<usize, StoreError> {
        let mut tables = self.lock();
        let now = Timestamp::now();
        let mut touched = 0;
        for task in tables
            .tasks
            .iter_mut()
            .filter(|t| t.project_id == project && t.mirrors_issue(issue))
        {
            task.status = status;
            task.updated_at = now;
            touched += 1;
        }
        Ok(touched)
    }

    async fn add_link(&self, link: NewLink) -> Result<Link, StoreError> {
        let mut tables = self.lock();
        tables.require_project(link.project_id)?;
        let created = Link {
            id: LinkId::new(tables.allocate()),
            project_id: link.project_id,
            title: link.title,
            url: link.url,
            kind: link.kind,
            created_at: Timestamp::now(),
        };
        tables.links.push(created.clone());
        Ok(created)
    }

    async fn links(&self, project: ProjectId) -> Result<Vec<Link>, StoreError> {
        let mut links: Vec<Link> = self
            .lock()
            .links
            .iter()
            .filter(|l| l.project_id == project)
            .cloned()
            .collect();
        links.sort_by(|a, b| {
            a.kind
                .as_str()
                .cmp(b.kind.as_str())
                .then_with(|| a.title.cmp(&b.title))
        });
        Ok(links)
    }

    async fn append_log(&self, project: ProjectId, message: &str) -> Result<LogEntry, StoreError> {
        let mut tables = self.lock();
        tables.require_project(project)?;
        let entry = LogEntry {
            id: LogEntryId::new(tables.allocate()),
            project_id: project,
            message: message.to_string(),
            timestamp: Timestamp::now(),
        };
        tables.logs.push(entry.clone());
        Ok(entry)
    }

    async fn recent_logs(
        &self,
        project: ProjectId,
        limit: usize,
    ) -> Result<Vec<LogEntry>, StoreError> {
        let mut logs: Vec<LogEntry> = self
            .lock()
            .logs
            .iter()
            .filter(|l| l.project_id == project)
            .cloned()
            .collect();
        logs.sort_by(|a, b| b.timestamp.cmp(&a.timestamp).then(b.id.cmp(&a.id)));
        logs.truncate(limit);
        Ok(logs)
    }
}
