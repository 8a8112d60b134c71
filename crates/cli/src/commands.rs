//! Subcommand definitions and handlers.
//!
//! Every handler except `serve` works against the [`ProjectStore`] and
//! [`ActivityGateway`] ports only, and writes to a caller-supplied writer, so
//! the same code runs against SQLite in production and in-memory fakes in
//! tests.

use std::io::Write;
use std::sync::Arc;

use anyhow::{anyhow, bail, Context as _};
use chrono::{NaiveDate, Utc};
use clap::{Args, Subcommand};
use tracker::dashboard::{self, ProjectDetail};
use tracker::{
    ActivityGateway, AutomationConfig, LinkKind, NewLink, NewProject, NewTask, Project, ProjectEdit,
    ProjectId, ProjectStore, RepositoryId, StatusEngine, TaskId, TaskPriority, DEFAULT_STALE_DAYS,
};

use crate::output::{kv, render, section, OutputMode};

// ---------------------------------------------------------------------------
// Command line
// ---------------------------------------------------------------------------

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run the webhook receiver.
    Serve(ServeArgs),

    /// Create, inspect, edit and delete projects.
    #[command(subcommand)]
    Project(ProjectCommand),

    /// Add and toggle tasks.
    #[command(subcommand)]
    Task(TaskCommand),

    /// Attach links to a project.
    #[command(subcommand)]
    Link(LinkCommand),

    /// Append manual log entries.
    #[command(subcommand)]
    Log(LogCommand),

    /// Recompute a project's status and risk from GitHub now.
    Update {
        /// Project id or name.
        project: String,
    },

    /// Urgent, high-priority and overdue tasks across all projects.
    Today {
        /// Evaluate as of this date (YYYY-MM-DD) instead of today.
        #[arg(long)]
        date: Option<NaiveDate>,
    },

    /// Open pull requests across every repo-linked project.
    ReviewQueue,
}

#[derive(Args, Debug)]
pub struct ServeArgs {
    /// Override the configured listen address.
    #[arg(long)]
    pub listen: Option<std::net::SocketAddr>,
}

#[derive(Subcommand, Debug)]
pub enum ProjectCommand {
    /// Create a project.
    Add(ProjectAddArgs),
    /// List projects, most recently updated first.
    List,
    /// Show a project with its tasks, links, recent log and live activity.
    Show {
        /// Project id or name.
        project: String,
    },
    /// Edit a project.
    Edit(ProjectEditArgs),
    /// Delete a project with all its tasks, links and log entries.
    Delete {
        /// Project id or name.
        project: String,
    },
}

#[derive(Args, Debug)]
pub struct ProjectAddArgs {
    pub name: String,
    #[arg(long, default_value = "")]
    pub description: String,
    /// GitHub repository as owner/name.
    #[arg(long)]
    pub repo: Option<String>,
    /// Derive status and risk from GitHub activity.
    #[arg(long)]
    pub auto_status: bool,
    /// Mirror issue events into tasks.
    #[arg(long)]
    pub auto_sync: bool,
    #[arg(long, default_value_t = DEFAULT_STALE_DAYS)]
    pub stale_days: u32,
}

#[derive(Args, Debug)]
pub struct ProjectEditArgs {
    /// Project id or name.
    pub project: String,
    #[arg(long)]
    pub status: Option<String>,
    #[arg(long)]
    pub risk: Option<String>,
    #[arg(long)]
    pub summary: Option<String>,
    #[arg(long)]
    pub next_task: Option<String>,
    #[arg(long)]
    pub description: Option<String>,
    /// owner/name, or an empty string to unlink.
    #[arg(long)]
    pub repo: Option<String>,
    #[arg(long)]
    pub auto_status: Option<bool>,
    #[arg(long)]
    pub auto_sync: Option<bool>,
    /// Whole days; anything else is ignored.
    #[arg(long)]
    pub stale_days: Option<String>,
}

impl ProjectEditArgs {
    fn to_edit(&self) -> ProjectEdit {
        ProjectEdit {
            status: self.status.clone(),
            risk: self.risk.clone(),
            summary: self.summary.clone(),
            next_task: self.next_task.clone(),
            description: self.description.clone(),
            repo_name: self.repo.clone(),
            auto_status_enabled: self.auto_status,
            auto_sync_issues: self.auto_sync,
            stale_days: self.stale_days.clone(),
        }
    }
}

#[derive(Subcommand, Debug)]
pub enum TaskCommand {
    /// Add a task to a project.
    Add(TaskAddArgs),
    /// Advance a task: TODO, IN_PROGRESS, DONE, then back to TODO.
    Toggle {
        /// Task id.
        task: i64,
    },
}

#[derive(Args, Debug)]
pub struct TaskAddArgs {
    /// Project id or name.
    pub project: String,
    pub title: String,
    #[arg(long, default_value = "")]
    pub description: String,
    #[arg(long, default_value = "MEDIUM")]
    pub priority: TaskPriority,
    /// Due date (YYYY-MM-DD).
    #[arg(long)]
    pub due: Option<NaiveDate>,
}

#[derive(Subcommand, Debug)]
pub enum LinkCommand {
    /// Attach a link to a project.
    Add {
        /// Project id or name.
        project: String,
        title: String,
        url: String,
        #[arg(long, default_value = "OTHER")]
        kind: LinkKind,
    },
}

#[derive(Subcommand, Debug)]
pub enum LogCommand {
    /// Append a manual entry to a project's log.
    Add {
        /// Project id or name.
        project: String,
        message: String,
    },
}

// ---------------------------------------------------------------------------
// Execution
// ---------------------------------------------------------------------------

/// Ports and output settings shared by the handlers.
pub struct Context {
    pub store: Arc<dyn ProjectStore>,
    pub gateway: Arc<dyn ActivityGateway>,
    pub mode: OutputMode,
}

/// Finds a project by numeric id, falling back to its exact name.
pub async fn resolve_project(store: &dyn ProjectStore, key: &str) -> anyhow::Result<Project> {
    if let Ok(id) = key.parse::<i64>() {
        if let Some(project) = store.project(ProjectId::new(id)).await? {
            return Ok(project);
        }
    }
    store
        .project_by_name(key)
        .await?
        .ok_or_else(|| anyhow!("no project with id or name '{key}'"))
}

fn parse_repo(raw: &str) -> anyhow::Result<RepositoryId> {
    RepositoryId::new(raw).ok_or_else(|| anyhow!("invalid repository '{raw}', expected owner/repo"))
}

/// Runs every subcommand except `serve`.
pub async fn execute(command: Command, ctx: &Context, out: &mut dyn Write) -> anyhow::Result<()> {
    let store = ctx.store.as_ref();
    let gateway = ctx.gateway.as_ref();
    let mode = ctx.mode;

    match command {
        Command::Serve(_) => bail!("serve is handled by the entry point"),

        Command::Project(ProjectCommand::Add(args)) => {
            let repo_name = args.repo.as_deref().map(parse_repo).transpose()?;
            let project = store
                .create_project(NewProject {
                    description: args.description,
                    repo_name,
                    automation: AutomationConfig {
                        auto_status_enabled: args.auto_status,
                        auto_sync_issues: args.auto_sync,
                        stale_days: args.stale_days,
                    },
                    ..NewProject::named(args.name)
                })
                .await?;
            store.append_log(project.id, "Project created").await?;
            render(mode, out, &project, |p, w| {
                writeln!(w, "Created project #{} {}", p.id, p.name)
            })?;
        }

        Command::Project(ProjectCommand::List) => {
            let projects = store.list_projects().await?;
            render(mode, out, &projects, |projects, w| {
                for p in projects {
                    writeln!(
                        w,
                        "#{:<4} {:<28} {:<12} {:<7} {}",
                        p.id.as_i64(),
                        p.name,
                        p.status,
                        p.risk,
                        p.repo_name.as_ref().map_or("-", RepositoryId::as_str)
                    )?;
                }
                Ok(())
            })?;
        }

        Command::Project(ProjectCommand::Show { project }) => {
            let id = resolve_project(store, &project).await?.id;
            let detail = dashboard::project_detail(store, gateway, id).await?;
            render(mode, out, &detail, write_detail)?;
        }

        Command::Project(ProjectCommand::Edit(args)) => {
            let id = resolve_project(store, &args.project).await?.id;
            let project = dashboard::edit_project(store, id, &args.to_edit()).await?;
            render(mode, out, &project, |p, w| {
                writeln!(w, "Updated project #{} {} ({}, risk {})", p.id, p.name, p.status, p.risk)
            })?;
        }

        Command::Project(ProjectCommand::Delete { project }) => {
            let project = resolve_project(store, &project).await?;
            let deleted = store.delete_project(project.id).await?;
            let result = serde_json::json!({ "project": project.id, "deleted": deleted });
            render(mode, out, &result, |_, w| {
                writeln!(w, "Deleted project #{} {}", project.id, project.name)
            })?;
        }

        Command::Task(TaskCommand::Add(args)) => {
            let project = resolve_project(store, &args.project).await?;
            let task = store
                .create_task(NewTask {
                    description: args.description,
                    priority: args.priority,
                    due_date: args.due,
                    ..NewTask::new(project.id, args.title)
                })
                .await?;
            render(mode, out, &task, |t, w| {
                writeln!(w, "Created task #{} in {}: {}", t.id, project.name, t.title)
            })?;
        }

        Command::Task(TaskCommand::Toggle { task }) => {
            let task = dashboard::toggle_task(store, TaskId::new(task)).await?;
            render(mode, out, &task, |t, w| {
                writeln!(w, "Task #{} is now {}", t.id, t.status)
            })?;
        }

        Command::Link(LinkCommand::Add {
            project,
            title,
            url,
            kind,
        }) => {
            let project = resolve_project(store, &project).await?;
            let link = store
                .add_link(NewLink {
                    project_id: project.id,
                    title,
                    url,
                    kind,
                })
                .await?;
            render(mode, out, &link, |l, w| {
                writeln!(w, "Added {} link '{}' to {}", l.kind, l.title, project.name)
            })?;
        }

        Command::Log(LogCommand::Add { project, message }) => {
            let project = resolve_project(store, &project).await?;
            let entry = store.append_log(project.id, &message).await?;
            render(mode, out, &entry, |e, w| {
                writeln!(w, "[{}] {}", e.timestamp, e.message)
            })?;
        }

        Command::Update { project } => {
            let id = resolve_project(store, &project).await?.id;
            let engine = StatusEngine::new(Arc::clone(&ctx.gateway), Arc::clone(&ctx.store));
            let report = engine
                .trigger_update(id)
                .await
                .with_context(|| format!("cannot update project '{project}'"))?;
            render(mode, out, &report, |r, w| {
                let verb = if r.changed { "updated" } else { "unchanged" };
                writeln!(w, "Project #{} {verb}: status {}, risk {}", r.project, r.status, r.risk)
            })?;
        }

        Command::Today { date } => {
            let date = date.unwrap_or_else(|| Utc::now().date_naive());
            let agenda = dashboard::today(store, date).await?;
            render(mode, out, &agenda, |items, w| {
                if items.is_empty() {
                    return writeln!(w, "Nothing pressing.");
                }
                for item in items {
                    let due = item
                        .task
                        .due_date
                        .map_or_else(String::new, |d| format!(" (due {d})"));
                    writeln!(
                        w,
                        "[{}] {}: {}{due}",
                        item.task.priority, item.project_name, item.task.title
                    )?;
                }
                Ok(())
            })?;
        }

        Command::ReviewQueue => {
            let queue = dashboard::review_queue(store, gateway).await?;
            render(mode, out, &queue, |queue, w| {
                if queue.is_empty() {
                    return writeln!(w, "No open pull requests.");
                }
                for q in queue {
                    let pr = &q.pull_request;
                    writeln!(
                        w,
                        "{}: #{} {}{} by {}",
                        q.project_name,
                        pr.number,
                        pr.title,
                        if pr.draft { " [draft]" } else { "" },
                        pr.user.as_deref().unwrap_or("unknown")
                    )?;
                }
                Ok(())
            })?;
        }
    }
    Ok(())
}

fn write_detail(detail: &ProjectDetail, w: &mut dyn Write) -> std::io::Result<()> {
    let p = &detail.project;
    writeln!(w, "#{} {}", p.id, p.name)?;
    kv(w, "Status", p.status.as_str())?;
    kv(w, "Risk", p.risk.as_str())?;
    kv(w, "Repository", p.repo_name.as_ref().map_or("-", RepositoryId::as_str))?;
    if !p.summary.is_empty() {
        kv(w, "Summary", &p.summary)?;
    }
    if !p.next_task.is_empty() {
        kv(w, "Next task", &p.next_task)?;
    }
    kv(
        w,
        "Automation",
        format!(
            "status={} sync={} stale_days={}",
            p.automation.auto_status_enabled, p.automation.auto_sync_issues, p.automation.stale_days
        ),
    )?;

    section(w, &format!("Tasks ({} open)", detail.open_tasks))?;
    for t in &detail.tasks {
        writeln!(w, "#{:<4} [{}] {} ({})", t.id.as_i64(), t.status, t.title, t.priority)?;
    }

    if !detail.links.is_empty() {
        section(w, "Links")?;
        for l in &detail.links {
            writeln!(w, "{:<10} {} <{}>", l.kind, l.title, l.url)?;
        }
    }

    section(w, "Log")?;
    for e in &detail.logs {
        writeln!(w, "[{}] {}", e.timestamp, e.message)?;
    }

    if let Some(activity) = &detail.activity {
        section(w, "Open pull requests")?;
        for pr in &activity.pull_requests {
            let draft = if pr.draft { " [draft]" } else { "" };
            writeln!(w, "#{} {}{draft}", pr.number, pr.title)?;
        }
        section(w, "Recent commits")?;
        for c in &activity.commits {
            writeln!(w, "{} {}", c.sha, c.message)?;
        }
        section(w, "Open issues")?;
        for i in &activity.issues {
            writeln!(w, "#{} {}", i.number, i.title)?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests;
