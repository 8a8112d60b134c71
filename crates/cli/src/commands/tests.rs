use std::sync::Arc;

use chrono::NaiveDate;
use clap::Parser;
use tracker::{
    ActivityGateway, Issue, MemoryStore, NewProject, NewTask, ProjectId, ProjectStatus,
    ProjectStore, PullRequest, RepoActivity, RepositoryId, RiskLevel, StaticGateway, TaskPriority,
    TaskStatus,
};

use super::*;

#[derive(Parser, Debug)]
struct TestCli {
    #[command(subcommand)]
    command: Command,
}

struct Fixture {
    store: Arc<MemoryStore>,
    gateway: Arc<StaticGateway>,
}

impl Fixture {
    fn new() -> Self {
        Self::with_gateway(StaticGateway::new())
    }

    fn with_gateway(gateway: StaticGateway) -> Self {
        Self {
            store: Arc::new(MemoryStore::new()),
            gateway: Arc::new(gateway),
        }
    }

    fn context(&self, mode: OutputMode) -> Context {
        let store: Arc<dyn ProjectStore> = self.store.clone();
        let gateway: Arc<dyn ActivityGateway> = self.gateway.clone();
        Context {
            store,
            gateway,
            mode,
        }
    }

    async fn run_as(&self, mode: OutputMode, args: &[&str]) -> anyhow::Result<String> {
        let argv = std::iter::once("repo-tracker").chain(args.iter().copied());
        let cli = TestCli::try_parse_from(argv)?;
        let mut out = Vec::new();
        execute(cli.command, &self.context(mode), &mut out).await?;
        Ok(String::from_utf8(out)?)
    }

    async fn run(&self, args: &[&str]) -> String {
        self.run_as(OutputMode::Human, args).await.unwrap()
    }

    async fn project(&self, name: &str, repo: Option<&str>) -> ProjectId {
        self.store
            .create_project(NewProject {
                repo_name: repo.map(|r| RepositoryId::new(r).unwrap()),
                ..NewProject::named(name)
            })
            .await
            .unwrap()
            .id
    }
}

fn repo(name: &str) -> RepositoryId {
    RepositoryId::new(name).unwrap()
}

#[tokio::test]
async fn project_add_creates_project_with_automation_and_log() {
    let fx = Fixture::new();
    let out = fx
        .run(&[
            "project",
            "add",
            "Website",
            "--repo",
            "fmu/web",
            "--auto-status",
            "--stale-days",
            "14",
        ])
        .await;
    assert!(out.contains("Created project #1 Website"), "{out}");

    let project = fx.store.project_by_name("Website").await.unwrap().unwrap();
    assert_eq!(project.repo_name, Some(repo("fmu/web")));
    assert!(project.automation.auto_status_enabled);
    assert!(!project.automation.auto_sync_issues);
    assert_eq!(project.automation.stale_days, 14);

    let logs = fx.store.recent_logs(project.id, 10).await.unwrap();
    assert_eq!(logs.len(), 1);
    assert_eq!(logs[0].message, "Project created");
}

#[tokio::test]
async fn project_add_rejects_malformed_repository() {
    let fx = Fixture::new();
    let err = fx
        .run_as(OutputMode::Human, &["project", "add", "Web", "--repo", "web"])
        .await
        .unwrap_err();
    assert!(err.to_string().contains("invalid repository"), "{err}");
    assert!(fx.store.list_projects().await.unwrap().is_empty());
}

#[tokio::test]
async fn duplicate_project_name_is_an_error() {
    let fx = Fixture::new();
    fx.project("Web", None).await;
    let err = fx
        .run_as(OutputMode::Human, &["project", "add", "Web"])
        .await
        .unwrap_err();
    assert!(err.to_string().contains("conflict"), "{err}");
}

#[tokio::test]
async fn projects_resolve_by_id_or_name() {
    let fx = Fixture::new();
    let id = fx.project("Website", None).await;
    let numeric = fx.project("2024", None).await;

    let store = fx.store.as_ref();
    assert_eq!(resolve_project(store, "Website").await.unwrap().id, id);
    assert_eq!(resolve_project(store, &id.to_string()).await.unwrap().id, id);
    // A numeric name still resolves when no project has that id.
    assert_eq!(resolve_project(store, "2024").await.unwrap().id, numeric);
    assert!(resolve_project(store, "missing").await.is_err());
}

#[tokio::test]
async fn project_list_json_is_machine_readable() {
    let fx = Fixture::new();
    fx.project("Web", Some("fmu/web")).await;
    fx.project("Docs", None).await;

    let out = fx
        .run_as(OutputMode::Json, &["project", "list"])
        .await
        .unwrap();
    let value: serde_json::Value = serde_json::from_str(&out).unwrap();
    let names: Vec<&str> = value
        .as_array()
        .unwrap()
        .iter()
        .map(|p| p["name"].as_str().unwrap())
        .collect();
    assert_eq!(names.len(), 2);
    assert!(names.contains(&"Web"));
    assert!(names.contains(&"Docs"));
}

#[tokio::test]
async fn project_show_includes_live_activity_for_linked_repo() {
    let gateway = StaticGateway::new().with(
        &repo("fmu/web"),
        RepoActivity {
            pull_requests: vec![PullRequest::open(7, "Add login", true)],
            issues: vec![Issue::open(3, "Crash on start", &["bug"])],
            ..RepoActivity::default()
        },
    );
    let fx = Fixture::with_gateway(gateway);
    let id = fx.project("Web", Some("fmu/web")).await;
    fx.store
        .create_task(NewTask::new(id, "Write docs"))
        .await
        .unwrap();

    let out = fx.run(&["project", "show", "Web"]).await;
    assert!(out.contains("#1 Web"), "{out}");
    assert!(out.contains("Tasks (1 open)"), "{out}");
    assert!(out.contains("Write docs"), "{out}");
    assert!(out.contains("#7 Add login [draft]"), "{out}");
    assert!(out.contains("#3 Crash on start"), "{out}");
}

#[tokio::test]
async fn project_show_skips_github_without_repository() {
    let fx = Fixture::new();
    fx.project("Offline", None).await;
    let out = fx.run(&["project", "show", "Offline"]).await;
    assert!(!out.contains("Open pull requests"), "{out}");
    assert!(fx.gateway.calls().is_empty());
}

#[tokio::test]
async fn project_edit_applies_fields_and_ignores_bad_stale_days() {
    let fx = Fixture::new();
    let id = fx.project("Web", None).await;

    fx.run(&[
        "project",
        "edit",
        "Web",
        "--status",
        "in_progress",
        "--risk",
        "HIGH",
        "--summary",
        "Shipping soon",
        "--repo",
        "fmu/web",
        "--auto-sync",
        "true",
        "--stale-days",
        "soon",
    ])
    .await;

    let project = fx.store.project(id).await.unwrap().unwrap();
    assert_eq!(project.status, ProjectStatus::InProgress);
    assert_eq!(project.risk, RiskLevel::High);
    assert_eq!(project.summary, "Shipping soon");
    assert_eq!(project.repo_name, Some(repo("fmu/web")));
    assert!(project.automation.auto_sync_issues);
    assert_eq!(project.automation.stale_days, tracker::DEFAULT_STALE_DAYS);
}

#[tokio::test]
async fn project_edit_rejects_unknown_status_without_writing() {
    let fx = Fixture::new();
    let id = fx.project("Web", None).await;
    let err = fx
        .run_as(
            OutputMode::Human,
            &["project", "edit", "Web", "--status", "derived", "--summary", "x"],
        )
        .await
        .unwrap_err();
    assert!(err.to_string().contains("invalid project edit"), "{err}");
    let project = fx.store.project(id).await.unwrap().unwrap();
    assert_eq!(project.summary, "");
}

#[tokio::test]
async fn project_delete_removes_project() {
    let fx = Fixture::new();
    let id = fx.project("Web", None).await;
    let out = fx.run(&["project", "delete", &id.to_string()]).await;
    assert!(out.contains("Deleted project #1 Web"), "{out}");
    assert!(fx.store.project(id).await.unwrap().is_none());
}

#[tokio::test]
async fn task_add_and_toggle_cycle() {
    let fx = Fixture::new();
    let id = fx.project("Web", None).await;
    fx.run(&[
        "task",
        "add",
        "Web",
        "Fix login",
        "--priority",
        "urgent",
        "--due",
        "2024-05-10",
    ])
    .await;

    let task = fx.store.tasks_for_project(id).await.unwrap().remove(0);
    assert_eq!(task.priority, TaskPriority::Urgent);
    assert_eq!(task.due_date, NaiveDate::from_ymd_opt(2024, 5, 10));
    assert_eq!(task.status, TaskStatus::Todo);

    let task_id = task.id.to_string();
    let out = fx.run(&["task", "toggle", &task_id]).await;
    assert!(out.contains("is now IN_PROGRESS"), "{out}");
    fx.run(&["task", "toggle", &task_id]).await;
    let out = fx.run(&["task", "toggle", &task_id]).await;
    assert!(out.contains("is now TODO"), "{out}");
}

#[tokio::test]
async fn task_toggle_unknown_task_fails() {
    let fx = Fixture::new();
    let err = fx
        .run_as(OutputMode::Human, &["task", "toggle", "99"])
        .await
        .unwrap_err();
    assert!(err.to_string().contains("task 99 not found"), "{err}");
}

#[tokio::test]
async fn invalid_priority_is_rejected_at_parse_time() {
    let fx = Fixture::new();
    fx.project("Web", None).await;
    let result = fx
        .run_as(
            OutputMode::Human,
            &["task", "add", "Web", "x", "--priority", "someday"],
        )
        .await;
    assert!(result.is_err());
}

#[tokio::test]
async fn link_and_log_add() {
    let fx = Fixture::new();
    let id = fx.project("Web", None).await;
    fx.run(&[
        "link",
        "add",
        "Web",
        "Staging",
        "https://staging.example.com",
        "--kind",
        "deployment",
    ])
    .await;
    fx.run(&["log", "add", "Web", "Kickoff meeting held"]).await;

    let links = fx.store.links(id).await.unwrap();
    assert_eq!(links.len(), 1);
    assert_eq!(links[0].kind, tracker::LinkKind::Deployment);
    let logs = fx.store.recent_logs(id, 10).await.unwrap();
    assert_eq!(logs[0].message, "Kickoff meeting held");
}

#[tokio::test]
async fn update_requires_repository() {
    let fx = Fixture::new();
    fx.project("Offline", None).await;
    let err = fx
        .run_as(OutputMode::Human, &["update", "Offline"])
        .await
        .unwrap_err();
    assert!(format!("{err:#}").contains("has no repository configured"), "{err:#}");
}

#[tokio::test]
async fn update_derives_status_and_risk() {
    let gateway = StaticGateway::new().with(
        &repo("fmu/web"),
        RepoActivity {
            pull_requests: vec![PullRequest::open(1, "Feature", false)],
            issues: vec![Issue::open(2, "Leak", &["Security"])],
            ..RepoActivity::default()
        },
    );
    let fx = Fixture::with_gateway(gateway);
    let id = fx
        .store
        .create_project(NewProject {
            repo_name: Some(repo("fmu/web")),
            automation: tracker::AutomationConfig {
                auto_status_enabled: true,
                ..tracker::AutomationConfig::default()
            },
            ..NewProject::named("Web")
        })
        .await
        .unwrap()
        .id;

    let out = fx
        .run_as(OutputMode::Json, &["update", "Web"])
        .await
        .unwrap();
    let report: serde_json::Value = serde_json::from_str(&out).unwrap();
    assert_eq!(report["status"], "IN_PROGRESS");
    assert_eq!(report["risk"], "HIGH");
    assert_eq!(report["changed"], true);

    let project = fx.store.project(id).await.unwrap().unwrap();
    assert_eq!(project.status, ProjectStatus::InProgress);
    assert_eq!(project.risk, RiskLevel::High);
}

#[tokio::test]
async fn today_lists_pressing_tasks_for_given_date() {
    let fx = Fixture::new();
    let id = fx.project("Web", None).await;
    fx.store
        .create_task(NewTask {
            priority: TaskPriority::Low,
            due_date: NaiveDate::from_ymd_opt(2024, 5, 1),
            ..NewTask::new(id, "Renew certificate")
        })
        .await
        .unwrap();
    fx.store
        .create_task(NewTask {
            priority: TaskPriority::Low,
            ..NewTask::new(id, "Someday")
        })
        .await
        .unwrap();

    let out = fx.run(&["today", "--date", "2024-05-02"]).await;
    assert!(out.contains("[LOW] Web: Renew certificate (due 2024-05-01)"), "{out}");
    assert!(!out.contains("Someday"), "{out}");

    let out = fx.run(&["today", "--date", "2024-04-30"]).await;
    assert_eq!(out.trim(), "Nothing pressing.");
}

#[tokio::test]
async fn review_queue_lists_open_pull_requests() {
    let mut pr = PullRequest::open(12, "Refactor", false);
    pr.user = Some("ada".into());
    let gateway = StaticGateway::new().with(
        &repo("fmu/web"),
        RepoActivity {
            pull_requests: vec![pr],
            ..RepoActivity::default()
        },
    );
    let fx = Fixture::with_gateway(gateway);
    fx.project("Web", Some("fmu/web")).await;
    fx.project("Offline", None).await;

    let out = fx.run(&["review-queue"]).await;
    assert_eq!(out.trim(), "Web: #12 Refactor by ada");
    assert_eq!(fx.gateway.calls(), ["pulls fmu/web"]);
}

#[tokio::test]
async fn empty_review_queue_says_so() {
    let fx = Fixture::new();
    let out = fx.run(&["review-queue"]).await;
    assert_eq!(out.trim(), "No open pull requests.");
}
