use serde_json::json;
use tracker::{
    AutomationConfig, Issue, MemoryStore, NewProject, ProjectStatus, PullRequest, RepoActivity,
    RiskLevel, StaticGateway, TaskPriority, TaskStatus,
};

use super::*;

const REPO: &str = "fmu/website";

fn repo() -> RepositoryId {
    RepositoryId::new(REPO).unwrap()
}

struct Fixture {
    store: Arc<MemoryStore>,
    gateway: Arc<StaticGateway>,
    dispatcher: Dispatcher,
    project: Project,
}

async fn fixture(automation: AutomationConfig, activity: RepoActivity) -> Fixture {
    let store = Arc::new(MemoryStore::new());
    let gateway = Arc::new(StaticGateway::new().with(&repo(), activity));
    let project = store
        .create_project(NewProject {
            repo_name: Some(repo()),
            automation,
            ..NewProject::named("Website")
        })
        .await
        .unwrap();
    let dispatcher = Dispatcher::new(store.clone(), gateway.clone());
    Fixture {
        store,
        gateway,
        dispatcher,
        project,
    }
}

fn automated() -> AutomationConfig {
    AutomationConfig {
        auto_status_enabled: true,
        auto_sync_issues: true,
        ..AutomationConfig::default()
    }
}

impl Fixture {
    async fn logs(&self) -> Vec<String> {
        self.store
            .recent_logs(self.project.id, 50)
            .await
            .unwrap()
            .into_iter()
            .map(|l| l.message)
            .collect()
    }

    async fn reload(&self) -> Project {
        self.store.project(self.project.id).await.unwrap().unwrap()
    }
}

fn pull_request(repo: &str, action: &str) -> serde_json::Value {
    json!({
        "action": action,
        "pull_request": {"number": 12, "title": "Add login", "user": {"login": "ada"}},
        "repository": {"full_name": repo}
    })
}

fn issue(action: &str, number: u64, labels: &[&str]) -> serde_json::Value {
    let labels: Vec<_> = labels.iter().map(|l| json!({"name": l})).collect();
    json!({
        "action": action,
        "issue": {
            "number": number,
            "title": "Crash on save",
            "body": "Steps to reproduce",
            "labels": labels,
            "user": {"login": "grace"}
        },
        "repository": {"full_name": REPO}
    })
}

fn workflow_run(action: &str, status: &str, conclusion: Option<&str>) -> serde_json::Value {
    json!({
        "action": action,
        "workflow_run": {"name": "CI", "status": status, "conclusion": conclusion},
        "repository": {"full_name": REPO}
    })
}

// ---------------------------------------------------------------------------
// Routing
// ---------------------------------------------------------------------------

#[tokio::test]
async fn ping_is_acknowledged_without_side_effects() {
    let fx = fixture(automated(), RepoActivity::default()).await;
    let outcome = fx
        .dispatcher
        .dispatch("ping", json!({"zen": "Keep it logically awesome."}))
        .await
        .unwrap();
    assert_eq!(outcome, DispatchOutcome::Pong);
    assert!(fx.logs().await.is_empty());
    assert!(fx.gateway.calls().is_empty());
}

#[tokio::test]
async fn unknown_event_type_is_ignored() {
    let fx = fixture(automated(), RepoActivity::default()).await;
    let outcome = fx
        .dispatcher
        .dispatch("star", json!({"repository": {"full_name": REPO}}))
        .await
        .unwrap();
    assert_eq!(
        outcome,
        DispatchOutcome::Ignored {
            event: "star".into()
        }
    );
    assert!(fx.logs().await.is_empty());
}

#[tokio::test]
async fn unknown_repository_is_ignored_without_log() {
    let fx = fixture(automated(), RepoActivity::default()).await;
    let outcome = fx
        .dispatcher
        .dispatch("pull_request", pull_request("someone/else", "opened"))
        .await
        .unwrap();
    assert_eq!(
        outcome,
        DispatchOutcome::Ignored {
            event: "pull_request".into()
        }
    );
    assert!(fx.logs().await.is_empty());
    assert!(fx.gateway.calls().is_empty());
}

#[tokio::test]
async fn missing_repository_is_ignored() {
    let fx = fixture(automated(), RepoActivity::default()).await;
    let outcome = fx
        .dispatcher
        .dispatch("issues", json!({"action": "opened", "issue": {"number": 1}}))
        .await
        .unwrap();
    assert!(matches!(outcome, DispatchOutcome::Ignored { .. }));
    assert!(fx.store.open_tasks().await.unwrap().is_empty());
}

#[tokio::test]
async fn wrongly_typed_payload_is_rejected() {
    let fx = fixture(automated(), RepoActivity::default()).await;
    let err = fx
        .dispatcher
        .dispatch(
            "pull_request",
            json!({"pull_request": {"number": "twelve"}, "repository": {"full_name": REPO}}),
        )
        .await
        .unwrap_err();
    assert!(matches!(err, WebhookError::InvalidPayload(_)));
    assert!(fx.logs().await.is_empty());
}

// ---------------------------------------------------------------------------
// pull_request
// ---------------------------------------------------------------------------

#[tokio::test]
async fn pull_request_logs_and_updates_status() {
    let activity = RepoActivity {
        pull_requests: vec![PullRequest::open(12, "Add login", false)],
        ..RepoActivity::default()
    };
    let fx = fixture(automated(), activity).await;

    let outcome = fx
        .dispatcher
        .dispatch("pull_request", pull_request(REPO, "opened"))
        .await
        .unwrap();

    assert_eq!(outcome, DispatchOutcome::Success);
    assert_eq!(fx.logs().await, ["PR #12 opened: Add login by ada"]);
    assert_eq!(fx.reload().await.status, ProjectStatus::InProgress);
    assert!(fx.gateway.calls().contains(&format!("issues {REPO}")));
}

#[tokio::test]
async fn pull_request_without_automation_only_logs() {
    let activity = RepoActivity {
        pull_requests: vec![PullRequest::open(12, "Add login", true)],
        ..RepoActivity::default()
    };
    let fx = fixture(AutomationConfig::default(), activity).await;

    fx.dispatcher
        .dispatch("pull_request", pull_request(REPO, "closed"))
        .await
        .unwrap();

    assert_eq!(fx.logs().await, ["PR #12 closed: Add login by ada"]);
    assert_eq!(fx.reload().await.status, ProjectStatus::Planning);
    assert!(fx.gateway.calls().is_empty());
}

#[tokio::test]
async fn missing_user_is_logged_as_unknown() {
    let fx = fixture(AutomationConfig::default(), RepoActivity::default()).await;
    fx.dispatcher
        .dispatch(
            "pull_request",
            json!({
                "action": "edited",
                "pull_request": {"number": 3, "title": "Typo"},
                "repository": {"full_name": REPO}
            }),
        )
        .await
        .unwrap();
    assert_eq!(fx.logs().await, ["PR #3 edited: Typo by unknown"]);
}

// ---------------------------------------------------------------------------
// issues
// ---------------------------------------------------------------------------

#[tokio::test]
async fn issue_lifecycle_drives_mirrored_task() {
    let fx = fixture(automated(), RepoActivity::default()).await;

    fx.dispatcher
        .dispatch("issues", issue("opened", 7, &["urgent"]))
        .await
        .unwrap();
    let tasks = fx.store.tasks_for_project(fx.project.id).await.unwrap();
    assert_eq!(tasks.len(), 1);
    let task = &tasks[0];
    assert_eq!(task.title, "GH Issue #7: Crash on save");
    assert_eq!(task.description, "Steps to reproduce");
    assert_eq!(task.priority, TaskPriority::Urgent);
    assert_eq!(task.status, TaskStatus::Todo);

    fx.dispatcher
        .dispatch("issues", issue("closed", 7, &["urgent"]))
        .await
        .unwrap();
    assert_eq!(
        fx.store.task(task.id).await.unwrap().unwrap().status,
        TaskStatus::Done
    );

    fx.dispatcher
        .dispatch("issues", issue("reopened", 7, &["urgent"]))
        .await
        .unwrap();
    assert_eq!(
        fx.store.task(task.id).await.unwrap().unwrap().status,
        TaskStatus::Todo
    );

    assert_eq!(
        fx.logs().await,
        [
            "Issue #7 reopened: Crash on save by grace",
            "Issue #7 closed: Crash on save by grace",
            "Issue #7 opened: Crash on save by grace",
        ]
    );
}

#[tokio::test]
async fn issue_event_updates_risk_only() {
    let activity = RepoActivity {
        pull_requests: vec![PullRequest::open(1, "wip", true)],
        issues: vec![Issue::open(7, "Crash", &["Security"])],
        ..RepoActivity::default()
    };
    let fx = fixture(automated(), activity).await;

    fx.dispatcher
        .dispatch("issues", issue("labeled", 7, &["Security"]))
        .await
        .unwrap();

    let project = fx.reload().await;
    assert_eq!(project.risk, RiskLevel::High);
    assert_eq!(project.status, ProjectStatus::Planning);
    assert_eq!(fx.gateway.calls(), [format!("issues {REPO}")]);
    assert!(fx.store.open_tasks().await.unwrap().is_empty());
}

#[tokio::test]
async fn issue_sync_disabled_creates_no_task() {
    let automation = AutomationConfig {
        auto_status_enabled: false,
        auto_sync_issues: false,
        ..AutomationConfig::default()
    };
    let fx = fixture(automation, RepoActivity::default()).await;

    let outcome = fx
        .dispatcher
        .dispatch("issues", issue("opened", 9, &[]))
        .await
        .unwrap();

    assert_eq!(outcome, DispatchOutcome::Success);
    assert!(fx.store.open_tasks().await.unwrap().is_empty());
    assert_eq!(fx.logs().await.len(), 1);
}

// ---------------------------------------------------------------------------
// workflow_run
// ---------------------------------------------------------------------------

#[tokio::test]
async fn failed_run_forces_blocked() {
    let fx = fixture(automated(), RepoActivity::default()).await;

    fx.dispatcher
        .dispatch("workflow_run", workflow_run("completed", "completed", Some("failure")))
        .await
        .unwrap();

    assert_eq!(
        fx.logs().await,
        ["Workflow 'CI' completed with conclusion: failure"]
    );
    assert_eq!(fx.reload().await.status, ProjectStatus::Blocked);
    assert!(fx.gateway.calls().is_empty());
}

#[tokio::test]
async fn failed_run_without_automation_is_only_logged() {
    let fx = fixture(AutomationConfig::default(), RepoActivity::default()).await;

    fx.dispatcher
        .dispatch("workflow_run", workflow_run("completed", "completed", Some("failure")))
        .await
        .unwrap();

    assert_eq!(fx.reload().await.status, ProjectStatus::Planning);
}

#[tokio::test]
async fn running_workflow_logs_status() {
    let fx = fixture(automated(), RepoActivity::default()).await;

    fx.dispatcher
        .dispatch("workflow_run", workflow_run("requested", "in_progress", None))
        .await
        .unwrap();

    assert_eq!(
        fx.logs().await,
        ["Workflow 'CI' requested with status: in_progress"]
    );
    assert_eq!(fx.reload().await.status, ProjectStatus::Planning);
}

#[test]
fn outcomes_serialise_as_status_objects() {
    assert_eq!(
        serde_json::to_value(DispatchOutcome::Pong).unwrap(),
        json!({"status": "pong"})
    );
    assert_eq!(
        serde_json::to_value(DispatchOutcome::Success).unwrap(),
        json!({"status": "success"})
    );
    assert_eq!(
        serde_json::to_value(DispatchOutcome::Ignored {
            event: "star".into()
        })
        .unwrap(),
        json!({"status": "ignored", "event": "star"})
    );
}
