use chrono::NaiveDate;
use tracker::{
    AutomationConfig, LinkKind, NewLink, NewProject, NewTask, ProjectStore, StoreError,
    TaskPriority,
};

use super::*;

fn store() -> SqliteStore {
    SqliteStore::in_memory().unwrap()
}

fn linked(name: &str, repo: &str) -> NewProject {
    NewProject {
        repo_name: RepositoryId::new(repo),
        automation: AutomationConfig {
            auto_status_enabled: true,
            auto_sync_issues: true,
            stale_days: 14,
        },
        ..NewProject::named(name)
    }
}

// ---------------------------------------------------------------------------
// Projects
// ---------------------------------------------------------------------------

#[tokio::test]
async fn created_project_round_trips() {
    let store = store();
    let created = store
        .create_project(linked("Website", "fmu/website"))
        .await
        .unwrap();

    let loaded = store.project(created.id).await.unwrap().unwrap();
    assert_eq!(loaded, created);
    assert_eq!(loaded.status, ProjectStatus::Planning);
    assert_eq!(loaded.automation.stale_days, 14);
    assert_eq!(
        loaded.repo_name.as_ref().map(RepositoryId::as_str),
        Some("fmu/website")
    );
    assert_eq!(
        store.project_by_name("Website").await.unwrap().map(|p| p.id),
        Some(created.id)
    );
}

#[tokio::test]
async fn duplicate_name_is_a_conflict() {
    let store = store();
    store.create_project(NewProject::named("Sims")).await.unwrap();
    let err = store
        .create_project(NewProject::named("Sims"))
        .await
        .unwrap_err();
    assert!(matches!(err, StoreError::Conflict(_)));
}

#[tokio::test]
async fn renaming_onto_an_existing_name_is_a_conflict() {
    let store = store();
    store.create_project(NewProject::named("Sims")).await.unwrap();
    let mut other = store.create_project(NewProject::named("Docs")).await.unwrap();
    other.name = "Sims".into();
    let err = store.save_project(&other).await.unwrap_err();
    assert!(matches!(err, StoreError::Conflict(_)));
}

#[tokio::test]
async fn save_project_persists_edits_and_bumps_updated_at() {
    let store = store();
    let mut project = store.create_project(NewProject::named("Sims")).await.unwrap();
    project.summary = "on track".into();
    project.repo_name = RepositoryId::new("fmu/sims");

    let saved = store.save_project(&project).await.unwrap();
    assert_eq!(saved.summary, "on track");
    assert_eq!(saved.created_at, project.created_at);
    assert!(saved.updated_at >= project.updated_at);

    let unlinked = Project {
        repo_name: None,
        ..saved
    };
    let saved = store.save_project(&unlinked).await.unwrap();
    assert!(saved.repo_name.is_none());
}

#[tokio::test]
async fn status_and_risk_updates_require_the_project() {
    let store = store();
    let project = store.create_project(NewProject::named("Sims")).await.unwrap();
    store
        .set_project_status(project.id, ProjectStatus::Blocked)
        .await
        .unwrap();
    store
        .set_project_risk(project.id, RiskLevel::High)
        .await
        .unwrap();
    let loaded = store.project(project.id).await.unwrap().unwrap();
    assert_eq!(loaded.status, ProjectStatus::Blocked);
    assert_eq!(loaded.risk, RiskLevel::High);

    let missing = ProjectId::new(999);
    let err = store
        .set_project_status(missing, ProjectStatus::Stale)
        .await
        .unwrap_err();
    assert!(matches!(err, StoreError::NotFound { kind: "project", id: 999 }));
}

#[tokio::test]
async fn repo_lookup_prefers_lowest_id() {
    let store = store();
    let first = store
        .create_project(linked("Website", "fmu/website"))
        .await
        .unwrap();
    store
        .create_project(linked("Website v2", "fmu/website"))
        .await
        .unwrap();

    let repo = RepositoryId::new("fmu/website").unwrap();
    let found = store.project_by_repo(&repo).await.unwrap().unwrap();
    assert_eq!(found.id, first.id);

    let other = RepositoryId::new("fmu/unknown").unwrap();
    assert!(store.project_by_repo(&other).await.unwrap().is_none());
}

#[tokio::test]
async fn delete_cascades_to_children() {
    let store = store();
    let project = store.create_project(NewProject::named("Sims")).await.unwrap();
    let task = store
        .create_task(NewTask::new(project.id, "write docs"))
        .await
        .unwrap();
    store
        .add_link(NewLink {
            project_id: project.id,
            title: "Repo".into(),
            url: "https://github.com/fmu/sims".into(),
            kind: LinkKind::Github,
        })
        .await
        .unwrap();
    store.append_log(project.id, "created").await.unwrap();

    assert!(store.delete_project(project.id).await.unwrap());
    assert!(store.task(task.id).await.unwrap().is_none());
    assert!(store.links(project.id).await.unwrap().is_empty());
    assert!(store.recent_logs(project.id, 10).await.unwrap().is_empty());
    assert!(!store.delete_project(project.id).await.unwrap());
}

// ---------------------------------------------------------------------------
// Tasks
// ---------------------------------------------------------------------------

#[tokio::test]
async fn task_for_missing_project_is_not_found() {
    let store = store();
    let err = store
        .create_task(NewTask::new(ProjectId::new(7), "orphan"))
        .await
        .unwrap_err();
    assert!(matches!(err, StoreError::NotFound { kind: "project", .. }));
}

#[tokio::test]
async fn tasks_order_by_priority_then_due_date() {
    let store = store();
    let project = store.create_project(NewProject::named("Sims")).await.unwrap();
    let mut low = NewTask::new(project.id, "low");
    low.priority = TaskPriority::Low;
    let mut urgent = NewTask::new(project.id, "urgent");
    urgent.priority = TaskPriority::Urgent;
    let mut high_dated = NewTask::new(project.id, "high dated");
    high_dated.priority = TaskPriority::High;
    high_dated.due_date = NaiveDate::from_ymd_opt(2024, 1, 1);
    let mut high_undated = NewTask::new(project.id, "high undated");
    high_undated.priority = TaskPriority::High;

    for t in [low, high_undated, urgent, high_dated] {
        store.create_task(t).await.unwrap();
    }
    let titles: Vec<String> = store
        .tasks_for_project(project.id)
        .await
        .unwrap()
        .into_iter()
        .map(|t| t.title)
        .collect();
    assert_eq!(titles, ["urgent", "high dated", "high undated", "low"]);
}

#[tokio::test]
async fn open_tasks_skip_done() {
    let store = store();
    let project = store.create_project(NewProject::named("Sims")).await.unwrap();
    let a = store.create_task(NewTask::new(project.id, "a")).await.unwrap();
    let b = store.create_task(NewTask::new(project.id, "b")).await.unwrap();
    store.set_task_status(a.id, TaskStatus::Done).await.unwrap();

    let open: Vec<TaskId> = store
        .open_tasks()
        .await
        .unwrap()
        .into_iter()
        .map(|t| t.id)
        .collect();
    assert_eq!(open, [b.id]);

    let err = store
        .set_task_status(TaskId::new(999), TaskStatus::Done)
        .await
        .unwrap_err();
    assert!(matches!(err, StoreError::NotFound { kind: "task", .. }));
}

#[tokio::test]
async fn issue_tasks_match_by_source_or_title_marker() {
    let store = store();
    let project = store.create_project(NewProject::named("Sims")).await.unwrap();
    let other = store.create_project(NewProject::named("Docs")).await.unwrap();

    let mut synced = NewTask::new(project.id, "renamed by hand");
    synced.source_issue = Some(IssueNumber::new(4));
    let synced = store.create_task(synced).await.unwrap();
    let titled = store
        .create_task(NewTask::new(project.id, "GH Issue #4: crash"))
        .await
        .unwrap();
    let prefix = store
        .create_task(NewTask::new(project.id, "GH Issue #42: other"))
        .await
        .unwrap();
    let unrelated = store
        .create_task(NewTask::new(project.id, "Issue 4"))
        .await
        .unwrap();
    let elsewhere = store
        .create_task(NewTask::new(other.id, "GH Issue #4: crash"))
        .await
        .unwrap();

    let touched = store
        .set_issue_task_status(project.id, IssueNumber::new(4), TaskStatus::Done)
        .await
        .unwrap();
    assert_eq!(touched, 3);

    for (id, expected) in [
        (synced.id, TaskStatus::Done),
        (titled.id, TaskStatus::Done),
        (prefix.id, TaskStatus::Done),
        (unrelated.id, TaskStatus::Todo),
        (elsewhere.id, TaskStatus::Todo),
    ] {
        assert_eq!(store.task(id).await.unwrap().unwrap().status, expected);
    }
}

#[tokio::test]
async fn due_dates_and_source_issue_round_trip() {
    let store = store();
    let project = store.create_project(NewProject::named("Sims")).await.unwrap();
    let mut new = NewTask::new(project.id, "GH Issue #9: flaky test");
    new.due_date = NaiveDate::from_ymd_opt(2024, 12, 31);
    new.source_issue = Some(IssueNumber::new(9));
    let task = store.create_task(new).await.unwrap();

    let loaded = store.task(task.id).await.unwrap().unwrap();
    assert_eq!(loaded.due_date, NaiveDate::from_ymd_opt(2024, 12, 31));
    assert_eq!(loaded.source_issue, Some(IssueNumber::new(9)));
}

// ---------------------------------------------------------------------------
// Links and logs
// ---------------------------------------------------------------------------

#[tokio::test]
async fn links_order_by_kind_then_title() {
    let store = store();
    let project = store.create_project(NewProject::named("Sims")).await.unwrap();
    for (title, kind) in [
        ("Staging", LinkKind::Deployment),
        ("API", LinkKind::Docs),
        ("Repo", LinkKind::Github),
        ("Guide", LinkKind::Docs),
    ] {
        store
            .add_link(NewLink {
                project_id: project.id,
                title: title.into(),
                url: format!("https://example.com/{title}"),
                kind,
            })
            .await
            .unwrap();
    }
    let titles: Vec<String> = store
        .links(project.id)
        .await
        .unwrap()
        .into_iter()
        .map(|l| l.title)
        .collect();
    assert_eq!(titles, ["Staging", "API", "Guide", "Repo"]);
}

#[tokio::test]
async fn logs_are_newest_first_and_limited() {
    let store = store();
    let project = store.create_project(NewProject::named("Sims")).await.unwrap();
    for i in 0..12 {
        store
            .append_log(project.id, &format!("entry {i}"))
            .await
            .unwrap();
    }
    let logs = store.recent_logs(project.id, 10).await.unwrap();
    assert_eq!(logs.len(), 10);
    assert_eq!(logs[0].message, "entry 11");
    assert_eq!(logs[9].message, "entry 2");
}

#[tokio::test]
async fn log_for_missing_project_is_not_found() {
    let store = store();
    let err = store
        .append_log(ProjectId::new(3), "hello")
        .await
        .unwrap_err();
    assert!(matches!(err, StoreError::NotFound { .. }));
}

// ---------------------------------------------------------------------------
// Files and schema
// ---------------------------------------------------------------------------

#[tokio::test]
async fn data_survives_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("nested").join("tracker.db");

    let id = {
        let store = SqliteStore::open(&path).unwrap();
        let project = store
            .create_project(linked("Website", "fmu/website"))
            .await
            .unwrap();
        store.append_log(project.id, "created").await.unwrap();
        project.id
    };

    let store = SqliteStore::open(&path).unwrap();
    let project = store.project(id).await.unwrap().unwrap();
    assert_eq!(project.name, "Website");
    assert_eq!(store.recent_logs(id, 10).await.unwrap().len(), 1);
}

#[test]
fn newer_schema_is_refused() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("tracker.db");
    drop(SqliteStore::open(&path).unwrap());

    let conn = Connection::open(&path).unwrap();
    conn.execute("UPDATE schema_version SET version = 99 WHERE id = 1", [])
        .unwrap();
    drop(conn);

    let err = SqliteStore::open(&path).unwrap_err();
    assert!(matches!(err, StoreError::Storage { .. }));
}
