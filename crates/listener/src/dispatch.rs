//! Routing of verified webhook deliveries to tracker operations.
//!
//! | Event | Effect on the matching project |
//! |-------|--------------------------------|
//! | `ping` | none |
//! | `pull_request` | log entry; full status/risk update when `auto_status_enabled` |
//! | `issues` | log entry; issue sync when `auto_sync_issues`; risk update when `auto_status_enabled` |
//! | `workflow_run` | log entry; `BLOCKED` on a failed run when `auto_status_enabled` |
//!
//! The matching project is the one whose `repo_name` equals the payload's
//! `repository.full_name`. Deliveries for unknown repositories and unknown
//! event types are reported as ignored.

use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, info, warn};
use tracker::sync::sync_issue;
use tracker::{ActivityGateway, IssueAction, Project, ProjectStore, RepositoryId, StatusEngine};

use crate::payload::{
    number_text, Actor, IssuesEvent, PullRequestEvent, Repository, WorkflowRunEvent,
};
use crate::WebhookError;

/// Result of dispatching one delivery, serialised as the response body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum DispatchOutcome {
    /// Reply to GitHub's `ping`.
    Pong,
    /// A handler found the project and applied the event.
    Success,
    /// No handler for the event type, or no project for the repository.
    Ignored { event: String },
}

/// Applies webhook events to the record store.
#[derive(Clone)]
pub struct Dispatcher {
    store: Arc<dyn ProjectStore>,
    engine: StatusEngine,
}

impl Dispatcher {
    pub fn new(store: Arc<dyn ProjectStore>, gateway: Arc<dyn ActivityGateway>) -> Self {
        let engine = StatusEngine::new(gateway, Arc::clone(&store));
        Self { store, engine }
    }

    /// Routes one decoded delivery by its `X-GitHub-Event` type.
    pub async fn dispatch(
        &self,
        event: &str,
        payload: serde_json::Value,
    ) -> Result<DispatchOutcome, WebhookError> {
        let handled = match event {
            "ping" => return Ok(DispatchOutcome::Pong),
            "pull_request" => self.on_pull_request(decode(payload)?).await?,
            "issues" => self.on_issues(decode(payload)?).await?,
            "workflow_run" => self.on_workflow_run(decode(payload)?).await?,
            _ => false,
        };

        if handled {
            Ok(DispatchOutcome::Success)
        } else {
            debug!(event, "delivery ignored");
            Ok(DispatchOutcome::Ignored {
                event: event.to_string(),
            })
        }
    }

    async fn project_for(
        &self,
        repository: Option<&Repository>,
    ) -> Result<Option<Project>, WebhookError> {
        let Some(repo) = repository
            .and_then(|r| r.full_name.as_deref())
            .and_then(RepositoryId::new)
        else {
            return Ok(None);
        };
        Ok(self.store.project_by_repo(&repo).await?)
    }

    async fn on_pull_request(&self, event: PullRequestEvent) -> Result<bool, WebhookError> {
        let Some(mut project) = self.project_for(event.repository.as_ref()).await? else {
            return Ok(false);
        };

        let pr = &event.pull_request;
        let message = format!(
            "PR #{} {}: {} by {}",
            number_text(pr.number),
            event.action.as_deref().unwrap_or_default(),
            pr.title.as_deref().unwrap_or_default(),
            Actor::login_or_unknown(pr.user.as_ref()),
        );
        self.store.append_log(project.id, &message).await?;
        info!(project = %project.id, %message, "pull request event recorded");

        if project.automation.auto_status_enabled {
            self.engine.auto_update(&mut project).await?;
        }
        Ok(true)
    }

    async fn on_issues(&self, event: IssuesEvent) -> Result<bool, WebhookError> {
        let Some(mut project) = self.project_for(event.repository.as_ref()).await? else {
            return Ok(false);
        };

        let issue = &event.issue;
        let action = event.action.as_deref().unwrap_or_default();
        let message = format!(
            "Issue #{} {}: {} by {}",
            number_text(issue.number),
            action,
            issue.title.as_deref().unwrap_or_default(),
            Actor::login_or_unknown(issue.user.as_ref()),
        );
        self.store.append_log(project.id, &message).await?;
        info!(project = %project.id, %message, "issue event recorded");

        if project.automation.auto_sync_issues {
            match issue.snapshot() {
                Some(snapshot) => {
                    let outcome = sync_issue(
                        self.store.as_ref(),
                        project.id,
                        &project.automation,
                        &IssueAction::parse(action),
                        &snapshot,
                    )
                    .await?;
                    debug!(project = %project.id, ?outcome, "issue sync applied");
                }
                None => {
                    warn!(project = %project.id, "issue event without a number; sync skipped");
                }
            }
        }
        if project.automation.auto_status_enabled {
            self.engine.update_risk(&mut project).await?;
        }
        Ok(true)
    }

    async fn on_workflow_run(&self, event: WorkflowRunEvent) -> Result<bool, WebhookError> {
        let Some(mut project) = self.project_for(event.repository.as_ref()).await? else {
            return Ok(false);
        };

        let run = &event.workflow_run;
        let mut message = format!(
            "Workflow '{}' {}",
            run.name.as_deref().unwrap_or("Unknown"),
            event.action.as_deref().unwrap_or_default(),
        );
        if let Some(conclusion) = run.conclusion.as_deref().filter(|c| !c.is_empty()) {
            message.push_str(&format!(" with conclusion: {conclusion}"));
        } else if let Some(status) = run.status.as_deref().filter(|s| !s.is_empty()) {
            message.push_str(&format!(" with status: {status}"));
        }
        self.store.append_log(project.id, &message).await?;
        info!(project = %project.id, %message, "workflow run recorded");

        if run.conclusion.as_deref() == Some("failure") {
            self.engine.force_blocked(&mut project).await?;
        }
        Ok(true)
    }
}

fn decode<T: DeserializeOwned>(payload: serde_json::Value) -> Result<T, WebhookError> {
    serde_json::from_value(payload).map_err(|e| WebhookError::InvalidPayload(e.to_string()))
}

#[cfg(test)]
mod tests;
