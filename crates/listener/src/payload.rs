//! Webhook payload shapes.
//!
//! Only the fields the dispatcher reads are modelled. Everything is optional
//! or defaulted, so an event is rejected only when a field has the wrong JSON
//! type.

use serde::Deserialize;
use tracker::{IssueNumber, IssueSnapshot};

#[derive(Debug, Default, Deserialize)]
pub(crate) struct Repository {
    #[serde(default)]
    pub full_name: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct Actor {
    #[serde(default)]
    pub login: Option<String>,
}

impl Actor {
    pub(crate) fn login_or_unknown(actor: Option<&Actor>) -> &str {
        actor
            .and_then(|a| a.login.as_deref())
            .unwrap_or("unknown")
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct Label {
    #[serde(default)]
    pub name: Option<String>,
}

// ---------------------------------------------------------------------------
// pull_request
// ---------------------------------------------------------------------------

#[derive(Debug, Default, Deserialize)]
pub(crate) struct PullRequestBody {
    #[serde(default)]
    pub number: Option<u64>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub user: Option<Actor>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct PullRequestEvent {
    #[serde(default)]
    pub action: Option<String>,
    #[serde(default)]
    pub pull_request: PullRequestBody,
    #[serde(default)]
    pub repository: Option<Repository>,
}

// ---------------------------------------------------------------------------
// issues
// ---------------------------------------------------------------------------

#[derive(Debug, Default, Deserialize)]
pub(crate) struct IssueBody {
    #[serde(default)]
    pub number: Option<u64>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub body: Option<String>,
    #[serde(default)]
    pub labels: Vec<Label>,
    #[serde(default)]
    pub user: Option<Actor>,
}

impl IssueBody {
    /// The fields issue sync needs. `None` without an issue number.
    pub(crate) fn snapshot(&self) -> Option<IssueSnapshot> {
        Some(IssueSnapshot {
            number: IssueNumber::new(self.number?),
            title: self.title.clone().unwrap_or_default(),
            body: self.body.clone(),
            labels: self.labels.iter().filter_map(|l| l.name.clone()).collect(),
        })
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct IssuesEvent {
    #[serde(default)]
    pub action: Option<String>,
    #[serde(default)]
    pub issue: IssueBody,
    #[serde(default)]
    pub repository: Option<Repository>,
}

// ---------------------------------------------------------------------------
// workflow_run
// ---------------------------------------------------------------------------

#[derive(Debug, Default, Deserialize)]
pub(crate) struct WorkflowRunBody {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub conclusion: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct WorkflowRunEvent {
    #[serde(default)]
    pub action: Option<String>,
    #[serde(default)]
    pub workflow_run: WorkflowRunBody,
    #[serde(default)]
    pub repository: Option<Repository>,
}

/// Renders an optional number the way it appears in log lines.
pub(crate) fn number_text(number: Option<u64>) -> String {
    number.map_or_else(|| "?".to_string(), |n| n.to_string())
}
