//! GitHub activity port.
//!
//! [`ActivityGateway`] is the capability the reconciliation engine and the
//! dashboard queries need from GitHub: list open pull requests, recent
//! commits and open issues, and fetch basic repository metadata. The
//! infrastructure adapter lives in the `github` crate; this module only fixes
//! the normalised record shapes and the failure contract.
//!
//! ## Failure contract
//!
//! Implementations never surface transport or decoding failures. A failed
//! call yields an empty list (or `None` for [`ActivityGateway::fetch_repo_info`])
//! and is logged by the implementation. Every call must be bounded in time.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::{IssueNumber, PullRequestNumber, RepositoryId};

/// Which items to list, by GitHub state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemState {
    Open,
    Closed,
    All,
}

impl ItemState {
    /// The value GitHub expects in the `state` query parameter.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Open => "open",
            Self::Closed => "closed",
            Self::All => "all",
        }
    }
}

/// A pull request, projected to the fields the tracker uses.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PullRequest {
    pub number: PullRequestNumber,
    pub title: String,
    pub state: String,
    pub user: Option<String>,
    pub created_at: Option<String>,
    pub updated_at: Option<String>,
    pub html_url: Option<String>,
    pub draft: bool,
}

/// A commit, projected to its short SHA and the first line of its message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Commit {
    pub sha: String,
    pub message: String,
    pub author: Option<String>,
    /// Author date exactly as GitHub reported it. Parsed lazily so a malformed
    /// value only costs the signal, never the whole fetch.
    pub date: Option<String>,
    pub html_url: Option<String>,
}

/// An issue (never a pull request), projected with its label names.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Issue {
    pub number: IssueNumber,
    pub title: String,
    pub state: String,
    pub user: Option<String>,
    pub created_at: Option<String>,
    pub updated_at: Option<String>,
    pub html_url: Option<String>,
    pub labels: Vec<String>,
}

/// Basic repository metadata.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepoInfo {
    pub name: String,
    pub full_name: String,
    pub description: Option<String>,
    pub html_url: Option<String>,
    pub stars: u64,
    pub forks: u64,
    pub open_issues: u64,
    pub default_branch: Option<String>,
}

/// Read-only view of a repository's activity.
///
/// See the module documentation for the failure contract.
#[async_trait]
pub trait ActivityGateway: Send + Sync {
    /// Lists pull requests in `state`, newest first as GitHub returns them.
    async fn fetch_pull_requests(&self, repo: &RepositoryId, state: ItemState)
        -> Vec<PullRequest>;

    /// Lists up to `limit` of the most recent commits on the default branch,
    /// newest first.
    async fn fetch_commits(&self, repo: &RepositoryId, limit: u32) -> Vec<Commit>;

    /// Lists issues in `state`, excluding pull requests.
    async fn fetch_issues(&self, repo: &RepositoryId, state: ItemState) -> Vec<Issue>;

    /// Fetches repository metadata.
    async fn fetch_repo_info(&self, repo: &RepositoryId) -> Option<RepoInfo>;
}

// ---------------------------------------------------------------------------
// In-process gateway
// ---------------------------------------------------------------------------

/// Canned activity for one repository.
#[derive(Debug, Clone, Default)]
pub struct RepoActivity {
    pub pull_requests: Vec<PullRequest>,
    pub commits: Vec<Commit>,
    pub issues: Vec<Issue>,
    pub info: Option<RepoInfo>,
}

/// An [`ActivityGateway`] that serves fixed activity from memory.
///
/// Intended for tests and offline runs. Unknown repositories behave like a
/// failed fetch: empty lists and no repository info. Every call is counted so
/// tests can assert which fetches happened.
#[derive(Debug, Default)]
pub struct StaticGateway {
    repos: Mutex<HashMap<RepositoryId, RepoActivity>>,
    calls: Mutex<Vec<String>>,
}

impl StaticGateway {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the activity served for `repo`.
    pub fn set(&self, repo: &RepositoryId, activity: RepoActivity) {
        self.lock_repos().insert(repo.clone(), activity);
    }

    /// Builder-style variant of [`StaticGateway::set`].
    #[must_use]
    pub fn with(self, repo: &RepositoryId, activity: RepoActivity) -> Self {
        self.set(repo, activity);
        self
    }

    /// The calls made so far, as `"<operation> <repo>"` strings.
    pub fn calls(&self) -> Vec<String> {
        self.calls
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .clone()
    }

    fn lock_repos(&self) -> std::sync::MutexGuard<'_, HashMap<RepositoryId, RepoActivity>> {
        self.repos
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    fn record(&self, operation: &str, repo: &RepositoryId) {
        self.calls
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .push(format!("{operation} {repo}"));
    }

    fn activity(&self, repo: &RepositoryId) -> RepoActivity {
        self.lock_repos().get(repo).cloned().unwrap_or_default()
    }
}

#[async_trait]
impl ActivityGateway for StaticGateway {
    async fn fetch_pull_requests(
        &self,
        repo: &RepositoryId,
        state: ItemState,
    ) -> Vec<PullRequest> {
        self.record("pulls", repo);
        self.activity(repo)
            .pull_requests
            .into_iter()
            .filter(|pr| state == ItemState::All || pr.state == state.as_str())
            .collect()
    }

    async fn fetch_commits(&self, repo: &RepositoryId, limit: u32) -> Vec<Commit> {
        self.record("commits", repo);
        let mut commits = self.activity(repo).commits;
        commits.truncate(limit as usize);
        commits
    }

    async fn fetch_issues(&self, repo: &RepositoryId, state: ItemState) -> Vec<Issue> {
        self.record("issues", repo);
        self.activity(repo)
            .issues
            .into_iter()
            .filter(|issue| state == ItemState::All || issue.state == state.as_str())
            .collect()
    }

    async fn fetch_repo_info(&self, repo: &RepositoryId) -> Option<RepoInfo> {
        self.record("repo", repo);
        self.activity(repo).info
    }
}

// ---------------------------------------------------------------------------
// Fixture helpers
// ---------------------------------------------------------------------------

impl PullRequest {
    /// An open pull request with only the fields the engine reads filled in.
    pub fn open(number: u64, title: impl Into<String>, draft: bool) -> Self {
        Self {
            number: PullRequestNumber::new(number),
            title: title.into(),
            state: ItemState::Open.as_str().to_string(),
            user: None,
            created_at: None,
            updated_at: None,
            html_url: None,
            draft,
        }
    }
}

impl Commit {
    /// A commit authored at `date` (raw GitHub timestamp text).
    pub fn dated(sha: impl Into<String>, date: impl Into<String>) -> Self {
        Self {
            sha: sha.into(),
            message: String::new(),
            author: None,
            date: Some(date.into()),
            html_url: None,
        }
    }
}

impl Issue {
    /// An open issue carrying `labels`.
    pub fn open(number: u64, title: impl Into<String>, labels: &[&str]) -> Self {
        Self {
            number: IssueNumber::new(number),
            title: title.into(),
            state: ItemState::Open.as_str().to_string(),
            user: None,
            created_at: None,
            updated_at: None,
            html_url: None,
            labels: labels.iter().map(|l| (*l).to_string()).collect(),
        }
    }
}
