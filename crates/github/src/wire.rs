//! Raw GitHub REST response shapes and their projection onto the tracker's
//! normalised records.
//!
//! Every field GitHub may omit is optional or defaulted so that one odd item
//! never fails a whole listing.

use serde::de::IgnoredAny;
use serde::{Deserialize, Deserializer};
use tracker::{Commit, Issue, IssueNumber, PullRequest, PullRequestNumber, RepoInfo};

/// Length of the abbreviated commit SHA shown to users.
pub const SHORT_SHA_LEN: usize = 7;

#[derive(Debug, Default, Deserialize)]
pub(crate) struct RawUser {
    #[serde(default)]
    login: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct RawPullRequest {
    number: u64,
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    state: Option<String>,
    #[serde(default)]
    user: Option<RawUser>,
    #[serde(default)]
    created_at: Option<String>,
    #[serde(default)]
    updated_at: Option<String>,
    #[serde(default)]
    html_url: Option<String>,
    #[serde(default)]
    draft: Option<bool>,
}

impl From<RawPullRequest> for PullRequest {
    fn from(raw: RawPullRequest) -> Self {
        Self {
            number: PullRequestNumber::new(raw.number),
            title: raw.title.unwrap_or_default(),
            state: raw.state.unwrap_or_default(),
            user: raw.user.and_then(|u| u.login),
            created_at: raw.created_at,
            updated_at: raw.updated_at,
            html_url: raw.html_url,
            draft: raw.draft.unwrap_or(false),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct RawSignature {
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    date: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct RawCommitDetail {
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    author: Option<RawSignature>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct RawCommit {
    #[serde(default)]
    sha: String,
    #[serde(default)]
    commit: RawCommitDetail,
    #[serde(default)]
    html_url: Option<String>,
}

impl From<RawCommit> for Commit {
    fn from(raw: RawCommit) -> Self {
        let message = raw
            .commit
            .message
            .as_deref()
            .and_then(|m| m.lines().next())
            .unwrap_or_default()
            .to_string();
        let author = raw.commit.author.unwrap_or_default();
        Self {
            sha: raw.sha.chars().take(SHORT_SHA_LEN).collect(),
            message,
            author: author.name,
            date: author.date,
            html_url: raw.html_url,
        }
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct RawLabel {
    #[serde(default)]
    name: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct RawIssue {
    number: u64,
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    state: Option<String>,
    #[serde(default)]
    user: Option<RawUser>,
    #[serde(default)]
    created_at: Option<String>,
    #[serde(default)]
    updated_at: Option<String>,
    #[serde(default)]
    html_url: Option<String>,
    #[serde(default)]
    labels: Vec<RawLabel>,
    /// The key is present only on pull requests, which the issues endpoint
    /// also returns. Its value is irrelevant.
    #[serde(default, rename = "pull_request", deserialize_with = "key_present")]
    has_pull_request_key: bool,
}

fn key_present<'de, D: Deserializer<'de>>(deserializer: D) -> Result<bool, D::Error> {
    IgnoredAny::deserialize(deserializer).map(|_| true)
}

impl RawIssue {
    pub(crate) fn is_pull_request(&self) -> bool {
        self.has_pull_request_key
    }
}

impl From<RawIssue> for Issue {
    fn from(raw: RawIssue) -> Self {
        Self {
            number: IssueNumber::new(raw.number),
            title: raw.title.unwrap_or_default(),
            state: raw.state.unwrap_or_default(),
            user: raw.user.and_then(|u| u.login),
            created_at: raw.created_at,
            updated_at: raw.updated_at,
            html_url: raw.html_url,
            labels: raw.labels.into_iter().filter_map(|l| l.name).collect(),
        }
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct RawRepo {
    #[serde(default)]
    name: String,
    #[serde(default)]
    full_name: String,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    html_url: Option<String>,
    #[serde(default)]
    stargazers_count: u64,
    #[serde(default)]
    forks_count: u64,
    #[serde(default)]
    open_issues_count: u64,
    #[serde(default)]
    default_branch: Option<String>,
}

impl From<RawRepo> for RepoInfo {
    fn from(raw: RawRepo) -> Self {
        Self {
            name: raw.name,
            full_name: raw.full_name,
            description: raw.description,
            html_url: raw.html_url,
            stars: raw.stargazers_count,
            forks: raw.forks_count,
            open_issues: raw.open_issues_count,
            default_branch: raw.default_branch,
        }
    }
}
