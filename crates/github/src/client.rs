//! reqwest-backed [`ActivityGateway`].

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};
use tracker::{ActivityGateway, Commit, Issue, ItemState, PullRequest, RepoInfo, RepositoryId};

use crate::wire::{RawCommit, RawIssue, RawPullRequest, RawRepo};
use crate::GithubError;

/// Default REST API root.
pub const DEFAULT_API_BASE: &str = "https://api.github.com";

/// Default bound on every request, connect through body.
pub const DEFAULT_TIMEOUT_SECS: u64 = 10;

/// Page size for pull request and issue listings.
pub const LIST_PAGE_SIZE: u32 = 10;

const USER_AGENT: &str = concat!("repo-tracker/", env!("CARGO_PKG_VERSION"));

/// Connection settings for [`GithubClient`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GithubConfig {
    #[serde(default = "default_api_base")]
    pub api_base: String,

    /// Personal access or installation token. Requests are anonymous when
    /// unset (and subject to GitHub's lower anonymous rate limit).
    #[serde(default)]
    pub token: Option<String>,

    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_api_base() -> String {
    DEFAULT_API_BASE.to_string()
}

fn default_timeout_secs() -> u64 {
    DEFAULT_TIMEOUT_SECS
}

impl Default for GithubConfig {
    fn default() -> Self {
        Self {
            api_base: default_api_base(),
            token: None,
            timeout_secs: DEFAULT_TIMEOUT_SECS,
        }
    }
}

/// GitHub REST client implementing [`ActivityGateway`].
///
/// Every failure is logged at `warn` and degrades to an empty result, as the
/// gateway contract requires.
#[derive(Debug, Clone)]
pub struct GithubClient {
    http: reqwest::Client,
    api_base: String,
    token: Option<String>,
}

impl GithubClient {
    pub fn new(config: &GithubConfig) -> Result<Self, GithubError> {
        let mut headers = HeaderMap::new();
        headers.insert(
            ACCEPT,
            HeaderValue::from_static("application/vnd.github+json"),
        );
        headers.insert(
            "x-github-api-version",
            HeaderValue::from_static("2022-11-28"),
        );
        let http = reqwest::Client::builder()
            .default_headers(headers)
            .user_agent(USER_AGENT)
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(GithubError::ClientBuild)?;
        Ok(Self {
            http,
            api_base: config.api_base.trim_end_matches('/').to_string(),
            token: config.token.clone().filter(|t| !t.is_empty()),
        })
    }

    async fn get<T: DeserializeOwned>(
        &self,
        endpoint: &str,
        query: &[(&str, String)],
    ) -> Result<T, GithubError> {
        let url = format!("{}/{}", self.api_base, endpoint);
        let mut request = self.http.get(&url).query(query);
        if let Some(token) = &self.token {
            request = request.bearer_auth(token);
        }

        let response = request.send().await.map_err(|source| GithubError::Transport {
            endpoint: endpoint.to_string(),
            source,
        })?;
        let status = response.status();
        if !status.is_success() {
            return Err(GithubError::Status {
                endpoint: endpoint.to_string(),
                status: status.as_u16(),
            });
        }
        response.json::<T>().await.map_err(|source| GithubError::Decode {
            endpoint: endpoint.to_string(),
            source,
        })
    }

    /// Runs a request, logging and swallowing any failure.
    async fn get_or_none<T: DeserializeOwned>(
        &self,
        repo: &RepositoryId,
        endpoint: &str,
        query: &[(&str, String)],
    ) -> Option<T> {
        match self.get(endpoint, query).await {
            Ok(value) => Some(value),
            Err(error) => {
                warn!(repo = %repo, %error, "GitHub request failed; treating as no data");
                None
            }
        }
    }

    /// Fetches a JSON array and decodes each item on its own, so one
    /// malformed item is skipped rather than emptying the listing.
    async fn list<T: DeserializeOwned>(
        &self,
        repo: &RepositoryId,
        endpoint: &str,
        query: &[(&str, String)],
    ) -> Vec<T> {
        let items: Vec<serde_json::Value> = self
            .get_or_none(repo, endpoint, query)
            .await
            .unwrap_or_default();
        decode_items(repo, endpoint, items)
    }
}

fn decode_items<T: DeserializeOwned>(
    repo: &RepositoryId,
    endpoint: &str,
    items: Vec<serde_json::Value>,
) -> Vec<T> {
    items
        .into_iter()
        .enumerate()
        .filter_map(|(index, item)| match serde_json::from_value(item) {
            Ok(value) => Some(value),
            Err(error) => {
                warn!(repo = %repo, endpoint, index, %error, "skipping undecodable item");
                None
            }
        })
        .collect()
}

#[async_trait]
impl ActivityGateway for GithubClient {
    async fn fetch_pull_requests(
        &self,
        repo: &RepositoryId,
        state: ItemState,
    ) -> Vec<PullRequest> {
        let endpoint = format!("repos/{repo}/pulls");
        let query = [
            ("state", state.as_str().to_string()),
            ("per_page", LIST_PAGE_SIZE.to_string()),
        ];
        let raw: Vec<RawPullRequest> = self.list(repo, &endpoint, &query).await;
        debug!(repo = %repo, count = raw.len(), "fetched pull requests");
        raw.into_iter().map(PullRequest::from).collect()
    }

    async fn fetch_commits(&self, repo: &RepositoryId, limit: u32) -> Vec<Commit> {
        let endpoint = format!("repos/{repo}/commits");
        let query = [("per_page", limit.to_string())];
        let raw: Vec<RawCommit> = self.list(repo, &endpoint, &query).await;
        debug!(repo = %repo, count = raw.len(), "fetched commits");
        raw.into_iter().map(Commit::from).collect()
    }

    async fn fetch_issues(&self, repo: &RepositoryId, state: ItemState) -> Vec<Issue> {
        let endpoint = format!("repos/{repo}/issues");
        let query = [
            ("state", state.as_str().to_string()),
            ("per_page", LIST_PAGE_SIZE.to_string()),
        ];
        let raw: Vec<RawIssue> = self.list(repo, &endpoint, &query).await;
        let issues: Vec<Issue> = raw
            .into_iter()
            .filter(|issue| !issue.is_pull_request())
            .map(Issue::from)
            .collect();
        debug!(repo = %repo, count = issues.len(), "fetched issues");
        issues
    }

    async fn fetch_repo_info(&self, repo: &RepositoryId) -> Option<RepoInfo> {
        let endpoint = format!("repos/{repo}");
        self.get_or_none::<RawRepo>(repo, &endpoint, &[])
            .await
            .map(RepoInfo::from)
    }
}
