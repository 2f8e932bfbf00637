//! Commit activity read from the GitHub REST API, for machines without the
//! local checkouts.

use std::time::Duration;

use chrono::{DateTime, Utc};
use pulse_core::data_processors::TimestampProcessor;
use pulse_core::error::{PulseError, Result};
use pulse_core::exclusions::ExclusionList;
use pulse_core::models::GitSummary;
use pulse_core::time_utils::{TimeWindows, Window};
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, info, warn};

use super::git::{summarize, Commit, RepoActivity};

pub const GITHUB_API_URL: &str = "https://api.github.com";
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);
pub const PER_PAGE: usize = 100;
pub const MAX_REPO_PAGES: usize = 10;
pub const MAX_COMMIT_PAGES: usize = 5;

// ── Wire types ────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct ApiRepo {
    pub name: String,
    #[serde(default)]
    pub fork: bool,
    #[serde(default)]
    pub pushed_at: Option<String>,
    #[serde(default)]
    pub language: Option<String>,
    #[serde(default)]
    pub owner: Option<ApiOwner>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct ApiOwner {
    pub login: String,
}

/// Repositories worth querying for commits: not forks, not excluded and
/// pushed inside the 30-day window.
pub fn active_repos<'a>(
    repos: &'a [ApiRepo],
    exclusions: &ExclusionList,
    windows: &TimeWindows,
) -> Vec<&'a ApiRepo> {
    repos
        .iter()
        .filter(|r| !r.fork && !exclusions.contains(&r.name))
        .filter(|r| {
            r.pushed_at
                .as_deref()
                .and_then(TimestampProcessor::parse_str)
                .map(|ts| windows.contains(Window::Month, ts))
                .unwrap_or(false)
        })
        .collect()
}

/// Decode one entry of the commits endpoint.
pub fn commit_from_api(value: &Value) -> Option<Commit> {
    let hash = value.get("sha").and_then(Value::as_str)?.to_string();
    let commit = value.get("commit")?;
    let timestamp = commit
        .pointer("/author/date")
        .and_then(TimestampProcessor::parse)?;
    let subject = commit
        .get("message")
        .and_then(Value::as_str)
        .and_then(|m| m.lines().next())
        .unwrap_or_default()
        .to_string();
    Some(Commit {
        hash,
        timestamp,
        subject,
    })
}

// ── GitHubClient ──────────────────────────────────────────────────────────────

pub struct GitHubClient {
    http: reqwest::Client,
    base_url: String,
    token: Option<String>,
}

impl GitHubClient {
    pub fn new(base_url: &str, token: Option<String>) -> Result<Self> {
        let http = reqwest::Client::builder()
            .user_agent(concat!("devpulse/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| PulseError::Http(e.to_string()))?;
        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            token: token.filter(|t| !t.trim().is_empty()),
        })
    }

    async fn get_page(&self, path: &str, query: &[(&str, String)]) -> Result<Vec<Value>> {
        let url = format!("{}{}", self.base_url, path);
        let mut request = self
            .http
            .get(&url)
            .header("Accept", "application/vnd.github+json")
            .header("X-GitHub-Api-Version", "2022-11-28")
            .query(query)
            .timeout(REQUEST_TIMEOUT);
        if let Some(token) = &self.token {
            request = request.bearer_auth(token);
        }

        let response = request
            .send()
            .await
            .map_err(|e| PulseError::Http(format!("{}: {}", url, e)))?;
        if !response.status().is_success() {
            return Err(PulseError::Http(format!(
                "{} returned {}",
                url,
                response.status()
            )));
        }
        response
            .json::<Vec<Value>>()
            .await
            .map_err(|e| PulseError::Http(format!("{}: {}", url, e)))
    }

    /// Fetch up to `max_pages` pages. Fails only when the first page does.
    async fn get_paginated(
        &self,
        path: &str,
        query: &[(&str, String)],
        max_pages: usize,
    ) -> Result<Vec<Value>> {
        let mut items = Vec::new();
        for page in 1..=max_pages {
            let mut page_query = query.to_vec();
            page_query.push(("per_page", PER_PAGE.to_string()));
            page_query.push(("page", page.to_string()));

            let batch = match self.get_page(path, &page_query).await {
                Ok(batch) => batch,
                Err(e) if page == 1 => return Err(e),
                Err(e) => {
                    warn!("Stopping pagination of {}: {}", path, e);
                    break;
                }
            };
            let count = batch.len();
            items.extend(batch);
            if count < PER_PAGE {
                break;
            }
        }
        Ok(items)
    }

    /// Repositories owned by `user` (or by the token holder).
    pub async fn list_repos(&self, user: Option<&str>) -> Result<Vec<ApiRepo>> {
        let path = match (&self.token, user) {
            (Some(_), _) => "/user/repos".to_string(),
            (None, Some(user)) => format!("/users/{}/repos", user),
            (None, None) => {
                return Err(PulseError::Config(
                    "a GitHub token or username is required".to_string(),
                ))
            }
        };
        let query = [("type", "owner".to_string()), ("sort", "pushed".to_string())];
        let values = self.get_paginated(&path, &query, MAX_REPO_PAGES).await?;
        Ok(values
            .into_iter()
            .filter_map(|v| serde_json::from_value::<ApiRepo>(v).ok())
            .collect())
    }

    /// Commits by `author` since `since`; empty on failure.
    pub async fn repo_commits(&self, owner: &str, repo: &str, since: DateTime<Utc>) -> Vec<Commit> {
        let path = format!("/repos/{}/{}/commits", owner, repo);
        let query = [("since", since.to_rfc3339()), ("author", owner.to_string())];
        match self.get_paginated(&path, &query, MAX_COMMIT_PAGES).await {
            Ok(values) => values.iter().filter_map(commit_from_api).collect(),
            Err(e) => {
                debug!("No commits for {}: {}", repo, e);
                Vec::new()
            }
        }
    }
}

// ── Public API ────────────────────────────────────────────────────────────────

/// Summarise commit activity through the GitHub API.
///
/// Returns `None` when the repository listing fails so the caller can fall
/// back to the local scan.
pub async fn collect(
    base_url: &str,
    token: Option<String>,
    user: Option<&str>,
    exclusions: &ExclusionList,
    windows: &TimeWindows,
) -> Option<GitSummary> {
    let client = match GitHubClient::new(base_url, token) {
        Ok(c) => c,
        Err(e) => {
            warn!("Failed to build GitHub client: {}", e);
            return None;
        }
    };

    let repos = match client.list_repos(user).await {
        Ok(repos) => repos,
        Err(e) => {
            warn!("GitHub repository listing failed: {}", e);
            return None;
        }
    };

    let active = active_repos(&repos, exclusions, windows);
    info!(
        total = repos.len(),
        active = active.len(),
        "GitHub repositories listed"
    );

    let since = windows.cutoff(Window::Month);
    let mut activity = Vec::new();
    for repo in active {
        let owner = repo
            .owner
            .as_ref()
            .map(|o| o.login.as_str())
            .or(user)
            .unwrap_or_default();
        if owner.is_empty() {
            continue;
        }
        let commits = client.repo_commits(owner, &repo.name, since).await;
        activity.push(RepoActivity {
            name: repo.name.clone(),
            commits,
            language: repo.language.clone(),
        });
    }

    Some(summarize(&activity, windows))
}

// ── Tests ─────────────────────────────────────────────────────────────────────
