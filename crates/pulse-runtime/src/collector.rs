//! Sequential collection pipeline.
//!
//! Runs every source to completion, one after another, then merges the
//! results. Remote sources are tried first when enabled; when they are
//! unavailable the run falls back to the local logs and checkouts.

use std::path::PathBuf;

use pulse_core::data_processors::GroupKeyExtractor;
use pulse_core::exclusions::ExclusionList;
use pulse_core::models::{AiSources, GitSummary, ProfileReport, Provider};
use pulse_core::settings::{Settings, SourcePaths};
use pulse_core::time_utils::TimeWindows;
use pulse_data::merge::merge;
use pulse_data::sources::{
    claude, codex, cursor, gemini, git, github_api, hub_api, ScanContext,
};
use tracing::{debug, info, warn};

// ── CollectorConfig ───────────────────────────────────────────────────────────

/// Everything the pipeline needs, resolved from [`Settings`].
#[derive(Debug, Clone)]
pub struct CollectorConfig {
    pub paths: SourcePaths,
    pub anchor_dir: String,
    pub exclusions: ExclusionList,
    pub remote: bool,
    pub api_url: String,
    pub api_key: Option<String>,
    pub github_api_url: String,
    pub github_token: Option<String>,
    pub github_user: Option<String>,
}

impl CollectorConfig {
    pub fn from_settings(settings: &Settings) -> Self {
        Self::with_paths(settings, settings.source_paths())
    }

    /// Same as [`CollectorConfig::from_settings`] with explicit source paths.
    pub fn with_paths(settings: &Settings, paths: SourcePaths) -> Self {
        Self {
            paths,
            anchor_dir: settings.anchor_dir.clone(),
            exclusions: settings.exclusions(),
            remote: settings.remote,
            api_url: settings.api_url.clone(),
            api_key: settings.api_key.clone(),
            github_api_url: github_api::GITHUB_API_URL.to_string(),
            github_token: settings.github_token.clone(),
            github_user: settings.github_user.clone(),
        }
    }

    fn has_github_credentials(&self) -> bool {
        self.github_token.is_some() || self.github_user.is_some()
    }
}

/// Where the AI-session data of a run came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataOrigin {
    Local,
    Remote,
}

impl DataOrigin {
    pub fn label(&self) -> &'static str {
        match self {
            DataOrigin::Local => "local files",
            DataOrigin::Remote => "stats API",
        }
    }
}

/// Result of one pipeline run.
#[derive(Debug, Clone)]
pub struct Collection {
    pub report: ProfileReport,
    pub origin: DataOrigin,
}

// ── Collector ─────────────────────────────────────────────────────────────────

pub struct Collector {
    config: CollectorConfig,
    windows: TimeWindows,
}

impl Collector {
    pub fn new(config: CollectorConfig) -> Self {
        Self::with_windows(config, TimeWindows::now())
    }

    /// Use a fixed reference instant instead of the current time.
    pub fn with_windows(config: CollectorConfig, windows: TimeWindows) -> Self {
        Self { config, windows }
    }

    fn context(&self) -> ScanContext {
        ScanContext::new(
            self.windows,
            GroupKeyExtractor::new(self.config.anchor_dir.clone()),
        )
        .with_home(self.config.paths.home.clone())
        .with_exclusions(self.config.exclusions.clone())
    }

    /// Commit activity, from the GitHub API in remote mode when possible.
    pub async fn collect_git(&self) -> GitSummary {
        if self.config.remote && self.config.has_github_credentials() {
            info!("Collecting commit activity from the GitHub API");
            if let Some(summary) = github_api::collect(
                &self.config.github_api_url,
                self.config.github_token.clone(),
                self.config.github_user.as_deref(),
                &self.config.exclusions,
                &self.windows,
            )
            .await
            {
                return summary;
            }
            warn!("GitHub API unavailable, falling back to local checkouts");
        }

        info!("Collecting commit activity from {}", self.config.paths.git_dir.display());
        git::collect(&self.config.paths.git_dir, &self.config.exclusions, &self.windows).await
    }

    /// Every AI source parsed from local logs.
    pub fn collect_local_ai(&self) -> AiSources {
        let ctx = self.context();
        let paths = &self.config.paths;

        let mut sources = AiSources::default();
        for provider in Provider::ALL {
            let summary = match provider {
                Provider::Claude => claude::collect(&paths.claude_dir, &ctx),
                Provider::Codex => codex::collect(&paths.codex_dir, &ctx),
                Provider::Cursor => cursor::collect(&paths.cursor_db, &ctx),
                Provider::Gemini => gemini::collect(&paths.gemini_dir, &ctx),
            };
            info!(
                provider = provider.as_str(),
                sessions_7d = summary.sessions_7d,
                turns_7d = summary.turns_7d,
                "collected local sessions"
            );
            *sources.get_mut(provider) = summary;
        }
        sources
    }

    /// AI sources from the stats API in remote mode, else from local logs.
    pub async fn collect_ai(&self) -> (AiSources, DataOrigin) {
        if self.config.remote {
            info!("Fetching AI sessions from {}", self.config.api_url);
            match hub_api::collect(
                &self.config.api_url,
                self.config.api_key.as_deref(),
                &self.context(),
            )
            .await
            {
                Some(sources) => return (sources, DataOrigin::Remote),
                None => warn!("Stats API unavailable, falling back to local parsing"),
            }
        }
        (self.collect_local_ai(), DataOrigin::Local)
    }

    /// Resolve `github_url` for every combined top repository with a local
    /// checkout.
    async fn attach_github_urls(&self, report: &mut ProfileReport) {
        for row in &mut report.aggregate.top_repos_combined {
            let checkout: PathBuf = self.config.paths.git_dir.join(&row.repo);
            if !checkout.join(".git").exists() {
                continue;
            }
            row.github_url = git::remote_url(&checkout).await;
            debug!(repo = %row.repo, url = ?row.github_url, "resolved remote");
        }
    }

    /// Run the whole pipeline.
    pub async fn collect(&self) -> Collection {
        let github = self.collect_git().await;
        info!(
            commits_7d = github.commits_7d,
            repos_active_7d = github.repos_active_7d,
            "collected commit activity"
        );

        let (sources, origin) = self.collect_ai().await;

        let mut report = merge(
            github,
            sources,
            &self.config.exclusions,
            self.windows.reference(),
        );
        self.attach_github_urls(&mut report).await;

        Collection { report, origin }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
