//! Commit activity from local repository checkouts.
//!
//! Every immediate child of the git root holding a `.git` entry is one
//! repository. Each gets a single `git log` over the 30-day window, split
//! into windows in-process, and a `git ls-files` for language detection.
//! A git call that fails or times out counts as no data for that repository.

use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;

use chrono::{DateTime, Utc};
use pulse_core::data_processors::TimestampProcessor;
use pulse_core::error::{PulseError, Result};
use pulse_core::exclusions::ExclusionList;
use pulse_core::models::{DailyCommits, GitSummary, LanguageCommits, LastActivity, RepoCommits};
use pulse_core::time_utils::{date_key, iso_utc, TimeWindows, Window};
use tokio::process::Command;
use tracing::{debug, info};

/// Per-command timeout for `git log` and `git ls-files`.
pub const GIT_TIMEOUT: Duration = Duration::from_secs(5);

/// Timeout for resolving a checkout's `origin` URL.
pub const REMOTE_URL_TIMEOUT: Duration = Duration::from_secs(2);

/// Number of repositories kept in `top_repos_7d`.
pub const TOP_REPOS: usize = 5;

/// Extension → language, in tie-break order.
pub const LANGUAGE_EXTENSIONS: &[(&str, &str)] = &[
    ("py", "Python"),
    ("js", "JavaScript"),
    ("ts", "TypeScript"),
    ("go", "Go"),
    ("rs", "Rust"),
    ("java", "Java"),
    ("rb", "Ruby"),
    ("sh", "Shell"),
    ("c", "C"),
    ("cpp", "C++"),
];

// ── Commit ────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
pub struct Commit {
    pub hash: String,
    pub timestamp: DateTime<Utc>,
    pub subject: String,
}

/// Everything collected for one repository.
#[derive(Debug, Clone, PartialEq)]
pub struct RepoActivity {
    pub name: String,
    pub commits: Vec<Commit>,
    pub language: Option<String>,
}

// ── Parsing ───────────────────────────────────────────────────────────────────

/// Parse one `%H|%aI|%s` line. The subject may itself contain `|`.
pub fn parse_git_log_line(line: &str) -> Option<Commit> {
    let mut parts = line.splitn(3, '|');
    let hash = parts.next()?.trim();
    let timestamp = parts.next()?.trim();
    let subject = parts.next()?;

    if hash.is_empty() {
        return None;
    }

    Some(Commit {
        hash: hash.to_string(),
        timestamp: TimestampProcessor::parse_str(timestamp)?,
        subject: subject.to_string(),
    })
}

/// Parse the full stdout of `git log --format=%H|%aI|%s`.
pub fn parse_git_log_output(stdout: &str) -> Vec<Commit> {
    stdout
        .lines()
        .filter(|l| !l.trim().is_empty())
        .filter_map(parse_git_log_line)
        .collect()
}

/// Dominant language among tracked files, by extension frequency.
///
/// Ties go to the extension listed first in [`LANGUAGE_EXTENSIONS`].
pub fn detect_language<'a>(files: impl IntoIterator<Item = &'a str>) -> Option<&'static str> {
    let mut counts = [0usize; LANGUAGE_EXTENSIONS.len()];
    for file in files {
        let Some(ext) = Path::new(file.trim()).extension().and_then(|e| e.to_str()) else {
            continue;
        };
        if let Some(idx) = LANGUAGE_EXTENSIONS.iter().position(|(e, _)| *e == ext) {
            counts[idx] += 1;
        }
    }

    let mut best: Option<(usize, usize)> = None;
    for (idx, count) in counts.iter().enumerate() {
        if *count == 0 {
            continue;
        }
        match best {
            Some((_, best_count)) if *count <= best_count => {}
            _ => best = Some((idx, *count)),
        }
    }
    best.map(|(idx, _)| LANGUAGE_EXTENSIONS[idx].1)
}

/// Rewrite an `origin` URL into a browsable GitHub HTTPS URL.
///
/// Returns `None` for remotes that are not hosted on GitHub.
pub fn normalize_github_url(url: &str) -> Option<String> {
    let url = url.trim();
    if !url.contains("github.com") {
        return None;
    }
    let https = if let Some(rest) = url.strip_prefix("git@github.com:") {
        format!("https://github.com/{}", rest)
    } else if let Some(rest) = url.strip_prefix("ssh://git@github.com/") {
        format!("https://github.com/{}", rest)
    } else {
        url.to_string()
    };
    let trimmed = https.trim_end_matches('/');
    Some(trimmed.strip_suffix(".git").unwrap_or(trimmed).to_string())
}

// ── Summary ───────────────────────────────────────────────────────────────────

/// Fold per-repository commits into the version-control summary.
///
/// Commits outside the 30-day window are ignored, so callers may pass
/// unfiltered history.
pub fn summarize(repos: &[RepoActivity], windows: &TimeWindows) -> GitSummary {
    let mut summary = GitSummary::empty();
    let mut top: Vec<RepoCommits> = Vec::new();
    let mut languages: HashMap<String, u64> = HashMap::new();
    let mut daily: BTreeMap<String, u64> = BTreeMap::new();
    let mut last: Option<(&str, DateTime<Utc>)> = None;

    for repo in repos {
        let month: Vec<&Commit> = repo
            .commits
            .iter()
            .filter(|c| windows.contains(Window::Month, c.timestamp))
            .collect();
        if month.is_empty() {
            continue;
        }
        let week: Vec<&Commit> = month
            .iter()
            .copied()
            .filter(|c| windows.contains(Window::Week, c.timestamp))
            .collect();

        summary.repos_active_30d += 1;
        summary.commits_30d += month.len() as u64;
        for commit in &month {
            *daily.entry(date_key(commit.timestamp)).or_default() += 1;
        }
        if let Some(language) = &repo.language {
            *languages.entry(language.clone()).or_default() += month.len() as u64;
        }

        if week.is_empty() {
            continue;
        }
        summary.repos_active_7d += 1;
        summary.commits_7d += week.len() as u64;
        top.push(RepoCommits {
            repo: repo.name.clone(),
            commits: week.len() as u64,
        });

        if let Some(latest) = week.iter().map(|c| c.timestamp).max() {
            if last.map(|(_, ts)| latest > ts).unwrap_or(true) {
                last = Some((repo.name.as_str(), latest));
            }
        }
    }

    top.sort_by(|a, b| b.commits.cmp(&a.commits).then_with(|| a.repo.cmp(&b.repo)));
    top.truncate(TOP_REPOS);
    summary.top_repos_7d = top;

    let mut languages: Vec<LanguageCommits> = languages
        .into_iter()
        .map(|(name, commits)| LanguageCommits { name, commits })
        .collect();
    languages.sort_by(|a, b| b.commits.cmp(&a.commits).then_with(|| a.name.cmp(&b.name)));
    summary.languages_30d = languages;

    summary.daily_commits = daily
        .into_iter()
        .map(|(date, commits)| DailyCommits { date, commits })
        .collect();

    summary.last_push = last.map(|(repo, ts)| LastActivity {
        repo: repo.to_string(),
        timestamp: iso_utc(ts),
        hours_ago: windows.hours_since(ts),
        mode: None,
    });

    summary
}

// ── Git commands ──────────────────────────────────────────────────────────────

/// Run `git -C <repo> <args>` and return stdout on success.
async fn run_git(repo: &Path, args: &[&str], timeout: Duration) -> Result<String> {
    let command_err = |reason: String| PulseError::Command {
        command: format!("git {}", args.join(" ")),
        reason,
    };

    let mut cmd = Command::new("git");
    cmd.arg("-C")
        .arg(repo)
        .args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);

    let output = tokio::time::timeout(timeout, cmd.output())
        .await
        .map_err(|_| command_err(format!("timed out after {}s", timeout.as_secs())))?
        .map_err(|e| command_err(e.to_string()))?;

    if !output.status.success() {
        return Err(command_err(format!("exited with {}", output.status)));
    }
    Ok(String::from_utf8_lossy(&output.stdout).into_owned())
}

/// Non-merge commits since `since`; empty on any git failure.
pub async fn repo_commits(repo: &Path, since: DateTime<Utc>) -> Vec<Commit> {
    let since_arg = format!("--since={}", since.to_rfc3339());
    match run_git(
        repo,
        &["log", &since_arg, "--format=%H|%aI|%s", "--no-merges"],
        GIT_TIMEOUT,
    )
    .await
    {
        Ok(stdout) => parse_git_log_output(&stdout),
        Err(e) => {
            debug!(repo = %repo.display(), "{}", e);
            Vec::new()
        }
    }
}

/// Dominant language of the tracked files.
pub async fn repo_language(repo: &Path) -> Option<&'static str> {
    match run_git(repo, &["ls-files"], GIT_TIMEOUT).await {
        Ok(stdout) => detect_language(stdout.lines()),
        Err(e) => {
            debug!(repo = %repo.display(), "{}", e);
            None
        }
    }
}

/// GitHub URL of the checkout's `origin` remote, if it has one.
pub async fn remote_url(repo: &Path) -> Option<String> {
    let stdout = run_git(repo, &["remote", "get-url", "origin"], REMOTE_URL_TIMEOUT)
        .await
        .map_err(|e| debug!(repo = %repo.display(), "{}", e))
        .ok()?;
    normalize_github_url(&stdout)
}

/// Immediate children of `git_dir` that are checkouts and not excluded.
pub fn discover_repos(git_dir: &Path, exclusions: &ExclusionList) -> Vec<PathBuf> {
    let entries = match std::fs::read_dir(git_dir) {
        Ok(entries) => entries,
        Err(e) => {
            info!("Git directory {} unreadable: {}", git_dir.display(), e);
            return Vec::new();
        }
    };

    let mut repos: Vec<PathBuf> = entries
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|path| path.is_dir() && path.join(".git").exists())
        .filter(|path| {
            path.file_name()
                .and_then(|n| n.to_str())
                .map(|name| !exclusions.contains(name))
                .unwrap_or(false)
        })
        .collect();
    repos.sort();
    repos
}

/// Summarise commit activity across every checkout under `git_dir`.
pub async fn collect(
    git_dir: &Path,
    exclusions: &ExclusionList,
    windows: &TimeWindows,
) -> GitSummary {
    if !git_dir.is_dir() {
        info!("Git directory not found at {}", git_dir.display());
        return GitSummary::empty();
    }

    let since = windows.cutoff(Window::Month);
    let mut activity = Vec::new();

    for repo in discover_repos(git_dir, exclusions) {
        let name = repo
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let commits = repo_commits(&repo, since).await;
        let language = if commits.is_empty() {
            None
        } else {
            repo_language(&repo).await.map(str::to_string)
        };
        debug!(repo = %name, commits = commits.len(), ?language, "scanned repository");
        activity.push(RepoActivity {
            name,
            commits,
            language,
        });
    }

    summarize(&activity, windows)
}

// ── Tests ─────────────────────────────────────────────────────────────────────
