//! Cross-source merge: per-source summaries in, one [`ProfileReport`] out.
//!
//! The exclusion list is applied to every source before any total is taken,
//! and the filtered copies are what the report carries. Merging a report's
//! own sources again therefore yields the same aggregate.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use pulse_core::exclusions::ExclusionList;
use pulse_core::formatting::percentage;
use pulse_core::models::{
    AggregateReport, AiSources, DailyBreakdown, GitSummary, ProfileReport, Provider,
    SourceSummary, TopGroup,
};
use pulse_core::time_utils::iso_utc;
use tracing::debug;

/// Rows kept in `top_repos_combined`.
pub const TOP_GROUPS: usize = 5;

/// Complete days kept in `daily_breakdown_7d`.
pub const DAILY_DAYS: usize = 7;

const PERCENT_PLACES: u32 = 1;

// ── Exclusion ─────────────────────────────────────────────────────────────────

/// Remove excluded repositories from the commit summary, adjusting the
/// 7-day totals they contributed to.
pub fn filter_git(github: &mut GitSummary, exclusions: &ExclusionList) {
    let removed = exclusions.split_repos(&mut github.top_repos_7d);
    let commits: u64 = removed.iter().map(|r| r.commits).sum();
    github.commits_7d = github.commits_7d.saturating_sub(commits);
    github.repos_active_7d = github.repos_active_7d.saturating_sub(removed.len() as u64);

    if github
        .last_push
        .as_ref()
        .map(|l| exclusions.contains(&l.repo))
        .unwrap_or(false)
    {
        github.last_push = None;
    }
}

/// Remove excluded groups from one source and return the sessions that
/// source contributes to the 7-day AI total.
///
/// A source that attributes sessions to groups contributes the sum of its
/// remaining groups; one that never does contributes its own 7-day total.
pub fn filter_source(source: &mut SourceSummary, exclusions: &ExclusionList) -> u64 {
    let had_groups = source.has_group_breakdown();
    let removed = exclusions.split_groups(&mut source.repos);

    let removed_sessions: u64 = removed.iter().map(|g| g.sessions).sum();
    let removed_turns: u64 = removed.iter().map(|g| g.turns).sum();
    source.sessions_7d = source.sessions_7d.saturating_sub(removed_sessions);
    source.turns_7d = source.turns_7d.saturating_sub(removed_turns);

    if source
        .last_session
        .as_ref()
        .map(|l| exclusions.contains(&l.repo))
        .unwrap_or(false)
    {
        source.last_session = None;
    }

    if had_groups {
        source.repos.iter().map(|g| g.sessions).sum()
    } else {
        source.sessions_7d
    }
}

// ── Rankings ──────────────────────────────────────────────────────────────────

/// Combine 7-day commits and AI sessions per group and keep the most active.
///
/// Ordered by `commits + ai_sessions` descending, then by name.
pub fn top_groups(github: &GitSummary, sources: &AiSources, limit: usize) -> Vec<TopGroup> {
    let mut scores: BTreeMap<&str, (u64, u64)> = BTreeMap::new();

    for repo in &github.top_repos_7d {
        scores.entry(repo.repo.as_str()).or_default().0 += repo.commits;
    }
    for (_, source) in sources.iter() {
        for group in &source.repos {
            scores.entry(group.group.as_str()).or_default().1 += group.sessions;
        }
    }

    let mut rows: Vec<TopGroup> = scores
        .into_iter()
        .map(|(repo, (commits, ai_sessions))| TopGroup {
            repo: repo.to_string(),
            commits,
            ai_sessions,
            github_url: None,
        })
        .collect();
    rows.sort_by(|a, b| {
        b.activity()
            .cmp(&a.activity())
            .then_with(|| a.repo.cmp(&b.repo))
    });
    rows.truncate(limit);
    rows
}

/// Union of every source's daily series, trailing `days` complete days.
///
/// The most recent date present is always dropped as partial. With fewer
/// than two distinct dates the result is empty.
pub fn daily_breakdown(github: &GitSummary, sources: &AiSources, days: usize) -> Vec<DailyBreakdown> {
    let mut merged: BTreeMap<&str, DailyBreakdown> = BTreeMap::new();
    let blank = |date: &str| DailyBreakdown {
        date: date.to_string(),
        commits: 0,
        sessions: Provider::ALL.into_iter().map(|p| (p, 0)).collect(),
        total_sessions: 0,
    };

    for day in &github.daily_commits {
        merged
            .entry(day.date.as_str())
            .or_insert_with(|| blank(&day.date))
            .commits += day.commits;
    }
    for (provider, source) in sources.iter() {
        for day in &source.daily_sessions {
            let row = merged
                .entry(day.date.as_str())
                .or_insert_with(|| blank(&day.date));
            *row.sessions.entry(provider).or_default() += day.sessions;
            row.total_sessions += day.sessions;
        }
    }

    if merged.len() < 2 {
        return Vec::new();
    }

    let mut rows: Vec<DailyBreakdown> = merged.into_values().collect();
    rows.pop();
    let skip = rows.len().saturating_sub(days);
    rows.split_off(skip)
}

// ── Public API ────────────────────────────────────────────────────────────────

/// Build the aggregate over already-normalised sources.
pub fn aggregate(
    mut github: GitSummary,
    mut sources: AiSources,
    exclusions: &ExclusionList,
) -> (GitSummary, AiSources, AggregateReport) {
    filter_git(&mut github, exclusions);

    let mut sessions: BTreeMap<Provider, u64> = BTreeMap::new();
    let mut turns: BTreeMap<Provider, u64> = BTreeMap::new();
    for provider in Provider::ALL {
        let source = sources.get_mut(provider);
        sessions.insert(provider, filter_source(source, exclusions));
        turns.insert(provider, source.turns_7d);
    }

    let ai_sessions_7d: u64 = sessions.values().sum();
    let ai_turns_7d: u64 = turns.values().sum();

    let session_percentages = sessions
        .iter()
        .map(|(p, n)| (*p, percentage(*n, ai_sessions_7d, PERCENT_PLACES)))
        .collect();
    let turn_percentages = turns
        .iter()
        .map(|(p, n)| (*p, percentage(*n, ai_turns_7d, PERCENT_PLACES)))
        .collect();

    let report = AggregateReport {
        ai_sessions_7d,
        ai_turns_7d,
        commits_7d: github.commits_7d,
        session_percentages,
        turn_percentages,
        top_repos_combined: top_groups(&github, &sources, TOP_GROUPS),
        daily_breakdown_7d: daily_breakdown(&github, &sources, DAILY_DAYS),
    };

    debug!(
        ai_sessions_7d,
        ai_turns_7d,
        commits_7d = report.commits_7d,
        "merged sources"
    );

    (github, sources, report)
}

/// Merge everything into the document written to disk.
pub fn merge(
    github: GitSummary,
    sources: AiSources,
    exclusions: &ExclusionList,
    generated_at: DateTime<Utc>,
) -> ProfileReport {
    let (github, sources, aggregate) = aggregate(github, sources, exclusions);
    ProfileReport {
        generated_at: iso_utc(generated_at),
        github,
        sources,
        aggregate,
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
