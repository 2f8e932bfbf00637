use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Group key used when a session or commit cannot be attributed to a project.
pub const UNKNOWN_GROUP: &str = "unknown";

// ── Provider ──────────────────────────────────────────────────────────────────

/// An AI coding-assistant whose session logs feed the report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Provider {
    Claude,
    Codex,
    Cursor,
    Gemini,
}

impl Provider {
    /// Every provider, in report order.
    pub const ALL: [Provider; 4] = [
        Provider::Claude,
        Provider::Codex,
        Provider::Cursor,
        Provider::Gemini,
    ];

    /// Lowercase identifier used in JSON keys and API payloads.
    pub fn as_str(&self) -> &'static str {
        match self {
            Provider::Claude => "claude",
            Provider::Codex => "codex",
            Provider::Cursor => "cursor",
            Provider::Gemini => "gemini",
        }
    }

    /// Human-facing name used by the renderers.
    pub fn display_name(&self) -> &'static str {
        match self {
            Provider::Claude => "Claude",
            Provider::Codex => "Codex",
            Provider::Cursor => "Cursor",
            Provider::Gemini => "Gemini",
        }
    }

    /// Case-insensitive lookup by provider name.
    pub fn from_name(name: &str) -> Option<Provider> {
        Provider::ALL
            .into_iter()
            .find(|p| p.as_str().eq_ignore_ascii_case(name.trim()))
    }
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ── Records ───────────────────────────────────────────────────────────────────

/// One atomic record pulled out of a source log, before it is folded into a
/// [`Session`].
#[derive(Debug, Clone, PartialEq)]
pub struct RawEvent {
    /// Identifier shared by all events of the same session.
    pub session_id: String,
    /// Project the event belongs to, when the source records one.
    pub group_key: Option<String>,
    /// When the event happened.
    pub timestamp: DateTime<Utc>,
    /// Number of turns this event represents.
    pub weight: u64,
}

impl RawEvent {
    pub fn new(session_id: impl Into<String>, timestamp: DateTime<Utc>) -> Self {
        Self {
            session_id: session_id.into(),
            group_key: None,
            timestamp,
            weight: 1,
        }
    }
}

/// One bounded interaction with an AI assistant.
#[derive(Debug, Clone, PartialEq)]
pub struct Session {
    pub id: String,
    /// `None` when the source cannot attribute sessions to projects at all.
    pub group_key: Option<String>,
    pub started_at: DateTime<Utc>,
    /// Always at least 1.
    pub turns: u64,
    /// Assistant mode, for sources that record one.
    pub mode: Option<String>,
}

impl Session {
    /// Build a session, flooring `turns` at 1.
    pub fn new(
        id: impl Into<String>,
        group_key: Option<String>,
        started_at: DateTime<Utc>,
        turns: u64,
    ) -> Self {
        Self {
            id: id.into(),
            group_key,
            started_at,
            turns: turns.max(1),
            mode: None,
        }
    }

    pub fn with_mode(mut self, mode: Option<String>) -> Self {
        self.mode = mode;
        self
    }

    /// Group key for display, substituting [`UNKNOWN_GROUP`].
    pub fn group_or_unknown(&self) -> &str {
        self.group_key.as_deref().unwrap_or(UNKNOWN_GROUP)
    }
}

// ── Summaries ─────────────────────────────────────────────────────────────────

/// Sessions and turns attributed to one project.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GroupStats {
    #[serde(rename = "repo")]
    pub group: String,
    pub sessions: u64,
    pub turns: u64,
}

/// Sessions and turns that started on one UTC calendar day.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailyCount {
    /// `YYYY-MM-DD`.
    pub date: String,
    pub sessions: u64,
    #[serde(default)]
    pub turns: u64,
}

/// Most recent activity inside the 7-day window.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LastActivity {
    pub repo: String,
    /// RFC 3339, UTC.
    pub timestamp: String,
    /// Elapsed hours relative to the reference instant, two decimals.
    pub hours_ago: f64,
    /// Assistant mode, for sources that record one instead of a project.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mode: Option<String>,
}

/// Aggregates for one source over one trailing window.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WindowedSummary {
    pub sessions: u64,
    pub turns: u64,
    /// Sorted by sessions descending, then group name.
    pub groups: Vec<GroupStats>,
    pub last_session: Option<LastActivity>,
    /// Chronological.
    pub daily: Vec<DailyCount>,
}

/// Everything one AI source contributes to the report.
///
/// This is the JSON shape written for each provider: totals for both windows,
/// the 7-day group breakdown and last session, and the 30-day daily series.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SourceSummary {
    pub sessions_7d: u64,
    pub sessions_30d: u64,
    pub turns_7d: u64,
    pub turns_30d: u64,
    #[serde(default)]
    pub repos: Vec<GroupStats>,
    #[serde(default)]
    pub last_session: Option<LastActivity>,
    #[serde(default)]
    pub daily_sessions: Vec<DailyCount>,
}

impl SourceSummary {
    /// The canonical all-zero summary returned for a missing or unreadable source.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Combine the 7-day and 30-day windows of one source.
    pub fn from_windows(week: WindowedSummary, month: WindowedSummary) -> Self {
        Self {
            sessions_7d: week.sessions,
            sessions_30d: month.sessions,
            turns_7d: week.turns,
            turns_30d: month.turns,
            repos: week.groups,
            last_session: week.last_session,
            daily_sessions: month.daily,
        }
    }

    /// Whether this source attributed any 7-day sessions to projects.
    pub fn has_group_breakdown(&self) -> bool {
        !self.repos.is_empty()
    }
}

/// The four AI sources, keyed by provider.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AiSources {
    pub claude: SourceSummary,
    pub codex: SourceSummary,
    pub cursor: SourceSummary,
    pub gemini: SourceSummary,
}

impl AiSources {
    pub fn get(&self, provider: Provider) -> &SourceSummary {
        match provider {
            Provider::Claude => &self.claude,
            Provider::Codex => &self.codex,
            Provider::Cursor => &self.cursor,
            Provider::Gemini => &self.gemini,
        }
    }

    pub fn get_mut(&mut self, provider: Provider) -> &mut SourceSummary {
        match provider {
            Provider::Claude => &mut self.claude,
            Provider::Codex => &mut self.codex,
            Provider::Cursor => &mut self.cursor,
            Provider::Gemini => &mut self.gemini,
        }
    }

    /// Iterate `(provider, summary)` pairs in report order.
    pub fn iter(&self) -> impl Iterator<Item = (Provider, &SourceSummary)> {
        Provider::ALL.into_iter().map(move |p| (p, self.get(p)))
    }
}

// ── Version control ───────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LanguageCommits {
    pub name: String,
    pub commits: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RepoCommits {
    pub repo: String,
    pub commits: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailyCommits {
    pub date: String,
    pub commits: u64,
}

/// Commit activity across all tracked repositories.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GitSummary {
    pub repos_active_7d: u64,
    pub repos_active_30d: u64,
    pub commits_7d: u64,
    pub commits_30d: u64,
    #[serde(default)]
    pub languages_30d: Vec<LanguageCommits>,
    #[serde(default)]
    pub last_push: Option<LastActivity>,
    /// At most five repositories, by 7-day commits.
    #[serde(default)]
    pub top_repos_7d: Vec<RepoCommits>,
    #[serde(default)]
    pub daily_commits: Vec<DailyCommits>,
}

impl GitSummary {
    pub fn empty() -> Self {
        Self::default()
    }
}

// ── Aggregate ─────────────────────────────────────────────────────────────────

/// One row of the combined commits + AI sessions ranking.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TopGroup {
    pub repo: String,
    pub commits: u64,
    pub ai_sessions: u64,
    #[serde(default)]
    pub github_url: Option<String>,
}

impl TopGroup {
    pub fn activity(&self) -> u64 {
        self.commits + self.ai_sessions
    }
}

/// Commits and per-provider sessions for one complete UTC day.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailyBreakdown {
    pub date: String,
    pub commits: u64,
    pub sessions: BTreeMap<Provider, u64>,
    /// Sum of AI sessions only; commits are not included.
    pub total_sessions: u64,
}

/// Cross-source totals built by the merge step.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AggregateReport {
    pub ai_sessions_7d: u64,
    pub ai_turns_7d: u64,
    pub commits_7d: u64,
    pub session_percentages: BTreeMap<Provider, f64>,
    pub turn_percentages: BTreeMap<Provider, f64>,
    pub top_repos_combined: Vec<TopGroup>,
    pub daily_breakdown_7d: Vec<DailyBreakdown>,
}

/// The document written by one pipeline run and read by the renderers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProfileReport {
    /// RFC 3339, UTC.
    pub generated_at: String,
    pub github: GitSummary,
    #[serde(flatten)]
    pub sources: AiSources,
    pub aggregate: AggregateReport,
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn ts(s: &str) -> DateTime<Utc> {
        DateTime::parse_from_rfc3339(s).unwrap().with_timezone(&Utc)
    }

    #[test]
    fn test_session_turns_floored_at_one() {
        let session = Session::new("s1", None, ts("2024-01-15T10:00:00Z"), 0);
        assert_eq!(session.turns, 1);
        assert_eq!(session.group_or_unknown(), "unknown");
    }

    #[test]
    fn test_provider_from_name_case_insensitive() {
        assert_eq!(Provider::from_name("Claude"), Some(Provider::Claude));
        assert_eq!(Provider::from_name(" GEMINI "), Some(Provider::Gemini));
        assert_eq!(Provider::from_name("copilot"), None);
    }

    #[test]
    fn test_provider_serializes_lowercase_map_key() {
        let mut map = BTreeMap::new();
        map.insert(Provider::Codex, 12.5);
        let json = serde_json::to_string(&map).unwrap();
        assert_eq!(json, r#"{"codex":12.5}"#);
    }

    #[test]
    fn test_source_summary_from_windows() {
        let week = WindowedSummary {
            sessions: 2,
            turns: 7,
            groups: vec![GroupStats {
                group: "alpha".into(),
                sessions: 2,
                turns: 7,
            }],
            last_session: None,
            daily: vec![],
        };
        let month = WindowedSummary {
            sessions: 5,
            turns: 20,
            daily: vec![DailyCount {
                date: "2024-01-10".into(),
                sessions: 3,
                turns: 13,
            }],
            ..Default::default()
        };

        let summary = SourceSummary::from_windows(week, month);
        assert_eq!(summary.sessions_7d, 2);
        assert_eq!(summary.sessions_30d, 5);
        assert_eq!(summary.turns_30d, 20);
        assert_eq!(summary.repos[0].group, "alpha");
        assert_eq!(summary.daily_sessions.len(), 1);
        assert!(summary.has_group_breakdown());
    }

    #[test]
    fn test_group_stats_serializes_as_repo() {
        let stats = GroupStats {
            group: "alpha".into(),
            sessions: 1,
            turns: 4,
        };
        let value = serde_json::to_value(&stats).unwrap();
        assert_eq!(value["repo"], "alpha");
    }

    #[test]
    fn test_profile_report_flattens_sources() {
        let report = ProfileReport {
            generated_at: "2024-01-15T10:00:00+00:00".into(),
            github: GitSummary::empty(),
            sources: AiSources::default(),
            aggregate: AggregateReport::default(),
        };
        let value = serde_json::to_value(&report).unwrap();
        for provider in Provider::ALL {
            assert!(value.get(provider.as_str()).is_some(), "{provider} key");
        }

        let back: ProfileReport = serde_json::from_value(value).unwrap();
        assert_eq!(back, report);
    }

    #[test]
    fn test_last_activity_mode_omitted_when_none() {
        let last = LastActivity {
            repo: "alpha".into(),
            timestamp: "2024-01-15T10:00:00+00:00".into(),
            hours_ago: 1.5,
            mode: None,
        };
        let value = serde_json::to_value(&last).unwrap();
        assert!(value.get("mode").is_none());
    }
}
