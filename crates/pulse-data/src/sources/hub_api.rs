//! Remote agent-stats API, used instead of local logs when those are not
//! available (CI runners, other machines).
//!
//! Totals come from the coarse `stats` endpoint. Group, daily and
//! last-session detail come from the paginated `sessions` endpoint when it
//! answers; otherwise those parts stay empty. No request ever raises past
//! this module: failures are logged and reported as `None`.

use std::time::Duration;

use pulse_core::data_processors::{GroupKeyExtractor, TimestampProcessor};
use pulse_core::error::{PulseError, Result};
use pulse_core::models::{AiSources, Provider, Session, SourceSummary};
use pulse_core::time_utils::Window;
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, info, warn};

use super::ScanContext;
use crate::reader::{RecordOutcome, SkipReason};

pub const API_TIMEOUT: Duration = Duration::from_secs(30);
pub const STATS_PATH: &str = "/api/agents/stats";
pub const SESSIONS_PATH: &str = "/api/agents/sessions";
pub const PAGE_SIZE: usize = 100;
pub const MAX_PAGES: usize = 10;

const SESSION_LIST_DAYS: u32 = 30;

// ── Wire types ────────────────────────────────────────────────────────────────

/// One provider row of the stats endpoint.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct ProviderStats {
    #[serde(default)]
    pub provider: String,
    #[serde(default)]
    pub sessions: u64,
    #[serde(default)]
    pub events: u64,
    #[serde(default)]
    pub user_messages: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct StatsResponse {
    #[serde(default)]
    pub by_provider: Vec<ProviderStats>,
}

impl StatsResponse {
    /// Row for `provider`, matched case-insensitively.
    pub fn provider(&self, provider: Provider) -> Option<&ProviderStats> {
        self.by_provider
            .iter()
            .find(|p| Provider::from_name(&p.provider) == Some(provider))
    }
}

/// One entry of the session-list endpoint.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct ApiSession {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub provider: String,
    #[serde(default)]
    pub project: Option<String>,
    #[serde(default)]
    pub cwd: Option<String>,
    #[serde(default)]
    pub started_at: Option<String>,
    #[serde(default)]
    pub user_messages: Option<u64>,
    #[serde(default)]
    pub events: Option<u64>,
}

#[derive(Debug, Deserialize)]
struct SessionPage {
    #[serde(default)]
    sessions: Vec<Value>,
}

// ── Transforms ────────────────────────────────────────────────────────────────

/// Decode one session-list entry.
pub fn decode_session(value: &Value) -> RecordOutcome<ApiSession> {
    if !value.is_object() {
        return RecordOutcome::Skipped(SkipReason::NotAnObject);
    }
    match serde_json::from_value::<ApiSession>(value.clone()) {
        Ok(session) => RecordOutcome::Parsed(session),
        Err(_) => RecordOutcome::Skipped(SkipReason::MalformedJson),
    }
}

/// Turn an API session into a [`Session`].
///
/// The group is the reported project, else the group derived from `cwd`,
/// else `"unknown"`, so every session shows up in the group breakdown.
pub fn session_from_api(
    session: &ApiSession,
    extractor: &GroupKeyExtractor,
) -> RecordOutcome<Session> {
    let Some(started_at) = session
        .started_at
        .as_deref()
        .and_then(TimestampProcessor::parse_str)
    else {
        return RecordOutcome::Skipped(SkipReason::MissingTimestamp);
    };

    let group = match (&session.project, &session.cwd) {
        (Some(project), _) if !project.trim().is_empty() => Some(project.trim().to_string()),
        (_, Some(cwd)) => Some(extractor.extract(Some(cwd))),
        _ => Some(extractor.extract(None)),
    };
    let turns = session.user_messages.or(session.events).unwrap_or(1);

    RecordOutcome::Parsed(Session::new(session.id.clone(), group, started_at, turns))
}

/// Build one provider's summary from the coarse stats and, when present,
/// the session list.
pub fn summarize_provider(
    provider: Provider,
    stats_7d: &StatsResponse,
    stats_30d: &StatsResponse,
    sessions: Option<&[ApiSession]>,
    ctx: &ScanContext,
) -> SourceSummary {
    let week = stats_7d.provider(provider).cloned().unwrap_or_default();
    let month = stats_30d.provider(provider).cloned().unwrap_or_default();

    let mut summary = SourceSummary {
        sessions_7d: week.sessions,
        sessions_30d: month.sessions,
        turns_7d: week.user_messages,
        turns_30d: month.user_messages,
        ..SourceSummary::empty()
    };

    if let Some(sessions) = sessions {
        let mut aggregator = ctx.aggregator();
        for session in sessions
            .iter()
            .filter(|s| Provider::from_name(&s.provider) == Some(provider))
        {
            aggregator.add_outcome(session_from_api(session, &ctx.extractor));
        }
        aggregator.tally().log(provider.as_str());

        // Coarse stats cannot be filtered server-side; take out what the
        // session list attributes to excluded groups.
        let (week_sessions, week_turns) = aggregator.excluded(Window::Week);
        let (month_sessions, month_turns) = aggregator.excluded(Window::Month);
        summary.sessions_7d = summary.sessions_7d.saturating_sub(week_sessions);
        summary.turns_7d = summary.turns_7d.saturating_sub(week_turns);
        summary.sessions_30d = summary.sessions_30d.saturating_sub(month_sessions);
        summary.turns_30d = summary.turns_30d.saturating_sub(month_turns);

        let detail = aggregator.finish();
        summary.repos = detail.repos;
        summary.last_session = detail.last_session;
        summary.daily_sessions = detail.daily_sessions;
    }

    summary
}

// ── HubClient ─────────────────────────────────────────────────────────────────

/// Authenticated client for the agent-stats API.
pub struct HubClient {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl HubClient {
    pub fn new(base_url: &str, api_key: impl Into<String>) -> Result<Self> {
        let http = reqwest::Client::builder()
            .user_agent(concat!("devpulse/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| PulseError::Http(e.to_string()))?;
        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.into(),
        })
    }

    /// GET `path` and decode JSON; any failure is logged and yields `None`.
    async fn get_json(&self, path: &str, query: &[(&str, String)]) -> Option<Value> {
        let url = format!("{}{}", self.base_url, path);
        let response = match self
            .http
            .get(&url)
            .header("X-API-Key", &self.api_key)
            .query(query)
            .timeout(API_TIMEOUT)
            .send()
            .await
        {
            Ok(r) => r,
            Err(e) => {
                warn!("Stats API request to {} failed: {}", url, e);
                return None;
            }
        };

        if !response.status().is_success() {
            warn!("Stats API {} returned {}", url, response.status());
            return None;
        }

        match response.json::<Value>().await {
            Ok(v) => Some(v),
            Err(e) => {
                warn!("Stats API {} returned invalid JSON: {}", url, e);
                None
            }
        }
    }

    pub async fn fetch_stats(&self, since_days: u32) -> Option<StatsResponse> {
        let value = self
            .get_json(STATS_PATH, &[("since_days", since_days.to_string())])
            .await?;
        match serde_json::from_value(value) {
            Ok(stats) => Some(stats),
            Err(e) => {
                warn!("Unexpected stats payload: {}", e);
                None
            }
        }
    }

    /// Page through the session list.
    ///
    /// `None` when the first page fails; a later failure keeps what was
    /// already fetched.
    pub async fn fetch_sessions(&self, since_days: u32) -> Option<Vec<ApiSession>> {
        let mut sessions = Vec::new();

        for page in 0..MAX_PAGES {
            let query = [
                ("since_days", since_days.to_string()),
                ("limit", PAGE_SIZE.to_string()),
                ("offset", (page * PAGE_SIZE).to_string()),
            ];
            let Some(value) = self.get_json(SESSIONS_PATH, &query).await else {
                if page == 0 {
                    return None;
                }
                break;
            };
            let entries = match serde_json::from_value::<SessionPage>(value) {
                Ok(p) => p.sessions,
                Err(e) => {
                    warn!("Unexpected session page payload: {}", e);
                    if page == 0 {
                        return None;
                    }
                    break;
                }
            };

            let count = entries.len();
            sessions.extend(entries.iter().filter_map(|v| decode_session(v).parsed()));
            debug!(page, count, "fetched session page");

            if count < PAGE_SIZE {
                break;
            }
        }

        Some(sessions)
    }
}

// ── Public API ────────────────────────────────────────────────────────────────

/// Collect all four providers from the remote API.
///
/// Returns `None` when no key is configured or either stats call fails, so
/// the caller can fall back to local logs.
pub async fn collect(base_url: &str, api_key: Option<&str>, ctx: &ScanContext) -> Option<AiSources> {
    let Some(api_key) = api_key.filter(|k| !k.trim().is_empty()) else {
        warn!("Remote collection requested but no API key is configured");
        return None;
    };
    let client = match HubClient::new(base_url, api_key) {
        Ok(c) => c,
        Err(e) => {
            warn!("Failed to build stats API client: {}", e);
            return None;
        }
    };

    let stats_7d = client.fetch_stats(7).await?;
    let stats_30d = client.fetch_stats(30).await?;

    let sessions = client.fetch_sessions(SESSION_LIST_DAYS).await;
    if sessions.is_none() {
        info!("Session list unavailable; remote summaries carry totals only");
    }

    let mut sources = AiSources::default();
    for provider in Provider::ALL {
        let summary =
            summarize_provider(provider, &stats_7d, &stats_30d, sessions.as_deref(), ctx);
        info!(
            provider = provider.as_str(),
            sessions_7d = summary.sessions_7d,
            turns_7d = summary.turns_7d,
            "remote provider summary"
        );
        *sources.get_mut(provider) = summary;
    }
    Some(sources)
}

// ── Tests ─────────────────────────────────────────────────────────────────────
