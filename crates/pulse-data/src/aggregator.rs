//! Session aggregation over the 7-day and 30-day trailing windows.
//!
//! Every source reduces its logs to [`Session`]s and feeds them through a
//! [`WindowAggregator`], which owns the windowing, grouping and daily-bucket
//! logic so the sources only have to know their own file formats. Sessions
//! attributed to an excluded group are dropped here, before any window,
//! group or daily bucket sees them.

use std::collections::{BTreeMap, HashMap};

use pulse_core::exclusions::ExclusionList;
use pulse_core::models::{
    DailyCount, GroupStats, LastActivity, RawEvent, Session, SourceSummary, WindowedSummary,
};
use pulse_core::time_utils::{date_key, iso_utc, TimeWindows, Window};

use crate::reader::{RecordOutcome, SkipTally};

// ── WindowTotals ──────────────────────────────────────────────────────────────

/// Running totals for one trailing window.
#[derive(Debug, Clone, Default)]
struct WindowTotals {
    sessions: u64,
    turns: u64,
    groups: HashMap<String, (u64, u64)>,
    daily: BTreeMap<String, (u64, u64)>,
    latest: Option<Session>,
}

impl WindowTotals {
    fn add(&mut self, session: &Session) {
        self.sessions += 1;
        self.turns += session.turns;

        if let Some(group) = &session.group_key {
            let entry = self.groups.entry(group.clone()).or_default();
            entry.0 += 1;
            entry.1 += session.turns;
        }

        let day = self.daily.entry(date_key(session.started_at)).or_default();
        day.0 += 1;
        day.1 += session.turns;

        // Earlier-seen session wins on equal timestamps.
        let newer = match &self.latest {
            Some(current) => session.started_at > current.started_at,
            None => true,
        };
        if newer {
            self.latest = Some(session.clone());
        }
    }

    fn finish(self, windows: &TimeWindows) -> WindowedSummary {
        let mut groups: Vec<GroupStats> = self
            .groups
            .into_iter()
            .map(|(group, (sessions, turns))| GroupStats {
                group,
                sessions,
                turns,
            })
            .collect();
        groups.sort_by(|a, b| b.sessions.cmp(&a.sessions).then_with(|| a.group.cmp(&b.group)));

        let daily = self
            .daily
            .into_iter()
            .map(|(date, (sessions, turns))| DailyCount {
                date,
                sessions,
                turns,
            })
            .collect();

        let last_session = self.latest.map(|s| LastActivity {
            repo: s.group_or_unknown().to_string(),
            timestamp: iso_utc(s.started_at),
            hours_ago: windows.hours_since(s.started_at),
            mode: s.mode,
        });

        WindowedSummary {
            sessions: self.sessions,
            turns: self.turns,
            groups,
            last_session,
            daily,
        }
    }
}

// ── WindowAggregator ──────────────────────────────────────────────────────────

/// Folds sessions into per-window totals relative to one reference instant.
#[derive(Debug, Clone)]
pub struct WindowAggregator {
    windows: TimeWindows,
    week: WindowTotals,
    month: WindowTotals,
    exclusions: ExclusionList,
    /// Dropped `(sessions, turns)` per window, week first.
    excluded: [(u64, u64); 2],
    tally: SkipTally,
}

impl WindowAggregator {
    pub fn new(windows: TimeWindows) -> Self {
        Self {
            windows,
            week: WindowTotals::default(),
            month: WindowTotals::default(),
            exclusions: ExclusionList::none(),
            excluded: [(0, 0); 2],
            tally: SkipTally::default(),
        }
    }

    /// Drop sessions whose group is in `exclusions`.
    pub fn with_exclusions(mut self, exclusions: ExclusionList) -> Self {
        self.exclusions = exclusions;
        self
    }

    /// Count `session` in every window its start time falls into.
    ///
    /// Returns `false` when the session is older than the widest window or
    /// belongs to an excluded group.
    pub fn add(&mut self, session: &Session) -> bool {
        if !self.windows.contains(Window::Month, session.started_at) {
            return false;
        }
        if session
            .group_key
            .as_deref()
            .map(|g| self.exclusions.contains(g))
            .unwrap_or(false)
        {
            for (idx, window) in [Window::Week, Window::Month].into_iter().enumerate() {
                if self.windows.contains(window, session.started_at) {
                    self.excluded[idx].0 += 1;
                    self.excluded[idx].1 += session.turns;
                }
            }
            return false;
        }
        self.month.add(session);
        if self.windows.contains(Window::Week, session.started_at) {
            self.week.add(session);
        }
        true
    }

    pub fn add_all<'a>(&mut self, sessions: impl IntoIterator<Item = &'a Session>) {
        for session in sessions {
            self.add(session);
        }
    }

    /// Record a decode outcome and count the session when one was parsed.
    pub fn add_outcome(&mut self, outcome: RecordOutcome<Session>) {
        self.tally.record(&outcome);
        if let RecordOutcome::Parsed(session) = outcome {
            self.add(&session);
        }
    }

    pub fn tally(&self) -> &SkipTally {
        &self.tally
    }

    /// `(sessions, turns)` dropped from `window` because their group is
    /// excluded.
    pub fn excluded(&self, window: Window) -> (u64, u64) {
        match window {
            Window::Week => self.excluded[0],
            Window::Month => self.excluded[1],
        }
    }

    /// Both windows, week first.
    pub fn finish_windows(self) -> (WindowedSummary, WindowedSummary) {
        let week = self.week.finish(&self.windows);
        let month = self.month.finish(&self.windows);
        (week, month)
    }

    pub fn finish(self) -> SourceSummary {
        let (week, month) = self.finish_windows();
        SourceSummary::from_windows(week, month)
    }
}

// ── Event folding ─────────────────────────────────────────────────────────────

/// Collapse raw events into sessions keyed by `session_id`.
///
/// A session starts at its earliest event, its turns are the summed event
/// weights and its group is the first one any event carried. Output is
/// ordered by session id.
pub fn sessions_from_events(events: impl IntoIterator<Item = RawEvent>) -> Vec<Session> {
    let mut folded: BTreeMap<String, Session> = BTreeMap::new();

    for event in events {
        match folded.get_mut(&event.session_id) {
            Some(session) => {
                if event.timestamp < session.started_at {
                    session.started_at = event.timestamp;
                }
                session.turns += event.weight;
                if session.group_key.is_none() {
                    session.group_key = event.group_key;
                }
            }
            None => {
                let mut session = Session::new(
                    event.session_id.clone(),
                    event.group_key,
                    event.timestamp,
                    0,
                );
                session.turns = event.weight;
                folded.insert(event.session_id, session);
            }
        }
    }

    folded
        .into_values()
        .map(|mut s| {
            s.turns = s.turns.max(1);
            s
        })
        .collect()
}

// ── Tests ─────────────────────────────────────────────────────────────────────
