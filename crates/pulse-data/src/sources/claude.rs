//! Claude session logs: `<root>/<dir-token>/**/<session>.jsonl`.
//!
//! The first record of a log is often a summary object without a working
//! directory. Sessions like that are resolved in a second pass through a
//! [`CwdIndex`] built from sibling logs under the same directory token.

use std::collections::HashMap;
use std::path::{Component, Path};

use chrono::{DateTime, Utc};
use pulse_core::data_processors::TimestampProcessor;
use pulse_core::models::{Session, SourceSummary};
use tracing::{debug, info};

use super::ScanContext;
use crate::reader::{
    find_jsonl_files, read_jsonl, require_dir, JsonlLog, RecordOutcome, SkipReason,
};

/// Directory token → first working directory seen under it.
pub type CwdIndex = HashMap<String, String>;

// ── SessionHead ───────────────────────────────────────────────────────────────

/// What pass 1 keeps from each log.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionHead {
    pub id: String,
    pub dir_token: Option<String>,
    pub started_at: Option<DateTime<Utc>>,
    pub cwd: Option<String>,
    pub line_count: usize,
}

impl SessionHead {
    pub fn from_log(log: &JsonlLog, dir_token: Option<String>) -> Self {
        let started_at = log
            .records
            .iter()
            .find_map(|r| r.get("timestamp").and_then(TimestampProcessor::parse));

        Self {
            id: log
                .first_str("sessionId")
                .map(str::to_string)
                .unwrap_or_else(|| log.stem()),
            dir_token,
            started_at,
            cwd: log.first_str("cwd").map(str::to_string),
            line_count: log.line_count,
        }
    }
}

// ── Passes ────────────────────────────────────────────────────────────────────

/// First path component of `path` below `root`.
pub fn dir_token(root: &Path, path: &Path) -> Option<String> {
    let relative = path.strip_prefix(root).ok()?;
    let mut components = relative.components();
    let first = components.next()?;
    // A log sitting directly in the root has no token.
    components.next()?;
    match first {
        Component::Normal(s) => Some(s.to_string_lossy().into_owned()),
        _ => None,
    }
}

/// Pass 1: remember the first working directory recorded under each token.
pub fn build_cwd_index(heads: &[SessionHead]) -> CwdIndex {
    let mut index = CwdIndex::new();
    for head in heads {
        if let (Some(token), Some(cwd)) = (&head.dir_token, &head.cwd) {
            index.entry(token.clone()).or_insert_with(|| cwd.clone());
        }
    }
    index
}

/// Pass 2: turn a head into a session, recovering its directory if needed.
pub fn resolve_session(
    head: &SessionHead,
    index: &CwdIndex,
    ctx: &ScanContext,
) -> RecordOutcome<Session> {
    if head.line_count == 0 {
        return RecordOutcome::Skipped(SkipReason::EmptyLog);
    }
    let Some(started_at) = head.started_at else {
        return RecordOutcome::Skipped(SkipReason::MissingTimestamp);
    };

    let cwd = head.cwd.as_deref().or_else(|| {
        head.dir_token
            .as_ref()
            .and_then(|token| index.get(token))
            .map(String::as_str)
    });

    let group = ctx.extractor.extract(cwd);
    RecordOutcome::Parsed(Session::new(
        head.id.clone(),
        Some(group),
        started_at,
        head.line_count as u64,
    ))
}

// ── Public API ────────────────────────────────────────────────────────────────

/// Summarise every Claude session under `root`.
pub fn collect(root: &Path, ctx: &ScanContext) -> SourceSummary {
    if let Err(e) = require_dir(root) {
        info!(source = "claude", "{}", e);
        return SourceSummary::empty();
    }

    let mut aggregator = ctx.aggregator();
    let mut heads = Vec::new();

    for path in find_jsonl_files(root) {
        match read_jsonl(&path) {
            Ok(log) => heads.push(SessionHead::from_log(&log, dir_token(root, &path))),
            Err(e) => {
                debug!("Skipping Claude log: {}", e);
                aggregator.add_outcome(RecordOutcome::Skipped(SkipReason::UnreadableLog));
            }
        }
    }

    let index = build_cwd_index(&heads);
    debug!(
        logs = heads.len(),
        recovered_dirs = index.len(),
        "Claude pass 1 complete"
    );

    for head in &heads {
        aggregator.add_outcome(resolve_session(head, &index, ctx));
    }

    aggregator.tally().log("claude");
    aggregator.finish()
}

// ── Tests ─────────────────────────────────────────────────────────────────────
