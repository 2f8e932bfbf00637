//! Codex session logs: `<root>/**/*.jsonl`, one session per file.
//!
//! The first record is normally a `session_meta` header whose `payload`
//! carries the session id, start time and working directory.

use std::path::Path;

use pulse_core::data_processors::{GroupKeyExtractor, TimestampProcessor};
use pulse_core::models::{Session, SourceSummary};
use serde_json::Value;
use tracing::{debug, info};

use super::ScanContext;
use crate::reader::{
    find_jsonl_files, read_jsonl, require_dir, JsonlLog, RecordOutcome, SkipReason,
};

/// Build a session from a decoded log.
pub fn session_from_log(log: &JsonlLog, extractor: &GroupKeyExtractor) -> RecordOutcome<Session> {
    let Some(header) = log.records.first() else {
        return RecordOutcome::Skipped(SkipReason::EmptyLog);
    };
    let payload = header.get("payload");
    let payload_str = |key: &str| payload.and_then(|p| p.get(key)).and_then(Value::as_str);

    let is_meta = header.get("type").and_then(Value::as_str) == Some("session_meta");

    let timestamp = if is_meta {
        payload
            .and_then(|p| p.get("timestamp"))
            .and_then(TimestampProcessor::parse)
            .or_else(|| header.get("timestamp").and_then(TimestampProcessor::parse))
    } else {
        header.get("timestamp").and_then(TimestampProcessor::parse)
    };
    let Some(started_at) = timestamp else {
        return RecordOutcome::Skipped(SkipReason::MissingTimestamp);
    };

    let id = if is_meta {
        payload_str("id")
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .unwrap_or_else(|| log.stem())
    } else {
        log.stem()
    };

    let group = extractor.extract(payload_str("cwd"));
    RecordOutcome::Parsed(Session::new(
        id,
        Some(group),
        started_at,
        log.line_count as u64,
    ))
}

/// Summarise every Codex session under `root`.
pub fn collect(root: &Path, ctx: &ScanContext) -> SourceSummary {
    if let Err(e) = require_dir(root) {
        info!(source = "codex", "{}", e);
        return SourceSummary::empty();
    }

    let extractor = ctx.home_aware_extractor();
    let mut aggregator = ctx.aggregator();

    for path in find_jsonl_files(root) {
        let outcome = match read_jsonl(&path) {
            Ok(log) => session_from_log(&log, &extractor),
            Err(e) => {
                debug!("Skipping Codex log: {}", e);
                RecordOutcome::Skipped(SkipReason::UnreadableLog)
            }
        };
        aggregator.add_outcome(outcome);
    }

    aggregator.tally().log("codex");
    aggregator.finish()
}

// ── Tests ─────────────────────────────────────────────────────────────────────
