//! Gemini CLI logs: `<root>/<project-hash>/logs.json`, each a JSON array of
//! messages. Only user messages count; they are folded into sessions by
//! `sessionId`.

use std::path::Path;

use pulse_core::data_processors::TimestampProcessor;
use pulse_core::models::{RawEvent, SourceSummary};
use serde_json::Value;
use tracing::{debug, info};

use super::ScanContext;
use crate::aggregator::sessions_from_events;
use crate::reader::{
    find_named_files, read_json_array, require_dir, RecordOutcome, SkipReason, SkipTally,
};

const LOG_FILE_NAME: &str = "logs.json";

/// Decode one message into a user event.
pub fn event_from_message(message: &Value) -> RecordOutcome<RawEvent> {
    if !message.is_object() {
        return RecordOutcome::Skipped(SkipReason::NotAnObject);
    }
    if message.get("type").and_then(Value::as_str) != Some("user") {
        return RecordOutcome::Skipped(SkipReason::MissingField("type"));
    }
    let Some(session_id) = message
        .get("sessionId")
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
    else {
        return RecordOutcome::Skipped(SkipReason::MissingField("sessionId"));
    };
    match message.get("timestamp").and_then(TimestampProcessor::parse) {
        Some(ts) => RecordOutcome::Parsed(RawEvent::new(session_id, ts)),
        None => RecordOutcome::Skipped(SkipReason::MissingTimestamp),
    }
}

/// Summarise every Gemini session under `root`.
pub fn collect(root: &Path, ctx: &ScanContext) -> SourceSummary {
    if let Err(e) = require_dir(root) {
        info!(source = "gemini", "{}", e);
        return SourceSummary::empty();
    }

    let mut tally = SkipTally::default();
    let mut events = Vec::new();

    for path in find_named_files(root, LOG_FILE_NAME) {
        let messages = match read_json_array(&path) {
            Ok(messages) => messages,
            Err(e) => {
                debug!("Skipping Gemini log: {}", e);
                tally.record::<RawEvent>(&RecordOutcome::Skipped(SkipReason::UnreadableLog));
                continue;
            }
        };
        for message in &messages {
            let outcome = event_from_message(message);
            tally.record(&outcome);
            if let Some(event) = outcome.parsed() {
                events.push(event);
            }
        }
    }
    tally.log("gemini");

    let sessions = sessions_from_events(events);
    let mut aggregator = ctx.aggregator();
    aggregator.add_all(&sessions);
    aggregator.finish()
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, Duration, TimeZone, Utc};
    use pulse_core::data_processors::GroupKeyExtractor;
    use pulse_core::time_utils::TimeWindows;
    use serde_json::json;
    use tempfile::TempDir;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 1, 15, 12, 0, 0).unwrap()
    }

    fn ts(hours_ago: i64) -> String {
        (now() - Duration::hours(hours_ago)).to_rfc3339()
    }

    fn ctx() -> ScanContext {
        ScanContext::new(TimeWindows::new(now()), GroupKeyExtractor::default())
    }

    #[test]
    fn test_event_from_message_filters() {
        let user = json!({"type": "user", "sessionId": "s1", "timestamp": ts(1)});
        let model = json!({"type": "gemini", "sessionId": "s1", "timestamp": ts(1)});
        let no_session = json!({"type": "user", "timestamp": ts(1)});
        let bad_ts = json!({"type": "user", "sessionId": "s1", "timestamp": "soon"});

        assert!(matches!(event_from_message(&user), RecordOutcome::Parsed(_)));
        assert!(matches!(event_from_message(&model), RecordOutcome::Skipped(_)));
        assert_eq!(
            event_from_message(&no_session),
            RecordOutcome::Skipped(SkipReason::MissingField("sessionId"))
        );
        assert_eq!(
            event_from_message(&bad_ts),
            RecordOutcome::Skipped(SkipReason::MissingTimestamp)
        );
    }

    #[test]
    fn test_collect_folds_sessions_across_files() {
        let dir = TempDir::new().unwrap();
        let first = dir.path().join("hash-a");
        let second = dir.path().join("hash-b");
        std::fs::create_dir_all(&first).unwrap();
        std::fs::create_dir_all(&second).unwrap();

        std::fs::write(
            first.join("logs.json"),
            json!([
                {"type": "user", "sessionId": "s1", "timestamp": ts(30)},
                {"type": "user", "sessionId": "s1", "timestamp": ts(29)},
                {"type": "gemini", "sessionId": "s1", "timestamp": ts(29)},
                {"type": "user", "sessionId": "s2", "timestamp": ts(24 * 10)}
            ])
            .to_string(),
        )
        .unwrap();
        std::fs::write(
            second.join("logs.json"),
            json!([{"type": "user", "sessionId": "s1", "timestamp": ts(2)}]).to_string(),
        )
        .unwrap();

        let summary = collect(dir.path(), &ctx());
        assert_eq!(summary.sessions_7d, 1);
        assert_eq!(summary.turns_7d, 3);
        assert_eq!(summary.sessions_30d, 2);
        assert_eq!(summary.turns_30d, 4);
        assert!(summary.repos.is_empty());
        assert_eq!(summary.last_session.unwrap().repo, "unknown");
    }

    #[test]
    fn test_collect_tolerates_broken_file() {
        let dir = TempDir::new().unwrap();
        let sub = dir.path().join("hash");
        std::fs::create_dir_all(&sub).unwrap();
        std::fs::write(sub.join("logs.json"), "[{\"type\":").unwrap();

        assert_eq!(collect(dir.path(), &ctx()), SourceSummary::empty());
    }
}
