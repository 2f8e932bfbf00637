//! Cursor composer sessions from the editor's global state database.
//!
//! The database is a SQLite file with a single `cursorDiskKV(key, value)`
//! table. `composerData:<composer>` rows describe a composer session and
//! `bubbleId:<composer>:<bubble>` rows are its individual messages.

use std::collections::HashMap;
use std::path::Path;
use std::time::Duration;

use pulse_core::data_processors::TimestampProcessor;
use pulse_core::error::{PulseError, Result};
use pulse_core::models::{Session, SourceSummary};
use rusqlite::types::ValueRef;
use rusqlite::{Connection, OpenFlags};
use serde_json::Value;
use tracing::{info, warn};

use super::ScanContext;
use crate::reader::{RecordOutcome, SkipReason};

const BUSY_TIMEOUT: Duration = Duration::from_millis(500);
const UNKNOWN_MODE: &str = "unknown";

fn store_err(e: rusqlite::Error) -> PulseError {
    PulseError::Store(e.to_string())
}

/// Composer id embedded in a `prefix:<composer>[:...]` key.
pub fn composer_id(key: &str) -> Option<&str> {
    key.split(':').nth(1).filter(|s| !s.is_empty())
}

/// Message count per composer, from the `bubbleId:` rows.
pub fn count_messages(conn: &Connection) -> Result<HashMap<String, u64>> {
    let mut stmt = conn
        .prepare("SELECT key FROM cursorDiskKV WHERE key LIKE 'bubbleId:%'")
        .map_err(store_err)?;
    let mut rows = stmt.query([]).map_err(store_err)?;

    let mut counts: HashMap<String, u64> = HashMap::new();
    while let Some(row) = rows.next().map_err(store_err)? {
        let key: String = match row.get(0) {
            Ok(k) => k,
            Err(_) => continue,
        };
        if let Some(id) = composer_id(&key) {
            *counts.entry(id.to_string()).or_default() += 1;
        }
    }
    Ok(counts)
}

/// Build a session from one `composerData:` row.
pub fn session_from_composer(
    key: &str,
    value: &[u8],
    message_counts: &HashMap<String, u64>,
) -> RecordOutcome<Session> {
    let Some(id) = composer_id(key) else {
        return RecordOutcome::Skipped(SkipReason::MissingField("composerId"));
    };
    if value.is_empty() {
        return RecordOutcome::Skipped(SkipReason::MalformedJson);
    }
    let data: Value = match serde_json::from_slice(value) {
        Ok(v @ Value::Object(_)) => v,
        Ok(_) => return RecordOutcome::Skipped(SkipReason::NotAnObject),
        Err(_) => return RecordOutcome::Skipped(SkipReason::MalformedJson),
    };
    let Some(created_at) = data.get("createdAt").and_then(TimestampProcessor::parse_millis)
    else {
        return RecordOutcome::Skipped(SkipReason::MissingTimestamp);
    };

    let mode = data
        .get("unifiedMode")
        .and_then(Value::as_str)
        .unwrap_or(UNKNOWN_MODE)
        .to_string();
    let messages = message_counts.get(id).copied().unwrap_or(0);

    RecordOutcome::Parsed(Session::new(id, None, created_at, messages).with_mode(Some(mode)))
}

fn read_store(db_path: &Path, ctx: &ScanContext) -> Result<SourceSummary> {
    let conn = Connection::open_with_flags(
        db_path,
        OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX,
    )
    .map_err(store_err)?;
    conn.busy_timeout(BUSY_TIMEOUT).map_err(store_err)?;

    let message_counts = count_messages(&conn)?;

    let mut stmt = conn
        .prepare("SELECT key, value FROM cursorDiskKV WHERE key LIKE 'composerData:%'")
        .map_err(store_err)?;
    let mut rows = stmt.query([]).map_err(store_err)?;

    let mut aggregator = ctx.aggregator();
    while let Some(row) = rows.next().map_err(store_err)? {
        let key: String = match row.get(0) {
            Ok(k) => k,
            Err(_) => continue,
        };
        let outcome = match row.get_ref(1) {
            Ok(ValueRef::Text(bytes)) | Ok(ValueRef::Blob(bytes)) => {
                session_from_composer(&key, bytes, &message_counts)
            }
            _ => RecordOutcome::Skipped(SkipReason::MalformedJson),
        };
        aggregator.add_outcome(outcome);
    }

    aggregator.tally().log("cursor");
    Ok(aggregator.finish())
}

/// Summarise Cursor composer sessions stored in `db_path`.
pub fn collect(db_path: &Path, ctx: &ScanContext) -> SourceSummary {
    if !db_path.is_file() {
        info!("Cursor database not found at {}", db_path.display());
        return SourceSummary::empty();
    }

    match read_store(db_path, ctx) {
        Ok(summary) => summary,
        Err(e) => {
            warn!("Failed to read Cursor database {}: {}", db_path.display(), e);
            SourceSummary::empty()
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, Duration as ChronoDuration, TimeZone, Utc};
    use pulse_core::data_processors::GroupKeyExtractor;
    use pulse_core::time_utils::TimeWindows;
    use tempfile::TempDir;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 1, 15, 12, 0, 0).unwrap()
    }

    fn ms(days_ago: i64) -> i64 {
        (now() - ChronoDuration::days(days_ago)).timestamp_millis()
    }

    fn ctx() -> ScanContext {
        ScanContext::new(TimeWindows::new(now()), GroupKeyExtractor::default())
    }

    fn make_store(path: &Path) -> Connection {
        let conn = Connection::open(path).unwrap();
        conn.execute(
            "CREATE TABLE cursorDiskKV (key TEXT UNIQUE ON CONFLICT REPLACE, value BLOB)",
            [],
        )
        .unwrap();
        conn
    }

    fn put(conn: &Connection, key: &str, value: &str) {
        conn.execute(
            "INSERT INTO cursorDiskKV (key, value) VALUES (?1, ?2)",
            rusqlite::params![key, value],
        )
        .unwrap();
    }

    #[test]
    fn test_composer_id() {
        assert_eq!(composer_id("bubbleId:abc:1"), Some("abc"));
        assert_eq!(composer_id("composerData:abc"), Some("abc"));
        assert_eq!(composer_id("composerData:"), None);
        assert_eq!(composer_id("composerData"), None);
    }

    #[test]
    fn test_session_from_composer_floor_and_mode() {
        let counts = HashMap::new();
        let value = format!(r#"{{"createdAt":{},"unifiedMode":"agent"}}"#, ms(1));
        let session = session_from_composer("composerData:c1", value.as_bytes(), &counts)
            .parsed()
            .unwrap();

        assert_eq!(session.turns, 1);
        assert_eq!(session.mode.as_deref(), Some("agent"));
        assert!(session.group_key.is_none());
    }

    #[test]
    fn test_session_from_composer_rejects_bad_rows() {
        let counts = HashMap::new();
        assert_eq!(
            session_from_composer("composerData:c1", b"", &counts),
            RecordOutcome::Skipped(SkipReason::MalformedJson)
        );
        assert_eq!(
            session_from_composer("composerData:c1", br#"{"unifiedMode":"chat"}"#, &counts),
            RecordOutcome::Skipped(SkipReason::MissingTimestamp)
        );
    }

    #[test]
    fn test_collect_from_store() {
        let dir = TempDir::new().unwrap();
        let db = dir.path().join("state.vscdb");
        {
            let conn = make_store(&db);
            put(
                &conn,
                "composerData:recent",
                &format!(r#"{{"createdAt":{},"unifiedMode":"agent"}}"#, ms(1)),
            );
            put(
                &conn,
                "composerData:older",
                &format!(r#"{{"createdAt":{},"unifiedMode":"chat"}}"#, ms(20)),
            );
            put(&conn, "composerData:broken", "{nope");
            for i in 0..4 {
                put(&conn, &format!("bubbleId:recent:{i}"), "{}");
            }
            put(&conn, "bubbleId:older:0", "{}");
            put(&conn, "unrelated:key", "{}");
        }

        let summary = collect(&db, &ctx());
        assert_eq!(summary.sessions_7d, 1);
        assert_eq!(summary.turns_7d, 4);
        assert_eq!(summary.sessions_30d, 2);
        assert_eq!(summary.turns_30d, 5);
        assert!(summary.repos.is_empty());

        let last = summary.last_session.unwrap();
        assert_eq!(last.repo, "unknown");
        assert_eq!(last.mode.as_deref(), Some("agent"));
    }

    #[test]
    fn test_collect_missing_or_invalid_store() {
        let dir = TempDir::new().unwrap();
        assert_eq!(
            collect(&dir.path().join("absent.vscdb"), &ctx()),
            SourceSummary::empty()
        );

        let junk = dir.path().join("junk.vscdb");
        std::fs::write(&junk, b"not a database").unwrap();
        assert_eq!(collect(&junk, &ctx()), SourceSummary::empty());
    }
}
