use std::path::{Component, Path, PathBuf};

use chrono::{DateTime, Utc};
use serde_json::Value;
use tracing::debug;

use crate::models::UNKNOWN_GROUP;

// ── TimestampProcessor ────────────────────────────────────────────────────────

/// Parses the timestamps found in session logs and API payloads.
///
/// Only timezone-aware values are accepted. Everything is normalised to UTC so
/// window comparisons never mix offsets.
pub struct TimestampProcessor;

impl TimestampProcessor {
    /// Parse a JSON string value holding an ISO-8601 timestamp.
    ///
    /// Returns `None` for `null`, non-strings, and strings that are not
    /// RFC 3339 with either a `Z` suffix or an explicit offset.
    pub fn parse(value: &Value) -> Option<DateTime<Utc>> {
        value.as_str().and_then(Self::parse_str)
    }

    /// Parse an ISO-8601 string with `Z` or `±HH:MM` offset into UTC.
    pub fn parse_str(s: &str) -> Option<DateTime<Utc>> {
        let s = s.trim();
        if s.is_empty() {
            return None;
        }

        let normalised = match s.strip_suffix('Z').or_else(|| s.strip_suffix('z')) {
            Some(stripped) => format!("{}+00:00", stripped),
            None => s.to_string(),
        };

        if let Ok(dt) = DateTime::parse_from_rfc3339(&normalised) {
            return Some(dt.with_timezone(&Utc));
        }

        // Offsets written without a colon, e.g. `+0200`.
        const FORMATS: &[&str] = &["%Y-%m-%dT%H:%M:%S%.f%z", "%Y-%m-%d %H:%M:%S%.f%z"];
        for fmt in FORMATS {
            if let Ok(dt) = DateTime::parse_from_str(&normalised, fmt) {
                return Some(dt.with_timezone(&Utc));
            }
        }

        debug!("TimestampProcessor: rejected timestamp \"{}\"", s);
        None
    }

    /// Parse a Unix timestamp in milliseconds (integer or float JSON number).
    pub fn parse_millis(value: &Value) -> Option<DateTime<Utc>> {
        if let Some(ms) = value.as_i64() {
            return DateTime::from_timestamp_millis(ms);
        }
        let ms = value.as_f64()?;
        if !ms.is_finite() {
            return None;
        }
        DateTime::from_timestamp_millis(ms.trunc() as i64)
    }
}

// ── GroupKeyExtractor ─────────────────────────────────────────────────────────

/// Derives a project identifier from a working-directory path.
///
/// The key is the path segment right after the anchor directory (`git` by
/// default, so `/home/me/git/alpha/src` → `alpha`). Without an anchor the last
/// segment is used. A missing path yields [`UNKNOWN_GROUP`].
#[derive(Debug, Clone)]
pub struct GroupKeyExtractor {
    anchor: String,
    home: Option<PathBuf>,
}

impl GroupKeyExtractor {
    pub fn new(anchor: impl Into<String>) -> Self {
        Self {
            anchor: anchor.into(),
            home: None,
        }
    }

    /// Map the user's home directory itself to the `"Home"` group.
    pub fn with_home(mut self, home: Option<PathBuf>) -> Self {
        self.home = home;
        self
    }

    /// Extract the group key from an optional working-directory string.
    pub fn extract(&self, cwd: Option<&str>) -> String {
        let Some(cwd) = cwd.map(str::trim).filter(|s| !s.is_empty()) else {
            return UNKNOWN_GROUP.to_string();
        };
        let path = Path::new(cwd);

        if let Some(home) = &self.home {
            if path == home.as_path() {
                return "Home".to_string();
            }
        }

        let segments: Vec<&str> = path
            .components()
            .filter_map(|c| match c {
                Component::Normal(s) => s.to_str(),
                _ => None,
            })
            .collect();

        if let Some(idx) = segments.iter().position(|s| *s == self.anchor) {
            if let Some(next) = segments.get(idx + 1) {
                return (*next).to_string();
            }
        }

        segments
            .last()
            .map(|s| (*s).to_string())
            .unwrap_or_else(|| UNKNOWN_GROUP.to_string())
    }
}

impl Default for GroupKeyExtractor {
    fn default() -> Self {
        Self::new("git")
    }
}

// ── Tests ──────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::json;

    // ── TimestampProcessor ───────────────────────────────────────────────────

    #[test]
    fn test_parse_z_suffix() {
        let dt = TimestampProcessor::parse_str("2024-01-15T10:30:00Z").unwrap();
        assert_eq!(dt, Utc.with_ymd_and_hms(2024, 1, 15, 10, 30, 0).unwrap());
    }

    #[test]
    fn test_parse_fractional_z() {
        let dt = TimestampProcessor::parse_str("2024-01-15T10:30:00.123Z").unwrap();
        assert_eq!(dt.timestamp_subsec_millis(), 123);
    }

    #[test]
    fn test_parse_explicit_offset_normalised_to_utc() {
        let dt = TimestampProcessor::parse_str("2024-01-15T12:30:00+02:00").unwrap();
        assert_eq!(dt, Utc.with_ymd_and_hms(2024, 1, 15, 10, 30, 0).unwrap());
    }

    #[test]
    fn test_parse_offset_without_colon() {
        let dt = TimestampProcessor::parse_str("2024-01-15T05:30:00-0500").unwrap();
        assert_eq!(dt, Utc.with_ymd_and_hms(2024, 1, 15, 10, 30, 0).unwrap());
    }

    #[test]
    fn test_parse_rejects_naive_and_garbage() {
        assert!(TimestampProcessor::parse_str("2024-01-15T10:30:00").is_none());
        assert!(TimestampProcessor::parse_str("not a date").is_none());
        assert!(TimestampProcessor::parse_str("").is_none());
    }

    #[test]
    fn test_parse_value_non_string() {
        assert!(TimestampProcessor::parse(&json!(null)).is_none());
        assert!(TimestampProcessor::parse(&json!(1705314600)).is_none());
        assert!(TimestampProcessor::parse(&json!("2024-01-15T10:30:00Z")).is_some());
    }

    #[test]
    fn test_parse_millis() {
        let dt = TimestampProcessor::parse_millis(&json!(1_705_314_600_000i64)).unwrap();
        assert_eq!(dt, Utc.with_ymd_and_hms(2024, 1, 15, 10, 30, 0).unwrap());
        let dt = TimestampProcessor::parse_millis(&json!(1_705_314_600_000.0)).unwrap();
        assert_eq!(dt, Utc.with_ymd_and_hms(2024, 1, 15, 10, 30, 0).unwrap());
        assert!(TimestampProcessor::parse_millis(&json!("1705314600000")).is_none());
    }

    // ── GroupKeyExtractor ────────────────────────────────────────────────────

    #[test]
    fn test_group_key_after_anchor() {
        let ex = GroupKeyExtractor::default();
        assert_eq!(ex.extract(Some("/Users/me/git/stopsign_ai")), "stopsign_ai");
        assert_eq!(ex.extract(Some("/Users/me/git/alpha/src/lib")), "alpha");
    }

    #[test]
    fn test_group_key_falls_back_to_last_segment() {
        let ex = GroupKeyExtractor::default();
        assert_eq!(ex.extract(Some("/opt/work/beta")), "beta");
        // Anchor present but nothing after it.
        assert_eq!(ex.extract(Some("/Users/me/git")), "git");
    }

    #[test]
    fn test_group_key_missing_path_is_unknown() {
        let ex = GroupKeyExtractor::default();
        assert_eq!(ex.extract(None), "unknown");
        assert_eq!(ex.extract(Some("   ")), "unknown");
        assert_eq!(ex.extract(Some("/")), "unknown");
    }

    #[test]
    fn test_group_key_custom_anchor() {
        let ex = GroupKeyExtractor::new("src");
        assert_eq!(ex.extract(Some("/home/me/src/gamma/app")), "gamma");
    }

    #[test]
    fn test_group_key_home_directory() {
        let ex = GroupKeyExtractor::default().with_home(Some(PathBuf::from("/home/me")));
        assert_eq!(ex.extract(Some("/home/me")), "Home");
        assert_eq!(ex.extract(Some("/home/me/git/alpha")), "alpha");
    }
}
