//! Log discovery and line-level decoding shared by the file-based sources.
//!
//! Every record is decoded into a [`RecordOutcome`]: either the parsed value
//! or the reason it was skipped. Callers fold over outcomes, so a malformed
//! line never aborts the file it sits in.

use std::collections::BTreeMap;
use std::io::BufRead;
use std::path::{Path, PathBuf};

use pulse_core::error::{PulseError, Result};
use serde_json::Value;
use tracing::{debug, warn};

// ── RecordOutcome ─────────────────────────────────────────────────────────────

/// Why a record was left out.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum SkipReason {
    MalformedJson,
    NotAnObject,
    MissingTimestamp,
    MissingField(&'static str),
    EmptyLog,
    UnreadableLog,
}

impl SkipReason {
    pub fn label(&self) -> &'static str {
        match self {
            SkipReason::MalformedJson => "malformed_json",
            SkipReason::NotAnObject => "not_an_object",
            SkipReason::MissingTimestamp => "missing_timestamp",
            SkipReason::MissingField(name) => *name,
            SkipReason::EmptyLog => "empty_log",
            SkipReason::UnreadableLog => "unreadable_log",
        }
    }
}

/// Result of decoding one record.
#[derive(Debug, Clone, PartialEq)]
pub enum RecordOutcome<T> {
    Parsed(T),
    Skipped(SkipReason),
}

impl<T> RecordOutcome<T> {
    pub fn parsed(self) -> Option<T> {
        match self {
            RecordOutcome::Parsed(v) => Some(v),
            RecordOutcome::Skipped(_) => None,
        }
    }
}

/// Running count of parsed and skipped records, logged once per source.
#[derive(Debug, Clone, Default)]
pub struct SkipTally {
    parsed: usize,
    skipped: BTreeMap<&'static str, usize>,
}

impl SkipTally {
    pub fn record<T>(&mut self, outcome: &RecordOutcome<T>) {
        match outcome {
            RecordOutcome::Parsed(_) => self.parsed += 1,
            RecordOutcome::Skipped(reason) => {
                *self.skipped.entry(reason.label()).or_default() += 1;
            }
        }
    }

    pub fn parsed(&self) -> usize {
        self.parsed
    }

    pub fn skipped(&self) -> usize {
        self.skipped.values().sum()
    }

    /// Emit one debug line summarising the tally.
    pub fn log(&self, source: &str) {
        debug!(
            source,
            parsed = self.parsed,
            skipped = self.skipped(),
            reasons = ?self.skipped,
            "record tally"
        );
    }
}

// ── JsonlLog ──────────────────────────────────────────────────────────────────

/// One line-delimited JSON file, decoded line by line.
#[derive(Debug, Clone)]
pub struct JsonlLog {
    pub path: PathBuf,
    /// Non-empty lines, including ones that failed to decode.
    pub line_count: usize,
    /// Lines that decoded to a JSON object, in file order.
    pub records: Vec<Value>,
}

impl JsonlLog {
    /// Stem of the file name, used as a fallback session id.
    pub fn stem(&self) -> String {
        self.path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default()
    }

    /// First string value found at `key` across records.
    pub fn first_str(&self, key: &str) -> Option<&str> {
        self.records
            .iter()
            .find_map(|r| r.get(key).and_then(Value::as_str))
            .filter(|s| !s.is_empty())
    }
}

// ── Public API ────────────────────────────────────────────────────────────────

/// Fail with [`PulseError::DataPathNotFound`] unless `root` is a directory.
pub fn require_dir(root: &Path) -> Result<()> {
    if root.is_dir() {
        Ok(())
    } else {
        Err(PulseError::DataPathNotFound(root.to_path_buf()))
    }
}

/// Recursively collect files under `root` accepted by `keep`, sorted by path.
pub fn find_files(root: &Path, keep: impl Fn(&Path) -> bool) -> Vec<PathBuf> {
    if !root.exists() {
        warn!("Data path does not exist: {}", root.display());
        return Vec::new();
    }

    let mut files: Vec<PathBuf> = walkdir::WalkDir::new(root)
        .follow_links(true)
        .into_iter()
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_type().is_file() && keep(entry.path()))
        .map(|entry| entry.into_path())
        .collect();

    files.sort();
    files
}

/// Find all `.jsonl` files recursively under `root`, sorted by path.
pub fn find_jsonl_files(root: &Path) -> Vec<PathBuf> {
    find_files(root, |path| {
        path.extension().map(|ext| ext == "jsonl").unwrap_or(false)
    })
}

/// Find every file called `name` below `root`, sorted by path.
pub fn find_named_files(root: &Path, name: &str) -> Vec<PathBuf> {
    find_files(root, |path| {
        path.file_name().map(|n| n == name).unwrap_or(false)
    })
}

/// Decode a single JSONL line.
pub fn parse_json_line(line: &str) -> RecordOutcome<Value> {
    match serde_json::from_str::<Value>(line.trim()) {
        Ok(value) if value.is_object() => RecordOutcome::Parsed(value),
        Ok(_) => RecordOutcome::Skipped(SkipReason::NotAnObject),
        Err(_) => RecordOutcome::Skipped(SkipReason::MalformedJson),
    }
}

/// Read a JSONL file, keeping every line that decodes to an object.
///
/// Blank lines are ignored entirely; undecodable lines still count towards
/// [`JsonlLog::line_count`].
pub fn read_jsonl(path: &Path) -> Result<JsonlLog> {
    let file = std::fs::File::open(path).map_err(|source| PulseError::FileRead {
        path: path.to_path_buf(),
        source,
    })?;
    let reader = std::io::BufReader::new(file);

    let mut line_count = 0usize;
    let mut records = Vec::new();
    let mut tally = SkipTally::default();

    for line_result in reader.lines() {
        let line = match line_result {
            Ok(l) => l,
            Err(_) => continue,
        };
        if line.trim().is_empty() {
            continue;
        }
        line_count += 1;

        let outcome = parse_json_line(&line);
        tally.record(&outcome);
        if let Some(value) = outcome.parsed() {
            records.push(value);
        }
    }

    if tally.skipped() > 0 {
        debug!(
            "File {}: {} lines, {} undecodable",
            path.display(),
            line_count,
            tally.skipped()
        );
    }

    Ok(JsonlLog {
        path: path.to_path_buf(),
        line_count,
        records,
    })
}

/// Read a file holding one JSON array.
pub fn read_json_array(path: &Path) -> Result<Vec<Value>> {
    let content = std::fs::read_to_string(path).map_err(|source| PulseError::FileRead {
        path: path.to_path_buf(),
        source,
    })?;
    let value: Value = serde_json::from_str(&content)?;
    match value {
        Value::Array(items) => Ok(items),
        _ => Err(PulseError::Other(anyhow::anyhow!(
            "{} does not contain a JSON array",
            path.display()
        ))),
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
