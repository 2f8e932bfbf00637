use std::path::PathBuf;
use thiserror::Error;

/// All errors produced inside the collection pipeline.
///
/// Most of these never reach the operator: each source converts its own
/// errors into an empty summary. Only [`PulseError::OutputWrite`] is meant to
/// abort a run.
#[derive(Error, Debug)]
pub enum PulseError {
    /// A file could not be opened or read from disk.
    #[error("Failed to read file {path}: {source}")]
    FileRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A JSON document could not be parsed.
    #[error("Failed to parse JSON: {0}")]
    JsonParse(#[from] serde_json::Error),

    /// The expected source root does not exist.
    #[error("Data path not found: {0}")]
    DataPathNotFound(PathBuf),

    /// The embedded key-value store could not be opened or queried.
    #[error("Key-value store error: {0}")]
    Store(String),

    /// An HTTP request failed, timed out, or returned a non-success status.
    #[error("HTTP request failed: {0}")]
    Http(String),

    /// A subprocess could not be spawned, exited non-zero, or timed out.
    #[error("Command `{command}` failed: {reason}")]
    Command { command: String, reason: String },

    /// A configuration value is missing or invalid.
    #[error("Configuration error: {0}")]
    Config(String),

    /// A final output artifact could not be written.
    #[error("Failed to write {path}: {source}")]
    OutputWrite {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Catch-all for errors from third-party crates via `anyhow`.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Convenience alias used throughout the pulse crates.
pub type Result<T> = std::result::Result<T, PulseError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display_file_read() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "no such file");
        let err = PulseError::FileRead {
            path: PathBuf::from("/some/session.jsonl"),
            source: io_err,
        };
        let msg = err.to_string();
        assert!(msg.contains("Failed to read file"));
        assert!(msg.contains("/some/session.jsonl"));
        assert!(msg.contains("no such file"));
    }

    #[test]
    fn test_error_display_data_path_not_found() {
        let err = PulseError::DataPathNotFound(PathBuf::from("/missing/dir"));
        assert_eq!(err.to_string(), "Data path not found: /missing/dir");
    }

    #[test]
    fn test_error_display_command() {
        let err = PulseError::Command {
            command: "git log".to_string(),
            reason: "timed out after 5s".to_string(),
        };
        assert_eq!(err.to_string(), "Command `git log` failed: timed out after 5s");
    }

    #[test]
    fn test_error_display_output_write() {
        let io_err = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied");
        let err = PulseError::OutputWrite {
            path: PathBuf::from("/ro/profile-data.json"),
            source: io_err,
        };
        let msg = err.to_string();
        assert!(msg.starts_with("Failed to write /ro/profile-data.json"));
        assert!(msg.contains("denied"));
    }

    #[test]
    fn test_error_from_serde_json() {
        let json_err = serde_json::from_str::<serde_json::Value>("{invalid}").unwrap_err();
        let err: PulseError = json_err.into();
        assert!(err.to_string().contains("Failed to parse JSON"));
    }
}
