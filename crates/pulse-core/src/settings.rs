use clap::builder::FalseyValueParser;
use clap::Parser;
use std::path::PathBuf;

use crate::exclusions::ExclusionList;

/// Base URL of the remote agent-stats API when none is configured.
pub const DEFAULT_API_URL: &str = "https://data.drose.io";

// ── Settings (CLI) ─────────────────────────────────────────────────────────────

/// Collect developer activity into a profile snapshot
#[derive(Parser, Debug, Clone)]
#[command(
    name = "devpulse",
    about = "Collect git and AI-assistant activity into a profile snapshot",
    version
)]
pub struct Settings {
    /// Read AI sessions from the remote stats API instead of local logs
    #[arg(long, env = "PULSE_USE_API", value_parser = FalseyValueParser::new())]
    pub remote: bool,

    /// API key for the remote stats API
    #[arg(long, env = "PULSE_API_KEY", hide_env_values = true)]
    pub api_key: Option<String>,

    /// Base URL of the remote stats API
    #[arg(long, env = "PULSE_API_URL", default_value = DEFAULT_API_URL)]
    pub api_url: String,

    /// GitHub token used for remote commit history
    #[arg(long, env = "GITHUB_TOKEN", hide_env_values = true)]
    pub github_token: Option<String>,

    /// GitHub account whose public repositories are read without a token
    #[arg(long, env = "GITHUB_USERNAME")]
    pub github_user: Option<String>,

    /// Directory holding local repository checkouts [default: ~/git]
    #[arg(long)]
    pub git_dir: Option<PathBuf>,

    /// Claude session logs [default: ~/.claude/projects]
    #[arg(long)]
    pub claude_dir: Option<PathBuf>,

    /// Codex session logs [default: ~/.codex/sessions]
    #[arg(long)]
    pub codex_dir: Option<PathBuf>,

    /// Cursor global state database
    #[arg(long)]
    pub cursor_db: Option<PathBuf>,

    /// Gemini CLI log directory [default: ~/.gemini/tmp]
    #[arg(long)]
    pub gemini_dir: Option<PathBuf>,

    /// Directory name whose next path segment names the project
    #[arg(long, default_value = "git")]
    pub anchor_dir: String,

    /// Additional repository names to leave out of the report
    #[arg(long = "exclude", value_name = "NAME")]
    pub exclude: Vec<String>,

    /// Where to write the JSON snapshot
    #[arg(long, default_value = "data/profile-data.json")]
    pub output: PathBuf,

    /// Template for the text summary
    #[arg(long, default_value = "TEMPLATE.md")]
    pub template: PathBuf,

    /// Write the text summary to this path
    #[arg(long)]
    pub readme: Option<PathBuf>,

    /// Write the SVG dashboard to this path
    #[arg(long)]
    pub svg: Option<PathBuf>,

    /// Logging level
    #[arg(long, default_value = "INFO", value_parser = ["DEBUG", "INFO", "WARNING", "ERROR"])]
    pub log_level: String,

    /// Enable debug logging
    #[arg(long)]
    pub debug: bool,
}

// ── SourcePaths ────────────────────────────────────────────────────────────────

/// Resolved on-disk locations of every local source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourcePaths {
    pub git_dir: PathBuf,
    pub claude_dir: PathBuf,
    pub codex_dir: PathBuf,
    pub cursor_db: PathBuf,
    pub gemini_dir: PathBuf,
    pub home: Option<PathBuf>,
}

// ── Settings impl ──────────────────────────────────────────────────────────────

impl Settings {
    /// Level actually used for logging; `--debug` wins over `--log-level`.
    pub fn effective_log_level(&self) -> &str {
        if self.debug {
            "DEBUG"
        } else {
            &self.log_level
        }
    }

    /// The built-in denylist extended with `--exclude` values.
    pub fn exclusions(&self) -> ExclusionList {
        ExclusionList::new(self.exclude.iter().cloned())
    }

    /// Resolve source locations against the platform home and config dirs.
    pub fn source_paths(&self) -> SourcePaths {
        self.source_paths_with(dirs::home_dir(), dirs::config_dir())
    }

    /// Same as [`Settings::source_paths`] with explicit base directories,
    /// so tests do not depend on the running user.
    pub fn source_paths_with(
        &self,
        home: Option<PathBuf>,
        config_dir: Option<PathBuf>,
    ) -> SourcePaths {
        let base = home.clone().unwrap_or_else(|| PathBuf::from("."));
        let config = config_dir.unwrap_or_else(|| base.join(".config"));

        SourcePaths {
            git_dir: self.git_dir.clone().unwrap_or_else(|| base.join("git")),
            claude_dir: self
                .claude_dir
                .clone()
                .unwrap_or_else(|| base.join(".claude").join("projects")),
            codex_dir: self
                .codex_dir
                .clone()
                .unwrap_or_else(|| base.join(".codex").join("sessions")),
            cursor_db: self.cursor_db.clone().unwrap_or_else(|| {
                config
                    .join("Cursor")
                    .join("User")
                    .join("globalStorage")
                    .join("state.vscdb")
            }),
            gemini_dir: self
                .gemini_dir
                .clone()
                .unwrap_or_else(|| base.join(".gemini").join("tmp")),
            home,
        }
    }
}

// ── Tests ──────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_settings_default_values() {
        let settings = Settings::parse_from(["devpulse"]);

        assert_eq!(settings.anchor_dir, "git");
        assert_eq!(settings.output, PathBuf::from("data/profile-data.json"));
        assert_eq!(settings.template, PathBuf::from("TEMPLATE.md"));
        assert!(settings.readme.is_none());
        assert!(settings.svg.is_none());
        assert!(settings.exclude.is_empty());
        assert_eq!(settings.log_level, "INFO");
        assert!(!settings.debug);
    }

    #[test]
    fn test_settings_cli_remote_flag() {
        let settings = Settings::parse_from(["devpulse", "--remote"]);
        assert!(settings.remote);
    }

    #[test]
    fn test_settings_cli_repeated_exclude() {
        let settings =
            Settings::parse_from(["devpulse", "--exclude", "work", "--exclude", "scratch"]);
        assert_eq!(settings.exclude, vec!["work", "scratch"]);

        let list = settings.exclusions();
        assert!(list.contains("work"));
        assert!(list.contains("scratch"));
        assert!(list.contains("zeta"));
    }

    #[test]
    fn test_settings_debug_overrides_log_level() {
        let settings = Settings::parse_from(["devpulse", "--log-level", "ERROR", "--debug"]);
        assert_eq!(settings.effective_log_level(), "DEBUG");
    }

    #[test]
    fn test_settings_rejects_unknown_log_level() {
        let result = Settings::try_parse_from(["devpulse", "--log-level", "TRACE"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_source_paths_defaults_from_home() {
        let settings = Settings::parse_from(["devpulse"]);
        let paths = settings.source_paths_with(
            Some(PathBuf::from("/home/me")),
            Some(PathBuf::from("/home/me/.config")),
        );

        assert_eq!(paths.git_dir, PathBuf::from("/home/me/git"));
        assert_eq!(paths.claude_dir, PathBuf::from("/home/me/.claude/projects"));
        assert_eq!(paths.codex_dir, PathBuf::from("/home/me/.codex/sessions"));
        assert_eq!(paths.gemini_dir, PathBuf::from("/home/me/.gemini/tmp"));
        assert_eq!(
            paths.cursor_db,
            PathBuf::from("/home/me/.config/Cursor/User/globalStorage/state.vscdb")
        );
        assert_eq!(paths.home, Some(PathBuf::from("/home/me")));
    }

    #[test]
    fn test_source_paths_explicit_override() {
        let settings = Settings::parse_from(["devpulse", "--claude-dir", "/data/claude"]);
        let paths = settings.source_paths_with(Some(PathBuf::from("/home/me")), None);
        assert_eq!(paths.claude_dir, PathBuf::from("/data/claude"));
    }
}
