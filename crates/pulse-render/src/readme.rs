//! Profile README rendering.
//!
//! The template is plain markdown with `{{PLACEHOLDER}}` markers. Every known
//! marker is replaced by a value derived from the report; unknown markers are
//! left in place so a typo is visible in the output.

use std::collections::HashMap;

use chrono::DateTime;
use pulse_core::formatting::format_compact;
use pulse_core::models::ProfileReport;
use regex::{Captures, Regex};
use tracing::warn;

/// Number of languages shown as badges.
pub const BADGE_LANGUAGES: usize = 3;

/// shields.io colours for the common languages; anything else is grey.
const BADGE_COLORS: &[(&str, &str)] = &[
    ("Python", "3776AB"),
    ("TypeScript", "3178C6"),
    ("JavaScript", "F7DF1E"),
    ("Go", "00ADD8"),
    ("Rust", "000000"),
    ("Shell", "89e051"),
];

const UPDATED_AT_FORMAT: &str = "%Y-%m-%d %H:%M UTC";

// ── Components ────────────────────────────────────────────────────────────────

/// Markdown table of the combined top repositories.
///
/// A repository with a resolved remote links its name to the GitHub page.
pub fn shipping_table(report: &ProfileReport) -> String {
    let mut table = String::from("| Repo | Commits | AI Sessions |\n");
    table.push_str("|------|---------|-------------|\n");

    for row in &report.aggregate.top_repos_combined {
        let name = match &row.github_url {
            Some(url) => format!("[**{}**]({})", row.repo, url),
            None => format!("**{}**", row.repo),
        };
        table.push_str(&format!(
            "| {} | {} | {} |\n",
            name, row.commits, row.ai_sessions
        ));
    }
    table
}

/// Whole turns per AI session over the last 7 days; 0 without sessions.
pub fn average_turns(report: &ProfileReport) -> u64 {
    let sessions = report.aggregate.ai_sessions_7d;
    if sessions == 0 {
        0
    } else {
        report.aggregate.ai_turns_7d / sessions
    }
}

fn badge_color(language: &str) -> &'static str {
    BADGE_COLORS
        .iter()
        .find(|(name, _)| *name == language)
        .map(|(_, color)| *color)
        .unwrap_or("gray")
}

/// Escape a label for use in a shields.io static badge path.
fn badge_label(language: &str) -> String {
    language
        .replace('-', "--")
        .replace('_', "__")
        .replace(' ', "_")
        .replace('+', "%2B")
        .replace('#', "%23")
}

/// shields.io badges for the top languages of the last 30 days.
pub fn language_badges(report: &ProfileReport) -> String {
    report
        .github
        .languages_30d
        .iter()
        .take(BADGE_LANGUAGES)
        .map(|lang| {
            let label = badge_label(&lang.name);
            format!(
                "![{}](https://img.shields.io/badge/{}-{}?style=flat-square&logo={}&logoColor=white)",
                lang.name,
                label,
                badge_color(&lang.name),
                label.to_lowercase()
            )
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/// `Name (commits)` for every language, comma separated.
pub fn language_list(report: &ProfileReport) -> String {
    report
        .github
        .languages_30d
        .iter()
        .map(|lang| format!("{} ({})", lang.name, lang.commits))
        .collect::<Vec<_>>()
        .join(", ")
}

/// The report timestamp as `YYYY-MM-DD HH:MM UTC`.
///
/// An unparseable timestamp is passed through unchanged.
pub fn updated_at(report: &ProfileReport) -> String {
    match DateTime::parse_from_rfc3339(&report.generated_at) {
        Ok(ts) => ts.naive_utc().format(UPDATED_AT_FORMAT).to_string(),
        Err(e) => {
            warn!("Unparseable generated_at {:?}: {}", report.generated_at, e);
            report.generated_at.clone()
        }
    }
}

/// Every placeholder name and its rendered value.
pub fn placeholder_values(report: &ProfileReport) -> HashMap<&'static str, String> {
    let sources = &report.sources;
    let turns_30d = sources.claude.turns_30d + sources.codex.turns_30d;

    HashMap::from([
        ("SHIPPING_TABLE", shipping_table(report)),
        ("AVG_TURNS", average_turns(report).to_string()),
        ("LANGUAGE_BADGES", language_badges(report)),
        ("COMMITS_30D", report.github.commits_30d.to_string()),
        ("LANGUAGES_30D", language_list(report)),
        ("CLAUDE_30D", sources.claude.sessions_30d.to_string()),
        ("CODEX_30D", sources.codex.sessions_30d.to_string()),
        ("TURNS_30D", format_compact(turns_30d)),
        ("UPDATED_AT", updated_at(report)),
    ])
}

// ── render_readme ─────────────────────────────────────────────────────────────

/// Substitute every `{{NAME}}` marker in `template`.
pub fn render_readme(template: &str, report: &ProfileReport) -> String {
    let values = placeholder_values(report);
    let re = Regex::new(r"\{\{([A-Z0-9_]+)\}\}").expect("regex is valid");

    re.replace_all(template, |caps: &Captures| match values.get(&caps[1]) {
        Some(value) => value.clone(),
        None => {
            warn!("Unknown README placeholder {}", &caps[0]);
            caps[0].to_string()
        }
    })
    .into_owned()
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use pulse_core::models::{
        AggregateReport, AiSources, GitSummary, LanguageCommits, TopGroup,
    };

    fn lang(name: &str, commits: u64) -> LanguageCommits {
        LanguageCommits {
            name: name.into(),
            commits,
        }
    }

    fn report() -> ProfileReport {
        let mut sources = AiSources::default();
        sources.claude.sessions_30d = 12;
        sources.claude.turns_30d = 900;
        sources.codex.sessions_30d = 3;
        sources.codex.turns_30d = 350;

        let github = GitSummary {
            commits_30d: 42,
            languages_30d: vec![
                lang("Rust", 20),
                lang("Python", 12),
                lang("Go", 6),
                lang("C++", 4),
            ],
            ..GitSummary::empty()
        };

        let aggregate = AggregateReport {
            ai_sessions_7d: 4,
            ai_turns_7d: 14,
            top_repos_combined: vec![
                TopGroup {
                    repo: "alpha".into(),
                    commits: 7,
                    ai_sessions: 4,
                    github_url: Some("https://github.com/me/alpha".into()),
                },
                TopGroup {
                    repo: "beta".into(),
                    commits: 2,
                    ai_sessions: 0,
                    github_url: None,
                },
            ],
            ..AggregateReport::default()
        };

        ProfileReport {
            generated_at: "2025-01-15T12:34:56+00:00".into(),
            github,
            sources,
            aggregate,
        }
    }

    // ── shipping_table ───────────────────────────────────────────────────────

    #[test]
    fn test_shipping_table_rows() {
        let table = shipping_table(&report());
        let lines: Vec<&str> = table.lines().collect();
        assert_eq!(lines.len(), 4);
        assert_eq!(lines[0], "| Repo | Commits | AI Sessions |");
        assert_eq!(lines[2], "| [**alpha**](https://github.com/me/alpha) | 7 | 4 |");
        assert_eq!(lines[3], "| **beta** | 2 | 0 |");
    }

    #[test]
    fn test_shipping_table_empty_has_header_only() {
        let mut r = report();
        r.aggregate.top_repos_combined.clear();
        assert_eq!(shipping_table(&r).lines().count(), 2);
    }

    // ── average_turns ────────────────────────────────────────────────────────

    #[test]
    fn test_average_turns_truncates() {
        assert_eq!(average_turns(&report()), 3);
    }

    #[test]
    fn test_average_turns_without_sessions() {
        let mut r = report();
        r.aggregate.ai_sessions_7d = 0;
        assert_eq!(average_turns(&r), 0);
    }

    // ── language_badges ──────────────────────────────────────────────────────

    #[test]
    fn test_language_badges_top_three() {
        let badges = language_badges(&report());
        assert_eq!(badges.matches("![").count(), 3);
        assert!(badges.contains("badge/Rust-000000?style=flat-square&logo=rust"));
        assert!(badges.contains("badge/Python-3776AB"));
        assert!(!badges.contains("C++"));
    }

    #[test]
    fn test_badge_label_escapes() {
        assert_eq!(badge_label("C++"), "C%2B%2B");
        assert_eq!(badge_label("Objective-C"), "Objective--C");
        assert_eq!(badge_color("Haskell"), "gray");
    }

    // ── placeholder values ───────────────────────────────────────────────────

    #[test]
    fn test_language_list_and_turns() {
        let values = placeholder_values(&report());
        assert_eq!(values["LANGUAGES_30D"], "Rust (20), Python (12), Go (6), C++ (4)");
        assert_eq!(values["TURNS_30D"], "1.2k");
        assert_eq!(values["CLAUDE_30D"], "12");
        assert_eq!(values["CODEX_30D"], "3");
        assert_eq!(values["COMMITS_30D"], "42");
    }

    #[test]
    fn test_updated_at_format() {
        assert_eq!(updated_at(&report()), "2025-01-15 12:34 UTC");

        let mut r = report();
        r.generated_at = "2025-01-15T14:34:56+02:00".into();
        assert_eq!(updated_at(&r), "2025-01-15 12:34 UTC");

        r.generated_at = "yesterday".into();
        assert_eq!(updated_at(&r), "yesterday");
    }

    // ── render_readme ────────────────────────────────────────────────────────

    #[test]
    fn test_render_readme_substitutes_known_markers() {
        let template = "Avg {{AVG_TURNS}} turns, {{COMMITS_30D}} commits.\nUpdated {{UPDATED_AT}}";
        let out = render_readme(template, &report());
        assert_eq!(out, "Avg 3 turns, 42 commits.\nUpdated 2025-01-15 12:34 UTC");
    }

    #[test]
    fn test_render_readme_keeps_unknown_markers() {
        let out = render_readme("{{NOPE}} and {{CODEX_30D}} and {lower}", &report());
        assert_eq!(out, "{{NOPE}} and 3 and {lower}");
    }

    #[test]
    fn test_render_readme_repeated_marker() {
        let out = render_readme("{{CLAUDE_30D}}/{{CLAUDE_30D}}", &report());
        assert_eq!(out, "12/12");
    }
}
