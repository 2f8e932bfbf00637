mod bootstrap;

use std::path::Path;

use anyhow::{Context, Result};
use clap::Parser;
use pulse_core::formatting::format_compact;
use pulse_core::models::ProfileReport;
use pulse_core::settings::Settings;
use pulse_runtime::collector::{Collection, Collector, CollectorConfig};
use pulse_runtime::output::{write_atomic, write_report};

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let settings = Settings::parse();

    bootstrap::setup_logging(settings.effective_log_level())?;

    tracing::info!("devpulse v{} starting", env!("CARGO_PKG_VERSION"));

    let collection = Collector::new(CollectorConfig::from_settings(&settings))
        .collect()
        .await;

    write_report(&collection.report, &settings.output)
        .with_context(|| format!("writing {}", settings.output.display()))?;
    tracing::info!("Report written to {}", settings.output.display());

    if let Some(readme) = &settings.readme {
        render_readme_file(&settings.template, readme, &collection.report)?;
    }
    if let Some(svg) = &settings.svg {
        write_atomic(svg, pulse_render::render_svg(&collection.report).as_bytes())
            .with_context(|| format!("writing {}", svg.display()))?;
        tracing::info!("Dashboard written to {}", svg.display());
    }

    println!("{}", summary(&collection, &settings.output));
    Ok(())
}

/// Render `template` into `dest`. Returns `false` when the template is missing.
fn render_readme_file(template: &Path, dest: &Path, report: &ProfileReport) -> Result<bool> {
    let source = match std::fs::read_to_string(template) {
        Ok(source) => source,
        Err(e) => {
            tracing::warn!(
                "Template {} unavailable ({}), skipping README",
                template.display(),
                e
            );
            return Ok(false);
        }
    };

    let rendered = pulse_render::render_readme(&source, report);
    write_atomic(dest, rendered.as_bytes())
        .with_context(|| format!("writing {}", dest.display()))?;
    tracing::info!("README written to {}", dest.display());
    Ok(true)
}

/// Closing lines printed to stdout.
fn summary(collection: &Collection, output: &Path) -> String {
    let aggregate = &collection.report.aggregate;
    let github = &collection.report.github;

    let mut lines = vec![
        format!("Snapshot written to {}", output.display()),
        format!("  AI data from {}", collection.origin.label()),
        format!(
            "  AI sessions (7d): {} ({} turns)",
            aggregate.ai_sessions_7d,
            format_compact(aggregate.ai_turns_7d)
        ),
        format!(
            "  Commits (7d): {} across {} repos",
            github.commits_7d, github.repos_active_7d
        ),
    ];
    if let Some(top) = aggregate.top_repos_combined.first() {
        lines.push(format!(
            "  Top repo: {} ({} commits, {} sessions)",
            top.repo, top.commits, top.ai_sessions
        ));
    }
    lines.join("\n")
}

// ── Tests ──────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use pulse_core::models::{AggregateReport, AiSources, GitSummary, TopGroup};
    use pulse_runtime::collector::DataOrigin;
    use tempfile::TempDir;

    fn report() -> ProfileReport {
        let aggregate = AggregateReport {
            ai_sessions_7d: 4,
            ai_turns_7d: 1400,
            top_repos_combined: vec![TopGroup {
                repo: "alpha".into(),
                commits: 3,
                ai_sessions: 4,
                github_url: None,
            }],
            ..AggregateReport::default()
        };
        ProfileReport {
            generated_at: "2025-01-15T12:00:00+00:00".into(),
            github: GitSummary {
                commits_7d: 3,
                repos_active_7d: 1,
                ..GitSummary::empty()
            },
            sources: AiSources::default(),
            aggregate,
        }
    }

    // ── test_render_readme_file ───────────────────────────────────────────────

    #[test]
    fn test_render_readme_file_writes_output() {
        let tmp = TempDir::new().expect("tempdir");
        let template = tmp.path().join("TEMPLATE.md");
        let dest = tmp.path().join("out").join("README.md");
        std::fs::write(&template, "Avg {{AVG_TURNS}}").expect("write template");

        let written = render_readme_file(&template, &dest, &report()).expect("render");

        assert!(written);
        assert_eq!(std::fs::read_to_string(&dest).expect("read"), "Avg 350");
    }

    #[test]
    fn test_render_readme_file_missing_template_is_skipped() {
        let tmp = TempDir::new().expect("tempdir");
        let dest = tmp.path().join("README.md");

        let written =
            render_readme_file(&tmp.path().join("nope.md"), &dest, &report()).expect("render");

        assert!(!written);
        assert!(!dest.exists());
    }

    // ── test_summary ──────────────────────────────────────────────────────────

    #[test]
    fn test_summary_lines() {
        let collection = Collection {
            report: report(),
            origin: DataOrigin::Remote,
        };
        let text = summary(&collection, Path::new("data/profile-data.json"));

        assert!(text.starts_with("Snapshot written to data/profile-data.json"));
        assert!(text.contains("AI data from stats API"));
        assert!(text.contains("AI sessions (7d): 4 (1.4k turns)"));
        assert!(text.contains("Commits (7d): 3 across 1 repos"));
        assert!(text.contains("Top repo: alpha (3 commits, 4 sessions)"));
    }

    #[test]
    fn test_summary_without_top_repo() {
        let mut r = report();
        r.aggregate.top_repos_combined.clear();
        let collection = Collection {
            report: r,
            origin: DataOrigin::Local,
        };
        let text = summary(&collection, Path::new("out.json"));
        assert_eq!(text.lines().count(), 4);
        assert!(text.contains("local files"));
    }
}
