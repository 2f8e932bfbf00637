//! Hero dashboard SVG.
//!
//! A fixed 900x200 card: headline 7-day numbers, a bar splitting AI sessions
//! by provider and the time since the most recent activity.

use std::fmt::Write as _;

use pulse_core::formatting::{format_compact, format_elapsed};
use pulse_core::models::{LastActivity, ProfileReport, Provider};

pub const WIDTH: u32 = 900;
pub const HEIGHT: u32 = 200;

/// Bar width in pixels for one percentage point.
const BAR_SCALE: f64 = 8.0;

/// Segments narrower than this many percent are drawn without a label.
const MIN_LABELLED_PERCENT: f64 = 5.0;

// GitHub dark palette.
const BG_COLOR: &str = "#0d1117";
const BORDER_COLOR: &str = "#30363d";
const TEXT_PRIMARY: &str = "#c9d1d9";
const TEXT_SECONDARY: &str = "#8b949e";
const ACCENT_COLOR: &str = "#58a6ff";

fn provider_color(provider: Provider) -> &'static str {
    match provider {
        Provider::Claude => "#58a6ff",
        Provider::Codex => "#8b949e",
        Provider::Cursor => "#3fb950",
        Provider::Gemini => "#d29922",
    }
}

/// Escape text for XML character data and attribute values.
pub fn xml_escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            _ => out.push(c),
        }
    }
    out
}

/// The most recent of the last push and every source's last session.
pub fn latest_activity(report: &ProfileReport) -> Option<&LastActivity> {
    let sessions = report
        .sources
        .iter()
        .filter_map(|(_, summary)| summary.last_session.as_ref());

    report
        .github
        .last_push
        .iter()
        .chain(sessions)
        .min_by(|a, b| a.hours_ago.total_cmp(&b.hours_ago))
}

/// `"3h ago"` style label for [`latest_activity`], or `"Unknown"`.
pub fn last_activity_label(report: &ProfileReport) -> String {
    latest_activity(report)
        .map(|activity| format_elapsed(activity.hours_ago))
        .unwrap_or_else(|| "Unknown".to_string())
}

fn share_bar(report: &ProfileReport) -> String {
    let mut bar = String::new();
    let mut x = 0.0;

    for provider in Provider::ALL {
        let pct = report
            .aggregate
            .session_percentages
            .get(&provider)
            .copied()
            .unwrap_or(0.0);
        if pct <= 0.0 {
            continue;
        }

        let width = pct * BAR_SCALE;
        let _ = writeln!(
            bar,
            r#"    <rect x="{x:.1}" y="10" width="{width:.1}" height="24" fill="{}" rx="2"/>"#,
            provider_color(provider)
        );
        if pct >= MIN_LABELLED_PERCENT {
            let _ = writeln!(
                bar,
                r#"    <text x="{:.1}" y="28" class="bar-label">{} {}%</text>"#,
                x + 10.0,
                xml_escape(provider.display_name()),
                pct
            );
        }
        x += width;
    }
    bar
}

// ── render_svg ────────────────────────────────────────────────────────────────

/// Render the dashboard card for `report`.
pub fn render_svg(report: &ProfileReport) -> String {
    let aggregate = &report.aggregate;
    let github = &report.github;

    let metrics = [
        (0, aggregate.ai_sessions_7d.to_string(), "AI SESSIONS"),
        (200, format_compact(aggregate.ai_turns_7d), "TURNS"),
        (380, github.commits_7d.to_string(), "COMMITS"),
        (530, github.repos_active_7d.to_string(), "ACTIVE REPOS"),
    ];

    let mut svg = String::new();
    let _ = writeln!(
        svg,
        r#"<svg xmlns="http://www.w3.org/2000/svg" width="{WIDTH}" height="{HEIGHT}" viewBox="0 0 {WIDTH} {HEIGHT}">"#
    );
    let _ = writeln!(
        svg,
        r#"  <defs>
    <style>
      .title {{ font: bold 20px 'Segoe UI', Ubuntu, sans-serif; fill: {TEXT_PRIMARY}; }}
      .metric-value {{ font: bold 32px 'Segoe UI', Ubuntu, monospace; fill: {ACCENT_COLOR}; }}
      .metric-label {{ font: 12px 'Segoe UI', Ubuntu, sans-serif; fill: {TEXT_SECONDARY}; }}
      .bar-label {{ font: 13px 'Segoe UI', Ubuntu, sans-serif; fill: {TEXT_PRIMARY}; }}
      .last-activity {{ font: 14px 'Segoe UI', Ubuntu, sans-serif; fill: {TEXT_SECONDARY}; }}
    </style>
  </defs>"#
    );
    let _ = writeln!(
        svg,
        r#"  <rect width="{WIDTH}" height="{HEIGHT}" fill="{BG_COLOR}" rx="8"/>"#
    );
    let _ = writeln!(
        svg,
        r#"  <rect x="1" y="1" width="{}" height="{}" fill="none" stroke="{BORDER_COLOR}" stroke-width="1" rx="8"/>"#,
        WIDTH - 2,
        HEIGHT - 2
    );
    let _ = writeln!(
        svg,
        r#"  <text x="30" y="35" class="title">AI-Native Development Dashboard</text>"#
    );

    let _ = writeln!(svg, r#"  <g transform="translate(30, 70)">"#);
    for (x, value, label) in &metrics {
        let _ = writeln!(
            svg,
            r#"    <text x="{x}" y="0" class="metric-value">{}</text>"#,
            xml_escape(value)
        );
        let _ = writeln!(
            svg,
            r#"    <text x="{x}" y="20" class="metric-label">{label}</text>"#
        );
    }
    let _ = writeln!(svg, "  </g>");

    let _ = writeln!(svg, r#"  <g transform="translate(30, 130)">"#);
    let _ = writeln!(
        svg,
        r#"    <text x="0" y="0" class="metric-label">LAST 7 DAYS</text>"#
    );
    svg.push_str(&share_bar(report));
    let _ = writeln!(svg, "  </g>");

    let _ = writeln!(
        svg,
        r#"  <text x="30" y="{}" class="last-activity">Last activity: {}</text>"#,
        HEIGHT - 20,
        xml_escape(&last_activity_label(report))
    );
    svg.push_str("</svg>\n");
    svg
}

// ── Tests ─────────────────────────────────────────────────────────────────────
