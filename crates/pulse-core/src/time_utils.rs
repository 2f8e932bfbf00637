use chrono::{DateTime, Duration, Utc};

// ── Window ────────────────────────────────────────────────────────────────────

/// A trailing time range ending at the reference instant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Window {
    Week,
    Month,
}

impl Window {
    pub fn days(&self) -> i64 {
        match self {
            Window::Week => 7,
            Window::Month => 30,
        }
    }
}

// ── TimeWindows ───────────────────────────────────────────────────────────────

/// Cutoffs for the 7-day and 30-day windows relative to one fixed `now`.
///
/// A timestamp belongs to a window when it is at or after the cutoff. The
/// week window is therefore always a subset of the month window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeWindows {
    now: DateTime<Utc>,
    week_cutoff: DateTime<Utc>,
    month_cutoff: DateTime<Utc>,
}

impl TimeWindows {
    pub fn new(now: DateTime<Utc>) -> Self {
        Self {
            now,
            week_cutoff: now - Duration::days(Window::Week.days()),
            month_cutoff: now - Duration::days(Window::Month.days()),
        }
    }

    /// Windows anchored at the current UTC instant.
    pub fn now() -> Self {
        Self::new(Utc::now())
    }

    pub fn reference(&self) -> DateTime<Utc> {
        self.now
    }

    pub fn cutoff(&self, window: Window) -> DateTime<Utc> {
        match window {
            Window::Week => self.week_cutoff,
            Window::Month => self.month_cutoff,
        }
    }

    pub fn contains(&self, window: Window, ts: DateTime<Utc>) -> bool {
        ts >= self.cutoff(window)
    }

    /// Hours elapsed between `ts` and the reference instant, two decimals.
    pub fn hours_since(&self, ts: DateTime<Utc>) -> f64 {
        let hours = (self.now - ts).num_milliseconds() as f64 / 3_600_000.0;
        round_to(hours, 2)
    }
}

// ── Helpers ───────────────────────────────────────────────────────────────────

/// Round half away from zero to `places` decimals.
pub fn round_to(value: f64, places: u32) -> f64 {
    let factor = 10_f64.powi(places as i32);
    (value * factor).round() / factor
}

/// UTC calendar date key, `YYYY-MM-DD`.
pub fn date_key(ts: DateTime<Utc>) -> String {
    ts.format("%Y-%m-%d").to_string()
}

/// RFC 3339 rendering used for every timestamp written to the report.
pub fn iso_utc(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339()
}

// ── Tests ─────────────────────────────────────────────────────────────────────
