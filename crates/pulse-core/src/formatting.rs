/// Format a count in the compact dashboard form: plain below 1000, otherwise
/// thousands with one decimal and a `k` suffix.
///
/// # Examples
///
/// ```
/// use pulse_core::formatting::format_compact;
///
/// assert_eq!(format_compact(999), "999");
/// assert_eq!(format_compact(1000), "1.0k");
/// assert_eq!(format_compact(12_345), "12.3k");
/// ```
pub fn format_compact(value: u64) -> String {
    if value >= 1000 {
        format!("{:.1}k", value as f64 / 1000.0)
    } else {
        value.to_string()
    }
}

/// Format elapsed hours as a short "time ago" label.
///
/// * `< 1` hour  → `"45m ago"`
/// * `< 24` hours → `"3h ago"`
/// * otherwise    → `"2d ago"`
///
/// # Examples
///
/// ```
/// use pulse_core::formatting::format_elapsed;
///
/// assert_eq!(format_elapsed(0.75), "45m ago");
/// assert_eq!(format_elapsed(3.9),  "3h ago");
/// assert_eq!(format_elapsed(50.0), "2d ago");
/// ```
pub fn format_elapsed(hours: f64) -> String {
    let hours = hours.max(0.0);
    if hours < 1.0 {
        format!("{}m ago", (hours * 60.0) as i64)
    } else if hours < 24.0 {
        format!("{}h ago", hours as i64)
    } else {
        format!("{}d ago", (hours / 24.0) as i64)
    }
}

/// Calculate `(part / whole) * 100`, rounded to `decimal_places`.
///
/// Returns `0.0` if `whole` is zero to avoid division by zero.
///
/// # Examples
///
/// ```
/// use pulse_core::formatting::percentage;
///
/// assert_eq!(percentage(1, 4, 1), 25.0);
/// assert_eq!(percentage(0, 0, 1), 0.0);
/// ```
pub fn percentage(part: u64, whole: u64, decimal_places: u32) -> f64 {
    if whole == 0 {
        return 0.0;
    }
    let raw = (part as f64 / whole as f64) * 100.0;
    crate::time_utils::round_to(raw, decimal_places)
}

// ── Tests ──────────────────────────────────────────────────────────────────────
