/// Format an integer count with thousands separators.
///
/// # Examples
///
/// ```
/// use stats_core::formatting::format_count;
///
/// assert_eq!(format_count(0), "0");
/// assert_eq!(format_count(1234), "1,234");
/// assert_eq!(format_count(1_234_567), "1,234,567");
/// ```
pub fn format_count(value: u64) -> String {
    group_thousands(&value.to_string())
}

/// Calculate `(part / whole) * 100`, rounded to `decimal_places`.
///
/// Returns `0.0` if `whole` is zero to avoid division by zero.
///
/// # Examples
///
/// ```
/// use stats_core::formatting::percentage;
///
/// assert!((percentage(50, 200, 1) - 25.0).abs() < 1e-9);
/// assert_eq!(percentage(0, 0, 2), 0.0);
/// ```
pub fn percentage(part: u64, whole: u64, decimal_places: u32) -> f64 {
    if whole == 0 {
        return 0.0;
    }
    let raw = (part as f64 / whole as f64) * 100.0;
    let factor = 10_f64.powi(decimal_places as i32);
    (raw * factor).round() / factor
}

const SECONDS_PER_MINUTE: i64 = 60;
const SECONDS_PER_HOUR: i64 = 60 * SECONDS_PER_MINUTE;
const SECONDS_PER_DAY: i64 = 24 * SECONDS_PER_HOUR;
const SECONDS_PER_MONTH: i64 = 30 * SECONDS_PER_DAY;
const SECONDS_PER_YEAR: i64 = 365 * SECONDS_PER_DAY;

/// Describe a chat's time span using its two most significant non-zero units.
///
/// Years are 365 days and months 30 days. Each unit is computed from the
/// remainder of the next-larger fixed period, so the parts are approximate
/// for spans longer than a month.
///
/// # Examples
///
/// ```
/// use stats_core::formatting::format_chat_duration;
///
/// assert_eq!(format_chat_duration(0), "0 seconds");
/// assert_eq!(format_chat_duration(90_000), "1 minute, 30 seconds");
/// assert_eq!(format_chat_duration(2 * 86_400_000 + 3_600_000), "2 days, 1 hour");
/// ```
pub fn format_chat_duration(duration_ms: i64) -> String {
    let secs = duration_ms.max(0) / 1000;

    let parts = [
        ("year", secs / SECONDS_PER_YEAR),
        ("month", (secs % SECONDS_PER_YEAR) / SECONDS_PER_MONTH),
        ("day", (secs % SECONDS_PER_MONTH) / SECONDS_PER_DAY),
        ("hour", (secs % SECONDS_PER_DAY) / SECONDS_PER_HOUR),
        ("minute", (secs % SECONDS_PER_HOUR) / SECONDS_PER_MINUTE),
        ("second", secs % SECONDS_PER_MINUTE),
    ];

    let significant: Vec<String> = parts
        .iter()
        .filter(|(_, value)| *value > 0)
        .take(2)
        .map(|(unit, value)| {
            let plural = if *value == 1 { "" } else { "s" };
            format!("{} {}{}", value, unit, plural)
        })
        .collect();

    if significant.is_empty() {
        return "0 seconds".to_string();
    }
    significant.join(", ")
}

// ── Internal helpers ──────────────────────────────────────────────────────────

/// Insert commas every three digits from the right of an integer string.
fn group_thousands(s: &str) -> String {
    if s.len() <= 3 {
        return s.to_string();
    }
    let chars: Vec<char> = s.chars().collect();
    let mut result = String::with_capacity(s.len() + s.len() / 3);
    let remainder = chars.len() % 3;
    for (i, &c) in chars.iter().enumerate() {
        if i != 0 && (i % 3 == remainder) {
            result.push(',');
        }
        result.push(c);
    }
    result
}

// ── Tests ──────────────────────────────────────────────────────────────────────
