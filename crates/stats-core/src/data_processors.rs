use chrono::{DateTime, Utc};
use serde_json::Value;

// ── TimestampProcessor ────────────────────────────────────────────────────────

/// Converts the export's unix-seconds strings into millisecond timestamps.
pub struct TimestampProcessor;

impl TimestampProcessor {
    /// Parse a decimal unix-seconds string into milliseconds since the epoch.
    ///
    /// Surrounding whitespace is ignored. Returns `None` for anything that is
    /// not a plain integer, or whose millisecond value is not a representable
    /// [`DateTime`].
    pub fn parse_unix_seconds(s: &str) -> Option<i64> {
        let ms = s.trim().parse::<i64>().ok()?.checked_mul(1000)?;
        Self::to_datetime(ms).map(|_| ms)
    }

    /// Millisecond timestamp → UTC [`DateTime`].
    pub fn to_datetime(ms: i64) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp_millis(ms)
    }
}

// ── TextMetrics ───────────────────────────────────────────────────────────────

/// Character and word counts of a message's `text` field.
///
/// Only plain-string bodies are measured; absent text and rich-text lists
/// count as zero.
pub struct TextMetrics;

impl TextMetrics {
    pub fn character_count(text: Option<&Value>) -> usize {
        match text {
            Some(Value::String(s)) => s.chars().count(),
            _ => 0,
        }
    }

    pub fn word_count(text: Option<&Value>) -> usize {
        match text {
            Some(Value::String(s)) => s.split_whitespace().count(),
            _ => 0,
        }
    }
}

// ── Tests ──────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_unix_seconds() {
        assert_eq!(TimestampProcessor::parse_unix_seconds("1000"), Some(1_000_000));
        assert_eq!(TimestampProcessor::parse_unix_seconds(" 42 "), Some(42_000));
        assert_eq!(TimestampProcessor::parse_unix_seconds("0"), Some(0));
    }

    #[test]
    fn test_parse_unix_seconds_rejects_garbage() {
        assert_eq!(TimestampProcessor::parse_unix_seconds(""), None);
        assert_eq!(TimestampProcessor::parse_unix_seconds("abc"), None);
        assert_eq!(TimestampProcessor::parse_unix_seconds("12.5"), None);
        assert_eq!(TimestampProcessor::parse_unix_seconds("1000abc"), None);
    }

    #[test]
    fn test_parse_unix_seconds_overflow() {
        let huge = i64::MAX.to_string();
        assert_eq!(TimestampProcessor::parse_unix_seconds(&huge), None);
    }

    #[test]
    fn test_parse_unix_seconds_outside_datetime_range() {
        assert_eq!(TimestampProcessor::parse_unix_seconds("99999999999999"), None);
        assert_eq!(TimestampProcessor::parse_unix_seconds("-99999999999999"), None);

        let min = DateTime::<Utc>::MIN_UTC.timestamp();
        assert_eq!(
            TimestampProcessor::parse_unix_seconds(&min.to_string()),
            Some(min * 1000)
        );
    }

    #[test]
    fn test_to_datetime() {
        let dt = TimestampProcessor::to_datetime(1_700_000_000_000).unwrap();
        assert_eq!(dt.timestamp(), 1_700_000_000);
    }

    #[test]
    fn test_word_count() {
        assert_eq!(TextMetrics::word_count(Some(&json!("hi there"))), 2);
        assert_eq!(TextMetrics::word_count(Some(&json!("  spaced   out\ttext\n"))), 3);
        assert_eq!(TextMetrics::word_count(Some(&json!("single"))), 1);
        assert_eq!(TextMetrics::word_count(Some(&json!(""))), 0);
        assert_eq!(TextMetrics::word_count(None), 0);
        assert_eq!(TextMetrics::word_count(Some(&json!(["a b", {"type": "bold"}]))), 0);
    }

    #[test]
    fn test_character_count() {
        assert_eq!(TextMetrics::character_count(Some(&json!("hi there"))), 8);
        assert_eq!(TextMetrics::character_count(Some(&json!("héllo"))), 5);
        assert_eq!(TextMetrics::character_count(None), 0);
        assert_eq!(TextMetrics::character_count(Some(&json!(["x"]))), 0);
    }
}
