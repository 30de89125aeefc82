use std::path::PathBuf;
use thiserror::Error;

/// All errors produced by the Telegram stats crates.
#[derive(Error, Debug)]
pub enum StatsError {
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

    /// A message's `date_unixtime` is not an integer number of seconds.
    #[error("Invalid timestamp {value:?} in message #{index}")]
    TimestampParse { index: usize, value: String },

    /// The export is not a two-party personal chat.
    #[error("Unsupported chat type: {0} (only personal_chat exports are supported)")]
    UnsupportedChatType(String),

    /// A required top-level export field is missing or empty.
    #[error("Invalid export: missing field '{0}'")]
    MissingField(&'static str),

    /// The export contains no messages.
    #[error("No messages found in the export")]
    EmptyExport,

    /// Every message was dropped during normalization.
    #[error("No message with a valid timestamp in the export")]
    NoValidMessages,

    /// A user-supplied date string could not be parsed.
    #[error("Invalid date: {0}")]
    InvalidDate(String),

    /// A timezone name is not a recognised IANA identifier.
    #[error("Invalid timezone: {0}")]
    InvalidTimezone(String),

    /// No `result.json` export was found at the searched locations.
    #[error("No Telegram export found in {0}")]
    NoExportFound(PathBuf),

    /// A configuration value is missing or invalid.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Pass-through for any raw I/O error that does not carry a path.
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// Catch-all for errors from third-party crates via `anyhow`.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Convenience alias used throughout the stats crates.
pub type Result<T> = std::result::Result<T, StatsError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display_file_read() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "no such file");
        let err = StatsError::FileRead {
            path: PathBuf::from("/some/result.json"),
            source: io_err,
        };
        let msg = err.to_string();
        assert!(msg.contains("Failed to read file"));
        assert!(msg.contains("/some/result.json"));
        assert!(msg.contains("no such file"));
    }

    #[test]
    fn test_error_display_timestamp_parse() {
        let err = StatsError::TimestampParse {
            index: 3,
            value: "abc".to_string(),
        };
        assert_eq!(err.to_string(), "Invalid timestamp \"abc\" in message #3");
    }

    #[test]
    fn test_error_display_unsupported_chat_type() {
        let err = StatsError::UnsupportedChatType("private_group".to_string());
        assert_eq!(
            err.to_string(),
            "Unsupported chat type: private_group (only personal_chat exports are supported)"
        );
    }

    #[test]
    fn test_error_display_missing_field() {
        let err = StatsError::MissingField("name");
        assert_eq!(err.to_string(), "Invalid export: missing field 'name'");
    }

    #[test]
    fn test_error_display_empty_export() {
        assert_eq!(
            StatsError::EmptyExport.to_string(),
            "No messages found in the export"
        );
    }

    #[test]
    fn test_error_display_no_export_found() {
        let err = StatsError::NoExportFound(PathBuf::from("/empty/dir"));
        assert_eq!(err.to_string(), "No Telegram export found in /empty/dir");
    }

    #[test]
    fn test_error_display_config() {
        let err = StatsError::Config("bad granularity".to_string());
        assert_eq!(err.to_string(), "Configuration error: bad granularity");
    }

    #[test]
    fn test_error_from_io() {
        let io_err = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied");
        let err: StatsError = io_err.into();
        assert!(err.to_string().contains("denied"));
    }

    #[test]
    fn test_error_from_serde_json() {
        let json_err = serde_json::from_str::<serde_json::Value>("{invalid}").unwrap_err();
        let err: StatsError = json_err.into();
        assert!(err.to_string().contains("Failed to parse JSON"));
    }
}
