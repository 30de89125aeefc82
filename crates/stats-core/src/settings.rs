use clap::{CommandFactory, Parser};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use tracing::warn;

use crate::error::Result;
use crate::models::{Granularity, SplitMode};
use crate::time_utils::TimezoneHandler;

// ── Settings (CLI) ─────────────────────────────────────────────────────────────

/// Message activity statistics for Telegram personal-chat exports
#[derive(Parser, Debug, Clone)]
#[command(
    name = "telegram-stats",
    about = "Message activity statistics for Telegram personal-chat exports",
    version
)]
pub struct Settings {
    /// Export file (result.json) or a directory containing exports
    pub export: Option<PathBuf>,

    /// What to print
    #[arg(long, default_value = "summary", value_parser = ["summary", "histogram", "record"])]
    pub view: String,

    /// Histogram bucket unit
    #[arg(long, default_value = "month", value_parser = ["day", "week", "month", "year"])]
    pub granularity: String,

    /// Split histogram series by content type or by sender
    #[arg(long, default_value = "type", value_parser = ["type", "person"])]
    pub split: String,

    /// Window end date, YYYY-MM-DD (defaults to the last message)
    #[arg(long)]
    pub end: Option<String>,

    /// Move the window before printing
    #[arg(long, value_parser = ["prev", "next"])]
    pub navigate: Option<String>,

    /// Number of navigation steps (1-1000)
    #[arg(long, default_value = "1", value_parser = clap::value_parser!(u32).range(1..=1000))]
    pub steps: u32,

    /// Sender id of the first per-person series
    #[arg(long)]
    pub main_person: Option<String>,

    /// Sender id of the second per-person series
    #[arg(long)]
    pub other_person: Option<String>,

    /// Timezone for calendar buckets (auto-detected if not specified)
    #[arg(long, default_value = "auto")]
    pub timezone: String,

    /// Output format
    #[arg(long, default_value = "table", value_parser = ["table", "json"])]
    pub format: String,

    /// Skip messages with unparsable timestamps instead of failing
    #[arg(long)]
    pub skip_invalid: bool,

    /// Record id for the record view (defaults to the chat id)
    #[arg(long)]
    pub record_id: Option<String>,

    /// Logging level
    #[arg(long, default_value = "INFO", value_parser = ["DEBUG", "INFO", "WARNING", "ERROR", "CRITICAL"])]
    pub log_level: String,

    /// Log file path
    #[arg(long)]
    pub log_file: Option<PathBuf>,

    /// Enable debug logging
    #[arg(long)]
    pub debug: bool,

    /// Clear saved configuration
    #[arg(long)]
    pub clear: bool,
}

// ── LastUsedParams ─────────────────────────────────────────────────────────────

/// Persisted last-used parameters saved to `~/.telegram-stats/last_used.json`.
#[derive(Debug, Serialize, Deserialize, Default, Clone)]
pub struct LastUsedParams {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub granularity: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub split: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timezone: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub format: Option<String>,
}

impl LastUsedParams {
    /// Return the default path to the persisted config file.
    pub fn config_path() -> PathBuf {
        Self::config_path_in(&dirs::home_dir().unwrap_or_else(|| PathBuf::from(".")))
    }

    /// Return the config path rooted at `base_dir` (used for testing).
    pub fn config_path_in(base_dir: &std::path::Path) -> PathBuf {
        base_dir.join(".telegram-stats").join("last_used.json")
    }

    /// Load persisted params from an explicit path.
    /// Returns `Default` when the file is absent or cannot be parsed.
    pub fn load_from(path: &std::path::Path) -> Self {
        let Ok(content) = std::fs::read_to_string(path) else {
            return Self::default();
        };
        serde_json::from_str(&content).unwrap_or_default()
    }

    /// Atomically write params to an explicit path.
    pub fn save_to(&self, path: &std::path::Path) -> std::result::Result<(), std::io::Error> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let json = serde_json::to_string_pretty(self).map_err(std::io::Error::other)?;

        // Write to a temp file then rename for atomicity.
        let tmp = path.with_extension("json.tmp");
        std::fs::write(&tmp, &json)?;
        std::fs::rename(&tmp, path)?;

        Ok(())
    }

    /// Drop persisted values that the CLI parser would reject, so a
    /// hand-edited file falls back to the defaults instead of failing later.
    pub fn validated(self) -> Self {
        fn keep(field: &str, value: Option<String>, valid: impl Fn(&str) -> bool) -> Option<String> {
            match value {
                Some(v) if valid(&v) => Some(v),
                Some(v) => {
                    warn!("Ignoring invalid saved {} \"{}\"", field, v);
                    None
                }
                None => None,
            }
        }

        LastUsedParams {
            granularity: keep("granularity", self.granularity, |v| {
                v.parse::<Granularity>().is_ok()
            }),
            split: keep("split", self.split, |v| v.parse::<SplitMode>().is_ok()),
            timezone: keep("timezone", self.timezone, |v| {
                v == "auto" || TimezoneHandler::validate_timezone(v)
            }),
            format: keep("format", self.format, |v| matches!(v, "table" | "json")),
        }
    }

    /// Delete the config file at an explicit path if it exists.
    pub fn clear_at(path: &std::path::Path) -> std::result::Result<(), std::io::Error> {
        if path.exists() {
            std::fs::remove_file(path)?;
        }
        Ok(())
    }
}

// ── Settings impl ──────────────────────────────────────────────────────────────

impl Settings {
    /// Parse CLI arguments, merge with last-used params where no explicit CLI
    /// value was provided, resolve `"auto"` values, and persist the result.
    pub fn load_with_last_used() -> Self {
        Self::load_with_last_used_impl(
            std::env::args_os().collect(),
            &LastUsedParams::config_path(),
        )
    }

    /// Full implementation – accepts args and an explicit config path so that
    /// tests can redirect to a temporary directory.
    pub fn load_with_last_used_impl(
        args: Vec<std::ffi::OsString>,
        config_path: &std::path::Path,
    ) -> Self {
        // Raw ArgMatches are needed to query ValueSource.
        let matches = Settings::command().get_matches_from(args.clone());
        let mut settings = Settings::parse_from(args);

        if settings.clear {
            let _ = LastUsedParams::clear_at(config_path);
            return Self::resolve_auto_values(settings);
        }

        let last = LastUsedParams::load_from(config_path).validated();

        // CLI always wins over persisted values.
        if !is_arg_explicitly_set(&matches, "granularity") {
            if let Some(v) = last.granularity {
                settings.granularity = v;
            }
        }
        if !is_arg_explicitly_set(&matches, "split") {
            if let Some(v) = last.split {
                settings.split = v;
            }
        }
        if !is_arg_explicitly_set(&matches, "timezone") {
            if let Some(v) = last.timezone {
                settings.timezone = v;
            }
        }
        if !is_arg_explicitly_set(&matches, "format") {
            if let Some(v) = last.format {
                settings.format = v;
            }
        }

        settings = Self::resolve_auto_values(settings);

        let params = LastUsedParams::from(&settings);
        let _ = params.save_to(config_path);

        settings
    }

    /// Typed histogram granularity.
    pub fn granularity(&self) -> Result<Granularity> {
        self.granularity.parse()
    }

    /// Typed split mode.
    pub fn split_mode(&self) -> Result<SplitMode> {
        self.split.parse()
    }

    /// Resolve `"auto"` sentinel values and apply the `--debug` flag.
    fn resolve_auto_values(mut settings: Settings) -> Settings {
        if settings.timezone == "auto" {
            settings.timezone = crate::time_utils::get_system_timezone();
        }

        if settings.debug {
            settings.log_level = "DEBUG".to_string();
        }

        settings
    }
}

// ── Conversion ─────────────────────────────────────────────────────────────────

impl From<&Settings> for LastUsedParams {
    fn from(s: &Settings) -> Self {
        LastUsedParams {
            granularity: Some(s.granularity.clone()),
            split: Some(s.split.clone()),
            timezone: Some(s.timezone.clone()),
            format: Some(s.format.clone()),
        }
    }
}

/// Returns `true` when `name` was supplied explicitly on the command line
/// (not via default value or environment variable).
fn is_arg_explicitly_set(matches: &clap::ArgMatches, name: &str) -> bool {
    matches.value_source(name) == Some(clap::parser::ValueSource::CommandLine)
}

// ── Tests ──────────────────────────────────────────────────────────────────────
