use std::fs::OpenOptions;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use stats_data::reader::{find_exports, EXPORT_FILE_NAME};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Name of the per-user state directory under `$HOME`.
pub const APP_DIR: &str = ".telegram-stats";

// ── Directory bootstrap ────────────────────────────────────────────────────────

/// Ensure the standard `~/.telegram-stats/` directory hierarchy exists.
///
/// Creates the following directories if absent (including any missing parents):
/// - `~/.telegram-stats/`
/// - `~/.telegram-stats/logs/`
/// - `~/.telegram-stats/cache/`
pub fn ensure_directories() -> anyhow::Result<PathBuf> {
    let home = dirs::home_dir().unwrap_or_else(|| PathBuf::from("."));
    ensure_directories_in(&home)
}

/// [`ensure_directories`] rooted at `home`.
pub fn ensure_directories_in(home: &Path) -> anyhow::Result<PathBuf> {
    let app_dir = home.join(APP_DIR);
    std::fs::create_dir_all(&app_dir)?;
    std::fs::create_dir_all(app_dir.join("logs"))?;
    std::fs::create_dir_all(app_dir.join("cache"))?;
    Ok(app_dir)
}

// ── Logging bootstrap ──────────────────────────────────────────────────────────

/// Map a `--log-level` value to an [`EnvFilter`] directive.
///
/// Unknown strings are passed through so `RUST_LOG`-style directives work.
pub fn level_directive(log_level: &str) -> String {
    match log_level.to_uppercase().as_str() {
        "DEBUG" | "CRITICAL" => "debug".to_string(),
        "INFO" => "info".to_string(),
        "WARNING" | "WARN" => "warn".to_string(),
        "ERROR" => "error".to_string(),
        _ => log_level.to_string(),
    }
}

/// Initialise the global `tracing` subscriber.
///
/// Output goes to stderr. When `log_file` is given, events are also appended
/// to that file without ANSI colours.
pub fn setup_logging(log_level: &str, log_file: Option<&PathBuf>) -> anyhow::Result<()> {
    let filter =
        EnvFilter::try_new(level_directive(log_level)).unwrap_or_else(|_| EnvFilter::new("info"));

    let stderr_layer = fmt::layer()
        .with_target(false)
        .with_thread_ids(false)
        .with_writer(std::io::stderr);

    let file_layer = match log_file {
        Some(path) => {
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)?;
            }
            let file = OpenOptions::new().create(true).append(true).open(path)?;
            Some(
                fmt::layer()
                    .with_target(false)
                    .with_ansi(false)
                    .with_writer(Mutex::new(file)),
            )
        }
        None => None,
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(stderr_layer)
        .with(file_layer)
        .init();

    Ok(())
}

// ── Export discovery ───────────────────────────────────────────────────────────

/// Attempt to locate a Telegram export when none was given on the command line.
///
/// Checks the following locations in order and returns the first that holds
/// an export:
/// 1. `./result.json`
/// 2. `~/Downloads/Telegram Desktop/` (searched recursively)
pub fn discover_export_path() -> Option<PathBuf> {
    let cwd = std::env::current_dir().ok()?;
    let home = dirs::home_dir()?;
    discover_export_path_in(&cwd, &home)
}

/// [`discover_export_path`] with explicit working and home directories.
pub fn discover_export_path_in(cwd: &Path, home: &Path) -> Option<PathBuf> {
    let local = cwd.join(EXPORT_FILE_NAME);
    if local.is_file() {
        return Some(local);
    }

    let downloads = home.join("Downloads").join("Telegram Desktop");
    if downloads.is_dir() && !find_exports(&downloads).is_empty() {
        return Some(downloads);
    }

    None
}

// ── Tests ──────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_ensure_directories_in() {
        let tmp = TempDir::new().expect("tempdir");

        let app_dir = ensure_directories_in(tmp.path()).expect("ensure_directories_in");

        assert_eq!(app_dir, tmp.path().join(APP_DIR));
        assert!(app_dir.is_dir(), ".telegram-stats dir must exist");
        assert!(app_dir.join("logs").is_dir(), "logs subdir must exist");
        assert!(app_dir.join("cache").is_dir(), "cache subdir must exist");
    }

    #[test]
    fn test_ensure_directories_in_is_idempotent() {
        let tmp = TempDir::new().expect("tempdir");
        ensure_directories_in(tmp.path()).expect("first");
        ensure_directories_in(tmp.path()).expect("second");
    }

    #[test]
    fn test_level_directive() {
        assert_eq!(level_directive("DEBUG"), "debug");
        assert_eq!(level_directive("CRITICAL"), "debug");
        assert_eq!(level_directive("info"), "info");
        assert_eq!(level_directive("WARNING"), "warn");
        assert_eq!(level_directive("ERROR"), "error");
        assert_eq!(level_directive("stats_data=trace"), "stats_data=trace");
    }

    #[test]
    fn test_discover_export_path_returns_none_when_absent() {
        let cwd = TempDir::new().expect("tempdir");
        let home = TempDir::new().expect("tempdir");
        assert!(discover_export_path_in(cwd.path(), home.path()).is_none());
    }

    #[test]
    fn test_discover_export_path_prefers_local_result() {
        let cwd = TempDir::new().expect("tempdir");
        let home = TempDir::new().expect("tempdir");
        let local = cwd.path().join("result.json");
        std::fs::write(&local, "{}").expect("write");

        let downloads = home.path().join("Downloads/Telegram Desktop/ChatExport_2024-01-01");
        std::fs::create_dir_all(&downloads).expect("mkdir");
        std::fs::write(downloads.join("result.json"), "{}").expect("write");

        assert_eq!(discover_export_path_in(cwd.path(), home.path()), Some(local));
    }

    #[test]
    fn test_discover_export_path_finds_downloads() {
        let cwd = TempDir::new().expect("tempdir");
        let home = TempDir::new().expect("tempdir");
        let root = home.path().join("Downloads").join("Telegram Desktop");
        let export_dir = root.join("ChatExport_2024-01-01");
        std::fs::create_dir_all(&export_dir).expect("mkdir");
        std::fs::write(export_dir.join("result.json"), "{}").expect("write");

        assert_eq!(discover_export_path_in(cwd.path(), home.path()), Some(root));
    }

    #[test]
    fn test_discover_export_path_ignores_empty_downloads() {
        let cwd = TempDir::new().expect("tempdir");
        let home = TempDir::new().expect("tempdir");
        std::fs::create_dir_all(home.path().join("Downloads").join("Telegram Desktop"))
            .expect("mkdir");

        assert!(discover_export_path_in(cwd.path(), home.path()).is_none());
    }
}
