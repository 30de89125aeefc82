//! Telegram export discovery, loading and validation.
//!
//! Telegram Desktop writes each chat export as
//! `ChatExport_<date>/result.json`. This module finds those files, parses them
//! into [`ChatExport`] and rejects shapes the classifier cannot handle.

use std::path::{Path, PathBuf};

use stats_core::error::{Result, StatsError};
use stats_core::models::ChatExport;
use tracing::{debug, warn};

/// Chat kind accepted by the pipeline.
pub const PERSONAL_CHAT: &str = "personal_chat";

/// File name Telegram Desktop gives to JSON exports.
pub const EXPORT_FILE_NAME: &str = "result.json";

// ── Public API ────────────────────────────────────────────────────────────────

/// Find all `result.json` files recursively under `dir`, sorted by path.
pub fn find_exports(dir: &Path) -> Vec<PathBuf> {
    if !dir.exists() {
        warn!("Export path does not exist: {}", dir.display());
        return Vec::new();
    }

    let mut files: Vec<PathBuf> = walkdir::WalkDir::new(dir)
        .follow_links(true)
        .into_iter()
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_type().is_file() && entry.file_name() == EXPORT_FILE_NAME)
        .map(|entry| entry.into_path())
        .collect();

    files.sort();
    files
}

/// Turn a user-supplied path into a single export file.
///
/// Files are returned unchanged. For directories the last export in path
/// order is chosen, which for `ChatExport_<date>` folders is the newest one.
pub fn resolve_export_path(path: &Path) -> Result<PathBuf> {
    if path.is_file() {
        return Ok(path.to_path_buf());
    }

    let exports = find_exports(path);
    debug!("Found {} exports under {}", exports.len(), path.display());
    exports
        .into_iter()
        .last()
        .ok_or_else(|| StatsError::NoExportFound(path.to_path_buf()))
}

/// Read and parse an export file.
pub fn load_export(path: &Path) -> Result<ChatExport> {
    let content = std::fs::read_to_string(path).map_err(|source| StatsError::FileRead {
        path: path.to_path_buf(),
        source,
    })?;
    let export: ChatExport = serde_json::from_str(&content)?;
    debug!(
        "Loaded export {} with {} messages",
        path.display(),
        export.messages.len()
    );
    Ok(export)
}

/// Check that `export` is a non-empty personal chat with the required
/// top-level fields.
pub fn validate_export(export: &ChatExport) -> Result<()> {
    match export.kind.as_deref() {
        None | Some("") => return Err(StatsError::MissingField("type")),
        Some(PERSONAL_CHAT) => {}
        Some(other) => return Err(StatsError::UnsupportedChatType(other.to_string())),
    }
    if export.name.as_deref().map_or(true, str::is_empty) {
        return Err(StatsError::MissingField("name"));
    }
    if export.id.is_none() {
        return Err(StatsError::MissingField("id"));
    }
    if export.messages.is_empty() {
        return Err(StatsError::EmptyExport);
    }
    Ok(())
}

// ── Tests ─────────────────────────────────────────────────────────────────────
