//! Main analysis pipeline for Telegram chat exports.
//!
//! Orchestrates loading, validation and normalization, returning a
//! [`ChatAnalysis`] ready for aggregation and output.

use std::path::Path;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use stats_core::data_processors::TimestampProcessor;
use stats_core::error::{Result, StatsError};
use stats_core::models::{ChatData, DisplayCategory, NormalizedChat, StatsRecord};
use tracing::{info, warn};

use crate::classifier::{MessageClassifier, TimestampPolicy};
use crate::reader::{load_export, validate_export};

// ── Public types ──────────────────────────────────────────────────────────────

/// Metadata produced alongside the analysis result.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisMetadata {
    /// RFC 3339 timestamp when this result was generated.
    pub generated_at: String,
    /// Number of raw messages in the export.
    pub messages_processed: usize,
    /// Number of raw messages dropped under [`TimestampPolicy::Skip`].
    pub messages_skipped: usize,
    /// Number of unique senders.
    pub participants: usize,
    /// Wall-clock seconds spent reading and parsing the export.
    pub load_time_seconds: f64,
    /// Wall-clock seconds spent classifying messages.
    pub normalize_time_seconds: f64,
}

/// The complete output of [`analyze_export`].
#[derive(Debug, Clone)]
pub struct ChatAnalysis {
    /// Chat name from the export header.
    pub name: String,
    /// Chat id from the export header.
    pub chat_id: i64,
    pub chat: NormalizedChat,
    pub metadata: AnalysisMetadata,
}

/// Per-sender totals over the whole history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParticipantSummary {
    pub id: String,
    pub name: String,
    pub messages: u64,
    pub characters: u64,
    pub words: u64,
}

/// Whole-history overview of a chat.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatSummary {
    pub name: String,
    pub total_messages: usize,
    pub total_span_ms: i64,
    pub first_message: Option<DateTime<Utc>>,
    pub last_message: Option<DateTime<Utc>>,
    pub participants: Vec<ParticipantSummary>,
    /// Message count per display category, in [`DisplayCategory::ALL`] order.
    pub categories: Vec<(DisplayCategory, u64)>,
}

impl ChatAnalysis {
    pub fn first_message(&self) -> Option<DateTime<Utc>> {
        TimestampProcessor::to_datetime(self.chat.first_message_timestamp)
    }

    pub fn last_message(&self) -> Option<DateTime<Utc>> {
        TimestampProcessor::to_datetime(self.chat.last_message_timestamp)
    }

    /// Totals per participant and per display category.
    pub fn summary(&self) -> ChatSummary {
        let mut participants: Vec<ParticipantSummary> = self
            .chat
            .participants
            .iter()
            .map(|p| ParticipantSummary {
                id: p.id.clone(),
                name: p.name.clone(),
                messages: 0,
                characters: 0,
                words: 0,
            })
            .collect();
        let mut categories = [0u64; 5];

        for message in &self.chat.messages {
            categories[message.category.display_category().index()] += 1;
            if let Some(summary) = participants.iter_mut().find(|p| p.id == message.from) {
                summary.messages += 1;
                summary.characters += message.character_count as u64;
                summary.words += message.word_count as u64;
            }
        }

        ChatSummary {
            name: self.name.clone(),
            total_messages: self.chat.messages.len(),
            total_span_ms: self.chat.total_span_ms,
            first_message: self.first_message(),
            last_message: self.last_message(),
            participants,
            categories: DisplayCategory::ALL.into_iter().zip(categories).collect(),
        }
    }

    /// Build the persistence hand-off record. `id` and `date` are supplied by
    /// the caller.
    pub fn into_record(self, id: String, date: DateTime<Utc>) -> StatsRecord {
        let length = self.chat.messages.len();
        StatsRecord {
            id,
            name: self.name,
            date: date.to_rfc3339(),
            data: ChatData {
                chat: self.chat,
                length,
            },
        }
    }
}

// ── Public function ───────────────────────────────────────────────────────────

/// Run the full analysis pipeline.
///
/// 1. Load and parse the export at `path`.
/// 2. Validate the header (personal chat, name, id, non-empty messages).
/// 3. Classify and normalize every message under `policy`.
/// 4. Return a [`ChatAnalysis`].
pub fn analyze_export(path: &Path, policy: TimestampPolicy) -> Result<ChatAnalysis> {
    // ── Step 1: Load ──────────────────────────────────────────────────────────
    let load_start = std::time::Instant::now();
    let export = load_export(path)?;
    let load_time = load_start.elapsed().as_secs_f64();

    // ── Step 2: Validate ──────────────────────────────────────────────────────
    validate_export(&export)?;
    let name = export.name.clone().ok_or(StatsError::MissingField("name"))?;
    let chat_id = export.id.ok_or(StatsError::MissingField("id"))?;

    // ── Step 3: Normalize ─────────────────────────────────────────────────────
    let normalize_start = std::time::Instant::now();
    let chat = MessageClassifier::normalize(&export.messages, policy)?;
    let normalize_time = normalize_start.elapsed().as_secs_f64();

    if !chat.skipped.is_empty() {
        warn!(
            "Skipped {} of {} messages with unreadable timestamps",
            chat.skipped.len(),
            export.messages.len()
        );
    }

    // ── Step 4: Build result ──────────────────────────────────────────────────
    let metadata = AnalysisMetadata {
        generated_at: Utc::now().to_rfc3339(),
        messages_processed: export.messages.len(),
        messages_skipped: chat.skipped.len(),
        participants: chat.participants.len(),
        load_time_seconds: load_time,
        normalize_time_seconds: normalize_time,
    };

    info!(
        "Analyzed '{}': {} messages, {} participants",
        name,
        chat.messages.len(),
        chat.participants.len()
    );

    Ok(ChatAnalysis {
        name,
        chat_id,
        chat,
        metadata,
    })
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use tempfile::TempDir;

    fn write_export(dir: &Path, messages: serde_json::Value) -> std::path::PathBuf {
        let path = dir.join("result.json");
        let content = serde_json::json!({
            "name": "Alice",
            "type": "personal_chat",
            "id": 4242,
            "messages": messages,
        });
        std::fs::write(&path, content.to_string()).unwrap();
        path
    }

    fn sample_messages() -> serde_json::Value {
        serde_json::json!([
            {
                "id": 1, "type": "message", "date": "2024-01-01T10:00:00",
                "date_unixtime": "1704103200", "from": "Alice", "from_id": "user1",
                "text": "hello there", "text_entities": []
            },
            {
                "id": 2, "type": "message", "date": "2024-01-01T10:05:00",
                "date_unixtime": "1704103500", "from": "Bob", "from_id": "user2",
                "text": "", "media_type": "sticker", "sticker_emoji": "👍"
            },
            {
                "id": 3, "type": "message", "date": "2024-01-02T09:00:00",
                "date_unixtime": "1704186000", "from": "Alice", "from_id": "user1",
                "text": "",
                "photo": "(File not included. Change data exporting settings to download.)",
                "width": 800, "height": 600
            }
        ])
    }

    // ── analyze_export ────────────────────────────────────────────────────────

    #[test]
    fn test_analyze_export_basic_pipeline() {
        let dir = TempDir::new().unwrap();
        let path = write_export(dir.path(), sample_messages());

        let analysis = analyze_export(&path, TimestampPolicy::Abort).unwrap();

        assert_eq!(analysis.name, "Alice");
        assert_eq!(analysis.chat_id, 4242);
        assert_eq!(analysis.chat.messages.len(), 3);
        assert_eq!(analysis.chat.participants.len(), 2);
        assert_eq!(analysis.chat.total_span_ms, (1704186000 - 1704103200) * 1000);
    }

    #[test]
    fn test_analyze_export_metadata_fields_populated() {
        let dir = TempDir::new().unwrap();
        let path = write_export(dir.path(), sample_messages());

        let analysis = analyze_export(&path, TimestampPolicy::Abort).unwrap();

        assert!(!analysis.metadata.generated_at.is_empty());
        assert!(analysis.metadata.load_time_seconds >= 0.0);
        assert!(analysis.metadata.normalize_time_seconds >= 0.0);
        assert_eq!(analysis.metadata.messages_processed, 3);
        assert_eq!(analysis.metadata.messages_skipped, 0);
        assert_eq!(analysis.metadata.participants, 2);
    }

    #[test]
    fn test_analyze_export_rejects_empty_chat() {
        let dir = TempDir::new().unwrap();
        let path = write_export(dir.path(), serde_json::json!([]));
        assert!(matches!(
            analyze_export(&path, TimestampPolicy::Abort),
            Err(StatsError::EmptyExport)
        ));
    }

    #[test]
    fn test_analyze_export_timestamp_policy() {
        let dir = TempDir::new().unwrap();
        let mut messages = sample_messages();
        messages[1]["date_unixtime"] = serde_json::json!("not-a-number");
        let path = write_export(dir.path(), messages);

        assert!(matches!(
            analyze_export(&path, TimestampPolicy::Abort),
            Err(StatsError::TimestampParse { index: 1, .. })
        ));

        let analysis = analyze_export(&path, TimestampPolicy::Skip).unwrap();
        assert_eq!(analysis.chat.messages.len(), 2);
        assert_eq!(analysis.metadata.messages_processed, 3);
        assert_eq!(analysis.metadata.messages_skipped, 1);
        assert_eq!(analysis.metadata.participants, 1);
    }

    // ── summary ───────────────────────────────────────────────────────────────

    #[test]
    fn test_summary_totals() {
        let dir = TempDir::new().unwrap();
        let path = write_export(dir.path(), sample_messages());
        let summary = analyze_export(&path, TimestampPolicy::Abort)
            .unwrap()
            .summary();

        assert_eq!(summary.total_messages, 3);
        assert_eq!(
            summary.first_message,
            Some(Utc.with_ymd_and_hms(2024, 1, 1, 10, 0, 0).unwrap())
        );

        let alice = &summary.participants[0];
        assert_eq!(alice.id, "user1");
        assert_eq!(alice.messages, 2);
        assert_eq!(alice.characters, 11);
        assert_eq!(alice.words, 2);
        assert_eq!(summary.participants[1].messages, 1);

        let counts: Vec<u64> = summary.categories.iter().map(|(_, n)| *n).collect();
        assert_eq!(counts, vec![1, 1, 1, 0, 0]);
        assert_eq!(summary.categories[0].0, DisplayCategory::Text);
    }

    // ── into_record ───────────────────────────────────────────────────────────

    #[test]
    fn test_into_record_embeds_chat_and_length() {
        let dir = TempDir::new().unwrap();
        let path = write_export(dir.path(), sample_messages());
        let analysis = analyze_export(&path, TimestampPolicy::Abort).unwrap();
        let date = Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap();

        let record = analysis.into_record("abc123".to_string(), date);
        assert_eq!(record.id, "abc123");
        assert_eq!(record.name, "Alice");
        assert_eq!(record.data.length, 3);

        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["data"]["length"], 3);
        assert_eq!(json["data"]["messages"][1]["type"], "sticker");
        assert_eq!(json["data"]["participants"][1]["id"], "user2");
        assert!(json["data"]["totalSpanMs"].is_i64());
        assert_eq!(json["date"], "2024-05-01T12:00:00+00:00");
    }
}
