use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::str::FromStr;

use crate::data_processors::TimestampProcessor;
use crate::error::StatsError;

// ── Raw export ────────────────────────────────────────────────────────────────

/// Top-level document written by Telegram Desktop's "Export chat history"
/// in machine-readable JSON format.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ChatExport {
    /// Display name of the chat (the other party for personal chats).
    #[serde(default)]
    pub name: Option<String>,
    /// Chat kind, e.g. `"personal_chat"` or `"private_group"`.
    #[serde(rename = "type", default)]
    pub kind: Option<String>,
    /// Telegram chat id.
    #[serde(default)]
    pub id: Option<i64>,
    /// Messages in chronological order.
    #[serde(default)]
    pub messages: Vec<RawMessage>,
}

/// One entry of a Telegram rich-text entity list.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TextEntity {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub text: String,
}

/// A message record exactly as it appears in the export.
///
/// Every field except the sender id and timestamp is optional; which ones are
/// present depends on what kind of message it is. Service messages (calls,
/// pins) name their sender `actor`/`actor_id` instead of `from`/`from_id`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RawMessage {
    #[serde(default)]
    pub id: Option<i64>,
    /// `"message"` or `"service"`.
    #[serde(rename = "type", default)]
    pub kind: Option<String>,
    /// Local ISO date string, e.g. `"2023-04-01T12:30:00"`.
    #[serde(default)]
    pub date: String,
    /// Unix seconds as a decimal string.
    pub date_unixtime: String,
    #[serde(default, alias = "actor")]
    pub from: Option<String>,
    #[serde(alias = "actor_id")]
    pub from_id: String,
    /// Either a plain string or a list of strings and entity objects.
    #[serde(default)]
    pub text: Option<Value>,
    #[serde(default)]
    pub text_entities: Vec<TextEntity>,
    #[serde(default)]
    pub action: Option<String>,
    #[serde(default)]
    pub location_information: Option<Value>,
    #[serde(default)]
    pub contact_information: Option<Value>,
    #[serde(default)]
    pub photo: Option<String>,
    #[serde(default)]
    pub file: Option<String>,
    #[serde(default)]
    pub file_name: Option<String>,
    #[serde(default)]
    pub thumbnail: Option<String>,
    #[serde(default)]
    pub media_type: Option<String>,
    #[serde(default)]
    pub mime_type: Option<String>,
    #[serde(default)]
    pub sticker_emoji: Option<String>,
    #[serde(default)]
    pub width: Option<u32>,
    #[serde(default)]
    pub height: Option<u32>,
    #[serde(default)]
    pub duration_seconds: Option<u64>,
}

impl RawMessage {
    /// The text body when it is a plain string.
    pub fn text_str(&self) -> Option<&str> {
        self.text.as_ref().and_then(Value::as_str)
    }

    /// `true` for a non-empty plain string or a non-empty rich-text list.
    pub fn has_text(&self) -> bool {
        match &self.text {
            Some(Value::String(s)) => !s.is_empty(),
            Some(Value::Array(parts)) => !parts.is_empty(),
            _ => false,
        }
    }

    /// `true` when any text entity is a bare link.
    pub fn has_link(&self) -> bool {
        self.text_entities.iter().any(|e| e.kind == "link")
    }
}

// ── Participants ──────────────────────────────────────────────────────────────

/// A unique sender in the chat.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Participant {
    /// Sender id, e.g. `"user123456"`.
    pub id: String,
    /// First display name seen for this id.
    pub name: String,
}

// ── Categories ────────────────────────────────────────────────────────────────

/// What a message contains.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContentCategory {
    Text,
    Image,
    Video,
    Sticker,
    Gif,
    File,
    Link,
    Location,
    PhoneCall,
    PinMessage,
    Contact,
    VideoMessage,
    VoiceMessage,
    Unknown,
}

impl ContentCategory {
    pub const ALL: [ContentCategory; 14] = [
        Self::Text,
        Self::Image,
        Self::Video,
        Self::Sticker,
        Self::Gif,
        Self::File,
        Self::Link,
        Self::Location,
        Self::PhoneCall,
        Self::PinMessage,
        Self::Contact,
        Self::VideoMessage,
        Self::VoiceMessage,
        Self::Unknown,
    ];

    /// Reduce to the coarse category used for histogram series.
    pub fn display_category(self) -> DisplayCategory {
        match self {
            Self::Text | Self::Link => DisplayCategory::Text,
            Self::Image | Self::Video | Self::Gif | Self::VideoMessage => DisplayCategory::Media,
            Self::Sticker => DisplayCategory::Sticker,
            Self::File => DisplayCategory::File,
            Self::Location
            | Self::PhoneCall
            | Self::PinMessage
            | Self::Contact
            | Self::VoiceMessage
            | Self::Unknown => DisplayCategory::Other,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Text => "text",
            Self::Image => "image",
            Self::Video => "video",
            Self::Sticker => "sticker",
            Self::Gif => "gif",
            Self::File => "file",
            Self::Link => "link",
            Self::Location => "location",
            Self::PhoneCall => "phone_call",
            Self::PinMessage => "pin_message",
            Self::Contact => "contact",
            Self::VideoMessage => "video_message",
            Self::VoiceMessage => "voice_message",
            Self::Unknown => "unknown",
        }
    }
}

impl fmt::Display for ContentCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Coarse category shown as one histogram series.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DisplayCategory {
    Text,
    Media,
    Sticker,
    File,
    Other,
}

impl DisplayCategory {
    /// Series order for type-split histograms.
    pub const ALL: [DisplayCategory; 5] = [
        Self::Text,
        Self::Media,
        Self::Sticker,
        Self::File,
        Self::Other,
    ];

    pub fn label(self) -> &'static str {
        match self {
            Self::Text => "Text",
            Self::Media => "Media",
            Self::Sticker => "Sticker",
            Self::File => "File",
            Self::Other => "Other",
        }
    }

    /// Position in [`DisplayCategory::ALL`].
    pub fn index(self) -> usize {
        self as usize
    }
}

impl fmt::Display for DisplayCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

// ── Classified messages ───────────────────────────────────────────────────────

/// A message after normalization: sender, category and text metrics.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassifiedMessage {
    pub date: String,
    pub date_unixtime: String,
    /// Sender id; always present in the participant registry.
    pub from: String,
    #[serde(rename = "type")]
    pub category: ContentCategory,
    pub character_count: usize,
    pub word_count: usize,
}

impl ClassifiedMessage {
    /// Milliseconds since the epoch, `None` if `date_unixtime` is malformed.
    pub fn timestamp_ms(&self) -> Option<i64> {
        TimestampProcessor::parse_unix_seconds(&self.date_unixtime)
    }
}

/// A record dropped during normalization.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkippedRecord {
    /// Position in the raw message list.
    pub index: usize,
    /// Why it was dropped.
    pub reason: String,
}

/// Output of the classifier for one export.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NormalizedChat {
    /// Unique senders, in order of first appearance.
    pub participants: Vec<Participant>,
    /// One entry per accepted raw message, same order.
    pub messages: Vec<ClassifiedMessage>,
    pub total_span_ms: i64,
    pub first_message_timestamp: i64,
    pub last_message_timestamp: i64,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub skipped: Vec<SkippedRecord>,
}

impl NormalizedChat {
    pub fn participant(&self, id: &str) -> Option<&Participant> {
        self.participants.iter().find(|p| p.id == id)
    }
}

/// The `data` payload of a [`StatsRecord`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatData {
    #[serde(flatten)]
    pub chat: NormalizedChat,
    /// Number of classified messages.
    pub length: usize,
}

/// Record handed to persistence: caller-supplied identity plus the
/// classifier output.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatsRecord {
    pub id: String,
    pub name: String,
    /// RFC 3339 creation time.
    pub date: String,
    pub data: ChatData,
}

// ── Aggregation parameters ────────────────────────────────────────────────────

/// Time unit of a histogram window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Granularity {
    Day,
    Week,
    Month,
    Year,
}

impl Granularity {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Day => "day",
            Self::Week => "week",
            Self::Month => "month",
            Self::Year => "year",
        }
    }
}

impl fmt::Display for Granularity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Granularity {
    type Err = StatsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "day" => Ok(Self::Day),
            "week" => Ok(Self::Week),
            "month" => Ok(Self::Month),
            "year" => Ok(Self::Year),
            other => Err(StatsError::Config(format!("unknown granularity: {}", other))),
        }
    }
}

/// How histogram series are partitioned.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SplitMode {
    ByType,
    ByPerson,
}

impl SplitMode {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::ByType => "type",
            Self::ByPerson => "person",
        }
    }
}

impl fmt::Display for SplitMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SplitMode {
    type Err = StatsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "type" | "by_type" => Ok(Self::ByType),
            "person" | "by_person" => Ok(Self::ByPerson),
            other => Err(StatsError::Config(format!("unknown split mode: {}", other))),
        }
    }
}

// ── Histogram ─────────────────────────────────────────────────────────────────

/// Counts for one series key across all buckets.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Series {
    /// Display category label or participant name.
    pub key: String,
    /// One count per bucket, aligned with [`Histogram::labels`].
    pub counts: Vec<u64>,
}

impl Series {
    pub fn total(&self) -> u64 {
        self.counts.iter().sum()
    }
}

/// Bucketed message counts ready for a grouped or stacked bar chart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Histogram {
    pub labels: Vec<String>,
    pub series: Vec<Series>,
}

impl Histogram {
    pub fn series(&self, key: &str) -> Option<&Series> {
        self.series.iter().find(|s| s.key == key)
    }

    /// Sum over all series for each bucket.
    pub fn bucket_totals(&self) -> Vec<u64> {
        let mut totals = vec![0u64; self.labels.len()];
        for series in &self.series {
            for (total, count) in totals.iter_mut().zip(&series.counts) {
                *total += count;
            }
        }
        totals
    }

    /// Sum over every bucket and series.
    pub fn total(&self) -> u64 {
        self.series.iter().map(Series::total).sum()
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
