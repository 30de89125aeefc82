//! Message classification and normalization.
//!
//! Turns the export's heterogeneous message records into
//! [`ClassifiedMessage`]s and builds the participant registry in one pass.

use std::collections::HashSet;

use stats_core::data_processors::{TextMetrics, TimestampProcessor};
use stats_core::error::{Result, StatsError};
use stats_core::models::{
    ClassifiedMessage, ContentCategory, NormalizedChat, Participant, RawMessage, SkippedRecord,
};
use tracing::{debug, warn};

// ── Classification rules ──────────────────────────────────────────────────────

type Predicate = fn(&RawMessage) -> bool;

/// Classification precedence: the first matching predicate decides.
pub const RULES: [(Predicate, ContentCategory); 14] = [
    (is_sticker, ContentCategory::Sticker),
    (is_animation, ContentCategory::Gif),
    (is_video_message, ContentCategory::VideoMessage),
    (is_voice_message, ContentCategory::VoiceMessage),
    (is_phone_call, ContentCategory::PhoneCall),
    (is_pin_message, ContentCategory::PinMessage),
    (has_contact, ContentCategory::Contact),
    (has_location, ContentCategory::Location),
    (is_omitted_photo, ContentCategory::Image),
    (has_image_mime, ContentCategory::Image),
    (has_video_mime, ContentCategory::Video),
    (has_file, ContentCategory::File),
    (RawMessage::has_link, ContentCategory::Link),
    (RawMessage::has_text, ContentCategory::Text),
];

fn media_type_is(message: &RawMessage, kind: &str) -> bool {
    message.media_type.as_deref() == Some(kind)
}

fn action_is(message: &RawMessage, kind: &str) -> bool {
    message.action.as_deref() == Some(kind)
}

fn is_sticker(message: &RawMessage) -> bool {
    media_type_is(message, "sticker")
}

fn is_animation(message: &RawMessage) -> bool {
    media_type_is(message, "animation")
}

fn is_video_message(message: &RawMessage) -> bool {
    media_type_is(message, "video_message")
}

fn is_voice_message(message: &RawMessage) -> bool {
    media_type_is(message, "voice_message")
}

fn is_phone_call(message: &RawMessage) -> bool {
    action_is(message, "phone_call")
}

fn is_pin_message(message: &RawMessage) -> bool {
    action_is(message, "pin_message")
}

fn has_contact(message: &RawMessage) -> bool {
    message
        .contact_information
        .as_ref()
        .is_some_and(|v| !v.is_null())
}

fn has_location(message: &RawMessage) -> bool {
    message
        .location_information
        .as_ref()
        .is_some_and(|v| !v.is_null())
}

/// Exports made without media replace the photo path with a
/// "(File not included. ...)" notice.
fn is_omitted_photo(message: &RawMessage) -> bool {
    message
        .photo
        .as_deref()
        .is_some_and(|p| p.contains("not included"))
}

fn has_image_mime(message: &RawMessage) -> bool {
    message
        .mime_type
        .as_deref()
        .is_some_and(|m| m.starts_with("image/"))
}

fn has_video_mime(message: &RawMessage) -> bool {
    message
        .mime_type
        .as_deref()
        .is_some_and(|m| m.starts_with("video/"))
}

fn has_file(message: &RawMessage) -> bool {
    message.file.as_deref().is_some_and(|f| !f.is_empty())
}

// ── TimestampPolicy ───────────────────────────────────────────────────────────

/// What to do with a record whose `date_unixtime` cannot be parsed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum TimestampPolicy {
    /// Fail the whole normalization.
    #[default]
    Abort,
    /// Drop the record and report it in [`NormalizedChat::skipped`].
    Skip,
}

// ── MessageClassifier ─────────────────────────────────────────────────────────

/// Stateless classifier/normalizer.
pub struct MessageClassifier;

impl MessageClassifier {
    /// Assign exactly one content category to `message`.
    pub fn classify(message: &RawMessage) -> ContentCategory {
        RULES
            .iter()
            .find(|(rule, _)| rule(message))
            .map(|(_, category)| *category)
            .unwrap_or(ContentCategory::Unknown)
    }

    /// Normalize the export's message list.
    ///
    /// Output order equals input order. The first display name seen for a
    /// sender id is kept for the whole run. First/last timestamps are the
    /// running min/max, so the input need not be sorted.
    pub fn normalize(raw: &[RawMessage], policy: TimestampPolicy) -> Result<NormalizedChat> {
        if raw.is_empty() {
            return Err(StatsError::EmptyExport);
        }

        let mut participants: Vec<Participant> = Vec::new();
        let mut seen: HashSet<&str> = HashSet::new();
        let mut messages: Vec<ClassifiedMessage> = Vec::with_capacity(raw.len());
        let mut skipped: Vec<SkippedRecord> = Vec::new();
        let mut first = i64::MAX;
        let mut last = i64::MIN;

        for (index, message) in raw.iter().enumerate() {
            let Some(timestamp) = TimestampProcessor::parse_unix_seconds(&message.date_unixtime)
            else {
                match policy {
                    TimestampPolicy::Abort => {
                        return Err(StatsError::TimestampParse {
                            index,
                            value: message.date_unixtime.clone(),
                        });
                    }
                    TimestampPolicy::Skip => {
                        warn!(
                            "Skipping message #{}: invalid timestamp {:?}",
                            index, message.date_unixtime
                        );
                        skipped.push(SkippedRecord {
                            index,
                            reason: format!("invalid timestamp {:?}", message.date_unixtime),
                        });
                        continue;
                    }
                }
            };

            first = first.min(timestamp);
            last = last.max(timestamp);

            if seen.insert(message.from_id.as_str()) {
                participants.push(Participant {
                    id: message.from_id.clone(),
                    name: message
                        .from
                        .clone()
                        .filter(|n| !n.is_empty())
                        .unwrap_or_else(|| message.from_id.clone()),
                });
            }

            messages.push(ClassifiedMessage {
                date: message.date.clone(),
                date_unixtime: message.date_unixtime.clone(),
                from: message.from_id.clone(),
                category: Self::classify(message),
                character_count: TextMetrics::character_count(message.text.as_ref()),
                word_count: TextMetrics::word_count(message.text.as_ref()),
            });
        }

        if messages.is_empty() {
            return Err(StatsError::NoValidMessages);
        }

        debug!(
            "Normalized {} messages from {} participants ({} skipped)",
            messages.len(),
            participants.len(),
            skipped.len()
        );

        Ok(NormalizedChat {
            participants,
            messages,
            total_span_ms: last - first,
            first_message_timestamp: first,
            last_message_timestamp: last,
            skipped,
        })
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
