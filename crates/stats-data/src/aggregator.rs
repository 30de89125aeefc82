//! Time-windowed message histograms.
//!
//! A window is laid out first (start instant, bucket unit, labels) from the
//! anchor `end` and the granularity; messages are then dropped into buckets
//! in one scan. Series are either the five display categories or the two
//! main participants.

use chrono::{DateTime, TimeDelta, Utc};
use chrono_tz::Tz;
use stats_core::data_processors::TimestampProcessor;
use stats_core::models::{
    ClassifiedMessage, DisplayCategory, Granularity, Histogram, Participant, Series, SplitMode,
};
use stats_core::time_utils::{month_index, saturating_add, start_of_month_index};
use tracing::{debug, warn};

use crate::navigation::NavigationState;

// ── WindowLayout ──────────────────────────────────────────────────────────────

/// Width of one bucket.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BucketUnit {
    /// Fixed number of milliseconds (days, weeks).
    Fixed(TimeDelta),
    /// One calendar month in the display timezone.
    CalendarMonth,
}

/// Bucket boundaries for one aggregation call.
#[derive(Debug, Clone)]
pub struct WindowLayout {
    /// Exclusive lower bound of the window.
    pub start: DateTime<Utc>,
    /// Exclusive upper bound of the window (the anchor date).
    pub end: DateTime<Utc>,
    pub unit: BucketUnit,
    /// One label per bucket.
    pub labels: Vec<String>,
    start_month: i32,
    tz: Tz,
}

impl WindowLayout {
    /// Lay out the buckets of the window ending at `end`.
    ///
    /// | granularity | buckets | unit    |
    /// |-------------|---------|---------|
    /// | day         | 30      | 1 day   |
    /// | week        | 12      | 7 days  |
    /// | month       | 12      | month   |
    /// | year        | 36      | month   |
    ///
    /// Calendar-month windows end with the month holding `end − 1 ms`, the
    /// last instant the open window can include, and start at the first
    /// instant of the earliest month. The final month is therefore the one
    /// before `end`'s month when `end` is exactly a local month start.
    ///
    /// Window edges saturate at chrono's representable range.
    pub fn new(end: DateTime<Utc>, granularity: Granularity, tz: Tz) -> Self {
        let (count, unit, label_format) = match granularity {
            Granularity::Day => (30, BucketUnit::Fixed(TimeDelta::days(1)), "%d %b"),
            Granularity::Week => (12, BucketUnit::Fixed(TimeDelta::weeks(1)), "%d %b %Y"),
            Granularity::Month => (12, BucketUnit::CalendarMonth, "%b %Y"),
            Granularity::Year => (36, BucketUnit::CalendarMonth, "%b %Y"),
        };
        let last_instant = saturating_add(end, TimeDelta::milliseconds(-1));

        match unit {
            BucketUnit::Fixed(width) => {
                let start = saturating_add(end, -(width * count));
                // Each bucket is labelled with the day its last instant falls on.
                let labels = (1..=count)
                    .map(|i| {
                        let bucket_last = saturating_add(
                            saturating_add(start, width * i),
                            TimeDelta::milliseconds(-1),
                        );
                        bucket_last.with_timezone(&tz).format(label_format).to_string()
                    })
                    .collect();
                Self {
                    start,
                    end,
                    unit,
                    labels,
                    start_month: month_index(start, tz),
                    tz,
                }
            }
            BucketUnit::CalendarMonth => {
                let start_month = month_index(last_instant, tz) - (count - 1);
                let labels = (0..count)
                    .map(|i| {
                        start_of_month_index(start_month + i, tz)
                            .with_timezone(&tz)
                            .format(label_format)
                            .to_string()
                    })
                    .collect();
                Self {
                    start: start_of_month_index(start_month, tz),
                    end,
                    unit,
                    labels,
                    start_month,
                    tz,
                }
            }
        }
    }

    pub fn bucket_count(&self) -> usize {
        self.labels.len()
    }

    /// Whether `t` lies strictly inside the window.
    pub fn contains(&self, t: DateTime<Utc>) -> bool {
        self.start < t && t < self.end
    }

    /// Bucket for `t`, or `None` when `t` is outside the window.
    pub fn bucket_index(&self, t: DateTime<Utc>) -> Option<usize> {
        if !self.contains(t) {
            return None;
        }
        let index = match self.unit {
            BucketUnit::Fixed(width) => {
                (t - self.start).num_milliseconds() / width.num_milliseconds()
            }
            BucketUnit::CalendarMonth => i64::from(month_index(t, self.tz) - self.start_month),
        };
        usize::try_from(index)
            .ok()
            .filter(|i| *i < self.bucket_count())
    }
}

// ── PersonPair ────────────────────────────────────────────────────────────────

/// The two senders compared in a per-person histogram.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PersonPair {
    pub main: String,
    pub other: String,
}

impl PersonPair {
    /// First and second distinct sender of the full message list.
    pub fn from_messages(messages: &[ClassifiedMessage]) -> Option<Self> {
        let main = messages.first()?.from.clone();
        let other = messages.iter().find(|m| m.from != main)?.from.clone();
        Some(Self { main, other })
    }

    /// Derive the pair from `messages`, then apply caller overrides.
    ///
    /// With both overrides given the message list is not consulted.
    pub fn resolve(
        messages: &[ClassifiedMessage],
        main: Option<&str>,
        other: Option<&str>,
    ) -> Option<Self> {
        if let (Some(main), Some(other)) = (main, other) {
            return Some(Self {
                main: main.to_string(),
                other: other.to_string(),
            });
        }
        let derived = Self::from_messages(messages);
        match (main, other, derived) {
            (Some(main), None, Some(d)) => {
                // Keep the override and pick whichever derived sender differs.
                let other = if d.main == main { d.other } else { d.main };
                Some(Self {
                    main: main.to_string(),
                    other,
                })
            }
            (None, Some(other), Some(d)) => {
                let main = if d.main == other { d.other } else { d.main };
                Some(Self {
                    main,
                    other: other.to_string(),
                })
            }
            (None, None, derived) => derived,
            _ => None,
        }
    }
}

// ── WindowedAggregator ────────────────────────────────────────────────────────

/// Builds [`Histogram`]s for a navigation state.
#[derive(Debug, Clone, Copy)]
pub struct WindowedAggregator {
    tz: Tz,
}

impl WindowedAggregator {
    pub fn new(tz: Tz) -> Self {
        Self { tz }
    }

    pub fn layout(&self, end: DateTime<Utc>, granularity: Granularity) -> WindowLayout {
        WindowLayout::new(end, granularity, self.tz)
    }

    /// Count messages per bucket for the window described by `state`.
    ///
    /// `people` is only used for [`SplitMode::ByPerson`]; when it is `None`
    /// the pair is derived from `messages`. A per-person request on a chat
    /// with fewer than two senders returns the labels with no series.
    pub fn aggregate(
        &self,
        messages: &[ClassifiedMessage],
        participants: &[Participant],
        state: &NavigationState,
        people: Option<&PersonPair>,
    ) -> Histogram {
        let layout = self.layout(state.end, state.granularity);
        let buckets = layout.bucket_count();

        let series = match state.split_mode {
            SplitMode::ByType => Self::count_by_type(messages, &layout),
            SplitMode::ByPerson => {
                let derived;
                let pair = match people {
                    Some(pair) => Some(pair),
                    None => {
                        derived = PersonPair::from_messages(messages);
                        derived.as_ref()
                    }
                };
                match pair {
                    Some(pair) => Self::count_by_person(messages, participants, pair, &layout),
                    None => {
                        warn!("Per-person histogram needs two participants; returning no series");
                        Vec::new()
                    }
                }
            }
        };

        debug!(
            "Aggregated {} buckets ({}, {}) ending {}",
            buckets, state.granularity, state.split_mode, state.end
        );

        Histogram {
            labels: layout.labels,
            series,
        }
    }

    fn count_by_type(messages: &[ClassifiedMessage], layout: &WindowLayout) -> Vec<Series> {
        let mut counts = vec![vec![0u64; layout.bucket_count()]; DisplayCategory::ALL.len()];
        for (message, index) in Self::bucketed(messages, layout) {
            counts[message.category.display_category().index()][index] += 1;
        }
        DisplayCategory::ALL
            .iter()
            .zip(counts)
            .map(|(category, counts)| Series {
                key: category.label().to_string(),
                counts,
            })
            .collect()
    }

    fn count_by_person(
        messages: &[ClassifiedMessage],
        participants: &[Participant],
        pair: &PersonPair,
        layout: &WindowLayout,
    ) -> Vec<Series> {
        let mut main = vec![0u64; layout.bucket_count()];
        let mut other = vec![0u64; layout.bucket_count()];
        for (message, index) in Self::bucketed(messages, layout) {
            if message.from == pair.main {
                main[index] += 1;
            } else if message.from == pair.other {
                other[index] += 1;
            }
        }
        let mut main_key = display_name(participants, &pair.main);
        let mut other_key = display_name(participants, &pair.other);
        if main_key == other_key {
            main_key = format!("{} ({})", main_key, pair.main);
            other_key = format!("{} ({})", other_key, pair.other);
        }
        vec![
            Series {
                key: main_key,
                counts: main,
            },
            Series {
                key: other_key,
                counts: other,
            },
        ]
    }

    /// In-window messages paired with their bucket index.
    fn bucketed<'a>(
        messages: &'a [ClassifiedMessage],
        layout: &'a WindowLayout,
    ) -> impl Iterator<Item = (&'a ClassifiedMessage, usize)> + 'a {
        messages.iter().filter_map(move |message| {
            let t = message
                .timestamp_ms()
                .and_then(TimestampProcessor::to_datetime)?;
            layout.bucket_index(t).map(|index| (message, index))
        })
    }
}

fn display_name(participants: &[Participant], id: &str) -> String {
    participants
        .iter()
        .find(|p| p.id == id)
        .map(|p| p.name.clone())
        .unwrap_or_else(|| id.to_string())
}

// ── Tests ─────────────────────────────────────────────────────────────────────
