//! Moving the histogram window back and forth through a chat's history.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, TimeDelta, Utc};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use stats_core::error::StatsError;
use stats_core::models::{Granularity, SplitMode};
use stats_core::time_utils::{end_of_month, end_of_year, saturating_add, shift_months};
use tracing::debug;

/// Which way to move the window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Prev,
    Next,
}

impl Direction {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Prev => "prev",
            Self::Next => "next",
        }
    }

    fn sign(self) -> i32 {
        match self {
            Self::Prev => -1,
            Self::Next => 1,
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Direction {
    type Err = StatsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "prev" | "previous" | "back" => Ok(Self::Prev),
            "next" | "forward" => Ok(Self::Next),
            other => Err(StatsError::Config(format!(
                "Invalid direction '{other}', expected prev or next"
            ))),
        }
    }
}

/// Caller-held view state: where the window ends and how it is split.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NavigationState {
    pub end: DateTime<Utc>,
    pub granularity: Granularity,
    pub split_mode: SplitMode,
}

impl NavigationState {
    /// Start at the most recent message.
    pub fn initial(last: DateTime<Utc>, granularity: Granularity, split_mode: SplitMode) -> Self {
        Self {
            end: last,
            granularity,
            split_mode,
        }
    }

    /// Same anchor under a new granularity, re-clamped to the data range.
    pub fn with_granularity(
        self,
        granularity: Granularity,
        first: DateTime<Utc>,
        last: DateTime<Utc>,
        tz: Tz,
    ) -> Self {
        Self {
            end: clamp(self.end, granularity, first, last, tz),
            granularity,
            ..self
        }
    }

    pub fn with_split_mode(self, split_mode: SplitMode) -> Self {
        Self { split_mode, ..self }
    }

    /// Apply [`navigate`] and keep the result as the new anchor.
    pub fn step(
        self,
        direction: Direction,
        first: DateTime<Utc>,
        last: DateTime<Utc>,
        tz: Tz,
    ) -> Self {
        Self {
            end: navigate(&self, direction, first, last, tz),
            ..self
        }
    }
}

/// Shift `state.end` by one window unit and clamp it into `[first, last]`.
///
/// Moving before `first` snaps to `first` for day and week windows and to the
/// end of `first`'s month or year for calendar windows (capped at `last`).
/// Moving past `last` snaps to `last`. Never fails.
pub fn navigate(
    state: &NavigationState,
    direction: Direction,
    first: DateTime<Utc>,
    last: DateTime<Utc>,
    tz: Tz,
) -> DateTime<Utc> {
    let sign = direction.sign();
    let shifted = match state.granularity {
        Granularity::Day => saturating_add(state.end, TimeDelta::days(i64::from(sign))),
        Granularity::Week => saturating_add(state.end, TimeDelta::weeks(i64::from(sign))),
        Granularity::Month => shift_months(state.end, sign, tz),
        Granularity::Year => shift_months(state.end, sign * 12, tz),
    };
    let end = clamp(shifted, state.granularity, first, last, tz);
    debug!(
        "Navigate {} ({}): {} -> {}",
        direction, state.granularity, state.end, end
    );
    end
}

fn clamp(
    end: DateTime<Utc>,
    granularity: Granularity,
    first: DateTime<Utc>,
    last: DateTime<Utc>,
    tz: Tz,
) -> DateTime<Utc> {
    if end < first {
        let floor = match granularity {
            Granularity::Day | Granularity::Week => first,
            Granularity::Month => end_of_month(first, tz),
            Granularity::Year => end_of_year(first, tz),
        };
        floor.min(last)
    } else if end > last {
        last
    } else {
        end
    }
}
