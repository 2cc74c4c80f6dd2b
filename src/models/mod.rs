//! Domain models for ProjectDesk.
//!
//! # Entities
//!
//! - [`Project`]: Top-level container. Owns its tasks and documents and keeps a
//!   set of participating members.
//! - [`Task`]: Unit of work that always belongs to exactly one project and may be
//!   assigned to one member. Tasks can depend on other tasks of the same project.
//! - [`Member`]: A person on the team. Its project set mirrors the member sets
//!   of the projects it participates in.
//! - [`Document`]: A file registered against a project.
//! - [`Risk`]: An entry of a project's risk register, scored by probability
//!   and impact.
//! - [`MeetingNote`]: Minutes of a project meeting.
//! - [`ResearchEntry`]: A dated research log entry.
//! - [`Baseline`]: A frozen copy of a project's tasks to compare the live
//!   schedule against.
//!
//! Risks, meeting notes, research entries and baselines belong to one project
//! and are deleted with it.
//!
//! Every entity carries a typed identifier allocated from [`IdCounters`] and a
//! pair of `created_at`/`updated_at` timestamps.

mod baseline;
mod document;
mod ids;
mod meeting;
mod member;
mod project;
mod research;
mod risk;
mod task;

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Local, NaiveDate, Utc};
use serde::{Deserialize, Deserializer, Serialize};

pub use baseline::*;
pub use document::*;
pub use ids::*;
pub use meeting::*;
pub use member::*;
pub use project::*;
pub use research::*;
pub use risk::*;
pub use task::*;

/// The kinds of entity held by the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    Project,
    Task,
    Member,
    Document,
    Risk,
    Meeting,
    Research,
    Baseline,
}

impl EntityKind {
    pub const ALL: [EntityKind; 8] = [
        Self::Project,
        Self::Task,
        Self::Member,
        Self::Document,
        Self::Risk,
        Self::Meeting,
        Self::Research,
        Self::Baseline,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Project => "project",
            Self::Task => "task",
            Self::Member => "member",
            Self::Document => "document",
            Self::Risk => "risk",
            Self::Meeting => "meeting",
            Self::Research => "research",
            Self::Baseline => "baseline",
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EntityKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "project" => Ok(Self::Project),
            "task" => Ok(Self::Task),
            "member" => Ok(Self::Member),
            "document" => Ok(Self::Document),
            "risk" => Ok(Self::Risk),
            "meeting" => Ok(Self::Meeting),
            "research" => Ok(Self::Research),
            "baseline" => Ok(Self::Baseline),
            other => Err(format!("unknown entity kind `{other}`")),
        }
    }
}

/// Priority shared by projects and tasks, ordered from least to most urgent.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    Low,
    #[default]
    Medium,
    High,
    Critical,
}

impl Priority {
    pub const ALL: [Priority; 4] = [
        Self::Low,
        Self::Medium,
        Self::High,
        Self::Critical,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
            Self::Critical => "critical",
        }
    }
}

impl FromStr for Priority {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "low" => Ok(Self::Low),
            "medium" => Ok(Self::Medium),
            "high" => Ok(Self::High),
            "critical" => Ok(Self::Critical),
            other => Err(format!("unknown priority `{other}`")),
        }
    }
}

/// Inclusive calendar date range. An open end matches everything on that side.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
}

impl DateRange {
    pub fn new(from: Option<NaiveDate>, to: Option<NaiveDate>) -> Self {
        Self { from, to }
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.from.map_or(true, |from| date >= from) && self.to.map_or(true, |to| date <= to)
    }

    /// Match a timestamp by its calendar date in the local time zone.
    pub fn contains_timestamp(&self, at: DateTime<Utc>) -> bool {
        self.contains(at.with_timezone(&Local).date_naive())
    }
}

/// Required text must contain something besides whitespace.
pub(crate) fn is_blank(text: &str) -> bool {
    text.trim().is_empty()
}

/// Money amounts are finite and never negative.
pub(crate) fn is_valid_amount(value: f64) -> bool {
    value.is_finite() && value >= 0.0
}

/// Advance a last-modified timestamp to `now`, never moving it backwards.
pub(crate) fn touch(updated_at: &mut DateTime<Utc>, now: DateTime<Utc>) {
    if now > *updated_at {
        *updated_at = now;
    }
}

/// Deserialize a field that distinguishes "absent" from "explicitly null".
///
/// Used with `#[serde(default)]` on `Option<Option<T>>` update fields: a missing
/// key stays `None` (leave untouched), `null` becomes `Some(None)` (clear).
pub(crate) fn double_option<'de, T, D>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    T: Deserialize<'de>,
    D: Deserializer<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn date_range_is_inclusive_on_both_ends() {
        let range = DateRange::new(Some(date(2024, 1, 1)), Some(date(2024, 1, 31)));
        assert!(range.contains(date(2024, 1, 1)));
        assert!(range.contains(date(2024, 1, 31)));
        assert!(!range.contains(date(2024, 2, 1)));
        assert!(!range.contains(date(2023, 12, 31)));
    }

    #[test]
    fn open_date_range_matches_everything() {
        assert!(DateRange::default().contains(date(1999, 6, 15)));
    }

    #[test]
    fn timestamps_match_by_local_calendar_date() {
        let at = Utc::now();
        let local_day = at.with_timezone(&Local).date_naive();
        assert!(DateRange::new(Some(local_day), Some(local_day)).contains_timestamp(at));

        let next_day = local_day.succ_opt().unwrap();
        assert!(!DateRange::new(Some(next_day), None).contains_timestamp(at));
    }

    #[test]
    fn touch_never_moves_backwards() {
        let later = Utc::now();
        let earlier = later - chrono::Duration::seconds(30);
        let mut stamp = later;
        touch(&mut stamp, earlier);
        assert_eq!(stamp, later);
    }

    #[test]
    fn entity_kinds_round_trip_through_their_string_form() {
        for kind in EntityKind::ALL {
            assert_eq!(kind.as_str().parse::<EntityKind>().unwrap(), kind);
        }
    }

    #[test]
    fn amounts_reject_negative_and_non_finite_values() {
        assert!(is_valid_amount(0.0));
        assert!(!is_valid_amount(-0.01));
        assert!(!is_valid_amount(f64::NAN));
    }

    #[test]
    fn priorities_order_by_urgency() {
        assert!(Priority::Low < Priority::Medium);
        assert!(Priority::High < Priority::Critical);
        assert_eq!("critical".parse::<Priority>().unwrap(), Priority::Critical);
    }
}
