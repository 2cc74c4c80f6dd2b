//! Read-side queries over the entity store.
//!
//! Everything here takes `&EntityStore` and returns owned results; nothing
//! mutates or persists.

mod filter;
mod schedule;
mod search;
mod stats;

use std::cmp::Ordering;

use chrono::{DateTime, NaiveDate, Utc};

use crate::models::*;

pub use filter::*;
pub use schedule::*;
pub use search::*;
pub use stats::*;

/// Common view of an entity used for ordering, search and activity feeds.
pub trait Record {
    const KIND: EntityKind;

    fn raw_id(&self) -> u64;
    fn label(&self) -> &str;
    fn created_at(&self) -> DateTime<Utc>;
    fn updated_at(&self) -> DateTime<Utc>;

    fn priority(&self) -> Option<Priority> {
        None
    }

    fn status_rank(&self) -> Option<u8> {
        None
    }

    fn due_date(&self) -> Option<NaiveDate> {
        None
    }
}

impl Record for Project {
    const KIND: EntityKind = EntityKind::Project;

    fn raw_id(&self) -> u64 {
        self.id.get()
    }

    fn label(&self) -> &str {
        &self.name
    }

    fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    fn priority(&self) -> Option<Priority> {
        Some(self.priority)
    }

    fn status_rank(&self) -> Option<u8> {
        Some(self.status as u8)
    }
}

impl Record for Task {
    const KIND: EntityKind = EntityKind::Task;

    fn raw_id(&self) -> u64 {
        self.id.get()
    }

    fn label(&self) -> &str {
        &self.title
    }

    fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    fn priority(&self) -> Option<Priority> {
        Some(self.priority)
    }

    fn status_rank(&self) -> Option<u8> {
        Some(self.status as u8)
    }

    fn due_date(&self) -> Option<NaiveDate> {
        self.due_date
    }
}

impl Record for Member {
    const KIND: EntityKind = EntityKind::Member;

    fn raw_id(&self) -> u64 {
        self.id.get()
    }

    fn label(&self) -> &str {
        &self.name
    }

    fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }
}

impl Record for Document {
    const KIND: EntityKind = EntityKind::Document;

    fn raw_id(&self) -> u64 {
        self.id.get()
    }

    fn label(&self) -> &str {
        &self.title
    }

    fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }
}

impl Record for Risk {
    const KIND: EntityKind = EntityKind::Risk;

    fn raw_id(&self) -> u64 {
        self.id.get()
    }

    fn label(&self) -> &str {
        &self.name
    }

    fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }
}

impl Record for MeetingNote {
    const KIND: EntityKind = EntityKind::Meeting;

    fn raw_id(&self) -> u64 {
        self.id.get()
    }

    fn label(&self) -> &str {
        &self.title
    }

    fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }
}

impl Record for ResearchEntry {
    const KIND: EntityKind = EntityKind::Research;

    fn raw_id(&self) -> u64 {
        self.id.get()
    }

    fn label(&self) -> &str {
        &self.title
    }

    fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }
}

/// Creation order: `created_at`, then id. The default order of every listing.
pub(crate) fn creation_order<R: Record>(a: &R, b: &R) -> Ordering {
    a.created_at()
        .cmp(&b.created_at())
        .then_with(|| a.raw_id().cmp(&b.raw_id()))
}

/// Case-insensitive substring match on an optional field.
pub(crate) fn contains_folded(haystack: Option<&str>, needle: &str) -> bool {
    haystack.is_some_and(|h| h.to_lowercase().contains(needle))
}
