use serde::{Deserialize, Serialize};

use super::{contains_folded, creation_order, Record};
use crate::db::EntityStore;
use crate::models::*;

/// Free-text search across entity kinds.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SearchQuery {
    pub text: String,
    /// Kinds to search. Empty means all kinds.
    #[serde(default)]
    pub kinds: Vec<EntityKind>,
}

impl SearchQuery {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            kinds: Vec::new(),
        }
    }

    pub fn in_kinds(mut self, kinds: impl IntoIterator<Item = EntityKind>) -> Self {
        self.kinds = kinds.into_iter().collect();
        self
    }

    fn includes(&self, kind: EntityKind) -> bool {
        self.kinds.is_empty() || self.kinds.contains(&kind)
    }
}

/// One search result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "entity", rename_all = "snake_case")]
pub enum SearchHit {
    Project(Project),
    Task(Task),
    Member(Member),
    Document(Document),
    Risk(Risk),
    Meeting(MeetingNote),
    Research(ResearchEntry),
}

impl SearchHit {
    pub fn kind(&self) -> EntityKind {
        match self {
            Self::Project(_) => EntityKind::Project,
            Self::Task(_) => EntityKind::Task,
            Self::Member(_) => EntityKind::Member,
            Self::Document(_) => EntityKind::Document,
            Self::Risk(_) => EntityKind::Risk,
            Self::Meeting(_) => EntityKind::Meeting,
            Self::Research(_) => EntityKind::Research,
        }
    }

    pub fn id(&self) -> u64 {
        match self {
            Self::Project(p) => p.raw_id(),
            Self::Task(t) => t.raw_id(),
            Self::Member(m) => m.raw_id(),
            Self::Document(d) => d.raw_id(),
            Self::Risk(r) => r.raw_id(),
            Self::Meeting(m) => m.raw_id(),
            Self::Research(r) => r.raw_id(),
        }
    }

    pub fn label(&self) -> &str {
        match self {
            Self::Project(p) => p.label(),
            Self::Task(t) => t.label(),
            Self::Member(m) => m.label(),
            Self::Document(d) => d.label(),
            Self::Risk(r) => r.label(),
            Self::Meeting(m) => m.label(),
            Self::Research(r) => r.label(),
        }
    }
}

/// Case-insensitive substring search over the textual fields of each entity.
///
/// Baselines are frozen copies of tasks and are never returned.
///
/// Matching uses the text as given, surrounding spaces included. Text that is
/// blank after trimming returns every entity of the selected kinds. Results are grouped
/// by kind (projects, tasks, members, documents, risks, meeting notes, research)
/// and in creation order within a kind.
pub fn search(store: &EntityStore, query: &SearchQuery) -> Vec<SearchHit> {
    let needle = if query.text.trim().is_empty() {
        String::new()
    } else {
        query.text.to_lowercase()
    };
    let mut hits = Vec::new();

    if query.includes(EntityKind::Project) {
        let found = collect(store.projects(), |p| {
            p.name.to_lowercase().contains(&needle)
                || contains_folded(p.description.as_deref(), &needle)
                || p
                    .charter
                    .sections()
                    .iter()
                    .any(|(_, text)| contains_folded(*text, &needle))
        });
        hits.extend(found.into_iter().map(SearchHit::Project));
    }

    if query.includes(EntityKind::Task) {
        let found = collect(store.tasks(), |t| {
            t.title.to_lowercase().contains(&needle)
                || contains_folded(t.description.as_deref(), &needle)
        });
        hits.extend(found.into_iter().map(SearchHit::Task));
    }

    if query.includes(EntityKind::Member) {
        let found = collect(store.members(), |m| {
            m.name.to_lowercase().contains(&needle)
                || contains_folded(m.role.as_deref(), &needle)
                || contains_folded(m.contact.as_deref(), &needle)
        });
        hits.extend(found.into_iter().map(SearchHit::Member));
    }

    if query.includes(EntityKind::Document) {
        let found = collect(store.documents(), |d| {
            d.title.to_lowercase().contains(&needle)
                || contains_folded(d.description.as_deref(), &needle)
                || contains_folded(d.category.as_deref(), &needle)
                || d.tags.iter().any(|t| t.to_lowercase().contains(&needle))
        });
        hits.extend(found.into_iter().map(SearchHit::Document));
    }

    if query.includes(EntityKind::Risk) {
        let found = collect(store.risks(), |r| {
            r.name.to_lowercase().contains(&needle)
                || contains_folded(r.mitigation.as_deref(), &needle)
        });
        hits.extend(found.into_iter().map(SearchHit::Risk));
    }

    if query.includes(EntityKind::Meeting) {
        let found = collect(store.meeting_notes(), |m| {
            m.title.to_lowercase().contains(&needle)
                || m.participants.iter().any(|p| p.to_lowercase().contains(&needle))
                || contains_folded(m.agenda.as_deref(), &needle)
                || contains_folded(m.discussion.as_deref(), &needle)
                || contains_folded(m.action_items.as_deref(), &needle)
        });
        hits.extend(found.into_iter().map(SearchHit::Meeting));
    }

    if query.includes(EntityKind::Research) {
        let found = collect(store.research_entries(), |r| {
            r.title.to_lowercase().contains(&needle)
                || contains_folded(r.content.as_deref(), &needle)
        });
        hits.extend(found.into_iter().map(SearchHit::Research));
    }

    hits
}

fn collect<'a, R, I, F>(records: I, matches: F) -> Vec<R>
where
    R: Record + Clone + 'a,
    I: Iterator<Item = &'a R>,
    F: Fn(&R) -> bool,
{
    let mut found: Vec<R> = records.filter(|r| matches(*r)).cloned().collect();
    found.sort_by(creation_order);
    found
}
