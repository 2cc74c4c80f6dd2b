use std::collections::BTreeMap;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use super::Record;
use crate::db::EntityStore;
use crate::models::*;

/// Default length of the recent-activity feed.
pub const RECENT_ACTIVITY_LIMIT: usize = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActivityAction {
    Created,
    Updated,
}

/// One line of the recent-activity feed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActivityEntry {
    pub kind: EntityKind,
    pub id: u64,
    pub label: String,
    pub action: ActivityAction,
    pub at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntityTotals {
    pub projects: usize,
    pub tasks: usize,
    pub members: usize,
    pub documents: usize,
    pub risks: usize,
    pub meeting_notes: usize,
    pub research: usize,
    pub baselines: usize,
}

/// Aggregates shown on the dashboard.
///
/// The per-status and per-priority maps always contain every variant, with
/// zero counts where nothing matches.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DashboardStats {
    pub totals: EntityTotals,
    pub projects_by_status: BTreeMap<ProjectStatus, usize>,
    pub projects_by_priority: BTreeMap<Priority, usize>,
    pub tasks_by_status: BTreeMap<TaskStatus, usize>,
    pub tasks_by_priority: BTreeMap<Priority, usize>,
    /// Share of tasks that are done, rounded down. 0 when there are no tasks.
    pub completion_percent: u8,
    pub total_cost: f64,
    pub total_budget: f64,
    pub milestones: usize,
    pub overdue_tasks: usize,
    pub documents_by_kind: BTreeMap<DocumentKind, usize>,
    /// Sum of known document sizes.
    pub document_bytes: u64,
    pub risks_by_level: BTreeMap<RiskLevel, usize>,
    /// Highest risk score across all projects, `None` without risks.
    pub top_risk_score: Option<u16>,
    pub recent_activity: Vec<ActivityEntry>,
}

fn zeroed<K: Ord + Copy>(keys: &[K]) -> BTreeMap<K, usize> {
    keys.iter().map(|k| (*k, 0)).collect()
}

fn bump<K: Ord>(counts: &mut BTreeMap<K, usize>, key: K) {
    *counts.entry(key).or_insert(0) += 1;
}

/// Compute dashboard statistics. `today` decides which tasks are overdue.
pub fn statistics(store: &EntityStore, today: NaiveDate, activity_limit: usize) -> DashboardStats {
    let mut projects_by_status = zeroed(&ProjectStatus::ALL);
    let mut projects_by_priority = zeroed(&Priority::ALL);
    let mut total_budget = 0.0;
    let mut totals = EntityTotals::default();

    for project in store.projects() {
        totals.projects += 1;
        bump(&mut projects_by_status, project.status);
        bump(&mut projects_by_priority, project.priority);
        total_budget += project.budget;
    }

    let mut tasks_by_status = zeroed(&TaskStatus::ALL);
    let mut tasks_by_priority = zeroed(&Priority::ALL);
    let mut total_cost = 0.0;
    let mut milestones = 0;
    let mut overdue_tasks = 0;

    for task in store.tasks() {
        totals.tasks += 1;
        bump(&mut tasks_by_status, task.status);
        bump(&mut tasks_by_priority, task.priority);
        total_cost += task.cost;
        if task.is_milestone {
            milestones += 1;
        }
        if task.is_overdue(today) {
            overdue_tasks += 1;
        }
    }

    let mut documents_by_kind = zeroed(&DocumentKind::ALL);
    let mut document_bytes = 0;
    for doc in store.documents() {
        totals.documents += 1;
        bump(&mut documents_by_kind, doc.kind);
        document_bytes += doc.file.size_bytes.unwrap_or(0);
    }

    let mut risks_by_level = zeroed(&RiskLevel::ALL);
    let mut top_risk_score = None;
    for risk in store.risks() {
        totals.risks += 1;
        bump(&mut risks_by_level, risk.level());
        top_risk_score = top_risk_score.max(Some(risk.score()));
    }

    totals.members = store.members().count();
    totals.meeting_notes = store.meeting_notes().count();
    totals.research = store.research_entries().count();
    totals.baselines = store.baselines().count();

    let done = tasks_by_status[&TaskStatus::Done];
    let completion_percent = if totals.tasks == 0 {
        0
    } else {
        (done * 100 / totals.tasks) as u8
    };

    DashboardStats {
        totals,
        projects_by_status,
        projects_by_priority,
        tasks_by_status,
        tasks_by_priority,
        completion_percent,
        total_cost,
        total_budget,
        milestones,
        overdue_tasks,
        documents_by_kind,
        document_bytes,
        risks_by_level,
        top_risk_score,
        recent_activity: recent_activity(store, activity_limit),
    }
}

/// The `limit` most recently modified entities of any kind, newest first.
/// Baselines are never modified and do not appear.
pub fn recent_activity(store: &EntityStore, limit: usize) -> Vec<ActivityEntry> {
    let mut entries: Vec<ActivityEntry> = Vec::new();
    entries.extend(store.projects().map(entry));
    entries.extend(store.tasks().map(entry));
    entries.extend(store.members().map(entry));
    entries.extend(store.documents().map(entry));
    entries.extend(store.risks().map(entry));
    entries.extend(store.meeting_notes().map(entry));
    entries.extend(store.research_entries().map(entry));

    entries.sort_by(|a, b| {
        b.at.cmp(&a.at)
            .then_with(|| a.kind.cmp(&b.kind))
            .then_with(|| b.id.cmp(&a.id))
    });
    entries.truncate(limit);
    entries
}

fn entry<R: Record>(record: &R) -> ActivityEntry {
    let action = if record.updated_at() > record.created_at() {
        ActivityAction::Updated
    } else {
        ActivityAction::Created
    };
    ActivityEntry {
        kind: R::KIND,
        id: record.raw_id(),
        label: record.label().to_string(),
        action,
        at: record.updated_at(),
    }
}
