use std::cmp::Ordering;

use serde::{Deserialize, Serialize};

use super::{contains_folded, creation_order, Record};
use crate::db::EntityStore;
use crate::models::*;

/// Field used to order filter results.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortKey {
    #[default]
    Created,
    Updated,
    /// Name or title, case-insensitive.
    Name,
    Priority,
    Status,
    /// Entities without a due date sort after those with one.
    DueDate,
}

/// An explicit ordering. Ties fall back to creation order.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Sort {
    pub key: SortKey,
    #[serde(default)]
    pub descending: bool,
}

impl Sort {
    pub fn ascending(key: SortKey) -> Self {
        Self {
            key,
            descending: false,
        }
    }

    pub fn descending(key: SortKey) -> Self {
        Self {
            key,
            descending: true,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProjectFilter {
    pub status: Option<ProjectStatus>,
    pub priority: Option<Priority>,
    /// Only projects this member participates in.
    pub member: Option<MemberId>,
    pub created: Option<DateRange>,
    pub sort: Option<Sort>,
}

impl ProjectFilter {
    pub fn matches(&self, project: &Project) -> bool {
        self.status.map_or(true, |s| project.status == s)
            && self.priority.map_or(true, |p| project.priority == p)
            && self.member.map_or(true, |m| project.members.contains(&m))
            && self
                .created
                .map_or(true, |r| r.contains_timestamp(project.created_at))
    }
}

/// Assignment criterion for task filters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AssigneeFilter {
    Unassigned,
    Member(MemberId),
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TaskFilter {
    pub status: Option<TaskStatus>,
    pub priority: Option<Priority>,
    pub project_id: Option<ProjectId>,
    pub assignee: Option<AssigneeFilter>,
    /// Due date range. Tasks without a due date never match a range.
    pub due: Option<DateRange>,
    pub milestone: Option<bool>,
    pub sort: Option<Sort>,
}

impl TaskFilter {
    pub fn matches(&self, task: &Task) -> bool {
        self.status.map_or(true, |s| task.status == s)
            && self.priority.map_or(true, |p| task.priority == p)
            && self.project_id.map_or(true, |p| task.project_id == p)
            && self.assignee.map_or(true, |a| match a {
                AssigneeFilter::Unassigned => task.assignee.is_none(),
                AssigneeFilter::Member(m) => task.assignee == Some(m),
            })
            && self
                .due
                .map_or(true, |r| task.due_date.is_some_and(|d| r.contains(d)))
            && self.milestone.map_or(true, |m| task.is_milestone == m)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MemberFilter {
    /// Only members participating in this project.
    pub project_id: Option<ProjectId>,
    /// Case-insensitive substring of the role.
    pub role: Option<String>,
    pub sort: Option<Sort>,
}

impl MemberFilter {
    pub fn matches(&self, member: &Member) -> bool {
        self.project_id
            .map_or(true, |p| member.projects.contains(&p))
            && self.role.as_deref().map_or(true, |role| {
                contains_folded(member.role.as_deref(), &role.to_lowercase())
            })
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DocumentFilter {
    pub project_id: Option<ProjectId>,
    pub kind: Option<DocumentKind>,
    /// Case-insensitive substring of the category.
    pub category: Option<String>,
    /// Case-insensitive exact tag.
    pub tag: Option<String>,
    pub uploaded: Option<DateRange>,
    pub sort: Option<Sort>,
}

impl DocumentFilter {
    pub fn matches(&self, doc: &Document) -> bool {
        self.project_id.map_or(true, |p| doc.project_id == p)
            && self.kind.map_or(true, |k| doc.kind == k)
            && self.category.as_deref().map_or(true, |c| {
                contains_folded(doc.category.as_deref(), &c.to_lowercase())
            })
            && self.tag.as_deref().map_or(true, |tag| {
                let tag = tag.trim().to_lowercase();
                doc.tags.iter().any(|t| t.to_lowercase() == tag)
            })
            && self
                .uploaded
                .map_or(true, |r| r.contains_timestamp(doc.created_at))
    }
}

pub fn filter_projects(store: &EntityStore, filter: &ProjectFilter) -> Vec<Project> {
    let mut projects: Vec<Project> = store
        .projects()
        .filter(|p| filter.matches(p))
        .cloned()
        .collect();
    sort_records(&mut projects, filter.sort);
    projects
}

pub fn filter_tasks(store: &EntityStore, filter: &TaskFilter) -> Vec<Task> {
    let mut tasks: Vec<Task> = store
        .tasks()
        .filter(|t| filter.matches(t))
        .cloned()
        .collect();
    sort_records(&mut tasks, filter.sort);
    tasks
}

pub fn filter_members(store: &EntityStore, filter: &MemberFilter) -> Vec<Member> {
    let mut members: Vec<Member> = store
        .members()
        .filter(|m| filter.matches(m))
        .cloned()
        .collect();
    sort_records(&mut members, filter.sort);
    members
}

pub fn filter_documents(store: &EntityStore, filter: &DocumentFilter) -> Vec<Document> {
    let mut documents: Vec<Document> = store
        .documents()
        .filter(|d| filter.matches(d))
        .cloned()
        .collect();
    sort_records(&mut documents, filter.sort);
    documents
}

/// Sort by the requested key (creation order when `None`).
pub fn sort_records<R: Record>(records: &mut [R], sort: Option<Sort>) {
    let sort = sort.unwrap_or_default();
    records.sort_by(|a, b| {
        let ord = compare_by(a, b, sort.key).then_with(|| creation_order(a, b));
        if sort.descending {
            ord.reverse()
        } else {
            ord
        }
    });
}

fn compare_by<R: Record>(a: &R, b: &R, key: SortKey) -> Ordering {
    match key {
        SortKey::Created => Ordering::Equal,
        SortKey::Updated => a.updated_at().cmp(&b.updated_at()),
        SortKey::Name => a.label().to_lowercase().cmp(&b.label().to_lowercase()),
        SortKey::Priority => a.priority().cmp(&b.priority()),
        SortKey::Status => a.status_rank().cmp(&b.status_rank()),
        SortKey::DueDate => {
            let a_due = a.due_date();
            let b_due = b.due_date();
            (a_due.is_none(), a_due).cmp(&(b_due.is_none(), b_due))
        }
    }
}
