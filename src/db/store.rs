//! In-memory entity store and its serializable snapshot.
//!
//! # Invariants
//! - Every task, document, risk, meeting note, research entry and baseline
//!   references an existing project.
//! - Task assignees and dependencies resolve; dependencies stay inside the
//!   task's project and never form a cycle.
//! - `Project::members` and `Member::projects` are mirror images.
//! - Id counters are at or beyond every id they have issued.
//! - Records obey the same field rules the repository enforces on writes:
//!   required text is present, amounts are finite and non-negative, due dates
//!   do not precede start dates, milestones have no duration and risk ratings
//!   stay on their scale.
//!
//! Reads are public so the query engine can run over a borrowed store; every
//! mutator is crate-private and only reached through [`Database`](super::Database).

use std::collections::{BTreeMap, BTreeSet, HashSet};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::models::*;

/// Version written into every dataset file. Files carrying another version are rejected.
pub const SCHEMA_VERSION: u32 = 1;

/// The durable form of the whole store: one collection per kind, ordered by id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Dataset {
    pub schema_version: u32,
    #[serde(default)]
    pub next_ids: IdCounters,
    #[serde(default)]
    pub projects: Vec<Project>,
    #[serde(default)]
    pub tasks: Vec<Task>,
    #[serde(default)]
    pub members: Vec<Member>,
    #[serde(default)]
    pub documents: Vec<Document>,
    #[serde(default)]
    pub risks: Vec<Risk>,
    #[serde(default)]
    pub meeting_notes: Vec<MeetingNote>,
    #[serde(default)]
    pub research: Vec<ResearchEntry>,
    #[serde(default)]
    pub baselines: Vec<Baseline>,
}

impl Default for Dataset {
    fn default() -> Self {
        Self {
            schema_version: SCHEMA_VERSION,
            next_ids: IdCounters::default(),
            projects: Vec::new(),
            tasks: Vec::new(),
            members: Vec::new(),
            documents: Vec::new(),
            risks: Vec::new(),
            meeting_notes: Vec::new(),
            research: Vec::new(),
            baselines: Vec::new(),
        }
    }
}

/// A broken relationship found in a decoded dataset.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IntegrityError {
    #[error("duplicate {kind} id {id}")]
    DuplicateId { kind: EntityKind, id: u64 },

    #[error("{kind} id {id} is beyond the issued counter {counter}")]
    StaleCounter {
        kind: EntityKind,
        id: u64,
        counter: u64,
    },

    #[error("{from_kind} {from_id} references missing {to_kind} {to_id}")]
    DanglingReference {
        from_kind: EntityKind,
        from_id: u64,
        to_kind: EntityKind,
        to_id: u64,
    },

    #[error("project {project} and member {member} disagree about membership")]
    AsymmetricMembership { project: ProjectId, member: MemberId },

    #[error("task {task} depends on task {dependency} outside its project")]
    ForeignDependency { task: TaskId, dependency: TaskId },

    #[error("task dependencies form a cycle through task {task}")]
    DependencyCycle { task: TaskId },

    #[error("{kind} {id} was modified before it was created")]
    TimestampOrder { kind: EntityKind, id: u64 },

    #[error("{kind} {id} has an invalid {field}: {reason}")]
    InvalidField {
        kind: EntityKind,
        id: u64,
        field: &'static str,
        reason: String,
    },
}

impl Dataset {
    /// Check every store invariant against the decoded records.
    pub fn validate(&self) -> Result<(), IntegrityError> {
        let projects = unique_ids(
            EntityKind::Project,
            self.projects.iter().map(|p| p.id.get()),
            self.next_ids.project,
        )?;
        let tasks = unique_ids(
            EntityKind::Task,
            self.tasks.iter().map(|t| t.id.get()),
            self.next_ids.task,
        )?;
        let members = unique_ids(
            EntityKind::Member,
            self.members.iter().map(|m| m.id.get()),
            self.next_ids.member,
        )?;
        unique_ids(
            EntityKind::Document,
            self.documents.iter().map(|d| d.id.get()),
            self.next_ids.document,
        )?;
        unique_ids(
            EntityKind::Risk,
            self.risks.iter().map(|r| r.id.get()),
            self.next_ids.risk,
        )?;
        unique_ids(
            EntityKind::Meeting,
            self.meeting_notes.iter().map(|m| m.id.get()),
            self.next_ids.meeting,
        )?;
        unique_ids(
            EntityKind::Research,
            self.research.iter().map(|r| r.id.get()),
            self.next_ids.research,
        )?;
        unique_ids(
            EntityKind::Baseline,
            self.baselines.iter().map(|b| b.id.get()),
            self.next_ids.baseline,
        )?;

        let task_projects: BTreeMap<TaskId, ProjectId> =
            self.tasks.iter().map(|t| (t.id, t.project_id)).collect();

        for task in &self.tasks {
            ensure_ref(
                &projects,
                EntityKind::Task,
                task.id.get(),
                EntityKind::Project,
                task.project_id.get(),
            )?;
            if let Some(member) = task.assignee {
                ensure_ref(
                    &members,
                    EntityKind::Task,
                    task.id.get(),
                    EntityKind::Member,
                    member.get(),
                )?;
            }
            for dep in &task.dependencies {
                ensure_ref(
                    &tasks,
                    EntityKind::Task,
                    task.id.get(),
                    EntityKind::Task,
                    dep.get(),
                )?;
                if *dep == task.id || task_projects.get(dep) != Some(&task.project_id) {
                    return Err(IntegrityError::ForeignDependency {
                        task: task.id,
                        dependency: *dep,
                    });
                }
            }
            check_task_fields(task)?;
            check_timestamps(
                EntityKind::Task,
                task.id.get(),
                task.created_at,
                task.updated_at,
            )?;
        }

        for doc in &self.documents {
            ensure_ref(
                &projects,
                EntityKind::Document,
                doc.id.get(),
                EntityKind::Project,
                doc.project_id.get(),
            )?;
            let rule = FieldRule::new(EntityKind::Document, doc.id.get());
            rule.require_text("title", &doc.title)?;
            rule.require_text("path", &doc.file.path)?;
            check_timestamps(
                EntityKind::Document,
                doc.id.get(),
                doc.created_at,
                doc.updated_at,
            )?;
        }

        for risk in &self.risks {
            ensure_ref(
                &projects,
                EntityKind::Risk,
                risk.id.get(),
                EntityKind::Project,
                risk.project_id.get(),
            )?;
            let rule = FieldRule::new(EntityKind::Risk, risk.id.get());
            rule.require_text("name", &risk.name)?;
            rule.check(
                RISK_SCALE.contains(&risk.probability),
                "probability",
                format!("{} is outside 1 to 10", risk.probability),
            )?;
            rule.check(
                RISK_SCALE.contains(&risk.impact),
                "impact",
                format!("{} is outside 1 to 10", risk.impact),
            )?;
            check_timestamps(
                EntityKind::Risk,
                risk.id.get(),
                risk.created_at,
                risk.updated_at,
            )?;
        }

        for note in &self.meeting_notes {
            ensure_ref(
                &projects,
                EntityKind::Meeting,
                note.id.get(),
                EntityKind::Project,
                note.project_id.get(),
            )?;
            FieldRule::new(EntityKind::Meeting, note.id.get()).require_text("title", &note.title)?;
            check_timestamps(
                EntityKind::Meeting,
                note.id.get(),
                note.created_at,
                note.updated_at,
            )?;
        }

        for entry in &self.research {
            ensure_ref(
                &projects,
                EntityKind::Research,
                entry.id.get(),
                EntityKind::Project,
                entry.project_id.get(),
            )?;
            FieldRule::new(EntityKind::Research, entry.id.get())
                .require_text("title", &entry.title)?;
            check_timestamps(
                EntityKind::Research,
                entry.id.get(),
                entry.created_at,
                entry.updated_at,
            )?;
        }

        for baseline in &self.baselines {
            ensure_ref(
                &projects,
                EntityKind::Baseline,
                baseline.id.get(),
                EntityKind::Project,
                baseline.project_id.get(),
            )?;
            let rule = FieldRule::new(EntityKind::Baseline, baseline.id.get());
            rule.check(!baseline.tasks.is_empty(), "tasks", "no tasks captured")?;
            if let Some(stray) = baseline
                .tasks
                .iter()
                .find(|t| t.project_id != baseline.project_id)
            {
                return Err(rule.violation(
                    "tasks",
                    format!("task {} belongs to project {}", stray.id, stray.project_id),
                ));
            }
        }

        let member_projects: BTreeMap<MemberId, &BTreeSet<ProjectId>> =
            self.members.iter().map(|m| (m.id, &m.projects)).collect();
        let project_members: BTreeMap<ProjectId, &BTreeSet<MemberId>> =
            self.projects.iter().map(|p| (p.id, &p.members)).collect();

        for project in &self.projects {
            for member in &project.members {
                ensure_ref(
                    &members,
                    EntityKind::Project,
                    project.id.get(),
                    EntityKind::Member,
                    member.get(),
                )?;
                if !member_projects[member].contains(&project.id) {
                    return Err(IntegrityError::AsymmetricMembership {
                        project: project.id,
                        member: *member,
                    });
                }
            }
            let rule = FieldRule::new(EntityKind::Project, project.id.get());
            rule.require_text("name", &project.name)?;
            rule.check(
                is_valid_amount(project.budget),
                "budget",
                format!("{} is not a non-negative number", project.budget),
            )?;
            check_timestamps(
                EntityKind::Project,
                project.id.get(),
                project.created_at,
                project.updated_at,
            )?;
        }

        for member in &self.members {
            for project in &member.projects {
                ensure_ref(
                    &projects,
                    EntityKind::Member,
                    member.id.get(),
                    EntityKind::Project,
                    project.get(),
                )?;
                if !project_members[project].contains(&member.id) {
                    return Err(IntegrityError::AsymmetricMembership {
                        project: *project,
                        member: member.id,
                    });
                }
            }
            FieldRule::new(EntityKind::Member, member.id.get()).require_text("name", &member.name)?;
            check_timestamps(
                EntityKind::Member,
                member.id.get(),
                member.created_at,
                member.updated_at,
            )?;
        }

        let graph: BTreeMap<TaskId, &BTreeSet<TaskId>> =
            self.tasks.iter().map(|t| (t.id, &t.dependencies)).collect();
        if let Some(task) = find_cycle(&graph) {
            return Err(IntegrityError::DependencyCycle { task });
        }

        Ok(())
    }
}

fn unique_ids(
    kind: EntityKind,
    ids: impl Iterator<Item = u64>,
    counter: u64,
) -> Result<HashSet<u64>, IntegrityError> {
    let mut seen = HashSet::new();
    for id in ids {
        if !seen.insert(id) {
            return Err(IntegrityError::DuplicateId { kind, id });
        }
        if id > counter {
            return Err(IntegrityError::StaleCounter { kind, id, counter });
        }
    }
    Ok(seen)
}

fn ensure_ref(
    known: &HashSet<u64>,
    from_kind: EntityKind,
    from_id: u64,
    to_kind: EntityKind,
    to_id: u64,
) -> Result<(), IntegrityError> {
    if known.contains(&to_id) {
        Ok(())
    } else {
        Err(IntegrityError::DanglingReference {
            from_kind,
            from_id,
            to_kind,
            to_id,
        })
    }
}

fn check_timestamps(
    kind: EntityKind,
    id: u64,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
) -> Result<(), IntegrityError> {
    if updated_at < created_at {
        return Err(IntegrityError::TimestampOrder { kind, id });
    }
    Ok(())
}

/// Reports field-rule violations for one record.
struct FieldRule {
    kind: EntityKind,
    id: u64,
}

impl FieldRule {
    fn new(kind: EntityKind, id: u64) -> Self {
        Self { kind, id }
    }

    fn violation(&self, field: &'static str, reason: impl Into<String>) -> IntegrityError {
        IntegrityError::InvalidField {
            kind: self.kind,
            id: self.id,
            field,
            reason: reason.into(),
        }
    }

    fn check(
        &self,
        ok: bool,
        field: &'static str,
        reason: impl Into<String>,
    ) -> Result<(), IntegrityError> {
        if ok {
            Ok(())
        } else {
            Err(self.violation(field, reason))
        }
    }

    fn require_text(&self, field: &'static str, text: &str) -> Result<(), IntegrityError> {
        self.check(!is_blank(text), field, "cannot be empty")
    }
}

fn check_task_fields(task: &Task) -> Result<(), IntegrityError> {
    let rule = FieldRule::new(EntityKind::Task, task.id.get());
    rule.require_text("title", &task.title)?;
    rule.check(
        is_valid_amount(task.cost),
        "cost",
        format!("{} is not a non-negative number", task.cost),
    )?;
    rule.check(
        !task.is_milestone || task.duration_days == 0,
        "duration_days",
        format!("milestone lasts {} days", task.duration_days),
    )?;
    if let (Some(start), Some(due)) = (task.start_date, task.due_date) {
        rule.check(
            due >= start,
            "due_date",
            format!("{due} is before the start date {start}"),
        )?;
    }
    Ok(())
}

/// Return a task on a dependency cycle, if the graph has one.
fn find_cycle(graph: &BTreeMap<TaskId, &BTreeSet<TaskId>>) -> Option<TaskId> {
    #[derive(Clone, Copy, PartialEq)]
    enum Mark {
        Visiting,
        Done,
    }

    let mut marks: BTreeMap<TaskId, Mark> = BTreeMap::new();

    for &root in graph.keys() {
        if marks.contains_key(&root) {
            continue;
        }
        // Iterative DFS: (node, remaining children)
        let mut stack: Vec<(TaskId, Vec<TaskId>)> = Vec::new();
        marks.insert(root, Mark::Visiting);
        stack.push((root, graph[&root].iter().copied().collect()));

        loop {
            let Some((node, children)) = stack.last_mut() else {
                break;
            };
            let node = *node;
            match children.pop() {
                Some(child) => match marks.get(&child) {
                    Some(Mark::Visiting) => return Some(child),
                    Some(Mark::Done) => {}
                    None => {
                        marks.insert(child, Mark::Visiting);
                        let next = graph
                            .get(&child)
                            .map(|deps| deps.iter().copied().collect())
                            .unwrap_or_default();
                        stack.push((child, next));
                    }
                },
                None => {
                    marks.insert(node, Mark::Done);
                    stack.pop();
                }
            }
        }
    }

    None
}

/// What a delete touched besides the deleted entity itself.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeleteReport {
    /// Tasks removed because their project was deleted.
    pub removed_tasks: Vec<TaskId>,
    /// Documents removed because their project was deleted.
    pub removed_documents: Vec<DocumentId>,
    /// Tasks whose assignee was cleared.
    pub unassigned_tasks: Vec<TaskId>,
    /// Members that lost the deleted project from their project set.
    pub detached_members: Vec<MemberId>,
    /// Projects that lost the deleted member from their member set.
    pub detached_projects: Vec<ProjectId>,
    /// Tasks that no longer depend on a removed task.
    pub released_dependents: Vec<TaskId>,
    /// Risks removed because their project was deleted.
    pub removed_risks: Vec<RiskId>,
    /// Meeting notes removed because their project was deleted.
    pub removed_meeting_notes: Vec<MeetingId>,
    /// Research entries removed because their project was deleted.
    pub removed_research: Vec<ResearchId>,
    /// Baselines removed because their project was deleted.
    pub removed_baselines: Vec<BaselineId>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct EntityStore {
    projects: BTreeMap<ProjectId, Project>,
    tasks: BTreeMap<TaskId, Task>,
    members: BTreeMap<MemberId, Member>,
    documents: BTreeMap<DocumentId, Document>,
    risks: BTreeMap<RiskId, Risk>,
    meeting_notes: BTreeMap<MeetingId, MeetingNote>,
    research: BTreeMap<ResearchId, ResearchEntry>,
    baselines: BTreeMap<BaselineId, Baseline>,
    next_ids: IdCounters,
}

impl EntityStore {
    /// Build a store from a snapshot. The snapshot is trusted; storage
    /// backends run [`Dataset::validate`] before handing one over.
    pub fn from_dataset(dataset: Dataset) -> Self {
        Self {
            projects: dataset.projects.into_iter().map(|p| (p.id, p)).collect(),
            tasks: dataset.tasks.into_iter().map(|t| (t.id, t)).collect(),
            members: dataset.members.into_iter().map(|m| (m.id, m)).collect(),
            documents: dataset.documents.into_iter().map(|d| (d.id, d)).collect(),
            risks: dataset.risks.into_iter().map(|r| (r.id, r)).collect(),
            meeting_notes: dataset
                .meeting_notes
                .into_iter()
                .map(|m| (m.id, m))
                .collect(),
            research: dataset.research.into_iter().map(|r| (r.id, r)).collect(),
            baselines: dataset.baselines.into_iter().map(|b| (b.id, b)).collect(),
            next_ids: dataset.next_ids,
        }
    }

    /// Owned copy of the store, records ordered by id.
    pub fn snapshot(&self) -> Dataset {
        Dataset {
            schema_version: SCHEMA_VERSION,
            next_ids: self.next_ids,
            projects: self.projects.values().cloned().collect(),
            tasks: self.tasks.values().cloned().collect(),
            members: self.members.values().cloned().collect(),
            documents: self.documents.values().cloned().collect(),
            risks: self.risks.values().cloned().collect(),
            meeting_notes: self.meeting_notes.values().cloned().collect(),
            research: self.research.values().cloned().collect(),
            baselines: self.baselines.values().cloned().collect(),
        }
    }

    /// Swap in a freshly loaded dataset wholesale.
    pub fn replace(&mut self, dataset: Dataset) {
        *self = Self::from_dataset(dataset);
    }

    // ============================================================
    // Reads
    // ============================================================

    pub fn project(&self, id: ProjectId) -> Option<&Project> {
        self.projects.get(&id)
    }

    pub fn projects(&self) -> impl Iterator<Item = &Project> {
        self.projects.values()
    }

    pub fn project_exists(&self, id: ProjectId) -> bool {
        self.projects.contains_key(&id)
    }

    pub fn task(&self, id: TaskId) -> Option<&Task> {
        self.tasks.get(&id)
    }

    pub fn tasks(&self) -> impl Iterator<Item = &Task> {
        self.tasks.values()
    }

    pub fn tasks_in_project(&self, project_id: ProjectId) -> impl Iterator<Item = &Task> {
        self.tasks
            .values()
            .filter(move |t| t.project_id == project_id)
    }

    pub fn member(&self, id: MemberId) -> Option<&Member> {
        self.members.get(&id)
    }

    pub fn members(&self) -> impl Iterator<Item = &Member> {
        self.members.values()
    }

    pub fn member_exists(&self, id: MemberId) -> bool {
        self.members.contains_key(&id)
    }

    pub fn document(&self, id: DocumentId) -> Option<&Document> {
        self.documents.get(&id)
    }

    pub fn documents(&self) -> impl Iterator<Item = &Document> {
        self.documents.values()
    }

    pub fn document_exists(&self, id: DocumentId) -> bool {
        self.documents.contains_key(&id)
    }

    pub fn documents_in_project(&self, project_id: ProjectId) -> impl Iterator<Item = &Document> {
        self.documents
            .values()
            .filter(move |d| d.project_id == project_id)
    }

    pub fn risk(&self, id: RiskId) -> Option<&Risk> {
        self.risks.get(&id)
    }

    pub fn risks(&self) -> impl Iterator<Item = &Risk> {
        self.risks.values()
    }

    pub fn risks_in_project(&self, project_id: ProjectId) -> impl Iterator<Item = &Risk> {
        self.risks
            .values()
            .filter(move |r| r.project_id == project_id)
    }

    pub fn meeting_note(&self, id: MeetingId) -> Option<&MeetingNote> {
        self.meeting_notes.get(&id)
    }

    pub fn meeting_notes(&self) -> impl Iterator<Item = &MeetingNote> {
        self.meeting_notes.values()
    }

    pub fn meeting_notes_in_project(
        &self,
        project_id: ProjectId,
    ) -> impl Iterator<Item = &MeetingNote> {
        self.meeting_notes
            .values()
            .filter(move |m| m.project_id == project_id)
    }

    pub fn research_entry(&self, id: ResearchId) -> Option<&ResearchEntry> {
        self.research.get(&id)
    }

    pub fn research_entries(&self) -> impl Iterator<Item = &ResearchEntry> {
        self.research.values()
    }

    pub fn research_in_project(
        &self,
        project_id: ProjectId,
    ) -> impl Iterator<Item = &ResearchEntry> {
        self.research
            .values()
            .filter(move |r| r.project_id == project_id)
    }

    pub fn baseline(&self, id: BaselineId) -> Option<&Baseline> {
        self.baselines.get(&id)
    }

    pub fn baselines(&self) -> impl Iterator<Item = &Baseline> {
        self.baselines.values()
    }

    pub fn baselines_in_project(&self, project_id: ProjectId) -> impl Iterator<Item = &Baseline> {
        self.baselines
            .values()
            .filter(move |b| b.project_id == project_id)
    }

    /// Whether `from` reaches `target` by following dependency edges.
    pub fn depends_on(&self, from: TaskId, target: TaskId) -> bool {
        let mut seen = HashSet::new();
        let mut pending = vec![from];
        while let Some(id) = pending.pop() {
            if id == target {
                return true;
            }
            if !seen.insert(id) {
                continue;
            }
            if let Some(task) = self.tasks.get(&id) {
                pending.extend(task.dependencies.iter().copied());
            }
        }
        false
    }

    // ============================================================
    // Mutation (repository only)
    // ============================================================

    pub(crate) fn allocate_project_id(&mut self) -> ProjectId {
        self.next_ids.next_project()
    }

    pub(crate) fn allocate_task_id(&mut self) -> TaskId {
        self.next_ids.next_task()
    }

    pub(crate) fn allocate_member_id(&mut self) -> MemberId {
        self.next_ids.next_member()
    }

    pub(crate) fn allocate_document_id(&mut self) -> DocumentId {
        self.next_ids.next_document()
    }

    pub(crate) fn allocate_risk_id(&mut self) -> RiskId {
        self.next_ids.next_risk()
    }

    pub(crate) fn allocate_meeting_id(&mut self) -> MeetingId {
        self.next_ids.next_meeting()
    }

    pub(crate) fn allocate_research_id(&mut self) -> ResearchId {
        self.next_ids.next_research()
    }

    pub(crate) fn allocate_baseline_id(&mut self) -> BaselineId {
        self.next_ids.next_baseline()
    }

    pub(crate) fn insert_project(&mut self, project: Project) {
        self.projects.insert(project.id, project);
    }

    pub(crate) fn insert_task(&mut self, task: Task) {
        self.tasks.insert(task.id, task);
    }

    pub(crate) fn insert_member(&mut self, member: Member) {
        self.members.insert(member.id, member);
    }

    pub(crate) fn insert_document(&mut self, document: Document) {
        self.documents.insert(document.id, document);
    }

    pub(crate) fn insert_risk(&mut self, risk: Risk) {
        self.risks.insert(risk.id, risk);
    }

    pub(crate) fn insert_meeting_note(&mut self, note: MeetingNote) {
        self.meeting_notes.insert(note.id, note);
    }

    pub(crate) fn insert_research_entry(&mut self, entry: ResearchEntry) {
        self.research.insert(entry.id, entry);
    }

    pub(crate) fn insert_baseline(&mut self, baseline: Baseline) {
        self.baselines.insert(baseline.id, baseline);
    }

    pub(crate) fn project_mut(&mut self, id: ProjectId) -> Option<&mut Project> {
        self.projects.get_mut(&id)
    }

    pub(crate) fn task_mut(&mut self, id: TaskId) -> Option<&mut Task> {
        self.tasks.get_mut(&id)
    }

    pub(crate) fn member_mut(&mut self, id: MemberId) -> Option<&mut Member> {
        self.members.get_mut(&id)
    }

    pub(crate) fn document_mut(&mut self, id: DocumentId) -> Option<&mut Document> {
        self.documents.get_mut(&id)
    }

    pub(crate) fn risk_mut(&mut self, id: RiskId) -> Option<&mut Risk> {
        self.risks.get_mut(&id)
    }

    pub(crate) fn meeting_note_mut(&mut self, id: MeetingId) -> Option<&mut MeetingNote> {
        self.meeting_notes.get_mut(&id)
    }

    pub(crate) fn research_entry_mut(&mut self, id: ResearchId) -> Option<&mut ResearchEntry> {
        self.research.get_mut(&id)
    }

    /// Add a membership on both sides. Returns false if it already existed.
    ///
    /// Both ids must exist; callers validate before linking.
    pub(crate) fn link(
        &mut self,
        project_id: ProjectId,
        member_id: MemberId,
        now: DateTime<Utc>,
    ) -> bool {
        let mut changed = false;
        if let Some(project) = self.projects.get_mut(&project_id) {
            if project.members.insert(member_id) {
                touch(&mut project.updated_at, now);
                changed = true;
            }
        }
        if let Some(member) = self.members.get_mut(&member_id) {
            if member.projects.insert(project_id) {
                touch(&mut member.updated_at, now);
                changed = true;
            }
        }
        changed
    }

    /// Remove a membership on both sides. Returns false if it did not exist.
    pub(crate) fn unlink(
        &mut self,
        project_id: ProjectId,
        member_id: MemberId,
        now: DateTime<Utc>,
    ) -> bool {
        let mut changed = false;
        if let Some(project) = self.projects.get_mut(&project_id) {
            if project.members.remove(&member_id) {
                touch(&mut project.updated_at, now);
                changed = true;
            }
        }
        if let Some(member) = self.members.get_mut(&member_id) {
            if member.projects.remove(&project_id) {
                touch(&mut member.updated_at, now);
                changed = true;
            }
        }
        changed
    }

    /// Delete a project with its tasks and documents and drop it from every member.
    pub(crate) fn detach_project(
        &mut self,
        id: ProjectId,
        now: DateTime<Utc>,
    ) -> Option<DeleteReport> {
        let project = self.projects.get(&id)?;
        let mut report = DeleteReport::default();

        for member_id in project.members.clone() {
            self.unlink(id, member_id, now);
            report.detached_members.push(member_id);
        }

        let task_ids: Vec<TaskId> = self.tasks_in_project(id).map(|t| t.id).collect();
        for task_id in &task_ids {
            self.tasks.remove(task_id);
        }
        report.released_dependents = self.release_dependents(&task_ids, now);
        report.removed_tasks = task_ids;

        let doc_ids: Vec<DocumentId> = self.documents_in_project(id).map(|d| d.id).collect();
        for doc_id in &doc_ids {
            self.documents.remove(doc_id);
        }
        report.removed_documents = doc_ids;

        report.removed_risks = drain_project(&mut self.risks, |r| r.project_id == id);
        report.removed_meeting_notes =
            drain_project(&mut self.meeting_notes, |m| m.project_id == id);
        report.removed_research = drain_project(&mut self.research, |r| r.project_id == id);
        report.removed_baselines = drain_project(&mut self.baselines, |b| b.project_id == id);

        self.projects.remove(&id);
        Some(report)
    }

    /// Delete a member, drop it from every project and clear its task assignments.
    pub(crate) fn detach_member(
        &mut self,
        id: MemberId,
        now: DateTime<Utc>,
    ) -> Option<DeleteReport> {
        let member = self.members.get(&id)?;
        let mut report = DeleteReport::default();

        for project_id in member.projects.clone() {
            self.unlink(project_id, id, now);
            report.detached_projects.push(project_id);
        }

        for task in self.tasks.values_mut() {
            if task.assignee == Some(id) {
                task.assignee = None;
                touch(&mut task.updated_at, now);
                report.unassigned_tasks.push(task.id);
            }
        }

        self.members.remove(&id);
        Some(report)
    }

    /// Delete a task and remove it from the dependency sets of other tasks.
    pub(crate) fn detach_task(
        &mut self,
        id: TaskId,
        now: DateTime<Utc>,
    ) -> Option<DeleteReport> {
        self.tasks.remove(&id)?;
        Some(DeleteReport {
            released_dependents: self.release_dependents(&[id], now),
            ..DeleteReport::default()
        })
    }

    pub(crate) fn remove_document(&mut self, id: DocumentId) -> Option<Document> {
        self.documents.remove(&id)
    }

    pub(crate) fn remove_risk(&mut self, id: RiskId) -> Option<Risk> {
        self.risks.remove(&id)
    }

    pub(crate) fn remove_meeting_note(&mut self, id: MeetingId) -> Option<MeetingNote> {
        self.meeting_notes.remove(&id)
    }

    pub(crate) fn remove_research_entry(&mut self, id: ResearchId) -> Option<ResearchEntry> {
        self.research.remove(&id)
    }

    pub(crate) fn remove_baseline(&mut self, id: BaselineId) -> Option<Baseline> {
        self.baselines.remove(&id)
    }

    fn release_dependents(&mut self, removed: &[TaskId], now: DateTime<Utc>) -> Vec<TaskId> {
        let mut released = Vec::new();
        for task in self.tasks.values_mut() {
            let before = task.dependencies.len();
            task.dependencies.retain(|dep| !removed.contains(dep));
            if task.dependencies.len() != before {
                touch(&mut task.updated_at, now);
                released.push(task.id);
            }
        }
        released
    }

    /// Roll back to `previous` after a failed write, keeping id counters advanced
    /// so identifiers handed out by the failed operation are not issued again.
    pub(crate) fn restore(&mut self, previous: EntityStore) {
        let counters = self.next_ids.max(previous.next_ids);
        *self = previous;
        self.next_ids = counters;
    }
}

/// Remove every record matching `owned` and return the removed ids in order.
fn drain_project<K: Ord + Copy, V>(
    records: &mut BTreeMap<K, V>,
    owned: impl Fn(&V) -> bool,
) -> Vec<K> {
    let ids: Vec<K> = records
        .iter()
        .filter(|(_, record)| owned(record))
        .map(|(id, _)| *id)
        .collect();
    for id in &ids {
        records.remove(id);
    }
    ids
}
