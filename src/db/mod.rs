pub(crate) mod storage;
mod store;

use std::collections::{BTreeSet, HashSet};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};

use chrono::{DateTime, Local, NaiveDate, Utc};

use crate::config::DataPaths;
use crate::error::{Error, Result};
use crate::models::*;
use crate::query::{self, *};

pub use storage::{decode_dataset, write_snapshot, JsonFileStorage, MemoryStorage, Storage};
pub use store::{Dataset, DeleteReport, EntityStore, IntegrityError, SCHEMA_VERSION};

struct Inner {
    store: EntityStore,
    storage: Box<dyn Storage>,
}

/// Handle to the entity store and its storage backend.
///
/// Clones share the same state. Every operation takes the one mutex, and every
/// mutation is saved before it returns; when the save fails the in-memory
/// store is rolled back so it never runs ahead of what is on disk.
pub struct Database {
    inner: Arc<Mutex<Inner>>,
}

impl Clone for Database {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl Database {
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        Self::with_storage(Box::new(JsonFileStorage::new(path)))
    }

    pub fn open_default() -> Result<Self> {
        let paths = DataPaths::resolve()?;
        Self::open(paths.dataset_file())
    }

    pub fn open_memory() -> Result<Self> {
        Self::with_storage(Box::new(MemoryStorage::new()))
    }

    /// Open a database over any backend. The backend validates what it loads.
    pub fn with_storage(storage: Box<dyn Storage>) -> Result<Self> {
        let dataset = storage.load()?;
        tracing::info!("Opened dataset at {}", storage.location().display());
        Ok(Self {
            inner: Arc::new(Mutex::new(Inner {
                store: EntityStore::from_dataset(dataset),
                storage,
            })),
        })
    }

    /// Discard the in-memory state and load it again from storage.
    pub fn reload(&self) -> Result<()> {
        let mut inner = self.lock();
        let dataset = inner.storage.load()?;
        inner.store.replace(dataset);
        tracing::info!("Reloaded dataset from {}", inner.storage.location().display());
        Ok(())
    }

    pub fn snapshot(&self) -> Dataset {
        self.lock().store.snapshot()
    }

    pub fn location(&self) -> PathBuf {
        self.lock().storage.location().to_path_buf()
    }

    /// Write a timestamped copy of the current dataset into `dir`.
    pub fn backup(&self, dir: impl AsRef<Path>) -> Result<PathBuf> {
        let dir = dir.as_ref();
        let dataset = self.snapshot();

        let stamp = Local::now().format("%Y%m%d-%H%M%S").to_string();
        let mut path = dir.join(format!("projectdesk-backup-{stamp}.json"));
        let mut n = 1;
        while path.exists() {
            path = dir.join(format!("projectdesk-backup-{stamp}-{n}.json"));
            n += 1;
        }

        write_snapshot(&path, &dataset)?;
        tracing::info!("Wrote backup {}", path.display());
        Ok(path)
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().expect("database lock poisoned")
    }

    /// Apply a mutation and persist it, rolling back on any failure.
    fn write<T>(
        &self,
        op: &str,
        f: impl FnOnce(&mut EntityStore, DateTime<Utc>) -> Result<T>,
    ) -> Result<T> {
        let mut inner = self.lock();
        let before = inner.store.clone();

        let value = match f(&mut inner.store, Utc::now()) {
            Ok(value) => value,
            Err(e) => {
                inner.store.restore(before);
                tracing::warn!("{} rejected: {}", op, e);
                return Err(e);
            }
        };

        let dataset = inner.store.snapshot();
        if let Err(e) = inner.storage.save(&dataset) {
            inner.store.restore(before);
            tracing::error!("{} not persisted, changes rolled back: {}", op, e);
            return Err(e);
        }
        Ok(value)
    }

    // ============================================================
    // Project operations
    // ============================================================

    pub fn get_all_projects(&self) -> Vec<Project> {
        self.filter_projects(&ProjectFilter::default())
    }

    pub fn get_project(&self, id: ProjectId) -> Result<Project> {
        self.lock()
            .store
            .project(id)
            .cloned()
            .ok_or_else(|| Error::not_found(EntityKind::Project, id))
    }

    pub fn create_project(&self, input: CreateProjectInput) -> Result<Project> {
        let name = required_text("name", &input.name)?;
        let budget = amount("budget", input.budget.unwrap_or(0.0))?;

        let project = self.write("create_project", |store, now| {
            ensure_members(store, &input.members)?;

            let id = store.allocate_project_id();
            store.insert_project(Project {
                id,
                name,
                description: optional_text(input.description),
                status: input.status.unwrap_or_default(),
                priority: input.priority.unwrap_or_default(),
                budget,
                members: BTreeSet::new(),
                charter: normalize_charter(input.charter),
                created_at: now,
                updated_at: now,
            });
            for member_id in &input.members {
                store.link(id, *member_id, now);
            }
            project_of(store, id)
        })?;

        tracing::info!("Created project {} ({})", project.id, project.name);
        Ok(project)
    }

    pub fn update_project(&self, id: ProjectId, input: UpdateProjectInput) -> Result<Project> {
        let name = input
            .name
            .as_deref()
            .map(|n| required_text("name", n))
            .transpose()?;
        let budget = input.budget.map(|b| amount("budget", b)).transpose()?;

        let project = self.write("update_project", |store, now| {
            let current_members = project_of(store, id)?.members;

            if let Some(members) = &input.members {
                ensure_members(store, members)?;
                for member_id in current_members.difference(members) {
                    store.unlink(id, *member_id, now);
                }
                for member_id in members.difference(&current_members) {
                    store.link(id, *member_id, now);
                }
            }

            let project = store
                .project_mut(id)
                .ok_or_else(|| Error::not_found(EntityKind::Project, id))?;
            if let Some(name) = name {
                project.name = name;
            }
            if let Some(description) = input.description {
                project.description = optional_text(description);
            }
            if let Some(status) = input.status {
                project.status = status;
            }
            if let Some(priority) = input.priority {
                project.priority = priority;
            }
            if let Some(budget) = budget {
                project.budget = budget;
            }
            if let Some(charter) = input.charter {
                project.charter = normalize_charter(charter);
            }
            touch(&mut project.updated_at, now);
            Ok(project.clone())
        })?;

        tracing::info!("Updated project {}", id);
        Ok(project)
    }

    /// Delete a project together with everything it owns: tasks, documents,
    /// risks, meeting notes, research entries and baselines.
    pub fn delete_project(&self, id: ProjectId) -> Result<DeleteReport> {
        let report = self.write("delete_project", |store, now| {
            store
                .detach_project(id, now)
                .ok_or_else(|| Error::not_found(EntityKind::Project, id))
        })?;

        tracing::info!(
            "Deleted project {} ({} tasks, {} documents, {} risks, {} meeting notes, {} research entries, {} baselines removed)",
            id,
            report.removed_tasks.len(),
            report.removed_documents.len(),
            report.removed_risks.len(),
            report.removed_meeting_notes.len(),
            report.removed_research.len(),
            report.removed_baselines.len()
        );
        Ok(report)
    }

    /// Add a member to a project. Both sides of the membership are updated.
    pub fn add_project_member(&self, project_id: ProjectId, member_id: MemberId) -> Result<Project> {
        let project = self.write("add_project_member", |store, now| {
            ensure_membership_ends(store, project_id, member_id)?;
            store.link(project_id, member_id, now);
            project_of(store, project_id)
        })?;

        tracing::info!("Member {} joined project {}", member_id, project_id);
        Ok(project)
    }

    pub fn remove_project_member(
        &self,
        project_id: ProjectId,
        member_id: MemberId,
    ) -> Result<Project> {
        let project = self.write("remove_project_member", |store, now| {
            ensure_membership_ends(store, project_id, member_id)?;
            store.unlink(project_id, member_id, now);
            project_of(store, project_id)
        })?;

        tracing::info!("Member {} left project {}", member_id, project_id);
        Ok(project)
    }

    // ============================================================
    // Task operations
    // ============================================================

    pub fn get_all_tasks(&self) -> Vec<Task> {
        self.filter_tasks(&TaskFilter::default())
    }

    pub fn get_task(&self, id: TaskId) -> Result<Task> {
        self.lock()
            .store
            .task(id)
            .cloned()
            .ok_or_else(|| Error::not_found(EntityKind::Task, id))
    }

    /// Tasks of one project in creation order.
    pub fn get_tasks_by_project(&self, project_id: ProjectId) -> Result<Vec<Task>> {
        let inner = self.lock();
        if !inner.store.project_exists(project_id) {
            return Err(Error::not_found(EntityKind::Project, project_id));
        }
        Ok(query::filter_tasks(
            &inner.store,
            &TaskFilter {
                project_id: Some(project_id),
                ..TaskFilter::default()
            },
        ))
    }

    pub fn create_task(&self, input: CreateTaskInput) -> Result<Task> {
        let title = required_text("title", &input.title)?;
        let cost = amount("cost", input.cost.unwrap_or(0.0))?;
        check_schedule(input.start_date, input.due_date)?;
        let duration_days = if input.is_milestone {
            0
        } else {
            input.duration_days.unwrap_or(0)
        };

        let task = self.write("create_task", |store, now| {
            ensure_project(store, input.project_id)?;
            if let Some(member_id) = input.assignee {
                ensure_member(store, member_id)?;
            }
            for dep in &input.dependencies {
                ensure_dependency(store, input.project_id, *dep)?;
            }

            let id = store.allocate_task_id();
            let task = Task {
                id,
                project_id: input.project_id,
                title,
                description: optional_text(input.description),
                status: input.status.unwrap_or_default(),
                priority: input.priority.unwrap_or_default(),
                assignee: input.assignee,
                start_date: input.start_date,
                due_date: input.due_date,
                duration_days,
                cost,
                is_milestone: input.is_milestone,
                dependencies: input.dependencies,
                created_at: now,
                updated_at: now,
            };
            store.insert_task(task.clone());
            Ok(task)
        })?;

        tracing::info!("Created task {} in project {}", task.id, task.project_id);
        Ok(task)
    }

    pub fn update_task(&self, id: TaskId, input: UpdateTaskInput) -> Result<Task> {
        let title = input
            .title
            .as_deref()
            .map(|t| required_text("title", t))
            .transpose()?;
        let cost = input.cost.map(|c| amount("cost", c)).transpose()?;

        let task = self.write("update_task", |store, now| {
            let existing = store
                .task(id)
                .cloned()
                .ok_or_else(|| Error::not_found(EntityKind::Task, id))?;

            let project_id = input.project_id.unwrap_or(existing.project_id);
            if project_id != existing.project_id {
                ensure_project(store, project_id)?;
                if let Some(dependent) = store.tasks().find(|t| t.dependencies.contains(&id)) {
                    return Err(Error::Reference(format!(
                        "task {id} cannot leave project {} while task {} depends on it",
                        existing.project_id, dependent.id
                    )));
                }
            }

            let assignee = input.assignee.unwrap_or(existing.assignee);
            if let Some(member_id) = assignee {
                ensure_member(store, member_id)?;
            }

            let dependencies = input.dependencies.unwrap_or(existing.dependencies);
            for dep in &dependencies {
                if *dep == id {
                    return Err(Error::Reference(format!("task {id} cannot depend on itself")));
                }
                ensure_dependency(store, project_id, *dep)?;
                if store.depends_on(*dep, id) {
                    return Err(Error::Reference(format!(
                        "task {id} depending on task {dep} would create a cycle"
                    )));
                }
            }

            let start_date = input.start_date.unwrap_or(existing.start_date);
            let due_date = input.due_date.unwrap_or(existing.due_date);
            check_schedule(start_date, due_date)?;

            let is_milestone = input.is_milestone.unwrap_or(existing.is_milestone);
            let duration_days = if is_milestone {
                0
            } else {
                input.duration_days.unwrap_or(existing.duration_days)
            };

            let task = store
                .task_mut(id)
                .ok_or_else(|| Error::not_found(EntityKind::Task, id))?;
            task.project_id = project_id;
            if let Some(title) = title {
                task.title = title;
            }
            if let Some(description) = input.description {
                task.description = optional_text(description);
            }
            if let Some(status) = input.status {
                task.status = status;
            }
            if let Some(priority) = input.priority {
                task.priority = priority;
            }
            task.assignee = assignee;
            task.start_date = start_date;
            task.due_date = due_date;
            task.duration_days = duration_days;
            if let Some(cost) = cost {
                task.cost = cost;
            }
            task.is_milestone = is_milestone;
            task.dependencies = dependencies;
            touch(&mut task.updated_at, now);
            Ok(task.clone())
        })?;

        tracing::info!("Updated task {}", id);
        Ok(task)
    }

    /// Delete a task. Other tasks stop depending on it.
    pub fn delete_task(&self, id: TaskId) -> Result<DeleteReport> {
        let report = self.write("delete_task", |store, now| {
            store
                .detach_task(id, now)
                .ok_or_else(|| Error::not_found(EntityKind::Task, id))
        })?;

        tracing::info!("Deleted task {}", id);
        Ok(report)
    }

    // ============================================================
    // Member operations
    // ============================================================

    pub fn get_all_members(&self) -> Vec<Member> {
        self.filter_members(&MemberFilter::default())
    }

    pub fn get_member(&self, id: MemberId) -> Result<Member> {
        self.lock()
            .store
            .member(id)
            .cloned()
            .ok_or_else(|| Error::not_found(EntityKind::Member, id))
    }

    pub fn create_member(&self, input: CreateMemberInput) -> Result<Member> {
        let name = required_text("name", &input.name)?;

        let member = self.write("create_member", |store, now| {
            for project_id in &input.projects {
                ensure_project(store, *project_id)?;
            }

            let id = store.allocate_member_id();
            store.insert_member(Member {
                id,
                name,
                role: optional_text(input.role),
                contact: optional_text(input.contact),
                projects: BTreeSet::new(),
                created_at: now,
                updated_at: now,
            });
            for project_id in &input.projects {
                store.link(*project_id, id, now);
            }
            member_of(store, id)
        })?;

        tracing::info!("Created member {} ({})", member.id, member.name);
        Ok(member)
    }

    pub fn update_member(&self, id: MemberId, input: UpdateMemberInput) -> Result<Member> {
        let name = input
            .name
            .as_deref()
            .map(|n| required_text("name", n))
            .transpose()?;

        let member = self.write("update_member", |store, now| {
            let current_projects = member_of(store, id)?.projects;

            if let Some(projects) = &input.projects {
                for project_id in projects {
                    ensure_project(store, *project_id)?;
                }
                for project_id in current_projects.difference(projects) {
                    store.unlink(*project_id, id, now);
                }
                for project_id in projects.difference(&current_projects) {
                    store.link(*project_id, id, now);
                }
            }

            let member = store
                .member_mut(id)
                .ok_or_else(|| Error::not_found(EntityKind::Member, id))?;
            if let Some(name) = name {
                member.name = name;
            }
            if let Some(role) = input.role {
                member.role = optional_text(role);
            }
            if let Some(contact) = input.contact {
                member.contact = optional_text(contact);
            }
            touch(&mut member.updated_at, now);
            Ok(member.clone())
        })?;

        tracing::info!("Updated member {}", id);
        Ok(member)
    }

    /// Delete a member. Its projects drop it and its tasks become unassigned.
    pub fn delete_member(&self, id: MemberId) -> Result<DeleteReport> {
        let report = self.write("delete_member", |store, now| {
            store
                .detach_member(id, now)
                .ok_or_else(|| Error::not_found(EntityKind::Member, id))
        })?;

        tracing::info!(
            "Deleted member {} ({} tasks unassigned)",
            id,
            report.unassigned_tasks.len()
        );
        Ok(report)
    }

    // ============================================================
    // Document operations
    // ============================================================

    pub fn get_all_documents(&self) -> Vec<Document> {
        self.filter_documents(&DocumentFilter::default())
    }

    pub fn get_document(&self, id: DocumentId) -> Result<Document> {
        self.lock()
            .store
            .document(id)
            .cloned()
            .ok_or_else(|| Error::not_found(EntityKind::Document, id))
    }

    /// Documents of one project in upload order.
    pub fn get_documents_by_project(&self, project_id: ProjectId) -> Result<Vec<Document>> {
        let inner = self.lock();
        if !inner.store.project_exists(project_id) {
            return Err(Error::not_found(EntityKind::Project, project_id));
        }
        Ok(query::filter_documents(
            &inner.store,
            &DocumentFilter {
                project_id: Some(project_id),
                ..DocumentFilter::default()
            },
        ))
    }

    /// Register a document. The file size is recorded when the path is a readable file.
    pub fn create_document(&self, input: CreateDocumentInput) -> Result<Document> {
        let title = required_text("title", &input.title)?;
        let path = required_text("path", &input.path)?;
        let size_bytes = file_size(&path);

        let document = self.write("create_document", |store, now| {
            ensure_project(store, input.project_id)?;

            let id = store.allocate_document_id();
            let document = Document {
                id,
                project_id: input.project_id,
                title,
                description: optional_text(input.description),
                kind: input.kind.unwrap_or_default(),
                category: optional_text(input.category),
                tags: normalize_tags(input.tags),
                file: FileMeta { path, size_bytes },
                created_at: now,
                updated_at: now,
            };
            store.insert_document(document.clone());
            Ok(document)
        })?;

        tracing::info!(
            "Registered document {} ({}) in project {}",
            document.id,
            document.file.path,
            document.project_id
        );
        Ok(document)
    }

    pub fn update_document(&self, id: DocumentId, input: UpdateDocumentInput) -> Result<Document> {
        let title = input
            .title
            .as_deref()
            .map(|t| required_text("title", t))
            .transpose()?;
        let file = input
            .path
            .as_deref()
            .map(|p| required_text("path", p))
            .transpose()?
            .map(|path| FileMeta {
                size_bytes: file_size(&path),
                path,
            });

        let document = self.write("update_document", |store, now| {
            if !store.document_exists(id) {
                return Err(Error::not_found(EntityKind::Document, id));
            }
            if let Some(project_id) = input.project_id {
                ensure_project(store, project_id)?;
            }

            let document = store
                .document_mut(id)
                .ok_or_else(|| Error::not_found(EntityKind::Document, id))?;
            if let Some(project_id) = input.project_id {
                document.project_id = project_id;
            }
            if let Some(title) = title {
                document.title = title;
            }
            if let Some(file) = file {
                document.file = file;
            }
            if let Some(description) = input.description {
                document.description = optional_text(description);
            }
            if let Some(kind) = input.kind {
                document.kind = kind;
            }
            if let Some(category) = input.category {
                document.category = optional_text(category);
            }
            if let Some(tags) = input.tags {
                document.tags = normalize_tags(tags);
            }
            touch(&mut document.updated_at, now);
            Ok(document.clone())
        })?;

        tracing::info!("Updated document {}", id);
        Ok(document)
    }

    pub fn delete_document(&self, id: DocumentId) -> Result<DeleteReport> {
        let report = self.write("delete_document", |store, _| {
            store
                .remove_document(id)
                .map(|_| DeleteReport::default())
                .ok_or_else(|| Error::not_found(EntityKind::Document, id))
        })?;

        tracing::info!("Deleted document {}", id);
        Ok(report)
    }

    // ============================================================
    // Risk register
    // ============================================================

    pub fn get_risk(&self, id: RiskId) -> Result<Risk> {
        self.lock()
            .store
            .risk(id)
            .cloned()
            .ok_or_else(|| Error::not_found(EntityKind::Risk, id))
    }

    /// Risks of one project, highest score first. Equal scores keep creation order.
    pub fn get_risks_by_project(&self, project_id: ProjectId) -> Result<Vec<Risk>> {
        let inner = self.lock();
        if !inner.store.project_exists(project_id) {
            return Err(Error::not_found(EntityKind::Project, project_id));
        }
        let mut risks: Vec<Risk> = inner.store.risks_in_project(project_id).cloned().collect();
        risks.sort_by(|a, b| b.score().cmp(&a.score()).then_with(|| a.id.cmp(&b.id)));
        Ok(risks)
    }

    pub fn create_risk(&self, input: CreateRiskInput) -> Result<Risk> {
        let name = required_text("name", &input.name)?;
        let probability = rating("probability", input.probability)?;
        let impact = rating("impact", input.impact)?;

        let risk = self.write("create_risk", |store, now| {
            ensure_project(store, input.project_id)?;

            let risk = Risk {
                id: store.allocate_risk_id(),
                project_id: input.project_id,
                name,
                probability,
                impact,
                mitigation: optional_text(input.mitigation),
                created_at: now,
                updated_at: now,
            };
            store.insert_risk(risk.clone());
            Ok(risk)
        })?;

        tracing::info!(
            "Logged risk {} in project {} (score {})",
            risk.id,
            risk.project_id,
            risk.score()
        );
        Ok(risk)
    }

    pub fn update_risk(&self, id: RiskId, input: UpdateRiskInput) -> Result<Risk> {
        let name = input
            .name
            .as_deref()
            .map(|n| required_text("name", n))
            .transpose()?;
        let probability = input
            .probability
            .map(|p| rating("probability", p))
            .transpose()?;
        let impact = input.impact.map(|i| rating("impact", i)).transpose()?;

        let risk = self.write("update_risk", |store, now| {
            let risk = store
                .risk_mut(id)
                .ok_or_else(|| Error::not_found(EntityKind::Risk, id))?;
            if let Some(name) = name {
                risk.name = name;
            }
            if let Some(probability) = probability {
                risk.probability = probability;
            }
            if let Some(impact) = impact {
                risk.impact = impact;
            }
            if let Some(mitigation) = input.mitigation {
                risk.mitigation = optional_text(mitigation);
            }
            touch(&mut risk.updated_at, now);
            Ok(risk.clone())
        })?;

        tracing::info!("Updated risk {}", id);
        Ok(risk)
    }

    pub fn delete_risk(&self, id: RiskId) -> Result<DeleteReport> {
        let report = self.write("delete_risk", |store, _| {
            store
                .remove_risk(id)
                .map(|_| DeleteReport::default())
                .ok_or_else(|| Error::not_found(EntityKind::Risk, id))
        })?;

        tracing::info!("Deleted risk {}", id);
        Ok(report)
    }

    // ============================================================
    // Meeting notes
    // ============================================================

    pub fn get_meeting_note(&self, id: MeetingId) -> Result<MeetingNote> {
        self.lock()
            .store
            .meeting_note(id)
            .cloned()
            .ok_or_else(|| Error::not_found(EntityKind::Meeting, id))
    }

    /// Meeting notes of one project, most recent meeting first.
    pub fn get_meeting_notes_by_project(&self, project_id: ProjectId) -> Result<Vec<MeetingNote>> {
        let inner = self.lock();
        if !inner.store.project_exists(project_id) {
            return Err(Error::not_found(EntityKind::Project, project_id));
        }
        let mut notes: Vec<MeetingNote> = inner
            .store
            .meeting_notes_in_project(project_id)
            .cloned()
            .collect();
        notes.sort_by(|a, b| b.date.cmp(&a.date).then_with(|| b.id.cmp(&a.id)));
        Ok(notes)
    }

    pub fn create_meeting_note(&self, input: CreateMeetingNoteInput) -> Result<MeetingNote> {
        let title = required_text("title", &input.title)?;
        let date = input.date.unwrap_or_else(|| Local::now().date_naive());

        let note = self.write("create_meeting_note", |store, now| {
            ensure_project(store, input.project_id)?;

            let note = MeetingNote {
                id: store.allocate_meeting_id(),
                project_id: input.project_id,
                title,
                date,
                participants: normalize_names(input.participants),
                agenda: optional_text(input.agenda),
                discussion: optional_text(input.discussion),
                action_items: optional_text(input.action_items),
                created_at: now,
                updated_at: now,
            };
            store.insert_meeting_note(note.clone());
            Ok(note)
        })?;

        tracing::info!(
            "Recorded meeting {} ({}) in project {}",
            note.id,
            note.date,
            note.project_id
        );
        Ok(note)
    }

    pub fn update_meeting_note(
        &self,
        id: MeetingId,
        input: UpdateMeetingNoteInput,
    ) -> Result<MeetingNote> {
        let title = input
            .title
            .as_deref()
            .map(|t| required_text("title", t))
            .transpose()?;

        let note = self.write("update_meeting_note", |store, now| {
            let note = store
                .meeting_note_mut(id)
                .ok_or_else(|| Error::not_found(EntityKind::Meeting, id))?;
            if let Some(title) = title {
                note.title = title;
            }
            if let Some(date) = input.date {
                note.date = date;
            }
            if let Some(participants) = input.participants {
                note.participants = normalize_names(participants);
            }
            if let Some(agenda) = input.agenda {
                note.agenda = optional_text(agenda);
            }
            if let Some(discussion) = input.discussion {
                note.discussion = optional_text(discussion);
            }
            if let Some(action_items) = input.action_items {
                note.action_items = optional_text(action_items);
            }
            touch(&mut note.updated_at, now);
            Ok(note.clone())
        })?;

        tracing::info!("Updated meeting {}", id);
        Ok(note)
    }

    pub fn delete_meeting_note(&self, id: MeetingId) -> Result<DeleteReport> {
        let report = self.write("delete_meeting_note", |store, _| {
            store
                .remove_meeting_note(id)
                .map(|_| DeleteReport::default())
                .ok_or_else(|| Error::not_found(EntityKind::Meeting, id))
        })?;

        tracing::info!("Deleted meeting {}", id);
        Ok(report)
    }

    // ============================================================
    // Research log
    // ============================================================

    pub fn get_research_entry(&self, id: ResearchId) -> Result<ResearchEntry> {
        self.lock()
            .store
            .research_entry(id)
            .cloned()
            .ok_or_else(|| Error::not_found(EntityKind::Research, id))
    }

    /// Research entries of one project in the order they were logged.
    pub fn get_research_by_project(&self, project_id: ProjectId) -> Result<Vec<ResearchEntry>> {
        let inner = self.lock();
        if !inner.store.project_exists(project_id) {
            return Err(Error::not_found(EntityKind::Project, project_id));
        }
        let mut entries: Vec<ResearchEntry> =
            inner.store.research_in_project(project_id).cloned().collect();
        entries.sort_by(query::creation_order);
        Ok(entries)
    }

    pub fn create_research_entry(&self, input: CreateResearchEntryInput) -> Result<ResearchEntry> {
        let title = required_text("title", &input.title)?;

        let entry = self.write("create_research_entry", |store, now| {
            ensure_project(store, input.project_id)?;

            let entry = ResearchEntry {
                id: store.allocate_research_id(),
                project_id: input.project_id,
                title,
                content: optional_text(input.content),
                created_at: now,
                updated_at: now,
            };
            store.insert_research_entry(entry.clone());
            Ok(entry)
        })?;

        tracing::info!(
            "Logged research {} in project {}",
            entry.id,
            entry.project_id
        );
        Ok(entry)
    }

    pub fn update_research_entry(
        &self,
        id: ResearchId,
        input: UpdateResearchEntryInput,
    ) -> Result<ResearchEntry> {
        let title = input
            .title
            .as_deref()
            .map(|t| required_text("title", t))
            .transpose()?;

        let entry = self.write("update_research_entry", |store, now| {
            let entry = store
                .research_entry_mut(id)
                .ok_or_else(|| Error::not_found(EntityKind::Research, id))?;
            if let Some(title) = title {
                entry.title = title;
            }
            if let Some(content) = input.content {
                entry.content = optional_text(content);
            }
            touch(&mut entry.updated_at, now);
            Ok(entry.clone())
        })?;

        tracing::info!("Updated research {}", id);
        Ok(entry)
    }

    pub fn delete_research_entry(&self, id: ResearchId) -> Result<DeleteReport> {
        let report = self.write("delete_research_entry", |store, _| {
            store
                .remove_research_entry(id)
                .map(|_| DeleteReport::default())
                .ok_or_else(|| Error::not_found(EntityKind::Research, id))
        })?;

        tracing::info!("Deleted research {}", id);
        Ok(report)
    }

    // ============================================================
    // Baselines
    // ============================================================

    pub fn get_baseline(&self, id: BaselineId) -> Result<Baseline> {
        self.lock()
            .store
            .baseline(id)
            .cloned()
            .ok_or_else(|| Error::not_found(EntityKind::Baseline, id))
    }

    /// Baselines of one project, oldest first.
    pub fn get_baselines_by_project(&self, project_id: ProjectId) -> Result<Vec<Baseline>> {
        let inner = self.lock();
        if !inner.store.project_exists(project_id) {
            return Err(Error::not_found(EntityKind::Project, project_id));
        }
        Ok(inner.store.baselines_in_project(project_id).cloned().collect())
    }

    /// Capture the project's current tasks. A project without tasks has
    /// nothing to capture and is rejected.
    pub fn create_baseline(&self, project_id: ProjectId, label: Option<String>) -> Result<Baseline> {
        let baseline = self.write("create_baseline", |store, now| {
            if !store.project_exists(project_id) {
                return Err(Error::not_found(EntityKind::Project, project_id));
            }
            let tasks: Vec<Task> = store.tasks_in_project(project_id).cloned().collect();
            if tasks.is_empty() {
                return Err(Error::validation("tasks", "project has no tasks to capture"));
            }

            let baseline = Baseline {
                id: store.allocate_baseline_id(),
                project_id,
                label: optional_text(label),
                tasks,
                created_at: now,
            };
            store.insert_baseline(baseline.clone());
            Ok(baseline)
        })?;

        tracing::info!(
            "Captured baseline {} of project {} ({} tasks)",
            baseline.id,
            project_id,
            baseline.tasks.len()
        );
        Ok(baseline)
    }

    pub fn delete_baseline(&self, id: BaselineId) -> Result<DeleteReport> {
        let report = self.write("delete_baseline", |store, _| {
            store
                .remove_baseline(id)
                .map(|_| DeleteReport::default())
                .ok_or_else(|| Error::not_found(EntityKind::Baseline, id))
        })?;

        tracing::info!("Deleted baseline {}", id);
        Ok(report)
    }

    // ============================================================
    // Queries
    // ============================================================

    pub fn filter_projects(&self, filter: &ProjectFilter) -> Vec<Project> {
        query::filter_projects(&self.lock().store, filter)
    }

    pub fn filter_tasks(&self, filter: &TaskFilter) -> Vec<Task> {
        query::filter_tasks(&self.lock().store, filter)
    }

    pub fn filter_members(&self, filter: &MemberFilter) -> Vec<Member> {
        query::filter_members(&self.lock().store, filter)
    }

    pub fn filter_documents(&self, filter: &DocumentFilter) -> Vec<Document> {
        query::filter_documents(&self.lock().store, filter)
    }

    pub fn search(&self, search: &SearchQuery) -> Vec<SearchHit> {
        let hits = query::search(&self.lock().store, search);
        tracing::debug!("Search for {:?} matched {} entities", search.text, hits.len());
        hits
    }

    /// Dashboard statistics as of today's local date.
    pub fn statistics(&self) -> DashboardStats {
        self.statistics_on(Local::now().date_naive())
    }

    pub fn statistics_on(&self, today: NaiveDate) -> DashboardStats {
        query::statistics(&self.lock().store, today, RECENT_ACTIVITY_LIMIT)
    }

    pub fn recent_activity(&self, limit: usize) -> Vec<ActivityEntry> {
        query::recent_activity(&self.lock().store, limit)
    }

    /// Compare a baseline with the live tasks of its project.
    pub fn baseline_variance(&self, id: BaselineId) -> Result<Vec<TaskVariance>> {
        let inner = self.lock();
        let baseline = inner
            .store
            .baseline(id)
            .ok_or_else(|| Error::not_found(EntityKind::Baseline, id))?;
        Ok(query::baseline_variance(&inner.store, baseline))
    }

    pub fn critical_path(&self, project_id: ProjectId) -> Result<CriticalPath> {
        let inner = self.lock();
        if !inner.store.project_exists(project_id) {
            return Err(Error::not_found(EntityKind::Project, project_id));
        }
        Ok(query::critical_path(&inner.store, project_id))
    }
}

// ============================================================
// Validation helpers
// ============================================================

fn required_text(field: &'static str, value: &str) -> Result<String> {
    if is_blank(value) {
        return Err(Error::validation(field, "cannot be empty"));
    }
    Ok(value.trim().to_string())
}

/// Trim optional text; blank becomes `None`.
fn optional_text(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn amount(field: &'static str, value: f64) -> Result<f64> {
    if !is_valid_amount(value) {
        return Err(Error::validation(
            field,
            format!("{value} is not a non-negative number"),
        ));
    }
    Ok(value)
}

fn rating(field: &'static str, value: u8) -> Result<u8> {
    if !RISK_SCALE.contains(&value) {
        return Err(Error::validation(
            field,
            format!("{value} is outside {} to {}", RISK_SCALE.start(), RISK_SCALE.end()),
        ));
    }
    Ok(value)
}

fn normalize_charter(charter: ProjectCharter) -> ProjectCharter {
    ProjectCharter {
        problem_statement: optional_text(charter.problem_statement),
        objectives: optional_text(charter.objectives),
        cost_benefit: optional_text(charter.cost_benefit),
        stakeholders: optional_text(charter.stakeholders),
        success_criteria: optional_text(charter.success_criteria),
    }
}

/// Trimmed, non-empty names in their given order.
fn normalize_names(names: Vec<String>) -> Vec<String> {
    names
        .into_iter()
        .map(|n| n.trim().to_string())
        .filter(|n| !n.is_empty())
        .collect()
}

fn check_schedule(start: Option<NaiveDate>, due: Option<NaiveDate>) -> Result<()> {
    match (start, due) {
        (Some(start), Some(due)) if due < start => Err(Error::validation(
            "due_date",
            format!("{due} is before the start date {start}"),
        )),
        _ => Ok(()),
    }
}

/// Trimmed, non-empty tags with case-insensitive duplicates dropped.
fn normalize_tags(tags: Vec<String>) -> Vec<String> {
    let mut seen = HashSet::new();
    tags.into_iter()
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty() && seen.insert(t.to_lowercase()))
        .collect()
}

fn file_size(path: &str) -> Option<u64> {
    fs::metadata(path)
        .ok()
        .filter(|m| m.is_file())
        .map(|m| m.len())
}

fn ensure_project(store: &EntityStore, id: ProjectId) -> Result<()> {
    if store.project_exists(id) {
        Ok(())
    } else {
        Err(Error::Reference(format!("project {id} does not exist")))
    }
}

fn ensure_member(store: &EntityStore, id: MemberId) -> Result<()> {
    if store.member_exists(id) {
        Ok(())
    } else {
        Err(Error::Reference(format!("member {id} does not exist")))
    }
}

fn ensure_members(store: &EntityStore, ids: &BTreeSet<MemberId>) -> Result<()> {
    ids.iter().try_for_each(|id| ensure_member(store, *id))
}

fn ensure_dependency(store: &EntityStore, project_id: ProjectId, dep: TaskId) -> Result<()> {
    match store.task(dep) {
        None => Err(Error::Reference(format!("task {dep} does not exist"))),
        Some(task) if task.project_id != project_id => Err(Error::Reference(format!(
            "task {dep} belongs to project {}, not project {project_id}",
            task.project_id
        ))),
        Some(_) => Ok(()),
    }
}

fn ensure_membership_ends(
    store: &EntityStore,
    project_id: ProjectId,
    member_id: MemberId,
) -> Result<()> {
    if !store.project_exists(project_id) {
        return Err(Error::not_found(EntityKind::Project, project_id));
    }
    if !store.member_exists(member_id) {
        return Err(Error::not_found(EntityKind::Member, member_id));
    }
    Ok(())
}

fn project_of(store: &EntityStore, id: ProjectId) -> Result<Project> {
    store
        .project(id)
        .cloned()
        .ok_or_else(|| Error::not_found(EntityKind::Project, id))
}

fn member_of(store: &EntityStore, id: MemberId) -> Result<Member> {
    store
        .member(id)
        .cloned()
        .ok_or_else(|| Error::not_found(EntityKind::Member, id))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tags_are_trimmed_and_deduplicated() {
        let tags = normalize_tags(vec![
            " Legal ".to_string(),
            "legal".to_string(),
            "".to_string(),
            "Q3".to_string(),
        ]);
        assert_eq!(tags, vec!["Legal".to_string(), "Q3".to_string()]);
    }

    #[test]
    fn amounts_must_be_finite_and_non_negative() {
        assert!(amount("cost", 12.5).is_ok());
        assert!(amount("cost", -1.0).is_err());
        assert!(amount("cost", f64::NAN).is_err());
        assert!(amount("budget", f64::INFINITY).is_err());
    }

    #[test]
    fn due_date_cannot_precede_start() {
        let start = NaiveDate::from_ymd_opt(2024, 5, 10);
        let due = NaiveDate::from_ymd_opt(2024, 5, 1);
        assert!(check_schedule(start, due).is_err());
        assert!(check_schedule(due, start).is_ok());
        assert!(check_schedule(None, due).is_ok());
    }

    #[test]
    fn ratings_stay_on_the_risk_scale() {
        assert_eq!(rating("impact", 1).unwrap(), 1);
        assert_eq!(rating("impact", 10).unwrap(), 10);
        assert!(rating("impact", 0).is_err());
        assert!(rating("probability", 11).is_err());
    }

    #[test]
    fn blank_charter_sections_are_dropped() {
        let charter = normalize_charter(ProjectCharter {
            problem_statement: Some("  Checkout is slow ".to_string()),
            objectives: Some("   ".to_string()),
            ..ProjectCharter::default()
        });
        assert_eq!(charter.problem_statement.as_deref(), Some("Checkout is slow"));
        assert!(charter.objectives.is_none());
    }

    #[test]
    fn missing_file_has_no_size() {
        assert_eq!(file_size("/definitely/not/here.pdf"), None);
    }
}
